//! Codec integration tests
//!
//! These tests exercise the codec family against the nested movie model in
//! `helpers`, on both the in-memory engine and the Y-CRDT engine.

mod decode_failures;
mod round_trip;
#[cfg(feature = "y-crdt")]
mod ydoc_engine;
