//! Store integration tests
//!
//! This module tests the update queue, the handler adapters and the
//! application of remote updates.

mod handlers;
