//! Constants used throughout the Collab library.
//!
//! This module provides central definitions for reserved keys and default
//! sizes shared by codecs, engines and stores.

/// Reserved map key under which scalar and enum codecs store their value.
pub const VALUE_KEY: &str = "";

/// Default name of the top-level shared map holding a store's root node.
pub const DEFAULT_ROOT: &str = "collab";

/// Default key of the root node inside the top-level shared map.
pub const DEFAULT_KEY: &str = "value";

/// Default number of commands that may wait in a store's queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Number of change updates buffered for slow update-feed subscribers.
pub const UPDATE_FEED_CAPACITY: usize = 256;

/// Number of emitted events buffered for slow `EmittingHandler` subscribers.
pub const EMIT_CAPACITY: usize = 64;
