//! Streamer deserialization for the object classes we read.

mod ttree;

pub use ttree::read_ttree;
