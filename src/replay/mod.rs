//! Replay Pipeline (§4.K): reads persisted events back, filtered and
//! speed-controlled, through the storage contract in [`crate::storage`].

mod pipeline;
mod reader;

pub use pipeline::{ReplayPipeline, ReplayStats};
pub use reader::{read_events, DecodedRecord};
