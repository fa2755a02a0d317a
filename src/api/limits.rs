//! Batch limits enforced by the tracking server.

pub const BATCH_ITEMS: usize = 1000;
pub const BATCH_METRICS: usize = 1000;
pub const BATCH_PARAMS: usize = 100;
pub const BATCH_TAGS: usize = 100;
