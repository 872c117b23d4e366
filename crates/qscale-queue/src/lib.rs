//! qscale-queue: reads pending work out of the queue store.
//!
//! Work items are Redis hashes keyed `<queue>_<id>`, each carrying a
//! `status` and a `file_name` field. The sampler walks a target's key
//! prefixes and tallies the non-terminal items by category.
//!
//! # Components
//!
//! - **`source`**: the `BacklogSource` capability trait
//! - **`redis_backlog`**: `RedisBacklog`, the production source
//! - **`memory`**: `MemoryBacklog`, an in-process source for tests
//! - **`sampler`**: `BacklogSampler`, keys → `BacklogSnapshot`

pub mod error;
pub mod memory;
pub mod redis_backlog;
pub mod sampler;
pub mod source;

pub use error::{QueueError, QueueResult};
pub use memory::MemoryBacklog;
pub use redis_backlog::RedisBacklog;
pub use sampler::BacklogSampler;
pub use source::BacklogSource;
