//! Runtime adapters: the tokio spawner and the resource sampler loop.

pub mod sampler;
pub mod tokio_spawner;

pub use sampler::{spawn_sampler_loop, ResourceSample, ResourceSampler};
pub use tokio_spawner::TokioSpawner;
