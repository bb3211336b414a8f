//! Shared utilities: clocks, identifiers, and telemetry.

pub mod clock;
pub mod ids;
pub mod telemetry;

pub use clock::{now_ms, Clock, ManualClock, SystemClock};
pub use ids::generate_task_id;
pub use telemetry::{init_tracing, init_tracing_with_default};
