//! Beamtime Core - Multi-Source Temporal Event Scheduler
//!
//! Decides, across any number of independently parameterized particle
//! sources, which source emits the next primary and at what simulated time,
//! while the simulation clock is split into a sequence of run intervals.
//!
//! 1. **Activity laws**: fixed count, constant activity, half-life decay
//!    ([`SourceActivityModel`])
//! 2. **Run intervals**: ordered, non-overlapping `[begin, end)` windows with
//!    legal gaps ([`RunIntervalTable`])
//! 3. **Selection**: a total `(time, event_id, source)` order over all live
//!    sources ([`EventScheduler`])

pub mod error;
pub mod intervals;
pub mod activity;
pub mod source;
pub mod scheduler;
pub mod statistics;

// Re-export key types for convenience
pub use error::{ConfigError, ScheduleError, ScheduleSnapshot};
pub use intervals::RunIntervalTable;
pub use activity::{EventInfo, SourceActivityModel, NEGLIGIBLE_YIELD};
pub use source::{Source, SourceConfig};
pub use scheduler::{EventScheduler, ScheduledEvent};
pub use statistics::{RunStatistics, SimulationStatistics};
