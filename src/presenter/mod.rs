mod controller;
pub mod rhythm;
mod state;

pub use controller::{PresentationScheduler, PresenterEvent, PresenterSnapshot};
pub use rhythm::{unit_delay, word_interval_ms, RhythmConfig};
pub use state::{PresentationState, PresenterStatus, SchedulerConfig, TickOutcome};
