pub mod goals;
mod lifecycle;
pub mod progress;

pub use goals::DailyGoalTracker;
pub use lifecycle::{CloseIntent, ExitOutcome, SessionLifecycle, SessionStores};
pub use progress::ProgressSaver;
