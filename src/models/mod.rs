pub mod goal;
pub mod profile;
pub mod session;

pub use goal::DailyGoal;
pub use profile::CapabilityProfile;
pub use session::{CompletionEvent, SessionRecord, SessionStatus, SessionSummary};
