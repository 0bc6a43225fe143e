use thiserror::Error;

/// Misuse of the reader API. Recoverable conditions (empty text, out-of-range
/// settings, unreachable stores) never surface here; they are handled where
/// they occur.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReaderError {
    #[error("no reading session is active")]
    NoActiveSession,

    #[error("a reading session is already active")]
    SessionAlreadyActive,

    #[error("nothing to present: the unit sequence is empty")]
    EmptyContent,

    #[error("cannot seek while a guided break is running")]
    SeekDuringInterlude,

    #[error("no session summary is awaiting confirmation")]
    NoPendingSummary,
}
