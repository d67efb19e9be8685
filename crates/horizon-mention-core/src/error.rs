//! Errors raised by the scheduling and notification primitives.

use std::fmt;

/// Any failure in the core crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    Timer(TimerError),
    Signal(SignalError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timer(err) => write!(f, "timer: {err}"),
            Self::Signal(err) => write!(f, "signal: {err}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(match self {
            Self::Timer(err) => err,
            Self::Signal(err) => err,
        })
    }
}

/// Failures when stopping a one-shot timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The timer already fired, was stopped, or never existed.
    UnknownTimer,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("no pending timer with this id")
    }
}

impl std::error::Error for TimerError {}

/// Failures when disconnecting a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// No slot is connected under this id.
    UnknownConnection,
    /// The signal a guard points at no longer exists.
    SignalGone,
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnknownConnection => "no slot connected with this id",
            Self::SignalGone => "the signal was dropped",
        })
    }
}

impl std::error::Error for SignalError {}

impl From<TimerError> for CoreError {
    fn from(err: TimerError) -> Self {
        Self::Timer(err)
    }
}

impl From<SignalError> for CoreError {
    fn from(err: SignalError) -> Self {
        Self::Signal(err)
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
