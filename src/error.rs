//! Unified error types for the motion core.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the service layer's error handling uniform.  All variants are `Copy`
//! so they can be passed through the state handlers without allocation.
//!
//! Aborts are **not** errors: an abort is reported as
//! [`MoveOutcome::Aborted`](crate::motion::MoveOutcome).  Only
//! precondition and configuration violations end up here.

use core::fmt;

use crate::motion::Axis;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A motion request violated a precondition.
    Motion(MotionError),
    /// Configuration is invalid.
    Config(ConfigError),
    /// Homing did not establish zero on every translational axis.
    Homing(HomingFailure),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Motion(e) => write!(f, "motion: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Homing(e) => write!(f, "homing: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Motion errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionError {
    /// Requested speed was zero.
    ZeroSpeed(Axis),
    /// The same logical axis appeared twice in one request.
    DuplicateAxis(Axis),
    /// The request names an axis whose driver is not fitted.
    AxisUnavailable(Axis),
}

impl fmt::Display for MotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSpeed(axis) => write!(f, "zero speed requested for {axis}"),
            Self::DuplicateAxis(axis) => write!(f, "{axis} listed twice in one request"),
            Self::AxisUnavailable(axis) => write!(f, "{axis} driver not fitted"),
        }
    }
}

impl From<MotionError> for Error {
    fn from(e: MotionError) -> Self {
        Self::Motion(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Homing failures
// ---------------------------------------------------------------------------

/// Phase in which a homing run gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingFailure {
    /// At least one home switch never triggered before the timeout.
    SwitchTimeout,
    /// The back-off move did not finish before its timeout.
    MoveAwayTimeout,
}

impl fmt::Display for HomingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SwitchTimeout => write!(f, "home switch wait timed out"),
            Self::MoveAwayTimeout => write!(f, "move away from switches timed out"),
        }
    }
}

impl From<HomingFailure> for Error {
    fn from(e: HomingFailure) -> Self {
        Self::Homing(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
