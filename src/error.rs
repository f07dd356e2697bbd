//! Error types for disposal registration and teardown.

use std::fmt;
use std::time::Duration;

/// Boxed error payload carried by user-supplied dispose and init callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while registering or executing disposal work.
///
/// Registration errors (`DuplicateGroup`, `UnknownGroup`, and friends)
/// surface synchronously from the registering call and fail the current test
/// immediately. Execution errors (`Timeout`, `DisposeFailed`) surface from
/// [`Disposables::dispose`](crate::Disposables::dispose) during teardown.
///
/// # Examples
///
/// ```
/// use test_disposables::{Disposables, DisposalError, GroupConstraint, DEFAULT_DISPOSAL_GROUP};
///
/// let disposables = Disposables::new("example");
/// disposables
///     .register_group("io", [GroupConstraint::before(DEFAULT_DISPOSAL_GROUP)])
///     .unwrap();
///
/// // Group names are unique.
/// let err = disposables
///     .register_group("io", [GroupConstraint::before(DEFAULT_DISPOSAL_GROUP)])
///     .unwrap_err();
/// assert!(matches!(err, DisposalError::DuplicateGroup(name) if name == "io"));
/// ```
#[derive(Debug)]
pub enum DisposalError {
    /// A group with this name is already registered
    DuplicateGroup(String),
    /// A constraint or item referenced a group that does not exist
    UnknownGroup(String),
    /// A group was registered without any ordering constraint
    EmptyConstraints(String),
    /// Before/after constraints cannot be satisfied simultaneously
    ConstraintConflict {
        /// The group being registered
        group: String,
        /// Which constraints collided
        detail: String,
    },
    /// A pending item with this name already exists
    DuplicateItem(String),
    /// An item was registered with a zero timeout
    InvalidTimeout(String),
    /// An item's dispose callback exceeded its timeout
    Timeout {
        /// The item that timed out
        name: String,
        /// The enforced budget
        after: Duration,
    },
    /// An item's dispose callback returned an error
    DisposeFailed {
        /// The item that failed
        name: String,
        /// The callback's error
        source: BoxError,
    },
    /// An `init_and_dispose_after` target failed to initialize
    InitFailed {
        /// The registered disposal name of the target
        name: String,
        /// The init error
        source: BoxError,
    },
}

impl fmt::Display for DisposalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisposalError::DuplicateGroup(name) => {
                write!(f, "disposal group already exists: {}", name)
            }
            DisposalError::UnknownGroup(name) => {
                write!(f, "unknown disposal group: {}", name)
            }
            DisposalError::EmptyConstraints(name) => {
                write!(f, "group {} requires at least one ordering constraint", name)
            }
            DisposalError::ConstraintConflict { group, detail } => {
                write!(f, "conflicting constraints for group {}: {}", group, detail)
            }
            DisposalError::DuplicateItem(name) => {
                write!(f, "disposal item already pending: {}", name)
            }
            DisposalError::InvalidTimeout(name) => {
                write!(f, "disposal item {} has a zero timeout", name)
            }
            DisposalError::Timeout { name, after } => {
                write!(f, "disposal of {} timed out after {:?}", name, after)
            }
            DisposalError::DisposeFailed { name, source } => {
                write!(f, "disposal of {} failed: {}", name, source)
            }
            DisposalError::InitFailed { name, source } => {
                write!(f, "init of {} failed: {}", name, source)
            }
        }
    }
}

impl std::error::Error for DisposalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DisposalError::DisposeFailed { source, .. }
            | DisposalError::InitFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type for disposal operations
///
/// A convenience alias for `Result<T, DisposalError>` used throughout the
/// crate.
pub type DisposalResult<T> = Result<T, DisposalError>;
