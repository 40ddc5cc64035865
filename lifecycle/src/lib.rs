//! # Lifecycle
//!
//! Cancellation and timeout primitives for bounding pending calls.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: Cancellation is explicit, not hidden
//! - **Mechanism not policy**: Provides primitives, callers decide policies
//! - **First reason wins**: Once cancelled, a token stays cancelled for the same reason
//!
//! ## Core Concepts
//!
//! - `CancellationToken`: Cloneable handle to check or await cancellation
//! - `CancellationSource`: Controller that can trigger cancellation
//! - `CancellationReason`: Why cancellation occurred
//! - `Deadline`: Point in time when an operation should time out
//! - `Timeout`: Duration-based timeout, converted to a deadline when armed

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Reason for cancellation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancellationReason {
    /// User-initiated cancellation
    UserCancel,
    /// Operation timed out
    Timeout,
    /// Owner of the operation shut down
    SupervisorCancel,
    /// Custom reason with description
    Custom(String),
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancellationReason::UserCancel => write!(f, "user cancelled"),
            CancellationReason::Timeout => write!(f, "timeout"),
            CancellationReason::SupervisorCancel => write!(f, "supervisor cancelled"),
            CancellationReason::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

/// A cloneable token that can be checked or awaited for cancellation
///
/// ## Example
///
/// ```
/// use lifecycle::{CancellationSource, CancellationReason};
///
/// let source = CancellationSource::new();
/// let token = source.token();
///
/// assert!(!token.is_cancelled());
///
/// source.cancel(CancellationReason::UserCancel);
/// assert!(token.is_cancelled());
/// assert_eq!(token.reason(), Some(CancellationReason::UserCancel));
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    state: watch::Receiver<Option<CancellationReason>>,
}

impl CancellationToken {
    /// Creates a new token that is never cancelled
    ///
    /// Useful for operations that don't support cancellation.
    pub fn none() -> Self {
        let (_, state) = watch::channel(None);
        Self { state }
    }

    /// Checks if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Returns the reason for cancellation, if cancelled
    pub fn reason(&self) -> Option<CancellationReason> {
        self.state.borrow().clone()
    }

    /// Returns an error if cancelled
    pub fn throw_if_cancelled(&self) -> Result<(), LifecycleError> {
        match self.reason() {
            Some(reason) => Err(LifecycleError::Cancelled { reason }),
            None => Ok(()),
        }
    }

    /// Waits until the token is cancelled and returns the reason
    ///
    /// Never resolves for a token whose source is gone without cancelling.
    pub async fn cancelled(&self) -> CancellationReason {
        let mut state = self.state.clone();
        let reason = match state.wait_for(Option::is_some).await {
            Ok(reason) => reason.clone(),
            Err(_) => None,
        };
        match reason {
            Some(reason) => reason,
            None => std::future::pending().await,
        }
    }
}

/// A controller that can trigger cancellation
///
/// ## Example
///
/// ```
/// use lifecycle::{CancellationSource, CancellationReason};
///
/// let source = CancellationSource::new();
/// let token1 = source.token();
/// let token2 = source.token();
///
/// // Both tokens see the same cancellation
/// source.cancel(CancellationReason::Timeout);
/// assert!(token1.is_cancelled());
/// assert!(token2.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationSource {
    state: Arc<watch::Sender<Option<CancellationReason>>>,
}

impl CancellationSource {
    /// Creates a new cancellation source
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state: Arc::new(state),
        }
    }

    /// Creates a token from this source
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            state: self.state.subscribe(),
        }
    }

    /// Cancels all tokens from this source
    ///
    /// Later calls keep the first reason.
    pub fn cancel(&self, reason: CancellationReason) {
        self.state.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(reason);
            true
        });
    }

    /// Checks if this source has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.state.borrow().is_some()
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

/// A deadline represents a point in time when an operation should time out
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline {
    instant: Instant,
}

impl Deadline {
    /// Creates a deadline at the specified instant
    pub fn at(instant: Instant) -> Self {
        Self { instant }
    }

    /// Returns the instant of this deadline
    pub fn instant(&self) -> Instant {
        self.instant
    }

    /// Checks if the deadline has passed
    pub fn has_passed(&self, now: Instant) -> bool {
        now >= self.instant
    }

    /// Returns time remaining until deadline
    ///
    /// Returns None if deadline has passed.
    pub fn time_remaining(&self, now: Instant) -> Option<Duration> {
        if now < self.instant {
            Some(self.instant.duration_since(now))
        } else {
            None
        }
    }
}

/// Timeout specifies a duration-based timeout
///
/// Unlike Deadline, Timeout is relative and needs to be converted to a
/// Deadline for actual use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    duration: Duration,
}

impl Timeout {
    /// Creates a timeout with the specified duration
    pub fn after(duration: Duration) -> Self {
        Self { duration }
    }

    /// Creates a timeout from milliseconds
    pub fn from_millis(millis: u64) -> Self {
        Self::after(Duration::from_millis(millis))
    }

    /// Creates a timeout from seconds
    pub fn from_secs(secs: u64) -> Self {
        Self::after(Duration::from_secs(secs))
    }

    /// Returns the duration of this timeout
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Converts this timeout to a deadline starting from `now`
    ///
    /// Returns None when the deadline lies beyond what an `Instant` can
    /// represent, which callers treat as no deadline at all.
    pub fn to_deadline(&self, now: Instant) -> Option<Deadline> {
        now.checked_add(self.duration).map(Deadline::at)
    }
}

/// Errors related to lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Operation was cancelled: {reason}")]
    Cancelled { reason: CancellationReason },

    #[error("Operation timed out")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_none() {
        let token = CancellationToken::none();
        assert!(!token.is_cancelled());
        assert_eq!(token.reason(), None);
    }

    #[test]
    fn test_cancellation_source_basic() {
        let source = CancellationSource::new();
        let token = source.token();

        assert!(!token.is_cancelled());
        assert!(!source.is_cancelled());

        source.cancel(CancellationReason::UserCancel);

        assert!(token.is_cancelled());
        assert!(source.is_cancelled());
        assert_eq!(token.reason(), Some(CancellationReason::UserCancel));
    }

    #[test]
    fn test_first_reason_wins() {
        let source = CancellationSource::new();
        let token = source.token();

        source.cancel(CancellationReason::Timeout);
        source.cancel(CancellationReason::UserCancel);

        assert_eq!(token.reason(), Some(CancellationReason::Timeout));
    }

    #[test]
    fn test_token_created_after_cancel() {
        let source = CancellationSource::new();
        source.cancel(CancellationReason::SupervisorCancel);
        assert!(source.token().is_cancelled());
    }

    #[test]
    fn test_cancellation_reason_display() {
        assert_eq!(CancellationReason::UserCancel.to_string(), "user cancelled");
        assert_eq!(CancellationReason::Timeout.to_string(), "timeout");
        assert_eq!(
            CancellationReason::SupervisorCancel.to_string(),
            "supervisor cancelled"
        );
        assert_eq!(
            CancellationReason::Custom("test".to_string()).to_string(),
            "test"
        );
    }

    #[test]
    fn test_throw_if_cancelled() {
        let source = CancellationSource::new();
        let token = source.token();

        assert!(token.throw_if_cancelled().is_ok());

        source.cancel(CancellationReason::UserCancel);
        match token.throw_if_cancelled() {
            Err(LifecycleError::Cancelled { reason }) => {
                assert_eq!(reason, CancellationReason::UserCancel);
            }
            other => panic!("Expected Cancelled error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_resolves_after_cancel() {
        let source = CancellationSource::new();
        let token = source.token();

        let waiter = tokio::spawn(async move { token.cancelled().await });
        tokio::task::yield_now().await;
        source.cancel(CancellationReason::Custom("shutdown".to_string()));

        let reason = waiter.await.unwrap();
        assert_eq!(reason, CancellationReason::Custom("shutdown".to_string()));
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_when_already_cancelled() {
        let source = CancellationSource::new();
        source.cancel(CancellationReason::UserCancel);
        assert_eq!(source.token().cancelled().await, CancellationReason::UserCancel);
    }

    #[tokio::test(start_paused = true)]
    async fn test_none_token_never_resolves() {
        let token = CancellationToken::none();
        let result = tokio::time::timeout(Duration::from_secs(60), token.cancelled()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_deadline_basic() {
        let now = Instant::now();
        let deadline = Deadline::at(now + Duration::from_millis(10));

        assert!(!deadline.has_passed(now));
        assert!(deadline.has_passed(now + Duration::from_millis(10)));
        assert!(deadline.has_passed(now + Duration::from_millis(20)));
    }

    #[test]
    fn test_deadline_time_remaining() {
        let now = Instant::now();
        let deadline = Deadline::at(now + Duration::from_millis(10));

        assert_eq!(deadline.time_remaining(now), Some(Duration::from_millis(10)));
        assert_eq!(deadline.time_remaining(now + Duration::from_millis(10)), None);
        assert_eq!(deadline.time_remaining(now + Duration::from_millis(30)), None);
    }

    #[test]
    fn test_timeout_basic() {
        assert_eq!(Timeout::from_millis(100).duration(), Duration::from_millis(100));
        assert_eq!(Timeout::from_secs(5).duration(), Duration::from_secs(5));
        assert_eq!(
            Timeout::after(Duration::from_millis(500)).duration(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_timeout_to_deadline() {
        let now = Instant::now();
        let deadline = Timeout::from_millis(100).to_deadline(now).unwrap();

        assert_eq!(deadline.instant(), now + Duration::from_millis(100));
        assert!(!deadline.has_passed(now));
    }

    #[test]
    fn test_unrepresentable_timeout_has_no_deadline() {
        let now = Instant::now();
        assert_eq!(Timeout::after(Duration::MAX).to_deadline(now), None);
    }

    #[test]
    fn test_lifecycle_error_display() {
        let err = LifecycleError::Cancelled {
            reason: CancellationReason::UserCancel,
        };
        assert_eq!(err.to_string(), "Operation was cancelled: user cancelled");
        assert_eq!(LifecycleError::Timeout.to_string(), "Operation timed out");
    }
}
