//! Disposal items: named units of cleanup work.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::BoxError;

/// Timeout applied to items that do not carry an explicit one.
///
/// Used both when enforcing an item's budget during disposal and when
/// summing the pending total in
/// [`DisposalSummary::total_timeout`](crate::DisposalSummary).
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(10);

/// Future type returned by boxed dispose callbacks.
pub(crate) type DisposeFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;

/// Boxed dispose callback, invoked at most once.
pub(crate) type DisposeFn = Box<dyn FnOnce() -> DisposeFuture + Send>;

/// Registration options for a disposal item: its name, an optional timeout,
/// and an optional target group.
///
/// A plain `&str` or `String` converts into name-only options, mirroring the
/// common case of registering a cleanup with just a label:
///
/// ```
/// use std::time::Duration;
/// use test_disposables::DisposalOptions;
///
/// let simple: DisposalOptions = "close server".into();
/// assert_eq!(simple.name(), "close server");
///
/// let full = DisposalOptions::new("drop tables")
///     .with_timeout(Duration::from_millis(500))
///     .in_group("db");
/// assert_eq!(full.group(), Some("db"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisposalOptions {
    pub(crate) name: String,
    pub(crate) timeout: Option<Duration>,
    pub(crate) group: Option<String>,
}

impl DisposalOptions {
    /// Creates name-only options; the item lands in the default group with
    /// [`DEFAULT_ITEM_TIMEOUT`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout: None,
            group: None,
        }
    }

    /// Sets the per-item disposal budget. Must be non-zero; a zero value is
    /// rejected when the item is added to the registry.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Assigns the item to a named group. The group must already be
    /// registered when the item is added.
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// The item's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The explicit timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The target group, if any.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// The timeout that will actually be enforced and budgeted.
    pub(crate) fn effective_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_ITEM_TIMEOUT)
    }
}

impl From<&str> for DisposalOptions {
    fn from(name: &str) -> Self {
        DisposalOptions::new(name)
    }
}

impl From<String> for DisposalOptions {
    fn from(name: String) -> Self {
        DisposalOptions::new(name)
    }
}

/// A named unit of cleanup work, pending in the registry until disposed.
pub struct DisposalItem {
    pub(crate) options: DisposalOptions,
    pub(crate) dispose: DisposeFn,
}

impl DisposalItem {
    /// Creates an item from an async dispose callback.
    pub fn new<F, Fut>(options: impl Into<DisposalOptions>, dispose: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self {
            options: options.into(),
            dispose: Box::new(move || Box::pin(dispose())),
        }
    }

    /// Creates an item from a plain synchronous callback.
    pub fn new_sync<F>(options: impl Into<DisposalOptions>, dispose: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            options: options.into(),
            dispose: Box::new(move || {
                dispose();
                Box::pin(std::future::ready(Ok::<(), BoxError>(())))
            }),
        }
    }

    /// The item's registration options.
    pub fn options(&self) -> &DisposalOptions {
        &self.options
    }
}

impl std::fmt::Debug for DisposalItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposalItem")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_options_are_name_only() {
        let opts: DisposalOptions = String::from("n").into();
        assert_eq!(opts.name(), "n");
        assert_eq!(opts.timeout(), None);
        assert_eq!(opts.group(), None);
        assert_eq!(opts.effective_timeout(), DEFAULT_ITEM_TIMEOUT);
    }

    #[test]
    fn explicit_timeout_wins_over_default() {
        let opts = DisposalOptions::new("n").with_timeout(Duration::from_millis(50));
        assert_eq!(opts.effective_timeout(), Duration::from_millis(50));
    }
}
