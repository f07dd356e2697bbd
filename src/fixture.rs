//! Per-test disposal fixture and teardown harness.
//!
//! The original shape of this API hung one process-wide registry off the
//! module and drained it from an after-each hook. Here every test owns its
//! fixture, so parallel tests cannot see each other's cleanups and teardown
//! is an explicit awaited step instead of runner magic.

use std::future::Future;
use std::sync::Arc;

use crate::error::{BoxError, DisposalError, DisposalResult};
use crate::item::{DisposalItem, DisposalOptions};
use crate::registry::{DisposalSummary, Disposables, GroupConstraint};
use crate::traits::{AsyncDispose, AsyncInit};

/// Test-scoped collection of cleanup work, drained after the test body.
///
/// Cloning is cheap and shares the underlying registry, so the fixture can
/// be handed to helpers or spawned tasks while the harness keeps its own
/// handle for teardown.
///
/// # Examples
///
/// ```
/// use test_disposables::DisposalFixture;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
/// let ran_in_test = ran.clone();
///
/// let result: Result<(), test_disposables::BoxError> =
///     DisposalFixture::run("listener test", |fixture| async move {
///         // ... exercise the system under test ...
///         fixture.dispose_after_sync(
///             move || ran_in_test.store(true, std::sync::atomic::Ordering::SeqCst),
///             "remove listener",
///         )?;
///         Ok(())
///     })
///     .await;
///
/// result.unwrap();
/// assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
/// # });
/// ```
#[derive(Clone)]
pub struct DisposalFixture {
    disposables: Arc<Disposables>,
}

impl DisposalFixture {
    /// Creates a fixture with its own empty registry.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            disposables: Arc::new(Disposables::new(label)),
        }
    }

    /// Registers an async cleanup to run at teardown.
    ///
    /// `options` is a plain name or full [`DisposalOptions`]; registry
    /// validation errors (duplicate name, unknown group, zero timeout)
    /// propagate to the caller.
    ///
    /// ```
    /// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
    /// use std::time::Duration;
    /// use test_disposables::{DisposalFixture, DisposalOptions};
    ///
    /// let fixture = DisposalFixture::new("demo");
    /// fixture.dispose_after(
    ///     || async {
    ///         // flush, close, etc.
    ///         Ok(())
    ///     },
    ///     DisposalOptions::new("flush cache").with_timeout(Duration::from_millis(100)),
    /// ).unwrap();
    /// fixture.teardown().await.unwrap();
    /// # });
    /// ```
    pub fn dispose_after<F, Fut>(
        &self,
        dispose: F,
        options: impl Into<DisposalOptions>,
    ) -> DisposalResult<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.disposables.add(DisposalItem::new(options, dispose))
    }

    /// Registers a plain synchronous cleanup to run at teardown.
    pub fn dispose_after_sync<F>(
        &self,
        dispose: F,
        options: impl Into<DisposalOptions>,
    ) -> DisposalResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.disposables
            .add(DisposalItem::new_sync(options, dispose))
    }

    /// Registers a new disposal group with ordering constraints.
    ///
    /// ```
    /// use test_disposables::{DisposalFixture, GroupConstraint, DEFAULT_DISPOSAL_GROUP};
    ///
    /// let fixture = DisposalFixture::new("demo");
    /// fixture
    ///     .create_disposal_group("sockets", [GroupConstraint::before(DEFAULT_DISPOSAL_GROUP)])
    ///     .unwrap();
    /// ```
    pub fn create_disposal_group(
        &self,
        name: impl Into<String>,
        constraints: impl IntoIterator<Item = GroupConstraint>,
    ) -> DisposalResult<()> {
        self.disposables.register_group(name, constraints)
    }

    /// Registers `target` for disposal, then initializes it and returns the
    /// init output.
    ///
    /// Registration happens unconditionally before `init` is attempted, so
    /// cleanup still runs at teardown even when initialization fails
    /// partway. An init failure surfaces as
    /// [`DisposalError::InitFailed`].
    pub async fn init_and_dispose_after<T, Args>(
        &self,
        target: Arc<T>,
        options: impl Into<DisposalOptions>,
        args: Args,
    ) -> DisposalResult<T::Output>
    where
        T: AsyncInit<Args> + AsyncDispose,
        Args: Send + 'static,
    {
        let options = options.into();
        let name = options.name.clone();
        let for_dispose = Arc::clone(&target);
        self.disposables.add(DisposalItem::new(options, move || async move {
            for_dispose.dispose().await
        }))?;
        target
            .init(args)
            .await
            .map_err(|source| DisposalError::InitFailed { name, source })
    }

    /// Snapshot of pending cleanups, including the summed
    /// [`total_timeout`](DisposalSummary::total_timeout) a harness should
    /// budget for teardown.
    pub fn pending(&self) -> DisposalSummary {
        self.disposables.list()
    }

    /// The underlying registry, for callers that want to manage disposables
    /// directly.
    pub fn disposables(&self) -> &Disposables {
        &self.disposables
    }

    /// Disposes everything pending.
    ///
    /// On failure the pre-teardown pending list is reported through
    /// `tracing::error!` for diagnostics and the error is returned, so the
    /// test is marked failed rather than silently leaking.
    pub async fn teardown(&self) -> DisposalResult<()> {
        let pending = self.disposables.list();
        if let Err(err) = self.disposables.dispose().await {
            tracing::error!(
                pending = %pending,
                error = %err,
                "teardown failed; items pending when disposal started"
            );
            return Err(err);
        }
        Ok(())
    }

    /// Runs a test body with a fresh fixture and tears down afterwards.
    ///
    /// Teardown runs whether or not the body succeeded. A body error wins
    /// over a teardown error (the teardown failure is still logged); a
    /// teardown error alone fails the run.
    pub async fn run<T, F, Fut>(label: impl Into<String>, body: F) -> Result<T, BoxError>
    where
        F: FnOnce(DisposalFixture) -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        let fixture = DisposalFixture::new(label);
        let result = body(fixture.clone()).await;
        let teardown = fixture.teardown().await;
        match (result, teardown) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(body_err), _) => Err(body_err),
            (Ok(_), Err(teardown_err)) => Err(teardown_err.into()),
        }
    }
}

impl std::fmt::Debug for DisposalFixture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposalFixture")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn clones_share_one_registry() {
        let fixture = DisposalFixture::new("t");
        let other = fixture.clone();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        other
            .dispose_after_sync(move || { c.fetch_add(1, Ordering::SeqCst); }, "a")
            .unwrap();
        fixture.teardown().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pending_reports_total_budget() {
        let fixture = DisposalFixture::new("t");
        fixture
            .dispose_after_sync(
                || {},
                DisposalOptions::new("a").with_timeout(Duration::from_millis(50)),
            )
            .unwrap();
        fixture
            .dispose_after_sync(
                || {},
                DisposalOptions::new("b").with_timeout(Duration::from_millis(75)),
            )
            .unwrap();
        assert!(fixture.pending().total_timeout >= Duration::from_millis(125));
        fixture.teardown().await.unwrap();
    }
}
