//! Async seams for targets managed by `init_and_dispose_after`.

use async_trait::async_trait;

use crate::error::BoxError;

/// Trait for asynchronous resource disposal.
///
/// Implement this for services whose teardown needs awaiting (closing
/// connections, stopping child processes). Targets passed to
/// [`DisposalFixture::init_and_dispose_after`](crate::DisposalFixture::init_and_dispose_after)
/// have their `dispose` registered before `init` runs.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use test_disposables::{AsyncDispose, BoxError};
///
/// struct Server { port: u16 }
///
/// #[async_trait]
/// impl AsyncDispose for Server {
///     async fn dispose(&self) -> Result<(), BoxError> {
///         // Shut the listener down...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Perform asynchronous cleanup of resources.
    async fn dispose(&self) -> Result<(), BoxError>;
}

/// Trait for asynchronous initialization with caller-supplied arguments.
///
/// `Args` carries whatever the target needs to start (use a tuple for more
/// than one value, `()` for none); `Output` is handed back to the caller of
/// `init_and_dispose_after`.
#[async_trait]
pub trait AsyncInit<Args = ()>: Send + Sync + 'static
where
    Args: Send + 'static,
{
    /// Value produced by a successful initialization.
    type Output: Send;

    /// Initialize the target.
    async fn init(&self, args: Args) -> Result<Self::Output, BoxError>;
}
