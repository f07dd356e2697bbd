//! # test-disposables
//!
//! Test-lifecycle disposal helpers: register cleanup actions that run after
//! a test completes, group them with ordering constraints, budget teardown
//! time from per-item timeouts, and track whether an object's timeout was
//! already adjusted.
//!
//! ## Features
//!
//! - **Per-test fixtures**: each test owns a [`DisposalFixture`]; nothing is
//!   process-global, so parallel tests stay isolated
//! - **Ordered groups**: cleanups run in group order, then registration
//!   order, each awaited to completion before the next starts
//! - **Timeout budgeting**: every item carries a timeout (explicit or
//!   default) enforced during disposal; the pending sum is exposed so a
//!   harness can extend its own budget
//! - **Init-then-dispose**: [`DisposalFixture::init_and_dispose_after`]
//!   registers cleanup before initialization, so a failed `init` still gets
//!   torn down
//! - **Loud failures**: a failing teardown reports the pending list through
//!   `tracing` and fails the test instead of swallowing the error
//!
//! ## Quick Start
//!
//! ```
//! use test_disposables::{BoxError, DisposalFixture, GroupConstraint, DEFAULT_DISPOSAL_GROUP};
//! use std::sync::{Arc, Mutex};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let order = Arc::new(Mutex::new(Vec::new()));
//!
//! let order_in_test = order.clone();
//! let result: Result<(), BoxError> = DisposalFixture::run("demo", |fixture| async move {
//!     // Sockets close before everything else.
//!     fixture.create_disposal_group("sockets", [GroupConstraint::before(DEFAULT_DISPOSAL_GROUP)])?;
//!
//!     let o = order_in_test.clone();
//!     fixture.dispose_after_sync(move || o.lock().unwrap().push("drop tables"), "drop tables")?;
//!
//!     let o = order_in_test.clone();
//!     fixture.dispose_after_sync(
//!         move || o.lock().unwrap().push("close socket"),
//!         test_disposables::DisposalOptions::new("close socket").in_group("sockets"),
//!     )?;
//!     Ok(())
//! })
//! .await;
//!
//! result.unwrap();
//! assert_eq!(*order.lock().unwrap(), vec!["close socket", "drop tables"]);
//! # });
//! ```
//!
//! ## Adjusted-timeout markers
//!
//! Some suites bump a step's timeout once and must not bump it again.
//! [`AdjustedTimeouts`] keeps that flag outside the object, keyed on
//! identity:
//!
//! ```
//! use std::sync::Arc;
//! use test_disposables::AdjustedTimeouts;
//!
//! let adjusted = AdjustedTimeouts::new();
//! let step = Arc::new("slow step");
//! assert!(!adjusted.is_marked(&step));
//! adjusted.mark(&step);
//! assert!(adjusted.is_marked(&step));
//! ```

pub mod error;
pub mod fixture;
pub mod item;
pub mod markers;
pub mod registry;
pub mod traits;

pub use error::{BoxError, DisposalError, DisposalResult};
pub use fixture::DisposalFixture;
pub use item::{DisposalItem, DisposalOptions, DEFAULT_ITEM_TIMEOUT};
pub use markers::AdjustedTimeouts;
pub use registry::{
    DisposalSummary, Disposables, GroupConstraint, GroupSummary, ItemSummary,
    DEFAULT_DISPOSAL_GROUP,
};
pub use traits::{AsyncDispose, AsyncInit};
