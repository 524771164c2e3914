//! Challenge-widget lifecycle: the singleton verifier, its state machine,
//! and failure classification.
//!
//! State machine: `Empty -> Rendering -> Ready`, with expiry, widget error,
//! and explicit cleanup all returning to `Empty`. A render conflict also
//! lands in `Empty` after a forced teardown; there is no terminal state.

pub mod handle;
pub mod manager;
pub mod retry;

pub use handle::{VerifierHandle, WidgetMode};
pub use manager::{ManagerConfig, VerifierManager, WidgetCallbacks};
pub use retry::{FailureClass, RetryPolicy};
