//! Shared shutdown signal for the reconciliation loop and the CLI control loop.

pub use tokio_util::sync::CancellationToken;
