//! Test doubles for the store seam and the model artifact.
//!
//! Everything here is gated on `#[cfg(any(test, feature = "test-utils"))]`.
//! Downstream test crates opt in with:
//!
//! ```toml
//! [dev-dependencies]
//! rul-core = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! - [`InMemoryEvaluationSource`]: rows from a vector, with injectable
//!   connection and query failures and connection accounting
//! - [`write_dense_artifact`]: writes a tiny dense artifact to a directory

mod artifact_stub;
mod evaluation_stub;

pub use artifact_stub::write_dense_artifact;
pub use evaluation_stub::{InMemoryEvaluationSource, StubFailure};
