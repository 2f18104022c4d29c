//! RUL Dashboard Core Library
//!
//! Domain logic behind the RUL dashboard service:
//!
//! - [`evaluation`]: persisted evaluation records, typed decoding and
//!   display downsampling
//! - [`upload`]: request-scoped feature uploads
//! - [`inference`]: the single pretrained artifact and its engine
//! - [`config`] and [`error`]: configuration and the error taxonomy
//!
//! # Example
//!
//! ```
//! use rul_core::upload::parse_feature_document;
//!
//! let set = parse_feature_document(br#"{"data": [[1, 2], [3, 4]], "features": 2}"#).unwrap();
//! assert_eq!(set.row_count(), 2);
//! ```

pub mod config;
pub mod error;
pub mod evaluation;
pub mod inference;
pub mod upload;

#[cfg(any(test, feature = "test-utils"))]
pub mod stubs;

// Re-exports for convenience
pub use config::Config;
pub use error::{ErrorClass, RulError, RulResult};
