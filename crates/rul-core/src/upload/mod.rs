//! Upload Ingestor.
//!
//! Uploads are persisted to a request-scoped [`TransientUpload`], read back,
//! parsed and validated into an [`UploadedFeatureSet`]. The transient file is
//! deleted on every exit path.

mod feature_set;
mod ingestor;
mod transient;

pub use feature_set::{parse_feature_document, UploadedFeatureSet};
pub use ingestor::{IngestedUpload, UploadIngestor};
pub use transient::TransientUpload;
