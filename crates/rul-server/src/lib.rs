//! RUL Dashboard HTTP Backend
//!
//! Axum service exposing the evaluation store and the inference engine
//! from `rul-core`.
//!
//! # Routes
//!
//! - `GET /api/data`
//! - `GET /api/series?stride=N`
//! - `POST /api/rul` (multipart: `file`, optional `model_name`)
//! - `GET /api/health`

pub mod handlers;
pub mod logging;
pub mod response;
pub mod router;
pub mod server;
pub mod state;

pub use router::create_router;
pub use server::RulServer;
pub use state::AppState;
