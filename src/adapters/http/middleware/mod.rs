//! HTTP middleware for axum.
//!
//! - `auth` - Bearer token middleware and extractors

pub mod auth;

pub use auth::{auth_middleware, AuthRejection, AuthState, RequireAuth};
