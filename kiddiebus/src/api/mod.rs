//! HTTP API layer.
//!
//! [`models`] holds the request/response types (serde + utoipa schemas),
//! [`handlers`] the axum handlers. Handlers authenticate via the
//! [`crate::api::models::users::CurrentUser`] extractor, authorize via
//! [`crate::auth::scope`], and delegate everything stateful to the
//! repositories in [`crate::db::handlers`].

pub mod handlers;
pub mod models;
