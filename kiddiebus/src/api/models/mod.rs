//! API request/response models.
//!
//! These are the serde-facing types exchanged with HTTP clients. Conversions
//! from the `db::models` layer live next to each response type.

pub mod boardings;
pub mod buses;
pub mod notifications;
pub mod routes;
pub mod schools;
pub mod students;
pub mod users;
