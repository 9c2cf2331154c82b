//! Database record structures matching table schemas.

pub mod boardings;
pub mod buses;
pub mod notifications;
pub mod routes;
pub mod schools;
pub mod students;
pub mod users;
