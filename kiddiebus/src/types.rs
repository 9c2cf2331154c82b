//! Common type definitions.
//!
//! All entity IDs are UUIDs wrapped in type aliases for better type safety:
//!
//! - [`UserId`]: parent, operator, or admin account identifier
//! - [`BusId`]: vehicle identifier
//! - [`RouteId`]: route identifier
//! - [`SchoolId`]: school identifier
//! - [`StudentId`]: student identifier
//! - [`BoardingId`]: boarding event identifier
//! - [`NotificationId`]: notification row identifier

use uuid::Uuid;

pub type UserId = Uuid;
pub type BusId = Uuid;
pub type RouteId = Uuid;
pub type SchoolId = Uuid;
pub type StudentId = Uuid;
pub type BoardingId = Uuid;
pub type NotificationId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}
