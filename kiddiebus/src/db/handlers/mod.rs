//! Repository implementations for database access.

pub mod boardings;
pub mod buses;
pub mod notifications;
pub mod repository;
pub mod routes;
pub mod schools;
pub mod students;
pub mod users;

pub use boardings::Boardings;
pub use buses::Buses;
pub use notifications::Notifications;
pub use repository::Repository;
pub use routes::Routes;
pub use schools::Schools;
pub use students::Students;
pub use users::Users;
