//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with PostgreSQL.
//! It follows the Repository pattern: each table gets a repository in
//! [`handlers`] that encapsulates every query touching that table, with the
//! row structures living in [`models`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries & constraints)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! Repositories borrow a `PgConnection`, so callers decide the transaction
//! scope. Multi-row writes that must be atomic (the notification fan-out)
//! open their own transaction internally.
//!
//! Migrations live in `migrations/` and are exposed via [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
