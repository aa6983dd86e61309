//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by entity. Every
//! handler validates its body, consults the authorization policy and only then
//! touches the database.

/// Address CRUD handlers.
pub mod addresses;
/// Session handlers (sign-up, sign-in, renewal, terms acceptance).
pub mod auth;
/// Classroom CRUD handlers.
pub mod classrooms;
/// Institution CRUD handlers.
pub mod institutions;
/// User account handlers.
pub mod users;
