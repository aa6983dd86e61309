//! Relational persistence.
//!
//! A single [`TursoClient`] backs every entity: users, addresses,
//! institutions and classrooms. It opens a local SQLite file by default,
//! an in-memory database for tests, or a remote Turso database when the
//! `turso` feature is enabled.
//!
//! Constraint violations surface as typed errors: a duplicate unique key
//! becomes [`AppError::Conflict`](crate::types::AppError::Conflict), a
//! missing referenced row becomes `NotFound`, and deleting a row that is
//! still referenced becomes `Conflict`.

#![allow(missing_docs)]

pub mod turso;

pub use turso::{NewUser, TursoClient, User, GUEST_USERNAME};
