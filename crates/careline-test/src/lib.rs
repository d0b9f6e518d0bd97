//! Shared fake collaborators for `careline-workflows` tests.
//!
//! This crate follows the teacher's own `astrid-test` shape: a dedicated
//! fixtures crate holding hand-written fakes for the one external
//! collaborator the workflow layer depends on (`BackendClient`), built with
//! the same `with_*` builder idiom used throughout this workspace, rather
//! than a mocking-framework macro.

#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::unwrap_used)]

pub mod fake_backend;

pub use fake_backend::FakeBackend;
