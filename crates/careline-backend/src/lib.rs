//! Hospital backend client, RBAC enforcement, retry handling, and circuit
//! breaking for the Careline voice receptionist orchestrator.
//!
//! This crate has no opinion on dialog or workflow logic; it exposes a
//! single [`BackendClient`] trait that the workflow layer depends on, plus
//! an [`HttpBackendClient`] implementation backed by `reqwest`.

#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod auth;
pub mod circuit_breaker;
pub mod client;
pub mod error;
pub mod rbac;
pub mod retry;
pub mod types;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use client::{BackendClient, HttpBackendClient};
pub use error::{BackendError, BackendResult};
pub use retry::RetryHandler;
