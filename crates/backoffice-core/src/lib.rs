//! Core library for the AS Denim back office console.
//!
//! The centre of the crate is [`auth::SessionManager`], which owns the admin's
//! bearer token and profile, injects credentials into every request, ends the
//! session on a 401 or after a period of inactivity, and guarantees a single
//! logout no matter how many triggers race. [`api::AdminApi`] layers typed
//! calls for the back office endpoints on top of it.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{AdminApi, ApiError, RequestOptions};
pub use auth::{ActivityKind, SessionManager};
pub use config::{Config, SessionSettings};
