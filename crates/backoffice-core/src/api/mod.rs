//! REST API access for the back office.
//!
//! This module provides:
//! - `RequestOptions`: Method, body and headers for an authenticated request
//! - `AdminApi`: Typed helpers for records, dashboard, reports and profile
//! - `ApiError`: Transport and status errors
//!
//! The backend authenticates with a bearer token obtained from the login
//! endpoint; see `auth::SessionManager`.

pub mod client;
pub mod error;
pub mod request;

pub use client::{AdminApi, Dashboard};
pub use error::ApiError;
pub use request::{RequestBody, RequestOptions};
