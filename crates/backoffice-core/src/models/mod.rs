//! Data models for the back office API.
//!
//! This module contains the types exchanged with the backend:
//!
//! - `user`: The signed-in admin profile and the login/profile payloads
//! - `resource`: The record collections an admin can manage

pub mod resource;
pub mod user;

pub use resource::Resource;
pub use user::{LoginResponse, ProfileUpdate, UserProfile};
