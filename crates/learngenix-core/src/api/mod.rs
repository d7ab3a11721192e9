//! REST API client module for the LearnGenix backend.
//!
//! This module provides the `ApiClient`, the single place HTTP requests to
//! the backend are built. It attaches the stored bearer token, maps failed
//! responses to `ApiError`, and decodes every success body into its model
//! type.
//!
//! The backend issues JWT bearer tokens from an OAuth2 password-grant style
//! login endpoint.

pub mod client;
pub mod endpoints;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
