//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Registration, login, token refresh, current account and attempt history.
pub mod auth;
/// Health check handlers.
pub mod health;
/// Role and permission listings, role assignment.
pub mod roles;
