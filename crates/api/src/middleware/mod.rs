//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- user from a JWT Bearer token in `Authorization`.
//! - [`auth::WsUser`] -- user from a `?token=` query parameter (browsers
//!   cannot set headers on WebSocket upgrades) or a Bearer header.
//! - [`rbac::RequireAdmin`] -- rejects non-admin users with 403.

pub mod auth;
pub mod rbac;
