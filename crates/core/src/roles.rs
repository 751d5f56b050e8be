//! Role names carried in access tokens.

/// Can view, start and cancel any user's jobs, and delete jobs that are not
/// processing.
pub const ROLE_ADMIN: &str = "admin";

pub const ROLE_USER: &str = "user";
