//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`]: any authenticated rider or captain.
//! - [`rbac::RequireRider`] / [`rbac::RequireCaptain`]: role-gated wrappers.

pub mod auth;
pub mod rbac;
