//! Permission schemes and authorization seam

pub mod authorizer;
pub mod scheme;

pub use authorizer::{Authorizer, GrantAuthorizer, Permission, User};
pub use scheme::{scheme_for_deploy, PermissionContext, PermissionScheme};
