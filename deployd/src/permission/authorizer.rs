//! Authorization seam
//!
//! Evaluating permissions belongs to the platform's auth service; the engine
//! only asks whether a user holds a scheme in one of a target's contexts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::DeployError;
use crate::permission::scheme::{PermissionContext, PermissionScheme};

/// A scheme granted in a context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub scheme: PermissionScheme,
    pub context: PermissionContext,
}

impl Permission {
    pub fn new(scheme: PermissionScheme, context: PermissionContext) -> Self {
        Self { scheme, context }
    }

    pub fn global(scheme: PermissionScheme) -> Self {
        Self::new(scheme, PermissionContext::Global)
    }

    pub fn allows(&self, scheme: PermissionScheme, contexts: &[PermissionContext]) -> bool {
        scheme.is_covered_by(self.scheme)
            && (self.context == PermissionContext::Global || contexts.contains(&self.context))
    }
}

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,

    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            permissions: Vec::new(),
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }
}

/// External permission evaluator
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn is_allowed(
        &self,
        user: &User,
        scheme: PermissionScheme,
        contexts: &[PermissionContext],
    ) -> Result<bool, DeployError>;
}

/// Evaluates the grants carried by the user itself
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantAuthorizer;

impl GrantAuthorizer {
    pub fn allows(user: &User, scheme: PermissionScheme, contexts: &[PermissionContext]) -> bool {
        user.permissions.iter().any(|p| p.allows(scheme, contexts))
    }
}

#[async_trait]
impl Authorizer for GrantAuthorizer {
    async fn is_allowed(
        &self,
        user: &User,
        scheme: PermissionScheme,
        contexts: &[PermissionContext],
    ) -> Result<bool, DeployError> {
        Ok(Self::allows(user, scheme, contexts))
    }
}
