//! Builder lookup by deploy kind

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::builder::{BuildContext, Builder};
use crate::errors::BuildError;
use crate::models::deploy::DeployKind;
use crate::models::version::AppVersion;

/// Routes a build to the backend registered for its kind
#[derive(Default, Clone)]
pub struct BuilderDispatch {
    builders: HashMap<DeployKind, Arc<dyn Builder>>,
}

impl BuilderDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: DeployKind, builder: Arc<dyn Builder>) {
        self.builders.insert(kind, builder);
    }

    pub fn with(mut self, kind: DeployKind, builder: Arc<dyn Builder>) -> Self {
        self.register(kind, builder);
        self
    }

    pub fn supports(&self, kind: DeployKind) -> bool {
        self.builders.contains_key(&kind)
    }

    pub async fn build(&self, ctx: BuildContext<'_>) -> Result<AppVersion, BuildError> {
        let builder = self
            .builders
            .get(&ctx.kind)
            .ok_or(BuildError::NoBuilder(ctx.kind))?;
        debug!("Dispatching {} build of app {}", ctx.kind, ctx.app.name);
        builder.build(ctx).await
    }
}
