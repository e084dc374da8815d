//! Validators for the halconfig tree.
//!
//! Each provider module registers its validators into [`VALIDATORS`], so
//! supporting a new provider never touches a central list. [`registry`]
//! collects every registration into a [`ValidatorRegistry`].

mod appengine;
mod deployment;
mod file;
mod google;
mod provider;

use std::fmt;
use std::sync::Arc;

use halyard_config::Accept;
use halyard_config::ValidatorRegistry;
use linkme::distributed_slice;

pub use appengine::AppengineAccountValidator;
pub use appengine::AppengineAdmin;
pub use appengine::AppengineCredentials;
pub use deployment::DeploymentValidator;
pub use google::GoogleAccountValidator;
pub use google::GoogleCompute;
pub use google::GoogleCredentials;
pub use google::GoogleCredentialsRequest;
pub use provider::ProviderValidator;

use crate::model::Halconfig;
use crate::model::Providers;
use crate::model::Webhooks;

/// Everything validators need from outside the configuration itself.
///
/// Clients are optional; without one the live checks of that provider are
/// skipped.
#[derive(Clone)]
pub struct ValidatorContext {
    /// Version of `hal`, used in the application name sent to providers
    pub version: String,
    pub google: Option<Arc<dyn GoogleCredentials>>,
    pub appengine: Option<Arc<dyn AppengineCredentials>>,
}

impl ValidatorContext {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            google: None,
            appengine: None,
        }
    }

    pub fn with_google(mut self, credentials: Arc<dyn GoogleCredentials>) -> Self {
        self.google = Some(credentials);
        self
    }

    pub fn with_appengine(mut self, credentials: Arc<dyn AppengineCredentials>) -> Self {
        self.appengine = Some(credentials);
        self
    }

    /// Application name reported to provider APIs.
    pub fn application_name(&self) -> String {
        format!("halyard {}", self.version)
    }
}

impl Default for ValidatorContext {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}

impl fmt::Debug for ValidatorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorContext")
            .field("version", &self.version)
            .field("google", &self.google.is_some())
            .field("appengine", &self.appengine.is_some())
            .finish()
    }
}

/// Validator registrations, one entry per node family.
#[distributed_slice]
pub static VALIDATORS: [fn(&ValidatorContext, &mut ValidatorRegistry)];

#[distributed_slice(VALIDATORS)]
fn register_structure(_ctx: &ValidatorContext, registry: &mut ValidatorRegistry) {
    registry
        .register::<Halconfig, _>(Accept)
        .register::<Providers, _>(Accept)
        .register::<Webhooks, _>(Accept);
}

/// Build the registry with every known validator.
pub fn registry(ctx: &ValidatorContext) -> ValidatorRegistry {
    let mut registry = ValidatorRegistry::new();
    for register in VALIDATORS {
        register(ctx, &mut registry);
    }

    tracing::debug!(
        validators = registry.len(),
        google = ctx.google.is_some(),
        appengine = ctx.appengine.is_some(),
        "Built validator registry"
    );
    registry
}
