//! The halconfig tree.
//!
//! Everything here is plain data. Nodes are built by the loader in
//! [`crate::config`] and validated by the validators in [`crate::validate`].

mod appengine;
mod google;

use std::any::Any;

use halyard_config::Identity;
use halyard_config::Node;
use halyard_config::NodeIterator;
use halyard_config::Problem;

pub use appengine::AppengineAccount;
pub use google::GoogleAccount;

/// Root of a loaded configuration.
#[derive(Debug, Clone, Default, Node)]
#[node(name = "halconfig", inherit)]
pub struct Halconfig {
    /// Version of `hal` that last wrote this configuration
    pub halyard_version: Option<String>,

    /// Deployment used when a command doesn't name one
    pub current_deployment: Option<String>,

    #[node(child)]
    pub deployments: Vec<DeploymentConfiguration>,
}

/// Raised when a request cannot be served from the configuration at all.
///
/// Always carries a FATAL problem; nothing in the tree has been validated
/// when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", problem.message())]
pub struct IllegalConfig {
    problem: Problem,
}

impl IllegalConfig {
    pub fn new(problem: Problem) -> Self {
        Self { problem }
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn into_problem(self) -> Problem {
        self.problem
    }
}

impl Halconfig {
    pub fn deployment_names(&self) -> Vec<&str> {
        self.deployments.iter().map(|d| d.name.as_str()).collect()
    }

    /// The deployment named `name`.
    pub fn deployment(&self, name: &str) -> Result<&DeploymentConfiguration, IllegalConfig> {
        self.deployments
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| {
                IllegalConfig::new(Problem::fatal(
                    format!("Deployment \"{}\" could not be found", name),
                    self.deployment_names()
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                ))
            })
    }

    /// The name of the deployment commands act on by default.
    pub fn current_deployment_name(&self) -> Result<&str, IllegalConfig> {
        match self.current_deployment.as_deref() {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(IllegalConfig::new(Problem::fatal(
                "No deployment has been set",
                Vec::new(),
            ))),
        }
    }

    pub fn current_deployment(&self) -> Result<&DeploymentConfiguration, IllegalConfig> {
        self.deployment(self.current_deployment_name()?)
    }
}

/// One deployment of the platform.
#[derive(Debug, Clone, Default, Node)]
#[node(name = "deployment", key = "name")]
pub struct DeploymentConfiguration {
    pub name: String,

    /// Platform version to deploy
    pub version: Option<String>,

    #[node(child)]
    pub providers: Providers,

    #[node(child)]
    pub webhooks: Option<Webhooks>,
}

/// The providers of a deployment, one per supported provider type.
#[derive(Debug, Clone, Default, Node)]
#[node(name = "providers", inherit)]
pub struct Providers {
    #[node(child)]
    pub google: Provider<GoogleAccount>,

    #[node(child)]
    pub appengine: Provider<AppengineAccount>,
}

impl Providers {
    /// Types of the providers in this tree, in tree order.
    pub fn kinds(&self) -> Vec<&str> {
        self.children().filter_map(|p| p.identity().key()).collect()
    }

    /// The provider of type `kind`.
    pub fn provider(&self, kind: &str) -> Result<&dyn Node, IllegalConfig> {
        self.children()
            .find(|p| p.identity().key() == Some(kind))
            .ok_or_else(|| {
                IllegalConfig::new(Problem::fatal(
                    format!("Provider \"{}\" is not supported", kind),
                    self.kinds().into_iter().map(str::to_string).collect(),
                ))
            })
    }
}

/// An account of some provider.
pub trait Account: Node {
    /// The provider type this account belongs to, e.g. `"google"`.
    const PROVIDER: &'static str;

    fn name(&self) -> &str;
}

/// A provider and its accounts.
#[derive(Debug, Clone)]
pub struct Provider<A> {
    pub enabled: bool,
    pub primary_account: Option<String>,
    pub accounts: Vec<A>,
}

impl<A> Default for Provider<A> {
    fn default() -> Self {
        Self {
            enabled: false,
            primary_account: None,
            accounts: Vec::new(),
        }
    }
}

impl<A: Account> Provider<A> {
    pub fn kind(&self) -> &'static str {
        A::PROVIDER
    }

    pub fn account(&self, name: &str) -> Option<&A> {
        self.accounts.iter().find(|a| a.name() == name)
    }

    pub fn account_names(&self) -> Vec<&str> {
        self.accounts.iter().map(Account::name).collect()
    }
}

// Written by hand: the key comes from the account type, not a field.
impl<A: Account> Node for Provider<A> {
    fn node_name(&self) -> &'static str {
        "provider"
    }

    fn identity(&self) -> Identity<'_> {
        Identity::Keyed(A::PROVIDER)
    }

    fn children(&self) -> NodeIterator<'_> {
        NodeIterator::new(self.accounts.iter().map(|a| a as &dyn Node).collect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Webhook configuration of a deployment.
#[derive(Debug, Clone, Default, Node)]
#[node(name = "webhooks")]
pub struct Webhooks {}

#[cfg(test)]
mod tests {
    use halyard_config::Severity;
    use halyard_config::walk;

    use super::*;

    fn halconfig(current: Option<&str>) -> Halconfig {
        Halconfig {
            halyard_version: None,
            current_deployment: current.map(str::to_string),
            deployments: vec![
                DeploymentConfiguration {
                    name: "default".to_string(),
                    ..Default::default()
                },
                DeploymentConfiguration {
                    name: "canary".to_string(),
                    webhooks: Some(Webhooks {}),
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_no_current_deployment() {
        for current in [None, Some("")] {
            let err = halconfig(current).current_deployment().unwrap_err();
            assert_eq!(err.problem().severity(), Severity::Fatal);
            assert_eq!(err.problem().message(), "No deployment has been set");
            assert!(err.problem().filter().is_none());
        }
    }

    #[test]
    fn test_unknown_deployment_lists_options() {
        let err = halconfig(Some("prod")).current_deployment().unwrap_err();
        assert_eq!(err.to_string(), "Deployment \"prod\" could not be found");
        assert_eq!(err.problem().options(), ["default", "canary"]);
    }

    #[test]
    fn test_current_deployment() {
        let config = halconfig(Some("canary"));
        assert_eq!(config.current_deployment().unwrap().name, "canary");
    }

    #[test]
    fn test_tree_shape() {
        let config = halconfig(None);
        let filters: Vec<String> = walk(&config)
            .iter()
            .filter(|path| path.node().identity().is_addressable())
            .map(|path| path.filter().to_string())
            .collect();
        assert_eq!(
            filters,
            vec![
                "deployment:default",
                "deployment:default/provider:google",
                "deployment:default/provider:appengine",
                "deployment:canary",
                "deployment:canary/provider:google",
                "deployment:canary/provider:appengine",
                "deployment:canary/webhooks",
            ]
        );
    }

    #[test]
    fn test_provider_accounts() {
        let provider = Provider {
            enabled: true,
            primary_account: None,
            accounts: vec![
                GoogleAccount {
                    name: "a".to_string(),
                    ..Default::default()
                },
                GoogleAccount {
                    name: "b".to_string(),
                    ..Default::default()
                },
            ],
        };
        assert_eq!(provider.kind(), "google");
        assert_eq!(provider.account_names(), vec!["a", "b"]);
        assert!(provider.account("b").is_some());
        assert!(provider.account("c").is_none());
        assert_eq!(provider.children().count(), 2);
        assert_eq!(provider.identity(), Identity::Keyed("google"));
    }

    #[test]
    fn test_provider_by_kind() {
        let providers = Providers::default();
        assert_eq!(providers.kinds(), vec!["google", "appengine"]);
        assert_eq!(
            providers.provider("appengine").unwrap().identity(),
            Identity::Keyed("appengine")
        );

        let err = providers.provider("aws").unwrap_err();
        assert_eq!(err.problem().severity(), Severity::Fatal);
        assert_eq!(err.problem().message(), "Provider \"aws\" is not supported");
        assert_eq!(err.problem().options(), ["google", "appengine"]);
    }
}
