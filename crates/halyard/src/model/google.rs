use halyard_config::Node;

use super::Account;

/// A Google Compute Engine account.
#[derive(Debug, Clone, Default, Node)]
#[node(name = "account", key = "name")]
pub struct GoogleAccount {
    pub name: String,

    /// Project the account manages resources in
    pub project: Option<String>,

    /// Use the alpha compute API
    pub alpha_listed: bool,

    /// Additional projects to read images from
    pub image_projects: Vec<String>,

    /// Service account key; application default credentials when unset
    #[node(local_file)]
    pub json_path: Option<String>,
}

impl Account for GoogleAccount {
    const PROVIDER: &'static str = "google";

    fn name(&self) -> &str {
        &self.name
    }
}
