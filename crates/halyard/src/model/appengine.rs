use halyard_config::Node;

use super::Account;

/// A Google App Engine account.
#[derive(Debug, Clone, Default, Node)]
#[node(name = "account", key = "name")]
pub struct AppengineAccount {
    pub name: String,
    pub project: Option<String>,

    #[node(local_file)]
    pub json_path: Option<String>,

    /// Where application repositories are cloned to
    pub local_repository_directory: Option<String>,

    pub git_https_username: Option<String>,
    pub git_https_password: Option<String>,

    #[node(local_file)]
    pub ssh_private_key_file_path: Option<String>,
    pub ssh_private_key_password: Option<String>,
}

impl Account for AppengineAccount {
    const PROVIDER: &'static str = "appengine";

    fn name(&self) -> &str {
        &self.name
    }
}
