//! A small configuration tree shared by the unit tests.

use indexmap::IndexMap;

use crate::Node;

#[derive(Debug, Node)]
#[node(name = "root", inherit)]
pub struct Root {
    #[node(child)]
    pub deployments: Vec<Deployment>,
}

#[derive(Debug, Node)]
#[node(name = "deployment", key = "name")]
pub struct Deployment {
    pub name: String,
    #[node(child)]
    pub providers: Providers,
    #[node(child)]
    pub webhooks: Option<Webhooks>,
}

#[derive(Debug, Node)]
#[node(name = "providers", inherit)]
pub struct Providers {
    #[node(child)]
    pub providers: IndexMap<String, Provider>,
}

#[derive(Debug, Node)]
#[node(name = "provider", key = "kind")]
pub struct Provider {
    pub kind: String,
    #[node(child)]
    pub accounts: Vec<Account>,
}

#[derive(Debug, Node)]
#[node(name = "account", key = "name")]
pub struct Account {
    pub name: String,
    pub project: Option<String>,
    #[node(local_file)]
    pub json_path: Option<String>,
}

#[derive(Debug, Node)]
#[node(name = "webhooks")]
pub struct Webhooks {}

fn account(name: &str, project: Option<&str>, json_path: Option<&str>) -> Account {
    Account {
        name: name.to_string(),
        project: project.map(str::to_string),
        json_path: json_path.map(str::to_string),
    }
}

fn deployment(name: &str, google_accounts: Vec<Account>) -> Deployment {
    // Inserted out of alphabetical order on purpose.
    let mut providers = IndexMap::new();
    providers.insert(
        "google".to_string(),
        Provider {
            kind: "google".to_string(),
            accounts: google_accounts,
        },
    );
    providers.insert(
        "aws".to_string(),
        Provider {
            kind: "aws".to_string(),
            accounts: Vec::new(),
        },
    );

    Deployment {
        name: name.to_string(),
        providers: Providers { providers },
        webhooks: Some(Webhooks {}),
    }
}

/// Two deployments; `prod` has three google accounts, `b` without a project.
pub fn sample_tree() -> Root {
    Root {
        deployments: vec![
            deployment(
                "prod",
                vec![
                    account("a", Some("project-a"), Some("/keys/a.json")),
                    account("b", None, None),
                    account("c", Some("project-c"), Some("/keys/c.json")),
                ],
            ),
            deployment("staging", Vec::new()),
        ],
    }
}
