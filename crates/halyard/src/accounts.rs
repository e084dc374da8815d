//! Read-only views over a loaded configuration.

use std::fmt;

use halyard_config::Node;
use halyard_config::NodeFilter;
use halyard_config::walk;
use serde::Serialize;

use crate::model::Account;
use crate::model::IllegalConfig;
use crate::model::Provider;
use crate::model::Providers;

/// The accounts configured for a provider.
///
/// A provider without accounts is its own outcome rather than an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AccountListing {
    NoAccounts {
        provider: String,
    },
    Accounts {
        provider: String,
        accounts: Vec<String>,
    },
}

impl AccountListing {
    pub fn accounts(&self) -> &[String] {
        match self {
            AccountListing::NoAccounts { .. } => &[],
            AccountListing::Accounts { accounts, .. } => accounts,
        }
    }
}

impl fmt::Display for AccountListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountListing::NoAccounts { provider } => {
                write!(f, "No accounts configured for {}.", provider)
            }
            AccountListing::Accounts { provider, accounts } => {
                write!(f, "Accounts for {}:", provider)?;
                for account in accounts {
                    write!(f, "\n - {}", account)?;
                }
                Ok(())
            }
        }
    }
}

pub fn list_accounts<A: Account>(provider: &Provider<A>) -> AccountListing {
    listing(
        provider.kind(),
        provider.account_names().into_iter().map(str::to_string).collect(),
    )
}

/// The accounts of the provider of type `kind`.
pub fn list_provider_accounts(
    providers: &Providers,
    kind: &str,
) -> Result<AccountListing, IllegalConfig> {
    let provider = providers.provider(kind)?;
    let accounts = provider
        .children()
        .filter_map(|account| account.identity().key())
        .map(str::to_string)
        .collect();
    Ok(listing(kind, accounts))
}

fn listing(kind: &str, accounts: Vec<String>) -> AccountListing {
    let provider = kind.to_string();
    if accounts.is_empty() {
        AccountListing::NoAccounts { provider }
    } else {
        AccountListing::Accounts { provider, accounts }
    }
}

/// A local file referenced by the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalFile {
    /// Location of the node referencing the file
    #[serde(serialize_with = "serialize_filter")]
    pub location: NodeFilter,
    pub path: String,
}

fn serialize_filter<S: serde::Serializer>(filter: &NodeFilter, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(filter)
}

/// Every local file referenced by nodes matching `filter`, in tree order.
pub fn local_files(root: &dyn Node, filter: &NodeFilter) -> Vec<LocalFile> {
    walk(root)
        .into_iter()
        .filter(|path| path.matches(filter))
        .flat_map(|path| {
            let location = path.filter();
            path.node()
                .local_files()
                .into_iter()
                .map(move |file| LocalFile {
                    location: location.clone(),
                    path: file.to_string(),
                })
        })
        .collect()
}
