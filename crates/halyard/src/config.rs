//! Loading a halconfig from TOML.
//!
//! The file is parsed into raw serde structs first, then converted into the
//! [`crate::model`] tree. Source spans of account names, deployment versions
//! and primary accounts are kept in a [`SourceMap`] so problems can point at
//! the text that caused them.
//!
//! ```toml
//! current_deployment = "default"
//!
//! [logging]
//! level = "warn"
//!
//! [deployments.default]
//! version = "1.4.2"
//!
//! [deployments.default.providers.google]
//! enabled = true
//! primary_account = "my-account"
//!
//! [[deployments.default.providers.google.accounts]]
//! name = "my-account"
//! project = "my-project"
//! json_path = "/keys/my-account.json"
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use halyard_config::NodeFilter;
use halyard_config::SourceInfo;
use halyard_config::SourceMap;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use toml::Spanned;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;

use crate::model::Account;
use crate::model::AppengineAccount;
use crate::model::DeploymentConfiguration;
use crate::model::GoogleAccount;
use crate::model::Halconfig;
use crate::model::Provider;
use crate::model::Providers;
use crate::model::Webhooks;

#[derive(
    Debug,
    Default,
    Deserialize,
    Serialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    #[serde(alias = "warning")]
    #[strum(to_string = "warn", serialize = "warning")]
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `halyard_config = "debug"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Log filter for the subscriber; `level` replaces the configured
    /// default level when given.
    pub fn targets(&self, level: Option<LogLevel>) -> Targets {
        let default = level.unwrap_or(self.level);
        self.overrides.iter().fold(
            Targets::new().with_default(LevelFilter::from(default)),
            |targets, (target, level)| targets.with_target(target.clone(), LevelFilter::from(*level)),
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read config file {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file {}: {}", path.display(), source.message())]
    Parse {
        path: PathBuf,
        /// 1-based line and column of the error, when known
        position: Option<(usize, usize)>,
        #[source]
        source: toml::de::Error,
    },
}

impl LoadError {
    pub fn path(&self) -> &Path {
        match self {
            LoadError::Io(path, _) | LoadError::Parse { path, .. } => path,
        }
    }

    /// Format as a diagnostic for the terminal.
    pub fn diagnostic(&self) -> String {
        let (title, detail, position) = match self {
            LoadError::Io(_, err) => ("Failed to read config file", err.to_string(), None),
            LoadError::Parse {
                position, source, ..
            } => (
                "Failed to parse config file",
                source.message().to_string(),
                *position,
            ),
        };
        let (line, column) = position.unwrap_or((1, 1));
        format!(
            "\x1b[31mError\x1b[0m: {}\n  ┌─ {}:{}:{}\n  │\n  = {}\n",
            title,
            self.path().display(),
            line,
            column,
            detail
        )
    }
}

/// 1-based line and column of byte `offset` in `content`.
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let before = content.get(..offset).unwrap_or(content);
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

/// A loaded configuration.
#[derive(Debug)]
pub struct Loaded {
    pub halconfig: Halconfig,
    pub logging: LoggingConfig,
    pub sources: SourceMap,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHalconfig {
    halyard_version: Option<String>,
    current_deployment: Option<String>,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    deployments: IndexMap<String, RawDeployment>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDeployment {
    version: Option<Spanned<String>>,
    #[serde(default)]
    providers: RawProviders,
    webhooks: Option<RawWebhooks>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProviders {
    google: Option<RawProvider<RawGoogleAccount>>,
    appengine: Option<RawProvider<RawAppengineAccount>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProvider<A> {
    #[serde(default)]
    enabled: bool,
    primary_account: Option<Spanned<String>>,
    #[serde(default = "Vec::new")]
    accounts: Vec<A>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWebhooks {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGoogleAccount {
    name: Spanned<String>,
    project: Option<String>,
    #[serde(default)]
    alpha_listed: bool,
    #[serde(default)]
    image_projects: Vec<String>,
    json_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAppengineAccount {
    name: Spanned<String>,
    project: Option<String>,
    json_path: Option<String>,
    local_repository_directory: Option<String>,
    git_https_username: Option<String>,
    git_https_password: Option<String>,
    ssh_private_key_file_path: Option<String>,
    ssh_private_key_password: Option<String>,
}

trait RawAccount {
    type Account: Account;

    fn name(&self) -> &Spanned<String>;
    fn into_account(self) -> Self::Account;
}

impl RawAccount for RawGoogleAccount {
    type Account = GoogleAccount;

    fn name(&self) -> &Spanned<String> {
        &self.name
    }

    fn into_account(self) -> GoogleAccount {
        GoogleAccount {
            name: self.name.into_inner(),
            project: self.project,
            alpha_listed: self.alpha_listed,
            image_projects: self.image_projects,
            json_path: self.json_path,
        }
    }
}

impl RawAccount for RawAppengineAccount {
    type Account = AppengineAccount;

    fn name(&self) -> &Spanned<String> {
        &self.name
    }

    fn into_account(self) -> AppengineAccount {
        AppengineAccount {
            name: self.name.into_inner(),
            project: self.project,
            json_path: self.json_path,
            local_repository_directory: self.local_repository_directory,
            git_https_username: self.git_https_username,
            git_https_password: self.git_https_password,
            ssh_private_key_file_path: self.ssh_private_key_file_path,
            ssh_private_key_password: self.ssh_private_key_password,
        }
    }
}

/// Convert a raw provider, recording the spans of its accounts.
fn convert_provider<R: RawAccount>(
    raw: Option<RawProvider<R>>,
    deployment: &NodeFilter,
    sources: &mut SourceMap,
) -> Provider<R::Account> {
    let Some(raw) = raw else {
        return Provider::default();
    };

    let filter = deployment
        .clone()
        .provider(<R::Account as Account>::PROVIDER);
    if let Some(primary) = &raw.primary_account {
        sources.insert(filter.clone(), primary.span());
    }

    let accounts = raw
        .accounts
        .into_iter()
        .map(|account| {
            let name = account.name();
            sources.insert(filter.clone().account(name.get_ref().as_str()), name.span());
            account.into_account()
        })
        .collect();

    Provider {
        enabled: raw.enabled,
        primary_account: raw.primary_account.map(Spanned::into_inner),
        accounts,
    }
}

/// Parse a halconfig from `content`, read from `path`.
pub fn parse(content: &str, path: impl Into<PathBuf>) -> Result<Loaded, LoadError> {
    let path = path.into();
    let raw: RawHalconfig = toml::from_str(content).map_err(|source| LoadError::Parse {
        path: path.clone(),
        position: source
            .span()
            .map(|span| line_column(content, span.start)),
        source,
    })?;

    let mut sources = SourceMap::new(SourceInfo {
        file_path: path,
        content: content.to_string(),
    });

    let deployments = raw
        .deployments
        .into_iter()
        .map(|(name, deployment)| {
            let filter = NodeFilter::global().deployment(name.as_str());
            if let Some(version) = &deployment.version {
                sources.insert(filter.clone(), version.span());
            }

            let providers = Providers {
                google: convert_provider(deployment.providers.google, &filter, &mut sources),
                appengine: convert_provider(deployment.providers.appengine, &filter, &mut sources),
            };
            DeploymentConfiguration {
                name,
                version: deployment.version.map(Spanned::into_inner),
                providers,
                webhooks: deployment.webhooks.map(|_| Webhooks {}),
            }
        })
        .collect();

    let halconfig = Halconfig {
        halyard_version: raw.halyard_version,
        current_deployment: raw.current_deployment,
        deployments,
    };
    tracing::debug!(
        path = %sources.source().file_path.display(),
        deployments = halconfig.deployments.len(),
        "Loaded halconfig"
    );

    Ok(Loaded {
        halconfig,
        logging: raw.logging,
        sources,
    })
}

/// Load a halconfig from a TOML file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Loaded, LoadError> {
    let path = path.as_ref();
    let content =
        std::fs::read_to_string(path).map_err(|err| LoadError::Io(path.to_path_buf(), err))?;
    parse(&content, path)
}
