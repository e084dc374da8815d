//! `hal`: validate and inspect a halyard deployment configuration.
//!
//! ```bash
//! # Validate the current deployment
//! hal validate
//!
//! # Validate one account of another deployment
//! hal validate --deployment canary --provider google --account my-account
//!
//! # List the accounts of a provider without validating it
//! hal list-accounts appengine --no-validate
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use halyard::IllegalConfig;
use halyard::LogLevel;
use halyard::Loaded;
use halyard::ValidatorContext;
use halyard::model::DeploymentConfiguration;
use halyard::model::Halconfig;
use halyard_config::NodeFilter;
use halyard_config::ProblemSet;
use halyard_config::Severity;
use halyard_config::SourceMap;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "hal")]
#[command(version)]
#[command(about = "Validate and inspect a halyard deployment configuration")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path of the halconfig
    #[arg(long, short, global = true, default_value = "halconfig.toml")]
    config: PathBuf,

    /// Log level, replacing `[logging] level` from the halconfig
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a deployment, or part of one
    Validate {
        /// Deployment to validate (default: the current deployment)
        #[arg(long)]
        deployment: Option<String>,

        /// Only validate this provider
        #[arg(long)]
        provider: Option<String>,

        /// Only validate this account
        #[arg(long)]
        account: Option<String>,

        /// Only validate the deployment's webhooks
        #[arg(long, conflicts_with_all = ["provider", "account"])]
        webhooks: bool,

        /// Explicit node filter, e.g. `deployment:prod/provider:google`
        #[arg(long, conflicts_with_all = ["deployment", "provider", "account", "webhooks"])]
        filter: Option<NodeFilter>,

        /// Hide problems below this severity: warning, error, fatal
        #[arg(long, default_value = "warning")]
        min_severity: Severity,
    },

    /// List the accounts of a provider
    ListAccounts {
        /// Provider type, e.g. `google`
        provider: String,

        /// Deployment to read (default: the current deployment)
        #[arg(long)]
        deployment: Option<String>,

        /// Skip validating the provider first
        #[arg(long)]
        no_validate: bool,
    },

    /// List the local files a deployment references
    LocalFiles {
        /// Deployment to read (default: the current deployment)
        #[arg(long)]
        deployment: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match halyard::load_file(&cli.config) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprint!("{}", err.diagnostic());
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(loaded.logging.targets(cli.log_level))
        .init();
    tracing::info!(config = %cli.config.display(), "Loaded config");

    let result = match cli.command {
        Command::Validate {
            deployment,
            provider,
            account,
            webhooks,
            filter,
            min_severity,
        } => {
            let selected = match filter {
                Some(filter) => Ok(filter),
                None => requested_scope(
                    &loaded.halconfig,
                    deployment.as_deref(),
                    provider.as_deref(),
                    account.as_deref(),
                    webhooks,
                ),
            };
            match selected {
                Ok(scope) => cmd_validate(&loaded, &scope, min_severity, cli.json),
                Err(err) => report_illegal(err, cli.json),
            }
        }
        Command::ListAccounts {
            provider,
            deployment,
            no_validate,
        } => cmd_list_accounts(&loaded, &provider, deployment.as_deref(), no_validate, cli.json),
        Command::LocalFiles { deployment } => {
            cmd_local_files(&loaded, deployment.as_deref(), cli.json)
        }
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("\x1b[31mError\x1b[0m: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn select_deployment<'a>(
    config: &'a Halconfig,
    name: Option<&str>,
) -> Result<&'a DeploymentConfiguration, IllegalConfig> {
    match name {
        Some(name) => config.deployment(name),
        None => config.current_deployment(),
    }
}

/// The scope of a `validate` invocation, checked against the halconfig.
fn requested_scope(
    config: &Halconfig,
    deployment: Option<&str>,
    provider: Option<&str>,
    account: Option<&str>,
    webhooks: bool,
) -> Result<NodeFilter, IllegalConfig> {
    let deployment = select_deployment(config, deployment)?;
    if let Some(provider) = provider {
        deployment.providers.provider(provider)?;
    }
    Ok(scope(&deployment.name, provider, account, webhooks))
}

/// The filter selecting what a `validate` invocation asked for.
fn scope(
    deployment: &str,
    provider: Option<&str>,
    account: Option<&str>,
    webhooks: bool,
) -> NodeFilter {
    let filter = NodeFilter::global().deployment(deployment);
    if webhooks {
        return filter.webhooks();
    }

    let filter = match provider {
        Some(provider) => filter.provider(provider),
        None if account.is_some() => filter.any("provider"),
        None => return filter,
    };
    match account {
        Some(account) => filter.account(account),
        None => filter,
    }
}

fn exit_code(problems: &ProblemSet) -> ExitCode {
    if problems.has_at_least(Severity::Error) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_problems(
    problems: &ProblemSet,
    sources: Option<&SourceMap>,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(problems)?);
    } else if !problems.is_empty() {
        print!("{}", halyard_config::format_problems(problems, sources));
    }
    Ok(())
}

fn report_illegal(err: IllegalConfig, json: bool) -> anyhow::Result<ExitCode> {
    tracing::debug!(error = %err, "Request cannot be served from the halconfig");
    let problems: ProblemSet = std::iter::once(err.into_problem()).collect();
    print_problems(&problems, None, json)?;
    Ok(ExitCode::FAILURE)
}

/// Validate `scope` with every registered validator.
fn run_validation(loaded: &Loaded, scope: &NodeFilter) -> anyhow::Result<ProblemSet> {
    let registry = halyard::registry(&ValidatorContext::default());
    halyard_config::validate(&loaded.halconfig, scope, &registry)
        .with_context(|| format!("Validation of {} aborted", scope))
}

fn cmd_validate(
    loaded: &Loaded,
    scope: &NodeFilter,
    min_severity: Severity,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let problems = run_validation(loaded, scope)?;
    tracing::info!(
        scope = %scope,
        problems = problems.len(),
        max_severity = %problems.max_severity(),
        "Validation finished"
    );

    print_problems(
        &problems.with_min_severity(min_severity),
        Some(&loaded.sources),
        json,
    )?;
    if !json && problems.is_empty() {
        println!("No problems found in {}.", scope);
    }
    Ok(exit_code(&problems))
}

fn cmd_list_accounts(
    loaded: &Loaded,
    provider: &str,
    deployment: Option<&str>,
    no_validate: bool,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let deployment = match select_deployment(&loaded.halconfig, deployment) {
        Ok(deployment) => deployment,
        Err(err) => return report_illegal(err, json),
    };

    let listing = match halyard::list_provider_accounts(&deployment.providers, provider) {
        Ok(listing) => listing,
        Err(err) => return report_illegal(err, json),
    };

    if !no_validate {
        let scope = NodeFilter::global()
            .deployment(deployment.name.as_str())
            .provider(provider);
        let problems = run_validation(loaded, &scope)?;
        if problems.has_at_least(Severity::Error) {
            print_problems(&problems, Some(&loaded.sources), json)?;
            return Ok(ExitCode::FAILURE);
        }
        if !json {
            print_problems(&problems, Some(&loaded.sources), false)?;
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        println!("{}", listing);
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_local_files(
    loaded: &Loaded,
    deployment: Option<&str>,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let deployment = match select_deployment(&loaded.halconfig, deployment) {
        Ok(deployment) => deployment,
        Err(err) => return report_illegal(err, json),
    };

    let scope = NodeFilter::global().deployment(deployment.name.as_str());
    let files = halyard::local_files(&loaded.halconfig, &scope);
    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else if files.is_empty() {
        println!("No local files referenced in {}.", scope);
    } else {
        for file in &files {
            println!("{}\t{}", file.location, file.path);
        }
    }
    Ok(ExitCode::SUCCESS)
}
