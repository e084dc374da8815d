//! The halyard domain: the halconfig tree, its validators and the loader
//! behind the `hal` command line.

pub mod accounts;
pub mod config;
pub mod model;
pub mod validate;

pub use accounts::AccountListing;
pub use accounts::LocalFile;
pub use accounts::list_accounts;
pub use accounts::list_provider_accounts;
pub use accounts::local_files;
pub use config::LoadError;
pub use config::LogLevel;
pub use config::Loaded;
pub use config::LoggingConfig;
pub use config::load_file;
pub use config::parse;
pub use model::Halconfig;
pub use model::IllegalConfig;
pub use validate::ValidatorContext;
pub use validate::registry;
