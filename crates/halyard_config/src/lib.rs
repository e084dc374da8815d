//! Configuration tree, node filters and validation problems.
//!
//! A loaded configuration is a tree of [`Node`]s. A [`NodeFilter`] selects a
//! part of that tree, [`validate`] runs the registered [`Validator`]s over
//! the selected nodes and collects what they report into a [`ProblemSet`].

// Lets `#[derive(Node)]` refer to `::halyard_config` from inside this crate.
extern crate self as halyard_config;

mod filter;
mod node;
mod problem;
mod report;
mod validate;

#[cfg(test)]
mod fixtures;

pub use filter::Criterion;
pub use filter::FilterParseError;
pub use filter::GLOBAL;
pub use filter::NodeFilter;
pub use halyard_config_derive::Node;
pub use node::Identity;
pub use node::Node;
pub use node::NodeIterator;
pub use node::NodePath;
pub use node::resolve;
pub use node::walk;
pub use problem::Problem;
pub use problem::ProblemBuilder;
pub use problem::ProblemError;
pub use problem::ProblemSet;
pub use problem::ProblemSetBuilder;
pub use problem::Severity;
pub use report::SourceInfo;
pub use report::SourceMap;
pub use report::format_problems;
pub use validate::Accept;
pub use validate::ValidateError;
pub use validate::Validator;
pub use validate::ValidatorRegistry;
pub use validate::validate;
