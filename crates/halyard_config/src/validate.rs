use std::any::Any;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use crate::Node;
use crate::NodeFilter;
use crate::NodePath;
use crate::ProblemError;
use crate::ProblemSet;
use crate::ProblemSetBuilder;

/// Validation logic for one node type.
///
/// Validators report everything they find through the builder, which is
/// scoped to the node being validated. They never fail: failures of files
/// or remote services they consult are problems too. Reporting nothing means
/// the node itself is valid; its children are visited separately.
///
/// ## Example
///
/// ```ignore
/// struct AccountValidator;
///
/// impl Validator<Account> for AccountValidator {
///     fn validate(&self, p: &mut ProblemSetBuilder, account: &Account) {
///         if account.project.is_none() {
///             p.add_problem(Severity::Error, "No project supplied.");
///         }
///     }
/// }
/// ```
pub trait Validator<T: Node>: Send + Sync {
    fn validate(&self, problems: &mut ProblemSetBuilder, node: &T);
}

/// A validator with no rules, for structural nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Accept;

impl<T: Node> Validator<T> for Accept {
    fn validate(&self, _problems: &mut ProblemSetBuilder, _node: &T) {}
}

/// Defects in the validator setup itself. These abort a validation run;
/// problems with the configuration never do.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidateError {
    #[error("no validator registered for '{node}' node at {location}")]
    MissingValidator {
        node: &'static str,
        location: String,
    },

    #[error("invalid problem reported for {location}: {source}")]
    InvalidProblem {
        location: String,
        #[source]
        source: ProblemError,
    },
}

type ErasedValidator = Box<dyn Fn(&dyn Any, &mut ProblemSetBuilder) + Send + Sync>;

/// Maps each concrete node type to its validator.
///
/// Built once at startup; dispatch is a single lookup by the node's runtime
/// type.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: HashMap<TypeId, ErasedValidator>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `validator` for nodes of type `T`, replacing any previous one.
    pub fn register<T, V>(&mut self, validator: V) -> &mut Self
    where
        T: Node,
        V: Validator<T> + 'static,
    {
        let erased: ErasedValidator = Box::new(move |node, problems| {
            if let Some(node) = node.downcast_ref::<T>() {
                validator.validate(problems, node);
            }
        });

        if self.validators.insert(TypeId::of::<T>(), erased).is_some() {
            tracing::warn!(
                node_type = std::any::type_name::<T>(),
                "Replacing previously registered validator"
            );
        }
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<T, V>(mut self, validator: V) -> Self
    where
        T: Node,
        V: Validator<T> + 'static,
    {
        self.register::<T, V>(validator);
        self
    }

    pub fn contains<T: Node>(&self) -> bool {
        self.validators.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run the validator registered for the runtime type of `node`.
    pub fn dispatch(
        &self,
        node: &dyn Any,
        node_name: &'static str,
        problems: &mut ProblemSetBuilder,
    ) -> Result<(), ValidateError> {
        let validator =
            self.validators
                .get(&node.type_id())
                .ok_or_else(|| ValidateError::MissingValidator {
                    node: node_name,
                    location: problems.scope().to_string(),
                })?;
        validator(node, problems);
        Ok(())
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// Validate every node of the tree selected by `filter`.
///
/// Nodes are visited depth-first in document order and subtrees that do not
/// match the filter are skipped entirely. Ancestors of the selected nodes are
/// walked through but not validated, so every problem lies inside the
/// selection. Problems keep the visit order. Only defects in the validator
/// setup produce an `Err`.
pub fn validate(
    root: &dyn Node,
    filter: &NodeFilter,
    validators: &ValidatorRegistry,
) -> Result<ProblemSet, ValidateError> {
    let mut problems = ProblemSet::new();
    let mut visited = 0;
    visit(
        NodePath::root(root),
        filter,
        validators,
        &mut problems,
        &mut visited,
    )?;

    tracing::debug!(
        filter = %filter,
        visited,
        problems = problems.len(),
        "Validation complete"
    );
    Ok(problems)
}

fn visit(
    path: NodePath<'_>,
    filter: &NodeFilter,
    validators: &ValidatorRegistry,
    problems: &mut ProblemSet,
    visited: &mut usize,
) -> Result<(), ValidateError> {
    let location = path.filter();
    if !path.matches(filter) {
        tracing::trace!(location = %location, "Skipping subtree outside filter");
        return Ok(());
    }

    if location.len() < filter.len() {
        tracing::trace!(location = %location, "Descending towards filter");
    } else {
        tracing::debug!(
            node = path.node().node_name(),
            location = %location,
            "Validating node"
        );
        *visited += 1;

        let mut builder = ProblemSetBuilder::new(location.clone());
        path.node().accept(&mut builder, validators)?;
        let found = builder
            .build()
            .map_err(|source| ValidateError::InvalidProblem {
                location: location.to_string(),
                source,
            })?;
        problems.extend(found);
    }

    for child in path.children() {
        visit(child, filter, validators, problems, visited)?;
    }
    Ok(())
}
