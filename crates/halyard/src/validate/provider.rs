use std::collections::HashSet;
use std::marker::PhantomData;

use halyard_config::ProblemBuilder;
use halyard_config::ProblemSetBuilder;
use halyard_config::Severity;
use halyard_config::Validator;

use crate::model::Account;
use crate::model::Provider;

/// Rules shared by every provider, whatever its account type.
pub struct ProviderValidator<A> {
    _account: PhantomData<fn() -> A>,
}

impl<A> ProviderValidator<A> {
    pub fn new() -> Self {
        Self {
            _account: PhantomData,
        }
    }
}

impl<A> Default for ProviderValidator<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase alphanumeric words joined by single dashes.
fn is_valid_account_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('-').all(|word| {
            !word.is_empty()
                && word
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}

impl<A: Account> Validator<Provider<A>> for ProviderValidator<A> {
    fn validate(&self, p: &mut ProblemSetBuilder, provider: &Provider<A>) {
        let names = provider.account_names();

        if provider.enabled && names.is_empty() {
            p.push(
                ProblemBuilder::new(
                    Severity::Warning,
                    format!(
                        "Provider {} is enabled, but no accounts have been configured.",
                        provider.kind()
                    ),
                )
                .remediation("Add an account or disable the provider."),
            );
        }

        if let Some(primary) = provider.primary_account.as_deref() {
            if provider.account(primary).is_none() {
                p.push(
                    ProblemBuilder::new(
                        Severity::Error,
                        format!("Primary account \"{}\" is not a configured account.", primary),
                    )
                    .options(names.iter().copied()),
                );
            }
        }

        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(*name) {
                p.add_problem(
                    Severity::Error,
                    format!("Account \"{}\" is configured more than once.", name),
                );
            }
        }

        for name in names.iter().filter(|name| !is_valid_account_name(name)) {
            let filter = p.scope().clone().account(*name);
            p.push(
                ProblemBuilder::new(
                    Severity::Error,
                    format!("Account name \"{}\" is not valid.", name),
                )
                .filter(filter)
                .remediation(
                    "Account names may only contain lowercase letters, digits and single dashes, \
                     and must start and end with a letter or digit.",
                ),
            );
        }
    }
}
