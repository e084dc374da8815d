use halyard_config::ProblemBuilder;
use halyard_config::ProblemSetBuilder;
use halyard_config::Severity;
use halyard_config::Validator;
use halyard_config::ValidatorRegistry;
use linkme::distributed_slice;

use super::ValidatorContext;
use super::VALIDATORS;
use crate::model::DeploymentConfiguration;

pub struct DeploymentValidator;

impl Validator<DeploymentConfiguration> for DeploymentValidator {
    fn validate(&self, p: &mut ProblemSetBuilder, deployment: &DeploymentConfiguration) {
        let selected = deployment
            .version
            .as_deref()
            .is_some_and(|version| !version.is_empty());
        if !selected {
            p.push(
                ProblemBuilder::new(Severity::Warning, "No version has been selected.")
                    .remediation("Set `version` for this deployment before deploying it."),
            );
        }
    }
}

#[distributed_slice(VALIDATORS)]
fn register_deployment(_ctx: &ValidatorContext, registry: &mut ValidatorRegistry) {
    registry.register::<DeploymentConfiguration, _>(DeploymentValidator);
}
