use std::sync::Arc;

use halyard_config::ProblemSetBuilder;
use halyard_config::Severity;
use halyard_config::Validator;
use halyard_config::ValidatorRegistry;
use linkme::distributed_slice;

use super::file::FileCheck;
use super::provider::ProviderValidator;
use super::ValidatorContext;
use super::VALIDATORS;
use crate::model::GoogleAccount;
use crate::model::Provider;

/// Credentials for a Google account, as needed to reach the compute API.
pub struct GoogleCredentialsRequest<'a> {
    pub project: &'a str,
    /// Contents of the service account key, `None` for default credentials
    pub json_key: Option<&'a str>,
    pub alpha_listed: bool,
    pub image_projects: &'a [String],
    pub application_name: &'a str,
}

/// Builds compute clients from account credentials.
pub trait GoogleCredentials: Send + Sync {
    fn compute(
        &self,
        request: &GoogleCredentialsRequest<'_>,
    ) -> anyhow::Result<Box<dyn GoogleCompute>>;
}

/// The parts of the compute API used for validation.
pub trait GoogleCompute {
    /// Fetch `project`, failing if it doesn't exist or isn't accessible.
    fn get_project(&self, project: &str) -> anyhow::Result<()>;
}

pub struct GoogleAccountValidator {
    application_name: String,
    credentials: Option<Arc<dyn GoogleCredentials>>,
}

impl GoogleAccountValidator {
    pub fn new(ctx: &ValidatorContext) -> Self {
        Self {
            application_name: ctx.application_name(),
            credentials: ctx.google.clone(),
        }
    }
}

impl Validator<GoogleAccount> for GoogleAccountValidator {
    fn validate(&self, p: &mut ProblemSetBuilder, account: &GoogleAccount) {
        let json_key = FileCheck {
            empty: "The supplied credentials file is empty",
            not_found: "Json path not found",
            unreadable: "Error opening specified json path",
        }
        .read(p, account.json_path.as_deref());

        let project = match account.project.as_deref() {
            Some(project) if !project.is_empty() => project,
            _ => {
                p.add_problem(Severity::Error, "No google project supplied.");
                return;
            }
        };

        let Some(credentials) = &self.credentials else {
            tracing::debug!(
                account = %account.name,
                "No Google client configured, skipping live checks"
            );
            return;
        };

        let request = GoogleCredentialsRequest {
            project,
            json_key: json_key.as_deref(),
            alpha_listed: account.alpha_listed,
            image_projects: &account.image_projects,
            application_name: &self.application_name,
        };
        let compute = match credentials.compute(&request) {
            Ok(compute) => compute,
            Err(err) => {
                p.add_problem(
                    Severity::Error,
                    format!("Error instantiating Google credentials: {}.", err),
                );
                return;
            }
        };

        let projects =
            std::iter::once(project).chain(account.image_projects.iter().map(String::as_str));
        for checked in projects {
            if let Err(err) = compute.get_project(checked) {
                tracing::debug!(project = checked, error = %err, "Failed to load project");
                p.add_problem(
                    Severity::Error,
                    format!("Failed to load project \"{}\": {}.", project, err),
                );
                return;
            }
        }
    }
}

#[distributed_slice(VALIDATORS)]
fn register_google(ctx: &ValidatorContext, registry: &mut ValidatorRegistry) {
    registry
        .register::<Provider<GoogleAccount>, _>(ProviderValidator::<GoogleAccount>::new())
        .register::<GoogleAccount, _>(GoogleAccountValidator::new(ctx));
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use halyard_config::NodeFilter;
    use halyard_config::ProblemSet;

    use super::*;

    /// Fake client recording every call it receives.
    #[derive(Default)]
    struct FakeGoogle {
        calls: Mutex<Vec<String>>,
        fail_credentials: bool,
        missing_project: Option<String>,
    }

    struct FakeCompute {
        calls: Arc<FakeGoogle>,
    }

    impl GoogleCredentials for Arc<FakeGoogle> {
        fn compute(
            &self,
            request: &GoogleCredentialsRequest<'_>,
        ) -> anyhow::Result<Box<dyn GoogleCompute>> {
            self.calls.lock().unwrap().push(format!(
                "credentials {} ({})",
                request.project, request.application_name
            ));
            if self.fail_credentials {
                anyhow::bail!("invalid key");
            }
            Ok(Box::new(FakeCompute {
                calls: Arc::clone(self),
            }))
        }
    }

    impl GoogleCompute for FakeCompute {
        fn get_project(&self, project: &str) -> anyhow::Result<()> {
            self.calls.calls.lock().unwrap().push(format!("get {}", project));
            if self.calls.missing_project.as_deref() == Some(project) {
                anyhow::bail!("404 Not Found");
            }
            Ok(())
        }
    }

    fn account(project: Option<&str>) -> GoogleAccount {
        GoogleAccount {
            name: "my-account".to_string(),
            project: project.map(str::to_string),
            image_projects: vec!["images".to_string()],
            ..Default::default()
        }
    }

    fn validate(fake: &Arc<FakeGoogle>, account: &GoogleAccount) -> ProblemSet {
        let ctx = ValidatorContext::new("1.0.0").with_google(Arc::new(Arc::clone(fake)));
        let scope = NodeFilter::global()
            .deployment("default")
            .provider("google")
            .account("my-account");
        let mut p = ProblemSetBuilder::new(scope);
        GoogleAccountValidator::new(&ctx).validate(&mut p, account);
        p.build().unwrap()
    }

    fn messages(problems: &ProblemSet) -> Vec<&str> {
        problems.iter().map(|p| p.message()).collect()
    }

    #[test]
    fn test_missing_project_skips_external_calls() {
        let fake = Arc::new(FakeGoogle::default());
        for project in [None, Some("")] {
            let problems = validate(&fake, &account(project));
            assert_eq!(messages(&problems), vec!["No google project supplied."]);
            assert_eq!(problems.problems()[0].severity(), Severity::Error);
        }
        assert!(fake.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_valid_account() {
        let fake = Arc::new(FakeGoogle::default());
        let problems = validate(&fake, &account(Some("my-project")));
        assert!(problems.is_empty());
        assert_eq!(
            *fake.calls.lock().unwrap(),
            vec![
                "credentials my-project (halyard 1.0.0)",
                "get my-project",
                "get images",
            ]
        );
    }

    #[test]
    fn test_credentials_failure() {
        let fake = Arc::new(FakeGoogle {
            fail_credentials: true,
            ..Default::default()
        });
        let problems = validate(&fake, &account(Some("my-project")));
        assert_eq!(
            messages(&problems),
            vec!["Error instantiating Google credentials: invalid key."]
        );
    }

    #[test]
    fn test_missing_image_project() {
        let fake = Arc::new(FakeGoogle {
            missing_project: Some("images".to_string()),
            ..Default::default()
        });
        let problems = validate(&fake, &account(Some("my-project")));
        assert_eq!(
            messages(&problems),
            vec!["Failed to load project \"my-project\": 404 Not Found."]
        );
    }

    #[test]
    fn test_missing_json_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("account.json");
        let fake = Arc::new(FakeGoogle::default());

        let mut account = account(Some("my-project"));
        account.json_path = Some(path.to_string_lossy().to_string());
        let problems = validate(&fake, &account);

        assert_eq!(problems.len(), 1);
        let problem = &problems.problems()[0];
        assert_eq!(problem.severity(), Severity::Error);
        assert!(problem.message().starts_with("Json path not found: "));
        assert!(problem.message().contains("account.json"));
    }

    #[test]
    fn test_without_client() {
        let scope = NodeFilter::global();
        let mut p = ProblemSetBuilder::new(scope);
        GoogleAccountValidator::new(&ValidatorContext::default())
            .validate(&mut p, &account(Some("my-project")));
        assert!(p.is_empty());
    }
}
