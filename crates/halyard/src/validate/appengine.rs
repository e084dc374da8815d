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
use crate::model::AppengineAccount;
use crate::model::Provider;

/// Builds App Engine Admin API clients from account credentials.
pub trait AppengineCredentials: Send + Sync {
    fn admin(
        &self,
        project: &str,
        json_key: Option<&str>,
        application_name: &str,
    ) -> anyhow::Result<Box<dyn AppengineAdmin>>;
}

/// The parts of the App Engine Admin API used for validation.
pub trait AppengineAdmin {
    /// List the locations of the project's application.
    fn list_locations(&self, project: &str) -> anyhow::Result<Vec<String>>;
}

pub struct AppengineAccountValidator {
    application_name: String,
    credentials: Option<Arc<dyn AppengineCredentials>>,
}

impl AppengineAccountValidator {
    pub fn new(ctx: &ValidatorContext) -> Self {
        Self {
            application_name: ctx.application_name(),
            credentials: ctx.appengine.clone(),
        }
    }
}

fn is_set(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

impl Validator<AppengineAccount> for AppengineAccountValidator {
    fn validate(&self, p: &mut ProblemSetBuilder, account: &AppengineAccount) {
        let git_password = is_set(account.git_https_password.as_deref());
        let git_username = is_set(account.git_https_username.as_deref());
        if git_password != git_username {
            if !git_password {
                p.add_problem(
                    Severity::Error,
                    "Git HTTPS password supplied without git HTTPS username.",
                );
            } else {
                p.add_problem(
                    Severity::Error,
                    "Git HTTPS username supplied without git HTTPS password.",
                );
            }
        }

        let ssh_password = is_set(account.ssh_private_key_password.as_deref());
        let ssh_key_path = is_set(account.ssh_private_key_file_path.as_deref());
        if ssh_password != ssh_key_path {
            if !ssh_password {
                p.add_problem(
                    Severity::Error,
                    "SSH private key password supplied without SSH private key filepath.",
                );
            } else {
                p.add_problem(
                    Severity::Error,
                    "SSH private key filepath supplied without SSH private key password.",
                );
            }
        } else if ssh_password && ssh_key_path {
            FileCheck {
                empty: "The supplied SSH private key file is empty",
                not_found: "SSH private key not found",
                unreadable: "Error opening path to SSH private key",
            }
            .read(p, account.ssh_private_key_file_path.as_deref());
        }

        let json_key = FileCheck {
            empty: "The supplied credentials file is empty",
            not_found: "Json path not found",
            unreadable: "Error opening specified json path",
        }
        .read(p, account.json_path.as_deref());

        let project = match account.project.as_deref() {
            Some(project) if !project.is_empty() => project,
            _ => {
                p.add_problem(Severity::Error, "No appengine project supplied.");
                return;
            }
        };

        let Some(credentials) = &self.credentials else {
            tracing::debug!(
                account = %account.name,
                "No App Engine client configured, skipping live checks"
            );
            return;
        };

        let admin = match credentials.admin(project, json_key.as_deref(), &self.application_name) {
            Ok(admin) => admin,
            Err(err) => {
                p.add_problem(
                    Severity::Error,
                    format!("Error instantiating App Engine credentials: {}.", err),
                );
                return;
            }
        };

        match admin.list_locations(project) {
            Ok(locations) => {
                tracing::debug!(
                    project,
                    locations = locations.len(),
                    "App Engine Admin API reachable"
                );
            }
            Err(err) => {
                p.add_problem(
                    Severity::Error,
                    format!("Failed to connect to App Engine Admin API: {}.", err),
                );
            }
        }
    }
}

#[distributed_slice(VALIDATORS)]
fn register_appengine(ctx: &ValidatorContext, registry: &mut ValidatorRegistry) {
    registry
        .register::<Provider<AppengineAccount>, _>(ProviderValidator::<AppengineAccount>::new())
        .register::<AppengineAccount, _>(AppengineAccountValidator::new(ctx));
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use halyard_config::NodeFilter;
    use halyard_config::ProblemSet;

    use super::*;

    #[derive(Default)]
    struct FakeAppengine {
        calls: Mutex<Vec<String>>,
        fail_credentials: bool,
        fail_admin: bool,
    }

    struct FakeAdmin {
        fake: Arc<FakeAppengine>,
    }

    impl AppengineCredentials for Arc<FakeAppengine> {
        fn admin(
            &self,
            project: &str,
            _json_key: Option<&str>,
            application_name: &str,
        ) -> anyhow::Result<Box<dyn AppengineAdmin>> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("credentials {} ({})", project, application_name));
            if self.fail_credentials {
                anyhow::bail!("bad key");
            }
            Ok(Box::new(FakeAdmin {
                fake: Arc::clone(self),
            }))
        }
    }

    impl AppengineAdmin for FakeAdmin {
        fn list_locations(&self, project: &str) -> anyhow::Result<Vec<String>> {
            self.fake
                .calls
                .lock()
                .unwrap()
                .push(format!("locations {}", project));
            if self.fake.fail_admin {
                anyhow::bail!("permission denied");
            }
            Ok(vec!["us-central".to_string()])
        }
    }

    fn account() -> AppengineAccount {
        AppengineAccount {
            name: "app".to_string(),
            project: Some("my-app".to_string()),
            ..Default::default()
        }
    }

    fn validate_with(fake: &Arc<FakeAppengine>, account: &AppengineAccount) -> ProblemSet {
        let ctx = ValidatorContext::new("1.0.0").with_appengine(Arc::new(Arc::clone(fake)));
        let scope = NodeFilter::global()
            .deployment("default")
            .provider("appengine")
            .account("app");
        let mut p = ProblemSetBuilder::new(scope);
        AppengineAccountValidator::new(&ctx).validate(&mut p, account);
        p.build().unwrap()
    }

    fn validate(account: &AppengineAccount) -> ProblemSet {
        validate_with(&Arc::new(FakeAppengine::default()), account)
    }

    fn messages(problems: &ProblemSet) -> Vec<&str> {
        problems.iter().map(|p| p.message()).collect()
    }

    #[test]
    fn test_valid_account() {
        let fake = Arc::new(FakeAppengine::default());
        assert!(validate_with(&fake, &account()).is_empty());
        assert_eq!(
            *fake.calls.lock().unwrap(),
            vec!["credentials my-app (halyard 1.0.0)", "locations my-app"]
        );
    }

    #[test]
    fn test_ssh_password_without_key_path() {
        let mut account = account();
        account.ssh_private_key_password = Some("hunter2".to_string());

        let problems = validate(&account);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems.problems()[0].severity(), Severity::Error);
        assert_eq!(
            problems.problems()[0].message(),
            "SSH private key filepath supplied without SSH private key password."
        );
    }

    #[test]
    fn test_ssh_key_path_without_password() {
        let mut account = account();
        account.ssh_private_key_file_path = Some("/keys/id_rsa".to_string());

        let problems = validate(&account);
        assert_eq!(
            messages(&problems),
            vec!["SSH private key password supplied without SSH private key filepath."]
        );
    }

    #[test]
    fn test_git_credentials_must_be_paired() {
        let mut account = account();
        account.git_https_username = Some("git".to_string());
        assert_eq!(
            messages(&validate(&account)),
            vec!["Git HTTPS password supplied without git HTTPS username."]
        );

        let mut account = self::account();
        account.git_https_password = Some("secret".to_string());
        assert_eq!(
            messages(&validate(&account)),
            vec!["Git HTTPS username supplied without git HTTPS password."]
        );
    }

    #[test]
    fn test_ssh_key_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("id_rsa");
        std::fs::write(&key, "").unwrap();

        let mut account = account();
        account.ssh_private_key_password = Some("hunter2".to_string());
        account.ssh_private_key_file_path = Some(key.to_string_lossy().to_string());

        let problems = validate(&account);
        assert_eq!(
            messages(&problems),
            vec!["The supplied SSH private key file is empty."]
        );
        assert_eq!(problems.problems()[0].severity(), Severity::Warning);
    }

    #[test]
    fn test_missing_project_skips_external_calls() {
        let fake = Arc::new(FakeAppengine::default());
        let mut account = account();
        account.project = None;

        let problems = validate_with(&fake, &account);
        assert_eq!(messages(&problems), vec!["No appengine project supplied."]);
        assert!(fake.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_collaborator_failures() {
        let fake = Arc::new(FakeAppengine {
            fail_credentials: true,
            ..Default::default()
        });
        assert_eq!(
            messages(&validate_with(&fake, &account())),
            vec!["Error instantiating App Engine credentials: bad key."]
        );

        let fake = Arc::new(FakeAppengine {
            fail_admin: true,
            ..Default::default()
        });
        assert_eq!(
            messages(&validate_with(&fake, &account())),
            vec!["Failed to connect to App Engine Admin API: permission denied."]
        );
    }
}
