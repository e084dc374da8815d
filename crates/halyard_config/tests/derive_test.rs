use std::collections::BTreeMap;

use halyard_config::Accept;
use halyard_config::Identity;
use halyard_config::Node;
use halyard_config::NodeFilter;
use halyard_config::ProblemSetBuilder;
use halyard_config::Severity;
use halyard_config::Validator;
use halyard_config::ValidatorRegistry;
use halyard_config::validate;
use halyard_config::walk;

#[derive(Debug, Node)]
#[node(name = "cluster", inherit)]
struct Cluster {
    #[node(child)]
    regions: BTreeMap<String, Region>,
    #[node(child)]
    settings: Settings,
}

#[derive(Debug, Node)]
#[node(name = "region", key = "id")]
struct Region {
    id: String,
    #[node(local_file)]
    certificates: Vec<String>,
    #[node(local_file)]
    kubeconfig: String,
}

#[derive(Debug, Node)]
#[node(name = "settings")]
struct Settings {
    replicas: u32,
}

struct ReplicaValidator;

impl Validator<Settings> for ReplicaValidator {
    fn validate(&self, p: &mut ProblemSetBuilder, settings: &Settings) {
        if settings.replicas == 0 {
            p.add_problem(Severity::Warning, "No replicas requested");
        }
    }
}

fn cluster() -> Cluster {
    let mut regions = BTreeMap::new();
    regions.insert(
        "us-east".to_string(),
        Region {
            id: "us-east".to_string(),
            certificates: vec!["/etc/ca.pem".to_string(), String::new()],
            kubeconfig: String::new(),
        },
    );
    regions.insert(
        "eu-west".to_string(),
        Region {
            id: "eu-west".to_string(),
            certificates: Vec::new(),
            kubeconfig: "/etc/kube/eu".to_string(),
        },
    );
    Cluster {
        regions,
        settings: Settings { replicas: 0 },
    }
}

#[test]
fn test_derived_identity() {
    let cluster = cluster();
    assert_eq!(cluster.node_name(), "cluster");
    assert_eq!(cluster.identity(), Identity::Inherited);
    assert_eq!(cluster.settings.identity(), Identity::Singleton);
    assert_eq!(cluster.regions["eu-west"].identity(), Identity::Keyed("eu-west"));
}

#[test]
fn test_derived_children_and_files() {
    let cluster = cluster();
    let filters: Vec<String> = walk(&cluster)
        .iter()
        .map(|path| path.filter().to_string())
        .collect();
    assert_eq!(
        filters,
        vec!["Global", "region:eu-west", "region:us-east", "settings"]
    );

    let files: Vec<&str> = walk(&cluster)
        .iter()
        .flat_map(|path| path.node().local_files())
        .collect();
    assert_eq!(files, vec!["/etc/kube/eu", "/etc/ca.pem"]);
}

#[test]
fn test_derived_nodes_validate() {
    let cluster = cluster();
    let validators = ValidatorRegistry::new()
        .with::<Cluster, _>(Accept)
        .with::<Region, _>(Accept)
        .with::<Settings, _>(ReplicaValidator);

    let problems = validate(&cluster, &NodeFilter::global(), &validators).unwrap();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems.problems()[0].location(), "settings");

    let only_regions: NodeFilter = "region".parse().unwrap();
    let problems = validate(&cluster, &only_regions, &validators).unwrap();
    assert!(problems.is_empty());
}
