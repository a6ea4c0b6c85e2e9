use serde::Deserialize;
use std::collections::BTreeMap;

/// The structure of flotilla.toml
///
/// One project, one shared network, any number of environments. Every
/// per-environment value lives here: nothing environment-specific is
/// hard-coded in the synthesizers.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// [project]
    /// name = "demo-app"
    /// account = "111122223333"
    /// region = "eu-west-3"
    pub project: Project,

    /// [network]
    /// name = "paris"
    /// max_azs = 2
    /// nat_gateways = 1
    pub network: Network,

    /// [environments.dev]
    /// ...
    #[serde(default)]
    pub environments: BTreeMap<String, Environment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub name: String,

    /// AWS account id the stacks are deployed to
    pub account: String,

    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Network {
    /// Value of the Name tag on the VPC
    pub name: String,

    pub max_azs: usize,
    pub nat_gateways: usize,

    #[serde(default = "default_cidr")]
    pub cidr: String,
}

fn default_cidr() -> String {
    "10.0.0.0/16".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Environment {
    /// Image tag pushed by CI, "latest" when not set
    #[serde(default = "default_image_tag")]
    pub image_tag: String,

    pub registry: Registry,
    pub load_balancer: LoadBalancer,
    pub database: Database,

    #[serde(default)]
    pub queue: Queue,

    pub service: Service,
}

fn default_image_tag() -> String {
    "latest".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registry {
    /// Repository holding the web-tier image
    pub proxy_image: String,

    /// Repository holding the application-runtime image
    pub runtime_image: String,

    /// Oldest images beyond this count are evicted by the registry
    pub max_image_count: u32,
}

/// The load balancer stack created for the environment
#[derive(Debug, Clone, Deserialize)]
pub struct LoadBalancer {
    pub name: String,

    #[serde(default = "default_listener_port")]
    pub listener_port: u16,
}

fn default_listener_port() -> u16 {
    80
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub cluster_name: String,

    /// Schema name placed in the connection string
    pub database_name: String,

    /// Server version advertised to the application, not the cluster engine
    #[serde(default = "default_engine_version")]
    pub engine_version: String,

    pub backup_retention_days: u32,
    pub deletion_protection: bool,

    pub min_capacity: u32,
    pub max_capacity: u32,

    /// Zero keeps the cluster always warm; any other value lets it scale to
    /// zero capacity after that many idle seconds, at the price of cold-start
    /// latency on the first connection after a pause.
    #[serde(default)]
    pub auto_pause_seconds: u64,
}

fn default_engine_version() -> String {
    "8.0".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Queue {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_seconds: u32,
}

impl Default for Queue {
    fn default() -> Self {
        Queue {
            enabled: false,
            visibility_timeout_seconds: default_visibility_timeout(),
        }
    }
}

fn default_visibility_timeout() -> u32 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
    /// Synthesize and deploy the app stack for this environment
    #[serde(default = "default_true")]
    pub enabled: bool,

    pub cpu: String,
    pub memory: String,

    #[serde(default = "default_desired_count")]
    pub desired_count: u32,

    /// [[environments.dev.service.capacity_provider]]
    /// capacity_provider = "FARGATE_SPOT"
    /// weight = 1
    pub capacity_provider: Vec<CapacityProviderStrategy>,

    pub load_balancer: ListenerAttachment,
    pub secret: SecretRef,

    #[serde(default)]
    pub bucket: Bucket,

    pub containers: Containers,
}

fn default_true() -> bool {
    true
}

fn default_desired_count() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct CapacityProviderStrategy {
    pub capacity_provider: String,
    pub weight: u32,
}

/// Where the app attaches to a pre-existing load balancer
///
/// All four values are literal identifiers of resources outside this stack,
/// resolved by the operator once and pinned in configuration. The priority is
/// manually assigned and must stay unique among every application sharing the
/// listener.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenerAttachment {
    pub arn: String,
    pub security_group_id: String,
    pub listener_arn: String,
    pub listener_priority: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecretRef {
    /// ARN of the externally managed application secret
    pub app: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Bucket {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Containers {
    pub proxy: Container,
    pub runtime: Container,
    pub supervisor: Container,
}

impl Containers {
    pub fn iter(&self) -> impl Iterator<Item = &Container> {
        [&self.proxy, &self.runtime, &self.supervisor].into_iter()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Container {
    pub name: String,

    /// Which registry repository the image is pulled from
    pub repository: RepositoryRole,

    pub memory_reservation: u32,

    /// Overrides the image's entry point, e.g. ["sh", "-c", "php-fpm"]
    #[serde(default)]
    pub entry_point: Option<Vec<String>>,

    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryRole {
    Proxy,
    Runtime,
}

impl Config {
    pub fn environment(&self, name: &str) -> eyre::Result<&Environment> {
        self.environments
            .get(name)
            .ok_or_else(|| eyre::eyre!("Environment {name:?} is not defined in flotilla.toml"))
    }

    pub fn network_stack_name(&self) -> String {
        format!("{}-network", self.project.name)
    }

    pub fn load_balancer_stack_name(&self, env: &str) -> String {
        format!("{}-load-balancer-{env}", self.project.name)
    }

    pub fn registry_stack_name(&self, env: &str) -> String {
        format!("{}-registry-{env}", self.project.name)
    }

    pub fn queue_stack_name(&self, env: &str) -> String {
        format!("{}-queue-{env}", self.project.name)
    }

    pub fn database_stack_name(&self, env: &str) -> String {
        format!("{}-database-{env}", self.project.name)
    }

    pub fn app_stack_name(&self, env: &str) -> String {
        format!("{}-{env}", self.project.name)
    }
}

impl Environment {
    /// ECR image URI for a container, built from configuration literals alone
    pub fn image_uri(&self, project: &Project, role: RepositoryRole, tag: &str) -> String {
        let repository = match role {
            RepositoryRole::Proxy => &self.registry.proxy_image,
            RepositoryRole::Runtime => &self.registry.runtime_image,
        };

        format!(
            "{account}.dkr.ecr.{region}.amazonaws.com/{repository}:{tag}",
            account = project.account,
            region = project.region,
        )
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub const FIXTURE: &str = r#"
        [project]
        name = "demo-app"
        account = "111122223333"
        region = "eu-west-3"

        [network]
        name = "paris"
        max_azs = 2
        nat_gateways = 1

        [environments.dev]
        image_tag = "a1b2c3d"

        [environments.dev.registry]
        proxy_image = "demo-app-nginx-dev"
        runtime_image = "demo-app-php-dev"
        max_image_count = 10

        [environments.dev.load_balancer]
        name = "demo-app-balancer-dev"

        [environments.dev.database]
        cluster_name = "demo-app-dev"
        database_name = "demo-app-dev"
        backup_retention_days = 1
        deletion_protection = true
        min_capacity = 1
        max_capacity = 1

        [environments.dev.service]
        cpu = "512"
        memory = "1024"
        desired_count = 1

        [[environments.dev.service.capacity_provider]]
        capacity_provider = "FARGATE_SPOT"
        weight = 1

        [environments.dev.service.load_balancer]
        arn = "arn:aws:elasticloadbalancing:eu-west-3:111122223333:loadbalancer/app/shared/392b8aafe7ada254"
        security_group_id = "sg-0f1e2d3c4b5a69788"
        listener_arn = "arn:aws:elasticloadbalancing:eu-west-3:111122223333:listener/app/shared/392b8aafe7ada254/6f58807bd62a7d38"
        listener_priority = 210

        [environments.dev.service.secret]
        app = "arn:aws:secretsmanager:eu-west-3:111122223333:secret:demo-app-dev-uFkPOt"

        [environments.dev.service.containers.proxy]
        name = "nginx"
        repository = "proxy"
        memory_reservation = 64

        [environments.dev.service.containers.proxy.environment]
        PHP_HOST = "localhost"
        DD_AGENT_HOST = "localhost"
        DD_TRACE_AGENT_PORT = "8126"
        DD_ENV = "dev"
        DD_SERVICE = "demo-app-nginx"

        [environments.dev.service.containers.runtime]
        name = "php-fpm"
        repository = "runtime"
        memory_reservation = 128
        entry_point = ["sh", "-c", "php-fpm"]

        [environments.dev.service.containers.runtime.environment]
        APP_ENV = "prod"
        APP_PUBLIC_API_URL = "https://some.public.api.example.com"
        SENTRY_DSN = ""
        APP_SENDER_EMAIL = "dev@example.com"
        APP_LOGISTICS_EMAIL = '["dev@example.net"]'
        APP_ACCOUNTING_EMAIL = '["dev@example.net"]'
        APP_SOME_SOAP_URL = "https://e-station-testenv.example.software/eprintwebservice/eprintwebservice.asmx?WSDL"
        APP_SOME_SOAP_URL_DEBUG = "true"

        [environments.dev.service.containers.supervisor]
        name = "supervisor"
        repository = "runtime"
        memory_reservation = 576
        entry_point = ["sh", "-c", "supervisord"]

        [environments.dev.service.containers.supervisor.environment]
        APP_ENV = "prod"
        APP_SENDER_EMAIL = "dev@example.com"
        APP_SOME_SOAP_URL = "https://e-station-testenv.example.software/eprintwebservice/eprintwebservice.asmx?WSDL"
        APP_SOME_SOAP_URL_DEBUG = "true"

        [environments.prod]

        [environments.prod.registry]
        proxy_image = "demo-app-nginx-prod"
        runtime_image = "demo-app-php-prod"
        max_image_count = 10

        [environments.prod.load_balancer]
        name = "demo-app-balancer-prod"

        [environments.prod.database]
        cluster_name = "demo-app-prod"
        database_name = "demo-app-prod"
        backup_retention_days = 35
        deletion_protection = true
        min_capacity = 1
        max_capacity = 5

        [environments.prod.service]
        enabled = false
        cpu = "512"
        memory = "1024"

        [[environments.prod.service.capacity_provider]]
        capacity_provider = "FARGATE_SPOT"
        weight = 1

        [environments.prod.service.load_balancer]
        arn = "arn:aws:elasticloadbalancing:eu-west-3:111122223333:loadbalancer/app/shared/392b8aafe7ada254"
        security_group_id = "sg-0f1e2d3c4b5a69788"
        listener_arn = "arn:aws:elasticloadbalancing:eu-west-3:111122223333:listener/app/shared/392b8aafe7ada254/6f58807bd62a7d38"
        listener_priority = 200

        [environments.prod.service.secret]
        app = "arn:aws:secretsmanager:eu-west-3:111122223333:secret:demo-app-prod-pW7TnM"

        [environments.prod.service.containers.proxy]
        name = "nginx"
        repository = "proxy"
        memory_reservation = 64

        [environments.prod.service.containers.runtime]
        name = "php-fpm"
        repository = "runtime"
        memory_reservation = 128

        [environments.prod.service.containers.supervisor]
        name = "supervisor"
        repository = "runtime"
        memory_reservation = 576
    "#;

    pub fn fixture() -> Config {
        toml::from_str(FIXTURE).unwrap()
    }

    #[test]
    fn parses_the_reference_config() {
        let config = fixture();

        assert_eq!(config.project.name, "demo-app");
        assert_eq!(config.network.cidr, "10.0.0.0/16");
        assert_eq!(config.environments.len(), 2);

        let dev = config.environment("dev").unwrap();
        assert_eq!(dev.image_tag, "a1b2c3d");
        assert_eq!(dev.service.load_balancer.listener_priority, 210);
        assert_eq!(dev.database.auto_pause_seconds, 0);
        assert!(!dev.queue.enabled);
        assert!(dev.service.enabled);

        let prod = config.environment("prod").unwrap();
        assert_eq!(prod.image_tag, "latest");
        assert!(!prod.service.enabled);
        assert_eq!(prod.service.desired_count, 1);
    }

    #[test]
    fn stack_names_carry_the_environment_suffix() {
        let config = fixture();

        assert_eq!(config.network_stack_name(), "demo-app-network");
        assert_eq!(config.database_stack_name("dev"), "demo-app-database-dev");
        assert_eq!(config.app_stack_name("prod"), "demo-app-prod");
    }

    #[test]
    fn image_uri_is_built_from_project_literals() {
        let config = fixture();
        let dev = config.environment("dev").unwrap();

        assert_eq!(
            dev.image_uri(&config.project, RepositoryRole::Runtime, "a1b2c3d"),
            "111122223333.dkr.ecr.eu-west-3.amazonaws.com/demo-app-php-dev:a1b2c3d"
        );
    }

    #[test]
    fn unknown_environment_is_an_error() {
        assert!(fixture().environment("staging").is_err());
    }
}
