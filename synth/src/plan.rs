use crate::config::Config;
use crate::template::Template;
use crate::{app, database, load_balancer, network, queue, registry};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackKind {
    Network,
    Registry,
    Queue,
    LoadBalancer,
    Database,
    App,
}

/// One stack the deployer will synthesize and provision
#[derive(Clone, Debug)]
pub struct StackPlan {
    pub name: String,
    pub kind: StackKind,

    /// None for the shared network stack
    pub env: Option<String>,

    /// Set on stacks whose loss is unrecoverable, the deployer refuses to
    /// delete them without an explicit override
    pub termination_protection: bool,
}

impl StackPlan {
    pub fn synthesize(&self, config: &Config) -> eyre::Result<Template> {
        let env = self.env.as_deref().unwrap_or_default();

        match self.kind {
            StackKind::Network => network::template(config),
            StackKind::Registry => registry::template(config, env),
            StackKind::Queue => queue::template(config, env),
            StackKind::LoadBalancer => load_balancer::template(config, env),
            StackKind::Database => database::template(config, env),
            StackKind::App => app::template(config, env),
        }
    }
}

/// Dependency-ordered set of stacks, leaves first
///
/// network → {registries, queues} → load balancers → databases → apps.
/// There is no runtime discovery between them: producers export values,
/// consumers import them or read literals from configuration, so deploying
/// in this order is all the coordination the system needs.
#[derive(Clone, Debug)]
pub struct Plan {
    stacks: Vec<StackPlan>,
}

impl Plan {
    pub fn new(config: &Config) -> Self {
        let mut stacks = vec![StackPlan {
            name: config.network_stack_name(),
            kind: StackKind::Network,
            env: None,
            termination_protection: true,
        }];

        for (env, environment) in &config.environments {
            stacks.push(StackPlan {
                name: config.registry_stack_name(env),
                kind: StackKind::Registry,
                env: Some(env.clone()),
                termination_protection: env == "prod",
            });

            if environment.queue.enabled {
                stacks.push(StackPlan {
                    name: config.queue_stack_name(env),
                    kind: StackKind::Queue,
                    env: Some(env.clone()),
                    termination_protection: false,
                });
            }
        }

        for env in config.environments.keys() {
            stacks.push(StackPlan {
                name: config.load_balancer_stack_name(env),
                kind: StackKind::LoadBalancer,
                env: Some(env.clone()),
                termination_protection: false,
            });
        }

        for env in config.environments.keys() {
            stacks.push(StackPlan {
                name: config.database_stack_name(env),
                kind: StackKind::Database,
                env: Some(env.clone()),
                termination_protection: true,
            });
        }

        for (env, environment) in &config.environments {
            if environment.service.enabled {
                stacks.push(StackPlan {
                    name: config.app_stack_name(env),
                    kind: StackKind::App,
                    env: Some(env.clone()),
                    termination_protection: false,
                });
            }
        }

        Plan { stacks }
    }

    /// Stacks in deployment order, narrowed by environment and stack names
    ///
    /// The shared network stack belongs to every environment. Unknown stack
    /// names are an error rather than an empty selection, a typo must not
    /// turn into a no-op deploy.
    pub fn select(
        &self,
        env: Option<&str>,
        names: &[String],
    ) -> eyre::Result<Vec<&StackPlan>> {
        for name in names {
            if !self.stacks.iter().any(|stack| &stack.name == name) {
                return Err(eyre::eyre!(
                    "Unknown stack {name:?}, defined stacks: {}",
                    self.stacks
                        .iter()
                        .map(|stack| stack.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
        }

        Ok(self
            .stacks
            .iter()
            .filter(|stack| match (env, &stack.env) {
                (Some(wanted), Some(actual)) => wanted == actual,
                (Some(_), None) | (None, _) => true,
            })
            .filter(|stack| names.is_empty() || names.contains(&stack.name))
            .collect())
    }

    /// Selection in teardown order, dependents first
    pub fn select_reversed(
        &self,
        env: Option<&str>,
        names: &[String],
    ) -> eyre::Result<Vec<&StackPlan>> {
        let mut stacks = self.select(env, names)?;
        stacks.reverse();
        Ok(stacks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::fixture;

    fn names(stacks: &[&StackPlan]) -> Vec<String> {
        stacks.iter().map(|stack| stack.name.clone()).collect()
    }

    #[test]
    fn leaves_come_before_dependents() {
        let config = fixture();
        let plan = Plan::new(&config);
        let all = plan.select(None, &[]).unwrap();
        let all = names(&all);

        let position = |name: &str| all.iter().position(|n| n == name).unwrap();

        assert_eq!(position("demo-app-network"), 0);
        assert!(position("demo-app-registry-dev") < position("demo-app-load-balancer-dev"));
        assert!(position("demo-app-load-balancer-dev") < position("demo-app-database-dev"));
        assert!(position("demo-app-database-dev") < position("demo-app-dev"));
    }

    #[test]
    fn disabled_components_stay_out_of_the_plan() {
        let config = fixture();
        let plan = Plan::new(&config);
        let all = plan.select(None, &[]).unwrap();
        let all = names(&all);

        // The prod service and both queues are disabled in the fixture
        assert!(!all.contains(&"demo-app-prod".to_string()));
        assert!(!all.iter().any(|name| name.contains("queue")));

        // Its database and registry still deploy
        assert!(all.contains(&"demo-app-database-prod".to_string()));
        assert!(all.contains(&"demo-app-registry-prod".to_string()));
    }

    #[test]
    fn enabling_the_queue_adds_its_stack_before_the_load_balancers() {
        let mut config = fixture();
        config.environments.get_mut("dev").unwrap().queue.enabled = true;

        let plan = Plan::new(&config);
        let all = plan.select(None, &[]).unwrap();
        let all = names(&all);

        let position = |name: &str| all.iter().position(|n| n == name).unwrap();
        assert!(position("demo-app-queue-dev") < position("demo-app-load-balancer-dev"));
    }

    #[test]
    fn environment_filter_keeps_the_shared_network() {
        let config = fixture();
        let plan = Plan::new(&config);
        let dev = plan.select(Some("dev"), &[]).unwrap();
        let dev = names(&dev);

        assert!(dev.contains(&"demo-app-network".to_string()));
        assert!(dev.contains(&"demo-app-database-dev".to_string()));
        assert!(!dev.iter().any(|name| name.ends_with("-prod")));
    }

    #[test]
    fn unknown_stack_names_are_rejected() {
        let config = fixture();
        let plan = Plan::new(&config);

        assert!(plan
            .select(None, &["demo-app-databse-dev".to_string()])
            .is_err());
    }

    #[test]
    fn teardown_order_is_the_exact_reverse() {
        let config = fixture();
        let plan = Plan::new(&config);

        let mut forward = names(&plan.select(None, &[]).unwrap());
        let backward = names(&plan.select_reversed(None, &[]).unwrap());

        forward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn every_planned_stack_synthesizes() {
        let config = fixture();
        let plan = Plan::new(&config);

        for stack in plan.select(None, &[]).unwrap() {
            let template = stack.synthesize(&config).unwrap();
            assert!(!template.resource_names().is_empty(), "{}", stack.name);
        }
    }
}
