use crate::app::{shared_variable_names, SUPERVISOR_TRACING};
use crate::config::{Config, Container, Environment};
use regex::Regex;
use std::collections::BTreeMap;

/// Verify the configuration invariants before any synthesis
///
/// Every command runs this first, a violated invariant aborts the whole run
/// rather than producing a template that deploys into a collision.
pub fn check(config: &Config) -> eyre::Result<()> {
    let mut violations = Vec::new();

    // Infallible: the pattern is a literal
    let env_name = Regex::new("^[a-z][a-z0-9]*$").unwrap();

    if config.network.max_azs < 1 || config.network.max_azs > 6 {
        violations.push(format!(
            "network.max_azs must be between 1 and 6, got {}",
            config.network.max_azs
        ));
    } else if config.network.nat_gateways < 1
        || config.network.nat_gateways > config.network.max_azs
    {
        violations.push(format!(
            "network.nat_gateways must be between 1 and max_azs, got {}",
            config.network.nat_gateways
        ));
    }

    for (env, environment) in &config.environments {
        if !env_name.is_match(env) {
            violations.push(format!(
                "Environment name {env:?} is not a valid resource name suffix \
                 (lowercase letters and digits only)"
            ));
        }

        check_environment(env, environment, &mut violations);
    }

    check_cross_environment(config, &mut violations);

    if violations.is_empty() {
        return Ok(());
    }

    Err(eyre::eyre!(
        "Invalid configuration:\n  - {}",
        violations.join("\n  - ")
    ))
}

fn check_environment(env: &str, environment: &Environment, violations: &mut Vec<String>) {
    let service = &environment.service;

    if environment.database.min_capacity > environment.database.max_capacity {
        violations.push(format!(
            "[{env}] database.min_capacity exceeds max_capacity"
        ));
    }

    if service.desired_count < 1 {
        violations.push(format!("[{env}] service.desired_count must be at least 1"));
    }

    if service.capacity_provider.is_empty() {
        violations.push(format!(
            "[{env}] service.capacity_provider must declare at least one strategy"
        ));
    }

    for strategy in &service.capacity_provider {
        if strategy.weight == 0 {
            violations.push(format!(
                "[{env}] capacity provider {} has zero weight",
                strategy.capacity_provider
            ));
        }
    }

    match service.memory.parse::<u32>() {
        Ok(memory) => {
            let reserved: u32 = service
                .containers
                .iter()
                .map(|container| container.memory_reservation)
                .sum();

            if reserved > memory {
                violations.push(format!(
                    "[{env}] container memory reservations ({reserved} MiB) exceed \
                     the task memory ({memory} MiB)"
                ));
            }
        }

        Err(_) => violations.push(format!(
            "[{env}] service.memory is not a number: {:?}",
            service.memory
        )),
    }

    // The app stack injects a shared block into the runtime and supervisor,
    // overwriting any per-container entry. Each collision must be removed
    // from the container's own set so the overwrite rule never fires
    // accidentally.
    let shared = shared_variable_names(environment);

    for (role, container, extra) in [
        ("runtime", &service.containers.runtime, false),
        ("supervisor", &service.containers.supervisor, true),
    ] {
        check_variable_collisions(env, role, container, &shared, extra, violations);
    }
}

fn check_variable_collisions(
    env: &str,
    role: &str,
    container: &Container,
    shared: &[&str],
    with_tracing: bool,
    violations: &mut Vec<String>,
) {
    for name in container.environment.keys() {
        let collides = shared.contains(&name.as_str())
            || (with_tracing && SUPERVISOR_TRACING.iter().any(|(key, _)| key == name));

        if collides {
            violations.push(format!(
                "[{env}] {role} container redefines {name}, which the service \
                 injects itself, remove it from the container environment"
            ));
        }
    }
}

fn check_cross_environment(config: &Config, violations: &mut Vec<String>) {
    // Free-form resource names must stay unique across the environment set,
    // the environment suffix convention only helps when it is actually used
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();

    for (env, environment) in &config.environments {
        for name in [
            environment.database.cluster_name.as_str(),
            environment.load_balancer.name.as_str(),
            environment.registry.proxy_image.as_str(),
            environment.registry.runtime_image.as_str(),
        ] {
            match seen.get(name) {
                Some(other) if *other != env.as_str() => violations.push(format!(
                    "Resource name {name:?} is used by both {other:?} and {env:?}"
                )),
                _ => {
                    seen.insert(name, env);
                }
            }
        }
    }

    // Priorities decide match order on a shared listener, two applications
    // on the same priority would shadow each other
    let mut priorities: BTreeMap<(&str, u32), &str> = BTreeMap::new();

    for (env, environment) in &config.environments {
        let attachment = &environment.service.load_balancer;
        let key = (
            attachment.listener_arn.as_str(),
            attachment.listener_priority,
        );

        match priorities.get(&key) {
            Some(other) => violations.push(format!(
                "Listener priority {} on {} is assigned to both {other:?} and {env:?}",
                attachment.listener_priority, attachment.listener_arn
            )),
            None => {
                priorities.insert(key, env);
            }
        }
    }

    // Production keeps stronger protection than any other environment
    if let Some(prod) = config.environments.get("prod") {
        if !prod.database.deletion_protection {
            violations
                .push("[prod] database.deletion_protection must stay enabled".to_string());
        }

        for (env, environment) in &config.environments {
            if env != "prod"
                && prod.database.backup_retention_days
                    < environment.database.backup_retention_days
            {
                violations.push(format!(
                    "[prod] database.backup_retention_days ({}) is lower than {env}'s ({})",
                    prod.database.backup_retention_days,
                    environment.database.backup_retention_days
                ));
            }
        }
    }
}
