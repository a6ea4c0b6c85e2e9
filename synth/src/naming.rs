/// Turn a kebab-case resource name into a CFN logical id
///
/// Logical ids are restricted to alphanumerics, so each `-`, `_` or `.`
/// separated segment is capitalized instead.
pub fn logical_id(name: &str) -> String {
    name.split(['-', '_', '.'])
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();

            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// The `<app>-<env>` identifier all per-environment resource names start with
pub fn app_id(app: &str, env: &str) -> String {
    format!("{app}-{env}").to_lowercase()
}

/// Export name published by the network stack
pub fn network_export(network_stack: &str, suffix: &str) -> String {
    format!("{network_stack}-{suffix}")
}

/// Export name published by a per-environment stack
pub fn env_export(app: &str, stack: &str, env: &str, suffix: &str) -> String {
    format!("{app}-{stack}-{env}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_id_strips_separators() {
        assert_eq!(logical_id("afup-demo-app-dev"), "AfupDemoAppDev");
        assert_eq!(logical_id("php_fpm"), "PhpFpm");
        assert_eq!(logical_id("a--b"), "AB");
    }

    #[test]
    fn app_id_is_lowercase() {
        assert_eq!(app_id("Demo-App", "dev"), "demo-app-dev");
    }

    #[test]
    fn export_names_are_flat_kebab() {
        assert_eq!(network_export("demo-network", "vpc-id"), "demo-network-vpc-id");
        assert_eq!(
            env_export("demo", "database", "prod", "secret-arn"),
            "demo-database-prod-secret-arn"
        );
    }
}
