use serde_json::{json, Value};

/// A single named resource in a CFN template
#[derive(Clone, Debug)]
pub struct CfnResource {
    pub name: String,
    pub resource: Value,
}

/// A template output, optionally exported for `Fn::ImportValue` in dependent stacks
#[derive(Clone, Debug)]
pub struct Output {
    pub name: String,
    pub value: Value,
    pub export: Option<String>,
}

impl Output {
    pub fn new(name: &str, value: Value) -> Self {
        Output {
            name: name.to_string(),
            value,
            export: None,
        }
    }

    /// Export the output under the given name
    pub fn exported(name: &str, value: Value, export: &str) -> Self {
        Output {
            name: name.to_string(),
            value,
            export: Some(export.to_string()),
        }
    }
}

/// An in-memory CFN template
///
/// Synthesis is a pure function of the configuration: no clocks, no random
/// ids, no environment lookups. serde_json keeps object keys ordered, so the
/// same inputs always render the same bytes.
#[derive(Clone, Debug)]
pub struct Template {
    template: Value,
}

impl Template {
    pub fn new(description: &str) -> Self {
        Template {
            template: json!({
                "AWSTemplateFormatVersion": "2010-09-09",
                "Description": description,
                "Resources": {},
            }),
        }
    }

    /// Add a resource to the CFN template
    pub fn add_resource(&mut self, CfnResource { name, resource }: CfnResource) {
        self.template
            .get_mut("Resources")
            .unwrap()
            .as_object_mut()
            .unwrap()
            .insert(name, resource);
    }

    pub fn add_resources(&mut self, resources: Vec<CfnResource>) {
        for resource in resources {
            self.add_resource(resource);
        }
    }

    pub fn add_output(&mut self, output: Output) {
        let mut entry = json!({ "Value": output.value });

        if let Some(export) = output.export {
            entry
                .as_object_mut()
                .unwrap()
                .insert("Export".into(), json!({ "Name": export }));
        }

        // The Outputs section is only present once an output is added,
        // CFN rejects an empty Outputs object
        self.template
            .as_object_mut()
            .unwrap()
            .entry("Outputs")
            .or_insert_with(|| json!({}))
            .as_object_mut()
            .unwrap()
            .insert(output.name, entry);
    }

    pub fn add_outputs(&mut self, outputs: Vec<Output>) {
        for output in outputs {
            self.add_output(output);
        }
    }

    /// The template body submitted to CloudFormation
    pub fn body(&self) -> String {
        // Infallible: the template tree is built from json! literals only
        serde_json::to_string_pretty(&self.template).unwrap()
    }

    pub fn resource(&self, name: &str) -> Option<&Value> {
        self.template.get("Resources").and_then(|r| r.get(name))
    }

    pub fn resource_names(&self) -> Vec<&String> {
        self.template
            .get("Resources")
            .and_then(|r| r.as_object())
            .map(|r| r.keys().collect())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.body())
    }
}
