//! Application assembly: builds stacks, wires exports to imports, orders
//! stacks for deployment.

use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::template::{Export, Output, Template};
use crate::token::Reference;
use crate::{Error, LogicalId, Result, StackEnv, StackName, StackScope};

pub const MANIFEST_VERSION: &str = "36.0.0";
pub const MANIFEST_FILE: &str = "manifest.json";

/// A unit of declared infrastructure.
///
/// `build` declares resources into the scope and returns whatever the stack
/// exposes to its consumers. It must not depend on anything but `self` and
/// the scope, so building twice yields the same template.
pub trait Stack {
    type Output;

    fn build(&self, scope: &mut StackScope) -> Result<Self::Output>;
}

struct BuiltStack {
    name: StackName,
    template: Template,
    imports: BTreeSet<Reference>,
}

/// Collects built stacks and turns them into a [`CloudAssembly`].
pub struct App {
    env: StackEnv,
    stacks: Vec<BuiltStack>,
    explicit_dependencies: Vec<(StackName, StackName)>,
}

impl App {
    pub fn new(env: StackEnv) -> Self {
        Self {
            env,
            stacks: Vec::new(),
            explicit_dependencies: Vec::new(),
        }
    }

    pub fn env(&self) -> &StackEnv {
        &self.env
    }

    /// Build `stack` under `name`. The stack is only recorded when its build
    /// succeeds; a failed build leaves the app unchanged.
    pub fn add_stack<S: Stack>(&mut self, name: &str, stack: &S) -> Result<S::Output> {
        let name = StackName::new(name)?;
        if self.stacks.iter().any(|s| s.name == name) {
            return Err(Error::Duplicate(format!("stack '{}'", name)));
        }

        let mut scope = StackScope::new(name, self.env.clone());
        let output = stack.build(&mut scope)?;
        let (name, template, imports) = scope.into_parts();

        info!(
            stack = %name,
            resources = template.resources.len(),
            imports = imports.len(),
            "built stack"
        );
        self.stacks.push(BuiltStack {
            name,
            template,
            imports,
        });
        Ok(output)
    }

    /// Require `consumer` to be deployed after `producer` even when no value
    /// flows between them.
    pub fn add_dependency(&mut self, consumer: &str, producer: &str) -> Result<()> {
        let consumer = StackName::new(consumer)?;
        let producer = StackName::new(producer)?;
        if consumer == producer {
            return Err(Error::CycleDetected(format!("{consumer} -> {producer}")));
        }
        self.explicit_dependencies.push((consumer, producer));
        Ok(())
    }

    /// Publish exports for every cross-stack reference and order the stacks.
    pub fn synth(self) -> Result<CloudAssembly> {
        let order: Vec<StackName> = self.stacks.iter().map(|s| s.name.clone()).collect();
        let mut templates: HashMap<StackName, Template> = HashMap::new();
        let mut dependencies: HashMap<StackName, BTreeSet<StackName>> = HashMap::new();
        let mut imports: Vec<(StackName, Reference)> = Vec::new();

        for stack in self.stacks {
            dependencies.insert(stack.name.clone(), BTreeSet::new());
            imports.extend(stack.imports.into_iter().map(|r| (stack.name.clone(), r)));
            templates.insert(stack.name, stack.template);
        }

        for (consumer, reference) in imports {
            let producer = templates
                .get_mut(&reference.stack)
                .ok_or_else(|| Error::UnknownStack(reference.stack.to_string()))?;
            publish_export(producer, &reference)?;
            debug!(
                consumer = %consumer,
                reference = %reference,
                export = %reference.export_name(),
                "wired cross-stack reference"
            );
            if let Some(deps) = dependencies.get_mut(&consumer) {
                deps.insert(reference.stack.clone());
            }
        }

        for (consumer, producer) in self.explicit_dependencies {
            if !templates.contains_key(&producer) {
                return Err(Error::UnknownStack(producer.to_string()));
            }
            dependencies
                .get_mut(&consumer)
                .ok_or_else(|| Error::UnknownStack(consumer.to_string()))?
                .insert(producer);
        }

        let deploy_order = topological_order(&order, &dependencies)?;
        let environment = self.env.manifest_environment();

        let artifacts = deploy_order
            .into_iter()
            .map(|name| {
                let template = templates.remove(&name).unwrap_or_default();
                let dependencies = dependencies
                    .remove(&name)
                    .map(|d| d.into_iter().collect())
                    .unwrap_or_default();
                StackArtifact {
                    name,
                    template,
                    dependencies,
                    environment: environment.clone(),
                }
            })
            .collect();

        Ok(CloudAssembly { artifacts })
    }
}

fn publish_export(producer: &mut Template, reference: &Reference) -> Result<()> {
    if !producer.resources.contains_key(&reference.target) {
        return Err(Error::invalid_value(
            "reference",
            format!(
                "stack '{}' declares no resource '{}'",
                reference.stack, reference.target
            ),
        ));
    }

    let output_id = LogicalId::new(reference.export_output_id())?;
    let value = match &reference.attribute {
        None => json!({ "Ref": reference.target }),
        Some(attr) => json!({ "Fn::GetAtt": [reference.target, attr] }),
    };
    producer.outputs.entry(output_id).or_insert_with(|| Output {
        value,
        description: None,
        export: Some(Export {
            name: reference.export_name(),
        }),
    });
    Ok(())
}

/// Order stacks so every stack follows its dependencies, keeping the
/// insertion order where there is a choice.
fn topological_order(
    order: &[StackName],
    dependencies: &HashMap<StackName, BTreeSet<StackName>>,
) -> Result<Vec<StackName>> {
    let mut visited: HashMap<&StackName, bool> = HashMap::new();
    let mut sorted = Vec::with_capacity(order.len());

    for name in order {
        visit(name, dependencies, &mut visited, &mut sorted)?;
    }
    Ok(sorted)
}

/// DFS post-order. `visited[n] == false` means `n` is on the current path.
fn visit<'a>(
    name: &'a StackName,
    dependencies: &'a HashMap<StackName, BTreeSet<StackName>>,
    visited: &mut HashMap<&'a StackName, bool>,
    sorted: &mut Vec<StackName>,
) -> Result<()> {
    match visited.get(name) {
        Some(true) => return Ok(()),
        Some(false) => return Err(Error::CycleDetected(name.to_string())),
        None => {}
    }
    visited.insert(name, false);

    if let Some(deps) = dependencies.get(name) {
        for dep in deps {
            visit(dep, dependencies, visited, sorted).map_err(|e| match e {
                Error::CycleDetected(path) => Error::CycleDetected(format!("{name} -> {path}")),
                other => other,
            })?;
        }
    }

    visited.insert(name, true);
    sorted.push(name.clone());
    Ok(())
}

/// A synthesized stack ready to hand to the deployment engine.
#[derive(Debug, Clone)]
pub struct StackArtifact {
    pub name: StackName,
    pub template: Template,
    pub dependencies: Vec<StackName>,
    pub environment: String,
}

impl StackArtifact {
    pub fn template_file(&self) -> String {
        format!("{}.template.json", self.name)
    }
}

/// All stacks of an app in deployment order.
#[derive(Debug, Clone)]
pub struct CloudAssembly {
    artifacts: Vec<StackArtifact>,
}

impl CloudAssembly {
    pub fn artifacts(&self) -> &[StackArtifact] {
        &self.artifacts
    }

    pub fn stack(&self, name: &str) -> Option<&StackArtifact> {
        self.artifacts.iter().find(|a| a.name.as_str() == name)
    }

    pub fn deployment_order(&self) -> Vec<&StackName> {
        self.artifacts.iter().map(|a| &a.name).collect()
    }

    /// Manifest describing every artifact and its dependencies.
    pub fn manifest(&self) -> Value {
        let mut artifacts = Map::new();
        for artifact in &self.artifacts {
            artifacts.insert(
                artifact.name.to_string(),
                json!({
                    "type": "aws:cloudformation:stack",
                    "environment": artifact.environment,
                    "properties": { "templateFile": artifact.template_file() },
                    "dependencies": artifact.dependencies,
                }),
            );
        }
        json!({
            "version": MANIFEST_VERSION,
            "artifacts": artifacts,
        })
    }

    /// Write one template per stack plus the manifest into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.artifacts.len() + 1);

        for artifact in &self.artifacts {
            let path = dir.join(artifact.template_file());
            std::fs::write(&path, artifact.template.to_json_pretty()?)?;
            debug!(stack = %artifact.name, path = %path.display(), "wrote template");
            written.push(path);
        }

        let manifest_path = dir.join(MANIFEST_FILE);
        std::fs::write(&manifest_path, serde_json::to_string_pretty(&self.manifest())?)?;
        written.push(manifest_path);
        Ok(written)
    }

    /// Stack outputs keyed by stack name, for display.
    pub fn outputs(&self) -> BTreeMap<&str, Vec<&str>> {
        self.artifacts
            .iter()
            .map(|a| {
                (
                    a.name.as_str(),
                    a.template.outputs.keys().map(LogicalId::as_str).collect(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Token;
    use crate::template::Resource;

    struct Producer;

    impl Stack for Producer {
        type Output = Token;

        fn build(&self, scope: &mut StackScope) -> Result<Token> {
            let id = scope.add_resource(&["Pool"], Resource::new("AWS::Cognito::UserPool"))?;
            Ok(scope.reference(&id))
        }
    }

    struct Consumer {
        input: Token,
    }

    impl Stack for Consumer {
        type Output = ();

        fn build(&self, scope: &mut StackScope) -> Result<()> {
            if self.input.is_empty() {
                return Err(Error::MissingField("input".to_string()));
            }
            let value = scope.resolve(&self.input);
            scope.add_resource(
                &["Site"],
                Resource::new("AWS::Amplify::App").property("PoolId", value),
            )?;
            Ok(())
        }
    }

    fn app() -> App {
        App::new(StackEnv::resolve(Some("us-east-1"), None))
    }

    #[test]
    fn test_cross_stack_reference_is_exported() {
        let mut app = app();
        let pool = app.add_stack("Identity", &Producer).unwrap();
        app.add_stack("Site", &Consumer { input: pool.clone() }).unwrap();
        let assembly = app.synth().unwrap();

        let identity = assembly.stack("Identity").unwrap();
        let (output_id, output) = identity.template.outputs.iter().next().unwrap();
        assert!(output_id.as_str().starts_with("ExportsOutputRefPool"));
        let export_name = &output.export.as_ref().unwrap().name;
        assert!(export_name.starts_with("Identity:ExportsOutputRefPool"));

        let site = assembly.stack("Site").unwrap();
        let (_, resource) = site.template.single_resource_of_type("AWS::Amplify::App").unwrap();
        assert_eq!(
            resource.properties["PoolId"],
            json!({ "Fn::ImportValue": export_name })
        );
        assert_eq!(site.dependencies, vec![StackName::new("Identity").unwrap()]);
    }

    #[test]
    fn test_failed_build_declares_nothing() {
        let mut app = app();
        let err = app
            .add_stack("Site", &Consumer { input: Token::literal("") })
            .unwrap_err();
        assert!(matches!(err, Error::MissingField(_)));
        assert!(app.synth().unwrap().artifacts().is_empty());
    }

    #[test]
    fn test_duplicate_stack_name() {
        let mut app = app();
        app.add_stack("Identity", &Producer).unwrap();
        assert!(matches!(
            app.add_stack("Identity", &Producer),
            Err(Error::Duplicate(_))
        ));
    }

    #[test]
    fn test_dependencies_reorder_stacks() {
        let mut app = app();
        app.add_stack("A", &Producer).unwrap();
        app.add_stack("B", &Producer).unwrap();
        app.add_dependency("A", "B").unwrap();
        let assembly = app.synth().unwrap();
        let order: Vec<&str> = assembly.deployment_order().iter().map(|n| n.as_str()).collect();
        assert_eq!(order, vec!["B", "A"]);
    }

    #[test]
    fn test_cycle_detected() {
        let mut app = app();
        app.add_stack("A", &Producer).unwrap();
        app.add_stack("B", &Producer).unwrap();
        app.add_dependency("A", "B").unwrap();
        app.add_dependency("B", "A").unwrap();
        assert!(matches!(app.synth(), Err(Error::CycleDetected(_))));
    }

    #[test]
    fn test_unknown_producer() {
        let mut app = app();
        let foreign = Token::Ref(Reference {
            stack: StackName::new("Missing").unwrap(),
            target: LogicalId::new("Pool").unwrap(),
            attribute: None,
        });
        app.add_stack("Site", &Consumer { input: foreign }).unwrap();
        assert!(matches!(app.synth(), Err(Error::UnknownStack(s)) if s == "Missing"));
    }

    #[test]
    fn test_manifest() {
        let mut app = app();
        let pool = app.add_stack("Identity", &Producer).unwrap();
        app.add_stack("Site", &Consumer { input: pool }).unwrap();
        let manifest = app.synth().unwrap().manifest();

        assert_eq!(manifest["version"], MANIFEST_VERSION);
        assert_eq!(
            manifest["artifacts"]["Site"]["properties"]["templateFile"],
            "Site.template.json"
        );
        assert_eq!(manifest["artifacts"]["Site"]["dependencies"], json!(["Identity"]));
        assert_eq!(
            manifest["artifacts"]["Identity"]["environment"],
            "aws://unknown-account/us-east-1"
        );
    }

    #[test]
    fn test_synth_is_deterministic() {
        let build = || {
            let mut app = app();
            let pool = app.add_stack("Identity", &Producer).unwrap();
            app.add_stack("Site", &Consumer { input: pool }).unwrap();
            let assembly = app.synth().unwrap();
            assembly
                .artifacts()
                .iter()
                .map(|a| a.template.to_json_pretty().unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(build(), build());
    }
}
