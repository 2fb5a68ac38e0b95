//! Generation orchestration - coordinates the generation workflow
//!
//! `Loading → [GeneratingStubs →] [ParsingSpec → MergingEndpoints →] Validating
//! → PreparingData → Rendering → Writing → [GeneratingTests] → [GeneratingReadme]
//! → Done`, or `Failed` from any stage. Public entry points never return `Err`
//! for a single service; failures are folded into [`ServiceGenerationResult`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::core::error::{Error, Result};
use crate::definition::{
    ExternalSpecRef, RestSpec, ServiceDefinition, ServiceType, validate_definition,
};
use crate::infrastructure::openapi::{SpecGeneratorFactory, SpecOptions, SpecSource};
use crate::infrastructure::output::FileSystemOutputService;
use crate::infrastructure::shell::{CommandExecutor, ProcessCommandExecutor};
use crate::infrastructure::templates::RenderOptions;

use super::context::{SpecSummary, TemplateData};
use super::merger::{convert_to_rest_endpoint, merge_endpoints};
use super::traits::{OutputService, TemplateRenderer};
use super::types::{GenerateOptions, GenerationStage, ServiceGenerationResult};

/// Template rendered for the optional test file
pub const TEST_TEMPLATE: &str = "service-test.tera";
/// Template rendered for the optional README
pub const README_TEMPLATE: &str = "readme.tera";
/// Subdirectory of the output directory receiving protoc stubs
pub const GENERATED_STUBS_DIR: &str = "generated";

/// Templates shipped with the crate
pub fn bundled_templates_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/templates"))
}

/// Whether a file name follows the definition naming convention:
/// `service.{yaml,yml,json}` or `*.service.{yaml,yml,json}`
pub fn is_definition_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    ["yaml", "yml", "json"].iter().any(|ext| {
        let suffix = format!("service.{ext}");
        name == suffix || name.ends_with(&format!(".{suffix}"))
    })
}

/// Progress of one generation call
struct Run {
    stage: GenerationStage,
    files: Vec<PathBuf>,
    warnings: Vec<String>,
}

impl Run {
    fn new() -> Self {
        Self {
            stage: GenerationStage::Idle,
            files: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn advance(&mut self, stage: GenerationStage) {
        debug!(from = %self.stage, to = %stage, "Generation stage");
        self.stage = stage;
    }

    fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.warnings.push(message);
    }

    fn fail(self, err: impl std::fmt::Display) -> ServiceGenerationResult {
        let message = format!("Generation failed while {}: {err}", self.stage);
        error!(stage = %self.stage, "{message}");
        ServiceGenerationResult {
            success: false,
            files: self.files,
            warnings: self.warnings,
            error: Some(message),
            service_definition: None,
            source: None,
        }
    }

    fn finish(mut self, definition: ServiceDefinition) -> ServiceGenerationResult {
        self.advance(GenerationStage::Done);
        ServiceGenerationResult {
            success: true,
            files: self.files,
            warnings: self.warnings,
            error: None,
            service_definition: Some(definition),
            source: None,
        }
    }
}

/// Builder for [`ServiceGenerator`]
pub struct ServiceGeneratorBuilder {
    renderer: Option<Arc<dyn TemplateRenderer>>,
    output: Arc<dyn OutputService>,
    executor: Arc<dyn CommandExecutor>,
    bundled_templates: bool,
}

impl ServiceGeneratorBuilder {
    pub fn renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn output(mut self, output: Arc<dyn OutputService>) -> Self {
        self.output = output;
        self
    }

    pub fn executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Register the crate's `templates/` directory at priority 0 (default on)
    pub fn bundled_templates(mut self, enabled: bool) -> Self {
        self.bundled_templates = enabled;
        self
    }

    pub fn build(self) -> ServiceGenerator {
        if let Some(renderer) = &self.renderer {
            if self.bundled_templates {
                renderer.add_template_directory(&bundled_templates_dir(), 0);
            }
        }
        ServiceGenerator {
            renderer: self.renderer,
            output: self.output,
            executor: self.executor,
            specs: SpecGeneratorFactory::new(),
        }
    }
}

/// Compiles service definitions into service sources
pub struct ServiceGenerator {
    renderer: Option<Arc<dyn TemplateRenderer>>,
    output: Arc<dyn OutputService>,
    executor: Arc<dyn CommandExecutor>,
    specs: SpecGeneratorFactory,
}

impl ServiceGenerator {
    pub fn builder() -> ServiceGeneratorBuilder {
        ServiceGeneratorBuilder {
            renderer: None,
            output: Arc::new(FileSystemOutputService::new()),
            executor: Arc::new(ProcessCommandExecutor::new()),
            bundled_templates: true,
        }
    }

    /// Generate a service from a definition file
    pub async fn generate(
        &self,
        definition_path: &Path,
        options: &GenerateOptions,
    ) -> ServiceGenerationResult {
        let mut run = Run::new();
        let Some(renderer) = self.renderer.as_deref() else {
            return run.fail("a template engine is required");
        };

        run.advance(GenerationStage::Loading);
        info!(path = %definition_path.display(), "Generating service");
        let definition = match ServiceDefinition::load(definition_path).await {
            Ok(definition) => definition,
            Err(e) => return run.fail(e),
        };
        let base_dir = definition_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut result = self
            .run_pipeline(renderer, run, definition, &base_dir, options)
            .await;
        result.source = Some(definition_path.to_path_buf());
        result
    }

    /// Generate a service from an in-memory definition.
    ///
    /// Relative spec and proto paths are resolved against `base_dir`.
    pub async fn generate_definition(
        &self,
        definition: ServiceDefinition,
        base_dir: &Path,
        options: &GenerateOptions,
    ) -> ServiceGenerationResult {
        let run = Run::new();
        let Some(renderer) = self.renderer.as_deref() else {
            return run.fail("a template engine is required");
        };
        self.run_pipeline(renderer, run, definition, base_dir, options)
            .await
    }

    /// Generate every definition file found under `dir`, one after another.
    ///
    /// Only a missing root directory is an error; each file's failure stays
    /// in its own result.
    pub async fn generate_from_directory(
        &self,
        dir: &Path,
        options: &GenerateOptions,
    ) -> Result<Vec<ServiceGenerationResult>> {
        let is_dir = fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false);
        if !is_dir {
            return Err(Error::config(format!(
                "Definition directory not found: {}",
                dir.display()
            )));
        }

        let root = dir.to_path_buf();
        let files = tokio::task::spawn_blocking(move || discover_definitions(&root))
            .await
            .map_err(|e| Error::config(format!("Definition discovery failed: {e}")))?;
        info!(dir = %dir.display(), count = files.len(), "Discovered service definitions");

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            results.push(self.generate(&file, options).await);
        }
        Ok(results)
    }

    async fn run_pipeline(
        &self,
        renderer: &dyn TemplateRenderer,
        mut run: Run,
        definition: ServiceDefinition,
        base_dir: &Path,
        options: &GenerateOptions,
    ) -> ServiceGenerationResult {
        if definition.service_type() == Some(ServiceType::Grpc) {
            if let Some(proto_path) = definition
                .grpc()
                .map(|g| g.proto_path.clone())
                .filter(|p| !p.trim().is_empty())
            {
                run.advance(GenerationStage::GeneratingStubs);
                if let Err(e) = self
                    .generate_grpc_stubs(&mut run, &base_dir.join(proto_path), options)
                    .await
                {
                    return run.fail(e);
                }
            }
        }

        let mut definition = definition;
        let mut spec_summary = None;
        if let Some(spec_ref) = definition.external_spec().cloned() {
            run.advance(GenerationStage::ParsingSpec);
            let spec = match self
                .specs
                .parse(&spec_source(&spec_ref, base_dir), spec_options(&spec_ref))
                .await
            {
                Ok(spec) => spec,
                Err(e) => return run.fail(e),
            };

            run.advance(GenerationStage::MergingEndpoints);
            let from_spec = spec.endpoints.iter().map(convert_to_rest_endpoint).collect();
            let existing = definition.rest().cloned().unwrap_or_default();
            let merged = merge_endpoints(from_spec, &existing.endpoints);
            if let Some(warning) = merged.warning {
                run.warn(warning);
            }

            let base_url = spec_ref
                .base_url
                .clone()
                .filter(|u| !u.is_empty())
                .or_else(|| Some(existing.base_url.clone()).filter(|u| !u.is_empty()))
                .or_else(|| spec.base_url.clone())
                .unwrap_or_default();

            let service_spec = definition.spec.get_or_insert_with(Default::default);
            service_spec.rest = Some(RestSpec {
                base_url,
                endpoints: merged.endpoints,
            });
            spec_summary = Some(SpecSummary::from_spec(&spec));
            info!(
                endpoints = spec.endpoints.len(),
                title = %spec.info.title,
                "Merged specification endpoints"
            );
        }

        run.advance(GenerationStage::Validating);
        let report = validate_definition(&definition);
        for warning in &report.warnings {
            run.warn(format!("Definition warning: {warning}"));
        }
        if !report.valid {
            return run.fail(Error::validation(report.error_summary()));
        }

        run.advance(GenerationStage::PreparingData);
        let mut data = match TemplateData::for_definition(&definition, spec_summary.as_ref()) {
            Ok(data) => data,
            Err(e) => return run.fail(e),
        };
        data.extend(&options.template_data);
        let data = data.into_value();

        run.advance(GenerationStage::Rendering);
        let service_type = definition.service_type().unwrap_or(ServiceType::Rest);
        let template = options
            .template
            .clone()
            .unwrap_or_else(|| PathBuf::from(service_type.default_template()));
        let rendered = match renderer
            .render_file(&template, &data, &RenderOptions::default())
            .await
        {
            Ok(rendered) => rendered,
            Err(e) => return run.fail(e),
        };

        run.advance(GenerationStage::Writing);
        let output_path = options
            .output_dir
            .join(format!("{}.{}", definition.name, options.file_extension));
        if let Err(e) = self.write_output(&mut run, &output_path, &rendered, options).await {
            return run.fail(e);
        }

        if options.generate_tests {
            run.advance(GenerationStage::GeneratingTests);
            let path = options.output_dir.join(format!(
                "{}.test.{}",
                definition.name, options.file_extension
            ));
            self.render_secondary(renderer, &mut run, TEST_TEMPLATE, &data, &path, options)
                .await;
        }

        if options.generate_readme {
            run.advance(GenerationStage::GeneratingReadme);
            let path = options
                .output_dir
                .join(format!("{}.README.md", definition.name));
            self.render_secondary(renderer, &mut run, README_TEMPLATE, &data, &path, options)
                .await;
        }

        info!(
            service = %definition.name,
            files = run.files.len(),
            warnings = run.warnings.len(),
            "Service generated"
        );
        run.finish(definition)
    }

    /// Write one file honoring the overwrite policy.
    ///
    /// An existing file without `overwrite` is left alone and reported as a warning.
    async fn write_output(
        &self,
        run: &mut Run,
        path: &Path,
        content: &str,
        options: &GenerateOptions,
    ) -> Result<()> {
        if self.output.exists(path).await {
            if !options.overwrite {
                run.warn(format!(
                    "Output file {} already exists; set overwrite to replace it",
                    path.display()
                ));
                return Ok(());
            }
        } else if options.overwrite {
            self.output.ensure_directory(&options.output_dir).await?;
        }

        self.output.write_file(path, content).await?;
        run.files.push(path.to_path_buf());
        Ok(())
    }

    /// Test and README generation; every failure is a warning
    async fn render_secondary(
        &self,
        renderer: &dyn TemplateRenderer,
        run: &mut Run,
        template: &str,
        data: &serde_json::Value,
        path: &Path,
        options: &GenerateOptions,
    ) {
        let content = match renderer
            .render_file(Path::new(template), data, &RenderOptions::default())
            .await
        {
            Ok(content) => content,
            Err(e) => {
                run.warn(format!("Skipped {}: {e}", path.display()));
                return;
            }
        };
        if let Err(e) = self.write_output(run, path, &content, options).await {
            run.warn(format!("Failed to write {}: {e}", path.display()));
        }
    }

    /// Run protoc for a proto file into `output_dir/generated`.
    ///
    /// The version probe is fatal; the stub invocations themselves are best-effort.
    async fn generate_grpc_stubs(
        &self,
        run: &mut Run,
        proto_path: &Path,
        options: &GenerateOptions,
    ) -> Result<()> {
        let protoc = options.protoc.as_str();
        let cwd = std::env::current_dir()?;

        let probe = self
            .executor
            .execute(protoc, &["--version".to_string()], &cwd)
            .await
            .map_err(|_| Error::ToolMissing(protoc.to_string()))?;
        if !probe.is_success() {
            return Err(Error::ToolMissing(protoc.to_string()));
        }
        debug!(version = %probe.stdout.trim(), "Found protoc");

        let stubs_dir = options.output_dir.join(GENERATED_STUBS_DIR);
        self.output.ensure_directory(&stubs_dir).await?;

        let proto_dir = proto_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let stubs = stubs_dir.display();
        let invocations = [
            format!("--js_out=import_style=commonjs,binary:{stubs}"),
            format!("--grpc-web_out=import_style=typescript,mode=grpcwebtext:{stubs}"),
        ];
        for out_flag in invocations {
            let args = vec![
                format!("--proto_path={}", proto_dir.display()),
                out_flag,
                proto_path.display().to_string(),
            ];
            match self.executor.execute(protoc, &args, &cwd).await {
                Ok(result) if result.is_success() => {}
                Ok(result) => run.warn(format!(
                    "protoc exited with {}: {}",
                    result.exit_code,
                    result.stderr.trim()
                )),
                Err(e) => run.warn(format!("protoc invocation failed: {e}")),
            }
        }

        let mut entries = match fs::read_dir(&stubs_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                run.warn(format!("Could not list {}: {e}", stubs_dir.display()));
                return Ok(());
            }
        };
        let mut stub_files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            stub_files.push(entry.path());
        }
        stub_files.sort();
        run.files.extend(stub_files);
        Ok(())
    }
}

fn spec_source(spec_ref: &ExternalSpecRef, base_dir: &Path) -> SpecSource {
    SpecSource {
        object: spec_ref.inline.clone(),
        file: spec_ref.file.as_ref().map(|f| base_dir.join(f)),
        url: spec_ref.url.clone(),
    }
}

fn spec_options(spec_ref: &ExternalSpecRef) -> SpecOptions {
    let defaults = SpecOptions::default();
    SpecOptions {
        base_url_override: spec_ref.base_url.clone().filter(|u| !u.is_empty()),
        include_deprecated: spec_ref
            .include_deprecated
            .unwrap_or(defaults.include_deprecated),
        filter_tags: spec_ref.filter_tags.clone(),
        dereference: spec_ref.dereference.unwrap_or(defaults.dereference),
    }
}

/// Definition files under `root`, sorted by path
fn discover_definitions(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(
                    path = ?e.path().map(Path::display).map(|p| p.to_string()),
                    error = %e,
                    "Skipping unreadable entry"
                );
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_definition_file(e.path()))
        .map(|e| e.into_path())
        .collect()
}
