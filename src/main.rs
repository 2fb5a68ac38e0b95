//! servicegen CLI entrypoint
//! Parses command-line arguments and dispatches to the service generator.
#![deny(unsafe_code)]

// Internal imports (std, crate)
use servicegen::core::config::{EnvTemplateConfigReader, GeneratorConfig};
use servicegen::generation::{GenerateOptions, ServiceGenerationResult, ServiceGenerator};
use servicegen::infrastructure::openapi::{SpecGeneratorFactory, SpecOptions, SpecSource};
use servicegen::infrastructure::templates::TemplateEngine;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// External imports (alphabetized)
use anyhow::Context;
use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "servicegen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Generate service sources from a definition file or a directory of them
    Generate {
        /// Service definition file (YAML or JSON)
        #[arg(required_unless_present = "dir", conflicts_with = "dir")]
        definition: Option<PathBuf>,
        /// Generate every `service.*` / `*.service.*` file under this directory
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Generator configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output directory for generated code
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Template to use instead of the service type's default
        #[arg(long)]
        template: Option<PathBuf>,
        /// Additional template directory, searched before the bundled templates
        #[arg(long)]
        template_dir: Vec<PathBuf>,
        /// Replace files that already exist
        #[arg(long)]
        overwrite: bool,
        /// Also render the service test file
        #[arg(long)]
        tests: bool,
        /// Also render the service README
        #[arg(long)]
        readme: bool,
        /// Extension of generated source files
        #[arg(long)]
        extension: Option<String>,
    },
    /// Parse an OpenAPI/Swagger document and print its normalized summary
    #[command(name = "spec-info")]
    SpecInfo {
        /// Path or URL of the specification
        source: String,
        /// Skip deprecated operations
        #[arg(long)]
        exclude_deprecated: bool,
        /// Keep only operations carrying one of these tags
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Print the full normalized specification as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a template for syntax errors and list the variables it uses
    #[command(name = "check-template")]
    CheckTemplate {
        /// Template file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with default level INFO
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate {
            definition,
            dir,
            config,
            output_dir,
            template,
            template_dir,
            overwrite,
            tests,
            readme,
            extension,
        } => {
            let config = match config {
                Some(path) => GeneratorConfig::load(&path)
                    .await
                    .context("Failed to load generator config")?,
                None => GeneratorConfig::default(),
            };

            let mut options = config.to_options();
            if let Some(output_dir) = output_dir {
                options.output_dir = output_dir;
            }
            if let Some(extension) = extension {
                options.file_extension = extension;
            }
            options.template = template;
            options.overwrite |= overwrite;
            options.generate_tests |= tests;
            options.generate_readme |= readme;

            let engine = Arc::new(TemplateEngine::with_cache(config.cache));
            for dir in config.resolved_template_dirs(&EnvTemplateConfigReader) {
                engine.add_template_directory(dir.path, dir.priority);
            }
            for path in template_dir {
                engine.add_template_directory(path, 50);
            }
            let generator = ServiceGenerator::builder().renderer(engine).build();

            let results = match (definition, dir) {
                (_, Some(dir)) => generator
                    .generate_from_directory(&dir, &options)
                    .await
                    .context("Failed to generate services")?,
                (Some(definition), None) => vec![generator.generate(&definition, &options).await],
                (None, None) => anyhow::bail!("Either a definition file or --dir is required"),
            };
            if !report_results(&results, &options) {
                std::process::exit(1);
            }
        }
        Commands::SpecInfo {
            source,
            exclude_deprecated,
            tags,
            json,
        } => print_spec_info(&source, exclude_deprecated, tags, json).await?,
        Commands::CheckTemplate { path } => {
            if !check_template(&path).await? {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

/// Print one line per result. Returns false when any service failed.
fn report_results(results: &[ServiceGenerationResult], options: &GenerateOptions) -> bool {
    if results.is_empty() {
        warn!("No service definitions found");
    }

    let mut ok = true;
    for result in results {
        let label = result
            .source
            .as_deref()
            .map(Path::display)
            .map(|d| d.to_string())
            .unwrap_or_default();
        for warning in &result.warnings {
            warn!(source = %label, "{warning}");
        }
        if result.success {
            info!(source = %label, files = result.files.len(), "✅ Generated");
            for file in &result.files {
                println!("  {}", file.display());
            }
        } else {
            ok = false;
            error!(
                source = %label,
                "{}",
                result.error.as_deref().unwrap_or("generation failed")
            );
        }
    }

    let succeeded = results.iter().filter(|r| r.success).count();
    info!(
        output_dir = %options.output_dir.display(),
        "{succeeded}/{} service(s) generated",
        results.len()
    );
    ok
}

async fn print_spec_info(
    source: &str,
    exclude_deprecated: bool,
    tags: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let options = SpecOptions {
        include_deprecated: !exclude_deprecated,
        filter_tags: tags,
        ..Default::default()
    };
    let normalizer = SpecGeneratorFactory::new()
        .create_generator(&SpecSource::parse(source), options)
        .await
        .context("Failed to load specification")?;

    let spec = normalizer.parse()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&spec)?);
        return Ok(());
    }

    let stats = normalizer.stats()?;
    println!("{} {} ({})", spec.info.title, spec.info.version, spec.version);
    if let Some(base_url) = &spec.base_url {
        println!("Base URL: {base_url}");
    }
    println!(
        "Endpoints: {} ({} deprecated, {} authenticated)",
        stats.total_endpoints, stats.deprecated, stats.authenticated
    );
    for (method, count) in &stats.by_method {
        println!("  {method:<7} {count}");
    }
    let tags = normalizer.tags();
    if !tags.is_empty() {
        println!("Tags:");
        for tag in &tags {
            let count = stats.by_tag.get(tag).copied().unwrap_or(0);
            println!("  {tag}: {count}");
        }
    }
    println!("Schemas: {}", stats.schemas);
    Ok(())
}

/// Returns false when the template has syntax errors
async fn check_template(path: &Path) -> anyhow::Result<bool> {
    let engine = TemplateEngine::new();
    let validation = engine
        .validate_template(&path.to_string_lossy(), true)
        .await;

    for issue in &validation.errors {
        match (issue.line, issue.column) {
            (Some(line), Some(column)) => error!("{}:{line}:{column}: {}", path.display(), issue.message),
            (Some(line), None) => error!("{}:{line}: {}", path.display(), issue.message),
            _ => error!("{}: {}", path.display(), issue.message),
        }
    }
    if validation.valid {
        info!(path = %path.display(), "✅ Template is valid");
    }
    if !validation.variables.is_empty() {
        println!("Variables: {}", validation.variables.join(", "));
    }
    if !validation.dependencies.is_empty() {
        println!("Includes: {}", validation.dependencies.join(", "));
    }
    Ok(validation.valid)
}
