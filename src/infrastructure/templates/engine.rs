//! Tera-backed template engine with a compiled-template cache, a helper
//! registry and a priority-ordered template search path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::SystemTime;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tera::{Context, Tera, Value};
use tokio::fs;
use tracing::{debug, warn};

use super::cache::{CacheStats, CompiledTemplate, TemplateCache, TemplateMetadata};
use super::errors::{TemplateError, error_chain};
use super::helpers::{HelperFn, HelperRegistry};
use super::scan::{extract_dependencies, extract_error_location, extract_variables, sanitize_source};
use crate::core::config::TemplateDirConfig;
use crate::generation::TemplateRenderer;

const INLINE_TEMPLATE: &str = "__inline__";

/// Per-call rendering switches
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Cache under this key instead of the resolved path
    pub cache_key: Option<String>,
    /// Compile fresh without touching the cache
    pub bypass_cache: bool,
}

/// A syntax problem reported by [`TemplateEngine::validate_template`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateIssue {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

/// Outcome of a dry-run template check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateValidation {
    pub valid: bool,
    pub errors: Vec<TemplateIssue>,
    pub variables: Vec<String>,
    pub dependencies: Vec<String>,
}

/// Renders templates from files or strings
pub struct TemplateEngine {
    cache: Mutex<TemplateCache>,
    helpers: RwLock<HelperRegistry>,
    directories: RwLock<Vec<TemplateDirConfig>>,
    cache_enabled: bool,
}

impl TemplateEngine {
    /// Engine with caching on and the built-in helpers registered
    pub fn new() -> Self {
        Self::with_cache(true)
    }

    pub fn with_cache(cache_enabled: bool) -> Self {
        Self {
            cache: Mutex::new(TemplateCache::new()),
            helpers: RwLock::new(HelperRegistry::with_builtins()),
            directories: RwLock::new(Vec::new()),
            cache_enabled,
        }
    }

    fn cache(&self) -> MutexGuard<'_, TemplateCache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn helper_registry(&self) -> HelperRegistry {
        self.helpers.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn helpers_version(&self) -> u64 {
        self.helpers.read().unwrap_or_else(|e| e.into_inner()).version()
    }

    /// Render a template file.
    ///
    /// The path is resolved with [`resolve_template_path`](Self::resolve_template_path).
    pub async fn render_file(
        &self,
        path: &Path,
        data: &JsonValue,
        options: &RenderOptions,
    ) -> Result<String, TemplateError> {
        let resolved = self
            .resolve_template_path(path)
            .await
            .ok_or_else(|| TemplateError::not_found(path.display().to_string()))?;
        let context = self.render_context(data)?;

        if !self.cache_enabled || options.bypass_cache {
            let compiled = self.compile_file(&resolved).await?;
            return render_compiled(&compiled, &context);
        }

        let key = self.cache_key(&resolved, options.cache_key.as_deref()).await;
        let mtime = self.current_mtime(&resolved, &key).await?;
        let helpers_version = self.helpers_version();

        {
            let mut cache = self.cache();
            if let Some(entry) = cache.lookup(&key, mtime, helpers_version) {
                debug!(%key, hits = entry.hits, "Template cache hit");
                return render_compiled(&entry.compiled, &context);
            }
        }

        debug!(%key, path = %resolved.display(), "Template cache miss");
        let compiled = self.compile_file(&resolved).await?;
        let output = render_compiled(&compiled, &context)?;
        let recorded = compiled.metadata.newest_mtime().unwrap_or(mtime);
        self.cache().insert(key, compiled, recorded);
        Ok(output)
    }

    /// Render an inline template string. Inline templates are never cached.
    pub fn render_string(&self, source: &str, data: &JsonValue) -> Result<String, TemplateError> {
        let context = self.render_context(data)?;
        let source = sanitize_source(source);
        let mut tera = self.new_tera();
        tera.add_raw_template(INLINE_TEMPLATE, &source)
            .map_err(|e| syntax_error(&e))?;
        tera.render(INLINE_TEMPLATE, &context)
            .map_err(|e| TemplateError::render(error_chain(&e)))
    }

    /// Compile and cache a template without rendering it
    pub async fn compile_template(
        &self,
        path: &Path,
        cache_key: Option<&str>,
    ) -> Result<TemplateMetadata, TemplateError> {
        let resolved = self
            .resolve_template_path(path)
            .await
            .ok_or_else(|| TemplateError::not_found(path.display().to_string()))?;
        let key = self.cache_key(&resolved, cache_key).await;
        let mtime = modified(&resolved).await?;
        let compiled = self.compile_file(&resolved).await?;
        let metadata = compiled.metadata.clone();
        let recorded = metadata.newest_mtime().unwrap_or(mtime);
        self.cache().insert(key, compiled, recorded);
        Ok(metadata)
    }

    /// Drop one cached template, or all of them
    pub fn clear_cache(&self, key: Option<&str>) {
        let mut cache = self.cache();
        match key {
            Some(key) => {
                cache.remove(key);
            }
            None => cache.clear(),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache().stats()
    }

    /// Register a helper, replacing any helper with the same name
    pub fn register_helper<F>(&self, name: impl Into<String>, helper: F)
    where
        F: Fn(&std::collections::HashMap<String, Value>) -> tera::Result<Value>
            + Send
            + Sync
            + 'static,
    {
        self.register_helpers([(name.into(), std::sync::Arc::new(helper) as HelperFn)]);
    }

    pub fn register_helpers(&self, helpers: impl IntoIterator<Item = (String, HelperFn)>) {
        let mut registry = self.helpers.write().unwrap_or_else(|e| e.into_inner());
        for (name, helper) in helpers {
            debug!(%name, "Registering template helper");
            registry.insert(name, helper);
        }
    }

    pub fn get_helper(&self, name: &str) -> Option<HelperFn> {
        self.helper_registry().get(name)
    }

    /// Names of every registered helper
    pub fn helper_names(&self) -> Vec<String> {
        self.helper_registry().names()
    }

    pub fn unregister_helper(&self, name: &str) -> bool {
        self.helpers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)
    }

    /// Add a search directory. Re-adding a path replaces its priority.
    pub fn add_template_directory(&self, path: impl Into<PathBuf>, priority: i32) {
        let path = path.into();
        let mut directories = self.directories.write().unwrap_or_else(|e| e.into_inner());
        directories.retain(|d| d.path != path);
        directories.push(TemplateDirConfig { path, priority });
        directories.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Search directories, highest priority first
    pub fn template_directories(&self) -> Vec<TemplateDirConfig> {
        self.directories
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Find a template file.
    ///
    /// An existing absolute path wins, then each search directory by
    /// descending priority, then the current working directory.
    pub async fn resolve_template_path(&self, path: &Path) -> Option<PathBuf> {
        if path.is_absolute() {
            return is_file(path).await.then(|| path.to_path_buf());
        }

        for dir in self.template_directories() {
            let candidate = dir.path.join(path);
            if is_file(&candidate).await {
                return Some(candidate);
            }
        }

        if is_file(path).await {
            return Some(
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf()),
            );
        }
        None
    }

    /// Check a template's syntax without rendering it.
    ///
    /// `input` is a path when `is_file` is set, otherwise the template source.
    pub async fn validate_template(&self, input: &str, is_file: bool) -> TemplateValidation {
        let source = if is_file {
            let Some(path) = self.resolve_template_path(Path::new(input)).await else {
                return TemplateValidation::failed(TemplateIssue {
                    message: TemplateError::not_found(input).to_string(),
                    line: None,
                    column: None,
                });
            };
            match fs::read_to_string(&path).await {
                Ok(source) => source,
                Err(e) => {
                    return TemplateValidation::failed(TemplateIssue {
                        message: format!("Failed to read {}: {e}", path.display()),
                        line: None,
                        column: None,
                    });
                }
            }
        } else {
            input.to_string()
        };
        let source = sanitize_source(&source);

        let mut errors = Vec::new();
        let mut tera = self.new_tera();
        if let Err(e) = tera.add_raw_template(INLINE_TEMPLATE, &source) {
            let message = error_chain(&e);
            let location = extract_error_location(&message);
            errors.push(TemplateIssue {
                message,
                line: location.map(|(line, _)| line),
                column: location.map(|(_, column)| column),
            });
        }

        TemplateValidation {
            valid: errors.is_empty(),
            errors,
            variables: extract_variables(&source),
            dependencies: extract_dependencies(&source),
        }
    }

    /// Data merged with the helper registry
    fn render_context(&self, data: &JsonValue) -> Result<Context, TemplateError> {
        let mut scope = match data {
            JsonValue::Object(map) => map.clone(),
            JsonValue::Null => Map::new(),
            other => {
                return Err(TemplateError::render(format!(
                    "Template data must be an object, got {other}"
                )));
            }
        };
        scope.insert(
            "helpers".to_string(),
            JsonValue::Array(
                self.helper_names()
                    .into_iter()
                    .map(JsonValue::String)
                    .collect(),
            ),
        );
        Context::from_value(JsonValue::Object(scope))
            .map_err(|e| TemplateError::render(error_chain(&e)))
    }

    fn new_tera(&self) -> Tera {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        self.helper_registry().install(&mut tera);
        tera
    }

    async fn cache_key(&self, resolved: &Path, explicit: Option<&str>) -> String {
        match explicit {
            Some(key) => key.to_string(),
            None => fs::canonicalize(resolved)
                .await
                .unwrap_or_else(|_| resolved.to_path_buf())
                .display()
                .to_string(),
        }
    }

    /// Newest modification time of a template and of the includes recorded
    /// for its cache entry. A vanished include counts as changed now.
    async fn current_mtime(&self, root: &Path, key: &str) -> Result<SystemTime, TemplateError> {
        let mut newest = modified(root).await?;
        let included = self.cache().included_files(key);
        for path in included {
            match modified(&path).await {
                Ok(mtime) => newest = newest.max(mtime),
                Err(_) => {
                    debug!(path = %path.display(), "Included template disappeared");
                    return Ok(SystemTime::now());
                }
            }
        }
        Ok(newest)
    }

    /// Read, sanitize and compile a template together with the templates it includes
    async fn compile_file(&self, path: &Path) -> Result<CompiledTemplate, TemplateError> {
        let mtime = modified(path).await.ok();
        let source = sanitize_source(&fs::read_to_string(path).await?);
        let dependencies = extract_dependencies(&source);
        let name = path.display().to_string();
        let helpers = self.helper_registry();

        let mut sources = vec![(name.clone(), source.clone())];
        let included = self
            .collect_dependencies(path, &dependencies, &mut sources)
            .await;

        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        helpers.install(&mut tera);
        tera.add_raw_templates(sources)
            .map_err(|e| syntax_error(&e))?;

        Ok(CompiledTemplate {
            tera,
            name,
            helpers_version: helpers.version(),
            metadata: TemplateMetadata {
                path: path.to_path_buf(),
                mtime,
                dependencies,
                included,
                source_len: source.len(),
            },
        })
    }

    /// Load included templates so Tera can resolve them by the name used in the tag.
    ///
    /// Names are looked up next to the including file, then in the search
    /// directories. Missing includes surface as render errors. Returns every
    /// loaded include with the mtime it had when read.
    async fn collect_dependencies(
        &self,
        root: &Path,
        names: &[String],
        sources: &mut Vec<(String, String)>,
    ) -> Vec<(PathBuf, SystemTime)> {
        let mut included = Vec::new();
        let mut seen: HashSet<String> = sources.iter().map(|(n, _)| n.clone()).collect();
        let mut pending: Vec<(PathBuf, String)> = names
            .iter()
            .map(|n| (root.to_path_buf(), n.clone()))
            .collect();

        while let Some((including, name)) = pending.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(path) = self.resolve_dependency(&including, &name).await else {
                warn!(%name, including = %including.display(), "Included template not found");
                continue;
            };
            let mtime = modified(&path).await.ok();
            match fs::read_to_string(&path).await {
                Ok(text) => {
                    included.push((path.clone(), mtime.unwrap_or_else(SystemTime::now)));
                    let text = sanitize_source(&text);
                    pending.extend(
                        extract_dependencies(&text)
                            .into_iter()
                            .map(|n| (path.clone(), n)),
                    );
                    sources.push((name, text));
                }
                Err(e) => warn!(%name, error = %e, "Failed to read included template"),
            }
        }
        included
    }

    async fn resolve_dependency(&self, including: &Path, name: &str) -> Option<PathBuf> {
        if let Some(parent) = including.parent() {
            let sibling = parent.join(name);
            if is_file(&sibling).await {
                return Some(sibling);
            }
        }
        self.resolve_template_path(Path::new(name)).await
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateValidation {
    fn failed(issue: TemplateIssue) -> Self {
        Self {
            valid: false,
            errors: vec![issue],
            variables: Vec::new(),
            dependencies: Vec::new(),
        }
    }
}

#[async_trait]
impl TemplateRenderer for TemplateEngine {
    async fn render_file(
        &self,
        path: &Path,
        data: &JsonValue,
        options: &RenderOptions,
    ) -> Result<String, TemplateError> {
        TemplateEngine::render_file(self, path, data, options).await
    }

    fn add_template_directory(&self, path: &Path, priority: i32) {
        TemplateEngine::add_template_directory(self, path, priority);
    }

    fn get_helpers(&self) -> Vec<String> {
        self.helper_names()
    }
}

fn render_compiled(compiled: &CompiledTemplate, context: &Context) -> Result<String, TemplateError> {
    compiled
        .render(context)
        .map_err(|e| TemplateError::render(error_chain(&e)))
}

fn syntax_error(err: &tera::Error) -> TemplateError {
    let message = error_chain(err);
    let line = extract_error_location(&message).map(|(line, _)| line);
    TemplateError::Syntax { message, line }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn modified(path: &Path) -> Result<SystemTime, TemplateError> {
    Ok(fs::metadata(path).await?.modified()?)
}
