//! Helper functions exposed to every template.
//!
//! A helper is a Tera function: it receives the keyword arguments of the call
//! site (`{{ pascal_case(value=definition.name) }}`) and returns a value.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::sync::Arc;

use chrono::Utc;
use tera::{Tera, Value};

use crate::core::utils::{capitalize, to_camel_case, to_kebab_case, to_pascal_case, to_snake_case};

/// A registered helper
pub type HelperFn = Arc<dyn Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync>;

/// Named helpers plus a version bumped on every change
#[derive(Clone, Default)]
pub struct HelperRegistry {
    helpers: BTreeMap<String, HelperFn>,
    version: u64,
}

impl HelperRegistry {
    /// Registry pre-filled with the built-in helpers
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        for (name, helper) in builtin_helpers() {
            registry.insert(name.to_string(), helper);
        }
        registry
    }

    pub fn insert(&mut self, name: String, helper: HelperFn) {
        self.helpers.insert(name, helper);
        self.version += 1;
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let removed = self.helpers.remove(name).is_some();
        if removed {
            self.version += 1;
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<HelperFn> {
        self.helpers.get(name).cloned()
    }

    /// Helper names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.helpers.keys().cloned().collect()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Register every helper as a Tera function on `tera`
    pub fn install(&self, tera: &mut Tera) {
        for (name, helper) in &self.helpers {
            let helper = Arc::clone(helper);
            tera.register_function(name, move |args: &HashMap<String, Value>| helper(args));
        }
    }
}

fn string_arg(args: &HashMap<String, Value>, helper: &str) -> tera::Result<String> {
    match args.get("value") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(tera::Error::msg(format!(
            "Helper `{helper}` requires a `value` argument"
        ))),
        Some(other) => Ok(other.to_string()),
    }
}

fn case_helper(name: &'static str, convert: fn(&str) -> String) -> HelperFn {
    Arc::new(move |args: &HashMap<String, Value>| Ok(Value::String(convert(&string_arg(args, name)?))))
}

/// The helpers every engine starts with
pub fn builtin_helpers() -> Vec<(&'static str, HelperFn)> {
    let to_json: HelperFn = Arc::new(|args: &HashMap<String, Value>| {
        let value = args.get("value").cloned().unwrap_or(Value::Null);
        let pretty = args.get("pretty").and_then(Value::as_bool).unwrap_or(false);
        let text = if pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        }
        .map_err(|e| tera::Error::msg(format!("to_json failed: {e}")))?;
        Ok(Value::String(text))
    });

    let now: HelperFn = Arc::new(|args: &HashMap<String, Value>| {
        let now = Utc::now();
        let Some(format) = args.get("format").and_then(Value::as_str) else {
            return Ok(Value::String(now.to_rfc3339()));
        };
        let mut text = String::new();
        write!(text, "{}", now.format(format))
            .map_err(|_| tera::Error::msg(format!("Invalid time format `{format}`")))?;
        Ok(Value::String(text))
    });

    vec![
        ("camel_case", case_helper("camel_case", to_camel_case)),
        ("pascal_case", case_helper("pascal_case", to_pascal_case)),
        ("snake_case", case_helper("snake_case", to_snake_case)),
        ("kebab_case", case_helper("kebab_case", to_kebab_case)),
        ("capitalize", case_helper("capitalize", capitalize)),
        ("to_json", to_json),
        ("now", now),
    ]
}
