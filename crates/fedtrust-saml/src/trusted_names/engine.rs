//! Script engines for trusted-names policies.
//!
//! Scripts are data queries over the evaluation scope, one expression per
//! line. Blank lines and lines starting with `#` are ignored. The result is
//! every value selected by any expression, in order.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{MetadataError, MetadataResult};

/// Engine used when a script names none.
pub const DEFAULT_SCRIPT_ENGINE: &str = "JSONPath";

/// Compiles script source for repeated evaluation.
pub trait ScriptEngine: Send + Sync + fmt::Debug {
    /// Name scripts use to select this engine.
    fn name(&self) -> &str;

    fn compile(&self, source: &str) -> MetadataResult<Box<dyn CompiledScript>>;
}

/// A compiled script.
pub trait CompiledScript: Send + Sync + fmt::Debug {
    /// Evaluate against `scope`, returning a JSON array of selected values.
    fn evaluate(&self, scope: &Value) -> MetadataResult<Value>;
}

fn expressions(source: &str) -> Vec<String> {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// JSONPath expressions, evaluated with `jsonpath_lib`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPathEngine;

#[derive(Debug)]
struct JsonPathScript {
    paths: Vec<String>,
}

impl ScriptEngine for JsonPathEngine {
    fn name(&self) -> &str {
        "JSONPath"
    }

    fn compile(&self, source: &str) -> MetadataResult<Box<dyn CompiledScript>> {
        let paths = expressions(source);
        if paths.is_empty() {
            return Err(MetadataError::policy(self.name(), "script contains no expressions"));
        }
        let empty = Value::Object(serde_json::Map::new());
        for path in &paths {
            jsonpath_lib::select(&empty, path).map_err(|e| {
                MetadataError::policy(self.name(), format!("invalid JSONPath {}: {:?}", path, e))
            })?;
        }
        Ok(Box::new(JsonPathScript { paths }))
    }
}

impl CompiledScript for JsonPathScript {
    fn evaluate(&self, scope: &Value) -> MetadataResult<Value> {
        let mut selected = Vec::new();
        for path in &self.paths {
            let matches = jsonpath_lib::select(scope, path)
                .map_err(|e| MetadataError::policy("JSONPath", format!("{:?}", e)))?;
            selected.extend(matches.into_iter().cloned());
        }
        Ok(Value::Array(selected))
    }
}

/// RFC 6901 JSON Pointers.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPointerEngine;

#[derive(Debug)]
struct JsonPointerScript {
    pointers: Vec<String>,
}

impl ScriptEngine for JsonPointerEngine {
    fn name(&self) -> &str {
        "JSONPointer"
    }

    fn compile(&self, source: &str) -> MetadataResult<Box<dyn CompiledScript>> {
        let pointers = expressions(source);
        if pointers.is_empty() {
            return Err(MetadataError::policy(self.name(), "script contains no pointers"));
        }
        if let Some(bad) = pointers.iter().find(|p| !p.starts_with('/')) {
            return Err(MetadataError::policy(
                self.name(),
                format!("pointer must start with '/': {}", bad),
            ));
        }
        Ok(Box::new(JsonPointerScript { pointers }))
    }
}

impl CompiledScript for JsonPointerScript {
    fn evaluate(&self, scope: &Value) -> MetadataResult<Value> {
        Ok(Value::Array(
            self.pointers
                .iter()
                .filter_map(|pointer| scope.pointer(pointer).cloned())
                .collect(),
        ))
    }
}

/// Script engines by name.
#[derive(Debug, Clone)]
pub struct ScriptEngineRegistry {
    engines: BTreeMap<String, Arc<dyn ScriptEngine>>,
}

impl Default for ScriptEngineRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(JsonPathEngine));
        registry.register(Arc::new(JsonPointerEngine));
        registry
    }
}

impl ScriptEngineRegistry {
    /// A registry with no engines.
    pub fn empty() -> Self {
        Self {
            engines: BTreeMap::new(),
        }
    }

    /// Register an engine, replacing any engine of the same name.
    pub fn register(&mut self, engine: Arc<dyn ScriptEngine>) {
        self.engines.insert(engine.name().to_string(), engine);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ScriptEngine>> {
        self.engines.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }
}
