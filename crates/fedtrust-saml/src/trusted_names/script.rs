//! Script-backed trusted-names functions.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};

use super::engine::{CompiledScript, ScriptEngineRegistry, DEFAULT_SCRIPT_ENGINE};
use super::{SignedObject, TrustedNamesFunction};
use crate::error::{MetadataError, MetadataResult};

/// Where script source comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    Inline(String),
    File(PathBuf),
}

impl ScriptSource {
    fn load(&self) -> MetadataResult<String> {
        match self {
            Self::Inline(source) => Ok(source.clone()),
            Self::File(path) => std::fs::read_to_string(path).map_err(|e| {
                MetadataError::config(format!("cannot read script {}: {}", path.display(), e))
            }),
        }
    }
}

/// A trusted-names function evaluated by a script engine.
///
/// The script sees `{"custom": <custom>, "context": <signed object>}`. Every
/// selected string, and every string inside a selected array, is a trusted
/// name. Compilation happens once, at construction.
#[derive(Debug)]
pub struct ScriptedTrustedNamesFunction {
    engine: String,
    script: Box<dyn CompiledScript>,
    custom: Arc<Value>,
}

impl ScriptedTrustedNamesFunction {
    /// Compile `source` with the named engine, or the default engine.
    pub fn new(
        source: &ScriptSource,
        engine: Option<&str>,
        registry: &ScriptEngineRegistry,
    ) -> MetadataResult<Self> {
        let engine_name = engine.unwrap_or(DEFAULT_SCRIPT_ENGINE);
        let engine = registry.get(engine_name).ok_or_else(|| {
            MetadataError::config(format!("unknown script engine '{}'", engine_name))
        })?;
        let script = engine.compile(&source.load()?)?;

        Ok(Self {
            engine: engine_name.to_string(),
            script,
            custom: Arc::new(Value::Null),
        })
    }

    /// Compile inline source with the default engine.
    pub fn inline(source: impl Into<String>) -> MetadataResult<Self> {
        Self::new(
            &ScriptSource::Inline(source.into()),
            None,
            &ScriptEngineRegistry::default(),
        )
    }

    /// Deployment data exposed to the script as `custom`.
    pub fn with_custom(mut self, custom: Value) -> Self {
        self.custom = Arc::new(custom);
        self
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    /// Evaluate, surfacing failures instead of logging them.
    pub fn evaluate(&self, object: &SignedObject<'_>) -> MetadataResult<BTreeSet<String>> {
        let scope = json!({
            "custom": &*self.custom,
            "context": object.to_json()?,
        });
        let selected = self.script.evaluate(&scope)?;
        self.collect_names(selected)
    }

    fn collect_names(&self, selected: Value) -> MetadataResult<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        let Value::Array(values) = selected else {
            return Err(MetadataError::policy(&self.engine, "script result is not a list"));
        };

        for value in values {
            match value {
                Value::String(name) => {
                    names.insert(name);
                }
                Value::Array(inner) => {
                    for item in inner {
                        match item {
                            Value::String(name) => {
                                names.insert(name);
                            }
                            other => {
                                return Err(MetadataError::policy(
                                    &self.engine,
                                    format!("non-string name in result: {}", other),
                                ));
                            }
                        }
                    }
                }
                Value::Null => {}
                other => {
                    return Err(MetadataError::policy(
                        &self.engine,
                        format!("non-string name in result: {}", other),
                    ));
                }
            }
        }
        Ok(names)
    }
}

impl TrustedNamesFunction for ScriptedTrustedNamesFunction {
    fn trusted_names(&self, object: &SignedObject<'_>) -> Option<BTreeSet<String>> {
        match self.evaluate(object) {
            Ok(names) => Some(names),
            Err(e) => {
                tracing::error!(
                    engine = %self.engine,
                    entity_id = %object.entity().entity_id,
                    error = %e,
                    "trusted names evaluation failed"
                );
                None
            }
        }
    }
}
