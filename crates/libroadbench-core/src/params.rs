//! Hierarchical parameter store backed by JSON files
//!
//! Keys are `::`-separated paths into nested JSON objects, e.g.
//! `simulation::step_time`. Reading a missing key through [`ParameterServer::get_or`]
//! inserts the default and records its description, so a store saved after a
//! run contains every parameter that was consulted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CoreError;
use crate::Result;

/// Separator between path segments of a parameter key
pub const KEY_SEPARATOR: &str = "::";

/// Hierarchical key-value parameter store
#[derive(Debug, Clone, Default)]
pub struct ParameterServer {
    root: Map<String, Value>,
    descriptions: BTreeMap<String, String>,
    source: Option<PathBuf>,
}

impl ParameterServer {
    /// Create an empty parameter store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON value; the root must be an object
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self {
                root,
                ..Self::default()
            }),
            other => Err(CoreError::InvalidParam(format!(
                "parameter root must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Load a store from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::file_not_found(path));
        }
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        let mut server = Self::from_json(value)?;
        server.source = Some(path.to_path_buf());
        debug!(path = %path.display(), "Loaded parameter file");
        Ok(server)
    }

    /// Load `name` from a parameter directory
    pub fn open(dir: &Path, name: &str) -> Result<Self> {
        Self::load(&dir.join(name))
    }

    /// Write the store (including inserted defaults) as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.as_json())?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// File the store was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Whether a value exists at `key`
    pub fn contains(&self, key: &str) -> bool {
        matches!(self.lookup(key), Ok(Some(_)))
    }

    /// Read a value, `None` if the key is absent
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.lookup(key)? {
            Some(value) => decode(key, value.clone()).map(Some),
            None => Ok(None),
        }
    }

    /// Read a value, inserting `default` when the key is absent
    pub fn get_or<T>(&mut self, key: &str, description: &str, default: T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        self.descriptions
            .entry(key.to_string())
            .or_insert_with(|| description.to_string());

        if let Some(value) = self.lookup(key)? {
            return decode(key, value.clone());
        }

        self.set(key, &default)?;
        Ok(default)
    }

    /// Write a value, creating intermediate objects as needed
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let segments = split_key(key)?;
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(CoreError::InvalidParam(format!("invalid parameter key '{}'", key)));
        };

        let mut node = &mut self.root;
        for segment in parents {
            let entry = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            node = match entry {
                Value::Object(map) => map,
                other => {
                    return Err(CoreError::ParamType {
                        key: key.to_string(),
                        message: format!("'{}' is a {}, not an object", segment, json_kind(other)),
                    })
                }
            };
        }

        node.insert(leaf.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    /// View of the store rooted at `prefix`
    pub fn scope(&mut self, prefix: &str) -> ParamScope<'_> {
        ParamScope {
            server: self,
            prefix: prefix.to_string(),
        }
    }

    /// Descriptions recorded by `get_or`, keyed by full parameter path
    pub fn descriptions(&self) -> &BTreeMap<String, String> {
        &self.descriptions
    }

    /// The whole store as a JSON value
    pub fn as_json(&self) -> Value {
        Value::Object(self.root.clone())
    }

    fn lookup(&self, key: &str) -> Result<Option<&Value>> {
        let segments = split_key(key)?;
        let Some((leaf, parents)) = segments.split_last() else {
            return Ok(None);
        };

        let mut node = &self.root;
        for segment in parents {
            match node.get(*segment) {
                Some(Value::Object(map)) => node = map,
                Some(other) => {
                    return Err(CoreError::ParamType {
                        key: key.to_string(),
                        message: format!("'{}' is a {}, not an object", segment, json_kind(other)),
                    })
                }
                None => return Ok(None),
            }
        }
        Ok(node.get(*leaf))
    }
}

/// Mutable view of a [`ParameterServer`] below a key prefix
pub struct ParamScope<'a> {
    server: &'a mut ParameterServer,
    prefix: String,
}

impl ParamScope<'_> {
    /// Read a value below the prefix, inserting `default` when absent
    pub fn get_or<T>(&mut self, key: &str, description: &str, default: T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let full = self.key(key);
        self.server.get_or(&full, description, default)
    }

    /// Read a value below the prefix
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.server.get(&self.key(key))
    }

    /// Nested scope
    pub fn scope(&mut self, child: &str) -> ParamScope<'_> {
        let prefix = self.key(child);
        ParamScope {
            server: &mut *self.server,
            prefix,
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}{}", self.prefix, KEY_SEPARATOR, key)
    }
}

fn split_key(key: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = key.split(KEY_SEPARATOR).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(CoreError::InvalidParam(format!("invalid parameter key '{}'", key)));
    }
    Ok(segments)
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| CoreError::ParamType {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_get_or_reads_existing_value() {
        let mut params = ParameterServer::from_json(json!({
            "simulation": { "step_time": 0.05 }
        }))
        .unwrap();

        let step: f64 = params.get_or("simulation::step_time", "Step time", 0.2).unwrap();
        assert_eq!(step, 0.05);
    }

    #[test]
    fn test_get_or_inserts_default_and_description() {
        let mut params = ParameterServer::new();

        let factor: u32 = params
            .get_or("simulation::real_time_factor", "execution in real-time or faster", 1)
            .unwrap();
        assert_eq!(factor, 1);
        assert!(params.contains("simulation::real_time_factor"));
        assert_eq!(
            params.descriptions().get("simulation::real_time_factor").map(String::as_str),
            Some("execution in real-time or faster")
        );
    }

    #[test]
    fn test_defaults_persist_through_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("params").join("out.json");

        let mut params = ParameterServer::new();
        params.get_or("viewer::columns", "Grid width", 80usize).unwrap();
        params.save(&path).unwrap();

        let loaded = ParameterServer::load(&path).unwrap();
        assert_eq!(loaded.get::<usize>("viewer::columns").unwrap(), Some(80));
        assert_eq!(loaded.source(), Some(path.as_path()));
    }

    #[test]
    fn test_scope_prefixes_keys() {
        let mut params = ParameterServer::new();
        {
            let mut scope = params.scope("scenario");
            let mut generation = scope.scope("generation");
            generation.get_or("seed", "Seed", 7u64).unwrap();
        }
        assert_eq!(params.get::<u64>("scenario::generation::seed").unwrap(), Some(7));
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let mut params = ParameterServer::from_json(json!({ "simulation": { "step_time": "fast" } })).unwrap();
        let err = params.get_or("simulation::step_time", "Step time", 0.2f64).unwrap_err();
        assert!(matches!(err, CoreError::ParamType { .. }));
    }

    #[test]
    fn test_non_object_root_rejected() {
        assert!(ParameterServer::from_json(json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_empty_segment_rejected() {
        let params = ParameterServer::new();
        assert!(params.get::<f64>("simulation::::step_time").is_err());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let err = ParameterServer::open(dir.path(), "missing.json").unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
