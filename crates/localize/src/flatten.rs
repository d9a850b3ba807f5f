//! JSON/YAML catalog parsing.
//!
//! Catalogs are mappings whose nested keys are joined with `.`:
//!
//! ```yaml
//! common:
//!   hello: "Hello, {0}!"
//! ```
//!
//! becomes `common.hello = "Hello, {0}!"`. Numbers and booleans are
//! stringified, nulls are skipped, lists are rejected.

use std::path::Path;

use serde_json::Value;
use tracing::trace;

use crate::error::SourceError;
use crate::source::Strings;

const MAX_DEPTH: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogFormat {
    Json,
    Yaml,
}

impl CatalogFormat {
    /// Detect the format from a `.json`, `.yaml` or `.yml` extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Parse a catalog document and flatten it into dotted keys.
pub fn parse_catalog(format: CatalogFormat, origin: &str, src: &str) -> Result<Strings, SourceError> {
    let parse_err = |message: String| SourceError::Parse {
        origin: origin.to_string(),
        message,
    };

    let root = match format {
        CatalogFormat::Json => {
            serde_json::from_str::<Value>(src).map_err(|e| parse_err(e.to_string()))?
        }
        CatalogFormat::Yaml => {
            let yaml = serde_yaml::from_str::<serde_yaml::Value>(src)
                .map_err(|e| parse_err(e.to_string()))?;
            yaml_to_json(origin, yaml)?
        }
    };

    let Value::Object(_) = root else {
        return Err(parse_err("top level must be a mapping".to_string()));
    };

    let mut out = Strings::new();
    flatten_into(origin, "", root, 0, &mut out)?;
    Ok(out)
}

fn invalid(origin: &str, key: &str, reason: impl Into<String>) -> SourceError {
    SourceError::InvalidEntry {
        origin: origin.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn flatten_into(
    origin: &str,
    key: &str,
    value: Value,
    depth: usize,
    out: &mut Strings,
) -> Result<(), SourceError> {
    if depth > MAX_DEPTH {
        return Err(invalid(origin, key, format!("nesting deeper than {MAX_DEPTH}")));
    }

    let text = match value {
        Value::Object(map) => {
            for (k, v) in map {
                let child = if key.is_empty() { k } else { format!("{key}.{k}") };
                flatten_into(origin, &child, v, depth + 1, out)?;
            }
            return Ok(());
        }
        Value::Null => {
            trace!(origin, key, "skipping null entry");
            return Ok(());
        }
        Value::Array(_) => return Err(invalid(origin, key, "lists are not supported")),
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
    };

    out.insert(key.to_string(), text);
    Ok(())
}

fn yaml_to_json(origin: &str, value: serde_yaml::Value) -> Result<Value, SourceError> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                // NaN and infinities have no JSON number form.
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(n.to_string()))
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(seq) => Value::Array(
            seq.into_iter()
                .map(|v| yaml_to_json(origin, v))
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(map) => {
            let mut object = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                let key = match k {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => {
                        return Err(invalid(
                            origin,
                            &format!("{other:?}"),
                            "mapping keys must be scalars",
                        ));
                    }
                };
                object.insert(key, yaml_to_json(origin, v)?);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json(origin, tagged.value)?,
    })
}
