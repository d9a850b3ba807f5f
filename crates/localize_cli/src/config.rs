//! localize.toml handling

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use localize::{FileSource, LocaleRegistry, RegistryConfig};
use serde::{Deserialize, Serialize};

/// Top-level configuration (localize.toml)
#[derive(Debug, Deserialize, Serialize)]
pub struct LocalizeConfig {
    /// Locale consulted when a key is missing
    #[serde(default)]
    pub fallback: Option<String>,
    /// Locales kept in memory at all times
    #[serde(default)]
    pub core: Vec<String>,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub locales: BTreeMap<String, LocaleConfig>,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub root: PathBuf,
}

/// Where one locale's strings come from
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LocaleConfig {
    /// Catalog files or directories, relative to the config file
    #[serde(default)]
    pub paths: Vec<String>,
    /// Catalog URLs (requires the `http` feature)
    #[serde(default)]
    pub urls: Vec<String>,
    /// Format of fetched catalogs
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "json".to_string()
}

impl LocalizeConfig {
    /// Load configuration from a directory (looks for localize.toml) or a file
    pub fn load(path: &Path) -> Result<Self> {
        let config_path = if path.is_file() {
            path.to_path_buf()
        } else {
            path.join("localize.toml")
        };

        if !config_path.exists() {
            anyhow::bail!("No localize.toml found in {}", path.display());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let mut config: LocalizeConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        config.root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(config)
    }

    /// Register every configured locale, then apply core and fallback settings.
    pub fn build_registry(&self) -> Result<LocaleRegistry> {
        let registry = LocaleRegistry::new(self.registry.clone())?;

        for (locale, source) in &self.locales {
            match (source.paths.is_empty(), source.urls.is_empty()) {
                (false, true) => {
                    let paths = source.paths.iter().map(|p| self.root.join(p));
                    registry.provide_locale(locale.clone(), FileSource::from_paths(paths));
                }
                (true, false) => provide_http(&registry, locale, source)?,
                (true, true) => anyhow::bail!("Locale `{locale}` has neither paths nor urls"),
                (false, false) => anyhow::bail!("Locale `{locale}` mixes paths and urls"),
            }
        }

        for locale in &self.core {
            registry
                .set_core_locale(locale, true)
                .with_context(|| format!("Invalid core locale `{locale}`"))?;
        }
        registry
            .set_fallback_locale(self.fallback.as_deref())
            .context("Invalid fallback locale")?;

        Ok(registry)
    }
}

#[cfg(feature = "http")]
fn provide_http(registry: &LocaleRegistry, locale: &str, source: &LocaleConfig) -> Result<()> {
    use localize::{CatalogFormat, HttpSource};

    let format = match source.format.as_str() {
        "json" => CatalogFormat::Json,
        "yaml" | "yml" => CatalogFormat::Yaml,
        other => anyhow::bail!("Unknown catalog format `{other}` for locale `{locale}`"),
    };
    let mut urls = source.urls.iter();
    let Some(first) = urls.next() else {
        anyhow::bail!("Locale `{locale}` has no urls");
    };
    let http = urls.fold(HttpSource::new(format, first.clone()), |s, url| {
        s.with_url(url.clone())
    });
    registry.provide_locale(locale.to_string(), http);
    Ok(())
}

#[cfg(not(feature = "http"))]
fn provide_http(_registry: &LocaleRegistry, locale: &str, _source: &LocaleConfig) -> Result<()> {
    anyhow::bail!("Locale `{locale}` uses urls, but localize was built without the `http` feature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_locales_and_registry_settings() {
        let config: LocalizeConfig = toml::from_str(
            r#"
fallback = "en"
core = ["en"]

[registry]
unload_interval_ms = 500

[locales.en]
paths = ["locales/en.yaml"]

[locales.de]
urls = ["https://example.invalid/de.yaml"]
format = "yaml"
"#,
        )
        .unwrap();

        assert_eq!(config.fallback.as_deref(), Some("en"));
        assert_eq!(config.core, vec!["en"]);
        assert_eq!(config.registry.unload_interval_ms, 500);
        assert_eq!(config.locales["en"].paths, vec!["locales/en.yaml"]);
        assert_eq!(config.locales["en"].format, "json");
        assert_eq!(config.locales["de"].format, "yaml");
    }

    #[tokio::test]
    async fn builds_registry_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("locales")).unwrap();
        fs::write(dir.path().join("locales/en.yaml"), "hello: \"Hello, {0}\"\n").unwrap();
        fs::write(
            dir.path().join("localize.toml"),
            r#"
fallback = "en"

[locales.en]
paths = ["locales/en.yaml"]

[locales.de]
paths = ["locales"]
"#,
        )
        .unwrap();

        let config = LocalizeConfig::load(dir.path()).unwrap();
        let registry = config.build_registry().unwrap();
        assert_eq!(registry.locales(), vec!["de", "en"]);
        assert_eq!(
            registry
                .translate("de", "hello", &localize::args!["Ann"])
                .await
                .unwrap(),
            "Hello, Ann"
        );
    }

    #[test]
    fn missing_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalizeConfig::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("No localize.toml"));
    }
}
