//! Lazily loaded, reference-counted translation strings.
//!
//! Goals:
//! - One cache per locale, loaded on first use and evicted after a debounce
//!   once nothing requires it
//! - Core and fallback locales that stay resident
//! - Host objects ("contexts") bound to locales without the registry owning them
//! - Pluggable string sources:
//!   - JSON/YAML files and directories (nested keys flattened with `.`)
//!   - HTTP catalogs (`http` feature)
//!   - in-memory tables and closures
//!
//! ```ignore
//! let registry = LocaleRegistry::new(RegistryConfig::default())?;
//! registry.provide_locale("en", FileSource::new("locales/en.yaml"));
//! registry.provide_locale("de", FileSource::new("locales/de"));
//! registry.set_fallback_locale(Some("en"))?;
//!
//! let text = registry.translate("de", "common.hello", &args!["Bob"]).await?;
//! ```

mod binding;
mod cache;
mod config;
mod error;
mod file;
mod flatten;
mod format;
mod registry;
mod source;

#[cfg(feature = "http")]
mod http;

pub use cache::{CacheState, CacheStatus, Demand, ProviderCache};
pub use config::{RegistryConfig, DEFAULT_UNLOAD_INTERVAL};
pub use error::{I18nError, SourceError};
pub use file::FileSource;
pub use flatten::{parse_catalog, CatalogFormat};
pub use format::{format_positional, ArgValue, Template};
pub use registry::LocaleRegistry;
pub use source::{StaticSource, StringSource, Strings};

#[cfg(feature = "http")]
pub use http::HttpSource;
