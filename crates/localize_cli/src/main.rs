//! localize CLI - inspect and exercise translation catalogs

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use localize::{ArgValue, LocaleRegistry};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::config::LocalizeConfig;

#[derive(Parser, Debug)]
#[command(name = "localize")]
#[command(about = "Translate keys and check catalogs described by a localize.toml")]
#[command(version)]
struct Cli {
    /// Project directory or path to localize.toml
    #[arg(short, long, default_value = ".")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a key, substituting {0}, {1}, ... with the given parameters
    Translate {
        locale: String,
        key: String,
        params: Vec<String>,
    },
    /// List configured locales
    Locales,
    /// Load every locale once and report its entry count
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = LocalizeConfig::load(&cli.config)?;
    let registry = config.build_registry()?;

    match cli.command {
        Command::Translate {
            locale,
            key,
            params,
        } => {
            let params: Vec<ArgValue> = params.into_iter().map(ArgValue::from).collect();
            let text = registry
                .translate(&locale, &key, &params)
                .await
                .with_context(|| format!("Failed to translate `{key}` for `{locale}`"))?;
            println!("{text}");
        }
        Command::Locales => {
            let fallback = registry.fallback_locale();
            let core = registry.core_locales();
            for locale in registry.locales() {
                let mut tags = Vec::new();
                if fallback.as_deref() == Some(locale.as_str()) {
                    tags.push("fallback");
                }
                if core.contains(&locale) {
                    tags.push("core");
                }
                if tags.is_empty() {
                    println!("{locale}");
                } else {
                    println!("{locale} ({})", tags.join(", "));
                }
            }
        }
        Command::Check => check(&registry).await?,
    }

    Ok(())
}

async fn check(registry: &LocaleRegistry) -> Result<()> {
    let mut failed = 0;
    for locale in registry.locales() {
        let provider = registry.provider(&locale)?;
        // Any key will do; the lookup forces a load and reports its failure.
        match provider.get_string("").await {
            Ok(_) => {
                let status = provider.status().await?;
                println!("{locale}: {} entries", status.entries);
            }
            Err(err) => {
                failed += 1;
                warn!(locale = %locale, error = ?err, "catalog check failed");
                println!("{locale}: {:#}", anyhow::Error::new(err));
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} locale(s) failed to load");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use localize::{FileSource, RegistryConfig};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn failed_check_is_logged_as_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("en.json"), r#"{ "hello": "Hello" }"#).unwrap();
        fs::write(dir.path().join("fr.json"), "{ broken").unwrap();

        let registry = LocaleRegistry::new(RegistryConfig::default()).unwrap();
        registry.provide_locale("en", FileSource::new(dir.path().join("en.json")));
        registry.provide_locale("fr", FileSource::new(dir.path().join("fr.json")));

        let err = check(&registry).await.unwrap_err();
        assert_eq!(err.to_string(), "1 locale(s) failed to load");
        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .find(|line| line.contains("catalog check failed"))
            {
                Some(line) if line.contains("WARN") && line.contains("fr") => Ok(()),
                Some(line) => Err(format!("unexpected log line: {line}")),
                None => Err("check failure was not logged".to_string()),
            }
        });
    }
}
