//! Resolve a few keys against the bundled catalogs.
//!
//! Run with `cargo run -p localize --example basic`.

use std::path::Path;
use std::sync::Arc;

use localize::{args, FileSource, I18nError, LocaleRegistry, RegistryConfig};

struct Player {
    name: &'static str,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), I18nError> {
    let locales = Path::new(env!("CARGO_MANIFEST_DIR")).join("examples/locales");

    let registry = LocaleRegistry::new(RegistryConfig::default())?;
    registry.provide_locale("en_EN", FileSource::new(locales.join("en_EN.yaml")));
    registry.provide_locale("de_DE", FileSource::new(locales.join("de_DE")));
    registry.set_fallback_locale(Some("en_EN"))?;

    let bob = Arc::new(Player { name: "Bob" });
    registry.set_locale(&bob, "de_DE")?;

    // Found in de_DE.
    println!(
        "{}",
        registry
            .translate_with_context(&bob, "common.hello", &args![bob.name])
            .await?
    );
    // Missing in de_DE, resolved from en_EN.
    println!(
        "{}",
        registry
            .translate_with_context(&bob, "inbox.unread", &args![bob.name, 3])
            .await?
    );
    // Missing everywhere.
    println!("{}", registry.translate("de_DE", "common.unknown", &[]).await?);

    registry.unbind_locale(&bob);
    Ok(())
}
