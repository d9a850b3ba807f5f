use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use localize::{
    args, CacheState, FileSource, I18nError, LocaleRegistry, RegistryConfig, SourceError,
    StaticSource, Strings,
};

const INTERVAL: Duration = Duration::from_millis(250);

fn registry() -> LocaleRegistry {
    LocaleRegistry::new(RegistryConfig::default().with_unload_interval(INTERVAL)).unwrap()
}

#[tokio::test(start_paused = true)]
async fn fallback_chain_from_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("en.yaml"), "greeting: \"Hello, {0}!\"\n").unwrap();
    fs::write(dir.path().join("de.json"), "{}").unwrap();

    let registry = registry();
    registry.provide_locale("en", FileSource::new(dir.path().join("en.yaml")));
    registry.provide_locale("de", FileSource::new(dir.path().join("de.json")));
    registry.set_fallback_locale(Some("en")).unwrap();

    assert_eq!(
        registry.translate("de", "greeting", &args!["Bob"]).await.unwrap(),
        "Hello, Bob!"
    );
    assert_eq!(
        registry.translate("de", "missing.key", &[]).await.unwrap(),
        "missing.key"
    );
}

#[tokio::test(start_paused = true)]
async fn large_file_catalogs_stay_usable() {
    let dir = tempfile::tempdir().unwrap();
    let entries: Vec<String> = (0..10_001).map(|i| format!(r#""k{i}": "v{i}""#)).collect();
    fs::write(dir.path().join("en.json"), format!("{{ {} }}", entries.join(", "))).unwrap();
    fs::write(
        dir.path().join("de.json"),
        format!(r#"{{ "{}": "long", "ok": "fine" }}"#, "k".repeat(300)),
    )
    .unwrap();

    let registry = registry();
    registry.provide_locale("en", FileSource::new(dir.path().join("en.json")));
    registry.provide_locale("de", FileSource::new(dir.path().join("de.json")));

    assert_eq!(registry.translate("en", "k1", &[]).await.unwrap(), "v1");
    assert_eq!(registry.translate("en", "k10000", &[]).await.unwrap(), "v10000");
    assert_eq!(registry.translate("de", "ok", &[]).await.unwrap(), "fine");
}

#[tokio::test(start_paused = true)]
async fn load_errors_are_not_downgraded_to_keys() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("fr.json");
    fs::write(&broken, "{ not json").unwrap();

    let registry = registry();
    registry.provide_locale("fr", FileSource::new(&broken));

    let err = registry.translate("fr", "title", &[]).await.unwrap_err();
    match err {
        I18nError::Load { locale, source } => {
            assert_eq!(locale, "fr");
            assert!(matches!(source, SourceError::Parse { .. }));
        }
        other => panic!("expected load error, got {other:?}"),
    }

    fs::write(&broken, r#"{ "title": "Titre" }"#).unwrap();
    assert_eq!(registry.translate("fr", "title", &[]).await.unwrap(), "Titre");
}

#[tokio::test(start_paused = true)]
async fn contexts_keep_locales_warm() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);

    let registry = registry();
    registry.provide_locale("de", move || -> Result<Strings, SourceError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Strings::from([("title".to_string(), "Titel".to_string())]))
    });

    struct Session;
    let sessions: Vec<_> = (0..4).map(|_| Arc::new(Session)).collect();
    for session in &sessions {
        registry.set_locale(session, "de").unwrap();
    }
    assert_eq!(
        registry.provider("de").unwrap().status().await.unwrap().requirements,
        4
    );

    for session in &sessions {
        assert_eq!(
            registry
                .translate_with_context(session, "title", &[])
                .await
                .unwrap(),
            "Titel"
        );
    }

    for session in &sessions[1..] {
        registry.unbind_locale(session);
    }
    tokio::time::sleep(INTERVAL * 4).await;
    let status = registry.provider("de").unwrap().status().await.unwrap();
    assert_eq!(status.state, CacheState::Loaded);
    assert_eq!(status.requirements, 1);

    drop(sessions);
    assert_eq!(registry.sweep_released(), 1);
    tokio::time::sleep(INTERVAL / 2).await;
    assert_eq!(
        registry.provider("de").unwrap().status().await.unwrap().state,
        CacheState::PendingUnload
    );

    tokio::time::sleep(INTERVAL).await;
    let status = registry.provider("de").unwrap().status().await.unwrap();
    assert_eq!(status.state, CacheState::Unloaded);
    assert_eq!(status.unloads, 1);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn core_locale_survives_idle_periods() {
    let registry = registry();
    registry.provide_locale("en", StaticSource::new().with("a", "A"));
    registry.provide_locale("de", StaticSource::new().with("a", "Ä"));
    registry.set_core_locale("en", true).unwrap();

    assert_eq!(registry.translate("de", "a", &[]).await.unwrap(), "Ä");
    tokio::time::sleep(INTERVAL * 10).await;

    let en = registry.provider("en").unwrap().status().await.unwrap();
    let de = registry.provider("de").unwrap().status().await.unwrap();
    assert_eq!(en.state, CacheState::Loaded);
    assert_eq!(de.state, CacheState::Unloaded);
}

#[tokio::test(start_paused = true)]
async fn concurrent_lookups_share_one_load() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);

    let registry = Arc::new(registry());
    registry.provide_locale("en", move || -> Result<Strings, SourceError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Strings::from([("n".to_string(), "{0}".to_string())]))
    });

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.translate("en", "n", &args![i]).await })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap().unwrap(), i.to_string());
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}
