//! Locale registry: routes lookups to per-locale caches.
//!
//! The registry owns one [`ProviderCache`] per locale id, remembers which
//! locales are core (always resident) and which one is the fallback, and
//! binds host contexts to locales. Structural state and context bindings sit
//! behind separate locks, taken in the order bindings -> providers. Locks are
//! never held across an await; cache commands issued under a lock are plain
//! queue pushes.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::binding::BindingTable;
use crate::cache::{Demand, ProviderCache};
use crate::config::RegistryConfig;
use crate::error::I18nError;
use crate::format::{format_positional, ArgValue};
use crate::source::StringSource;

#[derive(Default)]
struct RegistryInner {
    providers: HashMap<String, ProviderCache>,
    fallback: Option<String>,
    core: HashSet<String>,
}

impl RegistryInner {
    fn provider(&self, locale: &str) -> Result<ProviderCache, I18nError> {
        self.providers
            .get(locale)
            .cloned()
            .ok_or_else(|| I18nError::NoProvider {
                locale: locale.to_string(),
            })
    }

    fn is_forced(&self, locale: &str) -> bool {
        self.core.contains(locale) || self.fallback.as_deref() == Some(locale)
    }
}

/// Translation entry point shared by the application.
///
/// Create one per application and share it (typically as `Arc<LocaleRegistry>`).
pub struct LocaleRegistry {
    runtime: Handle,
    config: RegistryConfig,
    inner: RwLock<RegistryInner>,
    bindings: Mutex<BindingTable>,
}

impl LocaleRegistry {
    /// Create a registry whose caches run on the current tokio runtime.
    pub fn new(config: RegistryConfig) -> Result<Self, I18nError> {
        let runtime = Handle::try_current().map_err(|_| I18nError::NoRuntime)?;
        Ok(Self::with_runtime(config, runtime))
    }

    pub fn with_runtime(config: RegistryConfig, runtime: Handle) -> Self {
        Self {
            runtime,
            config,
            inner: RwLock::new(RegistryInner::default()),
            bindings: Mutex::new(BindingTable::default()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_bindings(&self) -> MutexGuard<'_, BindingTable> {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `source` for `locale`, replacing any previous provider.
    pub fn provide_locale(&self, locale: impl Into<String>, source: impl StringSource) {
        self.provide_shared(locale, Arc::new(source));
    }

    /// Like [`Self::provide_locale`], but providing the very same `Arc` again is a no-op.
    ///
    /// A replacement cache starts unloaded and takes its forced flag and
    /// requirement count from the registry's bookkeeping (core/fallback
    /// membership and the contexts bound to `locale`).
    pub fn provide_shared(&self, locale: impl Into<String>, source: Arc<dyn StringSource>) {
        let locale = locale.into();
        let bindings = self.lock_bindings();
        let mut inner = self.write();

        if let Some(current) = inner.providers.get(&locale) {
            if Arc::ptr_eq(current.source(), &source) {
                return;
            }
        }

        let demand = Demand {
            forced: inner.is_forced(&locale),
            requirements: bindings.count_for(&locale),
        };
        let cache = ProviderCache::spawn(
            locale.clone(),
            source,
            self.config.unload_interval(),
            demand,
            &self.runtime,
        );
        let replaced = inner.providers.insert(locale.clone(), cache).is_some();
        debug!(
            locale = %locale,
            replaced,
            forced = demand.forced,
            requirements = demand.requirements,
            "locale provided"
        );
    }

    /// Mark `locale` as core (always resident) or release that status.
    pub fn set_core_locale(&self, locale: &str, is_core: bool) -> Result<(), I18nError> {
        let mut inner = self.write();
        let provider = inner.provider(locale)?;
        if is_core {
            inner.core.insert(locale.to_string());
        } else {
            inner.core.remove(locale);
        }
        provider.set_force_load(inner.is_forced(locale));
        debug!(locale, is_core, "core locale updated");
        Ok(())
    }

    pub fn core_locales(&self) -> Vec<String> {
        let mut core: Vec<String> = self.read().core.iter().cloned().collect();
        core.sort();
        core
    }

    /// Change the fallback locale; `None` disables fallback resolution.
    ///
    /// The new fallback is kept resident; the previous one is released unless
    /// it is also a core locale.
    pub fn set_fallback_locale(&self, locale: Option<&str>) -> Result<(), I18nError> {
        let mut inner = self.write();
        if inner.fallback.as_deref() == locale {
            return Ok(());
        }

        let next = locale.map(|l| inner.provider(l)).transpose()?;
        let previous = std::mem::replace(&mut inner.fallback, locale.map(str::to_string));

        if let Some(previous) = previous.as_deref() {
            if let Some(provider) = inner.providers.get(previous) {
                provider.set_force_load(inner.core.contains(previous));
            }
        }
        if let Some(next) = next {
            next.set_force_load(true);
        }
        debug!(from = ?previous, to = ?locale, "fallback locale changed");
        Ok(())
    }

    pub fn fallback_locale(&self) -> Option<String> {
        self.read().fallback.clone()
    }

    /// All registered locale ids, sorted.
    pub fn locales(&self) -> Vec<String> {
        let mut locales: Vec<String> = self.read().providers.keys().cloned().collect();
        locales.sort();
        locales
    }

    /// The cache currently serving `locale`.
    pub fn provider(&self, locale: &str) -> Result<ProviderCache, I18nError> {
        self.read().provider(locale)
    }

    /// Bind `context` to `locale`, keeping that locale's strings warm while
    /// the binding lasts.
    ///
    /// Only a weak reference to `context` is kept. Any previous binding of
    /// the same context is released first.
    pub fn set_locale<C>(&self, context: &Arc<C>, locale: &str) -> Result<(), I18nError>
    where
        C: Send + Sync + 'static,
    {
        let mut bindings = self.lock_bindings();
        let inner = self.read();
        let provider = inner.provider(locale)?;

        match bindings.bind(context, locale.to_string()) {
            Some(previous) if previous == locale => {}
            Some(previous) => {
                if let Some(old) = inner.providers.get(&previous) {
                    old.remove_requirement();
                }
                provider.add_requirement();
            }
            None => provider.add_requirement(),
        }
        trace!(locale, bound = bindings.len(), "context bound");
        Ok(())
    }

    /// Remove `context`'s binding. Returns whether one existed.
    pub fn unbind_locale<C>(&self, context: &Arc<C>) -> bool
    where
        C: Send + Sync + 'static,
    {
        let mut bindings = self.lock_bindings();
        let Some(locale) = bindings.unbind(context) else {
            return false;
        };
        if let Some(provider) = self.read().providers.get(&locale) {
            provider.remove_requirement();
        }
        trace!(locale = %locale, "context unbound");
        true
    }

    /// The locale bound to `context`, or the fallback locale.
    pub fn get_locale<C>(&self, context: &Arc<C>) -> Result<String, I18nError>
    where
        C: Send + Sync + 'static,
    {
        let bindings = self.lock_bindings();
        if let Some(locale) = bindings.locale_of(context) {
            return Ok(locale.to_string());
        }
        self.read().fallback.clone().ok_or(I18nError::NoLocale)
    }

    /// Release bindings whose context has been dropped. Returns how many were released.
    pub fn sweep_released(&self) -> usize {
        let mut bindings = self.lock_bindings();
        let released = bindings.sweep();
        if released.is_empty() {
            return 0;
        }

        let inner = self.read();
        for locale in &released {
            if let Some(provider) = inner.providers.get(locale) {
                provider.remove_requirement();
            }
        }
        debug!(released = released.len(), "released dropped contexts");
        released.len()
    }

    /// Periodically sweep dropped contexts, if a sweep interval is configured.
    ///
    /// The task holds only a weak reference and ends with the registry.
    pub fn spawn_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let period = self.config.sweep_interval()?;
        let registry = Arc::downgrade(self);

        Some(self.runtime.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticks = tokio::time::interval_at(start, period);
            loop {
                ticks.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.sweep_released();
            }
        }))
    }

    /// Resolve `key` for `locale` without parameter substitution.
    ///
    /// Tries `locale`, then the fallback locale, then returns `key` itself.
    /// Unknown locales and load failures are errors; missing keys are not.
    pub async fn lookup(&self, locale: &str, key: &str) -> Result<String, I18nError> {
        let (primary, fallback) = {
            let inner = self.read();
            let primary = inner.provider(locale)?;
            let fallback = match inner.fallback.as_deref() {
                Some(fallback) if fallback != locale => Some(inner.provider(fallback)?),
                _ => None,
            };
            (primary, fallback)
        };

        if let Some(value) = primary.get_string(key).await? {
            return Ok(value);
        }
        if let Some(fallback) = fallback {
            if let Some(value) = fallback.get_string(key).await? {
                trace!(locale, fallback = fallback.locale(), key, "resolved from fallback");
                return Ok(value);
            }
        }

        trace!(locale, key, "missing translation");
        Ok(key.to_string())
    }

    /// Translate `key` for `locale`, substituting `{n}` placeholders with `params`.
    pub async fn translate(
        &self,
        locale: &str,
        key: &str,
        params: &[ArgValue],
    ) -> Result<String, I18nError> {
        let raw = self.lookup(locale, key).await?;
        Ok(format_positional(&raw, params))
    }

    /// Translate `key` for the locale bound to `context`.
    pub async fn translate_with_context<C>(
        &self,
        context: &Arc<C>,
        key: &str,
        params: &[ArgValue],
    ) -> Result<String, I18nError>
    where
        C: Send + Sync + 'static,
    {
        let locale = self.get_locale(context)?;
        self.translate(&locale, key, params).await
    }

    /// Blocking variant of [`Self::lookup`].
    pub fn lookup_blocking(&self, locale: &str, key: &str) -> Result<String, I18nError> {
        pollster::block_on(self.lookup(locale, key))
    }

    /// Blocking variant of [`Self::translate`].
    ///
    /// Must not be called from a thread that drives the registry's runtime.
    pub fn translate_blocking(
        &self,
        locale: &str,
        key: &str,
        params: &[ArgValue],
    ) -> Result<String, I18nError> {
        pollster::block_on(self.translate(locale, key, params))
    }

    /// Blocking variant of [`Self::translate_with_context`].
    pub fn translate_with_context_blocking<C>(
        &self,
        context: &Arc<C>,
        key: &str,
        params: &[ArgValue],
    ) -> Result<String, I18nError>
    where
        C: Send + Sync + 'static,
    {
        pollster::block_on(self.translate_with_context(context, key, params))
    }
}
