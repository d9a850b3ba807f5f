use std::collections::HashMap;

use crate::error::SourceError;

/// Flat `dotted.key -> string` mapping produced by a [`StringSource`].
pub type Strings = HashMap<String, String>;

/// Synchronous supplier of the strings for one locale.
///
/// Implementations are called afresh on every load and must not cache or
/// mutate previously returned mappings. Loads run on tokio's blocking pool,
/// so a source may perform file or network I/O directly.
pub trait StringSource: Send + Sync + 'static {
    fn load_strings(&self) -> Result<Strings, SourceError>;
}

impl<F> StringSource for F
where
    F: Fn() -> Result<Strings, SourceError> + Send + Sync + 'static,
{
    fn load_strings(&self) -> Result<Strings, SourceError> {
        self()
    }
}

/// A source backed by an in-memory table.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    entries: Strings,
}

impl StaticSource {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }
}

impl<K, V> FromIterator<(K, V)> for StaticSource
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl StringSource for StaticSource {
    fn load_strings(&self) -> Result<Strings, SourceError> {
        Ok(self.entries.clone())
    }
}
