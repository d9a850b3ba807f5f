use tracing::debug;

use crate::error::SourceError;
use crate::flatten::{parse_catalog, CatalogFormat};
use crate::source::{StringSource, Strings};

/// Strings fetched over HTTP(S), one request per URL and load.
///
/// Responses are merged in URL order. Failed requests are not retried; the
/// next access to the locale simply loads again.
#[derive(Clone, Debug)]
pub struct HttpSource {
    format: CatalogFormat,
    urls: Vec<String>,
}

impl HttpSource {
    pub fn new(format: CatalogFormat, url: impl Into<String>) -> Self {
        Self {
            format,
            urls: vec![url.into()],
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

impl StringSource for HttpSource {
    fn load_strings(&self) -> Result<Strings, SourceError> {
        // The blocking client owns a runtime of its own; keep it scoped to
        // this call so it is never created or dropped on an async thread.
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| SourceError::Fetch {
                url: self.urls.first().cloned().unwrap_or_default(),
                message: e.to_string(),
            })?;

        let mut strings = Strings::new();
        for url in &self.urls {
            let fetch_err = |e: reqwest::Error| SourceError::Fetch {
                url: url.clone(),
                message: e.to_string(),
            };
            let body = client
                .get(url)
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.text())
                .map_err(fetch_err)?;

            let fetched = parse_catalog(self.format, url, &body)?;
            debug!(url = %url, entries = fetched.len(), "catalog fetched");
            strings.extend(fetched);
        }
        Ok(strings)
    }
}
