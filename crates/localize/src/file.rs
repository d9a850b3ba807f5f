use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SourceError;
use crate::flatten::{parse_catalog, CatalogFormat};
use crate::source::{StringSource, Strings};

/// Strings read from JSON/YAML files and directories.
///
/// Each path is either a catalog file or a directory; directories contribute
/// every `.json`, `.yaml` and `.yml` file they contain, in file name order.
/// Later files and later paths win on duplicate keys.
#[derive(Clone, Debug)]
pub struct FileSource {
    paths: Vec<PathBuf>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
        }
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl StringSource for FileSource {
    fn load_strings(&self) -> Result<Strings, SourceError> {
        let mut strings = Strings::new();
        for path in &self.paths {
            if path.is_dir() {
                for file in catalog_files(path)? {
                    load_file(&file, &mut strings)?;
                }
            } else {
                load_file(path, &mut strings)?;
            }
        }
        Ok(strings)
    }
}

fn catalog_files(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let io_err = |source| SourceError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && CatalogFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn load_file(path: &Path, out: &mut Strings) -> Result<(), SourceError> {
    let format = CatalogFormat::from_path(path).ok_or_else(|| SourceError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let src = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let strings = parse_catalog(format, &path.display().to_string(), &src)?;
    debug!(path = %path.display(), entries = strings.len(), "catalog read");
    out.extend(strings);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn directory_merges_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.yaml", "greeting: from b\nonly_b: b\n");
        write(dir.path(), "a.json", r#"{ "greeting": "from a", "only_a": "a" }"#);
        write(dir.path(), "notes.txt", "ignored");

        let strings = FileSource::new(dir.path()).load_strings().unwrap();
        assert_eq!(strings.get("greeting").map(String::as_str), Some("from b"));
        assert_eq!(strings.get("only_a").map(String::as_str), Some("a"));
        assert_eq!(strings.get("only_b").map(String::as_str), Some("b"));
        assert_eq!(strings.len(), 3);
    }

    #[test]
    fn later_paths_win() {
        let dir = tempfile::tempdir().unwrap();
        let base = write(dir.path(), "base.yml", "title: Base\nbody: Body\n");
        let over = write(dir.path(), "override.json", r#"{ "title": "Override" }"#);

        let strings = FileSource::new(base).with_path(over).load_strings().unwrap();
        assert_eq!(strings.get("title").map(String::as_str), Some("Override"));
        assert_eq!(strings.get("body").map(String::as_str), Some("Body"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSource::new(dir.path().join("absent.json"))
            .load_strings()
            .unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "en.properties", "a=b");
        let err = FileSource::new(path).load_strings().unwrap_err();
        assert!(matches!(err, SourceError::UnsupportedFormat { .. }));
    }

    #[test]
    fn every_load_rereads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "en.yaml", "a: one\n");
        let source = FileSource::new(&path);
        assert_eq!(source.load_strings().unwrap()["a"], "one");

        write(dir.path(), "en.yaml", "a: two\n");
        assert_eq!(source.load_strings().unwrap()["a"], "two");
    }
}
