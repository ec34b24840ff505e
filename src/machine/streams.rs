use fxhash::FxHashMap;

use std::env;
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A readable source.
pub type Stream = Box<dyn Read + Send>;

/// Opens sources by name for `consult`, `include` and `ensure_loaded`.
///
/// A missing source must be reported as [`ErrorKind::NotFound`]; the loader
/// turns that into an existence error and passes every other error through.
pub trait FileProvider: Send + Sync {
    /// Opens the source `name`.
    fn open(&self, name: &str) -> io::Result<Stream>;
}

/// Opens files relative to a root directory. A name without an extension
/// that does not exist as given is retried with `.pl` appended.
#[derive(Debug, Clone)]
pub struct FsFileProvider {
    root: PathBuf,
}

impl FsFileProvider {
    /// A provider opening files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsFileProvider { root: root.into() }
    }

    /// A provider rooted at the working directory of the process.
    pub fn current_dir() -> io::Result<Self> {
        Ok(FsFileProvider::new(env::current_dir()?))
    }

    /// The directory names are resolved against.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for FsFileProvider {
    fn default() -> Self {
        FsFileProvider::new(".")
    }
}

impl FileProvider for FsFileProvider {
    fn open(&self, name: &str) -> io::Result<Stream> {
        let path = self.root.join(name);

        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == ErrorKind::NotFound && path.extension().is_none() => {
                let file = File::open(path.with_extension("pl"))?;
                Ok(Box::new(file))
            }
            Err(e) => Err(e),
        }
    }
}

/// Serves sources from memory.
#[derive(Clone, Default)]
pub struct MemoryFileProvider {
    files: FxHashMap<String, Arc<[u8]>>,
}

impl MemoryFileProvider {
    /// A provider with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the source `name`.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<Vec<u8>>) {
        self.files.insert(name.into(), Arc::from(text.into()));
    }
}

impl fmt::Debug for MemoryFileProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.files.keys().collect();
        names.sort();

        f.debug_struct("MemoryFileProvider")
            .field("files", &names)
            .finish()
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> FromIterator<(K, V)> for MemoryFileProvider {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut provider = MemoryFileProvider::new();

        for (name, text) in iter {
            provider.insert(name, text);
        }

        provider
    }
}

impl FileProvider for MemoryFileProvider {
    fn open(&self, name: &str) -> io::Result<Stream> {
        match self.files.get(name) {
            Some(text) => Ok(Box::new(Cursor::new(text.clone()))),
            None => Err(io::Error::new(
                ErrorKind::NotFound,
                format!("no source named {}", name),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    fn read_all(mut stream: Stream) -> String {
        let mut text = String::new();
        stream.read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn memory_sources() {
        let provider: MemoryFileProvider = hashmap! {
            "a.pl" => "a.",
            "b.pl" => "b.",
        }
        .into_iter()
        .collect();

        assert_eq!(read_all(provider.open("a.pl").unwrap()), "a.");
        assert_eq!(read_all(provider.open("b.pl").unwrap()), "b.");

        let err = provider.open("c.pl").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn missing_files() {
        let provider = FsFileProvider::new("/nonexistent-prolog-vm-root");
        let err = provider.open("foo").err().unwrap();

        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
