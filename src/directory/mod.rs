//! Minimal abstraction over the file system the codecs write into.
//!
//! The index format itself does not depend on any particular storage:
//! codec roles receive a [`Directory`] and only ever create, read and
//! enumerate whole files through it. [`RamDirectory`] is the in-memory
//! implementation used by tests and by transient segments.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Write object for a directory file.
pub type WritePtr = Box<dyn Write>;

/// Write-once, read-many file abstraction.
pub trait Directory: fmt::Debug {
    /// Opens a file for writing. Creating a file that already exists
    /// truncates it.
    fn open_write(&self, path: &Path) -> io::Result<WritePtr>;

    /// Returns the full current content of a file.
    ///
    /// Bytes written through a still-open write handle are visible as
    /// soon as the handle flushes.
    fn open_read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Returns true if the file exists.
    fn exists(&self, path: &Path) -> bool;
}

#[derive(Clone, Default)]
struct SharedVec(Arc<RwLock<Cursor<Vec<u8>>>>);

impl Write for SharedVec {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .write()
            .expect("poisoned ram directory lock")
            .write_all(buf)?;
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A `Directory` storing every file in anonymous memory.
#[derive(Clone, Default)]
pub struct RamDirectory {
    fs: Arc<RwLock<HashMap<PathBuf, SharedVec>>>,
}

impl fmt::Debug for RamDirectory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RamDirectory")
    }
}

impl RamDirectory {
    pub fn create() -> RamDirectory {
        RamDirectory::default()
    }
}

impl Directory for RamDirectory {
    fn open_write(&self, path: &Path) -> io::Result<WritePtr> {
        let data = SharedVec::default();
        self.fs
            .write()
            .expect("poisoned ram directory lock")
            .insert(path.to_path_buf(), data.clone());
        Ok(Box::new(data))
    }

    fn open_read(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self
            .fs
            .read()
            .expect("poisoned ram directory lock")
            .get(path)
        {
            Some(data) => Ok(data
                .0
                .read()
                .expect("poisoned ram directory lock")
                .get_ref()
                .clone()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("File has never been created: {path:?}"),
            )),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.fs
            .read()
            .expect("poisoned ram directory lock")
            .contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;

    use super::{Directory, RamDirectory};

    #[test]
    fn test_ram_directory_write_then_read() {
        let directory = RamDirectory::create();
        let path = Path::new("toto");
        {
            let mut write = directory.open_write(path).unwrap();
            write.write_all(b"titi").unwrap();
            write.flush().unwrap();
        }
        assert!(directory.exists(path));
        assert_eq!(directory.open_read(path).unwrap(), b"titi");
        assert!(directory.open_read(Path::new("missing")).is_err());
    }
}
