pub mod file_io;
pub mod memory;

use std::{path::Path, sync::Arc};

use bytes::Bytes;

use crate::{
  errors::{Errors, Result},
  option::{Options, StorageType},
};

use self::{file_io::FileIO, memory::MemoryStorage};

/// Mode bits for bucket directories.
pub const DIR_MODE: u32 = 0o755;

/// Mode bits for key files.
pub const FILE_MODE: u32 = 0o755;

/// Mode bits for lock sidecar files.
pub const LOCK_FILE_MODE: u32 = 0o777;

/// One entry produced by [`Storage::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
  /// Path relative to the storage root.
  pub path: std::path::PathBuf,

  pub is_dir: bool,
}

impl WalkEntry {
  /// File name of the entry, or `None` for the root or a non UTF-8 name.
  pub fn name(&self) -> Option<&str> {
    self.path.file_name().and_then(|n| n.to_str())
  }
}

/// Path-addressed storage capability the engine is built on.
///
/// All paths are relative to the backend's root; the empty path is the root
/// itself. Implementations only need to be `Send`: the pool hands each
/// instance to a single caller at a time.
pub trait Storage: Send {
  /// Creates `path` and any missing parents. Existing directories are fine.
  fn mkdir_all(&self, path: &Path) -> Result<()>;

  /// Reads the whole file. Fails with `KeyNotFound` if it does not exist.
  fn read(&self, path: &Path) -> Result<Bytes>;

  /// Creates or truncates `path` and writes `data` as its full content.
  fn write(&self, path: &Path, data: &[u8], mode: u32) -> Result<()>;

  /// Creates `path` with `data` only if nothing exists there yet. An existing
  /// entry fails with an `io::ErrorKind::AlreadyExists` error; the check and
  /// the creation are one atomic step.
  fn create_new(&self, path: &Path, data: &[u8], mode: u32) -> Result<()>;

  fn exists(&self, path: &Path) -> Result<bool>;

  /// Deletes `path` and everything below it. An absent path is a no-op.
  fn remove_all(&self, path: &Path) -> Result<()>;

  /// Names of the direct children of the directory at `path`.
  fn read_dir(&self, path: &Path) -> Result<Vec<String>>;

  /// Depth-first, pre-order traversal of `root` in lexical order.
  ///
  /// The visitor returns `Ok(false)` to stop the walk early; a missing root
  /// yields no entries.
  fn walk(&self, root: &Path, visitor: &mut dyn FnMut(&WalkEntry) -> Result<bool>) -> Result<()>;
}

/// Builds a fresh storage handle; called lazily by the handle pool.
pub type StorageFactory = Arc<dyn Fn() -> Box<dyn Storage> + Send + Sync>;

/// Returns the factory selected by `options.storage_type`.
pub fn new_storage_factory(options: &Options) -> Result<StorageFactory> {
  match options.storage_type {
    StorageType::FileSystem => {
      if options.dir_path.as_os_str().is_empty() {
        return Err(Errors::DirPathIsEmpty);
      }
      let base = options.dir_path.clone();
      Ok(Arc::new(move || Box::new(FileIO::new(base.clone())) as Box<dyn Storage>))
    }
    StorageType::Memory => {
      let shared = MemoryStorage::new();
      Ok(Arc::new(move || Box::new(shared.clone()) as Box<dyn Storage>))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_dir_path_rejected() {
    let opts = Options {
      dir_path: std::path::PathBuf::new(),
      ..Default::default()
    };
    let res = new_storage_factory(&opts);
    assert!(matches!(res.err(), Some(Errors::DirPathIsEmpty)));
  }

  #[test]
  fn test_memory_factory_shares_tree() {
    let opts = Options {
      storage_type: StorageType::Memory,
      ..Default::default()
    };
    let factory = new_storage_factory(&opts).unwrap();
    let a = factory();
    let b = factory();
    a.mkdir_all(Path::new("")).unwrap();
    a.write(Path::new("k"), b"v", FILE_MODE).unwrap();
    assert_eq!(b.read(Path::new("k")).unwrap(), Bytes::from("v"));
  }
}
