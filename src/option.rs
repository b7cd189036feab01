use lazy_static::lazy_static;
use std::path::PathBuf;

lazy_static! {
  pub static ref DEFAULT_DIR_PATH: PathBuf = std::env::temp_dir().join("fs-kv");
}

#[derive(Debug, Clone)]
pub struct Options {
  /// Root directory of the store, used by the file system backend.
  pub dir_path: PathBuf,

  pub storage_type: StorageType,

  /// Upper bound on idle storage handles kept by the pool.
  pub max_idle_handles: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
  /// Real disk, rooted at `Options::dir_path`.
  FileSystem,

  /// Process-local tree, shared by every handle of one store.
  Memory,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      dir_path: DEFAULT_DIR_PATH.clone(),
      storage_type: StorageType::FileSystem,
      max_idle_handles: 16,
    }
  }
}
