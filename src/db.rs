use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use bytes::Bytes;
use log::{error, info};

use crate::{
  bucket::Bucket,
  errors::Result,
  fio::{new_storage_factory, Storage, StorageFactory},
  option::{Options, StorageType},
  pool::HandlePool,
};

/// Store is the entry point of the key/value store.
///
/// It owns the root bucket and forwards every operation to it.
pub struct Store {
  root: Bucket,
  options: Options,
}

impl Store {
  /// Opens the store described by `opts`, creating its root directory if needed.
  pub fn open(opts: Options) -> Result<Self> {
    let factory = new_storage_factory(&opts)?;
    let store = Self::open_with_pool(opts, factory)?;
    match store.options.storage_type {
      StorageType::FileSystem => info!("opened store at {}", store.dir_path().display()),
      StorageType::Memory => info!("opened in-memory store"),
    }
    Ok(store)
  }

  /// Opens a store whose storage handles come from `factory`.
  ///
  /// `opts.dir_path` and `opts.storage_type` are not consulted; the factory
  /// decides where the data lives.
  pub fn open_with_factory<F>(opts: Options, factory: F) -> Result<Self>
  where
    F: Fn() -> Box<dyn Storage> + Send + Sync + 'static,
  {
    let store = Self::open_with_pool(opts, Arc::new(factory))?;
    info!("opened store with a custom storage factory");
    Ok(store)
  }

  fn open_with_pool(opts: Options, factory: StorageFactory) -> Result<Self> {
    let pool = Arc::new(HandlePool::new(factory, opts.max_idle_handles));

    {
      let fs = pool.get();
      if let Err(e) = fs.mkdir_all(Path::new("")) {
        error!("failed to create store root: {}", e);
        return Err(e);
      }
    }

    Ok(Store {
      root: Bucket::new(PathBuf::new(), pool),
      options: opts,
    })
  }

  /// The bucket backing the store root.
  pub fn root(&self) -> &Bucket {
    &self.root
  }

  pub fn dir_path(&self) -> &Path {
    &self.options.dir_path
  }

  pub fn get_bucket(&self, name: &str) -> Result<Bucket> {
    self.root.get_bucket(name)
  }

  pub fn set(&self, key: &str, value: Bytes) -> Result<()> {
    self.root.set(key, value)
  }

  pub fn get(&self, key: &str) -> Result<Bytes> {
    self.root.get(key)
  }

  /// Visits keys with `prefix` anywhere in the store, see [`Bucket::scan`].
  pub fn scan<F>(&self, prefix: &str, f: F) -> Result<()>
  where
    F: FnMut(&str, Bytes) -> bool,
  {
    self.root.scan(prefix, f)
  }

  /// Removes the given keys; with no keys the whole store content is removed.
  pub fn remove(&self, keys: &[&str]) -> Result<()> {
    self.root.remove(keys)
  }
}
