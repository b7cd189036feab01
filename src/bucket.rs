use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use bytes::Bytes;
use log::{debug, warn};

use crate::{
  errors::{Errors, Result},
  fio::FILE_MODE,
  lock::{Lock, LOCK_SUFFIX},
  pool::HandlePool,
};

/// A directory-backed namespace of keys and nested buckets.
///
/// Cloning is cheap: clones address the same directory through the same pool.
#[derive(Clone)]
pub struct Bucket {
  dir: PathBuf,
  pool: Arc<HandlePool>,
}

impl Bucket {
  pub(crate) fn new(dir: PathBuf, pool: Arc<HandlePool>) -> Self {
    Bucket { dir, pool }
  }

  /// Directory of this bucket, relative to the store root.
  pub fn path(&self) -> &Path {
    &self.dir
  }

  fn child_path(&self, name: &str) -> Result<PathBuf> {
    if name.is_empty() {
      return Err(Errors::InvalidName(name.to_string()));
    }
    Ok(self.dir.join(name))
  }

  /// Returns the sub-bucket `name`, creating its directory if needed.
  pub fn get_bucket(&self, name: &str) -> Result<Bucket> {
    let dir = self.child_path(name)?;
    let fs = self.pool.get();
    fs.mkdir_all(&dir)?;
    debug!("opened bucket {}", dir.display());
    Ok(Bucket::new(dir, self.pool.clone()))
  }

  /// Stores `value` under `key`, replacing any previous content.
  ///
  /// The key is locked for the duration of the write; a concurrent writer
  /// gets `Locked`. The lock is released even when the write fails, and the
  /// write error wins if both fail.
  pub fn set(&self, key: &str, value: Bytes) -> Result<()> {
    let file_name = self.child_path(key)?;
    let fs = self.pool.get();
    // the directory may have been cleaned up by an earlier remove
    fs.mkdir_all(&self.dir)?;

    let lock = Lock::acquire(&*fs, &file_name)?;
    let write_res = fs.write(&file_name, &value, FILE_MODE);
    let release_res = lock.release(&*fs);

    if let Err(e) = write_res {
      if let Err(release_err) = release_res {
        warn!("failed to release {} after write error: {}", lock.path().display(), release_err);
      }
      return Err(e);
    }
    release_res
  }

  /// Reads the value of `key`. This read does not take the key's lock.
  pub fn get(&self, key: &str) -> Result<Bytes> {
    let file_name = self.child_path(key)?;
    let fs = self.pool.get();
    fs.read(&file_name)
  }

  /// Visits every key starting with `prefix`, in this bucket and in all of its
  /// sub-buckets, depth first. Returning `false` from `f` ends the scan.
  pub fn scan<F>(&self, prefix: &str, mut f: F) -> Result<()>
  where
    F: FnMut(&str, Bytes) -> bool,
  {
    let fs = self.pool.get();
    fs.walk(&self.dir, &mut |entry| {
      if entry.is_dir {
        return Ok(true);
      }
      let name = match entry.name() {
        Some(name) => name,
        None => {
          // not addressable through a `&str` key
          warn!("skipping non UTF-8 entry {}", entry.path.display());
          return Ok(true);
        }
      };
      if name.ends_with(LOCK_SUFFIX) || !name.starts_with(prefix) {
        return Ok(true);
      }

      let value = match fs.read(&entry.path) {
        Ok(value) => value,
        // removed after it was listed
        Err(Errors::KeyNotFound) => return Ok(true),
        Err(e) => return Err(e),
      };
      Ok(f(name, value))
    })
  }

  /// Removes the given keys, or the whole bucket when `keys` is empty.
  ///
  /// Each key's lock is taken and dropped before deleting it, so a key held by
  /// a writer aborts the call with `Locked`; keys after it are left alone.
  /// Missing keys are not an error, nor is a bucket whose directory is
  /// already gone. A bucket left empty is deleted.
  pub fn remove(&self, keys: &[&str]) -> Result<()> {
    let fs = self.pool.get();
    if keys.is_empty() {
      debug!("removing bucket {}", self.dir.display());
      return fs.remove_all(&self.dir);
    }
    if !fs.exists(&self.dir)? {
      return Ok(());
    }

    for key in keys {
      let path = self.child_path(key)?;
      let lock = Lock::acquire(&*fs, &path)?;
      if let Err(e) = lock.release(&*fs) {
        warn!("failed to release {}: {}", lock.path().display(), e);
      }
      fs.remove_all(&path)?;
    }

    // a concurrent remove may have cleaned the directory up already
    if fs.exists(&self.dir)? && fs.read_dir(&self.dir)?.is_empty() {
      debug!("bucket {} is empty, removing it", self.dir.display());
      fs.remove_all(&self.dir)?;
    }
    Ok(())
  }
}

impl std::fmt::Debug for Bucket {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Bucket").field("dir", &self.dir).finish()
  }
}
