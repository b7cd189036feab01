use std::{
  ffi::OsString,
  io,
  path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::{
  errors::{Errors, Result},
  fio::{Storage, LOCK_FILE_MODE},
};

pub const LOCK_SUFFIX: &str = ".lock";

/// Returns the sidecar lock path guarding `path`.
pub fn lock_path(path: &Path) -> PathBuf {
  let mut name = OsString::from(path.as_os_str());
  name.push(LOCK_SUFFIX);
  PathBuf::from(name)
}

/// Advisory, token-verified claim on a path, held as a sidecar file.
///
/// Locks never expire: if the holder dies before `release`, the sidecar stays
/// until someone removes it by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
  path: PathBuf,
  token: String,
}

impl Lock {
  /// Claims `path`. Fails immediately with `Locked` if a sidecar exists.
  ///
  /// The sidecar is created with `create_new`, so two racing callers can never
  /// both believe they hold it.
  pub fn acquire(fs: &dyn Storage, path: &Path) -> Result<Lock> {
    let path = lock_path(path);
    let token = rand::random::<u64>().to_string();
    match fs.create_new(&path, token.as_bytes(), LOCK_FILE_MODE) {
      Ok(()) => {}
      Err(Errors::Io(e)) if e.kind() == io::ErrorKind::AlreadyExists => {
        warn!("{} is already locked", path.display());
        return Err(Errors::Locked);
      }
      Err(e) => return Err(e),
    }
    debug!("acquired lock {}", path.display());
    Ok(Lock { path, token })
  }

  /// Deletes the sidecar, but only if it still carries this lock's token.
  ///
  /// A sidecar that is already gone means this lock was released before or
  /// removed by someone else; that is reported as `Locked` too.
  pub fn release(&self, fs: &dyn Storage) -> Result<()> {
    let current = match fs.read(&self.path) {
      Ok(current) => current,
      Err(Errors::KeyNotFound) => {
        warn!("lock {} is no longer held", self.path.display());
        return Err(Errors::Locked);
      }
      Err(e) => return Err(e),
    };
    if current.as_ref() != self.token.as_bytes() {
      warn!("lock {} is held by another owner", self.path.display());
      return Err(Errors::Locked);
    }

    fs.remove_all(&self.path)?;
    debug!("released lock {}", self.path.display());
    Ok(())
  }

  /// Path of the sidecar file.
  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn token(&self) -> &str {
    &self.token
  }
}

#[cfg(test)]
mod tests {
  use bytes::Bytes;

  use super::*;
  use crate::fio::{memory::MemoryStorage, FILE_MODE};

  fn mem() -> MemoryStorage {
    let mem = MemoryStorage::new();
    mem.mkdir_all(Path::new("")).unwrap();
    mem
  }

  #[test]
  fn test_lock_path() {
    assert_eq!(lock_path(Path::new("b/key")), PathBuf::from("b/key.lock"));
  }

  #[test]
  fn test_lock_acquire_release() {
    let fs = mem();
    let lock = Lock::acquire(&fs, Path::new("key")).unwrap();
    assert_eq!(lock.path(), Path::new("key.lock"));
    assert_eq!(fs.read(lock.path()).unwrap(), Bytes::from(lock.token().to_string()));
    assert!(lock.token().parse::<u64>().is_ok());

    assert!(lock.release(&fs).is_ok());
    assert!(!fs.exists(Path::new("key.lock")).unwrap());
  }

  #[test]
  fn test_lock_already_held() {
    let fs = mem();
    let _held = Lock::acquire(&fs, Path::new("key")).unwrap();
    let res = Lock::acquire(&fs, Path::new("key"));
    assert!(matches!(res, Err(Errors::Locked)));
  }

  #[test]
  fn test_lock_double_release() {
    let fs = mem();
    let lock = Lock::acquire(&fs, Path::new("key")).unwrap();
    lock.release(&fs).unwrap();
    assert!(matches!(lock.release(&fs), Err(Errors::Locked)));
  }

  #[test]
  fn test_lock_stale_release_keeps_new_owner() {
    let fs = mem();
    let stale = Lock::acquire(&fs, Path::new("key")).unwrap();

    // someone clears the sidecar by hand and a new writer takes over
    fs.remove_all(stale.path()).unwrap();
    let fresh = Lock::acquire(&fs, Path::new("key")).unwrap();
    assert_ne!(stale.token(), fresh.token());

    let res = stale.release(&fs);
    assert!(matches!(res, Err(Errors::Locked)));
    assert!(fs.exists(fresh.path()).unwrap());
    assert!(fresh.release(&fs).is_ok());
  }

  #[test]
  fn test_lock_foreign_content() {
    let fs = mem();
    let lock = Lock::acquire(&fs, Path::new("key")).unwrap();
    fs.write(lock.path(), b"12345", FILE_MODE).unwrap();
    assert!(matches!(lock.release(&fs), Err(Errors::Locked)));
    assert_eq!(fs.read(lock.path()).unwrap(), Bytes::from("12345"));
  }

  #[test]
  fn test_lock_concurrent_acquire() {
    use std::{sync::Arc, thread};

    let fs = mem();
    let winners = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let mut handles = vec![];
    for _ in 0..8 {
      let fs = fs.clone();
      let winners = winners.clone();
      handles.push(thread::spawn(move || {
        match Lock::acquire(&fs, Path::new("key")) {
          Ok(_) => {
            winners.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
          }
          Err(e) => assert!(matches!(e, Errors::Locked)),
        }
      }));
    }
    for handle in handles {
      handle.join().unwrap();
    }
    // nobody releases, so exactly one caller ever held it
    assert_eq!(winners.load(std::sync::atomic::Ordering::SeqCst), 1);
  }

  #[test]
  fn test_lock_missing_parent() {
    let fs = mem();
    let res = Lock::acquire(&fs, Path::new("no-bucket/key"));
    assert!(matches!(res, Err(Errors::Io(_))));
  }
}
