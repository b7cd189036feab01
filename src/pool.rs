use std::ops::Deref;

use log::debug;
use parking_lot::Mutex;

use crate::fio::{Storage, StorageFactory};

/// A reusable set of storage handles.
///
/// Handles are built lazily by the factory and never explicitly destroyed.
/// A handle is owned by exactly one caller between `checkout` and `checkin`.
pub struct HandlePool {
  factory: StorageFactory,
  idle: Mutex<Vec<Box<dyn Storage>>>,
  max_idle: usize,
}

impl HandlePool {
  pub fn new(factory: StorageFactory, max_idle: usize) -> Self {
    Self {
      factory,
      idle: Mutex::new(Vec::new()),
      max_idle,
    }
  }

  /// Takes an idle handle, or builds a new one when none is available.
  pub fn checkout(&self) -> Box<dyn Storage> {
    if let Some(handle) = self.idle.lock().pop() {
      return handle;
    }
    debug!("storage pool empty, creating a new handle");
    (self.factory)()
  }

  /// Returns a handle to the pool. Surplus handles beyond `max_idle` are dropped.
  pub fn checkin(&self, handle: Box<dyn Storage>) {
    let mut idle = self.idle.lock();
    if idle.len() < self.max_idle {
      idle.push(handle);
    }
  }

  /// Checks out a handle that goes back to the pool when the guard drops.
  pub fn get(&self) -> PooledStorage<'_> {
    PooledStorage {
      pool: self,
      handle: Some(self.checkout()),
    }
  }

  pub fn idle_count(&self) -> usize {
    self.idle.lock().len()
  }
}

pub struct PooledStorage<'a> {
  pool: &'a HandlePool,
  handle: Option<Box<dyn Storage>>,
}

impl Deref for PooledStorage<'_> {
  type Target = dyn Storage;

  fn deref(&self) -> &Self::Target {
    self
      .handle
      .as_deref()
      .expect("pooled handle is only taken when the guard drops")
  }
}

impl Drop for PooledStorage<'_> {
  fn drop(&mut self) {
    if let Some(handle) = self.handle.take() {
      self.pool.checkin(handle);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::{
      atomic::{AtomicUsize, Ordering},
      Arc,
    },
    thread,
  };

  use super::*;
  use crate::fio::memory::MemoryStorage;

  fn counting_pool(max_idle: usize) -> (Arc<HandlePool>, Arc<AtomicUsize>) {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    let mem = MemoryStorage::new();
    let factory: StorageFactory = Arc::new(move || {
      counter.fetch_add(1, Ordering::SeqCst);
      Box::new(mem.clone()) as Box<dyn Storage>
    });
    (Arc::new(HandlePool::new(factory, max_idle)), created)
  }

  #[test]
  fn test_pool_reuses_handles() {
    let (pool, created) = counting_pool(4);

    let h1 = pool.checkout();
    pool.checkin(h1);
    let h2 = pool.checkout();
    pool.checkin(h2);

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(pool.idle_count(), 1);
  }

  #[test]
  fn test_pool_grows_under_load() {
    let (pool, created) = counting_pool(4);

    let h1 = pool.checkout();
    let h2 = pool.checkout();
    assert_eq!(created.load(Ordering::SeqCst), 2);

    pool.checkin(h1);
    pool.checkin(h2);
    assert_eq!(pool.idle_count(), 2);
  }

  #[test]
  fn test_pool_discards_surplus() {
    let (pool, _) = counting_pool(1);

    let h1 = pool.checkout();
    let h2 = pool.checkout();
    pool.checkin(h1);
    pool.checkin(h2);
    assert_eq!(pool.idle_count(), 1);
  }

  #[test]
  fn test_pool_guard_checks_in_on_drop() {
    let (pool, created) = counting_pool(4);
    {
      let fs = pool.get();
      assert!(fs.exists(std::path::Path::new("")).is_ok());
      assert_eq!(pool.idle_count(), 0);
    }
    assert_eq!(pool.idle_count(), 1);
    let _fs = pool.get();
    assert_eq!(created.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_pool_concurrent_checkout() {
    let (pool, created) = counting_pool(8);

    let mut handles = vec![];
    for _ in 0..8 {
      let pool = pool.clone();
      handles.push(thread::spawn(move || {
        for _ in 0..100 {
          let h = pool.checkout();
          pool.checkin(h);
        }
      }));
    }
    for handle in handles {
      handle.join().unwrap();
    }

    assert!(created.load(Ordering::SeqCst) <= 8);
    assert_eq!(pool.idle_count(), created.load(Ordering::SeqCst));
  }
}
