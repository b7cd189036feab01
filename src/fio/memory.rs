use std::{
  collections::{btree_map::Entry, BTreeMap},
  io,
  path::{Component, Path, PathBuf},
  sync::Arc,
};

use bytes::Bytes;
use parking_lot::RwLock;

use crate::errors::{Errors, Result};

use super::{Storage, WalkEntry};

#[derive(Debug, Clone)]
enum Node {
  Dir,
  File(Bytes),
}

/// In-memory storage. Clones share the same tree, so a factory can hand out
/// many handles onto one store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
  tree: Arc<RwLock<BTreeMap<PathBuf, Node>>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of files (not directories) currently held.
  pub fn file_count(&self) -> usize {
    self
      .tree
      .read()
      .values()
      .filter(|n| matches!(n, Node::File(_)))
      .count()
  }
}

fn normalize(path: &Path) -> Result<PathBuf> {
  let mut out = PathBuf::new();
  for comp in path.components() {
    match comp {
      Component::Normal(seg) if !seg.as_encoded_bytes().contains(&0) => out.push(seg),
      Component::CurDir => {}
      _ => return Err(Errors::InvalidName(path.display().to_string())),
    }
  }
  Ok(out)
}

fn io_error(kind: io::ErrorKind, msg: &str, path: &Path) -> Errors {
  Errors::Io(io::Error::new(kind, format!("{}: {}", msg, path.display())))
}

impl Storage for MemoryStorage {
  fn mkdir_all(&self, path: &Path) -> Result<()> {
    let path = normalize(path)?;
    let mut tree = self.tree.write();

    let mut cur = PathBuf::new();
    let mut prefixes = vec![cur.clone()];
    for comp in path.components() {
      cur.push(comp);
      prefixes.push(cur.clone());
    }

    for prefix in prefixes {
      match tree.get(&prefix) {
        Some(Node::File(_)) => {
          return Err(io_error(io::ErrorKind::AlreadyExists, "not a directory", &prefix));
        }
        Some(Node::Dir) => {}
        None => {
          tree.insert(prefix, Node::Dir);
        }
      }
    }
    Ok(())
  }

  fn read(&self, path: &Path) -> Result<Bytes> {
    let path = normalize(path)?;
    match self.tree.read().get(&path) {
      Some(Node::File(data)) => Ok(data.clone()),
      Some(Node::Dir) => Err(io_error(io::ErrorKind::Other, "is a directory", &path)),
      None => Err(Errors::KeyNotFound),
    }
  }

  fn write(&self, path: &Path, data: &[u8], _mode: u32) -> Result<()> {
    let path = normalize(path)?;
    let parent = match path.parent() {
      Some(parent) => parent.to_path_buf(),
      None => return Err(io_error(io::ErrorKind::Other, "is a directory", &path)),
    };

    let mut tree = self.tree.write();
    if !matches!(tree.get(&parent), Some(Node::Dir)) {
      return Err(io_error(io::ErrorKind::NotFound, "no such directory", &parent));
    }
    if matches!(tree.get(&path), Some(Node::Dir)) {
      return Err(io_error(io::ErrorKind::Other, "is a directory", &path));
    }
    tree.insert(path, Node::File(Bytes::copy_from_slice(data)));
    Ok(())
  }

  fn create_new(&self, path: &Path, data: &[u8], _mode: u32) -> Result<()> {
    let path = normalize(path)?;
    let parent = match path.parent() {
      Some(parent) => parent.to_path_buf(),
      None => return Err(io_error(io::ErrorKind::AlreadyExists, "already exists", &path)),
    };

    let mut tree = self.tree.write();
    if !matches!(tree.get(&parent), Some(Node::Dir)) {
      return Err(io_error(io::ErrorKind::NotFound, "no such directory", &parent));
    }
    match tree.entry(path) {
      Entry::Occupied(e) => Err(io_error(io::ErrorKind::AlreadyExists, "already exists", e.key())),
      Entry::Vacant(e) => {
        e.insert(Node::File(Bytes::copy_from_slice(data)));
        Ok(())
      }
    }
  }

  fn exists(&self, path: &Path) -> Result<bool> {
    let path = normalize(path)?;
    Ok(self.tree.read().contains_key(&path))
  }

  fn remove_all(&self, path: &Path) -> Result<()> {
    let path = normalize(path)?;
    self.tree.write().retain(|k, _| !k.starts_with(&path));
    Ok(())
  }

  fn read_dir(&self, path: &Path) -> Result<Vec<String>> {
    let path = normalize(path)?;
    let tree = self.tree.read();
    match tree.get(&path) {
      Some(Node::Dir) => {}
      Some(Node::File(_)) => {
        return Err(io_error(io::ErrorKind::Other, "not a directory", &path));
      }
      None => return Err(io_error(io::ErrorKind::NotFound, "no such directory", &path)),
    }

    Ok(
      tree
        .keys()
        .filter(|k| k.as_path() != path && k.parent() == Some(path.as_path()))
        .filter_map(|k| k.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect(),
    )
  }

  fn walk(&self, root: &Path, visitor: &mut dyn FnMut(&WalkEntry) -> Result<bool>) -> Result<()> {
    let root = normalize(root)?;

    // snapshot first so the visitor may call back into this storage
    let entries: Vec<WalkEntry> = {
      let tree = self.tree.read();
      tree
        .range(root.clone()..)
        .take_while(|(k, _)| k.starts_with(&root))
        .map(|(k, node)| WalkEntry {
          path: k.clone(),
          is_dir: matches!(node, Node::Dir),
        })
        .collect()
    };

    for entry in entries.iter() {
      if !visitor(entry)? {
        break;
      }
    }
    Ok(())
  }
}
