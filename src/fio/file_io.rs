use std::{
  fs::{self, DirBuilder, OpenOptions},
  io::{self, Write},
  path::{Component, Path, PathBuf},
};

use bytes::Bytes;
use log::error;
use walkdir::WalkDir;

use crate::errors::{Errors, Result};

use super::{Storage, WalkEntry, DIR_MODE};

/// Standard file system storage, confined to a base directory.
pub struct FileIO {
  base: PathBuf,
}

impl FileIO {
  pub fn new<P>(base: P) -> Self
  where
    P: AsRef<Path>,
  {
    FileIO {
      base: base.as_ref().to_path_buf(),
    }
  }

  pub fn base(&self) -> &Path {
    &self.base
  }

  /// Maps a store-relative path onto the base directory. Anything that could
  /// step outside of it (`..`, absolute paths, drive prefixes) is refused.
  fn resolve(&self, path: &Path) -> Result<PathBuf> {
    let mut real = self.base.clone();
    for comp in path.components() {
      match comp {
        Component::Normal(seg) => real.push(seg),
        Component::CurDir => {}
        _ => return Err(Errors::InvalidName(path.display().to_string())),
      }
    }
    Ok(real)
  }
}

fn fail(op: &str, path: &Path, e: io::Error) -> Errors {
  let err = Errors::from_io(e, &path.display().to_string());
  if let Errors::Io(ref io_err) = err {
    error!("failed to {} {}: {}", op, path.display(), io_err);
  }
  err
}

impl Storage for FileIO {
  fn mkdir_all(&self, path: &Path) -> Result<()> {
    let real = self.resolve(path)?;
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
      use std::os::unix::fs::DirBuilderExt;
      builder.mode(DIR_MODE);
    }
    builder.create(&real).map_err(|e| fail("create dir", path, e))
  }

  fn read(&self, path: &Path) -> Result<Bytes> {
    let real = self.resolve(path)?;
    match fs::read(&real) {
      Ok(data) => Ok(Bytes::from(data)),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Errors::KeyNotFound),
      Err(e) => Err(fail("read", path, e)),
    }
  }

  fn write(&self, path: &Path, data: &[u8], mode: u32) -> Result<()> {
    let real = self.resolve(path)?;
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
      use std::os::unix::fs::OpenOptionsExt;
      opts.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = opts.open(&real).map_err(|e| fail("open", path, e))?;
    file.write_all(data).map_err(|e| fail("write", path, e))
  }

  fn create_new(&self, path: &Path, data: &[u8], mode: u32) -> Result<()> {
    let real = self.resolve(path)?;
    let mut opts = OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
      use std::os::unix::fs::OpenOptionsExt;
      opts.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = match opts.open(&real) {
      Ok(file) => file,
      Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Err(Errors::Io(e)),
      Err(e) => return Err(fail("create", path, e)),
    };
    file.write_all(data).map_err(|e| fail("write", path, e))
  }

  fn exists(&self, path: &Path) -> Result<bool> {
    let real = self.resolve(path)?;
    real.try_exists().map_err(|e| fail("stat", path, e))
  }

  fn remove_all(&self, path: &Path) -> Result<()> {
    let real = self.resolve(path)?;
    let meta = match fs::symlink_metadata(&real) {
      Ok(meta) => meta,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
      Err(e) => return Err(fail("stat", path, e)),
    };
    let res = if meta.is_dir() {
      fs::remove_dir_all(&real)
    } else {
      fs::remove_file(&real)
    };
    match res {
      Err(e) if e.kind() != io::ErrorKind::NotFound => Err(fail("remove", path, e)),
      _ => Ok(()),
    }
  }

  fn read_dir(&self, path: &Path) -> Result<Vec<String>> {
    let real = self.resolve(path)?;
    let dir = fs::read_dir(&real).map_err(|e| fail("read dir", path, e))?;
    let mut names = Vec::new();
    for entry in dir {
      let entry = entry.map_err(|e| fail("read dir", path, e))?;
      names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
  }

  fn walk(&self, root: &Path, visitor: &mut dyn FnMut(&WalkEntry) -> Result<bool>) -> Result<()> {
    let real = self.resolve(root)?;
    for item in WalkDir::new(&real).sort_by_file_name() {
      let entry = match item {
        Ok(entry) => entry,
        Err(e) => {
          let io_err = io::Error::from(e);
          // entries removed while walking are simply skipped
          if io_err.kind() == io::ErrorKind::NotFound {
            continue;
          }
          return Err(fail("walk", root, io_err));
        }
      };

      let rel = entry
        .path()
        .strip_prefix(&self.base)
        .map_err(|_| Errors::InvalidName(entry.path().display().to_string()))?;
      let walk_entry = WalkEntry {
        path: rel.to_path_buf(),
        is_dir: entry.file_type().is_dir(),
      };
      if !visitor(&walk_entry)? {
        break;
      }
    }
    Ok(())
  }
}
