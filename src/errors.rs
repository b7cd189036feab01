use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Errors {
  #[error("the key is not found in the bucket")]
  KeyNotFound,

  #[error("the key is locked by another writer")]
  Locked,

  #[error("invalid name: {0}")]
  InvalidName(String),

  #[error("database dir path can not be empty")]
  DirPathIsEmpty,

  #[error("storage io error: {0}")]
  Io(#[from] io::Error),
}

impl Errors {
  /// Classifies an adapter I/O failure. `InvalidInput` is what the OS
  /// reports for names it cannot represent (e.g. an embedded NUL byte).
  pub(crate) fn from_io(e: io::Error, name: &str) -> Errors {
    match e.kind() {
      io::ErrorKind::InvalidInput => Errors::InvalidName(name.to_string()),
      _ => Errors::Io(e),
    }
  }
}

pub type Result<T> = std::result::Result<T, Errors>;
