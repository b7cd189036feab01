//! fs-kv: a minimal key/value store laid directly on a directory tree.
//!
//! Buckets are directories, keys are files and values are the raw bytes of
//! those files. Writers exclude each other through sidecar `.lock` files that
//! carry a random token, so the convention also holds across processes.
//! Storage access goes through the [`fio::Storage`] capability; handles are
//! recycled by a [`pool::HandlePool`], which lets the engine run on the real
//! disk, in memory, or on any other backend a factory can build.
//!
//! # Basic Usage
//!
//! ```
//! use bytes::Bytes;
//! use fs_kv::{db::Store, option::Options};
//!
//! let dir = std::env::temp_dir().join("fs-kv-doc");
//! let opts = Options { dir_path: dir.clone(), ..Default::default() };
//! let store = Store::open(opts).expect("failed to open store");
//!
//! let users = store.get_bucket("users").expect("failed to open bucket");
//! users.set("alice", Bytes::from("admin")).expect("failed to set");
//! assert_eq!(users.get("alice").unwrap(), Bytes::from("admin"));
//!
//! users.remove(&["alice"]).expect("failed to remove");
//! # std::fs::remove_dir_all(dir).ok();
//! ```

pub mod bucket;
pub mod db;
pub mod errors;
pub mod fio;
pub mod lock;
pub mod option;
pub mod pool;
pub mod util;
