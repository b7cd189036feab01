use bytes::Bytes;
use rand::{distr::Alphanumeric, Rng};

/// Random alphanumeric string of length `n`.
pub fn rand_string(n: usize) -> String {
  rand::rng()
    .sample_iter(&Alphanumeric)
    .take(n)
    .map(char::from)
    .collect()
}

pub fn get_test_key(i: usize) -> String {
  format!("fs-kv-key-{:09}", i)
}

pub fn get_test_value(i: usize) -> Bytes {
  Bytes::from(format!("fs-kv-value-value-value-value-value-value-value-{:09}-{}", i, rand_string(16)))
}
