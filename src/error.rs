//! 过滤器错误类型 Filter error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("IO: {0}")]
  Io(#[from] std::io::Error),

  #[error("fingerprint width must be 1..=8 bits, got {0}")]
  FingerprintWidth(usize),

  #[error("bucket count must be a non-zero power of two, got {0}")]
  BucketCount(usize),

  #[error("{blocks} blocks cannot hold {bits} bits")]
  BlockCount { blocks: usize, bits: usize },

  #[error("bucket {bucket}: {len} fingerprints exceed {slots} slots")]
  BucketOverflow { bucket: usize, len: usize, slots: usize },

  #[error("table too large: {buckets} buckets x {slots} slots")]
  TooLarge { buckets: usize, slots: usize },

  #[error("incomplete record")]
  Incomplete,
}
