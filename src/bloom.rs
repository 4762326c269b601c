//! 布隆过滤器 Bloom filter.
//!
//! 定长位数组加 k 次哈希探测，无假阴性，不支持删除。
//! Fixed bit array with k hash probes. No false negatives, no deletion.
//!
//! 每次探测位置为 `(h1 + i * h2) mod m`，其中 `h1` 为键哈希，
//! `h2 = splitmix64(h1)`，避免为每个探测各算一次完整哈希。
//! Probe i lands at `(h1 + i * h2) mod m` where `h1` is the key hash and
//! `h2 = splitmix64(h1)`, so one key hash serves all k probes.

use std::io::{Read, Write};

use log::debug;
#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};

use crate::bits::{Blocks, BLOCK_BITS};
use crate::error::{Error, Result};
use crate::hash::{key_hash, splitmix64};
use crate::layout::{get_word, put_word, WORD};

/// 布隆过滤器 Bloom filter
///
/// # Examples
///
/// ```
/// use mdb_filter::BloomFilter;
///
/// let mut bf = BloomFilter::new(1024, 3);
/// assert!(!bf.contains(b"hello"));
/// bf.insert(b"hello");
/// assert!(bf.contains(b"hello"));
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct BloomFilter {
  bit_count: usize,
  hash_count: usize,
  blocks: Blocks,
}

impl BloomFilter {
  /// 创建 bit_count 位、hash_count 次探测的过滤器
  /// Create a filter with bit_count bits and hash_count probes
  ///
  /// 两个参数都会被钳制到至少 1：零位数组无处可探，
  /// 零次探测会让空过滤器对一切报告存在。
  /// Both parameters are clamped to at least 1: a zero-bit array has
  /// nowhere to probe, and zero probes would make an empty filter claim
  /// containment for everything.
  pub fn new(bit_count: usize, hash_count: usize) -> Self {
    let bit_count = bit_count.max(1);
    BloomFilter {
      bit_count,
      hash_count: hash_count.max(1),
      blocks: Blocks::zeroed(bit_count),
    }
  }

  /// 插入键 Insert a key
  pub fn insert(&mut self, key: &[u8]) {
    let h1 = key_hash(key);
    let h2 = splitmix64(h1);
    for i in 0..self.hash_count {
      let pos = self.probe(h1, h2, i);
      self.blocks.set(pos);
    }
  }

  /// 键是否可能存在 Whether the key may have been inserted
  ///
  /// 假阳性概率约为 `(1 - e^(-kn/m))^k`，无假阴性。
  /// False positives at roughly `(1 - e^(-kn/m))^k`; never a false negative.
  pub fn contains(&self, key: &[u8]) -> bool {
    let h1 = key_hash(key);
    let h2 = splitmix64(h1);
    (0..self.hash_count).all(|i| self.blocks.get(self.probe(h1, h2, i)))
  }

  /// 第 i 次探测的位下标 Bit position of probe i
  #[inline]
  fn probe(&self, h1: u64, h2: u64, i: usize) -> usize {
    (h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.bit_count as u64) as usize
  }

  /// 位数组占用的位数 Bits occupied by the backing store
  #[inline]
  pub fn bits(&self) -> u64 {
    (self.blocks.block_count() * BLOCK_BITS) as u64
  }

  /// 写出二进制记录，返回写入字节数
  /// Write the binary record, returns bytes written
  ///
  /// 布局：m、k、块数、原始块，均为宿主序机器字。
  /// Layout: m, k, block count, then the raw blocks, all host-order words.
  pub fn save<W: Write>(&self, w: &mut W) -> Result<usize> {
    put_word(w, self.bit_count)?;
    put_word(w, self.hash_count)?;
    put_word(w, self.blocks.block_count())?;
    for &block in self.blocks.as_raw() {
      put_word(w, block)?;
    }
    Ok((3 + self.blocks.block_count()) * WORD)
  }

  /// 从二进制记录重建 Rebuild from a binary record
  ///
  /// 块数不足以覆盖 m 位时返回格式错误；超出 m 的位被忽略。
  /// Fails when the blocks cannot cover m bits; bits at or past m are ignored.
  pub fn load<R: Read>(r: &mut R) -> Result<Self> {
    let bit_count = get_word(r)?.max(1);
    let hash_count = get_word(r)?.max(1);
    let nblocks = get_word(r)?;

    if nblocks.saturating_mul(BLOCK_BITS) < bit_count {
      return Err(Error::BlockCount { blocks: nblocks, bits: bit_count });
    }

    let mut blocks = Vec::with_capacity(nblocks);
    for _ in 0..nblocks {
      blocks.push(get_word(r)?);
    }

    debug!("loaded bloom filter: {bit_count} bits, {hash_count} probes, {nblocks} blocks");
    Ok(BloomFilter {
      bit_count,
      hash_count,
      blocks: Blocks::from_raw(blocks),
    })
  }
}
