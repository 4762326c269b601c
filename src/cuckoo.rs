//! 布谷鸟过滤器 Cuckoo filter.
//!
//! 两候选桶的指纹表，支持删除。插入满时随机踢出驻留指纹到其备选桶，
//! 踢出预算耗尽则插入失败。
//! Two-candidate-bucket fingerprint table with deletion. A full insert
//! randomly kicks a resident fingerprint to its alternate bucket; the
//! insert fails once the kick budget runs out.
//!
//! 桶数向上取整为 2 的幂，使备选桶函数 `i ^ (fp_hash(fp) & mask)` 自反，
//! 踢出不会孤立指纹。
//! The bucket count is rounded up to a power of two so the alternate-bucket
//! function `i ^ (fp_hash(fp) & mask)` is self-inverse and eviction cannot
//! orphan a fingerprint.

use std::io::{Read, Write};

use log::debug;
#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::{fp_hash, key_hash};
use crate::layout::{fill, get_word, put_word, WORD};

/// 布谷鸟过滤器 Cuckoo filter
///
/// # Examples
///
/// ```
/// use mdb_filter::CuckooFilter;
///
/// let mut cf = CuckooFilter::new(16, 4, 8, 500).unwrap();
/// assert!(cf.insert(b"hello"));
/// assert!(cf.contains(b"hello"));
/// assert!(cf.erase(b"hello"));
/// assert!(!cf.contains(b"hello"));
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct CuckooFilter {
  bucket_count: usize,
  index_mask: usize,
  slots_per_bucket: usize,
  fp_bits: usize,
  fp_mask: u64,
  max_kicks: usize,
  #[cfg_attr(feature = "serde_support", serde(with = "serde_bytes"))]
  slots: Vec<u8>,
  len: usize,
  #[cfg_attr(feature = "serde_support", serde(skip))]
  rng: fastrand::Rng,
}

impl CuckooFilter {
  /// 创建过滤器 Create a filter
  ///
  /// `fp_bits` 必须在 1..=8，桶数向上取整为 2 的幂。
  /// `fp_bits` must be in 1..=8; the bucket count is rounded up to a power
  /// of two.
  pub fn new(
    bucket_count: usize,
    slots_per_bucket: usize,
    fp_bits: usize,
    max_kicks: usize,
  ) -> Result<Self> {
    if fp_bits == 0 || fp_bits > 8 {
      return Err(Error::FingerprintWidth(fp_bits));
    }
    let bucket_count = bucket_count.max(1).next_power_of_two();
    let total = bucket_count
      .checked_mul(slots_per_bucket)
      .ok_or(Error::TooLarge { buckets: bucket_count, slots: slots_per_bucket })?;
    Ok(CuckooFilter {
      bucket_count,
      index_mask: bucket_count - 1,
      slots_per_bucket,
      fp_bits,
      fp_mask: (1u64 << fp_bits) - 1,
      max_kicks,
      slots: vec![0; total],
      len: 0,
      rng: fastrand::Rng::new(),
    })
  }

  /// 指纹数量 Number of stored fingerprints
  #[inline]
  pub fn len(&self) -> usize {
    self.len
  }

  /// 是否为空 Whether the table is empty
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// 槽数组占用的位数 Bits occupied by the slot array
  #[inline]
  pub fn bits(&self) -> u64 {
    (self.bucket_count * self.slots_per_bucket) as u64 * 8
  }

  /// 重设踢出随机源的种子，用于确定性测试
  /// Reseed the eviction RNG, for deterministic tests
  pub fn seed_rng(&mut self, seed: u64) {
    self.rng = fastrand::Rng::with_seed(seed);
  }

  /// 插入键 Insert a key
  ///
  /// 返回 false 表示踢出预算耗尽（表已满）。此时在途指纹（最后一次踢出的
  /// 受害者）被丢弃，表内指纹数量不变，调用方应视为表满。
  /// Returns false once the kick budget is exhausted (table full). The
  /// fingerprint still in flight (the last eviction victim) is dropped; the
  /// stored count is unchanged and callers should treat this as a full
  /// table.
  pub fn insert(&mut self, key: &[u8]) -> bool {
    let hash = key_hash(key);
    let fp = self.fingerprint(hash);
    let i1 = self.index1(hash);
    let i2 = self.alt_index(i1, fp);

    if self.try_insert(i1, fp) || self.try_insert(i2, fp) {
      self.len += 1;
      return true;
    }

    // 无槽可踢 No victim slot exists to kick
    if self.slots_per_bucket == 0 {
      return false;
    }

    let mut fp = fp;
    let mut idx = if self.rng.bool() { i1 } else { i2 };
    for _ in 0..self.max_kicks {
      let victim = self.rng.usize(0..self.slots_per_bucket);
      let off = idx * self.slots_per_bucket + victim;
      std::mem::swap(&mut fp, &mut self.slots[off]);
      debug_assert_ne!(fp, 0);
      idx = self.alt_index(idx, fp);
      if self.try_insert(idx, fp) {
        self.len += 1;
        return true;
      }
    }
    false
  }

  /// 键是否可能存在 Whether the key may have been inserted
  pub fn contains(&self, key: &[u8]) -> bool {
    let hash = key_hash(key);
    let fp = self.fingerprint(hash);
    let i1 = self.index1(hash);
    if self.bucket(i1).contains(&fp) {
      return true;
    }
    let i2 = self.alt_index(i1, fp);
    self.bucket(i2).contains(&fp)
  }

  /// 删除一个匹配指纹 Erase one matching fingerprint
  ///
  /// 先扫描首选桶再扫描备选桶，只清除第一个匹配槽；指纹冲突时删除的
  /// 可能不是调用者插入的那个键。
  /// Scans the primary bucket then the alternate, clearing the first match
  /// only; under fingerprint collisions the cleared entry may belong to a
  /// different key.
  pub fn erase(&mut self, key: &[u8]) -> bool {
    let hash = key_hash(key);
    let fp = self.fingerprint(hash);
    let i1 = self.index1(hash);
    let i2 = self.alt_index(i1, fp);
    if self.clear_slot(i1, fp) || self.clear_slot(i2, fp) {
      self.len -= 1;
      return true;
    }
    false
  }

  /// 写出二进制记录，返回写入字节数
  /// Write the binary record, returns bytes written
  ///
  /// 每桶只写非零指纹：sz_i 机器字后跟 sz_i 个指纹字节。
  /// Each bucket is compacted: an sz_i word followed by sz_i fingerprint
  /// bytes, zero holes omitted.
  pub fn save<W: Write>(&self, w: &mut W) -> Result<usize> {
    put_word(w, self.bucket_count)?;
    put_word(w, self.slots_per_bucket)?;
    put_word(w, self.fp_bits)?;
    put_word(w, self.max_kicks)?;
    let mut total = 4 * WORD;

    for i in 0..self.bucket_count {
      let live: Vec<u8> = self.bucket(i).iter().copied().filter(|&v| v != 0).collect();
      put_word(w, live.len())?;
      w.write_all(&live)?;
      total += WORD + live.len();
    }
    Ok(total)
  }

  /// 从二进制记录重建 Rebuild from a binary record
  ///
  /// 校验指纹宽度、桶数为 2 的幂、每桶指纹数不超过槽数。
  /// 踢出随机源重新取熵，记录不含 RNG 状态。
  /// Validates the fingerprint width, the power-of-two bucket count, and
  /// that no bucket exceeds its slot count. The eviction RNG is reseeded
  /// from entropy; the record carries no RNG state.
  pub fn load<R: Read>(r: &mut R) -> Result<Self> {
    let bucket_count = get_word(r)?;
    let slots_per_bucket = get_word(r)?;
    let fp_bits = get_word(r)?;
    let max_kicks = get_word(r)?;

    if fp_bits == 0 || fp_bits > 8 {
      return Err(Error::FingerprintWidth(fp_bits));
    }
    if bucket_count == 0 || !bucket_count.is_power_of_two() {
      return Err(Error::BucketCount(bucket_count));
    }
    let total = bucket_count
      .checked_mul(slots_per_bucket)
      .ok_or(Error::TooLarge { buckets: bucket_count, slots: slots_per_bucket })?;

    let mut slots = vec![0u8; total];
    let mut len = 0;
    for i in 0..bucket_count {
      let sz = get_word(r)?;
      if sz > slots_per_bucket {
        return Err(Error::BucketOverflow { bucket: i, len: sz, slots: slots_per_bucket });
      }
      let base = i * slots_per_bucket;
      fill(r, &mut slots[base..base + sz])?;
      len += slots[base..base + sz].iter().filter(|&&v| v != 0).count();
    }

    debug!("loaded cuckoo filter: {bucket_count} buckets x {slots_per_bucket}, {len} fingerprints");
    Ok(CuckooFilter {
      bucket_count,
      index_mask: bucket_count - 1,
      slots_per_bucket,
      fp_bits,
      fp_mask: (1u64 << fp_bits) - 1,
      max_kicks,
      slots,
      len,
      rng: fastrand::Rng::new(),
    })
  }

  /// 由键哈希取指纹，零值重映射为 1
  /// Fingerprint from the key hash; zero remaps to 1
  #[inline]
  fn fingerprint(&self, hash: u64) -> u8 {
    let fp = (hash & self.fp_mask) as u8;
    if fp == 0 { 1 } else { fp }
  }

  /// 首选桶 Primary bucket index
  #[inline]
  fn index1(&self, hash: u64) -> usize {
    hash as usize & self.index_mask
  }

  /// 备选桶，自反：再施加一次回到原桶
  /// Alternate bucket; self-inverse, applying it twice returns the bucket
  #[inline]
  fn alt_index(&self, idx: usize, fp: u8) -> usize {
    idx ^ (fp_hash(fp) as usize & self.index_mask)
  }

  #[inline]
  fn bucket(&self, idx: usize) -> &[u8] {
    let base = idx * self.slots_per_bucket;
    &self.slots[base..base + self.slots_per_bucket]
  }

  /// 放入桶内第一个空槽 Place into the first empty slot of the bucket
  #[inline]
  fn try_insert(&mut self, idx: usize, fp: u8) -> bool {
    let base = idx * self.slots_per_bucket;
    for slot in &mut self.slots[base..base + self.slots_per_bucket] {
      if *slot == 0 {
        *slot = fp;
        return true;
      }
    }
    false
  }

  /// 清除桶内第一个匹配槽 Clear the first matching slot of the bucket
  #[inline]
  fn clear_slot(&mut self, idx: usize, fp: u8) -> bool {
    let base = idx * self.slots_per_bucket;
    for slot in &mut self.slots[base..base + self.slots_per_bucket] {
      if *slot == fp {
        *slot = 0;
        return true;
      }
    }
    false
  }
}
