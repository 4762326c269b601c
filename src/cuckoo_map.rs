//! 链式布谷鸟映射 Chained cuckoo map.
//!
//! 布谷鸟过滤器加每桶溢出链，插入永不失败：踢出预算耗尽后，在途指纹
//! 挂到两候选桶中链更短的一侧。
//! A cuckoo filter with a per-bucket overflow chain, so insertion never
//! fails: once the kick budget is exhausted the in-flight fingerprint goes
//! onto the shorter of the two candidate chains.
//!
//! 链头存放在与槽数组平行的数组里，不再复用槽缓冲的首字节。
//! Chain heads live in an array parallel to the slot buffer instead of
//! being aliased into its leading bytes.

use std::io::{Read, Write};
use std::mem::size_of;

use log::debug;
#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::{fp_hash, key_hash};
use crate::layout::{fill, get_u8, get_word, put_word, WORD};

/// 溢出链节点 Overflow chain node
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
struct Node {
  fp: u8,
  next: Option<Box<Node>>,
}

type Chain = Option<Box<Node>>;

/// 链式布谷鸟映射 Chained cuckoo map
///
/// # Examples
///
/// ```
/// use mdb_filter::CuckooMap;
///
/// // 容量 1 的映射也装得下两个键，第二个进溢出链
/// // Even a capacity-1 map holds two keys, the second on the overflow chain
/// let mut cm = CuckooMap::new(1, 1, 8, 1).unwrap();
/// assert!(cm.insert(b"first"));
/// assert!(cm.insert(b"second"));
/// assert!(cm.contains(b"first") && cm.contains(b"second"));
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct CuckooMap {
  bucket_count: usize,
  index_mask: usize,
  slots_per_bucket: usize,
  fp_bits: usize,
  fp_mask: u64,
  max_kicks: usize,
  #[cfg_attr(feature = "serde_support", serde(with = "serde_bytes"))]
  slots: Vec<u8>,
  chains: Vec<Chain>,
  len: usize,
  #[cfg_attr(feature = "serde_support", serde(skip))]
  rng: fastrand::Rng,
}

impl CuckooMap {
  /// 创建映射 Create a map
  ///
  /// 参数与 [`crate::CuckooFilter`] 相同：`fp_bits` 必须在 1..=8，
  /// 桶数向上取整为 2 的幂。
  /// Same parameters as [`crate::CuckooFilter`]: `fp_bits` must be in
  /// 1..=8, the bucket count is rounded up to a power of two.
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
    Ok(CuckooMap {
      bucket_count,
      index_mask: bucket_count - 1,
      slots_per_bucket,
      fp_bits,
      fp_mask: (1u64 << fp_bits) - 1,
      max_kicks,
      slots: vec![0; total],
      chains: vec![None; bucket_count],
      len: 0,
      rng: fastrand::Rng::new(),
    })
  }

  /// 指纹数量（含链节点）Number of stored fingerprints, chain nodes included
  #[inline]
  pub fn len(&self) -> usize {
    self.len
  }

  /// 是否为空 Whether the map is empty
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// 占用位数：槽数组按每桶「链头指针 + S 槽」计，另加每个活跃链节点
  /// Occupied bits: the primary array counts a chain head pointer plus S
  /// slots per bucket, plus every live chain node
  pub fn bits(&self) -> u64 {
    let primary = self.bucket_count * (size_of::<Chain>() + self.slots_per_bucket) * 8;
    let nodes: usize = (0..self.bucket_count).map(|i| self.chain_len(i)).sum();
    (primary + nodes * size_of::<Node>() * 8) as u64
  }

  /// 重设踢出随机源的种子，用于确定性测试
  /// Reseed the eviction RNG, for deterministic tests
  pub fn seed_rng(&mut self, seed: u64) {
    self.rng = fastrand::Rng::with_seed(seed);
  }

  /// 插入键，永不失败 Insert a key, never fails
  ///
  /// 踢出预算耗尽后在途指纹挂链。锁步遍历两条候选链：`i1` 链严格更短时
  /// 挂 `i1`，其余情况（含同时到底）挂备选桶 `i2`。
  /// After the kick budget is spent the in-flight fingerprint is chained.
  /// The two candidate chains are walked in lock-step: the fingerprint goes
  /// to `i1` when its chain is strictly shorter, and in every other case
  /// (the simultaneous-end tie included) to the alternate bucket `i2`.
  ///
  /// 在途指纹是最后一次踢出的受害者，挂在本次插入键的候选桶上；重度溢出时
  /// 它可能落在其原键的候选桶之外，使该键的查询漏报。
  /// The in-flight fingerprint is the last eviction victim and is chained
  /// at the inserting key's candidate buckets; under heavy overflow it can
  /// land outside its own key's pair, so lookups for that key may miss.
  pub fn insert(&mut self, key: &[u8]) -> bool {
    let hash = key_hash(key);
    let fp = self.fingerprint(hash);
    let i1 = self.index1(hash);
    let i2 = self.alt_index(i1, fp);
    self.len += 1;

    if self.try_insert(i1, fp) || self.try_insert(i2, fp) {
      return true;
    }

    let mut cur_fp = fp;
    if self.slots_per_bucket > 0 {
      let mut idx = if self.rng.bool() { i1 } else { i2 };
      for _ in 0..self.max_kicks {
        let victim = self.rng.usize(0..self.slots_per_bucket);
        let off = idx * self.slots_per_bucket + victim;
        std::mem::swap(&mut cur_fp, &mut self.slots[off]);
        idx = self.alt_index(idx, cur_fp);
        if self.try_insert(idx, cur_fp) {
          return true;
        }
      }
    }

    // 锁步走链找较短一侧 Lock-step walk to find the shorter chain
    let mut h1 = self.chains[i1].as_deref();
    let mut h2 = self.chains[i2].as_deref();
    while let (Some(a), Some(b)) = (h1, h2) {
      h1 = a.next.as_deref();
      h2 = b.next.as_deref();
    }
    let target = if h1.is_none() && h2.is_some() { i1 } else { i2 };

    let old = self.chains[target].take();
    self.chains[target] = Some(Box::new(Node { fp: cur_fp, next: old }));
    true
  }

  /// 键是否可能存在 Whether the key may have been inserted
  ///
  /// 两候选桶各自先查主槽再走链。
  /// For each candidate bucket the primary slots are scanned before the
  /// chain is walked.
  pub fn contains(&self, key: &[u8]) -> bool {
    let hash = key_hash(key);
    let fp = self.fingerprint(hash);
    let i1 = self.index1(hash);
    let i2 = self.alt_index(i1, fp);

    for idx in [i1, i2] {
      if self.bucket(idx).contains(&fp) {
        return true;
      }
      let mut cur = self.chains[idx].as_deref();
      while let Some(node) = cur {
        if node.fp == fp {
          return true;
        }
        cur = node.next.as_deref();
      }
    }
    false
  }

  /// 删除一个匹配指纹 Erase one matching fingerprint
  ///
  /// 主槽优先，链次之；只移除第一个匹配。
  /// Primary slots first, then the chain; only the first match is removed.
  pub fn erase(&mut self, key: &[u8]) -> bool {
    let hash = key_hash(key);
    let fp = self.fingerprint(hash);
    let i1 = self.index1(hash);
    let i2 = self.alt_index(i1, fp);

    for idx in [i1, i2] {
      if self.clear_slot(idx, fp) || Self::unlink(&mut self.chains[idx], fp) {
        self.len -= 1;
        return true;
      }
    }
    false
  }

  /// 写出二进制记录，返回写入字节数
  /// Write the binary record, returns bytes written
  ///
  /// 每桶先原样写 S 个槽字节（保留零洞），再写链长与链上指纹（头到尾）。
  /// Each bucket writes its S raw slot bytes (zero holes kept), then the
  /// chain length and the chain fingerprints head to tail.
  pub fn save<W: Write>(&self, w: &mut W) -> Result<usize> {
    put_word(w, self.bucket_count)?;
    put_word(w, self.slots_per_bucket)?;
    put_word(w, self.fp_bits)?;
    put_word(w, self.max_kicks)?;
    let mut total = 4 * WORD;

    for i in 0..self.bucket_count {
      w.write_all(self.bucket(i))?;
      let chain_len = self.chain_len(i);
      put_word(w, chain_len)?;
      let mut cur = self.chains[i].as_deref();
      while let Some(node) = cur {
        w.write_all(&[node.fp])?;
        cur = node.next.as_deref();
      }
      total += self.slots_per_bucket + WORD + chain_len;
    }
    Ok(total)
  }

  /// 从二进制记录重建 Rebuild from a binary record
  ///
  /// 链节点按文件顺序重建（不反转）。踢出随机源重新取熵。
  /// Chains are rebuilt in file order (not reversed). The eviction RNG is
  /// reseeded from entropy.
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
    let mut chains: Vec<Chain> = vec![None; bucket_count];
    let mut len = 0;
    for i in 0..bucket_count {
      let base = i * slots_per_bucket;
      fill(r, &mut slots[base..base + slots_per_bucket])?;
      len += slots[base..base + slots_per_bucket].iter().filter(|&&v| v != 0).count();

      let chain_len = get_word(r)?;
      let mut fps = Vec::new();
      for _ in 0..chain_len {
        fps.push(get_u8(r)?);
      }
      // 由尾到头折叠以保持文件顺序 Fold back to front to keep file order
      let mut head: Chain = None;
      for &fp in fps.iter().rev() {
        head = Some(Box::new(Node { fp, next: head }));
      }
      chains[i] = head;
      len += chain_len;
    }

    debug!("loaded cuckoo map: {bucket_count} buckets x {slots_per_bucket}, {len} fingerprints");
    Ok(CuckooMap {
      bucket_count,
      index_mask: bucket_count - 1,
      slots_per_bucket,
      fp_bits,
      fp_mask: (1u64 << fp_bits) - 1,
      max_kicks,
      slots,
      chains,
      len,
      rng: fastrand::Rng::new(),
    })
  }

  #[inline]
  fn fingerprint(&self, hash: u64) -> u8 {
    let fp = (hash & self.fp_mask) as u8;
    if fp == 0 { 1 } else { fp }
  }

  #[inline]
  fn index1(&self, hash: u64) -> usize {
    hash as usize & self.index_mask
  }

  #[inline]
  fn alt_index(&self, idx: usize, fp: u8) -> usize {
    idx ^ (fp_hash(fp) as usize & self.index_mask)
  }

  #[inline]
  fn bucket(&self, idx: usize) -> &[u8] {
    let base = idx * self.slots_per_bucket;
    &self.slots[base..base + self.slots_per_bucket]
  }

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

  /// 链长 Chain length
  fn chain_len(&self, idx: usize) -> usize {
    let mut n = 0;
    let mut cur = self.chains[idx].as_deref();
    while let Some(node) = cur {
      n += 1;
      cur = node.next.as_deref();
    }
    n
  }

  /// 摘除链上第一个匹配节点 Unlink the first matching chain node
  fn unlink(head: &mut Chain, fp: u8) -> bool {
    let mut cur = head;
    loop {
      match cur.take() {
        None => return false,
        Some(node) => {
          if node.fp == fp {
            *cur = node.next;
            return true;
          }
          *cur = Some(node);
          cur = &mut cur.as_mut().unwrap().next;
        }
      }
    }
  }
}
