//! 过滤器集成测试 Integration tests for the filters.

use std::collections::HashSet;
use std::io::Cursor;
use std::mem::size_of;

use mdb_filter::{BloomFilter, CuckooFilter, CuckooMap, Error};

const WORD: usize = size_of::<usize>();

/// 生成互不相同的随机键 Generate distinct random keys
fn unique_keys(count: usize, seed: u64) -> Vec<Vec<u8>> {
  let mut rng = fastrand::Rng::with_seed(seed);
  let mut set = HashSet::with_capacity(count);
  while set.len() < count {
    let len = rng.usize(4..=32);
    let key: Vec<u8> = (0..len).map(|_| rng.u8(..)).collect();
    set.insert(key);
  }
  set.into_iter().collect()
}

/// 手工拼一个机器字头部 Hand-build a header of machine words
fn words(vals: &[usize]) -> Vec<u8> {
  let mut buf = Vec::new();
  for &v in vals {
    buf.extend_from_slice(&v.to_ne_bytes());
  }
  buf
}

// ---------------------------------------------------------------- bloom

#[test]
fn bloom_empty_contains_nothing() {
  let bf = BloomFilter::new(1024, 3);
  assert!(!bf.contains(b""));
  assert!(!bf.contains(b"foo"));
  assert!(!bf.contains(b"bar"));
}

#[test]
fn bloom_insert_and_contains() {
  let mut bf = BloomFilter::new(1024, 3);
  assert!(!bf.contains(b"hello"));
  bf.insert(b"hello");
  assert!(bf.contains(b"hello"));
  assert!(!bf.contains(b"world"));
}

#[test]
fn bloom_multiple_items() {
  let mut bf = BloomFilter::new(2048, 5);
  let items: [&[u8]; 5] = [b"alpha", b"beta", b"gamma", b"delta", b"epsilon"];
  for item in items {
    assert!(!bf.contains(item));
    bf.insert(item);
  }
  for item in items {
    assert!(bf.contains(item));
  }
  assert!(!bf.contains(b"zeta"));
}

#[test]
fn bloom_supports_empty_key() {
  let mut bf = BloomFilter::new(128, 2);
  assert!(!bf.contains(b""));
  bf.insert(b"");
  assert!(bf.contains(b""));
}

#[test]
fn bloom_no_false_negatives() {
  let mut bf = BloomFilter::new(64 * 1024, 4);
  let keys = unique_keys(1000, 1);
  for k in &keys {
    bf.insert(k);
  }
  for k in &keys {
    assert!(bf.contains(k));
  }
}

#[test]
fn bloom_round_trip() {
  let mut bf = BloomFilter::new(4096, 4);
  for item in [b"one".as_slice(), b"two", b"three"] {
    bf.insert(item);
  }

  let mut buf = Vec::new();
  let written = bf.save(&mut buf).unwrap();
  assert_eq!(written, buf.len());

  let loaded = BloomFilter::load(&mut Cursor::new(&buf)).unwrap();
  for item in [b"one".as_slice(), b"two", b"three"] {
    assert!(loaded.contains(item));
  }
  assert!(!loaded.contains(b"four"));
  assert_eq!(loaded.bits(), bf.bits());

  // 任意键上加载前后应答一致 Loaded filter agrees on arbitrary keys
  for k in unique_keys(200, 2) {
    assert_eq!(bf.contains(&k), loaded.contains(&k));
  }
}

#[test]
fn bloom_load_rejects_truncation() {
  let mut bf = BloomFilter::new(4096, 4);
  bf.insert(b"one");
  let mut buf = Vec::new();
  bf.save(&mut buf).unwrap();

  for cut in [1, WORD, buf.len() / 2, buf.len() - 1] {
    let r = BloomFilter::load(&mut Cursor::new(&buf[..cut]));
    assert!(matches!(r, Err(Error::Incomplete)), "cut at {cut}");
  }
}

#[test]
fn bloom_load_rejects_short_block_array() {
  // 1 块装不下 1024 位 One block cannot hold 1024 bits
  let buf = words(&[1024, 3, 1, 0]);
  let r = BloomFilter::load(&mut Cursor::new(buf));
  assert!(matches!(r, Err(Error::BlockCount { blocks: 1, bits: 1024 })));
}

// ---------------------------------------------------------------- cuckoo filter

#[test]
fn cuckoo_empty_contains_nothing() {
  let cf = CuckooFilter::new(16, 4, 8, 500).unwrap();
  assert!(!cf.contains(b""));
  assert!(!cf.contains(b"foo"));
  assert!(cf.is_empty());
}

#[test]
fn cuckoo_insert_and_contains() {
  let mut cf = CuckooFilter::new(16, 4, 8, 500).unwrap();
  let items: [&[u8]; 5] = [b"alpha", b"beta", b"gamma", b"delta", b"epsilon"];
  for item in items {
    assert!(cf.insert(item), "insert failed");
  }
  for item in items {
    assert!(cf.contains(item));
  }
  assert_eq!(cf.len(), 5);

  // 未插入键的误判率应接近 2S/2^F ≈ 3% Absent keys should false-positive
  // near 2S/2^F ≈ 3%
  let absent = unique_keys(1000, 3);
  let hits = absent.iter().filter(|k| cf.contains(k)).count();
  assert!(hits < 100, "false positive rate too high: {hits}/1000");
}

#[test]
fn cuckoo_erase_and_reinsert() {
  let mut cf = CuckooFilter::new(16, 4, 8, 500).unwrap();
  assert!(cf.insert(b"delete_me"));
  assert!(cf.contains(b"delete_me"));
  assert!(cf.erase(b"delete_me"));
  assert!(!cf.contains(b"delete_me"));
  assert!(!cf.erase(b"delete_me"));

  assert!(cf.insert(b"delete_me"));
  assert!(cf.contains(b"delete_me"));
}

#[test]
fn cuckoo_erase_absent_key() {
  let mut cf = CuckooFilter::new(16, 4, 8, 500).unwrap();
  assert!(!cf.erase(b"nothing_here"));
}

#[test]
fn cuckoo_inserted_keys_are_found() {
  // 半满表：成功插入的键必须可见 Half-full table: every accepted key is visible
  let mut cf = CuckooFilter::new(256, 4, 8, 500).unwrap();
  let keys = unique_keys(500, 4);
  let accepted: Vec<_> = keys.iter().filter(|k| cf.insert(k)).collect();
  assert!(accepted.len() > 450, "too many rejections: {}", accepted.len());
  for k in &accepted {
    assert!(cf.contains(k));
  }
  assert_eq!(cf.len(), accepted.len());
}

#[test]
fn cuckoo_round_trip() {
  let mut cf = CuckooFilter::new(16, 4, 8, 500).unwrap();
  for item in [b"one".as_slice(), b"two", b"three"] {
    assert!(cf.insert(item));
  }

  let mut buf = Vec::new();
  let written = cf.save(&mut buf).unwrap();
  assert_eq!(written, buf.len());

  let mut loaded = CuckooFilter::load(&mut Cursor::new(&buf)).unwrap();
  for item in [b"one".as_slice(), b"two", b"three"] {
    assert!(loaded.contains(item));
  }
  assert_eq!(loaded.len(), 3);

  // 任意键上应答一致 Agreement on arbitrary keys
  for k in unique_keys(200, 5) {
    assert_eq!(cf.contains(&k), loaded.contains(&k));
  }

  // 重存字节一致 A second save is byte-identical
  let mut buf2 = Vec::new();
  loaded.save(&mut buf2).unwrap();
  assert_eq!(buf, buf2);

  // 加载后的表仍可删除 Erase still works on the loaded table
  assert!(loaded.erase(b"two"));
  assert!(!loaded.contains(b"two"));
}

#[test]
fn cuckoo_rejects_bad_fingerprint_width() {
  assert!(matches!(CuckooFilter::new(16, 4, 0, 500), Err(Error::FingerprintWidth(0))));
  assert!(matches!(CuckooFilter::new(16, 4, 9, 500), Err(Error::FingerprintWidth(9))));
}

#[test]
fn cuckoo_load_rejects_bad_headers() {
  // 指纹宽度 9 Fingerprint width 9
  let r = CuckooFilter::load(&mut Cursor::new(words(&[16, 4, 9, 500])));
  assert!(matches!(r, Err(Error::FingerprintWidth(9))));

  // 桶数非 2 的幂 Bucket count not a power of two
  let r = CuckooFilter::load(&mut Cursor::new(words(&[3, 4, 8, 500])));
  assert!(matches!(r, Err(Error::BucketCount(3))));

  // 桶内指纹数超过槽数 More fingerprints than slots in a bucket
  let mut buf = words(&[1, 2, 8, 500, 3]);
  buf.extend_from_slice(&[1, 2, 3]);
  let r = CuckooFilter::load(&mut Cursor::new(buf));
  assert!(matches!(r, Err(Error::BucketOverflow { bucket: 0, len: 3, slots: 2 })));

  // 桶数据被截断 Truncated bucket data
  let r = CuckooFilter::load(&mut Cursor::new(words(&[1, 4, 8, 500, 2])));
  assert!(matches!(r, Err(Error::Incomplete)));
}

#[test]
fn cuckoo_seeded_eviction_is_deterministic() {
  let keys = unique_keys(300, 6);

  let mut a = CuckooFilter::new(64, 4, 8, 50).unwrap();
  let mut b = CuckooFilter::new(64, 4, 8, 50).unwrap();
  a.seed_rng(42);
  b.seed_rng(42);

  for k in &keys {
    assert_eq!(a.insert(k), b.insert(k));
  }
  assert_eq!(a.len(), b.len());
}

// ---------------------------------------------------------------- cuckoo map

#[test]
fn map_empty_contains_nothing() {
  let cm = CuckooMap::new(16, 4, 8, 500).unwrap();
  assert!(!cm.contains(b""));
  assert!(!cm.contains(b"foo"));
  assert!(cm.is_empty());
}

#[test]
fn map_chain_fallback() {
  // 容量 1、预算 1：第二个键必须走溢出链
  // Capacity 1, budget 1: the second key must take the overflow chain
  let mut cm = CuckooMap::new(1, 1, 8, 1).unwrap();
  assert!(cm.insert(b"first"));
  assert!(cm.insert(b"second"));
  assert!(cm.contains(b"first"));
  assert!(cm.contains(b"second"));
  assert_eq!(cm.len(), 2);
}

#[test]
fn map_insert_never_fails() {
  let mut cm = CuckooMap::new(4, 2, 8, 10).unwrap();
  let keys = unique_keys(500, 7);
  for k in &keys {
    assert!(cm.insert(k));
  }
  assert_eq!(cm.len(), 500);
}

#[test]
fn map_single_bucket_holds_everything() {
  // 单桶映射：所有指纹都落在桶 0，查询不会漏报
  // Single-bucket map: every fingerprint lands in bucket 0, lookups never miss
  let mut cm = CuckooMap::new(1, 2, 8, 10).unwrap();
  let keys = unique_keys(500, 12);
  for k in &keys {
    assert!(cm.insert(k));
  }
  for k in &keys {
    assert!(cm.contains(k));
  }
  assert_eq!(cm.len(), 500);
}

#[test]
fn map_erase_one_of_many() {
  // 选择在过滤器中互不冲突的键 Pick keys that do not collide in the filter
  let mut cm = CuckooMap::new(16, 4, 8, 500).unwrap();
  let mut keys = Vec::new();
  let mut i = 0u32;
  while keys.len() < 5 {
    let k = format!("user{i}");
    i += 1;
    if cm.contains(k.as_bytes()) {
      continue;
    }
    assert!(cm.insert(k.as_bytes()));
    keys.push(k);
  }

  assert!(cm.erase(keys[2].as_bytes()));
  assert!(!cm.contains(keys[2].as_bytes()));
  for (j, k) in keys.iter().enumerate() {
    if j != 2 {
      assert!(cm.contains(k.as_bytes()), "lost {k}");
    }
  }
  assert!(!cm.erase(keys[2].as_bytes()));
}

#[test]
fn map_round_trip() {
  let mut cm = CuckooMap::new(16, 4, 8, 500).unwrap();
  let items: [&[u8]; 5] = [b"one", b"two", b"three", b"four", b"five"];
  for item in items {
    assert!(cm.insert(item));
  }

  let mut buf = Vec::new();
  let written = cm.save(&mut buf).unwrap();
  assert_eq!(written, buf.len());

  let loaded = CuckooMap::load(&mut Cursor::new(&buf)).unwrap();
  for item in items {
    assert!(loaded.contains(item));
  }
  assert_eq!(loaded.len(), 5);

  for k in unique_keys(200, 8) {
    assert_eq!(cm.contains(&k), loaded.contains(&k));
  }
}

#[test]
fn map_round_trip_with_chains() {
  // 单槽表，十个键：九个在链上 Single slot, ten keys: nine on the chain
  let mut cm = CuckooMap::new(1, 1, 8, 1).unwrap();
  cm.seed_rng(11);
  let keys = unique_keys(10, 9);
  for k in &keys {
    assert!(cm.insert(k));
  }

  let mut buf = Vec::new();
  cm.save(&mut buf).unwrap();
  let loaded = CuckooMap::load(&mut Cursor::new(&buf)).unwrap();
  assert_eq!(loaded.len(), 10);
  for k in &keys {
    assert!(loaded.contains(k));
  }

  // 链序按文件顺序重建，重存字节一致
  // Chains reload in file order, so a second save is byte-identical
  let mut buf2 = Vec::new();
  loaded.save(&mut buf2).unwrap();
  assert_eq!(buf, buf2);

  // 重载后每个键仍可删除一次 Every key still erases once after reload
  let mut loaded = loaded;
  for k in &keys {
    assert!(loaded.erase(k));
  }
  assert!(loaded.is_empty());
}

#[test]
fn map_load_rejects_bad_headers() {
  let r = CuckooMap::load(&mut Cursor::new(words(&[16, 4, 0, 500])));
  assert!(matches!(r, Err(Error::FingerprintWidth(0))));

  let r = CuckooMap::load(&mut Cursor::new(words(&[6, 4, 8, 500])));
  assert!(matches!(r, Err(Error::BucketCount(6))));

  // 链数据被截断 Truncated chain data
  let mut buf = words(&[1, 1, 8, 500]);
  buf.push(0); // 槽 slot
  buf.extend_from_slice(&words(&[2])); // 链长 2 但无数据 chain_len 2, no data
  let r = CuckooMap::load(&mut Cursor::new(buf));
  assert!(matches!(r, Err(Error::Incomplete)));
}

#[cfg(feature = "serde_support")]
#[test]
fn serde_round_trip() {
  let mut cf = CuckooFilter::new(32, 4, 8, 500).unwrap();
  let keys = unique_keys(50, 10);
  for k in &keys {
    assert!(cf.insert(k));
  }

  let encoded = sonic_rs::to_string(&cf).unwrap();
  let decoded: CuckooFilter = sonic_rs::from_str(&encoded).unwrap();
  for k in &keys {
    assert!(decoded.contains(k));
  }
  assert_eq!(decoded.len(), cf.len());

  let mut cm = CuckooMap::new(1, 1, 8, 1).unwrap();
  for k in &keys {
    assert!(cm.insert(k));
  }
  let encoded = sonic_rs::to_string(&cm).unwrap();
  let decoded: CuckooMap = sonic_rs::from_str(&encoded).unwrap();
  for k in &keys {
    assert!(decoded.contains(k));
  }
}

#[test]
fn map_size_accounting() {
  let mut cm = CuckooMap::new(8, 4, 8, 500).unwrap();
  let primary = 8 * (WORD + 4) as u64 * 8;
  assert_eq!(cm.bits(), primary);

  // 挤满单桶结构以制造链节点 Overflow a tiny map to create chain nodes
  let mut tiny = CuckooMap::new(1, 1, 8, 1).unwrap();
  for i in 0..5u32 {
    tiny.insert(format!("key{i}").as_bytes());
  }
  assert!(tiny.bits() > (WORD + 1) as u64 * 8);
  assert_eq!(cm.bits(), primary); // 未受影响 untouched
  cm.insert(b"x");
  assert_eq!(cm.bits(), primary); // 槽内插入不增加位数 slot inserts add no bits
}
