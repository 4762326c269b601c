//! 键哈希 Key hashing.
//!
//! 所有结构使用固定种子的 xxh3 哈希键，同一构建内 insert 与 contains 一致，
//! 持久化后由同一二进制重新加载仍能正确应答。
//! All structures hash keys with fixed-seed xxh3, so insert and contains
//! agree within a build and a persisted filter reloaded by the same binary
//! still answers correctly.

use xxhash_rust::xxh3::xxh3_64_with_seed;

/// 键哈希种子 Seed for key hashing
const KEY_SEED: u64 = 0;

/// 指纹字节哈希种子 Seed for fingerprint byte hashing
const FP_SEED: u64 = 0x9E37_79B9;

/// 64 位键哈希 64-bit key hash
#[inline(always)]
pub(crate) fn key_hash(key: &[u8]) -> u64 {
  xxh3_64_with_seed(key, KEY_SEED)
}

/// 指纹字节哈希，用于备选桶定位
/// Hash of a single fingerprint byte, for alternate-bucket addressing
#[inline(always)]
pub(crate) fn fp_hash(fp: u8) -> u64 {
  xxh3_64_with_seed(&[fp], FP_SEED)
}

/// splitmix64 终结混合，派生第二个探测哈希
/// splitmix64 finalizer, derives the second probe hash
#[inline(always)]
pub(crate) fn splitmix64(x: u64) -> u64 {
  let mut x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
  x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
  x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
  x ^ (x >> 31)
}
