//! 机器字分块的位数组 Bit array stored as machine-word blocks.
//!
//! 块内 LSB 优先，与磁盘记录一致 LSB-first within each block, matching the
//! on-disk record, so save can dump the blocks verbatim.

#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};

/// 每块位数 Bits per block
pub(crate) const BLOCK_BITS: usize = usize::BITS as usize;

/// LSB 优先的定长位数组 Fixed-size LSB-first bit array
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub(crate) struct Blocks(Vec<usize>);

impl Blocks {
  /// 创建可容纳 bit_count 位的全零数组 All-zero array holding bit_count bits
  pub(crate) fn zeroed(bit_count: usize) -> Self {
    Blocks(vec![0; bit_count.div_ceil(BLOCK_BITS)])
  }

  /// 由原始块重建 Rebuild from raw blocks
  #[inline]
  pub(crate) fn from_raw(blocks: Vec<usize>) -> Self {
    Blocks(blocks)
  }

  /// 原始块视图 Raw block view
  #[inline]
  pub(crate) fn as_raw(&self) -> &[usize] {
    &self.0
  }

  /// 块数量 Block count
  #[inline]
  pub(crate) fn block_count(&self) -> usize {
    self.0.len()
  }

  /// 置位 Set bit
  #[inline]
  pub(crate) fn set(&mut self, pos: usize) {
    self.0[pos / BLOCK_BITS] |= 1 << (pos % BLOCK_BITS);
  }

  /// 测位 Test bit
  #[inline]
  pub(crate) fn get(&self, pos: usize) -> bool {
    self.0[pos / BLOCK_BITS] & (1 << (pos % BLOCK_BITS)) != 0
  }
}
