//! 磁盘记录的机器字布局 Machine-word layout for on-disk records.
//!
//! 所有整数按宿主字节序写为机器字 All integers are machine words in host byte order.

use std::io::{ErrorKind, Read, Write};
use std::mem::size_of;

use crate::error::{Error, Result};

/// 机器字宽（字节）Machine word width in bytes
pub(crate) const WORD: usize = size_of::<usize>();

/// 写入一个机器字 Write one machine word
#[inline]
pub(crate) fn put_word<W: Write>(w: &mut W, v: usize) -> Result<()> {
  w.write_all(&v.to_ne_bytes())?;
  Ok(())
}

/// 读取一个机器字 Read one machine word
#[inline]
pub(crate) fn get_word<R: Read>(r: &mut R) -> Result<usize> {
  let mut buf = [0u8; WORD];
  fill(r, &mut buf)?;
  Ok(usize::from_ne_bytes(buf))
}

/// 读取一个字节 Read one byte
#[inline]
pub(crate) fn get_u8<R: Read>(r: &mut R) -> Result<u8> {
  let mut buf = [0u8; 1];
  fill(r, &mut buf)?;
  Ok(buf[0])
}

/// 读满缓冲区，EOF 视为记录截断 Fill the buffer, EOF means a truncated record
#[inline]
pub(crate) fn fill<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
  r.read_exact(buf).map_err(|e| {
    if e.kind() == ErrorKind::UnexpectedEof {
      Error::Incomplete
    } else {
      Error::Io(e)
    }
  })
}
