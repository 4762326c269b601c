#![cfg_attr(docsrs, feature(doc_cfg))]

//! mousedb 的近似成员过滤器 Approximate-membership filters for mousedb.
//!
//! 在昂贵的磁盘查找之前廉价回答「键 k 是否可能插入过」，答案为否时跳过
//! 磁盘访问。三个独立结构，各自持有参数、内存与持久化编码：
//! Cheaply answers "has key k possibly been inserted?" in front of
//! expensive on-disk lookups, so a negative answer skips the disk. Three
//! independent structures, each owning its parameters, memory and
//! persistence encoding:
//!
//! - [`BloomFilter`]: 位数组加 k 次探测，无删除 bit array with k probes, no deletion
//! - [`CuckooFilter`]: 指纹桶表，支持删除，插入可能失败 bucketed fingerprints,
//!   supports deletion, insert can fail when full
//! - [`CuckooMap`]: 带溢出链的布谷鸟表，插入永不失败 cuckoo table with
//!   overflow chains, insertion never fails
//!
//! 单线程契约：结构内部不加锁，共享访问需外部串行化。
//! Single-threaded contract: no internal synchronization, shared access
//! must be serialized externally.
//!
//! # Examples
//!
//! ```
//! use std::io::Cursor;
//!
//! use mdb_filter::CuckooFilter;
//!
//! let mut cf = CuckooFilter::new(16, 4, 8, 500)?;
//! assert!(cf.insert(b"hello"));
//!
//! let mut buf = Vec::new();
//! cf.save(&mut buf)?;
//! let loaded = CuckooFilter::load(&mut Cursor::new(buf))?;
//! assert!(loaded.contains(b"hello"));
//! # Ok::<(), mdb_filter::Error>(())
//! ```

mod bits;
mod bloom;
mod cuckoo;
mod cuckoo_map;
mod error;
mod hash;
mod layout;

pub use bloom::BloomFilter;
pub use cuckoo::CuckooFilter;
pub use cuckoo_map::CuckooMap;
pub use error::{Error, Result};
