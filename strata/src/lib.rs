//! # Strata
//!
//! **Strata** applies functions to sequences in parallel on a fixed set of
//! OS threads, and builds scalar reductions on top of that.
//!
//! It offers:
//!
//! - A **worker pool** with a fixed number of long-lived threads sharing one
//!   FIFO task queue. [`WorkerPool::map`] returns results in input order,
//!   whatever order the tasks finish in.
//! - **First-failure propagation**: a panic or an `Err` in caller-supplied
//!   logic is reported once the call's other tasks have drained, and no
//!   partial result escapes.
//! - **Cancellation** through [`CancelToken`]: a blocked caller is woken and
//!   fails with [`Error::Interrupted`], leaving the pool usable.
//! - A **chunked reducer** ([`ChunkReducer`]) splitting input into contiguous
//!   chunks, reduced in parallel then folded left to right.
//! - **Scalar operations** ([`ScalarOps`]): `maximum`, `minimum`, `all`,
//!   `any` and `count`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strata::{ScalarOps, WorkerPool};
//! use std::sync::Arc;
//!
//! let pool = Arc::new(WorkerPool::new(4)?);
//! let lengths = pool.map(vec!["a", "bb", "ccc"], str::len)?;
//! assert_eq!(lengths, vec![1, 2, 3]);
//!
//! let ops = ScalarOps::with_pool(pool.clone());
//! assert_eq!(ops.maximum(3, &[3, 1, 4, 1, 5, 9, 2, 6], i32::cmp)?, 9);
//!
//! pool.close();
//! ```
//!
//! ## Modules
//!
//! - [`reduce`]: chunk partitioning and the chunked reducer
//! - [`scalar`]: scalar reductions built on the reducer
//!
//! The library logs through the [`log`] facade and installs no logger.

mod cancel;
mod error;
mod pool;
mod utils;

pub mod reduce;
pub mod scalar;

pub use cancel::CancelToken;
pub use error::{Error, Result, TaskError};
pub use pool::WorkerPool;
pub use pool::builder::PoolBuilder;
pub use reduce::{Chunk, ChunkReducer, Pooled, Scoped, partition};
pub use scalar::ScalarOps;
