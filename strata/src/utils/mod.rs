//! Small internal data structures.
//!
//! Exposes a [`Slab`] used to keep track of the wake-up listeners
//! registered on a [`CancelToken`](crate::CancelToken).

mod slab;

pub(crate) use slab::Slab;
