//! Buffer pool: fixed-size slot arena with exclusive-ownership handles
//!
//! The pool is the admission-control half of the regulator: once every slot
//! is outstanding, producers are refused until a buffer is released.

pub(crate) mod arena;
pub mod buffer;

pub(crate) use arena::SlotArena;
pub use buffer::MessageBuffer;
