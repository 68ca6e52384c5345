//! Locking primitives used by the driver.
//!
//! The mutex primitive itself is an external contract per the driver's
//! design (the host environment's scheduler decides what "blocking" means);
//! this module just re-exports `spin::Mutex` under the crate's own name, the
//! way the pack's kernel wraps `spin::Mutex` in its own `sync` module rather
//! than naming `spin` directly at every call site.

pub use spin::{Mutex, MutexGuard};
