//! Trait definitions for the collaborators a cover talks to.
//!
//! The only outbound seam is the transmitter: [`CommandSink`] dispatches a
//! named code, addressed by device key and command key, and resolves once
//! the dispatch is confirmed.
//!
//! Implementations live in [`crate::hal`].

pub mod transmitter;

pub use transmitter::*;
