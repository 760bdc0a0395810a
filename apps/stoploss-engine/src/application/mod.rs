//! Application layer.
//!
//! Port definitions for the external collaborators (brokerage, quote
//! providers). The engine core depends only on these traits.

pub mod ports;
