//! Designs domain module.
//!
//! A design is the image artifact a customer submits before ordering. This
//! crate holds the stored record and the decoding of its data-URL payload.

pub mod design;

pub use design::{Design, DesignImage};
