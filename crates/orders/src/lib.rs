//! Orders domain module.
//!
//! This crate models orders as the external order source delivers them and the
//! rule that links an order to a submitted design. Pure logic: no IO, no HTTP,
//! no storage.

pub mod order;

pub use order::{Customization, DESIGN_REFERENCE_LABEL, FulfillmentStatus, LineItem, Order};
