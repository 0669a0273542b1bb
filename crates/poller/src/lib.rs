//! Design notification poller: wires the production adapters into the
//! reconciliation loop.

pub mod app;
