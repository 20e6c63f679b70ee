//! Incremental display projection for grouped browsing tabs.
//!
//! The crate keeps an ordered "one item per group" list in sync with a
//! mutable tab collection and its group membership, and classifies drag
//! gestures into merge / ungroup / reorder mutations.

pub mod actor;
pub mod common;
pub mod model;
pub mod projection;
