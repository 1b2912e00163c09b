//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod subscriptions;
pub mod transactions;

// Re-export all handlers for use in router
pub use subscriptions::*;
pub use transactions::*;
