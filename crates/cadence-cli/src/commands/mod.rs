//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, detect, summary) and shared utilities (open_db, load_config)
//! - `import` - Transaction import from CSV or JSON
//! - `serve` - Web server command
//! - `subscriptions` - Subscription management commands

pub mod core;
pub mod import;
pub mod serve;
pub mod subscriptions;

// Re-export command functions for main.rs
pub use core::*;
pub use import::*;
pub use serve::*;
pub use subscriptions::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
