//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod ai;
pub mod analytics;
pub mod audit;
pub mod auth;
pub mod budgets;
pub mod export;
pub mod goals;
pub mod transactions;

// Re-export all handlers for use in router
pub use ai::*;
pub use analytics::*;
pub use audit::*;
pub use auth::*;
pub use budgets::*;
pub use export::*;
pub use goals::*;
pub use transactions::*;

/// Today's date in the server's local time zone
pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
