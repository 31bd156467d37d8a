//! Sliding-window request budgets for copilot calls.
//!
//! Budgets are counted per `{category}:{company}:{subject}` key in the
//! `copilot_rate_limits` table and enforced before any AI service call.

mod config;
mod ports;
mod service;

pub use config::{CopilotRateLimits, RateLimitRule};
pub use ports::{AttemptInfo, RateLimitRepository};
pub use service::RateLimitService;
