//! listing-watch - A Telegram bot watching classified-ad searches for new ads.
//!
//! This crate provides:
//! - Decomposition and paginated fetching of Bazaraki search result pages
//! - Per-subscriber bookkeeping of already shown ads
//! - A polling task notifying subscribers of fresh, unseen ads

pub mod bot;
pub mod config;
pub mod error;
pub mod listing;
pub mod logging;
pub mod model;
pub mod notifier;
pub mod repository;
pub mod service;
pub mod task;
pub mod telegram;
