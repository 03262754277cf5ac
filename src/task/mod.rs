//! Background tasks for listing polling.

pub mod listing_poller;
