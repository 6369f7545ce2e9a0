//! Meal tracking and nutrition adherence.
//!
//! Meal records move through a small status machine as the user reports what
//! they ate. Each day's records roll up into a [`summaries::DailySummary`]
//! with adherence scores, and summaries roll up into weekly, monthly and
//! trend reports. [`service::TrackingService`] is the entry point; the HTTP
//! routes in [`app`] are a thin layer over it.

pub mod app;
pub mod config;
pub mod error;
pub mod meals;
pub mod nutrition;
pub mod service;
pub mod state;
pub mod store;
pub mod summaries;

pub use error::TrackingError;
pub use service::TrackingService;
