//! Order list console: filter store, debounced search, cancellable fetch
//! orchestration, selection eligibility and batch actions over an order
//! REST backend.

pub mod actors;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod models;
pub mod service;
pub mod utils;
