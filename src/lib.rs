//! Port-call and foreign-trade analytics.
//!
//! Loads a terminal's vessel-operations table and an optional trade table,
//! derives wait times, delays and monthly aggregates, and renders them as
//! delimited tables and terminal previews.

pub mod aggregate;
pub mod cache;
pub mod census;
pub mod config;
pub mod dataset;
pub mod derive;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod reports;
pub mod sheet;
pub mod temporal;
pub mod types;
pub mod util;

pub use error::{Error, Result};
