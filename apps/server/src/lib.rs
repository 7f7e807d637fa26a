//! Vngate server: authenticated HTTP gateway for Vietnamese market data.
//!
//! Brokers company facts, financial statements and trading data from
//! interchangeable upstream sources (VCI, TCBS, MSN) behind token-based
//! identity, returning JSON or CSV.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod main_lib;
pub mod models;
pub mod users;

pub use main_lib::{build_state, init_tracing, AppState};
