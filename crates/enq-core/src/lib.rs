//! Core enq library (config, session, API client, auth flow, enquiries).

pub mod api;
pub mod auth;
pub mod config;
pub mod enquiries;
pub mod session;
