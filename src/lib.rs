//! LilySEO backend
//!
//! HTTP API for the LilySEO SaaS: project/audit management, competitor
//! analysis, todo tracking, team collaboration, PayPal billing, white-label
//! report composition, and AI-assisted recommendations. Crawling and analysis
//! are delegated to the external crawler service; this layer owns the
//! request/response contracts and tier enforcement.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod services;
