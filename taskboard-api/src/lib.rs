//! # Taskboard API Server Library
//!
//! HTTP surface for the multi-tenant task board: sessions, organizations,
//! users and tasks. Business rules live in `taskboard-shared`; this crate
//! maps them onto routes and status codes.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `notify`: Credential delivery for newly issued passwords
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod notify;
pub mod routes;
