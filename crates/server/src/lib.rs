//! Racconto server library.
//!
//! Exposes the server's modules so the integration tests can assemble the
//! real router. Running the server goes through the `racconto` binary.

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
pub mod theme;
