pub mod config;
pub mod error;
pub mod provider;
pub mod routes;
pub mod sink;
pub mod state;
pub mod tracking;
pub mod types;
