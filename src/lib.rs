// Library exports for testing
pub mod config;
pub mod handlers;
pub mod models;
pub mod session;
