//! Shared configuration, error and message types for the tenancy services.

pub mod config;
pub mod error;
pub mod types;
