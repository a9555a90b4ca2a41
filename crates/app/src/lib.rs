//! Storefront application layer: configuration, services and demo data.

pub mod config;
pub mod seed;
pub mod services;

pub use config::{AppConfig, ConfigError};
pub use services::{InMemoryShop, ServiceError, Shop};
