/// Database configuration and connection management
pub mod database;

/// Application configuration loading from config.toml
pub mod app;

/// WhatsApp gateway settings from environment variables
pub mod notifications;
