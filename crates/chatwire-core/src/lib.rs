//! Core types, config, errors, and external-service facades for Chatwire.

pub mod config;
pub mod error;
pub mod event;
pub mod protocol;
pub mod provider;
pub mod store;
