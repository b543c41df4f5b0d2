//! # dukkan-core
//!
//! Core types, traits, configuration, and error handling for the Dukkan
//! sales agent.

pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod traits;
