//! # dukkan-sessions
//!
//! In-memory per-customer conversation state: bounded turn history and the
//! mute latch, with per-customer locking.

mod store;

pub use store::{Session, SessionStore};
