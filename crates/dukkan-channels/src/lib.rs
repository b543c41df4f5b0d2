//! # dukkan-channels
//!
//! External transports: the Facebook Messenger channel (webhook receiver
//! plus Graph API sender) and the order-recording webhook sink.

pub mod messenger;
pub mod orders;
