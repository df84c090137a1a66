//! Polls campaign mailboxes for customer replies and stores the new text of each.

pub mod auth;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod mail;
pub mod store;
