//! unified-inbox - One unread feed across Gmail and Outlook
//!
//! This crate provides the provider clients, OAuth flows, and the
//! aggregation service that merges unread mail from both accounts.

pub mod config;
pub mod domain;
pub mod providers;
pub mod services;
pub mod storage;
