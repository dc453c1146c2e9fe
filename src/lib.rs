//! passforge: a password generator with a bounded, favorite-aware history
//! and optional sync of favorites to a Supabase-compatible backend.
//!
//! This library crate exposes all modules for use by the binaries and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
