// passforge shared type definitions
// Each submodule defines types used across the application.

pub mod auth;
pub mod errors;
pub mod history;
pub mod notice;
pub mod password;
pub mod settings;
