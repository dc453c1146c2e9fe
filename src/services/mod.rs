// passforge services
// Services provide core functionality: generation, local persistence, remote storage, auth, settings.

pub mod auth_service;
pub mod local_store;
pub mod password_generator;
pub mod preferences;
pub mod remote_store;
pub mod settings_engine;
