// passforge state managers
// Managers own in-memory state: history, the generation log, debounced regeneration, sync.

pub mod generation_log;
pub mod generation_scheduler;
pub mod history_manager;
pub mod sync_manager;
