// watchlog state managers
// Managers run synchronous operations directly against a borrowed connection.

pub mod history_manager;
