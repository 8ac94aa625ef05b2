// watchlog services
// Services wrap the managers for asynchronous callers and carry configuration.

pub mod history_store;
pub mod resolver;
pub mod settings_engine;
