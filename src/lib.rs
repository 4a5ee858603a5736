// Library exports for the pretrained snake
// The HTTP binary and the integration tests share the decision pipeline through here

pub mod bot;
pub mod config;
pub mod debug_logger;
pub mod engine;
pub mod error;
pub mod grid;
pub mod oracle;
pub mod safety;
pub mod types;
