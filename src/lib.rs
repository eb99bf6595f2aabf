pub mod args;
pub mod artifacts;
pub mod file_serving;
pub mod http;
pub mod logging;
pub mod server;
