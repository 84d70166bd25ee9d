pub mod host;
pub mod server;
