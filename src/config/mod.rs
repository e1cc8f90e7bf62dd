//! Configuration module

mod server;

pub use server::ServerConfig;
