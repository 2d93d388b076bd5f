pub mod config;
pub mod handshake;
