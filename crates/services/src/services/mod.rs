pub mod access;
pub mod config;
