pub mod app;
pub mod builtin_providers;
pub mod chat_stream;
pub mod config;
pub mod keyring;
pub mod message;
pub mod persona;
pub mod provider;
pub mod providers;
pub mod store;
pub mod tools;
