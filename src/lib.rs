//! io-tui is a full-screen terminal chat client for talking with AI personas.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns runtime state: the conversation engine, persona and
//!   provider selection, the SQLite-backed transcript store, and streaming
//!   orchestration.
//! - [`ui`] renders the terminal interface and runs the interactive event loop
//!   that drives user input and display updates.
//! - [`commands`] implements slash-command parsing and command execution used
//!   by the chat loop.
//! - [`api`] defines provider-neutral chat payloads and the Gemini client.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`], which
//! loads configuration, opens the store, and hands off to [`ui::chat_loop`].

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod ui;
pub mod utils;
