//! Terminal UI layer for interactive chat sessions.
//!
//! The UI module owns rendering and loop control for the text user
//! interface.
//!
//! Key submodules include:
//! - [`chat_loop`]: the main interaction loop that dispatches user input to
//!   [`crate::commands`] and coordinates streaming via [`crate::core::chat_stream`].
//! - [`renderer`] and [`transcript`]: view composition and frame output.
//! - [`theme`]: palette-derived styles.
//!
//! Ownership boundary: this layer presents and captures interaction state, while
//! [`crate::core`] owns domain logic and backend coordination.

pub mod chat_loop;
pub mod renderer;
pub mod theme;
pub mod transcript;
