//! Main chat event loop and terminal lifecycle.
//!
//! [`run_chat`] bootstraps the session, takes over the terminal, and runs the
//! loop that feeds keyboard input and worker reports into the shared [`App`].

mod event_loop;
mod keybindings;
mod lifecycle;
mod setup;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::app::App;

pub use event_loop::run_chat;
pub use setup::{bootstrap_app, LaunchOptions};

/// Shared access to the [`App`] for the loop and its tasks.
#[derive(Clone)]
pub struct AppHandle {
    inner: Arc<Mutex<App>>,
}

impl AppHandle {
    pub fn new(inner: Arc<Mutex<App>>) -> Self {
        Self { inner }
    }

    pub async fn read<R>(&self, f: impl FnOnce(&App) -> R) -> R {
        let guard = self.inner.lock().await;
        f(&guard)
    }

    pub async fn update<R>(&self, f: impl FnOnce(&mut App) -> R) -> R {
        let mut guard = self.inner.lock().await;
        f(&mut guard)
    }
}
