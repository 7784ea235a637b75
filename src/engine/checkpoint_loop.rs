//! Background checkpointing
//!
//! A dedicated thread that checkpoints the engine on a fixed interval
//! until told to stop.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use crate::error::Result;

use super::Engine;

/// Handle to the running checkpoint thread
///
/// Stops the thread on `shutdown()` or drop. A checkpoint already in
/// progress finishes first.
pub struct CheckpointLoop {
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CheckpointLoop {
    /// Spawn the loop for `engine`
    pub fn spawn(engine: Arc<Engine>, interval: Duration) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);
        let ticker = channel::tick(interval);

        let handle = thread::Builder::new()
            .name("emberkv-checkpoint".to_string())
            .spawn(move || run(engine, ticker, shutdown_rx))?;

        tracing::debug!("Checkpoint loop started (every {:?})", interval);

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Signal the loop and wait for it to exit
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Disconnecting the channel wakes the loop
        drop(self.shutdown_tx.take());

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Checkpoint loop panicked");
            }
        }
    }
}

impl Drop for CheckpointLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(engine: Arc<Engine>, ticker: Receiver<std::time::Instant>, shutdown: Receiver<()>) {
    loop {
        crossbeam::select! {
            recv(shutdown) -> _ => break,
            recv(ticker) -> _ => match engine.checkpoint_if_needed() {
                Ok(Some(version)) => tracing::debug!("Background checkpoint at version {}", version),
                Ok(None) => tracing::trace!("No changes since last checkpoint"),
                // Retried on the next tick
                Err(e) => tracing::error!("Background checkpoint failed: {}", e),
            },
        }
    }
    tracing::debug!("Checkpoint loop stopped");
}
