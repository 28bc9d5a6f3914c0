//! Background frame reader with one-shot mailbox delivery.
//!
//! A [`FrameReader`] owns a [`FrameSource`] on a dedicated thread. Each
//! capture iteration performs exactly one blocking read and hands the
//! result to every mailbox registered before the iteration's drain. All
//! of them receive the same [`SharedFrame`].
//!
//! Cancellation is cooperative: [`FrameReader::stop`] is observed at the
//! top of the next iteration and does not interrupt a read in flight.

mod mailbox;

pub use mailbox::{Delivery, Mailbox, Ticket};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::capture::{CaptureError, FrameSource, SharedFrame};
use mailbox::Mailboxes;

/// Reader behaviour on failing sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Consecutive failed reads after which the reader stops itself.
    /// Zero keeps reading forever.
    pub max_consecutive_failures: u32,
    /// Pause after a failed read, in milliseconds.
    pub failure_backoff_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 30,
            failure_backoff_ms: 10,
        }
    }
}

/// Cloneable handle for requesting frames from a running reader.
#[derive(Clone)]
pub struct FrameRequester {
    mailboxes: Arc<Mailboxes>,
}

impl FrameRequester {
    /// Waits for the next captured frame.
    ///
    /// `None` waits until a frame arrives or the reader stops.
    pub fn get_frame(&self, timeout: Option<Duration>) -> Result<SharedFrame, CaptureError> {
        self.mailboxes.get_frame(timeout)
    }

    /// Number of mailboxes waiting for the next iteration.
    pub fn pending(&self) -> usize {
        self.mailboxes.pending()
    }

    /// Checks whether the reader still accepts requests.
    pub fn is_running(&self) -> bool {
        self.mailboxes.is_open()
    }
}

/// Continuously drains a frame source on a background thread.
pub struct FrameReader {
    name: String,
    mailboxes: Arc<Mailboxes>,
    handle: Option<JoinHandle<()>>,
}

impl FrameReader {
    /// Starts the reader thread. The source is released when the thread exits.
    pub fn spawn(
        name: &str,
        source: Box<dyn FrameSource>,
        config: ReaderConfig,
    ) -> Result<Self, CaptureError> {
        let mailboxes = Arc::new(Mailboxes::default());
        let thread_mailboxes = Arc::clone(&mailboxes);
        let thread_name = name.to_string();

        let handle = std::thread::Builder::new()
            .name(format!("frame-reader-{name}"))
            .spawn(move || run(&thread_name, source, &thread_mailboxes, &config))
            .map_err(CaptureError::Spawn)?;

        tracing::debug!(reader = name, "Frame reader started");

        Ok(Self {
            name: name.to_string(),
            mailboxes,
            handle: Some(handle),
        })
    }

    /// Registers a one-shot mailbox for the next capture iteration.
    pub fn add_queue(&self, mailbox: Mailbox) -> Result<Ticket, CaptureError> {
        self.mailboxes.register(mailbox)
    }

    /// Waits up to `timeout` for the next captured frame.
    pub fn get_frame(&self, timeout: Option<Duration>) -> Result<SharedFrame, CaptureError> {
        self.mailboxes.get_frame(timeout)
    }

    /// Returns a handle other threads can request frames through.
    pub fn requester(&self) -> FrameRequester {
        FrameRequester {
            mailboxes: Arc::clone(&self.mailboxes),
        }
    }

    /// Number of mailboxes waiting for the next iteration.
    pub fn pending(&self) -> usize {
        self.mailboxes.pending()
    }

    /// Checks whether the reader still accepts requests.
    pub fn is_running(&self) -> bool {
        self.mailboxes.is_open()
    }

    /// Asks the reader to stop after the read in flight.
    ///
    /// Waiting consumers return [`CaptureError::Stopped`] immediately, as
    /// does every later request.
    pub fn stop(&self) {
        let dropped = self.mailboxes.close();
        tracing::debug!(reader = %self.name, dropped, "Frame reader stop requested");
    }

    /// Stops the reader and waits for its thread to release the source.
    pub fn join(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(reader = %self.name, "Frame reader thread panicked");
            }
        }
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        // Detach: the thread exits on its own after the read in flight.
        if self.handle.is_some() {
            self.stop();
        }
    }
}

fn run(name: &str, mut source: Box<dyn FrameSource>, mailboxes: &Mailboxes, config: &ReaderConfig) {
    let mut consecutive_failures = 0u32;

    while mailboxes.is_open() {
        let delivery: Delivery = source.read().map(Arc::new);

        match &delivery {
            Ok(_) => consecutive_failures = 0,
            Err(e) => {
                consecutive_failures += 1;
                tracing::warn!(
                    reader = name,
                    error = %e,
                    consecutive_failures,
                    "Frame read failed"
                );
            }
        }

        let batch = mailboxes.take_pending();
        if !batch.is_empty() {
            tracing::trace!(reader = name, consumers = batch.len(), "Delivering frame");
        }
        for (_, mailbox) in batch {
            // A consumer that gave up has dropped its receiver.
            let _ = mailbox.try_send(duplicate(&delivery));
        }

        if consecutive_failures > 0 {
            if config.max_consecutive_failures != 0
                && consecutive_failures >= config.max_consecutive_failures
            {
                tracing::error!(
                    reader = name,
                    consecutive_failures,
                    "Frame source keeps failing, stopping reader"
                );
                mailboxes.close();
                break;
            }
            std::thread::sleep(Duration::from_millis(config.failure_backoff_ms));
        }
    }

    source.release();
    tracing::debug!(reader = name, "Frame reader exited, source released");
}

fn duplicate(delivery: &Delivery) -> Delivery {
    match delivery {
        Ok(frame) => Ok(Arc::clone(frame)),
        Err(e) => Err(e.duplicate()),
    }
}
