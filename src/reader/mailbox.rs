//! One-shot mailbox registry shared between the reader thread and consumers.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::time::Duration;

use crate::capture::{CaptureError, SharedFrame};

/// Outcome of one capture iteration as seen by a waiting consumer.
pub type Delivery = Result<SharedFrame, CaptureError>;

/// Sending half of a single-use, capacity-one mailbox.
pub type Mailbox = Sender<Delivery>;

/// Identifies a registered mailbox so it can be withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

#[derive(Default)]
struct Registry {
    closed: bool,
    next_ticket: u64,
    pending: Vec<(Ticket, Mailbox)>,
}

/// Mailbox registry plus the reader's running state.
///
/// The running flag lives under the same lock as the pending list so a
/// consumer can never register after the reader has drained for the last
/// time.
#[derive(Default)]
pub(crate) struct Mailboxes {
    registry: Mutex<Registry>,
}

impl Mailboxes {
    pub(crate) fn is_open(&self) -> bool {
        !self.registry.lock().closed
    }

    /// Registers a mailbox for the next capture iteration.
    pub(crate) fn register(&self, mailbox: Mailbox) -> Result<Ticket, CaptureError> {
        let mut registry = self.registry.lock();
        if registry.closed {
            return Err(CaptureError::Stopped);
        }
        let ticket = Ticket(registry.next_ticket);
        registry.next_ticket += 1;
        registry.pending.push((ticket, mailbox));
        Ok(ticket)
    }

    /// Withdraws a mailbox. Returns false if it was already taken for delivery.
    pub(crate) fn withdraw(&self, ticket: Ticket) -> bool {
        let mut registry = self.registry.lock();
        let before = registry.pending.len();
        registry.pending.retain(|(t, _)| *t != ticket);
        registry.pending.len() != before
    }

    /// Takes every mailbox registered so far, leaving the registry empty.
    pub(crate) fn take_pending(&self) -> Vec<(Ticket, Mailbox)> {
        std::mem::take(&mut self.registry.lock().pending)
    }

    pub(crate) fn pending(&self) -> usize {
        self.registry.lock().pending.len()
    }

    /// Closes the registry and drops every pending mailbox, waking their
    /// consumers with `Stopped`. Returns how many were pending.
    pub(crate) fn close(&self) -> usize {
        let mut registry = self.registry.lock();
        registry.closed = true;
        let dropped = registry.pending.len();
        registry.pending.clear();
        dropped
    }

    /// Registers a fresh mailbox and waits for its delivery.
    ///
    /// With `timeout == None` this blocks until a frame arrives or the reader
    /// stops. On timeout the mailbox is withdrawn before returning.
    pub(crate) fn get_frame(&self, timeout: Option<Duration>) -> Delivery {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let ticket = self.register(tx)?;

        let Some(timeout) = timeout else {
            return rx.recv().unwrap_or(Err(CaptureError::Stopped));
        };

        match rx.recv_timeout(timeout) {
            Ok(delivery) => delivery,
            Err(RecvTimeoutError::Disconnected) => Err(CaptureError::Stopped),
            Err(RecvTimeoutError::Timeout) => self.expire(ticket, &rx, timeout),
        }
    }

    fn expire(&self, ticket: Ticket, rx: &Receiver<Delivery>, timeout: Duration) -> Delivery {
        if self.withdraw(ticket) {
            return Err(CaptureError::Timeout(timeout));
        }
        // The reader already holds this mailbox and is mid-delivery, or
        // `close` dropped it. Either way the sender goes away shortly.
        match rx.recv() {
            Ok(delivery) => delivery,
            Err(_) if !self.is_open() => Err(CaptureError::Stopped),
            Err(_) => Err(CaptureError::Timeout(timeout)),
        }
    }
}
