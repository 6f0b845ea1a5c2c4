use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use log::trace;

use crate::protocol::ConfirmNotifier;

/// A running pending-confirmation timer.
///
/// Unless cancelled first, posts a confirmation with its generation through the notifier once the
/// delay elapses. Dropping the handle cancels the timer.
#[derive(Debug)]
pub(crate) struct PendingConfirmation {
    generation: u32,
    // Dropping the sender wakes the timer thread up with a disconnect.
    _cancel: Sender<()>,
}

impl PendingConfirmation {
    pub fn start<N: ConfirmNotifier>(notifier: N, generation: u32, delay: Duration) -> Self {
        let (tx, rx) = channel();

        thread::spawn(move || match rx.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => {
                trace!("Confirmation timer {} expired", generation);
                notifier.confirm(generation);
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                trace!("Confirmation timer {} cancelled", generation);
            }
        });

        Self {
            generation,
            _cancel: tx,
        }
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}
