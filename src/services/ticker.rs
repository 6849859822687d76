use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Repeating timer running on its own thread.
///
/// Ticks queue up on a channel that the UI loop drains with [`Ticker::poll`].
/// Dropping the ticker cancels it.
pub struct Ticker {
    ticks: Receiver<()>,
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn(interval: Duration) -> Self {
        let (tick_tx, tick_rx) = mpsc::channel();
        let (cancel_tx, cancel_rx): (Sender<()>, Receiver<()>) = mpsc::channel();

        let handle = thread::spawn(move || loop {
            match cancel_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if tick_tx.send(()).is_err() {
                        break;
                    }
                }
                // Explicit cancel or the owner went away
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        Self {
            ticks: tick_rx,
            cancel: Some(cancel_tx),
            handle: Some(handle),
        }
    }

    /// Drain pending ticks. Returns true if at least one fired.
    pub fn poll(&self) -> bool {
        let mut fired = false;
        while self.ticks.try_recv().is_ok() {
            fired = true;
        }
        fired
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_ticker_fires() {
        let ticker = Ticker::spawn(Duration::from_millis(10));
        let deadline = Instant::now() + Duration::from_secs(5);
        while !ticker.poll() {
            assert!(Instant::now() < deadline, "ticker never fired");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_ticker_stops_after_cancel() {
        let mut ticker = Ticker::spawn(Duration::from_millis(5));
        ticker.cancel();
        assert!(ticker.handle.is_none());

        // Drain anything sent before the cancel landed, then expect silence
        ticker.poll();
        thread::sleep(Duration::from_millis(30));
        assert!(!ticker.poll());
    }

    #[test]
    fn test_cancel_is_prompt_with_long_interval() {
        let start = Instant::now();
        let mut ticker = Ticker::spawn(Duration::from_secs(3600));
        ticker.cancel();
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
