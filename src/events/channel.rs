//! Event channel built on crossbeam-channel.
//!
//! Lets the scanner report progress to whatever is watching it (the CLI
//! spinner, a test) without knowing who that is.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{Event, ScanEvent};

/// Sending half, held by the scanner
///
/// Cloneable and `Send`, so a scan can run on a different thread from the
/// one drawing progress.
#[derive(Clone, Debug)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send an event
    ///
    /// A dropped receiver is not an error: the event is discarded.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }

    pub fn scan(&self, event: ScanEvent) {
        self.send(Event::Scan(event));
    }
}

/// Receiving half, held by the UI
#[derive(Debug)]
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event, or `None` once every sender is gone
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Iterate until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Factory for sender/receiver pairs
pub struct EventChannel;

impl EventChannel {
    /// Unbounded channel. Scan events are small, so this is the usual choice.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ScanProgress;
    use std::thread;

    fn started() -> ScanEvent {
        ScanEvent::Started {
            pattern: "*".to_string(),
            count: 100,
        }
    }

    #[test]
    fn events_can_be_sent_across_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.scan(ScanEvent::BatchFetched(ScanProgress {
                batches: 5,
                keys_scanned: 400,
                batch_len: 100,
                findings: 3,
                cursor: 1536,
            }));
        });

        handle.join().unwrap();

        let event = receiver.recv().unwrap();
        match event {
            Event::Scan(ScanEvent::BatchFetched(p)) => {
                assert_eq!(p.findings, 3);
                assert_eq!(p.cursor, 1536);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn send_after_receiver_drops_is_discarded() {
        let (sender, receiver) = EventChannel::new();
        drop(receiver);
        sender.scan(started());
    }

    #[test]
    fn receiver_ends_when_senders_drop() {
        let (sender, receiver) = EventChannel::new();
        let clone = sender.clone();
        sender.scan(started());
        clone.scan(started());
        drop(sender);
        drop(clone);

        assert_eq!(receiver.iter().count(), 2);
        assert!(receiver.recv().is_none());
    }
}
