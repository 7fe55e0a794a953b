//! # Sign feed
//!
//! Bounded channel carrying sign classifier results to the control loop. The classifier may run
//! on its own thread at its own rate, the control loop takes at most one vector per frame and
//! falls back to "no signs" when nothing is waiting.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError, TrySendError};

use comms_if::sign::SignVector;
use log::trace;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of vectors the feed holds before new ones are dropped.
pub const SIGN_FEED_CAPACITY: usize = 5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Producer side of the feed, may be cloned and moved to other threads.
#[derive(Clone)]
pub struct SignPublisher {
    sender: SyncSender<SignVector>,
}

/// Consumer side of the feed, owned by the control loop.
pub struct SignFeed {
    receiver: Receiver<SignVector>,
    num_dropped: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of publishing a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishResult {
    Queued,

    /// The feed was full and the vector was dropped.
    Dropped,

    /// The control loop has gone away.
    Disconnected,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SignFeed {
    /// Create a new feed with the default capacity.
    pub fn new() -> (SignPublisher, SignFeed) {
        Self::with_capacity(SIGN_FEED_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (SignPublisher, SignFeed) {
        let (sender, receiver) = sync_channel(capacity);

        (
            SignPublisher { sender },
            SignFeed {
                receiver,
                num_dropped: 0,
            },
        )
    }

    /// Take the oldest waiting vector, or the all-zero vector if none is waiting.
    ///
    /// A disconnected publisher is treated the same as an empty feed.
    pub fn next(&mut self) -> SignVector {
        match self.receiver.try_recv() {
            Ok(signs) => signs,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                trace!("Sign feed empty, assuming no signs");
                SignVector::default()
            }
        }
    }

    /// Discard all waiting vectors, returning how many there were.
    pub fn drain(&mut self) -> usize {
        self.receiver.try_iter().count()
    }

    pub fn num_dropped(&self) -> u64 {
        self.num_dropped
    }

    /// Record drops reported by a publisher.
    pub fn note_dropped(&mut self, result: PublishResult) {
        if result == PublishResult::Dropped {
            self.num_dropped += 1;
        }
    }
}

impl SignPublisher {
    /// Publish a vector without blocking. If the feed is full the vector is dropped.
    pub fn publish(&self, signs: SignVector) -> PublishResult {
        match self.sender.try_send(signs) {
            Ok(()) => PublishResult::Queued,
            Err(TrySendError::Full(_)) => {
                trace!("Sign feed full, dropping {:?}", signs);
                PublishResult::Dropped
            }
            Err(TrySendError::Disconnected(_)) => PublishResult::Disconnected,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::sign::SignSlot;

    #[test]
    fn test_empty_feed() {
        let (_publisher, mut feed) = SignFeed::new();
        assert_eq!(feed.next(), SignVector::default());
    }

    #[test]
    fn test_fifo_order() {
        let (publisher, mut feed) = SignFeed::new();
        let stop = SignVector::with_active(&[SignSlot::Stop]);
        let left = SignVector::with_active(&[SignSlot::TurnLeft]);

        assert_eq!(publisher.publish(stop), PublishResult::Queued);
        assert_eq!(publisher.publish(left), PublishResult::Queued);

        assert_eq!(feed.next(), stop);
        assert_eq!(feed.next(), left);
        assert_eq!(feed.next(), SignVector::default());
    }

    #[test]
    fn test_full_feed_drops() {
        let (publisher, mut feed) = SignFeed::new();
        let stop = SignVector::with_active(&[SignSlot::Stop]);

        for _ in 0..SIGN_FEED_CAPACITY {
            assert_eq!(publisher.publish(stop), PublishResult::Queued);
        }

        let result = publisher.publish(SignVector::with_active(&[SignSlot::TurnRight]));
        assert_eq!(result, PublishResult::Dropped);
        feed.note_dropped(result);

        assert_eq!(feed.num_dropped(), 1);
        assert_eq!(feed.drain(), SIGN_FEED_CAPACITY);
    }

    #[test]
    fn test_publish_from_thread() {
        let (publisher, mut feed) = SignFeed::new();
        let left = SignVector::with_active(&[SignSlot::TurnLeft]);

        std::thread::spawn(move || publisher.publish(left))
            .join()
            .unwrap();

        assert_eq!(feed.next(), left);
    }

    #[test]
    fn test_disconnected() {
        let (publisher, mut feed) = SignFeed::new();
        drop(publisher);
        assert_eq!(feed.next(), SignVector::default());

        let (publisher, feed) = SignFeed::new();
        drop(feed);
        assert_eq!(
            publisher.publish(SignVector::default()),
            PublishResult::Disconnected
        );
    }
}
