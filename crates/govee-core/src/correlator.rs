//! Matching inbound replies to outstanding requests.
//!
//! The device answers strictly in request order but never echoes a request
//! id, and it may drop replies or push unsolicited ones. Outstanding requests
//! are therefore kept as a FIFO of [`RegisterKey`]s plus, per key, the list of
//! callers waiting for it. When a reply arrives every older request still in
//! the queue is known to be lost and is rejected with
//! [`Error::Superseded`].

use std::collections::{HashMap, VecDeque};

use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::{info, warn};

use govee_types::RegisterKey;

use crate::error::{Error, Result};

/// Receiving half handed to a caller by [`Correlator::submit`].
pub type Waiter = oneshot::Receiver<Result<Bytes>>;

type Resolver = oneshot::Sender<Result<Bytes>>;

/// What [`Correlator::on_frame`] did with a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The reply resolved `waiters` callers after rejecting the `superseded`
    /// requests queued before it.
    Delivered {
        waiters: usize,
        superseded: Vec<RegisterKey>,
    },
    /// Nobody was waiting for this key.
    Unsolicited,
    /// Callers were waiting but the key was no longer queued; they were dropped.
    Unmatched { superseded: Vec<RegisterKey> },
}

impl Delivery {
    /// Requests rejected while handling the reply.
    #[must_use]
    pub fn superseded(&self) -> &[RegisterKey] {
        match self {
            Delivery::Delivered { superseded, .. } | Delivery::Unmatched { superseded } => {
                superseded
            }
            Delivery::Unsolicited => &[],
        }
    }
}

/// FIFO of outstanding requests and the callers waiting on them.
///
/// Not synchronized; the session keeps it behind its state mutex.
#[derive(Debug, Default)]
pub struct Correlator {
    pending: VecDeque<RegisterKey>,
    waiters: HashMap<RegisterKey, Vec<Resolver>>,
}

impl Correlator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request for `key` and return the waiter for its reply.
    ///
    /// Must be called before the request is written, since the reply can
    /// arrive before the write call returns.
    pub fn submit(&mut self, key: RegisterKey) -> Waiter {
        let (tx, rx) = oneshot::channel();
        self.pending.push_back(key);
        self.waiters.entry(key).or_default().push(tx);
        rx
    }

    /// Route a reply for `key` carrying `value`.
    pub fn on_frame(&mut self, key: RegisterKey, value: &Bytes) -> Delivery {
        let Some(resolvers) = self.waiters.remove(&key) else {
            info!("Response with no listeners: {}", key);
            return Delivery::Unsolicited;
        };

        let mut superseded = Vec::new();
        let mut matched = false;
        while let Some(next) = self.pending.pop_front() {
            if next == key {
                matched = true;
                break;
            }
            if let Some(rejected) = self.waiters.remove(&next) {
                info!("Request {} superseded by reply to {}", next, key);
                for waiter in rejected {
                    let _ = waiter.send(Err(Error::Superseded { key: next }));
                }
                superseded.push(next);
            }
        }

        if !matched {
            warn!("Unexpected response: {} {}", key, hex::encode(value));
            return Delivery::Unmatched { superseded };
        }

        let waiters = resolvers.len();
        for waiter in resolvers {
            // The caller may have given up; that is not an error here.
            let _ = waiter.send(Ok(value.clone()));
        }
        Delivery::Delivered {
            waiters,
            superseded,
        }
    }

    /// Reject every outstanding request with [`Error::NotConnected`].
    ///
    /// Returns the number of callers rejected.
    pub fn cancel_all(&mut self) -> usize {
        self.pending.clear();
        let mut count = 0;
        for (_, resolvers) in self.waiters.drain() {
            for waiter in resolvers {
                let _ = waiter.send(Err(Error::NotConnected));
                count += 1;
            }
        }
        count
    }

    /// Number of queued request keys.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether any caller is waiting on `key`.
    #[must_use]
    pub fn is_waiting(&self, key: &RegisterKey) -> bool {
        self.waiters.get(key).is_some_and(|w| !w.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use govee_types::{MULTI_ACK, Register};

    fn power() -> RegisterKey {
        RegisterKey::read(Register::POWER)
    }

    fn dimmer() -> RegisterKey {
        RegisterKey::read(Register::DIMMER)
    }

    #[tokio::test]
    async fn test_single_request_resolves() {
        let mut correlator = Correlator::new();
        let waiter = correlator.submit(power());

        let delivery = correlator.on_frame(power(), &Bytes::from_static(&[0x01]));
        assert_eq!(
            delivery,
            Delivery::Delivered {
                waiters: 1,
                superseded: vec![]
            }
        );
        assert_eq!(&waiter.await.unwrap().unwrap()[..], &[0x01]);
        assert_eq!(correlator.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_later_reply_supersedes_earlier_request() {
        let mut correlator = Correlator::new();
        let a = correlator.submit(power());
        let b = correlator.submit(dimmer());

        let delivery = correlator.on_frame(dimmer(), &Bytes::from_static(&[0x25]));
        assert_eq!(delivery.superseded(), &[power()]);

        assert!(matches!(
            a.await.unwrap(),
            Err(Error::Superseded { key }) if key == power()
        ));
        assert_eq!(&b.await.unwrap().unwrap()[..], &[0x25]);
        assert_eq!(correlator.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_all_waiters_of_key_resolve_together() {
        let mut correlator = Correlator::new();
        let first = correlator.submit(power());
        let second = correlator.submit(power());

        let delivery = correlator.on_frame(power(), &Bytes::new());
        assert!(matches!(delivery, Delivery::Delivered { waiters: 2, .. }));
        assert!(first.await.unwrap().unwrap().is_empty());
        assert!(second.await.unwrap().unwrap().is_empty());

        // The duplicate queue entry is skipped silently later on.
        let third = correlator.submit(dimmer());
        let delivery = correlator.on_frame(dimmer(), &Bytes::from_static(&[0x10]));
        assert!(delivery.superseded().is_empty());
        assert_eq!(&third.await.unwrap().unwrap()[..], &[0x10]);
    }

    #[test]
    fn test_unsolicited_reply() {
        let mut correlator = Correlator::new();
        let _waiter = correlator.submit(power());

        let delivery = correlator.on_frame(dimmer(), &Bytes::from_static(&[0x25]));
        assert_eq!(delivery, Delivery::Unsolicited);
        // Queue untouched.
        assert_eq!(correlator.pending_len(), 1);
        assert!(correlator.is_waiting(&power()));
    }

    #[tokio::test]
    async fn test_multi_ack_key() {
        let mut correlator = Correlator::new();
        let waiter = correlator.submit(MULTI_ACK);
        correlator.on_frame(MULTI_ACK, &Bytes::new());
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_cancel_all_rejects_with_not_connected() {
        let mut correlator = Correlator::new();
        let a = correlator.submit(power());
        let b = correlator.submit(dimmer());

        assert_eq!(correlator.cancel_all(), 2);
        assert!(matches!(a.await.unwrap(), Err(Error::NotConnected)));
        assert!(matches!(b.await.unwrap(), Err(Error::NotConnected)));
        assert_eq!(correlator.pending_len(), 0);
    }

    #[test]
    fn test_dropped_waiter_does_not_break_delivery() {
        let mut correlator = Correlator::new();
        drop(correlator.submit(power()));
        let delivery = correlator.on_frame(power(), &Bytes::from_static(&[0x01]));
        assert!(matches!(delivery, Delivery::Delivered { waiters: 1, .. }));
    }
}
