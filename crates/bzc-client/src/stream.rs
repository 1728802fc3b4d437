use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, warn};

use bzc_proof::Proof;
use bzc_types::key_hex;

use crate::instance::Instance;
use crate::session::SessionInner;

/// Verified values of one key, newest last.
///
/// Ends (`next()` returns `None`) when the subscription is closed.
#[derive(Debug)]
pub struct StateStream {
    rx: watch::Receiver<Instance>,
    delivered_initial: bool,
}

impl StateStream {
    fn new(rx: watch::Receiver<Instance>) -> Self {
        Self {
            rx,
            delivered_initial: false,
        }
    }

    /// The current value on first call, then each strictly newer version.
    pub async fn next(&mut self) -> Option<Instance> {
        if !self.delivered_initial {
            self.delivered_initial = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Newest known value, without waiting.
    pub fn latest(&self) -> Instance {
        self.rx.borrow().clone()
    }
}

struct Topic {
    id: u64,
    sender: watch::Sender<Instance>,
}

/// Topics keyed by instance key, one poller each.
pub(crate) struct SubscriptionRegistry {
    shutdown_tx: watch::Sender<bool>,
    topics: Mutex<HashMap<Vec<u8>, Topic>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub(crate) fn new() -> Self {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx,
            topics: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Vec<u8>, Topic>> {
        self.topics.lock().expect("subscription registry mutex poisoned")
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// A stream on the existing topic for `key`, if any.
    pub(crate) fn join(&self, key: &[u8]) -> Option<StateStream> {
        self.lock()
            .get(key)
            .map(|topic| StateStream::new(topic.sender.subscribe()))
    }

    /// Stream on the topic for `key`, creating it from `initial` if needed.
    /// Returns the new topic's id when one was created.
    pub(crate) fn register(&self, key: &[u8], initial: Instance) -> (StateStream, Option<u64>) {
        let mut topics = self.lock();
        if let Some(topic) = topics.get(key) {
            offer(&topic.sender, initial);
            return (StateStream::new(topic.sender.subscribe()), None);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, rx) = watch::channel(initial);
        topics.insert(key.to_vec(), Topic { id, sender });
        (StateStream::new(rx), Some(id))
    }

    /// Offer a freshly verified proof to the topic tracking `key`.
    pub(crate) fn publish(&self, key: &[u8], proof: &Arc<Proof>) {
        let topics = self.lock();
        let Some(topic) = topics.get(key) else {
            return;
        };
        match Instance::from_proof(Arc::clone(proof)) {
            Ok(instance) => {
                let version = instance.version;
                if offer(&topic.sender, instance) {
                    debug!(key = %key_hex(key), version, "new state published");
                }
            }
            Err(e) => debug!(key = %key_hex(key), error = %e, "proof not publishable"),
        }
    }

    /// Whether topic `id` is still registered and watched. Drops it once
    /// every stream is gone.
    fn still_wanted(&self, key: &[u8], id: u64) -> bool {
        let mut topics = self.lock();
        match topics.get(key) {
            Some(topic) if topic.id == id => {
                if topic.sender.receiver_count() == 0 {
                    topics.remove(key);
                    false
                } else {
                    true
                }
            }
            _ => false,
        }
    }

    pub(crate) fn remove(&self, key: &[u8]) -> bool {
        self.lock().remove(key).is_some()
    }

    pub(crate) fn close(&self) {
        self.shutdown_tx.send_replace(true);
        let dropped = {
            let mut topics = self.lock();
            let n = topics.len();
            topics.clear();
            n
        };
        if dropped > 0 {
            debug!(topics = dropped, "subscriptions closed");
        }
    }

    fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        self.close();
    }
}

/// Replace the value only with a strictly newer version.
fn offer(sender: &watch::Sender<Instance>, instance: Instance) -> bool {
    sender.send_if_modified(|current| {
        if instance.version > current.version {
            *current = instance;
            true
        } else {
            false
        }
    })
}

/// Poll `key` once per poll period until its topic goes away or the
/// session closes. A fetch already running is allowed to finish.
pub(crate) fn spawn_poller(session: &Arc<SessionInner>, key: Vec<u8>, topic_id: u64) {
    let weak = Arc::downgrade(session);
    let mut shutdown = session.subscriptions.shutdown_signal();
    tokio::spawn(async move {
        loop {
            if *shutdown.borrow() {
                break;
            }
            let period = match weak.upgrade() {
                Some(session) => session.poll_period(),
                None => break,
            };
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = tokio::time::sleep(period) => {}
            }

            let Some(session) = weak.upgrade() else {
                break;
            };
            if !session.subscriptions.still_wanted(&key, topic_id) {
                break;
            }
            if let Err(e) = session.get_proof(&key).await {
                warn!(key = %key_hex(&key), error = %e, "poll failed; skipping tick");
            }
        }
        debug!(key = %key_hex(&key), "poller stopped");
    });
}
