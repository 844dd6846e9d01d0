use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use folio_types::events::Topic;

/// Fans out "this topic changed" notifications to live subscriptions.
///
/// Notifications carry no data: each subscriber reloads the full result
/// set for its topic, so a lagged receiver only needs one reload.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    changes_tx: broadcast::Sender<Topic>,

    /// Live subscriptions per topic
    watchers: Mutex<HashMap<Topic, usize>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (changes_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                changes_tx,
                watchers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Announce that the result set of `topic` changed.
    pub fn notify(&self, topic: Topic) {
        debug!("Topic changed: {}", topic.path());
        let _ = self.inner.changes_tx.send(topic);
    }

    pub fn notify_all(&self, topics: impl IntoIterator<Item = Topic>) {
        for topic in topics {
            self.notify(topic);
        }
    }

    /// Start watching a topic. The returned handle deregisters itself when
    /// dropped.
    pub fn watch(&self, topic: Topic) -> Subscription {
        let rx = self.inner.changes_tx.subscribe();
        *self.lock_watchers().entry(topic).or_insert(0) += 1;
        Subscription {
            topic,
            rx,
            dispatcher: self.clone(),
        }
    }

    /// Number of live subscriptions on `topic`.
    pub fn watcher_count(&self, topic: &Topic) -> usize {
        self.lock_watchers().get(topic).copied().unwrap_or(0)
    }

    fn unwatch(&self, topic: &Topic) {
        let mut watchers = self.lock_watchers();
        if let Some(count) = watchers.get_mut(topic) {
            *count -= 1;
            if *count == 0 {
                watchers.remove(topic);
            }
        }
    }

    fn lock_watchers(&self) -> std::sync::MutexGuard<'_, HashMap<Topic, usize>> {
        // The map holds plain counters; a poisoned guard is still consistent.
        self.inner
            .watchers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// A cancellable live subscription to one topic.
pub struct Subscription {
    topic: Topic,
    rx: broadcast::Receiver<Topic>,
    dispatcher: Dispatcher,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Wait for the next change to this topic. Returns false once the
    /// dispatcher is gone.
    pub async fn changed(&mut self) -> bool {
        loop {
            match self.rx.recv().await {
                Ok(topic) if topic == self.topic => return true,
                Ok(_) => continue,
                Err(RecvError::Lagged(n)) => {
                    warn!("Subscription to {} lagged by {} notifications", self.topic.path(), n);
                    return true;
                }
                Err(RecvError::Closed) => return false,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispatcher.unwatch(&self.topic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn subscription_sees_only_its_topic() {
        let dispatcher = Dispatcher::new();
        let magazine = Uuid::new_v4();
        let mut sub = dispatcher.watch(Topic::Comments(magazine));

        dispatcher.notify(Topic::Feedback);
        dispatcher.notify(Topic::Comments(Uuid::new_v4()));
        dispatcher.notify(Topic::Comments(magazine));

        let changed = tokio::time::timeout(Duration::from_secs(1), sub.changed())
            .await
            .unwrap();
        assert!(changed);

        // Nothing else queued for this topic
        let pending = tokio::time::timeout(Duration::from_millis(50), sub.changed()).await;
        assert!(pending.is_err());
    }

    #[test]
    fn dropping_a_subscription_unwatches() {
        let dispatcher = Dispatcher::new();
        let a = dispatcher.watch(Topic::Magazines);
        let b = dispatcher.watch(Topic::Magazines);
        assert_eq!(dispatcher.watcher_count(&Topic::Magazines), 2);

        drop(a);
        assert_eq!(dispatcher.watcher_count(&Topic::Magazines), 1);
        drop(b);
        assert_eq!(dispatcher.watcher_count(&Topic::Magazines), 0);
    }

    #[tokio::test]
    async fn aborting_the_owning_task_cancels() {
        let dispatcher = Dispatcher::new();
        let mut sub = dispatcher.watch(Topic::Feedback);
        let task = tokio::spawn(async move { while sub.changed().await {} });
        assert_eq!(dispatcher.watcher_count(&Topic::Feedback), 1);

        task.abort();
        let _ = task.await;
        assert_eq!(dispatcher.watcher_count(&Topic::Feedback), 0);
    }
}
