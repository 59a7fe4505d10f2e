//! Tracks resolutions that are currently running.
//!
//! Concurrent misses on the same key join the pending resolution instead of
//! repeating its file reads. Builds are keyed by `BuildKey` and header sets by
//! `HeaderKey`. The entry is removed once the caller that started the
//! resolution finishes or is dropped.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};

type SharedResolution<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;
type PendingMap<K, T, E> = Arc<DashMap<K, (u64, SharedResolution<T, E>)>>;

/// Map from key to the shared handle of its pending resolution.
pub struct InFlight<K, T, E>
where
    K: Eq + Hash,
    T: Clone,
    E: Clone,
{
    pending: PendingMap<K, T, E>,
    next_id: AtomicU64,
}

impl<K, T, E> Default for InFlight<K, T, E>
where
    K: Eq + Hash,
    T: Clone,
    E: Clone,
{
    fn default() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

/// Whether the caller started the resolution or joined one already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participation {
    Started,
    Joined,
}

impl<K, T, E> InFlight<K, T, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `start` for `key`, or await the resolution already pending for it.
    pub async fn run<F>(&self, key: K, start: F) -> (Result<T, E>, Participation)
    where
        F: FnOnce() -> BoxFuture<'static, Result<T, E>>,
    {
        use dashmap::mapref::entry::Entry;

        let (resolution, guard) = match self.pending.entry(key.clone()) {
            Entry::Occupied(occupied) => (occupied.get().1.clone(), None),
            Entry::Vacant(vacant) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let resolution = start().shared();
                vacant.insert((id, resolution.clone()));
                let guard = PendingGuard {
                    key,
                    id,
                    pending: Arc::clone(&self.pending),
                };
                (resolution, Some(guard))
            }
        };

        let participation = if guard.is_some() {
            Participation::Started
        } else {
            Participation::Joined
        };
        let result = resolution.await;
        drop(guard);
        (result, participation)
    }

    /// Number of resolutions currently pending.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

struct PendingGuard<K, T, E>
where
    K: Eq + Hash,
    T: Clone,
    E: Clone,
{
    key: K,
    id: u64,
    pending: PendingMap<K, T, E>,
}

impl<K, T, E> Drop for PendingGuard<K, T, E>
where
    K: Eq + Hash,
    T: Clone,
    E: Clone,
{
    fn drop(&mut self) {
        self.pending
            .remove_if(&self.key, |_, (entry_id, _)| *entry_id == self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use std::path::Path;

    use tokio::sync::Notify;

    use super::super::keys::{BuildKey, HeaderKey};
    use super::*;

    fn key(name: &str) -> BuildKey {
        BuildKey::derive(name, "", &[])
    }

    #[tokio::test]
    async fn concurrent_runs_share_one_resolution() {
        let inflight: InFlight<BuildKey, String, String> = InFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Notify::new());

        let start = || {
            let calls = Arc::clone(&calls);
            let release = Arc::clone(&release);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                release.notified().await;
                Ok::<_, String>("bundle".to_string())
            }
            .boxed()
        };

        let ((leader, leader_part), (follower, follower_part), ()) = tokio::join!(
            inflight.run(key("v1"), start),
            inflight.run(key("v1"), start),
            async { release.notify_one() },
        );

        assert_eq!(leader.as_deref(), Ok("bundle"));
        assert_eq!(follower.as_deref(), Ok("bundle"));
        assert_eq!(leader_part, Participation::Started);
        assert_eq!(follower_part, Participation::Joined);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn failures_are_not_retained() {
        let inflight: InFlight<BuildKey, String, String> = InFlight::new();

        let (first, _) = inflight
            .run(key("v1"), || async { Err("missing".to_string()) }.boxed())
            .await;
        assert_eq!(first, Err("missing".to_string()));
        assert!(inflight.is_empty());

        let (second, participation) = inflight
            .run(key("v1"), || async { Ok("bundle".to_string()) }.boxed())
            .await;
        assert_eq!(second, Ok("bundle".to_string()));
        assert_eq!(participation, Participation::Started);
    }

    #[tokio::test]
    async fn keys_only_share_with_equal_keys() {
        let inflight: InFlight<HeaderKey, String, String> = InFlight::new();
        let release = Arc::new(Notify::new());

        let start = |body: &'static str| {
            let release = Arc::clone(&release);
            move || {
                async move {
                    release.notified().await;
                    Ok::<_, String>(body.to_string())
                }
                .boxed()
            }
        };

        let ((v1, v1_part), (v2, v2_part), ()) = tokio::join!(
            inflight.run(HeaderKey::new(Path::new("v1")), start("one")),
            inflight.run(HeaderKey::new(Path::new("v2")), start("two")),
            async {
                release.notify_waiters();
            },
        );

        assert_eq!(v1.as_deref(), Ok("one"));
        assert_eq!(v2.as_deref(), Ok("two"));
        assert_eq!(v1_part, Participation::Started);
        assert_eq!(v2_part, Participation::Started);
    }
}
