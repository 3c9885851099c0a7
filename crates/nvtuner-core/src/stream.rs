// ── Reactive snapshot streams ──
//
// Subscription types for consuming working-set and staged-list changes
// published by the `Workspace`.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Shared, immutable list published on every mutation.
pub type Snapshot<T> = Arc<Vec<T>>;

/// A subscription to a published collection.
///
/// Provides both point-in-time snapshot access and change notification
/// via [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct SnapshotStream<T: Clone + Send + Sync + 'static> {
    current: Snapshot<T>,
    receiver: watch::Receiver<Snapshot<T>>,
}

impl<T: Clone + Send + Sync + 'static> SnapshotStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot<T>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot captured at creation time, or at the last `changed()`.
    pub fn current(&self) -> &Snapshot<T> {
        &self.current
    }

    /// Latest published snapshot.
    pub fn latest(&self) -> Snapshot<T> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. `None` once the workspace is dropped.
    pub async fn changed(&mut self) -> Option<Snapshot<T>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    pub fn into_stream(self) -> SnapshotWatchStream<T> {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct SnapshotWatchStream<T: Clone + Send + Sync + 'static> {
    inner: WatchStream<Snapshot<T>>,
}

impl<T: Clone + Send + Sync + 'static> Stream for SnapshotWatchStream<T> {
    type Item = Snapshot<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
