//! Session-scoped queues: the bounded outbound channel and the
//! inbound playback queue.
//!
//! The outbound queue multiplexes every producer (microphone, video,
//! text input) into one FIFO drained by the outbound pump. The playback
//! queue sits between the inbound demux and the playback sink and
//! supports an atomic drain so stale audio can be cut off the instant a
//! response turn ends.

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};
use tokio::sync::mpsc;

use crate::core::payload::OutboundItem;

/// Capacity of the outbound multiplex queue.
///
/// Sized to the slowest producer cadence (one video frame per second):
/// a stalled remote send back-pressures producers through the full
/// queue instead of growing memory unboundedly. The channel itself
/// never drops an item.
pub const OUTBOUND_CAPACITY: usize = 5;

/// Create the outbound queue: many producers, one consumer, FIFO in
/// wall-clock arrival order. `send` suspends when the queue is full.
pub fn outbound_channel() -> (mpsc::Sender<OutboundItem>, mpsc::Receiver<OutboundItem>) {
    mpsc::channel(OUTBOUND_CAPACITY)
}

#[derive(Debug, Default)]
struct QueueInner {
    items: VecDeque<Bytes>,
    closed: bool,
}

/// Unbounded FIFO between the inbound demux and the playback sink.
///
/// `push` never blocks (the demux must keep reading the network even
/// when playback lags). `pop_timeout` blocks the playback thread until
/// an item arrives or the timeout elapses; the timeout doubles as the
/// consumer's cancellation poll boundary. `drain_all` removes every
/// queued item atomically with respect to concurrent pushes.
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue one audio chunk. Never blocks; ignored after `close`.
    pub fn push(&self, chunk: Bytes) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        inner.items.push_back(chunk);
        drop(inner);
        self.available.notify_one();
    }

    /// Dequeue one chunk, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `None` on timeout or when the queue is closed and empty.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Bytes> {
        let mut inner = self.inner.lock();
        if let Some(chunk) = inner.items.pop_front() {
            return Some(chunk);
        }
        if inner.closed {
            return None;
        }
        self.available.wait_for(&mut inner, timeout);
        inner.items.pop_front()
    }

    /// Discard everything currently queued, atomically with respect to
    /// concurrent `push` calls. Returns how many chunks were discarded.
    pub fn drain_all(&self) -> usize {
        let mut inner = self.inner.lock();
        let discarded = inner.items.len();
        inner.items.clear();
        discarded
    }

    /// Close the queue and wake any blocked consumer. Subsequent pushes
    /// are ignored.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        drop(inner);
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::payload::MediaPayload;
    use std::sync::Arc;

    fn text_item(s: &str) -> OutboundItem {
        OutboundItem::realtime(MediaPayload::text(s))
    }

    #[tokio::test]
    async fn test_outbound_fifo_order() {
        let (tx, mut rx) = outbound_channel();
        for i in 0..OUTBOUND_CAPACITY {
            tx.send(text_item(&i.to_string())).await.unwrap();
        }
        for i in 0..OUTBOUND_CAPACITY {
            let item = rx.recv().await.unwrap();
            assert_eq!(item.payload, MediaPayload::text(i.to_string()));
        }
    }

    #[tokio::test]
    async fn test_outbound_send_blocks_when_full() {
        let (tx, mut rx) = outbound_channel();
        for i in 0..OUTBOUND_CAPACITY {
            tx.send(text_item(&i.to_string())).await.unwrap();
        }

        // Queue is at capacity: the next send must not complete.
        let blocked = tokio::time::timeout(Duration::from_millis(50), tx.send(text_item("x")));
        assert!(blocked.await.is_err(), "send into a full queue completed");

        // A get frees one slot and unblocks the producer.
        rx.recv().await.unwrap();
        tokio::time::timeout(Duration::from_millis(500), tx.send(text_item("x")))
            .await
            .expect("send did not unblock after recv")
            .unwrap();
    }

    #[test]
    fn test_playback_queue_fifo() {
        let q = PlaybackQueue::new();
        q.push(Bytes::from_static(b"a"));
        q.push(Bytes::from_static(b"b"));
        assert_eq!(q.pop_timeout(Duration::ZERO).unwrap(), "a");
        assert_eq!(q.pop_timeout(Duration::ZERO).unwrap(), "b");
        assert!(q.pop_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_drain_discards_queued_audio_only() {
        let q = PlaybackQueue::new();
        q.push(Bytes::from_static(b"stale-1"));
        q.push(Bytes::from_static(b"stale-2"));
        assert_eq!(q.drain_all(), 2);
        assert!(q.is_empty());

        // Anything pushed strictly after the drain survives.
        q.push(Bytes::from_static(b"fresh"));
        assert_eq!(q.pop_timeout(Duration::ZERO).unwrap(), "fresh");
    }

    #[test]
    fn test_drain_is_atomic_under_concurrent_push() {
        let q = Arc::new(PlaybackQueue::new());
        let pusher = {
            let q = Arc::clone(&q);
            std::thread::spawn(move || {
                for i in 0..1000u32 {
                    q.push(Bytes::from(i.to_le_bytes().to_vec()));
                }
            })
        };
        let drainer = {
            let q = Arc::clone(&q);
            std::thread::spawn(move || {
                let mut discarded = 0;
                for _ in 0..100 {
                    discarded += q.drain_all();
                }
                discarded
            })
        };
        pusher.join().unwrap();
        let discarded = drainer.join().unwrap();

        // Every chunk was either discarded by a drain or is still
        // queued; nothing is lost or duplicated.
        assert_eq!(discarded + q.len(), 1000);
    }

    #[test]
    fn test_close_wakes_blocked_consumer() {
        let q = Arc::new(PlaybackQueue::new());
        let consumer = {
            let q = Arc::clone(&q);
            std::thread::spawn(move || q.pop_timeout(Duration::from_secs(5)))
        };
        std::thread::sleep(Duration::from_millis(50));
        q.close();
        assert!(consumer.join().unwrap().is_none());
        assert!(q.is_closed());

        // Pushes after close are ignored.
        q.push(Bytes::from_static(b"late"));
        assert!(q.is_empty());
    }
}
