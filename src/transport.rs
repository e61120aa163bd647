//! Typed message passing over a simulated process group.
//!
//! spec.md models "parallel OS processes communicating by message
//! passing." The corpus this crate was grounded on carries no MPI binding
//! crate, so each rank is realized here as its own `tokio` task (the
//! teacher's own concurrency dependency) connected to every other rank by
//! a dedicated `tokio::sync::mpsc::unbounded_channel`. Every rank reads a
//! single any-source inbox (all senders to that rank share one channel),
//! so FIFO ordering holds only *per sender*, not across senders: two
//! peers' messages can interleave in the order the consumer observes
//! them. `PeerLink::recv_from` restores the pinned-source receive spec.md
//! S5 requires by buffering the other senders' messages it has to step
//! over into a per-source holding queue instead of discarding or
//! misinterpreting them.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::sync::mpsc;

/// Message tags, numbered after the coordinator/worker/low-level wire
/// protocol this was grounded on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Task = 100,
    Children = 101,
    Solution = 102,
    Idle = 103,
    Terminate = 104,
    Incumbent = 105,
    LlTask = 200,
    LlResult = 201,
    LlTerminate = 202,
    DpNode = 300,
}

/// One logical piece of a serialized CT node, or a small control message.
#[derive(Debug, Clone)]
pub enum Payload {
    Header(crate::codec::NodeHeader),
    Cost(f64),
    Ints(Vec<i64>),
    Count(i64),
    Empty,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub tag: Tag,
    pub source: usize,
    pub payload: Payload,
}

/// This rank's end of the process group: a sender to every peer (including
/// itself, unused in practice) and the single inbox only this rank reads.
pub struct PeerLink {
    rank: usize,
    size: usize,
    senders: Vec<mpsc::UnboundedSender<Message>>,
    inbox: mpsc::UnboundedReceiver<Message>,
    /// Messages read off `inbox` while hunting for a specific source that
    /// turned out to belong to some other sender, held here in arrival
    /// order until that sender's turn comes up.
    pending: HashMap<usize, VecDeque<Message>>,
}

impl PeerLink {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn other_ranks(&self) -> impl Iterator<Item = usize> {
        (0..self.size).filter(move |&r| r != self.rank)
    }

    /// Direct, immediately-buffered send. Used for the small fixed-size
    /// control messages spec.md S5 allows to be blocking in spirit (they
    /// never wait on anything but channel capacity, which is unbounded).
    pub async fn send(&self, dest: usize, tag: Tag, payload: Payload) {
        let _ = self.senders[dest].send(Message {
            tag,
            source: self.rank,
            payload,
        });
    }

    /// Fixed-size control broadcast, e.g. `TAG_TERMINATE`.
    pub async fn broadcast(&self, ranks: impl Iterator<Item = usize>, tag: Tag, payload: Payload) {
        for dest in ranks {
            self.send(dest, tag, payload.clone()).await;
        }
    }

    /// Blocking receive from any source: yields a message held in some
    /// source's pending queue before reading the shared inbox, so messages
    /// stepped over by a prior `recv_from` are never skipped.
    pub async fn recv(&mut self) -> Option<Message> {
        if let Some(msg) = self.pop_any_pending() {
            return Some(msg);
        }
        self.inbox.recv().await
    }

    /// Non-blocking probe used by the decentralized drain loop and by the
    /// centralized coordinator's timeout-preemptible reply wait.
    pub fn try_recv(&mut self) -> Option<Message> {
        if let Some(msg) = self.pop_any_pending() {
            return Some(msg);
        }
        self.inbox.try_recv().ok()
    }

    /// Blocking receive pinned to `source`: the multi-message sequence a
    /// node/children reply is sent as (header, cost, path ints,
    /// constraint ints) must be decoded from the single sender that sent
    /// it, never from whichever rank's message happened to arrive next on
    /// the shared inbox. Messages from other senders encountered along the
    /// way are buffered, not dropped, so a later `recv`/`recv_from` still
    /// observes them.
    pub async fn recv_from(&mut self, source: usize) -> Option<Message> {
        if let Some(queue) = self.pending.get_mut(&source) {
            if let Some(msg) = queue.pop_front() {
                return Some(msg);
            }
        }
        loop {
            let msg = self.inbox.recv().await?;
            if msg.source == source {
                return Some(msg);
            }
            self.pending.entry(msg.source).or_default().push_back(msg);
        }
    }

    fn pop_any_pending(&mut self) -> Option<Message> {
        let source = *self.pending.iter().find(|(_, q)| !q.is_empty())?.0;
        self.pending.get_mut(&source).and_then(|q| q.pop_front())
    }
}

/// Builds a full-mesh process group of `size` ranks.
pub fn process_group(size: usize) -> Vec<PeerLink> {
    let mut senders_grid: Vec<Vec<mpsc::UnboundedSender<Message>>> = vec![Vec::new(); size];
    let mut inboxes = Vec::with_capacity(size);

    // One channel per destination; every rank gets a clone of dest's sender.
    let mut per_dest_senders = Vec::with_capacity(size);
    for _ in 0..size {
        let (tx, rx) = mpsc::unbounded_channel();
        per_dest_senders.push(tx);
        inboxes.push(rx);
    }
    for senders in senders_grid.iter_mut() {
        *senders = per_dest_senders.clone();
    }

    inboxes
        .into_iter()
        .enumerate()
        .map(|(rank, inbox)| PeerLink {
            rank,
            size,
            senders: senders_grid[rank].clone(),
            inbox,
            pending: HashMap::new(),
        })
        .collect()
}

/// Bounded pool of non-blocking sends, grounded on the original
/// implementation's `PendingSendPool` (`MAX_PENDING_SENDS`-capacity array
/// of request slots, each owning a header/cost/path/constraint buffer
/// copy). An `mpsc::UnboundedSender::send` never actually blocks or
/// reorders relative to other sends from the same sender, so there is
/// nothing to poll for completion; `send_async` writes straight into the
/// destination's channel in the order it is called, which is what
/// preserves the per-destination FIFO sequence `wire::send_node`'s
/// header/cost/path/constraint messages depend on. `capacity` is kept as
/// the knob spec.md S5 names, counting sends issued since the last
/// `progress`/`wait_all` rather than anything genuinely in flight.
pub struct AsyncSendPool {
    capacity: usize,
    issued_since_progress: usize,
}

pub const MAX_PENDING_SENDS: usize = 256;

impl AsyncSendPool {
    pub fn new(capacity: usize) -> Self {
        AsyncSendPool {
            capacity,
            issued_since_progress: 0,
        }
    }

    /// Sends `payload` to `dest` in-line, preserving the order `send_node`
    /// issues its messages in for a given destination. Spawning an
    /// independent task per message here would let the scheduler race
    /// them and deliver cost-before-header at the receiver.
    pub async fn send_async(&mut self, link: &PeerLink, dest: usize, tag: Tag, payload: Payload) {
        if self.issued_since_progress >= self.capacity {
            self.progress();
        }
        let _ = link.senders[dest].send(Message {
            tag,
            source: link.rank,
            payload,
        });
        self.issued_since_progress += 1;
    }

    /// Resets the issued-since-last-check counter; every send already
    /// landed in its destination's channel synchronously, so there is
    /// nothing else to advance.
    pub fn progress(&mut self) {
        self.issued_since_progress = 0;
    }

    /// Kept for call-site parity with the original's shutdown drain; a
    /// no-op beyond resetting the counter since sends never leave work
    /// outstanding.
    pub async fn wait_all(&mut self) {
        self.issued_since_progress = 0;
    }

    pub fn outstanding(&self) -> usize {
        self.issued_since_progress
    }
}

/// The ~1ms non-blocking-probe-plus-sleep pattern spec.md S5 requires so a
/// wall-clock timeout can preempt a reply wait.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_order_is_preserved_between_a_pair() {
        let mut group = process_group(2);
        let mut receiver = group.pop().unwrap();
        let sender = group.pop().unwrap();

        sender.send(1, Tag::Task, Payload::Count(1)).await;
        sender.send(1, Tag::Task, Payload::Count(2)).await;

        let first = receiver.recv().await.unwrap();
        let second = receiver.recv().await.unwrap();
        assert!(matches!(first.payload, Payload::Count(1)));
        assert!(matches!(second.payload, Payload::Count(2)));
    }

    #[tokio::test]
    async fn async_send_pool_delivers_after_progress() {
        let mut group = process_group(2);
        let mut receiver = group.pop().unwrap();
        let sender = group.pop().unwrap();
        let mut pool = AsyncSendPool::new(MAX_PENDING_SENDS);

        pool.send_async(&sender, 1, Tag::DpNode, Payload::Count(9)).await;
        pool.wait_all().await;

        let msg = receiver.recv().await.unwrap();
        assert!(matches!(msg.payload, Payload::Count(9)));
    }

    /// Regression test for a prior bug where each pooled send ran on its
    /// own spawned task, letting the scheduler deliver a destination's
    /// messages out of the order `send_async` was called in.
    #[tokio::test]
    async fn async_send_pool_preserves_per_destination_order() {
        let mut group = process_group(2);
        let mut receiver = group.pop().unwrap();
        let sender = group.pop().unwrap();
        let mut pool = AsyncSendPool::new(MAX_PENDING_SENDS);

        for n in 0..50 {
            pool.send_async(&sender, 1, Tag::DpNode, Payload::Count(n)).await;
        }
        pool.wait_all().await;

        for expected in 0..50 {
            let msg = receiver.recv().await.unwrap();
            assert!(matches!(msg.payload, Payload::Count(n) if n == expected));
        }
    }

    /// Regression test for a prior bug where `recv_from` (then just
    /// `recv`) would misread a different sender's message as the next
    /// part of the sequence being pinned to.
    #[tokio::test]
    async fn recv_from_buffers_other_senders_instead_of_misreading_them() {
        let mut group = process_group(3);
        let mut receiver = group.pop().unwrap();
        let sender_b = group.pop().unwrap();
        let sender_a = group.pop().unwrap();

        let dest = receiver.rank();
        sender_a.send(dest, Tag::Task, Payload::Count(1)).await;
        sender_b.send(dest, Tag::Idle, Payload::Count(99)).await;
        sender_a.send(dest, Tag::Task, Payload::Count(2)).await;

        let first = receiver.recv_from(sender_a.rank()).await.unwrap();
        let second = receiver.recv_from(sender_a.rank()).await.unwrap();
        assert!(matches!(first.payload, Payload::Count(1)));
        assert!(matches!(second.payload, Payload::Count(2)));

        let stray = receiver.recv().await.unwrap();
        assert_eq!(stray.source, sender_b.rank());
        assert!(matches!(stray.payload, Payload::Count(99)));
    }
}
