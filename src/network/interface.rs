use crate::error::QueueFullError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => write!(f, "in"),
            Direction::Out => write!(f, "out"),
        }
    }
}

#[derive(Debug)]
struct BoundedQueue {
    items: Mutex<VecDeque<Vec<u8>>>,
    capacity: usize, // 0 = unbounded
    space: Notify,
    ready: Arc<Notify>,
}

impl BoundedQueue {
    fn new(capacity: usize, ready: Arc<Notify>) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            capacity,
            space: Notify::new(),
            ready,
        }
    }

    /// Hands the frame back when the queue is at capacity.
    fn try_push(&self, data: Vec<u8>) -> Result<(), Vec<u8>> {
        {
            let mut items = self.items.lock();
            if self.capacity != 0 && items.len() >= self.capacity {
                return Err(data);
            }
            items.push_back(data);
        }
        self.ready.notify_one();
        Ok(())
    }

    fn pop(&self) -> Option<Vec<u8>> {
        let item = self.items.lock().pop_front();
        if item.is_some() {
            self.space.notify_one();
        }
        item
    }

    fn len(&self) -> usize {
        self.items.lock().len()
    }

    fn is_full(&self) -> bool {
        self.capacity != 0 && self.len() >= self.capacity
    }
}

/// One endpoint of a link: an inbound and an outbound queue of serialized
/// packets plus the routing cost of the link.
///
/// Every method takes `&self`; the owning node and the link transport share the
/// interface behind an `Arc` and each queue is locked independently.
#[derive(Debug)]
pub struct Interface {
    inbound: BoundedQueue,
    outbound: BoundedQueue,
    cost: u32,
    doorbell: Arc<Notify>,
}

impl Interface {
    pub fn new(cost: u32, capacity: usize) -> Self {
        Self::with_doorbell(cost, capacity, Arc::new(Notify::new()))
    }

    /// Builds an interface whose inbound queue rings `doorbell` on every put.
    /// Nodes with several interfaces share one doorbell so a single wait covers
    /// all of them.
    pub fn with_doorbell(cost: u32, capacity: usize, doorbell: Arc<Notify>) -> Self {
        Self {
            inbound: BoundedQueue::new(capacity, doorbell.clone()),
            outbound: BoundedQueue::new(capacity, Arc::new(Notify::new())),
            cost,
            doorbell,
        }
    }

    fn queue(&self, direction: Direction) -> &BoundedQueue {
        match direction {
            Direction::In => &self.inbound,
            Direction::Out => &self.outbound,
        }
    }

    /// Non-blocking append.
    pub fn put(&self, direction: Direction, data: impl Into<Vec<u8>>) -> Result<(), QueueFullError> {
        let queue = self.queue(direction);
        queue.try_push(data.into()).map_err(|_| QueueFullError {
            direction,
            capacity: queue.capacity,
        })
    }

    /// Appends, waiting for a free slot if the queue is at capacity. Never drops.
    pub async fn put_blocking(&self, direction: Direction, data: impl Into<Vec<u8>>) {
        let queue = self.queue(direction);
        let mut data = data.into();
        loop {
            match queue.try_push(data) {
                Ok(()) => return,
                Err(rejected) => {
                    data = rejected;
                    queue.space.notified().await;
                }
            }
        }
    }

    /// Removes the oldest frame, or returns `None` right away if there is none.
    pub fn get(&self, direction: Direction) -> Option<Vec<u8>> {
        self.queue(direction).pop()
    }

    /// Waits until a frame has been put on the given queue since the last wakeup.
    pub async fn readable(&self, direction: Direction) {
        if self.queue(direction).len() > 0 {
            return;
        }
        self.queue(direction).ready.notified().await;
    }

    pub fn len(&self, direction: Direction) -> usize {
        self.queue(direction).len()
    }

    pub fn is_empty(&self, direction: Direction) -> bool {
        self.len(direction) == 0
    }

    pub fn is_full(&self, direction: Direction) -> bool {
        self.queue(direction).is_full()
    }

    pub fn capacity(&self) -> usize {
        self.inbound.capacity
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn doorbell(&self) -> Arc<Notify> {
        self.doorbell.clone()
    }
}
