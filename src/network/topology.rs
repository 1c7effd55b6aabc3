use super::{Direction, Interface};
use log::{debug, warn};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A node interface taking part in a link.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub node: String,
    pub index: usize,
    pub interface: Arc<Interface>,
}

impl Endpoint {
    pub fn new(node: impl Into<String>, index: usize, interface: Arc<Interface>) -> Self {
        Self {
            node: node.into(),
            index,
            interface,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.node, self.index)
    }
}

/// Emulated physical link: whatever one endpoint puts on its outbound queue
/// shows up on the other endpoint's inbound queue.
#[derive(Debug, Clone)]
pub struct Link {
    a: Endpoint,
    b: Endpoint,
}

impl Link {
    pub fn new(a: Endpoint, b: Endpoint) -> Self {
        Self { a, b }
    }

    pub fn endpoints(&self) -> (&Endpoint, &Endpoint) {
        (&self.a, &self.b)
    }

    /// Moves frames in both directions until the sender runs dry or the
    /// receiver is full. Frames that do not fit stay queued at the sender.
    pub fn transfer(&self) -> usize {
        Self::transfer_one_way(&self.a, &self.b) + Self::transfer_one_way(&self.b, &self.a)
    }

    fn transfer_one_way(from: &Endpoint, to: &Endpoint) -> usize {
        let mut moved = 0;

        while !to.interface.is_full(Direction::In) {
            let Some(frame) = from.interface.get(Direction::Out) else {
                break;
            };
            if let Err(e) = to.interface.put(Direction::In, frame) {
                // Only reachable if someone else fills the queue concurrently.
                warn!("link {} -> {}: frame lost: {}", from, to, e);
                break;
            }
            moved += 1;
        }

        moved
    }

    /// Frames waiting on either outbound queue.
    pub fn in_flight(&self) -> usize {
        self.a.interface.len(Direction::Out) + self.b.interface.len(Direction::Out)
    }

    /// Spawns one transport task per direction on the current tokio runtime.
    pub fn spawn(&self, token: &CancellationToken) -> [tokio::task::JoinHandle<()>; 2] {
        [
            tokio::spawn(Self::pump(self.a.clone(), self.b.clone(), token.clone())),
            tokio::spawn(Self::pump(self.b.clone(), self.a.clone(), token.clone())),
        ]
    }

    /// Carries frames from `from` to `to`, waiting for room on the receiving
    /// side rather than dropping. Returns when `token` is cancelled.
    pub async fn pump(from: Endpoint, to: Endpoint, token: CancellationToken) {
        debug!("link {} -> {}: up", from, to);

        loop {
            while let Some(frame) = from.interface.get(Direction::Out) {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    _ = to.interface.put_blocking(Direction::In, frame) => {}
                }
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = from.interface.readable(Direction::Out) => {}
            }
        }

        debug!("link {} -> {}: down", from, to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn endpoint(node: &str, capacity: usize) -> Endpoint {
        Endpoint::new(node, 0, Arc::new(Interface::new(1, capacity)))
    }

    #[test]
    fn test_transfer_both_directions() {
        let a = endpoint("A", 0);
        let b = endpoint("B", 0);
        let link = Link::new(a.clone(), b.clone());

        a.interface.put(Direction::Out, "to-b").unwrap();
        b.interface.put(Direction::Out, "to-a-1").unwrap();
        b.interface.put(Direction::Out, "to-a-2").unwrap();
        assert_eq!(link.in_flight(), 3);

        assert_eq!(link.transfer(), 3);
        assert_eq!(link.in_flight(), 0);
        assert_eq!(b.interface.get(Direction::In), Some(b"to-b".to_vec()));
        assert_eq!(a.interface.get(Direction::In), Some(b"to-a-1".to_vec()));
        assert_eq!(a.interface.get(Direction::In), Some(b"to-a-2".to_vec()));
    }

    #[test]
    fn test_transfer_respects_receiver_capacity() {
        let a = endpoint("A", 0);
        let b = endpoint("B", 2);
        let link = Link::new(a.clone(), b.clone());

        for i in 0..5u8 {
            a.interface.put(Direction::Out, vec![i]).unwrap();
        }

        assert_eq!(link.transfer(), 2);
        assert_eq!(link.in_flight(), 3);

        b.interface.get(Direction::In);
        assert_eq!(link.transfer(), 1);
        assert_eq!(b.interface.get(Direction::In), Some(vec![1]));
        assert_eq!(b.interface.get(Direction::In), Some(vec![2]));
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(endpoint("Router_A", 0).to_string(), "Router_A[0]");
    }

    #[tokio::test]
    async fn test_pump_delivers_until_cancelled() {
        let a = endpoint("A", 0);
        let b = endpoint("B", 1);
        let token = CancellationToken::new();
        let handle = tokio::spawn(Link::pump(a.clone(), b.clone(), token.clone()));

        a.interface.put(Direction::Out, "one").unwrap();
        a.interface.put(Direction::Out, "two").unwrap();

        let mut received = Vec::new();
        while received.len() < 2 {
            match b.interface.get(Direction::In) {
                Some(frame) => received.push(frame),
                None => tokio::time::sleep(Duration::from_millis(5)).await,
            }
        }
        assert_eq!(received, vec![b"one".to_vec(), b"two".to_vec()]);

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
