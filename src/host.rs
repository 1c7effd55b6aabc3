use crate::error::SendError;
use crate::metrics::NodeStats;
use crate::network::{Direction, Interface, Packet, Protocol};
use crate::node::Node;
use crate::Address;
use log::{debug, error, info};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Notify;

/// Single-interface endpoint that originates and consumes DATA packets.
#[derive(Debug)]
pub struct Host {
    addr: Address,
    interfaces: [Arc<Interface>; 1],
    inbox: Vec<Packet>,
    stats: NodeStats,
}

impl Host {
    pub fn new(addr: Address, cost: u32, max_queue_size: usize) -> Self {
        Self {
            addr,
            interfaces: [Arc::new(Interface::new(cost, max_queue_size))],
            inbox: Vec::new(),
            stats: NodeStats::new(),
        }
    }

    pub fn addr(&self) -> Address {
        self.addr
    }

    pub fn interface(&self) -> &Arc<Interface> {
        &self.interfaces[0]
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    /// Packets delivered so far, oldest first.
    pub fn inbox(&self) -> &[Packet] {
        &self.inbox
    }

    pub fn take_inbox(&mut self) -> Vec<Packet> {
        std::mem::take(&mut self.inbox)
    }

    /// Builds a DATA packet and enqueues it on the outbound queue.
    pub fn send(&self, destination: Address, payload: impl Into<Vec<u8>>) -> Result<(), SendError> {
        self.sender().send(destination, payload)
    }

    /// Handle that keeps sending on this host's behalf while the host itself
    /// is owned by a running task.
    pub fn sender(&self) -> HostSender {
        HostSender {
            addr: self.addr,
            interface: self.interface().clone(),
            stats: self.stats.clone(),
        }
    }

    /// Takes one frame off the inbound queue. DATA packets are returned to the
    /// caller; routing updates and undecodable frames are discarded.
    pub fn receive(&mut self) -> Option<Packet> {
        let frame = self.interface().get(Direction::In)?;

        match Packet::decode(&frame) {
            Ok(packet) if packet.protocol() == Protocol::Data => {
                info!("{}: received packet \"{}\"", self, packet);
                self.stats.packet_delivered();
                Some(packet)
            }
            Ok(packet) => {
                debug!("{}: ignoring routing update \"{}\"", self, packet);
                None
            }
            Err(e) => {
                error!("{}: discarding frame: {}", self, e);
                self.stats.malformed();
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostSender {
    addr: Address,
    interface: Arc<Interface>,
    stats: NodeStats,
}

impl HostSender {
    pub fn addr(&self) -> Address {
        self.addr
    }

    pub fn send(&self, destination: Address, payload: impl Into<Vec<u8>>) -> Result<(), SendError> {
        let packet = Packet::data(destination, payload);
        let bytes = packet.encode()?;
        info!("Host_{}: sending packet \"{}\"", self.addr, packet);
        self.interface.put(Direction::Out, bytes)?;
        self.stats.packet_sent();
        Ok(())
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Host_{}", self.addr)
    }
}

impl Node for Host {
    fn name(&self) -> String {
        self.to_string()
    }

    fn interfaces(&self) -> &[Arc<Interface>] {
        &self.interfaces
    }

    fn step(&mut self) -> usize {
        if self.interface().is_empty(Direction::In) {
            return 0;
        }
        if let Some(packet) = self.receive() {
            self.inbox.push(packet);
        }
        1
    }

    fn doorbell(&self) -> Arc<Notify> {
        self.interface().doorbell()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueFullError;

    #[test]
    fn test_send_enqueues_encoded_data_packet() {
        let host = Host::new(1, 0, 0);
        host.send(2, "hello").unwrap();

        let frame = host.interface().get(Direction::Out).unwrap();
        assert_eq!(frame, b"000021hello".to_vec());
        assert_eq!(host.stats().snapshot().packets_sent, 1);
    }

    #[test]
    fn test_send_reports_errors() {
        let host = Host::new(1, 0, 1);
        assert!(matches!(host.send(123_456, "x"), Err(SendError::Encode(_))));

        host.send(2, "a").unwrap();
        assert_eq!(
            host.send(2, "b"),
            Err(SendError::QueueFull(QueueFullError {
                direction: Direction::Out,
                capacity: 1,
            }))
        );
        assert_eq!(host.stats().snapshot().packets_sent, 1);
    }

    #[test]
    fn test_receive_on_empty_is_noop() {
        let mut host = Host::new(1, 0, 0);
        assert_eq!(host.receive(), None);
        assert_eq!(host.step(), 0);
    }

    #[test]
    fn test_receive_delivers_data() {
        let mut host = Host::new(2, 0, 0);
        host.interface().put(Direction::In, "000021hi there").unwrap();

        assert_eq!(host.step(), 1);
        assert_eq!(host.inbox(), &[Packet::data(2, "hi there")]);
        assert_eq!(host.stats().snapshot().packets_delivered, 1);
    }

    #[test]
    fn test_receive_skips_control_and_garbage() {
        let mut host = Host::new(2, 0, 0);
        host.interface().put(Direction::In, "0000021,0/").unwrap();
        host.interface().put(Direction::In, "zz").unwrap();

        assert_eq!(host.step(), 1);
        assert_eq!(host.step(), 1);
        assert!(host.inbox().is_empty());

        let stats = host.stats().snapshot();
        assert_eq!(stats.packets_delivered, 0);
        assert_eq!(stats.malformed, 1);
    }

    #[test]
    fn test_sender_shares_queue_and_stats() {
        let host = Host::new(1, 0, 0);
        let sender = host.sender();
        sender.send(2, "via handle").unwrap();

        assert_eq!(sender.addr(), 1);
        assert_eq!(host.interface().len(Direction::Out), 1);
        assert_eq!(host.stats().snapshot().packets_sent, 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(Host::new(7, 0, 0).to_string(), "Host_7");
    }
}
