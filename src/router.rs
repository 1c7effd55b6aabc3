use crate::error::RouterError;
use crate::metrics::NodeStats;
use crate::network::{Direction, Interface, Packet, Protocol};
use crate::node::Node;
use crate::protocol::{
    process_routing_update, RouteAdvertisement, RoutingTable, CONTROL_DESTINATION,
};
use crate::Address;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Notify;

/// What to do with a DATA packet whose destination has no routing entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoRoutePolicy {
    #[default]
    Drop,
    /// Send on every interface except the one it arrived on.
    Flood,
    /// Send on a fixed interface.
    DefaultRoute { interface: usize },
}

/// Multi-interface router running the distance-vector protocol.
#[derive(Debug)]
pub struct Router {
    name: String,
    interfaces: Vec<Arc<Interface>>,
    routing_table: RoutingTable,
    no_route_policy: NoRoutePolicy,
    split_horizon: bool,
    doorbell: Arc<Notify>,
    stats: NodeStats,
}

impl Router {
    /// One interface is created per entry of `interface_costs`; `routing_table`
    /// holds the initial reachability, e.g. directly attached hosts.
    pub fn new(
        name: impl Into<String>,
        interface_costs: &[u32],
        routing_table: RoutingTable,
        max_queue_size: usize,
    ) -> Self {
        let doorbell = Arc::new(Notify::new());
        let interfaces = interface_costs
            .iter()
            .map(|&cost| Arc::new(Interface::with_doorbell(cost, max_queue_size, doorbell.clone())))
            .collect();

        Self {
            name: name.into(),
            interfaces,
            routing_table,
            no_route_policy: NoRoutePolicy::default(),
            split_horizon: false,
            doorbell,
            stats: NodeStats::new(),
        }
    }

    pub fn with_no_route_policy(mut self, policy: NoRoutePolicy) -> Self {
        self.no_route_policy = policy;
        self
    }

    pub fn with_split_horizon(mut self, enabled: bool) -> Self {
        self.split_horizon = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interface(&self, index: usize) -> Option<&Arc<Interface>> {
        self.interfaces.get(index)
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing_table
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    /// Takes at most one frame from each inbound queue and acts on it.
    /// Errors are logged and counted; they never stop the router.
    pub fn process_queues(&mut self) -> usize {
        let mut handled = 0;

        for i in 0..self.interfaces.len() {
            let Some(frame) = self.interfaces[i].get(Direction::In) else {
                continue;
            };
            handled += 1;

            if let Err(e) = self.handle_frame(frame, i) {
                error!("{}: discarding packet from interface {}: {}", self, i, e);
                self.stats.malformed();
            }
        }

        handled
    }

    fn handle_frame(&mut self, frame: Vec<u8>, i: usize) -> Result<(), RouterError> {
        let packet = Packet::decode(&frame)?;
        match packet.protocol() {
            Protocol::Data => {
                self.forward_packet(frame, &packet, i);
                Ok(())
            }
            Protocol::Control => self.update_routes(&packet, i),
        }
    }

    /// Interfaces a DATA packet for `destination` that came in on `ingress` goes out on.
    fn egress_for(&self, destination: Address, ingress: usize) -> Vec<usize> {
        if let Some(entry) = self.routing_table.get_route(destination) {
            return vec![entry.interface];
        }

        match self.no_route_policy {
            NoRoutePolicy::Drop => Vec::new(),
            NoRoutePolicy::Flood => (0..self.interfaces.len()).filter(|&o| o != ingress).collect(),
            NoRoutePolicy::DefaultRoute { interface } => vec![interface],
        }
    }

    /// Re-sends the original frame bytes; a full or missing egress queue drops it.
    fn forward_packet(&self, frame: Vec<u8>, packet: &Packet, i: usize) {
        let egress = self.egress_for(packet.destination(), i);
        if egress.is_empty() {
            warn!("{}: no route for packet \"{}\", dropped", self, packet);
            self.stats.packet_dropped();
            return;
        }

        for out in egress {
            let Some(intf) = self.interfaces.get(out) else {
                warn!(
                    "{}: packet \"{}\" lost: {}",
                    self,
                    packet,
                    RouterError::NoSuchInterface(out)
                );
                self.stats.packet_dropped();
                continue;
            };

            match intf.put(Direction::Out, frame.clone()) {
                Ok(()) => {
                    debug!(
                        "{}: forwarding packet \"{}\" from interface {} to {}",
                        self, packet, i, out
                    );
                    self.stats.packet_forwarded();
                }
                Err(e) => {
                    warn!("{}: packet \"{}\" lost on interface {}: {}", self, packet, out, e);
                    self.stats.packet_dropped();
                }
            }
        }
    }

    fn update_routes(&mut self, packet: &Packet, i: usize) -> Result<(), RouterError> {
        let advertisement = RouteAdvertisement::decode(packet.payload())?;
        let link_cost = self
            .interfaces
            .get(i)
            .ok_or(RouterError::NoSuchInterface(i))?
            .cost();

        self.stats.update_received();
        debug!("{}: received routing update \"{}\" from interface {}", self, packet, i);

        let outcome = process_routing_update(&self.routing_table, &advertisement, i, link_cost);
        if !outcome.changed() {
            return Ok(());
        }

        for change in &outcome.changes {
            match change.previous {
                Some(prev) => info!(
                    "{}: route to {} now via interface {} cost {} (was interface {} cost {})",
                    self,
                    change.destination,
                    change.current.interface,
                    change.current.cost,
                    prev.interface,
                    prev.cost
                ),
                None => info!(
                    "{}: learned route to {} via interface {} cost {}",
                    self, change.destination, change.current.interface, change.current.cost
                ),
            }
        }

        self.stats.routes_changed(outcome.changes.len());
        self.routing_table = outcome.table;
        self.send_routes();
        Ok(())
    }

    /// Advertises the routing table on every interface. Returns how many
    /// advertisements were enqueued; the rest were dropped on full queues.
    pub fn send_routes(&self) -> usize {
        let mut sent = 0;

        for (i, intf) in self.interfaces.iter().enumerate() {
            let skip = self.split_horizon.then_some(i);
            let message = RouteAdvertisement::from_table(&self.routing_table, skip).encode();
            let packet = Packet::control(CONTROL_DESTINATION, message);

            // CONTROL_DESTINATION is always in range.
            let bytes = match packet.encode() {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!("{}: cannot encode routing update: {}", self, e);
                    continue;
                }
            };

            match intf.put(Direction::Out, bytes) {
                Ok(()) => {
                    debug!("{}: sending routing update \"{}\" from interface {}", self, packet, i);
                    self.stats.update_sent();
                    sent += 1;
                }
                Err(e) => {
                    warn!("{}: routing update lost on interface {}: {}", self, i, e);
                    self.stats.packet_dropped();
                }
            }
        }

        sent
    }

    pub fn dump_routing_table(&self) -> String {
        format!(
            "{}: routing table\n{}",
            self,
            self.routing_table.render(self.interfaces.len())
        )
    }
}

impl fmt::Display for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Router_{}", self.name)
    }
}

impl Node for Router {
    fn name(&self) -> String {
        self.to_string()
    }

    fn interfaces(&self) -> &[Arc<Interface>] {
        &self.interfaces
    }

    fn step(&mut self) -> usize {
        self.process_queues()
    }

    fn on_tick(&mut self) {
        self.send_routes();
    }

    fn doorbell(&self) -> Arc<Notify> {
        self.doorbell.clone()
    }
}
