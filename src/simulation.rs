//! Execution driver: builds nodes from a [`TopologyConfig`], wires their
//! interfaces together and runs them, either in deterministic lock-step rounds
//! or as concurrent tokio tasks.

use crate::algorithms::{calculate_shortest_paths, CostGraph};
use crate::config::{EndpointConfig, TopologyConfig, TrafficConfig};
use crate::host::{Host, HostSender};
use crate::metrics::StatsSnapshot;
use crate::network::{Endpoint, Link};
use crate::node::{run_node, Node};
use crate::protocol::{RouteEntry, RoutingTable};
use crate::router::Router;
use crate::Address;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteMismatch {
    pub router: String,
    pub destination: Address,
    pub expected: Option<u32>,
    pub actual: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouterReport {
    pub name: String,
    pub routes: BTreeMap<Address, RouteEntry>,
    pub stats: StatsSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostReport {
    pub address: Address,
    pub delivered: Vec<String>,
    pub stats: StatsSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub generated_at: DateTime<Utc>,
    pub routers: Vec<RouterReport>,
    pub hosts: Vec<HostReport>,
    pub totals: StatsSnapshot,
    pub mismatches: Vec<RouteMismatch>,
}

pub struct Network {
    hosts: Vec<Host>,
    routers: Vec<Router>,
    links: Vec<Link>,
    traffic: Vec<TrafficConfig>,
    /// Static routes each router started with, used to derive expected costs.
    static_routes: HashMap<String, RoutingTable>,
    update_interval: Duration,
}

impl Network {
    pub fn from_config(config: &TopologyConfig) -> Result<Self> {
        config.validate()?;

        let hosts: Vec<Host> = config
            .hosts
            .iter()
            .map(|h| Host::new(h.address, h.cost, config.queue_capacity))
            .collect();

        let mut static_routes = HashMap::new();
        let routers: Vec<Router> = config
            .routers
            .iter()
            .map(|r| {
                let costs: Vec<u32> = r.interfaces.iter().map(|i| i.cost).collect();
                let table: RoutingTable = r
                    .routes
                    .iter()
                    .map(|route| (route.destination, RouteEntry::new(route.interface, route.cost)))
                    .collect();
                static_routes.insert(r.name.clone(), table.clone());

                Router::new(r.name.clone(), &costs, table, config.queue_capacity)
                    .with_no_route_policy(config.no_route_policy)
                    .with_split_horizon(config.split_horizon)
            })
            .collect();

        let mut network = Self {
            hosts,
            routers,
            links: Vec::new(),
            traffic: config.traffic.clone(),
            static_routes,
            update_interval: Duration::from_millis(config.update_interval_ms),
        };

        for link in &config.links {
            let a = network.endpoint(&link.a)?;
            let b = network.endpoint(&link.b)?;
            debug!("wiring {} <-> {}", a, b);
            network.links.push(Link::new(a, b));
        }

        Ok(network)
    }

    fn endpoint(&self, config: &EndpointConfig) -> Result<Endpoint> {
        match config {
            EndpointConfig::Host(addr) => {
                let host = self.host(*addr).ok_or_else(|| anyhow!("unknown host {}", addr))?;
                Ok(Endpoint::new(host.to_string(), 0, host.interface().clone()))
            }
            EndpointConfig::Router { name, interface } => {
                let router = self.router(name).ok_or_else(|| anyhow!("unknown router {}", name))?;
                let intf = router
                    .interface(*interface)
                    .ok_or_else(|| anyhow!("router {} has no interface {}", name, interface))?;
                Ok(Endpoint::new(router.to_string(), *interface, intf.clone()))
            }
        }
    }

    pub fn host(&self, addr: Address) -> Option<&Host> {
        self.hosts.iter().find(|h| h.addr() == addr)
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn router(&self, name: &str) -> Option<&Router> {
        self.routers.iter().find(|r| r.name() == name)
    }

    pub fn routers(&self) -> &[Router] {
        &self.routers
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn send(&self, from: Address, to: Address, payload: impl Into<Vec<u8>>) -> Result<()> {
        let host = self.host(from).ok_or_else(|| anyhow!("unknown host {}", from))?;
        host.send(to, payload)
            .with_context(|| format!("{} sending to {}", host, to))
    }

    /// Enqueues every configured traffic flow on its source host.
    pub fn inject_traffic(&self) -> Result<usize> {
        for flow in &self.traffic {
            self.send(flow.from, flow.to, flow.payload.as_bytes())?;
        }
        Ok(self.traffic.len())
    }

    /// Every router advertises its table once.
    pub fn broadcast_routes(&self) -> usize {
        self.routers.iter().map(|r| r.send_routes()).sum()
    }

    /// One lock-step round: carry frames across every link, then let every
    /// node handle at most one frame per interface. Returns the amount of work
    /// done; zero means nothing moved.
    pub fn step(&mut self) -> usize {
        let moved: usize = self.links.iter().map(Link::transfer).sum();
        let routed: usize = self.routers.iter_mut().map(|r| r.step()).sum();
        let received: usize = self.hosts.iter_mut().map(|h| h.step()).sum();
        moved + routed + received
    }

    /// Frames queued anywhere in the network.
    pub fn pending_frames(&self) -> usize {
        let routers: usize = self.routers.iter().map(|r| r.pending_frames()).sum();
        let hosts: usize = self.hosts.iter().map(|h| h.pending_frames()).sum();
        routers + hosts
    }

    /// Steps until no frame is left anywhere. Returns the number of rounds, or
    /// `None` if the network was still busy after `max_rounds`.
    pub fn run_until_quiet(&mut self, max_rounds: usize) -> Option<usize> {
        for round in 0..max_rounds {
            if self.pending_frames() == 0 {
                debug!("network quiet after {} rounds", round);
                return Some(round);
            }
            self.step();
        }
        (self.pending_frames() == 0).then_some(max_rounds)
    }

    /// Runs every node and both directions of every link as tokio tasks until
    /// `token` is cancelled, then gives the network back with the nodes' final
    /// state. Routers advertise their table at start and every
    /// `update_interval_ms`; configured traffic is sent after the first interval.
    pub async fn run(self, token: CancellationToken) -> Result<Self> {
        let Self {
            hosts,
            routers,
            links,
            traffic,
            static_routes,
            update_interval,
        } = self;

        info!(
            "starting {} routers, {} hosts, {} links",
            routers.len(),
            hosts.len(),
            links.len()
        );

        let flows: Vec<(HostSender, TrafficConfig)> = traffic
            .iter()
            .filter_map(|flow| {
                let host = hosts.iter().find(|h| h.addr() == flow.from)?;
                Some((host.sender(), flow.clone()))
            })
            .collect();

        for router in &routers {
            router.send_routes();
        }

        let transports: Vec<_> = links.iter().flat_map(|link| link.spawn(&token)).collect();
        let router_tasks: Vec<_> = routers
            .into_iter()
            .map(|r| tokio::spawn(run_node(r, Some(update_interval), token.clone())))
            .collect();
        let host_tasks: Vec<_> = hosts
            .into_iter()
            .map(|h| tokio::spawn(run_node(h, None, token.clone())))
            .collect();

        // Traffic starts once routes have had one update interval to settle.
        let traffic_task = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(update_interval) => {}
                }
                for (sender, flow) in flows {
                    if let Err(e) = sender.send(flow.to, flow.payload.as_bytes()) {
                        warn!("Host_{}: traffic to {} not sent: {}", sender.addr(), flow.to, e);
                    }
                }
            })
        };

        token.cancelled().await;
        info!("shutting down");
        traffic_task.await.context("traffic task panicked")?;

        let mut routers = Vec::with_capacity(router_tasks.len());
        for task in router_tasks {
            routers.push(task.await.context("router task panicked")?);
        }
        let mut hosts = Vec::with_capacity(host_tasks.len());
        for task in host_tasks {
            hosts.push(task.await.context("host task panicked")?);
        }
        for task in transports {
            task.await.context("link task panicked")?;
        }

        Ok(Self {
            hosts,
            routers,
            links,
            traffic,
            static_routes,
            update_interval,
        })
    }

    /// Router-to-router cost graph. The weight of `A -> B` is the cost of A's
    /// interface on that link, which is what A adds to B's advertisements.
    fn cost_graph(&self) -> CostGraph {
        let mut graph = CostGraph::new();
        for link in &self.links {
            let (a, b) = link.endpoints();
            if self.router_named(&a.node).is_none() || self.router_named(&b.node).is_none() {
                continue;
            }
            graph
                .entry(a.node.clone())
                .or_default()
                .push((b.node.clone(), a.interface.cost()));
            graph
                .entry(b.node.clone())
                .or_default()
                .push((a.node.clone(), b.interface.cost()));
        }
        graph
    }

    fn router_named(&self, display_name: &str) -> Option<&Router> {
        self.routers.iter().find(|r| r.to_string() == display_name)
    }

    /// Cost each router should hold per destination once the protocol has
    /// converged: the cheapest path to any router that was configured with a
    /// static route to it, plus that route's cost.
    pub fn expected_costs(&self) -> BTreeMap<String, BTreeMap<Address, u32>> {
        let graph = self.cost_graph();
        let mut expected = BTreeMap::new();

        for router in &self.routers {
            let paths = calculate_shortest_paths(&graph, &router.to_string());
            let mut costs: BTreeMap<Address, u32> = BTreeMap::new();

            for origin in &self.routers {
                let Some(path) = paths.get(&origin.to_string()) else {
                    continue;
                };
                let Some(statics) = self.static_routes.get(origin.name()) else {
                    continue;
                };
                for (dest, entry) in statics.iter() {
                    let cost = path.cost.saturating_add(entry.cost);
                    costs
                        .entry(dest)
                        .and_modify(|c| *c = (*c).min(cost))
                        .or_insert(cost);
                }
            }

            expected.insert(router.name().to_string(), costs);
        }

        expected
    }

    /// Differences between the routers' tables and [`Self::expected_costs`].
    pub fn verify_routes(&self) -> Vec<RouteMismatch> {
        let expected = self.expected_costs();
        let mut mismatches = Vec::new();

        for router in &self.routers {
            let want = &expected[router.name()];
            let table = router.routing_table();

            let mut dests: Vec<Address> = want.keys().copied().collect();
            dests.extend(table.iter().map(|(dest, _)| dest));
            dests.sort_unstable();
            dests.dedup();

            for dest in dests {
                let expected = want.get(&dest).copied();
                let actual = table.get_route(dest).map(|e| e.cost);
                if expected != actual {
                    mismatches.push(RouteMismatch {
                        router: router.name().to_string(),
                        destination: dest,
                        expected,
                        actual,
                    });
                }
            }
        }

        mismatches
    }

    pub fn report(&self) -> SimulationReport {
        let mut totals = StatsSnapshot::default();

        let routers = self
            .routers
            .iter()
            .map(|r| {
                let stats = r.stats().snapshot();
                totals.merge(&stats);
                RouterReport {
                    name: r.name().to_string(),
                    routes: r.routing_table().iter().map(|(d, e)| (d, *e)).collect(),
                    stats,
                }
            })
            .collect();

        let hosts = self
            .hosts
            .iter()
            .map(|h| {
                let stats = h.stats().snapshot();
                totals.merge(&stats);
                HostReport {
                    address: h.addr(),
                    delivered: h
                        .inbox()
                        .iter()
                        .map(|p| String::from_utf8_lossy(p.payload()).into_owned())
                        .collect(),
                    stats,
                }
            })
            .collect();

        SimulationReport {
            generated_at: Utc::now(),
            routers,
            hosts,
            totals,
            mismatches: self.verify_routes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InterfaceConfig, LinkConfig, RouterConfig, StaticRoute};
    use crate::network::Direction;

    #[test]
    fn test_from_config_wires_links() {
        let network = Network::from_config(&TopologyConfig::line(2)).unwrap();
        assert_eq!(network.links().len(), 3);
        assert_eq!(network.routers().len(), 2);

        // A frame put out by Host_1 arrives at R1's interface 0.
        network.send(1, 2, "x").unwrap();
        network.links()[0].transfer();
        let r1 = network.router("R1").unwrap();
        assert_eq!(r1.interface(0).unwrap().len(Direction::In), 1);
    }

    #[test]
    fn test_expected_costs_on_line() {
        let network = Network::from_config(&TopologyConfig::line(3)).unwrap();
        let expected = network.expected_costs();

        assert_eq!(expected["R1"][&1], 0);
        assert_eq!(expected["R1"][&2], 2);
        assert_eq!(expected["R2"][&1], 1);
        assert_eq!(expected["R2"][&2], 1);
        assert_eq!(expected["R3"][&1], 2);
    }

    #[test]
    fn test_before_convergence_mismatches_are_reported() {
        let network = Network::from_config(&TopologyConfig::line(2)).unwrap();
        let mismatches = network.verify_routes();

        assert!(mismatches.contains(&RouteMismatch {
            router: "R1".into(),
            destination: 2,
            expected: Some(1),
            actual: None,
        }));
    }

    #[test]
    fn test_expected_costs_take_cheapest_origin() {
        // A and B both reach destination 9 directly; C sits between them.
        let config = TopologyConfig {
            routers: vec![
                RouterConfig {
                    name: "A".into(),
                    interfaces: vec![InterfaceConfig { cost: 1 }],
                    routes: vec![StaticRoute { destination: 9, interface: 0, cost: 10 }],
                },
                RouterConfig {
                    name: "B".into(),
                    interfaces: vec![InterfaceConfig { cost: 1 }],
                    routes: vec![StaticRoute { destination: 9, interface: 0, cost: 1 }],
                },
                RouterConfig {
                    name: "C".into(),
                    interfaces: vec![InterfaceConfig { cost: 4 }, InterfaceConfig { cost: 2 }],
                    routes: vec![],
                },
            ],
            links: vec![
                LinkConfig {
                    a: EndpointConfig::Router { name: "A".into(), interface: 0 },
                    b: EndpointConfig::Router { name: "C".into(), interface: 0 },
                },
                LinkConfig {
                    a: EndpointConfig::Router { name: "C".into(), interface: 1 },
                    b: EndpointConfig::Router { name: "B".into(), interface: 0 },
                },
            ],
            ..Default::default()
        };

        let network = Network::from_config(&config).unwrap();
        let expected = network.expected_costs();
        assert_eq!(expected["C"][&9], 3);
        // A -> C -> B -> 9 is 1 + 2 + 1, cheaper than A's own static route.
        assert_eq!(expected["A"][&9], 4);
    }
}
