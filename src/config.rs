use crate::network::packet::MAX_ADDRESS;
use crate::router::NoRoutePolicy;
use crate::Address;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Per-queue capacity of every interface; 0 means unbounded.
    #[serde(default)]
    pub queue_capacity: usize,
    /// Period of the unsolicited route advertisements in the async driver.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    #[serde(default)]
    pub no_route_policy: NoRoutePolicy,
    #[serde(default)]
    pub split_horizon: bool,
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
    #[serde(default)]
    pub routers: Vec<RouterConfig>,
    #[serde(default)]
    pub links: Vec<LinkConfig>,
    #[serde(default)]
    pub traffic: Vec<TrafficConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    pub address: Address,
    #[serde(default)]
    pub cost: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    pub name: String,
    pub interfaces: Vec<InterfaceConfig>,
    #[serde(default)]
    pub routes: Vec<StaticRoute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub cost: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticRoute {
    pub destination: Address,
    pub interface: usize,
    pub cost: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointConfig {
    Host(Address),
    Router { name: String, interface: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub a: EndpointConfig,
    pub b: EndpointConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficConfig {
    pub from: Address,
    pub to: Address,
    pub payload: String,
}

fn default_update_interval_ms() -> u64 {
    200
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 0,
            update_interval_ms: default_update_interval_ms(),
            no_route_policy: NoRoutePolicy::default(),
            split_horizon: false,
            hosts: vec![],
            routers: vec![],
            links: vec![],
            traffic: vec![],
        }
    }
}

impl TopologyConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading topology {}", path.display()))?;
        let config: TopologyConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing topology {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Host 1 - R1 - R2 - ... - Rn - Host 2.
    ///
    /// Router-to-router links cost 1 and host links cost 0. R1 and Rn start out
    /// knowing only their attached host; one message is sent from each host.
    pub fn line(routers: usize) -> Self {
        let routers = routers.max(1);
        let mut config = Self {
            hosts: vec![
                HostConfig { address: 1, cost: 0 },
                HostConfig { address: 2, cost: 0 },
            ],
            ..Default::default()
        };

        for n in 1..=routers {
            let left_cost = if n == 1 { 0 } else { 1 };
            let right_cost = if n == routers { 0 } else { 1 };

            let mut routes = Vec::new();
            if n == 1 {
                routes.push(StaticRoute { destination: 1, interface: 0, cost: 0 });
            }
            if n == routers {
                routes.push(StaticRoute { destination: 2, interface: 1, cost: 0 });
            }

            config.routers.push(RouterConfig {
                name: format!("R{n}"),
                interfaces: vec![InterfaceConfig { cost: left_cost }, InterfaceConfig { cost: right_cost }],
                routes,
            });
        }

        let router = |n: usize, interface: usize| EndpointConfig::Router {
            name: format!("R{n}"),
            interface,
        };

        config.links.push(LinkConfig {
            a: EndpointConfig::Host(1),
            b: router(1, 0),
        });
        for n in 1..routers {
            config.links.push(LinkConfig {
                a: router(n, 1),
                b: router(n + 1, 0),
            });
        }
        config.links.push(LinkConfig {
            a: router(routers, 1),
            b: EndpointConfig::Host(2),
        });

        config.traffic = vec![
            TrafficConfig { from: 1, to: 2, payload: "hello from 1".into() },
            TrafficConfig { from: 2, to: 1, payload: "hello from 2".into() },
        ];

        config
    }

    pub fn validate(&self) -> Result<()> {
        let mut hosts = HashSet::new();
        for host in &self.hosts {
            if host.address > MAX_ADDRESS {
                bail!("host address {} does not fit in 5 digits", host.address);
            }
            if !hosts.insert(host.address) {
                bail!("duplicate host {}", host.address);
            }
        }

        let mut routers = HashMap::new();
        for router in &self.routers {
            if routers.insert(router.name.as_str(), router.interfaces.len()).is_some() {
                bail!("duplicate router {}", router.name);
            }
            for route in &router.routes {
                if route.destination > MAX_ADDRESS {
                    bail!("router {}: destination {} does not fit in 5 digits", router.name, route.destination);
                }
                if route.interface >= router.interfaces.len() {
                    bail!(
                        "router {}: route to {} uses missing interface {}",
                        router.name,
                        route.destination,
                        route.interface
                    );
                }
            }
        }

        if let NoRoutePolicy::DefaultRoute { interface } = self.no_route_policy {
            if let Some(router) = self.routers.iter().find(|r| interface >= r.interfaces.len()) {
                bail!("router {} has no interface {} for the default route", router.name, interface);
            }
        }

        let mut wired = HashSet::new();
        for link in &self.links {
            for endpoint in [&link.a, &link.b] {
                match endpoint {
                    EndpointConfig::Host(addr) if !hosts.contains(addr) => {
                        bail!("link references unknown host {}", addr)
                    }
                    EndpointConfig::Router { name, interface } => match routers.get(name.as_str()) {
                        None => bail!("link references unknown router {}", name),
                        Some(&count) if *interface >= count => {
                            bail!("router {} has no interface {}", name, interface)
                        }
                        _ => {}
                    },
                    _ => {}
                }
                if !wired.insert(endpoint.clone()) {
                    bail!("endpoint {:?} is wired more than once", endpoint);
                }
            }
        }

        for flow in &self.traffic {
            if !hosts.contains(&flow.from) {
                bail!("traffic from unknown host {}", flow.from);
            }
        }

        Ok(())
    }
}
