use crate::network::{Direction, Interface};
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// A schedulable network node. Nodes talk to each other only through the
/// queues of their interfaces.
pub trait Node: Send + 'static {
    fn name(&self) -> String;

    fn interfaces(&self) -> &[Arc<Interface>];

    /// Handles at most one inbound frame per interface and returns how many
    /// were handled. Never blocks.
    fn step(&mut self) -> usize;

    /// Periodic work, e.g. route advertisements.
    fn on_tick(&mut self) {}

    /// Rung whenever a frame lands on any inbound queue of this node.
    fn doorbell(&self) -> Arc<Notify>;

    /// Frames still sitting in this node's queues, in either direction.
    fn pending_frames(&self) -> usize {
        self.interfaces()
            .iter()
            .map(|intf| intf.len(Direction::In) + intf.len(Direction::Out))
            .sum()
    }
}

/// Drives `node` until `token` is cancelled, then hands it back.
///
/// The task sleeps on the node's doorbell between bursts of work, and on the
/// tick timer when `tick` is set; cancellation is observed at both.
pub async fn run_node<N: Node>(mut node: N, tick: Option<Duration>, token: CancellationToken) -> N {
    let doorbell = node.doorbell();
    let mut ticker = tick.map(|period| {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    info!("{}: starting", node.name());

    loop {
        while !token.is_cancelled() && node.step() > 0 {}

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = doorbell.notified() => {}
            _ = next_tick(&mut ticker) => node.on_tick(),
        }
    }

    info!("{}: ending", node.name());
    node
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
