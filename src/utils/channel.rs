use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::routing::types::RoutingConfiguration;

/// Single slot: an unconsumed snapshot blocks the next handoff instead of queueing.
const HANDOFF_CAPACITY: usize = 1;

pub fn run() -> (Sender<RoutingConfiguration>, Receiver<RoutingConfiguration>) {
    mpsc::channel(HANDOFF_CAPACITY)
}
