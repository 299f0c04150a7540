//! Broadcast gateway
//! Fans server events out to one client or to every connected client.
//!
//! - `Broadcaster`: the seam the workspace talks to
//! - `ClientRegistry`: per-connection outbound queues
//! - `server`: the WebSocket transport feeding the registry

pub mod server;

use crate::models::{ClientId, ServerEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, Receiver, Sender};

/// Events a client may have queued before it counts as stalled and is dropped
pub const CLIENT_QUEUE_CAPACITY: usize = 1024;

pub trait Broadcaster: Send + Sync {
    /// Deliver to a single client; silently dropped if it has gone away
    fn send_to(&self, client: ClientId, event: ServerEvent);

    /// Deliver to every connected client
    fn broadcast(&self, event: ServerEvent);
}

/// Connected clients and their outbound queues
pub struct ClientRegistry {
    clients: Mutex<HashMap<ClientId, Sender<ServerEvent>>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::with_capacity(CLIENT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ClientRegistry {
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    /// Register a new connection and hand back the queue its writer drains
    pub fn connect(&self) -> (ClientId, Receiver<ServerEvent>) {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.capacity);
        self.clients.lock().insert(id, tx);
        log::info!("{id} connected ({} total)", self.len());
        (id, rx)
    }

    pub fn disconnect(&self, client: ClientId) {
        if self.clients.lock().remove(&client).is_some() {
            log::info!("{client} disconnected ({} left)", self.len());
        }
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Queue one event; `false` means the client is gone or stalled and must be dropped
fn enqueue(client: ClientId, tx: &Sender<ServerEvent>, event: ServerEvent) -> bool {
    match tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            log::warn!("{client} is not keeping up; dropping it at {}", event.name());
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

impl Broadcaster for ClientRegistry {
    fn send_to(&self, client: ClientId, event: ServerEvent) {
        let mut clients = self.clients.lock();
        let keep = match clients.get(&client) {
            Some(tx) => enqueue(client, tx, event),
            None => {
                log::debug!("Dropping {} for unknown {client}", event.name());
                true
            }
        };
        if !keep {
            clients.remove(&client);
        }
    }

    fn broadcast(&self, event: ServerEvent) {
        let mut clients = self.clients.lock();
        clients.retain(|&client, tx| enqueue(client, tx, event.clone()));
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    #[test]
    fn send_to_reaches_only_the_target() {
        let registry = ClientRegistry::new();
        let (a, mut rx_a) = registry.connect();
        let (_b, mut rx_b) = registry.connect();

        registry.send_to(a, ServerEvent::error("only a"));

        assert_eq!(rx_a.try_recv().unwrap(), ServerEvent::error("only a"));
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn broadcast_reaches_everyone() {
        let registry = ClientRegistry::new();
        let (_a, mut rx_a) = registry.connect();
        let (_b, mut rx_b) = registry.connect();

        registry.broadcast(ServerEvent::TerminalOutput("ls\r\n".into()));

        assert!(matches!(rx_a.try_recv(), Ok(ServerEvent::TerminalOutput(_))));
        assert!(matches!(rx_b.try_recv(), Ok(ServerEvent::TerminalOutput(_))));
    }

    #[test]
    fn closed_queues_are_pruned() {
        let registry = ClientRegistry::new();
        let (_a, rx_a) = registry.connect();
        let (_b, _rx_b) = registry.connect();
        drop(rx_a);

        registry.broadcast(ServerEvent::FileList(Vec::new()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn stalled_clients_are_dropped_once_their_queue_fills() {
        let registry = ClientRegistry::with_capacity(4);
        let (_stalled, mut stalled_rx) = registry.connect();
        let (_reader, mut reader_rx) = registry.connect();

        for _ in 0..10 {
            registry.broadcast(ServerEvent::TerminalOutput("y\n".into()));
            assert!(reader_rx.try_recv().is_ok());
        }

        assert_eq!(registry.len(), 1);
        let mut queued = 0;
        while stalled_rx.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, 4);
        assert_eq!(stalled_rx.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn send_to_a_stalled_client_drops_it() {
        let registry = ClientRegistry::with_capacity(1);
        let (a, _rx_a) = registry.connect();
        registry.send_to(a, ServerEvent::error("first"));
        registry.send_to(a, ServerEvent::error("second"));
        assert!(registry.is_empty());
    }

    #[test]
    fn client_ids_are_unique() {
        let registry = ClientRegistry::new();
        let (a, _rx_a) = registry.connect();
        registry.disconnect(a);
        let (b, _rx_b) = registry.connect();
        assert_ne!(a, b);
        assert!(!registry.is_empty());
    }
}
