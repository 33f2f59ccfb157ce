//! Price fan-out registry.
//!
//! Owns the latest price per ticker and the set of live client senders.
//! All mutation goes through one mutex; fan-out snapshots the client list
//! under the lock and iterates outside it, so a client added or removed
//! mid-broadcast sees the prior or the next round, never a torn one.
//! Delivery is best-effort: a failing client is unregistered without
//! aborting delivery to the rest.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::model::tick::{round_to_cents, Tick};
use crate::price_store::PriceSink;
use crate::protocol::ServerMessage;

pub type ClientId = u64;
pub type ClientSender = mpsc::UnboundedSender<ServerMessage>;

struct Inner {
    prices: HashMap<String, f64>,
    clients: HashMap<ClientId, ClientSender>,
    next_id: ClientId,
}

pub struct Broadcaster {
    inner: Mutex<Inner>,
    sink: Option<Arc<dyn PriceSink>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_sink(None)
    }

    pub fn with_sink(sink: Option<Arc<dyn PriceSink>>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                prices: HashMap::new(),
                clients: HashMap::new(),
                next_id: 1,
            }),
            sink,
        }
    }

    fn locked(&self) -> Result<MutexGuard<'_, Inner>, AppError> {
        self.inner
            .lock()
            .map_err(|_| AppError::Internal("broadcaster lock poisoned".to_string()))
    }

    /// Add a client and send it one `price_update` per known ticker as an
    /// initial snapshot. If the snapshot send fails the client is dropped
    /// immediately, without retry.
    pub fn register(&self, sender: ClientSender) -> Result<ClientId, AppError> {
        let (id, snapshot, total) = {
            let mut inner = self.locked()?;
            let id = inner.next_id;
            inner.next_id += 1;
            inner.clients.insert(id, sender.clone());
            let mut snapshot: Vec<(String, f64)> = inner
                .prices
                .iter()
                .map(|(t, p)| (t.clone(), *p))
                .collect();
            snapshot.sort_by(|a, b| a.0.cmp(&b.0));
            (id, snapshot, inner.clients.len())
        };
        tracing::info!(client_id = id, total_clients = total, "Client connected");

        let now = Utc::now();
        for (ticker, price) in snapshot {
            let msg = ServerMessage::PriceUpdate {
                ticker,
                price: round_to_cents(price),
                timestamp: now,
            };
            if sender.send(msg).is_err() {
                tracing::warn!(client_id = id, "Initial snapshot send failed, dropping client");
                self.unregister(id)?;
                break;
            }
        }
        Ok(id)
    }

    /// Remove a client. Idempotent.
    pub fn unregister(&self, id: ClientId) -> Result<(), AppError> {
        let removed = {
            let mut inner = self.locked()?;
            let removed = inner.clients.remove(&id).is_some();
            (removed).then_some(inner.clients.len())
        };
        if let Some(total) = removed {
            tracing::info!(client_id = id, total_clients = total, "Client disconnected");
        }
        Ok(())
    }

    /// Reply for a `subscribe` request: the current price for the ticker, or
    /// `None` when the ticker is not tracked. Subscribing does not narrow
    /// what gets broadcast; every registered client keeps receiving every
    /// ticker.
    pub fn subscribe(&self, ticker: &str) -> Result<Option<ServerMessage>, AppError> {
        let price = self.locked()?.prices.get(ticker).copied();
        Ok(price.map(|price| ServerMessage::SubscriptionConfirmed {
            ticker: ticker.to_string(),
            price: round_to_cents(price),
            timestamp: Utc::now(),
        }))
    }

    /// Record the tick as the latest price, offer it to the persistence
    /// sink, then fan it out to every registered client. Clients whose send
    /// fails are unregistered; the rest still get the message.
    pub fn broadcast(&self, tick: &Tick) -> Result<(), AppError> {
        let targets: Vec<(ClientId, ClientSender)> = {
            let mut inner = self.locked()?;
            inner.prices.insert(tick.ticker.clone(), tick.price);
            inner
                .clients
                .iter()
                .map(|(id, sender)| (*id, sender.clone()))
                .collect()
        };

        if let Some(sink) = &self.sink {
            sink.offer(tick);
        }

        let msg = ServerMessage::PriceUpdate {
            ticker: tick.ticker.clone(),
            price: round_to_cents(tick.price),
            timestamp: tick.timestamp,
        };
        for (id, sender) in targets {
            if sender.send(msg.clone()).is_err() {
                tracing::warn!(client_id = id, "Send failed, unregistering client");
                self.unregister(id)?;
            }
        }
        Ok(())
    }

    pub fn latest_price(&self, ticker: &str) -> Result<Option<f64>, AppError> {
        Ok(self.locked()?.prices.get(ticker).copied())
    }

    pub fn client_count(&self) -> Result<usize, AppError> {
        Ok(self.locked()?.clients.len())
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
