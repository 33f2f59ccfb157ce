//! JSON wire messages exchanged over the price feed websocket.
//!
//! Every frame is a JSON object tagged by a `type` field. Malformed payloads
//! are dropped by the receiver with a logged warning; the connection stays
//! open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-to-client frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    PriceUpdate {
        ticker: String,
        price: f64,
        timestamp: DateTime<Utc>,
    },
    SubscriptionConfirmed {
        ticker: String,
        price: f64,
        timestamp: DateTime<Utc>,
    },
}

/// Client-to-server frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { ticker: String },
}
