use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::ConnId;

/// Recipient selection for an outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Exactly the originating connection.
    Direct,
    /// Every registered connection except the originator.
    Spread,
    /// Every registered connection.
    Broadcast,
}

/// A raw frame read from a peer connection.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub origin: ConnId,
    pub line: String,
}

/// A serialized frame waiting for dispatch.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub origin: ConnId,
    pub line: String,
    pub target: Target,
}

/// Frames accepted from peers.
///
/// An unrecognized `type` tag or a missing required field fails
/// deserialization and the frame is discarded as malformed; extra fields are
/// ignored. `payload` and `value` are carried as opaque JSON so the broker
/// never interprets or normalizes them.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    #[serde(rename = "SUBMIT")]
    Submit {
        /// Client-chosen correlation id, echoed back in the SUBMIT_ACK.
        id: String,
        topic: String,
        payload: Value,
    },
    #[serde(rename = "BID")]
    Bid { id: String },
    #[serde(rename = "CANCEL")]
    Cancel { id: String },
    #[serde(rename = "JOB_SUCCESS")]
    JobSuccess { id: String, value: Value },
    #[serde(rename = "JOB_FAILURE")]
    JobFailure { id: String, reason: String },
}

/// Frames the broker originates. Worker results are never rebuilt from these
/// variants; they are forwarded verbatim as received.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum BrokerFrame {
    #[serde(rename = "SUBMIT_ACK")]
    SubmitAck {
        /// Server-assigned job id.
        id: String,
        #[serde(rename = "clientId")]
        client_id: String,
    },
    /// Re-emission of a submission under its server id, fanned out to every
    /// peer except the submitter.
    #[serde(rename = "SUBMIT")]
    Submit {
        id: String,
        topic: String,
        payload: Value,
    },
    #[serde(rename = "BID_ACK")]
    BidAck { id: String },
    #[serde(rename = "BID_REJECT")]
    BidReject { id: String },
    #[serde(rename = "JOB_FAILURE")]
    JobFailure { id: String, reason: String },
}
