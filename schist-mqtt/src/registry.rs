/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

// Internal module tracking which inbound packets the connection is waiting for, and what to do
// when each one arrives.

use crate::config::{ConnectedHandler, PublishEventHandler, UnsubscribeHandler};
use crate::error::{SchistError, SchistResult};
use crate::mqtt::*;

use log::*;

use std::collections::HashMap;
use std::fmt;

/// Identifies one awaited inbound packet.  Connack uses packet id 0.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct PendingKey {
    pub(crate) packet_type: PacketType,
    pub(crate) packet_id: u16,
}

impl PendingKey {
    pub(crate) fn new(packet_type: PacketType, packet_id: u16) -> Self {
        PendingKey {
            packet_type,
            packet_id
        }
    }

    // expectations created by our own requests, as opposed to the receiver side of an
    // inbound qos 2 publish, which lives in the broker's packet id space
    fn is_outbound_operation(&self) -> bool {
        matches!(self.packet_type, PacketType::Puback | PacketType::Pubrec | PacketType::Pubcomp | PacketType::Suback | PacketType::Unsuback)
    }
}

impl fmt::Display for PendingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.packet_type, self.packet_id)
    }
}

/// Everything a publish handshake needs to finish, owned for the handshake's whole lifetime.
/// Moves from one continuation to the next, so it is released exactly once.
pub(crate) struct PublishContext {
    pub(crate) topic: String,
    pub(crate) message: Vec<u8>,
    pub(crate) qos: QualityOfService,
    pub(crate) packet_id: u16,
    pub(crate) retain: bool,
    pub(crate) callback: Option<PublishEventHandler>,
}

impl PublishContext {

    // owned copy of an inbound publish; the decoded packet may be dropped right after
    pub(crate) fn from_inbound(publish: &PublishPacket, callback: Option<PublishEventHandler>) -> Self {
        PublishContext {
            topic: publish.topic.clone(),
            message: publish.payload_bytes().to_vec(),
            qos: publish.qos,
            packet_id: publish.packet_id,
            retain: publish.retain,
            callback,
        }
    }
}

impl fmt::Debug for PublishContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublishContext {{ packet_id: {}, topic: \"{}\", message: <{} Bytes>, qos: {}, retain: {} }}",
            self.packet_id, self.topic, self.message.len(), self.qos, self.retain)
    }
}

/// What to run when an awaited packet arrives.
pub(crate) enum Continuation {

    // CONNACK for our CONNECT
    Connack {
        on_connected: Option<ConnectedHandler>,
    },

    // PUBACK for a qos 1 publish
    PublishAck(PublishContext),

    // PUBREC for a qos 2 publish
    PublishReceived(PublishContext),

    // PUBCOMP after we sent PUBREL
    PublishComplete(PublishContext),

    // PUBREL for an inbound qos 2 publish we have PUBREC'd
    PublishRelease(PublishContext),

    SubscribeAck {
        topic: String,
    },

    UnsubscribeAck {
        topic: String,
        callback: Option<UnsubscribeHandler>,
    },
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Continuation::Connack { .. } => { write!(f, "Connack") }
            Continuation::PublishAck(context) => { write!(f, "PublishAck({:?})", context) }
            Continuation::PublishReceived(context) => { write!(f, "PublishReceived({:?})", context) }
            Continuation::PublishComplete(context) => { write!(f, "PublishComplete({:?})", context) }
            Continuation::PublishRelease(context) => { write!(f, "PublishRelease({:?})", context) }
            Continuation::SubscribeAck { topic } => { write!(f, "SubscribeAck(\"{}\")", topic) }
            Continuation::UnsubscribeAck { topic, .. } => { write!(f, "UnsubscribeAck(\"{}\")", topic) }
        }
    }
}

/// At most one continuation per (packet type, packet id).
#[derive(Default)]
pub(crate) struct PendingRegistry {
    entries: HashMap<PendingKey, Continuation>,
}

impl PendingRegistry {

    pub(crate) fn new() -> Self {
        PendingRegistry {
            ..Default::default()
        }
    }

    pub(crate) fn expect(&mut self, packet_type: PacketType, packet_id: u16, continuation: Continuation) -> SchistResult<()> {
        let key = PendingKey::new(packet_type, packet_id);
        if self.entries.contains_key(&key) {
            error!("PendingRegistry::expect - an expectation for {} already exists", key);
            return Err(SchistError::new_internal_state_error("duplicate pending expectation"));
        }

        debug!("PendingRegistry::expect - awaiting {}: {:?}", key, continuation);
        self.entries.insert(key, continuation);

        Ok(())
    }

    pub(crate) fn take(&mut self, packet_type: PacketType, packet_id: u16) -> Option<Continuation> {
        self.entries.remove(&PendingKey::new(packet_type, packet_id))
    }

    pub(crate) fn get(&self, packet_type: PacketType, packet_id: u16) -> Option<&Continuation> {
        self.entries.get(&PendingKey::new(packet_type, packet_id))
    }

    pub(crate) fn contains(&self, packet_type: PacketType, packet_id: u16) -> bool {
        self.entries.contains_key(&PendingKey::new(packet_type, packet_id))
    }

    /// Whether one of our own outstanding requests is using the packet id
    pub(crate) fn contains_packet_id(&self, packet_id: u16) -> bool {
        self.entries.keys().any(|key| key.packet_id == packet_id && key.is_outbound_operation())
    }

    pub(crate) fn outbound_in_flight(&self) -> usize {
        self.entries.keys().filter(|key| key.is_outbound_operation()).count()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry, ordered by packet id so teardown logs are stable
    pub(crate) fn drain(&mut self) -> Vec<(PendingKey, Continuation)> {
        let mut drained : Vec<(PendingKey, Continuation)> = self.entries.drain().collect();
        drained.sort_by_key(|(key, _)| key.packet_id);
        drained
    }
}
