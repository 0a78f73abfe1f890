/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

// Internal module that implements the client side of MQTT 3.1.1: outbound requests, the
// QoS 1/2 handshakes in both directions, and routing of everything the broker sends back.

use crate::config::*;
use crate::decode::*;
use crate::encode::*;
use crate::error::{SchistError, SchistResult};
use crate::mqtt::*;
use crate::mqtt::connect::validate_connect_packet_outbound;
use crate::mqtt::publish::{validate_publish_packet_inbound, validate_publish_packet_outbound};
use crate::mqtt::subscribe::validate_subscribe_packet_outbound;
use crate::mqtt::unsubscribe::validate_unsubscribe_packet_outbound;
use crate::mqtt::utils::{mqtt_packet_to_packet_type, mqtt_packet_to_str};
use crate::packet_id::PacketIdAllocator;
use crate::registry::*;
use crate::subscription::SubscriptionTable;
use crate::transport::Transport;

use log::*;

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

/// A connection shared between the thread feeding it inbound bytes and any other threads
/// issuing operations.
pub type SharedConnection = Arc<Mutex<MqttConnection>>;

/// Lifecycle state of an [`MqttConnection`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConnectionState {

    /// CONNECT has been written; waiting on the broker's CONNACK.  Outbound operations are
    /// already permitted.
    PendingConnack,

    /// The broker accepted the connection
    Connected,

    /// The connection was disconnected or hit a session-fatal error.  Every operation fails
    /// with `ConnectionClosed`.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::PendingConnack => { write!(f, "PendingConnack") }
            ConnectionState::Connected => { write!(f, "Connected") }
            ConnectionState::Closed => { write!(f, "Closed") }
        }
    }
}

/// A single MQTT 3.1.1 client session over a caller-supplied [`Transport`].
///
/// The connection never reads from the network itself.  The host feeds it inbound bytes with
/// [`handle_incoming_bytes`](MqttConnection::handle_incoming_bytes) and every callback runs
/// synchronously on that call's stack, receiving the connection so it can issue further
/// operations.
pub struct MqttConnection {
    options: ConnectOptions,

    state: ConnectionState,

    session_present: bool,

    // dropped on close so the host sees the write side end
    transport: Option<Box<dyn Transport + Send>>,

    packet_ids: PacketIdAllocator,

    pending: PendingRegistry,

    subscriptions: SubscriptionTable,

    listeners: ConnectionListeners,

    decoder: Decoder,
}

impl fmt::Debug for MqttConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MqttConnection {{ client_id: \"{}\", state: {}, session_present: {}, pending: {} }}",
            self.options.client_id(), self.state, self.session_present, self.pending.len())
    }
}

impl MqttConnection {

    /// Validates the options, writes a CONNECT packet and starts waiting for the CONNACK.
    ///
    /// Invalid options invoke the error listener and fail with `ConfigurationError` before
    /// anything is written.
    pub fn connect(options: ConnectOptions, transport: Box<dyn Transport + Send>, listeners: ConnectionListeners) -> SchistResult<MqttConnection> {
        if let Err(error) = validate_connect_options(&options) {
            if let Some(on_error) = &listeners.on_error {
                on_error(&error);
            }

            return Err(error);
        }

        let connect = options.to_connect_packet();
        validate_connect_packet_outbound(&connect)?;

        let on_connected = listeners.on_connected.clone();
        let mut connection = MqttConnection {
            options,
            state: ConnectionState::PendingConnack,
            session_present: false,
            transport: Some(transport),
            packet_ids: PacketIdAllocator::new(),
            pending: PendingRegistry::new(),
            subscriptions: SubscriptionTable::new(),
            listeners,
            decoder: Decoder::new(),
        };

        info!("connect - connecting as client \"{}\"", connection.options.client_id());
        connection.write_packet(&MqttPacket::Connect(connect))?;
        connection.pending.expect(PacketType::Connack, 0, Continuation::Connack { on_connected })?;

        Ok(connection)
    }

    /// Publishes a retained message.  Returns the packet id used, or 0 for QoS 0.
    ///
    /// The callback runs once the handshake for the requested QoS completes: immediately after
    /// the write for QoS 0, on PUBACK for QoS 1 and on PUBCOMP for QoS 2.
    pub fn publish(&mut self, topic: &str, message: &[u8], qos: QualityOfService, callback: Option<PublishEventHandler>) -> SchistResult<u16> {
        let packet = PublishPacket {
            topic: topic.to_string(),
            qos,
            retain: true,
            payload: Some(message.to_vec()),
            ..Default::default()
        };

        self.publish_packet(packet, callback)
    }

    /// Publishes a caller-built packet.  Any packet id in the packet is replaced.
    pub fn publish_packet(&mut self, mut packet: PublishPacket, callback: Option<PublishEventHandler>) -> SchistResult<u16> {
        self.check_open("publish")?;

        packet.packet_id = 0;
        if packet.qos != QualityOfService::AtMostOnce {
            self.check_in_flight_limit()?;
            packet.packet_id = self.acquire_packet_id()?;
        }

        validate_publish_packet_outbound(&packet)?;

        let packet_id = packet.packet_id;
        let mqtt_packet = MqttPacket::Publish(packet);
        self.write_packet(&mqtt_packet)?;

        let MqttPacket::Publish(publish) = mqtt_packet else {
            return Err(SchistError::new_internal_state_error("publish packet variant changed during send"));
        };

        let context = PublishContext {
            topic: publish.topic,
            message: publish.payload.unwrap_or_default(),
            qos: publish.qos,
            packet_id,
            retain: publish.retain,
            callback,
        };

        match context.qos {
            QualityOfService::AtMostOnce => {
                self.complete_publish(context);
            }
            QualityOfService::AtLeastOnce => {
                self.pending.expect(PacketType::Puback, packet_id, Continuation::PublishAck(context))?;
            }
            QualityOfService::ExactlyOnce => {
                self.pending.expect(PacketType::Pubrec, packet_id, Continuation::PublishReceived(context))?;
            }
        }

        Ok(packet_id)
    }

    /// Subscribes to a single topic filter.  Returns the packet id used.
    ///
    /// The callback receives inbound publishes whose topic exactly equals `topic`.
    pub fn subscribe(&mut self, topic: &str, qos: QualityOfService, callback: Option<PublishEventHandler>) -> SchistResult<u16> {
        self.check_open("subscribe")?;
        self.check_in_flight_limit()?;

        let packet = SubscribePacket {
            packet_id: self.acquire_packet_id()?,
            subscriptions: vec![ Subscription::new(topic, qos) ],
        };

        validate_subscribe_packet_outbound(&packet)?;

        let packet_id = packet.packet_id;
        self.write_packet(&MqttPacket::Subscribe(packet))?;

        self.subscriptions.mark_pending(topic, qos, callback);
        self.pending.expect(PacketType::Suback, packet_id, Continuation::SubscribeAck { topic: topic.to_string() })?;

        Ok(packet_id)
    }

    /// Unsubscribes from a single topic filter.  Returns the packet id used.  The callback runs
    /// when the broker's UNSUBACK arrives.
    pub fn unsubscribe(&mut self, topic: &str, callback: Option<UnsubscribeHandler>) -> SchistResult<u16> {
        self.check_open("unsubscribe")?;
        self.check_in_flight_limit()?;

        let packet = UnsubscribePacket {
            packet_id: self.acquire_packet_id()?,
            topic_filters: vec![ topic.to_string() ],
        };

        validate_unsubscribe_packet_outbound(&packet)?;

        let packet_id = packet.packet_id;
        self.write_packet(&MqttPacket::Unsubscribe(packet))?;

        self.pending.expect(PacketType::Unsuback, packet_id, Continuation::UnsubscribeAck { topic: topic.to_string(), callback })?;

        Ok(packet_id)
    }

    /// Writes a PINGREQ.  The PINGRESP is only logged.
    pub fn ping(&mut self) -> SchistResult<()> {
        self.check_open("ping")?;

        self.write_packet(&MqttPacket::Pingreq(PingreqPacket {}))
    }

    /// Writes a DISCONNECT, releases every pending expectation without invoking its callback,
    /// and closes the connection.  The connection is closed even if the write fails.
    pub fn disconnect(&mut self) -> SchistResult<()> {
        self.check_open("disconnect")?;

        info!("disconnect - user-initiated disconnect");
        let result = self.write_packet(&MqttPacket::Disconnect(DisconnectPacket {}));
        self.close(&SchistError::new_connection_closed("user-initiated disconnect"));

        result
    }

    /// Acknowledges an inbound QoS 1 publish
    pub fn send_puback(&mut self, packet_id: u16) -> SchistResult<()> {
        self.check_open("send_puback")?;

        self.write_packet(&MqttPacket::Puback(PubackPacket { packet_id }))
    }

    /// Performs the first receiver step of an inbound QoS 2 publish: keeps an owned copy of the
    /// message, starts waiting for the PUBREL and writes the PUBREC.  The callback runs with the
    /// copy once the PUBREL arrives and the PUBCOMP has been written.
    ///
    /// If the PUBREC cannot be written, the PUBREL expectation is removed again.
    pub fn send_pubrec(&mut self, packet_id: u16, callback: Option<PublishEventHandler>, publish: &PublishPacket) -> SchistResult<()> {
        self.check_open("send_pubrec")?;

        let context = PublishContext::from_inbound(publish, callback);
        self.pending.expect(PacketType::Pubrel, packet_id, Continuation::PublishRelease(context))?;

        if let Err(error) = self.write_packet(&MqttPacket::Pubrec(PubrecPacket { packet_id })) {
            self.pending.take(PacketType::Pubrel, packet_id);
            return Err(error);
        }

        Ok(())
    }

    /// Feeds bytes read from the network.  Every complete packet is handled before this returns;
    /// partial packets are buffered until the rest arrives.
    ///
    /// Malformed input is session-fatal.
    pub fn handle_incoming_bytes(&mut self, bytes: &[u8]) -> SchistResult<()> {
        self.check_open("handle_incoming_bytes")?;

        debug!("handle_incoming_bytes - received {} bytes", bytes.len());
        let mut decoded_packets = VecDeque::new();
        let mut decoding_context = DecodingContext {
            maximum_packet_size: self.options.maximum_inbound_packet_size,
            decoded_packets: &mut decoded_packets
        };

        if let Err(error) = self.decoder.decode_bytes(bytes, &mut decoding_context) {
            error!("handle_incoming_bytes - decode failure");
            return self.fail_session(error);
        }

        for packet in decoded_packets {
            if self.state == ConnectionState::Closed {
                debug!("handle_incoming_bytes - connection closed by a callback; dropping remaining packets");
                break;
            }

            self.handle_packet(*packet)?;
        }

        Ok(())
    }

    /// Routes one decoded inbound packet
    pub fn handle_packet(&mut self, packet: MqttPacket) -> SchistResult<()> {
        self.check_open("handle_packet")?;

        if self.state == ConnectionState::PendingConnack && !matches!(packet, MqttPacket::Connack(_)) {
            error!("handle_packet - {} received before CONNACK", mqtt_packet_to_str(&packet));
            return self.fail_session(SchistError::new_protocol_error("packet received before connack"));
        }

        match packet {
            MqttPacket::Connack(connack) => { self.handle_connack(connack) }
            MqttPacket::Publish(publish) => { self.handle_publish(publish) }
            MqttPacket::Puback(puback) => { self.handle_ack(PacketType::Puback, puback.packet_id) }
            MqttPacket::Pubrec(pubrec) => { self.handle_ack(PacketType::Pubrec, pubrec.packet_id) }
            MqttPacket::Pubrel(pubrel) => { self.handle_ack(PacketType::Pubrel, pubrel.packet_id) }
            MqttPacket::Pubcomp(pubcomp) => { self.handle_ack(PacketType::Pubcomp, pubcomp.packet_id) }
            MqttPacket::Suback(suback) => { self.handle_suback(suback) }
            MqttPacket::Unsuback(unsuback) => { self.handle_ack(PacketType::Unsuback, unsuback.packet_id) }
            MqttPacket::Pingresp(_) => {
                debug!("handle_packet - PINGRESP received");
                Ok(())
            }
            _ => {
                let packet_type = mqtt_packet_to_packet_type(&packet);
                error!("handle_packet - invalid packet type for client received: {}", packet_type);
                self.fail_session(SchistError::new_protocol_error(format!("client received a {} packet", packet_type)))
            }
        }
    }

    /// Removes the expectation for (packet type, packet id) and runs its continuation.
    /// Returns false, after logging a warning, if nothing was waiting for that packet.
    pub fn dispatch_inbound(&mut self, packet_type: PacketType, packet_id: u16) -> bool {
        match self.pending.take(packet_type, packet_id) {
            Some(continuation) => {
                debug!("dispatch_inbound - ({}, {}) matched {:?}", packet_type, packet_id, continuation);
                self.run_continuation(continuation);
                true
            }
            None => {
                warn!("dispatch_inbound - no pending expectation for ({}, {}); ignoring", packet_type, packet_id);
                false
            }
        }
    }

    /// Releases every pending expectation without invoking any callback and clears the pending
    /// flag of every unacknowledged subscribe.  Returns the number of expectations released.
    pub fn cancel_all(&mut self, reason: &SchistError) -> usize {
        if self.pending.is_empty() {
            debug!("cancel_all - nothing pending");
        }

        let released = self.pending.drain();
        for (key, continuation) in &released {
            info!("cancel_all - releasing {} {:?}: {}", key, continuation, reason);
        }

        self.subscriptions.clear_all_pending();

        released.len()
    }

    /// Closes the connection without notifying the error listener.  Pending expectations are
    /// released as in [`cancel_all`](MqttConnection::cancel_all).  Does nothing if already closed.
    pub fn close(&mut self, reason: &SchistError) {
        if self.state == ConnectionState::Closed {
            return;
        }

        info!("close - closing connection: {}", reason);
        self.cancel_all(reason);
        self.decoder.reset_for_new_connection();
        self.transport = None;
        self.state = ConnectionState::Closed;
    }

    /// Handles a session-fatal error: notifies the error listener, closes the connection and
    /// hands the error back.
    pub fn fail_session(&mut self, error: SchistError) -> SchistResult<()> {
        if self.state == ConnectionState::Closed {
            return Err(error);
        }

        error!("fail_session - session-fatal error: {}", error);
        if let Some(on_error) = self.listeners.on_error.clone() {
            on_error(&error);
        }

        self.close(&error);

        Err(error)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Session present flag of the accepted CONNACK; false before the connection is accepted
    pub fn session_present(&self) -> bool {
        self.session_present
    }

    /// Options the connection was created with
    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    /// Whether a subscribe to `topic` has been written but not yet acknowledged
    pub fn is_subscription_pending(&self, topic: &str) -> bool {
        self.subscriptions.is_pending(topic)
    }

    /// Number of inbound packets the connection is currently waiting for
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn check_open(&self, function_name: &str) -> SchistResult<()> {
        if self.state == ConnectionState::Closed {
            error!("{} - connection is closed", function_name);
            return Err(SchistError::new_connection_closed("operation attempted on a closed connection"));
        }

        Ok(())
    }

    fn check_in_flight_limit(&self) -> SchistResult<()> {
        if let Some(limit) = self.options.maximum_in_flight {
            if self.pending.outbound_in_flight() >= limit {
                warn!("check_in_flight_limit - {} operations already awaiting acknowledgement", limit);
                return Err(SchistError::new_in_flight_limit_exceeded(limit));
            }
        }

        Ok(())
    }

    // skips ids still bound to one of our own outstanding requests
    fn acquire_packet_id(&mut self) -> SchistResult<u16> {
        for _ in 0..u16::MAX {
            let packet_id = self.packet_ids.next_id();
            if !self.pending.contains_packet_id(packet_id) {
                return Ok(packet_id);
            }
        }

        error!("acquire_packet_id - every packet id is bound to an outstanding operation");
        Err(SchistError::new_internal_state_error("packet id space exhausted"))
    }

    fn write_packet(&mut self, packet: &MqttPacket) -> SchistResult<()> {
        let buffer = encode_packet(packet)?;

        let Some(transport) = self.transport.as_mut() else {
            return Err(SchistError::new_connection_closed("transport already released"));
        };

        if let Err(error) = transport.write(buffer) {
            error!("write_packet - failed to write {}: {}", mqtt_packet_to_str(packet), error);
            return Err(error);
        }

        Ok(())
    }

    fn handle_connack(&mut self, connack: ConnackPacket) -> SchistResult<()> {
        info!("handle_connack - processing CONNACK packet");

        if self.state != ConnectionState::PendingConnack {
            error!("handle_connack - invalid state to receive a connack: {}", self.state);
            return self.fail_session(SchistError::new_protocol_error("invalid state for connack receipt"));
        }

        if !connack.return_code.is_success() {
            error!("handle_connack - connection rejected with return code {}", connack.return_code);
            return self.fail_session(SchistError::new_connection_refused(connack.return_code));
        }

        self.state = ConnectionState::Connected;
        self.session_present = connack.session_present;
        self.dispatch_inbound(PacketType::Connack, 0);

        Ok(())
    }

    fn handle_ack(&mut self, packet_type: PacketType, packet_id: u16) -> SchistResult<()> {
        self.dispatch_inbound(packet_type, packet_id);
        Ok(())
    }

    fn handle_suback(&mut self, suback: SubackPacket) -> SchistResult<()> {
        if let Some(Continuation::SubscribeAck { topic }) = self.pending.get(PacketType::Suback, suback.packet_id) {
            let topic = topic.clone();
            if suback.return_codes.iter().any(|return_code| !return_code.is_success()) {
                warn!("handle_suback - broker rejected subscription to \"{}\"", topic);
                self.subscriptions.remove(&topic);
            } else if let Some(entry) = self.subscriptions.get(&topic) {
                info!("handle_suback - subscription to \"{}\" requested {}, granted {:?}", topic, entry.qos, suback.return_codes);
            }
        }

        self.dispatch_inbound(PacketType::Suback, suback.packet_id);
        Ok(())
    }

    fn handle_publish(&mut self, publish: PublishPacket) -> SchistResult<()> {
        if let Err(error) = validate_publish_packet_inbound(&publish) {
            return self.fail_session(error);
        }

        let handler = self.subscriptions.handler_for(&publish.topic).or_else(|| self.listeners.on_message.clone());
        let packet_id = publish.packet_id;

        match publish.qos {
            QualityOfService::AtMostOnce => {
                deliver(self, handler, &publish.topic, publish.payload_bytes());
            }
            QualityOfService::AtLeastOnce => {
                match self.send_puback(packet_id) {
                    Ok(()) => {
                        deliver(self, handler, &publish.topic, publish.payload_bytes());
                    }
                    Err(error) => {
                        error!("handle_publish - PUBACK for packet id {} could not be written, dropping message: {}", packet_id, error);
                    }
                }
            }
            QualityOfService::ExactlyOnce => {
                if self.pending.contains(PacketType::Pubrel, packet_id) {
                    // broker retransmission of a publish we already hold; only the PUBREC is repeated
                    debug!("handle_publish - duplicate qos 2 publish with packet id {}", packet_id);
                    if let Err(error) = self.write_packet(&MqttPacket::Pubrec(PubrecPacket { packet_id })) {
                        error!("handle_publish - PUBREC for packet id {} could not be rewritten: {}", packet_id, error);
                    }
                } else if let Err(error) = self.send_pubrec(packet_id, handler, &publish) {
                    error!("handle_publish - PUBREC for packet id {} could not be written: {}", packet_id, error);
                }
            }
        }

        Ok(())
    }

    fn run_continuation(&mut self, continuation: Continuation) {
        match continuation {
            Continuation::Connack { on_connected } => {
                info!("connection accepted, session present: {}", self.session_present);
                if let Some(on_connected) = on_connected {
                    let session_present = self.session_present;
                    on_connected(self, session_present);
                }
            }
            Continuation::PublishAck(context) | Continuation::PublishComplete(context) => {
                self.complete_publish(context);
            }
            Continuation::PublishReceived(context) => {
                self.on_publish_received(context);
            }
            Continuation::PublishRelease(context) => {
                self.on_publish_released(context);
            }
            Continuation::SubscribeAck { topic } => {
                self.subscriptions.clear_pending(&topic);
            }
            Continuation::UnsubscribeAck { topic, callback } => {
                self.subscriptions.remove(&topic);
                if let Some(callback) = callback {
                    callback(self, &topic);
                }
            }
        }
    }

    fn complete_publish(&mut self, context: PublishContext) {
        debug!("complete_publish - {:?}", context);
        if let Some(callback) = &context.callback {
            callback(self, &context.topic, &context.message);
        }
    }

    // sender side, PUBREC arrived: the PUBCOMP is only awaited once the PUBREL is out
    fn on_publish_received(&mut self, context: PublishContext) {
        let packet_id = context.packet_id;
        if let Err(error) = self.write_packet(&MqttPacket::Pubrel(PubrelPacket { packet_id })) {
            warn!("on_publish_received - PUBREL write for packet id {} failed, publish to \"{}\" abandoned: {}", packet_id, context.topic, error);
            return;
        }

        if let Err(error) = self.pending.expect(PacketType::Pubcomp, packet_id, Continuation::PublishComplete(context)) {
            error!("on_publish_received - could not await PUBCOMP for packet id {}: {}", packet_id, error);
        }
    }

    // receiver side, PUBREL arrived: deliver only once the PUBCOMP is on its way
    fn on_publish_released(&mut self, context: PublishContext) {
        let packet_id = context.packet_id;
        match self.write_packet(&MqttPacket::Pubcomp(PubcompPacket { packet_id })) {
            Ok(()) => {
                if let Some(callback) = &context.callback {
                    callback(self, &context.topic, &context.message);
                }
            }
            Err(error) => {
                warn!("on_publish_released - PUBCOMP write for packet id {} failed, message on \"{}\" dropped: {}", packet_id, context.topic, error);
            }
        }
    }
}

fn deliver(connection: &mut MqttConnection, handler: Option<PublishEventHandler>, topic: &str, message: &[u8]) {
    match handler {
        Some(handler) => {
            handler(connection, topic, message);
        }
        None => {
            debug!("deliver - no handler for message on \"{}\"", topic);
        }
    }
}
