/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

// Shared fixtures for driving a connection against a scripted broker in unit tests.

use crate::config::*;
use crate::decode::{Decoder, DecodingContext};
use crate::encode::encode_packet;
use crate::error::{SchistError, SchistResult};
use crate::mqtt::*;
use crate::protocol::MqttConnection;
use crate::transport::Transport;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) type PublishEventRecord = Arc<Mutex<Vec<(String, Vec<u8>)>>>;

pub(crate) type ErrorRecord = Arc<Mutex<Vec<String>>>;

/// Test-side view of everything a [`RecordingTransport`] has been asked to write
#[derive(Clone, Default)]
pub(crate) struct TransportHandle {
    written: Arc<Mutex<Vec<Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
}

impl TransportHandle {

    pub(crate) fn set_fail_writes(&self, fail_writes: bool) {
        self.fail_writes.store(fail_writes, Ordering::SeqCst);
    }

    pub(crate) fn clear(&self) {
        self.written.lock().unwrap().clear();
    }

    /// True once the connection has dropped its transport
    pub(crate) fn is_released(&self) -> bool {
        Arc::strong_count(&self.written) == 1
    }

    pub(crate) fn write_count(&self) -> usize {
        self.written.lock().unwrap().len()
    }

    /// Decodes every successful write; each write must hold exactly one packet
    pub(crate) fn written_packets(&self) -> Vec<MqttPacket> {
        self.written.lock().unwrap().iter().map(|buffer| {
            let mut packets = decode_all(buffer);
            assert_eq!(1, packets.len());
            packets.remove(0)
        }).collect()
    }
}

struct RecordingTransport {
    handle: TransportHandle,
}

impl Transport for RecordingTransport {
    fn write(&mut self, buffer: Vec<u8>) -> SchistResult<()> {
        if self.handle.fail_writes.load(Ordering::SeqCst) {
            return Err(SchistError::new_transport_error("simulated write failure"));
        }

        self.handle.written.lock().unwrap().push(buffer);
        Ok(())
    }
}

pub(crate) fn create_recording_transport() -> (Box<dyn Transport + Send>, TransportHandle) {
    let handle = TransportHandle::default();
    let transport = RecordingTransport {
        handle: handle.clone(),
    };

    (Box::new(transport), handle)
}

pub(crate) fn create_client_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("test-{}", &uuid[..16])
}

/// Bytes a broker would send for the packet
pub(crate) fn encode_inbound(packet: &MqttPacket) -> Vec<u8> {
    encode_packet(packet).unwrap()
}

pub(crate) fn decode_all(bytes: &[u8]) -> Vec<MqttPacket> {
    let mut decoder = Decoder::new();
    let mut decoded_packets = VecDeque::new();
    let mut decoding_context = DecodingContext {
        maximum_packet_size: 0,
        decoded_packets: &mut decoded_packets
    };

    decoder.decode_bytes(bytes, &mut decoding_context).unwrap();

    decoded_packets.into_iter().map(|packet| *packet).collect()
}

pub(crate) fn create_publish_recorder() -> (PublishEventHandler, PublishEventRecord) {
    let events : PublishEventRecord = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    let handler : PublishEventHandler = Arc::new(move |_: &mut MqttConnection, topic: &str, message: &[u8]| {
        events_clone.lock().unwrap().push((topic.to_string(), message.to_vec()));
    });

    (handler, events)
}

pub(crate) fn create_error_recorder() -> (ErrorHandler, ErrorRecord) {
    let errors : ErrorRecord = Arc::new(Mutex::new(Vec::new()));
    let errors_clone = errors.clone();
    let handler : ErrorHandler = Arc::new(move |error: &SchistError| {
        errors_clone.lock().unwrap().push(error.to_string());
    });

    (handler, errors)
}

/// A connection wired to a recording transport, with every session-fatal error captured
pub(crate) struct ConnectionFixture {
    pub(crate) connection: MqttConnection,
    pub(crate) transport: TransportHandle,
    pub(crate) errors: ErrorRecord,
}

impl ConnectionFixture {

    /// CONNECT written, no CONNACK yet
    pub(crate) fn new_pending(options: ConnectOptions, listeners: ConnectionListeners) -> Self {
        let (transport, handle) = create_recording_transport();
        let (on_error, errors) = create_error_recorder();

        let connection = MqttConnection::connect(options, transport, listeners.with_on_error(on_error)).unwrap();

        ConnectionFixture {
            connection,
            transport: handle,
            errors,
        }
    }

    pub(crate) fn new_connected() -> Self {
        Self::new_connected_full(create_default_options(), ConnectionListeners::new())
    }

    pub(crate) fn new_connected_with_options(options: ConnectOptions) -> Self {
        Self::new_connected_full(options, ConnectionListeners::new())
    }

    pub(crate) fn new_connected_with_listeners(listeners: ConnectionListeners) -> Self {
        Self::new_connected_full(create_default_options(), listeners)
    }

    /// CONNACK accepted and the transport record cleared
    pub(crate) fn new_connected_full(options: ConnectOptions, listeners: ConnectionListeners) -> Self {
        let mut fixture = Self::new_pending(options, listeners);
        fixture.receive(&MqttPacket::Connack(ConnackPacket { session_present: false, return_code: ConnectReturnCode::Accepted })).unwrap();
        fixture.transport.clear();

        fixture
    }

    /// Feeds the packet's wire encoding to the connection
    pub(crate) fn receive(&mut self, packet: &MqttPacket) -> SchistResult<()> {
        self.connection.handle_incoming_bytes(&encode_inbound(packet))
    }
}

fn create_default_options() -> ConnectOptions {
    ConnectOptionsBuilder::new()
        .with_client_id(&create_client_id())
        .build()
}
