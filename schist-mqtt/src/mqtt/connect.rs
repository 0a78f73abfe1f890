/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::decode::utils::*;
use crate::encode::utils::*;
use crate::error::{SchistError, SchistResult};
use crate::logging::*;
use crate::mqtt::*;
use crate::mqtt::utils::*;
use crate::validate::*;

use log::*;
use std::collections::VecDeque;
use std::fmt;

/// Message the broker publishes on the client's behalf if the connection drops without a
/// DISCONNECT.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LastWill {

    /// Topic the will message is published to
    pub topic: String,

    /// Will message payload
    pub message: Vec<u8>,

    /// Quality of service the broker uses when publishing the will
    pub qos: QualityOfService,

    /// Whether the broker should retain the will message
    pub retain: bool,
}

/// Data model of an [MQTT 3.1.1 CONNECT](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718028) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnectPacket {

    /// Maximum number of seconds allowed between two client transmissions
    pub keep_alive_interval_seconds: u16,

    /// Discard any previous session state on the broker
    pub clean_session: bool,

    /// Identifier of the client to the broker.  May be empty only for clean sessions.
    pub client_id: String,

    /// Optional last will
    pub will: Option<LastWill>,

    /// Optional user name
    pub username: Option<String>,

    /// Optional password
    pub password: Option<Vec<u8>>,
}

static MQTT311_CONNECT_PROTOCOL_BYTES: [u8; 7] = [0, 4, 77, 81, 84, 84, MQTT311_PROTOCOL_LEVEL];
const CONNECT_HEADER_PROTOCOL_LENGTH : usize = 7;

fn get_connect_protocol_bytes(_: &MqttPacket) -> &'static [u8] {
    &MQTT311_CONNECT_PROTOCOL_BYTES
}

fn get_connect_packet_client_id(packet: &MqttPacket) -> &str {
    packet_field!(packet, MqttPacket::Connect, client_id)
}

fn get_connect_packet_username(packet: &MqttPacket) -> &str {
    optional_packet_field!(packet, MqttPacket::Connect, username)
}

fn get_connect_packet_password(packet: &MqttPacket) -> &[u8] {
    optional_packet_field!(packet, MqttPacket::Connect, password)
}

fn get_connect_packet_will_topic(packet: &MqttPacket) -> &str {
    &optional_packet_field!(packet, MqttPacket::Connect, will).topic
}

fn get_connect_packet_will_message(packet: &MqttPacket) -> &[u8] {
    &optional_packet_field!(packet, MqttPacket::Connect, will).message
}

fn compute_connect_flags(packet: &ConnectPacket) -> u8 {
    let mut flags: u8 = 0;
    if packet.clean_session {
        flags |= CONNECT_PACKET_CLEAN_SESSION_FLAG_MASK;
    }

    if let Some(will) = &packet.will {
        flags |= CONNECT_PACKET_HAS_WILL_FLAG_MASK;
        flags |= (will.qos as u8) << CONNECT_PACKET_WILL_QOS_FLAG_SHIFT;
        if will.retain {
            flags |= CONNECT_PACKET_WILL_RETAIN_FLAG_MASK;
        }
    }

    if packet.password.is_some() {
        flags |= CONNECT_PACKET_HAS_PASSWORD_FLAG_MASK;
    }

    if packet.username.is_some() {
        flags |= CONNECT_PACKET_HAS_USERNAME_FLAG_MASK;
    }

    flags
}

fn compute_connect_packet_length(packet: &ConnectPacket) -> SchistResult<u32> {

    /* variable header length =
     *    10 bytes (6 for mqtt string, 1 for protocol level, 1 for flags, 2 for keep alive)
     */
    let variable_header_length = 10;

    let mut payload_length : usize = 2 + packet.client_id.len();

    if let Some(will) = &packet.will {
        payload_length += 2 + will.topic.len();
        payload_length += 2 + will.message.len();
    }

    if let Some(username) = &packet.username {
        payload_length += 2 + username.len();
    }

    if let Some(password) = &packet.password {
        payload_length += 2 + password.len();
    }

    check_remaining_length("compute_connect_packet_length", payload_length + variable_header_length)
}

pub(crate) fn write_connect_encoding_steps(packet: &ConnectPacket, steps: &mut VecDeque<EncodingStep>) -> SchistResult<()> {
    let total_remaining_length = compute_connect_packet_length(packet)?;

    push_step!(steps, Uint8(CONNECT_FIRST_BYTE));
    push_step!(steps, Vli(total_remaining_length));
    push_bytes!(steps, get_connect_protocol_bytes);
    push_step!(steps, Uint8(compute_connect_flags(packet)));
    push_step!(steps, Uint16(packet.keep_alive_interval_seconds));

    push_prefixed_string!(steps, get_connect_packet_client_id, packet.client_id);

    if let Some(will) = &packet.will {
        push_prefixed_string!(steps, get_connect_packet_will_topic, will.topic);
        push_prefixed_bytes!(steps, get_connect_packet_will_message, will.message);
    }

    if let Some(username) = &packet.username {
        push_prefixed_string!(steps, get_connect_packet_username, username);
    }

    if let Some(password) = &packet.password {
        push_prefixed_bytes!(steps, get_connect_packet_password, password);
    }

    Ok(())
}

pub(crate) fn decode_connect_packet(first_byte: u8, packet_body: &[u8]) -> SchistResult<Box<MqttPacket>> {
    if first_byte != CONNECT_FIRST_BYTE {
        let message = "decode_connect_packet - invalid first byte";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    let mut packet = ConnectPacket { ..Default::default() };

    let mut mutable_body = packet_body;
    if mutable_body.len() < CONNECT_HEADER_PROTOCOL_LENGTH {
        let message = "decode_connect_packet - packet too short";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    let protocol_bytes = &mutable_body[..CONNECT_HEADER_PROTOCOL_LENGTH];
    mutable_body = &mutable_body[CONNECT_HEADER_PROTOCOL_LENGTH..];

    if protocol_bytes != MQTT311_CONNECT_PROTOCOL_BYTES {
        let message = "decode_connect_packet - invalid protocol";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    let mut connect_flags : u8 = 0;
    mutable_body = decode_u8(mutable_body, &mut connect_flags)?;

    // if the reserved bit is set, that's fatal
    if (connect_flags & 0x01) != 0 {
        let message = "decode_connect_packet - connect flags reserved bit set";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    packet.clean_session = (connect_flags & CONNECT_PACKET_CLEAN_SESSION_FLAG_MASK) != 0;
    let has_will = (connect_flags & CONNECT_PACKET_HAS_WILL_FLAG_MASK) != 0;
    let will_retain = (connect_flags & CONNECT_PACKET_WILL_RETAIN_FLAG_MASK) != 0;
    let will_qos = QualityOfService::try_from((connect_flags >> CONNECT_PACKET_WILL_QOS_FLAG_SHIFT) & QOS_MASK)?;

    if !has_will && (will_retain || will_qos != QualityOfService::AtMostOnce) {
        let message = "decode_connect_packet - no will but has will flags set";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    let has_username = (connect_flags & CONNECT_PACKET_HAS_USERNAME_FLAG_MASK) != 0;
    let has_password = (connect_flags & CONNECT_PACKET_HAS_PASSWORD_FLAG_MASK) != 0;

    mutable_body = decode_u16(mutable_body, &mut packet.keep_alive_interval_seconds)?;
    mutable_body = decode_length_prefixed_string(mutable_body, &mut packet.client_id)?;

    if has_will {
        let mut will = LastWill {
            qos: will_qos,
            retain: will_retain,
            ..Default::default()
        };

        let mut will_message = None;
        mutable_body = decode_length_prefixed_string(mutable_body, &mut will.topic)?;
        mutable_body = decode_optional_length_prefixed_bytes(mutable_body, &mut will_message)?;
        will.message = will_message.unwrap_or_default();

        packet.will = Some(will);
    }

    if has_username {
        mutable_body = decode_optional_length_prefixed_string(mutable_body, &mut packet.username)?;
    }

    if has_password {
        mutable_body = decode_optional_length_prefixed_bytes(mutable_body, &mut packet.password)?;
    }

    if !mutable_body.is_empty() {
        let message = "decode_connect_packet - body length does not match expected overall packet length";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    Ok(Box::new(MqttPacket::Connect(packet)))
}

pub(crate) fn validate_connect_packet_outbound(packet: &ConnectPacket) -> SchistResult<()> {
    validate_string_length(&packet.client_id, PacketType::Connect, "validate_connect_packet_outbound", "client_id")?;
    validate_optional_string_length(&packet.username, PacketType::Connect, "validate_connect_packet_outbound", "username")?;
    validate_optional_binary_length(&packet.password, PacketType::Connect, "validate_connect_packet_outbound", "password")?;

    if let Some(will) = &packet.will {
        if !is_valid_topic(&will.topic) {
            let message = "validate_connect_packet_outbound - invalid will topic";
            error!("{}", message);
            return Err(SchistError::new_packet_validation(PacketType::Connect, message));
        }

        validate_binary_length(&will.message, PacketType::Connect, "validate_connect_packet_outbound", "will.message")?;
    }

    if packet.password.is_some() && packet.username.is_none() {
        let message = "validate_connect_packet_outbound - password requires a username in MQTT 3.1.1";
        error!("{}", message);
        return Err(SchistError::new_packet_validation(PacketType::Connect, message));
    }

    Ok(())
}

impl fmt::Display for ConnectPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ConnectPacket {{")?;
        write_field!(f, "keep_alive_interval_seconds", self.keep_alive_interval_seconds);
        write_field!(f, "clean_session", self.clean_session);
        write_quoted_field!(f, "client_id", self.client_id);
        if let Some(username) = &self.username {
            write_quoted_field!(f, "username", username);
        }
        if self.password.is_some() {
            write_field!(f, "password", "<...redacted>");
        }

        if let Some(will) = &self.will {
            write!(f, " will: {{")?;
            write_quoted_field!(f, "topic", will.topic);
            write!(f, " message:<{} Bytes>", will.message.len())?;
            write_field!(f, "qos", quality_of_service_to_str(will.qos));
            write_field!(f, "retain", will.retain);
            write!(f, " }}")?;
        }

        write!(f, " }}")
    }
}
