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

/// Data model of an [MQTT 3.1.1 PUBLISH](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718037) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PublishPacket {

    /// Packet id of the publish.  Zero for QoS 0.  Assigned by the connection on outbound publishes.
    pub packet_id: u16,

    /// Topic the message is published to
    pub topic: String,

    /// Delivery guarantee of the message
    pub qos: QualityOfService,

    /// Set when this is a re-delivery of an earlier attempt
    pub duplicate: bool,

    /// Whether the broker should retain the message for future subscribers
    pub retain: bool,

    /// Message payload.  An empty payload decodes as `None`.
    pub payload: Option<Vec<u8>>,
}

fn compute_publish_packet_length(packet: &PublishPacket) -> SchistResult<u32> {

    /*
     * Remaining Length:
     * Variable Header
     *  - Topic Name
     *  - Packet Identifier (qos1+)
     * Payload
     */
    let mut total_remaining_length : usize = 2 + packet.topic.len();

    if packet.qos != QualityOfService::AtMostOnce {
        total_remaining_length += 2;
    }

    if let Some(payload) = &packet.payload {
        total_remaining_length += payload.len();
    }

    check_remaining_length("compute_publish_packet_length", total_remaining_length)
}

/*
 * Fixed Header
 * byte 1:
 *  bits 4-7: MQTT Control Packet Type
 *  bit 3: DUP flag
 *  bit 1-2: QoS level
 *  bit 0: RETAIN
 * byte 2-x: Remaining Length as Variable Byte Integer (1-4 bytes)
 */
fn compute_publish_fixed_header_first_byte(packet: &PublishPacket) -> u8 {
    let mut first_byte: u8 = PACKET_TYPE_PUBLISH << 4;

    if packet.duplicate {
        first_byte |= PUBLISH_PACKET_FIXED_HEADER_DUPLICATE_FLAG;
    }

    first_byte |= (packet.qos as u8) << 1;

    if packet.retain {
        first_byte |= PUBLISH_PACKET_FIXED_HEADER_RETAIN_FLAG;
    }

    first_byte
}

fn get_publish_packet_topic(packet: &MqttPacket) -> &str {
    packet_field!(packet, MqttPacket::Publish, topic)
}

fn get_publish_packet_payload(packet: &MqttPacket) -> &[u8] {
    if let MqttPacket::Publish(publish) = packet {
        if let Some(bytes) = &publish.payload {
            return bytes;
        }
    }

    panic!("Internal encoding error: invalid publish payload state");
}

pub(crate) fn write_publish_encoding_steps(packet: &PublishPacket, steps: &mut VecDeque<EncodingStep>) -> SchistResult<()> {
    let total_remaining_length = compute_publish_packet_length(packet)?;

    push_step!(steps, Uint8(compute_publish_fixed_header_first_byte(packet)));
    push_step!(steps, Vli(total_remaining_length));
    push_prefixed_string!(steps, get_publish_packet_topic, packet.topic);

    if packet.qos != QualityOfService::AtMostOnce {
        push_step!(steps, Uint16(packet.packet_id));
    }

    if packet.payload.is_some() {
        push_bytes!(steps, get_publish_packet_payload);
    }

    Ok(())
}

pub(crate) fn decode_publish_packet(first_byte: u8, packet_body: &[u8]) -> SchistResult<Box<MqttPacket>> {
    let mut packet = PublishPacket { ..Default::default() };

    packet.duplicate = (first_byte & PUBLISH_PACKET_FIXED_HEADER_DUPLICATE_FLAG) != 0;
    packet.retain = (first_byte & PUBLISH_PACKET_FIXED_HEADER_RETAIN_FLAG) != 0;
    packet.qos = convert_u8_to_quality_of_service((first_byte >> 1) & QOS_MASK)?;

    if packet.duplicate && packet.qos == QualityOfService::AtMostOnce {
        let message = "decode_publish_packet - duplicate flag set on a qos 0 publish";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    let mut mutable_body = packet_body;
    mutable_body = decode_length_prefixed_string(mutable_body, &mut packet.topic)?;

    if packet.qos != QualityOfService::AtMostOnce {
        mutable_body = decode_u16(mutable_body, &mut packet.packet_id)?;
    }

    if !mutable_body.is_empty() {
        packet.payload = Some(mutable_body.to_vec());
    }

    Ok(Box::new(MqttPacket::Publish(packet)))
}

pub(crate) fn validate_publish_packet_outbound(packet: &PublishPacket) -> SchistResult<()> {
    validate_string_length(&packet.topic, PacketType::Publish, "validate_publish_packet_outbound", "topic")?;

    if !is_valid_topic(&packet.topic) {
        error!("validate_publish_packet_outbound - invalid topic");
        return Err(SchistError::new_packet_validation(PacketType::Publish, "invalid topic"));
    }

    if packet.packet_id == 0 && packet.qos != QualityOfService::AtMostOnce {
        error!("validate_publish_packet_outbound - packet id must be non zero");
        return Err(SchistError::new_packet_validation(PacketType::Publish, "packet id is zero"));
    }

    if packet.packet_id != 0 && packet.qos == QualityOfService::AtMostOnce {
        error!("validate_publish_packet_outbound - packet id set on a qos 0 publish");
        return Err(SchistError::new_packet_validation(PacketType::Publish, "packet id is set"));
    }

    if packet.duplicate && packet.qos == QualityOfService::AtMostOnce {
        error!("validate_publish_packet_outbound - duplicate flag set on a qos 0 publish");
        return Err(SchistError::new_packet_validation(PacketType::Publish, "duplicate flag is set"));
    }

    compute_publish_packet_length(packet)?;

    Ok(())
}

pub(crate) fn validate_publish_packet_inbound(packet: &PublishPacket) -> SchistResult<()> {
    if packet.topic.is_empty() {
        error!("validate_publish_packet_inbound - empty topic");
        return Err(SchistError::new_packet_validation(PacketType::Publish, "topic is empty"));
    }

    if packet.packet_id == 0 && packet.qos != QualityOfService::AtMostOnce {
        error!("validate_publish_packet_inbound - packet id must be non zero");
        return Err(SchistError::new_packet_validation(PacketType::Publish, "packet id is zero"));
    }

    Ok(())
}

impl fmt::Display for PublishPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PublishPacket {{")?;
        write_field!(f, "packet_id", self.packet_id);
        write_quoted_field!(f, "topic", self.topic);
        write_field!(f, "qos", quality_of_service_to_str(self.qos));
        write_field!(f, "duplicate", self.duplicate);
        write_field!(f, "retain", self.retain);
        if let Some(payload) = &self.payload {
            write_field!(f, "payload", format_args!("<{} Bytes>", payload.len()));
        }
        write!(f, " }}")
    }
}

// Some convenience constructors
impl PublishPacket {

    /// Common-case constructor for PublishPackets that don't need special configuration
    pub fn new(topic: &str, qos: QualityOfService, payload: &[u8]) -> Self {
        PublishPacket {
            topic: topic.to_string(),
            qos,
            payload: Some(payload.to_vec()),
            ..Default::default()
        }
    }

    /// Common-case constructor for payload-less PublishPackets that don't need special configuration
    pub fn new_empty(topic: &str, qos: QualityOfService) -> Self {
        PublishPacket {
            topic: topic.to_string(),
            qos,
            ..Default::default()
        }
    }

    /// Payload as a slice, empty if there is none
    pub fn payload_bytes(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or(&[])
    }
}
