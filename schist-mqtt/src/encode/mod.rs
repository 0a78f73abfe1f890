/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

pub(crate) mod utils;

use crate::encode::utils::*;
use crate::error::SchistResult;
use crate::logging::*;
use crate::mqtt::*;
use crate::mqtt::connack::*;
use crate::mqtt::connect::*;
use crate::mqtt::disconnect::*;
use crate::mqtt::pingreq::*;
use crate::mqtt::pingresp::*;
use crate::mqtt::puback::*;
use crate::mqtt::pubcomp::*;
use crate::mqtt::publish::*;
use crate::mqtt::pubrec::*;
use crate::mqtt::pubrel::*;
use crate::mqtt::suback::*;
use crate::mqtt::subscribe::*;
use crate::mqtt::unsuback::*;
use crate::mqtt::unsubscribe::*;

use std::collections::VecDeque;

const ENCODE_BUFFER_DEFAULT_SIZE : usize = 64;

fn write_encoding_steps(mqtt_packet: &MqttPacket, steps: &mut VecDeque<EncodingStep>) -> SchistResult<()> {
    log_packet("Writing encode steps for packet: ", mqtt_packet);

    match mqtt_packet {
        MqttPacket::Connect(packet) => { write_connect_encoding_steps(packet, steps) }
        MqttPacket::Connack(packet) => { write_connack_encoding_steps(packet, steps) }
        MqttPacket::Publish(packet) => { write_publish_encoding_steps(packet, steps) }
        MqttPacket::Puback(packet) => { write_puback_encoding_steps(packet, steps) }
        MqttPacket::Pubrec(packet) => { write_pubrec_encoding_steps(packet, steps) }
        MqttPacket::Pubrel(packet) => { write_pubrel_encoding_steps(packet, steps) }
        MqttPacket::Pubcomp(packet) => { write_pubcomp_encoding_steps(packet, steps) }
        MqttPacket::Subscribe(packet) => { write_subscribe_encoding_steps(packet, steps) }
        MqttPacket::Suback(packet) => { write_suback_encoding_steps(packet, steps) }
        MqttPacket::Unsubscribe(packet) => { write_unsubscribe_encoding_steps(packet, steps) }
        MqttPacket::Unsuback(packet) => { write_unsuback_encoding_steps(packet, steps) }
        MqttPacket::Pingreq(packet) => { write_pingreq_encoding_steps(packet, steps) }
        MqttPacket::Pingresp(packet) => {  write_pingresp_encoding_steps(packet, steps) }
        MqttPacket::Disconnect(packet) => { write_disconnect_encoding_steps(packet, steps) }
    }
}

/// Serializes a packet into a freshly allocated buffer holding exactly one complete MQTT packet.
///
/// Failure indicates a packet that cannot be represented on the wire (for example, a remaining
/// length beyond 2^28 - 1), which callers treat as a programming error rather than a transient
/// condition.
pub(crate) fn encode_packet(packet: &MqttPacket) -> SchistResult<Vec<u8>> {
    let mut steps = VecDeque::new();
    write_encoding_steps(packet, &mut steps)?;

    let mut dest = Vec::with_capacity(ENCODE_BUFFER_DEFAULT_SIZE);
    while let Some(step) = steps.pop_front() {
        process_encoding_step(step, packet, &mut dest)?;
    }

    Ok(dest)
}
