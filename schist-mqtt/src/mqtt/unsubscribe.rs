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

/// Data model of an [MQTT 3.1.1 UNSUBSCRIBE](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718072) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UnsubscribePacket {

    /// Packet id of the unsubscribe.  Assigned by the connection.
    pub packet_id: u16,

    /// List of topic filters to unsubscribe from.  Must not be empty.
    pub topic_filters: Vec<String>,
}

fn compute_unsubscribe_packet_length(packet: &UnsubscribePacket) -> SchistResult<u32> {
    let mut total_remaining_length : usize = 2;

    for filter in &packet.topic_filters {
        total_remaining_length += 2 + filter.len();
    }

    check_remaining_length("compute_unsubscribe_packet_length", total_remaining_length)
}

fn get_unsubscribe_packet_topic_filter(packet: &MqttPacket, index: usize) -> &str {
    if let MqttPacket::Unsubscribe(unsubscribe) = packet {
        return &unsubscribe.topic_filters[index];
    }

    panic!("Internal encoding error: invalid unsubscribe topic filter state");
}

pub(crate) fn write_unsubscribe_encoding_steps(packet: &UnsubscribePacket, steps: &mut VecDeque<EncodingStep>) -> SchistResult<()> {
    let total_remaining_length = compute_unsubscribe_packet_length(packet)?;

    push_step!(steps, Uint8(UNSUBSCRIBE_FIRST_BYTE));
    push_step!(steps, Vli(total_remaining_length));
    push_step!(steps, Uint16(packet.packet_id));

    for (i, filter) in packet.topic_filters.iter().enumerate() {
        push_prefixed_indexed_string!(steps, get_unsubscribe_packet_topic_filter, filter, i);
    }

    Ok(())
}

pub(crate) fn decode_unsubscribe_packet(first_byte: u8, packet_body: &[u8]) -> SchistResult<Box<MqttPacket>> {
    if first_byte != UNSUBSCRIBE_FIRST_BYTE {
        let message = "decode_unsubscribe_packet - invalid first byte";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    let mut packet = UnsubscribePacket { ..Default::default() };

    let mut mutable_body = decode_u16(packet_body, &mut packet.packet_id)?;
    while !mutable_body.is_empty() {
        let mut filter = String::new();
        mutable_body = decode_length_prefixed_string(mutable_body, &mut filter)?;
        packet.topic_filters.push(filter);
    }

    if packet.topic_filters.is_empty() {
        let message = "decode_unsubscribe_packet - no topic filters";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    Ok(Box::new(MqttPacket::Unsubscribe(packet)))
}

pub(crate) fn validate_unsubscribe_packet_outbound(packet: &UnsubscribePacket) -> SchistResult<()> {
    if packet.packet_id == 0 {
        error!("validate_unsubscribe_packet_outbound - packet id must be non zero");
        return Err(SchistError::new_packet_validation(PacketType::Unsubscribe, "packet id is zero"));
    }

    if packet.topic_filters.is_empty() {
        error!("validate_unsubscribe_packet_outbound - empty topic filter set");
        return Err(SchistError::new_packet_validation(PacketType::Unsubscribe, "empty topic filter set"));
    }

    for filter in &packet.topic_filters {
        if !is_valid_topic_filter(filter) {
            error!("validate_unsubscribe_packet_outbound - invalid topic filter");
            return Err(SchistError::new_packet_validation(PacketType::Unsubscribe, "invalid topic filter"));
        }
    }

    Ok(())
}

impl fmt::Display for UnsubscribePacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UnsubscribePacket {{")?;
        write_field!(f, "packet_id", self.packet_id);
        write!(f, " topic_filters: [")?;
        for (i, filter) in self.topic_filters.iter().enumerate() {
            write!(f, " {}:\"{}\"", i, filter)?;
        }
        write!(f, " ]")?;
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::testing::*;

    fn create_unsubscribe_packet() -> UnsubscribePacket {
        UnsubscribePacket {
            packet_id: 123,
            topic_filters: vec![
                "hello/world".to_string(),
                "calvin/is/a/goof".to_string(),
                "a/+/#".to_string(),
            ],
        }
    }

    #[test]
    fn unsubscribe_round_trip_encode_decode() {
        assert!(do_round_trip_encode_decode_test(&MqttPacket::Unsubscribe(create_unsubscribe_packet())));
    }

    #[test]
    fn unsubscribe_decode_failure_bad_fixed_header() {
        do_fixed_header_flag_decode_failure_test(&MqttPacket::Unsubscribe(create_unsubscribe_packet()), 1);
    }

    #[test]
    fn unsubscribe_decode_failure_truncated_filter() {
        let truncate = | bytes: &[u8] | -> Vec<u8> {
            let mut clone = bytes.to_vec();
            clone[1] -= 1;
            clone.pop();
            clone
        };

        do_mutated_decode_failure_test(&MqttPacket::Unsubscribe(create_unsubscribe_packet()), truncate);
    }

    #[test]
    fn unsubscribe_validate_success() {
        assert!(validate_unsubscribe_packet_outbound(&create_unsubscribe_packet()).is_ok());
    }

    #[test]
    fn unsubscribe_validate_failure_bad_filter() {
        let mut packet = create_unsubscribe_packet();
        packet.topic_filters.push("a/b+".to_string());
        assert!(validate_unsubscribe_packet_outbound(&packet).is_err());
    }
}
