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

/// A single topic filter and the maximum QoS requested for it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Subscription {

    /// Topic filter to subscribe to
    pub topic_filter: String,

    /// Maximum QoS the broker should use when forwarding matching messages
    pub qos: QualityOfService,
}

impl Subscription {

    /// Common-case constructor
    pub fn new(topic_filter: &str, qos: QualityOfService) -> Self {
        Subscription {
            topic_filter: topic_filter.to_string(),
            qos,
        }
    }
}

/// Data model of an [MQTT 3.1.1 SUBSCRIBE](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718063) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubscribePacket {

    /// Packet id of the subscribe.  Assigned by the connection.
    pub packet_id: u16,

    /// List of topic filters to subscribe to.  Must not be empty.
    pub subscriptions: Vec<Subscription>,
}

fn compute_subscribe_packet_length(packet: &SubscribePacket) -> SchistResult<u32> {
    let mut total_remaining_length : usize = 2;

    for subscription in &packet.subscriptions {
        total_remaining_length += 3 + subscription.topic_filter.len();
    }

    check_remaining_length("compute_subscribe_packet_length", total_remaining_length)
}

fn get_subscribe_packet_topic_filter(packet: &MqttPacket, index: usize) -> &str {
    if let MqttPacket::Subscribe(subscribe) = packet {
        return &subscribe.subscriptions[index].topic_filter;
    }

    panic!("Internal encoding error: invalid subscribe topic filter state");
}

pub(crate) fn write_subscribe_encoding_steps(packet: &SubscribePacket, steps: &mut VecDeque<EncodingStep>) -> SchistResult<()> {
    let total_remaining_length = compute_subscribe_packet_length(packet)?;

    push_step!(steps, Uint8(SUBSCRIBE_FIRST_BYTE));
    push_step!(steps, Vli(total_remaining_length));
    push_step!(steps, Uint16(packet.packet_id));

    for (i, subscription) in packet.subscriptions.iter().enumerate() {
        push_prefixed_indexed_string!(steps, get_subscribe_packet_topic_filter, subscription.topic_filter, i);
        push_step!(steps, Uint8(subscription.qos as u8));
    }

    Ok(())
}

pub(crate) fn decode_subscribe_packet(first_byte: u8, packet_body: &[u8]) -> SchistResult<Box<MqttPacket>> {
    if first_byte != SUBSCRIBE_FIRST_BYTE {
        let message = "decode_subscribe_packet - invalid first byte";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    let mut packet = SubscribePacket { ..Default::default() };

    let mut mutable_body = decode_u16(packet_body, &mut packet.packet_id)?;
    while !mutable_body.is_empty() {
        let mut subscription = Subscription { ..Default::default() };
        mutable_body = decode_length_prefixed_string(mutable_body, &mut subscription.topic_filter)?;

        let mut qos_byte : u8 = 0;
        mutable_body = decode_u8(mutable_body, &mut qos_byte)?;

        // upper six bits are reserved
        if (qos_byte & !QOS_MASK) != 0 {
            let message = "decode_subscribe_packet - reserved requested qos bits set";
            error!("{}", message);
            return Err(SchistError::new_decoding_failure(message));
        }

        subscription.qos = convert_u8_to_quality_of_service(qos_byte)?;
        packet.subscriptions.push(subscription);
    }

    if packet.subscriptions.is_empty() {
        let message = "decode_subscribe_packet - no subscriptions";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    Ok(Box::new(MqttPacket::Subscribe(packet)))
}

pub(crate) fn validate_subscribe_packet_outbound(packet: &SubscribePacket) -> SchistResult<()> {
    if packet.packet_id == 0 {
        error!("validate_subscribe_packet_outbound - packet id must be non zero");
        return Err(SchistError::new_packet_validation(PacketType::Subscribe, "packet id is zero"));
    }

    if packet.subscriptions.is_empty() {
        error!("validate_subscribe_packet_outbound - empty subscription set");
        return Err(SchistError::new_packet_validation(PacketType::Subscribe, "empty subscription set"));
    }

    for subscription in &packet.subscriptions {
        if !is_valid_topic_filter(&subscription.topic_filter) {
            error!("validate_subscribe_packet_outbound - invalid topic filter");
            return Err(SchistError::new_packet_validation(PacketType::Subscribe, "invalid topic filter"));
        }
    }

    Ok(())
}

impl fmt::Display for SubscribePacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SubscribePacket {{")?;
        write_field!(f, "packet_id", self.packet_id);
        write!(f, " subscriptions: [")?;
        for (i, subscription) in self.subscriptions.iter().enumerate() {
            write!(f, " {}: {{", i)?;
            write_quoted_field!(f, "topic_filter", subscription.topic_filter);
            write_field!(f, "qos", quality_of_service_to_str(subscription.qos));
            write!(f, " }}")?;
        }
        write!(f, " ]")?;
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::testing::*;

    fn create_subscribe_packet() -> SubscribePacket {
        SubscribePacket {
            packet_id: 123,
            subscriptions: vec![
                Subscription::new("hello/world", QualityOfService::AtLeastOnce),
                Subscription::new("calvin/is/a/goof", QualityOfService::ExactlyOnce),
                Subscription::new("a/+/#", QualityOfService::AtMostOnce),
            ],
        }
    }

    #[test]
    fn subscribe_round_trip_encode_decode_single() {
        let packet = SubscribePacket {
            packet_id: 2,
            subscriptions: vec![ Subscription::new("a/b", QualityOfService::ExactlyOnce) ],
        };

        assert!(do_round_trip_encode_decode_test(&MqttPacket::Subscribe(packet)));
    }

    #[test]
    fn subscribe_round_trip_encode_decode_multiple() {
        assert!(do_round_trip_encode_decode_test(&MqttPacket::Subscribe(create_subscribe_packet())));
    }

    #[test]
    fn subscribe_decode_failure_missing_reserved_flag() {
        let clear_reserved_flag = | bytes: &[u8] | -> Vec<u8> {
            let mut clone = bytes.to_vec();
            clone[0] = PACKET_TYPE_SUBSCRIBE << 4;
            clone
        };

        do_mutated_decode_failure_test(&MqttPacket::Subscribe(create_subscribe_packet()), clear_reserved_flag);
    }

    #[test]
    fn subscribe_decode_failure_reserved_qos_bits() {
        let packet = SubscribePacket {
            packet_id: 2,
            subscriptions: vec![ Subscription::new("a/b", QualityOfService::AtLeastOnce) ],
        };

        let set_reserved_bits = | bytes: &[u8] | -> Vec<u8> {
            let mut clone = bytes.to_vec();
            let last = clone.len() - 1;
            clone[last] |= 0x40;
            clone
        };

        do_mutated_decode_failure_test(&MqttPacket::Subscribe(packet), set_reserved_bits);
    }

    #[test]
    fn subscribe_validate_success() {
        assert!(validate_subscribe_packet_outbound(&create_subscribe_packet()).is_ok());
    }

    #[test]
    fn subscribe_validate_failure_bad_filter() {
        let mut packet = create_subscribe_packet();
        packet.subscriptions[1].topic_filter = "a/#/b".to_string();
        assert!(validate_subscribe_packet_outbound(&packet).is_err());
    }

    #[test]
    fn subscribe_validate_failure_empty() {
        let packet = SubscribePacket {
            packet_id: 1,
            subscriptions: vec![],
        };

        assert!(validate_subscribe_packet_outbound(&packet).is_err());
    }
}
