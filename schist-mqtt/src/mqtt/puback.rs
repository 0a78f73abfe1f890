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

use log::*;
use std::collections::VecDeque;
use std::fmt;

/// Data model of an [MQTT 3.1.1 PUBACK](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718043) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PubackPacket {

    /// Id of the QoS 1 publish being acknowledged
    pub packet_id: u16,
}

define_ack_packet_encoding_impl!(write_puback_encoding_steps, PubackPacket, PUBACK_FIRST_BYTE);
define_ack_packet_decode_function!(decode_puback_packet, Puback, PubackPacket, PUBACK_FIRST_BYTE);
impl_ack_packet_display!(PubackPacket);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::testing::*;

    #[test]
    fn puback_round_trip_encode_decode() {
        let packet = PubackPacket {
            packet_id: 123,
        };

        assert!(do_round_trip_encode_decode_test(&MqttPacket::Puback(packet)));
    }

    #[test]
    fn puback_decode_failure_bad_fixed_header() {
        let packet = PubackPacket {
            packet_id: 8193,
        };

        do_fixed_header_flag_decode_failure_test(&MqttPacket::Puback(packet), 15);
    }

    #[test]
    fn puback_decode_failure_bad_remaining_length() {
        let packet = PubackPacket {
            packet_id: 8193,
        };

        let extend_length = | bytes: &[u8] | -> Vec<u8> {
            let mut clone = bytes.to_vec();
            clone[1] = 4;
            clone.push(0x00);
            clone.push(0x00);
            clone
        };

        do_mutated_decode_failure_test(&MqttPacket::Puback(packet), extend_length);
    }
}
