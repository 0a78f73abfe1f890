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

/// Data model of an [MQTT 3.1.1 PUBREC](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718048) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PubrecPacket {

    /// Id of the QoS 2 publish being received
    pub packet_id: u16,
}

define_ack_packet_encoding_impl!(write_pubrec_encoding_steps, PubrecPacket, PUBREC_FIRST_BYTE);
define_ack_packet_decode_function!(decode_pubrec_packet, Pubrec, PubrecPacket, PUBREC_FIRST_BYTE);
impl_ack_packet_display!(PubrecPacket);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::testing::*;

    #[test]
    fn pubrec_round_trip_encode_decode() {
        let packet = PubrecPacket {
            packet_id: 1,
        };

        assert!(do_round_trip_encode_decode_test(&MqttPacket::Pubrec(packet)));
    }

    #[test]
    fn pubrec_decode_failure_bad_fixed_header() {
        let packet = PubrecPacket {
            packet_id: 777,
        };

        do_fixed_header_flag_decode_failure_test(&MqttPacket::Pubrec(packet), 2);
    }

    #[test]
    fn pubrec_decode_failure_truncated() {
        let packet = PubrecPacket {
            packet_id: 777,
        };

        let truncate = | bytes: &[u8] | -> Vec<u8> {
            let mut clone = bytes.to_vec();
            clone[1] = 1;
            clone.pop();
            clone
        };

        do_mutated_decode_failure_test(&MqttPacket::Pubrec(packet), truncate);
    }
}
