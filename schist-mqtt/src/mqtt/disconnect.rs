/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::decode::utils::*;
use crate::encode::utils::*;
use crate::error::{SchistError, SchistResult};
use crate::mqtt::*;
use crate::mqtt::utils::*;

use log::*;
use std::collections::VecDeque;
use std::fmt;

/// Data model of an [MQTT 3.1.1 DISCONNECT](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718090) packet.
///
/// Clean shutdown notification sent by the client before closing the transport.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DisconnectPacket {}

define_empty_packet_encoding_impl!(write_disconnect_encoding_steps, DisconnectPacket, DISCONNECT_FIRST_BYTE);
define_empty_packet_decode_function!(decode_disconnect_packet, Disconnect, DisconnectPacket, DISCONNECT_FIRST_BYTE);

impl fmt::Display for DisconnectPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DisconnectPacket {{}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::testing::*;

    #[test]
    fn disconnect_round_trip_encode_decode() {
        let packet = DisconnectPacket {};
        assert!(do_round_trip_encode_decode_test(&MqttPacket::Disconnect(packet)));
    }

    #[test]
    fn disconnect_decode_failure_bad_fixed_header() {
        let packet = DisconnectPacket {};

        do_fixed_header_flag_decode_failure_test(&MqttPacket::Disconnect(packet), 0x0F);
    }

    #[test]
    fn disconnect_decode_failure_non_empty_body() {
        let packet = DisconnectPacket {};

        let add_body = | bytes: &[u8] | -> Vec<u8> {
            let mut clone = bytes.to_vec();
            clone[1] = 1;
            clone.push(0);
            clone
        };

        do_mutated_decode_failure_test(&MqttPacket::Disconnect(packet), add_body);
    }
}
