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

/// Data model of an [MQTT 3.1.1 CONNACK](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718033) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnackPacket {

    /// True if the broker is resuming an existing session for this client id
    pub session_present: bool,

    /// Outcome of the connection attempt
    pub return_code: ConnectReturnCode,
}

pub(crate) fn write_connack_encoding_steps(packet: &ConnackPacket, steps: &mut VecDeque<EncodingStep>) -> SchistResult<()> {
    push_step!(steps, Uint8(CONNACK_FIRST_BYTE));
    push_step!(steps, Vli(2));
    push_step!(steps, Uint8(if packet.session_present { 1 } else { 0 }));
    push_step!(steps, Uint8(packet.return_code as u8));

    Ok(())
}

pub(crate) fn decode_connack_packet(first_byte: u8, packet_body: &[u8]) -> SchistResult<Box<MqttPacket>> {
    if first_byte != CONNACK_FIRST_BYTE {
        let message = "decode_connack_packet - invalid first byte";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    if packet_body.len() != 2 {
        let message = "decode_connack_packet - invalid remaining length";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    let mut packet = ConnackPacket { ..Default::default() };

    let mut flags : u8 = 0;
    let mut mutable_body = decode_u8(packet_body, &mut flags)?;

    // only the session present bit may be set
    if (flags & !1u8) != 0 {
        let message = "decode_connack_packet - reserved acknowledge flags set";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    packet.session_present = flags == 1;

    let mut return_code : u8 = 0;
    mutable_body = decode_u8(mutable_body, &mut return_code)?;
    packet.return_code = ConnectReturnCode::try_from(return_code)?;

    if packet.session_present && !packet.return_code.is_success() {
        let message = "decode_connack_packet - session present set on a refused connection";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    if !mutable_body.is_empty() {
        let message = "decode_connack_packet - body length does not match expected overall packet length";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    Ok(Box::new(MqttPacket::Connack(packet)))
}

impl fmt::Display for ConnackPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ConnackPacket {{")?;
        write_field!(f, "session_present", self.session_present);
        write_field!(f, "return_code", connect_return_code_to_str(self.return_code));
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::testing::*;

    #[test]
    fn connack_round_trip_encode_decode() {
        let packet = ConnackPacket {
            session_present: true,
            return_code: ConnectReturnCode::Accepted,
        };

        assert!(do_round_trip_encode_decode_test(&MqttPacket::Connack(packet)));
    }

    #[test]
    fn connack_round_trip_encode_decode_refused() {
        let packet = ConnackPacket {
            session_present: false,
            return_code: ConnectReturnCode::NotAuthorized,
        };

        assert!(do_round_trip_encode_decode_test(&MqttPacket::Connack(packet)));
    }

    #[test]
    fn connack_decode_failure_bad_fixed_header() {
        let packet = ConnackPacket {
            session_present: true,
            return_code: ConnectReturnCode::Accepted,
        };

        do_fixed_header_flag_decode_failure_test(&MqttPacket::Connack(packet), 9);
    }

    #[test]
    fn connack_decode_failure_reserved_acknowledge_flags() {
        let packet = ConnackPacket {
            session_present: true,
            return_code: ConnectReturnCode::Accepted,
        };

        let set_reserved_flag = | bytes: &[u8] | -> Vec<u8> {
            let mut clone = bytes.to_vec();
            clone[2] |= 0x04;
            clone
        };

        do_mutated_decode_failure_test(&MqttPacket::Connack(packet), set_reserved_flag);
    }

    #[test]
    fn connack_decode_failure_unknown_return_code() {
        let packet = ConnackPacket {
            session_present: false,
            return_code: ConnectReturnCode::Accepted,
        };

        let set_bad_return_code = | bytes: &[u8] | -> Vec<u8> {
            let mut clone = bytes.to_vec();
            clone[3] = 6;
            clone
        };

        do_mutated_decode_failure_test(&MqttPacket::Connack(packet), set_bad_return_code);
    }

    #[test]
    fn connack_decode_failure_bad_remaining_length() {
        let packet = ConnackPacket {
            session_present: false,
            return_code: ConnectReturnCode::Accepted,
        };

        let extend_length = | bytes: &[u8] | -> Vec<u8> {
            let mut clone = bytes.to_vec();
            clone[1] = 3;
            clone.push(0);
            clone
        };

        do_mutated_decode_failure_test(&MqttPacket::Connack(packet), extend_length);
    }
}
