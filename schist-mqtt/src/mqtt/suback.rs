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

/// Data model of an [MQTT 3.1.1 SUBACK](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718068) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubackPacket {

    /// Id of the SUBSCRIBE being acknowledged
    pub packet_id: u16,

    /// One result per topic filter, in the order the filters appeared in the SUBSCRIBE
    pub return_codes: Vec<SubackReturnCode>,
}

pub(crate) fn write_suback_encoding_steps(packet: &SubackPacket, steps: &mut VecDeque<EncodingStep>) -> SchistResult<()> {
    let total_remaining_length = check_remaining_length("write_suback_encoding_steps", 2 + packet.return_codes.len())?;

    push_step!(steps, Uint8(SUBACK_FIRST_BYTE));
    push_step!(steps, Vli(total_remaining_length));
    push_step!(steps, Uint16(packet.packet_id));

    for return_code in &packet.return_codes {
        push_step!(steps, Uint8(*return_code as u8));
    }

    Ok(())
}

pub(crate) fn decode_suback_packet(first_byte: u8, packet_body: &[u8]) -> SchistResult<Box<MqttPacket>> {
    if first_byte != SUBACK_FIRST_BYTE {
        let message = "decode_suback_packet - invalid first byte";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    let mut packet = SubackPacket { ..Default::default() };

    let mutable_body = decode_u16(packet_body, &mut packet.packet_id)?;
    if mutable_body.is_empty() {
        let message = "decode_suback_packet - no return codes";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    packet.return_codes.reserve(mutable_body.len());
    for return_code in mutable_body {
        packet.return_codes.push(convert_u8_to_suback_return_code(*return_code)?);
    }

    Ok(Box::new(MqttPacket::Suback(packet)))
}

impl fmt::Display for SubackPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SubackPacket {{")?;
        write_field!(f, "packet_id", self.packet_id);
        write!(f, " return_codes: [")?;
        for (i, return_code) in self.return_codes.iter().enumerate() {
            write!(f, " {}:{}", i, suback_return_code_to_str(*return_code))?;
        }
        write!(f, " ]")?;
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::testing::*;

    fn create_suback_packet() -> SubackPacket {
        SubackPacket {
            packet_id: 1023,
            return_codes: vec![
                SubackReturnCode::GrantedQos1,
                SubackReturnCode::Failure,
                SubackReturnCode::GrantedQos2,
                SubackReturnCode::GrantedQos0,
            ],
        }
    }

    #[test]
    fn suback_round_trip_encode_decode() {
        assert!(do_round_trip_encode_decode_test(&MqttPacket::Suback(create_suback_packet())));
    }

    #[test]
    fn suback_decode_failure_bad_fixed_header() {
        do_fixed_header_flag_decode_failure_test(&MqttPacket::Suback(create_suback_packet()), 10);
    }

    #[test]
    fn suback_decode_failure_unknown_return_code() {
        let corrupt_return_code = | bytes: &[u8] | -> Vec<u8> {
            let mut clone = bytes.to_vec();
            clone[4] = 0x03;
            clone
        };

        do_mutated_decode_failure_test(&MqttPacket::Suback(create_suback_packet()), corrupt_return_code);
    }

    #[test]
    fn suback_decode_failure_no_return_codes() {
        let packet = SubackPacket {
            packet_id: 7,
            return_codes: vec![ SubackReturnCode::GrantedQos0 ],
        };

        let remove_return_codes = | bytes: &[u8] | -> Vec<u8> {
            let mut clone = bytes.to_vec();
            clone[1] = 2;
            clone.pop();
            clone
        };

        do_mutated_decode_failure_test(&MqttPacket::Suback(packet), remove_return_codes);
    }
}
