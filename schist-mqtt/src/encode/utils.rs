/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

// Internal utilities to encode MQTT 3.1.1 packets

use crate::error::{SchistError, SchistResult};
use crate::mqtt::*;

pub(crate) enum EncodingStep {
    Uint8(u8),
    Uint16(u16),
    Vli(u32),
    StringSlice(fn(&MqttPacket) -> &str),
    BytesSlice(fn(&MqttPacket) -> &[u8]),
    IndexedString(fn(&MqttPacket, usize) -> &str, usize),
}

/* getters hand string and byte fields to the step processor without copying them */
macro_rules! packet_field {
    ($packet: expr, $variant: path, $field: ident) => {
        match $packet {
            $variant(inner) => &inner.$field,
            _ => unreachable!("getter applied to the wrong packet variant"),
        }
    };
}

macro_rules! optional_packet_field {
    ($packet: expr, $variant: path, $field: ident) => {
        match $packet {
            $variant(inner) => match &inner.$field {
                Some(value) => value,
                None => unreachable!("getter applied to an absent field"),
            },
            _ => unreachable!("getter applied to the wrong packet variant"),
        }
    };
}

macro_rules! push_step {
    ($steps: ident, $step: ident($($value: expr),+)) => {
        $steps.push_back(EncodingStep::$step($($value),+))
    };
}

macro_rules! push_bytes {
    ($steps: ident, $getter: ident) => {
        push_step!($steps, BytesSlice($getter as fn(&MqttPacket) -> &[u8]))
    };
}

macro_rules! push_prefixed_bytes {
    ($steps: ident, $getter: ident, $bytes: expr) => {{
        push_step!($steps, Uint16($bytes.len() as u16));
        push_bytes!($steps, $getter);
    }};
}

macro_rules! push_prefixed_string {
    ($steps: ident, $getter: ident, $text: expr) => {{
        push_step!($steps, Uint16($text.len() as u16));
        push_step!($steps, StringSlice($getter as fn(&MqttPacket) -> &str));
    }};
}

macro_rules! push_prefixed_indexed_string {
    ($steps: ident, $getter: ident, $text: expr, $index: expr) => {{
        push_step!($steps, Uint16($text.len() as u16));
        push_step!($steps, IndexedString($getter as fn(&MqttPacket, usize) -> &str, $index));
    }};
}

pub(crate) use {optional_packet_field, packet_field, push_bytes, push_prefixed_bytes, push_prefixed_indexed_string, push_prefixed_string, push_step};

/*****************************************************/

/* 3.1.1 acks are a fixed header followed by nothing but the packet id */
macro_rules! define_ack_packet_encoding_impl {
    ($function_name: ident, $packet_type: ident, $first_byte: expr) => {
        pub(crate) fn $function_name(packet: &$packet_type, steps: &mut std::collections::VecDeque<EncodingStep>) -> SchistResult<()> {
            push_step!(steps, Uint8($first_byte));
            push_step!(steps, Vli(2));
            push_step!(steps, Uint16(packet.packet_id));

            Ok(())
        }
    };
}

pub(crate) use define_ack_packet_encoding_impl;

/* pingreq, pingresp, and disconnect are a bare fixed header */
macro_rules! define_empty_packet_encoding_impl {
    ($function_name: ident, $packet_type: ident, $first_byte: expr) => {
        pub(crate) fn $function_name(_: &$packet_type, steps: &mut std::collections::VecDeque<EncodingStep>) -> SchistResult<()> {
            push_step!(steps, Uint8($first_byte));
            push_step!(steps, Vli(0));

            Ok(())
        }
    };
}

pub(crate) use define_empty_packet_encoding_impl;

/*****************************************************/

/// Largest value a remaining-length field can carry in four bytes
pub(crate) const MAXIMUM_VARIABLE_LENGTH_INTEGER: usize = (1 << 28) - 1;

pub(crate) fn check_remaining_length(context: &str, remaining_length: usize) -> SchistResult<u32> {
    match u32::try_from(remaining_length) {
        Ok(length) if remaining_length <= MAXIMUM_VARIABLE_LENGTH_INTEGER => Ok(length),
        _ => Err(SchistError::new_encoding_failure(format!("{} - remaining length {} does not fit in four vli bytes", context, remaining_length))),
    }
}

fn encode_vli(value: u32, dest: &mut Vec<u8>) -> SchistResult<()> {
    if value as usize > MAXIMUM_VARIABLE_LENGTH_INTEGER {
        return Err(SchistError::new_encoding_failure(format!("encode_vli - {} does not fit in four vli bytes", value)));
    }

    let mut remaining = value;
    loop {
        let low_bits = (remaining & 0x7F) as u8;
        remaining >>= 7;

        if remaining == 0 {
            dest.push(low_bits);
            return Ok(());
        }

        dest.push(low_bits | 0x80);
    }
}

pub(crate) fn process_encoding_step(step: EncodingStep, packet: &MqttPacket, dest: &mut Vec<u8>) -> SchistResult<()> {
    match step {
        EncodingStep::Uint8(byte) => dest.push(byte),
        EncodingStep::Uint16(value) => dest.extend_from_slice(&value.to_be_bytes()),
        EncodingStep::Vli(value) => encode_vli(value, dest)?,
        EncodingStep::StringSlice(getter) => dest.extend_from_slice(getter(packet).as_bytes()),
        EncodingStep::BytesSlice(getter) => dest.extend_from_slice(getter(packet)),
        EncodingStep::IndexedString(getter, index) => dest.extend_from_slice(getter(packet, index).as_bytes()),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::utils::*;

    macro_rules! assert_vli_encoding_equals {
        ($target: ident, $value: expr, $expected_result: expr) => {{
            let mut $target = Vec::<u8>::with_capacity(4);
            assert!(encode_vli($value, &mut $target).is_ok());
            assert_eq!($expected_result, &$target[..]);
        }};
    }

    macro_rules! assert_vli_round_trip_success {
        ($value: expr, $expected_length: expr) => {{
            let mut dest = Vec::<u8>::with_capacity(4);
            assert!(encode_vli($value, &mut dest).is_ok());

            for i in 1..dest.len() {
                let insufficient_data_result = decode_vli(&dest[..i]);
                assert_eq!(DecodeVliResult::InsufficientData, insufficient_data_result.unwrap());
            }

            assert_eq!($expected_length, dest.len());
            assert_eq!(DecodeVliResult::Value($value, &dest[dest.len()..]), decode_vli(&dest).unwrap());
        }};
    }

    #[test]
    fn vli_round_trips() {
        assert_vli_round_trip_success!(0, 1);
        assert_vli_round_trip_success!(127, 1);
        assert_vli_round_trip_success!(128, 2);
        assert_vli_round_trip_success!(16383, 2);
        assert_vli_round_trip_success!(16384, 3);
        assert_vli_round_trip_success!(2097151, 3);
        assert_vli_round_trip_success!(2097152, 4);
        assert_vli_round_trip_success!(MAXIMUM_VARIABLE_LENGTH_INTEGER as u32, 4);
    }

    #[test]
    fn encode_vli_successes() {
        assert_vli_encoding_equals!(dest, 0, [0u8]);
        assert_vli_encoding_equals!(dest, 127, [127u8]);
        assert_vli_encoding_equals!(dest, 128, [0x80u8, 1u8]);
        assert_vli_encoding_equals!(dest, 321, [0xC1u8, 2u8]);
    }

    #[test]
    fn encode_vli_failures() {
        let mut dest = Vec::<u8>::with_capacity(4);
        assert!(encode_vli(MAXIMUM_VARIABLE_LENGTH_INTEGER as u32 + 1, &mut dest).is_err());
        assert!(encode_vli(0xFFFFFFFFu32, &mut dest).is_err());
    }

    #[test]
    fn remaining_length_bounds() {
        assert_eq!(0, check_remaining_length("test", 0).unwrap());
        assert_eq!(MAXIMUM_VARIABLE_LENGTH_INTEGER as u32, check_remaining_length("test", MAXIMUM_VARIABLE_LENGTH_INTEGER).unwrap());
        assert!(check_remaining_length("test", MAXIMUM_VARIABLE_LENGTH_INTEGER + 1).is_err());
    }
}
