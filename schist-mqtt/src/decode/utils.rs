/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::error::{SchistError, SchistResult};

use log::*;

#[derive(Eq, PartialEq, Debug)]
pub(crate) enum DecodeVliResult<'a> {
    InsufficientData,
    Value(u32, &'a[u8]), /* (decoded value, remaining bytes) */
}

pub(crate) fn decode_vli(buffer: &[u8]) -> SchistResult<DecodeVliResult<'_>> {
    let mut value: u32 = 0;
    let mut shift: u32 = 0;
    let data_len = buffer.len();

    for i in 0..4 {
        if i >= data_len {
            return Ok(DecodeVliResult::InsufficientData);
        }

        let byte = buffer[i];
        value |= ((byte & 0x7F) as u32) << shift;
        shift += 7;

        if (byte & 0x80) == 0 {
            return Ok(DecodeVliResult::Value(value, &buffer[(i + 1)..]));
        }
    }

    error!("decode_vli - invalid variable length integer");
    Err(SchistError::new_decoding_failure("invalid variable length integer"))
}

fn read_length_prefix(bytes: &[u8], function_name: &str) -> SchistResult<usize> {
    if bytes.len() < 2 {
        let message = format!("{} - value does not have a full length prefix", function_name);
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    Ok(u16::from_be_bytes([bytes[0], bytes[1]]) as usize)
}

pub(crate) fn decode_length_prefixed_string<'a>(bytes: &'a[u8], value: &mut String) -> SchistResult<&'a[u8]> {
    let value_length = read_length_prefix(bytes, "decode_length_prefixed_string")?;
    let mutable_bytes = &bytes[2..];
    if value_length > mutable_bytes.len() {
        let message = "decode_length_prefixed_string - string value has length larger than remaining packet bytes";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    let decode_utf8_result = std::str::from_utf8(&mutable_bytes[..value_length])?;
    *value = decode_utf8_result.to_string();
    Ok(&mutable_bytes[(value_length)..])
}

pub(crate) fn decode_optional_length_prefixed_string<'a>(bytes: &'a[u8], value: &mut Option<String>) -> SchistResult<&'a[u8]> {
    let mut decoded = String::new();
    let remaining_bytes = decode_length_prefixed_string(bytes, &mut decoded)?;
    *value = Some(decoded);
    Ok(remaining_bytes)
}

pub(crate) fn decode_optional_length_prefixed_bytes<'a>(bytes: &'a[u8], value: &mut Option<Vec<u8>>) -> SchistResult<&'a[u8]> {
    let value_length = read_length_prefix(bytes, "decode_optional_length_prefixed_bytes")?;
    let mutable_bytes = &bytes[2..];
    if value_length > mutable_bytes.len() {
        let message = "decode_optional_length_prefixed_bytes - binary value has length larger than remaining packet bytes";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    *value = Some(Vec::from(&mutable_bytes[..value_length]));
    Ok(&mutable_bytes[(value_length)..])
}

pub(crate) fn decode_u8<'a>(bytes: &'a[u8], value: &mut u8) -> SchistResult<&'a[u8]> {
    if bytes.is_empty() {
        let message = "decode_u8 - insufficient packet bytes";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    *value = bytes[0];

    Ok(&bytes[1..])
}

pub(crate) fn decode_u16<'a>(bytes: &'a[u8], value: &mut u16) -> SchistResult<&'a[u8]> {
    if bytes.len() < 2 {
        let message = "decode_u16 - insufficient packet bytes";
        error!("{}", message);
        return Err(SchistError::new_decoding_failure(message));
    }

    *value = u16::from_be_bytes([bytes[0], bytes[1]]);

    Ok(&bytes[2..])
}

/* 3.1.1 acks carry exactly a packet id; anything else is malformed */
macro_rules! define_ack_packet_decode_function {
    ($function_name: ident, $mqtt_packet_type:ident, $packet_type: ident, $first_byte: expr) => {
        pub(crate) fn $function_name(first_byte: u8, packet_body: &[u8]) -> SchistResult<Box<MqttPacket>> {
            if first_byte != $first_byte {
                let message = format!("{} - invalid first byte", stringify!($function_name));
                error!("{}", message);
                return Err(SchistError::new_decoding_failure(message));
            }

            if packet_body.len() != 2 {
                let message = format!("{} - invalid remaining length", stringify!($function_name));
                error!("{}", message);
                return Err(SchistError::new_decoding_failure(message));
            }

            let mut packet = $packet_type { ..Default::default() };
            decode_u16(packet_body, &mut packet.packet_id)?;

            Ok(Box::new(MqttPacket::$mqtt_packet_type(packet)))
        }
    };
}

pub(crate) use define_ack_packet_decode_function;

macro_rules! define_empty_packet_decode_function {
    ($function_name: ident, $mqtt_packet_type:ident, $packet_type: ident, $first_byte: expr) => {
        pub(crate) fn $function_name(first_byte: u8, packet_body: &[u8]) -> SchistResult<Box<MqttPacket>> {
            if first_byte != $first_byte {
                let message = format!("{} - invalid first byte", stringify!($function_name));
                error!("{}", message);
                return Err(SchistError::new_decoding_failure(message));
            }

            if !packet_body.is_empty() {
                let message = format!("{} - non-zero remaining length", stringify!($function_name));
                error!("{}", message);
                return Err(SchistError::new_decoding_failure(message));
            }

            Ok(Box::new(MqttPacket::$mqtt_packet_type($packet_type {})))
        }
    };
}

pub(crate) use define_empty_packet_decode_function;
