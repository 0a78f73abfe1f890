/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

pub(crate) mod utils;

use crate::decode::utils::*;
use crate::encode::utils::MAXIMUM_VARIABLE_LENGTH_INTEGER;
use crate::error::{SchistError, SchistResult};
use crate::logging::*;
use crate::mqtt::*;
use crate::mqtt::utils::*;

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

use log::*;

use std::collections::VecDeque;

const DECODE_BUFFER_DEFAULT_SIZE : usize = 16 * 1024;

/* a remaining length never needs more than four bytes */
const MAXIMUM_VLI_BYTES : usize = 4;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum DecoderState {
    AwaitingFixedHeader,
    AccumulatingRemainingLength { first_byte: u8 },
    AccumulatingBody { first_byte: u8, remaining_length: usize },
    Failed
}

pub(crate) struct DecodingContext<'a> {

    /// Zero means no limit beyond what the remaining length field can express
    pub(crate) maximum_packet_size : u32,

    pub(crate) decoded_packets: &'a mut VecDeque<Box<MqttPacket>>
}

/// Streaming MQTT 3.1.1 packet decoder.  Bytes may be fed in arbitrarily-sized fragments; every
/// complete packet is appended to the context's queue.  Any malformed input moves the decoder into
/// a terminal state from which only `reset_for_new_connection` recovers.
pub(crate) struct Decoder {
    state: DecoderState,

    // partial remaining length bytes, then partial body bytes, across calls
    pending_bytes: Vec<u8>,
}

fn decode_packet(first_byte: u8, packet_body: &[u8]) -> SchistResult<Box<MqttPacket>> {
    let packet_type = first_byte >> 4;

    trace!("decode_packet - packet type {}, {} body bytes", packet_type, packet_body.len());

    match packet_type {
        PACKET_TYPE_CONNECT => { decode_connect_packet(first_byte, packet_body) }
        PACKET_TYPE_CONNACK => { decode_connack_packet(first_byte, packet_body) }
        PACKET_TYPE_PUBLISH => { decode_publish_packet(first_byte, packet_body) }
        PACKET_TYPE_PUBACK => { decode_puback_packet(first_byte, packet_body) }
        PACKET_TYPE_PUBREC => { decode_pubrec_packet(first_byte, packet_body) }
        PACKET_TYPE_PUBREL => { decode_pubrel_packet(first_byte, packet_body) }
        PACKET_TYPE_PUBCOMP => { decode_pubcomp_packet(first_byte, packet_body) }
        PACKET_TYPE_SUBSCRIBE => { decode_subscribe_packet(first_byte, packet_body) }
        PACKET_TYPE_SUBACK => { decode_suback_packet(first_byte, packet_body) }
        PACKET_TYPE_UNSUBSCRIBE => { decode_unsubscribe_packet(first_byte, packet_body) }
        PACKET_TYPE_UNSUBACK => { decode_unsuback_packet(first_byte, packet_body) }
        PACKET_TYPE_PINGREQ => { decode_pingreq_packet(first_byte, packet_body) }
        PACKET_TYPE_PINGRESP => { decode_pingresp_packet(first_byte, packet_body) }
        PACKET_TYPE_DISCONNECT => { decode_disconnect_packet(first_byte, packet_body) }
        _ => {
            let message = format!("decode_packet - unsupported packet type ({})", packet_type);
            error!("{}", message);
            Err(SchistError::new_decoding_failure(message))
        }
    }
}

impl Decoder {
    pub(crate) fn new() -> Decoder {
        Decoder {
            state: DecoderState::AwaitingFixedHeader,
            pending_bytes : Vec::<u8>::with_capacity(DECODE_BUFFER_DEFAULT_SIZE),
        }
    }

    pub(crate) fn reset_for_new_connection(&mut self) {
        self.state = DecoderState::AwaitingFixedHeader;
        self.pending_bytes.clear();
    }

    /// Consumes as much of `bytes` as possible.  Returns the unconsumed tail, or `None` once the
    /// input is exhausted.
    fn step<'a>(&mut self, bytes: &'a [u8], context: &mut DecodingContext) -> SchistResult<Option<&'a [u8]>> {
        let Some((&next_byte, rest)) = bytes.split_first() else {
            if let DecoderState::AccumulatingBody { first_byte, remaining_length: 0 } = self.state {
                self.complete_packet(first_byte, &[], context)?;
            }
            return Ok(None);
        };

        match self.state {
            DecoderState::AwaitingFixedHeader => {
                self.state = DecoderState::AccumulatingRemainingLength { first_byte: next_byte };
                Ok(Some(rest))
            }
            DecoderState::AccumulatingRemainingLength { first_byte } => {
                self.pending_bytes.push(next_byte);
                self.on_remaining_length_byte(first_byte, context)?;
                Ok(Some(rest))
            }
            DecoderState::AccumulatingBody { first_byte, remaining_length } => {
                let missing = remaining_length - self.pending_bytes.len();
                if missing > bytes.len() {
                    self.pending_bytes.extend_from_slice(bytes);
                    return Ok(None);
                }

                let (body_tail, rest) = bytes.split_at(missing);
                if self.pending_bytes.is_empty() {
                    self.complete_packet(first_byte, body_tail, context)?;
                } else {
                    let mut body = std::mem::take(&mut self.pending_bytes);
                    body.extend_from_slice(body_tail);
                    let result = self.complete_packet(first_byte, &body, context);
                    body.clear();
                    self.pending_bytes = body;
                    result?;
                }

                Ok(Some(rest))
            }
            DecoderState::Failed => {
                Err(SchistError::new_decoding_failure("decoder is in a failed state"))
            }
        }
    }

    fn on_remaining_length_byte(&mut self, first_byte: u8, context: &DecodingContext) -> SchistResult<()> {
        let remaining_length = match decode_vli(&self.pending_bytes)? {
            DecodeVliResult::InsufficientData => {
                if self.pending_bytes.len() >= MAXIMUM_VLI_BYTES {
                    return Err(SchistError::new_decoding_failure("remaining length exceeds four bytes"));
                }
                return Ok(());
            }
            DecodeVliResult::Value(value, _) => { value as usize }
        };

        let maximum_packet_size = match context.maximum_packet_size {
            0 => { MAXIMUM_VARIABLE_LENGTH_INTEGER }
            limit => { limit as usize }
        };

        let packet_size = 1 + self.pending_bytes.len() + remaining_length;
        if packet_size > maximum_packet_size {
            let message = format!("Decoder - incoming packet size ({}) exceeds maximum ({})", packet_size, maximum_packet_size);
            error!("{}", message);
            return Err(SchistError::new_decoding_failure(message));
        }

        self.pending_bytes.clear();
        self.state = DecoderState::AccumulatingBody { first_byte, remaining_length };
        Ok(())
    }

    fn complete_packet(&mut self, first_byte: u8, body: &[u8], context: &mut DecodingContext) -> SchistResult<()> {
        let packet = decode_packet(first_byte, body)?;
        log_packet("Successfully decoded incoming packet: ", &packet);
        context.decoded_packets.push_back(packet);

        self.state = DecoderState::AwaitingFixedHeader;
        Ok(())
    }

    pub(crate) fn decode_bytes(&mut self, bytes: &[u8], context: &mut DecodingContext) -> SchistResult<()> {
        let mut unconsumed = bytes;

        loop {
            match self.step(unconsumed, context) {
                Ok(Some(rest)) => { unconsumed = rest; }
                Ok(None) => { return Ok(()); }
                Err(error) => {
                    self.state = DecoderState::Failed;
                    self.pending_bytes.clear();
                    return Err(error);
                }
            }
        }
    }
}
