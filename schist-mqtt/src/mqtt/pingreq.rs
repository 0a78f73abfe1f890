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

/// Data model of an [MQTT 3.1.1 PINGREQ](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718081) packet.
///
/// Keep-alive probe sent by the client.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PingreqPacket {}

define_empty_packet_encoding_impl!(write_pingreq_encoding_steps, PingreqPacket, PINGREQ_FIRST_BYTE);
define_empty_packet_decode_function!(decode_pingreq_packet, Pingreq, PingreqPacket, PINGREQ_FIRST_BYTE);

impl fmt::Display for PingreqPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PingreqPacket {{}}")
    }
}
