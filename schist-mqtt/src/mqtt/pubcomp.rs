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

/// Data model of an [MQTT 3.1.1 PUBCOMP](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718058) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PubcompPacket {

    /// Id of the QoS 2 publish being completed
    pub packet_id: u16,
}

define_ack_packet_encoding_impl!(write_pubcomp_encoding_steps, PubcompPacket, PUBCOMP_FIRST_BYTE);
define_ack_packet_decode_function!(decode_pubcomp_packet, Pubcomp, PubcompPacket, PUBCOMP_FIRST_BYTE);
impl_ack_packet_display!(PubcompPacket);
