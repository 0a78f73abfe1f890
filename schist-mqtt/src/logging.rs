/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::mqtt::*;
use crate::mqtt::utils::mqtt_packet_to_str;
use log::*;
use std::fmt;

/* packet Display impls render as `Name { field:value field:"text" }` */
macro_rules! write_field {
    ($formatter: expr, $name: expr, $value: expr) => {
        write!($formatter, " {}:{}", $name, $value)?
    };
}

macro_rules! write_quoted_field {
    ($formatter: expr, $name: expr, $value: expr) => {
        write!($formatter, " {}:\"{}\"", $name, $value)?
    };
}

macro_rules! impl_ack_packet_display {
    ($packet_type: ident) => {
        impl fmt::Display for $packet_type {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{} {{", stringify!($packet_type))?;
                write_field!(f, "packet_id", self.packet_id);
                write!(f, " }}")
            }
        }
    };
}

pub(crate) use {impl_ack_packet_display, write_field, write_quoted_field};

impl fmt::Display for MqttPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MqttPacket::Connect(packet) => { packet.fmt(f) }
            MqttPacket::Connack(packet) => { packet.fmt(f) }
            MqttPacket::Publish(packet) => { packet.fmt(f) }
            MqttPacket::Puback(packet) => { packet.fmt(f) }
            MqttPacket::Pubrec(packet) => { packet.fmt(f) }
            MqttPacket::Pubrel(packet) => { packet.fmt(f) }
            MqttPacket::Pubcomp(packet) => { packet.fmt(f) }
            MqttPacket::Subscribe(packet) => { packet.fmt(f) }
            MqttPacket::Suback(packet) => { packet.fmt(f) }
            MqttPacket::Unsubscribe(packet) => { packet.fmt(f) }
            MqttPacket::Unsuback(packet) => { packet.fmt(f) }
            MqttPacket::Pingreq(packet) => { packet.fmt(f) }
            MqttPacket::Pingresp(packet) => { packet.fmt(f) }
            MqttPacket::Disconnect(packet) => { packet.fmt(f) }
        }
    }
}

/// Info level names the packet; debug and trace dump its fields
pub(crate) fn log_packet(prefix: &str, packet: &MqttPacket) {
    if log_enabled!(Level::Debug) {
        debug!("{}{}", prefix, packet);
    } else {
        info!("{}{}", prefix, mqtt_packet_to_str(packet));
    }
}
