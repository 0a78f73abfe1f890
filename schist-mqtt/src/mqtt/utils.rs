/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing miscellaneous constants and conversion functions related to the MQTT 3.1.1
specification.
 */

use crate::error::{SchistError, SchistResult};
use crate::mqtt::*;

use log::*;

pub(crate) const PACKET_TYPE_CONNECT: u8 = 1;
pub(crate) const PACKET_TYPE_CONNACK: u8 = 2;
pub(crate) const PACKET_TYPE_PUBLISH: u8 = 3;
pub(crate) const PACKET_TYPE_PUBACK: u8 = 4;
pub(crate) const PACKET_TYPE_PUBREC: u8 = 5;
pub(crate) const PACKET_TYPE_PUBREL: u8 = 6;
pub(crate) const PACKET_TYPE_PUBCOMP: u8 = 7;
pub(crate) const PACKET_TYPE_SUBSCRIBE: u8 = 8;
pub(crate) const PACKET_TYPE_SUBACK: u8 = 9;
pub(crate) const PACKET_TYPE_UNSUBSCRIBE: u8 = 10;
pub(crate) const PACKET_TYPE_UNSUBACK: u8 = 11;
pub(crate) const PACKET_TYPE_PINGREQ: u8 = 12;
pub(crate) const PACKET_TYPE_PINGRESP: u8 = 13;
pub(crate) const PACKET_TYPE_DISCONNECT: u8 = 14;

pub(crate) const PUBLISH_PACKET_FIXED_HEADER_DUPLICATE_FLAG : u8 = 8;
pub(crate) const PUBLISH_PACKET_FIXED_HEADER_RETAIN_FLAG : u8 = 1;
pub(crate) const QOS_MASK : u8 = 3;

pub(crate) const CONNECT_PACKET_CLEAN_SESSION_FLAG_MASK : u8 = 1 << 1;
pub(crate) const CONNECT_PACKET_HAS_WILL_FLAG_MASK : u8 = 1 << 2;
pub(crate) const CONNECT_PACKET_WILL_QOS_FLAG_SHIFT : u8 = 3;
pub(crate) const CONNECT_PACKET_WILL_RETAIN_FLAG_MASK : u8 = 1 << 5;
pub(crate) const CONNECT_PACKET_HAS_PASSWORD_FLAG_MASK : u8 = 1 << 6;
pub(crate) const CONNECT_PACKET_HAS_USERNAME_FLAG_MASK : u8 = 1 << 7;

pub(crate) const CONNECT_FIRST_BYTE : u8 = PACKET_TYPE_CONNECT << 4;
pub(crate) const CONNACK_FIRST_BYTE : u8 = PACKET_TYPE_CONNACK << 4;
pub(crate) const PUBACK_FIRST_BYTE : u8 = PACKET_TYPE_PUBACK << 4;
pub(crate) const PUBREC_FIRST_BYTE : u8 = PACKET_TYPE_PUBREC << 4;
pub(crate) const PUBREL_FIRST_BYTE : u8 = (PACKET_TYPE_PUBREL << 4) | (0x02u8);
pub(crate) const PUBCOMP_FIRST_BYTE : u8 = PACKET_TYPE_PUBCOMP << 4;
pub(crate) const SUBSCRIBE_FIRST_BYTE : u8 = (PACKET_TYPE_SUBSCRIBE << 4) | (0x02u8);
pub(crate) const SUBACK_FIRST_BYTE : u8 = PACKET_TYPE_SUBACK << 4;
pub(crate) const UNSUBSCRIBE_FIRST_BYTE : u8 = (PACKET_TYPE_UNSUBSCRIBE << 4) | (0x02u8);
pub(crate) const UNSUBACK_FIRST_BYTE : u8 = PACKET_TYPE_UNSUBACK << 4;
pub(crate) const PINGREQ_FIRST_BYTE : u8 = PACKET_TYPE_PINGREQ << 4;
pub(crate) const PINGRESP_FIRST_BYTE : u8 = PACKET_TYPE_PINGRESP << 4;
pub(crate) const DISCONNECT_FIRST_BYTE : u8 = PACKET_TYPE_DISCONNECT << 4;

/// Protocol level byte for MQTT 3.1.1
pub const MQTT311_PROTOCOL_LEVEL : u8 = 4;

/// Longest client identifier a 3.1.1 broker is required to accept
pub const MAXIMUM_CLIENT_ID_LENGTH : usize = 23;

pub(crate) const MAXIMUM_STRING_LENGTH : usize = 65535;
pub(crate) const MAXIMUM_BINARY_LENGTH : usize = 65535;

/// Converts an integer to an MQTT quality of service value, if possible.
pub fn convert_u8_to_quality_of_service(value: u8) -> SchistResult<QualityOfService> {
    match value {
        0 => { Ok(QualityOfService::AtMostOnce) }
        1 => { Ok(QualityOfService::AtLeastOnce) }
        2 => { Ok(QualityOfService::ExactlyOnce) }
        _ => {
            error!("convert_u8_to_quality_of_service - invalid quality of service value ({})", value);
            Err(SchistError::new_decoding_failure("invalid quality of service value"))
        }
    }
}

pub(crate) fn quality_of_service_to_str (qos: QualityOfService) -> &'static str {
    match qos {
        QualityOfService::AtMostOnce => { "0 (AtMostOnce)" }
        QualityOfService::AtLeastOnce => { "1 (AtLeastOnce)" }
        QualityOfService::ExactlyOnce => { "2 (ExactlyOnce)" }
    }
}

/// Converts an integer to a CONNACK return code, if possible.
pub fn convert_u8_to_connect_return_code(value: u8) -> SchistResult<ConnectReturnCode> {
    match value {
        0 => { Ok(ConnectReturnCode::Accepted) }
        1 => { Ok(ConnectReturnCode::UnacceptableProtocolVersion) }
        2 => { Ok(ConnectReturnCode::IdentifierRejected) }
        3 => { Ok(ConnectReturnCode::ServerUnavailable) }
        4 => { Ok(ConnectReturnCode::BadUsernameOrPassword) }
        5 => { Ok(ConnectReturnCode::NotAuthorized) }
        _ => {
            error!("convert_u8_to_connect_return_code - invalid connect return code ({})", value);
            Err(SchistError::new_decoding_failure("invalid connack return code"))
        }
    }
}

pub(crate) fn connect_return_code_to_str(return_code: ConnectReturnCode) -> &'static str {
    match return_code {
        ConnectReturnCode::Accepted => { "Accepted" }
        ConnectReturnCode::UnacceptableProtocolVersion => { "UnacceptableProtocolVersion" }
        ConnectReturnCode::IdentifierRejected => { "IdentifierRejected" }
        ConnectReturnCode::ServerUnavailable => { "ServerUnavailable" }
        ConnectReturnCode::BadUsernameOrPassword => { "BadUsernameOrPassword" }
        ConnectReturnCode::NotAuthorized => { "NotAuthorized" }
    }
}

/// Converts an integer to a SUBACK return code, if possible.
pub fn convert_u8_to_suback_return_code(value: u8) -> SchistResult<SubackReturnCode> {
    match value {
        0 => { Ok(SubackReturnCode::GrantedQos0) }
        1 => { Ok(SubackReturnCode::GrantedQos1) }
        2 => { Ok(SubackReturnCode::GrantedQos2) }
        0x80 => { Ok(SubackReturnCode::Failure) }
        _ => {
            error!("convert_u8_to_suback_return_code - invalid suback return code ({})", value);
            Err(SchistError::new_decoding_failure("invalid suback return code"))
        }
    }
}

pub(crate) fn suback_return_code_to_str(return_code: SubackReturnCode) -> &'static str {
    match return_code {
        SubackReturnCode::GrantedQos0 => { "GrantedQos0" }
        SubackReturnCode::GrantedQos1 => { "GrantedQos1" }
        SubackReturnCode::GrantedQos2 => { "GrantedQos2" }
        SubackReturnCode::Failure => { "Failure" }
    }
}

pub(crate) fn mqtt_packet_to_packet_type(packet: &MqttPacket) -> PacketType {
    match packet {
        MqttPacket::Connect(_) => { PacketType::Connect }
        MqttPacket::Connack(_) => { PacketType::Connack }
        MqttPacket::Publish(_) => { PacketType::Publish}
        MqttPacket::Puback(_) => { PacketType::Puback }
        MqttPacket::Pubrec(_) => { PacketType::Pubrec }
        MqttPacket::Pubrel(_) => { PacketType::Pubrel }
        MqttPacket::Pubcomp(_) => { PacketType::Pubcomp }
        MqttPacket::Subscribe(_) => { PacketType::Subscribe }
        MqttPacket::Suback(_) => { PacketType::Suback }
        MqttPacket::Unsubscribe(_) => { PacketType::Unsubscribe }
        MqttPacket::Unsuback(_) => { PacketType::Unsuback }
        MqttPacket::Pingreq(_) => { PacketType::Pingreq }
        MqttPacket::Pingresp(_) => { PacketType::Pingresp }
        MqttPacket::Disconnect(_) => { PacketType::Disconnect }
    }
}

pub(crate) fn mqtt_packet_to_str(packet: &MqttPacket) -> &'static str {
    match packet {
        MqttPacket::Connect(_) => { "CONNECT" }
        MqttPacket::Connack(_) => { "CONNACK" }
        MqttPacket::Publish(_) => { "PUBLISH" }
        MqttPacket::Puback(_) => { "PUBACK" }
        MqttPacket::Pubrec(_) => { "PUBREC" }
        MqttPacket::Pubrel(_) => { "PUBREL" }
        MqttPacket::Pubcomp(_) => { "PUBCOMP" }
        MqttPacket::Subscribe(_) => { "SUBSCRIBE" }
        MqttPacket::Suback(_) => { "SUBACK" }
        MqttPacket::Unsubscribe(_) => { "UNSUBSCRIBE" }
        MqttPacket::Unsuback(_) => { "UNSUBACK" }
        MqttPacket::Pingreq(_) => { "PINGREQ" }
        MqttPacket::Pingresp(_) => { "PINGRESP" }
        MqttPacket::Disconnect(_) => { "DISCONNECT" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn quality_of_service_conversions() {
        assert_eq!(QualityOfService::AtMostOnce, convert_u8_to_quality_of_service(0).unwrap());
        assert_eq!(QualityOfService::AtLeastOnce, convert_u8_to_quality_of_service(1).unwrap());
        assert_eq!(QualityOfService::ExactlyOnce, convert_u8_to_quality_of_service(2).unwrap());
        assert_matches!(convert_u8_to_quality_of_service(3), Err(SchistError::DecodingFailure(_)));
    }

    #[test]
    fn connect_return_code_conversions() {
        assert_eq!(ConnectReturnCode::Accepted, convert_u8_to_connect_return_code(0).unwrap());
        assert_eq!(ConnectReturnCode::NotAuthorized, convert_u8_to_connect_return_code(5).unwrap());
        assert!(convert_u8_to_connect_return_code(6).is_err());
        assert!(ConnectReturnCode::Accepted.is_success());
        assert!(!ConnectReturnCode::ServerUnavailable.is_success());
    }

    #[test]
    fn suback_return_code_conversions() {
        assert_eq!(SubackReturnCode::GrantedQos2, convert_u8_to_suback_return_code(2).unwrap());
        assert_eq!(SubackReturnCode::Failure, convert_u8_to_suback_return_code(0x80).unwrap());
        assert!(convert_u8_to_suback_return_code(3).is_err());
        assert!(!SubackReturnCode::Failure.is_success());
    }

    #[test]
    fn pubrel_and_subscribe_first_bytes_carry_reserved_flags() {
        assert_eq!(0x62, PUBREL_FIRST_BYTE);
        assert_eq!(0x82, SUBSCRIBE_FIRST_BYTE);
        assert_eq!(0xA2, UNSUBSCRIBE_FIRST_BYTE);
    }
}
