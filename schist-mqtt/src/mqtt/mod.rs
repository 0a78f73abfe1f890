/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing a set of structured data types that model the MQTT 3.1.1 specification.
 */

use crate::error::SchistError;

use std::fmt;

pub(crate) mod connack;
pub(crate) mod connect;
pub(crate) mod disconnect;
pub(crate) mod pingreq;
pub(crate) mod pingresp;
pub(crate) mod puback;
pub(crate) mod pubcomp;
pub(crate) mod publish;
pub(crate) mod pubrec;
pub(crate) mod pubrel;
pub(crate) mod suback;
pub(crate) mod subscribe;
pub(crate) mod unsuback;
pub(crate) mod unsubscribe;
pub mod utils;

pub use connack::ConnackPacket;
pub use connect::{ConnectPacket, LastWill};
pub use disconnect::DisconnectPacket;
pub use pingreq::PingreqPacket;
pub use pingresp::PingrespPacket;
pub use puback::PubackPacket;
pub use pubcomp::PubcompPacket;
pub use publish::PublishPacket;
pub use pubrec::PubrecPacket;
pub use pubrel::PubrelPacket;
pub use suback::SubackPacket;
pub use subscribe::{SubscribePacket, Subscription};
pub use unsuback::UnsubackPacket;
pub use unsubscribe::UnsubscribePacket;

/// MQTT message delivery quality of service.
///
/// Enum values match [MQTT 3.1.1](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718099) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum QualityOfService {

    /// The message is delivered according to the capabilities of the underlying network. No response is sent by the
    /// receiver and no retry is performed by the sender. The message arrives at the receiver either once or not at all.
    #[default]
    AtMostOnce = 0,

    /// A level of service that ensures that the message arrives at the receiver at least once.
    AtLeastOnce = 1,

    /// A level of service that ensures that the message arrives at the receiver exactly once.
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QualityOfService {
    type Error = SchistError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        utils::convert_u8_to_quality_of_service(value)
    }
}

impl fmt::Display for QualityOfService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", utils::quality_of_service_to_str(*self))
    }
}

/// Return code the broker places in a CONNACK packet.
///
/// Enum values match [MQTT 3.1.1](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718035) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ConnectReturnCode {

    /// Connection accepted
    #[default]
    Accepted = 0,

    /// The broker does not support the level of the MQTT protocol requested by the client
    UnacceptableProtocolVersion = 1,

    /// The client identifier is correct UTF-8 but not allowed by the broker
    IdentifierRejected = 2,

    /// The network connection has been made but the MQTT service is unavailable
    ServerUnavailable = 3,

    /// The data in the user name or password is malformed
    BadUsernameOrPassword = 4,

    /// The client is not authorized to connect
    NotAuthorized = 5,
}

impl ConnectReturnCode {
    /// Returns whether or not the return code represents a successful connect
    pub fn is_success(&self) -> bool {
        matches!(self, ConnectReturnCode::Accepted)
    }
}

impl TryFrom<u8> for ConnectReturnCode {
    type Error = SchistError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        utils::convert_u8_to_connect_return_code(value)
    }
}

impl fmt::Display for ConnectReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", utils::connect_return_code_to_str(*self))
    }
}

/// Per-filter result code in a SUBACK packet.
///
/// Enum values match [MQTT 3.1.1](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718071) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SubackReturnCode {

    /// Subscription accepted with a maximum QoS of 0
    #[default]
    GrantedQos0 = 0,

    /// Subscription accepted with a maximum QoS of 1
    GrantedQos1 = 1,

    /// Subscription accepted with a maximum QoS of 2
    GrantedQos2 = 2,

    /// Subscription rejected
    Failure = 0x80,
}

impl SubackReturnCode {
    /// Returns whether or not the return code represents a granted subscription
    pub fn is_success(&self) -> bool {
        !matches!(self, SubackReturnCode::Failure)
    }
}

impl TryFrom<u8> for SubackReturnCode {
    type Error = SchistError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        utils::convert_u8_to_suback_return_code(value)
    }
}

impl fmt::Display for SubackReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", utils::suback_return_code_to_str(*self))
    }
}

/// Algebraic union of all MQTT 3.1.1 packet types.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MqttPacket {
    /// A CONNECT packet
    Connect(ConnectPacket),

    /// A CONNACK packet
    Connack(ConnackPacket),

    /// A PUBLISH packet
    Publish(PublishPacket),

    /// A PUBACK packet
    Puback(PubackPacket),

    /// A PUBREC packet
    Pubrec(PubrecPacket),

    /// A PUBREL packet
    Pubrel(PubrelPacket),

    /// A PUBCOMP packet
    Pubcomp(PubcompPacket),

    /// A SUBSCRIBE packet
    Subscribe(SubscribePacket),

    /// A SUBACK packet
    Suback(SubackPacket),

    /// An UNSUBSCRIBE packet
    Unsubscribe(UnsubscribePacket),

    /// An UNSUBACK packet
    Unsuback(UnsubackPacket),

    /// A PINGREQ packet
    Pingreq(PingreqPacket),

    /// A PINGRESP packet
    Pingresp(PingrespPacket),

    /// A DISCONNECT packet
    Disconnect(DisconnectPacket),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// An enum indicating the kind of MQTT packet
pub enum PacketType {
    /// A [Connect](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718028) packet
    Connect,

    /// A [Connack](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718033) packet
    Connack,

    /// A [Publish](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718037) packet
    Publish,

    /// A [Puback](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718043) packet
    Puback,

    /// A [Pubrec](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718048) packet
    Pubrec,

    /// A [Pubrel](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718053) packet
    Pubrel,

    /// A [Pubcomp](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718058) packet
    Pubcomp,

    /// A [Subscribe](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718063) packet
    Subscribe,

    /// A [Suback](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718068) packet
    Suback,

    /// An [Unsubscribe](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718072) packet
    Unsubscribe,

    /// An [Unsuback](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718077) packet
    Unsuback,

    /// A [Pingreq](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718081) packet
    Pingreq,

    /// A [Pingresp](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718086) packet
    Pingresp,

    /// A [Disconnect](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718090) packet
    Disconnect,
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketType::Connect => { write!(f, "Connect") }
            PacketType::Connack => { write!(f, "Connack") }
            PacketType::Publish => { write!(f, "Publish") }
            PacketType::Puback => { write!(f, "Puback") }
            PacketType::Pubrec => { write!(f, "Pubrec") }
            PacketType::Pubrel => { write!(f, "Pubrel") }
            PacketType::Pubcomp => { write!(f, "Pubcomp") }
            PacketType::Subscribe => { write!(f, "Subscribe") }
            PacketType::Suback => { write!(f, "Suback") }
            PacketType::Unsubscribe => { write!(f, "Unsubscribe") }
            PacketType::Unsuback => { write!(f, "Unsuback") }
            PacketType::Pingreq => { write!(f, "Pingreq") }
            PacketType::Pingresp => { write!(f, "Pingresp") }
            PacketType::Disconnect => { write!(f, "Disconnect") }
        }
    }
}
