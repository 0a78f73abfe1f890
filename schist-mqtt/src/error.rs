/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
A module containing the core crate error enumeration, context structures, and conversion
definitions.
 */

use crate::mqtt::{ConnectReturnCode, PacketType};

use std::error::Error;
use std::fmt;

/// Additional details about a ConfigurationError error variant
#[derive(Debug)]
pub struct ConfigurationErrorContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about an EncodingFailure error variant
#[derive(Debug)]
pub struct EncodingFailureContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a DecodingFailure error variant
#[derive(Debug)]
pub struct DecodingFailureContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a ProtocolError error variant
#[derive(Debug)]
pub struct ProtocolErrorContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a ConnectionRefused error variant
#[derive(Debug)]
pub struct ConnectionRefusedContext {

    /// return code the broker sent in its CONNACK
    pub return_code: ConnectReturnCode,
}

/// Additional details about an InternalStateError error variant
#[derive(Debug)]
pub struct InternalStateErrorContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a ConnectionClosed error variant
#[derive(Debug)]
pub struct ConnectionClosedContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about an InFlightLimitExceeded error variant
#[derive(Debug)]
pub struct InFlightLimitExceededContext {

    /// configured maximum number of outstanding acknowledgements
    pub limit: usize,
}

/// Additional details about a StdIoError error variant
#[derive(Debug)]
pub struct StdIoErrorContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a TransportError error variant
#[derive(Debug)]
pub struct TransportErrorContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a PacketValidation error variant
#[derive(Debug)]
pub struct PacketValidationContext {

    /// type of packet that failed validation
    pub packet_type: PacketType,

    source: Box<dyn Error + Send + Sync + 'static>
}

/// Basic error type for the entire schist-mqtt crate.
#[derive(Debug)]
#[non_exhaustive]
pub enum SchistError {

    /// Connection configuration was rejected before any packet was sent.  The canonical
    /// example is a client id that exceeds the MQTT 3.1.1 length limit.
    ConfigurationError(ConfigurationErrorContext),

    /// Error encountered while attempting to encode an MQTT packet
    EncodingFailure(EncodingFailureContext),

    /// Error encountered while attempting to decode an MQTT packet.  Examples include bad header
    /// flags, mismatches between remaining length fields and overall packet length, etc...
    DecodingFailure(DecodingFailureContext),

    /// Generic error emitted when the broker does something the MQTT specification forbids
    /// a server from doing, like sending a client-only packet.
    ProtocolError(ProtocolErrorContext),

    /// The broker answered our CONNECT with a non-zero return code.
    ConnectionRefused(ConnectionRefusedContext),

    /// Error emitted when something happens that should never happen.  Always indicates
    /// a bug, either in this crate or in how it is being driven.
    InternalStateError(InternalStateErrorContext),

    /// Error applied to operations submitted to, or still outstanding on, a connection that
    /// has been closed.
    ConnectionClosed(ConnectionClosedContext),

    /// A QoS 1/2 publish, subscribe, or unsubscribe was rejected locally because the configured
    /// maximum number of outstanding acknowledgements has been reached.
    InFlightLimitExceeded(InFlightLimitExceededContext),

    /// Generic error wrapping std::io::Error
    StdIoError(StdIoErrorContext),

    /// Generic error surfaced by a transport implementation's write primitive
    TransportError(TransportErrorContext),

    /// Error emitted when an outbound packet would violate the MQTT specification.
    PacketValidation(PacketValidationContext),
}

impl SchistError {

    pub(crate) fn new_configuration_error(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        SchistError::ConfigurationError(
            ConfigurationErrorContext {
                source : source.into()
            }
        )
    }

    pub(crate) fn new_decoding_failure(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        SchistError::DecodingFailure(
            DecodingFailureContext {
                source : source.into()
            }
        )
    }

    pub(crate) fn new_encoding_failure(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        SchistError::EncodingFailure(
            EncodingFailureContext {
                source : source.into()
            }
        )
    }

    pub(crate) fn new_protocol_error(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        SchistError::ProtocolError(
            ProtocolErrorContext {
                source : source.into()
            }
        )
    }

    pub(crate) fn new_connection_refused(return_code: ConnectReturnCode) -> Self {
        SchistError::ConnectionRefused(
            ConnectionRefusedContext {
                return_code
            }
        )
    }

    pub(crate) fn new_internal_state_error(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        SchistError::InternalStateError(
            InternalStateErrorContext {
                source : source.into()
            }
        )
    }

    pub(crate) fn new_connection_closed(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        SchistError::ConnectionClosed(
            ConnectionClosedContext {
                source : source.into()
            }
        )
    }

    pub(crate) fn new_in_flight_limit_exceeded(limit: usize) -> Self {
        SchistError::InFlightLimitExceeded(
            InFlightLimitExceededContext {
                limit
            }
        )
    }

    /// Constructs a StdIoError variant from an existing error.  Typically this should be a
    /// std::io::Error
    #[doc(hidden)]
    pub fn new_std_io_error(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        SchistError::StdIoError(
            StdIoErrorContext {
                source : source.into()
            }
        )
    }

    /// Constructs a new TransportError variant from an existing error.  Custom transport
    /// implementations should use this to report write failures.
    pub fn new_transport_error(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        SchistError::TransportError(
            TransportErrorContext {
                source : source.into()
            }
        )
    }

    pub(crate) fn new_packet_validation(packet_type: PacketType, source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        SchistError::PacketValidation(
            PacketValidationContext {
                packet_type,
                source : source.into()
            }
        )
    }
}

impl Error for SchistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SchistError::ConfigurationError(context) => {
                Some(context.source.as_ref())
            }
            SchistError::DecodingFailure(context) => {
                Some(context.source.as_ref())
            }
            SchistError::EncodingFailure(context) => {
                Some(context.source.as_ref())
            }
            SchistError::ProtocolError(context) => {
                Some(context.source.as_ref())
            }
            SchistError::InternalStateError(context) => {
                Some(context.source.as_ref())
            }
            SchistError::ConnectionClosed(context) => {
                Some(context.source.as_ref())
            }
            SchistError::StdIoError(context) => {
                Some(context.source.as_ref())
            }
            SchistError::TransportError(context) => {
                Some(context.source.as_ref())
            }
            SchistError::PacketValidation(context) => {
                Some(context.source.as_ref())
            }
            _ => { None }
        }
    }
}

impl fmt::Display for SchistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchistError::ConfigurationError(context) => {
                write!(f, "connection configuration rejected: {}", context.source)
            }
            SchistError::DecodingFailure(_) => {
                write!(f, "failure encountered while decoding an incoming MQTT packet")
            }
            SchistError::EncodingFailure(_) => {
                write!(f, "failure encountered while encoding an outbound MQTT packet")
            }
            SchistError::ProtocolError(_) => {
                write!(f, "broker behavior disallowed by the mqtt spec")
            }
            SchistError::ConnectionRefused(context) => {
                write!(f, "broker refused the connection with return code {}", context.return_code)
            }
            SchistError::InternalStateError(_) => {
                write!(f, "connection reached an invalid internal state; almost certainly a bug")
            }
            SchistError::ConnectionClosed(_) => {
                write!(f, "connection was closed; source contains further details")
            }
            SchistError::InFlightLimitExceeded(context) => {
                write!(f, "operation rejected; {} acknowledgements are already outstanding", context.limit)
            }
            SchistError::StdIoError(_) => {
                write!(f, "generic error wrapper for std::io::Error when no more specialized error is appropriate; source contains further details")
            }
            SchistError::TransportError(_) => {
                write!(f, "transport error; source contains further details")
            }
            SchistError::PacketValidation(context) => {
                write!(f, "{} contains a value that violates the mqtt spec", context.packet_type)
            }
        }
    }
}

impl From<std::io::Error> for SchistError {
    fn from(error: std::io::Error) -> Self {
        SchistError::new_std_io_error(error)
    }
}

impl From<core::str::Utf8Error> for SchistError {
    fn from(err: core::str::Utf8Error) -> Self {
        SchistError::new_decoding_failure(err)
    }
}

#[cfg(feature="tokio")]
impl <T> From<tokio::sync::mpsc::error::SendError<T>> for SchistError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        SchistError::new_transport_error("tokio writer task is no longer receiving")
    }
}

/// Crate-wide result type for functions that can fail
pub type SchistResult<T> = Result<T, SchistError>;
