/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing types for configuring an MQTT connection.
 */

use crate::error::*;
use crate::mqtt::*;
use crate::mqtt::utils::MAXIMUM_CLIENT_ID_LENGTH;
use crate::protocol::MqttConnection;
use crate::validate::is_valid_topic;

use log::*;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Callback invoked when a publish completes its QoS handshake (outbound) or is delivered (inbound).
/// Receives the connection, the topic and the message payload.
pub type PublishEventHandler = Arc<dyn Fn(&mut MqttConnection, &str, &[u8]) + Send + Sync>;

/// Callback invoked when the broker accepts the connection.  The flag is the CONNACK's
/// session present value.
pub type ConnectedHandler = Arc<dyn Fn(&mut MqttConnection, bool) + Send + Sync>;

/// Callback invoked when the broker acknowledges an unsubscribe.  Receives the topic filter.
pub type UnsubscribeHandler = Arc<dyn Fn(&mut MqttConnection, &str) + Send + Sync>;

/// Callback invoked on configuration failures and session-fatal errors.
pub type ErrorHandler = Arc<dyn Fn(&SchistError) + Send + Sync>;

pub(crate) const DEFAULT_KEEP_ALIVE_SECONDS : u16 = 60;

/// Configuration options that determine the field values of the CONNECT packet, plus a few
/// local limits the connection enforces.
#[derive(Debug, Clone)]
pub struct ConnectOptions {

    pub(crate) client_id: String,

    pub(crate) keep_alive_interval_seconds: u16,

    pub(crate) clean_session: bool,

    pub(crate) username: Option<String>,

    pub(crate) password: Option<Vec<u8>>,

    pub(crate) will: Option<LastWill>,

    pub(crate) maximum_in_flight: Option<usize>,

    pub(crate) maximum_inbound_packet_size: u32,
}

impl ConnectOptions {

    pub(crate) fn to_connect_packet(&self) -> ConnectPacket {
        ConnectPacket {
            keep_alive_interval_seconds: self.keep_alive_interval_seconds,
            clean_session: self.clean_session,
            client_id: self.client_id.clone(),
            will: self.will.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    /// Returns the MQTT client id currently configured in these options
    pub fn client_id(&self) -> &str { &self.client_id }

    /// Returns the keep alive interval, in seconds.  Zero means keep alive is disabled.
    pub fn keep_alive_interval_seconds(&self) -> u16 { self.keep_alive_interval_seconds }

    /// Returns the cap on outstanding outbound acknowledgements, if any
    pub fn maximum_in_flight(&self) -> Option<usize> { self.maximum_in_flight }
}

impl Default for ConnectOptions {

    /// Creates a ConnectOptions object with default values.
    ///
    /// Keep alive is set to a reasonable default rather than zero, which would mean no keep
    /// alive at all.
    fn default() -> Self {
        ConnectOptions {
            client_id: String::new(),
            keep_alive_interval_seconds: DEFAULT_KEEP_ALIVE_SECONDS,
            clean_session: true,
            username: None,
            password: None,
            will: None,
            maximum_in_flight: None,
            maximum_inbound_packet_size: 0,
        }
    }
}

/// Checks the options for problems that would make the broker reject, or the codec refuse,
/// the resulting CONNECT.  Nothing has been written when this fails.
pub(crate) fn validate_connect_options(options: &ConnectOptions) -> SchistResult<()> {
    if options.client_id.len() > MAXIMUM_CLIENT_ID_LENGTH {
        let message = format!("validate_connect_options - client id length ({}) exceeds the MQTT 3.1.1 maximum ({})", options.client_id.len(), MAXIMUM_CLIENT_ID_LENGTH);
        error!("{}", message);
        return Err(SchistError::new_configuration_error(message));
    }

    if options.client_id.is_empty() && !options.clean_session {
        let message = "validate_connect_options - an empty client id requires a clean session";
        error!("{}", message);
        return Err(SchistError::new_configuration_error(message));
    }

    if options.password.is_some() && options.username.is_none() {
        let message = "validate_connect_options - a password requires a username";
        error!("{}", message);
        return Err(SchistError::new_configuration_error(message));
    }

    if let Some(will) = &options.will {
        if !is_valid_topic(&will.topic) {
            let message = "validate_connect_options - invalid last will topic";
            error!("{}", message);
            return Err(SchistError::new_configuration_error(message));
        }
    }

    if options.maximum_in_flight == Some(0) {
        let message = "validate_connect_options - maximum in-flight count must be non-zero";
        error!("{}", message);
        return Err(SchistError::new_configuration_error(message));
    }

    Ok(())
}

/// A builder for connection-related options.
#[derive(Debug, Default)]
pub struct ConnectOptionsBuilder {
    options: ConnectOptions
}

impl ConnectOptionsBuilder {

    /// Creates a new builder object for ConnectOptions
    pub fn new() -> Self {
        ConnectOptionsBuilder {
            ..Default::default()
        }
    }

    /// Creates a new builder object for ConnectOptions using an existing ConnectOptions
    /// value as a starting point.
    pub fn new_from_existing(options: ConnectOptions) -> Self {
        ConnectOptionsBuilder {
            options
        }
    }

    /// Sets the string identifying the client to the broker.  MQTT 3.1.1 brokers are only
    /// required to accept identifiers of up to 23 bytes; longer values are rejected at connect time.
    ///
    /// See [MQTT 3.1.1 Client Identifier](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718031)
    pub fn with_client_id(&mut self, client_id: &str) -> &mut Self {
        self.options.client_id = client_id.to_string();
        self
    }

    /// Sets the maximum time interval, in seconds, that is permitted to elapse between two
    /// client transmissions.  Zero disables keep alive.
    ///
    /// See [MQTT 3.1.1 Keep Alive](https://docs.oasis-open.org/mqtt/mqtt/v3.1.1/os/mqtt-v3.1.1-os.html#_Toc398718030)
    pub fn with_keep_alive_interval_seconds(&mut self, keep_alive: u16) -> &mut Self {
        self.options.keep_alive_interval_seconds = keep_alive;
        self
    }

    /// Sets whether the broker should discard any existing session for this client id
    pub fn with_clean_session(&mut self, clean_session: bool) -> &mut Self {
        self.options.clean_session = clean_session;
        self
    }

    /// Sets a string value that the broker may use for client authentication and authorization.
    pub fn with_username(&mut self, username: &str) -> &mut Self {
        self.options.username = Some(username.to_string());
        self
    }

    /// Sets opaque binary data that the broker may use for client authentication and
    /// authorization.  MQTT 3.1.1 requires a username whenever a password is present.
    pub fn with_password(&mut self, password: &[u8]) -> &mut Self {
        self.options.password = Some(password.to_vec());
        self
    }

    /// Configures a message for the broker to publish if the connection drops without a
    /// DISCONNECT.  The will is always sent with QoS 0.
    pub fn with_last_will(&mut self, topic: &str, message: &[u8], retain: bool) -> &mut Self {
        self.options.will = Some(LastWill {
            topic: topic.to_string(),
            message: message.to_vec(),
            qos: QualityOfService::AtMostOnce,
            retain,
        });
        self
    }

    /// Caps the number of outbound operations (QoS 1+ publishes, subscribes, unsubscribes)
    /// that may await an acknowledgement at once.  Unlimited if not set.
    pub fn with_maximum_in_flight(&mut self, maximum_in_flight: usize) -> &mut Self {
        self.options.maximum_in_flight = Some(maximum_in_flight);
        self
    }

    /// Sets the largest inbound packet, in bytes, the decoder will accept.  Larger packets are
    /// session-fatal.  Unlimited if not set.
    pub fn with_maximum_inbound_packet_size(&mut self, maximum_packet_size: u32) -> &mut Self {
        self.options.maximum_inbound_packet_size = maximum_packet_size;
        self
    }

    /// Builds a new ConnectOptions object
    pub fn build(&self) -> ConnectOptions {
        self.options.clone()
    }
}

/// Application callbacks that are not tied to a single operation.
#[derive(Clone, Default)]
pub struct ConnectionListeners {

    /// Invoked when the broker accepts the connection
    pub on_connected: Option<ConnectedHandler>,

    /// Invoked on configuration failures and session-fatal errors
    pub on_error: Option<ErrorHandler>,

    /// Default handler for inbound publishes whose topic has no subscription handler
    pub on_message: Option<PublishEventHandler>,
}

impl ConnectionListeners {

    /// Creates an empty listener set
    pub fn new() -> Self {
        ConnectionListeners {
            ..Default::default()
        }
    }

    /// Sets the connection-accepted listener
    pub fn with_on_connected(mut self, handler: ConnectedHandler) -> Self {
        self.on_connected = Some(handler);
        self
    }

    /// Sets the error listener
    pub fn with_on_error(mut self, handler: ErrorHandler) -> Self {
        self.on_error = Some(handler);
        self
    }

    /// Sets the default inbound message listener
    pub fn with_on_message(mut self, handler: PublishEventHandler) -> Self {
        self.on_message = Some(handler);
        self
    }
}

impl Debug for ConnectionListeners {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConnectionListeners {{ on_connected: {}, on_error: {}, on_message: {} }}",
            self.on_connected.is_some(), self.on_error.is_some(), self.on_message.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn connect_options_defaults() {
        let options = ConnectOptionsBuilder::new().build();
        assert_eq!(DEFAULT_KEEP_ALIVE_SECONDS, options.keep_alive_interval_seconds());
        assert!(options.clean_session);
        assert_eq!("", options.client_id());
        assert_eq!(None, options.maximum_in_flight());
        assert!(validate_connect_options(&options).is_ok());
    }

    #[test]
    fn connect_options_to_connect_packet() {
        let options = ConnectOptionsBuilder::new()
            .with_client_id("testclient")
            .with_keep_alive_interval_seconds(30)
            .with_clean_session(false)
            .with_username("user")
            .with_password("pass".as_bytes())
            .with_last_will("clients/testclient/status", "gone".as_bytes(), true)
            .build();

        let packet = options.to_connect_packet();
        assert_eq!("testclient", packet.client_id);
        assert_eq!(30, packet.keep_alive_interval_seconds);
        assert!(!packet.clean_session);
        assert_eq!(Some("user".to_string()), packet.username);
        assert_eq!(Some("pass".as_bytes().to_vec()), packet.password);

        let will = packet.will.unwrap();
        assert_eq!("clients/testclient/status", will.topic);
        assert_eq!(QualityOfService::AtMostOnce, will.qos);
        assert!(will.retain);
    }

    #[test]
    fn connect_options_new_from_existing() {
        let original = ConnectOptionsBuilder::new().with_client_id("first").build();
        let modified = ConnectOptionsBuilder::new_from_existing(original.clone())
            .with_keep_alive_interval_seconds(0)
            .build();

        assert_eq!("first", modified.client_id());
        assert_eq!(0, modified.keep_alive_interval_seconds());
        assert_eq!(DEFAULT_KEEP_ALIVE_SECONDS, original.keep_alive_interval_seconds());
    }

    #[test]
    fn validate_client_id_length() {
        let ok = ConnectOptionsBuilder::new().with_client_id(&"a".repeat(MAXIMUM_CLIENT_ID_LENGTH)).build();
        assert!(validate_connect_options(&ok).is_ok());

        let too_long = ConnectOptionsBuilder::new().with_client_id(&"a".repeat(MAXIMUM_CLIENT_ID_LENGTH + 1)).build();
        assert_matches!(validate_connect_options(&too_long), Err(SchistError::ConfigurationError(_)));
    }

    #[test]
    fn validate_empty_client_id_requires_clean_session() {
        let options = ConnectOptionsBuilder::new().with_clean_session(false).build();
        assert_matches!(validate_connect_options(&options), Err(SchistError::ConfigurationError(_)));
    }

    #[test]
    fn validate_password_requires_username() {
        let options = ConnectOptionsBuilder::new().with_client_id("c").with_password("secret".as_bytes()).build();
        assert_matches!(validate_connect_options(&options), Err(SchistError::ConfigurationError(_)));
    }

    #[test]
    fn validate_last_will_topic() {
        let options = ConnectOptionsBuilder::new().with_last_will("status/#", "gone".as_bytes(), false).build();
        assert_matches!(validate_connect_options(&options), Err(SchistError::ConfigurationError(_)));

        let options = ConnectOptionsBuilder::new().with_last_will("", "gone".as_bytes(), false).build();
        assert_matches!(validate_connect_options(&options), Err(SchistError::ConfigurationError(_)));
    }

    #[test]
    fn validate_zero_in_flight_cap() {
        let options = ConnectOptionsBuilder::new().with_maximum_in_flight(0).build();
        assert_matches!(validate_connect_options(&options), Err(SchistError::ConfigurationError(_)));
    }
}
