/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
An MQTT 3.1.1 client protocol engine.

The engine builds and writes CONNECT, PUBLISH, SUBSCRIBE, UNSUBSCRIBE, PINGREQ and DISCONNECT
packets, and drives the QoS 1 and QoS 2 acknowledgement handshakes in both directions.  It does
no I/O of its own: encoded packets go to a caller-supplied [`Transport`], and the caller feeds
bytes read from the network to [`MqttConnection::handle_incoming_bytes`].  Completion callbacks
run synchronously on that call.

# Example

```no_run
use schist_mqtt::*;
use std::net::TcpStream;
use std::sync::Arc;

fn main() -> SchistResult<()> {
    let stream = TcpStream::connect("127.0.0.1:1883")?;
    let transport = StreamTransport::new(stream.try_clone()?);

    let options = ConnectOptionsBuilder::new()
        .with_client_id("example-client")
        .build();

    let listeners = ConnectionListeners::new()
        .with_on_connected(Arc::new(|connection: &mut MqttConnection, _: bool| {
            let _ = connection.publish("hello/world", "hi".as_bytes(), QualityOfService::AtLeastOnce, None);
        }));

    let mut connection = MqttConnection::connect(options, Box::new(transport), listeners)?;

    // read from `stream` and hand every chunk to connection.handle_incoming_bytes(...)
    connection.disconnect()
}
```

With the `tokio` feature, [`features::schist_tokio::spawn_connection`] drives a connection over
any async stream, including keep-alive pings.
 */

pub mod config;
mod decode;
mod encode;
pub mod error;
pub mod features;
mod logging;
pub mod mqtt;
mod packet_id;
mod protocol;
mod registry;
mod subscription;
pub mod transport;
mod validate;

#[cfg(test)]
mod testing;

pub use config::*;
pub use error::{SchistError, SchistResult};
pub use mqtt::*;
pub use protocol::{ConnectionState, MqttConnection, SharedConnection};
pub use transport::{StreamTransport, Transport};
