/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Functionality for driving an MQTT connection with [`tokio`](https://crates.io/crates/tokio).

[`spawn_connection`] takes an already-established stream, writes the CONNECT and spawns the
tasks that move bytes between the stream and the connection.
 */

use crate::config::*;
use crate::error::{SchistError, SchistResult};
use crate::protocol::{ConnectionState, MqttConnection, SharedConnection};
use crate::transport::Transport;

use log::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, split, ReadHalf, WriteHalf};
use tokio::runtime;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

const READ_BUFFER_SIZE : usize = 4096;

/// Transport that hands encoded packets to a writer task over an unbounded channel.  Writes
/// never block; they fail once the writer task has stopped.
pub struct TokioChannelTransport {
    sender: UnboundedSender<Vec<u8>>,
}

impl TokioChannelTransport {

    /// Creates a transport feeding the given channel
    pub fn new(sender: UnboundedSender<Vec<u8>>) -> Self {
        TokioChannelTransport {
            sender
        }
    }
}

impl Transport for TokioChannelTransport {
    fn write(&mut self, buffer: Vec<u8>) -> SchistResult<()> {
        self.sender.send(buffer)?;
        Ok(())
    }
}

/// Connects over an established stream and spawns the writer, reader and keep-alive tasks on
/// the runtime.
///
/// Callbacks run on the reader task while it holds the connection's lock; they receive the
/// connection directly and must not lock the returned handle themselves.
pub fn spawn_connection<T>(stream: T, options: ConnectOptions, listeners: ConnectionListeners, runtime_handle: &runtime::Handle) -> SchistResult<SharedConnection> where T : AsyncRead + AsyncWrite + Send + 'static {
    let (stream_reader, stream_writer) = split(stream);
    let (sender, receiver) = unbounded_channel();

    let keep_alive_interval_seconds = options.keep_alive_interval_seconds();
    let connection = MqttConnection::connect(options, Box::new(TokioChannelTransport::new(sender)), listeners)?;
    let shared_connection = Arc::new(Mutex::new(connection));

    runtime_handle.spawn(writer_task(stream_writer, receiver));
    runtime_handle.spawn(reader_task(stream_reader, shared_connection.clone()));

    if keep_alive_interval_seconds > 0 {
        let period = Duration::from_secs(keep_alive_interval_seconds as u64);
        runtime_handle.spawn(keep_alive_task(shared_connection.clone(), period));
    } else {
        info!("tokio - keep alive disabled");
    }

    Ok(shared_connection)
}

fn with_connection<F, R>(connection: &SharedConnection, function: F) -> Option<R> where F : FnOnce(&mut MqttConnection) -> R {
    match connection.lock() {
        Ok(mut guard) => { Some(function(&mut guard)) }
        Err(_) => {
            error!("tokio - connection lock poisoned");
            None
        }
    }
}

async fn writer_task<T>(mut stream_writer: WriteHalf<T>, mut receiver: UnboundedReceiver<Vec<u8>>) where T : AsyncRead + AsyncWrite {
    while let Some(buffer) = receiver.recv().await {
        trace!("tokio - writer - writing {} bytes", buffer.len());
        if let Err(error) = stream_writer.write_all(buffer.as_slice()).await {
            error!("tokio - writer - stream write failed: {}", error);
            return;
        }
    }

    debug!("tokio - writer - channel closed, shutting down stream");
    if let Err(error) = stream_writer.shutdown().await {
        debug!("tokio - writer - stream shutdown failed: {}", error);
    }
}

async fn reader_task<T>(mut stream_reader: ReadHalf<T>, connection: SharedConnection) where T : AsyncRead + AsyncWrite {
    let mut inbound_data = [0u8; READ_BUFFER_SIZE];

    loop {
        match stream_reader.read(&mut inbound_data).await {
            Ok(0) => {
                info!("tokio - reader - stream closed by peer");
                with_connection(&connection, |connection| {
                    let _ = connection.fail_session(SchistError::new_connection_closed("stream closed by peer"));
                });
                return;
            }
            Ok(bytes_read) => {
                let result = with_connection(&connection, |connection| {
                    connection.handle_incoming_bytes(&inbound_data[..bytes_read])
                });

                match result {
                    Some(Ok(())) => {}
                    Some(Err(error)) => {
                        info!("tokio - reader - stopping: {}", error);
                        return;
                    }
                    None => { return; }
                }
            }
            Err(error) => {
                error!("tokio - reader - stream read failed: {}", error);
                with_connection(&connection, |connection| {
                    let _ = connection.fail_session(SchistError::new_std_io_error(error));
                });
                return;
            }
        }
    }
}

async fn keep_alive_task(connection: SharedConnection, period: Duration) {
    let mut interval = tokio::time::interval(period);

    // the first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;

        let keep_going = with_connection(&connection, |connection| {
            match connection.state() {
                ConnectionState::Closed => { false }
                ConnectionState::PendingConnack => {
                    debug!("tokio - keep alive - still waiting on connack");
                    true
                }
                ConnectionState::Connected => {
                    if let Err(error) = connection.ping() {
                        warn!("tokio - keep alive - ping failed: {}", error);
                        return false;
                    }
                    true
                }
            }
        });

        if keep_going != Some(true) {
            debug!("tokio - keep alive - stopping");
            return;
        }
    }
}
