/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing the byte-sink abstraction the connection writes encoded packets into.
 */

use crate::error::SchistResult;

use log::*;
use std::io::Write;

/// Sink for fully-encoded MQTT packets.
///
/// Each call receives exactly one complete packet and takes ownership of its buffer.  A
/// successful return means the bytes were handed to the underlying channel; nothing is
/// registered against a packet whose write failed.
pub trait Transport {

    /// Writes one encoded packet
    fn write(&mut self, buffer: Vec<u8>) -> SchistResult<()>;
}

/// Blocking transport over any `std::io::Write` implementation, for example a
/// `std::net::TcpStream`.
pub struct StreamTransport<W> where W : Write {
    stream: W,
}

impl<W> StreamTransport<W> where W : Write {

    /// Wraps a writable stream
    pub fn new(stream: W) -> Self {
        StreamTransport {
            stream
        }
    }

    /// Returns the wrapped stream, consuming the transport
    pub fn into_inner(self) -> W {
        self.stream
    }
}

impl<W> Transport for StreamTransport<W> where W : Write {
    fn write(&mut self, buffer: Vec<u8>) -> SchistResult<()> {
        debug!("StreamTransport - writing {} bytes", buffer.len());

        self.stream.write_all(buffer.as_slice())?;
        self.stream.flush()?;

        Ok(())
    }
}
