// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use super::{Connection, ServerAddr};
use ferrogram_mtproto::transport::{self, Transport};
use log::info;
use std::future::Future;
use std::io;
use std::sync::Mutex as StdMutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// The maximum data that we're willing to send or receive at once.
///
/// By having a fixed-size buffer, we can avoid unnecessary
/// allocations and trivially prevent allocating more than this limit
/// if we ever received invalid data.
///
/// Telegram will close the connection with roughly a megabyte of
/// data, so to account for the transports' own overhead, we add a
/// few extra kilobytes to the maximum data size.
const MAXIMUM_DATA: usize = (1024 * 1024) + (8 * 1024);

/// Parameters to open a [`TcpConnection`]: the server address and the
/// transport codec used to delimit frames on the stream.
pub struct TcpParams<T: Transport> {
    pub addr: ServerAddr,
    pub transport: fn() -> T,
}

impl<T: Transport> Clone for TcpParams<T> {
    fn clone(&self) -> Self {
        Self {
            addr: self.addr.clone(),
            transport: self.transport,
        }
    }
}

struct Reader {
    half: OwnedReadHalf,
    buffer: Vec<u8>,
    filled: usize,
}

/// A direct TCP implementation of [`Connection`].
///
/// The transport codec is shared by both directions (some codecs
/// correlate their send and receive counters), so it sits behind its
/// own short-lived lock, separate from the two stream halves.
pub struct TcpConnection<T: Transport> {
    params: TcpParams<T>,
    transport: StdMutex<T>,
    reader: Mutex<Reader>,
    writer: Mutex<OwnedWriteHalf>,
}

impl<T: Transport + 'static> Connection for TcpConnection<T> {
    type Params = TcpParams<T>;

    fn connect(params: &Self::Params) -> impl Future<Output = io::Result<Self>> + Send {
        let params = params.clone();
        async move {
            let ServerAddr::Tcp { address } = &params.addr;
            info!("connecting to {}...", address);
            let stream = TcpStream::connect(address).await?;
            let (read_half, write_half) = stream.into_split();
            Ok(Self {
                transport: StdMutex::new((params.transport)()),
                reader: Mutex::new(Reader {
                    half: read_half,
                    buffer: vec![0; MAXIMUM_DATA],
                    filled: 0,
                }),
                writer: Mutex::new(write_half),
                params,
            })
        }
    }

    fn params(&self) -> Self::Params {
        self.params.clone()
    }

    fn send(&self, data: &[u8]) -> impl Future<Output = io::Result<()>> + Send {
        async move {
            let mut packed = Vec::with_capacity(data.len() + 16);
            self.transport.lock().unwrap().pack(data, &mut packed);

            let mut writer = self.writer.lock().await;
            writer.write_all(&packed).await
        }
    }

    fn recv(&self) -> impl Future<Output = io::Result<Vec<u8>>> + Send {
        async move {
            let mut reader = self.reader.lock().await;
            loop {
                if reader.filled > 0 {
                    let unpacked = self
                        .transport
                        .lock()
                        .unwrap()
                        .unpack(&reader.buffer[..reader.filled]);
                    match unpacked {
                        Ok(offset) => {
                            let data =
                                reader.buffer[offset.data_start..offset.data_end].to_vec();
                            let filled = reader.filled;
                            reader.buffer.copy_within(offset.next_offset..filled, 0);
                            reader.filled -= offset.next_offset;
                            return Ok(data);
                        }
                        Err(transport::Error::MissingBytes) => {}
                        Err(err) => {
                            return Err(io::Error::new(io::ErrorKind::InvalidData, err));
                        }
                    }
                }

                if reader.filled == reader.buffer.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "incoming packet exceeds maximum size",
                    ));
                }

                let reader = &mut *reader;
                let n = reader.half.read(&mut reader.buffer[reader.filled..]).await?;
                if n == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "read 0 bytes",
                    ));
                }
                reader.filled += n;
            }
        }
    }

    fn close(&self) -> impl Future<Output = ()> + Send {
        async move {
            let mut writer = self.writer.lock().await;
            // The peer will observe the shutdown and close the other
            // direction, which terminates any blocked read.
            drop(writer.shutdown().await);
        }
    }
}
