// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The byte-transport seam of the sender.
//!
//! The sender itself only speaks in whole frames through the
//! [`Connection`] trait; everything below it (sockets, packet
//! delimiting, proxies) is the implementation's concern. The crate
//! ships [`TcpConnection`], a direct TCP implementation framed by one
//! of the [`ferrogram_mtproto::transport`] codecs.

mod tcp;

use std::future::Future;
use std::io;

pub use tcp::{TcpConnection, TcpParams};

/// Represents the address of a server to connect to.
#[derive(Debug, Clone)]
pub enum ServerAddr {
    /// Socket address for a direct TCP connection.
    Tcp { address: std::net::SocketAddr },
}

/// A full-duplex, frame-oriented transport to a single server.
///
/// Both directions may be in flight at the same time, which is why
/// every method takes `&self`; implementations are expected to hold
/// each direction's state behind its own lock.
///
/// The same concrete type is re-created from its [`Connection::Params`]
/// when the sender reconnects, which is how the transport kind, the
/// address and any related options survive a reconnection.
pub trait Connection: Send + Sync + Sized + 'static {
    /// Everything needed to establish another connection just like
    /// this one.
    type Params: Clone + Send + Sync + 'static;

    /// Opens a new connection.
    fn connect(params: &Self::Params) -> impl Future<Output = io::Result<Self>> + Send;

    /// The parameters this connection was opened with.
    fn params(&self) -> Self::Params;

    /// Sends one whole frame.
    fn send(&self, data: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Receives the next whole frame.
    fn recv(&self) -> impl Future<Output = io::Result<Vec<u8>>> + Send;

    /// Closes the connection. Pending and future operations on it
    /// should fail promptly.
    fn close(&self) -> impl Future<Output = ()> + Send;
}
