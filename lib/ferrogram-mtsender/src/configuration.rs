// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::time::Duration;

/// A transition of the connection owned by a [`crate::Sender`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConnectionState {
    /// The transport is open and both loops are running.
    Connected,
    /// The transport is gone, either on request or because opening it
    /// failed.
    Disconnected,
    /// The server no longer recognises our authorization key, and
    /// communication cannot continue until a new one is negotiated.
    Broken,
}

/// A notification surfaced to the owner of a [`crate::Sender`].
#[derive(Clone, Debug, PartialEq)]
pub enum Update {
    /// The connection changed state.
    Connection(ConnectionState),
    /// The server pushed an update; the serialized body is forwarded
    /// as-is for the API layer to interpret.
    Updates(Vec<u8>),
}

/// Optional callbacks fired by the sender as it runs. All of them may
/// be invoked from the sender's internal tasks, hence the `Send +
/// Sync` bounds.
#[derive(Default)]
pub struct EventHandlers {
    /// Fired with connection-state transitions and with every decoded
    /// server update.
    pub on_update: Option<Box<dyn Fn(Update) + Send + Sync>>,

    /// Fired exactly once per newly-generated authorization key,
    /// along with the datacenter it belongs to.
    pub on_auth_key: Option<Box<dyn Fn([u8; 256], i32) + Send + Sync>>,

    /// Fired after an automatic reconnection completed successfully.
    pub on_auto_reconnect: Option<Box<dyn Fn() + Send + Sync>>,

    /// Fired when a non-main sender finds its authorization key is no
    /// longer known by the server, with the datacenter identifier.
    pub on_connection_break: Option<Box<dyn Fn(i32) + Send + Sync>>,
}

impl EventHandlers {
    pub(crate) fn update(&self, update: Update) {
        if let Some(on_update) = &self.on_update {
            on_update(update);
        }
    }
}

/// Configuration for a [`crate::Sender`].
///
/// Instances are commonly built with the Struct Update Syntax over
/// [`Configuration::default`].
pub struct Configuration {
    /// How many times opening the transport is attempted before
    /// giving up. `None` keeps trying forever.
    pub retries: Option<usize>,

    /// How long to wait between transport-open attempts.
    pub delay: Duration,

    /// Whether an involuntary disconnection schedules an automatic
    /// reconnection.
    pub auto_reconnect: bool,

    /// An optional cap on how long a single transport-open attempt
    /// may take.
    pub connect_timeout: Option<Duration>,

    /// Whether this sender holds the account's main connection. Only
    /// the main sender reports a broken authorization key through
    /// [`EventHandlers::on_update`]; the others use
    /// [`EventHandlers::on_connection_break`].
    pub is_main_sender: bool,

    /// The identifier of the datacenter this sender talks to.
    pub dc_id: i32,

    /// Whether decrypted payloads get strict validation beyond what
    /// decryption itself guarantees.
    pub security_checks: bool,

    /// The threshold, in bytes, at which an outgoing request body is
    /// worth attempting to compress. `None` disables compression.
    pub compression_threshold: Option<usize>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            retries: None,
            delay: Duration::from_millis(2000),
            auto_reconnect: true,
            connect_timeout: None,
            is_main_sender: true,
            dc_id: 0,
            security_checks: true,
            compression_threshold: ferrogram_mtproto::DEFAULT_COMPRESSION_THRESHOLD,
        }
    }
}
