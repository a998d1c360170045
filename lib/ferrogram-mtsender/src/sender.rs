// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use crate::configuration::{Configuration, ConnectionState, EventHandlers, Update};
use crate::errors::{InvocationError, RpcError};
use crate::net::Connection;
use crate::packer::MessagePacker;
use crate::plain::{AuthInfo, Authenticator, PlainSender};
use crate::request::{PendingRequest, RequestState};
use ferrogram_mtproto::manual_tl::{GzipPacked, Message, MessageContainer, RpcResult};
use ferrogram_mtproto::{DeserializeError, MsgId, MtpState};
use ferrogram_tl::{self as tl, Deserializable, Identifiable, RemoteCall, Serializable};
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use std::{io, mem, thread};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// Every how often are keepalive pings sent?
const PING_DELAY: Duration = Duration::from_secs(60);

/// After how many seconds should the server close the connection when
/// we send a ping?
///
/// What this value essentially means is that we have
/// `NO_PING_DISCONNECT - PING_DELAY` seconds to keep sending pings,
/// or the server will close the connection.
const NO_PING_DISCONNECT: i32 = 75;

/// How long to wait before re-opening the transport after an
/// involuntary disconnection, so a misbehaving network does not turn
/// into a reconnection storm against the server.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// How many of our own recently-sent acknowledgments to remember, in
/// case the server rejects one of them with a bad salt and it has to
/// be sent again.
const LAST_ACKS_LIMIT: usize = 10;

/// Generate a "random" ping ID.
pub(crate) fn generate_random_id() -> i64 {
    static LAST_ID: AtomicI64 = AtomicI64::new(0);

    while LAST_ID.load(Ordering::SeqCst) == 0 {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("system time is before epoch")
            .as_nanos() as i64;

        if LAST_ID
            .compare_exchange(0, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            thread::yield_now();
        }
    }

    LAST_ID.fetch_add(1, Ordering::SeqCst)
}

/// Manages an authenticated session over a single connection:
/// enqueuing requests, matching them to their responses, and healing
/// the connection when it drops.
///
/// Cheap to clone; all clones drive the same session.
pub struct Sender<C: Connection> {
    inner: Arc<SenderInner<C>>,
}

impl<C: Connection> Clone for Sender<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SenderInner<C: Connection> {
    config: Configuration,
    handlers: EventHandlers,
    params: C::Params,

    state: Mutex<MtpState>,
    packer: MessagePacker,

    /// Requests sent and still awaiting a response, keyed by the
    /// identifier they were last sent under. Ordered, so a drain on
    /// reconnection re-enqueues them in their original send order.
    pending: Mutex<BTreeMap<MsgId, RequestState>>,

    /// Server message identifiers we still have to acknowledge.
    pending_ack: Mutex<Vec<i64>>,

    /// Our most recently sent acknowledgments, so a `bad_server_salt`
    /// referring to one of them can be answered by sending it again.
    last_acks: Mutex<VecDeque<RequestState>>,

    /// The connection currently attached, if any. Loops compare their
    /// own connection against this one to find out they are stale.
    conn: Mutex<Option<Arc<C>>>,

    user_connected: AtomicBool,
    user_disconnected: AtomicBool,
    reconnecting: AtomicBool,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

/// Opens the transport, retrying as configured.
async fn open_with_retries<C: Connection>(
    params: &C::Params,
    config: &Configuration,
    handlers: &EventHandlers,
) -> Result<C, InvocationError> {
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        let opened = match config.connect_timeout {
            Some(limit) => match timeout(limit, C::connect(params)).await {
                Ok(res) => res,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "connect attempt timed out",
                )),
            },
            None => C::connect(params).await,
        };

        match opened {
            Ok(conn) => return Ok(conn),
            Err(err) => {
                if attempt == 1 {
                    handlers.update(Update::Connection(ConnectionState::Disconnected));
                }
                if config.retries.map(|max| attempt >= max).unwrap_or(false) {
                    warn!("failed to connect after {} attempt(s): {}", attempt, err);
                    return Err(err.into());
                }
                warn!(
                    "failed to connect (attempt {}): {}; retrying in {:?}",
                    attempt, err, config.delay
                );
                sleep(config.delay).await;
            }
        }
    }
}

impl<C: Connection> Sender<C> {
    /// Opens a connection and negotiates a fresh authorization key
    /// through the given [`Authenticator`] before spawning the send
    /// and receive loops.
    ///
    /// [`EventHandlers::on_auth_key`] fires once with the new key.
    pub async fn connect<A: Authenticator<C>>(
        params: C::Params,
        config: Configuration,
        handlers: EventHandlers,
        authenticator: A,
    ) -> Result<Self, InvocationError> {
        let conn = open_with_retries::<C>(&params, &config, &handlers).await?;

        info!("generating new authorization key...");
        let auth = {
            let mut plain = PlainSender::new(&conn);
            authenticator.authenticate(&mut plain).await?
        };
        info!("authorization key generated successfully");
        if let Some(on_auth_key) = &handlers.on_auth_key {
            on_auth_key(auth.auth_key, config.dc_id);
        }

        Ok(Self::start(conn, params, auth, config, handlers))
    }

    /// Opens a connection reusing a previously-generated
    /// authorization key, skipping the plain handshake entirely.
    pub async fn connect_with_auth(
        params: C::Params,
        config: Configuration,
        handlers: EventHandlers,
        auth_key: [u8; 256],
    ) -> Result<Self, InvocationError> {
        let conn = open_with_retries::<C>(&params, &config, &handlers).await?;
        let auth = AuthInfo {
            auth_key,
            time_offset: 0,
            first_salt: 0,
        };
        Ok(Self::start(conn, params, auth, config, handlers))
    }

    fn start(
        conn: C,
        params: C::Params,
        auth: AuthInfo,
        config: Configuration,
        handlers: EventHandlers,
    ) -> Self {
        let state = MtpState::build()
            .time_offset(auth.time_offset)
            .first_salt(auth.first_salt)
            .security_checks(config.security_checks)
            .finish(auth.auth_key);

        let inner = Arc::new(SenderInner {
            packer: MessagePacker::new(config.compression_threshold),
            config,
            handlers,
            params,
            state: Mutex::new(state),
            pending: Mutex::new(BTreeMap::new()),
            pending_ack: Mutex::new(Vec::new()),
            last_acks: Mutex::new(VecDeque::with_capacity(LAST_ACKS_LIMIT)),
            conn: Mutex::new(None),
            user_connected: AtomicBool::new(false),
            user_disconnected: AtomicBool::new(false),
            reconnecting: AtomicBool::new(false),
            loops: Mutex::new(Vec::new()),
        });
        inner.attach(Arc::new(conn));
        Self { inner }
    }

    /// Whether the sender is usable: connected and not shut down on
    /// user request.
    pub fn is_connected(&self) -> bool {
        self.inner.user_connected.load(Ordering::SeqCst)
            && !self.inner.user_disconnected.load(Ordering::SeqCst)
    }

    /// Enqueues a request and returns the handle its response will
    /// complete.
    ///
    /// Fails immediately if the sender is not connected. The request
    /// survives involuntary reconnections; it only fails if the
    /// server rejects it, the response cannot be understood, or the
    /// sender is disconnected on user request while it is in flight.
    pub fn send<R: RemoteCall>(&self, request: &R) -> Result<PendingRequest<R>, InvocationError> {
        if !self.is_connected() {
            return Err(InvocationError::NotConnected);
        }

        let body = request.to_bytes();
        debug!(
            "enqueueing request {} to be serialized",
            tl::name_for_id(u32::from_le_bytes([body[0], body[1], body[2], body[3]]))
        );

        let (tx, rx) = oneshot::channel();
        self.inner.packer.append(RequestState::new(body, tx));
        Ok(PendingRequest::new(rx))
    }

    /// Enqueues a request and waits for its response.
    pub async fn invoke<R: RemoteCall>(&self, request: &R) -> Result<R::Return, InvocationError> {
        self.send(request)?.wait().await
    }

    /// The authorization key in use.
    pub fn auth_key(&self) -> [u8; 256] {
        self.inner.state.lock().unwrap().auth_key()
    }

    /// Schedules a reconnection as if the connection had dropped.
    /// Idempotent while one is already in progress.
    pub fn reconnect(&self) {
        self.inner.start_reconnecting();
    }

    /// Shuts the sender down: rejects everything still queued, closes
    /// the transport and stops both loops.
    ///
    /// Requests that were already sent and are awaiting a response
    /// observe [`InvocationError::Dropped`].
    pub async fn disconnect(&self) {
        self.inner.user_disconnected.store(true, Ordering::SeqCst);
        self.inner.user_connected.store(false, Ordering::SeqCst);

        let queued = self.inner.packer.len();
        if queued > 0 {
            debug!("rejecting {} queued item(s) on disconnect", queued);
        }
        self.inner.packer.reject_all();
        self.inner.packer.push_shutdown();
        self.inner.pending.lock().unwrap().clear();

        let conn = self.inner.conn.lock().unwrap().take();
        if let Some(conn) = conn {
            conn.close().await;
        }
        for handle in self.inner.loops.lock().unwrap().drain(..) {
            handle.abort();
        }

        info!("disconnected on user request");
        self.inner
            .handlers
            .update(Update::Connection(ConnectionState::Disconnected));
    }
}

impl<C: Connection> SenderInner<C> {
    /// Installs a connection as the current one and spawns a fresh
    /// pair of loops for it.
    fn attach(self: &Arc<Self>, conn: Arc<C>) {
        *self.conn.lock().unwrap() = Some(Arc::clone(&conn));
        self.user_connected.store(true, Ordering::SeqCst);
        self.reconnecting.store(false, Ordering::SeqCst);

        let mut loops = self.loops.lock().unwrap();
        loops.retain(|handle| !handle.is_finished());
        loops.push(tokio::spawn(
            Arc::clone(self).send_loop(Arc::clone(&conn)),
        ));
        loops.push(tokio::spawn(Arc::clone(self).recv_loop(conn)));
        drop(loops);

        self.handlers
            .update(Update::Connection(ConnectionState::Connected));
    }

    /// Whether `conn` is still the attached connection. Loops spawned
    /// for a replaced connection use this to notice they are stale.
    fn is_current(&self, conn: &Arc<C>) -> bool {
        self.conn
            .lock()
            .unwrap()
            .as_ref()
            .map(|current| Arc::ptr_eq(current, conn))
            .unwrap_or(false)
    }

    /// The writing task: drains acknowledgments and queued requests,
    /// encrypts them, and puts them on the wire. Only this loop (and
    /// the plain handshake before it spawns) ever writes to the
    /// transport.
    async fn send_loop(self: Arc<Self>, conn: Arc<C>) {
        loop {
            if self.user_disconnected.load(Ordering::SeqCst) || !self.is_current(&conn) {
                break;
            }

            let acks = mem::take(&mut *self.pending_ack.lock().unwrap());
            if !acks.is_empty() {
                debug!("acknowledging {} message(s)", acks.len());
                let body =
                    tl::enums::MsgsAck::from(tl::types::MsgsAck { msg_ids: acks }).to_bytes();
                self.packer.append(RequestState::notification(body));
            }

            let batch = match timeout(PING_DELAY, self.packer.get(&self.state)).await {
                Ok(batch) => batch,
                Err(_) => {
                    self.enqueue_keepalive();
                    continue;
                }
            };

            if self.user_disconnected.load(Ordering::SeqCst)
                || self.reconnecting.load(Ordering::SeqCst)
                || !self.is_current(&conn)
            {
                if let Some(batch) = batch {
                    // The requests were drained but can no longer go
                    // through this connection; put them back for the
                    // next one.
                    self.packer.extend(batch.states);
                }
                break;
            }

            let Some(batch) = batch else {
                // Shutdown sentinel for a connection that is still
                // current; nothing to do this iteration.
                continue;
            };

            let ciphertext = self
                .state
                .lock()
                .unwrap()
                .encrypt_message_data(&batch.payload);
            if let Err(err) = conn.send(&ciphertext).await {
                warn!("failed to send {} request(s): {}", batch.states.len(), err);
                self.packer.extend(batch.states);
                break;
            }

            for state in batch.states {
                if state.expects_reply() {
                    debug!(
                        "sent request {} with {:?}",
                        tl::name_for_id(state.constructor_id()),
                        state.msg_id
                    );
                    self.pending.lock().unwrap().insert(state.msg_id, state);
                } else if state.constructor_id() == tl::types::MsgsAck::CONSTRUCTOR_ID {
                    self.push_last_ack(state);
                }
            }
        }
        debug!("send loop exiting");
    }

    /// The reading task: pulls frames off the transport, decrypts
    /// them and dispatches every message they contain.
    async fn recv_loop(self: Arc<Self>, conn: Arc<C>) {
        loop {
            let frame = match conn.recv().await {
                Ok(frame) => frame,
                Err(err) => {
                    if !self.user_disconnected.load(Ordering::SeqCst) && self.is_current(&conn) {
                        warn!("failed to receive a frame: {}; will reconnect", err);
                        self.start_reconnecting();
                    }
                    break;
                }
            };

            let decrypted = self.state.lock().unwrap().decrypt_message_data(&frame);
            let message = match decrypted {
                Ok(message) => message,
                Err(DeserializeError::TransportFrame { code: 404 }) => {
                    error!("the server no longer knows about our authorization key");
                    if self.config.is_main_sender {
                        self.handlers
                            .update(Update::Connection(ConnectionState::Broken));
                    } else if let Some(on_break) = &self.handlers.on_connection_break {
                        on_break(self.config.dc_id);
                    }
                    break;
                }
                Err(DeserializeError::TransportFrame { code }) => {
                    warn!("transport-level status {}; will reconnect", code);
                    self.start_reconnecting();
                    break;
                }
                Err(err) if err.is_security() => {
                    warn!("dropping a message that failed security checks: {}", err);
                    continue;
                }
                Err(err @ DeserializeError::UnexpectedConstructor { .. }) => {
                    warn!("skipping unknown constructor in stream: {}", err);
                    continue;
                }
                Err(err) => {
                    warn!("failed to deserialize a frame: {}; will reconnect", err);
                    self.start_reconnecting();
                    break;
                }
            };

            if let Err(err) = self.process_message(message) {
                match err {
                    DeserializeError::UnexpectedConstructor { id } => {
                        warn!("skipping response with unknown constructor: {:08x}", id)
                    }
                    err => warn!("failed to process a server message: {}", err),
                }
            }
        }
        debug!("receive loop exiting");
    }

    fn enqueue_keepalive(&self) {
        let ping_id = generate_random_id();
        debug!("enqueueing keepalive ping {}", ping_id);
        // The pong is of no interest, so the receiving half is
        // dropped right away and the completion goes nowhere.
        let (tx, _rx) = oneshot::channel();
        self.packer.append(RequestState::new(
            tl::functions::PingDelayDisconnect {
                ping_id,
                disconnect_delay: NO_PING_DISCONNECT,
            }
            .to_bytes(),
            tx,
        ));
    }

    fn push_last_ack(&self, state: RequestState) {
        let mut acks = self.last_acks.lock().unwrap();
        if acks.len() == LAST_ACKS_LIMIT {
            acks.pop_front();
        }
        acks.push_back(state);
    }

    /// Schedules a reconnection unless one is already in progress,
    /// reconnection is disabled, or the user asked to disconnect.
    fn start_reconnecting(self: &Arc<Self>) {
        if self.user_disconnected.load(Ordering::SeqCst) || !self.config.auto_reconnect {
            return;
        }
        if self.reconnecting.swap(true, Ordering::SeqCst) {
            return;
        }
        tokio::spawn(Arc::clone(self).do_reconnect());
    }

    /// Tears the old connection down, re-opens the transport with the
    /// same parameters, rolls the session, and re-enqueues everything
    /// that never got its response.
    async fn do_reconnect(self: Arc<Self>) {
        info!("closing current connection to reconnect...");
        sleep(RECONNECT_BACKOFF).await;
        if self.user_disconnected.load(Ordering::SeqCst) {
            self.reconnecting.store(false, Ordering::SeqCst);
            return;
        }

        let old = self.conn.lock().unwrap().take();
        if let Some(old) = old {
            old.close().await;
        }
        // Unblock the send loop so it notices its connection is gone.
        self.packer.push_shutdown();
        self.state.lock().unwrap().reset();

        let conn = match open_with_retries::<C>(&self.params, &self.config, &self.handlers).await {
            Ok(conn) => Arc::new(conn),
            Err(err) => {
                error!("automatic reconnection failed: {}", err);
                self.user_connected.store(false, Ordering::SeqCst);
                self.reconnecting.store(false, Ordering::SeqCst);
                self.packer.reject_all();
                self.pending.lock().unwrap().clear();
                return;
            }
        };
        if self.user_disconnected.load(Ordering::SeqCst) {
            conn.close().await;
            self.reconnecting.store(false, Ordering::SeqCst);
            return;
        }

        self.attach(conn);

        let states: Vec<RequestState> =
            mem::take(&mut *self.pending.lock().unwrap()).into_values().collect();
        if !states.is_empty() {
            info!("re-enqueueing {} pending request(s) after reconnect", states.len());
            self.packer.extend(states);
        }

        self.reconnecting.store(false, Ordering::SeqCst);
        if let Some(on_auto_reconnect) = &self.handlers.on_auto_reconnect {
            on_auto_reconnect();
        }
    }

    /// Dispatches one decoded message to its handler. Every incoming
    /// message is also scheduled for acknowledgment.
    fn process_message(&self, message: Message) -> Result<(), DeserializeError> {
        self.pending_ack.lock().unwrap().push(message.msg_id);

        match message.constructor_id()? {
            RpcResult::CONSTRUCTOR_ID => self.handle_rpc_result(message),
            MessageContainer::CONSTRUCTOR_ID => self.handle_container(message),
            GzipPacked::CONSTRUCTOR_ID => self.handle_gzip_packed(message),
            tl::types::Pong::CONSTRUCTOR_ID => self.handle_pong(message),
            tl::types::BadServerSalt::CONSTRUCTOR_ID => self.handle_bad_server_salt(message),
            tl::types::BadMsgNotification::CONSTRUCTOR_ID => self.handle_bad_notification(message),
            tl::types::MsgDetailedInfo::CONSTRUCTOR_ID
            | tl::types::MsgNewDetailedInfo::CONSTRUCTOR_ID => self.handle_detailed_info(message),
            tl::types::NewSessionCreated::CONSTRUCTOR_ID => {
                self.handle_new_session_created(message)
            }
            tl::types::MsgsAck::CONSTRUCTOR_ID => self.handle_ack(message),
            tl::types::FutureSalts::CONSTRUCTOR_ID => self.handle_future_salts(message),
            tl::types::MsgsStateReq::CONSTRUCTOR_ID | tl::types::MsgResendReq::CONSTRUCTOR_ID => {
                self.handle_state_forgotten(message)
            }
            tl::types::MsgsAllInfo::CONSTRUCTOR_ID => self.handle_msg_all(message),
            _ => {
                self.handle_update(message);
                Ok(())
            }
        }
    }

    /// A response to a previously-sent RPC, either its result body or
    /// a typed error.
    fn handle_rpc_result(&self, message: Message) -> Result<(), DeserializeError> {
        let rpc_result = RpcResult::from_bytes(&message.body)?;
        let req_msg_id = MsgId(rpc_result.req_msg_id);

        let state = self.pending.lock().unwrap().remove(&req_msg_id);
        let Some(mut state) = state else {
            // File parts may arrive after their request was already
            // forgotten (e.g. re-sent under a different identifier);
            // those are safe to drop.
            if tl::enums::upload::File::from_bytes(&rpc_result.result).is_ok() {
                debug!("dropping file-part result for unknown request {}", req_msg_id);
            } else {
                info!("got rpc result for {} but no such request is saved", req_msg_id);
            }
            return Ok(());
        };

        let constructor_id = match rpc_result.inner_constructor() {
            Ok(constructor_id) => constructor_id,
            Err(err) => {
                state.reject(DeserializeError::from(err).into());
                return Ok(());
            }
        };

        match constructor_id {
            tl::types::RpcError::CONSTRUCTOR_ID => {
                // The caller gets no result bytes to act upon, so the
                // response is acknowledged explicitly on its behalf.
                let ack = tl::enums::MsgsAck::from(tl::types::MsgsAck {
                    msg_ids: vec![message.msg_id],
                })
                .to_bytes();
                self.packer.append(RequestState::notification(ack));

                match tl::enums::RpcError::from_bytes(&rpc_result.result) {
                    Ok(tl::enums::RpcError::Error(error)) => {
                        debug!("got rpc error {:?} for {}", error, req_msg_id);
                        state.reject(InvocationError::Rpc(
                            RpcError::from(error).with_caused_by(state.constructor_id()),
                        ));
                    }
                    Err(err) => state.reject(DeserializeError::from(err).into()),
                }
            }
            GzipPacked::CONSTRUCTOR_ID => {
                let body = GzipPacked::from_bytes(&rpc_result.result)
                    .map_err(DeserializeError::from)
                    .and_then(|gzip| gzip.decompress());
                match body {
                    Ok(body) => state.resolve(body),
                    Err(err) => state.reject(err.into()),
                }
            }
            _ => {
                debug!(
                    "got result {} for request {}",
                    tl::name_for_id(constructor_id),
                    req_msg_id
                );
                state.resolve(rpc_result.result);
            }
        }

        Ok(())
    }

    /// A container simply carries several messages at once; each is
    /// processed as if it had arrived on its own.
    fn handle_container(&self, message: Message) -> Result<(), DeserializeError> {
        debug!("handling container");
        let container = MessageContainer::from_bytes(&message.body)?;
        for inner_message in container.messages {
            self.process_message(inner_message)?;
        }
        Ok(())
    }

    /// Unpacks a compressed message and processes its real content.
    fn handle_gzip_packed(&self, message: Message) -> Result<(), DeserializeError> {
        debug!("handling gzipped data");
        let packed = GzipPacked::from_bytes(&message.body)?;
        self.process_message(Message {
            body: packed.decompress()?,
            ..message
        })
    }

    /// A pong completes the ping that carries the same identifier.
    fn handle_pong(&self, message: Message) -> Result<(), DeserializeError> {
        debug!("handling pong");
        let tl::enums::Pong::Pong(pong) = tl::enums::Pong::from_bytes(&message.body)?;
        if let Some(mut state) = self.pending.lock().unwrap().remove(&MsgId(pong.msg_id)) {
            state.resolve(message.body);
        }
        Ok(())
    }

    /// The salt we used is no longer valid: install the one the
    /// server provided and send the rejected messages again. The new
    /// salt must be in place before anything is re-enqueued, or the
    /// resend would fail the same way.
    fn handle_bad_server_salt(&self, message: Message) -> Result<(), DeserializeError> {
        debug!("handling bad server salt");
        let tl::enums::BadMsgNotification::BadServerSalt(salt) =
            tl::enums::BadMsgNotification::from_bytes(&message.body)?
        else {
            return Ok(());
        };

        self.state.lock().unwrap().set_salt(salt.new_server_salt);

        let states = self.pop_states(MsgId(salt.bad_msg_id));
        info!("got bad server salt; re-sending {} message(s)", states.len());
        self.packer.extend(states);
        Ok(())
    }

    /// The server ignored one of our messages. Clock and sequence
    /// problems are healed in place and the messages sent again;
    /// anything else fails the requests involved.
    fn handle_bad_notification(&self, message: Message) -> Result<(), DeserializeError> {
        debug!("handling bad message notification");
        let tl::enums::BadMsgNotification::Notification(bad_msg) =
            tl::enums::BadMsgNotification::from_bytes(&message.body)?
        else {
            return Ok(());
        };

        let description = InvocationError::describe_bad_message(bad_msg.error_code);
        let states = self.pop_states(MsgId(bad_msg.bad_msg_id));

        match bad_msg.error_code {
            16 | 17 => {
                // The message identifier, and therefore our clock, is
                // off; the server's own identifier is trusted to be
                // correct.
                let offset = self
                    .state
                    .lock()
                    .unwrap()
                    .update_time_offset(message.msg_id);
                info!(
                    "{}; corrected time offset to {}s, re-sending {} message(s)",
                    description,
                    offset,
                    states.len()
                );
                self.packer.extend(states);
            }
            32 => {
                // Sent `seq_no` was too low. Bump it by some
                // large-ish value.
                self.state.lock().unwrap().shift_sequence(64);
                info!("{}; re-sending {} message(s)", description, states.len());
                self.packer.extend(states);
            }
            33 => {
                // Sent `seq_no` was too high (this error doesn't seem
                // to occur in practice).
                self.state.lock().unwrap().shift_sequence(-16);
                info!("{}; re-sending {} message(s)", description, states.len());
                self.packer.extend(states);
            }
            code => {
                warn!("{}; failing {} request(s)", description, states.len());
                for mut state in states {
                    state.reject(InvocationError::BadMessage { code });
                }
            }
        }

        Ok(())
    }

    /// The server already generated an answer for a message of ours;
    /// only the answer needs acknowledging.
    fn handle_detailed_info(&self, message: Message) -> Result<(), DeserializeError> {
        debug!("handling detailed info");
        let answer_msg_id = match tl::enums::MsgDetailedInfo::from_bytes(&message.body)? {
            tl::enums::MsgDetailedInfo::Info(x) => x.answer_msg_id,
            tl::enums::MsgDetailedInfo::MsgNewDetailedInfo(x) => x.answer_msg_id,
        };
        self.pending_ack.lock().unwrap().push(answer_msg_id);
        Ok(())
    }

    /// The server had to create a new session for us; the salt it
    /// communicates is valid from here on.
    fn handle_new_session_created(&self, message: Message) -> Result<(), DeserializeError> {
        debug!("handling new session created");
        let tl::enums::NewSession::Created(new_session) =
            tl::enums::NewSession::from_bytes(&message.body)?;
        self.state.lock().unwrap().set_salt(new_session.server_salt);
        Ok(())
    }

    /// Acknowledgments are informational, with one exception: a
    /// `auth.logOut` request is never answered with an `rpc_result`,
    /// so its acknowledgment is its completion.
    fn handle_ack(&self, message: Message) -> Result<(), DeserializeError> {
        debug!("handling acknowledge");
        let tl::enums::MsgsAck::Ack(ack) = tl::enums::MsgsAck::from_bytes(&message.body)?;

        let mut pending = self.pending.lock().unwrap();
        for msg_id in ack.msg_ids {
            let key = MsgId(msg_id);
            let is_log_out = pending
                .get(&key)
                .map(|state| {
                    state.constructor_id() == tl::functions::auth::LogOut::CONSTRUCTOR_ID
                })
                .unwrap_or(false);
            if is_log_out {
                if let Some(mut state) = pending.remove(&key) {
                    state.resolve(true.to_bytes());
                }
            }
        }
        Ok(())
    }

    /// Future salts complete the request that asked for them. No
    /// attempt is made to rotate to a new salt ahead of time.
    fn handle_future_salts(&self, message: Message) -> Result<(), DeserializeError> {
        debug!("handling future salts");
        let tl::enums::FutureSalts::Salts(salts) =
            tl::enums::FutureSalts::from_bytes(&message.body)?;
        if let Some(mut state) = self
            .pending
            .lock()
            .unwrap()
            .remove(&MsgId(salts.req_msg_id))
        {
            state.resolve(message.body);
        }
        Ok(())
    }

    /// The server asked about messages it apparently never received.
    /// Everything is reported as unknown: one status byte per
    /// identifier in the incoming list.
    fn handle_state_forgotten(&self, message: Message) -> Result<(), DeserializeError> {
        let msg_ids = match message.constructor_id()? {
            tl::types::MsgsStateReq::CONSTRUCTOR_ID => {
                let tl::enums::MsgsStateReq::Req(req) =
                    tl::enums::MsgsStateReq::from_bytes(&message.body)?;
                req.msg_ids
            }
            _ => {
                let tl::enums::MsgResendReq::Req(req) =
                    tl::enums::MsgResendReq::from_bytes(&message.body)?;
                req.msg_ids
            }
        };

        let body = tl::enums::MsgsStateInfo::from(tl::types::MsgsStateInfo {
            req_msg_id: message.msg_id,
            info: vec![0x01; msg_ids.len()],
        })
        .to_bytes();
        self.packer.append(RequestState::notification(body));
        Ok(())
    }

    /// Voluntary communication of the status of our messages;
    /// nothing to do with it.
    fn handle_msg_all(&self, _message: Message) -> Result<(), DeserializeError> {
        Ok(())
    }

    /// Anything that's not a service message is an update for the
    /// layer above.
    fn handle_update(&self, message: Message) {
        if let Ok(constructor_id) = message.constructor_id() {
            debug!("forwarding update with constructor {:08x}", constructor_id);
        }
        self.handlers.update(Update::Updates(message.body));
    }

    /// Recovers the request states linked to a message identifier the
    /// server complained about: the message itself, everything inside
    /// the container it was, or one of our own recent acknowledgments.
    fn pop_states(&self, msg_id: MsgId) -> Vec<RequestState> {
        {
            let mut pending = self.pending.lock().unwrap();
            if let Some(state) = pending.remove(&msg_id) {
                return vec![state];
            }

            let inner_keys: Vec<MsgId> = pending
                .iter()
                .filter(|(_, state)| state.container_msg_id == Some(msg_id))
                .map(|(&key, _)| key)
                .collect();
            if !inner_keys.is_empty() {
                return inner_keys
                    .into_iter()
                    .filter_map(|key| pending.remove(&key))
                    .collect();
            }
        }

        let mut last_acks = self.last_acks.lock().unwrap();
        if let Some(position) = last_acks
            .iter()
            .position(|ack| ack.msg_id == msg_id || ack.container_msg_id == Some(msg_id))
        {
            if let Some(ack) = last_acks.remove(position) {
                return vec![ack];
            }
        }

        Vec::new()
    }
}
