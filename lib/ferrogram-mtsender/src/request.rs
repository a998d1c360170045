// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use crate::errors::InvocationError;
use ferrogram_mtproto::MsgId;
use ferrogram_tl::{self as tl, Deserializable, Identifiable, RemoteCall};
use std::marker::PhantomData;
use tokio::sync::oneshot;

pub(crate) type ResponseSender = oneshot::Sender<Result<Vec<u8>, InvocationError>>;
pub(crate) type ResponseReceiver = oneshot::Receiver<Result<Vec<u8>, InvocationError>>;

/// One outgoing message: its serialized body, the identifiers it was
/// last sent under, and the channel used to complete the caller's
/// handle.
///
/// The body is serialized eagerly on construction, so assigning a
/// message identifier later is purely a header concern, and re-sends
/// keep byte-identical bodies.
pub(crate) struct RequestState {
    pub body: Vec<u8>,
    pub msg_id: MsgId,
    pub container_msg_id: Option<MsgId>,
    tx: Option<ResponseSender>,
    tracked: bool,
}

impl RequestState {
    /// A request which expects a reply from the server.
    pub fn new(body: Vec<u8>, tx: ResponseSender) -> Self {
        assert!(body.len() >= 4);
        Self {
            body,
            msg_id: MsgId(0),
            container_msg_id: None,
            tx: Some(tx),
            tracked: true,
        }
    }

    /// A fire-and-forget service message; nothing will complete it.
    pub fn notification(body: Vec<u8>) -> Self {
        assert!(body.len() >= 4);
        Self {
            body,
            msg_id: MsgId(0),
            container_msg_id: None,
            tx: None,
            tracked: false,
        }
    }

    /// Peek the constructor ID from the serialized body.
    pub fn constructor_id(&self) -> u32 {
        u32::from_le_bytes([self.body[0], self.body[1], self.body[2], self.body[3]])
    }

    /// Whether a server reply is expected, i.e. whether this state
    /// belongs in the pending map once sent.
    pub fn expects_reply(&self) -> bool {
        self.tracked
    }

    /// Whether the message is content-related and takes an odd
    /// sequence number. Acknowledgments and message-status replies
    /// are the only things the sender emits that are not.
    pub fn content_related(&self) -> bool {
        !matches!(
            self.constructor_id(),
            tl::types::MsgsAck::CONSTRUCTOR_ID | tl::types::MsgsStateInfo::CONSTRUCTOR_ID
        )
    }

    /// Completes the caller's handle with a response body. Only the
    /// first completion has any effect.
    pub fn resolve(&mut self, result: Vec<u8>) {
        if let Some(tx) = self.tx.take() {
            // The caller may have stopped waiting; that's fine.
            drop(tx.send(Ok(result)));
        }
    }

    /// Completes the caller's handle with an error. Only the first
    /// completion has any effect.
    pub fn reject(&mut self, error: InvocationError) {
        if let Some(tx) = self.tx.take() {
            drop(tx.send(Err(error)));
        }
    }
}

/// The caller-visible half of a submitted request: awaits the raw
/// response and deserializes it into the request's return type.
pub struct PendingRequest<R: RemoteCall> {
    rx: ResponseReceiver,
    _request: PhantomData<fn() -> R>,
}

impl<R: RemoteCall> PendingRequest<R> {
    pub(crate) fn new(rx: ResponseReceiver) -> Self {
        Self {
            rx,
            _request: PhantomData,
        }
    }

    /// Waits for the server's response and parses it.
    ///
    /// Fails with [`InvocationError::Dropped`] if the sender went
    /// away with the request still outstanding.
    pub async fn wait(self) -> Result<R::Return, InvocationError> {
        let bytes = self.rx.await.map_err(|_| InvocationError::Dropped)??;
        R::Return::from_bytes(&bytes).map_err(InvocationError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrogram_tl::Serializable;

    #[test]
    fn completion_is_idempotent() {
        let (tx, mut rx) = oneshot::channel();
        let mut state = RequestState::new(tl::functions::Ping { ping_id: 0 }.to_bytes(), tx);

        state.resolve(vec![1, 2, 3]);
        state.reject(InvocationError::Dropped);
        state.resolve(vec![4, 5, 6]);

        match rx.try_recv().unwrap() {
            Ok(bytes) => assert_eq!(bytes, vec![1, 2, 3]),
            Err(e) => panic!("first completion lost: {}", e),
        }
    }

    #[test]
    fn service_messages_are_not_content_related() {
        let ack = RequestState::notification(
            tl::enums::MsgsAck::from(tl::types::MsgsAck { msg_ids: vec![1] }).to_bytes(),
        );
        assert!(!ack.content_related());
        assert!(!ack.expects_reply());

        let (tx, _rx) = oneshot::channel();
        let ping = RequestState::new(tl::functions::Ping { ping_id: 0 }.to_bytes(), tx);
        assert!(ping.content_related());
        assert!(ping.expects_reply());
    }
}
