// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use crate::errors::InvocationError;
use crate::request::RequestState;
use ferrogram_mtproto::manual_tl::{GzipPacked, Message, MessageContainer};
use ferrogram_mtproto::MtpState;
use ferrogram_tl::{Identifiable, Serializable};
use log::debug;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

/// The send queue: accepts request states from any task and hands
/// them to the send loop in batches, already framed as messages (and
/// wrapped in a container when more than one fits).
///
/// A `None` element is the shutdown sentinel: it wakes the consumer
/// without producing a batch, which is how the send loop gets
/// unblocked across a reconnection.
pub(crate) struct MessagePacker {
    queue: Mutex<VecDeque<Option<RequestState>>>,
    notify: Notify,
    compression_threshold: Option<usize>,
}

/// A drained batch: the plaintext to encrypt and the states that went
/// into it, now bearing their assigned identifiers.
pub(crate) struct Batch {
    pub payload: Vec<u8>,
    pub states: Vec<RequestState>,
}

impl MessagePacker {
    pub fn new(compression_threshold: Option<usize>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            compression_threshold,
        }
    }

    /// Enqueues a single request state.
    pub fn append(&self, state: RequestState) {
        self.queue.lock().unwrap().push_back(Some(state));
        self.notify.notify_one();
    }

    /// Enqueues many request states at once, preserving their order.
    pub fn extend(&self, states: Vec<RequestState>) {
        if states.is_empty() {
            return;
        }
        let mut queue = self.queue.lock().unwrap();
        queue.extend(states.into_iter().map(Some));
        drop(queue);
        self.notify.notify_one();
    }

    /// Enqueues the shutdown sentinel, waking the consumer.
    pub fn push_shutdown(&self) {
        self.queue.lock().unwrap().push_back(None);
        self.notify.notify_one();
    }

    /// Rejects every queued request with a disconnection error and
    /// empties the queue.
    pub fn reject_all(&self) {
        let drained: Vec<_> = self.queue.lock().unwrap().drain(..).collect();
        for state in drained.into_iter().flatten() {
            let mut state = state;
            state.reject(InvocationError::Dropped);
        }
    }

    /// How many elements are currently queued. Meant for logging.
    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Waits until at least one element is queued, then greedily
    /// drains as many as fit in a single outgoing payload. Assigns
    /// every drained state its message identifier, wrapping the batch
    /// in a container when it holds more than one message.
    ///
    /// Returns `None` when the first element is the shutdown sentinel.
    ///
    /// # Panics
    ///
    /// The method panics if a request body on the queue is so large
    /// that it can never fit in a message. The server would close the
    /// connection if it were sent, so this is a programmer error.
    pub async fn get(&self, state: &Mutex<MtpState>) -> Option<Batch> {
        let mut drained = loop {
            let notified = self.notify.notified();
            if let Some(drained) = self.try_drain() {
                break drained;
            }
            notified.await;
        }?;

        let mut state = state.lock().unwrap();
        let mut batch_payload = Vec::new();

        if drained.len() == 1 {
            let request = &mut drained[0];
            let body = self.maybe_compress(request);
            request.msg_id =
                state.write_message(&mut batch_payload, &body, request.content_related());
            request.container_msg_id = None;
            debug!(
                "serialized single request {:08x} with {:?}",
                request.constructor_id(),
                request.msg_id
            );
        } else {
            let mut inner = Vec::new();
            for request in drained.iter_mut() {
                let body = self.maybe_compress(request);
                request.msg_id = state.write_message(&mut inner, &body, request.content_related());
            }

            let mut container_body =
                Vec::with_capacity(MessageContainer::SIZE_OVERHEAD + inner.len());
            MessageContainer::CONSTRUCTOR_ID.serialize(&mut container_body);
            (drained.len() as i32).serialize(&mut container_body);
            container_body.extend_from_slice(&inner);

            let container_msg_id = state.write_message(&mut batch_payload, &container_body, false);
            for request in drained.iter_mut() {
                request.container_msg_id = Some(container_msg_id);
            }
            debug!(
                "serialized {} requests in container {:?}",
                drained.len(),
                container_msg_id
            );
        }

        Some(Batch {
            payload: batch_payload,
            states: drained,
        })
    }

    /// Pops queued entries under the size and count budgets, or
    /// `Some(None)` for a leading shutdown sentinel, or `None` when
    /// the queue is empty.
    #[allow(clippy::option_option)]
    fn try_drain(&self) -> Option<Option<Vec<RequestState>>> {
        let mut queue = self.queue.lock().unwrap();

        match queue.front()? {
            None => {
                queue.pop_front();
                return Some(None);
            }
            Some(_) => {}
        }

        let mut batch = Vec::new();
        let mut size = 0;
        while let Some(Some(state)) = queue.front() {
            let cost = state.body.len() + Message::SIZE_OVERHEAD;
            assert!(cost <= MessageContainer::MAXIMUM_SIZE);

            if size + cost > MessageContainer::MAXIMUM_SIZE
                || batch.len() == MessageContainer::MAXIMUM_LENGTH
            {
                break;
            }

            size += cost;
            batch.push(queue.pop_front().unwrap().unwrap());
        }

        Some(Some(batch))
    }

    /// Compresses a content-related body when it is large enough for
    /// that to pay off.
    fn maybe_compress(&self, request: &RequestState) -> Vec<u8> {
        if let Some(threshold) = self.compression_threshold {
            if request.content_related() && request.body.len() >= threshold {
                let compressed = GzipPacked::new(&request.body).to_bytes();
                if compressed.len() < request.body.len() {
                    return compressed;
                }
            }
        }
        request.body.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrogram_tl::{self as tl, Deserializable};
    use tokio::sync::oneshot;

    fn mtp_state() -> Mutex<MtpState> {
        Mutex::new(MtpState::build().finish([0; 256]))
    }

    fn ping_state(ping_id: i64) -> RequestState {
        let (tx, _rx) = oneshot::channel();
        RequestState::new(tl::functions::Ping { ping_id }.to_bytes(), tx)
    }

    #[tokio::test]
    async fn single_request_is_not_wrapped() {
        let packer = MessagePacker::new(None);
        let state = mtp_state();

        packer.append(ping_state(1));
        let batch = packer.get(&state).await.unwrap();

        assert_eq!(batch.states.len(), 1);
        assert_eq!(batch.states[0].container_msg_id, None);
        let message = Message::from_bytes(&batch.payload).unwrap();
        assert_eq!(message.msg_id, batch.states[0].msg_id.0);
        assert_eq!(
            message.constructor_id().unwrap(),
            tl::functions::Ping::CONSTRUCTOR_ID
        );
    }

    #[tokio::test]
    async fn multiple_requests_share_a_container() {
        let packer = MessagePacker::new(None);
        let state = mtp_state();

        packer.extend(vec![ping_state(1), ping_state(2), ping_state(3)]);
        let batch = packer.get(&state).await.unwrap();

        assert_eq!(batch.states.len(), 3);
        let outer = Message::from_bytes(&batch.payload).unwrap();
        assert_eq!(
            outer.constructor_id().unwrap(),
            MessageContainer::CONSTRUCTOR_ID
        );

        let container = MessageContainer::from_bytes(&outer.body).unwrap();
        assert_eq!(container.messages.len(), 3);

        // Inner identifiers are strictly increasing and all below the
        // container's own, which every state back-references.
        let ids: Vec<i64> = container.messages.iter().map(|m| m.msg_id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(ids.iter().all(|&id| id < outer.msg_id));
        assert!(batch
            .states
            .iter()
            .all(|s| s.container_msg_id.map(|c| c.0) == Some(outer.msg_id)));
    }

    #[tokio::test]
    async fn drain_respects_size_budget() {
        let packer = MessagePacker::new(None);
        let state = mtp_state();

        // Two bodies of ~600 KiB cannot share a single container.
        let big = vec![0u8; 600 * 1024];
        let (tx_a, _rx_a) = oneshot::channel();
        let (tx_b, _rx_b) = oneshot::channel();
        let mut body = tl::functions::Ping { ping_id: 0 }.to_bytes();
        body.extend_from_slice(&big);
        packer.append(RequestState::new(body.clone(), tx_a));
        packer.append(RequestState::new(body, tx_b));

        let first = packer.get(&state).await.unwrap();
        assert_eq!(first.states.len(), 1);
        let second = packer.get(&state).await.unwrap();
        assert_eq!(second.states.len(), 1);
    }

    #[tokio::test]
    async fn shutdown_sentinel_interrupts() {
        let packer = MessagePacker::new(None);
        let state = mtp_state();

        packer.push_shutdown();
        assert!(packer.get(&state).await.is_none());

        // A sentinel behind requests does not swallow them.
        packer.append(ping_state(1));
        packer.push_shutdown();
        assert!(packer.get(&state).await.is_some());
        assert!(packer.get(&state).await.is_none());
    }

    #[tokio::test]
    async fn reject_all_completes_with_error() {
        let packer = MessagePacker::new(None);

        let (tx, rx) = oneshot::channel();
        packer.append(RequestState::new(
            tl::functions::Ping { ping_id: 1 }.to_bytes(),
            tx,
        ));
        packer.reject_all();

        assert!(matches!(
            rx.await.unwrap(),
            Err(InvocationError::Dropped)
        ));
        assert_eq!(packer.len(), 0);
    }

    #[tokio::test]
    async fn large_bodies_are_compressed() {
        let packer = MessagePacker::new(Some(512));
        let state = mtp_state();

        let mut body = tl::functions::Ping { ping_id: 0 }.to_bytes();
        body.extend(std::iter::repeat(0u8).take(4 * 1024));
        let (tx, _rx) = oneshot::channel();
        packer.append(RequestState::new(body.clone(), tx));

        let batch = packer.get(&state).await.unwrap();
        let message = Message::from_bytes(&batch.payload).unwrap();
        assert_eq!(
            message.constructor_id().unwrap(),
            GzipPacked::CONSTRUCTOR_ID
        );
        assert!(message.body.len() < body.len());
        // The queued state keeps the original body for re-sends.
        assert_eq!(batch.states[0].body, body);
    }
}
