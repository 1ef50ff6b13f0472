//! Screen color sampling plumbing.
//!
//! A pick is issued without blocking and resolved later through a channel:
//! the host (portal, compositor, test) receives a [`PickResponder`] and
//! answers it whenever the user has chosen, possibly from another thread.
//! The editor polls its [`PickRequest`]s on its own thread and applies the
//! result there.  Dropping a responder counts as cancellation.

use std::sync::mpsc;

use crate::color::Color;
use crate::error::PickError;

pub type PickResult = Result<Color, PickError>;

/// Anything able to sample a color from the screen.
pub trait ScreenSampler {
    fn request_pick(&mut self) -> PickRequest;
}

/// State of an outstanding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickPoll {
    Pending,
    Ready(PickResult),
}

/// Editor-side half of a pick.
#[derive(Debug)]
pub struct PickRequest {
    receiver: mpsc::Receiver<PickResult>,
}

impl PickRequest {
    /// Linked responder/request pair.
    pub fn channel() -> (PickResponder, PickRequest) {
        let (sender, receiver) = mpsc::channel();
        (PickResponder { sender }, PickRequest { receiver })
    }

    /// Request that is already answered.
    pub fn ready(result: PickResult) -> Self {
        let (responder, request) = Self::channel();
        responder.respond(result);
        request
    }

    /// Non-blocking check.  A vanished responder resolves as `Cancelled`.
    pub fn poll(&self) -> PickPoll {
        match self.receiver.try_recv() {
            Ok(result) => PickPoll::Ready(result),
            Err(mpsc::TryRecvError::Empty) => PickPoll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => PickPoll::Ready(Err(PickError::Cancelled)),
        }
    }
}

/// Collaborator-side half of a pick.  Consumed on answer, so each request
/// resolves at most once.
#[derive(Debug)]
pub struct PickResponder {
    sender: mpsc::Sender<PickResult>,
}

impl PickResponder {
    pub fn respond(self, result: PickResult) {
        // The editor may have been torn down already; nothing to report to.
        let _ = self.sender.send(result);
    }

    pub fn resolve(self, color: Color) {
        self.respond(Ok(color));
    }

    pub fn cancel(self) {
        self.respond(Err(PickError::Cancelled));
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.respond(Err(PickError::Failed(reason.into())));
    }
}

/// Forwards every request's responder to a host-owned receiver.
pub struct ChannelSampler {
    outbox: mpsc::Sender<PickResponder>,
}

impl ChannelSampler {
    pub fn new() -> (Self, mpsc::Receiver<PickResponder>) {
        let (outbox, inbox) = mpsc::channel();
        (Self { outbox }, inbox)
    }
}

impl ScreenSampler for ChannelSampler {
    fn request_pick(&mut self) -> PickRequest {
        let (responder, request) = PickRequest::channel();
        // If the host hung up, the returned responder is dropped here and the
        // request resolves as cancelled on the next poll.
        let _ = self.outbox.send(responder);
        request
    }
}

/// Sampler for environments without screen access (headless CLI).
#[derive(Default)]
pub struct UnavailableSampler;

impl ScreenSampler for UnavailableSampler {
    fn request_pick(&mut self) -> PickRequest {
        PickRequest::ready(Err(PickError::Failed("screen sampling is not available".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_until_answered() {
        let (responder, request) = PickRequest::channel();
        assert_eq!(request.poll(), PickPoll::Pending);
        responder.resolve(Color::rgb(1, 2, 3));
        assert_eq!(request.poll(), PickPoll::Ready(Ok(Color::rgb(1, 2, 3))));
    }

    #[test]
    fn dropped_responder_is_cancellation() {
        let (responder, request) = PickRequest::channel();
        drop(responder);
        assert_eq!(request.poll(), PickPoll::Ready(Err(PickError::Cancelled)));
    }

    #[test]
    fn answered_from_another_thread() {
        let (mut sampler, inbox) = ChannelSampler::new();
        let request = sampler.request_pick();
        let worker = std::thread::spawn(move || {
            let responder = inbox.recv().unwrap();
            responder.resolve(Color::rgb(9, 9, 9));
        });
        worker.join().unwrap();
        assert_eq!(request.poll(), PickPoll::Ready(Ok(Color::rgb(9, 9, 9))));
    }

    #[test]
    fn host_gone_cancels() {
        let (mut sampler, inbox) = ChannelSampler::new();
        drop(inbox);
        let request = sampler.request_pick();
        assert_eq!(request.poll(), PickPoll::Ready(Err(PickError::Cancelled)));
    }

    #[test]
    fn unavailable_sampler_fails_immediately() {
        let request = UnavailableSampler.request_pick();
        assert!(matches!(request.poll(), PickPoll::Ready(Err(PickError::Failed(_)))));
    }
}
