//! Synchronous rendezvous endpoints.
//!
//! A caller's [`call`](CallerHandle::call) blocks until its partner has
//! received the request and replied; the responder side offers
//! [`wait`](ResponderHandle::wait) and
//! [`reply_and_wait`](ResponderHandle::reply_and_wait). Built on a pair
//! of zero-capacity channels, which gives true rendezvous semantics:
//! a send completes only when the receiver is at its receive.
//!
//! There are no timeouts; every blocking operation waits indefinitely.
//! Teardown is signaled by dropping the caller-side handle, which turns
//! the responder's blocking wait into [`CallError::Disconnected`].

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

use thiserror::Error;

/// Identifies the sender of a received request.
pub type Label = u64;

/// Failure of a single call/wait/reply operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The partner endpoint is gone. Ends a responder's serve loop.
    #[error("partner endpoint disconnected")]
    Disconnected,

    /// A direct kernel call failed.
    #[error("kernel call failed: errno {0}")]
    Kernel(i32),
}

/// Caller side of an endpoint. Created together with its
/// [`ResponderHandle`]; used first for the readiness handshake, then
/// moved into the caller's timed loop. Never shared beyond the pair.
pub struct CallerHandle {
    label: Label,
    req: SyncSender<Label>,
    rep: Receiver<()>,
}

/// Responder side of an endpoint.
pub struct ResponderHandle {
    req: Receiver<Label>,
    rep: SyncSender<()>,
}

/// Create a connected caller/responder handle pair. `label` is delivered
/// to the responder with every request.
pub fn endpoint(label: Label) -> (CallerHandle, ResponderHandle) {
    let (req_tx, req_rx) = sync_channel(0);
    let (rep_tx, rep_rx) = sync_channel(0);
    (
        CallerHandle {
            label,
            req: req_tx,
            rep: rep_rx,
        },
        ResponderHandle {
            req: req_rx,
            rep: rep_tx,
        },
    )
}

impl CallerHandle {
    /// Issue one call: blocks until the partner has taken the request
    /// and sent its reply.
    pub fn call(&self) -> Result<(), CallError> {
        self.req
            .send(self.label)
            .map_err(|_| CallError::Disconnected)?;
        self.rep.recv().map_err(|_| CallError::Disconnected)
    }
}

impl ResponderHandle {
    /// Block for the next request.
    pub fn wait(&self) -> Result<Label, CallError> {
        self.req.recv().map_err(|_| CallError::Disconnected)
    }

    /// Reply to the previous request, then block for the next one.
    pub fn reply_and_wait(&self) -> Result<Label, CallError> {
        self.rep.send(()).map_err(|_| CallError::Disconnected)?;
        self.wait()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn ping_pong_round_trips() {
        let (caller, responder) = endpoint(7);

        let server = thread::spawn(move || {
            let label = responder.wait().unwrap();
            assert_eq!(label, 7);
            let mut received = 1;
            while responder.reply_and_wait().is_ok() {
                received += 1;
            }
            received
        });

        for _ in 0..3 {
            caller.call().unwrap();
        }
        drop(caller);

        // One request per call; the final reply_and_wait sees the drop.
        assert_eq!(server.join().unwrap(), 3);
    }

    #[test]
    fn drop_of_caller_disconnects_wait() {
        let (caller, responder) = endpoint(0);
        drop(caller);
        assert_eq!(responder.wait(), Err(CallError::Disconnected));
    }

    #[test]
    fn call_into_dropped_responder_fails() {
        let (caller, responder) = endpoint(0);
        drop(responder);
        assert_eq!(caller.call(), Err(CallError::Disconnected));
    }
}
