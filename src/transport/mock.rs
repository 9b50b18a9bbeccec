//! In-process transport simulating a universe with a single rank
//!
//! The only participant has rank 0 in a world of size 1. Collective operations are trivially
//! satisfied by that participant alone, and point to point messages can only be addressed to
//! itself. Sent messages are held in a mailbox keyed by tag until a matching receive consumes them.
//!
//! The mailbox is not a queue: sending twice on a tag before receiving replaces the first message.
//! A receive only consumes its message if it succeeds, so a receive that fails because of a type
//! or capacity mismatch can be retried with a suitable payload.

use std::cell::RefCell;
use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::datatype::traits::*;
use crate::datatype::Elements;
use crate::environment::Platform;
use crate::error::{Error, Result};
use crate::point_to_point::Status;
use crate::transport::Transport;
use crate::{Rank, Tag};

/// Rank of the only participant
pub const RANK: Rank = 0;

/// Processor name reported by the mock
pub const PROCESSOR_NAME: &str = "MockMpiProcessor";

/// Handle of the mock world communicator, the only communicator there is
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MockComm;

#[derive(Debug)]
struct Envelope {
    status: Status,
    elements: Elements,
}

/// Single rank transport with a tag-keyed mailbox
#[derive(Debug, Default)]
pub struct MockTransport {
    mailbox: RefCell<BTreeMap<Tag, Envelope>>,
}

impl MockTransport {
    /// Number of messages sent but not yet received
    pub fn pending(&self) -> usize {
        self.mailbox.borrow().len()
    }

    fn check_peer(operation: &'static str, peer: Rank) -> Result<()> {
        if peer == RANK {
            Ok(())
        } else {
            Err(Error::Addressing {
                operation,
                peer,
                rank: RANK,
            })
        }
    }
}

impl Transport for MockTransport {
    type Handle = MockComm;

    const PLATFORM: Platform = Platform::Mock;

    fn new() -> Self {
        Self::default()
    }

    fn startup(&self) -> Result<()> {
        Ok(())
    }

    fn teardown(&self) -> Result<()> {
        let mut mailbox = self.mailbox.borrow_mut();
        if !mailbox.is_empty() {
            debug!(
                pending = mailbox.len(),
                "discarding unreceived messages on teardown"
            );
        }
        mailbox.clear();
        Ok(())
    }

    fn world(&self) -> MockComm {
        MockComm
    }

    fn size(&self, _comm: MockComm) -> Result<Rank> {
        Ok(1)
    }

    fn rank(&self, _comm: MockComm) -> Result<Rank> {
        Ok(RANK)
    }

    fn processor_name(&self) -> Result<String> {
        Ok(PROCESSOR_NAME.to_owned())
    }

    fn barrier(&self, _comm: MockComm) -> Result<()> {
        trace!(rank = RANK, "barrier");
        Ok(())
    }

    fn send<P>(&self, _comm: MockComm, destination: Rank, tag: Tag, payload: &P) -> Result<()>
    where
        P: Payload + ?Sized,
    {
        Self::check_peer("send", destination)?;

        let elements = <P::Element as Equivalence>::pack(payload.elements());
        let count = elements.len();
        trace!(tag, count, datatype = %elements.datatype(), "buffering message");

        let envelope = Envelope {
            status: Status::new(RANK, tag, count),
            elements,
        };
        if let Some(previous) = self.mailbox.borrow_mut().insert(tag, envelope) {
            warn!(
                tag,
                count = previous.status.count(),
                "overwriting message that was never received"
            );
        }
        Ok(())
    }

    fn receive_into<P>(
        &self,
        _comm: MockComm,
        source: Rank,
        tag: Tag,
        payload: &mut P,
    ) -> Result<Status>
    where
        P: PayloadMut + ?Sized,
    {
        Self::check_peer("receive", source)?;

        let mut mailbox = self.mailbox.borrow_mut();
        let envelope = mailbox.get(&tag).ok_or(Error::NoMessage { tag })?;
        let elements = <P::Element as Equivalence>::unpack(&envelope.elements).ok_or_else(|| {
            Error::TypeMismatch {
                tag,
                expected: payload.datatype(),
                found: envelope.elements.datatype(),
            }
        })?;
        payload.fill_from(elements)?;

        let status = envelope.status;
        mailbox.remove(&tag);
        trace!(tag, count = status.count(), "received buffered message");
        Ok(status)
    }

    fn broadcast_into<P>(&self, _comm: MockComm, root: Rank, payload: &mut P) -> Result<()>
    where
        P: PayloadMut + ?Sized,
    {
        Self::check_peer("broadcast", root)?;
        trace!(root, count = payload.count(), "broadcast");
        Ok(())
    }

    fn gather_into<S, R>(
        &self,
        _comm: MockComm,
        root: Rank,
        send: &S,
        receive: &mut R,
    ) -> Result<()>
    where
        S: Payload + ?Sized,
        R: PayloadMut<Element = S::Element> + ?Sized,
    {
        Self::check_peer("gather", root)?;
        trace!(root, count = send.count(), "gather");
        receive.fill_from(send.elements())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::Datatype;

    fn transport() -> MockTransport {
        let transport = MockTransport::new();
        transport.startup().unwrap();
        transport
    }

    #[test]
    fn world_has_one_rank() {
        let t = transport();
        assert_eq!(t.size(t.world()).unwrap(), 1);
        assert_eq!(t.rank(t.world()).unwrap(), 0);
        assert_eq!(t.processor_name().unwrap(), "MockMpiProcessor");
    }

    #[test]
    fn last_send_wins() {
        let t = transport();
        t.send(MockComm, 0, 3, &[1u8, 2, 3]).unwrap();
        t.send(MockComm, 0, 3, &[9u8]).unwrap();
        assert_eq!(t.pending(), 1);

        let mut out = Vec::<u8>::new();
        let status = t.receive_into(MockComm, 0, 3, &mut out).unwrap();
        assert_eq!(out, [9]);
        assert_eq!(status.count(), 1);
        assert_eq!(t.pending(), 0);
    }

    #[test]
    fn tags_are_independent() {
        let t = transport();
        t.send(MockComm, 0, 1, &10i64).unwrap();
        t.send(MockComm, 0, 2, &20i64).unwrap();

        let mut x = 0i64;
        t.receive_into(MockComm, 0, 2, &mut x).unwrap();
        assert_eq!(x, 20);
        t.receive_into(MockComm, 0, 1, &mut x).unwrap();
        assert_eq!(x, 10);
    }

    #[test]
    fn mismatched_receive_keeps_the_message() {
        let t = transport();
        t.send(MockComm, 0, 4, &[1.5f64, 2.5]).unwrap();

        let mut wrong_type = Vec::<f32>::new();
        match t.receive_into(MockComm, 0, 4, &mut wrong_type) {
            Err(Error::TypeMismatch {
                tag,
                expected,
                found,
            }) => {
                assert_eq!(tag, 4);
                assert_eq!(expected, Datatype::F32);
                assert_eq!(found, Datatype::F64);
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut too_small = 0.0f64;
        assert!(matches!(
            t.receive_into(MockComm, 0, 4, &mut too_small),
            Err(Error::Capacity {
                required: 2,
                capacity: 1
            })
        ));
        assert_eq!(t.pending(), 1);

        let mut out = [0.0f64; 2];
        t.receive_into(MockComm, 0, 4, &mut out).unwrap();
        assert_eq!(out, [1.5, 2.5]);
    }

    #[test]
    fn only_rank_zero_is_addressable() {
        let t = transport();
        let mut x = 0u32;
        assert!(matches!(
            t.send(MockComm, 1, 0, &x),
            Err(Error::Addressing {
                operation: "send",
                peer: 1,
                rank: 0
            })
        ));
        assert!(t.receive_into(MockComm, -1, 0, &mut x).is_err());
        assert!(t.broadcast_into(MockComm, 2, &mut x).is_err());
        assert!(t.gather_into(MockComm, 1, &x, &mut Vec::<u32>::new()).is_err());
        assert_eq!(t.pending(), 0);
    }

    #[test]
    fn teardown_discards_pending_messages() {
        let t = transport();
        t.send(MockComm, 0, 0, "left behind").unwrap();
        t.teardown().unwrap();
        assert_eq!(t.pending(), 0);
    }
}
