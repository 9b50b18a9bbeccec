//! Point to point communication
//!
//! Messages are sent to and received from a peer named by its rank, and matched by tag. All
//! operations block: `send` until the payload may be reused, `receive_into` until a matching
//! message has arrived.
//!
//! With the mock transport the only peer is the calling process itself, and receiving a tag
//! nothing was sent on fails instead of blocking.
//!
//! # Unfinished features
//!
//! - **3.4**: Buffered, synchronous and ready mode sends
//! - **3.7**: Nonblocking communication
//! - **3.8**: Wildcard sources and tags, matched probes

use std::fmt;

use crate::datatype::traits::*;
use crate::error::Result;
use crate::topology::Communicator;
use crate::transport::Transport;
use crate::{Rank, Tag};

/// Point to point communication traits
pub mod traits {
    pub use super::PointToPoint;
}

/// Describes the result of a point to point receive operation.
///
/// # Standard section(s)
///
/// 3.2.5
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Status {
    source: Rank,
    tag: Tag,
    count: usize,
}

impl Status {
    pub(crate) fn new(source: Rank, tag: Tag, count: usize) -> Status {
        Status { source, tag, count }
    }

    /// The rank of the message source
    pub fn source_rank(&self) -> Rank {
        self.source
    }

    /// The message tag
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Number of elements contained in the message
    pub fn count(&self) -> usize {
        self.count
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Status {{ source_rank: {}, tag: {}, count: {} }}",
            self.source, self.tag, self.count
        )
    }
}

/// Blocking point to point operations on a communicator
pub trait PointToPoint: Communicator {
    /// Send the contents of `payload` to the process with rank `destination`.
    ///
    /// # Standard section(s)
    ///
    /// 3.2.1
    fn send<P>(&self, destination: Rank, tag: Tag, payload: &P) -> Result<()>
    where
        P: Payload + ?Sized,
    {
        let transport = self.universe().running()?;
        Transport::send(transport, self.handle(), destination, tag, payload)
    }

    /// Receive a message from `source` with tag `tag` into `payload`.
    ///
    /// Resizable payloads end up with exactly the received number of elements. Fixed-size
    /// payloads must be large enough and keep their trailing elements.
    ///
    /// # Standard section(s)
    ///
    /// 3.2.4
    fn receive_into<P>(&self, source: Rank, tag: Tag, payload: &mut P) -> Result<Status>
    where
        P: PayloadMut + ?Sized,
    {
        let transport = self.universe().running()?;
        Transport::receive_into(transport, self.handle(), source, tag, payload)
    }

    /// Receive a message of any length from `source` with tag `tag` into a new `Vec`.
    fn receive_vec<E>(&self, source: Rank, tag: Tag) -> Result<(Vec<E>, Status)>
    where
        E: Equivalence,
    {
        let mut elements = Vec::new();
        let status = self.receive_into(source, tag, &mut elements)?;
        Ok((elements, status))
    }

    /// Receive a text message from `source` with tag `tag`.
    ///
    /// Fails with `Error::InvalidText` if the received bytes are not UTF-8.
    fn receive_string(&self, source: Rank, tag: Tag) -> Result<(String, Status)> {
        let (bytes, status) = self.receive_vec::<u8>(source, tag)?;
        Ok((String::from_utf8(bytes)?, status))
    }
}

impl<C: Communicator> PointToPoint for C {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::mock::MockTransport;
    use crate::Universe;

    #[test]
    fn text_round_trip() {
        let universe = Universe::<MockTransport>::new();
        universe.initialize().unwrap();
        let world = universe.world();

        world.send(0, 11, "Grüße").unwrap();
        let (text, status) = world.receive_string(0, 11).unwrap();
        assert_eq!(text, "Grüße");
        assert_eq!(status.count(), "Grüße".len());
    }

    #[test]
    fn invalid_text_is_rejected() {
        let universe = Universe::<MockTransport>::new();
        universe.initialize().unwrap();
        let world = universe.world();

        world.send(0, 12, &[0xc3u8, 0x28]).unwrap();
        assert!(matches!(
            world.receive_string(0, 12),
            Err(Error::InvalidText(_))
        ));
    }

    #[test]
    fn status_debug_lists_all_fields() {
        let status = Status::new(0, 5, 3);
        assert_eq!(
            format!("{:?}", status),
            "Status { source_rank: 0, tag: 5, count: 3 }"
        );
    }
}
