//! Organizing processes as groups and communicators
//!
//! A communicator is a lightweight, copyable handle on a group of participants. It borrows the
//! `Universe` it belongs to and checks on every call that the universe is running. Starting and
//! stopping the transport is the business of the universe alone.
//!
//! # Unfinished features
//!
//! - **6.4**: Creating communicators other than the world communicator
//! - **7**: Process topologies

use std::fmt;

use crate::environment::Universe;
use crate::error::Result;
use crate::transport::Transport;
use crate::Rank;

/// Topology traits
pub mod traits {
    pub use super::Communicator;
}

/// Communicators are contexts for communication
pub trait Communicator {
    /// The transport messages travel through
    type Transport: Transport;

    /// The universe this communicator belongs to
    fn universe(&self) -> &Universe<Self::Transport>;

    /// The transport level handle of this communicator
    fn handle(&self) -> <Self::Transport as Transport>::Handle;

    /// Number of processes in this communicator
    ///
    /// # Standard section(s)
    ///
    /// 6.4.1
    fn size(&self) -> Result<Rank> {
        Transport::size(self.universe().running()?, self.handle())
    }

    /// The `Rank` that identifies the calling process within this communicator
    ///
    /// # Standard section(s)
    ///
    /// 6.4.1
    fn rank(&self) -> Result<Rank> {
        Transport::rank(self.universe().running()?, self.handle())
    }

    /// Names the processor that the calling process is running on.
    fn processor_name(&self) -> Result<&str> {
        self.universe().processor_name()
    }
}

/// A communicator obtained from a `Universe`, e.g. the world communicator
pub struct SimpleCommunicator<'u, T: Transport> {
    universe: &'u Universe<T>,
    handle: T::Handle,
}

impl<'u, T: Transport> SimpleCommunicator<'u, T> {
    pub(crate) fn new(universe: &'u Universe<T>, handle: T::Handle) -> Self {
        SimpleCommunicator { universe, handle }
    }
}

impl<'u, T: Transport> Communicator for SimpleCommunicator<'u, T> {
    type Transport = T;

    fn universe(&self) -> &Universe<T> {
        self.universe
    }

    fn handle(&self) -> T::Handle {
        self.handle
    }
}

impl<'u, T: Transport> Clone for SimpleCommunicator<'u, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'u, T: Transport> Copy for SimpleCommunicator<'u, T> {}

impl<'u, T: Transport> fmt::Debug for SimpleCommunicator<'u, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleCommunicator")
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::mock::MockTransport;
    use crate::Stage;

    #[test]
    fn queries_require_a_running_universe() {
        let universe = Universe::<MockTransport>::new();
        let world = universe.world();
        assert!(matches!(
            world.size(),
            Err(Error::NotRunning {
                current: Stage::Uninitialized,
                ..
            })
        ));

        universe.initialize().unwrap();
        assert_eq!(world.size().unwrap(), 1);
        assert_eq!(world.rank().unwrap(), 0);

        universe.finalize().unwrap();
        assert!(matches!(
            world.rank(),
            Err(Error::NotRunning {
                current: Stage::Finished,
                ..
            })
        ));
    }

    #[test]
    fn copies_share_the_universe() {
        let universe = Universe::<MockTransport>::new();
        universe.initialize().unwrap();
        let world = universe.world();
        let copy = world;
        assert_eq!(world.handle(), copy.handle());
        assert_eq!(copy.processor_name().unwrap(), "MockMpiProcessor");
        assert!(std::ptr::eq(world.universe(), copy.universe()));
    }
}
