//! Collective communication
//!
//! Every process of a communicator has to take part in a collective operation for any of them to
//! complete. Collectives are totally ordered: no process observes the effects of a later
//! collective before an earlier one has completed on all processes.
//!
//! # Unfinished features
//!
//! - **5.5**: Varying counts gather operation, `MPI_Gatherv()`
//! - **5.6**: Scatter
//! - **5.9**: Global reduction operations
//! - **5.12**: Nonblocking collective operations

use crate::datatype::traits::*;
use crate::error::Result;
use crate::topology::Communicator;
use crate::transport::Transport;
use crate::Rank;

/// Collective communication traits
pub mod traits {
    pub use super::CommunicatorCollectives;
}

/// Collective operations on a communicator
pub trait CommunicatorCollectives: Communicator {
    /// Barrier synchronization among all processes in a `Communicator`
    ///
    /// Calling processes (or threads within the calling processes) will enter the barrier and
    /// block execution until all processes in the `Communicator` have entered the barrier.
    ///
    /// # Standard section(s)
    ///
    /// 5.3
    fn barrier(&self) -> Result<()> {
        Transport::barrier(self.universe().running()?, self.handle())
    }

    /// Broadcast the contents of `payload` on `root` to all processes.
    ///
    /// Afterwards `payload` holds the root's original value everywhere. Resizable payloads are
    /// resized to the root's element count. Fixed-size payloads must have exactly that length:
    /// a shorter one fails with `Error::Capacity` and a longer one with `Error::Length`, after the
    /// process has still taken part in the broadcast.
    ///
    /// # Standard section(s)
    ///
    /// 5.4
    fn broadcast_into<P>(&self, root: Rank, payload: &mut P) -> Result<()>
    where
        P: PayloadMut + ?Sized,
    {
        let transport = self.universe().running()?;
        Transport::broadcast_into(transport, self.handle(), root, payload)
    }

    /// Gather the contents of `send` from all processes into `receive` on `root`.
    ///
    /// On `root`, `receive` holds the contributions of all processes in ascending rank order.
    /// Every process must contribute the same number of elements. On all other processes a
    /// resizable `receive` is left empty. A fixed-size `receive` on `root` that cannot hold all
    /// contributions fails with `Error::Capacity` once the gather has completed.
    ///
    /// # Standard section(s)
    ///
    /// 5.5
    fn gather_into<S, R>(&self, root: Rank, send: &S, receive: &mut R) -> Result<()>
    where
        S: Payload + ?Sized,
        R: PayloadMut<Element = S::Element> + ?Sized,
    {
        let transport = self.universe().running()?;
        Transport::gather_into(transport, self.handle(), root, send, receive)
    }
}

impl<C: Communicator> CommunicatorCollectives for C {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::mock::MockTransport;
    use crate::Universe;

    #[test]
    fn single_rank_collectives() {
        let universe = Universe::<MockTransport>::new();
        universe.initialize().unwrap();
        let world = universe.world();

        world.barrier().unwrap();

        let mut value = [3u64, 4];
        world.broadcast_into(0, &mut value).unwrap();
        assert_eq!(value, [3, 4]);

        let mut gathered = vec![9i16; 7];
        world.gather_into(0, &[1i16, 2, 3], &mut gathered).unwrap();
        assert_eq!(gathered, [1, 2, 3]);
    }

    #[test]
    fn collectives_fail_after_finalize() {
        let universe = Universe::<MockTransport>::new();
        universe.initialize().unwrap();
        let world = universe.world();
        universe.finalize().unwrap();

        assert!(matches!(world.barrier(), Err(Error::NotRunning { .. })));
        let mut x = 0u8;
        assert!(world.broadcast_into(0, &mut x).is_err());
    }
}
