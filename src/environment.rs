//! Environmental management
//!
//! A program interacts with its environment through a `Universe`. The universe owns the transport
//! and a `Lifecycle` guard that makes sure the transport is started exactly once before any
//! communication happens and torn down exactly once when the universe goes out of scope.
//!
//! Communicators borrow the universe they were obtained from, so a communicator can never outlive
//! the environment it communicates through.

use std::cell::Cell;
use std::fmt;

use once_cell::unsync::OnceCell;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::topology::SimpleCommunicator;
use crate::transport::Transport;
use crate::DefaultTransport;

/// Stages of the environment lifecycle, in the only order they can be visited
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// The transport has not been started.
    Uninitialized,
    /// Communication is possible.
    Running,
    /// The transport has been torn down. Terminal.
    Finished,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Uninitialized => "uninitialized",
            Stage::Running => "running",
            Stage::Finished => "finished",
        })
    }
}

/// Monotonic state machine guarding transport startup and teardown.
///
/// The stage only ever advances. Startup runs at most once, on the transition from
/// `Uninitialized` to `Running`, and teardown at most once, on the transition from `Running` to
/// `Finished`. Repeating a transition that has already happened is a no-op.
///
/// # Examples
///
/// ```
/// use mpi_facade::environment::Lifecycle;
/// use mpi_facade::Stage;
///
/// let lifecycle = Lifecycle::new();
/// assert!(lifecycle.assert_running().is_err());
///
/// lifecycle.initialize(|| Ok(())).unwrap();
/// lifecycle.initialize(|| panic!("started twice")).unwrap();
/// assert_eq!(lifecycle.stage(), Stage::Running);
///
/// lifecycle.finalize(|| Ok(())).unwrap();
/// assert!(lifecycle.initialize(|| Ok(())).is_err());
/// ```
#[derive(Debug)]
pub struct Lifecycle {
    stage: Cell<Stage>,
}

impl Lifecycle {
    /// A guard in the `Uninitialized` stage
    pub fn new() -> Self {
        Lifecycle {
            stage: Cell::new(Stage::Uninitialized),
        }
    }

    /// The current stage
    pub fn stage(&self) -> Stage {
        self.stage.get()
    }

    /// Move to stage `to`.
    ///
    /// Staying in the current stage is allowed. Moving to an earlier stage fails with
    /// `Error::Regression` and leaves the stage untouched.
    pub fn advance(&self, to: Stage) -> Result<()> {
        let from = self.stage.get();
        if to < from {
            return Err(Error::Regression { from, to });
        }
        if to != from {
            debug!(%from, %to, "advancing environment stage");
            self.stage.set(to);
        }
        Ok(())
    }

    /// Enter the `Running` stage, calling `startup` if the guard is still `Uninitialized`.
    ///
    /// If `startup` fails the guard stays `Uninitialized`. Once `Finished`, the guard cannot be
    /// initialized again.
    pub fn initialize<F>(&self, startup: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        if self.stage() == Stage::Uninitialized {
            startup()?;
        }
        self.advance(Stage::Running)
    }

    /// Enter the `Finished` stage, calling `teardown` if the guard is `Running`.
    ///
    /// The guard is `Finished` afterwards even if `teardown` fails, so teardown is never attempted
    /// twice.
    pub fn finalize<F>(&self, teardown: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let result = if self.stage() == Stage::Running {
            teardown()
        } else {
            Ok(())
        };
        self.advance(Stage::Finished)?;
        result
    }

    /// Fails with `Error::NotRunning` unless the guard is `Running`.
    pub fn assert_running(&self) -> Result<()> {
        match self.stage() {
            Stage::Running => Ok(()),
            current => Err(Error::NotRunning {
                current,
                expected: Stage::Running,
            }),
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Flavour of transport a build communicates through
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Platform {
    /// The in-process single rank mock
    Mock,
    /// An MPI library on a POSIX-like system, e.g. Open MPI or MPICH
    Posix,
    /// Microsoft MPI
    MsMpi,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Platform::Mock => "mock",
            Platform::Posix => "posix",
            Platform::MsMpi => "ms-mpi",
        })
    }
}

/// The platform of the `DefaultTransport` of this build
pub fn platform() -> Platform {
    DefaultTransport::PLATFORM
}

/// Global context
///
/// Owns the transport and its lifecycle. Dropping the universe finalizes the transport.
pub struct Universe<T: Transport = DefaultTransport> {
    transport: T,
    lifecycle: Lifecycle,
    processor_name: OnceCell<String>,
}

impl<T: Transport> Universe<T> {
    /// A universe whose transport has not been started yet
    pub fn new() -> Self {
        Universe {
            transport: T::new(),
            lifecycle: Lifecycle::new(),
            processor_name: OnceCell::new(),
        }
    }

    /// Start the transport. Idempotent while running.
    pub fn initialize(&self) -> Result<()> {
        self.lifecycle.initialize(|| {
            debug!(platform = %T::PLATFORM, "starting transport");
            self.transport.startup()
        })
    }

    /// Tear the transport down. Idempotent once finished.
    pub fn finalize(&self) -> Result<()> {
        self.lifecycle.finalize(|| {
            debug!(platform = %T::PLATFORM, "tearing down transport");
            self.transport.teardown()
        })
    }

    /// The current lifecycle stage
    pub fn stage(&self) -> Stage {
        self.lifecycle.stage()
    }

    /// The 'world communicator'
    ///
    /// Contains all processes initially partaking in the computation.
    pub fn world(&self) -> SimpleCommunicator<'_, T> {
        SimpleCommunicator::new(self, self.transport.world())
    }

    /// Names the processor that the calling process is running on.
    ///
    /// The name is queried once and cached for the lifetime of the universe.
    pub fn processor_name(&self) -> Result<&str> {
        let transport = self.running()?;
        self.processor_name
            .get_or_try_init(|| transport.processor_name())
            .map(String::as_str)
    }

    /// The platform of the transport
    pub fn platform(&self) -> Platform {
        T::PLATFORM
    }

    /// The transport, provided communication is currently possible
    pub(crate) fn running(&self) -> Result<&T> {
        self.lifecycle.assert_running()?;
        Ok(&self.transport)
    }
}

impl<T: Transport> Default for Universe<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> fmt::Debug for Universe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Universe")
            .field("platform", &T::PLATFORM)
            .field("stage", &self.stage())
            .finish()
    }
}

impl<T: Transport> Drop for Universe<T> {
    fn drop(&mut self) {
        if let Err(err) = self.finalize() {
            error!(%err, "failed to finalize transport");
        }
    }
}

/// Initialize the default transport.
///
/// Builds a `Universe` over the `DefaultTransport` of this build and starts it.
///
/// # Errors
///
/// With the `mpi` feature, fails if MPI was already initialized or finalized outside of this
/// crate, or if `MPI_Init` reports an error.
pub fn initialize() -> Result<Universe> {
    let universe = Universe::new();
    universe.initialize()?;
    Ok(universe)
}
