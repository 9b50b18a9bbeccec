#![deny(missing_docs)]
#![warn(missing_copy_implementations)]
#![warn(trivial_casts)]
#![warn(trivial_numeric_casts)]
#![warn(unused_import_braces)]
#![warn(unused_qualifications)]

//! Uniform message passing primitives over MPI or an in-process mock
//!
//! This crate exposes a small set of point to point and collective communication primitives
//! (barrier, send/receive, broadcast, gather) that behave the same whether they are backed by a
//! real [MPI] library or by a mock transport that simulates a universe with a single rank. The
//! mock makes it possible to develop and test programs written against these primitives without
//! an MPI installation or a process launcher.
//!
//! [MPI]: http://www.mpi-forum.org
//!
//! # Usage
//!
//! ```no_run
//! use mpi_facade::traits::*;
//!
//! fn main() -> mpi_facade::Result<()> {
//!     let universe = mpi_facade::initialize()?;
//!     let world = universe.world();
//!     let rank = world.rank()?;
//!
//!     let mut value = rank + 5;
//!     world.broadcast_into(0, &mut value)?;
//!     assert_eq!(value, 5);
//!
//!     let mut gathered = Vec::<mpi_facade::Rank>::new();
//!     world.gather_into(0, &[rank; 3], &mut gathered)?;
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! Exactly one backend is the `DefaultTransport` of a build:
//!
//! - without the `mpi` feature, [`transport::mock::MockTransport`] simulates one rank in-process
//!   and buffers self-addressed point to point messages by tag;
//! - with the `mpi` feature, `transport::native::NativeTransport` forwards every primitive to the
//!   MPI C API through `mpi-sys`.
//!
//! The mock is always compiled and can be named explicitly, e.g.
//! `Universe::<MockTransport>::new()`.
//!
//! # Payloads
//!
//! Anything implementing [`datatype::Payload`] can be sent: scalars of the supported element
//! types, arrays, slices, vectors and strings. Receiving goes through [`datatype::PayloadMut`],
//! which resizes vectors to the incoming element count and rejects fixed-size payloads that are
//! too small.

use std::os::raw::c_int;

pub mod canvas;
pub mod collective;
pub mod datatype;
pub mod environment;
pub mod error;
pub mod point_to_point;
pub mod topology;
pub mod transport;

/// Re-exports all traits.
pub mod traits {
    pub use crate::collective::traits::*;
    pub use crate::datatype::traits::*;
    pub use crate::point_to_point::traits::*;
    pub use crate::topology::traits::*;
    pub use crate::transport::traits::*;
}

pub use crate::environment::{initialize, platform, Platform, Stage, Universe};
pub use crate::error::{Error, Result};

/// The transport selected for this build by the `mpi` cargo feature.
#[cfg(feature = "mpi")]
pub type DefaultTransport = transport::native::NativeTransport;

/// The transport selected for this build by the `mpi` cargo feature.
#[cfg(not(feature = "mpi"))]
pub type DefaultTransport = transport::mock::MockTransport;

/// Whether this build forwards to a real MPI library.
pub const MPI_ENABLED: bool = cfg!(feature = "mpi");

/// Identifies a process within a communicator.
pub type Rank = c_int;
/// Can be used to tag messages on the sender side and match on the receiver side.
pub type Tag = c_int;
/// Encodes number of values in multi-value messages.
pub type Count = c_int;
