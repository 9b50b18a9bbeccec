//! Transports
//!
//! A transport implements the communication primitives for one backend. Exactly one transport is
//! the `DefaultTransport` of a build, chosen by the `mpi` cargo feature, and communicators are
//! generic over it, so every primitive is dispatched statically.
//!
//! Transports do not track the lifecycle themselves: the `Universe` that owns a transport only
//! hands it out while it is running.

use std::fmt;

use crate::datatype::traits::*;
use crate::environment::Platform;
use crate::error::Result;
use crate::point_to_point::Status;
use crate::{Rank, Tag};

pub mod mock;
#[cfg(feature = "mpi")]
pub mod native;

/// Transport traits
pub mod traits {
    pub use super::Transport;
}

/// The primitives a backend has to provide
pub trait Transport: Sized {
    /// Identifies a communicator of this transport.
    type Handle: Copy + PartialEq + fmt::Debug;

    /// What kind of transport this is
    const PLATFORM: Platform;

    /// Construct the transport without starting it.
    fn new() -> Self;

    /// Bring the transport up. Called at most once.
    fn startup(&self) -> Result<()>;

    /// Shut the transport down. Called at most once, and only after a successful `startup()`.
    fn teardown(&self) -> Result<()>;

    /// The communicator containing all participants
    fn world(&self) -> Self::Handle;

    /// Number of participants in `comm`
    fn size(&self, comm: Self::Handle) -> Result<Rank>;

    /// Rank of the calling participant in `comm`
    fn rank(&self, comm: Self::Handle) -> Result<Rank>;

    /// Name of the processor the calling participant runs on
    fn processor_name(&self) -> Result<String>;

    /// Block until every participant of `comm` has called `barrier()`.
    fn barrier(&self, comm: Self::Handle) -> Result<()>;

    /// Send `payload` to `destination`, tagged with `tag`.
    fn send<P>(&self, comm: Self::Handle, destination: Rank, tag: Tag, payload: &P) -> Result<()>
    where
        P: Payload + ?Sized;

    /// Receive the message tagged `tag` from `source` into `payload`.
    fn receive_into<P>(
        &self,
        comm: Self::Handle,
        source: Rank,
        tag: Tag,
        payload: &mut P,
    ) -> Result<Status>
    where
        P: PayloadMut + ?Sized;

    /// Replace `payload` on every participant with the value it holds on `root`.
    fn broadcast_into<P>(&self, comm: Self::Handle, root: Rank, payload: &mut P) -> Result<()>
    where
        P: PayloadMut + ?Sized;

    /// Concatenate the `send` payloads of all participants into `receive` on `root`, in rank
    /// order. On every other participant a resizable `receive` ends up empty.
    fn gather_into<S, R>(
        &self,
        comm: Self::Handle,
        root: Rank,
        send: &S,
        receive: &mut R,
    ) -> Result<()>
    where
        S: Payload + ?Sized,
        R: PayloadMut<Element = S::Element> + ?Sized;
}
