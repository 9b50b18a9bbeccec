//! Transport forwarding to an MPI library through `mpi-sys`
//!
//! Every primitive maps onto one or two blocking MPI calls on the payload's pointer, count and
//! datatype. Non-zero return codes are turned into `Error::Native`.
//!
//! # Standard section(s)
//!
//! 3.2, 3.8.1, 5.3, 5.4, 5.5, 8.1.1, 8.7

use std::mem::MaybeUninit;
use std::os::raw::{c_char, c_int};
use std::ptr;

use conv::ConvUtil;
use mpi_sys as ffi;
use tracing::{debug, trace};

use crate::datatype::traits::*;
use crate::datatype::{Datatype, Landing};
use crate::environment::{Platform, Stage};
use crate::error::{check, Error, ErrorKind, Result};
use crate::point_to_point::Status;
use crate::transport::Transport;
use crate::{Count, Rank, Tag};

/// Wraps an `MPI_Comm`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NativeComm(ffi::MPI_Comm);

/// Transport backed by the MPI library the crate was built against
#[derive(Debug, Default)]
pub struct NativeTransport(());

fn raw_datatype(datatype: Datatype) -> ffi::MPI_Datatype {
    unsafe {
        match datatype {
            Datatype::Bool => ffi::RSMPI_C_BOOL,
            Datatype::I8 => ffi::RSMPI_INT8_T,
            Datatype::I16 => ffi::RSMPI_INT16_T,
            Datatype::I32 => ffi::RSMPI_INT32_T,
            Datatype::I64 => ffi::RSMPI_INT64_T,
            Datatype::U8 => ffi::RSMPI_UINT8_T,
            Datatype::U16 => ffi::RSMPI_UINT16_T,
            Datatype::U32 => ffi::RSMPI_UINT32_T,
            Datatype::U64 => ffi::RSMPI_UINT64_T,
            Datatype::F32 => ffi::RSMPI_FLOAT,
            Datatype::F64 => ffi::RSMPI_DOUBLE,
            #[cfg(target_pointer_width = "32")]
            Datatype::Isize => ffi::RSMPI_INT32_T,
            #[cfg(target_pointer_width = "32")]
            Datatype::Usize => ffi::RSMPI_UINT32_T,
            #[cfg(target_pointer_width = "64")]
            Datatype::Isize => ffi::RSMPI_INT64_T,
            #[cfg(target_pointer_width = "64")]
            Datatype::Usize => ffi::RSMPI_UINT64_T,
        }
    }
}

/// An element count as understood by the MPI C API
fn to_count(count: usize) -> Result<Count> {
    count.value_as().map_err(|_| Error::CountOverflow(count))
}

/// A count reported by MPI as an element count. `MPI_UNDEFINED` and other negative values are
/// reported as `MPI_ERR_COUNT`.
fn to_usize(count: Count) -> Result<usize> {
    count.value_as().map_err(|_| Error::Native {
        kind: ErrorKind::Count,
        code: ffi::MPI_ERR_COUNT as c_int,
    })
}

fn is_initialized() -> Result<bool> {
    let mut flag: c_int = 0;
    check(unsafe { ffi::MPI_Initialized(&mut flag) })?;
    Ok(flag != 0)
}

fn is_finalized() -> Result<bool> {
    let mut flag: c_int = 0;
    check(unsafe { ffi::MPI_Finalized(&mut flag) })?;
    Ok(flag != 0)
}

impl NativeTransport {
    fn check_peer(&self, comm: NativeComm, peer: Rank) -> Result<()> {
        let size = self.size(comm)?;
        if (0..size).contains(&peer) {
            Ok(())
        } else {
            Err(Error::RankOutOfRange { peer, size })
        }
    }

    /// All-gathers the contribution sizes of a gather and compares them against the root's, so
    /// that every rank fails alike instead of `MPI_Gather` truncating or over-reading.
    #[cfg(debug_assertions)]
    fn check_uniform_count(&self, comm: NativeComm, root: Rank, count: usize) -> Result<()> {
        use smallvec::{smallvec, SmallVec};

        let mut counts: SmallVec<[usize; 8]> = smallvec![0; to_usize(self.size(comm)?)?];
        let datatype = raw_datatype(<usize as Equivalence>::DATATYPE);
        check(unsafe {
            ffi::MPI_Allgather(
                count.pointer(),
                1,
                datatype,
                counts.as_mut_ptr().cast(),
                1,
                datatype,
                comm.0,
            )
        })?;

        let expected = counts[to_usize(root)?];
        match counts.iter().position(|&c| c != expected) {
            None => Ok(()),
            Some(rank) => Err(Error::CountMismatch {
                rank: rank.value_as().map_err(|_| Error::CountOverflow(rank))?,
                count: counts[rank],
                expected,
            }),
        }
    }
}

impl Transport for NativeTransport {
    type Handle = NativeComm;

    #[cfg(msmpi)]
    const PLATFORM: Platform = Platform::MsMpi;
    #[cfg(not(msmpi))]
    const PLATFORM: Platform = Platform::Posix;

    fn new() -> Self {
        NativeTransport(())
    }

    fn startup(&self) -> Result<()> {
        if is_finalized()? {
            return Err(Error::Regression {
                from: Stage::Finished,
                to: Stage::Running,
            });
        }
        if is_initialized()? {
            return Err(Error::AlreadyInitialized);
        }
        check(unsafe { ffi::MPI_Init(ptr::null_mut(), ptr::null_mut()) })?;
        debug!(platform = %Self::PLATFORM, "MPI initialized");
        Ok(())
    }

    fn teardown(&self) -> Result<()> {
        check(unsafe { ffi::MPI_Finalize() })
    }

    fn world(&self) -> NativeComm {
        NativeComm(unsafe { ffi::RSMPI_COMM_WORLD })
    }

    fn size(&self, comm: NativeComm) -> Result<Rank> {
        let mut size: Rank = 0;
        check(unsafe { ffi::MPI_Comm_size(comm.0, &mut size) })?;
        Ok(size)
    }

    fn rank(&self, comm: NativeComm) -> Result<Rank> {
        let mut rank: Rank = 0;
        check(unsafe { ffi::MPI_Comm_rank(comm.0, &mut rank) })?;
        Ok(rank)
    }

    fn processor_name(&self) -> Result<String> {
        let mut buf = vec![0u8; to_usize(unsafe { ffi::RSMPI_MAX_PROCESSOR_NAME })?];
        let mut len: c_int = 0;
        check(unsafe { ffi::MPI_Get_processor_name(buf.as_mut_ptr().cast::<c_char>(), &mut len) })?;
        buf.truncate(to_usize(len)?);
        Ok(String::from_utf8(buf)?)
    }

    fn barrier(&self, comm: NativeComm) -> Result<()> {
        trace!("barrier");
        check(unsafe { ffi::MPI_Barrier(comm.0) })
    }

    fn send<P>(&self, comm: NativeComm, destination: Rank, tag: Tag, payload: &P) -> Result<()>
    where
        P: Payload + ?Sized,
    {
        self.check_peer(comm, destination)?;
        let count = to_count(payload.count())?;
        trace!(destination, tag, count, "send");
        check(unsafe {
            ffi::MPI_Send(
                payload.pointer(),
                count,
                raw_datatype(payload.datatype()),
                destination,
                tag,
                comm.0,
            )
        })
    }

    fn receive_into<P>(
        &self,
        comm: NativeComm,
        source: Rank,
        tag: Tag,
        payload: &mut P,
    ) -> Result<Status>
    where
        P: PayloadMut + ?Sized,
    {
        self.check_peer(comm, source)?;
        let datatype = raw_datatype(payload.datatype());

        let mut status = MaybeUninit::<ffi::MPI_Status>::uninit();
        check(unsafe { ffi::MPI_Probe(source, tag, comm.0, status.as_mut_ptr()) })?;
        let mut count: Count = 0;
        check(unsafe { ffi::MPI_Get_count(status.as_ptr(), datatype, &mut count) })?;
        let elements = to_usize(count)?;
        payload.ensure_capacity(elements)?;

        trace!(source, tag, count, "receive");
        check(unsafe {
            ffi::MPI_Recv(
                payload.pointer_mut(),
                count,
                datatype,
                source,
                tag,
                comm.0,
                status.as_mut_ptr(),
            )
        })?;
        let status = unsafe { status.assume_init() };
        Ok(Status::new(status.MPI_SOURCE, status.MPI_TAG, elements))
    }

    fn broadcast_into<P>(&self, comm: NativeComm, root: Rank, payload: &mut P) -> Result<()>
    where
        P: PayloadMut + ?Sized,
    {
        self.check_peer(comm, root)?;

        // the root's element count goes first so that resizable payloads can follow it
        let mut elements = payload.count();
        check(unsafe {
            ffi::MPI_Bcast(
                elements.pointer_mut(),
                1,
                raw_datatype(<usize as Equivalence>::DATATYPE),
                root,
                comm.0,
            )
        })?;
        let count = to_count(elements)?;
        let datatype = raw_datatype(payload.datatype());
        // a payload that cannot mirror the root still has to take part in the data broadcast
        let mut landing = Landing::exactly(payload, elements);

        trace!(root, count, "broadcast");
        check(unsafe {
            ffi::MPI_Bcast(
                landing.pointer_mut(payload),
                count,
                datatype,
                root,
                comm.0,
            )
        })?;
        landing.finish()
    }

    fn gather_into<S, R>(
        &self,
        comm: NativeComm,
        root: Rank,
        send: &S,
        receive: &mut R,
    ) -> Result<()>
    where
        S: Payload + ?Sized,
        R: PayloadMut<Element = S::Element> + ?Sized,
    {
        self.check_peer(comm, root)?;
        let elements = send.count();
        #[cfg(debug_assertions)]
        self.check_uniform_count(comm, root, elements)?;

        let count = to_count(elements)?;
        let datatype = raw_datatype(send.datatype());
        trace!(root, count, "gather");

        if self.rank(comm)? == root {
            let size = to_usize(self.size(comm)?)?;
            let total = elements
                .checked_mul(size)
                .ok_or(Error::CountOverflow(elements))?;
            let mut landing = Landing::at_least(receive, total);
            check(unsafe {
                ffi::MPI_Gather(
                    send.pointer(),
                    count,
                    datatype,
                    landing.pointer_mut(receive),
                    count,
                    datatype,
                    root,
                    comm.0,
                )
            })?;
            landing.finish()
        } else {
            receive.ensure_capacity(0)?;
            check(unsafe {
                ffi::MPI_Gather(
                    send.pointer(),
                    count,
                    datatype,
                    ptr::null_mut(),
                    0,
                    datatype,
                    root,
                    comm.0,
                )
            })
        }
    }
}
