//! Row-partitioned data distributed across a communicator
//!
//! A `RowPartition` splits a number of rows into equally sized, contiguous sections, one per rank
//! in ascending rank order. A `DistributedCanvas` stores one such section of a two dimensional
//! grid per rank and can append all sections to a shared sink in rank order.
//!
//! Each rank owns `total_rows / size` rows. When `size` does not divide the number of rows, the
//! remaining rows at the bottom belong to no rank.

use std::io;
use std::ops::Range;

use conv::ConvUtil;
use tracing::debug;

use crate::collective::CommunicatorCollectives;
use crate::error::{Error, Result};
use crate::topology::Communicator;
use crate::Rank;

/// The rows owned by one rank
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RowPartition {
    total_rows: usize,
    rows_per_rank: usize,
    rank: usize,
    size: usize,
}

impl RowPartition {
    /// The section of `total_rows` owned by `rank` in a communicator of `size` ranks
    pub fn new(total_rows: usize, size: Rank, rank: Rank) -> Result<Self> {
        if size <= 0 || !(0..size).contains(&rank) {
            return Err(Error::RankOutOfRange { peer: rank, size });
        }
        let (rank, size) = match (rank.value_as::<usize>(), size.value_as::<usize>()) {
            (Ok(rank), Ok(size)) => (rank, size),
            _ => return Err(Error::RankOutOfRange { peer: rank, size }),
        };
        Ok(RowPartition {
            total_rows,
            rows_per_rank: total_rows / size,
            rank,
            size,
        })
    }

    /// The section of `total_rows` owned by the calling process
    pub fn of<C: Communicator>(comm: &C, total_rows: usize) -> Result<Self> {
        Self::new(total_rows, comm.size()?, comm.rank()?)
    }

    /// Number of rows owned by every rank
    pub fn rows_per_rank(&self) -> usize {
        self.rows_per_rank
    }

    /// Global indices of the rows owned by this rank
    pub fn rows(&self) -> Range<usize> {
        let begin = self.rank * self.rows_per_rank;
        begin..begin + self.rows_per_rank
    }

    /// Global indices of the rows owned by no rank
    pub fn unassigned(&self) -> Range<usize> {
        self.rows_per_rank * self.size..self.total_rows
    }

    /// Global index of a local row
    pub fn global_row(&self, local_row: usize) -> usize {
        self.rows().start + local_row
    }

    /// Local index of a global row, if this rank owns it
    pub fn local_row(&self, global_row: usize) -> Option<usize> {
        let rows = self.rows();
        if rows.contains(&global_row) {
            Some(global_row - rows.start)
        } else {
            None
        }
    }
}

/// A `width` x `height` grid whose rows are distributed across a communicator
///
/// Only the section owned by the calling rank is stored, as a flat row-major sequence of
/// `width * rows_per_rank` cells.
#[derive(Clone, Debug)]
pub struct DistributedCanvas<C, P> {
    comm: C,
    width: usize,
    height: usize,
    partition: RowPartition,
    cells: Vec<P>,
}

impl<C, P> DistributedCanvas<C, P>
where
    C: Communicator,
    P: Copy + Default,
{
    /// Allocate this rank's section of a `width` x `height` canvas.
    pub fn new(comm: C, width: usize, height: usize) -> Result<Self> {
        let partition = RowPartition::of(&comm, height)?;
        let cells = vec![P::default(); width * partition.rows_per_rank()];
        Ok(DistributedCanvas {
            comm,
            width,
            height,
            partition,
            cells,
        })
    }

    /// The communicator the canvas is distributed across
    pub fn communicator(&self) -> &C {
        &self.comm
    }

    /// Width of the whole canvas
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the whole canvas
    pub fn height(&self) -> usize {
        self.height
    }

    /// How the rows are distributed
    pub fn partition(&self) -> &RowPartition {
        &self.partition
    }

    /// Global indices of the rows in this rank's section
    pub fn rows(&self) -> Range<usize> {
        self.partition.rows()
    }

    /// Global indices of the columns in this rank's section
    pub fn cols(&self) -> Range<usize> {
        0..self.width
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        let local_row = self.partition.local_row(row)?;
        if col < self.width {
            Some(local_row * self.width + col)
        } else {
            None
        }
    }

    /// The cell at global coordinates, if it lies in this rank's section
    pub fn get(&self, row: usize, col: usize) -> Option<&P> {
        self.index(row, col).map(|i| &self.cells[i])
    }

    /// The cell at global coordinates, if it lies in this rank's section
    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut P> {
        let i = self.index(row, col)?;
        Some(&mut self.cells[i])
    }

    /// This rank's section, row-major
    pub fn flat(&self) -> &[P] {
        &self.cells
    }

    /// This rank's section, row-major
    pub fn flat_mut(&mut self) -> &mut [P] {
        &mut self.cells
    }

    /// Hand every rank's section to `write_section` in ascending rank order.
    ///
    /// This is a collective operation. All ranks first wait until every rank has finished
    /// computing, then each rank in turn writes its section while the others wait for it.
    /// `write_section` is called exactly once on every rank, so a sink opened in append mode
    /// receives the sections without interleaving.
    ///
    /// A failing write does not stop the rank from taking part in the remaining barriers; the
    /// first error is returned once all ranks are done.
    pub fn write_ordered<F>(&self, mut write_section: F) -> Result<()>
    where
        F: FnMut(&[P]) -> io::Result<()>,
    {
        let size = self.comm.size()?;
        let rank = self.comm.rank()?;

        self.comm.barrier()?;
        let mut outcome = Ok(());
        for turn in 0..size {
            if turn == rank {
                debug!(rank, cells = self.cells.len(), "writing section");
                outcome = write_section(&self.cells).map_err(Error::from);
            }
            self.comm.barrier()?;
        }
        outcome
    }
}
