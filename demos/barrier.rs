use std::fs;
use std::path::{Path, PathBuf};

use mpi_facade::traits::*;
use tracing_subscriber::EnvFilter;

fn marker(dir: &Path, rank: mpi_facade::Rank) -> PathBuf {
    dir.join(format!("rank-{}.marker", rank))
}

fn main() -> mpi_facade::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let universe = mpi_facade::initialize()?;
    let world = universe.world();
    let size = world.size()?;
    let rank = world.rank()?;

    let dir = std::env::temp_dir().join("mpi-facade-barrier");
    if rank == 0 && dir.exists() {
        fs::remove_dir_all(&dir)?;
    }
    world.barrier()?;

    fs::create_dir_all(&dir)?;
    fs::write(marker(&dir, rank), rank.to_string())?;
    println!("Before barrier, rank {}.", rank);

    world.barrier()?;

    println!("After barrier, rank {}.", rank);
    for other in 0..size {
        assert!(
            marker(&dir, other).exists(),
            "rank {} passed the barrier before rank {} arrived",
            rank,
            other
        );
    }
    world.barrier()
}
