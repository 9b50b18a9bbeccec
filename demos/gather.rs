use mpi_facade::traits::*;
use tracing_subscriber::EnvFilter;

fn main() -> mpi_facade::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let universe = mpi_facade::initialize()?;
    let world = universe.world();
    let size = world.size()?;
    let rank = world.rank()?;

    let root = 0;
    let i = 2_u64.pow(rank as u32 + 1);
    let mut a = Vec::<u64>::new();
    world.gather_into(root, &i, &mut a)?;

    if rank == root {
        println!("Root gathered sequence: {:?}.", a);
        assert!(a
            .iter()
            .enumerate()
            .all(|(r, &x)| x == 2_u64.pow(r as u32 + 1)));
    } else {
        assert!(a.is_empty());
    }

    // every rank contributes [rank, rank, rank] to the last rank
    let root = size - 1;
    let mut t = vec![-1; 2];
    world.gather_into(root, &[rank; 3], &mut t)?;

    if rank == root {
        println!("Root gathered table:");
        for row in t.chunks(3) {
            println!("{:?}", row);
        }
        let expected: Vec<_> = (0..size).flat_map(|r| [r; 3]).collect();
        assert_eq!(t, expected);
    } else {
        assert!(t.is_empty());
    }
    Ok(())
}
