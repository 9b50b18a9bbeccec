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

    let mut x = rank + 5;
    world.broadcast_into(0, &mut x)?;
    println!("Rank {} received value: {}.", rank, x);
    assert_eq!(x, 5);

    for root in 0..size {
        let mut a = [u64::from(rank as u32) * 10; 4];
        world.broadcast_into(root, &mut a)?;
        assert_eq!(a, [u64::from(root as u32) * 10; 4]);

        // non-root ranks start out with a different length and follow the root's
        let mut v = vec![rank == root; (rank + 1) as usize];
        world.broadcast_into(root, &mut v)?;
        assert_eq!(v, vec![true; (root + 1) as usize]);
    }
    println!("Rank {} agrees with every root.", rank);

    let mut text = if rank == 0 {
        b"Hello from the root!".to_vec()
    } else {
        Vec::new()
    };
    world.broadcast_into(0, &mut text)?;
    assert_eq!(text, b"Hello from the root!");
    Ok(())
}
