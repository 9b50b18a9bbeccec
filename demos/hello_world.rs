use mpi_facade::traits::*;
use mpi_facade::Rank;
use tracing_subscriber::EnvFilter;

fn section<C: Communicator>(world: &C, title: &str) -> mpi_facade::Result<()> {
    world.barrier()?;
    if world.rank()? == 0 {
        println!("\nDemonstrating {}", title);
    }
    world.barrier()
}

fn multiprocessing<C: Communicator>(world: &C) -> mpi_facade::Result<()> {
    section(world, "multiprocessing")?;
    // the last rank prints so that a broken barrier shows up, rank 0 tends to win races
    if world.rank()? == world.size()? - 1 {
        println!("Using processor {}", world.processor_name()?);
    }
    world.barrier()?;
    println!("Rank {} says hello!", world.rank()?);
    Ok(())
}

fn broadcast<C: Communicator>(world: &C) -> mpi_facade::Result<()> {
    section(world, "broadcast")?;
    let rank = world.rank()?;

    let mut value = rank + 5;
    let original = value;
    world.broadcast_into(0, &mut value)?;
    println!("Rank {} got {} -> {}", rank, original, value);
    assert_eq!(value, 5);

    world.barrier()?;
    let root = world.size()? - 1;
    let mut data = vec![
        f64::from(rank) + 3.141592,
        f64::from(rank) + 2.71828,
        f64::from(rank) + 1.61803,
    ];
    let original = data.clone();
    world.broadcast_into(root, &mut data)?;
    println!("Rank {} got {:?} -> {:?}", rank, original, data);
    assert_eq!(data[0], f64::from(root) + 3.141592);
    Ok(())
}

fn send_receive<C: Communicator>(world: &C) -> mpi_facade::Result<()> {
    let size = world.size()?;
    if size < 2 {
        println!("Skipping send/receive, it needs a distinct sender and receiver");
        return world.barrier();
    }
    section(world, "send/receive")?;

    let rank = world.rank()?;
    let (sender, receiver): (Rank, Rank) = (0, size - 1);
    let tag = 500;

    let mut value = rank;
    if rank == sender {
        world.send(receiver, tag, &value)?;
    }
    if rank == receiver {
        let status = world.receive_into(sender, tag, &mut value)?;
        println!(
            "Rank {} got a message from {}: tag={}, value={}",
            rank,
            status.source_rank(),
            status.tag(),
            value
        );
        assert_eq!(value, sender);
    } else {
        println!("Rank {} got no message.", rank);
    }

    world.barrier()?;
    let data = vec![rank + 20, rank + 40, rank + 60, rank + 80];
    if rank == sender {
        world.send(receiver, tag, &data)?;
    }
    if rank == receiver {
        let (received, status) = world.receive_vec::<Rank>(sender, tag)?;
        println!(
            "Rank {} got a message from {}: tag={}, value={:?}",
            rank,
            status.source_rank(),
            status.tag(),
            received
        );
        assert_eq!(received, [20, 40, 60, 80]);
    }
    Ok(())
}

fn gather<C: Communicator>(world: &C) -> mpi_facade::Result<()> {
    section(world, "gather")?;
    let rank = world.rank()?;
    let root = world.size()? - 1;

    let mut gathered = Vec::<Rank>::new();
    world.gather_into(root, &rank, &mut gathered)?;
    println!("Rank {} has data {:?}", rank, gathered);

    world.barrier()?;
    let data = vec![rank + 10; 5];
    let mut gathered = Vec::<Rank>::new();
    world.gather_into(root, &data, &mut gathered)?;
    println!("Rank {} sent {:?} and received {:?}", rank, data, gathered);
    Ok(())
}

fn main() -> mpi_facade::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let universe = mpi_facade::initialize()?;
    let world = universe.world();

    multiprocessing(&world)?;
    broadcast(&world)?;
    send_receive(&world)?;
    gather(&world)?;
    world.barrier()
}
