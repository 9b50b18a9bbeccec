use mpi_facade::traits::*;
use mpi_facade::point_to_point::Status;
use mpi_facade::Rank;
use tracing_subscriber::EnvFilter;

/// Pass `msg` around a ring: send to the next rank, receive from the previous one.
///
/// Even ranks send first and odd ranks receive first, so blocking sends cannot deadlock. With a
/// single rank the message goes through the mailbox of the mock.
fn ring<C, T>(world: &C, tag: mpi_facade::Tag, msg: &[T]) -> mpi_facade::Result<(Vec<T>, Status)>
where
    C: Communicator,
    T: Equivalence,
{
    let size = world.size()?;
    let rank = world.rank()?;
    let next = (rank + 1) % size;
    let previous = (rank - 1 + size) % size;

    if rank % 2 == 0 {
        world.send(next, tag, msg)?;
        world.receive_vec(previous, tag)
    } else {
        let received = world.receive_vec(previous, tag)?;
        world.send(next, tag, msg)?;
        Ok(received)
    }
}

fn main() -> mpi_facade::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let universe = mpi_facade::initialize()?;
    let world = universe.world();
    let size = world.size()?;
    let rank = world.rank()?;
    let previous = (rank - 1 + size) % size;

    let msg: Vec<Rank> = vec![rank, 2 * rank, 4 * rank];
    let (received, status) = ring(&world, 500, &msg)?;
    println!(
        "Rank {} received {:?} from {} with tag {}",
        rank,
        received,
        status.source_rank(),
        status.tag()
    );
    assert_eq!(status.source_rank(), previous);
    assert_eq!(status.tag(), 500);
    assert_eq!(status.count(), 3);
    assert_eq!(received, [previous, 2 * previous, 4 * previous]);

    world.barrier()?;

    let greeting = format!("Hello from rank {}", rank);
    let (bytes, _) = ring(&world, 501, greeting.as_bytes())?;
    let text = String::from_utf8(bytes)?;
    println!("Rank {} read '{}'", rank, text);
    assert_eq!(text, format!("Hello from rank {}", previous));
    Ok(())
}
