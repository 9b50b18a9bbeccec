// Property-based tests over arbitrary payloads on the single rank mock

use mpi_facade::traits::*;
use mpi_facade::transport::mock::MockTransport;
use mpi_facade::Universe;
use proptest::prelude::*;

fn universe() -> Universe<MockTransport> {
    let universe = Universe::new();
    universe.initialize().unwrap();
    universe
}

proptest! {
    #[test]
    fn any_vector_round_trips(
        tag in any::<i32>(),
        data in prop::collection::vec(any::<i64>(), 0..64),
    ) {
        let universe = universe();
        let world = universe.world();

        world.send(0, tag, &data).unwrap();
        let (received, status) = world.receive_vec::<i64>(0, tag).unwrap();
        prop_assert_eq!(&received, &data);
        prop_assert_eq!(status.count(), data.len());
        prop_assert_eq!(status.tag(), tag);
        prop_assert!(world.receive_vec::<i64>(0, tag).is_err());
    }

    #[test]
    fn last_write_wins_per_tag(
        writes in prop::collection::vec((0..4i32, any::<u16>()), 1..32),
    ) {
        let universe = universe();
        let world = universe.world();

        for &(tag, value) in &writes {
            world.send(0, tag, &value).unwrap();
        }
        for tag in 0..4 {
            let last = writes.iter().rev().find(|(t, _)| *t == tag).map(|&(_, v)| v);
            let mut out = 0u16;
            match last {
                Some(value) => {
                    world.receive_into(0, tag, &mut out).unwrap();
                    prop_assert_eq!(out, value);
                }
                None => prop_assert!(world.receive_into(0, tag, &mut out).is_err()),
            }
        }
    }

    #[test]
    fn broadcast_keeps_any_value(value in any::<f64>().prop_filter("comparable", |v| !v.is_nan())) {
        let universe = universe();
        let mut x = value;
        universe.world().broadcast_into(0, &mut x).unwrap();
        prop_assert_eq!(x, value);
    }

    #[test]
    fn gather_copies_any_contribution(
        data in prop::collection::vec(any::<u8>(), 0..32),
        stale in 0..8usize,
    ) {
        let universe = universe();
        let mut output = vec![0xAAu8; stale];
        universe.world().gather_into(0, &data, &mut output).unwrap();
        prop_assert_eq!(output, data);
    }
}
