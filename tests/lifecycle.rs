use mpi_facade::environment::Platform;
use mpi_facade::traits::*;
use mpi_facade::transport::mock::MockTransport;
use mpi_facade::{Error, Stage, Universe};

#[test]
fn primitives_fail_before_initialize() {
    let universe = Universe::<MockTransport>::new();
    let world = universe.world();
    assert_eq!(universe.stage(), Stage::Uninitialized);

    match world.barrier() {
        Err(err @ Error::NotRunning { .. }) => assert_eq!(
            err.to_string(),
            "lifecycle violation: stage is uninitialized rather than running"
        ),
        other => panic!("unexpected {:?}", other),
    }
    assert!(world.send(0, 0, &1u8).is_err());
    assert!(universe.processor_name().is_err());
}

#[test]
fn initialize_is_idempotent() {
    let universe = Universe::<MockTransport>::new();
    for _ in 0..3 {
        universe.initialize().unwrap();
        assert_eq!(universe.stage(), Stage::Running);
    }

    // a message sent before a repeated initialize survives it
    let world = universe.world();
    world.send(0, 1, &2u8).unwrap();
    universe.initialize().unwrap();
    assert_eq!(world.receive_vec::<u8>(0, 1).unwrap().0, [2]);
}

#[test]
fn finished_universe_stays_finished() {
    let universe = Universe::<MockTransport>::new();
    universe.initialize().unwrap();
    universe.finalize().unwrap();
    universe.finalize().unwrap();

    assert!(matches!(
        universe.initialize(),
        Err(Error::Regression {
            from: Stage::Finished,
            to: Stage::Running
        })
    ));
    assert_eq!(universe.stage(), Stage::Finished);
    assert!(matches!(
        universe.world().rank(),
        Err(Error::NotRunning {
            current: Stage::Finished,
            expected: Stage::Running
        })
    ));
}

#[test]
fn finalize_without_initialize() {
    let universe = Universe::<MockTransport>::new();
    universe.finalize().unwrap();
    assert_eq!(universe.stage(), Stage::Finished);
    assert!(universe.initialize().is_err());
}

#[test]
fn processor_name_is_cached() {
    let universe = Universe::<MockTransport>::new();
    universe.initialize().unwrap();
    let first = universe.processor_name().unwrap().as_ptr();
    let second = universe.world().processor_name().unwrap().as_ptr();
    assert_eq!(first, second);
}

#[test]
fn mock_reports_its_platform() {
    let universe = Universe::<MockTransport>::new();
    assert_eq!(universe.platform(), Platform::Mock);
    assert_eq!(
        mpi_facade::platform() == Platform::Mock,
        !mpi_facade::MPI_ENABLED
    );
}

#[test]
fn dropping_a_running_universe_is_fine() {
    let universe = Universe::<MockTransport>::new();
    universe.initialize().unwrap();
    universe.world().send(0, 4, &[1i64, 2]).unwrap();
    drop(universe);
}

#[cfg(not(feature = "mpi"))]
#[test]
fn default_universe_is_the_mock() {
    let universe = mpi_facade::initialize().unwrap();
    assert_eq!(universe.stage(), Stage::Running);
    assert_eq!(universe.world().size().unwrap(), 1);
}
