use glam::DVec3;
use kartai_brain::{
    model::ModelArtifact,
    network::{Brain as _, Perceptron, Topology},
    sensor::SensorLayout,
};
use kartai_engine::{Checkpoint, Track};
use kartai_training::{
    config::TrainingConfig,
    session::TrainingSession,
    simulator::{RaceConfig, RaceEnd, RaceSimulator, SimulationParams},
    store::ModelStore,
};

fn two_checkpoint_track() -> Track {
    Track::new(
        vec![
            Checkpoint::new(DVec3::ZERO, 2.0),
            Checkpoint::new(DVec3::new(0.0, 0.0, -10.0), 2.0),
        ],
        vec![],
        vec![],
    )
    .unwrap()
}

fn small_config() -> TrainingConfig {
    let mut config = TrainingConfig {
        track: "sprint".to_owned(),
        generations: 2,
        population_size: 4,
        elite_count: 1,
        seed: Some(2024),
        ..TrainingConfig::default()
    };
    config.race.simulation.time_budget = 10.0;
    config
}

#[test]
fn train_two_generations_end_to_end() {
    let track = two_checkpoint_track();
    let dir = tempfile::tempdir().unwrap();
    let config = small_config();
    let store = ModelStore::new(dir.path(), &*config.track, config.sensors.clone());
    let mut session = TrainingSession::<Perceptron>::new(&config, &track, &store).unwrap();

    let mut reports = vec![];
    let summary = session.run(|report| reports.push(report.clone()));

    assert_eq!(summary.generations, 2);
    assert_eq!(reports.len(), 2);
    assert!(reports[1].best >= reports[0].best);
    assert_eq!(summary.final_best, reports[1].best);

    // the last generation is always snapshotted
    let snapshot = ModelArtifact::load(store.generation_path(2)).unwrap();
    assert_eq!(snapshot.track, "sprint");
    assert_eq!(snapshot.generation, 2);
    assert_eq!(snapshot.sensors, SensorLayout::default());
    let network: Perceptron = snapshot.to_brain().unwrap();
    assert_eq!(network.topology(), Topology::default());

    let highest = reports.iter().map(|r| r.best).fold(f64::MIN, f64::max);
    match summary.best_ever {
        Some(record) => {
            let best = ModelArtifact::load(store.best_path()).unwrap();
            assert_eq!(best.fitness, record.fitness);
            assert!(record.fitness <= highest);
        }
        None => {
            assert!(!store.best_path().exists());
            assert!(reports.iter().all(|r| r.degenerate));
        }
    }
}

#[test]
fn zero_weight_network_is_disqualified() {
    let track = two_checkpoint_track();
    let layout = SensorLayout::default();
    let config = RaceConfig::default();
    let simulator = RaceSimulator::new(&track, &layout, &config);

    let outcome = simulator
        .run(&Perceptron::zeroed(Topology::default()))
        .unwrap();
    assert!(outcome.disqualified);
    assert_eq!(outcome.end, RaceEnd::Stuck);
    assert_eq!(outcome.fitness, 0.0);
}

#[test]
fn full_throttle_kart_makes_continuous_progress() {
    let track = Track::new(
        vec![
            Checkpoint::new(DVec3::ZERO, 2.0),
            Checkpoint::new(DVec3::new(0.0, 0.0, -100.0), 2.0),
        ],
        vec![],
        vec![],
    )
    .unwrap();
    let layout = SensorLayout::default();
    let config = RaceConfig {
        simulation: SimulationParams {
            time_budget: 10.0,
            ..SimulationParams::default()
        },
        ..RaceConfig::default()
    };
    let simulator = RaceSimulator::new(&track, &layout, &config);

    // throttle output saturates positive, steering stays neutral
    let topology = Topology::default();
    let mut bias1 = vec![0.0; topology.hidden_size];
    bias1[0] = 5.0;
    let mut weights2 = vec![0.0; topology.hidden_size * topology.output_size];
    weights2[0] = 5.0;
    let network = Perceptron::from_parts(
        topology,
        vec![0.0; topology.input_size * topology.hidden_size],
        bias1,
        weights2,
        vec![0.0; topology.output_size],
    )
    .unwrap();

    let mut previous = f64::NEG_INFINITY;
    let outcome = simulator
        .run_with(&network, |kart| {
            let progress = kart.route_progress(&track);
            assert!(progress > previous, "{progress} <= {previous}");
            previous = progress;
        })
        .unwrap();
    assert_eq!(outcome.end, RaceEnd::TimeUp);
    assert!(!outcome.disqualified);
}

#[test]
fn elites_survive_into_the_next_generation() {
    let track = two_checkpoint_track();
    let dir = tempfile::tempdir().unwrap();
    let config = small_config();
    let store = ModelStore::new(dir.path(), &*config.track, config.sensors.clone());
    let mut session = TrainingSession::<Perceptron>::new(&config, &track, &store).unwrap();

    session.evaluate();
    let champion = session.population().individuals()[0].clone();
    session.breed();
    assert_eq!(
        session.population().individuals()[0].network(),
        champion.network()
    );
    let report = session.evaluate();
    assert!(report.best >= champion.fitness());
}
