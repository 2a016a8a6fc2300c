use kartai_engine::{Kart, PowerupKind, ProgressEvent, Track};

use crate::{
    action::Action,
    fitness::{FitnessParams, FitnessTracker},
    network::{Brain, Topology},
    sensor::{SensorLayout, SensorParams},
};

/// Minimum number of network outputs: throttle and steering.
pub const MIN_OUTPUTS: usize = 2;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum DriverError {
    #[display("sensor layout has {sensors} inputs but network topology {topology} expects {}", topology.input_size)]
    InputMismatch { sensors: usize, topology: Topology },
    #[display("network topology {_0} has fewer than two outputs")]
    TooFewOutputs(#[error(not(source))] Topology),
}

/// A network at the wheel of one kart.
///
/// Each tick the driver reads its sensors, runs the network, feeds the
/// decoded [`Action`] into the kart and, once the kart has moved, scores the
/// tick into its [`FitnessTracker`].
#[derive(Debug)]
pub struct AiDriver<'a, B> {
    brain: &'a B,
    layout: &'a SensorLayout,
    sensor_params: &'a SensorParams,
    fitness: FitnessTracker,
}

impl<'a, B> AiDriver<'a, B>
where
    B: Brain,
{
    /// Binds a network to a sensor layout, checking the input contract.
    pub fn new(
        brain: &'a B,
        layout: &'a SensorLayout,
        sensor_params: &'a SensorParams,
        fitness_params: FitnessParams,
    ) -> Result<Self, DriverError> {
        let topology = brain.topology();
        if layout.len() != topology.input_size {
            return Err(DriverError::InputMismatch {
                sensors: layout.len(),
                topology,
            });
        }
        if topology.output_size < MIN_OUTPUTS {
            return Err(DriverError::TooFewOutputs(topology));
        }
        Ok(Self {
            brain,
            layout,
            sensor_params,
            fitness: FitnessTracker::new(fitness_params),
        })
    }

    #[must_use]
    pub fn fitness(&self) -> &FitnessTracker {
        &self.fitness
    }

    pub fn fitness_mut(&mut self) -> &mut FitnessTracker {
        &mut self.fitness
    }

    /// Decides the controls for the current state without touching the kart.
    #[must_use]
    pub fn decide(&self, kart: &Kart, track: &Track) -> Action {
        let inputs = self.layout.read(self.sensor_params, kart, track);
        Action::from_outputs(&self.brain.forward(&inputs))
    }

    /// Decides and applies the controls for this tick. Returns the power-up
    /// consumed, if any.
    pub fn drive(&self, kart: &mut Kart, track: &Track) -> Option<PowerupKind> {
        self.decide(kart, track).apply(kart)
    }

    /// Scores the tick that just ran.
    pub fn score(&mut self, kart: &Kart, event: ProgressEvent, dt: f64) -> f64 {
        self.fitness.record_tick(kart, event, dt)
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;
    use kartai_engine::{Checkpoint, KartParams};

    use crate::network::Perceptron;

    use super::*;

    fn track() -> Track {
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

    /// Network whose throttle output saturates positive for any input.
    fn full_throttle(topology: Topology) -> Perceptron {
        let hidden = topology.hidden_size;
        let outputs = topology.output_size;
        let mut bias1 = vec![0.0; hidden];
        bias1[0] = 5.0;
        let mut weights2 = vec![0.0; hidden * outputs];
        weights2[0] = 5.0;
        Perceptron::from_parts(
            topology,
            vec![0.0; topology.input_size * hidden],
            bias1,
            weights2,
            vec![0.0; outputs],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_mismatched_layout() {
        let layout = SensorLayout::default();
        let params = SensorParams::default();
        let net = Perceptron::zeroed(Topology::new(8, 4, 3));
        assert!(matches!(
            AiDriver::new(&net, &layout, &params, FitnessParams::default()),
            Err(DriverError::InputMismatch { sensors: 10, .. })
        ));

        let net = Perceptron::zeroed(Topology::new(10, 4, 1));
        assert!(matches!(
            AiDriver::new(&net, &layout, &params, FitnessParams::default()),
            Err(DriverError::TooFewOutputs(_))
        ));
    }

    #[test]
    fn test_drive_accelerates() {
        let track = track();
        let layout = SensorLayout::default();
        let params = SensorParams::default();
        let net = full_throttle(Topology::default());
        let mut driver = AiDriver::new(&net, &layout, &params, FitnessParams::default()).unwrap();

        let mut kart = Kart::new(KartParams::default());
        kart.place_on_start(&track, 0.1);
        assert_eq!(
            driver.decide(&kart, &track).throttle,
            crate::action::Throttle::Accelerate
        );

        let start_speed = kart.speed();
        driver.drive(&mut kart, &track);
        kart.update_physics(1.0 / 60.0);
        let event = kart.update_progress(&track);
        assert!(kart.speed() > start_speed);

        driver.score(&kart, event, 1.0 / 60.0);
        assert!(driver.fitness().total() > 0.0);
    }
}
