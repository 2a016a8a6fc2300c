use kartai_engine::{Kart, PowerupKind};

/// Outputs with a magnitude up to this value are treated as neutral.
pub const DEAD_ZONE: f64 = 0.1;
/// Output 2 above this value requests power-up use.
pub const POWERUP_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Throttle {
    Accelerate,
    Brake,
    #[default]
    Coast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Steering {
    Left,
    Right,
    #[default]
    Straight,
}

/// Discrete controls decoded from network outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Action {
    pub throttle: Throttle,
    pub steering: Steering,
    pub use_powerup: bool,
}

impl Action {
    /// Decodes `[throttle, steering, powerup?]` network outputs.
    ///
    /// ```
    /// use kartai_brain::action::{Action, Steering, Throttle};
    ///
    /// let action = Action::from_outputs(&[0.8, -0.05, 0.9]);
    /// assert_eq!(action.throttle, Throttle::Accelerate);
    /// assert_eq!(action.steering, Steering::Straight);
    /// assert!(action.use_powerup);
    /// ```
    #[must_use]
    pub fn from_outputs(outputs: &[f64]) -> Self {
        let output = |i: usize| outputs.get(i).copied().unwrap_or(0.0);
        let throttle = match output(0) {
            v if v > DEAD_ZONE => Throttle::Accelerate,
            v if v < -DEAD_ZONE => Throttle::Brake,
            _ => Throttle::Coast,
        };
        let steering = match output(1) {
            v if v > DEAD_ZONE => Steering::Left,
            v if v < -DEAD_ZONE => Steering::Right,
            _ => Steering::Straight,
        };
        Self {
            throttle,
            steering,
            use_powerup: output(2) > POWERUP_THRESHOLD,
        }
    }

    /// Feeds the action into the kart for the next physics step.
    ///
    /// Braking pushes backwards at half the throttle force. Returns the
    /// power-up consumed this tick, if any.
    pub fn apply(self, kart: &mut Kart) -> Option<PowerupKind> {
        let acceleration = match self.throttle {
            Throttle::Accelerate => kart.acceleration_force(),
            Throttle::Brake => -kart.acceleration_force() / 2.0,
            Throttle::Coast => 0.0,
        };
        let turn_speed = kart.params().turn_speed;
        let turning = match self.steering {
            Steering::Left => turn_speed,
            Steering::Right => -turn_speed,
            Steering::Straight => 0.0,
        };
        kart.apply_force(acceleration, turning);
        if self.use_powerup {
            kart.use_powerup()
        } else {
            None
        }
    }
}
