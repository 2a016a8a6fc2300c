use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::{PowerupKind, PowerupSlot, Track};

/// Time step the per-tick damping factors are expressed against.
pub const REFERENCE_STEP: f64 = 1.0 / 60.0;

/// Physical ratings of a kart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KartParams {
    /// Top speed in units per second.
    pub max_speed: f64,
    /// Forward acceleration at full throttle.
    pub acceleration: f64,
    /// Angular impulse per tick at full steering and top speed.
    pub turn_speed: f64,
    /// Velocity retained per reference step.
    pub friction: f64,
    /// Angular velocity retained per reference step.
    pub angular_damping: f64,
    /// Collision radius on the ground plane.
    pub radius: f64,
    /// Speed and acceleration multiplier while boosting.
    pub boost_multiplier: f64,
    /// Seconds a boost lasts.
    pub boost_duration: f64,
    /// Seconds between two power-up uses.
    pub powerup_cooldown: f64,
}

impl Default for KartParams {
    fn default() -> Self {
        Self {
            max_speed: 20.0,
            acceleration: 30.0,
            turn_speed: 2.5,
            friction: 0.9,
            angular_damping: 0.9,
            radius: 1.0,
            boost_multiplier: 1.5,
            boost_duration: 3.0,
            powerup_cooldown: 0.5,
        }
    }
}

/// What happened to lap progress during one [`Kart::update_progress`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressEvent {
    pub checkpoint_captured: bool,
    pub lap_completed: bool,
}

/// Kinematic state of one kart.
///
/// The kart faces `-Z` at zero yaw; positive yaw turns it to the left. Steering
/// authority scales with speed, and the velocity vector rotates together with
/// the heading so the kart does not slide sideways.
///
/// Lap bookkeeping follows the checkpoint order of the [`Track`]:
/// `next_checkpoint` always lies in `[0, checkpoint_count)` and the lap counter
/// increments exactly when it wraps back to 0.
#[derive(Debug, Clone)]
pub struct Kart {
    params: KartParams,
    position: DVec3,
    velocity: DVec3,
    acceleration: DVec3,
    yaw: f64,
    angular_velocity: f64,
    current_lap: u32,
    next_checkpoint: usize,
    progress: f64,
    powerup: PowerupSlot,
}

impl Kart {
    /// Creates a stationary kart at the origin, on lap 1.
    #[must_use]
    pub fn new(params: KartParams) -> Self {
        Self {
            params,
            position: DVec3::ZERO,
            velocity: DVec3::ZERO,
            acceleration: DVec3::ZERO,
            yaw: 0.0,
            angular_velocity: 0.0,
            current_lap: 1,
            next_checkpoint: 0,
            progress: 0.0,
            powerup: PowerupSlot::default(),
        }
    }

    /// Puts the kart on the first checkpoint, facing the second one, rolling
    /// forward at `initial_speed`.
    pub fn place_on_start(&mut self, track: &Track, initial_speed: f64) {
        let start = track.checkpoint(0).position();
        let target = track.checkpoint(1).position();
        let mut direction = target - start;
        direction.y = 0.0;
        let direction = direction.try_normalize().unwrap_or(DVec3::NEG_Z);

        self.position = start;
        self.yaw = yaw_facing(direction);
        self.velocity = direction * initial_speed;
        self.acceleration = DVec3::ZERO;
        self.angular_velocity = 0.0;
        self.current_lap = 1;
        self.next_checkpoint = 0;
        self.progress = 0.0;
        self.powerup = PowerupSlot::default();
    }

    #[must_use]
    pub fn params(&self) -> &KartParams {
        &self.params
    }

    #[must_use]
    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn set_position(&mut self, position: DVec3) {
        self.position = position;
    }

    #[must_use]
    pub fn velocity(&self) -> DVec3 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: DVec3) {
        self.velocity = velocity;
    }

    #[must_use]
    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }

    #[must_use]
    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    #[must_use]
    pub fn current_lap(&self) -> u32 {
        self.current_lap
    }

    #[must_use]
    pub fn next_checkpoint(&self) -> usize {
        self.next_checkpoint
    }

    /// Completed laps plus the completed fraction of the current lap, counted
    /// in checkpoints.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    #[must_use]
    pub fn powerup(&self) -> &PowerupSlot {
        &self.powerup
    }

    pub fn powerup_mut(&mut self) -> &mut PowerupSlot {
        &mut self.powerup
    }

    /// Unit vector the kart is facing.
    #[must_use]
    pub fn forward(&self) -> DVec3 {
        DQuat::from_rotation_y(self.yaw) * DVec3::NEG_Z
    }

    /// Unit vector pointing to the kart's right.
    #[must_use]
    pub fn right(&self) -> DVec3 {
        DQuat::from_rotation_y(self.yaw) * DVec3::X
    }

    /// Returns `true` when the kart moves against its heading.
    #[must_use]
    pub fn is_reversing(&self) -> bool {
        self.velocity.dot(self.forward()) < 0.0
    }

    /// Current top speed, including any active boost.
    #[must_use]
    pub fn max_speed(&self) -> f64 {
        self.params.max_speed * self.boost_factor()
    }

    /// Current full-throttle acceleration, including any active boost.
    #[must_use]
    pub fn acceleration_force(&self) -> f64 {
        self.params.acceleration * self.boost_factor()
    }

    fn boost_factor(&self) -> f64 {
        if self.powerup.is_boosting() {
            self.params.boost_multiplier
        } else {
            1.0
        }
    }

    /// Accumulates a forward acceleration and a steering impulse for the next
    /// physics step.
    ///
    /// Steering is scaled by the speed ratio, so a stationary kart cannot turn,
    /// and is mirrored while reversing.
    pub fn apply_force(&mut self, acceleration: f64, turning: f64) {
        let forward = self.forward();
        self.acceleration += forward * acceleration;

        let mut speed_ratio = self.speed() / self.max_speed();
        if self.velocity.dot(forward) < 0.0 {
            speed_ratio = -speed_ratio;
        }
        self.angular_velocity += turning * speed_ratio;
    }

    /// Uses the held power-up, if any.
    pub fn use_powerup(&mut self) -> Option<PowerupKind> {
        self.powerup
            .activate(self.params.boost_duration, self.params.powerup_cooldown)
    }

    /// Integrates one time step of `dt` seconds.
    pub fn update_physics(&mut self, dt: f64) {
        let steps = dt / REFERENCE_STEP;

        self.velocity += self.acceleration * dt;
        self.velocity *= self.params.friction.powf(steps);
        let max_speed = self.max_speed();
        if self.velocity.length() > max_speed {
            self.velocity = self.velocity.normalize() * max_speed;
        }

        let yaw_delta = self.angular_velocity * dt;
        self.yaw += yaw_delta;
        self.velocity = DQuat::from_rotation_y(yaw_delta) * self.velocity;
        self.position += self.velocity * dt;

        self.acceleration = DVec3::ZERO;
        self.angular_velocity *= self.params.angular_damping.powf(steps);
        self.powerup.tick(dt);
    }

    /// Captures the next checkpoint when inside its radius and refreshes
    /// [`Self::progress`].
    pub fn update_progress(&mut self, track: &Track) -> ProgressEvent {
        let count = track.checkpoints().len();
        let mut event = ProgressEvent::default();
        if track.checkpoint(self.next_checkpoint).captures(self.position) {
            self.next_checkpoint = (self.next_checkpoint + 1) % count;
            event.checkpoint_captured = true;
            if self.next_checkpoint == 0 {
                self.current_lap += 1;
                event.lap_completed = true;
            }
        }
        self.progress = lap_progress(self.current_lap, self.next_checkpoint, count);
        event
    }

    /// [`Self::progress`] refined by how far along the segment towards the
    /// next checkpoint the kart is.
    ///
    /// Unlike `progress`, this grows continuously while the kart closes in on
    /// its target.
    #[must_use]
    pub fn route_progress(&self, track: &Track) -> f64 {
        let count = track.checkpoints().len();
        let target = track.checkpoint(self.next_checkpoint);
        let previous = track.checkpoint(self.next_checkpoint + count - 1);
        let segment = previous.horizontal_distance(target.position());
        let covered = if segment > f64::EPSILON {
            (1.0 - target.horizontal_distance(self.position) / segment).clamp(0.0, 1.0)
        } else {
            1.0
        };
        #[expect(clippy::cast_precision_loss)]
        let count = count as f64;
        self.progress + covered / count
    }

    /// Moves the kart out of an obstacle and cancels velocity into it.
    pub fn push_out(&mut self, normal: DVec3, depth: f64) {
        self.position += normal * depth;
        let into = self.velocity.dot(normal);
        if into < 0.0 {
            self.velocity -= normal * into;
        }
    }
}

/// Yaw at which a kart faces the horizontal `direction`.
#[must_use]
pub fn yaw_facing(direction: DVec3) -> f64 {
    f64::atan2(-direction.x, -direction.z)
}

#[expect(clippy::cast_precision_loss)]
fn lap_progress(current_lap: u32, next_checkpoint: usize, count: usize) -> f64 {
    f64::from(current_lap - 1) + next_checkpoint as f64 / count as f64
}

#[cfg(test)]
mod tests {
    use crate::Checkpoint;

    use super::*;

    fn square_track() -> Track {
        Track::new(
            vec![
                Checkpoint::new(DVec3::new(0.0, 0.0, -40.0), 5.0),
                Checkpoint::new(DVec3::new(40.0, 0.0, 0.0), 5.0),
                Checkpoint::new(DVec3::new(0.0, 0.0, 40.0), 5.0),
                Checkpoint::new(DVec3::new(-40.0, 0.0, 0.0), 5.0),
            ],
            vec![],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_initial_state() {
        let kart = Kart::new(KartParams::default());
        assert_eq!(kart.velocity(), DVec3::ZERO);
        assert_eq!(kart.current_lap(), 1);
        assert_eq!(kart.next_checkpoint(), 0);
        assert!((kart.forward() - DVec3::NEG_Z).length() < 1e-12);
        assert!((kart.right() - DVec3::X).length() < 1e-12);
    }

    #[test]
    fn test_place_on_start_faces_second_checkpoint() {
        let track = square_track();
        let mut kart = Kart::new(KartParams::default());
        kart.place_on_start(&track, 0.1);

        let expected = (DVec3::new(40.0, 0.0, 0.0) - DVec3::new(0.0, 0.0, -40.0)).normalize();
        assert!((kart.forward() - expected).length() < 1e-9);
        assert!((kart.velocity() - expected * 0.1).length() < 1e-9);
    }

    #[test]
    fn test_positive_turn_goes_left() {
        let mut kart = Kart::new(KartParams::default());
        kart.set_velocity(DVec3::new(0.0, 0.0, -10.0));
        kart.apply_force(0.0, kart.params().turn_speed);
        kart.update_physics(REFERENCE_STEP);
        assert!(kart.yaw() > 0.0);
        assert!(kart.forward().x < 0.0, "facing -Z, left is -X");
        assert!(kart.velocity().x < 0.0, "velocity follows the heading");
    }

    #[test]
    fn test_reverses_steering_when_moving_backward() {
        let mut kart = Kart::new(KartParams::default());
        kart.set_velocity(DVec3::new(0.0, 0.0, 1.0));
        kart.apply_force(0.0, kart.params().turn_speed);
        kart.update_physics(REFERENCE_STEP);
        assert!(kart.yaw() < 0.0);
    }

    #[test]
    fn test_stationary_kart_cannot_turn() {
        let mut kart = Kart::new(KartParams::default());
        kart.apply_force(0.0, kart.params().turn_speed);
        kart.update_physics(REFERENCE_STEP);
        assert_eq!(kart.yaw(), 0.0);
    }

    #[test]
    fn test_speed_is_capped() {
        let mut kart = Kart::new(KartParams::default());
        for _ in 0..600 {
            kart.apply_force(1_000.0, 0.0);
            kart.update_physics(REFERENCE_STEP);
        }
        assert!(kart.speed() <= kart.params().max_speed + 1e-9);
    }

    #[test]
    fn test_boost_raises_top_speed() {
        let mut kart = Kart::new(KartParams::default());
        kart.powerup_mut().collect(PowerupKind::Boost);
        assert_eq!(kart.use_powerup(), Some(PowerupKind::Boost));
        assert!((kart.max_speed() - 30.0).abs() < 1e-9);
        assert!((kart.acceleration_force() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_update_progress_counts_checkpoints_and_laps() {
        let track = square_track();
        let mut kart = Kart::new(KartParams::default());

        let mut laps = 0;
        for lap in 0..2 {
            for (i, cp) in track.checkpoints().iter().enumerate() {
                kart.set_position(cp.position());
                let event = kart.update_progress(&track);
                assert!(event.checkpoint_captured);
                assert_eq!(kart.next_checkpoint(), (i + 1) % 4);
                if event.lap_completed {
                    laps += 1;
                }
                assert!(kart.next_checkpoint() < track.checkpoints().len());
            }
            assert_eq!(laps, lap + 1);
        }
        assert_eq!(kart.current_lap(), 3);
        assert!((kart.progress() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_progress_without_capture() {
        let track = square_track();
        let mut kart = Kart::new(KartParams::default());
        kart.set_position(track.checkpoint(0).position());
        kart.update_progress(&track);
        kart.set_position(track.checkpoint(1).position());
        kart.update_progress(&track);

        kart.set_position(DVec3::new(100.0, 0.0, 100.0));
        let event = kart.update_progress(&track);
        assert_eq!(event, ProgressEvent::default());
        assert!((kart.progress() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_route_progress_is_continuous_at_capture() {
        let track = square_track();
        let mut kart = Kart::new(KartParams::default());
        kart.set_position(track.checkpoint(0).position());
        let before = kart.route_progress(&track);
        kart.update_progress(&track);
        let after = kart.route_progress(&track);
        assert!((before - 0.25).abs() < 1e-12);
        assert!((after - 0.25).abs() < 1e-12);
    }
}
