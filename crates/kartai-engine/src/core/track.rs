use std::{fs, path::Path};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::{Obstacle, PowerupKind, TrackError, engine::Kart};

/// Capture radius used when a fixture checkpoint does not specify one.
pub const DEFAULT_CHECKPOINT_RADIUS: f64 = 5.0;

/// A capture zone on the racing line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    position: DVec3,
    radius: f64,
}

impl Checkpoint {
    #[must_use]
    pub const fn new(position: DVec3, radius: f64) -> Self {
        Self { position, radius }
    }

    #[must_use]
    pub const fn position(&self) -> DVec3 {
        self.position
    }

    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns the distance between `point` and the checkpoint on the ground plane.
    #[must_use]
    pub fn horizontal_distance(&self, point: DVec3) -> f64 {
        let d = point - self.position;
        d.x.hypot(d.z)
    }

    /// Returns `true` if `point` lies within the capture radius.
    #[must_use]
    pub fn captures(&self, point: DVec3) -> bool {
        self.horizontal_distance(point) < self.radius
    }
}

/// A spot where karts pick up a power-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerupPad {
    pub position: DVec3,
    pub kind: PowerupKind,
}

/// The static geometry a race is run on.
///
/// A track only carries what the simulation needs: an ordered list of
/// checkpoints (at least two), the static obstacles and the power-up pads. It
/// is never mutated by a running race, so one instance can be shared by every
/// concurrent simulation.
#[derive(Debug, Clone)]
pub struct Track {
    checkpoints: Vec<Checkpoint>,
    obstacles: Vec<Obstacle>,
    powerup_pads: Vec<PowerupPad>,
}

impl Track {
    /// Creates a track after validating its contents.
    pub fn new(
        checkpoints: Vec<Checkpoint>,
        obstacles: Vec<Obstacle>,
        powerup_pads: Vec<PowerupPad>,
    ) -> Result<Self, TrackError> {
        if checkpoints.len() < 2 {
            return Err(TrackError::TooFewCheckpoints(checkpoints.len()));
        }
        if let Some(i) = checkpoints
            .iter()
            .position(|cp| !cp.position.is_finite() || !cp.radius.is_finite() || cp.radius <= 0.0)
        {
            return Err(TrackError::InvalidCheckpoint(i));
        }
        if let Some(i) = obstacles.iter().position(|obs| {
            !obs.center().is_finite()
                || !obs.yaw().is_finite()
                || !obs.half_extents().cmpgt(DVec3::ZERO).all()
        }) {
            return Err(TrackError::InvalidObstacle(i));
        }
        if let Some(i) = powerup_pads
            .iter()
            .position(|pad| !pad.position.is_finite())
        {
            return Err(TrackError::InvalidPowerupPad(i));
        }
        Ok(Self {
            checkpoints,
            obstacles,
            powerup_pads,
        })
    }

    /// Loads and validates a track fixture file.
    pub fn load<P>(path: P) -> Result<Self, TrackError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TrackError::Io {
            path: path.to_owned(),
            source,
        })?;
        let fixture: TrackFixture =
            serde_json::from_str(&text).map_err(|source| TrackError::Parse {
                path: path.to_owned(),
                source,
            })?;
        fixture.into_track()
    }

    #[must_use]
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    #[must_use]
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    #[must_use]
    pub fn powerup_pads(&self) -> &[PowerupPad] {
        &self.powerup_pads
    }

    /// Returns the checkpoint at `index`, wrapping around the lap.
    #[must_use]
    pub fn checkpoint(&self, index: usize) -> &Checkpoint {
        &self.checkpoints[index % self.checkpoints.len()]
    }

    /// Returns the distance to the nearest obstacle hit by a ray, if any lies
    /// within `max_distance`.
    #[must_use]
    pub fn cast_ray(&self, origin: DVec3, direction: DVec3, max_distance: f64) -> Option<f64> {
        self.obstacles
            .iter()
            .filter_map(|obs| obs.ray_distance(origin, direction, max_distance))
            .min_by(f64::total_cmp)
    }

    /// Separates the kart from every obstacle it overlaps.
    ///
    /// The kart is pushed out along the contact normal and the velocity
    /// component heading into the obstacle is removed; velocity already
    /// pointing away is left untouched. Returns `true` if any obstacle was hit.
    pub fn check_obstacle_collisions(&self, kart: &mut Kart) -> bool {
        let mut collided = false;
        for obstacle in &self.obstacles {
            let Some(contact) = obstacle.contact(kart.position(), kart.params().radius) else {
                continue;
            };
            collided = true;
            kart.push_out(contact.normal, contact.depth);
        }
        collided
    }
}

/// On-disk track description, shared with the live game's track loader.
///
/// ```json
/// {
///   "checkpoints": [{ "x": 0, "y": 0, "z": -40, "radius": 5 }],
///   "obstacles": [{ "x": -50, "y": 1, "z": 0, "width": 1, "height": 2, "depth": 100 }],
///   "powerups": [{ "x": 20, "y": 1, "z": 20, "kind": "boost" }]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackFixture {
    pub checkpoints: Vec<CheckpointFixture>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleFixture>,
    #[serde(default)]
    pub powerups: Vec<PowerupFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointFixture {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default = "default_checkpoint_radius")]
    pub radius: f64,
}

fn default_checkpoint_radius() -> f64 {
    DEFAULT_CHECKPOINT_RADIUS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleFixture {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    /// Yaw in radians.
    #[serde(default)]
    pub rotation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerupFixture {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub kind: PowerupKind,
}

impl TrackFixture {
    /// Converts the fixture into a validated [`Track`].
    pub fn into_track(self) -> Result<Track, TrackError> {
        let checkpoints = self
            .checkpoints
            .into_iter()
            .map(|cp| Checkpoint::new(DVec3::new(cp.x, cp.y, cp.z), cp.radius))
            .collect();
        let obstacles = self
            .obstacles
            .into_iter()
            .map(|obs| {
                Obstacle::new(
                    DVec3::new(obs.x, obs.y, obs.z),
                    DVec3::new(obs.width, obs.height, obs.depth),
                    obs.rotation,
                )
            })
            .collect();
        let powerup_pads = self
            .powerups
            .into_iter()
            .map(|pad| PowerupPad {
                position: DVec3::new(pad.x, pad.y, pad.z),
                kind: pad.kind,
            })
            .collect();
        Track::new(checkpoints, obstacles, powerup_pads)
    }
}
