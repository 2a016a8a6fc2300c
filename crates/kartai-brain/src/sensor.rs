//! Sensor inputs fed to a driving network.
//!
//! A [`SensorLayout`] is an ordered list of [`SensorKind`]s. Its order is the
//! order of the network's inputs, so a trained model is only usable with the
//! layout it was trained with; model artifacts store it next to the weights.
//!
//! | kind            | value                                                       |
//! |-----------------|-------------------------------------------------------------|
//! | `Forward`       | obstacle distance straight ahead / range, `1.0` if clear    |
//! | `Left`, `Right` | obstacle distance to either side / range                    |
//! | `ForwardLeft`, `ForwardRight` | obstacle distance along the diagonals / range |
//! | `Checkpoint`    | distance to the next checkpoint / scale                     |
//! | `Heading`       | cosine between heading and the next checkpoint direction    |
//! | `NextHeading`   | cosine between heading and the checkpoint after next        |
//! | `Velocity`      | speed / top speed                                           |
//! | `LapProgress`   | completed laps plus fraction of the current lap             |
//! | `Powerup`       | held power-up: none 0, mine 1/3, missile 2/3, boost 1       |

use glam::DVec3;
use kartai_engine::{Kart, PowerupKind, Track};
use serde::{Deserialize, Serialize};

/// One network input.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Forward,
    Left,
    Right,
    ForwardLeft,
    ForwardRight,
    Checkpoint,
    Heading,
    NextHeading,
    Velocity,
    LapProgress,
    Powerup,
}

/// Ranges and scales used to normalize sensor readings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorParams {
    pub forward_range: f64,
    pub side_range: f64,
    pub diagonal_range: f64,
    pub checkpoint_scale: f64,
    /// Height above the kart position rays are cast from.
    pub sensor_height: f64,
}

impl Default for SensorParams {
    fn default() -> Self {
        Self {
            forward_range: 10.0,
            side_range: 5.0,
            diagonal_range: 7.5,
            checkpoint_scale: 50.0,
            sensor_height: 0.5,
        }
    }
}

/// Ordered list of sensors making up a network's input vector.
///
/// # Example
///
/// ```
/// use kartai_brain::sensor::{SensorKind, SensorLayout};
///
/// let layout = SensorLayout::default();
/// assert_eq!(layout.len(), 10);
/// assert_eq!(layout.kinds()[0], SensorKind::Forward);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorLayout {
    kinds: Vec<SensorKind>,
}

impl Default for SensorLayout {
    fn default() -> Self {
        Self::new(vec![
            SensorKind::Forward,
            SensorKind::Left,
            SensorKind::Right,
            SensorKind::ForwardLeft,
            SensorKind::ForwardRight,
            SensorKind::Checkpoint,
            SensorKind::Heading,
            SensorKind::Velocity,
            SensorKind::LapProgress,
            SensorKind::Powerup,
        ])
    }
}

impl SensorLayout {
    #[must_use]
    pub fn new(kinds: Vec<SensorKind>) -> Self {
        Self { kinds }
    }

    #[must_use]
    pub fn kinds(&self) -> &[SensorKind] {
        &self.kinds
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Reads every sensor, in layout order.
    #[must_use]
    pub fn read(&self, params: &SensorParams, kart: &Kart, track: &Track) -> Vec<f64> {
        let probe = Probe {
            params,
            kart,
            track,
        };
        self.kinds.iter().map(|kind| probe.read(*kind)).collect()
    }
}

struct Probe<'a> {
    params: &'a SensorParams,
    kart: &'a Kart,
    track: &'a Track,
}

impl Probe<'_> {
    fn read(&self, kind: SensorKind) -> f64 {
        let forward = self.kart.forward();
        let right = self.kart.right();
        let p = self.params;
        match kind {
            SensorKind::Forward => self.ray(forward, p.forward_range),
            SensorKind::Left => self.ray(-right, p.side_range),
            SensorKind::Right => self.ray(right, p.side_range),
            SensorKind::ForwardLeft => self.ray((forward - right).normalize(), p.diagonal_range),
            SensorKind::ForwardRight => self.ray((forward + right).normalize(), p.diagonal_range),
            SensorKind::Checkpoint => {
                let target = self.track.checkpoint(self.kart.next_checkpoint());
                target.position().distance(self.kart.position()) / p.checkpoint_scale
            }
            SensorKind::Heading => self.heading_to(self.kart.next_checkpoint()),
            SensorKind::NextHeading => self.heading_to(self.kart.next_checkpoint() + 1),
            SensorKind::Velocity => self.kart.speed() / self.kart.params().max_speed,
            SensorKind::LapProgress => self.kart.progress(),
            SensorKind::Powerup => self
                .kart
                .powerup()
                .held()
                .map_or(0.0, PowerupKind::encoding),
        }
    }

    fn ray(&self, direction: DVec3, range: f64) -> f64 {
        let origin = self.kart.position() + DVec3::Y * self.params.sensor_height;
        self.track
            .cast_ray(origin, direction, range)
            .map_or(1.0, |hit| hit.min(range) / range)
    }

    /// Cosine between the kart heading and the horizontal direction to a checkpoint.
    fn heading_to(&self, index: usize) -> f64 {
        let mut to_target = self.track.checkpoint(index).position() - self.kart.position();
        to_target.y = 0.0;
        to_target
            .try_normalize()
            .map_or(0.0, |dir| self.kart.forward().dot(dir))
    }
}
