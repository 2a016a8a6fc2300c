use serde::{Deserialize, Serialize};

use crate::{Kart, Track};

/// Distance within which a kart picks up a pad's power-up.
pub const PICKUP_RADIUS: f64 = 2.0;
/// Seconds before a collected pad offers its power-up again.
pub const PAD_RESPAWN_TIME: f64 = 1.0;

/// Kinds of power-up a kart can hold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum PowerupKind {
    #[display("boost")]
    Boost,
    #[display("missile")]
    Missile,
    #[display("mine")]
    Mine,
}

impl PowerupKind {
    /// Sensor encoding of a held power-up; `0.0` is reserved for "none".
    #[must_use]
    pub const fn encoding(self) -> f64 {
        match self {
            Self::Mine => 1.0 / 3.0,
            Self::Missile => 2.0 / 3.0,
            Self::Boost => 1.0,
        }
    }
}

/// The power-up a kart is holding, its use cooldown and boost timer.
#[derive(Debug, Clone, Default)]
pub struct PowerupSlot {
    held: Option<PowerupKind>,
    cooldown: f64,
    boost_remaining: f64,
}

impl PowerupSlot {
    #[must_use]
    pub const fn held(&self) -> Option<PowerupKind> {
        self.held
    }

    #[must_use]
    pub fn is_boosting(&self) -> bool {
        self.boost_remaining > 0.0
    }

    /// Stores a collected power-up, replacing whatever was held.
    pub fn collect(&mut self, kind: PowerupKind) {
        self.held = Some(kind);
    }

    /// Consumes the held power-up if the cooldown allows it.
    ///
    /// A boost starts a timer of `boost_duration` seconds. Missiles and mines
    /// are handed back to the caller, which owns any projectile simulation.
    pub fn activate(&mut self, boost_duration: f64, cooldown: f64) -> Option<PowerupKind> {
        if self.cooldown > 0.0 {
            return None;
        }
        let kind = self.held.take()?;
        if kind == PowerupKind::Boost {
            self.boost_remaining = boost_duration;
        }
        self.cooldown = cooldown;
        Some(kind)
    }

    pub fn tick(&mut self, dt: f64) {
        self.cooldown = (self.cooldown - dt).max(0.0);
        self.boost_remaining = (self.boost_remaining - dt).max(0.0);
    }
}

/// Respawn state of every power-up pad on a track during one race.
#[derive(Debug, Clone)]
pub struct PowerupField {
    respawn_timers: Vec<f64>,
}

impl PowerupField {
    /// Creates the field with every pad available.
    #[must_use]
    pub fn new(track: &Track) -> Self {
        Self {
            respawn_timers: vec![0.0; track.powerup_pads().len()],
        }
    }

    pub fn update(&mut self, dt: f64) {
        for timer in &mut self.respawn_timers {
            *timer = (*timer - dt).max(0.0);
        }
    }

    /// Hands the kart the power-up of the first available pad in reach.
    pub fn collect(&mut self, track: &Track, kart: &mut Kart) -> Option<PowerupKind> {
        let (timer, pad) = self
            .respawn_timers
            .iter_mut()
            .zip(track.powerup_pads())
            .find(|(timer, pad)| {
                **timer <= 0.0 && pad.position.distance(kart.position()) < PICKUP_RADIUS
            })?;
        *timer = PAD_RESPAWN_TIME;
        kart.powerup_mut().collect(pad.kind);
        Some(pad.kind)
    }
}
