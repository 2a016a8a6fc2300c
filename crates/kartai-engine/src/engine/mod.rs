//! Per-race mutable state: the kart integrator and power-up bookkeeping.
//!
//! - [`Kart`] - position, heading, velocity and lap progress of one kart
//! - [`KartParams`] - rated speed, acceleration, turn rate and friction
//! - [`PowerupSlot`] - the power-up a kart holds and any active boost
//! - [`PowerupField`] - respawn timers of the track's power-up pads
//!
//! # Tick order
//!
//! The live game and the headless trainer advance a kart identically:
//!
//! 1. [`Kart::apply_force`] with the controller's throttle and steering
//! 2. [`Kart::update_physics`] to integrate one time step
//! 3. [`Kart::update_progress`] to capture checkpoints and count laps
//! 4. [`Track::check_obstacle_collisions`](crate::Track::check_obstacle_collisions)

pub use self::{kart::*, powerup::*};

mod kart;
mod powerup;
