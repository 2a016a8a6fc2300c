//! Neural drivers for karts.
//!
//! This crate turns a network into a kart controller and back into a file:
//!
//! - [`network`] - the [`Brain`](network::Brain) trait and the
//!   [`Perceptron`](network::Perceptron) implementation
//! - [`sensor`] - world state to network inputs
//! - [`action`] - network outputs to throttle, steering and power-up use
//! - [`fitness`] - shaped score accumulated while driving
//! - [`driver`] - [`AiDriver`](driver::AiDriver), tying the above together
//! - [`model`] - JSON model artifacts
//! - [`cache`] - per-track cache of loaded best models
//!
//! # Example
//!
//! ```
//! use glam::DVec3;
//! use kartai_brain::{
//!     driver::AiDriver,
//!     fitness::FitnessParams,
//!     network::{Brain, Perceptron, Topology},
//!     sensor::{SensorLayout, SensorParams},
//! };
//! use kartai_engine::{Checkpoint, Kart, KartParams, Track};
//!
//! let track = Track::new(
//!     vec![
//!         Checkpoint::new(DVec3::ZERO, 2.0),
//!         Checkpoint::new(DVec3::new(0.0, 0.0, -10.0), 2.0),
//!     ],
//!     vec![],
//!     vec![],
//! )?;
//! let net = Perceptron::random(Topology::default(), &mut rand::rng());
//! let layout = SensorLayout::default();
//! let sensor_params = SensorParams::default();
//! let mut driver = AiDriver::new(&net, &layout, &sensor_params, FitnessParams::default())?;
//!
//! let mut kart = Kart::new(KartParams::default());
//! kart.place_on_start(&track, 0.1);
//! driver.drive(&mut kart, &track);
//! kart.update_physics(1.0 / 60.0);
//! let event = kart.update_progress(&track);
//! driver.score(&kart, event, 1.0 / 60.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod action;
pub mod cache;
pub mod driver;
pub mod fitness;
pub mod model;
pub mod network;
pub mod sensor;
