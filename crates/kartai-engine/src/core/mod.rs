//! Static track data and geometry queries.
//!
//! - [`Track`] - the narrow fixture the simulator races on
//! - [`Checkpoint`] - ordered capture zones defining laps
//! - [`Obstacle`] - oriented boxes for sensor rays and collisions
//! - [`TrackFixture`] - on-disk JSON representation shared with the live game

pub use self::{obstacle::*, track::*};

mod obstacle;
mod track;
