use glam::{DQuat, DVec2, DVec3};

/// A static box obstacle, optionally rotated around the vertical axis.
///
/// The box is described by its centre, half extents and yaw (radians). All
/// geometry queries transform the query into the box's local frame, where the
/// box is axis-aligned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    center: DVec3,
    half_extents: DVec3,
    yaw: f64,
}

/// Result of a kart overlapping an obstacle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Horizontal unit vector pointing out of the obstacle, in world space.
    pub normal: DVec3,
    /// Penetration depth along `normal`.
    pub depth: f64,
}

impl Obstacle {
    /// Creates an obstacle from its centre, full size and yaw.
    #[must_use]
    pub fn new(center: DVec3, size: DVec3, yaw: f64) -> Self {
        Self {
            center,
            half_extents: size * 0.5,
            yaw,
        }
    }

    #[must_use]
    pub fn center(&self) -> DVec3 {
        self.center
    }

    #[must_use]
    pub fn half_extents(&self) -> DVec3 {
        self.half_extents
    }

    #[must_use]
    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    fn to_local(&self, v: DVec3) -> DVec3 {
        DQuat::from_rotation_y(-self.yaw) * v
    }

    fn to_world(&self, v: DVec3) -> DVec3 {
        DQuat::from_rotation_y(self.yaw) * v
    }

    /// Returns the distance along `direction` at which a ray starting at
    /// `origin` enters the box, if that happens within `max_distance`.
    ///
    /// `direction` must be a unit vector. A ray starting inside the box hits at
    /// distance 0.
    ///
    /// # Example
    ///
    /// ```
    /// use glam::DVec3;
    /// use kartai_engine::Obstacle;
    ///
    /// let wall = Obstacle::new(DVec3::new(0.0, 0.0, -6.0), DVec3::new(10.0, 2.0, 2.0), 0.0);
    /// let hit = wall.ray_distance(DVec3::ZERO, DVec3::NEG_Z, 10.0).unwrap();
    /// assert!((hit - 5.0).abs() < 1e-9);
    /// assert!(wall.ray_distance(DVec3::ZERO, DVec3::Z, 10.0).is_none());
    /// ```
    #[must_use]
    pub fn ray_distance(&self, origin: DVec3, direction: DVec3, max_distance: f64) -> Option<f64> {
        let origin = self.to_local(origin - self.center).to_array();
        let direction = self.to_local(direction).to_array();
        let half = self.half_extents.to_array();

        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;
        for axis in 0..3 {
            let (o, d, h) = (origin[axis], direction[axis], half[axis]);
            if d.abs() < f64::EPSILON {
                if o < -h || o > h {
                    return None;
                }
                continue;
            }
            let t1 = (-h - o) / d;
            let t2 = (h - o) / d;
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
        }

        if t_max < t_min.max(0.0) {
            return None;
        }
        let hit = t_min.max(0.0);
        (hit <= max_distance).then_some(hit)
    }

    /// Tests a vertical cylinder of the given radius centred at `position`
    /// against the box and returns the separating contact, if any.
    #[must_use]
    pub fn contact(&self, position: DVec3, radius: f64) -> Option<Contact> {
        let local = self.to_local(position - self.center);
        if local.y.abs() > self.half_extents.y + radius {
            return None;
        }

        let half = DVec2::new(self.half_extents.x, self.half_extents.z);
        let point = DVec2::new(local.x, local.z);
        let closest = point.clamp(-half, half);
        let offset = point - closest;
        let distance = offset.length();

        let (normal, depth) = if distance > f64::EPSILON {
            if distance >= radius {
                return None;
            }
            (offset / distance, radius - distance)
        } else {
            // centre inside the box: leave through the nearest face
            let to_x = half.x - point.x.abs();
            let to_z = half.y - point.y.abs();
            if to_x < to_z {
                (DVec2::new(point.x.signum(), 0.0), to_x + radius)
            } else {
                (DVec2::new(0.0, point.y.signum()), to_z + radius)
            }
        };

        Some(Contact {
            normal: self.to_world(DVec3::new(normal.x, 0.0, normal.y)),
            depth,
        })
    }
}
