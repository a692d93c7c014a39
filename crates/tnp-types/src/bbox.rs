use serde::{Deserialize, Serialize};

use crate::math::{self, Vec3};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Box around a set of points. `None` for an empty set.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Vec3>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bbox = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bbox.include(*p);
        }
        Some(bbox)
    }

    pub fn include(&mut self, p: Vec3) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let mut out = *self;
        out.include(other.min);
        out.include(other.max);
        out
    }

    /// Edge lengths along x, y, z.
    pub fn extent(&self) -> Vec3 {
        math::sub(self.max, self.min)
    }

    pub fn diagonal(&self) -> f64 {
        math::norm(self.extent())
    }

    pub fn center(&self) -> Vec3 {
        math::scale(math::add(self.min, self.max), 0.5)
    }
}
