//! 3D coordinates and axis-aligned bounding cuboids, in light-years

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in the galaxy, in light-years
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinates {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Coordinates) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}, {:.2}, {:.2}", self.x, self.y, self.z)
    }
}

/// Axis-aligned bounding cuboid over a set of points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cuboid {
    pub min: Coordinates,
    pub max: Coordinates,
}

impl Cuboid {
    /// Smallest cuboid enclosing every point; None for an empty set
    pub fn enclosing<I>(points: I) -> Option<Cuboid>
    where
        I: IntoIterator<Item = Coordinates>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut min = first;
        let mut max = first;

        for p in points {
            if p.x < min.x {
                min.x = p.x;
            }
            if p.y < min.y {
                min.y = p.y;
            }
            if p.z < min.z {
                min.z = p.z;
            }
            if p.x > max.x {
                max.x = p.x;
            }
            if p.y > max.y {
                max.y = p.y;
            }
            if p.z > max.z {
                max.z = p.z;
            }
        }

        Some(Cuboid { min, max })
    }

    /// Cuboid of a given edge-size box around a center point
    pub fn around(center: Coordinates, size: f64) -> Cuboid {
        let half = size / 2.0;
        Cuboid {
            min: Coordinates::new(center.x - half, center.y - half, center.z - half),
            max: Coordinates::new(center.x + half, center.y + half, center.z + half),
        }
    }

    /// Component-wise extent, max - min
    pub fn size(&self) -> Coordinates {
        Coordinates::new(
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        )
    }

    /// Midpoint of the cuboid. Distinct from the mean centroid of the
    /// enclosed points; clustering decisions use this midpoint.
    pub fn center(&self) -> Coordinates {
        Coordinates::new(
            self.min.x + (self.max.x - self.min.x) / 2.0,
            self.min.y + (self.max.y - self.min.y) / 2.0,
            self.min.z + (self.max.z - self.min.z) / 2.0,
        )
    }

    pub fn contains(&self, p: &Coordinates) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

impl fmt::Display for Cuboid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Center [{}], Size [{}], Min [{}], Max [{}]",
            self.center(),
            self.size(),
            self.min,
            self.max
        )
    }
}

/// Arithmetic mean of a set of points; None for an empty set.
/// A diagnostic statistic only, never used for cluster distance decisions.
pub fn mean_centroid<I>(points: I) -> Option<Coordinates>
where
    I: IntoIterator<Item = Coordinates>,
{
    let mut sum = Coordinates::new(0.0, 0.0, 0.0);
    let mut count = 0usize;

    for p in points {
        sum.x += p.x;
        sum.y += p.y;
        sum.z += p.z;
        count += 1;
    }

    if count == 0 {
        return None;
    }

    let n = count as f64;
    Some(Coordinates::new(sum.x / n, sum.y / n, sum.z / n))
}
