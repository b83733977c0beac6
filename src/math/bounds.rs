use glam::Vec3;

pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn new(point1: Vec3, point2: Vec3) -> AABB {
        let min = point1.min(point2);
        let max = point1.max(point2);
        AABB { min, max }
    }

    /// Smallest box containing every point, or `None` for an empty slice.
    pub fn from_points(points: &[Vec3]) -> Option<AABB> {
        let (first, rest) = points.split_first()?;

        let (min, max) = rest
            .iter()
            .fold((*first, *first), |(min, max), point| {
                (min.min(*point), max.max(*point))
            });

        Some(AABB { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_encloses_everything() {
        let points = [
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(-3.0, 4.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
        ];

        let bounds = AABB::from_points(&points).unwrap();

        assert_eq!(bounds.min, Vec3::new(-3.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 4.0, 2.0));
        assert!(points
            .iter()
            .all(|p| p.cmpge(bounds.min).all() && p.cmple(bounds.max).all()));
        assert_eq!(bounds.center(), Vec3::new(-1.0, 1.0, 1.0));
    }

    #[test]
    fn empty_slice_has_no_bounds() {
        assert!(AABB::from_points(&[]).is_none());
    }
}
