//! Per-point splat scales derived from point density: points in sparse
//! regions get bigger splats so the surface has no holes.

use clap::ValueEnum;
use glam::Vec3;
use rayon::prelude::*;

/// Keeps the log of the closest pair finite.
const LOG_OFFSET: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SplatSizing {
    /// Every splat has the same size.
    Uniform,
    /// Scales grow linearly with nearest-neighbour distance.
    Linear,
    /// Scales grow with the log of the nearest-neighbour distance.
    Log,
}

/// Distance from every point to its nearest other point. A lone point gets 0.
pub fn nearest_neighbor_distances(points: &[Vec3]) -> Vec<f32> {
    points
        .par_iter()
        .enumerate()
        .map(|(i, point)| {
            points
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, other)| point.distance(*other))
                .reduce(f32::min)
                .unwrap_or(0.0)
        })
        .collect()
}

/// Maps `distances` linearly onto `[new_min, new_max]`.
pub fn scale_linear(distances: &[f32], new_min: f32, new_max: f32) -> Vec<f32> {
    let Some((min, max)) = min_max(distances) else {
        return Vec::new();
    };

    if max - min <= f32::EPSILON {
        return vec![new_min; distances.len()];
    }

    distances
        .iter()
        .map(|d| (new_max - new_min) * (d - min) / (max - min) + new_min)
        .collect()
}

/// Maps `distances` onto `[new_min, new_max]` in log space, so a few very
/// isolated points do not flatten the rest of the range.
pub fn scale_log(distances: &[f32], new_min: f32, new_max: f32) -> Vec<f32> {
    let Some((min, _)) = min_max(distances) else {
        return Vec::new();
    };

    let logs: Vec<f32> = distances
        .iter()
        .map(|d| (d - min + LOG_OFFSET).ln())
        .collect();

    let Some((log_distance_min, log_distance_max)) = min_max(&logs) else {
        return Vec::new();
    };

    if log_distance_max - log_distance_min <= f32::EPSILON {
        return vec![new_min; distances.len()];
    }

    let (log_min, log_max) = (new_min.ln(), new_max.ln());

    logs.iter()
        .map(|l| {
            ((log_max - log_min) * (l - log_distance_min) / (log_distance_max - log_distance_min)
                + log_min)
                .exp()
        })
        .collect()
}

/// Splat scales for `points`, or `None` when every splat keeps scale 1.
pub fn splat_scales(
    points: &[Vec3],
    sizing: SplatSizing,
    new_min: f32,
    new_max: f32,
) -> Option<Vec<f32>> {
    match sizing {
        SplatSizing::Uniform => None,
        SplatSizing::Linear => Some(scale_linear(
            &nearest_neighbor_distances(points),
            new_min,
            new_max,
        )),
        SplatSizing::Log => Some(scale_log(
            &nearest_neighbor_distances(points),
            new_min,
            new_max,
        )),
    }
}

fn min_max(values: &[f32]) -> Option<(f32, f32)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(min, max), v| (min.min(*v), max.max(*v))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn demo_points() -> Vec<Vec3> {
        vec![
            Vec3::new(-0.5, -0.5, 0.0),
            Vec3::new(0.5, -0.5, 0.0),
            Vec3::new(0.0, 0.5, 0.0),
            Vec3::new(0.1, 0.2, 0.3),
            Vec3::new(0.4, 0.5, 0.6),
            Vec3::new(-0.2, -0.3, -0.4),
        ]
    }

    #[test]
    fn nearest_neighbor_ignores_self() {
        let points = [Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)];

        assert_eq!(nearest_neighbor_distances(&points), vec![1.0, 1.0, 2.0]);
    }

    #[test]
    fn duplicate_points_are_zero_apart() {
        let points = [Vec3::ONE, Vec3::ONE, Vec3::ZERO];

        assert_eq!(nearest_neighbor_distances(&points)[0], 0.0);
    }

    #[test]
    fn lone_point_has_zero_distance() {
        assert_eq!(nearest_neighbor_distances(&[Vec3::X]), vec![0.0]);
        assert!(nearest_neighbor_distances(&[]).is_empty());
    }

    #[test]
    fn linear_scaling_hits_range_ends() {
        let scales = scale_linear(&[1.0, 2.0, 3.0], 0.5, 2.0);

        assert_eq!(scales, vec![0.5, 1.25, 2.0]);
    }

    #[test]
    fn log_scaling_hits_range_ends() {
        let distances = nearest_neighbor_distances(&demo_points());
        let scales = scale_log(&distances, 0.5, 2.0);

        let min = scales.iter().cloned().fold(f32::MAX, f32::min);
        let max = scales.iter().cloned().fold(f32::MIN, f32::max);
        assert!((min - 0.5).abs() < EPSILON);
        assert!((max - 2.0).abs() < EPSILON);
    }

    #[test]
    fn log_scaling_preserves_order() {
        let scales = scale_log(&[0.1, 0.2, 0.4, 0.8], 0.5, 2.0);

        assert!(scales.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn uniform_distances_map_to_minimum() {
        assert_eq!(scale_linear(&[0.3, 0.3], 0.5, 2.0), vec![0.5, 0.5]);
        assert_eq!(scale_log(&[0.3, 0.3], 0.5, 2.0), vec![0.5, 0.5]);
    }

    #[test]
    fn uniform_sizing_has_no_scales() {
        assert_eq!(splat_scales(&demo_points(), SplatSizing::Uniform, 0.5, 2.0), None);
        assert_eq!(
            splat_scales(&demo_points(), SplatSizing::Linear, 0.5, 2.0).map(|s| s.len()),
            Some(6)
        );
    }
}
