use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;

use crate::math::bounds::AABB;

#[derive(Debug, Error)]
pub enum PointCloudError {
    #[error("failed to read point file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Points read from an `.obj`-style file. `normals` is either empty or has
/// one entry per vertex.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PointCloud {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

impl PointCloud {
    pub fn load(path: impl AsRef<Path>) -> Result<PointCloud, PointCloudError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| PointCloudError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let cloud = parse_vertices(BufReader::new(file)).map_err(|error| match error {
            PointCloudError::Io { source, .. } => PointCloudError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        log::info!(
            "Loaded {} points ({} normals) from {}",
            cloud.vertices.len(),
            cloud.normals.len(),
            path.display()
        );

        Ok(cloud)
    }

    /// Random points on a sphere of the given radius, with outward normals.
    pub fn sphere(count: usize, radius: f32, seed: u64) -> PointCloud {
        let mut rng = StdRng::seed_from_u64(seed);

        let normals: Vec<Vec3> = (0..count)
            .map(|_| loop {
                let candidate = Vec3::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                );
                let length_squared = candidate.length_squared();
                if length_squared > 1e-4 && length_squared <= 1.0 {
                    break candidate.normalize();
                }
            })
            .collect();

        let vertices = normals.iter().map(|normal| *normal * radius).collect();

        PointCloud { vertices, normals }
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty() && self.normals.len() == self.vertices.len()
    }

    /// Recenters the cloud on the origin and scales its largest extent to
    /// `2 * half_extent`.
    pub fn normalized(mut self, half_extent: f32) -> PointCloud {
        let Some(bounds) = AABB::from_points(&self.vertices) else {
            return self;
        };

        let center = bounds.center();
        let largest = bounds.size().max_element();
        let factor = if largest > f32::EPSILON {
            2.0 * half_extent / largest
        } else {
            1.0
        };

        for vertex in &mut self.vertices {
            *vertex = (*vertex - center) * factor;
        }

        self
    }
}

/// Reads `v x y z` records (and `vn x y z` normals). The first token of a
/// line picks the record kind; every other kind is ignored.
pub fn parse_vertices(reader: impl BufRead) -> Result<PointCloud, PointCloudError> {
    let mut cloud = PointCloud::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| PointCloudError::Io {
            path: PathBuf::new(),
            source,
        })?;
        let line_number = index + 1;

        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => cloud.vertices.push(parse_triple(tokens, line_number)?),
            Some("vn") => cloud.normals.push(parse_triple(tokens, line_number)?),
            _ => {}
        }
    }

    if !cloud.normals.is_empty() && cloud.normals.len() != cloud.vertices.len() {
        log::warn!(
            "Ignoring {} normals for {} vertices",
            cloud.normals.len(),
            cloud.vertices.len()
        );
        cloud.normals.clear();
    }

    Ok(cloud)
}

/// Extra components (vertex colours, `w`) are ignored.
fn parse_triple<'a>(
    tokens: impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<Vec3, PointCloudError> {
    let mut components = [0.0f32; 3];
    let mut tokens = tokens;

    for (axis, component) in components.iter_mut().enumerate() {
        let token = tokens.next().ok_or_else(|| PointCloudError::Parse {
            line,
            message: format!("expected 3 coordinates, found {}", axis),
        })?;

        *component = token.parse().map_err(|_| PointCloudError::Parse {
            line,
            message: format!("invalid coordinate {:?}", token),
        })?;
    }

    Ok(Vec3::from_array(components))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<PointCloud, PointCloudError> {
        parse_vertices(source.as_bytes())
    }

    #[test]
    fn reads_vertex_records() {
        let cloud = parse("# figure\nv 0.1 0.2 0.3\nv -1 2 -3.5\n").unwrap();

        assert_eq!(
            cloud.vertices,
            vec![Vec3::new(0.1, 0.2, 0.3), Vec3::new(-1.0, 2.0, -3.5)]
        );
        assert!(cloud.normals.is_empty());
    }

    #[test]
    fn ignores_other_record_kinds_and_blank_lines() {
        let source = "o figure\n\nvt 0.5 0.5\nv 1 1 1\nf 1 2 3\nusemtl red\n   \nv 2 2 2 0.5 0.5 0.5\n";

        let cloud = parse(source).unwrap();

        assert_eq!(cloud.vertices, vec![Vec3::ONE, Vec3::splat(2.0)]);
    }

    #[test]
    fn reads_normals_when_complete() {
        let cloud = parse("v 0 0 0\nvn 0 0 1\nv 1 0 0\nvn 1 0 0\n").unwrap();

        assert!(cloud.has_normals());
        assert_eq!(cloud.normals, vec![Vec3::Z, Vec3::X]);
    }

    #[test]
    fn drops_partial_normals() {
        let cloud = parse("v 0 0 0\nv 1 0 0\nvn 0 0 1\n").unwrap();

        assert!(!cloud.has_normals());
        assert_eq!(cloud.vertices.len(), 2);
    }

    #[test]
    fn rejects_malformed_coordinates() {
        let error = parse("v 0 0 0\nv 1 abc 0\n").unwrap_err();

        match error {
            PointCloudError::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("abc"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_short_vertices() {
        assert!(matches!(
            parse("v 1 2\n"),
            Err(PointCloudError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let error = PointCloud::load("does/not/exist.obj").unwrap_err();
        assert!(matches!(error, PointCloudError::Io { .. }));
        assert!(error.to_string().contains("does/not/exist.obj"));
    }

    #[test]
    fn sphere_points_lie_on_sphere() {
        let cloud = PointCloud::sphere(64, 0.5, 7);

        assert_eq!(cloud.vertices.len(), 64);
        assert!(cloud.has_normals());
        assert!(cloud
            .vertices
            .iter()
            .all(|vertex| (vertex.length() - 0.5).abs() < 1e-5));
    }

    #[test]
    fn normalized_fits_half_extent() {
        let cloud = PointCloud {
            vertices: vec![Vec3::new(10.0, 0.0, 0.0), Vec3::new(14.0, 2.0, 1.0)],
            normals: Vec::new(),
        }
        .normalized(1.0);

        assert_eq!(cloud.vertices[0], Vec3::new(-1.0, -0.5, -0.25));
        assert_eq!(cloud.vertices[1], Vec3::new(1.0, 0.5, 0.25));
    }
}
