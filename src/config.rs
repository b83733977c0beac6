use std::path::PathBuf;

use clap::Parser;

use crate::splat_sizing::SplatSizing;

/// Point-cloud scene viewer.
#[derive(Debug, Clone, Parser)]
#[command(version)]
pub struct ViewerConfig {
    /// `.obj` file whose `v` records are drawn as points
    #[arg(default_value = "assets/points/figure.obj")]
    pub point_file: PathBuf,

    /// Recenter the points and fit them into the unit cube
    #[arg(long)]
    pub normalize: bool,

    /// Number of points in the fallback sphere used when the point file is missing
    #[arg(long, default_value_t = 2000)]
    pub fallback_points: usize,

    #[arg(long, default_value_t = 800)]
    pub width: u32,

    #[arg(long, default_value_t = 800)]
    pub height: u32,

    #[arg(long, default_value = "pointgraph")]
    pub title: String,

    /// How per-point splat sizes are derived from point density
    #[arg(long, value_enum, default_value_t = SplatSizing::Log)]
    pub splat_sizing: SplatSizing,

    /// Smallest per-point splat scale; must be positive
    #[arg(long, default_value_t = 0.5, value_parser = parse_positive_scale)]
    pub min_splat_scale: f32,

    /// Largest per-point splat scale; must be positive
    #[arg(long, default_value_t = 2.0, value_parser = parse_positive_scale)]
    pub max_splat_scale: f32,

    /// Splat size of the root node, in pixels
    #[arg(long, default_value_t = 5.0)]
    pub root_point_size: f32,

    /// Splat size of the child nodes, in pixels
    #[arg(long, default_value_t = 3.0)]
    pub child_point_size: f32,

    /// Also draw a three point swatch coloured by per-point grey shades
    #[arg(long)]
    pub shade_swatch: bool,

    /// Arrow key rotation speed, in degrees per frame
    #[arg(long, default_value_t = 0.7)]
    pub rotation_speed: f32,
}

/// Log sizing takes the logarithm of the scale bounds.
fn parse_positive_scale(value: &str) -> Result<f32, String> {
    let scale: f32 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;

    if scale.is_finite() && scale > 0.0 {
        Ok(scale)
    } else {
        Err(format!("splat scale must be positive, got {scale}"))
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::parse_from(["pointgraph"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        ViewerConfig::command().debug_assert();
    }

    #[test]
    fn defaults_match_demo_values() {
        let config = ViewerConfig::default();

        assert_eq!(config.point_file, PathBuf::from("assets/points/figure.obj"));
        assert_eq!((config.width, config.height), (800, 800));
        assert_eq!(config.splat_sizing, SplatSizing::Log);
        assert_eq!(config.root_point_size, 5.0);
        assert_eq!(config.child_point_size, 3.0);
        assert!(!config.normalize);
        assert!(!config.shade_swatch);
    }

    #[test]
    fn parses_overrides() {
        let config = ViewerConfig::parse_from([
            "pointgraph",
            "gopher.obj",
            "--normalize",
            "--splat-sizing",
            "uniform",
            "--rotation-speed",
            "1.5",
        ]);

        assert_eq!(config.point_file, PathBuf::from("gopher.obj"));
        assert!(config.normalize);
        assert_eq!(config.splat_sizing, SplatSizing::Uniform);
        assert_eq!(config.rotation_speed, 1.5);
    }

    #[test]
    fn rejects_non_positive_splat_scales() {
        for bad in ["0", "-1.5", "nan", "wide"] {
            let result = ViewerConfig::try_parse_from(["pointgraph", "--min-splat-scale", bad]);
            assert!(result.is_err(), "accepted --min-splat-scale {bad}");
        }

        let result = ViewerConfig::try_parse_from(["pointgraph", "--max-splat-scale", "0"]);
        assert!(result.is_err());

        let config =
            ViewerConfig::try_parse_from(["pointgraph", "--min-splat-scale", "0.25"]).unwrap();
        assert_eq!(config.min_splat_scale, 0.25);
    }
}
