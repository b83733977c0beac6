use anyhow::Context;
use glam::Vec2;
use winit::keyboard::KeyCode;

use crate::{
    camera::Camera,
    config::ViewerConfig,
    input::InputState,
    math::transforms,
    point_cloud::{PointCloud, PointCloudError},
    scene_graph::{NodeId, PrimitiveStore, Scene, SplatShader},
    splat_sizing::splat_scales,
};

const FALLBACK_SPHERE_RADIUS: f32 = 0.5;
const FALLBACK_SPHERE_SEED: u64 = 0x5eed;

const SWATCH_POINTS: [f32; 9] = [
    -0.5, -0.5, 0.0, //
    0.5, -0.5, 0.0, //
    0.0, 0.5, 0.0,
];
const SWATCH_SHADES: [f32; 3] = [0.1, 0.5, 0.9];
const SWATCH_POINT_SIZE: f32 = 4.0;

/// A figure with two copies hanging off it; the arrow keys swing the
/// middle one, and its child follows.
pub struct DemoState {
    pub camera: Camera,
    pub start_time: std::time::Instant,
    pub scene: Scene,
    /// Global multiplier for every splat size, edited from the overlay.
    pub point_scale: f32,
    /// Accumulated arrow key rotation about x and y, in degrees.
    pub rotation: Vec2,
    config: ViewerConfig,
    root: NodeId,
    middle: NodeId,
    leaf: NodeId,
    swatch: Option<NodeId>,
}

impl DemoState {
    pub fn new(config: &ViewerConfig) -> anyhow::Result<Self> {
        let cloud = load_point_cloud(config)?;

        let mut scene = Scene::new();

        let root = scene.spawn_node(
            "s_obj1",
            build_primitive("s_obj1", &cloud, config)?,
            transforms::identity(),
        )?;
        let middle = scene.spawn_node(
            "s_obj2",
            build_primitive("s_obj2", &cloud, config)?,
            transforms::translate(0.0, -0.4, 0.4) * transforms::rotate_degrees(90.0, 0.0, 0.0),
        )?;
        let leaf = scene.spawn_node(
            "s_obj3",
            build_primitive("s_obj3", &cloud, config)?,
            transforms::translate(0.0, -0.8, 0.8),
        )?;

        scene.add_child(root, middle)?;
        scene.add_child(middle, leaf)?;

        let swatch = if config.shade_swatch {
            let primitive = PrimitiveStore::from_flat("shades", &SWATCH_POINTS)?
                .with_shades(SWATCH_SHADES.to_vec())?;
            Some(scene.spawn_node("shades", primitive, transforms::identity())?)
        } else {
            None
        };

        Ok(Self {
            camera: Camera::default(),
            start_time: std::time::Instant::now(),
            scene,
            point_scale: 1.0,
            rotation: Vec2::ZERO,
            config: config.clone(),
            root,
            middle,
            leaf,
            swatch,
        })
    }

    pub fn update(&mut self, input: &InputState) -> anyhow::Result<()> {
        let speed = self.config.rotation_speed;
        self.rotation.x += input.axis(KeyCode::ArrowUp, KeyCode::ArrowDown) * speed;
        self.rotation.y += input.axis(KeyCode::ArrowLeft, KeyCode::ArrowRight) * speed;

        let view_transform = transforms::rotate_degrees(self.rotation.x, self.rotation.y, 0.0);
        self.scene.transform_for_frame(self.middle, view_transform)?;

        let root_size = self.config.root_point_size;
        let child_size = self.config.child_point_size;

        self.scene.draw(self.root, SplatShader::Flat, root_size)?;
        self.scene.draw(self.middle, SplatShader::Phong, child_size)?;
        self.scene.draw(self.leaf, SplatShader::Flat, child_size)?;

        if let Some(swatch) = self.swatch {
            self.scene.draw(swatch, SplatShader::Shaded, SWATCH_POINT_SIZE)?;
        }

        Ok(())
    }
}

fn load_point_cloud(config: &ViewerConfig) -> anyhow::Result<PointCloud> {
    let cloud = match PointCloud::load(&config.point_file) {
        Ok(cloud) => cloud,
        Err(error @ PointCloudError::Io { .. }) => {
            log::warn!("{}, using a generated sphere instead", error);
            PointCloud::sphere(
                config.fallback_points,
                FALLBACK_SPHERE_RADIUS,
                FALLBACK_SPHERE_SEED,
            )
        }
        Err(error) => {
            return Err(error).with_context(|| {
                format!("Failed to load points from {}", config.point_file.display())
            })
        }
    };

    Ok(if config.normalize {
        cloud.normalized(1.0)
    } else {
        cloud
    })
}

fn build_primitive(
    name: &str,
    cloud: &PointCloud,
    config: &ViewerConfig,
) -> anyhow::Result<PrimitiveStore> {
    let mut primitive = PrimitiveStore::new(name, cloud.vertices.clone());

    if cloud.has_normals() {
        primitive = primitive.with_normals(cloud.normals.clone())?;
    }

    if let Some(scales) = splat_scales(
        &cloud.vertices,
        config.splat_sizing,
        config.min_splat_scale,
        config.max_splat_scale,
    ) {
        primitive = primitive.with_splat_scales(scales)?;
    }

    Ok(primitive)
}
