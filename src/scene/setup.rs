//! Stage construction: lights, ground plane and the clear colour, built from
//! the viewer config before any asset is loaded.

use super::{Mesh, SceneGraph, Transform};
use crate::config::{LightingConfig, ShadowConfig, ViewerConfig};
use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemisphereLight {
    /// Linear RGB pre-multiplied by intensity.
    pub sky: [f32; 3],
    pub ground: [f32; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    /// Linear RGB pre-multiplied by intensity.
    pub radiance: [f32; 3],
    pub position: Vec3,
    pub target: Vec3,
    pub cast_shadow: bool,
    pub shadow: ShadowConfig,
}

impl DirectionalLight {
    /// Unit vector from the lit surface towards the light.
    pub fn direction_to_light(&self) -> Vec3 {
        (self.position - self.target)
            .try_normalize()
            .unwrap_or(Vec3::Y)
    }

    /// Orthographic view-projection of the shadow camera.
    pub fn shadow_view_proj(&self) -> Mat4 {
        let up = if self.direction_to_light().abs().dot(Vec3::Y) > 0.999 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_rh(self.position, self.target, up);
        let s = &self.shadow;
        let proj = Mat4::orthographic_rh(s.left, s.right, s.bottom, s.top, s.near, s.far);
        proj * view
    }
}

#[derive(Debug, Clone)]
pub struct Lighting {
    pub hemisphere: HemisphereLight,
    pub directional: DirectionalLight,
    pub environment_intensity: f32,
    pub exposure: f32,
}

impl Lighting {
    pub fn from_config(config: &LightingConfig) -> Self {
        let hemi = &config.hemisphere;
        let dir = &config.directional;
        Self {
            hemisphere: HemisphereLight {
                sky: scaled(hemi.sky_color.to_linear(), hemi.intensity),
                ground: scaled(hemi.ground_color.to_linear(), hemi.intensity),
            },
            directional: DirectionalLight {
                radiance: scaled(dir.color.to_linear(), dir.intensity),
                position: Vec3::from(dir.position),
                target: Vec3::ZERO,
                cast_shadow: dir.cast_shadow,
                shadow: dir.shadow.clone(),
            },
            environment_intensity: config.environment_intensity,
            exposure: config.exposure,
        }
    }
}

fn scaled(rgb: [f32; 3], intensity: f32) -> [f32; 3] {
    [rgb[0] * intensity, rgb[1] * intensity, rgb[2] * intensity]
}

/// Everything drawn besides the model.
pub struct Stage {
    pub lighting: Lighting,
    /// Ground plane and any other static geometry.
    pub props: SceneGraph,
    /// Linear RGBA used when no background image is available.
    pub clear_color: [f32; 4],
}

impl Stage {
    pub fn build(config: &ViewerConfig) -> Self {
        let mut props = SceneGraph::new("stage");
        let ground = &config.ground;
        if ground.enabled {
            let mut plane = Mesh::plane(ground.size);
            plane.base_color = ground.color.to_linear_rgba();
            plane.receive_shadow = ground.receive_shadow;
            let root = props.root();
            props.add_mesh_node(
                root,
                "ground",
                Transform {
                    translation: Vec3::new(0.0, ground.height, 0.0),
                    ..Transform::IDENTITY
                },
                plane,
            );
        }
        log::debug!(
            "Stage built: {} prop meshes, ground={}",
            props.mesh_count(),
            ground.enabled
        );
        Self {
            lighting: Lighting::from_config(&config.lighting),
            props,
            clear_color: config.background_color.to_linear_rgba(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stage_has_shadow_receiving_ground() {
        let stage = Stage::build(&ViewerConfig::default());
        assert_eq!(stage.props.mesh_count(), 1);
        let mut seen = 0;
        stage.props.visit_meshes(stage.props.root(), |_, mesh, world| {
            seen += 1;
            assert!(mesh.receive_shadow);
            assert!(!mesh.cast_shadow);
            let y = world.transform_point3(Vec3::ZERO).y;
            assert!((y + 1.0).abs() < 1e-6);
        });
        assert_eq!(seen, 1);
    }

    #[test]
    fn disabled_ground_leaves_no_props() {
        let mut config = ViewerConfig::default();
        config.ground.enabled = false;
        assert_eq!(Stage::build(&config).props.mesh_count(), 0);
    }

    #[test]
    fn hemisphere_colours_scale_with_intensity() {
        let mut config = ViewerConfig::default();
        config.lighting.hemisphere.intensity = 2.0;
        let lighting = Lighting::from_config(&config.lighting);
        assert!((lighting.hemisphere.sky[0] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn shadow_camera_sees_the_origin() {
        let lighting = Lighting::from_config(&ViewerConfig::default().lighting);
        let clip = lighting
            .directional
            .shadow_view_proj()
            .project_point3(Vec3::ZERO);
        assert!(clip.x.abs() <= 1.0 && clip.y.abs() <= 1.0);
        assert!((0.0..=1.0).contains(&clip.z));
    }
}
