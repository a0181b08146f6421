use crate::config::{AssetPaths, ModelPlacement, PresentationConfig};
use crate::scene::{Aabb, Mesh, NodeId, NodeKind, SceneGraph, Transform};
use glam::{Quat, Vec3};
use std::path::Path;
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to load environment map {path}: {source}")]
    Environment {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to load model {path}: {source}")]
    Model {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("unsupported model format '{extension}' for {path}; expected .gltf or .glb")]
    UnsupportedFormat { path: String, extension: String },
    #[error("model {path} contains no triangle geometry")]
    EmptyModel { path: String },
    #[error("failed to load image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// 8-bit sRGB RGBA pixels, row major, top row first.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Linear RGBA f32 texels of an equirectangular light probe.
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<f32>,
}

/// The building model: its own graph, rooted at the placement transform.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub name: String,
    pub graph: SceneGraph,
    pub root: NodeId,
    /// World-space bounds after placement.
    pub bounds: Aabb,
}

#[derive(Debug)]
pub struct LoadedScene {
    pub environment: EnvironmentMap,
    pub model: LoadedModel,
}

/// Optional images; any that failed to load are `None`.
#[derive(Debug, Default)]
pub struct Decorations {
    pub background: Option<DecodedImage>,
    pub logo: Option<DecodedImage>,
    pub tooltip_image: Option<DecodedImage>,
}

/// Environment first, then the model. The model is not read unless the
/// environment loaded.
pub fn load_scene(
    paths: &AssetPaths,
    placement: &ModelPlacement,
) -> Result<LoadedScene, AssetError> {
    let environment = load_environment(&paths.environment)?;
    let model = load_model(&paths.model, placement)?;
    Ok(LoadedScene { environment, model })
}

pub fn load_environment(path: &Path) -> Result<EnvironmentMap, AssetError> {
    let start = Instant::now();
    let image = image::open(path).map_err(|source| AssetError::Environment {
        path: path.display().to_string(),
        source,
    })?;
    let texels = image.into_rgba32f();
    let (width, height) = texels.dimensions();
    log::info!(
        "Loaded environment {} ({}x{}) in {:.1} ms",
        path.display(),
        width,
        height,
        start.elapsed().as_secs_f32() * 1000.0
    );
    Ok(EnvironmentMap {
        width,
        height,
        texels: texels.into_raw(),
    })
}

pub fn load_model(path: &Path, placement: &ModelPlacement) -> Result<LoadedModel, AssetError> {
    let start = Instant::now();
    let display = path.display().to_string();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if extension != "gltf" && extension != "glb" {
        return Err(AssetError::UnsupportedFormat {
            path: display,
            extension,
        });
    }

    let (document, buffers, _images) =
        gltf::import(path).map_err(|source| AssetError::Model {
            path: display.clone(),
            source,
        })?;

    let name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("model")
        .to_string();
    let mut graph = SceneGraph::new(&name);
    let root = graph.root();
    graph.set_local_transform(
        root,
        Transform::from_placement(placement.position, placement.rotation_deg, placement.scale),
    );

    if let Some(scene) = document
        .default_scene()
        .or_else(|| document.scenes().next())
    {
        for node in scene.nodes() {
            add_gltf_node(&mut graph, root, &node, &buffers);
        }
    }

    let mut triangles = 0usize;
    graph.visit_meshes(root, |_, mesh, _| triangles += mesh.triangle_count());
    if triangles == 0 {
        return Err(AssetError::EmptyModel { path: display });
    }
    graph.set_shadows(root, true, true);
    let bounds = graph.world_bounds(root);

    log::info!(
        "Loaded model {} ({} nodes, {} meshes, {} triangles) in {:.1} ms",
        display,
        graph.node_count(),
        graph.mesh_count(),
        triangles,
        start.elapsed().as_secs_f32() * 1000.0
    );
    log::debug!("Model bounds min={:?} max={:?}", bounds.min, bounds.max);

    Ok(LoadedModel {
        name,
        graph,
        root,
        bounds,
    })
}

fn add_gltf_node(
    graph: &mut SceneGraph,
    parent: NodeId,
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
) {
    let (translation, rotation, scale) = node.transform().decomposed();
    let local = Transform {
        translation: Vec3::from(translation),
        rotation: Quat::from_array(rotation),
        scale: Vec3::from(scale),
    };
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()));
    let id = graph.add_node(parent, name.clone(), local, NodeKind::Group);

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!(
                    "Skipping {:?} primitive {} of '{}'",
                    primitive.mode(),
                    primitive.index(),
                    name
                );
                continue;
            }
            let reader = primitive
                .reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<Vec3> = positions.map(Vec3::from).collect();
            let normals: Vec<Vec3> = reader
                .read_normals()
                .map(|normals| normals.map(Vec3::from).collect())
                .unwrap_or_default();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };

            let mut out = Mesh::new(positions, normals, indices);
            let pbr = primitive.material().pbr_metallic_roughness();
            out.base_color = pbr.base_color_factor();
            out.reflectivity = reflectivity(pbr.metallic_factor(), pbr.roughness_factor());
            graph.add_mesh_node(
                id,
                format!("{}#{}", name, primitive.index()),
                Transform::IDENTITY,
                out,
            );
        }
    }

    for child in node.children() {
        add_gltf_node(graph, id, &child, buffers);
    }
}

/// Mirror strength for a metallic-roughness material. Unset factors default
/// to 1.0 each, which gives a matte surface.
fn reflectivity(metallic: f32, roughness: f32) -> f32 {
    (metallic * (1.0 - roughness)).clamp(0.0, 1.0)
}

pub fn load_image(path: &Path) -> Result<DecodedImage, AssetError> {
    let image = image::open(path).map_err(|source| AssetError::Image {
        path: path.display().to_string(),
        source,
    })?;
    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

/// Background, logo and tooltip images. Failures are logged and skipped.
pub fn load_decorations(paths: &AssetPaths, presentation: &PresentationConfig) -> Decorations {
    let load_optional = |label: &str, path: Option<&Path>| -> Option<DecodedImage> {
        let path = path?;
        match load_image(path) {
            Ok(image) => {
                log::info!(
                    "Loaded {} image {} ({}x{})",
                    label,
                    path.display(),
                    image.width,
                    image.height
                );
                Some(image)
            }
            Err(err) => {
                log::warn!("Skipping {} image: {}", label, err);
                None
            }
        }
    };
    Decorations {
        background: load_optional("background", paths.background.as_deref()),
        logo: load_optional("logo", presentation.logo.as_deref()),
        tooltip_image: load_optional("tooltip", presentation.tooltip_image.as_deref()),
    }
}
