//! Hover picking. Each pointer move is turned into a ray through the camera
//! and tested against the loaded model; any hit shows the tooltip, a miss
//! hides it.

use crate::assets::LoadedModel;
use crate::config::{PresentationConfig, TooltipAnchor, TooltipStyle};
use crate::render::camera::PerspectiveCamera;
use crate::render::pick::{
    intersect_subtree, NormalizedDeviceCoordinate, PickRay, PointerSample, Viewport,
};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum TooltipContent {
    Caption(String),
    ImageCaption { image: PathBuf, caption: String },
}

impl TooltipContent {
    pub fn caption(&self) -> &str {
        match self {
            Self::Caption(caption) => caption,
            Self::ImageCaption { caption, .. } => caption,
        }
    }
}

/// What the overlay shows. `anchor` is in window pixels, like pointer samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TooltipState {
    pub visible: bool,
    pub anchor: [f32; 2],
    /// Kept after a miss; only meaningful while `visible`.
    pub content: Option<TooltipContent>,
}

pub struct HoverController {
    anchor: TooltipAnchor,
    cursor_offset: [f32; 2],
    corner_position: [f32; 2],
    content: TooltipContent,
}

impl HoverController {
    pub fn new(presentation: &PresentationConfig) -> Self {
        let caption = if presentation.caption.trim().is_empty() {
            log::warn!("Empty tooltip caption, using the default");
            PresentationConfig::default().caption
        } else {
            presentation.caption.clone()
        };
        let content = match (presentation.tooltip_style, &presentation.tooltip_image) {
            (TooltipStyle::ImageCaption, Some(image)) => TooltipContent::ImageCaption {
                image: image.clone(),
                caption,
            },
            (TooltipStyle::ImageCaption, None) => {
                log::warn!("image+caption tooltip without an image, showing caption only");
                TooltipContent::Caption(caption)
            }
            (TooltipStyle::CaptionOnly, _) => TooltipContent::Caption(caption),
        };
        Self {
            anchor: presentation.tooltip_anchor,
            cursor_offset: presentation.cursor_offset_px,
            corner_position: presentation.corner_position_px,
            content,
        }
    }

    /// Update `tooltip` for a pointer at `sample`. Does nothing until the
    /// model exists, and never fails.
    pub fn handle_pointer_move(
        &self,
        sample: PointerSample,
        viewport: Viewport,
        camera: Option<&PerspectiveCamera>,
        model: Option<&LoadedModel>,
        tooltip: &mut TooltipState,
    ) {
        if viewport.is_degenerate() {
            return;
        }
        let ndc = NormalizedDeviceCoordinate::from_pointer(sample, viewport);
        let (Some(model), Some(camera)) = (model, camera) else {
            return;
        };

        let ray = PickRay::from_camera(ndc, camera);
        let hits = intersect_subtree(&ray, &model.graph, model.root);
        let was_visible = tooltip.visible;

        match hits.nearest() {
            Some(nearest) => {
                tooltip.visible = true;
                tooltip.anchor = self.anchor_for(sample);
                tooltip.content = Some(self.content.clone());
                if !was_visible {
                    let name = model
                        .graph
                        .node(nearest.node)
                        .map(|node| node.name.as_str())
                        .unwrap_or("?");
                    log::trace!(
                        "Hover enter on '{}' at {:?}, {:.1} away ({} hits)",
                        name,
                        nearest.point,
                        nearest.distance,
                        hits.len()
                    );
                }
            }
            None => {
                tooltip.visible = false;
                if was_visible {
                    log::trace!("Hover leave");
                }
            }
        }
    }

    fn anchor_for(&self, sample: PointerSample) -> [f32; 2] {
        match self.anchor {
            TooltipAnchor::Cursor => [
                sample.x + self.cursor_offset[0],
                sample.y + self.cursor_offset[1],
            ],
            TooltipAnchor::FixedCorner => self.corner_position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::tests::cuboid;
    use crate::scene::{SceneGraph, Transform};
    use glam::Vec3;

    fn model() -> LoadedModel {
        let mut graph = SceneGraph::new("building");
        let root = graph.root();
        graph.add_mesh_node(root, "block", Transform::IDENTITY, cuboid(Vec3::splat(2.0)));
        let bounds = graph.world_bounds(root);
        LoadedModel {
            name: "building".to_string(),
            graph,
            root,
            bounds,
        }
    }

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera {
            position: Vec3::new(0.0, 0.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_deg: 45.0,
            aspect: 1920.0 / 1080.0,
            near: 1.0,
            far: 3000.0,
        }
    }

    fn full_hd() -> Viewport {
        Viewport::new(1920, 1080)
    }

    const CENTER: PointerSample = PointerSample { x: 960.0, y: 540.0 };
    const TOP_LEFT: PointerSample = PointerSample { x: 0.0, y: 0.0 };

    #[test]
    fn pointer_moves_before_load_change_nothing() {
        let controller = HoverController::new(&PresentationConfig::default());
        let cam = camera();
        let mut tooltip = TooltipState::default();
        for sample in [CENTER, TOP_LEFT, PointerSample { x: 400.0, y: 900.0 }] {
            controller.handle_pointer_move(sample, full_hd(), Some(&cam), None, &mut tooltip);
            assert_eq!(tooltip, TooltipState::default());
        }

        let shown = TooltipState {
            visible: true,
            anchor: [5.0, 5.0],
            content: Some(TooltipContent::Caption("x".into())),
        };
        let mut tooltip = shown.clone();
        controller.handle_pointer_move(TOP_LEFT, full_hd(), Some(&cam), None, &mut tooltip);
        assert_eq!(tooltip, shown);
    }

    #[test]
    fn centre_of_full_hd_hits_the_model() {
        let controller = HoverController::new(&PresentationConfig::default());
        let model = model();
        let mut tooltip = TooltipState::default();
        controller.handle_pointer_move(
            CENTER,
            full_hd(),
            Some(&camera()),
            Some(&model),
            &mut tooltip,
        );
        assert!(tooltip.visible);
        let content = tooltip.content.as_ref().unwrap();
        assert!(!content.caption().is_empty());
    }

    #[test]
    fn corner_of_full_hd_misses_and_hides() {
        let controller = HoverController::new(&PresentationConfig::default());
        let model = model();
        let cam = camera();
        let mut tooltip = TooltipState::default();
        controller.handle_pointer_move(CENTER, full_hd(), Some(&cam), Some(&model), &mut tooltip);
        assert!(tooltip.visible);
        controller.handle_pointer_move(TOP_LEFT, full_hd(), Some(&cam), Some(&model), &mut tooltip);
        assert!(!tooltip.visible);
        // Content stays around while hidden.
        assert!(tooltip.content.is_some());
    }

    #[test]
    fn repeated_moves_are_idempotent() {
        let controller = HoverController::new(&PresentationConfig::default());
        let model = model();
        let cam = camera();
        for sample in [CENTER, TOP_LEFT] {
            let mut tooltip = TooltipState::default();
            controller.handle_pointer_move(
                sample,
                full_hd(),
                Some(&cam),
                Some(&model),
                &mut tooltip,
            );
            let first = tooltip.clone();
            controller.handle_pointer_move(
                sample,
                full_hd(),
                Some(&cam),
                Some(&model),
                &mut tooltip,
            );
            assert_eq!(tooltip, first);
        }
    }

    #[test]
    fn cursor_anchor_follows_pointer_with_offset() {
        let presentation = PresentationConfig {
            tooltip_anchor: TooltipAnchor::Cursor,
            cursor_offset_px: [12.0, 8.0],
            ..PresentationConfig::default()
        };
        let controller = HoverController::new(&presentation);
        let model = model();
        let mut tooltip = TooltipState::default();
        controller.handle_pointer_move(
            CENTER,
            full_hd(),
            Some(&camera()),
            Some(&model),
            &mut tooltip,
        );
        assert_eq!(tooltip.anchor, [972.0, 548.0]);
    }

    #[test]
    fn fixed_corner_anchor_ignores_pointer() {
        let presentation = PresentationConfig {
            tooltip_anchor: TooltipAnchor::FixedCorner,
            corner_position_px: [30.0, 40.0],
            ..PresentationConfig::default()
        };
        let controller = HoverController::new(&presentation);
        let model = model();
        let mut tooltip = TooltipState::default();
        let near_center = PointerSample { x: 965.0, y: 530.0 };
        controller.handle_pointer_move(
            near_center,
            full_hd(),
            Some(&camera()),
            Some(&model),
            &mut tooltip,
        );
        assert!(tooltip.visible);
        assert_eq!(tooltip.anchor, [30.0, 40.0]);
    }

    #[test]
    fn image_caption_style_carries_the_image() {
        let presentation = PresentationConfig {
            tooltip_style: TooltipStyle::ImageCaption,
            tooltip_image: Some(PathBuf::from("assets/tooltip.png")),
            caption: "Casa".to_string(),
            ..PresentationConfig::default()
        };
        let controller = HoverController::new(&presentation);
        let model = model();
        let mut tooltip = TooltipState::default();
        controller.handle_pointer_move(
            CENTER,
            full_hd(),
            Some(&camera()),
            Some(&model),
            &mut tooltip,
        );
        assert_eq!(
            tooltip.content,
            Some(TooltipContent::ImageCaption {
                image: PathBuf::from("assets/tooltip.png"),
                caption: "Casa".to_string(),
            })
        );
    }

    #[test]
    fn visible_tooltip_never_has_a_blank_caption() {
        let presentation = PresentationConfig {
            caption: "  ".to_string(),
            ..PresentationConfig::default()
        };
        let controller = HoverController::new(&presentation);
        let model = model();
        let mut tooltip = TooltipState::default();
        controller.handle_pointer_move(
            CENTER,
            full_hd(),
            Some(&camera()),
            Some(&model),
            &mut tooltip,
        );
        assert!(tooltip.visible);
        let caption = tooltip.content.as_ref().map(TooltipContent::caption);
        assert!(caption.is_some_and(|caption| !caption.trim().is_empty()));
    }

    #[test]
    fn zero_sized_viewport_is_ignored() {
        let controller = HoverController::new(&PresentationConfig::default());
        let model = model();
        let mut tooltip = TooltipState::default();
        controller.handle_pointer_move(
            CENTER,
            Viewport::new(0, 1080),
            Some(&camera()),
            Some(&model),
            &mut tooltip,
        );
        assert_eq!(tooltip, TooltipState::default());
    }

    #[test]
    fn missing_camera_is_a_no_op() {
        let controller = HoverController::new(&PresentationConfig::default());
        let model = model();
        let mut tooltip = TooltipState::default();
        controller.handle_pointer_move(CENTER, full_hd(), None, Some(&model), &mut tooltip);
        assert_eq!(tooltip, TooltipState::default());
    }
}
