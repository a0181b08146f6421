pub mod tooltip;

use crate::app::LoadPhase;
use crate::assets::{Decorations, DecodedImage};
use crate::config::PresentationConfig;
use std::path::{Path, PathBuf};
use tooltip::{TooltipContent, TooltipState};

const LOGO_MAX_WIDTH: f32 = 180.0;
const TOOLTIP_IMAGE_MAX_WIDTH: f32 = 220.0;

/// egui textures for the decoration images that loaded.
#[derive(Default)]
pub struct OverlayTextures {
    logo: Option<egui::TextureHandle>,
    /// Keyed by the configured path so tooltip content can refer to it.
    tooltip_image: Option<(PathBuf, egui::TextureHandle)>,
}

impl OverlayTextures {
    /// Uploads the logo and tooltip image. Images with a side longer than
    /// `max_side` are skipped.
    pub fn upload(
        ctx: &egui::Context,
        decorations: &Decorations,
        presentation: &PresentationConfig,
        max_side: usize,
    ) -> Self {
        let fits = |what: &str, image: &DecodedImage| {
            let ok = image.width as usize <= max_side && image.height as usize <= max_side;
            if !ok {
                log::warn!(
                    "{} image is {}x{}, outside the texture limit of {}; not shown",
                    what,
                    image.width,
                    image.height,
                    max_side
                );
            }
            ok
        };
        let tooltip_image = match (&presentation.tooltip_image, &decorations.tooltip_image) {
            (Some(path), Some(image)) if fits("Tooltip", image) => {
                Some((path.clone(), load_texture(ctx, "tooltip-image", image)))
            }
            _ => None,
        };
        Self {
            logo: decorations
                .logo
                .as_ref()
                .filter(|image| fits("Logo", *image))
                .map(|image| load_texture(ctx, "logo", image)),
            tooltip_image,
        }
    }

    fn tooltip_image(&self, path: &Path) -> Option<&egui::TextureHandle> {
        self.tooltip_image
            .as_ref()
            .filter(|(loaded, _)| loaded.as_path() == path)
            .map(|(_, texture)| texture)
    }
}

fn load_texture(ctx: &egui::Context, name: &str, image: &DecodedImage) -> egui::TextureHandle {
    let color = egui::ColorImage::from_rgba_unmultiplied(
        [image.width as usize, image.height as usize],
        &image.rgba,
    );
    ctx.load_texture(name, color, egui::TextureOptions::LINEAR)
}

pub struct OverlayFrame<'a> {
    pub phase: &'a LoadPhase,
    pub presentation: &'a PresentationConfig,
    pub tooltip: &'a TooltipState,
    pub textures: &'a OverlayTextures,
}

/// Loader, title, logo and tooltip. None of these take input.
pub fn draw_overlays(ctx: &egui::Context, frame: &OverlayFrame<'_>) {
    if !matches!(frame.phase, LoadPhase::Ready) {
        draw_loader(ctx, frame.phase);
    }
    if frame.presentation.show_title_overlay && !frame.presentation.title.is_empty() {
        egui::Area::new(egui::Id::new("title-overlay"))
            .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 16.0))
            .interactable(false)
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new(&frame.presentation.title)
                        .size(24.0)
                        .strong()
                        .color(egui::Color32::WHITE),
                );
            });
    }
    if let Some(logo) = &frame.textures.logo {
        egui::Area::new(egui::Id::new("logo"))
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-16.0, -16.0))
            .interactable(false)
            .show(ctx, |ui| {
                ui.add(
                    egui::Image::from_texture(egui::load::SizedTexture::from_handle(logo))
                        .max_width(LOGO_MAX_WIDTH),
                );
            });
    }
    draw_tooltip(ctx, frame.tooltip, frame.textures);
}

fn draw_loader(ctx: &egui::Context, phase: &LoadPhase) {
    egui::Area::new(egui::Id::new("loader"))
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add(egui::Spinner::new().size(32.0));
                    match phase {
                        LoadPhase::Failed(message) => {
                            ui.colored_label(egui::Color32::LIGHT_RED, "Failed to load scene");
                            ui.small(message);
                        }
                        _ => {
                            ui.label("Loading...");
                        }
                    }
                });
            });
        });
}

fn draw_tooltip(ctx: &egui::Context, tooltip: &TooltipState, textures: &OverlayTextures) {
    if !tooltip.visible {
        return;
    }
    let Some(content) = &tooltip.content else {
        return;
    };
    // Anchor is in physical pixels.
    let ppp = ctx.pixels_per_point();
    let pos = egui::pos2(tooltip.anchor[0] / ppp, tooltip.anchor[1] / ppp);
    egui::Area::new(egui::Id::new("pick-tooltip"))
        .order(egui::Order::Tooltip)
        .fixed_pos(pos)
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                let image = match content {
                    TooltipContent::ImageCaption { image, .. } => textures.tooltip_image(image),
                    TooltipContent::Caption(_) => None,
                };
                if let Some(image) = image {
                    ui.add(
                        egui::Image::from_texture(egui::load::SizedTexture::from_handle(image))
                            .max_width(TOOLTIP_IMAGE_MAX_WIDTH),
                    );
                }
                ui.label(content.caption());
            });
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: u32, height: u32) -> DecodedImage {
        DecodedImage {
            width,
            height,
            rgba: vec![255; (width * height * 4) as usize],
        }
    }

    fn presentation() -> PresentationConfig {
        PresentationConfig {
            tooltip_image: Some(PathBuf::from("assets/tooltip.png")),
            ..PresentationConfig::default()
        }
    }

    #[test]
    fn images_within_the_limit_are_uploaded() {
        let ctx = egui::Context::default();
        let decorations = Decorations {
            background: None,
            logo: Some(image(4, 2)),
            tooltip_image: Some(image(2, 2)),
        };
        let textures = OverlayTextures::upload(&ctx, &decorations, &presentation(), 4);
        assert!(textures.logo.is_some());
        assert!(textures
            .tooltip_image(Path::new("assets/tooltip.png"))
            .is_some());
        assert!(textures.tooltip_image(Path::new("other.png")).is_none());
    }

    #[test]
    fn oversized_images_are_skipped() {
        let ctx = egui::Context::default();
        let decorations = Decorations {
            background: None,
            logo: Some(image(8, 2)),
            tooltip_image: Some(image(2, 8)),
        };
        let textures = OverlayTextures::upload(&ctx, &decorations, &presentation(), 4);
        assert!(textures.logo.is_none());
        assert!(textures
            .tooltip_image(Path::new("assets/tooltip.png"))
            .is_none());
    }
}
