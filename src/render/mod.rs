//! wgpu renderer: shadow pass, background and lit meshes, then the egui
//! overlay on top.

pub mod camera;
mod context;
mod mesh;
pub mod pick;
mod pipelines;

pub use camera::{CameraMovement, OrbitControls, PerspectiveCamera};

use crate::assets::{DecodedImage, EnvironmentMap, LoadedModel};
use crate::scene::setup::{Lighting, Stage};
use context::GfxContext;
use mesh::{GlobalsUniform, GpuDraw};
use pipelines::{GpuTexture, Layouts, Pipelines, DEPTH_FORMAT, SHADOW_FORMAT};
use std::sync::Arc;
use winit::dpi::PhysicalSize;
use winit::window::Window;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no GPU adapter compatible with the window surface")]
    NoAdapter,
    #[error("failed to open GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("window surface reports no texture formats")]
    NoSurfaceFormat,
    #[error("GPU is out of memory")]
    OutOfMemory,
}

/// Tessellated egui output for one frame.
pub struct OverlayPaint {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

struct Background {
    _texture: GpuTexture,
    bind_group: wgpu::BindGroup,
}

pub struct Renderer {
    gfx: GfxContext,
    layouts: Layouts,
    pipelines: Pipelines,
    depth: GpuTexture,
    shadow_map: GpuTexture,
    shadow_map_size: u32,
    shadows_enabled: bool,
    shadow_sampler: wgpu::Sampler,
    globals_buffer: wgpu::Buffer,
    scene_globals: wgpu::BindGroup,
    shadow_globals: wgpu::BindGroup,
    environment: GpuTexture,
    has_environment: bool,
    background: Option<Background>,
    props: Vec<GpuDraw>,
    model: Vec<GpuDraw>,
    lighting: Lighting,
    clear_color: wgpu::Color,
    egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, stage: &Stage) -> Result<Self, RenderError> {
        let gfx = GfxContext::new(window).await?;
        let device = &gfx.device;

        let layouts = Layouts::new(device);
        let pipelines = Pipelines::new(device, &layouts, gfx.config.format);
        let depth = GpuTexture::depth(
            device,
            "Depth Target",
            gfx.config.width,
            gfx.config.height,
            DEPTH_FORMAT,
        );

        let directional = &stage.lighting.directional;
        let shadows_enabled = directional.cast_shadow;
        let shadow_map_size = if shadows_enabled {
            directional.shadow.map_size
        } else {
            1
        };
        let shadow_map = GpuTexture::depth(
            device,
            "Shadow Map",
            shadow_map_size,
            shadow_map_size,
            SHADOW_FORMAT,
        );
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..wgpu::SamplerDescriptor::default()
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globals Uniform Buffer"),
            size: std::mem::size_of::<GlobalsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let shadow_globals = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Globals Bind Group"),
            layout: &layouts.shadow_globals,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let environment = GpuTexture::environment_placeholder(device, &gfx.queue);
        let scene_globals = scene_globals_bind_group(
            device,
            &layouts,
            &globals_buffer,
            &shadow_map,
            &shadow_sampler,
            &environment,
        );

        let props = mesh::upload_subtree(device, &layouts.draw, &stage.props, stage.props.root());
        let egui_renderer = egui_wgpu::Renderer::new(device, gfx.config.format, None, 1, false);
        let [r, g, b, a] = stage.clear_color;

        log::info!(
            "Renderer ready: {:?}, shadow map {}x{}",
            gfx.config.format,
            shadow_map_size,
            shadow_map_size
        );

        Ok(Self {
            layouts,
            pipelines,
            depth,
            shadow_map,
            shadow_map_size,
            shadows_enabled,
            shadow_sampler,
            globals_buffer,
            scene_globals,
            shadow_globals,
            environment,
            has_environment: false,
            background: None,
            props,
            model: Vec::new(),
            lighting: stage.lighting.clone(),
            clear_color: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            },
            egui_renderer,
            gfx,
        })
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.gfx.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.gfx.resize(new_size);
            self.depth = GpuTexture::depth(
                &self.gfx.device,
                "Depth Target",
                new_size.width,
                new_size.height,
                DEPTH_FORMAT,
            );
        }
    }

    pub fn max_texture_side(&self) -> usize {
        self.gfx.device.limits().max_texture_dimension_2d as usize
    }

    fn fits_texture_limits(&self, what: &str, width: u32, height: u32) -> bool {
        let max = self.gfx.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            log::warn!(
                "{} is {}x{}, outside the GPU texture limit of {}; not used",
                what,
                width,
                height,
                max
            );
            return false;
        }
        true
    }

    pub fn set_environment(&mut self, map: &EnvironmentMap) {
        if !self.fits_texture_limits("Environment map", map.width, map.height) {
            return;
        }
        self.environment = GpuTexture::environment(&self.gfx.device, &self.gfx.queue, map);
        self.scene_globals = scene_globals_bind_group(
            &self.gfx.device,
            &self.layouts,
            &self.globals_buffer,
            &self.shadow_map,
            &self.shadow_sampler,
            &self.environment,
        );
        self.has_environment = true;
    }

    pub fn set_background(&mut self, image: &DecodedImage) {
        if !self.fits_texture_limits("Background image", image.width, image.height) {
            return;
        }
        let device = &self.gfx.device;
        let texture = GpuTexture::srgb_image(device, &self.gfx.queue, "Background", image);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Background Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..wgpu::SamplerDescriptor::default()
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Background Bind Group"),
            layout: &self.layouts.background,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });
        self.background = Some(Background {
            _texture: texture,
            bind_group,
        });
    }

    pub fn set_model(&mut self, model: &LoadedModel) {
        self.model = mesh::upload_subtree(
            &self.gfx.device,
            &self.layouts.draw,
            &model.graph,
            model.root,
        );
        log::debug!("Uploaded {} model draws", self.model.len());
    }

    fn globals(&self, camera: &PerspectiveCamera) -> GlobalsUniform {
        let lighting = &self.lighting;
        let directional = &lighting.directional;
        let to_light = directional.direction_to_light();
        let rgb = |c: [f32; 3]| [c[0], c[1], c[2], 1.0];
        GlobalsUniform {
            view_proj: camera.view_proj(),
            light_view_proj: directional.shadow_view_proj(),
            camera_pos: camera.position.extend(1.0).to_array(),
            light_dir: [
                to_light.x,
                to_light.y,
                to_light.z,
                if self.shadows_enabled { 1.0 } else { 0.0 },
            ],
            light_color: rgb(directional.radiance),
            sky_color: rgb(lighting.hemisphere.sky),
            ground_color: rgb(lighting.hemisphere.ground),
            env_params: [
                lighting.environment_intensity,
                lighting.exposure,
                if self.has_environment { 1.0 } else { 0.0 },
                1.0 / self.shadow_map_size as f32,
            ],
        }
    }

    /// Draw one frame. With no camera only the clear colour, background and
    /// overlay are drawn.
    pub fn render_frame(
        &mut self,
        camera: Option<&PerspectiveCamera>,
        overlay: OverlayPaint,
    ) -> Result<(), RenderError> {
        let frame = match self.gfx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gfx.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(RenderError::OutOfMemory),
            Err(err) => {
                log::warn!("Skipping frame: {}", err);
                return Ok(());
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if let Some(camera) = camera {
            let globals = self.globals(camera);
            self.gfx
                .queue
                .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));
        }

        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        if camera.is_some() && self.shadows_enabled {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipelines.shadow);
            pass.set_bind_group(0, &self.shadow_globals, &[]);
            for draw in self.props.iter().chain(&self.model).filter(|d| d.cast_shadow) {
                draw.draw(&mut pass);
            }
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(background) = &self.background {
                pass.set_pipeline(&self.pipelines.background);
                pass.set_bind_group(0, &background.bind_group, &[]);
                pass.draw(0..3, 0..1);
            }

            if camera.is_some() {
                pass.set_pipeline(&self.pipelines.scene);
                pass.set_bind_group(0, &self.scene_globals, &[]);
                for draw in self.props.iter().chain(&self.model) {
                    draw.draw(&mut pass);
                }
            }
        }

        let command_buffers = self.paint_overlay(&mut encoder, &view, overlay);

        self.gfx
            .queue
            .submit(command_buffers.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();
        Ok(())
    }

    fn paint_overlay(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        overlay: OverlayPaint,
    ) -> Vec<wgpu::CommandBuffer> {
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gfx.config.width, self.gfx.config.height],
            pixels_per_point: overlay.pixels_per_point,
        };
        for (id, delta) in &overlay.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.gfx.device, &self.gfx.queue, *id, delta);
        }
        let command_buffers = self.egui_renderer.update_buffers(
            &self.gfx.device,
            &self.gfx.queue,
            encoder,
            &overlay.primitives,
            &screen,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Overlay Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            self.egui_renderer
                .render(&mut pass, &overlay.primitives, &screen);
        }
        for id in &overlay.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
        command_buffers
    }
}

fn scene_globals_bind_group(
    device: &wgpu::Device,
    layouts: &Layouts,
    globals: &wgpu::Buffer,
    shadow_map: &GpuTexture,
    shadow_sampler: &wgpu::Sampler,
    environment: &GpuTexture,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Scene Globals Bind Group"),
        layout: &layouts.scene_globals,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: globals.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow_map.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(shadow_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&environment.view),
            },
        ],
    })
}
