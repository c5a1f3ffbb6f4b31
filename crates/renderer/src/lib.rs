//! Renderer: wgpu init + depth + OBJ models drawn from an orbit camera,
//! with a top-down minimap in the top-right corner.
//! wgpu = 26.x, winit = 0.30.x

use std::num::NonZeroU64;
use std::path::Path;
use std::sync::Arc;

use asset::{AssetError, ObjOptions};
use bytemuck::{Pod, Zeroable};
use corelib::{camera::Camera, transform::Transform};
use glam::{Mat4, Vec3};
use thiserror::Error;
use wgpu::{
    BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    BlendState, Buffer, BufferBindingType, BufferUsages, ColorTargetState, ColorWrites,
    CommandEncoderDescriptor, DepthBiasState, DepthStencilState, Device, DeviceDescriptor,
    Extent3d, Features, FragmentState, Instance, InstanceDescriptor, Limits, LoadOp, Operations,
    PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, SamplerBindingType,
    ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, Surface, SurfaceConfiguration,
    SurfaceError, TextureDescriptor, TextureDimension, TextureFormat, TextureSampleType,
    TextureUsages, TextureView, TextureViewDescriptor, TextureViewDimension, VertexState,
};
use winit::{dpi::PhysicalSize, window::Window};

pub mod mesh;
pub mod model;
pub mod texture;
pub mod viewport;

pub use mesh::{AttributeKind, GpuMesh, ShaderInterface};
pub use model::{Lifecycle, LifecycleError, Model};
pub use viewport::Viewport;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("model '{label}' is not drawable (state {state:?})")]
    NotDrawable { label: String, state: Lifecycle },
    #[error("mesh '{0}' has no triangles")]
    EmptyMesh(String),
    #[error("too many draws in one frame (limit {0})")]
    TooManyDraws(usize),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("shader: {0}")]
    Shader(String),
    #[error("shader input '{0}' has no matching mesh attribute")]
    UnknownAttribute(String),
    #[error("shader input '{name}' is declared {found:?}, mesh attribute is {expected:?}")]
    AttributeFormat {
        name: String,
        expected: wgpu::VertexFormat,
        found: wgpu::VertexFormat,
    },
    #[error("texture '{label}' is {width}x{height}, device limit is {max}")]
    TextureTooLarge {
        label: String,
        width: u32,
        height: u32,
        max: u32,
    },
}

/// Per-draw UBO (view-projection, model matrix, lighting).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DrawUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub eye: [f32; 4],
    pub light_dir: [f32; 4],
}

impl DrawUniforms {
    pub fn new(camera: &Camera, model: Mat4) -> Self {
        Self {
            view_proj: camera.proj_view().to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            eye: camera.eye.extend(1.0).to_array(),
            light_dir: LIGHT_DIR.normalize().extend(0.0).to_array(),
        }
    }
}

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
/// Upper bound on draws per frame (main view + minimap, all models).
const MAX_DRAWS: usize = 64;
const LIGHT_DIR: Vec3 = Vec3::new(-0.4, -1.0, -0.3);

/// Stride between per-draw uniform slots, honouring the device's offset alignment.
pub fn uniform_stride(alignment: u32) -> u64 {
    let size = std::mem::size_of::<DrawUniforms>() as u64;
    let align = u64::from(alignment.max(1));
    size.div_ceil(align) * align
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipeline
    interface: ShaderInterface,
    pipeline: RenderPipeline,
    material_bgl: BindGroupLayout,

    // Per-draw uniforms (dynamic offsets)
    draw_buf: Buffer,
    draw_bg: BindGroup,
    draw_stride: u64,

    // Depth
    depth_view: TextureView,

    models: Vec<Model>,
    show_minimap: bool,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>.
    pub async fn new(
        window: Arc<Window>,
        backends: wgpu::Backends,
        show_minimap: bool,
    ) -> Result<Self, RenderError> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Billiard Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;
        log::info!("Surface format: {:?}", surface_format);

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or_default(),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);

        // ==== Shaders ====
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Model WGSL"),
            source: ShaderSource::Wgsl(mesh::MODEL_SHADER.into()),
        });
        let interface = ShaderInterface::model_shader()?;

        // ==== Per-draw BGL/BG ====
        let draw_size = NonZeroU64::new(std::mem::size_of::<DrawUniforms>() as u64);
        let draw_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Draw BGL"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: draw_size,
                },
                count: None,
            }],
        });
        let draw_stride = uniform_stride(device.limits().min_uniform_buffer_offset_alignment);
        let draw_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw UBO"),
            size: draw_stride * MAX_DRAWS as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let draw_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw BG"),
            layout: &draw_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &draw_buf,
                    offset: 0,
                    size: draw_size,
                }),
            }],
        });

        // ==== Material BGL ====
        let material_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Material BGL"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(
                            std::mem::size_of::<model::MaterialUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // ==== Pipeline ====
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Model PipelineLayout"),
            bind_group_layouts: &[&draw_bgl, &material_bgl],
            push_constant_ranges: &[],
        });
        let vertex_layouts = interface.vertex_buffer_layouts();
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Model Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some(mesh::MODEL_VERTEX_ENTRY),
                buffers: &vertex_layouts,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // OBJ winding is not reliable, so both faces are drawn.
            primitive: wgpu::PrimitiveState {
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            interface,
            pipeline,
            material_bgl,
            draw_buf,
            draw_bg,
            draw_stride,
            depth_view,
            models: Vec::new(),
            show_minimap,
            width,
            height,
        })
    }

    /// Load an OBJ (with its MTL and texture) and take it all the way to drawable.
    pub fn load_model(
        &mut self,
        path: impl AsRef<Path>,
        options: &ObjOptions,
        transform: Transform,
    ) -> Result<usize, RenderError> {
        let path = path.as_ref();
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_owned());

        let mut model = Model::new(label);
        model.transform = transform;
        model.load(path, options)?;
        model.install(&self.device, &self.interface)?;
        model.bind_texture(&self.device, &self.queue, &self.material_bgl)?;

        self.models.push(model);
        Ok(self.models.len() - 1)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    /// Render one frame: main view from `main_camera`, then the minimap.
    pub fn render(&mut self, main_camera: &Camera) -> Result<(), SurfaceError> {
        let main_vp = Viewport::full(self.width, self.height);
        let main_camera = main_camera.with_aspect(main_vp.aspect());
        let minimap_vp = if self.show_minimap {
            Viewport::minimap(self.width, self.height)
        } else {
            None
        };
        let minimap_camera = Camera::top_down_minimap();

        // Every draw gets its own uniform slot; writes land before submit.
        let views: Vec<(Viewport, Camera)> = std::iter::once((main_vp, main_camera))
            .chain(minimap_vp.map(|vp| (vp, minimap_camera)))
            .collect();
        let draw_count = views.len() * self.models.len();
        if draw_count > MAX_DRAWS {
            log::warn!("{}", RenderError::TooManyDraws(MAX_DRAWS));
        }
        let mut slot = 0u64;
        for (_, camera) in &views {
            for model in &self.models {
                if slot as usize >= MAX_DRAWS {
                    break;
                }
                let uniforms = DrawUniforms::new(camera, model.transform.matrix());
                self.queue
                    .write_buffer(&self.draw_buf, slot * self.draw_stride, bytemuck::bytes_of(&uniforms));
                slot += 1;
            }
        }

        // --- frame & passes
        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        let mut slot = 0u64;
        for (pass_idx, (viewport, _)) in views.iter().enumerate() {
            // First pass clears colour; the minimap only clears depth.
            let color_load = if pass_idx == 0 {
                LoadOp::Clear(wgpu::Color {
                    r: 0.2,
                    g: 0.3,
                    b: 0.3,
                    a: 1.0,
                })
            } else {
                LoadOp::Load
            };
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some(if pass_idx == 0 { "MainPass" } else { "MinimapPass" }),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: color_load,
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_pipeline(&self.pipeline);
            viewport.apply(&mut rpass);
            for model in &self.models {
                if slot as usize >= MAX_DRAWS {
                    break;
                }
                let offset = (slot * self.draw_stride) as u32;
                rpass.set_bind_group(0, &self.draw_bg, &[offset]);
                if let Err(err) = model.draw(&mut rpass) {
                    log::warn!("Skipping draw: {err}");
                }
                slot += 1;
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

impl Drop for GpuState {
    fn drop(&mut self) {
        for model in &mut self.models {
            model.destroy();
        }
        self.draw_buf.destroy();
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_slots_respect_alignment() {
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 160);
        assert_eq!(uniform_stride(256), 256);
        assert_eq!(uniform_stride(64), 192);
        assert_eq!(uniform_stride(0), 160);
    }

    #[test]
    fn draw_uniforms_carry_camera_eye() {
        let camera = Camera::top_down_minimap();
        let u = DrawUniforms::new(&camera, Mat4::IDENTITY);
        assert_eq!(u.eye, [0.0, 10.0, 0.0, 1.0]);
        assert_eq!(u.model, Mat4::IDENTITY.to_cols_array_2d());
        assert_eq!(u.light_dir[3], 0.0);
    }
}
