//! Model lifecycle: Unloaded -> Loaded -> Installed -> Drawable -> Destroyed.
//!
//! A model owns its GPU buffers and texture exclusively and frees them
//! exactly once, either through [`Model::destroy`] or on drop.

use std::path::Path;

use asset::{Material, ModelData, ObjOptions, TextureData, load_model};
use bytemuck::{Pod, Zeroable};
use corelib::{Mat4, Vec3, transform::Transform};
use thiserror::Error;
use wgpu::{BindGroup, BindGroupLayout, Buffer, BufferUsages, Device, Queue, RenderPass, util::DeviceExt};

use crate::{
    RenderError,
    mesh::{GpuMesh, ShaderInterface},
    texture::GpuTexture,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Unloaded,
    /// CPU arrays populated.
    Loaded,
    /// GPU buffers allocated.
    Installed,
    /// Material and texture bound.
    Drawable,
    /// GPU resources freed; terminal.
    Destroyed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("cannot go from {from:?} to {to:?}")]
    InvalidTransition { from: Lifecycle, to: Lifecycle },
}

impl Lifecycle {
    /// Forward by exactly one step, or to `Destroyed` from anywhere alive.
    pub fn advance(self, to: Lifecycle) -> Result<Lifecycle, LifecycleError> {
        use Lifecycle::*;
        let ok = matches!(
            (self, to),
            (Unloaded, Loaded) | (Loaded, Installed) | (Installed, Drawable)
        ) || (to == Destroyed && self != Destroyed);
        if ok {
            Ok(to)
        } else {
            Err(LifecycleError::InvalidTransition { from: self, to })
        }
    }
}

/// Material block of `shaders/model.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MaterialUniform {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    /// xyz = Ks, w = Ns.
    pub specular: [f32; 4],
}

impl From<&Material> for MaterialUniform {
    fn from(m: &Material) -> Self {
        let [ar, ag, ab] = m.ambient;
        let [dr, dg, db] = m.diffuse;
        let [sr, sg, sb] = m.specular;
        Self {
            ambient: [ar, ag, ab, 1.0],
            diffuse: [dr, dg, db, 1.0],
            specular: [sr, sg, sb, m.shininess],
        }
    }
}

struct GpuMaterial {
    uniform: Buffer,
    texture: GpuTexture,
    bind_group: BindGroup,
}

pub struct Model {
    label: String,
    state: Lifecycle,
    data: Option<ModelData>,
    mesh: Option<GpuMesh>,
    material: Option<GpuMaterial>,
    pub transform: Transform,
}

impl Model {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: Lifecycle::Unloaded,
            data: None,
            mesh: None,
            material: None,
            transform: Transform::identity(),
        }
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn data(&self) -> Option<&ModelData> {
        self.data.as_ref()
    }

    /// Parse OBJ/MTL/texture from disk. On error the model stays `Unloaded`.
    pub fn load(&mut self, path: impl AsRef<Path>, options: &ObjOptions) -> Result<(), RenderError> {
        self.state.advance(Lifecycle::Loaded)?;
        let data = load_model(path, options)?;
        self.set_data(data)
    }

    /// Adopt already parsed data.
    pub fn set_data(&mut self, data: ModelData) -> Result<(), RenderError> {
        self.state = self.state.advance(Lifecycle::Loaded)?;
        self.data = Some(data);
        Ok(())
    }

    /// Allocate vertex/index buffers for the attributes `interface` consumes.
    pub fn install(&mut self, device: &Device, interface: &ShaderInterface) -> Result<(), RenderError> {
        let next = self.state.advance(Lifecycle::Installed)?;
        let data = self.data.as_ref().ok_or(LifecycleError::InvalidTransition {
            from: self.state,
            to: next,
        })?;
        self.mesh = Some(GpuMesh::upload(device, &data.mesh, interface, &self.label)?);
        self.state = next;
        Ok(())
    }

    /// Upload the diffuse texture (white if the material has none) and the
    /// material block, and build the bind group for `layout`.
    pub fn bind_texture(
        &mut self,
        device: &Device,
        queue: &Queue,
        layout: &BindGroupLayout,
    ) -> Result<(), RenderError> {
        let next = self.state.advance(Lifecycle::Drawable)?;
        let data = self.data.as_ref().ok_or(LifecycleError::InvalidTransition {
            from: self.state,
            to: next,
        })?;

        let white = TextureData::solid([255; 4]);
        let texture_data = data.diffuse_texture.as_ref().unwrap_or(&white);
        let texture =
            GpuTexture::upload(device, queue, texture_data, &format!("{} diffuse", self.label))?;

        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} material UBO", self.label)),
            contents: bytemuck::bytes_of(&MaterialUniform::from(&data.material)),
            usage: BufferUsages::UNIFORM,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} material BG", self.label)),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        });

        self.material = Some(GpuMaterial {
            uniform,
            texture,
            bind_group,
        });
        self.state = next;
        Ok(())
    }

    /// Draw with the per-draw bind group (group 0) already set by the caller.
    pub fn draw(&self, pass: &mut RenderPass<'_>) -> Result<(), RenderError> {
        match (self.state, &self.mesh, &self.material) {
            (Lifecycle::Drawable, Some(mesh), Some(material)) => {
                pass.set_bind_group(1, &material.bind_group, &[]);
                mesh.draw(pass);
                Ok(())
            }
            (state, ..) => Err(RenderError::NotDrawable {
                label: self.label.clone(),
                state,
            }),
        }
    }

    /// Free all GPU resources. Calling it again is a no-op.
    pub fn destroy(&mut self) {
        if self.state == Lifecycle::Destroyed {
            return;
        }
        if let Some(mesh) = self.mesh.take() {
            mesh.destroy();
        }
        if let Some(material) = self.material.take() {
            material.uniform.destroy();
            material.texture.destroy();
        }
        log::debug!("Destroyed model {} (was {:?})", self.label, self.state);
        self.state = Lifecycle::Destroyed;
    }

    /// `T * Rx * Ry * Rz` for a model at `position` with Euler `orientation`.
    pub fn render_transform(position: Vec3, orientation: Vec3) -> Mat4 {
        Transform::at(position, orientation).matrix()
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        self.destroy();
    }
}
