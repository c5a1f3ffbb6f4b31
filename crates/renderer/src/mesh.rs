//! GPU mesh: one static vertex buffer per attribute plus a `u32` index buffer.
//!
//! The vertex inputs of the shader decide what gets uploaded: the WGSL is
//! reflected into a [`ShaderInterface`], and each input is matched by name
//! to a mesh channel and bound at the slot the pipeline expects it in.

use asset::MeshData;
use naga::{Binding, Scalar, ScalarKind, ShaderStage, TypeInner, VectorSize};
use wgpu::{
    Buffer, BufferUsages, Device, RenderPass, VertexAttribute, VertexBufferLayout, VertexFormat,
    VertexStepMode, util::DeviceExt,
};

use crate::RenderError;

/// Source of the model pipeline's shader.
pub const MODEL_SHADER: &str = include_str!("shaders/model.wgsl");
pub const MODEL_VERTEX_ENTRY: &str = "vs_main";

/// Per-vertex channels a mesh can provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Position,
    Texcoord,
    Normal,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 3] = [Self::Position, Self::Texcoord, Self::Normal];

    /// Name the shader uses for this input.
    pub fn name(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Texcoord => "texcoord",
            Self::Normal => "normal",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Layout of the bytes produced by [`AttributeKind::bytes`].
    pub fn format(self) -> VertexFormat {
        match self {
            Self::Position | Self::Normal => VertexFormat::Float32x3,
            Self::Texcoord => VertexFormat::Float32x2,
        }
    }

    /// Tightly packed bytes of this channel for every vertex of `mesh`.
    pub fn bytes(self, mesh: &MeshData) -> Vec<u8> {
        match self {
            Self::Position => bytemuck::cast_slice(&mesh.positions()).to_vec(),
            Self::Texcoord => bytemuck::cast_slice(&mesh.texcoords()).to_vec(),
            Self::Normal => bytemuck::cast_slice(&mesh.normals()).to_vec(),
        }
    }
}

/// A named vertex input of a shader.
#[derive(Clone, Debug)]
pub struct ShaderInput {
    pub name: String,
    attribute: VertexAttribute,
}

impl ShaderInput {
    pub fn location(&self) -> u32 {
        self.attribute.shader_location
    }

    pub fn format(&self) -> VertexFormat {
        self.attribute.format
    }

    /// Mesh channel feeding this input. The name must be a known channel and
    /// the declared format must match the bytes that channel uploads.
    pub fn attribute_kind(&self) -> Result<AttributeKind, RenderError> {
        let kind = AttributeKind::from_name(&self.name)
            .ok_or_else(|| RenderError::UnknownAttribute(self.name.clone()))?;
        if kind.format() != self.format() {
            return Err(RenderError::AttributeFormat {
                name: self.name.clone(),
                expected: kind.format(),
                found: self.format(),
            });
        }
        Ok(kind)
    }
}

/// Vertex inputs of a shader, in vertex-buffer slot order.
#[derive(Clone, Debug, Default)]
pub struct ShaderInterface {
    inputs: Vec<ShaderInput>,
}

impl ShaderInterface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an input; it takes the next vertex-buffer slot.
    pub fn with_input(mut self, name: impl Into<String>, location: u32, format: VertexFormat) -> Self {
        self.inputs.push(ShaderInput {
            name: name.into(),
            attribute: VertexAttribute {
                format,
                offset: 0,
                shader_location: location,
            },
        });
        self
    }

    /// Reflect the `@location` inputs of vertex entry point `entry_point`,
    /// ordered by location. Builtins are skipped.
    pub fn from_wgsl(source: &str, entry_point: &str) -> Result<Self, RenderError> {
        let module = naga::front::wgsl::parse_str(source)
            .map_err(|e| RenderError::Shader(e.emit_to_string(source)))?;
        let entry = module
            .entry_points
            .iter()
            .find(|ep| ep.stage == ShaderStage::Vertex && ep.name == entry_point)
            .ok_or_else(|| RenderError::Shader(format!("no vertex entry point '{entry_point}'")))?;

        let mut found: Vec<(String, u32, VertexFormat)> = Vec::new();
        let mut add = |name: Option<&String>,
                       binding: &Binding,
                       inner: &TypeInner|
         -> Result<(), RenderError> {
            let Binding::Location { location, .. } = binding else {
                return Ok(());
            };
            let name = name
                .cloned()
                .ok_or_else(|| RenderError::Shader(format!("input @location({location}) has no name")))?;
            let format = vertex_format(inner).ok_or_else(|| {
                RenderError::Shader(format!("input '{name}' is not a 32-bit float scalar or vector"))
            })?;
            found.push((name, *location, format));
            Ok(())
        };

        for arg in &entry.function.arguments {
            let inner = &module.types[arg.ty].inner;
            match (&arg.binding, inner) {
                (Some(binding), _) => add(arg.name.as_ref(), binding, inner)?,
                (None, TypeInner::Struct { members, .. }) => {
                    for member in members {
                        if let Some(binding) = &member.binding {
                            add(member.name.as_ref(), binding, &module.types[member.ty].inner)?;
                        }
                    }
                }
                (None, _) => {}
            }
        }

        found.sort_by_key(|(_, location, _)| *location);
        Ok(found
            .into_iter()
            .fold(Self::new(), |iface, (name, location, format)| {
                iface.with_input(name, location, format)
            }))
    }

    /// Inputs of `shaders/model.wgsl`, read from the shader itself.
    pub fn model_shader() -> Result<Self, RenderError> {
        Self::from_wgsl(MODEL_SHADER, MODEL_VERTEX_ENTRY)
    }

    pub fn inputs(&self) -> &[ShaderInput] {
        &self.inputs
    }

    /// Shader location of `name`, or `None` if the shader does not consume it.
    pub fn location_of(&self, name: &str) -> Option<u32> {
        self.inputs
            .iter()
            .find(|input| input.name == name)
            .map(ShaderInput::location)
    }

    /// One single-attribute layout per input, in slot order.
    pub fn vertex_buffer_layouts(&self) -> Vec<VertexBufferLayout<'_>> {
        self.inputs
            .iter()
            .map(|input| VertexBufferLayout {
                array_stride: input.attribute.format.size(),
                step_mode: VertexStepMode::Vertex,
                attributes: std::slice::from_ref(&input.attribute),
            })
            .collect()
    }
}

fn vertex_format(inner: &TypeInner) -> Option<VertexFormat> {
    const F32: Scalar = Scalar {
        kind: ScalarKind::Float,
        width: 4,
    };
    match *inner {
        TypeInner::Scalar(scalar) if scalar == F32 => Some(VertexFormat::Float32),
        TypeInner::Vector { size, scalar } if scalar == F32 => Some(match size {
            VectorSize::Bi => VertexFormat::Float32x2,
            VectorSize::Tri => VertexFormat::Float32x3,
            VectorSize::Quad => VertexFormat::Float32x4,
        }),
        _ => None,
    }
}

/// A vertex buffer bound to one slot.
struct AttributeBuffer {
    slot: u32,
    buffer: Buffer,
}

/// Static GPU copy of a [`MeshData`].
pub struct GpuMesh {
    attributes: Vec<AttributeBuffer>,
    index_buf: Buffer,
    index_count: u32,
}

impl GpuMesh {
    /// Upload one buffer per shader input. Mesh channels the shader does not
    /// consume are skipped.
    pub fn upload(
        device: &Device,
        mesh: &MeshData,
        interface: &ShaderInterface,
        label: &str,
    ) -> Result<Self, RenderError> {
        if !mesh.is_valid() {
            return Err(RenderError::EmptyMesh(label.to_owned()));
        }

        let kinds = interface
            .inputs()
            .iter()
            .map(ShaderInput::attribute_kind)
            .collect::<Result<Vec<_>, _>>()?;

        let attributes = kinds
            .iter()
            .enumerate()
            .map(|(slot, kind)| AttributeBuffer {
                slot: slot as u32,
                buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{label} {} VB", kind.name())),
                    contents: &kind.bytes(mesh),
                    usage: BufferUsages::VERTEX,
                }),
            })
            .collect();

        let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} IB")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: BufferUsages::INDEX,
        });

        log::info!(
            "Uploaded {}: {} vertices, {} indices, attributes {:?}",
            label,
            mesh.vertices.len(),
            mesh.indices.len(),
            kinds
        );

        Ok(Self {
            attributes,
            index_buf,
            index_count: mesh.indices.len() as u32,
        })
    }

    /// Bind the attribute buffers and issue one indexed triangle-list draw.
    pub fn draw(&self, pass: &mut RenderPass<'_>) {
        for attribute in &self.attributes {
            pass.set_vertex_buffer(attribute.slot, attribute.buffer.slice(..));
        }
        pass.set_index_buffer(self.index_buf.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    /// Free GPU memory now instead of waiting for the last handle to drop.
    pub(crate) fn destroy(&self) {
        for attribute in &self.attributes {
            attribute.buffer.destroy();
        }
        self.index_buf.destroy();
    }
}
