//! Asset loading/parsers: OBJ geometry, MTL materials and textures.
//! Everything here is CPU-side; GPU upload lives in `renderer`.

pub mod error;
pub mod mesh;
pub mod model;
pub mod mtl;
pub mod obj;
pub mod texture;

pub use error::{AssetError, AssetResult, ErrorKind};
pub use mesh::{MeshData, MeshVertex};
pub use model::{ModelData, load_model};
pub use mtl::Material;
pub use obj::{AttributePolicy, ObjDocument, ObjOptions};
pub use texture::{TextureData, TextureFormat};
