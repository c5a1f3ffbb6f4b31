//! Model loading: OBJ geometry, its `mtllib` material and the material's
//! diffuse texture, resolved relative to the files that reference them.

use std::path::{Path, PathBuf};

use crate::{
    error::AssetResult,
    mesh::MeshData,
    mtl::{Material, load_mtl_from_path},
    obj::{ObjOptions, load_obj_from_path},
    texture::TextureData,
};

/// Everything needed to install a model on the GPU.
#[derive(Clone, Debug)]
pub struct ModelData {
    pub source: PathBuf,
    pub mesh: MeshData,
    pub material: Material,
    pub diffuse_texture: Option<TextureData>,
}

/// Load an OBJ and, when referenced, its material library and diffuse texture.
/// Any failure aborts the whole load.
pub fn load_model(obj_path: impl AsRef<Path>, options: &ObjOptions) -> AssetResult<ModelData> {
    let obj_path = obj_path.as_ref();
    let doc = load_obj_from_path(obj_path, options)?;

    let (material, mtl_dir) = match &doc.material_library {
        Some(name) => {
            let mtl_path = sibling(obj_path, name);
            let material = load_mtl_from_path(&mtl_path)?;
            (material, parent_dir(&mtl_path))
        }
        None => {
            log::info!("{} has no mtllib; using default material", obj_path.display());
            (Material::default(), parent_dir(obj_path))
        }
    };

    let diffuse_texture = match &material.diffuse_texture {
        Some(file) => Some(TextureData::load(mtl_dir.join(file))?),
        None => None,
    };

    Ok(ModelData {
        source: obj_path.to_path_buf(),
        mesh: doc.mesh,
        material,
        diffuse_texture,
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn sibling(path: &Path, name: &str) -> PathBuf {
    parent_dir(path).join(name)
}
