//! OBJ parser for triangle meshes with positions, texcoords and normals.
//!
//! Faces must be triangles (`f a b c`); each corner becomes its own vertex,
//! so the index buffer is simply `0..3 * faces`.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use crate::{
    error::{AssetError, AssetResult},
    mesh::{MeshData, MeshVertex},
};

/// What to do with an optional vertex channel (texcoord or normal).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AttributePolicy {
    /// Never emit the channel; it stays zero.
    Ignore,
    /// Emit when the corner references it and the source array is non-empty.
    /// A reference into an empty source array is skipped (channel stays zero).
    #[default]
    Optional,
    /// Every corner must reference the channel and the reference must resolve.
    Required,
}

/// Which vertex channels the parser emits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObjOptions {
    pub texcoords: AttributePolicy,
    pub normals: AttributePolicy,
}

impl ObjOptions {
    /// Positions only.
    pub const POSITIONS: Self = Self {
        texcoords: AttributePolicy::Ignore,
        normals: AttributePolicy::Ignore,
    };

    /// Positions and texcoords; normals ignored.
    pub const TEXTURED: Self = Self {
        texcoords: AttributePolicy::Required,
        normals: AttributePolicy::Ignore,
    };

    /// Every corner must be `v/vt/vn`.
    pub const STRICT: Self = Self {
        texcoords: AttributePolicy::Required,
        normals: AttributePolicy::Required,
    };
}

/// Number of records of each kind seen while parsing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObjCounts {
    pub positions: usize,
    pub texcoords: usize,
    pub normals: usize,
    pub faces: usize,
}

/// Parsed OBJ file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjDocument {
    pub mesh: MeshData,
    /// Last `mtllib` reference, as written in the file.
    pub material_library: Option<String>,
    pub counts: ObjCounts,
}

/// Load an OBJ file from a path.
pub fn load_obj_from_path(path: impl AsRef<Path>, options: &ObjOptions) -> AssetResult<ObjDocument> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| AssetError::io(path, e))?;
    let doc = parse_obj(BufReader::new(file), options, path).map_err(|e| e.in_file(path))?;
    log::info!(
        "Loaded OBJ {}: {} positions, {} texcoords, {} normals, {} triangles",
        path.display(),
        doc.counts.positions,
        doc.counts.texcoords,
        doc.counts.normals,
        doc.counts.faces
    );
    Ok(doc)
}

/// Load an OBJ mesh from a [`BufRead`] implementation.
pub fn load_obj_from_reader<R: BufRead>(reader: R, options: &ObjOptions) -> AssetResult<ObjDocument> {
    parse_obj(reader, options, Path::new("<reader>"))
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str, options: &ObjOptions) -> AssetResult<ObjDocument> {
    parse_obj(io::Cursor::new(contents), options, Path::new("<string>"))
}

/// One face corner as written: raw 1-based (or negative) indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FaceRef {
    position: i64,
    texcoord: Option<i64>,
    normal: Option<i64>,
}

fn parse_obj<R: BufRead>(reader: R, options: &ObjOptions, source: &Path) -> AssetResult<ObjDocument> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();

    let mut vertices: Vec<MeshVertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut material_library = None;
    let mut faces = 0usize;

    for (line_idx, line) in reader.lines().enumerate() {
        let line_no = line_idx + 1;
        let line = read_line(line, line_no, source)?;
        let trimmed = line_content(&line, line_no);
        if trimmed.is_empty() {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else { continue };

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                positions.push([x, y, z]);
            }
            "vt" => {
                let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                let v = parse_f32(parts.next(), line_no, "v coordinate")?;
                texcoords.push([u, v]);
            }
            "vn" => {
                let nx = parse_f32(parts.next(), line_no, "nx coordinate")?;
                let ny = parse_f32(parts.next(), line_no, "ny coordinate")?;
                let nz = parse_f32(parts.next(), line_no, "nz coordinate")?;
                normals.push([nx, ny, nz]);
            }
            "f" => {
                let corners: Vec<&str> = parts.collect();
                if corners.len() != 3 {
                    return Err(AssetError::format(
                        line_no,
                        format!("face must have exactly 3 vertices, found {}", corners.len()),
                    ));
                }
                for token in corners {
                    let face_ref = parse_face_ref(token, line_no)?;
                    let vertex =
                        resolve_corner(face_ref, &positions, &texcoords, &normals, options, line_no)?;
                    let index = u32::try_from(vertices.len()).map_err(|_| {
                        AssetError::format(line_no, format!("too many vertices (>{})", u32::MAX))
                    })?;
                    vertices.push(vertex);
                    indices.push(index);
                }
                faces += 1;
            }
            "mtllib" => {
                let name = parts.next().ok_or_else(|| {
                    AssetError::format(line_no, "mtllib without a file name")
                })?;
                material_library = Some(name.to_owned());
            }
            other => {
                log::debug!("Ignoring OBJ directive '{}' on line {}", other, line_no);
            }
        }
    }

    Ok(ObjDocument {
        mesh: MeshData::new(vertices, indices),
        material_library,
        counts: ObjCounts {
            positions: positions.len(),
            texcoords: texcoords.len(),
            normals: normals.len(),
            faces,
        },
    })
}

/// Unwrap a line from `BufRead::lines`. Bytes that are not UTF-8 are a
/// content problem, not an I/O one.
pub(crate) fn read_line(line: io::Result<String>, line_no: usize, source: &Path) -> AssetResult<String> {
    line.map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData => AssetError::format(line_no, "invalid UTF-8"),
        _ => AssetError::io(source, e),
    })
}

/// Meaningful part of a line: leading BOM on line 1 and `#` comments removed, trimmed.
pub(crate) fn line_content(line: &str, line_no: usize) -> &str {
    let line = if line_no == 1 {
        line.strip_prefix('\u{feff}').unwrap_or(line)
    } else {
        line
    };
    let line = line.split_once('#').map_or(line, |(before, _)| before);
    line.trim()
}

pub(crate) fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> AssetResult<f32> {
    let token = value.ok_or_else(|| AssetError::format(line_no, format!("missing {what}")))?;
    token
        .parse::<f32>()
        .map_err(|_| AssetError::format(line_no, format!("invalid {what} '{token}'")))
}

/// Split a corner token into its index fields using the first and last `/`:
/// `v`, `v/vt`, `v/vt/vn` and `v//vn`.
fn parse_face_ref(token: &str, line_no: usize) -> AssetResult<FaceRef> {
    let (pos, tex, norm) = match token.find('/') {
        None => (token, None, None),
        Some(first) => {
            let last = token.rfind('/').unwrap_or(first);
            if first == last {
                (&token[..first], Some(&token[first + 1..]), None)
            } else {
                (
                    &token[..first],
                    Some(&token[first + 1..last]),
                    Some(&token[last + 1..]),
                )
            }
        }
    };

    let field = |value: &str| -> AssetResult<i64> {
        value.parse::<i64>().map_err(|_| {
            AssetError::format(line_no, format!("invalid index '{value}' in face element '{token}'"))
        })
    };
    let optional = |value: Option<&str>| -> AssetResult<Option<i64>> {
        match value {
            Some(v) if !v.is_empty() => field(v).map(Some),
            _ => Ok(None),
        }
    };

    Ok(FaceRef {
        position: field(pos)?,
        texcoord: optional(tex)?,
        normal: optional(norm)?,
    })
}

fn resolve_corner(
    face_ref: FaceRef,
    positions: &[[f32; 3]],
    texcoords: &[[f32; 2]],
    normals: &[[f32; 3]],
    options: &ObjOptions,
    line_no: usize,
) -> AssetResult<MeshVertex> {
    let position = positions[resolve_index(face_ref.position, positions.len(), "position", line_no)?];
    let uv = resolve_channel(face_ref.texcoord, texcoords, options.texcoords, "texcoord", line_no)?;
    let normal = resolve_channel(face_ref.normal, normals, options.normals, "normal", line_no)?;
    Ok(MeshVertex::new(
        position,
        uv.unwrap_or_default(),
        normal.unwrap_or_default(),
    ))
}

fn resolve_channel<T: Copy>(
    raw: Option<i64>,
    source: &[T],
    policy: AttributePolicy,
    what: &str,
    line_no: usize,
) -> AssetResult<Option<T>> {
    match (policy, raw) {
        (AttributePolicy::Ignore, _) => Ok(None),
        (AttributePolicy::Optional, None) => Ok(None),
        (AttributePolicy::Optional, Some(_)) if source.is_empty() => {
            log::debug!("Skipping {} reference on line {}: no {} records", what, line_no, what);
            Ok(None)
        }
        (AttributePolicy::Required, None) => Err(AssetError::format(
            line_no,
            format!("face element is missing its {what} index"),
        )),
        (_, Some(raw)) => Ok(Some(source[resolve_index(raw, source.len(), what, line_no)?])),
    }
}

/// Convert a 1-based (or negative, relative) OBJ index into a checked 0-based one.
fn resolve_index(raw: i64, len: usize, what: &str, line_no: usize) -> AssetResult<usize> {
    if raw == 0 {
        return Err(AssetError::format(
            line_no,
            format!("{what} index 0 is invalid; OBJ indices are 1-based"),
        ));
    }

    let idx = if raw > 0 { raw - 1 } else { len as i64 + raw };

    if idx < 0 || idx as usize >= len {
        return Err(AssetError::format(
            line_no,
            format!("{what} index {raw} out of range (have {len})"),
        ));
    }

    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn parse(src: &str) -> AssetResult<ObjDocument> {
        load_obj_from_str(src, &ObjOptions::default())
    }

    #[test]
    fn parse_simple_triangle() {
        let doc = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3").expect("parse triangle");
        let mesh = &doc.mesh;
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn full_triplets_resolve_every_channel() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
        "#;
        let doc = load_obj_from_str(src, &ObjOptions::STRICT).expect("parse triangle");
        assert_eq!(doc.mesh.vertices.len(), 3);
        assert_eq!(doc.mesh.vertices[1].uv, [1.0, 0.0]);
        assert_eq!(doc.mesh.vertices[2].normal, [0.0, 0.0, 1.0]);
        assert!(doc.mesh.is_valid());
    }

    #[test]
    fn index_count_is_three_per_face_without_dedup() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3\nf 2 4 3\nf 1 2 3\n";
        let doc = parse(src).expect("parse quad");
        assert_eq!(doc.counts.faces, 3);
        assert_eq!(doc.mesh.indices.len(), 9);
        assert_eq!(doc.mesh.vertices.len(), 9);
        assert_eq!(doc.mesh.indices, (0..9).collect::<Vec<u32>>());
    }

    #[test]
    fn one_based_reference_resolves_to_previous_element() {
        let src = "v 1 1 1\nv 2 2 2\nv 3 3 3\nvt 0.1 0.2\nvt 0.3 0.4\nvn 1 0 0\nvn 0 1 0\nf 3/2/2 1/1/1 2/2/1\n";
        let doc = parse(src).expect("parse");
        let first = doc.mesh.vertices[0];
        assert_eq!(first.position, [3.0, 3.0, 3.0]);
        assert_eq!(first.uv, [0.3, 0.4]);
        assert_eq!(first.normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn empty_texcoord_field_is_accepted() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nvn 0 1 0\nf 1//2 2//2 3//1\n";
        let doc = parse(src).expect("v//vn parses");
        let v = doc.mesh.vertices[0];
        assert_eq!(v.uv, [0.0, 0.0]);
        assert_eq!(v.normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn position_texcoord_form_has_no_normal() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.5\nf 1/1 2/1 3/1\n";
        let doc = load_obj_from_str(src, &ObjOptions::TEXTURED).expect("v/vt parses");
        assert!(doc.mesh.vertices.iter().all(|v| v.uv == [0.5, 0.5]));
        assert!(doc.mesh.vertices.iter().all(|v| v.normal == [0.0; 3]));
    }

    #[test]
    fn out_of_range_position_is_format_error() {
        let err = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9").expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(matches!(err, AssetError::Format { line: 4, .. }));
    }

    #[test]
    fn zero_index_is_rejected() {
        let err = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2").expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn negative_indices_are_relative() {
        let doc = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1").expect("relative");
        assert_eq!(doc.mesh.vertices[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn malformed_number_is_format_error() {
        let err = parse("v 0 zero 0").expect_err("must fail");
        assert!(matches!(err, AssetError::Format { line: 1, .. }));
        let err = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 x 3").expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn non_triangle_faces_are_rejected() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3 4";
        assert!(matches!(parse(src), Err(AssetError::Format { line: 5, .. })));
    }

    #[test]
    fn optional_reference_into_empty_array_is_skipped() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/1/1 2/1/1 3/1/1\n";
        let doc = parse(src).expect("optional channels fall back to zero");
        assert_eq!(doc.mesh.vertices[0].uv, [0.0, 0.0]);
        assert_eq!(doc.mesh.vertices[0].normal, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn required_channel_must_be_present() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n";
        let err = load_obj_from_str(src, &ObjOptions::STRICT).expect_err("texcoord missing");
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn optional_out_of_range_reference_still_fails() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nf 1/4 2/1 3/1\n";
        assert!(parse(src).is_err());
    }

    #[test]
    fn ignored_channels_stay_zero() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 1 1\nvn 0 0 1\nf 1/1/1 2/1/1 3/1/1\n";
        let doc = load_obj_from_str(src, &ObjOptions::POSITIONS).expect("parse");
        assert!(doc.mesh.vertices.iter().all(|v| v.uv == [0.0; 2] && v.normal == [0.0; 3]));
    }

    #[test]
    fn mtllib_and_unknown_tags() {
        let src = "# table\nmtllib table.mtl\no Table\ns off\nusemtl felt\nv 0 0 0\n";
        let doc = parse(src).expect("parse");
        assert_eq!(doc.material_library.as_deref(), Some("table.mtl"));
        assert!(!doc.mesh.is_valid());
        assert_eq!(doc.counts.positions, 1);
    }

    #[test]
    fn invalid_utf8_is_format_error() {
        let err = load_obj_from_reader(&b"v 0 0 0\nv \xff 0 0\n"[..], &ObjOptions::default())
            .expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(matches!(err, AssetError::Format { line: 2, .. }));
    }

    #[test]
    fn leading_bom_is_skipped() {
        let doc = parse("\u{feff}v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3").expect("bom");
        assert_eq!(doc.counts.positions, 3);
        assert_eq!(doc.mesh.vertices[0].position, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn trailing_comments_are_ignored() {
        let doc = parse("v 0 0 0 # origin\nv 1 0 0\nv 0 1 0\nf 1 2 3 # tri").expect("comments");
        assert_eq!(doc.mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_obj_from_path("does/not/exist.obj", &ObjOptions::default())
            .expect_err("missing file");
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
