//! MTL parser. A model carries a single material: when the library defines
//! several, the last value seen for each field wins.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use crate::{
    error::{AssetError, AssetResult},
    obj::{line_content, parse_f32, read_line},
};

/// Phong material coefficients plus an optional diffuse texture.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    /// `map_Kd` file name, relative to the MTL file.
    pub diffuse_texture: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            ambient: [0.1; 3],
            diffuse: [0.8; 3],
            specular: [1.0; 3],
            shininess: 32.0,
            diffuse_texture: None,
        }
    }
}

pub fn load_mtl_from_path(path: impl AsRef<Path>) -> AssetResult<Material> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| AssetError::io(path, e))?;
    let material = parse_mtl(BufReader::new(file), path).map_err(|e| e.in_file(path))?;
    log::info!(
        "Loaded MTL {}: Kd={:?}, Ns={}, map_Kd={:?}",
        path.display(),
        material.diffuse,
        material.shininess,
        material.diffuse_texture
    );
    Ok(material)
}

pub fn load_mtl_from_reader<R: BufRead>(reader: R) -> AssetResult<Material> {
    parse_mtl(reader, Path::new("<reader>"))
}

pub fn load_mtl_from_str(contents: &str) -> AssetResult<Material> {
    parse_mtl(io::Cursor::new(contents), Path::new("<string>"))
}

fn parse_mtl<R: BufRead>(reader: R, source: &Path) -> AssetResult<Material> {
    let mut material = Material::default();

    for (line_idx, line) in reader.lines().enumerate() {
        let line_no = line_idx + 1;
        let line = read_line(line, line_no, source)?;
        let trimmed = line_content(&line, line_no);
        if trimmed.is_empty() {
            continue;
        }

        let (tag, rest) = trimmed
            .split_once(char::is_whitespace)
            .unwrap_or((trimmed, ""));
        let mut parts = rest.split_whitespace();

        match tag {
            "newmtl" => material.name = Some(rest.trim().to_owned()),
            "Ka" => material.ambient = parse_rgb(&mut parts, line_no, "Ka")?,
            "Kd" => material.diffuse = parse_rgb(&mut parts, line_no, "Kd")?,
            "Ks" => material.specular = parse_rgb(&mut parts, line_no, "Ks")?,
            "Ns" => material.shininess = parse_f32(parts.next(), line_no, "Ns")?,
            "map_Kd" => {
                let file = rest.trim();
                if file.is_empty() {
                    return Err(AssetError::format(line_no, "map_Kd without a file name"));
                }
                material.diffuse_texture = Some(file.to_owned());
            }
            other => log::debug!("Ignoring MTL directive '{}' on line {}", other, line_no),
        }
    }

    Ok(material)
}

fn parse_rgb<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    line_no: usize,
    what: &str,
) -> AssetResult<[f32; 3]> {
    Ok([
        parse_f32(parts.next(), line_no, &format!("{what} red"))?,
        parse_f32(parts.next(), line_no, &format!("{what} green"))?,
        parse_f32(parts.next(), line_no, &format!("{what} blue"))?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parses_phong_coefficients() {
        let src = "newmtl felt\nKa 0.2 0.2 0.2\nKd 0.5 0.5 0.5\nKs 0.1 0.0 0.3\nNs 10\nmap_Kd felt.png\nillum 2\n";
        let m = load_mtl_from_str(src).expect("parse mtl");
        assert_eq!(m.name.as_deref(), Some("felt"));
        assert_eq!(m.ambient, [0.2, 0.2, 0.2]);
        assert_eq!(m.diffuse, [0.5, 0.5, 0.5]);
        assert_eq!(m.specular, [0.1, 0.0, 0.3]);
        assert_eq!(m.shininess, 10.0);
        assert_eq!(m.diffuse_texture.as_deref(), Some("felt.png"));
    }

    #[test]
    fn defaults_survive_when_unset() {
        let m = load_mtl_from_str("# nothing here\nd 1.0\n").expect("parse mtl");
        assert_eq!(m, Material::default());
    }

    #[test]
    fn last_seen_value_wins() {
        let src = "newmtl a\nKd 1 0 0\nnewmtl b\nKd 0 1 0\n";
        let m = load_mtl_from_str(src).expect("parse mtl");
        assert_eq!(m.name.as_deref(), Some("b"));
        assert_eq!(m.diffuse, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn texture_path_keeps_spaces() {
        let m = load_mtl_from_str("map_Kd textures/green felt.jpg\n").expect("parse mtl");
        assert_eq!(m.diffuse_texture.as_deref(), Some("textures/green felt.jpg"));
    }

    #[test]
    fn bom_comments_and_bad_bytes() {
        let m = load_mtl_from_str("\u{feff}Kd 0.5 0.5 0.5 # grey\n").expect("parse mtl");
        assert_eq!(m.diffuse, [0.5, 0.5, 0.5]);

        let err = load_mtl_from_reader(&b"Ns 10\nmap_Kd \xfe.png\n"[..]).expect_err("not utf-8");
        assert!(matches!(err, AssetError::Format { line: 2, .. }));
    }

    #[test]
    fn malformed_coefficient_is_format_error() {
        let err = load_mtl_from_str("Kd 0.5 half 0.5\n").expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::Format);
        let err = load_mtl_from_str("Ks 1 1\n").expect_err("must fail");
        assert!(matches!(err, AssetError::Format { line: 1, .. }));
    }
}
