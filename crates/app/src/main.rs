//! Entry point: logging + command-line flags, then hand over to `platform`.

use std::path::PathBuf;

use anyhow::Result;
use platform::AppConfig;

fn parse_backend(val: &str) -> wgpu::Backends {
    match val.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        other => {
            log::warn!("Unknown backend '{}', falling back to auto.", other);
            wgpu::Backends::all()
        }
    }
}

/// Accepts `--gpu-backend=`, `--size=WxH`, `--width=`, `--height=`,
/// `--model=` and `--no-minimap`. Unknown arguments are ignored.
fn parse_args<I: IntoIterator<Item = String>>(args: I) -> AppConfig {
    let mut config = AppConfig::default();

    for arg in args {
        if let Some(val) = arg.strip_prefix("--gpu-backend=") {
            config.backends = parse_backend(val);
        } else if let Some(v) = arg.strip_prefix("--size=") {
            if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                    config.width = pw;
                    config.height = ph;
                }
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            if let Ok(pw) = v.parse::<u32>() {
                config.width = pw;
            }
        } else if let Some(v) = arg.strip_prefix("--height=") {
            if let Ok(ph) = v.parse::<u32>() {
                config.height = ph;
            }
        } else if let Some(v) = arg.strip_prefix("--model=") {
            config.model_path = PathBuf::from(v);
        } else if arg == "--no-minimap" {
            config.minimap = false;
        }
    }

    config.width = config.width.max(1);
    config.height = config.height.max(1);
    config
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = parse_args(std::env::args().skip(1));
    log::info!(
        "Starting billiard viewer. Backend: {:?}, model={}, minimap={}, window_size={}x{}",
        config.backends,
        config.model_path.display(),
        config.minimap,
        config.width,
        config.height
    );

    platform::run(config)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> AppConfig {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_without_flags() {
        let config = args(&[]);
        assert_eq!((config.width, config.height), (800, 500));
        assert!(config.minimap);
    }

    #[test]
    fn size_and_model_flags() {
        let config = args(&["--size=1024x768", "--model=scenes/pool.obj", "--no-minimap"]);
        assert_eq!((config.width, config.height), (1024, 768));
        assert_eq!(config.model_path, PathBuf::from("scenes/pool.obj"));
        assert!(!config.minimap);
    }

    #[test]
    fn backend_flag_and_bad_sizes() {
        let config = args(&["--gpu-backend=VK", "--width=0", "--height=abc"]);
        assert_eq!(config.backends, wgpu::Backends::VULKAN);
        assert_eq!(config.width, 1);
        assert_eq!(config.height, 500);
    }
}
