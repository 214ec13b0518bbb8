use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "shadercanvas",
    author,
    version,
    about = "Run a ShaderToy-style fragment shader in a window",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(flatten)]
    pub canvas: CanvasArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read both shaders and decode every texture without opening a window.
    Check(CanvasArgs),
}

#[derive(Parser, Debug, Clone, Default)]
pub struct CanvasArgs {
    /// Canvas TOML file; defaults to `$SHADERCANVAS_CONFIG` or the user config dir.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Vertex shader source.
    #[arg(long, value_name = "PATH")]
    pub vertex: Option<PathBuf>,

    /// Fragment shader source.
    #[arg(long, value_name = "PATH")]
    pub fragment: Option<PathBuf>,

    /// Texture for the next channel; repeat to fill `texture0`, `texture1`, ...
    #[arg(long = "texture", value_name = "PATH")]
    pub textures: Vec<PathBuf>,

    /// Number of texture channels to load (defaults to the textures supplied).
    #[arg(long = "textures", value_name = "N")]
    pub texture_count: Option<usize>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Frame cap (0=uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Freeze `iTime` at this offset (seconds or e.g. `2s 500ms`).
    #[arg(long, value_name = "SECONDS", value_parser = parse_still_time)]
    pub still_time: Option<Duration>,

    /// Window title.
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in size '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in size '{trimmed}'"))?;

    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}

pub fn parse_still_time(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("still time must not be empty".to_string());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(format!("still time '{trimmed}' must be a non-negative number"));
        }
        return Ok(Duration::from_secs_f64(seconds));
    }

    humantime::parse_duration(trimmed).map_err(|err| format!("invalid still time '{trimmed}': {err}"))
}
