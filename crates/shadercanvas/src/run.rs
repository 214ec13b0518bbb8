use std::path::Path;

use anyhow::{bail, Context, Result};
use canvasconfig::CanvasConfig;
use renderer::gpu::channels::decode_channel;
use renderer::gpu::program::read_stage;
use renderer::{
    CanvasOptions, Renderer, RendererConfig, ShaderSources, ShaderStage, TimePolicy,
};
use tracing_subscriber::EnvFilter;

use crate::cli::CanvasArgs;
use crate::paths;

pub fn initialise_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(args: CanvasArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    tracing::info!(
        vertex = ?config.sources.shader(ShaderStage::Vertex),
        fragment = ?config.sources.shader(ShaderStage::Fragment),
        textures = config.options.texture_count,
        width = config.surface_size.0,
        height = config.surface_size.1,
        fps = ?config.target_fps,
        "launching canvas"
    );
    Renderer::new(config).run()
}

/// Loads everything activation would load, minus the GPU, and prints what it
/// found.
pub fn check(args: CanvasArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let sources = &config.sources;

    for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
        let path = sources
            .shader(stage)
            .with_context(|| format!("no {stage} shader configured"))?;
        let source = read_stage(stage, path)?;
        if source.trim().is_empty() {
            bail!("{stage} shader {} is empty", path.display());
        }
        println!("{:<9} {} ({} bytes)", stage.key(), path.display(), source.len());
    }

    for channel in 0..config.options.texture_count {
        let path = sources
            .texture(channel)
            .with_context(|| format!("texture{channel} is not configured"))?;
        let image = decode_channel(channel, path)?;
        println!(
            "{:<9} {} {}x{}",
            format!("texture{channel}"),
            path.display(),
            image.width,
            image.height
        );
    }

    println!(
        "ok: 2 shaders, {} texture channel(s)",
        config.options.texture_count
    );
    Ok(())
}

/// Combines the config file (explicit or default) with CLI overrides.
pub fn resolve_config(args: &CanvasArgs) -> Result<RendererConfig> {
    let config_path = args.config.clone().or_else(paths::default_config_file);
    let file = match config_path {
        Some(path) => Some(load_config(&path)?),
        None => None,
    };
    merge(args, file)
}

fn load_config(path: &Path) -> Result<CanvasConfig> {
    let config = CanvasConfig::load(path)
        .with_context(|| format!("failed to load canvas config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded canvas config");
    Ok(config)
}

fn merge(args: &CanvasArgs, file: Option<CanvasConfig>) -> Result<RendererConfig> {
    let mut config = RendererConfig::default();
    let mut file_texture_count = None;
    let mut still_time = None;
    let mut fps = None;

    if let Some(file) = file {
        config.sources = file.sources.into_iter().collect();
        let window = file.window;
        if let Some(title) = window.title {
            config.title = title;
        }
        let (default_width, default_height) = config.surface_size;
        config.surface_size = (
            window.width.unwrap_or(default_width),
            window.height.unwrap_or(default_height),
        );
        file_texture_count = window.textures;
        still_time = window.still_time;
        fps = window.fps;
    }

    apply_overrides(&mut config.sources, args);
    if let Some(title) = &args.title {
        config.title = title.clone();
    }
    if let Some(size) = args.size {
        config.surface_size = size;
    }
    let fps = args.fps.or(fps);
    if let Some(value) = fps {
        if !value.is_finite() || value < 0.0 {
            bail!("fps must be a non-negative number, got {value}");
        }
    }
    config.target_fps = fps.filter(|value| *value > 0.0);

    let texture_count = args
        .texture_count
        .or(file_texture_count)
        .unwrap_or_else(|| config.sources.contiguous_texture_count());
    let time_policy = match args.still_time.or(still_time) {
        Some(offset) => TimePolicy::Still {
            time: offset.as_secs_f32(),
        },
        None => TimePolicy::Realtime,
    };
    config.options = CanvasOptions {
        texture_count,
        time_policy,
    };

    config
        .sources
        .validate(texture_count)
        .context("pass --vertex/--fragment/--texture or list them under [sources] in the config")?;
    Ok(config)
}

fn apply_overrides(sources: &mut ShaderSources, args: &CanvasArgs) {
    if let Some(vertex) = &args.vertex {
        sources.insert(ShaderStage::Vertex.key(), vertex.clone());
    }
    if let Some(fragment) = &args.fragment {
        sources.insert(ShaderStage::Fragment.key(), fragment.clone());
    }
    for (channel, path) in args.textures.iter().enumerate() {
        sources.set_texture(channel, path.clone());
    }
}
