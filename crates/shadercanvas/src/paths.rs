use std::env;
use std::path::PathBuf;

use directories_next::ProjectDirs;

pub const ENV_CONFIG: &str = "SHADERCANVAS_CONFIG";
pub const CONFIG_FILE: &str = "canvas.toml";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "ShaderCanvas";
const APPLICATION: &str = "ShaderCanvas";

/// Config file used when `--config` is absent.
///
/// `$SHADERCANVAS_CONFIG` wins whenever it is set. Otherwise the platform
/// config directory's `canvas.toml` is returned only if it exists.
pub fn default_config_file() -> Option<PathBuf> {
    if let Some(path) = env_override(ENV_CONFIG) {
        return Some(path);
    }

    let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)?;
    let candidate = project_dirs.config_dir().join(CONFIG_FILE);
    candidate.is_file().then_some(candidate)
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
