use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::canvas::OutpaintParams;
use crate::dataset::LoadOptions;

const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_DATA_DIR: &str = "EZPROMPTS_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub outpaint: OutpaintConfig,
    pub dataset: DatasetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Defaults for `OutpaintByAspectRatio`, stored by name so the file stays
/// readable; names are validated when converted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutpaintConfig {
    pub target_ratio: String,
    pub padding_position: String,
    pub interpolation: String,
    pub feathering: usize,
    pub multiple_of: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatasetConfig {
    pub sort_order: String,
    pub natural_sort: bool,
    pub case_sensitive: bool,
    pub resize_method: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Default for OutpaintConfig {
    fn default() -> Self {
        let params = OutpaintParams::default();
        Self {
            target_ratio: params.target_ratio,
            padding_position: params.padding.name().to_string(),
            interpolation: params.kernel.name().to_string(),
            feathering: params.feathering,
            multiple_of: params.multiple_of,
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        let options = LoadOptions::default();
        Self {
            sort_order: options.sort_order.name().to_string(),
            natural_sort: options.natural_sort,
            case_sensitive: options.case_sensitive,
            resize_method: options.resize_method.name().to_string(),
        }
    }
}

impl OutpaintConfig {
    pub fn to_params(&self) -> Result<OutpaintParams> {
        Ok(OutpaintParams {
            target_ratio: self.target_ratio.clone(),
            padding: self
                .padding_position
                .parse()
                .context("invalid outpaint.padding_position in config")?,
            kernel: self
                .interpolation
                .parse()
                .context("invalid outpaint.interpolation in config")?,
            feathering: self.feathering,
            multiple_of: self.multiple_of,
        })
    }

    /// Creation params for the `OutpaintByAspectRatio` node factory.
    pub fn node_params(&self) -> HashMap<String, serde_json::Value> {
        HashMap::from([
            ("target_ratio".to_string(), serde_json::json!(self.target_ratio)),
            (
                "padding_position".to_string(),
                serde_json::json!(self.padding_position),
            ),
            ("interpolation".to_string(), serde_json::json!(self.interpolation)),
            ("feathering".to_string(), serde_json::json!(self.feathering)),
            ("multiple_of".to_string(), serde_json::json!(self.multiple_of)),
        ])
    }
}

impl DatasetConfig {
    pub fn to_options(&self) -> Result<LoadOptions> {
        Ok(LoadOptions {
            sort_order: self
                .sort_order
                .parse()
                .context("invalid dataset.sort_order in config")?,
            natural_sort: self.natural_sort,
            case_sensitive: self.case_sensitive,
            resize_method: self
                .resize_method
                .parse()
                .context("invalid dataset.resize_method in config")?,
        })
    }

    /// Creation params for the `LoadImageSetSorted` node factory.
    pub fn node_params(&self) -> HashMap<String, serde_json::Value> {
        HashMap::from([
            ("sort_order".to_string(), serde_json::json!(self.sort_order)),
            ("natural_sort".to_string(), serde_json::json!(self.natural_sort)),
            ("case_sensitive".to_string(), serde_json::json!(self.case_sensitive)),
            ("resize_method".to_string(), serde_json::json!(self.resize_method)),
        ])
    }
}

impl AppConfig {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config TOML: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Check that every option stored by name parses.
    pub fn validate(&self) -> Result<()> {
        self.outpaint.to_params()?;
        self.dataset.to_options()?;
        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .context("config path does not have a parent directory")?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory: {}", parent.display()))?;

        let encoded = toml::to_string_pretty(self).context("failed to serialize config TOML")?;
        fs::write(path, encoded)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Input directory resolved against `data_dir` when relative.
    pub fn input_dir(&self, data_dir: &Path) -> PathBuf {
        resolve_relative_to(data_dir, &self.paths.input_dir)
    }

    pub fn output_dir(&self, data_dir: &Path) -> PathBuf {
        resolve_relative_to(data_dir, &self.paths.output_dir)
    }
}

/// Resolve the data directory with 3-tier priority:
/// 1. CLI override if provided
/// 2. EZPROMPTS_DATA_DIR environment variable
/// 3. Default: ./data
pub fn data_dir(cli_override: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_override {
        return path.to_path_buf();
    }

    if let Some(env_dir) = env::var_os(ENV_DATA_DIR) {
        return PathBuf::from(env_dir);
    }

    PathBuf::from("data")
}

/// Returns the path to config.toml within the given data directory.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE_NAME)
}

/// Create `data_dir` if missing and write a default config.toml only when
/// none exists yet.
pub fn initialize_data_dir(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
    }

    let cfg_path = config_path(data_dir);
    if !cfg_path.exists() {
        AppConfig::default().save_to_path(&cfg_path)?;
    }

    Ok(())
}

/// Returns `path` as-is if absolute, otherwise joins it to `base`.
pub fn resolve_relative_to(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{InterpolationKernel, PaddingPolicy};
    use crate::dataset::{BatchResizeMethod, SortOrder};

    #[test]
    fn default_config_has_expected_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.paths.input_dir, PathBuf::from("input"));
        assert_eq!(cfg.paths.output_dir, PathBuf::from("output"));

        assert_eq!(cfg.outpaint.target_ratio, "1:1");
        assert_eq!(cfg.outpaint.padding_position, "center");
        assert_eq!(cfg.outpaint.interpolation, "lanczos");
        assert_eq!(cfg.outpaint.feathering, 0);
        assert_eq!(cfg.outpaint.multiple_of, 8);

        assert_eq!(cfg.dataset.sort_order, "Ascending");
        assert!(cfg.dataset.natural_sort);
        assert!(!cfg.dataset.case_sensitive);
        assert_eq!(cfg.dataset.resize_method, "None");
    }

    #[test]
    fn toml_roundtrip_preserves_values() {
        let mut original = AppConfig::default();
        original.outpaint.feathering = 24;
        let encoded = toml::to_string_pretty(&original).expect("serialize config");
        let decoded: AppConfig = toml::from_str(&encoded).expect("deserialize config");
        assert_eq!(decoded, original);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let decoded: AppConfig =
            toml::from_str("[outpaint]\ntarget_ratio = \"9:16\"\n").expect("deserialize config");
        assert_eq!(decoded.outpaint.target_ratio, "9:16");
        assert_eq!(decoded.outpaint.multiple_of, 8);
        assert_eq!(decoded.paths, PathsConfig::default());
    }

    #[test]
    fn sections_convert_to_typed_values() {
        let mut cfg = AppConfig::default();
        cfg.outpaint.padding_position = "bottom/right".to_string();
        cfg.outpaint.interpolation = "bicubic".to_string();
        cfg.dataset.sort_order = "descending".to_string();
        cfg.dataset.resize_method = "Crop".to_string();

        let params = cfg.outpaint.to_params().expect("valid outpaint section");
        assert_eq!(params.padding, PaddingPolicy::Trailing);
        assert_eq!(params.kernel, InterpolationKernel::Bicubic);

        let options = cfg.dataset.to_options().expect("valid dataset section");
        assert_eq!(options.sort_order, SortOrder::Descending);
        assert_eq!(options.resize_method, BatchResizeMethod::Crop);
    }

    #[test]
    fn invalid_names_are_reported_with_context() {
        let mut cfg = AppConfig::default();
        cfg.outpaint.interpolation = "hermite".to_string();
        let err = cfg.outpaint.to_params().unwrap_err();
        assert_eq!(err.to_string(), "invalid outpaint.interpolation in config");
    }

    #[test]
    fn load_rejects_unknown_names() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[dataset]\nresize_method = \"Squash\"\n").expect("write config");

        let err = AppConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().starts_with("invalid config file"));
        assert!(format!("{err:#}").contains("invalid dataset.resize_method in config"));
    }

    #[test]
    fn node_params_are_accepted_by_the_registry() {
        let registry = crate::registry::build_default_registry();
        let cfg = AppConfig::default();
        registry
            .create("OutpaintByAspectRatio", cfg.outpaint.node_params())
            .expect("outpaint params should be valid");
        registry
            .create("LoadImageSetSorted", cfg.dataset.node_params())
            .expect("dataset params should be valid");
    }

    #[test]
    fn load_from_nonexistent_file_returns_defaults() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let loaded = AppConfig::load_from_path(&temp.path().join("missing.toml"))
            .expect("load config from nonexistent path");
        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[outpaint\n").expect("write broken config");
        let err = AppConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse config TOML"));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let result = data_dir(Some(Path::new("/custom")));
        assert_eq!(result, PathBuf::from("/custom"));
    }

    #[test]
    fn data_dir_env_then_default() {
        let previous = env::var_os(ENV_DATA_DIR);

        env::set_var(ENV_DATA_DIR, "/env/path");
        let from_env = data_dir(None);
        env::remove_var(ENV_DATA_DIR);
        let fallback = data_dir(None);

        if let Some(val) = previous {
            env::set_var(ENV_DATA_DIR, val);
        }

        assert_eq!(from_env, PathBuf::from("/env/path"));
        assert_eq!(fallback, PathBuf::from("data"));
    }

    #[test]
    fn config_path_is_data_dir_join_config_toml() {
        let result = config_path(Path::new("/data"));
        assert_eq!(result, PathBuf::from("/data/config.toml"));
    }

    #[test]
    fn io_dirs_resolve_against_data_dir() {
        let mut cfg = AppConfig::default();
        cfg.paths.output_dir = PathBuf::from("/abs/out");
        assert_eq!(cfg.input_dir(Path::new("/data")), PathBuf::from("/data/input"));
        assert_eq!(cfg.output_dir(Path::new("/data")), PathBuf::from("/abs/out"));
    }

    #[test]
    fn initialize_creates_data_dir_and_config() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let data = temp.path().join("nested/data");
        initialize_data_dir(&data).expect("initialize data dir");

        assert!(data.join("config.toml").exists());
        let loaded = AppConfig::load_from_path(&config_path(&data)).expect("reload config");
        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn initialize_preserves_existing_config() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let cfg_path = temp.path().join("config.toml");
        let custom_content = "[outpaint]\nfeathering = 32\n";
        fs::write(&cfg_path, custom_content).expect("write custom config");

        initialize_data_dir(temp.path()).expect("initialize data dir");

        let content = fs::read_to_string(&cfg_path).expect("read config");
        assert_eq!(content, custom_content);
    }
}
