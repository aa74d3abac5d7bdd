use crate::budget::{BudgetRequest, ModelLimits};
use crate::error::{Result, ToolkitError};
use config::{Config, Environment, File, Map};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolkitConfig {
    #[serde(default)]
    pub budget: BudgetDefaults,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Planner inputs used when the command line does not give them.
///
/// The model-specific limits are optional; when unset they come from the
/// model catalogue entry for `model`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub context_window: Option<i64>,
    #[serde(default)]
    pub betas_max_tokens: Option<i64>,
    #[serde(default)]
    pub thinking_hard_cap: Option<i64>,
    #[serde(default = "default_thinking_budget_tokens")]
    pub thinking_budget_tokens: i64,
    #[serde(default = "default_desired_output_tokens")]
    pub desired_output_tokens: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,
}

fn default_model() -> String {
    ModelLimits::default_model().id.clone()
}

fn default_thinking_budget_tokens() -> i64 {
    32_000
}

fn default_desired_output_tokens() -> i64 {
    12_000
}

fn default_save_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for BudgetDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            context_window: None,
            betas_max_tokens: None,
            thinking_hard_cap: None,
            thinking_budget_tokens: default_thinking_budget_tokens(),
            desired_output_tokens: default_desired_output_tokens(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_dir: default_save_dir(),
        }
    }
}

/// Per-invocation values from the command line.
#[derive(Debug, Clone, Default)]
pub struct BudgetOverrides {
    pub model: Option<String>,
    pub context_window: Option<i64>,
    pub betas_max_tokens: Option<i64>,
    pub thinking_budget_tokens: Option<i64>,
    pub desired_output_tokens: Option<i64>,
    pub thinking_hard_cap: Option<i64>,
}

impl BudgetDefaults {
    /// Resolve the limits to plan with.
    ///
    /// Precedence: command-line flag, then the catalogue entry when a model
    /// was named on the command line, then this configuration, then the
    /// catalogue entry for the configured model.
    pub fn resolve(&self, overrides: &BudgetOverrides, prompt_tokens: i64) -> Result<BudgetRequest> {
        let model_id = overrides.model.as_deref().unwrap_or(&self.model);
        let limits = ModelLimits::get_by_id(model_id)
            .ok_or_else(|| ToolkitError::UnknownModel(model_id.to_string()))?;

        let configured = |value: Option<i64>| {
            if overrides.model.is_some() { None } else { value }
        };

        Ok(BudgetRequest {
            context_window: overrides
                .context_window
                .or(configured(self.context_window))
                .unwrap_or(limits.context_window),
            prompt_tokens,
            max_output_tokens_cap: overrides
                .betas_max_tokens
                .or(configured(self.betas_max_tokens))
                .unwrap_or_else(|| limits.output_cap()),
            desired_output_tokens: overrides
                .desired_output_tokens
                .unwrap_or(self.desired_output_tokens),
            requested_thinking_tokens: overrides
                .thinking_budget_tokens
                .unwrap_or(self.thinking_budget_tokens),
            thinking_hard_cap: overrides
                .thinking_hard_cap
                .or(configured(self.thinking_hard_cap))
                .unwrap_or(limits.thinking_hard_cap),
        })
    }
}

impl ToolkitConfig {
    /// Update one setting from its command-line key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parse = |v: &str| -> Result<i64> {
            v.parse::<i64>().map_err(|e| {
                ToolkitError::Configuration(format!("Invalid value '{}' for {}: {}", v, key, e))
            })
        };

        match key {
            "model" => {
                if ModelLimits::get_by_id(value).is_none() {
                    return Err(ToolkitError::UnknownModel(value.to_string()));
                }
                self.budget.model = value.to_string();
            }
            "save-dir" => self.output.save_dir = PathBuf::from(value),
            "context-window" => self.budget.context_window = Some(parse(value)?),
            "betas-max-tokens" => self.budget.betas_max_tokens = Some(parse(value)?),
            "thinking-hard-cap" => self.budget.thinking_hard_cap = Some(parse(value)?),
            "thinking-budget-tokens" => self.budget.thinking_budget_tokens = parse(value)?,
            "desired-output-tokens" => self.budget.desired_output_tokens = parse(value)?,
            other => {
                return Err(ToolkitError::Configuration(format!(
                    "Unknown config key: '{}'. Valid keys: model, save-dir, context-window, \
                     betas-max-tokens, thinking-hard-cap, thinking-budget-tokens, desired-output-tokens",
                    other
                )));
            }
        }
        Ok(())
    }
}

pub struct ConfigManager {
    config: ToolkitConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_path_internal()?;
        Self::from_path(config_path)
    }

    pub fn from_path(config_path: PathBuf) -> Result<Self> {
        let config = Self::load_or_default(&config_path, None)?;

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Like [`ConfigManager::from_path`], but reads `NOVELKIT_*` variables from
    /// `vars` instead of the process environment.
    pub fn from_path_with_env(config_path: PathBuf, vars: Map<String, String>) -> Result<Self> {
        let config = Self::load_or_default(&config_path, Some(vars))?;

        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn save(&self) -> Result<()> {
        let toml = toml::to_string_pretty(&self.config)
            .map_err(|e| ToolkitError::Configuration(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, toml)
            .map_err(|e| ToolkitError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> &ToolkitConfig {
        &self.config
    }

    pub fn get_mut(&mut self) -> &mut ToolkitConfig {
        &mut self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn get_config_path_internal() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "novelkit", "novelkit").ok_or_else(|| {
            ToolkitError::Configuration("Could not determine config directory".to_string())
        })?;

        Ok(project_dirs.config_dir().join("config.toml"))
    }

    // NOVELKIT_BUDGET__CONTEXT_WINDOW -> budget.context_window
    fn load_or_default(path: &Path, vars: Option<Map<String, String>>) -> Result<ToolkitConfig> {
        let s = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix("NOVELKIT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .map_err(|e| ToolkitError::Configuration(format!("Failed to build config: {}", e)))?;

        let config: ToolkitConfig = s.try_deserialize().map_err(|e| {
            ToolkitError::Configuration(format!("Failed to deserialize config: {}", e))
        })?;

        Ok(config)
    }
}
