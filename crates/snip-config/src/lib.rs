use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SNIP_DIR_NAME: &str = ".snip";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_API_TOKEN";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_LINT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.8;
pub const DEFAULT_PACE_EVERY: usize = 50;
pub const DEFAULT_PACE_SECS: u64 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SnipConfig {
    #[serde(default)]
    pub lint: LintConfig,
    #[serde(default)]
    pub hosting: HostingConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintConfig {
    #[serde(default = "default_lint_timeout_secs")]
    pub timeout_secs: u64,
    /// Rule codes dropped from every run (missing-docstring noise by default).
    #[serde(default = "default_excluded_codes")]
    pub excluded_codes: Vec<String>,
    /// Import-resolution codes dropped when the message names a known dependency.
    #[serde(default = "default_import_error_codes")]
    pub import_error_codes: Vec<String>,
    #[serde(default = "default_third_party_modules")]
    pub third_party_modules: Vec<String>,
    #[serde(default)]
    pub tools: LintToolsConfig,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_lint_timeout_secs(),
            excluded_codes: default_excluded_codes(),
            import_error_codes: default_import_error_codes(),
            third_party_modules: default_third_party_modules(),
            tools: LintToolsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintToolsConfig {
    #[serde(default = "default_pylint")]
    pub pylint: String,
    #[serde(default = "default_flake8")]
    pub flake8: String,
    #[serde(default = "default_bandit")]
    pub bandit: String,
    #[serde(default = "default_eslint")]
    pub eslint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eslint_config: Option<String>,
}

impl Default for LintToolsConfig {
    fn default() -> Self {
        Self {
            pylint: default_pylint(),
            flake8: default_flake8(),
            bandit: default_bandit(),
            eslint: default_eslint(),
            eslint_config: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostingConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<String>,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_pace_every")]
    pub pace_every: usize,
    #[serde(default = "default_pace_secs")]
    pub pace_secs: u64,
}

impl Default for HostingConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token_file: None,
            token_env: default_token_env(),
            request_timeout_secs: default_request_timeout_secs(),
            pace_every: default_pace_every(),
            pace_secs: default_pace_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_match_threshold")]
    pub threshold: f64,
    #[serde(default = "default_match_threshold")]
    pub similarity_threshold: f64,
    /// Raw conversation title -> canonical English phrase.
    #[serde(default = "default_translations")]
    pub translations: BTreeMap<String, String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: default_match_threshold(),
            similarity_threshold: default_match_threshold(),
            translations: default_translations(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_top_rules")]
    pub top_rules: usize,
    #[serde(default = "default_top_issues")]
    pub top_issues: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_rules: default_top_rules(),
            top_issues: default_top_issues(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub fn snip_dir(workspace_root: impl AsRef<Path>) -> PathBuf {
    workspace_root.as_ref().join(SNIP_DIR_NAME)
}

pub fn config_path(workspace_root: impl AsRef<Path>) -> PathBuf {
    snip_dir(workspace_root).join(CONFIG_FILE_NAME)
}

pub fn load_workspace_config(workspace_root: impl AsRef<Path>) -> Result<SnipConfig, ConfigError> {
    let path = config_path(workspace_root);
    if !path.exists() {
        return Ok(SnipConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: SnipConfig = toml::from_str(&raw)?;
    Ok(normalize_config(parsed))
}

pub fn ensure_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<SnipConfig, ConfigError> {
    let workspace_root = workspace_root.as_ref();
    fs::create_dir_all(snip_dir(workspace_root))?;

    let path = config_path(workspace_root);
    if path.exists() {
        return load_workspace_config(workspace_root);
    }

    let config = SnipConfig::default();
    let content = toml::to_string_pretty(&config)?;
    fs::write(path, content)?;

    Ok(config)
}

pub fn validate_config(config: &SnipConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if config.lint.timeout_secs == 0 {
        warnings.push(ConfigWarning {
            code: "lint_timeout_zero",
            message: "lint.timeout_secs is 0; every linter run will time out".to_owned(),
        });
    }
    for (name, threshold) in [
        ("matching.threshold", config.matching.threshold),
        (
            "matching.similarity_threshold",
            config.matching.similarity_threshold,
        ),
    ] {
        if !(0.0..=1.0).contains(&threshold) {
            warnings.push(ConfigWarning {
                code: "threshold_out_of_range",
                message: format!("{name} is {threshold}; it will be clamped to 0.0..=1.0"),
            });
        }
    }
    if config.hosting.pace_every == 0 {
        warnings.push(ConfigWarning {
            code: "pacing_disabled",
            message: "hosting.pace_every is 0; requests will not be paced".to_owned(),
        });
    }
    if config.report.top_rules == 0 || config.report.top_issues == 0 {
        warnings.push(ConfigWarning {
            code: "empty_top_lists",
            message: "report.top_rules or report.top_issues is 0; top-N lists will be empty"
                .to_owned(),
        });
    }

    warnings
}

fn default_lint_timeout_secs() -> u64 {
    DEFAULT_LINT_TIMEOUT_SECS
}

fn default_excluded_codes() -> Vec<String> {
    to_owned_list(&["C0114", "C0115", "C0116"])
}

fn default_import_error_codes() -> Vec<String> {
    to_owned_list(&["E0401"])
}

fn default_third_party_modules() -> Vec<String> {
    to_owned_list(&[
        "scrapy",
        "selenium",
        "pims",
        "pandas",
        "numpy",
        "cv2",
        "matplotlib",
        "torch",
    ])
}

fn default_pylint() -> String {
    "pylint".to_owned()
}

fn default_flake8() -> String {
    "flake8".to_owned()
}

fn default_bandit() -> String {
    "bandit".to_owned()
}

fn default_eslint() -> String {
    "eslint".to_owned()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_owned()
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_owned()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_pace_every() -> usize {
    DEFAULT_PACE_EVERY
}

fn default_pace_secs() -> u64 {
    DEFAULT_PACE_SECS
}

fn default_match_threshold() -> f64 {
    DEFAULT_MATCH_THRESHOLD
}

fn default_top_rules() -> usize {
    3
}

fn default_top_issues() -> usize {
    5
}

fn default_translations() -> BTreeMap<String, String> {
    [
        ("이벤트_리스너_제거_방법", "event listener removal"),
        ("속성의_삭제_JavaScript", "attribute removal"),
        ("금지_ワードの_投稿_終了", "banned word posting"),
        ("Swift类型擦除技术", "swift type erasure technology"),
        ("掲示板アプリプログラム", "bulletin board app program"),
        ("掲示板アプリ概要", "bulletin board app overview"),
        (
            "マークダウンドキュメントの_ページ_分割",
            "markdown document page splitting",
        ),
        ("モバイルハンバーガーメニュー", "mobile hamburger menu"),
        ("Actualizar_archivo_Librecalc_Python", "update librecalc file"),
        ("Encuentra_puntos_dentro_área_", "find points within area"),
        (
            "Geokoordinate_Technischer_Spezialist",
            "geocoordinate technical specialist",
        ),
        (
            "Accessing_Function_Docstring__Python_",
            "access function docstring",
        ),
        ("Add_CSS_rule_to_selector", "add css rule"),
        (
            "ActivityStreams_Abbreviated_Highlight",
            "activitystreams highlight",
        ),
    ]
    .into_iter()
    .map(|(raw, canonical)| (raw.to_owned(), canonical.to_owned()))
    .collect()
}

fn to_owned_list(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

fn normalize_optional(input: Option<String>) -> Option<String> {
    input
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn normalize_list(values: Vec<String>) -> Vec<String> {
    let mut normalized = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !normalized.iter().any(|existing| existing == value) {
            normalized.push(value.to_owned());
        }
    }
    normalized
}

fn normalize_or_default(value: &str, default: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default()
    } else {
        trimmed.to_owned()
    }
}

fn normalize_config(mut config: SnipConfig) -> SnipConfig {
    config.lint.excluded_codes = normalize_list(std::mem::take(&mut config.lint.excluded_codes));
    config.lint.import_error_codes =
        normalize_list(std::mem::take(&mut config.lint.import_error_codes));
    config.lint.third_party_modules =
        normalize_list(std::mem::take(&mut config.lint.third_party_modules));

    let tools = &mut config.lint.tools;
    tools.pylint = normalize_or_default(&tools.pylint, default_pylint);
    tools.flake8 = normalize_or_default(&tools.flake8, default_flake8);
    tools.bandit = normalize_or_default(&tools.bandit, default_bandit);
    tools.eslint = normalize_or_default(&tools.eslint, default_eslint);
    tools.eslint_config = normalize_optional(tools.eslint_config.take());

    let hosting = &mut config.hosting;
    hosting.api_base = normalize_or_default(&hosting.api_base, default_api_base)
        .trim_end_matches('/')
        .to_owned();
    hosting.token_env = normalize_or_default(&hosting.token_env, default_token_env);
    hosting.token_file = normalize_optional(hosting.token_file.take());

    config
}
