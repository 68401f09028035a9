//! `.gt-annotations.toml` discovery and merging.

use crate::commands::OutputFormat;
use anyhow::{Context as _, Result};
use gt_annotations_core::{
    ClassifierConverterConfig, ConversionLimits, EntityConverterConfig, LabelCase,
};
use gt_annotations_render::RenderOptions;
use gt_annotations_storage::S3Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the configuration file looked up in the home and project directories
pub const CONFIG_FILE_NAME: &str = ".gt-annotations.toml";

/// Label delimiter used when neither the command line nor a config file sets one
pub const DEFAULT_LABEL_DELIMITER: &str = "|";

/// Configuration file structure for `.gt-annotations.toml`
///
/// Precedence order (highest to lowest):
/// 1. Command-line arguments
/// 2. Project config (`./.gt-annotations.toml`)
/// 3. User config (`~/.gt-annotations.toml`)
/// 4. Built-in defaults
///
/// `--config <path>` replaces both files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<LimitsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<ConversionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Settings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderConfig>,
}

/// `[limits]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum entity-recognition document size in bytes
    pub entity_document_bytes: Option<usize>,
    /// Maximum classification document size in bytes
    pub classifier_document_bytes: Option<usize>,
    /// Maximum label length in characters
    pub label_chars: Option<usize>,
}

/// `[conversion]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionConfig {
    pub label_delimiter: Option<String>,
    pub uppercase_labels: Option<bool>,
    pub output_dir: Option<PathBuf>,
}

/// `[validation]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    pub fail_on_invalid: Option<bool>,
    pub format: Option<OutputFormat>,
}

/// `[s3]`; unset fields fall back to the `AWS_*` environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct S3Settings {
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

/// `[render]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub line_thickness: Option<u32>,
    pub font_scale: Option<f32>,
    pub label_bg_opacity: Option<u8>,
    pub font: Option<PathBuf>,
}

impl LimitsConfig {
    fn overlay(self, higher: Self) -> Self {
        Self {
            entity_document_bytes: higher.entity_document_bytes.or(self.entity_document_bytes),
            classifier_document_bytes: higher
                .classifier_document_bytes
                .or(self.classifier_document_bytes),
            label_chars: higher.label_chars.or(self.label_chars),
        }
    }
}

impl ConversionConfig {
    fn overlay(self, higher: Self) -> Self {
        Self {
            label_delimiter: higher.label_delimiter.or(self.label_delimiter),
            uppercase_labels: higher.uppercase_labels.or(self.uppercase_labels),
            output_dir: higher.output_dir.or(self.output_dir),
        }
    }
}

impl ValidationConfig {
    fn overlay(self, higher: Self) -> Self {
        Self {
            fail_on_invalid: higher.fail_on_invalid.or(self.fail_on_invalid),
            format: higher.format.or(self.format),
        }
    }
}

impl S3Settings {
    fn overlay(self, higher: Self) -> Self {
        Self {
            region: higher.region.or(self.region),
            endpoint: higher.endpoint.or(self.endpoint),
            access_key_id: higher.access_key_id.or(self.access_key_id),
            secret_access_key: higher.secret_access_key.or(self.secret_access_key),
            session_token: higher.session_token.or(self.session_token),
        }
    }
}

impl RenderConfig {
    fn overlay(self, higher: Self) -> Self {
        Self {
            line_thickness: higher.line_thickness.or(self.line_thickness),
            font_scale: higher.font_scale.or(self.font_scale),
            label_bg_opacity: higher.label_bg_opacity.or(self.label_bg_opacity),
            font: higher.font.or(self.font),
        }
    }
}

/// Section-wise merge where fields set in `higher` win.
fn overlay_section<T>(
    lower: Option<T>,
    higher: Option<T>,
    overlay: impl FnOnce(T, T) -> T,
) -> Option<T> {
    match (lower, higher) {
        (None, None) => None,
        (Some(section), None) | (None, Some(section)) => Some(section),
        (Some(lower), Some(higher)) => Some(overlay(lower, higher)),
    }
}

impl Config {
    /// Resolves the effective configuration.
    ///
    /// An explicit path must exist and parse. Discovered files that fail to
    /// parse are skipped with a warning.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        let user = dirs::home_dir().and_then(|home| Self::load_optional(&home.join(CONFIG_FILE_NAME)));
        let project = Self::load_optional(Path::new(CONFIG_FILE_NAME));
        Ok(Self::merge(user, project))
    }

    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    fn load_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(path = %path.display(), error = format!("{e:#}"), "Ignoring config file");
                None
            }
        }
    }

    /// Merge user and project configs; project values win.
    #[must_use]
    pub fn merge(user: Option<Self>, project: Option<Self>) -> Self {
        let user = user.unwrap_or_default();
        let project = project.unwrap_or_default();
        Self {
            limits: overlay_section(user.limits, project.limits, LimitsConfig::overlay),
            conversion: overlay_section(
                user.conversion,
                project.conversion,
                ConversionConfig::overlay,
            ),
            validation: overlay_section(
                user.validation,
                project.validation,
                ValidationConfig::overlay,
            ),
            s3: overlay_section(user.s3, project.s3, S3Settings::overlay),
            render: overlay_section(user.render, project.render, RenderConfig::overlay),
        }
    }

    fn limits(&self) -> LimitsConfig {
        self.limits.clone().unwrap_or_default()
    }

    fn conversion(&self) -> ConversionConfig {
        self.conversion.clone().unwrap_or_default()
    }

    fn validation(&self) -> ValidationConfig {
        self.validation.clone().unwrap_or_default()
    }

    fn render(&self) -> RenderConfig {
        self.render.clone().unwrap_or_default()
    }

    /// Entity converter settings; `uppercase_flag` forces upper-case labels.
    #[must_use]
    pub fn entity_converter(&self, uppercase_flag: bool) -> EntityConverterConfig {
        let defaults = ConversionLimits::entity_recognition();
        let limits = self.limits();
        let uppercase = uppercase_flag || self.conversion().uppercase_labels.unwrap_or(false);
        EntityConverterConfig {
            limits: ConversionLimits {
                max_document_bytes: limits
                    .entity_document_bytes
                    .unwrap_or(defaults.max_document_bytes),
                max_label_chars: limits.label_chars.unwrap_or(defaults.max_label_chars),
            },
            label_case: if uppercase { LabelCase::Upper } else { LabelCase::Preserve },
            ..EntityConverterConfig::default()
        }
    }

    #[must_use]
    pub fn classifier_converter(&self) -> ClassifierConverterConfig {
        let defaults = ConversionLimits::classification();
        let limits = self.limits();
        ClassifierConverterConfig {
            limits: ConversionLimits {
                max_document_bytes: limits
                    .classifier_document_bytes
                    .unwrap_or(defaults.max_document_bytes),
                max_label_chars: limits.label_chars.unwrap_or(defaults.max_label_chars),
            },
            ..ClassifierConverterConfig::default()
        }
    }

    #[must_use]
    pub fn label_delimiter(&self, cli: Option<String>) -> String {
        cli.or_else(|| self.conversion().label_delimiter)
            .unwrap_or_else(|| DEFAULT_LABEL_DELIMITER.to_string())
    }

    #[must_use]
    pub fn output_dir(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.conversion().output_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    #[must_use]
    pub fn fail_on_invalid(&self, flag: bool) -> bool {
        flag || self.validation().fail_on_invalid.unwrap_or(false)
    }

    #[must_use]
    pub fn output_format(&self, cli: Option<OutputFormat>) -> OutputFormat {
        cli.or(self.validation().format).unwrap_or_default()
    }

    /// S3 settings over the `AWS_*` environment defaults.
    #[must_use]
    pub fn s3(&self) -> S3Config {
        let settings = self.s3.clone().unwrap_or_default();
        let env = S3Config::default();
        S3Config {
            region: settings.region.unwrap_or(env.region),
            endpoint: settings.endpoint.or(env.endpoint),
            access_key_id: settings.access_key_id.or(env.access_key_id),
            secret_access_key: settings.secret_access_key.or(env.secret_access_key),
            session_token: settings.session_token.or(env.session_token),
        }
    }

    #[must_use]
    pub fn render_options(&self) -> RenderOptions {
        let defaults = RenderOptions::default();
        let render = self.render();
        RenderOptions {
            line_thickness: render.line_thickness.unwrap_or(defaults.line_thickness),
            font_scale: render.font_scale.unwrap_or(defaults.font_scale),
            label_bg_opacity: render.label_bg_opacity.unwrap_or(defaults.label_bg_opacity),
        }
    }

    #[must_use]
    pub fn font(&self, cli: Option<PathBuf>) -> Option<PathBuf> {
        cli.or_else(|| self.render().font)
    }
}
