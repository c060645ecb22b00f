use crate::export::JsonLayout;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Manages config directory and config file operations
#[derive(Clone, Debug)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Ensure a subdirectory exists within the config directory
    pub fn ensure_subdir(&self, subdir: &str) -> Result<PathBuf> {
        let subdir_path = self.config_dir.join(subdir);
        if !subdir_path.exists() {
            std::fs::create_dir_all(&subdir_path)?;
        }
        Ok(subdir_path)
    }

    /// Default configuration as a TOML template.
    /// Every field is commented out so defaults apply until the user uncomments one.
    pub fn generate_default_config(&self) -> String {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).unwrap_or_default();
        Self::comment_all_fields(toml_str, Self::collect_all_comments())
    }

    /// Field comments keyed by dotted path (e.g. `output.preview_rows`)
    fn collect_all_comments() -> HashMap<String, String> {
        let mut comments = HashMap::new();

        for (field, comment) in APP_COMMENTS {
            comments.insert(field.to_string(), comment.to_string());
        }
        let sections: [(&str, &[(&str, &str)]); 4] = [
            ("file_loading", FILE_LOADING_COMMENTS),
            ("output", OUTPUT_COMMENTS),
            ("pipelines", PIPELINES_COMMENTS),
            ("debug", DEBUG_COMMENTS),
        ];
        for (section, fields) in sections {
            for (field, comment) in fields {
                comments.insert(format!("{}.{}", section, field), comment.to_string());
            }
        }

        comments
    }

    /// Comment out all fields in TOML and add comments
    fn comment_all_fields(toml: String, comments: HashMap<String, String>) -> String {
        let mut result = String::new();
        result.push_str("# sheetflow configuration file\n");
        result
            .push_str("# This file uses TOML format. See https://toml.io/ for syntax reference.\n");
        result.push('\n');

        let mut current_section = String::new();
        let mut seen_fields: HashSet<String> = HashSet::new();

        for line in toml.lines() {
            if let Some(section) = Self::extract_section_name(line) {
                if let Some((_, header)) = SECTION_HEADERS.iter().find(|(s, _)| *s == section) {
                    result.push_str(header);
                    result.push('\n');
                }
                current_section = section;
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                continue;
            }

            if let Some(field_path) = Self::extract_field_path(line, &current_section) {
                if let Some(comment) = comments.get(&field_path) {
                    for comment_line in comment.lines() {
                        result.push_str("# ");
                        result.push_str(comment_line);
                        result.push('\n');
                    }
                }
                seen_fields.insert(field_path);
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        Self::add_missing_option_fields(result, &comments, &seen_fields)
    }

    /// Option fields are skipped by the serializer when None; list them as `# field = null`
    fn add_missing_option_fields(
        mut result: String,
        comments: &HashMap<String, String>,
        seen_fields: &HashSet<String>,
    ) -> String {
        let option_fields = [
            "file_loading.delimiter",
            "file_loading.has_header",
            "file_loading.infer_types",
            "file_loading.excel_sheet",
            "pipelines.directory",
        ];

        let mut missing_by_section: Vec<(&str, Vec<&str>)> = Vec::new();
        for field_path in option_fields {
            if seen_fields.contains(field_path) || !comments.contains_key(field_path) {
                continue;
            }
            if let Some((section, _)) = field_path.split_once('.') {
                match missing_by_section.iter_mut().find(|(s, _)| *s == section) {
                    Some((_, fields)) => fields.push(field_path),
                    None => missing_by_section.push((section, vec![field_path])),
                }
            }
        }

        for (section, fields) in &missing_by_section {
            let section_header = format!("[{}]", section);
            let Some(section_pos) = result.find(&section_header) else {
                continue;
            };
            let after_header_start = section_pos + section_header.len();
            let newline_pos = result[after_header_start..].find('\n').unwrap_or(0);
            let insert_pos = after_header_start + newline_pos + 1;

            let mut new_content = String::new();
            for field_path in fields {
                if let Some(comment) = comments.get(*field_path) {
                    for comment_line in comment.lines() {
                        new_content.push_str("# ");
                        new_content.push_str(comment_line);
                        new_content.push('\n');
                    }
                }
                let field_name = field_path.rsplit('.').next().unwrap_or(field_path);
                new_content.push_str(&format!("# {} = null\n\n", field_name));
            }
            result.insert_str(insert_pos, &new_content);
        }

        result
    }

    /// Section name from a TOML header line like "[output]"
    fn extract_section_name(line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            Some(trimmed[1..trimmed.len() - 1].to_string())
        } else {
            None
        }
    }

    fn extract_field_path(line: &str, current_section: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }
        let (field_name, _) = trimmed.split_once('=')?;
        let field_name = field_name.trim();
        if current_section.is_empty() {
            Some(field_name.to_string())
        } else {
            Some(format!("{}.{}", current_section, field_name))
        }
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, self.generate_default_config())?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub file_loading: FileLoadingConfig,
    pub output: OutputConfig,
    pub pipelines: PipelinesConfig,
    pub debug: DebugConfig,
}

const APP_COMMENTS: &[(&str, &str)] = &[(
    "version",
    "Configuration format version (for future compatibility)",
)];

const SECTION_HEADERS: &[(&str, &str)] = &[
    (
        "file_loading",
        "# ============================================================================\n# File Loading Defaults\n# ============================================================================",
    ),
    (
        "output",
        "# ============================================================================\n# Output\n# ============================================================================",
    ),
    (
        "pipelines",
        "# ============================================================================\n# Saved Pipelines\n# ============================================================================",
    ),
    (
        "debug",
        "# ============================================================================\n# Debug Settings\n# ============================================================================",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileLoadingConfig {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    /// Let the CSV reader type columns instead of reading text.
    pub infer_types: Option<bool>,
    pub excel_sheet: Option<String>,
}

const FILE_LOADING_COMMENTS: &[(&str, &str)] = &[
    (
        "delimiter",
        "Default delimiter for delimited files (as ASCII value, e.g., 59 for semicolon)\nIf not specified, the format's delimiter is used (comma, tab, pipe)",
    ),
    (
        "has_header",
        "Whether files have a header row\nnull = true",
    ),
    (
        "infer_types",
        "When true, the CSV reader types columns (numbers, booleans, dates)\nnull = false: every cell is read as text, like a spreadsheet export",
    ),
    (
        "excel_sheet",
        "Excel sheet to read: 0-based index or sheet name\nnull = first sheet",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Rows (header included) shown by --preview without a count.
    pub preview_rows: usize,
    pub pretty_json: bool,
    pub json_layout: JsonLayout,
    pub include_header: bool,
}

const OUTPUT_COMMENTS: &[(&str, &str)] = &[
    (
        "preview_rows",
        "Rows shown by --preview when no count is given (header row included)",
    ),
    ("pretty_json", "Pretty-print JSON output"),
    (
        "json_layout",
        "Layout of JSON data: \"rows\" (header row, then data rows) or \"records\" (one object per row)",
    ),
    (
        "include_header",
        "Write a header line when exporting delimited files",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelinesConfig {
    /// Saved pipeline directory. None = `<config dir>/pipelines`.
    pub directory: Option<String>,
    pub record_usage: bool,
}

const PIPELINES_COMMENTS: &[(&str, &str)] = &[
    (
        "directory",
        "Directory holding saved pipelines\nnull = pipelines/ inside the config directory",
    ),
    (
        "record_usage",
        "Track how often and when each saved pipeline is used",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
}

const DEBUG_COMMENTS: &[(&str, &str)] = &[(
    "enabled",
    "Log each pipeline step (same as --debug)",
)];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            file_loading: FileLoadingConfig::default(),
            output: OutputConfig::default(),
            pipelines: PipelinesConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            preview_rows: crate::pipeline::DEFAULT_PREVIEW_ROWS,
            pretty_json: false,
            json_layout: JsonLayout::Rows,
            include_header: true,
        }
    }
}

impl Default for PipelinesConfig {
    fn default() -> Self {
        Self {
            directory: None,
            record_usage: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        Self::load_with(&ConfigManager::new(app_name)?)
    }

    /// Same as [`AppConfig::load`] with an explicit config directory.
    pub fn load_with(manager: &ConfigManager) -> Result<Self> {
        let config_path = manager.config_path("config.toml");
        let mut config = AppConfig::default();
        config.merge(Self::load_user_config(&config_path)?);

        config
            .validate()
            .map_err(|e| eyre!("Invalid configuration in {}: {}", config_path.display(), e))?;

        Ok(config)
    }

    fn load_user_config(config_path: &Path) -> Result<AppConfig> {
        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }
        self.file_loading.merge(other.file_loading);
        self.output.merge(other.output);
        self.pipelines.merge(other.pipelines);
        self.debug.merge(other.debug);
    }

    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }
        if self.output.preview_rows == 0 {
            return Err(eyre!("output.preview_rows must be greater than 0"));
        }
        if let Some(d) = self.file_loading.delimiter {
            if !d.is_ascii() || d == b'\n' || d == b'\r' || d == b'"' {
                return Err(eyre!(
                    "file_loading.delimiter must be a printable ASCII character, got {}",
                    d
                ));
            }
        }
        Ok(())
    }
}

impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.has_header.is_some() {
            self.has_header = other.has_header;
        }
        if other.infer_types.is_some() {
            self.infer_types = other.infer_types;
        }
        if other.excel_sheet.is_some() {
            self.excel_sheet = other.excel_sheet;
        }
    }
}

impl OutputConfig {
    pub fn merge(&mut self, other: Self) {
        let default = OutputConfig::default();
        if other.preview_rows != default.preview_rows {
            self.preview_rows = other.preview_rows;
        }
        if other.pretty_json != default.pretty_json {
            self.pretty_json = other.pretty_json;
        }
        if other.json_layout != default.json_layout {
            self.json_layout = other.json_layout;
        }
        if other.include_header != default.include_header {
            self.include_header = other.include_header;
        }
    }
}

impl PipelinesConfig {
    pub fn merge(&mut self, other: Self) {
        if other.directory.is_some() {
            self.directory = other.directory;
        }
        if other.record_usage != PipelinesConfig::default().record_usage {
            self.record_usage = other.record_usage;
        }
    }

    /// Directory for saved pipelines, relative to `manager` unless configured.
    pub fn resolve_dir(&self, manager: &ConfigManager) -> PathBuf {
        match &self.directory {
            Some(dir) => PathBuf::from(dir),
            None => manager.config_path("pipelines"),
        }
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        if other.enabled != DebugConfig::default().enabled {
            self.enabled = other.enabled;
        }
    }
}
