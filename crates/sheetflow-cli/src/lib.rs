//! Shared CLI definitions for sheetflow.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::Path;

/// File format for data files (used to bypass extension-based detection).
/// When `--format` is not specified, format is auto-detected from the file extension.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
    /// Pipe-separated values
    Psv,
    /// JSON array (rows with a header row, or keyed records)
    Json,
    /// Excel (.xls, .xlsx, .xlsm, .xlsb, .ods)
    Excel,
}

impl FileFormat {
    /// Detect file format from path extension. Returns None when extension is missing or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse format from extension string (e.g. "csv", "xlsx").
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "psv" => Some(Self::Psv),
            "json" => Some(Self::Json),
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Field separator for delimited text formats.
    pub fn default_delimiter(&self) -> Option<u8> {
        match self {
            Self::Csv => Some(b','),
            Self::Tsv => Some(b'\t'),
            Self::Psv => Some(b'|'),
            Self::Json | Self::Excel => None,
        }
    }

    /// Canonical file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Psv => "psv",
            Self::Json => "json",
            Self::Excel => "xlsx",
        }
    }
}

/// Compression format for data files
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Gzip compression (.gz) - Most common, good balance of speed and compression
    Gzip,
    /// Zstandard compression (.zst) - Modern, fast compression with good ratios
    Zstd,
    /// Bzip2 compression (.bz2) - Good compression ratio, slower than gzip
    Bzip2,
    /// XZ compression (.xz) - Excellent compression ratio, slower than bzip2
    Xz,
}

impl CompressionFormat {
    /// Detect compression format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            match ext.to_lowercase().as_str() {
                "gz" => Some(Self::Gzip),
                "zst" | "zstd" => Some(Self::Zstd),
                "bz2" | "bz" => Some(Self::Bzip2),
                "xz" => Some(Self::Xz),
                _ => None,
            }
        } else {
            None
        }
    }

    /// Get file extension for this compression format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Zstd => "zst",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
        }
    }
}

/// Command-line arguments for sheetflow
#[derive(Clone, Parser, Debug)]
#[command(
    name = "sheetflow",
    version,
    about = "Tabular transformation pipelines with column profiling",
    long_about = include_str!("../long_about.txt")
)]
pub struct Args {
    /// Path to the data file to transform (not required with --list-pipelines, --remove-pipeline, or --generate-config)
    #[arg(
        required_unless_present_any = ["generate_config", "list_pipelines", "remove_pipeline"],
        value_name = "PATH"
    )]
    pub path: Option<std::path::PathBuf>,

    /// Pipeline to apply: inline JSON array of operations, or a path to a JSON file containing one
    #[arg(long = "pipeline", short = 'p', value_name = "PIPELINE", conflicts_with = "saved")]
    pub pipeline: Option<String>,

    /// Apply a previously saved pipeline by name
    #[arg(long = "saved", value_name = "NAME")]
    pub saved: Option<String>,

    /// Write the transformed data to this file (format and compression from the extension)
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<std::path::PathBuf>,

    /// Print a preview (first N rows, header included) instead of the full result. Default N comes from config (100)
    #[arg(long = "preview", value_name = "N", num_args = 0..=1)]
    pub preview: Option<Option<usize>>,

    /// Write JSON output as keyed records instead of rows with a header row
    #[arg(long = "records", action)]
    pub records: bool,

    /// Pretty-print JSON written to stdout or to an output file
    #[arg(long = "pretty", value_name = "BOOL", value_parser = clap::value_parser!(bool))]
    pub pretty: Option<bool>,

    /// Specify the delimiter to use when reading a delimited text file
    #[arg(long = "delimiter")]
    pub delimiter: Option<u8>,

    /// Specify that the file has no header
    #[arg(long = "no-header")]
    pub no_header: Option<bool>,

    /// Let the CSV reader type columns (numbers, booleans, dates). By default every CSV cell is read as text
    #[arg(long = "infer-types", action)]
    pub infer_types: bool,

    /// Specify the compression format explicitly (gzip, zstd, bzip2, xz)
    /// If not specified, compression is auto-detected from file extension.
    #[arg(long = "compression", value_enum)]
    pub compression: Option<CompressionFormat>,

    /// Force file format (csv, tsv, psv, json, excel).
    /// By default format is auto-detected from the file extension.
    #[arg(long = "format", value_enum)]
    pub format: Option<FileFormat>,

    /// Excel sheet to load: 0-based index (e.g. 0) or sheet name (e.g. "Sales")
    #[arg(long = "sheet", value_name = "SHEET")]
    pub excel_sheet: Option<String>,

    /// Save the pipeline given with --pipeline under this name
    #[arg(long = "save-pipeline", value_name = "NAME", requires = "pipeline")]
    pub save_pipeline: Option<String>,

    /// Description stored with --save-pipeline
    #[arg(long = "description", value_name = "TEXT", requires = "save_pipeline")]
    pub description: Option<String>,

    /// List saved pipelines and exit
    #[arg(long = "list-pipelines", action)]
    pub list_pipelines: bool,

    /// Remove a saved pipeline by name and exit
    #[arg(long = "remove-pipeline", value_name = "NAME")]
    pub remove_pipeline: Option<String>,

    /// Enable debug logging of pipeline steps (RUST_LOG is also honored)
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Generate default configuration file at ~/.config/sheetflow/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn value_placeholder(arg: &clap::Arg) -> String {
    arg.get_value_names()
        .map(|names| {
            names
                .iter()
                .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

/// Render command-line options as markdown.
///
/// Used by the gen_docs binary; output is written to stdout and then
/// to `docs/reference/command-line-options.md` by the docs build process.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let option_str = if arg.is_positional() {
            let placeholder = value_placeholder(arg);
            if arg.is_required_set() {
                placeholder
            } else {
                format!("[{placeholder}]")
            }
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            let placeholder = if arg.get_action().takes_values() {
                value_placeholder(arg)
            } else {
                String::new()
            };
            if placeholder.is_empty() {
                op
            } else {
                format!("{op} {placeholder}")
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_detection() {
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv.gz")),
            Some(CompressionFormat::Gzip)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.json.zst")),
            Some(CompressionFormat::Zstd)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv.bz2")),
            Some(CompressionFormat::Bzip2)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv.xz")),
            Some(CompressionFormat::Xz)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv")),
            None
        );
        assert_eq!(CompressionFormat::from_extension(Path::new("file")), None);
    }

    #[test]
    fn test_file_format_from_path() {
        assert_eq!(
            FileFormat::from_path(Path::new("data.csv")),
            Some(FileFormat::Csv)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("Report.XLSX")),
            Some(FileFormat::Excel)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("rows.json")),
            Some(FileFormat::Json)
        );
        assert_eq!(FileFormat::from_path(Path::new("noext")), None);
        assert_eq!(FileFormat::from_path(Path::new("data.parquet")), None);
    }

    #[test]
    fn test_default_delimiters() {
        assert_eq!(FileFormat::Csv.default_delimiter(), Some(b','));
        assert_eq!(FileFormat::Tsv.default_delimiter(), Some(b'\t'));
        assert_eq!(FileFormat::Psv.default_delimiter(), Some(b'|'));
        assert_eq!(FileFormat::Json.default_delimiter(), None);
    }

    #[test]
    fn test_args_parse_pipeline_and_preview() {
        let args = Args::try_parse_from([
            "sheetflow",
            "data.csv",
            "--pipeline",
            "[]",
            "--preview",
        ])
        .expect("valid arguments");
        assert_eq!(args.pipeline.as_deref(), Some("[]"));
        assert_eq!(args.preview, Some(None));

        let args = Args::try_parse_from(["sheetflow", "data.csv", "--preview", "5"])
            .expect("valid arguments");
        assert_eq!(args.preview, Some(Some(5)));
    }

    #[test]
    fn test_args_path_optional_for_store_commands() {
        let args =
            Args::try_parse_from(["sheetflow", "--list-pipelines"]).expect("valid arguments");
        assert!(args.path.is_none());
        assert!(Args::try_parse_from(["sheetflow"]).is_err());
    }

    #[test]
    fn test_saved_conflicts_with_pipeline() {
        let result = Args::try_parse_from([
            "sheetflow",
            "data.csv",
            "--pipeline",
            "[]",
            "--saved",
            "monthly",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_markdown_lists_options() {
        let md = render_options_markdown();
        assert!(md.contains("--pipeline"));
        assert!(md.contains("--generate-config"));
        assert!(!md.contains("`--help`"));
    }
}
