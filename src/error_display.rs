//! User-facing error message formatting.
//!
//! Matches on typed errors (our own [`crate::Error`], PolarsError variants, io::ErrorKind,
//! serde_json categories) instead of parsing strings.

use crate::error::Error;
use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!("Column not found: {}", msg),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Inconsistent columns: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::ComputeError(msg) => format!("Could not parse file: {}", msg),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check file access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        ErrorKind::Other => {
            let msg = err.to_string();
            if msg.contains("space left") {
                return "No space left on device. Free up disk space and try again.".to_string();
            }
            if msg.contains("Is a directory") {
                return "Path is a directory, not a file.".to_string();
            }
            return msg;
        }
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Format a pipeline or input error.
pub fn user_message_from_core(err: &Error) -> String {
    match err {
        Error::MalformedInput { message } => format!("Input is not a usable table: {}", message),
        Error::Transform {
            operation_index,
            reason,
        } => format!(
            "Pipeline step {} (zero-based) is invalid: {}",
            operation_index, reason
        ),
    }
}

/// Format a JSON parse failure with its position.
pub fn user_message_from_json(err: &serde_json::Error) -> String {
    use serde_json::error::Category;

    match err.classify() {
        Category::Io => "Could not read JSON input.".to_string(),
        Category::Syntax | Category::Eof => format!(
            "Invalid JSON at line {}, column {}.",
            err.line(),
            err.column()
        ),
        Category::Data => format!("Unexpected JSON content: {}", err),
    }
}

/// Format a color_eyre Report by downcasting to known error types.
/// Walks the cause chain and uses the first error it recognizes.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    let with_path = |msg: String| match path {
        Some(p) => format!("Failed to process {}: {}", p.display(), msg),
        None => msg,
    };

    for cause in report.chain() {
        if let Some(core) = cause.downcast_ref::<Error>() {
            return with_path(user_message_from_core(core));
        }
        if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            return with_path(user_message_from_polars(pe));
        }
        if let Some(je) = cause.downcast_ref::<serde_json::Error>() {
            return with_path(user_message_from_json(je));
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return with_path(user_message_from_io(io_err, None));
        }
    }

    // Fallback: first line of display to avoid long tracebacks
    let display = report.to_string();
    let first_line = display.lines().next().unwrap_or("An error occurred");
    with_path(first_line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::{eyre, WrapErr};

    #[test]
    fn test_user_message_from_io_not_found() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file");
        let msg = user_message_from_io(&err, None);
        assert!(
            msg.contains("not found"),
            "expected 'not found', got: {}",
            msg
        );
    }

    #[test]
    fn test_user_message_from_polars_column_not_found() {
        let err = PolarsError::ColumnNotFound("foo".into());
        let msg = user_message_from_polars(&err);
        assert!(msg.contains("foo"), "expected 'foo', got: {}", msg);
    }

    #[test]
    fn test_report_finds_core_error_in_chain() {
        let report = Err::<(), _>(Error::transform(2, "missing field `columns`"))
            .wrap_err("running pipeline")
            .unwrap_err();
        let msg = user_message_from_report(&report, None);
        assert_eq!(
            msg,
            "Pipeline step 2 (zero-based) is invalid: missing field `columns`"
        );
    }

    #[test]
    fn test_report_with_json_error_and_path() {
        let je = serde_json::from_str::<serde_json::Value>("[1,").unwrap_err();
        let report = color_eyre::eyre::Report::new(je);
        let msg = user_message_from_report(&report, Some(Path::new("data.json")));
        assert!(msg.starts_with("Failed to process data.json: Invalid JSON"), "{}", msg);
    }

    #[test]
    fn test_report_fallback_first_line() {
        let report = eyre!("first line\nsecond line");
        assert_eq!(user_message_from_report(&report, None), "first line");
    }
}
