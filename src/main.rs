use chrono::Utc;
use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use serde_json::json;
use sheetflow::error_display::user_message_from_report;
use sheetflow::export::{default_output_path, write_json};
use sheetflow::{
    export_dataset, load_dataset, run_pipeline, AppConfig, Args, ConfigManager, ExportOptions,
    JsonLayout, LoadOptions, Pipeline, PipelineStore, ResultEnvelope, APP_NAME,
};
use std::path::Path;

/// CLI flags override config file values.
fn load_options(args: &Args, config: &AppConfig) -> LoadOptions {
    let file_loading = &config.file_loading;
    LoadOptions {
        format: args.format,
        compression: args.compression,
        delimiter: args.delimiter.or(file_loading.delimiter),
        has_header: args
            .no_header
            .map(|no_header| !no_header)
            .or(file_loading.has_header),
        infer_types: args.infer_types || file_loading.infer_types.unwrap_or(false),
        excel_sheet: args
            .excel_sheet
            .clone()
            .or_else(|| file_loading.excel_sheet.clone()),
    }
}

fn json_layout(args: &Args, config: &AppConfig) -> JsonLayout {
    if args.records {
        JsonLayout::Records
    } else {
        config.output.json_layout
    }
}

fn export_options(args: &Args, config: &AppConfig) -> ExportOptions {
    ExportOptions {
        json_layout: json_layout(args, config),
        pretty: args.pretty.unwrap_or(config.output.pretty_json),
        include_header: config.output.include_header,
        ..ExportOptions::default()
    }
}

fn init_logging(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    // RUST_LOG, when set, takes precedence over the flag
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn open_store(config: &AppConfig) -> Result<PipelineStore> {
    let manager = ConfigManager::new(APP_NAME)?;
    PipelineStore::open(config.pipelines.resolve_dir(&manager))
}

/// `--pipeline` takes inline JSON or a path to a JSON file; `--saved` a stored name.
fn resolve_pipeline(args: &Args, store: &PipelineStore) -> Result<Pipeline> {
    if let Some(spec) = &args.pipeline {
        let text = if spec.trim_start().starts_with('[') {
            spec.clone()
        } else {
            std::fs::read_to_string(spec)
                .wrap_err_with(|| format!("Failed to read pipeline file {}", spec))?
        };
        return Ok(text.parse::<Pipeline>()?);
    }
    if let Some(name) = &args.saved {
        let saved = store.find(name).ok_or_else(|| {
            eyre!(
                "No saved pipeline named `{}`. Use --list-pipelines to see saved pipelines",
                name
            )
        })?;
        return Ok(saved.operations.clone());
    }
    Ok(Pipeline::default())
}

/// Handles flags that do their work and exit without reading data.
fn handle_early_exit_flags(args: &Args, config: &AppConfig) -> Result<Option<()>> {
    if args.list_pipelines {
        let store = open_store(config)?;
        if store.all().is_empty() {
            println!("No saved pipelines in {}", store.dir().display());
        }
        for saved in store.all() {
            let steps: Vec<&str> = saved
                .operations
                .operations()
                .iter()
                .map(|op| op.kind())
                .collect();
            println!(
                "{}\t{}\tused {} times\t{}",
                saved.name,
                steps.join(" -> "),
                saved.usage_count,
                saved.description.as_deref().unwrap_or("")
            );
        }
        return Ok(Some(()));
    }

    if let Some(name) = &args.remove_pipeline {
        let mut store = open_store(config)?;
        if store.remove(name)? {
            println!("Removed saved pipeline `{}`", name);
        } else {
            return Err(eyre!("No saved pipeline named `{}`", name));
        }
        return Ok(Some(()));
    }

    Ok(None)
}

fn run(args: &Args, config: &AppConfig) -> Result<()> {
    let path = args
        .path
        .as_deref()
        .ok_or_else(|| eyre!("A data file path is required"))?;

    let mut store = open_store(config)?;
    let pipeline = resolve_pipeline(args, &store)?;
    if let Some(name) = &args.save_pipeline {
        store.save(name, args.description.clone(), pipeline.clone())?;
    }
    if let Some(name) = &args.saved {
        if config.pipelines.record_usage {
            store.record_usage(name)?;
        }
    }

    let dataset = load_dataset(path, &load_options(args, config))
        .wrap_err_with(|| format!("Failed to load {}", path.display()))?;
    let result = run_pipeline(dataset, &pipeline);

    let options = export_options(args, config);
    if let Some(output) = &args.output {
        // a directory target gets the derived `<stem>_<ops>.<ext>` name
        let output = if output.is_dir() {
            let derived = default_output_path(path, &pipeline);
            output.join(derived.file_name().unwrap_or_default())
        } else {
            output.clone()
        };
        export_dataset(&result.data, &output, &options)?;
        log::info!(
            "wrote {} data rows to {}",
            result.data.len(),
            output.display()
        );
    }

    let stdout = std::io::stdout().lock();
    match args.preview {
        Some(limit) => {
            let limit = limit.unwrap_or(config.output.preview_rows);
            write_json(stdout, &result.preview(limit), options.pretty)?;
        }
        None if args.output.is_none() => {
            let envelope = ResultEnvelope::new(&result, &pipeline, options.json_layout, Utc::now());
            write_json(stdout, &envelope, options.pretty)?;
        }
        None => {}
    }
    Ok(())
}

/// Structured error for callers reading stdout.
fn error_json(report: &color_eyre::eyre::Report, message: &str) -> serde_json::Value {
    let detail = report
        .chain()
        .find_map(|cause| cause.downcast_ref::<sheetflow::Error>())
        .map(sheetflow::Error::to_json)
        .unwrap_or_else(|| json!({ "kind": "failure", "message": message }));
    json!({ "error": detail })
}

fn fail(report: &color_eyre::eyre::Report, path: Option<&Path>) -> ! {
    let message = user_message_from_report(report, path);
    eprintln!("Error: {}", message);
    log::debug!("{:?}", report);
    println!("{}", error_json(report, &message));
    std::process::exit(1);
}

fn main() -> Result<()> {
    let args = Args::parse();
    color_eyre::install()?;

    if args.generate_config {
        let manager = ConfigManager::new(APP_NAME)?;
        match manager.write_default_config(args.force) {
            Ok(path) => {
                println!("Wrote default configuration to {}", path.display());
                return Ok(());
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    let config = match AppConfig::load(APP_NAME) {
        Ok(config) => config,
        Err(e) => fail(&e, None),
    };
    init_logging(args.debug || config.debug.enabled);

    match handle_early_exit_flags(&args, &config) {
        Ok(Some(())) => return Ok(()),
        Ok(None) => {}
        Err(e) => fail(&e, None),
    }

    if let Err(e) = run(&args, &config) {
        fail(&e, args.path.as_deref());
    }
    Ok(())
}
