use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use ndarray::Axis;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use ezprompts_core::config::{config_path, data_dir, initialize_data_dir, AppConfig};
use ezprompts_core::dataset::{save_image, save_mask, FsImageDecoder, ImageDecoder};
use ezprompts_core::descriptor::all_node_descriptors;
use ezprompts_core::logging::{self, LogSink, LoggingOptions, DEFAULT_LOG_FILTER};
use ezprompts_core::node::ExecutionContext;
use ezprompts_core::prompt::TemplateLibrary;
use ezprompts_core::registry::{build_default_registry, NodeRegistry};
use ezprompts_core::types::PortData;

#[derive(Parser)]
#[command(
    name = "ezprompts",
    about = "Outpaint canvas preparation, sorted image datasets and prompt templates"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help = "Increase log verbosity (-v: debug, -vv: trace)"
    )]
    verbose: u8,

    #[arg(
        long = "log-filter",
        value_name = "FILTER",
        global = true,
        help = "Explicit tracing filter (overrides RUST_LOG and -v)"
    )]
    log_filter: Option<String>,

    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory with a default config.toml.
    Init,
    /// Pad one image onto an aspect-ratio canvas and write image and mask PNGs.
    Outpaint(OutpaintArgs),
    /// Load a directory as one sorted batch and outpaint every image.
    Batch(BatchArgs),
    /// Render a prompt template.
    Prompt(PromptArgs),
    /// List the built-in prompt templates and their parameters.
    Templates,
    /// Print node descriptors as JSON.
    Nodes,
}

#[derive(Args, Debug, Default)]
struct CanvasArgs {
    #[arg(long = "ratio", value_name = "W:H", help = "Target aspect ratio, e.g. 16:9")]
    target_ratio: Option<String>,
    #[arg(long = "padding", value_name = "POSITION", help = "center, leading or trailing")]
    padding_position: Option<String>,
    #[arg(long, value_name = "KERNEL")]
    interpolation: Option<String>,
    #[arg(long, value_name = "PIXELS")]
    feathering: Option<i64>,
    #[arg(long, value_name = "N")]
    multiple_of: Option<i64>,
}

#[derive(Args)]
struct OutpaintArgs {
    #[arg(help = "Source image file")]
    input: PathBuf,
    #[arg(
        short = 'o',
        long,
        help = "Output image path (defaults to <output_dir>/<stem>_outpaint.png)"
    )]
    output: Option<PathBuf>,
    #[arg(long, help = "Mask path (defaults to <output stem>_mask.png next to the image)")]
    mask: Option<PathBuf>,
    #[command(flatten)]
    canvas: CanvasArgs,
}

#[derive(Args)]
struct BatchArgs {
    #[arg(help = "Image directory, relative to the configured input directory")]
    directory: Option<PathBuf>,
    #[arg(long, help = "Comma or newline separated file names; empty loads every image")]
    images: Option<String>,
    #[arg(long = "sort", value_name = "ORDER", help = "None, Ascending or Descending")]
    sort_order: Option<String>,
    #[arg(long, value_name = "METHOD", help = "None, Stretch, Crop or Pad")]
    resize_method: Option<String>,
    #[arg(long, overrides_with = "no_natural", help = "Compare digit runs numerically")]
    natural: bool,
    #[arg(long, overrides_with = "natural")]
    no_natural: bool,
    #[arg(long)]
    case_sensitive: bool,
    #[arg(short = 'o', long, help = "Output directory (defaults to the configured one)")]
    output: Option<PathBuf>,
    #[command(flatten)]
    canvas: CanvasArgs,
}

#[derive(Args)]
struct PromptArgs {
    #[arg(help = "Template key, or 'none'")]
    template: String,
    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        help = "Template parameter value (repeatable)"
    )]
    values: Vec<String>,
}

impl CanvasArgs {
    /// Node inputs for every flag that was given; the rest use node defaults.
    fn to_inputs(&self) -> HashMap<String, PortData> {
        let mut inputs = HashMap::new();
        let strings = [
            ("target_ratio", &self.target_ratio),
            ("padding_position", &self.padding_position),
            ("interpolation", &self.interpolation),
        ];
        for (name, value) in strings {
            if let Some(value) = value {
                inputs.insert(name.to_string(), PortData::Str(value.clone()));
            }
        }
        let ints = [
            ("feathering", self.feathering),
            ("multiple_of", self.multiple_of),
        ];
        for (name, value) in ints {
            if let Some(value) = value {
                inputs.insert(name.to_string(), PortData::Int(value));
            }
        }
        inputs
    }
}

impl BatchArgs {
    fn to_inputs(&self) -> HashMap<String, PortData> {
        let mut inputs = HashMap::new();
        if let Some(directory) = &self.directory {
            inputs.insert("directory".to_string(), PortData::Path(directory.clone()));
        }
        let strings = [
            ("images", &self.images),
            ("sort_order", &self.sort_order),
            ("resize_method", &self.resize_method),
        ];
        for (name, value) in strings {
            if let Some(value) = value {
                inputs.insert(name.to_string(), PortData::Str(value.clone()));
            }
        }
        if self.natural || self.no_natural {
            inputs.insert("natural_sort".to_string(), PortData::Bool(self.natural));
        }
        if self.case_sensitive {
            inputs.insert("case_sensitive".to_string(), PortData::Bool(true));
        }
        inputs
    }
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    let resolved_data_dir = data_dir(cli.data_dir.as_deref());

    init_logging(LoggingOptions {
        data_dir: Some(resolved_data_dir.clone()),
        verbose: cli.verbose,
        log_filter: cli.log_filter.clone(),
        rust_log: std::env::var("RUST_LOG").ok(),
    });
    log_startup_metadata(&resolved_data_dir);

    match cli.command {
        Commands::Init => run_init(&resolved_data_dir),
        Commands::Outpaint(args) => run_outpaint(args, &resolved_data_dir),
        Commands::Batch(args) => run_batch(args, &resolved_data_dir),
        Commands::Prompt(args) => run_prompt(args),
        Commands::Templates => {
            print_templates(&TemplateLibrary::builtin());
            Ok(())
        }
        Commands::Nodes => {
            let json = serde_json::to_string_pretty(&all_node_descriptors())
                .context("failed to serialize node descriptors")?;
            println!("{json}");
            Ok(())
        }
    }
}

fn init_logging(options: LoggingOptions) {
    let plan = logging::plan_logging(&options);
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(parse_env_filter_with_fallback(&plan.filters.console, "console"));

    let (file_layer, console_only_reason) = match plan.sink {
        LogSink::File { appender, .. } => {
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(appender)
                .with_filter(parse_env_filter_with_fallback(&plan.filters.file, "file"));
            (Some(layer), None)
        }
        LogSink::ConsoleOnly { reason } => (None, Some(reason)),
    };

    let subscriber = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer);
    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!(
            "Failed to initialize tracing subscriber: {error}. Continuing without structured tracing."
        );
        return;
    }

    if let Some(reason) = console_only_reason {
        warn!(%reason, "Log file unavailable; logging to console only");
    }
}

fn parse_env_filter_with_fallback(filter: &str, sink_name: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_new(filter).unwrap_or_else(|error| {
        eprintln!(
            "Invalid {sink_name} log filter '{filter}': {error}. Falling back to '{DEFAULT_LOG_FILTER}'."
        );
        tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)
    })
}

fn log_startup_metadata(data_dir: &Path) {
    info!(
        pid = std::process::id(),
        data_dir = %data_dir.display(),
        config_path = %config_path(data_dir).display(),
        "Runtime startup metadata"
    );
}

fn load_config(data_dir: &Path) -> AppConfig {
    match AppConfig::load_from_path(&config_path(data_dir)) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %format!("{err:#}"), "Failed to load config file, using defaults");
            AppConfig::default()
        }
    }
}

fn run_init(data_dir: &Path) -> Result<()> {
    initialize_data_dir(data_dir)?;
    let config = load_config(data_dir);
    for dir in [config.input_dir(data_dir), config.output_dir(data_dir)] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    }
    info!(data_dir = %data_dir.display(), "Initialized data directory");
    Ok(())
}

fn run_node(
    registry: &NodeRegistry,
    node_type: &str,
    params: HashMap<String, serde_json::Value>,
    inputs: &HashMap<String, PortData>,
    ctx: &ExecutionContext,
) -> Result<HashMap<String, PortData>> {
    let mut node = registry.create(node_type, params)?;
    info!(node_type, inputs = inputs.len(), "Executing node");
    node.execute(inputs, ctx)
}

fn run_outpaint(args: OutpaintArgs, data_dir: &Path) -> Result<()> {
    if !args.input.is_file() {
        bail!("Input image does not exist: {}", args.input.display());
    }
    let config = load_config(data_dir);
    let image_path = args.output.clone().unwrap_or_else(|| {
        config
            .output_dir(data_dir)
            .join(format!("{}_outpaint.png", file_stem(&args.input)))
    });
    let mask_path = args.mask.clone().unwrap_or_else(|| {
        image_path.with_file_name(format!("{}_mask.png", file_stem(&image_path)))
    });

    let image = FsImageDecoder
        .decode(&args.input)
        .with_context(|| format!("Failed to load image: {}", args.input.display()))?;
    let mut inputs = args.canvas.to_inputs();
    inputs.insert("image".to_string(), PortData::Image(image));

    let registry = build_default_registry();
    let ctx = ExecutionContext::with_input_dir(config.input_dir(data_dir));
    let outputs = run_node(
        &registry,
        "OutpaintByAspectRatio",
        config.outpaint.node_params(),
        &inputs,
        &ctx,
    )?;

    write_canvas(&outputs, |_| (image_path.clone(), mask_path.clone()))?;
    print_canvas_size(&outputs)?;
    info!(
        image = %image_path.display(),
        mask = %mask_path.display(),
        outputs = %summarize_outputs(&outputs),
        "Outpaint finished"
    );
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string())
}

fn run_batch(args: BatchArgs, data_dir: &Path) -> Result<()> {
    let config = load_config(data_dir);
    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| config.output_dir(data_dir));
    let registry = build_default_registry();
    let ctx = ExecutionContext::with_input_dir(config.input_dir(data_dir));

    let loaded = run_node(
        &registry,
        "LoadImageSetSorted",
        config.dataset.node_params(),
        &args.to_inputs(),
        &ctx,
    )?;
    let batch = loaded
        .get("image")
        .cloned()
        .context("LoadImageSetSorted produced no image output")?;

    let mut inputs = args.canvas.to_inputs();
    inputs.insert("image".to_string(), batch);
    let outputs = run_node(
        &registry,
        "OutpaintByAspectRatio",
        config.outpaint.node_params(),
        &inputs,
        &ctx,
    )?;

    let written = write_canvas(&outputs, |index| {
        (
            output_dir.join(format!("{index:05}.png")),
            output_dir.join(format!("{index:05}_mask.png")),
        )
    })?;
    print_canvas_size(&outputs)?;
    info!(
        written,
        output_dir = %output_dir.display(),
        outputs = %summarize_outputs(&outputs),
        "Batch outpaint finished"
    );
    Ok(())
}

/// Save every batch item's image and mask; returns the number of items written.
fn write_canvas<F>(outputs: &HashMap<String, PortData>, file_paths: F) -> Result<usize>
where
    F: Fn(usize) -> (PathBuf, PathBuf),
{
    let (Some(PortData::Image(image)), Some(PortData::Mask(mask))) =
        (outputs.get("image"), outputs.get("mask"))
    else {
        bail!("node outputs are missing 'image' or 'mask'");
    };

    let count = image.len_of(Axis(0));
    for index in 0..count {
        let (image_path, mask_path) = file_paths(index);
        save_image(image.view(), index, &image_path)?;
        save_mask(mask.view(), index, &mask_path)?;
    }
    Ok(count)
}

fn run_prompt(args: PromptArgs) -> Result<()> {
    let mut inputs = HashMap::new();
    for item in &args.values {
        let (key, value) = parse_key_value(item)?;
        inputs.insert(key, PortData::Str(value));
    }

    let registry = build_default_registry();
    let params = HashMap::from([("template".to_string(), serde_json::json!(args.template))]);
    let outputs = run_node(
        &registry,
        "PromptTemplate",
        params,
        &inputs,
        &ExecutionContext::default(),
    )?;

    match outputs.get("prompt") {
        Some(PortData::Str(prompt)) => {
            println!("{prompt}");
            Ok(())
        }
        _ => bail!("PromptTemplate produced no prompt output"),
    }
}

fn parse_key_value(item: &str) -> Result<(String, String)> {
    let (key, value) = item
        .split_once('=')
        .with_context(|| format!("invalid --set format '{item}' (expected KEY=VALUE)"))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("invalid --set format '{item}' (empty KEY)");
    }
    Ok((key.to_string(), value.to_string()))
}

fn print_templates(library: &TemplateLibrary) {
    for summary in library.list() {
        println!("{}\t{}", summary.name, summary.label);
        let Some(template) = library.get(&summary.name) else {
            continue;
        };
        for param in &template.parameters {
            println!(
                "    {} ({}) = {}",
                param.name,
                param.label,
                param.default.render()
            );
        }
    }
}

fn print_canvas_size(outputs: &HashMap<String, PortData>) -> Result<()> {
    match (outputs.get("width"), outputs.get("height")) {
        (Some(PortData::Int(width)), Some(PortData::Int(height))) => {
            println!("{width} x {height}");
            Ok(())
        }
        _ => bail!("node outputs are missing 'width' or 'height'"),
    }
}

/// One-line `name=value` rendering of node outputs, sorted by name.
fn summarize_outputs(outputs: &HashMap<String, PortData>) -> String {
    let mut names: Vec<&String> = outputs.keys().collect();
    names.sort();
    names
        .into_iter()
        .map(|name| format!("{name}={}", format_port_data(&outputs[name])))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_port_data(data: &PortData) -> String {
    match data {
        PortData::Image(image) => {
            let (batch, height, width, channels) = image.dim();
            format!("Image[{batch}x{height}x{width}x{channels}]")
        }
        PortData::Mask(mask) => {
            let (batch, height, width) = mask.dim();
            format!("Mask[{batch}x{height}x{width}]")
        }
        PortData::Int(v) => v.to_string(),
        PortData::Str(s) => format!("\"{s}\""),
        PortData::Bool(b) => b.to_string(),
        PortData::Path(p) => p.display().to_string(),
    }
}


#[cfg(test)]
mod format_port_data_tests {
    use super::*;
    use ndarray::{Array3, Array4};
    use std::path::PathBuf;

    #[test]
    fn formats_all_variants() {
        assert_eq!(format_port_data(&PortData::Int(42)), "42");
        assert_eq!(format_port_data(&PortData::Str("hi".into())), "\"hi\"");
        assert_eq!(format_port_data(&PortData::Bool(true)), "true");
        assert_eq!(
            format_port_data(&PortData::Path(PathBuf::from("out/a.png"))),
            PathBuf::from("out/a.png").display().to_string()
        );
        assert_eq!(
            format_port_data(&PortData::Image(Array4::zeros((1, 768, 1344, 3)))),
            "Image[1x768x1344x3]"
        );
        assert_eq!(
            format_port_data(&PortData::Mask(Array3::zeros((2, 8, 4)))),
            "Mask[2x8x4]"
        );
    }
}
