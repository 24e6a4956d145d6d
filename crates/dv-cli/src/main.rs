#![forbid(unsafe_code)]

//! dotview - view DOT graphs and browse the people and work they describe.
//!
//! # Commands
//!
//! - `view`: Interactive terminal viewer with pan/zoom and the people browser
//! - `render`: Render a DOT file through Graphviz to PNG or terminal output
//! - `groups`: Print the cluster groups and their members
//! - `sanitize`: Print the cleaned-up DOT text that the viewer works on

mod app;
mod config;
mod open;
mod tui;

use std::fs::File;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dv_core::{Browser, Group};
use dv_parser::{parse_groups, sanitize};
use dv_render::{GraphvizEngine, render_graph};
use dv_term::{CanvasConfig, rasterize, to_ansi};
use image::{ImageFormat, RgbaImage};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::Session;
use crate::config::{Config, load_config};
use crate::open::SystemOpener;

/// dotview - view DOT graphs and browse the people and work they describe.
#[derive(Debug, Parser)]
#[command(
    name = "dotview",
    version,
    about = "dotview - view DOT graphs and browse the people and work they describe",
    long_about = "A terminal viewer for Graphviz DOT documents.\n\n\
        Renders through the Graphviz `dot` program and groups the nodes of\n\
        each cluster into a searchable people-and-work browser."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Enable verbose logging (can be repeated for more detail: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file. Defaults to ./dotview.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the interactive viewer (the default command).
    View {
        /// DOT file to open on start.
        input: Option<PathBuf>,

        /// Write logs to this file. The viewer does not log otherwise.
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Render a DOT file to PNG or terminal output.
    Render {
        /// Input file path or "-" for stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "png")]
        format: OutputFormat,

        /// Output file path. If omitted, writes to stdout.
        #[arg(short, long)]
        output: Option<String>,

        /// Resize factor applied to the Graphviz output
        #[arg(short, long, default_value_t = 1.0)]
        scale: f64,

        /// Terminal columns (term format only)
        #[arg(short = 'W', long, default_value_t = 100)]
        width: u16,

        /// Print JSON metadata (dimensions, timings, warnings) to stderr
        #[arg(long)]
        json: bool,
    },

    /// Print cluster groups and their members.
    Groups {
        /// Input file path or "-" for stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: GroupsFormat,

        /// Only members whose name or work contains this text
        #[arg(long)]
        filter: Option<String>,
    },

    /// Print the sanitized DOT text.
    Sanitize {
        /// Input file path or "-" for stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Output file path. If omitted, writes to stdout.
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Png,
    Term,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GroupsFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Debug, Serialize)]
struct RenderResult {
    format: String,
    width: u32,
    height: u32,
    scale: f64,
    output_bytes: usize,
    group_count: usize,
    node_count: usize,
    render_time_ms: f64,
    total_time_ms: f64,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GroupsOutput {
    groups: Vec<Group>,
    warnings: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::View {
        input: None,
        log_file: None,
    });

    match &command {
        Command::View { log_file, .. } => {
            if let Some(path) = log_file {
                init_file_tracing(cli.verbose, cli.quiet, path)?;
            }
        }
        _ => init_tracing(cli.verbose, cli.quiet),
    }

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    debug!("Config: {config:?}");

    match command {
        Command::View { input, .. } => cmd_view(input.as_deref(), config),

        Command::Render {
            input,
            format,
            output,
            scale,
            width,
            json,
        } => cmd_render(
            &input,
            &config,
            format,
            output.as_deref(),
            scale,
            width,
            json,
        ),

        Command::Groups {
            input,
            format,
            filter,
        } => cmd_groups(&input, format, filter.as_deref()),

        Command::Sanitize { input, output } => cmd_sanitize(&input, output.as_deref()),
    }
}

fn tracing_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_filter(verbose, quiet))
        .without_time()
        .with_writer(io::stderr)
        .try_init();
}

/// The viewer owns the screen, so its logs can only go to a file.
fn init_file_tracing(verbose: u8, quiet: bool, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file: {}", path.display()))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_filter(verbose.max(1), quiet))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}

fn load_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input).context(format!("Failed to read file: {input}"))
    }
}

fn write_output(output: Option<&str>, content: &[u8]) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).context(format!("Failed to write to: {path}"))?;
            info!("Wrote output to: {path}");
        }
        None => {
            io::stdout()
                .write_all(content)
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

// =============================================================================
// Command: view
// =============================================================================

fn cmd_view(input: Option<&Path>, config: Config) -> Result<()> {
    let engine = GraphvizEngine::new(config.graphviz.clone());
    match engine.version() {
        Ok(version) => info!("Using {version}"),
        Err(err) => warn!("Graphviz is not available, rendering will fail: {err}"),
    }

    let mut session = Session::new(Box::new(engine), Box::new(SystemOpener), config.viewer);
    if let Some(path) = input {
        session.open_path(path);
    }
    tui::run(session)
}

// =============================================================================
// Command: render
// =============================================================================

fn cmd_render(
    input: &str,
    config: &Config,
    format: OutputFormat,
    output: Option<&str>,
    scale: f64,
    width: u16,
    json_output: bool,
) -> Result<()> {
    let total_start = Instant::now();

    let source = sanitize(&load_input(input)?);
    let parsed = parse_groups(&source);
    for warning in &parsed.warnings {
        warn!("Parse warning: {warning}");
    }

    let engine = GraphvizEngine::new(config.graphviz.clone());
    let render_start = Instant::now();
    let image = render_graph(&engine, &source, scale)
        .with_context(|| format!("Failed to render {input}"))?;
    let render_time = render_start.elapsed();

    let rendered = match format {
        OutputFormat::Png => encode_png(&image)?,
        OutputFormat::Term => term_text(&image, width, config).into_bytes(),
    };
    let total_time = total_start.elapsed();

    if json_output {
        let result = RenderResult {
            format: format!("{format:?}").to_lowercase(),
            width: image.width(),
            height: image.height(),
            scale,
            output_bytes: rendered.len(),
            group_count: parsed.groups.len(),
            node_count: parsed.groups.node_count(),
            render_time_ms: render_time.as_secs_f64() * 1000.0,
            total_time_ms: total_time.as_secs_f64() * 1000.0,
            warnings: parsed.warnings,
        };
        let json_str = serde_json::to_string_pretty(&result)?;
        eprintln!("{json_str}");
    }

    write_output(output, &rendered)?;

    info!(
        "Rendered {}x{} image in {:.2}ms",
        image.width(),
        image.height(),
        total_time.as_secs_f64() * 1000.0
    );
    Ok(())
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("Failed to encode PNG")?;
    Ok(bytes)
}

/// Fit the whole image into `width` columns.
fn term_text(image: &RgbaImage, width: u16, config: &Config) -> String {
    let columns = u32::from(width.max(1));
    let block = image.width().div_ceil(columns).max(1);
    let canvas = CanvasConfig {
        pixels_per_column: block,
        background: config.viewer.background,
    };
    let cols = image.width().div_ceil(block) as usize;
    let rows = image.height().div_ceil(block * 2) as usize;
    to_ansi(&rasterize(image, 0, 0, cols, rows, &canvas))
}

// =============================================================================
// Command: groups
// =============================================================================

fn cmd_groups(input: &str, format: GroupsFormat, filter: Option<&str>) -> Result<()> {
    let source = sanitize(&load_input(input)?);
    let parsed = parse_groups(&source);
    for warning in &parsed.warnings {
        warn!("Parse warning: {warning}");
    }

    let mut browser = Browser::new(parsed.groups);
    if let Some(filter) = filter {
        browser.set_filter(filter);
    }

    let rendered = match format {
        GroupsFormat::Text => groups_text(&browser),
        GroupsFormat::Json => {
            let output = visible_output(&browser, parsed.warnings);
            let mut json = serde_json::to_string_pretty(&output)?;
            json.push('\n');
            json
        }
        GroupsFormat::Yaml => serde_yaml::to_string(&visible_output(&browser, parsed.warnings))?,
    };
    write_output(None, rendered.as_bytes())
}

fn visible_groups(browser: &Browser) -> Vec<Group> {
    let groups = browser.grouped().groups();
    browser
        .tree()
        .iter()
        .map(|tree_group| Group {
            name: tree_group.name.clone(),
            members: tree_group
                .members
                .iter()
                .map(|&member| groups[tree_group.group].members[member].clone())
                .collect(),
        })
        .collect()
}

fn visible_output(browser: &Browser, warnings: Vec<String>) -> GroupsOutput {
    GroupsOutput {
        groups: visible_groups(browser),
        warnings,
    }
}

fn groups_text(browser: &Browser) -> String {
    let mut out = String::new();
    for group in visible_groups(browser) {
        out.push_str(&group.name);
        out.push('\n');
        for record in &group.members {
            out.push_str(&format!("  {} ({})\n", record.label, record.id));
            for item in &record.work {
                out.push_str(&format!("    • {item}\n"));
            }
            if let Some(link) = record.open_link() {
                out.push_str(&format!("    link: {link}\n"));
            }
        }
    }
    out
}

// =============================================================================
// Command: sanitize
// =============================================================================

fn cmd_sanitize(input: &str, output: Option<&str>) -> Result<()> {
    let source = load_input(input)?;
    write_output(output, sanitize(&source).as_bytes())
}

#[cfg(test)]
mod tests {
    use dv_core::Browser;
    use dv_parser::{parse_groups, sanitize};
    use image::{Rgba, RgbaImage};

    use super::{Config, groups_text, term_text, tracing_filter, visible_groups};

    const TEAMS: &str = r#"digraph G {
    subgraph cluster_a { label="Team A"; alice [label="Alice", work="Design; Review", url="https://example.com/a"]; }
    carol [label="Carol"];
}
"#;

    #[test]
    fn verbosity_maps_to_filters() {
        assert_eq!(tracing_filter(0, false), "warn");
        assert_eq!(tracing_filter(2, false), "debug");
        assert_eq!(tracing_filter(9, false), "trace");
        assert_eq!(tracing_filter(3, true), "error");
    }

    #[test]
    fn groups_text_lists_members_work_and_links() {
        let browser = Browser::new(parse_groups(&sanitize(TEAMS)).groups);
        let text = groups_text(&browser);
        assert_eq!(
            text,
            "Team A\n  Alice (alice)\n    • Design\n    • Review\n    link: https://example.com/a\nOther\n  Carol (carol)\n"
        );
    }

    #[test]
    fn filtered_groups_keep_every_group() {
        let mut browser = Browser::new(parse_groups(TEAMS).groups);
        browser.set_filter("carol");
        let groups = visible_groups(&browser);
        assert_eq!(groups.len(), 2);
        assert!(groups[0].members.is_empty());
        assert_eq!(groups[1].members[0].id, "carol");
    }

    #[test]
    fn term_output_fits_the_requested_width() {
        let image = RgbaImage::from_pixel(300, 90, Rgba([0, 0, 0, 255]));
        let text = term_text(&image, 100, &Config::default());
        let lines: Vec<&str> = text.lines().collect();
        // 3 px per column, 6 px per row.
        assert_eq!(lines.len(), 15);
        assert_eq!(lines[0].matches('▀').count(), 100);
    }
}
