//! Kestrel CLI - render JSON documents to PNG
//!
//! Usage:
//!   kestrel render page.json                      Render at the default viewport
//!   kestrel render page.json --css extra.css      Append an extra author sheet
//!   kestrel render page.json --hit 40,12          Report the node at a point
//!
//! Logging goes to stderr and follows `RUST_LOG`; `--verbose` raises the
//! default level from `warn` to `debug`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use image::RgbaImage;
use kestrel_browser::{Page, RenderConfig};
use kestrel_common::{DefaultFetcher, NoHistory};
use kestrel_dom::{DomTree, NodeId, NodeType};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

/// Kestrel - CSS layout and rasterization for JSON documents
#[derive(Parser, Debug)]
#[command(name = "kestrel", version, about, long_about = None)]
#[command(after_help = r"EXAMPLES:
    # Render to out.png at 800x600
    kestrel render page.json

    # Custom viewport, scrolled down 200px
    kestrel render page.json --width 1024 --height 768 --scroll-y 200 -o shot.png

    # Which node sits at (40, 12)?
    kestrel render page.json --hit 40,12
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lay out a document and draw it into a PNG.
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Document in the JSON node format
    #[arg(value_name = "DOC.json")]
    document: PathBuf,

    /// Extra author stylesheet, applied after the document's own sheets
    #[arg(long, value_name = "FILE")]
    css: Option<PathBuf>,

    /// Render settings as JSON
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output image
    #[arg(short, long, value_name = "FILE", default_value = "out.png")]
    output: PathBuf,

    /// Viewport width, overriding the config
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(i32::MAX)))]
    width: Option<u32>,

    /// Viewport height, overriding the config
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(i32::MAX)))]
    height: Option<u32>,

    /// Horizontal scroll offset
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    scroll_x: i32,

    /// Vertical scroll offset
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    scroll_y: i32,

    /// Document point to hit-test, as X,Y
    #[arg(long, value_name = "X,Y", value_parser = parse_point)]
    hit: Option<(i32, i32)>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Render(args) => {
            init_tracing(args.verbose);
            render_cmd(&args)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_point(raw: &str) -> Result<(i32, i32), String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but found '{raw}'"))?;
    let coordinate = |s: &str| {
        s.trim()
            .parse::<i32>()
            .map_err(|e| format!("bad coordinate '{s}': {e}"))
    };
    Ok((coordinate(x)?, coordinate(y)?))
}

/// The config file's settings with command-line overrides applied. A
/// document without a base URL resolves relative to its own location.
fn effective_config(args: &RenderArgs) -> Result<RenderConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str::<RenderConfig>(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => RenderConfig::default(),
    };
    if let Some(width) = args.width {
        config.viewport_width = width;
    }
    if let Some(height) = args.height {
        config.viewport_height = height;
    }
    if config.base_url.is_none() {
        config.base_url = Some(args.document.display().to_string());
    }
    Ok(config)
}

fn load_document(path: &Path, extra_css: Option<&Path>) -> Result<DomTree> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read document {}", path.display()))?;
    let mut dom = DomTree::from_json_str(&json)
        .with_context(|| format!("failed to load document {}", path.display()))?;
    if let Some(css_path) = extra_css {
        let css = fs::read_to_string(css_path)
            .with_context(|| format!("failed to read stylesheet {}", css_path.display()))?;
        let style = dom.element(NodeId::ROOT, "style", &[]);
        let _ = dom.text(style, &css);
    }
    Ok(dom)
}

fn render_cmd(args: &RenderArgs) -> Result<()> {
    let config = effective_config(args)?;
    let dom = load_document(&args.document, args.css.as_deref())?;
    tracing::info!(nodes = dom.len(), "document loaded");

    let mut page = Page::load(dom, &config, Arc::new(DefaultFetcher::new()), &NoHistory)?;
    page.layout(config.viewport_width)
        .context("layout failed")?;

    let mut surface = RgbaImage::new(config.viewport_width, config.viewport_height);
    page.render_into(&mut surface, (args.scroll_x, args.scroll_y))
        .context("drawing failed")?;
    surface
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!(
        "{} {} -> {}",
        "rendered".green().bold(),
        args.document.display(),
        args.output.display().cyan()
    );
    println!(
        "  {} {}x{}, document height {}, {} nodes",
        "viewport".dimmed(),
        config.viewport_width,
        config.viewport_height,
        page.document_height(),
        page.dom().len()
    );

    if let Some((x, y)) = args.hit {
        match page.at(x, y) {
            Some(id) => println!(
                "{} ({x}, {y}) -> {}",
                "hit".yellow().bold(),
                describe_path(page.dom(), id)
            ),
            None => println!("{} ({x}, {y}) -> {}", "hit".yellow().bold(), "nothing".dimmed()),
        }
    }
    Ok(())
}

/// `html > body > p#intro` style path from the outermost element to `id`.
fn describe_path(dom: &DomTree, id: NodeId) -> String {
    let mut parts: Vec<String> = std::iter::once(id)
        .chain(dom.ancestors(id))
        .filter_map(|node| describe(dom, node))
        .collect();
    parts.reverse();
    parts.join(" > ")
}

fn describe(dom: &DomTree, id: NodeId) -> Option<String> {
    match &dom.get(id)?.node_type {
        NodeType::Element(data) => {
            let mut label = data.tag_name.clone();
            if let Some(id_attr) = data.id() {
                label.push('#');
                label.push_str(id_attr);
            }
            for class in data.classes() {
                label.push('.');
                label.push_str(class);
            }
            Some(label)
        }
        NodeType::Text(_) => Some("#text".to_string()),
        NodeType::Document | NodeType::Comment(_) => None,
    }
}
