use futures::executor::block_on;
use ontree_core::load::{LoadOptions, load_ontology};
use ontree_core::table::{Table, delimiter_for_path};
use ontree_core::{FileSource, MatchKey, MeasurementTable, Ontology, Stats, annotate, load_tree};
use ontree_render::encoding::js_number;
use ontree_render::layout::{Link, TreeLayout, layout_tree};
use ontree_render::svg::{SvgOptions, fit_transform, render_html, render_svg};
use ontree_render::DiagramConfig;
use serde::Serialize;
use serde_json::Value;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Core(ontree_core::Error),
    Render(ontree_render::Error),
    Json(serde_json::Error),
    Raster(&'static str),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Core(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Raster(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ontree_core::Error> for CliError {
    fn from(value: ontree_core::Error) -> Self {
        Self::Core(value)
    }
}

impl From<ontree_render::Error> for CliError {
    fn from(value: ontree_render::Error) -> Self {
        Self::Render(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Command {
    #[default]
    Tree,
    Layout,
    Render,
    Merge,
    Convert,
    Counts,
}

impl Command {
    fn inputs(self) -> usize {
        match self {
            Command::Merge | Command::Counts => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum RenderFormat {
    #[default]
    Svg,
    Html,
    Png,
}

impl FromStr for RenderFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "html" | "htm" => Ok(Self::Html),
            "png" => Ok(Self::Png),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    inputs: Vec<String>,
    measurements: Option<String>,
    match_key: MatchKey,
    id_column: Option<String>,
    config: Option<String>,
    pretty: bool,
    json: bool,
    verbose: bool,
    expand_all: bool,
    render_format: RenderFormat,
    render_scale: f32,
    background: Option<String>,
    viewport_width: Option<f64>,
    viewport_height: Option<f64>,
    out: Option<String>,
}

fn usage() -> &'static str {
    "ontree-cli\n\
\n\
USAGE:\n\
  ontree-cli [tree] [--measurements <tsv>] [--node-field <f>] [--data-field <f>] [--expand-all] [--json [--pretty]] [--out <path>] <ontology.json>\n\
  ontree-cli layout [--measurements <tsv>] [--node-field <f>] [--data-field <f>] [--expand-all] [--pretty] <ontology.json>\n\
  ontree-cli render [--format svg|html|png] [--scale <n>] [--background <css-color>] [--measurements <tsv>] [--node-field <f>] [--data-field <f>] [--expand-all] [--out <path>] <ontology.json>\n\
  ontree-cli merge [--node-field <f>] [--data-field <f>] [--pretty] [--out <path>] <ontology.json> <table>\n\
  ontree-cli convert [--pretty] [--out <path>] <classyfire.json>\n\
  ontree-cli counts [--id-column <c>] [--out <path>] <metadata> <matches>\n\
\n\
GLOBAL:\n\
  --config <path>            JSON object merged over the default diagram config\n\
  --viewport-width <w>       (default 960)\n\
  --viewport-height <h>      (default 800)\n\
  -v, --verbose              debug logging on stderr (RUST_LOG takes precedence)\n\
\n\
NOTES:\n\
  - Tables ending in .csv are comma separated, everything else is tab separated.\n\
  - Without --measurements nothing matches, so only the root is shown unless --expand-all is set.\n\
  - PNG output defaults to writing next to the ontology file.\n\
  - counts writes `ncbi` and `matched_size` columns whatever --id-column is; attach with --node-field NCBI --data-field ncbi.\n\
"
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
    it.next().ok_or(CliError::Usage(usage()))
}

fn parse_f64(raw: &str) -> Result<f64, CliError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(CliError::Usage(usage())),
    }
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        render_scale: 1.0,
        ..Default::default()
    };
    let mut command_seen = false;

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        let command = match a.as_str() {
            "tree" => Some(Command::Tree),
            "layout" => Some(Command::Layout),
            "render" => Some(Command::Render),
            "merge" => Some(Command::Merge),
            "convert" => Some(Command::Convert),
            "counts" => Some(Command::Counts),
            _ => None,
        };
        if let Some(command) = command {
            if !command_seen && args.inputs.is_empty() {
                args.command = command;
                command_seen = true;
                continue;
            }
        }

        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "--pretty" => args.pretty = true,
            "--json" => args.json = true,
            "-v" | "--verbose" => args.verbose = true,
            "--expand-all" => args.expand_all = true,
            "--measurements" => args.measurements = Some(next_value(&mut it)?.clone()),
            "--node-field" => args.match_key.node_field = next_value(&mut it)?.clone(),
            "--data-field" => args.match_key.data_field = next_value(&mut it)?.clone(),
            "--id-column" => args.id_column = Some(next_value(&mut it)?.clone()),
            "--config" => args.config = Some(next_value(&mut it)?.clone()),
            "--out" => args.out = Some(next_value(&mut it)?.clone()),
            "--format" => {
                args.render_format = next_value(&mut it)?
                    .parse::<RenderFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--scale" => {
                args.render_scale = parse_f64(next_value(&mut it)?)? as f32;
            }
            "--background" => {
                let bg = next_value(&mut it)?;
                if !bg.trim().is_empty() {
                    args.background = Some(bg.trim().to_string());
                }
            }
            "--viewport-width" => {
                args.viewport_width = Some(parse_f64(next_value(&mut it)?)?);
            }
            "--viewport-height" => {
                args.viewport_height = Some(parse_f64(next_value(&mut it)?)?);
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => args.inputs.push(path.to_string()),
        }
    }

    if args.inputs.len() != args.command.inputs() {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn build_config(args: &Args) -> Result<DiagramConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => {
            let overrides: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            DiagramConfig::default().merged(&overrides)?
        }
        None => DiagramConfig::default(),
    };
    if let Some(w) = args.viewport_width {
        config.viewport_width = w;
    }
    if let Some(h) = args.viewport_height {
        config.viewport_height = h;
    }
    Ok(config)
}

fn read_table(path: &str) -> Result<Table, CliError> {
    let text = std::fs::read_to_string(path)?;
    Ok(Table::parse(&text, delimiter_for_path(Path::new(path)))?)
}

fn load_annotated(args: &Args) -> Result<(Ontology, Stats), CliError> {
    let ontology_source = FileSource::new(&args.inputs[0]);
    let (mut ontology, totals) = match &args.measurements {
        Some(path) => {
            let options = LoadOptions {
                match_key: args.match_key.clone(),
                delimiter: delimiter_for_path(Path::new(path)),
            };
            let loaded = block_on(load_tree(&ontology_source, &FileSource::new(path), &options))?;
            (loaded.ontology, loaded.totals)
        }
        None => {
            let mut ontology = block_on(load_ontology(&ontology_source))?;
            let totals = annotate(
                &mut ontology,
                &MeasurementTable::default(),
                &args.match_key,
            );
            (ontology, totals)
        }
    };
    if args.expand_all {
        ontology.expand_all();
    }
    Ok((ontology, totals))
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None | Some("-") => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
        Some(path) => std::fs::write(path, text)?,
    }
    Ok(())
}

fn write_json(value: &impl Serialize, pretty: bool, out: Option<&str>) -> Result<(), CliError> {
    let mut text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    text.push('\n');
    write_text(&text, out)
}

fn default_raster_out_path(input: &str, ext: &str) -> PathBuf {
    PathBuf::from(input).with_extension(ext)
}

fn render_svg_to_png(svg: &str, scale: f32) -> Result<Vec<u8>, CliError> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.font_family = "sans-serif".to_string();

    let tree = usvg::Tree::from_str(svg, &opt)
        .map_err(|_| CliError::Raster("failed to parse SVG for PNG rendering"))?;
    let size = tree.size();
    let width_px = (size.width() * scale).ceil().max(1.0) as u32;
    let height_px = (size.height() * scale).ceil().max(1.0) as u32;

    let mut pixmap = tiny_skia::Pixmap::new(width_px, height_px)
        .ok_or(CliError::Raster("failed to allocate pixmap for PNG rendering"))?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    pixmap
        .encode_png()
        .map_err(|_| CliError::Raster("failed to encode PNG"))
}

/// Indented outline of the visible tree: `+` collapsed, `-` expanded.
fn tree_text(ontology: &Ontology, totals: &Stats) -> String {
    let mut out = String::new();
    for id in ontology.visible_preorder() {
        let node = &ontology[id];
        let marker = match node.branch() {
            b if b.is_collapsed() => '+',
            b if b.is_expanded() => '-',
            _ => ' ',
        };
        out.push_str(&"  ".repeat(ontology.depth(id)));
        out.push(marker);
        out.push(' ');
        out.push_str(node.name());
        let stats = node.stats();
        if stats.has_matches() {
            out.push_str(&format!(
                " [matches={} group={} fraction={}]",
                js_number(stats.matched_count),
                js_number(stats.group_size),
                js_number(stats.occurrence_fraction)
            ));
        }
        out.push('\n');
    }
    out.push_str(&format!(
        "total matches={} group={} fraction={}\n",
        js_number(totals.matched_count),
        js_number(totals.group_size),
        js_number(totals.occurrence_fraction)
    ));
    out
}

#[derive(Serialize)]
struct LayoutNodeOut<'a> {
    id: usize,
    name: &'a str,
    depth: usize,
    x: f64,
    y: f64,
    expanded: bool,
    matched_size: f64,
    group_size: f64,
    occurrence_fraction: f64,
}

#[derive(Serialize)]
struct LayoutOut<'a> {
    breadth: f64,
    depth_step: f64,
    nodes: Vec<LayoutNodeOut<'a>>,
    links: &'a [Link],
}

fn layout_out<'a>(ontology: &'a Ontology, layout: &'a TreeLayout) -> LayoutOut<'a> {
    let nodes = layout
        .nodes
        .iter()
        .map(|p| {
            let node = &ontology[p.id];
            let stats = node.stats();
            LayoutNodeOut {
                id: p.id.index(),
                name: node.name(),
                depth: p.depth,
                x: p.x,
                y: p.y,
                expanded: node.branch().is_expanded(),
                matched_size: stats.matched_count,
                group_size: stats.group_size,
                occurrence_fraction: stats.occurrence_fraction,
            }
        })
        .collect();
    LayoutOut {
        breadth: layout.breadth,
        depth_step: layout.depth_step,
        nodes,
        links: &layout.links,
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let out = args.out.as_deref();
    match args.command {
        Command::Tree => {
            let (ontology, totals) = load_annotated(&args)?;
            if args.json {
                write_json(&ontology.to_value_with_stats(), args.pretty, out)
            } else {
                write_text(&tree_text(&ontology, &totals), out)
            }
        }
        Command::Layout => {
            let config = build_config(&args)?;
            let (ontology, _) = load_annotated(&args)?;
            let layout = layout_tree(&ontology, &config);
            write_json(&layout_out(&ontology, &layout), args.pretty, out)
        }
        Command::Render => {
            let config = build_config(&args)?;
            let (ontology, _) = load_annotated(&args)?;
            let layout = layout_tree(&ontology, &config);
            let options = SvgOptions {
                transform: fit_transform(&layout, &config),
                background: args.background.clone(),
                tooltips: true,
            };
            match args.render_format {
                RenderFormat::Svg => {
                    write_text(&render_svg(&ontology, &layout, &config, &options), out)
                }
                RenderFormat::Html => {
                    let title = ontology[ontology.root()].name();
                    let html = render_html(&ontology, &layout, &config, &options, title);
                    write_text(&html, out)
                }
                RenderFormat::Png => {
                    let svg = render_svg(&ontology, &layout, &config, &options);
                    let bytes = render_svg_to_png(&svg, args.render_scale)?;
                    let path = args.out.clone().unwrap_or_else(|| {
                        default_raster_out_path(&args.inputs[0], "png")
                            .to_string_lossy()
                            .to_string()
                    });
                    if path == "-" {
                        std::io::stdout().lock().write_all(&bytes)?;
                    } else {
                        std::fs::write(path, bytes)?;
                    }
                    Ok(())
                }
            }
        }
        Command::Merge => {
            let mut ontology = Ontology::from_json_str(&std::fs::read_to_string(&args.inputs[0])?)?;
            let table = read_table(&args.inputs[1])?;
            let merged = ontree_core::extend::merge_table(&mut ontology, &table, &args.match_key)?;
            tracing::info!(merged, "merged table into ontology");
            write_json(&ontology.to_value(), args.pretty, out)
        }
        Command::Convert => {
            let text = std::fs::read_to_string(&args.inputs[0])?;
            let ontology = ontree_core::convert::classyfire_to_ontology(&text)?;
            write_json(&ontology.to_value(), args.pretty, out)
        }
        Command::Counts => {
            let metadata = read_table(&args.inputs[0])?;
            let matches = read_table(&args.inputs[1])?;
            let id_column = args
                .id_column
                .as_deref()
                .unwrap_or(ontree_core::counts::DEFAULT_ID_COLUMN);
            let counts = ontree_core::counts::count_matches(&metadata, &matches, id_column)?;
            write_text(&counts.to_tsv()?, out)
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    init_tracing(args.verbose);

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
