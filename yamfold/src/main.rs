//! `yamfold` re-serializes a YAML document, inlining anchors and merge keys on request.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::{info, LevelFilter};
use yamfold_common::{Event, Tree};
use yamfold_core::{encode, load_bytes, EncodeOptions, YamlEmitter};

#[derive(Debug, Parser)]
#[command(name = "yamfold")]
#[command(about = "Resolve YAML anchors, aliases and merge keys, and normalize style", long_about = None)]
#[command(version)]
struct Cli {
    /// YAML file to read
    source: PathBuf,

    /// Output file path (defaults to stdout)
    dest: Option<PathBuf>,

    /// Resolve all aliases to their target nodes
    #[arg(long)]
    resolve_aliases: bool,

    /// Keep YAML style from source document. Default is to normalize (block style with quotes
    /// removed where they can be)
    #[arg(long)]
    keep_style: bool,

    /// Spaces per indentation level
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(2..=9))]
    indent: u8,

    /// Print structural events in yaml-test-suite notation instead of YAML
    #[arg(long)]
    emit_events: bool,

    /// Log more, repeat for more detail (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Log errors only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn options(&self) -> EncodeOptions {
        let mut options = EncodeOptions::default();
        if self.resolve_aliases {
            options = options.resolve_aliases();
        }
        if self.keep_style {
            options = options.keep_style();
        }
        options
    }

    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let data = fs::read(&cli.source)
        .with_context(|| format!("failed to read {}", cli.source.display()))?;
    let tree = load_bytes(&data)
        .with_context(|| format!("failed to load {}", cli.source.display()))?;
    info!(
        "Loaded {} nodes from {}",
        tree.node_count(),
        cli.source.display()
    );

    let out = if cli.emit_events {
        render_events(&tree, cli.options())?
    } else {
        render_yaml(&tree, cli.options(), cli.indent)?
    };

    match &cli.dest {
        Some(dest) => {
            eprintln!("writing file to {}", dest.display());
            fs::write(dest, out).with_context(|| format!("failed to write {}", dest.display()))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(out.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn render_yaml(tree: &Tree, options: EncodeOptions, indent: u8) -> Result<String> {
    let mut out = String::new();
    let mut emitter = YamlEmitter::new(&mut out);
    emitter.indent(usize::from(indent));
    encode(tree, &mut emitter, options).context("failed to encode document")?;
    Ok(out)
}

fn render_events(tree: &Tree, options: EncodeOptions) -> Result<String> {
    let mut events: Vec<Event<'static>> = Vec::new();
    encode(tree, &mut events, options).context("failed to encode document")?;
    let mut out = String::new();
    for event in &events {
        writeln!(out, "{event}")?;
    }
    Ok(out)
}
