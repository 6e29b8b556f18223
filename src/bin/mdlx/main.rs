//! mdlx - inspect and convert MDX/MDL models.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use mdlx::mdl::{write_text, TextOptions};
use mdlx::mdx::{write_model_with, WriteOptions, WriteStrategy};
use mdlx::model::{check_face_groups, Model};
use mdlx::source::{load_model, ModelFormat, PrioritySources};

#[derive(Parser)]
#[command(name = "mdlx")]
#[command(about = "MDX/MDL model toolkit")]
#[command(version, long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("MDLX_BUILD_DATE"), ")"))]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Read files with buffered I/O instead of memory maps
    #[arg(long, global = true)]
    no_mmap: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version, chunk counts and sequences
    Info {
        file: PathBuf,

        /// Print the summary as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Convert between forms; the extension picks the output form
    Convert {
        input: PathBuf,
        output: PathBuf,

        /// Serialize to memory first, then write in one go
        #[arg(long)]
        buffered: bool,

        /// Leave out the "Exported by" comment in text output
        #[arg(long)]
        no_header: bool,
    },

    /// Read every file and report the ones that fail
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Evaluate a node's transform at a frame
    Sample {
        file: PathBuf,

        /// Object id of the node
        #[arg(short, long)]
        node: u32,

        #[arg(short, long, default_value_t = 0)]
        frame: i32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let use_mmap = !cli.no_mmap;

    match cli.command {
        Commands::Info { file, json } => cmd_info(&file, json, use_mmap),
        Commands::Convert { input, output, buffered, no_header } => {
            cmd_convert(&input, &output, buffered, no_header, use_mmap)
        }
        Commands::Check { files } => cmd_check(&files, use_mmap),
        Commands::Sample { file, node, frame } => cmd_sample(&file, node, frame, use_mmap),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    // RUST_LOG wins over the flags when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Open `path` through a resolver rooted at its directory.
fn load(path: &Path, use_mmap: bool) -> Result<Model> {
    let root = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("not a file name: {}", path.display()))?;
    let sources = PrioritySources::new().with_root(root).with_mmap(use_mmap);

    let start = Instant::now();
    let model = load_model(&sources, name).with_context(|| format!("failed to read {}", path.display()))?;
    debug!(path = %path.display(), elapsed = ?start.elapsed(), "loaded");
    Ok(model)
}

fn cmd_info(path: &Path, json: bool, use_mmap: bool) -> Result<()> {
    let model = load(path, use_mmap)?;

    if json {
        let counts: serde_json::Map<String, serde_json::Value> = model
            .chunk_counts()
            .iter()
            .map(|(tag, n)| (tag.to_string(), (*n).into()))
            .collect();
        let sequences: Vec<serde_json::Value> = model
            .sequences
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name,
                    "interval": s.interval,
                    "non_looping": s.non_looping(),
                    "move_speed": s.move_speed,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "file": path.display().to_string(),
                "version": model.version,
                "name": model.info.name,
                "counts": counts,
                "nodes": model.node_count(),
                "sequences": sequences,
            }))?
        );
        return Ok(());
    }

    println!("Model:   {}", path.display());
    println!("Name:    {}", model.info.name);
    println!("Version: {}", model.version);
    println!();
    println!("Chunks:");
    for (tag, n) in model.chunk_counts().iter().filter(|(_, n)| *n > 0) {
        println!("  {}  {}", tag, n);
    }
    println!();
    println!("Nodes: {}", model.node_count());
    if !model.sequences.is_empty() {
        println!();
        println!("Sequences ({}):", model.sequences.len());
        for s in &model.sequences {
            let looping = if s.non_looping() { " non-looping" } else { "" };
            println!("  {:<24} [{}, {}){}", s.name, s.interval[0], s.interval[1], looping);
        }
    }
    Ok(())
}

fn cmd_convert(input: &Path, output: &Path, buffered: bool, no_header: bool, use_mmap: bool) -> Result<()> {
    let model = load(input, use_mmap)?;
    let file = File::create(output).with_context(|| format!("failed to create {}", output.display()))?;

    match ModelFormat::from_path(output) {
        ModelFormat::Binary => {
            let strategy = if buffered { WriteStrategy::Buffered } else { WriteStrategy::Seekable };
            let written = write_model_with(BufWriter::new(file), &model, &WriteOptions { strategy })?;
            info!("wrote {} ({} bytes)", output.display(), written);
        }
        ModelFormat::Text => {
            let options = TextOptions { header_comment: !no_header, ..TextOptions::default() };
            write_text(BufWriter::new(file), &model, &options)?;
            info!("wrote {}", output.display());
        }
    }
    Ok(())
}

fn check_one(path: &Path, use_mmap: bool) -> Result<()> {
    let model = load(path, use_mmap)?;
    for (i, geoset) in model.geosets.iter().enumerate() {
        check_face_groups(geoset).with_context(|| format!("geoset {}", i))?;
    }
    Ok(())
}

fn cmd_check(files: &[PathBuf], use_mmap: bool) -> Result<()> {
    let results: Vec<(&PathBuf, Result<()>)> =
        files.par_iter().map(|path| (path, check_one(path, use_mmap))).collect();

    let mut failed = 0;
    for (path, result) in &results {
        match result {
            Ok(()) => println!("ok    {}", path.display()),
            Err(e) => {
                failed += 1;
                println!("FAIL  {}: {:#}", path.display(), e);
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} file(s) failed", failed, files.len());
    }
    Ok(())
}

fn cmd_sample(path: &Path, object_id: u32, frame: i32, use_mmap: bool) -> Result<()> {
    let model = load(path, use_mmap)?;
    let node = model
        .node(object_id)
        .with_context(|| format!("no object with id {}", object_id))?;

    let t = model.translation_at(object_id, frame)?;
    let r = model.rotation_at(object_id, frame)?;
    let s = model.scaling_at(object_id, frame)?;

    println!("{} \"{}\" (id {}) at frame {}", node.kind(), node.node().name, object_id, frame);
    if let Some(parent) = model.parent_of(object_id) {
        println!("  parent:      {} \"{}\"", parent.kind(), parent.node().name);
    }
    println!("  pivot:       {:?}", model.pivot_of(object_id));
    println!("  translation: [{}, {}, {}]", t.x, t.y, t.z);
    println!("  rotation:    [{}, {}, {}, {}]", r.x, r.y, r.z, r.w);
    println!("  scaling:     [{}, {}, {}]", s.x, s.y, s.z);
    Ok(())
}
