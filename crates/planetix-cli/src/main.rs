//! planetix CLI - dataset preparation for GNN benchmarks.
//!
//! # Usage
//!
//! ```bash
//! # Summarize a LINQS dataset under data/planetoid/Cora/
//! planetix stats data/planetoid --name Cora
//!
//! # Generate (or load) the 10 stratified folds
//! planetix split data/planetoid --name Cora --seed 42
//!
//! # Laplacian positional encodings as JSON
//! planetix pos-enc data/planetoid --name Cora --dim 8 -o cora_pe.json
//!
//! # Write a synthetic block-model dataset in LINQS format
//! planetix sbm data/synthetic --name SBM --communities 100,100,100 --p-in 0.3 --p-out 0.02
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use planetix_core::{component_stats, connected_components, LaplacianPositionalEncoder};
use planetix_data::{
    generate_sbm, write_linqs, CitationGraph, DatasetConfig, DatasetProvider, LinqsProvider,
    SbmConfig, SplitStore,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "planetix")]
#[command(about = "Dataset preparation for GNN node-classification benchmarks", long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON dataset config; command-line flags override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show statistics about a dataset
    Stats {
        /// Dataset root (contains <name>/<name>.content)
        root: PathBuf,

        /// Dataset name
        #[arg(long)]
        name: String,
    },

    /// Generate or load stratified folds
    Split {
        root: PathBuf,

        #[arg(long)]
        name: String,

        /// Number of folds
        #[arg(long)]
        folds: Option<usize>,

        /// Shuffle seed
        #[arg(long)]
        seed: Option<u64>,

        /// Validation share of each fold's non-test indices
        #[arg(long)]
        val_fraction: Option<f64>,

        /// Regenerate even if a matching split file exists
        #[arg(long)]
        force: bool,
    },

    /// Compute Laplacian positional encodings
    PosEnc {
        root: PathBuf,

        #[arg(long)]
        name: String,

        /// Encoding width
        #[arg(long, default_value = "8")]
        dim: usize,

        /// Output file (JSON)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write a stochastic block model dataset in LINQS format
    Sbm {
        /// Output root
        root: PathBuf,

        #[arg(long, default_value = "SBM")]
        name: String,

        /// Community sizes, comma separated
        #[arg(long, value_delimiter = ',', default_value = "50,50,50,50")]
        communities: Vec<usize>,

        #[arg(long, default_value = "0.3")]
        p_in: f64,

        #[arg(long, default_value = "0.02")]
        p_out: f64,

        /// Number of distinct categorical feature values
        #[arg(long, default_value = "3")]
        feature_values: usize,

        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => DatasetConfig::from_json_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => DatasetConfig::default(),
    };

    match cli.command {
        Commands::Stats { root, name } => cmd_stats(&root, &name),
        Commands::Split {
            root,
            name,
            folds,
            seed,
            val_fraction,
            force,
        } => {
            let mut split = config.split;
            if let Some(k) = folds {
                split.n_splits = k;
            }
            if seed.is_some() {
                split.seed = seed;
            }
            if let Some(f) = val_fraction {
                split.val_fraction = f;
            }
            split.force_recompute |= force;
            cmd_split(&root, &name, &split)
        }
        Commands::PosEnc {
            root,
            name,
            dim,
            output,
        } => cmd_pos_enc(&root, &name, dim, &config, &output),
        Commands::Sbm {
            root,
            name,
            communities,
            p_in,
            p_out,
            feature_values,
            seed,
        } => {
            let sbm = SbmConfig {
                community_sizes: communities,
                p_in,
                p_out,
                num_feature_values: feature_values,
                seed,
            };
            cmd_sbm(&root, &name, &sbm)
        }
    }
}

fn load_dataset(root: &Path, name: &str) -> Result<CitationGraph> {
    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Loading {name} from {}...", root.display()));

    let data = LinqsProvider::new(root)
        .load(name)
        .with_context(|| format!("Failed to load dataset {name} from {}", root.display()))?;

    pb.finish_with_message(format!("Loaded in {:.2?}", start.elapsed()));
    Ok(data)
}

fn cmd_stats(root: &Path, name: &str) -> Result<()> {
    let data = load_dataset(root, name)?;
    let stats = data.graph.stats();
    let comps = component_stats(&connected_components(&data.graph));

    println!("Dataset {}", data.name);
    println!("==========================");
    println!("Nodes:          {}", stats.num_nodes);
    println!("Edges:          {}", stats.num_edges);
    println!("Classes:        {}", data.num_classes);
    println!("Feature width:  {}", stats.node_feature_width);
    println!("Avg degree:     {:.2}", stats.avg_degree);
    println!("Self-loops:     {}", stats.num_self_loops);
    println!("Components:     {}", comps.num_components);
    println!("Largest comp.:  {} ({:.1}%)", comps.max_component_size, comps.largest_component_fraction * 100.0);
    println!();
    println!("Class histogram:");
    for (class, count) in data.class_names.iter().zip(data.class_histogram()) {
        println!("  {class:<24} {count}");
    }
    Ok(())
}

fn cmd_split(root: &Path, name: &str, split: &planetix_data::SplitConfig) -> Result<()> {
    let data = load_dataset(root, name)?;
    let store = SplitStore::new(root);

    let start = Instant::now();
    let folds = store
        .load_or_generate(name, &data.labels, split)
        .with_context(|| format!("Failed to prepare splits for {name}"))?;
    info!(elapsed = ?start.elapsed(), "splits ready");

    println!("Split file: {}", store.path(name).display());
    println!("{:>4} {:>8} {:>8} {:>8}", "fold", "train", "val", "test");
    for (i, fold) in folds.folds().enumerate() {
        println!(
            "{:>4} {:>8} {:>8} {:>8}",
            i,
            fold.train.len(),
            fold.val.len(),
            fold.test.len()
        );
    }
    Ok(())
}

fn cmd_pos_enc(
    root: &Path,
    name: &str,
    dim: usize,
    config: &DatasetConfig,
    output: &Path,
) -> Result<()> {
    let data = load_dataset(root, name)?;

    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Computing {dim}-dim positional encoding..."));
    let pe = LaplacianPositionalEncoder::new(dim)
        .with_eigen_config(config.eigen.clone())
        .encode(&data.graph)
        .with_context(|| format!("Failed to encode {name}"))?;
    pb.finish_with_message(format!("Computed in {:.2?}", start.elapsed()));

    let rows: Vec<Vec<f32>> = pe.outer_iter().map(|r| r.to_vec()).collect();
    let doc = serde_json::json!({
        "name": name,
        "dim": dim,
        "pos_enc": rows,
    });
    let file = File::create(output).with_context(|| format!("Failed to create {}", output.display()))?;
    serde_json::to_writer(BufWriter::new(file), &doc)?;

    println!("Wrote {} x {} encoding to {}", pe.nrows(), pe.ncols(), output.display());
    Ok(())
}

fn cmd_sbm(root: &Path, name: &str, sbm: &SbmConfig) -> Result<()> {
    if name.is_empty() {
        bail!("dataset name must not be empty");
    }
    let data = generate_sbm(name, sbm).context("Failed to generate SBM graph")?;
    write_linqs(root, &data)
        .with_context(|| format!("Failed to write dataset under {}", root.display()))?;

    println!(
        "Wrote {} ({} nodes, {} edges) to {}",
        name,
        data.graph.num_nodes(),
        data.graph.num_edges(),
        root.join(name).display()
    );
    Ok(())
}
