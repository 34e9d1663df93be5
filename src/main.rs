use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::{Builder, Env, Target};
use log::info;

use gridpca::runner::{self, FitConfig};
use gridpca::{exact, manifest, output};

/// Principal component decomposition of gridded raster archives.
#[derive(Parser, Debug)]
#[command(name = "gridpca", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Batched, memory-bounded decomposition in two passes.
    Incremental {
        #[command(flatten)]
        common: CommonArgs,
        /// Samples per batch.
        #[arg(short = 'b', long, default_value_t = 1024)]
        batch_size: usize,
        /// Seed for shuffling the fit ordering; 0 keeps timestamp order.
        #[arg(short = 'r', long, default_value_t = 0)]
        random_seed: u64,
    },
    /// Whole-dataset decomposition; loads every raster at once.
    Exact {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Directory tree containing the raster grid files.
    #[arg(short = 'i', long)]
    datapath: PathBuf,
    /// Prefix for the output files (<prefix>.proj.csv, <prefix>.pca.json).
    #[arg(short = 'o', long)]
    output: PathBuf,
    /// Log file; logs go to stderr when omitted.
    #[arg(short = 'l', long)]
    logfile: Option<PathBuf>,
    /// Number of principal components to derive.
    #[arg(short = 'n', long, default_value_t = 50)]
    n_components: usize,
    /// Raster file name suffix to scan for.
    #[arg(long, default_value = ".bin")]
    suffix: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let common = match &cli.command {
        Command::Incremental { common, .. } | Command::Exact { common } => common,
    };
    init_logging(common.logfile.as_deref())?;

    info!("scanning {} for '{}' rasters", common.datapath.display(), common.suffix);
    let found = manifest::scan(&common.datapath, &common.suffix)
        .with_context(|| format!("failed to scan {}", common.datapath.display()))?;
    if found.is_empty() {
        bail!(
            "no '{}' raster files found under {}",
            common.suffix,
            common.datapath.display()
        );
    }
    info!("manifest holds {} rasters", found.len());

    let (model, projection) = match &cli.command {
        Command::Incremental { common, batch_size, random_seed } => {
            info!(
                "incremental decomposition: {} components, batch size {batch_size}",
                common.n_components
            );
            let config = FitConfig {
                n_components: common.n_components,
                batch_size: *batch_size,
                whiten: true,
                shuffle_seed: (*random_seed != 0).then_some(*random_seed),
            };
            let model = runner::fit(&found, &config).context("fit pass failed")?;
            let projection = runner::transform(&found, &model, config.batch_size)
                .context("transform pass failed")?;
            (model, projection)
        }
        Command::Exact { common } => {
            info!("exact decomposition: {} components", common.n_components);
            exact::fit_transform(&found, common.n_components, true)
                .context("exact decomposition failed")?
        }
    };
    info!("explained variance ratio: {}", model.explained_variance_ratio());

    let proj_path = output_path(&common.output, "proj.csv");
    output::write_projection_csv(&proj_path, &found, &projection)
        .with_context(|| format!("failed to write {}", proj_path.display()))?;
    info!("wrote projections for {} rasters to {}", found.len(), proj_path.display());

    let model_path = output_path(&common.output, "pca.json");
    output::save_model(&model_path, &model)
        .with_context(|| format!("failed to write {}", model_path.display()))?;
    info!("saved model snapshot to {}", model_path.display());
    Ok(())
}

/// `<prefix>.<suffix>`, keeping whatever directory the prefix points into.
fn output_path(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Console logging by default, or a fresh log file when one is requested.
fn init_logging(logfile: Option<&Path>) -> Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();
    if let Some(path) = logfile {
        let file = File::create(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}
