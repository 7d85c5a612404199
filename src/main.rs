use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use docbundle::{
    resolve, BundleOutcome, Bundler, Catalog, DirectorySink, DocumentFile, DocumentSet,
    FALLBACK_FILENAME, HttpFetcher, MergeRequest, ProductCategory, TracingDiagnostics,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;

#[derive(Parser)]
#[command(name = "docbundle")]
#[command(
    about = "CLI utility to fetch product documentation PDFs and bundle them into combined downloads"
)]
#[command(version = "0.1.0")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a product catalog and download the bundled documents (default behavior)
    Fetch {
        /// Path to the product catalog JSON file
        catalog: PathBuf,

        /// Product category tag of the product page
        #[arg(short = 'k', long = "category", default_value = "")]
        category: ProductCategory,

        /// Output directory used to save files
        #[arg(short = 'o', long = "outDir", default_value = "output_docbundle")]
        out_dir: String,

        /// Only produce one of the two bundles (by default both are produced)
        #[arg(long = "only", value_enum)]
        only: Option<SetArg>,

        /// Preserve the individual source PDFs next to the bundle
        #[arg(short = 'p', long = "keep-parts")]
        keep_parts: bool,

        /// Request timeout in seconds (no timeout unless given)
        #[arg(short = 't', long = "timeout", value_parser = parse_timeout)]
        timeout: Option<f64>,
    },
    /// Merge PDFs fetched from the given URLs into a single document
    Merge {
        /// Base name of the combined output file
        #[arg(short = 'n', long = "name", default_value = "combined")]
        name: String,

        /// Output directory used to save files
        #[arg(short = 'o', long = "outDir", default_value = "output_docbundle")]
        out_dir: String,

        /// Request timeout in seconds (no timeout unless given)
        #[arg(short = 't', long = "timeout", value_parser = parse_timeout)]
        timeout: Option<f64>,

        /// URLs of the PDF files to merge, in order
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Show which documents a category resolves to without downloading
    Plan {
        /// Path to the product catalog JSON file
        catalog: PathBuf,

        /// Product category tag of the product page
        #[arg(short = 'k', long = "category", default_value = "")]
        category: ProductCategory,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SetArg {
    DataSheets,
    Conformity,
}

impl From<SetArg> for DocumentSet {
    fn from(arg: SetArg) -> Self {
        match arg {
            SetArg::DataSheets => DocumentSet::DataSheets,
            SetArg::Conformity => DocumentSet::Conformity,
        }
    }
}

fn parse_timeout(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|_| "Not a number.")?;
    if value < 0.0 {
        return Err("Must be zero or positive number.".to_string());
    }
    Ok(value)
}

fn build_bundler(out_dir: &str, keep_parts: bool, timeout: Option<f64>) -> Result<Bundler> {
    let timeout = timeout.map(Duration::from_secs_f64);
    let fetcher = Arc::new(HttpFetcher::with_timeout(timeout)?);
    let sink = Arc::new(DirectorySink::new(out_dir, fetcher.clone()));
    let diag = Arc::new(TracingDiagnostics);

    Ok(Bundler::new(fetcher, sink, diag).keep_parts(keep_parts))
}

async fn run_fetch(
    catalog_path: PathBuf,
    category: ProductCategory,
    out_dir: String,
    only: Option<SetArg>,
    keep_parts: bool,
    timeout: Option<f64>,
) -> Result<()> {
    let catalog = Catalog::load(&catalog_path).await?;
    if catalog.is_empty() {
        warn!("No download data available for category {}", category);
        return Ok(());
    }

    let resolved = resolve(&category, &catalog);
    if resolved.is_empty() {
        warn!("No documents available for category {}", category);
        return Ok(());
    }

    let bundler = build_bundler(&out_dir, keep_parts, timeout)?;

    let sets: Vec<DocumentSet> = match only {
        Some(set) => vec![set.into()],
        None => DocumentSet::ALL.to_vec(),
    };

    for set in sets {
        let files = resolved.files_for(set);
        if files.is_empty() {
            warn!("No {} available for category {}", set.describe(), category);
            continue;
        }

        let outcome = bundler
            .run(MergeRequest {
                files: files.to_vec(),
                output_name: set.output_name(&category),
            })
            .await?;
        report(set.describe(), &outcome);
    }

    Ok(())
}

async fn run_merge(
    name: String,
    out_dir: String,
    timeout: Option<f64>,
    urls: Vec<String>,
) -> Result<()> {
    let files: Vec<DocumentFile> = urls
        .iter()
        .map(|url| DocumentFile {
            name: filename_from_url(url),
            url: url.clone(),
        })
        .collect();

    info!("Merging {} documents into {}", files.len(), name.green());

    let bundler = build_bundler(&out_dir, false, timeout)?;
    let outcome = bundler
        .run(MergeRequest {
            files,
            output_name: name,
        })
        .await?;
    report("merged document", &outcome);

    Ok(())
}

async fn run_plan(catalog_path: PathBuf, category: ProductCategory) -> Result<()> {
    let catalog = Catalog::load(&catalog_path).await?;
    let resolved = resolve(&category, &catalog);

    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

fn filename_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.last().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

fn report(what: &str, outcome: &BundleOutcome) {
    match outcome {
        BundleOutcome::Nothing | BundleOutcome::AlreadyRunning => {}
        BundleOutcome::Single { filename } => {
            info!("Saved {} as {}", what, filename.green());
        }
        BundleOutcome::Merged {
            filename,
            pages,
            merged_files,
            skipped_files,
        } => {
            if *skipped_files > 0 {
                warn!(
                    "Skipped {} of {} documents",
                    skipped_files,
                    merged_files + skipped_files
                );
            }
            info!("Saved {} as {} ({} pages)", what, filename.green(), pages);
        }
        BundleOutcome::Fallback { url } => {
            warn!("Bundling failed, saved the first document from {}", url);
        }
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::from_default_env().add_directive("docbundle=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Fetch {
            catalog,
            category,
            out_dir,
            only,
            keep_parts,
            timeout,
        } => run_fetch(catalog, category, out_dir, only, keep_parts, timeout).await,
        Commands::Merge {
            name,
            out_dir,
            timeout,
            urls,
        } => run_merge(name, out_dir, timeout, urls).await,
        Commands::Plan { catalog, category } => run_plan(catalog, category).await,
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        process::exit(1);
    }
}
