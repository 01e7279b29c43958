use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use vidriera::catalog::{Catalog, category_label};
use vidriera::config::SearchConfig;
use vidriera::core::{SearchEngine, SearchOutcome};
use vidriera::stats::CatalogReport;

const MAX_ERROR_ROWS: usize = 10;

#[derive(Parser, Debug)]
#[command(
    name = "vidriera",
    version,
    about = "Clothing catalog statistics and search by photo"
)]
struct Cli {
    /// Directory with the per-brand JSON files
    #[arg(long, global = true, value_name = "DIR", env = "VIDRIERA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Fingerprint index file (default: <tmp>/product_image_phashes.json)
    #[arg(long, global = true, value_name = "FILE", env = "VIDRIERA_CACHE_FILE")]
    cache_file: Option<PathBuf>,

    /// Per-image download timeout in seconds
    #[arg(long, global = true, value_name = "SECS", env = "VIDRIERA_FETCH_TIMEOUT")]
    timeout: Option<u64>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find catalog products that look like a photo
    Search {
        /// Image to search with
        #[arg(short, long, value_name = "FILE")]
        image: PathBuf,
        /// Number of results
        #[arg(short = 'n', long, value_name = "N")]
        top: Option<usize>,
        /// Re-fingerprint every product image before searching
        #[arg(long)]
        rebuild: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the fingerprint index
    Index {
        #[command(subcommand)]
        command: IndexCmd,
    },

    /// Counts, average prices, most expensive items and suspicious listings
    Stats,

    /// Write the whole catalog into one JSON file
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "productos_unificados.json")]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum IndexCmd {
    /// Build the index, reusing the cached one unless --force
    Build {
        #[arg(long)]
        force: bool,
    },
    /// Show what the cached index contains
    Info,
    /// Delete the cached index
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = config_from(&cli);

    match cli.command {
        Commands::Search {
            image,
            top,
            rebuild,
            json,
        } => {
            let catalog = load_catalog(&config)?;
            let engine = SearchEngine::from_config(&config);
            let top_n = top.unwrap_or(config.top_n);

            println!("▶ Searching {} products for: {}", catalog.len(), image.display());
            let progress = index_progress()?;
            let outcome = benchmark("search", || {
                engine.search_with_progress(&image, catalog.products(), top_n, rebuild, progress)
            });

            if json {
                println!("{}", outcome_json(&outcome)?);
                return Ok(());
            }

            match outcome {
                SearchOutcome::IndexUnavailable => {
                    println!(
                        "⚠️  No product images are indexed yet. Check the network connection and that products have image URLs."
                    );
                }
                SearchOutcome::QueryUnavailable => {
                    println!("⚠️  Could not read the query image {}", image.display());
                }
                SearchOutcome::Matches(results) if results.is_empty() => {
                    println!("No similar products found.");
                }
                SearchOutcome::Matches(results) => {
                    println!("Found {} similar product(s):", results.len());
                    for (i, r) in results.iter().enumerate() {
                        println!(" {:>2}. [{:.3}] {}", i + 1, r.score, r.product);
                        println!("     {}", r.product.link);
                        if let Some(label) = category_label(&r.product.brand) {
                            println!("     {}", label);
                        }
                    }
                }
            }
        }

        Commands::Index { command } => match command {
            IndexCmd::Build { force } => {
                let catalog = load_catalog(&config)?;
                let engine = SearchEngine::from_config(&config);
                let with_images = catalog.iter().filter(|p| p.has_image()).count();
                println!(
                    "▶ Indexing {} product images into {}",
                    with_images,
                    engine.cache().path().display()
                );

                let progress = index_progress()?;
                let index = benchmark("building index", || {
                    engine
                        .index_builder()
                        .with_progress(progress)
                        .build(catalog.products(), force)
                });

                if index.is_empty() {
                    println!("⚠️  No product images could be indexed.");
                } else {
                    println!(
                        "✅ {} products under {} fingerprints",
                        index.product_count(),
                        index.len()
                    );
                }
            }

            IndexCmd::Info => {
                let engine = SearchEngine::from_config(&config);
                let cache = engine.cache();
                match cache.info() {
                    Ok(Some(info)) => {
                        println!("🗂️  Index at {}", cache.path().display());
                        println!("     format:       v{} ({})", info.version, info.algorithm);
                        if let Some(built_at) = info.built_at {
                            println!("     built:        {}", built_at.to_rfc3339());
                        }
                        println!("     fingerprints: {}", info.fingerprints);
                        println!("     products:     {}", info.products);
                    }
                    Ok(None) => println!("No index at {}", cache.path().display()),
                    Err(e) => println!(
                        "⚠️  Index at {} is unusable and will be rebuilt: {}",
                        cache.path().display(),
                        e
                    ),
                }
            }

            IndexCmd::Clear => {
                let engine = SearchEngine::from_config(&config);
                let path = engine.cache().path();
                if engine
                    .cache()
                    .clear()
                    .with_context(|| format!("Failed to delete {}", path.display()))?
                {
                    println!("🧹 Removed {}", path.display());
                } else {
                    println!("No index at {}", path.display());
                }
            }
        },

        Commands::Stats => {
            let catalog = load_catalog(&config)?;
            print_report(&CatalogReport::new(catalog.products()));
        }

        Commands::Export { out } => {
            let catalog = load_catalog(&config)?;
            let count = catalog
                .export_json(&out)
                .with_context(|| format!("Failed to export catalog to {}", out.display()))?;
            println!("✔ Wrote {}", out.display());
            println!("📦 {} products", count);
        }
    }

    Ok(())
}

fn config_from(cli: &Cli) -> SearchConfig {
    let mut config = SearchConfig::default();
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(file) = &cli.cache_file {
        config = config.with_cache_file(file);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_fetch_timeout_secs(secs);
    }
    log::debug!("Using {:?}", config);
    config
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn load_catalog(config: &SearchConfig) -> Result<Catalog> {
    println!("📁 Reading catalog from {}", config.data_dir.display());
    Catalog::load(&config.data_dir)
        .with_context(|| format!("Failed to load catalog from {:?}", config.data_dir))
}

fn index_progress() -> Result<ProgressBar> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} images")?
            .progress_chars("=> "),
    );
    Ok(bar)
}

/// Results as a JSON array, or a `{"status": ...}` object when nothing could be searched.
fn outcome_json(outcome: &SearchOutcome) -> serde_json::Result<String> {
    match outcome {
        SearchOutcome::IndexUnavailable => {
            serde_json::to_string(&serde_json::json!({ "status": "index_unavailable" }))
        }
        SearchOutcome::QueryUnavailable => {
            serde_json::to_string(&serde_json::json!({ "status": "query_unavailable" }))
        }
        SearchOutcome::Matches(results) => serde_json::to_string_pretty(results),
    }
}

fn print_report(report: &CatalogReport<'_>) {
    println!("📦 Total products: {}\n", report.total);

    println!("📊 Products per brand:");
    for (brand, count) in &report.by_brand {
        println!("   • {}: {}", brand, count);
    }

    println!("\n💲 Average price per brand:");
    for (brand, avg) in &report.average_price {
        println!("   • {}: ${:.2}", brand, avg);
    }

    println!("\n🔥 Most expensive:");
    for p in &report.top_priced {
        println!("   • {} - ${} ({})", p.name, p.price, p.brand);
    }

    println!("\n⚠️  Possible errors (price 0 / no link / no name):");
    if report.with_errors.is_empty() {
        println!("   ✔ None found");
    } else {
        for p in report.with_errors.iter().take(MAX_ERROR_ROWS) {
            println!("   • {}", p);
        }
        println!("   Total with errors: {}", report.with_errors.len());
    }
}

/// Run `f()`, print how long it took (with `label`), and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    println!("⏱ {} took {:.2?}", label, start.elapsed());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidriera::config::DEFAULT_CACHE_FILE_NAME;

    #[test]
    fn test_cli_parses_search() {
        let cli = Cli::try_parse_from([
            "vidriera", "search", "--image", "photo.jpg", "-n", "3", "--rebuild",
        ])
        .unwrap();
        match cli.command {
            Commands::Search {
                image, top, rebuild, json,
            } => {
                assert_eq!(image, PathBuf::from("photo.jpg"));
                assert_eq!(top, Some(3));
                assert!(rebuild);
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_feed_config() {
        let cli = Cli::try_parse_from([
            "vidriera", "index", "build", "--force", "--data-dir", "catalog", "--cache-file",
            "idx.json", "--timeout", "3",
        ])
        .unwrap();
        let config = config_from(&cli);
        assert_eq!(config.data_dir, PathBuf::from("catalog"));
        assert_eq!(config.cache_file, PathBuf::from("idx.json"));
        assert_eq!(config.fetch_timeout_secs, 3);
        assert!(matches!(
            cli.command,
            Commands::Index {
                command: IndexCmd::Build { force: true }
            }
        ));
    }

    #[test]
    fn test_json_outcome_is_always_json() {
        let parse = |outcome: SearchOutcome| -> serde_json::Value {
            serde_json::from_str(&outcome_json(&outcome).unwrap()).unwrap()
        };
        assert_eq!(parse(SearchOutcome::IndexUnavailable)["status"], "index_unavailable");
        assert_eq!(parse(SearchOutcome::QueryUnavailable)["status"], "query_unavailable");
        assert_eq!(parse(SearchOutcome::Matches(Vec::new())), serde_json::json!([]));
    }

    #[test]
    fn test_default_cache_file_name() {
        let cli = Cli::try_parse_from(["vidriera", "index", "info"]).unwrap();
        if cli.cache_file.is_none() {
            assert!(config_from(&cli).cache_file.ends_with(DEFAULT_CACHE_FILE_NAME));
        }
    }
}
