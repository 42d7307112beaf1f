use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use framecull::config::{DEFAULT_BLUR_THRESHOLD, DEFAULT_BLUR_WINDOW, DEFAULT_HASH_SIZE};
use framecull::core::blur::{BlurDetector, score_records};
use framecull::core::duplicate::find_duplicate_groups;
use framecull::core::hash::{DifferenceHasher, hash_records};
use framecull::core::loader::{discover_videos, load_images};
use framecull::core::pipeline::{benchmark, default_reviewer};
use framecull::core::record::{ImageRecord, Verdict};
use framecull::core::review::InteractiveReviewer;
use framecull::{CurationConfig, Curator};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "framecull",
    version,
    about = "Curate image datasets: drop near-duplicates, sort sharp frames from blurry ones"
)]
struct Cli {
    /// Log at debug level (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deduplicate a dataset, then sort it into `selects/` and `rejects/blurry/`
    Curate(CurateArgs),

    /// Find and list duplicate groups without touching anything
    Scan {
        /// Directory to scan
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        #[arg(long, value_name = "N", default_value_t = DEFAULT_HASH_SIZE)]
        hash_size: u32,
    },

    /// Print each image's blur score and verdict
    Score {
        /// Directory to score
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        #[arg(long, value_name = "N", default_value_t = DEFAULT_BLUR_WINDOW)]
        blur_window: u32,
        #[arg(long, value_name = "F", default_value_t = DEFAULT_BLUR_THRESHOLD)]
        blur_threshold: f64,
    },

    /// List source videos under a directory, recursively
    Videos {
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct CurateArgs {
    /// Dataset directory
    #[arg(short, long, value_name = "DIR")]
    path: PathBuf,
    /// Only show what would be deleted or moved
    #[arg(long)]
    dry_run: bool,
    /// Skip duplicate removal
    #[arg(long)]
    no_dedup: bool,
    /// Skip blur scoring and sorting
    #[arg(long)]
    keep_blurry: bool,
    #[arg(long, value_name = "N")]
    hash_size: Option<u32>,
    #[arg(long, value_name = "N")]
    blur_window: Option<u32>,
    #[arg(long, value_name = "F")]
    blur_threshold: Option<f64>,
    /// Reuse `selects/` and `rejects/` left by an earlier run
    #[arg(long)]
    overwrite: bool,
    /// Write a side-by-side montage of every duplicate group (dry run)
    #[arg(long, value_name = "DIR")]
    montage_dir: Option<PathBuf>,
    /// Pause after each duplicate group (dry run)
    #[arg(long, requires = "dry_run")]
    interactive: bool,
    /// JSON config file; flags given here override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

impl CurateArgs {
    fn to_config(&self) -> Result<CurationConfig> {
        let mut config = match &self.config {
            Some(file) => CurationConfig::from_file(file)
                .with_context(|| format!("Failed to load config {}", file.display()))?,
            None => CurationConfig::default(),
        };

        if self.dry_run {
            config.dry_run = true;
        }
        if self.no_dedup {
            config.deduplicate = false;
        }
        if self.keep_blurry {
            config.remove_blurry = false;
        }
        if let Some(hash_size) = self.hash_size {
            config.hash_size = hash_size;
        }
        if let Some(window) = self.blur_window {
            config.blur_window = window;
        }
        if let Some(threshold) = self.blur_threshold {
            config.blur_threshold = threshold;
        }
        if self.overwrite {
            config.overwrite = true;
        }
        if let Some(dir) = &self.montage_dir {
            config.montage_dir = Some(dir.clone());
        }
        config.show_progress = !self.json;

        config.validate().context("Invalid options")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Curate(args) => curate(&args)?,

        Commands::Scan { path, hash_size } => {
            println!("▶ Scanning for duplicates in: {}", path.display());
            let hasher = DifferenceHasher::new(hash_size)?;
            let images = load_with_spinner(&path)?;

            println!("▶ Parallel hashing {} images…", images.len());
            let bar = progress_bar(images.len(), "Hashing")?;
            let (hashed, failures) =
                benchmark("hashing all images", || hash_records(images, &hasher, &bar));
            bar.finish_and_clear();
            report_unreadable(failures.len());

            let groups = find_duplicate_groups(&hashed);
            if groups.is_empty() {
                println!("No duplicates found.");
            } else {
                println!("Found {} duplicate group(s):", groups.len());
                for (i, (hash, files)) in groups.iter().enumerate() {
                    println!("\n✨ Group {} ({:016x}):", i + 1, hash);
                    println!("   🏆 Keeping → {}", files[0].display());
                    for file in &files[1..] {
                        println!("   ▶ {}", file.display());
                    }
                }
            }
        }

        Commands::Score {
            path,
            blur_window,
            blur_threshold,
        } => {
            let config = CurationConfig {
                blur_window,
                blur_threshold,
                ..Default::default()
            };
            config.validate().context("Invalid options")?;

            let detector = BlurDetector::new(config.blur_window, config.blur_threshold);
            let images = load_with_spinner(&path)?;
            let bar = progress_bar(images.len(), "Scoring")?;
            let (scored, failures) =
                benchmark("scoring all images", || score_records(images, &detector, &bar));
            bar.finish_and_clear();
            report_unreadable(failures.len());

            for record in &scored {
                print_score(record);
            }
            let blurry = scored
                .iter()
                .filter(|r| r.verdict == Some(Verdict::Blurry))
                .count();
            println!(
                "\n{} sharp, {} blurry (threshold {:.2})",
                scored.len() - blurry,
                blurry,
                detector.threshold()
            );
        }

        Commands::Videos { path } => {
            let videos = discover_videos(&path)
                .with_context(|| format!("Failed to list videos in {}", path.display()))?;
            if videos.is_empty() {
                println!("No videos found.");
            }
            for video in &videos {
                println!("🎞  {}", video.display());
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn curate(args: &CurateArgs) -> Result<()> {
    let config = args.to_config()?;
    let mut curator = Curator::new(config)?;
    if args.interactive {
        let reviewer = InteractiveReviewer::new(default_reviewer(curator.config()));
        curator = curator.with_reviewer(Box::new(reviewer));
    }

    let summary = curator
        .run(&args.path)
        .with_context(|| format!("Failed to curate {}", args.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    for path in &summary.removed {
        if summary.dry_run {
            println!("   🗑️  [dry-run] DELETE {}", path.display());
        } else {
            println!("   🗑️  Deleted {}", path.display());
        }
    }
    for failure in &summary.removal_failures {
        eprintln!("⚠️  Could not delete {}: {}", failure.path.display(), failure.reason);
    }
    for failure in &summary.unreadable {
        eprintln!("⚠️  Skipped {}: {}", failure.path.display(), failure.reason);
    }
    println!("\n✅ {}", summary);
    if summary.dry_run {
        println!("\n⚠️  Dry-run only; no files were changed.");
    }
    Ok(())
}

/// List the images in `dir` behind a spinner.
fn load_with_spinner(dir: &Path) -> Result<Vec<ImageRecord>> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message("Scanning for images…");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let images =
        load_images(dir).with_context(|| format!("Failed to scan {}", dir.display()))?;
    spinner.finish_with_message("Scan complete");
    Ok(images)
}

fn progress_bar(len: usize, message: &'static str) -> Result<ProgressBar> {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(ProgressStyle::with_template(
        "{spinner:.green} {msg} [{bar:30}] {pos}/{len}",
    )?);
    bar.set_message(message);
    Ok(bar)
}

fn report_unreadable(count: usize) {
    if count > 0 {
        eprintln!("⚠️  {} image(s) could not be read; see the log", count);
    }
}

fn print_score(record: &ImageRecord) {
    let (Some(score), Some(verdict)) = (record.blur_score, record.verdict) else {
        return;
    };
    let mark = match verdict {
        Verdict::Sharp => "✅",
        Verdict::Blurry => "🌫 ",
    };
    println!("{} {:>9.2}  {}", mark, score, record.sort_key);
}
