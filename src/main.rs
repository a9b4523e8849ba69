use clap::Parser;
use std::path::PathBuf;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing_subscriber::EnvFilter;

use bibtime::{RaceSession, RecognitionError, RecognitionPipeline, load_photo};

#[derive(Parser)]
#[command(name = "bibtime")]
#[command(about = "Time vertical-race athletes by reading bib numbers from arrival photos")]
struct Cli {
    /// Arrival photos, in arrival order
    #[arg(value_name = "IMAGE", required = true)]
    images: Vec<PathBuf>,

    /// Reference image of the printed bib-number frame
    #[arg(long, value_name = "PATH")]
    template: Option<PathBuf>,

    /// Race start time as HH:MM:SS (today); defaults to now
    #[arg(long, value_name = "HH:MM:SS")]
    start: Option<String>,

    /// Export results as CSV to this path
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Print one JSON object per photo instead of plain text
    #[arg(long)]
    json: bool,

    /// Only locate the bib region, skip OCR (faster, for tuning)
    #[arg(long)]
    locate_only: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Save intermediate images to this directory, one subdirectory per photo
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut pipeline = RecognitionPipeline::new();
    if let Some(template) = &args.template {
        pipeline = pipeline.with_template(template);
    }

    let mut session = RaceSession::starting_at(parse_start(args.start.as_deref())?);
    println!("Race started at {}", format_hms(session.start()));

    for path in &args.images {
        let photo = match load_photo(path) {
            Ok(photo) => photo,
            Err(e @ RecognitionError::Decode(_)) => {
                // A bad file fails that request only; later arrivals still count.
                eprintln!("{}: {}", path.display(), e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if args.locate_only {
            let located = pipeline.locate_roi(&photo);
            match located.rect {
                Some(rect) => println!(
                    "{}: {} at ({}, {}) {}x{}",
                    path.display(),
                    located.strategy,
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height
                ),
                None => println!("{}: whole image", path.display()),
            }
            continue;
        }

        let (result, diagnostics) = match pipeline.recognize_detailed(&photo) {
            Ok(output) => output,
            // Engine faults halt the run; retrying the next photo cannot help.
            Err(e) => return Err(e.into()),
        };

        if let Some(debug_dir) = &args.debug_out {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "photo".to_string());
            diagnostics.save_to(&debug_dir.join(stem))?;
        }

        let registration = session.record(&result);

        if args.json {
            println!("{}", serde_json::to_string(&result)?);
        } else if result.is_recognized() {
            println!(
                "Athlete {} registered, race time {} (via {})",
                registration.bib,
                registration.elapsed_hms(),
                result.strategy
            );
        } else {
            println!(
                "{}: could not read the bib number (via {}), arrival recorded at {}",
                path.display(),
                result.strategy,
                registration.arrival_hms()
            );
        }
    }

    if let Some(csv_path) = &args.csv {
        session.export_csv(csv_path)?;
        println!("Results written to {}", csv_path.display());
    }

    Ok(())
}

/// Parse an HH:MM:SS start time as today's local date, or use now.
fn parse_start(start: Option<&str>) -> anyhow::Result<OffsetDateTime> {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    match start {
        Some(text) => {
            let format = format_description!("[hour]:[minute]:[second]");
            let start_time = time::Time::parse(text, &format)
                .map_err(|e| anyhow::anyhow!("invalid start time {text:?}: {e}"))?;
            Ok(now.replace_time(start_time))
        }
        None => Ok(now),
    }
}

fn format_hms(instant: OffsetDateTime) -> String {
    let format = format_description!("[hour]:[minute]:[second]");
    instant.format(&format).unwrap_or_default()
}
