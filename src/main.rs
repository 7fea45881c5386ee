use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use serde_json::{json, Value};
use tracing::{info, warn};

use job_autofill::dom::Document;
use job_autofill::form::{analyze, detect, extract, fill, Field};
use job_autofill::message::{self, Session};
use job_autofill::site;
use job_autofill::store::{self, Stat};
use job_autofill::validate;

#[derive(Parser)]
#[command(name = "job_autofill", about = "Detect, fill and extract job application forms")]
struct Cli {
    /// SQLite database holding the profile, settings and usage stats
    #[arg(long, global = true, env = "JOB_AUTOFILL_DB", default_value = store::DB_PATH)]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and classify form fields in HTML pages
    Detect {
        /// HTML files to scan
        files: Vec<PathBuf>,
        /// Fetch and scan a live page instead
        #[arg(long, conflicts_with = "files")]
        url: Option<String>,
        /// Only scan the URL when auto-detect is on and it is a known job site
        #[arg(long, requires = "url")]
        auto: bool,
        /// Print fields as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fill a page from the stored profile (or a profile file)
    Fill {
        /// HTML file to fill
        file: PathBuf,
        /// Profile JSON to use instead of the stored one
        #[arg(short, long)]
        profile: Option<PathBuf>,
        /// Write the filled page here
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pause after each field write, in milliseconds
        #[arg(long)]
        settle_ms: Option<u64>,
    },
    /// Read the page's current values back into profile shape
    Extract {
        /// HTML file to read
        file: PathBuf,
        /// Merge the extracted data into the stored profile
        #[arg(long)]
        save: bool,
    },
    /// Serve JSON-line requests on stdin against one page
    Session {
        /// HTML file to load
        file: PathBuf,
        /// Write the page here when stdin closes
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Manage the stored profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Validate a profile file (or the stored profile)
    Validate {
        file: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show usage counters and recent detections
    Stats {
        /// Max detections to list
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the stored profile
    Show,
    /// Replace the stored profile with a JSON file (profile or full export)
    Import { file: PathBuf },
    /// Export profile, settings and stats
    Export {
        /// Write here instead of stdout
        file: Option<PathBuf>,
    },
    /// Delete all stored data
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let conn = store::connect(&cli.db)?;
    store::init_schema(&conn)?;

    let result = match cli.command {
        Commands::Detect {
            files,
            url,
            auto,
            json,
        } => {
            let pages = match url {
                Some(url) => {
                    let settings = store::load_settings(&conn)?;
                    info!("{} job site: {}", url, site::is_job_site(&url));
                    if auto && !settings.auto_detects(&url) {
                        println!("Skipping {}: auto-detect is off or not a known job site", url);
                        Vec::new()
                    } else {
                        let html = fetch_page(&url).await?;
                        if auto {
                            tokio::time::sleep(settings.auto_detect_delay()).await;
                        }
                        vec![(url, detect(&Document::parse(&html)))]
                    }
                }
                None if files.is_empty() => bail!("Give one or more HTML files, or --url"),
                None => detect_files(&files)?,
            };

            let mut total = 0;
            for (source, fields) in &pages {
                store::save_detection(&conn, source, fields)?;
                total += fields.len();
                if json {
                    let report = json!({
                        "source": source,
                        "fields": fields,
                        "coverage": analyze(fields),
                    });
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print_fields(source, fields);
                }
            }
            store::bump_stat(&conn, Stat::FieldsDetected, total as u64)?;
            println!("\n{} fields across {} pages", total, pages.len());
            Ok(())
        }
        Commands::Fill {
            file,
            profile,
            output,
            settle_ms,
        } => {
            let profile = match profile {
                Some(path) => read_json(&path)?,
                None => store::load_profile(&conn)?
                    .context("No stored profile. Run 'profile import' first.")?,
            };
            let mut settings = store::load_settings(&conn)?;
            if let Some(ms) = settle_ms {
                settings.settle_delay = ms;
            }

            let mut doc = load_page(&file)?;
            for warning in validate::lint(&detect(&doc), &profile) {
                warn!("{}", warning);
            }

            let report = fill(&mut doc, &profile, &settings.fill_options()).await?;
            println!(
                "Filled {} of {} fields ({} errors)",
                report.filled_count,
                report.total_fields,
                report.errors.len()
            );
            for e in &report.errors {
                println!("  - {}", e);
            }
            store::bump_stat(&conn, Stat::FormsFilled, 1)?;

            if let Some(out) = output {
                write_page(&out, &doc)?;
            }
            Ok(())
        }
        Commands::Extract { file, save } => {
            let doc = load_page(&file)?;
            let data = extract(&doc);
            println!("{}", serde_json::to_string_pretty(&data)?);

            if save {
                if data.as_object().is_some_and(|m| m.is_empty()) {
                    println!("Nothing to save.");
                } else {
                    store::merge_into_profile(&conn, &data)?;
                    store::bump_stat(&conn, Stat::DataSaved, 1)?;
                    println!("Merged into stored profile.");
                }
            }
            Ok(())
        }
        Commands::Session { file, output } => {
            let mut doc = load_page(&file)?;
            let settings = store::load_settings(&conn)?;
            store::bump_stat(&conn, Stat::SessionsStarted, 1)?;

            let (handled, settings, tally) = {
                let mut session = Session::new(&mut doc, settings);
                let stdin = tokio::io::BufReader::new(tokio::io::stdin());
                let handled = message::serve(&mut session, stdin, tokio::io::stdout()).await?;
                (handled, session.settings().clone(), session.tally())
            };

            store::save_settings(&conn, &settings)?;
            if tally.fields_detected > 0 {
                store::bump_stat(&conn, Stat::FieldsDetected, tally.fields_detected)?;
            }
            if tally.forms_filled > 0 {
                store::bump_stat(&conn, Stat::FormsFilled, tally.forms_filled)?;
            }
            info!(
                "Session closed after {} requests ({} fields filled)",
                handled, tally.fields_filled
            );

            if let Some(out) = output {
                write_page(&out, &doc)?;
            }
            Ok(())
        }
        Commands::Profile { action } => run_profile(&conn, action),
        Commands::Validate { file, json } => {
            let profile = match &file {
                Some(path) => read_json(path)?,
                None => store::load_profile(&conn)?.context("No stored profile to validate")?,
            };
            let v = validate::validate_profile(&profile);
            if json {
                println!("{}", serde_json::to_string_pretty(&v)?);
            } else {
                println!("{}", v.report());
            }
            if !v.is_valid() {
                bail!("Profile has {} errors", v.errors.len());
            }
            Ok(())
        }
        Commands::Stats { limit } => {
            let s = store::load_stats(&conn)?;
            println!("Forms filled:     {}", s.forms_filled);
            println!("Fields detected:  {}", s.fields_detected);
            println!("Data saved:       {}", s.data_saved);
            println!("Sessions started: {}", s.sessions_started);
            println!("Last used:        {}", s.last_used.as_deref().unwrap_or("never"));

            let rows = store::recent_detections(&conn, limit)?;
            if !rows.is_empty() {
                println!("\n--- Recent detections ---");
                for r in &rows {
                    println!(
                        "  {:<19} | {:>3} fields | {}",
                        truncate(&r.detected_at, 19),
                        r.field_count,
                        truncate(&r.url, 60)
                    );
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn run_profile(conn: &Connection, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::Show => match store::load_profile(conn)? {
            Some(p) => println!("{}", serde_json::to_string_pretty(&p)?),
            None => println!("No stored profile."),
        },
        ProfileAction::Import { file } => {
            let data = read_json(&file)?;
            // A full export carries the profile under "profile".
            if data.get("exportDate").is_some() {
                let bundle: store::ExportBundle =
                    serde_json::from_value(data).context("Malformed export file")?;
                store::import_all(conn, &bundle)?;
                println!("Imported export from {}", file.display());
            } else {
                let v = validate::validate_profile(&data);
                for w in &v.warnings {
                    warn!("{}", w);
                }
                if !v.is_valid() {
                    println!("{}", v.report());
                    bail!("Refusing to import an invalid profile");
                }
                store::save_profile(conn, &data)?;
                println!("Imported profile from {}", file.display());
            }
        }
        ProfileAction::Export { file } => {
            let bundle = store::export_all(conn)?;
            let text = serde_json::to_string_pretty(&bundle)?;
            match file {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{}", text),
            }
        }
        ProfileAction::Clear => {
            store::clear_all(conn)?;
            println!("Cleared all stored data.");
        }
    }
    Ok(())
}

fn detect_files(files: &[PathBuf]) -> Result<Vec<(String, Vec<Field>)>> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut pages = Vec::with_capacity(files.len());
    for chunk in files.chunks(64) {
        let results: Vec<Result<(String, Vec<Field>)>> = chunk
            .par_iter()
            .map(|path| {
                let doc = load_page(path)?;
                Ok((path.display().to_string(), detect(&doc)))
            })
            .collect();
        for r in results {
            pages.push(r?);
        }
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(pages)
}

async fn fetch_page(url: &str) -> Result<String> {
    info!("Fetching {}", url);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;
    if !resp.status().is_success() {
        bail!("{} returned HTTP {}", url, resp.status());
    }
    resp.text().await.context("Failed to read response body")
}

fn load_page(path: &Path) -> Result<Document> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Document::parse(&html))
}

fn write_page(path: &Path, doc: &Document) -> Result<()> {
    std::fs::write(path, doc.to_html())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_fields(source: &str, fields: &[Field]) {
    println!("\n{} ({} fields)", source, fields.len());
    println!(
        "{:>3} | {:<10} | {:<32} | {:<24} | {}",
        "#", "Type", "Category", "Label", "Selector"
    );
    println!("{}", "-".repeat(100));
    for (i, f) in fields.iter().enumerate() {
        println!(
            "{:>3} | {:<10} | {:<32} | {:<24} | {}",
            i + 1,
            truncate(&f.input_type, 10),
            f.category.path(),
            truncate(&f.label, 24),
            truncate(&f.selector, 30),
        );
    }

    let cov = analyze(fields);
    println!(
        "\nMapped {}/{} ({:.0}%)",
        cov.mapped,
        cov.total,
        cov.ratio() * 100.0
    );
    for (section, n) in &cov.by_section {
        println!("  {:<16} {}", section, n);
    }
    for s in &cov.suggestions {
        println!("  - {}", s);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
