use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;
use shared::{list_digest_files, load_digest, DigestData, DigestRenderer};
use std::io::{self, Write as _};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "render-digest")]
#[command(about = "Re-render a saved news digest as HTML")]
struct Args {
    /// Path to the digest JSON file (if not provided, will list saved digests)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Output HTML file
    #[arg(short, long, default_value = "Output.html")]
    output: PathBuf,
}

fn main() -> Result<()> {
    shared::logging::init_logging();

    let args = Args::parse();

    let digest_file = if let Some(path) = args.file {
        path
    } else {
        select_digest_file()?
    };

    println!("📖 Reading digest: {}", digest_file.display());
    let data = load_digest(&digest_file)?;

    println!(
        "✓ Loaded {} clusters covering {} items",
        data.clusters.len(),
        data.counts.total()
    );

    println!("\n📝 Generating HTML digest...");
    let html = DigestRenderer::generate(&data.clusters, &data.counts, generated_at(&data));
    DigestRenderer::save(&html, &args.output).context("Failed to save HTML file")?;

    println!("\n✅ HTML saved to: {}", args.output.display());

    Ok(())
}

/// The digest's own creation time, so a re-render matches the original page
fn generated_at(data: &DigestData) -> DateTime<Local> {
    DateTime::parse_from_rfc3339(&data.created_at)
        .map(|dt| dt.with_timezone(&Local))
        .unwrap_or_else(|_| Local::now())
}

fn select_digest_file() -> Result<PathBuf> {
    let digests = list_digest_files()?;

    if digests.is_empty() {
        anyhow::bail!("No saved digests found. Run collect-news first.");
    }

    println!("Available digests:\n");
    for (i, (path, data)) in digests.iter().enumerate() {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let created = DateTime::parse_from_rfc3339(&data.created_at)
            .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        println!(
            "  {}) {} ({} items, created: {})",
            i + 1,
            filename,
            data.counts.total(),
            created
        );
    }

    print!("\nSelect digest (1-{}): ", digests.len());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let selection: usize = input
        .trim()
        .parse()
        .context("Invalid selection. Please enter a number.")?;

    if selection < 1 || selection > digests.len() {
        anyhow::bail!("Selection out of range. Please choose 1-{}", digests.len());
    }

    Ok(digests[selection - 1].0.clone())
}
