use anyhow::Result;
use clap::{Parser, Subcommand};
use paper_core::persist::{save_index, IndexPaths};
use paper_core::{AnalyzerConfig, Document, Engine};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

mod record;

use record::read_records;

#[derive(Parser)]
#[command(name = "paper-indexer")]
#[command(about = "Build a searchable snapshot from extracted paper JSON files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a JSON file or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Index surface forms instead of English stems
        #[arg(long, default_value_t = false)]
        no_stem: bool,
        /// Keep stop words in the index
        #[arg(long, default_value_t = false)]
        keep_stopwords: bool,
    },
}

#[derive(Debug, Default, PartialEq, Eq)]
struct BuildStats {
    indexed: usize,
    skipped: usize,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, no_stem, keep_stopwords } => {
            let config = AnalyzerConfig { stem: !no_stem, remove_stopwords: !keep_stopwords };
            build_index(Path::new(&input), Path::new(&output), config).map(|_| ())
        }
    }
}

fn collect_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("json") {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    // Stable order keeps document ids reproducible across runs.
    files.sort();
    files
}

fn build_index(input: &Path, output: &Path, config: AnalyzerConfig) -> Result<BuildStats> {
    let engine = Engine::new(config);
    let mut stats = BuildStats::default();

    let files = collect_files(input);
    if files.is_empty() {
        tracing::warn!(input = %input.display(), "no JSON files found");
    }
    for file in &files {
        let parsed = match read_records(file) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "skipping invalid JSON file");
                stats.skipped += 1;
                continue;
            }
        };
        for reason in &parsed.rejected {
            tracing::warn!(file = %file.display(), reason = %reason, "skipping invalid record");
        }
        stats.skipped += parsed.rejected.len();
        for rec in parsed.records {
            engine.add_document(Document::from(rec))?;
            stats.indexed += 1;
        }
    }
    tracing::info!(indexed = stats.indexed, skipped = stats.skipped, "ingested documents");

    engine.finalize()?;
    let index = engine.index()?;
    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    save_index(&IndexPaths::new(output), &index, &created_at)?;

    tracing::info!(output = %output.display(), "index build complete");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper_core::persist::load_index;
    use paper_core::Field;
    use std::fs;
    use tempfile::tempdir;

    fn paper_json(title: &str, country: &str) -> String {
        format!(
            r#"{{"title": "{title}", "publication_date": "2020", "full_text": "body text",
                "authors": [{{"full_name": "Grace Hopper",
                              "affiliations": [{{"organization": "Navy", "address": {{"country": "{country}"}}}}]}}]}}"#
        )
    }

    #[test]
    fn builds_snapshot_and_skips_bad_input() {
        let input = tempdir().unwrap();
        let nested = input.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(input.path().join("a.json"), paper_json("Compilers for everyone", "USA")).unwrap();
        fs::write(nested.join("b.json"), paper_json("Graph search", "Canada")).unwrap();
        fs::write(input.path().join("c.json"), r#"{"title": "missing everything else"}"#).unwrap();
        fs::write(input.path().join("d.json"), "not json at all").unwrap();
        fs::write(input.path().join("notes.txt"), "ignored").unwrap();

        let output = tempdir().unwrap();
        let stats = build_index(input.path(), output.path(), AnalyzerConfig::default()).unwrap();
        assert_eq!(stats, BuildStats { indexed: 2, skipped: 2 });

        let index = load_index(&IndexPaths::new(output.path())).unwrap();
        let hits = index.query("canada", &[Field::Address], 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.title, "Graph search");
        assert_eq!(hits[0].document.authors, "Grace Hopper");
    }

    #[test]
    fn ids_follow_sorted_file_order() {
        let input = tempdir().unwrap();
        fs::write(input.path().join("b.json"), paper_json("second", "X")).unwrap();
        fs::write(input.path().join("a.json"), paper_json("first", "Y")).unwrap();
        let output = tempdir().unwrap();
        build_index(input.path(), output.path(), AnalyzerConfig::default()).unwrap();
        let index = load_index(&IndexPaths::new(output.path())).unwrap();
        assert_eq!(index.get(0).unwrap().title, "first");
        assert_eq!(index.get(1).unwrap().title, "second");
    }
}
