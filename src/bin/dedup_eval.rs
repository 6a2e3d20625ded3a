//! Offline tuning tool: grid-search the dedup thresholds against a labeled
//! corpus.
//!
//! Usage: `dedup-eval <corpus.json> [config.yaml]`
//!
//! The corpus is a JSON array of articles with an optional `duplicate_of`
//! label naming the original each duplicate should resolve to.

use std::fs;

use anyhow::Context;

use newsdedup::eval::{grid_search, GridSpace, LabeledArticle};
use newsdedup::AppConfig;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let corpus_path = args
        .next()
        .context("usage: dedup-eval <corpus.json> [config.yaml]")?;
    let config = match args.next() {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::default(),
    };

    let raw = fs::read_to_string(&corpus_path)
        .with_context(|| format!("reading corpus {corpus_path}"))?;
    let corpus: Vec<LabeledArticle> =
        serde_json::from_str(&raw).context("parsing labeled corpus")?;
    let labeled_dups = corpus.iter().filter(|a| a.duplicate_of.is_some()).count();
    println!(
        "corpus: {} articles, {} labeled duplicates",
        corpus.len(),
        labeled_dups
    );

    let reports = grid_search(
        &corpus,
        &config.sketch_config(),
        config.source_config(),
        &config.resolver_config(),
        &GridSpace::default(),
    )?;

    println!(
        "{:<4} {:<6} {:<10} {:<10} {:>9} {:>8} {:>7} {:>10}",
        "k", "perms", "coll_frac", "overlap", "precision", "recall", "dup_f1", "composite"
    );
    for report in &reports {
        println!(
            "{:<4} {:<6} {:<10.2} {:<10.2} {:>9.3} {:>8.3} {:>7.3} {:>10.3}",
            report.params.shingle_length,
            report.params.permutation_count,
            report.params.hash_collision_fraction,
            report.params.overlap_threshold,
            report.duplicate.precision(),
            report.duplicate.recall(),
            report.duplicate.f1(),
            report.composite(),
        );
    }

    if let Some(best) = reports.first() {
        println!(
            "\nbest: shingle_length={} hash_collision_fraction={} overlap_threshold={} (composite {:.3})",
            best.params.shingle_length,
            best.params.hash_collision_fraction,
            best.params.overlap_threshold,
            best.composite(),
        );
    }
    Ok(())
}
