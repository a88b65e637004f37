//! Headline figures over a cleaned batch.

use std::collections::BTreeMap;

use anyhow::Result;
use itertools::Itertools;
use serde::Serialize;

use crate::{
    cli::SummaryArgs,
    record::{CanonicalBatch, GrowthStage},
    table,
};

const TOP_SHARE_SPAN: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictCount {
    pub district: u8,
    pub label: String,
    pub trees: usize,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub trees: usize,
    pub share: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventorySummary {
    pub total_trees: usize,
    /// Distinct non-blank French names.
    pub species_diversity: usize,
    pub remarkable_percent: f64,
    pub dominant_growth_stage: Option<String>,
    pub districts: Vec<DistrictCount>,
    pub top_species: Vec<NamedCount>,
    pub top5_share: f64,
    pub growth_stages: Vec<NamedCount>,
}

/// `1st`, `2nd`, `3rd`, `4th`, `11th`, `21st`, ...
pub fn ordinal(n: u32) -> String {
    let suffix = if (10..=20).contains(&(n % 100)) {
        "th"
    } else {
        match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        }
    };
    format!("{n}{suffix}")
}

fn share(count: usize, total: usize) -> f64 {
    count as f64 / total.max(1) as f64 * 100.0
}

/// Most frequent first, ties by ascending key.
fn ranked<K: Ord>(counts: impl IntoIterator<Item = (K, usize)>) -> Vec<(K, usize)> {
    counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .collect()
}

pub fn summarize(batch: &CanonicalBatch, top: usize) -> InventorySummary {
    let total = batch.len();
    let records = &batch.records;

    let species_diversity = records
        .iter()
        .map(|r| r.french_name.trim())
        .filter(|name| !name.is_empty())
        .unique()
        .count();
    let remarkable = records.iter().filter(|r| r.is_remarkable).count();

    let stage_counts: BTreeMap<&GrowthStage, usize> = records
        .iter()
        .filter_map(|r| r.growth_stage.as_ref())
        .counts()
        .into_iter()
        .collect();
    // Ord on GrowthStage is the canonical order, so the first of equal counts wins.
    let dominant_growth_stage = ranked(stage_counts.iter().map(|(stage, n)| (*stage, *n)))
        .first()
        .map(|(stage, _)| stage.label().to_string());
    let growth_stages = stage_counts
        .iter()
        .map(|(stage, trees)| NamedCount {
            name: stage.label().to_string(),
            trees: *trees,
            share: share(*trees, total),
        })
        .collect();

    let districts = ranked(records.iter().filter_map(|r| r.arr_num).counts())
        .into_iter()
        .map(|(district, trees)| DistrictCount {
            district,
            label: ordinal(u32::from(district)),
            trees,
            share: share(trees, total),
        })
        .collect();

    let species = ranked(
        records
            .iter()
            .filter_map(|r| r.common_name())
            .counts(),
    );
    let top5_share = share(
        species.iter().take(TOP_SHARE_SPAN).map(|(_, n)| n).sum(),
        total,
    );
    let top_species = species
        .into_iter()
        .take(top)
        .map(|(name, trees)| NamedCount {
            name: name.to_string(),
            trees,
            share: share(trees, total),
        })
        .collect();

    InventorySummary {
        total_trees: total,
        species_diversity,
        remarkable_percent: share(remarkable, total),
        dominant_growth_stage,
        districts,
        top_species,
        top5_share,
        growth_stages,
    }
}

pub fn execute(args: &SummaryArgs) -> Result<()> {
    let cleaned = crate::clean_source(&args.source)?;
    let summary = summarize(&cleaned.batch, args.top);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let top_share_label = format!("top {TOP_SHARE_SPAN} species share");
    table::print_key_values(&[
        ("total trees", summary.total_trees.to_string()),
        ("species diversity", summary.species_diversity.to_string()),
        ("remarkable trees", format!("{:.1}%", summary.remarkable_percent)),
        (
            "dominant growth stage",
            summary
                .dominant_growth_stage
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
        ),
        (top_share_label.as_str(), format!("{:.1}%", summary.top5_share)),
    ]);
    println!();
    print_counts(
        "district",
        summary
            .districts
            .iter()
            .map(|d| (d.label.clone(), d.trees, d.share)),
    );
    println!();
    print_counts(
        "species",
        summary
            .top_species
            .iter()
            .map(|s| (s.name.clone(), s.trees, s.share)),
    );
    println!();
    print_counts(
        "growth stage",
        summary
            .growth_stages
            .iter()
            .map(|s| (s.name.clone(), s.trees, s.share)),
    );
    Ok(())
}

fn print_counts(label: &str, rows: impl Iterator<Item = (String, usize, f64)>) {
    let headers = vec![label.to_string(), "trees".to_string(), "share".to_string()];
    let rows = rows
        .map(|(name, trees, share)| vec![name, trees.to_string(), format!("{share:.2}%")])
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
}
