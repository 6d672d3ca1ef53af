use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use tomeloot_engine::numbers::u64_to_f64;

use crate::sim::{SeedRun, SimSettings};

/// Everything a report renders, serialized as-is for `--report json`.
#[derive(Debug, Serialize)]
pub struct SimReport<'a> {
    pub settings: &'a SimSettings,
    pub deferred: bool,
    pub summary: RunSummary,
    pub runs: &'a [SeedRun],
}

impl<'a> SimReport<'a> {
    #[must_use]
    pub fn new(settings: &'a SimSettings, deferred: bool, runs: &'a [SeedRun]) -> Self {
        Self {
            settings,
            deferred,
            summary: RunSummary::from_runs(runs),
            runs,
        }
    }
}

/// Totals across every seed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub seeds: u32,
    pub total_xp: u64,
    pub total_levels: u32,
    pub boxes_by_source: BTreeMap<String, u32>,
    pub boxes_by_tier: BTreeMap<String, u32>,
    pub drops_by_kind: BTreeMap<String, u32>,
    pub rewards_by_category: BTreeMap<String, u32>,
    pub pity_forced: u32,
    pub max_pity: u32,
    pub collectibles_awarded: u32,
}

fn merge_counts(into: &mut BTreeMap<String, u32>, from: &BTreeMap<String, u32>) {
    for (key, count) in from {
        *into.entry(key.clone()).or_insert(0) += count;
    }
}

impl RunSummary {
    #[must_use]
    pub fn from_runs(runs: &[SeedRun]) -> Self {
        let mut summary = Self::default();
        for run in runs {
            summary.seeds += 1;
            summary.total_xp += run.xp;
            summary.total_levels += run.levels_gained;
            merge_counts(&mut summary.boxes_by_source, &run.boxes_by_source);
            merge_counts(&mut summary.boxes_by_tier, &run.boxes_by_tier);
            merge_counts(&mut summary.drops_by_kind, &run.drops_by_kind);
            merge_counts(&mut summary.rewards_by_category, &run.rewards_by_category);
            summary.pity_forced += run.pity_forced;
            summary.max_pity = summary.max_pity.max(run.max_pity);
            summary.collectibles_awarded += u32::try_from(run.collectibles.len()).unwrap_or(u32::MAX);
        }
        summary
    }

    #[must_use]
    pub fn boxes_opened(&self) -> u32 {
        self.boxes_by_tier.values().sum()
    }

    #[must_use]
    pub fn average_xp(&self) -> f64 {
        if self.seeds == 0 {
            return 0.0;
        }
        u64_to_f64(self.total_xp) / f64::from(self.seeds)
    }
}

fn share(count: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(count) / f64::from(total) * 100.0
    }
}

fn write_breakdown(
    out: &mut dyn Write,
    title: &str,
    counts: &BTreeMap<String, u32>,
) -> Result<()> {
    let total: u32 = counts.values().sum();
    writeln!(out, "{}", title.bold())?;
    if counts.is_empty() {
        writeln!(out, "   (none)")?;
        return Ok(());
    }
    for (key, count) in counts {
        writeln!(out, "   {key:12} {count:>6}  {:>5.1}%", share(*count, total))?;
    }
    Ok(())
}

pub fn generate_console_report(out: &mut dyn Write, report: &SimReport<'_>) -> Result<()> {
    let summary = &report.summary;
    writeln!(out)?;
    writeln!(out, "{}", "📊 Drop-Rate Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "====================".cyan())?;
    writeln!(out, "Seeds: {}", summary.seeds)?;
    writeln!(
        out,
        "Sessions per seed: {} x {} min",
        report.settings.sessions, report.settings.minutes
    )?;
    writeln!(
        out,
        "Tier resolution: {}",
        if report.deferred { "on open" } else { "at earn time" }
    )?;
    writeln!(out, "Average XP: {:.1}", summary.average_xp())?;
    writeln!(out, "Levels gained: {}", summary.total_levels)?;
    writeln!(out, "Boxes opened: {}", summary.boxes_opened().to_string().green())?;
    writeln!(
        out,
        "Max pity: {}  (forced gold: {})",
        summary.max_pity, summary.pity_forced
    )?;
    writeln!(out, "Collectibles awarded: {}", summary.collectibles_awarded)?;
    writeln!(out)?;

    write_breakdown(out, "Boxes by source", &summary.boxes_by_source)?;
    write_breakdown(out, "Boxes by tier", &summary.boxes_by_tier)?;
    write_breakdown(out, "Rewards by category", &summary.rewards_by_category)?;
    write_breakdown(out, "Bonus drops by kind", &summary.drops_by_kind)?;
    writeln!(out)?;

    writeln!(out, "{}", "🎲 Per Seed".bright_yellow().bold())?;
    writeln!(out, "{}", "==========".yellow())?;
    for run in report.runs {
        writeln!(
            out,
            "{} seed {}: xp {} | level {} | boxes {} | drops {} | max pity {}",
            "•".cyan(),
            run.seed.to_string().bold(),
            run.xp,
            run.entity_level,
            run.boxes_opened(),
            run.bonus_drops(),
            run.max_pity
        )?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, report: &SimReport<'_>) -> Result<()> {
    let json_output = serde_json::to_string_pretty(report)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

fn write_markdown_table(
    out: &mut dyn Write,
    title: &str,
    counts: &BTreeMap<String, u32>,
) -> Result<()> {
    let total: u32 = counts.values().sum();
    writeln!(out, "## {title}\n")?;
    if counts.is_empty() {
        writeln!(out, "_None._\n")?;
        return Ok(());
    }
    writeln!(out, "| Bucket | Count | Share |")?;
    writeln!(out, "| --- | ---: | ---: |")?;
    for (key, count) in counts {
        writeln!(out, "| {key} | {count} | {:.1}% |", share(*count, total))?;
    }
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, report: &SimReport<'_>) -> Result<()> {
    let summary = &report.summary;
    writeln!(out, "# Tomeloot Simulation Results\n")?;
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Seeds**: {}", summary.seeds)?;
    writeln!(
        out,
        "- **Sessions per seed**: {} x {} min",
        report.settings.sessions, report.settings.minutes
    )?;
    writeln!(out, "- **Deferred tiers**: {}", report.deferred)?;
    writeln!(out, "- **Average XP**: {:.1}", summary.average_xp())?;
    writeln!(out, "- **Boxes opened**: {}", summary.boxes_opened())?;
    writeln!(out, "- **Max pity**: {}", summary.max_pity)?;
    writeln!(out, "- **Forced gold**: {}\n", summary.pity_forced)?;

    write_markdown_table(out, "Boxes by Tier", &summary.boxes_by_tier)?;
    write_markdown_table(out, "Boxes by Source", &summary.boxes_by_source)?;
    write_markdown_table(out, "Rewards by Category", &summary.rewards_by_category)?;
    write_markdown_table(out, "Bonus Drops", &summary.drops_by_kind)?;

    writeln!(out, "## Seeds\n")?;
    writeln!(out, "| Seed | XP | Level | Boxes | Drops | Max pity |")?;
    writeln!(out, "| ---: | ---: | ---: | ---: | ---: | ---: |")?;
    for run in report.runs {
        writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            run.seed,
            run.xp,
            run.entity_level,
            run.boxes_opened(),
            run.bonus_drops(),
            run.max_pity
        )?;
    }
    Ok(())
}
