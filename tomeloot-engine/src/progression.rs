//! Time to level conversion, completion bonus and per-genre distribution.
use serde::{Deserialize, Serialize};

use crate::config::ProgressionConfig;
use crate::numbers::clamp_seconds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimeProgress {
    pub previous_level: u32,
    pub new_level: u32,
    pub levels_gained: u32,
}

/// Levels awarded to one genre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDelta {
    pub category: String,
    pub levels: u32,
}

#[must_use]
pub fn calculate_level(total_seconds: u64, config: &ProgressionConfig) -> u32 {
    let per_level = config.seconds_per_level.max(1);
    u32::try_from(total_seconds / per_level).unwrap_or(u32::MAX)
}

/// Level a finished entity of `size` units is worth; 0 when the size is unknown.
#[must_use]
pub fn calculate_size_floor(size: Option<u32>, config: &ProgressionConfig) -> u32 {
    size.map_or(0, |units| units / config.units_per_level.max(1))
}

/// Advance accumulated time by one session. Negative sessions count as zero.
#[must_use]
pub fn process_time(
    previous_total_seconds: u64,
    session_seconds: i64,
    config: &ProgressionConfig,
) -> TimeProgress {
    let session = clamp_seconds(session_seconds);
    let previous_level = calculate_level(previous_total_seconds, config);
    let new_level = calculate_level(previous_total_seconds.saturating_add(session), config);
    TimeProgress {
        previous_level,
        new_level,
        levels_gained: new_level.saturating_sub(previous_level),
    }
}

/// Levels granted on completion to lift the time level up to the size floor.
#[must_use]
pub fn calculate_completion_bonus(
    total_seconds_after: u64,
    size: Option<u32>,
    config: &ProgressionConfig,
) -> u32 {
    calculate_size_floor(size, config).saturating_sub(calculate_level(total_seconds_after, config))
}

/// Spread `levels` over `categories` in order: an even share each, with the
/// remainder going one apiece to the leading categories.
#[must_use]
pub fn distribute_levels(levels: u32, categories: &[String]) -> Vec<CategoryDelta> {
    let Ok(count) = u32::try_from(categories.len()) else {
        return Vec::new();
    };
    if count == 0 {
        return Vec::new();
    }
    let share = levels / count;
    let remainder = levels % count;
    categories
        .iter()
        .zip(0_u32..)
        .map(|(category, idx)| CategoryDelta {
            category: category.clone(),
            levels: share + u32::from(idx < remainder),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ProgressionConfig {
        ProgressionConfig::default()
    }

    fn genres(count: usize) -> Vec<String> {
        (0..count).map(|idx| format!("genre-{idx}")).collect()
    }

    #[test]
    fn levels_follow_whole_hours() {
        assert_eq!(calculate_level(0, &cfg()), 0);
        assert_eq!(calculate_level(3_599, &cfg()), 0);
        assert_eq!(calculate_level(7_200, &cfg()), 2);
        assert_eq!(calculate_size_floor(Some(299), &cfg()), 9);
        assert_eq!(calculate_size_floor(None, &cfg()), 0);
    }

    #[test]
    fn process_time_clamps_negative_sessions() {
        let progress = process_time(3_000, 1_200, &cfg());
        assert_eq!(
            progress,
            TimeProgress {
                previous_level: 0,
                new_level: 1,
                levels_gained: 1
            }
        );
        let negative = process_time(7_200, -5_000, &cfg());
        assert_eq!(negative.levels_gained, 0);
        assert_eq!(negative.new_level, 2);
    }

    #[test]
    fn completion_bonus_fills_gap_to_floor() {
        // size 300 -> floor 10; 4 hours read -> level 4
        assert_eq!(calculate_completion_bonus(4 * 3_600, Some(300), &cfg()), 6);
        assert_eq!(calculate_completion_bonus(12 * 3_600, Some(300), &cfg()), 0);
        assert_eq!(calculate_completion_bonus(10 * 3_600, Some(300), &cfg()), 0);
        assert_eq!(calculate_completion_bonus(0, None, &cfg()), 0);
    }

    #[test]
    fn distribution_gives_remainder_to_leading_genres() {
        let deltas = distribute_levels(2, &genres(3));
        let levels: Vec<u32> = deltas.iter().map(|delta| delta.levels).collect();
        assert_eq!(levels, vec![1, 1, 0]);
        assert_eq!(deltas[0].category, "genre-0");
    }

    #[test]
    fn distribution_sum_matches_levels_gained() {
        for levels in 0..20 {
            for count in 1..6 {
                let total: u32 = distribute_levels(levels, &genres(count))
                    .iter()
                    .map(|delta| delta.levels)
                    .sum();
                assert_eq!(total, levels, "levels {levels} over {count} genres");
            }
        }
        assert!(distribute_levels(5, &[]).is_empty());
    }
}
