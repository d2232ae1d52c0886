//! Energy predictors
//!
//! Turn a student's logged energy/stress history into a multiplier for
//! upcoming weeks.

use crate::config::{ENERGY_WINDOW, MIN_ENERGY_ENTRIES, NEUTRAL_ENERGY_SCORE};
use crate::models::EnergyLogEntry;
use chrono::NaiveDate;

/// Trait for energy prediction (pure, no I/O)
pub trait EnergyPredictor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Multiplier derived from history, or `None` when there is not enough
    /// signal and the week should keep its baseline
    fn history_factor(&self, history: &[EnergyLogEntry], week_start: NaiveDate) -> Option<f64>;
}

/// Averages the most recent entries around a neutral score of 3
pub struct TrendEnergyPredictor;

impl EnergyPredictor for TrendEnergyPredictor {
    fn name(&self) -> &'static str {
        "trend"
    }

    fn history_factor(&self, history: &[EnergyLogEntry], week_start: NaiveDate) -> Option<f64> {
        let mut known: Vec<&EnergyLogEntry> =
            history.iter().filter(|e| e.date <= week_start).collect();

        if known.len() < MIN_ENERGY_ENTRIES {
            return None;
        }

        // Most recent first
        known.sort_by(|a, b| b.date.cmp(&a.date));
        let recent = &known[..known.len().min(ENERGY_WINDOW)];
        let count = recent.len() as f64;

        let avg_energy = recent
            .iter()
            .map(|e| f64::from(e.energy_level.clamp(1, 5)))
            .sum::<f64>()
            / count;
        let avg_stress = recent
            .iter()
            .map(|e| f64::from(e.stress_level.clamp(1, 5)))
            .sum::<f64>()
            / count;

        // High stress drags capacity down, so it is mirrored around the midpoint
        let energy_factor = avg_energy / NEUTRAL_ENERGY_SCORE;
        let stress_factor = (2.0 * NEUTRAL_ENERGY_SCORE - avg_stress) / NEUTRAL_ENERGY_SCORE;

        Some((energy_factor + stress_factor) / 2.0)
    }
}

/// Ignores history entirely
pub struct NeutralEnergyPredictor;

impl EnergyPredictor for NeutralEnergyPredictor {
    fn name(&self) -> &'static str {
        "neutral"
    }

    fn history_factor(&self, _history: &[EnergyLogEntry], _week_start: NaiveDate) -> Option<f64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entries(start: NaiveDate, levels: &[(u8, u8)]) -> Vec<EnergyLogEntry> {
        levels
            .iter()
            .enumerate()
            .map(|(i, (energy, stress))| EnergyLogEntry {
                date: start + Duration::days(i as i64),
                energy_level: *energy,
                mood_score: 3,
                stress_level: *stress,
                hours_slept: None,
            })
            .collect()
    }

    #[test]
    fn test_needs_minimum_entries() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let history = entries(start, &[(5, 1), (5, 1), (5, 1)]);
        let week = start + Duration::days(10);

        assert_eq!(TrendEnergyPredictor.history_factor(&history, week), None);
    }

    #[test]
    fn test_neutral_history_is_one() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let history = entries(start, &[(3, 3), (3, 3), (3, 3), (3, 3)]);
        let week = start + Duration::days(10);

        let factor = TrendEnergyPredictor.history_factor(&history, week).unwrap();
        assert!((factor - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_uses_only_most_recent_window() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        // Four exhausted days followed by eight great ones
        let mut levels = vec![(1, 5); 4];
        levels.extend(vec![(5, 1); 8]);
        let history = entries(start, &levels);
        let week = start + Duration::days(30);

        let factor = TrendEnergyPredictor.history_factor(&history, week).unwrap();
        // energy 5/3, stress (6-1)/3 => 5/3
        assert!((factor - 5.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_neutral_predictor_ignores_history() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let history = entries(start, &[(5, 1); 10]);
        assert_eq!(NeutralEnergyPredictor.history_factor(&history, start), None);
    }
}
