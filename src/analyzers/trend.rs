//! EMA-based trend classification over the daily mean salary.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::analyzers::utility::{ema, mean, pct};
use crate::records::Vacancy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Upward,
    Downward,
    Sideways,
}

impl Direction {
    pub fn from_change_pct(change_pct: f64) -> Self {
        if change_pct > 1.0 {
            Direction::Upward
        } else if change_pct < -1.0 {
            Direction::Downward
        } else {
            Direction::Sideways
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
}

impl Strength {
    pub fn from_change_pct(change_pct: f64) -> Self {
        match change_pct.abs() {
            p if p > 5.0 => Strength::Strong,
            p if p > 2.0 => Strength::Moderate,
            _ => Strength::Weak,
        }
    }
}

/// One day of the smoothed series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub day: u32,
    pub mean_salary: f64,
    pub ema: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub span: usize,
    pub start: f64,
    pub end: f64,
    pub change: f64,
    pub change_pct: f64,
    pub direction: Direction,
    pub strength: Strength,
    pub points: Vec<TrendPoint>,
}

/// Mean monthly net salary per day of month. Days without data are absent.
pub fn daily_mean_salary<'a, I>(vacancies: I) -> BTreeMap<u32, f64>
where
    I: IntoIterator<Item = &'a Vacancy>,
{
    let mut by_day: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for v in vacancies {
        if let Some(net) = v.monthly_net() {
            by_day.entry(v.day).or_default().push(net);
        }
    }

    by_day
        .into_iter()
        .filter_map(|(day, values)| mean(&values).map(|m| (day, m)))
        .collect()
}

/// Smooths the daily series and classifies its direction and strength.
///
/// Returns `None` when fewer than `min_days` days carry data.
pub fn analyze_trend(
    daily: &BTreeMap<u32, f64>,
    min_days: usize,
    max_span: usize,
) -> Option<TrendAnalysis> {
    if daily.len() < min_days.max(2) {
        return None;
    }

    let span = max_span.min(daily.len());
    let values: Vec<f64> = daily.values().copied().collect();
    let smoothed = ema(&values, span);

    let start = *smoothed.first()?;
    let end = *smoothed.last()?;
    let change = end - start;
    let change_pct = pct(change, start);

    let points = daily
        .iter()
        .zip(&smoothed)
        .map(|((&day, &mean_salary), &ema)| TrendPoint {
            day,
            mean_salary,
            ema,
        })
        .collect();

    Some(TrendAnalysis {
        span,
        start,
        end,
        change,
        change_pct,
        direction: Direction::from_change_pct(change_pct),
        strength: Strength::from_change_pct(change_pct),
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[(u32, f64)]) -> BTreeMap<u32, f64> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_flat_series_is_sideways_weak() {
        let daily: BTreeMap<u32, f64> = (1..=10).map(|d| (d, 1000.0)).collect();
        let trend = analyze_trend(&daily, 7, 7).unwrap();

        assert_eq!(trend.span, 7);
        assert!(trend.points.iter().all(|p| (p.ema - 1000.0).abs() < 1e-9));
        assert_eq!(trend.change_pct, 0.0);
        assert_eq!(trend.direction, Direction::Sideways);
        assert_eq!(trend.strength, Strength::Weak);
    }

    #[test]
    fn test_too_few_days_skips_trend() {
        let daily = series(&[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0), (5, 5.0), (6, 6.0)]);
        assert!(analyze_trend(&daily, 7, 7).is_none());
    }

    #[test]
    fn test_gaps_are_not_interpolated() {
        let daily = series(&[
            (1, 100.0),
            (3, 100.0),
            (10, 100.0),
            (11, 100.0),
            (20, 100.0),
            (25, 100.0),
            (31, 200.0),
        ]);
        let trend = analyze_trend(&daily, 7, 7).unwrap();

        assert_eq!(trend.points.len(), 7);
        assert_eq!(trend.points.last().unwrap().day, 31);
        // a single step with alpha = 0.25 from 100 towards 200
        assert!((trend.end - 125.0).abs() < 1e-9);
        assert!((trend.change_pct - 25.0).abs() < 1e-9);
        assert_eq!(trend.direction, Direction::Upward);
        assert_eq!(trend.strength, Strength::Strong);
    }

    #[test]
    fn test_classification_thresholds() {
        assert_eq!(Direction::from_change_pct(1.0), Direction::Sideways);
        assert_eq!(Direction::from_change_pct(1.01), Direction::Upward);
        assert_eq!(Direction::from_change_pct(-1.01), Direction::Downward);
        assert_eq!(Strength::from_change_pct(-5.5), Strength::Strong);
        assert_eq!(Strength::from_change_pct(5.0), Strength::Moderate);
        assert_eq!(Strength::from_change_pct(2.0), Strength::Weak);
    }

    #[test]
    fn test_zero_start_guards_pct() {
        let daily: BTreeMap<u32, f64> = (1..=7).map(|d| (d, if d == 1 { 0.0 } else { 50.0 })).collect();
        let trend = analyze_trend(&daily, 7, 7).unwrap();
        assert_eq!(trend.start, 0.0);
        assert_eq!(trend.change_pct, 0.0);
        assert_eq!(trend.direction, Direction::Sideways);
    }

    #[test]
    fn test_serializes_lowercase_labels() {
        let json = serde_json::to_string(&Direction::Sideways).unwrap();
        assert_eq!(json, "\"sideways\"");
        let json = serde_json::to_string(&Strength::Moderate).unwrap();
        assert_eq!(json, "\"moderate\"");
    }
}
