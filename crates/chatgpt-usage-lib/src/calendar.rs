//! GitHub-style year heatmap laid out as week columns by weekday rows.

use crate::data_structures::DailyUsage;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

/// Highest intensity level of a cell.
pub const MAX_LEVEL: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeatmapMetric {
    #[default]
    Conversations,
    UserMessages,
    OutputTokens,
}

impl HeatmapMetric {
    pub fn label(&self) -> &'static str {
        match self {
            HeatmapMetric::Conversations => "Conversations",
            HeatmapMetric::UserMessages => "User Messages",
            HeatmapMetric::OutputTokens => "Output Tokens",
        }
    }

    pub fn value(&self, day: &DailyUsage) -> u64 {
        match self {
            HeatmapMetric::Conversations => day.conversations() as u64,
            HeatmapMetric::UserMessages => day.user_messages(),
            HeatmapMetric::OutputTokens => day.output_tokens(),
        }
    }

    pub fn next(&self) -> Self {
        match self {
            HeatmapMetric::Conversations => HeatmapMetric::UserMessages,
            HeatmapMetric::UserMessages => HeatmapMetric::OutputTokens,
            HeatmapMetric::OutputTokens => HeatmapMetric::Conversations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    date: NaiveDate,
    week: usize,
    weekday: usize,
    value: u64,
    level: u8,
}

impl HeatmapCell {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn week(&self) -> usize {
        self.week
    }

    /// Monday is 0.
    pub fn weekday(&self) -> usize {
        self.weekday
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn level(&self) -> u8 {
        self.level
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapGrid {
    year: i32,
    cells: Vec<HeatmapCell>,
    month_labels: Vec<(usize, &'static str)>,
    weeks: usize,
    scale: f64,
}

impl HeatmapGrid {
    /// Builds the grid for `year` from daily rows; days without a row are zero.
    /// Returns `None` only for years chrono cannot represent.
    pub fn build(year: i32, daily: &[DailyUsage], metric: HeatmapMetric) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31)?;
        let offset = start.weekday().num_days_from_monday() as usize;

        let values: HashMap<NaiveDate, u64> = daily
            .iter()
            .filter(|day| day.date().year() == year)
            .map(|day| (day.date(), metric.value(day)))
            .collect();

        let mut observed: Vec<u64> = values.values().copied().collect();
        let scale = match percentile(&mut observed, 90.0) {
            p if p > 0.0 => p,
            _ => 1.0,
        };

        let mut cells = Vec::new();
        let mut month_labels = Vec::new();
        for (index, date) in start.iter_days().take_while(|d| *d <= end).enumerate() {
            let week = (index + offset) / 7;
            if date.day() == 1 {
                month_labels.push((week, month_abbreviation(date.month())));
            }
            let value = values.get(&date).copied().unwrap_or(0);
            cells.push(HeatmapCell {
                date,
                week,
                weekday: date.weekday().num_days_from_monday() as usize,
                value,
                level: level(value, scale),
            });
        }

        let weeks = cells.last().map_or(0, |cell| cell.week + 1);

        Some(Self {
            year,
            cells,
            month_labels,
            weeks,
            scale,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn cells(&self) -> &[HeatmapCell] {
        &self.cells
    }

    pub fn month_labels(&self) -> &[(usize, &'static str)] {
        &self.month_labels
    }

    pub fn weeks(&self) -> usize {
        self.weeks
    }

    /// 90th percentile of the year's daily values, or 1 when that is zero.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn cell(&self, week: usize, weekday: usize) -> Option<&HeatmapCell> {
        self.cells
            .iter()
            .find(|cell| cell.week == week && cell.weekday == weekday)
    }

    pub fn total(&self) -> u64 {
        self.cells.iter().map(|cell| cell.value).sum()
    }

    pub fn active_days(&self) -> usize {
        self.cells.iter().filter(|cell| cell.value > 0).count()
    }
}

/// Zero stays 0; anything else maps `(value + 1) / scale` onto 1..=MAX_LEVEL.
fn level(value: u64, scale: f64) -> u8 {
    if value == 0 {
        return 0;
    }
    let ratio = ((value as f64 + 1.0) / scale).min(1.0);
    ((ratio * MAX_LEVEL as f64).ceil() as u8).clamp(1, MAX_LEVEL)
}

/// Linear interpolation between closest ranks. Empty input gives 0.
fn percentile(values: &mut [u64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable();
    let rank = pct / 100.0 * (values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    values[lower] as f64 + (values[upper] as f64 - values[lower] as f64) * fraction
}

fn month_abbreviation(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        _ => "Dec",
    }
}
