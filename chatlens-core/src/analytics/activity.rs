//! When messages happen: time range, histograms and monthly series.

use super::{peak_index, AnalysisContext};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Activity metrics. Buckets use the configured local offset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivityStats {
    pub first_message: Option<DateTime<Utc>>,
    pub last_message: Option<DateTime<Utc>>,
    /// Whole days between first and last message
    pub span_days: i64,
    pub utc_offset_minutes: i32,
    /// Messages per hour of day (0-23)
    pub hourly: [u64; 24],
    /// Messages per weekday (0 = Monday)
    pub daily: [u64; 7],
    /// `heatmap[weekday][hour]`
    pub heatmap: [[u64; 24]; 7],
    /// Messages per `YYYY-MM`, ascending; months without messages are absent
    pub monthly: Vec<MonthCount>,
    pub peak_hour: Option<usize>,
    pub busiest_day: Option<usize>,
}

/// Message count for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: u64,
}

pub fn compute(ctx: &AnalysisContext<'_>) -> ActivityStats {
    let ds = ctx.dataset;
    let mut stats = ActivityStats {
        utc_offset_minutes: ctx.config.utc_offset_minutes,
        ..Default::default()
    };

    let mut months: BTreeMap<(i32, u32), u64> = BTreeMap::new();

    for message in &ds.messages {
        let local = ctx.local(message.timestamp);
        let hour = local.hour() as usize;
        let weekday = local.weekday().num_days_from_monday() as usize;

        stats.hourly[hour] += 1;
        stats.daily[weekday] += 1;
        stats.heatmap[weekday][hour] += 1;
        *months.entry((local.year(), local.month())).or_insert(0) += 1;
    }

    // messages are stored in time order
    stats.first_message = ds.messages.first().map(|m| m.timestamp);
    stats.last_message = ds.messages.last().map(|m| m.timestamp);
    if let (Some(first), Some(last)) = (stats.first_message, stats.last_message) {
        stats.span_days = (last - first).num_days();
    }

    stats.monthly = months
        .into_iter()
        .map(|((year, month), count)| MonthCount {
            month: format!("{:04}-{:02}", year, month),
            count,
        })
        .collect();

    stats.peak_hour = peak_index(&stats.hourly);
    stats.busiest_day = peak_index(&stats.daily);

    stats
}
