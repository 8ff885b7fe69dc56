use super::{or_sample, Loaded, PageContext};
use crate::api::types::{FailurePattern, TrendData};
use crate::error::Result;
use crate::sample;

pub const EMPTY_MESSAGE: &str = "No trend data for this period";

#[derive(Debug, Clone, PartialEq)]
pub struct TrendsData {
    pub daily: Vec<TrendData>,
    pub patterns: Vec<FailurePattern>,
}

impl TrendsData {
    pub fn sample() -> Self {
        Self {
            daily: sample::trends(),
            patterns: sample::failure_patterns(),
        }
    }

    /// Mean pass rate rounded to one decimal.
    pub fn avg_pass_rate(&self) -> f64 {
        if self.daily.is_empty() {
            return 0.0;
        }
        let mean = self.daily.iter().map(|d| d.pass_rate).sum::<f64>() / self.daily.len() as f64;
        (mean * 10.0).round() / 10.0
    }

    pub fn total_failures(&self) -> u64 {
        self.daily.iter().map(|d| d.fail_count as u64).sum()
    }

    /// Mean of the days that report an average duration, in whole seconds.
    pub fn avg_execution_secs(&self) -> Option<u64> {
        let durations: Vec<f64> = self.daily.iter().filter_map(|d| d.avg_duration).collect();
        if durations.is_empty() {
            return None;
        }
        Some((durations.iter().sum::<f64>() / durations.len() as f64).round() as u64)
    }

    /// Pass rates as integers, for sparklines.
    pub fn pass_rate_series(&self) -> Vec<u64> {
        self.daily
            .iter()
            .map(|d| d.pass_rate.max(0.0).round() as u64)
            .collect()
    }

    pub fn max_pattern_count(&self) -> u32 {
        self.patterns.iter().map(|p| p.count).max().unwrap_or(0)
    }
}

pub async fn load(ctx: &PageContext) -> Result<Loaded<TrendsData>> {
    let result = fetch(ctx).await;
    or_sample(result, ctx.sample_fallback, "trends", TrendsData::sample)
}

async fn fetch(ctx: &PageContext) -> Result<TrendsData> {
    let project = ctx.require_project()?;
    let (trends, patterns) = futures::try_join!(
        ctx.api.trends(ctx.days, project),
        ctx.api.failure_patterns(ctx.days, project),
    )?;
    Ok(TrendsData {
        daily: trends.daily_trends,
        patterns,
    })
}

/// "Jan 07".
pub fn short_date(point: &TrendData) -> String {
    point.date.format("%b %d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_aggregates() {
        let data = TrendsData::sample();
        assert_eq!(data.avg_pass_rate(), 88.3);
        assert_eq!(data.total_failures(), 67);
        assert_eq!(data.avg_execution_secs(), Some(97));
        assert_eq!(data.pass_rate_series().len(), 7);
        assert_eq!(data.max_pattern_count(), 45);
        assert_eq!(short_date(&data.daily[6]), "Jan 07");
    }

    #[test]
    fn test_empty_aggregates() {
        let data = TrendsData {
            daily: Vec::new(),
            patterns: Vec::new(),
        };
        assert_eq!(data.avg_pass_rate(), 0.0);
        assert_eq!(data.total_failures(), 0);
        assert_eq!(data.avg_execution_secs(), None);
        assert_eq!(data.max_pattern_count(), 0);
    }
}
