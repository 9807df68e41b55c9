//! HTML tables for forecast exceedance and return period thresholds.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::Serialize;

use crate::analyze::round2;
use crate::error::{Error, Result};
use crate::plots::plot_colors;
use crate::rperiods::ReturnPeriods;
use crate::table::TimeTable;

/// Percentage of ensemble members exceeding each return period on each forecast day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceedanceProbabilities {
    /// `Jun 10` style day labels.
    pub days: Vec<String>,
    /// Years to one rounded percentage per day.
    pub percent: BTreeMap<u32, Vec<u32>>,
}

/// Count, for each day from the first to the last stats timestamp, how many members
/// peak above each threshold within `[day, day + 1]`.
pub fn exceedance_probabilities(
    stats: &TimeTable,
    ensembles: &TimeTable,
    rperiods: &ReturnPeriods,
) -> Result<ExceedanceProbabilities> {
    let (Some(&start), Some(&end)) = (stats.first_key(), stats.last_key()) else {
        return Err(Error::EmptyTable);
    };
    let members: Vec<&String> = ensembles
        .columns()
        .iter()
        .filter(|c| c.starts_with("ensemble_"))
        .collect();
    if members.is_empty() {
        return Err(Error::MissingColumn("ensemble_01_m^3/s".into()));
    }
    let total = members.len() as f64;

    let mut days = Vec::new();
    let mut percent: BTreeMap<u32, Vec<u32>> =
        rperiods.iter().map(|(years, _)| (years, Vec::new())).collect();

    for offset in 0..=(end - start).num_days() {
        let day = start + Duration::days(offset);
        let window = ensembles.between(&day, &(day + Duration::days(1)));
        let peaks: Vec<f64> = members.iter().filter_map(|m| window.max(m)).collect();

        days.push(day.format("%b %d").to_string());
        for (years, threshold) in rperiods.iter() {
            let count = peaks.iter().filter(|&&p| p > threshold).count();
            let pct = (count as f64 * 100.0 / total).round() as u32;
            percent.entry(years).or_default().push(pct);
        }
    }
    Ok(ExceedanceProbabilities { days, percent })
}

fn row_style(years: u32) -> String {
    plot_colors()
        .get(&years)
        .map(|c| format!(" style=\"background-color: {c}\""))
        .unwrap_or_default()
}

/// Render [`exceedance_probabilities`] as an HTML table, one row per return period.
pub fn probabilities_table(stats: &TimeTable, ensembles: &TimeTable, rperiods: &ReturnPeriods) -> Result<String> {
    let probs = exceedance_probabilities(stats, ensembles, rperiods)?;

    let mut html = String::from("<table id=\"probabilities_table\" class=\"table table-condensed\">\n");
    html.push_str("<thead><tr><th>Return Period</th>");
    for day in &probs.days {
        html.push_str(&format!("<th>{day}</th>"));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for (years, row) in &probs.percent {
        html.push_str(&format!("<tr{}><td>{years} Year</td>", row_style(*years)));
        for pct in row {
            html.push_str(&format!("<td>{pct}%</td>"));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>");
    Ok(html)
}

/// Thresholds and the largest simulated flow as an HTML table, smallest flow first.
pub fn return_periods_table(rperiods: &ReturnPeriods) -> String {
    let mut rows: Vec<(String, Option<u32>, f64)> = rperiods
        .iter()
        .map(|(years, flow)| (format!("{years} Year"), Some(years), round2(flow)))
        .collect();
    if let Some(max) = rperiods.max_flow {
        rows.push(("Max Simulated Flow".into(), None, round2(max)));
    }
    rows.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut html = String::from("<table id=\"return_periods_table\" class=\"table table-condensed\">\n");
    if let Some(id) = rperiods.reach_id {
        html.push_str(&format!("<caption>Return Periods for Stream ID {id}</caption>\n"));
    }
    html.push_str("<thead><tr><th>Return Period</th><th>Flow (m<sup>3</sup>/s)</th></tr></thead>\n<tbody>\n");
    for (label, years, flow) in rows {
        let style = years.map(row_style).unwrap_or_default();
        html.push_str(&format!("<tr{style}><td>{label}</td><td>{flow}</td></tr>\n"));
    }
    html.push_str("</tbody>\n</table>");
    html
}
