//! Statistics computed locally from tables returned by the service.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDateTime, NaiveTime};

use crate::error::{Error, Result};
use crate::rperiods::ReturnPeriods;
use crate::table::{LabelTable, TimeTable};

pub const DEFAULT_RETURN_PERIODS: [u32; 6] = [2, 5, 10, 25, 50, 100];

/// The high resolution member, reported separately from the ensemble statistics.
pub const HIGH_RES_MEMBER: &str = "ensemble_52";

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// Linear-interpolated quantile of an ascending slice.
fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Solve the Gumbel type I distribution for a return period of `rp` years (`rp > 1`).
pub fn gumbel1(rp: u32, xbar: f64, std: f64) -> f64 {
    let rp = f64::from(rp);
    let reduced = -(-(1.0 - 1.0 / rp).ln()).ln();
    round2(reduced * std * 0.7797 + xbar - 0.45 * std)
}

fn check_rps(rps: &[u32]) -> Result<()> {
    if rps.is_empty() || rps.iter().any(|&rp| rp < 2) {
        return Err(Error::InvalidRequest(format!(
            "return periods must be at least 2 years, got {rps:?}"
        )));
    }
    Ok(())
}

fn annual_extremes(
    hist: &TimeTable,
    column: &str,
    pick: fn(f64, f64) -> f64,
) -> Result<Vec<f64>> {
    let (keys, values) = hist.series(column)?;
    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for (k, v) in keys.iter().zip(values) {
        by_year
            .entry(k.year())
            .and_modify(|cur| *cur = pick(*cur, v))
            .or_insert(v);
    }
    if by_year.is_empty() {
        return Err(Error::EmptyTable);
    }
    Ok(by_year.into_values().collect())
}

/// Return period thresholds fitted on the annual maximum flows of a simulation.
pub fn return_periods(hist: &TimeTable, column: &str, rps: &[u32]) -> Result<ReturnPeriods> {
    check_rps(rps)?;
    let maxima = annual_extremes(hist, column, f64::max)?;
    let xbar = mean(&maxima).ok_or(Error::EmptyTable)?;
    let std = std_dev(&maxima).ok_or(Error::EmptyTable)?;

    Ok(ReturnPeriods {
        reach_id: None,
        max_flow: maxima.iter().copied().reduce(f64::max).map(round2),
        thresholds: rps.iter().map(|&rp| (rp, gumbel1(rp, xbar, std))).collect(),
    })
}

/// Low flow thresholds fitted on the annual minimum flows, floored at zero.
pub fn low_return_periods(hist: &TimeTable, column: &str, rps: &[u32]) -> Result<BTreeMap<u32, f64>> {
    check_rps(rps)?;
    let minima = annual_extremes(hist, column, f64::min)?;
    let xbar = mean(&minima).ok_or(Error::EmptyTable)?;
    let std = std_dev(&minima).ok_or(Error::EmptyTable)?;

    Ok(rps
        .iter()
        .map(|&rp| (rp, gumbel1(rp, xbar, std).max(0.0)))
        .collect())
}

fn member_columns(ensembles: &TimeTable) -> (Vec<&str>, Option<&str>) {
    let mut members = Vec::new();
    let mut high_res = None;
    for name in ensembles.columns() {
        if name.starts_with(HIGH_RES_MEMBER) {
            high_res = Some(name.as_str());
        } else if name.starts_with("ensemble_") {
            members.push(name.as_str());
        }
    }
    (members, high_res)
}

/// Rows where every member has a value, as `(timestamp, sorted member values)`.
fn complete_rows(ensembles: &TimeTable, members: &[&str]) -> Result<Vec<(NaiveDateTime, Vec<f64>)>> {
    let cols = members
        .iter()
        .map(|m| ensembles.require(m))
        .collect::<Result<Vec<_>>>()?;

    let mut out = Vec::new();
    for (r, key) in ensembles.index().iter().enumerate() {
        let row: Option<Vec<f64>> = cols.iter().map(|c| c[r]).collect();
        if let Some(mut row) = row {
            row.sort_by(f64::total_cmp);
            out.push((*key, row));
        }
    }
    Ok(out)
}

/// Min, quartiles, mean, median and max across members 1-51, with member 52 as `high_res`.
///
/// Columns match the `ForecastStats` product so the result plots the same way.
pub fn forecast_stats(ensembles: &TimeTable) -> Result<TimeTable> {
    let (members, high_res) = member_columns(ensembles);
    if members.is_empty() {
        return Err(Error::MissingColumn("ensemble_01".into()));
    }
    let rows = complete_rows(ensembles, &members)?;

    let stat = |f: &dyn Fn(&[f64]) -> Option<f64>| -> Vec<Option<f64>> {
        rows.iter().map(|(_, v)| f(v)).collect()
    };
    let index: Vec<NaiveDateTime> = rows.iter().map(|(k, _)| *k).collect();
    let stats = TimeTable::new(
        ensembles.index_name(),
        index,
        vec![
            ("flow_min_m^3/s".into(), stat(&|v| v.first().copied())),
            ("flow_25%_m^3/s".into(), stat(&|v| quantile_sorted(v, 0.25))),
            ("flow_avg_m^3/s".into(), stat(&mean)),
            ("flow_med_m^3/s".into(), stat(&|v| quantile_sorted(v, 0.5))),
            ("flow_75%_m^3/s".into(), stat(&|v| quantile_sorted(v, 0.75))),
            ("flow_max_m^3/s".into(), stat(&|v| v.last().copied())),
        ],
    )?;

    let Some(high_res) = high_res else {
        return Ok(stats);
    };
    let hires = TimeTable::new(
        ensembles.index_name(),
        ensembles.index().to_vec(),
        vec![("high_res_m^3/s".into(), ensembles.require(high_res)?.to_vec())],
    )?;
    stats.join_outer(&hires)
}

/// Median with a 20-80 percentile uncertainty band across members 1-51.
pub fn simple_forecast(ensembles: &TimeTable) -> Result<TimeTable> {
    let (members, _) = member_columns(ensembles);
    if members.is_empty() {
        return Err(Error::MissingColumn("ensemble_01".into()));
    }
    let rows = complete_rows(ensembles, &members)?;

    let col = |q: f64| -> Vec<Option<f64>> {
        rows.iter().map(|(_, v)| quantile_sorted(v, q)).collect()
    };
    TimeTable::new(
        ensembles.index_name(),
        rows.iter().map(|(k, _)| *k).collect(),
        vec![
            ("flow_uncertainty_upper".into(), col(0.8)),
            ("flow_median".into(), col(0.5)),
            ("flow_uncertainty_lower".into(), col(0.2)),
        ],
    )
}

/// Row positions of each timestamp label, in label order.
fn group_rows(index: &[NaiveDateTime], label_format: &str) -> BTreeMap<String, Vec<usize>> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (r, k) in index.iter().enumerate() {
        groups.entry(k.format(label_format).to_string()).or_default().push(r);
    }
    groups
}

fn present(col: &[Option<f64>], rows: &[usize]) -> Vec<f64> {
    rows.iter().filter_map(|&r| col[r]).collect()
}

/// Sample standard deviation; needs two values.
fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Mean of every column grouped by a formatted timestamp label; missing values skipped.
fn grouped_mean(
    table: &TimeTable,
    index_name: &str,
    label_format: &str,
    min_rows: usize,
) -> Result<LabelTable> {
    let mut groups = group_rows(table.index(), label_format);
    groups.retain(|_, rows| rows.len() >= min_rows);

    let mut cols = Vec::with_capacity(table.columns().len());
    for name in table.columns() {
        let col = table.require(name)?;
        let means = groups.values().map(|rows| mean(&present(col, rows))).collect();
        cols.push((name.clone(), means));
    }
    LabelTable::new(index_name, groups.into_keys().collect(), cols)
}

/// Average per calendar day, labelled `MM/DD`.
pub fn daily_averages(table: &TimeTable) -> Result<LabelTable> {
    grouped_mean(table, "day", "%m/%d", 1)
}

/// Average per month, labelled `MM`.
pub fn monthly_averages(table: &TimeTable) -> Result<LabelTable> {
    grouped_mean(table, "month", "%m", 1)
}

/// Average per year, labelled `YYYY`; years with fewer than 365 rows are left out.
pub fn annual_averages(table: &TimeTable) -> Result<LabelTable> {
    grouped_mean(table, "year", "%Y", 365)
}

/// Average, min, quartiles, median and max of every column per calendar day.
///
/// Columns are named `<column>_avg`, `_min`, `_25%`, `_med`, `_75%` and `_max`.
pub fn daily_stats(table: &TimeTable) -> Result<LabelTable> {
    let groups = group_rows(table.index(), "%m/%d");
    let stats: [(&str, fn(&[f64]) -> Option<f64>); 6] = [
        ("avg", mean),
        ("min", |v| v.first().copied()),
        ("25%", |v| quantile_sorted(v, 0.25)),
        ("med", |v| quantile_sorted(v, 0.5)),
        ("75%", |v| quantile_sorted(v, 0.75)),
        ("max", |v| v.last().copied()),
    ];

    let mut cols = Vec::with_capacity(table.columns().len() * stats.len());
    for name in table.columns() {
        let col = table.require(name)?;
        let sorted: Vec<Vec<f64>> = groups
            .values()
            .map(|rows| {
                let mut v = present(col, rows);
                v.sort_by(f64::total_cmp);
                v
            })
            .collect();
        for (suffix, f) in stats {
            cols.push((format!("{name}_{suffix}"), sorted.iter().map(|v| f(v.as_slice())).collect()));
        }
    }
    LabelTable::new("day", groups.into_keys().collect(), cols)
}

/// Sample standard deviation of every column per calendar day, labelled `MM/DD`.
///
/// Days with a single value have no deviation.
pub fn daily_variance(table: &TimeTable) -> Result<LabelTable> {
    let groups = group_rows(table.index(), "%m/%d");
    let mut cols = Vec::with_capacity(table.columns().len());
    for name in table.columns() {
        let col = table.require(name)?;
        let stds = groups.values().map(|rows| sample_std_dev(&present(col, rows))).collect();
        cols.push((name.clone(), stds));
    }
    LabelTable::new("day", groups.into_keys().collect(), cols)
}

/// Forecast average flow minus the long term average of the same calendar day.
///
/// `day_avgs` is a [`daily_averages`] table holding `day_column`. With `daily`, the
/// forecast is first averaged per day and keyed at midnight. Forecast steps whose
/// `MM/DD` is missing from `day_avgs` are dropped.
pub fn daily_flow_anomaly(
    stats: &TimeTable,
    day_avgs: &LabelTable,
    day_column: &str,
    daily: bool,
) -> Result<TimeTable> {
    let (mut keys, mut flows) = stats.series("flow_avg_m^3/s")?;
    if daily {
        let mut by_day: BTreeMap<NaiveDateTime, Vec<f64>> = BTreeMap::new();
        for (k, v) in keys.iter().zip(&flows) {
            by_day
                .entry(k.date().and_time(NaiveTime::MIN))
                .or_default()
                .push(*v);
        }
        keys = by_day.keys().copied().collect();
        flows = by_day.values().filter_map(|v| mean(v)).collect();
    }

    let averages = day_avgs.require(day_column)?;
    let lookup: BTreeMap<&str, Option<f64>> = day_avgs
        .index()
        .iter()
        .map(String::as_str)
        .zip(averages.iter().copied())
        .collect();

    let mut index = Vec::new();
    let mut anomaly = Vec::new();
    for (k, flow) in keys.iter().zip(flows) {
        let label = k.format("%m/%d").to_string();
        if let Some(avg) = lookup.get(label.as_str()) {
            index.push(*k);
            anomaly.push(avg.map(|a| flow - a));
        }
    }
    TimeTable::new(
        stats.index_name(),
        index,
        vec![("anomaly_m^3/s".into(), anomaly)],
    )
}

/// Exceedance probabilities for a flow duration curve.
///
/// Returns `(probability, flow)` with flows sorted high to low; ties share their
/// average rank.
pub fn flow_duration(values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let n = sorted.len();

    // Ascending average ranks (1-based) of the descending values.
    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        // Positions i..=j hold equal values; ascending rank of position p is n - p.
        let avg = (((n - i) + (n - j)) as f64) / 2.0;
        for r in &mut ranks[i..=j] {
            *r = avg;
        }
        i = j + 1;
    }

    let prob = ranks
        .iter()
        .map(|rank| (n as f64 - rank) / (n as f64 + 1.0))
        .collect();
    (prob, sorted)
}
