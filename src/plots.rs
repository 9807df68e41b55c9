//! Chart data and plotly figures for the streamflow products.
//!
//! Every chart comes in two forms: a serialisable `*PlotData` struct holding the
//! series already extracted from the tables, and a [`Figure`] built from it.

use std::collections::BTreeMap;

use chrono::{Duration, Month, NaiveDateTime};
use serde::Serialize;

use crate::analyze::{daily_stats, flow_duration, DEFAULT_RETURN_PERIODS, HIGH_RES_MEMBER};
use crate::date::day_of_year_label;
use crate::error::{Error, Result};
use crate::figure::{Axis, Figure, Layout, Range, Scatter, Values, Visible};
use crate::reach::ReachId;
use crate::rperiods::ReturnPeriods;
use crate::table::{DayTable, LabelTable, TimeTable};

pub const FLOW_MAX: &str = "flow_max_m^3/s";
pub const FLOW_75: &str = "flow_75%_m^3/s";
pub const FLOW_AVG: &str = "flow_avg_m^3/s";
pub const FLOW_25: &str = "flow_25%_m^3/s";
pub const FLOW_MIN: &str = "flow_min_m^3/s";
pub const HIGH_RES: &str = "high_res_m^3/s";
pub const STREAMFLOW: &str = "streamflow_m^3/s";

/// Days of forecast records shown before the forecast starts.
pub const DEFAULT_RECORD_DAYS: i64 = 7;

const FLOW_AXIS: &str = "Streamflow (m<sup>3</sup>/s)";
const LEGEND_TITLE: &str = "Streamflow Series";

/// Extra details shown under a chart title.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlotOptions {
    pub reach_id: Option<ReachId>,
    /// Area upstream of the river with its units, e.g. `"1500 km^2"`.
    pub drain_area: Option<String>,
}

impl PlotOptions {
    pub fn reach(reach_id: ReachId) -> Self {
        Self {
            reach_id: Some(reach_id),
            drain_area: None,
        }
    }
}

pub fn build_title(base: &str, opts: &PlotOptions) -> String {
    let mut title = base.to_string();
    if let Some(id) = opts.reach_id {
        title.push_str(&format!("<br>Stream ID: {id}"));
    }
    if let Some(area) = opts.drain_area.as_deref().filter(|a| !a.is_empty()) {
        title.push_str(&format!("<br>Upstream Drainage Area: {area}"));
    }
    title
}

/// Fill colour of each return period band.
pub fn plot_colors() -> BTreeMap<u32, &'static str> {
    BTreeMap::from([
        (2, "rgba(254, 240, 1, .4)"),
        (5, "rgba(253, 154, 1, .4)"),
        (10, "rgba(255, 56, 5, .4)"),
        (20, "rgba(128, 0, 246, .4)"),
        (25, "rgba(255, 0, 0, .4)"),
        (50, "rgba(128, 0, 106, .4)"),
        (100, "rgba(128, 0, 246, .4)"),
    ])
}

fn color_for(years: u32) -> &'static str {
    plot_colors().get(&years).copied().unwrap_or("rgba(0, 0, 0, .4)")
}

fn time_range(table: &TimeTable) -> Result<(NaiveDateTime, NaiveDateTime)> {
    match (table.first_key(), table.last_key()) {
        (Some(a), Some(b)) => Ok((*a, *b)),
        _ => Err(Error::EmptyTable),
    }
}

fn flow_axis() -> Axis {
    Axis::titled(FLOW_AXIS).from_zero()
}

fn date_axis(start: NaiveDateTime, end: NaiveDateTime) -> Axis {
    Axis::titled("Date").range(Range::Time(start, end))
}

fn reversed<T: Clone>(v: &[T]) -> impl Iterator<Item = T> + '_ {
    v.iter().rev().cloned()
}

/// Thresholds drawn as bands, and the one whose distance below the top threshold
/// extends the top band.
///
/// Service tables use 25 (or 10 for legacy 2/10/20 tables); other sets, such as
/// locally fitted ones, use the second highest threshold.
fn band_years(rperiods: &ReturnPeriods) -> Result<(Vec<u32>, u32)> {
    if rperiods.is_legacy() {
        return Ok((vec![2, 10, 20], 10));
    }
    if DEFAULT_RETURN_PERIODS.iter().all(|y| rperiods.get(*y).is_some()) {
        return Ok((DEFAULT_RETURN_PERIODS.to_vec(), 25));
    }
    let years: Vec<u32> = rperiods.thresholds.keys().copied().collect();
    let lower = match years.as_slice() {
        [] => return Err(Error::MissingColumn("return_period_*".into())),
        [only] => *only,
        [.., below, _] => *below,
    };
    Ok((years, lower))
}

/// Filled bands between consecutive return period thresholds across `start..end`.
///
/// Bands are drawn when `max_visible` exceeds the lowest threshold and are
/// legend-only otherwise. The top band reaches `max(2 * r100 - r25, y_max)`.
pub fn rperiod_scatters(
    start: NaiveDateTime,
    end: NaiveDateTime,
    rperiods: &ReturnPeriods,
    y_max: f64,
    max_visible: f64,
) -> Result<Vec<Scatter>> {
    let (years, lower) = band_years(rperiods)?;
    let flows = years
        .iter()
        .map(|&y| rperiods.require(y).map(f64::trunc))
        .collect::<Result<Vec<_>>>()?;
    let (Some(&lowest), Some(&top)) = (flows.first(), flows.last()) else {
        return Err(Error::MissingColumn("return_period_*".into()));
    };
    let rmax = (2.0 * top - rperiods.require(lower)?.trunc()).max(y_max).trunc();

    let x = vec![start, end, end, start];
    let visible = if max_visible > lowest {
        Visible::Shown
    } else {
        Visible::LegendOnly
    };
    let band = |name: String, y: [f64; 4], color: &str| {
        Scatter::new(name, x.clone(), y.to_vec())
            .legend_group("returnperiods")
            .fill("toself")
            .visible(visible)
            .color(color)
            .line_width(0.0)
    };

    let mut out = Vec::with_capacity(flows.len() + 1);
    if !rperiods.is_legacy() {
        out.push(
            band("Return Periods".into(), [lowest, lowest, rmax, rmax], "rgba(0,0,0,0)").fill("none"),
        );
    }
    for (i, (&rp, &lo)) in years.iter().zip(&flows).enumerate() {
        let hi = flows.get(i + 1).copied().unwrap_or(rmax);
        out.push(band(format!("{rp} Year: {lo}"), [lo, lo, hi, hi], color_for(rp)));
    }
    Ok(out)
}

/// Series of the `ForecastStats` chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPlotData {
    pub reach_id: Option<ReachId>,
    pub drain_area: Option<String>,
    pub x_stats: Vec<NaiveDateTime>,
    pub x_hires: Vec<NaiveDateTime>,
    pub y_max: f64,
    pub flow_max: Vec<f64>,
    #[serde(rename = "flow_75%")]
    pub flow_75: Vec<f64>,
    pub flow_avg: Vec<f64>,
    #[serde(rename = "flow_25%")]
    pub flow_25: Vec<f64>,
    pub flow_min: Vec<f64>,
    pub high_res: Vec<f64>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rperiods: Option<ReturnPeriods>,
}

fn vec_max(v: &[f64]) -> f64 {
    v.iter().copied().fold(0.0, f64::max)
}

impl ForecastPlotData {
    /// Statistics are read from the rows where every ensemble statistic is present.
    /// A missing `high_res` column leaves that trace empty.
    pub fn new(stats: &TimeTable, rperiods: Option<&ReturnPeriods>, opts: &PlotOptions) -> Result<Self> {
        let (start, end) = time_range(stats)?;
        let names = [FLOW_MAX, FLOW_75, FLOW_AVG, FLOW_25, FLOW_MIN];
        let cols = names
            .iter()
            .map(|n| stats.require(n))
            .collect::<Result<Vec<_>>>()?;

        let mut x_stats = Vec::new();
        let mut series: [Vec<f64>; 5] = Default::default();
        for (r, key) in stats.index().iter().enumerate() {
            let row: Option<Vec<f64>> = cols.iter().map(|c| c[r]).collect();
            if let Some(row) = row {
                x_stats.push(*key);
                for (s, v) in series.iter_mut().zip(row) {
                    s.push(v);
                }
            }
        }
        let (x_hires, high_res) = if stats.has_column(HIGH_RES) {
            stats.series(HIGH_RES)?
        } else {
            (Vec::new(), Vec::new())
        };
        let [flow_max, flow_75, flow_avg, flow_25, flow_min] = series;

        Ok(Self {
            reach_id: opts.reach_id,
            drain_area: opts.drain_area.clone(),
            y_max: stats.max(FLOW_MAX).unwrap_or(0.0),
            x_stats,
            x_hires,
            flow_max,
            flow_75,
            flow_avg,
            flow_25,
            flow_min,
            high_res,
            start,
            end,
            rperiods: rperiods.cloned(),
        })
    }

    /// Largest flow drawn by the default-visible traces.
    pub fn max_visible(&self) -> f64 {
        vec_max(&self.flow_75)
            .max(vec_max(&self.flow_avg))
            .max(vec_max(&self.high_res))
    }

    /// The stats traces without return period bands.
    pub fn scatters(&self) -> Vec<Scatter> {
        let x = &self.x_stats;
        let envelope_x: Vec<NaiveDateTime> = x.iter().copied().chain(reversed(x)).collect();
        let maxmin_y = self.flow_max.iter().copied().chain(reversed(&self.flow_min)).collect();
        let pct_y = self.flow_75.iter().copied().chain(reversed(&self.flow_25)).collect();

        vec![
            Scatter::new("Maximum & Minimum", envelope_x.clone(), maxmin_y)
                .legend_group("boundaries")
                .fill("toself")
                .visible(Visible::LegendOnly)
                .color("lightblue")
                .dash("dash"),
            Scatter::new("Maximum", x.clone(), self.flow_max.clone())
                .legend_group("boundaries")
                .visible(Visible::LegendOnly)
                .hide_legend()
                .color("darkblue")
                .dash("dash"),
            Scatter::new("Minimum", x.clone(), self.flow_min.clone())
                .legend_group("boundaries")
                .visible(Visible::LegendOnly)
                .hide_legend()
                .color("darkblue")
                .dash("dash"),
            Scatter::new("25-75 Percentile Flow", envelope_x, pct_y)
                .legend_group("percentile_flow")
                .fill("toself")
                .color("lightgreen"),
            Scatter::new("75%", x.clone(), self.flow_75.clone())
                .legend_group("percentile_flow")
                .hide_legend()
                .color("green"),
            Scatter::new("25%", x.clone(), self.flow_25.clone())
                .legend_group("percentile_flow")
                .hide_legend()
                .color("green"),
            Scatter::new("Higher Resolution", self.x_hires.clone(), self.high_res.clone()).color("black"),
            Scatter::new("Average", x.clone(), self.flow_avg.clone()).color("blue"),
        ]
    }

    pub fn figure(&self) -> Result<Figure> {
        let mut data = self.scatters();
        if let Some(rp) = &self.rperiods {
            data.extend(rperiod_scatters(self.start, self.end, rp, self.y_max, self.max_visible())?);
        }
        let opts = self.options();
        let layout = Layout::new(
            build_title("Forecasted Streamflow", &opts),
            date_axis(self.start, self.end)
                .hover_format("%b %d %Y")
                .tick_format("%b %d %Y"),
            flow_axis(),
        )
        .legend_title(LEGEND_TITLE);
        Ok(Figure::new(data, layout))
    }

    fn options(&self) -> PlotOptions {
        PlotOptions {
            reach_id: self.reach_id,
            drain_area: self.drain_area.clone(),
        }
    }
}

pub fn forecast_plot(stats: &TimeTable, rperiods: Option<&ReturnPeriods>, opts: &PlotOptions) -> Result<Figure> {
    ForecastPlotData::new(stats, rperiods, opts)?.figure()
}

/// Series of the `ForecastEnsembles` chart.
///
/// Members 1-51 share the `x_1-51` axis (rows where member 1 has a value);
/// the high resolution member 52 keeps its own axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsemblesPlotData {
    pub reach_id: Option<ReachId>,
    pub drain_area: Option<String>,
    #[serde(rename = "x_1-51")]
    pub x_members: Vec<NaiveDateTime>,
    #[serde(rename = "x_52")]
    pub x_high_res: Vec<NaiveDateTime>,
    #[serde(rename = "ensemble_52_m^3/s")]
    pub high_res: Vec<f64>,
    /// Members 1-51 by column name.
    #[serde(flatten)]
    pub members: BTreeMap<String, Vec<Option<f64>>>,
    pub y_max: f64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rperiods: Option<ReturnPeriods>,
}

impl EnsemblesPlotData {
    pub fn new(ensembles: &TimeTable, rperiods: Option<&ReturnPeriods>, opts: &PlotOptions) -> Result<Self> {
        let (start, end) = time_range(ensembles)?;
        let member_names: Vec<&String> = ensembles
            .columns()
            .iter()
            .filter(|c| c.starts_with("ensemble_") && !c.starts_with(HIGH_RES_MEMBER))
            .collect();
        let first = member_names
            .iter()
            .min()
            .ok_or_else(|| Error::MissingColumn("ensemble_01_m^3/s".into()))?;
        let first_col = ensembles.require(first)?;
        let rows: Vec<usize> = (0..ensembles.len()).filter(|&r| first_col[r].is_some()).collect();

        let high_res_name = ensembles
            .columns()
            .iter()
            .find(|c| c.starts_with(HIGH_RES_MEMBER))
            .ok_or_else(|| Error::MissingColumn(format!("{HIGH_RES_MEMBER}_m^3/s")))?;
        let (x_high_res, high_res) = ensembles.series(high_res_name)?;

        let mut members = BTreeMap::new();
        for name in &member_names {
            let col = ensembles.require(name)?;
            members.insert((*name).clone(), rows.iter().map(|&r| col[r]).collect());
        }
        let y_max = ensembles
            .columns()
            .iter()
            .filter_map(|c| ensembles.max(c))
            .fold(0.0, f64::max);

        Ok(Self {
            reach_id: opts.reach_id,
            drain_area: opts.drain_area.clone(),
            x_members: rows.iter().map(|&r| ensembles.index()[r]).collect(),
            x_high_res,
            high_res,
            members,
            y_max,
            start,
            end,
            rperiods: rperiods.cloned(),
        })
    }

    /// `(member number, values)` in member order.
    fn numbered_members(&self) -> impl Iterator<Item = (usize, &Vec<Option<f64>>)> + '_ {
        self.members.values().enumerate().map(|(i, v)| (i + 1, v))
    }

    pub fn figure(&self) -> Result<Figure> {
        let mut data = vec![
            Scatter::new("High Resolution", self.x_high_res.clone(), self.high_res.clone()).color("black"),
        ];
        for (n, values) in self.numbered_members() {
            data.push(Scatter::with_gaps(
                format!("Ensemble {n}"),
                self.x_members.clone(),
                values.clone(),
            ));
        }
        if let Some(rp) = &self.rperiods {
            data.extend(rperiod_scatters(self.start, self.end, rp, self.y_max, 0.0)?);
        }

        let opts = PlotOptions {
            reach_id: self.reach_id,
            drain_area: self.drain_area.clone(),
        };
        let layout = Layout::new(
            build_title("Ensemble Predicted Streamflow", &opts),
            date_axis(self.start, self.end)
                .hover_format("%b %d %Y")
                .tick_format("%b %d %Y"),
            Axis::titled(FLOW_AXIS).range(Range::Number(0.0, 1.2 * self.y_max)),
        )
        .legend_title(LEGEND_TITLE);
        Ok(Figure::new(data, layout))
    }
}

pub fn ensembles_plot(ensembles: &TimeTable, rperiods: Option<&ReturnPeriods>, opts: &PlotOptions) -> Result<Figure> {
    EnsemblesPlotData::new(ensembles, rperiods, opts)?.figure()
}

/// Series of the `ForecastRecords` chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordsPlotData {
    pub reach_id: Option<ReachId>,
    pub drain_area: Option<String>,
    pub x_records: Vec<NaiveDateTime>,
    pub recorded_flows: Vec<f64>,
    pub y_max: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rperiods: Option<ReturnPeriods>,
}

impl RecordsPlotData {
    pub fn new(records: &TimeTable, rperiods: Option<&ReturnPeriods>, opts: &PlotOptions) -> Result<Self> {
        let (x_records, recorded_flows) = records.series(STREAMFLOW)?;
        Ok(Self {
            reach_id: opts.reach_id,
            drain_area: opts.drain_area.clone(),
            y_max: vec_max(&recorded_flows),
            x_records,
            recorded_flows,
            rperiods: rperiods.cloned(),
        })
    }

    fn scatter(&self) -> Scatter {
        Scatter::new("1st day forecasts", self.x_records.clone(), self.recorded_flows.clone()).color("gold")
    }

    pub fn figure(&self) -> Result<Figure> {
        let (Some(&start), Some(&end)) = (self.x_records.first(), self.x_records.last()) else {
            return Err(Error::EmptyTable);
        };
        let mut data = vec![self.scatter()];
        if let Some(rp) = &self.rperiods {
            data.extend(rperiod_scatters(start, end, rp, self.y_max, self.y_max)?);
        }
        let opts = PlotOptions {
            reach_id: self.reach_id,
            drain_area: self.drain_area.clone(),
        };
        let layout = Layout::new(
            build_title("Forecasted Streamflow Record", &opts),
            date_axis(start, end),
            Axis::titled(FLOW_AXIS).range(Range::Number(0.0, 1.2 * self.y_max)),
        )
        .legend_title(LEGEND_TITLE);
        Ok(Figure::new(data, layout))
    }
}

pub fn records_plot(records: &TimeTable, rperiods: Option<&ReturnPeriods>, opts: &PlotOptions) -> Result<Figure> {
    RecordsPlotData::new(records, rperiods, opts)?.figure()
}

/// Series of the `HistoricSimulation` chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalPlotData {
    pub reach_id: Option<ReachId>,
    pub drain_area: Option<String>,
    pub x_datetime: Vec<NaiveDateTime>,
    pub y_flow: Vec<f64>,
    pub y_max: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rperiods: Option<ReturnPeriods>,
}

impl HistoricalPlotData {
    pub fn new(hist: &TimeTable, rperiods: Option<&ReturnPeriods>, opts: &PlotOptions) -> Result<Self> {
        let (x_datetime, y_flow) = hist.series(STREAMFLOW)?;
        if x_datetime.is_empty() {
            return Err(Error::EmptyTable);
        }
        Ok(Self {
            reach_id: opts.reach_id,
            drain_area: opts.drain_area.clone(),
            y_max: vec_max(&y_flow),
            x_datetime,
            y_flow,
            rperiods: rperiods.cloned(),
        })
    }

    pub fn figure(&self) -> Result<Figure> {
        let (Some(&start), Some(&end)) = (self.x_datetime.first(), self.x_datetime.last()) else {
            return Err(Error::EmptyTable);
        };
        let mut data = vec![Scatter::new(
            "Historic Simulation",
            self.x_datetime.clone(),
            self.y_flow.clone(),
        )];
        if let Some(rp) = &self.rperiods {
            data.extend(rperiod_scatters(start, end, rp, self.y_max, self.y_max)?);
        }
        let opts = PlotOptions {
            reach_id: self.reach_id,
            drain_area: self.drain_area.clone(),
        };
        let layout = Layout::new(
            build_title("Historic Streamflow Simulation", &opts),
            date_axis(start, end).hover_format("%b %d %Y").tick_format("%Y"),
            flow_axis(),
        )
        .legend_title(LEGEND_TITLE);
        Ok(Figure::new(data, layout))
    }
}

pub fn historical_plot(hist: &TimeTable, rperiods: Option<&ReturnPeriods>, opts: &PlotOptions) -> Result<Figure> {
    HistoricalPlotData::new(hist, rperiods, opts)?.figure()
}

/// Series of the `SeasonalAverage` chart, one point per day of the year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalPlotData {
    pub reach_id: Option<ReachId>,
    pub drain_area: Option<String>,
    pub day_number: Vec<u32>,
    /// `Jan 01` style labels for `day_number`.
    pub day_label: Vec<String>,
    pub average_flow: Vec<Option<f64>>,
    /// Absent from tables produced before the service reported daily extremes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_flow: Option<Vec<Option<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_flow: Option<Vec<Option<f64>>>,
}

impl SeasonalPlotData {
    pub fn new(seasonal: &DayTable, opts: &PlotOptions) -> Result<Self> {
        if seasonal.is_empty() {
            return Err(Error::EmptyTable);
        }
        let day_number = seasonal.index().to_vec();
        let day_label = day_number
            .iter()
            .map(|d| {
                day_of_year_label(*d)
                    .ok_or_else(|| Error::InvalidRequest(format!("invalid day of year: {d}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            reach_id: opts.reach_id,
            drain_area: opts.drain_area.clone(),
            day_number,
            day_label,
            average_flow: seasonal.require(STREAMFLOW)?.to_vec(),
            max_flow: seasonal.column("max_flow").map(<[_]>::to_vec),
            min_flow: seasonal.column("min_flow").map(<[_]>::to_vec),
        })
    }

    pub fn figure(&self) -> Result<Figure> {
        let x = || Values::Label(self.day_label.clone());
        let mut data = vec![Scatter::with_gaps("Average Daily Flow", x(), self.average_flow.clone()).color("blue")];
        if let Some(max) = &self.max_flow {
            data.push(Scatter::with_gaps("Maximum Daily Flow", x(), max.clone()).color("red"));
        }
        if let Some(min) = &self.min_flow {
            data.push(Scatter::with_gaps("Minimum Daily Flow", x(), min.clone()).color("black"));
        }

        let opts = PlotOptions {
            reach_id: self.reach_id,
            drain_area: self.drain_area.clone(),
        };
        let layout = Layout::new(
            build_title("Daily Average Streamflow (Historic Simulation)", &opts),
            Axis::titled("Date").category(),
            flow_axis(),
        )
        .legend_title(LEGEND_TITLE);
        Ok(Figure::new(data, layout))
    }
}

pub fn seasonal_plot(seasonal: &DayTable, opts: &PlotOptions) -> Result<Figure> {
    SeasonalPlotData::new(seasonal, opts)?.figure()
}

/// Exceedance probability of every simulated flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowDurationPlotData {
    pub reach_id: Option<ReachId>,
    pub drain_area: Option<String>,
    pub x_probability: Vec<f64>,
    pub y_flow: Vec<f64>,
    pub y_max: f64,
}

impl FlowDurationPlotData {
    pub fn new(hist: &TimeTable, opts: &PlotOptions) -> Result<Self> {
        let (_, flows) = hist.series(STREAMFLOW)?;
        let (x_probability, y_flow) = flow_duration(&flows);
        let y_max = *y_flow.first().ok_or(Error::EmptyTable)?;
        Ok(Self {
            reach_id: opts.reach_id,
            drain_area: opts.drain_area.clone(),
            x_probability,
            y_flow,
            y_max,
        })
    }

    pub fn figure(&self) -> Figure {
        let opts = PlotOptions {
            reach_id: self.reach_id,
            drain_area: self.drain_area.clone(),
        };
        Figure::new(
            vec![Scatter::new(
                "Flow Duration Curve",
                self.x_probability.clone(),
                self.y_flow.clone(),
            )],
            Layout::new(
                build_title("Flow Duration Curve", &opts),
                Axis::titled("Exceedence Probability"),
                flow_axis(),
            )
            .legend_title(LEGEND_TITLE),
        )
    }
}

pub fn flow_duration_curve_plot(hist: &TimeTable, opts: &PlotOptions) -> Result<Figure> {
    Ok(FlowDurationPlotData::new(hist, opts)?.figure())
}

/// Median and 20-80% uncertainty band of the ensemble forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleForecastPlotData {
    pub reach_id: Option<ReachId>,
    pub drain_area: Option<String>,
    pub x_datetime: Vec<NaiveDateTime>,
    pub flow_median: Vec<f64>,
    pub flow_upper: Vec<f64>,
    pub flow_lower: Vec<f64>,
    pub y_max: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rperiods: Option<ReturnPeriods>,
}

impl SimpleForecastPlotData {
    /// Reads a [`simple_forecast`](crate::analyze::simple_forecast) table; rows missing
    /// any of the three columns are skipped.
    pub fn new(forecast: &TimeTable, rperiods: Option<&ReturnPeriods>, opts: &PlotOptions) -> Result<Self> {
        let names = ["flow_median", "flow_uncertainty_upper", "flow_uncertainty_lower"];
        let cols = names
            .iter()
            .map(|n| forecast.require(n))
            .collect::<Result<Vec<_>>>()?;

        let mut x_datetime = Vec::new();
        let mut series: [Vec<f64>; 3] = Default::default();
        for (r, key) in forecast.index().iter().enumerate() {
            let row: Option<Vec<f64>> = cols.iter().map(|c| c[r]).collect();
            if let Some(row) = row {
                x_datetime.push(*key);
                for (s, v) in series.iter_mut().zip(row) {
                    s.push(v);
                }
            }
        }
        if x_datetime.is_empty() {
            return Err(Error::EmptyTable);
        }
        let [flow_median, flow_upper, flow_lower] = series;

        Ok(Self {
            reach_id: opts.reach_id,
            drain_area: opts.drain_area.clone(),
            y_max: vec_max(&flow_upper),
            x_datetime,
            flow_median,
            flow_upper,
            flow_lower,
            rperiods: rperiods.cloned(),
        })
    }

    pub fn figure(&self) -> Result<Figure> {
        let x = &self.x_datetime;
        let (Some(&start), Some(&end)) = (x.first(), x.last()) else {
            return Err(Error::EmptyTable);
        };
        let envelope_x: Vec<NaiveDateTime> = x.iter().copied().chain(reversed(x)).collect();
        let envelope_y = self.flow_upper.iter().copied().chain(reversed(&self.flow_lower)).collect();

        let mut data = vec![
            Scatter::new("Streamflow (Median)", x.clone(), self.flow_median.clone()).color("black"),
            Scatter::new("Uncertainty Bounds", envelope_x, envelope_y)
                .legend_group("uncertainty")
                .fill("toself")
                .color("lightblue"),
            Scatter::new("Uncertainty Upper Bounds (80%)", x.clone(), self.flow_upper.clone())
                .legend_group("uncertainty")
                .hide_legend()
                .color("lightblue")
                .dash("dash"),
            Scatter::new("Uncertainty Lower Bounds (20%)", x.clone(), self.flow_lower.clone())
                .legend_group("uncertainty")
                .hide_legend()
                .color("lightblue")
                .dash("dash"),
        ];
        if let Some(rp) = &self.rperiods {
            data.extend(rperiod_scatters(start, end, rp, self.y_max, 0.0)?);
        }

        let opts = PlotOptions {
            reach_id: self.reach_id,
            drain_area: self.drain_area.clone(),
        };
        let layout = Layout::new(
            build_title("Forecasted Streamflow", &opts),
            Axis::titled("Date (UTC +0:00)").range(Range::Time(start, end)),
            flow_axis(),
        )
        .legend_title(LEGEND_TITLE);
        Ok(Figure::new(data, layout))
    }
}

pub fn simple_forecast_plot(
    forecast: &TimeTable,
    rperiods: Option<&ReturnPeriods>,
    opts: &PlotOptions,
) -> Result<Figure> {
    SimpleForecastPlotData::new(forecast, rperiods, opts)?.figure()
}

fn label_series(table: &LabelTable, column: &str) -> Result<(Vec<String>, Vec<Option<f64>>)> {
    if table.is_empty() {
        return Err(Error::EmptyTable);
    }
    Ok((table.index().to_vec(), table.require(column)?.to_vec()))
}

/// One value per `MM/DD` label, e.g. from [`daily_averages`](crate::analyze::daily_averages).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAveragesPlotData {
    pub reach_id: Option<ReachId>,
    pub drain_area: Option<String>,
    pub x_day: Vec<String>,
    pub y_flow: Vec<Option<f64>>,
}

impl DailyAveragesPlotData {
    pub fn new(day_avgs: &LabelTable, column: &str, opts: &PlotOptions) -> Result<Self> {
        let (x_day, y_flow) = label_series(day_avgs, column)?;
        Ok(Self {
            reach_id: opts.reach_id,
            drain_area: opts.drain_area.clone(),
            x_day,
            y_flow,
        })
    }

    pub fn figure(&self) -> Figure {
        let opts = PlotOptions {
            reach_id: self.reach_id,
            drain_area: self.drain_area.clone(),
        };
        Figure::new(
            vec![Scatter::with_gaps(
                "Average Daily Flow",
                Values::Label(self.x_day.clone()),
                self.y_flow.clone(),
            )
            .color("blue")],
            Layout::new(
                build_title("Daily Average Streamflow (Simulated)", &opts),
                Axis::titled("Date").hover_format("%b %d").tick_format("%b"),
                flow_axis(),
            )
            .legend_title(LEGEND_TITLE),
        )
    }
}

pub fn daily_averages_plot(day_avgs: &LabelTable, column: &str, opts: &PlotOptions) -> Result<Figure> {
    Ok(DailyAveragesPlotData::new(day_avgs, column, opts)?.figure())
}

/// Monthly averages with `MM` labels turned into month names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAveragesPlotData {
    pub reach_id: Option<ReachId>,
    pub drain_area: Option<String>,
    pub x_month: Vec<String>,
    pub y_flow: Vec<Option<f64>>,
}

impl MonthlyAveragesPlotData {
    pub fn new(month_avgs: &LabelTable, column: &str, opts: &PlotOptions) -> Result<Self> {
        let (labels, y_flow) = label_series(month_avgs, column)?;
        let x_month = labels
            .iter()
            .map(|label| {
                label
                    .parse::<u8>()
                    .ok()
                    .and_then(|m| Month::try_from(m).ok())
                    .map(|m| m.name().to_string())
                    .ok_or_else(|| Error::InvalidRequest(format!("invalid month: {label}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            reach_id: opts.reach_id,
            drain_area: opts.drain_area.clone(),
            x_month,
            y_flow,
        })
    }

    pub fn figure(&self) -> Figure {
        let opts = PlotOptions {
            reach_id: self.reach_id,
            drain_area: self.drain_area.clone(),
        };
        Figure::new(
            vec![Scatter::with_gaps(
                "Average Monthly Flow",
                Values::Label(self.x_month.clone()),
                self.y_flow.clone(),
            )
            .color("blue")],
            Layout::new(
                build_title("Monthly Average Streamflow (Simulated)", &opts),
                Axis::titled("Month"),
                Axis::titled(FLOW_AXIS),
            ),
        )
    }
}

pub fn monthly_averages_plot(month_avgs: &LabelTable, column: &str, opts: &PlotOptions) -> Result<Figure> {
    Ok(MonthlyAveragesPlotData::new(month_avgs, column, opts)?.figure())
}

/// Mean of the annual averages of one decade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecadeAverage {
    pub decade: i32,
    pub first_year: String,
    pub last_year: String,
    pub mean: f64,
}

/// Annual averages, optionally with a line per decade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualAveragesPlotData {
    pub reach_id: Option<ReachId>,
    pub drain_area: Option<String>,
    pub x_year: Vec<String>,
    pub y_flow: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub decades: Vec<DecadeAverage>,
}

impl AnnualAveragesPlotData {
    pub fn new(year_avgs: &LabelTable, column: &str, decade_averages: bool, opts: &PlotOptions) -> Result<Self> {
        let (x_year, y_flow) = label_series(year_avgs, column)?;

        let mut decades = Vec::new();
        if decade_averages {
            let mut by_decade: BTreeMap<i32, (&str, &str, Vec<f64>)> = BTreeMap::new();
            for (label, value) in x_year.iter().zip(&y_flow) {
                let year: i32 = label
                    .parse()
                    .map_err(|_| Error::InvalidRequest(format!("invalid year: {label}")))?;
                let entry = by_decade
                    .entry(year.div_euclid(10) * 10)
                    .or_insert((label.as_str(), label.as_str(), Vec::new()));
                entry.1 = label.as_str();
                entry.2.extend(*value);
            }
            for (decade, (first, last, values)) in by_decade {
                if values.is_empty() {
                    continue;
                }
                decades.push(DecadeAverage {
                    decade,
                    first_year: first.to_string(),
                    last_year: last.to_string(),
                    mean: values.iter().sum::<f64>() / values.len() as f64,
                });
            }
        }

        Ok(Self {
            reach_id: opts.reach_id,
            drain_area: opts.drain_area.clone(),
            x_year,
            y_flow,
            decades,
        })
    }

    pub fn figure(&self) -> Figure {
        let mut data = vec![Scatter::with_gaps(
            "Average Annual Flow",
            Values::Label(self.x_year.clone()),
            self.y_flow.clone(),
        )
        .color("blue")];
        for d in &self.decades {
            data.push(
                Scatter::new(
                    format!("{}s: {:.2} m<sup>3</sup>/s", d.decade, d.mean),
                    Values::Label(vec![d.first_year.clone(), d.last_year.clone()]),
                    vec![d.mean; 2],
                )
                .legend_group("decade_averages")
                .color("red"),
            );
        }
        let opts = PlotOptions {
            reach_id: self.reach_id,
            drain_area: self.drain_area.clone(),
        };
        Figure::new(
            data,
            Layout::new(
                build_title("Annual Average Streamflow (Simulated)", &opts),
                Axis::titled("Year"),
                Axis::titled(FLOW_AXIS),
            ),
        )
    }
}

pub fn annual_averages_plot(
    year_avgs: &LabelTable,
    column: &str,
    decade_averages: bool,
    opts: &PlotOptions,
) -> Result<Figure> {
    Ok(AnnualAveragesPlotData::new(year_avgs, column, decade_averages, opts)?.figure())
}

/// A named series of a label-indexed chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Every column of a [`daily_stats`] table, one trace each.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStatsPlotData {
    pub reach_id: Option<ReachId>,
    pub drain_area: Option<String>,
    pub x_day: Vec<String>,
    pub series: Vec<NamedSeries>,
}

impl DailyStatsPlotData {
    /// Computes the daily statistics of `hist`.
    pub fn new(hist: &TimeTable, opts: &PlotOptions) -> Result<Self> {
        let stats = daily_stats(hist)?;
        if stats.is_empty() {
            return Err(Error::EmptyTable);
        }
        let series = stats
            .columns()
            .iter()
            .map(|name| -> Result<NamedSeries> {
                Ok(NamedSeries {
                    name: name.clone(),
                    values: stats.require(name)?.to_vec(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            reach_id: opts.reach_id,
            drain_area: opts.drain_area.clone(),
            x_day: stats.index().to_vec(),
            series,
        })
    }

    pub fn figure(&self) -> Figure {
        let data = self
            .series
            .iter()
            .map(|s| Scatter::with_gaps(s.name.clone(), Values::Label(self.x_day.clone()), s.values.clone()))
            .collect();
        let opts = PlotOptions {
            reach_id: self.reach_id,
            drain_area: self.drain_area.clone(),
        };
        Figure::new(
            data,
            Layout::new(
                build_title("Daily Average Streamflow (Simulated)", &opts),
                Axis::titled("Date").hover_format("%b %d").tick_format("%b"),
                flow_axis(),
            )
            .legend_title(LEGEND_TITLE),
        )
    }
}

pub fn daily_stats_plot(hist: &TimeTable, opts: &PlotOptions) -> Result<Figure> {
    Ok(DailyStatsPlotData::new(hist, opts)?.figure())
}

/// Standard deviation per `MM/DD`, e.g. from [`daily_variance`](crate::analyze::daily_variance).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyVariancePlotData {
    pub reach_id: Option<ReachId>,
    pub drain_area: Option<String>,
    pub x_day: Vec<String>,
    pub flow_std: Vec<Option<f64>>,
}

impl DailyVariancePlotData {
    pub fn new(variance: &LabelTable, column: &str, opts: &PlotOptions) -> Result<Self> {
        let (x_day, flow_std) = label_series(variance, column)?;
        Ok(Self {
            reach_id: opts.reach_id,
            drain_area: opts.drain_area.clone(),
            x_day,
            flow_std,
        })
    }

    pub fn figure(&self) -> Figure {
        let opts = PlotOptions {
            reach_id: self.reach_id,
            drain_area: self.drain_area.clone(),
        };
        Figure::new(
            vec![Scatter::with_gaps(
                "Daily Standard Deviation",
                Values::Label(self.x_day.clone()),
                self.flow_std.clone(),
            )],
            Layout::new(
                build_title("Daily Flow Standard Deviation", &opts),
                Axis::titled("Date"),
                Axis::titled(FLOW_AXIS),
            ),
        )
    }
}

pub fn daily_variance_plot(variance: &LabelTable, column: &str, opts: &PlotOptions) -> Result<Figure> {
    Ok(DailyVariancePlotData::new(variance, column, opts)?.figure())
}

/// Records, forecast statistics and ensembles of one river combined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HydroviewerPlotData {
    pub forecast: ForecastPlotData,
    pub ensembles: EnsemblesPlotData,
    pub records: RecordsPlotData,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub y_max: f64,
}

impl HydroviewerPlotData {
    /// Records older than `record_days` before the first forecast step are dropped.
    pub fn new(
        records: &TimeTable,
        stats: &TimeTable,
        ensembles: &TimeTable,
        rperiods: Option<&ReturnPeriods>,
        record_days: i64,
        opts: &PlotOptions,
    ) -> Result<Self> {
        let (stats_start, stats_end) = time_range(stats)?;
        let cutoff = stats_start - Duration::days(record_days);
        let recent = records.filter_index(|t| *t >= cutoff);

        let (start, end) = match (recent.first_key(), recent.last_key()) {
            (Some(a), Some(b)) => (stats_start.min(*a), stats_end.max(*b)),
            _ => (stats_start, stats_end),
        };

        let forecast = ForecastPlotData::new(stats, rperiods, opts)?;
        let records = RecordsPlotData::new(&recent, None, opts)?;
        let ensembles = EnsemblesPlotData::new(ensembles, None, opts)?;
        let y_max = records.y_max.max(forecast.y_max);

        Ok(Self {
            forecast,
            ensembles,
            records,
            start,
            end,
            y_max,
        })
    }

    pub fn figure(&self) -> Result<Figure> {
        let mut data = vec![self.records.scatter()];
        data.extend(self.forecast.scatters());

        // Members share one legend entry; clicking it toggles all of them.
        let x = &self.ensembles.x_members;
        for (n, values) in self.ensembles.numbered_members() {
            let trace = Scatter::with_gaps(
                if n == 1 {
                    "Forecast Ensembles".to_string()
                } else {
                    format!("Ensemble {n}")
                },
                x.clone(),
                values.clone(),
            )
            .visible(Visible::LegendOnly)
            .legend_group("ensembles");
            data.push(if n == 1 { trace } else { trace.hide_legend() });
        }

        if let Some(rp) = &self.forecast.rperiods {
            let max_visible = self
                .forecast
                .max_visible()
                .max(vec_max(&self.records.recorded_flows));
            data.extend(rperiod_scatters(self.start, self.end, rp, self.y_max, max_visible)?);
        }

        let layout = Layout::new(
            build_title("Forecasted Streamflow", &self.forecast.options()),
            date_axis(self.start, self.end),
            flow_axis(),
        );
        Ok(Figure::new(data, layout))
    }
}

pub fn hydroviewer_plot(
    records: &TimeTable,
    stats: &TimeTable,
    ensembles: &TimeTable,
    rperiods: Option<&ReturnPeriods>,
    record_days: i64,
    opts: &PlotOptions,
) -> Result<Figure> {
    HydroviewerPlotData::new(records, stats, ensembles, rperiods, record_days, opts)?.figure()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 6, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn stats() -> TimeTable {
        TimeTable::from_csv(
            "datetime,flow_max_m^3/s,flow_75%_m^3/s,flow_avg_m^3/s,flow_25%_m^3/s,flow_min_m^3/s,high_res_m^3/s\n\
             2020-06-10 00:00:00,,,,,,9\n\
             2020-06-10 03:00:00,20,12,10,8,5,11\n\
             2020-06-11 00:00:00,22,14,11,9,6,\n",
            "datetime",
        )
        .unwrap()
    }

    fn ensembles() -> TimeTable {
        TimeTable::from_csv(
            "datetime,ensemble_01_m^3/s,ensemble_02_m^3/s,ensemble_52_m^3/s\n\
             2020-06-10 00:00:00,,,9\n\
             2020-06-10 03:00:00,10,12,11\n\
             2020-06-11 00:00:00,13,30,\n",
            "datetime",
        )
        .unwrap()
    }

    fn records() -> TimeTable {
        TimeTable::from_csv(
            "datetime,streamflow_m^3/s\n\
             2020-06-01 00:00:00,4\n\
             2020-06-05 00:00:00,7\n\
             2020-06-09 00:00:00,8\n",
            "datetime",
        )
        .unwrap()
    }

    fn rperiods() -> ReturnPeriods {
        ReturnPeriods {
            reach_id: Some(1),
            max_flow: Some(40.0),
            thresholds: BTreeMap::from([
                (2, 10.5),
                (5, 15.0),
                (10, 18.0),
                (25, 21.0),
                (50, 24.0),
                (100, 27.0),
            ]),
        }
    }

    #[test]
    fn titles() {
        let opts = PlotOptions {
            reach_id: Some(3_004_334),
            drain_area: Some("1500 km^2".into()),
        };
        assert_eq!(
            build_title("Flow", &opts),
            "Flow<br>Stream ID: 3004334<br>Upstream Drainage Area: 1500 km^2"
        );
        assert_eq!(build_title("Flow", &PlotOptions::default()), "Flow");
    }

    #[test]
    fn return_period_bands() {
        let bands = rperiod_scatters(at(1, 0), at(2, 0), &rperiods(), 30.0, 12.0).unwrap();
        let names: Vec<&str> = bands.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Return Periods",
                "2 Year: 10",
                "5 Year: 15",
                "10 Year: 18",
                "25 Year: 21",
                "50 Year: 24",
                "100 Year: 27"
            ]
        );
        // rmax = max(2 * 27 - 21, 30)
        assert_eq!(bands[0].y, vec![Some(10.0), Some(10.0), Some(33.0), Some(33.0)]);
        assert_eq!(bands[6].y, vec![Some(27.0), Some(27.0), Some(33.0), Some(33.0)]);
        assert_eq!(bands[1].x, Values::Time(vec![at(1, 0), at(2, 0), at(2, 0), at(1, 0)]));
        assert!(bands.iter().all(|b| b.visible == Some(Visible::Shown)));
        assert_eq!(bands[1].line.as_ref().unwrap().color.as_deref(), Some("rgba(254, 240, 1, .4)"));

        let hidden = rperiod_scatters(at(1, 0), at(2, 0), &rperiods(), 30.0, 10.0).unwrap();
        assert!(hidden.iter().all(|b| b.visible == Some(Visible::LegendOnly)));
    }

    #[test]
    fn legacy_return_period_bands() {
        let rp = ReturnPeriods {
            reach_id: None,
            max_flow: None,
            thresholds: BTreeMap::from([(2, 10.0), (10, 20.0), (20, 25.0)]),
        };
        let bands = rperiod_scatters(at(1, 0), at(2, 0), &rp, 100.0, 0.0).unwrap();
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[2].name, "20 Year: 25");
        assert_eq!(bands[2].y[2], Some(100.0));

        // 2 * 25 - 20 above a low y_max
        let bands = rperiod_scatters(at(1, 0), at(2, 0), &rp, 5.0, 0.0).unwrap();
        assert_eq!(bands[2].y, vec![Some(25.0), Some(25.0), Some(30.0), Some(30.0)]);
    }

    #[test]
    fn top_band_grows_with_the_upper_thresholds() {
        // A y_max below the thresholds leaves the top band at 2 * r100 - r25.
        let bands = rperiod_scatters(at(1, 0), at(2, 0), &rperiods(), 0.0, 0.0).unwrap();
        assert_eq!(bands[6].y, vec![Some(27.0), Some(27.0), Some(33.0), Some(33.0)]);

        let mut wide = rperiods();
        wide.thresholds.insert(25, 15.0);
        let bands = rperiod_scatters(at(1, 0), at(2, 0), &wide, 0.0, 0.0).unwrap();
        assert_eq!(bands[6].y[2], Some(39.0));
    }

    #[test]
    fn locally_fitted_return_period_bands() {
        let rp = ReturnPeriods {
            reach_id: None,
            max_flow: None,
            thresholds: BTreeMap::from([(2, 10.0), (5, 14.0), (10, 17.0)]),
        };
        let bands = rperiod_scatters(at(1, 0), at(2, 0), &rp, 0.0, 11.0).unwrap();
        let names: Vec<&str> = bands.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Return Periods", "2 Year: 10", "5 Year: 14", "10 Year: 17"]);
        // 2 * 17 - 14
        assert_eq!(bands[3].y, vec![Some(17.0), Some(17.0), Some(20.0), Some(20.0)]);
        assert!(bands.iter().all(|b| b.visible == Some(Visible::Shown)));

        let single = ReturnPeriods {
            thresholds: BTreeMap::from([(2, 10.0)]),
            ..ReturnPeriods::default()
        };
        let bands = rperiod_scatters(at(1, 0), at(2, 0), &single, 12.0, 0.0).unwrap();
        assert_eq!(bands[1].y[2], Some(12.0));

        assert!(matches!(
            rperiod_scatters(at(1, 0), at(2, 0), &ReturnPeriods::default(), 0.0, 0.0),
            Err(Error::MissingColumn(_))
        ));
    }

    #[test]
    fn forecast_data_and_figure() {
        let data = ForecastPlotData::new(&stats(), Some(&rperiods()), &PlotOptions::reach(7)).unwrap();
        assert_eq!(data.x_stats, vec![at(10, 3), at(11, 0)]);
        assert_eq!(data.x_hires, vec![at(10, 0), at(10, 3)]);
        assert_eq!(data.y_max, 22.0);
        assert_eq!(data.max_visible(), 14.0);

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["flow_75%"], serde_json::json!([12.0, 14.0]));

        let fig = data.figure().unwrap();
        assert_eq!(fig.data.len(), 8 + 7);
        assert_eq!(fig.data[0].name, "Maximum & Minimum");
        assert_eq!(fig.data[0].y, vec![Some(20.0), Some(22.0), Some(6.0), Some(5.0)]);
        assert_eq!(fig.layout.title.text, "Forecasted Streamflow<br>Stream ID: 7");
    }

    #[test]
    fn ensembles_figure() {
        let data = EnsemblesPlotData::new(&ensembles(), None, &PlotOptions::default()).unwrap();
        assert_eq!(data.x_members, vec![at(10, 3), at(11, 0)]);
        assert_eq!(data.y_max, 30.0);
        let fig = data.figure().unwrap();
        let names: Vec<&str> = fig.data.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["High Resolution", "Ensemble 1", "Ensemble 2"]);
        assert_eq!(fig.layout.yaxis.range, Some(Range::Number(0.0, 36.0)));
    }

    #[test]
    fn seasonal_labels_days() {
        let seasonal = DayTable::from_csv(
            "day_of_year,streamflow_m^3/s,max_flow,min_flow\n0,1,2,0.5\n31,1.5,3,1\n",
            "day_of_year",
        )
        .unwrap();
        let data = SeasonalPlotData::new(&seasonal, &PlotOptions::default()).unwrap();
        assert_eq!(data.day_label, vec!["Jan 01", "Feb 01"]);
        assert_eq!(seasonal_plot(&seasonal, &PlotOptions::default()).unwrap().data.len(), 3);

        let average_only = DayTable::from_csv("day_of_year,streamflow_m^3/s\n0,1\n", "day_of_year").unwrap();
        assert_eq!(seasonal_plot(&average_only, &PlotOptions::default()).unwrap().data.len(), 1);
    }

    #[test]
    fn seasonal_rejects_days_past_the_year() {
        let seasonal = DayTable::from_csv(
            "day_of_year,streamflow_m^3/s\n0,1\n4294967295,2\n",
            "day_of_year",
        )
        .unwrap();
        assert!(matches!(
            SeasonalPlotData::new(&seasonal, &PlotOptions::default()),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn simple_forecast_figure() {
        let forecast = TimeTable::from_csv(
            "datetime,flow_uncertainty_upper,flow_median,flow_uncertainty_lower\n\
             2020-06-10 00:00:00,14,10,8\n\
             2020-06-10 06:00:00,,11,\n\
             2020-06-11 00:00:00,16,12,9\n",
            "datetime",
        )
        .unwrap();
        let data = SimpleForecastPlotData::new(&forecast, Some(&rperiods()), &PlotOptions::reach(7)).unwrap();
        assert_eq!(data.x_datetime, vec![at(10, 0), at(11, 0)]);
        assert_eq!(data.y_max, 16.0);

        let fig = data.figure().unwrap();
        let names: Vec<&str> = fig.data.iter().take(4).map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Streamflow (Median)",
                "Uncertainty Bounds",
                "Uncertainty Upper Bounds (80%)",
                "Uncertainty Lower Bounds (20%)"
            ]
        );
        assert_eq!(fig.data[1].y, vec![Some(14.0), Some(16.0), Some(9.0), Some(8.0)]);
        assert_eq!(fig.data.len(), 4 + 7);
        assert!(fig.data[4..].iter().all(|b| b.visible == Some(Visible::LegendOnly)));
        assert_eq!(fig.layout.xaxis.range, Some(Range::Time(at(10, 0), at(11, 0))));
        assert_eq!(fig.layout.title.text, "Forecasted Streamflow<br>Stream ID: 7");
    }

    fn labels(index_name: &str, labels: &[&str], values: Vec<Option<f64>>) -> LabelTable {
        LabelTable::new(
            index_name,
            labels.iter().map(|l| l.to_string()).collect(),
            vec![(STREAMFLOW.into(), values)],
        )
        .unwrap()
    }

    #[test]
    fn averages_figures() {
        let daily = labels("day", &["01/01", "01/02"], vec![Some(1.0), None]);
        let fig = daily_averages_plot(&daily, STREAMFLOW, &PlotOptions::default()).unwrap();
        assert_eq!(fig.data[0].name, "Average Daily Flow");
        assert_eq!(fig.data[0].y, vec![Some(1.0), None]);
        assert_eq!(fig.layout.xaxis.tickformat.as_deref(), Some("%b"));

        let monthly = labels("month", &["01", "12"], vec![Some(1.0), Some(2.0)]);
        let data = MonthlyAveragesPlotData::new(&monthly, STREAMFLOW, &PlotOptions::default()).unwrap();
        assert_eq!(data.x_month, vec!["January", "December"]);
        let bad = labels("month", &["13"], vec![Some(1.0)]);
        assert!(MonthlyAveragesPlotData::new(&bad, STREAMFLOW, &PlotOptions::default()).is_err());

        let empty = labels("day", &[], Vec::new());
        assert!(matches!(
            daily_averages_plot(&empty, STREAMFLOW, &PlotOptions::default()),
            Err(Error::EmptyTable)
        ));
    }

    #[test]
    fn annual_averages_with_decades() {
        let annual = labels(
            "year",
            &["1988", "1989", "1990", "1991"],
            vec![Some(2.0), Some(4.0), Some(6.0), None],
        );
        let data = AnnualAveragesPlotData::new(&annual, STREAMFLOW, true, &PlotOptions::default()).unwrap();
        assert_eq!(
            data.decades,
            vec![
                DecadeAverage {
                    decade: 1980,
                    first_year: "1988".into(),
                    last_year: "1989".into(),
                    mean: 3.0,
                },
                DecadeAverage {
                    decade: 1990,
                    first_year: "1990".into(),
                    last_year: "1991".into(),
                    mean: 6.0,
                },
            ]
        );
        let fig = data.figure();
        assert_eq!(fig.data.len(), 3);
        assert_eq!(fig.data[1].name, "1980s: 3.00 m<sup>3</sup>/s");
        assert_eq!(fig.data[2].legendgroup.as_deref(), Some("decade_averages"));

        let plain = annual_averages_plot(&annual, STREAMFLOW, false, &PlotOptions::default()).unwrap();
        assert_eq!(plain.data.len(), 1);
        assert_eq!(plain.layout.title.text, "Annual Average Streamflow (Simulated)");
    }

    #[test]
    fn daily_stats_and_variance_figures() {
        let fig = daily_stats_plot(&records(), &PlotOptions::default()).unwrap();
        let names: Vec<&str> = fig.data.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "streamflow_m^3/s_avg",
                "streamflow_m^3/s_min",
                "streamflow_m^3/s_25%",
                "streamflow_m^3/s_med",
                "streamflow_m^3/s_75%",
                "streamflow_m^3/s_max"
            ]
        );
        assert_eq!(fig.data[0].x, Values::Label(vec!["06/01".into(), "06/05".into(), "06/09".into()]));

        let variance = labels("day", &["06/01"], vec![None]);
        let fig = daily_variance_plot(&variance, STREAMFLOW, &PlotOptions::default()).unwrap();
        assert_eq!(fig.data[0].name, "Daily Standard Deviation");
        assert_eq!(fig.layout.title.text, "Daily Flow Standard Deviation");
    }

    #[test]
    fn flow_duration_curve() {
        let data = FlowDurationPlotData::new(&records(), &PlotOptions::default()).unwrap();
        assert_eq!(data.y_flow, vec![8.0, 7.0, 4.0]);
        assert_eq!(data.y_max, 8.0);
        assert_eq!(data.x_probability, vec![0.0, 0.25, 0.5]);
    }

    #[test]
    fn hydroviewer_trims_old_records() {
        let data = HydroviewerPlotData::new(
            &records(),
            &stats(),
            &ensembles(),
            Some(&rperiods()),
            DEFAULT_RECORD_DAYS,
            &PlotOptions::default(),
        )
        .unwrap();
        assert_eq!(data.records.x_records, vec![at(5, 0), at(9, 0)]);
        assert_eq!(data.start, at(5, 0));
        assert_eq!(data.end, at(11, 0));
        assert_eq!(data.y_max, 22.0);

        let fig = data.figure().unwrap();
        assert_eq!(fig.data[0].name, "1st day forecasts");
        let members: Vec<&Scatter> = fig
            .data
            .iter()
            .filter(|s| s.legendgroup.as_deref() == Some("ensembles"))
            .collect();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name, "Forecast Ensembles");
        assert_eq!(members[0].showlegend, None);
        assert_eq!(members[1].showlegend, Some(false));
        assert_eq!(fig.data.len(), 1 + 8 + 2 + 7);
    }

    #[test]
    fn empty_tables_are_rejected() {
        let empty = TimeTable::from_csv("datetime,streamflow_m^3/s\n", "datetime").unwrap();
        assert!(matches!(
            historical_plot(&empty, None, &PlotOptions::default()),
            Err(Error::EmptyTable)
        ));
        assert!(matches!(
            flow_duration_curve_plot(&empty, &PlotOptions::default()),
            Err(Error::EmptyTable)
        ));
    }
}
