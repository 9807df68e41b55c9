use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::date::parse_forecast_date;
use crate::error::{Error, Result};
use crate::reach::{reach_to_region, ReachId};

/// A product served by the streamflow REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    ForecastStats,
    ForecastEnsembles,
    ForecastWarnings,
    ForecastRecords,
    HistoricSimulation,
    SeasonalAverage,
    ReturnPeriods,
    AvailableData,
    AvailableRegions,
    AvailableDates,
}

impl Product {
    pub const ALL: [Product; 10] = [
        Product::ForecastStats,
        Product::ForecastEnsembles,
        Product::ForecastWarnings,
        Product::ForecastRecords,
        Product::HistoricSimulation,
        Product::SeasonalAverage,
        Product::ReturnPeriods,
        Product::AvailableData,
        Product::AvailableRegions,
        Product::AvailableDates,
    ];

    /// Method path appended to the endpoint.
    pub fn method(self) -> &'static str {
        match self {
            Product::ForecastStats => "ForecastStats/",
            Product::ForecastEnsembles => "ForecastEnsembles/",
            Product::ForecastWarnings => "ForecastWarnings/",
            Product::ForecastRecords => "ForecastRecords/",
            Product::HistoricSimulation => "HistoricSimulation/",
            Product::SeasonalAverage => "SeasonalAverage/",
            Product::ReturnPeriods => "ReturnPeriods/",
            Product::AvailableData => "AvailableData/",
            Product::AvailableRegions => "AvailableRegions/",
            Product::AvailableDates => "AvailableDates/",
        }
    }

    pub fn requires_reach(self) -> bool {
        matches!(
            self,
            Product::ForecastStats
                | Product::ForecastEnsembles
                | Product::ForecastRecords
                | Product::HistoricSimulation
                | Product::SeasonalAverage
                | Product::ReturnPeriods
        )
    }

    pub fn uses_forcing(self) -> bool {
        matches!(
            self,
            Product::HistoricSimulation | Product::SeasonalAverage | Product::ReturnPeriods
        )
    }

    /// Availability products only speak JSON.
    pub fn default_format(self) -> ReturnFormat {
        match self {
            Product::AvailableData | Product::AvailableRegions | Product::AvailableDates => {
                ReturnFormat::Json
            }
            _ => ReturnFormat::Csv,
        }
    }

    /// Name of the index column of the CSV response.
    pub fn index_column(self) -> &'static str {
        match self {
            Product::ForecastWarnings => "comid",
            Product::ReturnPeriods => "rivid",
            Product::SeasonalAverage => "day_of_year",
            _ => "datetime",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method().trim_end_matches('/'))
    }
}

impl FromStr for Product {
    type Err = Error;

    /// Method name without the trailing slash, in any case (`ForecastStats`, `forecaststats`).
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().trim_end_matches('/');
        Product::ALL
            .into_iter()
            .find(|p| p.to_string().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidRequest(format!("unknown product: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnFormat {
    #[default]
    Csv,
    Json,
    WaterML,
}

impl ReturnFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ReturnFormat::Csv => "csv",
            ReturnFormat::Json => "json",
            ReturnFormat::WaterML => "waterml",
        }
    }
}

impl FromStr for ReturnFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ReturnFormat::Csv),
            "json" => Ok(ReturnFormat::Json),
            "waterml" => Ok(ReturnFormat::WaterML),
            other => Err(Error::InvalidRequest(format!(
                "unsupported return format requested: {other}"
            ))),
        }
    }
}

/// Runoff dataset driving the historic simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Forcing {
    #[default]
    Era5,
    EraInterim,
}

impl Forcing {
    pub fn as_str(self) -> &'static str {
        match self {
            Forcing::Era5 => "era_5",
            Forcing::EraInterim => "era_interim",
        }
    }
}

impl FromStr for Forcing {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "era_5" | "era5" => Ok(Forcing::Era5),
            "era_interim" | "erainterim" => Ok(Forcing::EraInterim),
            other => Err(Error::InvalidRequest(format!("unknown forcing: {other}"))),
        }
    }
}

/// A single REST request expressed as product plus keyword arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    product: Product,
    reach_id: Option<ReachId>,
    region: Option<String>,
    forcing: Option<Forcing>,
    date: Option<String>,
    format: ReturnFormat,
    extra: BTreeMap<String, String>,
}

impl Request {
    pub fn new(product: Product) -> Self {
        Self {
            product,
            reach_id: None,
            region: None,
            forcing: None,
            date: None,
            format: product.default_format(),
            extra: BTreeMap::new(),
        }
    }

    pub fn reach_id(mut self, reach_id: ReachId) -> Self {
        self.reach_id = Some(reach_id);
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn forcing(mut self, forcing: Forcing) -> Self {
        self.forcing = Some(forcing);
        self
    }

    /// Forecast date as `YYYYMMDD`, `YYYYMMDDHH`, `YYYY-MM-DD` or a day offset <= 0.
    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn return_format(mut self, format: ReturnFormat) -> Self {
        self.format = format;
        self
    }

    /// Any additional query keyword the endpoint understands.
    pub fn kw(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.extra.insert(key.into(), value.to_string());
        self
    }

    pub fn product(&self) -> Product {
        self.product
    }

    pub fn format(&self) -> ReturnFormat {
        self.format
    }

    pub fn get_reach_id(&self) -> Option<ReachId> {
        self.reach_id
    }

    /// Validate the request and produce its query pairs in a stable order.
    pub fn query_pairs(&self, now: DateTime<Utc>) -> Result<Vec<(String, String)>> {
        let mut out: Vec<(String, String)> = Vec::new();
        let product = self.product;

        if product.requires_reach() {
            let reach = self.reach_id.ok_or_else(|| {
                Error::InvalidRequest(format!("{product} requires a reach_id"))
            })?;
            if reach <= 0 {
                return Err(Error::InvalidRequest(format!("invalid reach_id: {reach}")));
            }
            out.push(("reach_id".into(), reach.to_string()));
        }

        match product {
            Product::ForecastWarnings => {
                let region = self.region.as_deref().filter(|r| !r.is_empty()).ok_or_else(|| {
                    Error::InvalidRequest("ForecastWarnings requires a region".into())
                })?;
                out.push(("region".into(), region.to_string()));
            }
            Product::AvailableDates => {
                let region = match (&self.region, self.reach_id) {
                    (Some(r), _) if !r.is_empty() => r.clone(),
                    (_, Some(reach)) => reach_to_region(reach)?.to_string(),
                    _ => {
                        return Err(Error::InvalidRequest(
                            "specify a region or a reach_id".into(),
                        ));
                    }
                };
                out.push(("region".into(), region));
            }
            _ => {}
        }

        if product.uses_forcing() {
            let forcing = self.forcing.unwrap_or_default();
            out.push(("forcing".into(), forcing.as_str().to_string()));
        }

        if let Some(date) = &self.date {
            out.push(("date".into(), parse_forecast_date(date, now)?));
        }

        if product.default_format() == ReturnFormat::Json && self.format != ReturnFormat::Json {
            return Err(Error::InvalidRequest(format!(
                "{product} is only available as json"
            )));
        }
        if product.requires_reach() || product == Product::ForecastWarnings {
            out.push(("return_format".into(), self.format.as_str().to_string()));
        }

        for (k, v) in &self.extra {
            if out.iter().any(|(existing, _)| existing == k) {
                continue;
            }
            out.push((k.clone(), v.clone()));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 1, 31, 12, 0, 0).unwrap()
    }

    fn keys(pairs: &[(String, String)]) -> Vec<&str> {
        pairs.iter().map(|(k, _)| k.as_str()).collect()
    }

    #[test]
    fn product_names_parse() {
        assert_eq!("ForecastStats".parse::<Product>().unwrap(), Product::ForecastStats);
        assert_eq!("returnperiods/".parse::<Product>().unwrap(), Product::ReturnPeriods);
        assert!("Forecast".parse::<Product>().is_err());
    }

    #[test]
    fn forecast_stats_pairs() {
        let pairs = Request::new(Product::ForecastStats)
            .reach_id(3_004_334)
            .query_pairs(now())
            .unwrap();
        assert_eq!(keys(&pairs), vec!["reach_id", "return_format"]);
        assert_eq!(pairs[1].1, "csv");
    }

    #[test]
    fn historic_products_carry_forcing() {
        let pairs = Request::new(Product::ReturnPeriods)
            .reach_id(3_004_334)
            .forcing(Forcing::EraInterim)
            .return_format(ReturnFormat::Json)
            .query_pairs(now())
            .unwrap();
        assert_eq!(keys(&pairs), vec!["reach_id", "forcing", "return_format"]);
        assert_eq!(pairs[1].1, "era_interim");
        assert_eq!(pairs[2].1, "json");

        let default_forcing = Request::new(Product::SeasonalAverage)
            .reach_id(3_004_334)
            .query_pairs(now())
            .unwrap();
        assert_eq!(default_forcing[1], ("forcing".to_string(), "era_5".to_string()));
    }

    #[test]
    fn missing_reach_is_rejected() {
        let err = Request::new(Product::ForecastEnsembles).query_pairs(now());
        assert!(matches!(err, Err(Error::InvalidRequest(_))));
        let err = Request::new(Product::ForecastEnsembles).reach_id(0).query_pairs(now());
        assert!(matches!(err, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn available_dates_derives_region_from_reach() {
        let pairs = Request::new(Product::AvailableDates)
            .reach_id(3_004_334)
            .query_pairs(now())
            .unwrap();
        assert_eq!(pairs, vec![("region".to_string(), "japan-geoglows".to_string())]);

        let pairs = Request::new(Product::AvailableDates)
            .region("europe-geoglows")
            .reach_id(3_004_334)
            .query_pairs(now())
            .unwrap();
        assert_eq!(pairs[0].1, "europe-geoglows");

        assert!(Request::new(Product::AvailableDates).query_pairs(now()).is_err());
    }

    #[test]
    fn availability_is_json_only() {
        let err = Request::new(Product::AvailableRegions)
            .return_format(ReturnFormat::Csv)
            .query_pairs(now());
        assert!(err.is_err());
        assert!(Request::new(Product::AvailableRegions)
            .query_pairs(now())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn dates_and_extra_keywords() {
        let pairs = Request::new(Product::ForecastStats)
            .reach_id(9_007_292)
            .date("-1")
            .kw("source", "rust")
            .kw("reach_id", 1)
            .query_pairs(now())
            .unwrap();
        assert_eq!(keys(&pairs), vec!["reach_id", "date", "return_format", "source"]);
        assert_eq!(pairs[0].1, "9007292");
        assert_eq!(pairs[1].1, "20220130");
    }

    #[test]
    fn format_parsing() {
        assert_eq!("WaterML".parse::<ReturnFormat>().unwrap(), ReturnFormat::WaterML);
        assert!("xml".parse::<ReturnFormat>().is_err());
        assert_eq!("era5".parse::<Forcing>().unwrap(), Forcing::Era5);
    }
}
