use std::collections::BTreeMap;
use std::env;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use log::debug;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use url::Url;

use crate::config::{
    parse_timeout, MetadataConfig, API_KEY_ENV_KEY, ENDPOINT_ENV_KEY, TIMEOUT_ENV_KEY,
};
use crate::decode::{self, Payload};
use crate::error::{Error, Result};
use crate::reach::{MetadataTable, ReachId, ReachLocation};
use crate::request::{Forcing, Product, Request, ReturnFormat};
use crate::rperiods::ReturnPeriods;
use crate::sources::resolve_endpoint;
use crate::table::{DayTable, ReachTable, TimeTable};
use crate::url_builder::format_url;

/// Header the API gateway reads the subscription key from.
pub const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Named endpoint (`byu`, `geoglows`, `azure`, `ai4e`, `local`) or a URL.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Option<Duration>,
    pub verify_tls: bool,
    pub metadata: MetadataConfig,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: "byu".to_string(),
            api_key: None,
            timeout: None,
            verify_tls: true,
            metadata: MetadataConfig::default(),
        }
    }
}

impl ClientOptions {
    /// Defaults overridden by `GEOGLOWS_ENDPOINT`, `GEOGLOWS_API_KEY`,
    /// `GEOGLOWS_TIMEOUT_SECS` and the metadata table variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut opts = Self {
            metadata: MetadataConfig::from_lookup(&lookup),
            ..Self::default()
        };
        if let Some(endpoint) = lookup(ENDPOINT_ENV_KEY).filter(|s| !s.trim().is_empty()) {
            opts.endpoint = endpoint;
        }
        opts.api_key = lookup(API_KEY_ENV_KEY).filter(|s| !s.trim().is_empty());
        if let Some(timeout) = lookup(TIMEOUT_ENV_KEY).as_deref().and_then(parse_timeout) {
            opts.timeout = Some(timeout);
        }
        opts
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    opts: ClientOptions,
    base_url: String,
    http: HttpClient,
    metadata: Arc<Mutex<Option<Arc<MetadataTable>>>>,
}

impl Client {
    pub fn new(opts: ClientOptions) -> Result<Self> {
        let base_url = resolve_endpoint(&opts.endpoint)?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("geoglows-rs/0.1"));

        let mut builder = HttpClient::builder().default_headers(headers);
        if !opts.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(timeout) = opts.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            opts,
            base_url,
            http,
            metadata: Arc::new(Mutex::new(None)),
        })
    }

    /// Convenience constructor with the default endpoint and no API key.
    pub fn default_client() -> Result<Self> {
        Self::new(ClientOptions::default())
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientOptions::from_env())
    }

    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.opts
    }

    /// The URL a request would be sent to, for use in a browser or another client.
    pub fn url(&self, request: &Request) -> Result<Url> {
        let pairs = request.query_pairs(Utc::now())?;
        format_url(&self.base_url, request.product(), &pairs)
    }

    /// Send a request and return the payload in the request's format.
    pub fn fetch(&self, request: &Request) -> Result<Payload> {
        let url = self.url(request)?;
        let body = self.get_text(url.as_str(), true)?;
        Payload::decode(request.format(), body)
    }

    pub(crate) fn get_text(&self, url: &str, with_key: bool) -> Result<String> {
        debug!("GET {url}");
        let mut req = self.http.get(url);
        if with_key {
            if let Some(key) = &self.opts.api_key {
                let value = HeaderValue::from_str(key)
                    .map_err(|_| Error::InvalidRequest("api key is not a valid header value".into()))?;
                req = req.header(API_KEY_HEADER, value);
            }
        }

        let resp = req.send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Fetch any time-indexed product as a table.
    pub fn time_table(&self, request: &Request) -> Result<TimeTable> {
        let request = request.clone().return_format(ReturnFormat::Csv);
        self.fetch(&request)?
            .into_table(request.product().index_column())?
            .non_empty()
    }

    /// Summary statistics of the latest forecast (min, 25%, mean, 75%, max, high resolution).
    pub fn forecast_stats(&self, reach_id: ReachId) -> Result<TimeTable> {
        self.time_table(&Request::new(Product::ForecastStats).reach_id(reach_id))
    }

    /// Every ensemble member of the latest forecast, one column per member.
    pub fn forecast_ensembles(&self, reach_id: ReachId) -> Result<TimeTable> {
        self.time_table(&Request::new(Product::ForecastEnsembles).reach_id(reach_id))
    }

    /// First-day forecast flows saved since the start of the year.
    pub fn forecast_records(&self, reach_id: ReachId) -> Result<TimeTable> {
        self.time_table(&Request::new(Product::ForecastRecords).reach_id(reach_id))
    }

    pub fn historic_simulation(&self, reach_id: ReachId, forcing: Forcing) -> Result<TimeTable> {
        self.time_table(
            &Request::new(Product::HistoricSimulation)
                .reach_id(reach_id)
                .forcing(forcing),
        )
    }

    /// Average, max and min flow for each zero-based day of the year.
    pub fn seasonal_average(&self, reach_id: ReachId, forcing: Forcing) -> Result<DayTable> {
        let request = Request::new(Product::SeasonalAverage)
            .reach_id(reach_id)
            .forcing(forcing);
        self.fetch(&request)?
            .into_table(Product::SeasonalAverage.index_column())?
            .non_empty()
    }

    pub fn return_periods_table(&self, reach_id: ReachId, forcing: Forcing) -> Result<ReachTable> {
        let request = Request::new(Product::ReturnPeriods)
            .reach_id(reach_id)
            .forcing(forcing);
        self.fetch(&request)?
            .into_table(Product::ReturnPeriods.index_column())?
            .non_empty()
    }

    pub fn return_periods(&self, reach_id: ReachId, forcing: Forcing) -> Result<ReturnPeriods> {
        ReturnPeriods::from_table(&self.return_periods_table(reach_id, forcing)?)
    }

    /// Rivers in a region likely to reach a return period flow during the forecast.
    /// An empty table means no warnings.
    pub fn forecast_warnings(&self, region: &str) -> Result<ReachTable> {
        let request = Request::new(Product::ForecastWarnings).region(region);
        self.fetch(&request)?
            .into_table(Product::ForecastWarnings.index_column())
    }

    pub fn available_regions(&self) -> Result<Vec<String>> {
        let v = self.fetch(&Request::new(Product::AvailableRegions))?.into_json()?;
        decode::available_regions(&v)
    }

    /// Dates of stored forecasts for a region, oldest first.
    pub fn available_dates(&self, region: &str) -> Result<Vec<String>> {
        let v = self
            .fetch(&Request::new(Product::AvailableDates).region(region))?
            .into_json()?;
        decode::available_dates(&v)
    }

    /// Like [`Client::available_dates`], with the region derived from the id ranges.
    pub fn available_dates_for_reach(&self, reach_id: ReachId) -> Result<Vec<String>> {
        let v = self
            .fetch(&Request::new(Product::AvailableDates).reach_id(reach_id))?
            .into_json()?;
        decode::available_dates(&v)
    }

    /// Region to available forecast dates.
    pub fn available_data(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let v = self.fetch(&Request::new(Product::AvailableData))?.into_json()?;
        decode::available_data(&v)
    }

    /// Most recent forecast date for a region.
    pub fn latest_date(&self, region: &str) -> Result<String> {
        self.available_dates(region)?
            .into_iter()
            .max()
            .ok_or_else(|| Error::InvalidRequest(format!("no forecast dates for {region}")))
    }

    /// The river metadata table, loaded from cache or downloaded on first use.
    pub fn metadata(&self) -> Result<Arc<MetadataTable>> {
        let mut slot = self
            .metadata
            .lock()
            .map_err(|_| Error::Worker("metadata lock poisoned".into()))?;
        if let Some(table) = slot.as_ref() {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(MetadataTable::load(&self.opts.metadata, self)?);
        *slot = Some(Arc::clone(&table));
        Ok(table)
    }

    pub fn latlon_to_reach(&self, lat: f64, lon: f64) -> Result<ReachLocation> {
        self.metadata()?.latlon_to_reach(lat, lon)
    }

    /// A request for the river nearest to a point.
    pub fn request_at(&self, product: Product, lat: f64, lon: f64) -> Result<Request> {
        let found = self.latlon_to_reach(lat, lon)?;
        debug!(
            "({lat}, {lon}) resolved to reach {} at {:.4} degrees",
            found.reach_id, found.distance
        );
        Ok(Request::new(product).reach_id(found.reach_id))
    }

    pub fn forecast_stats_at(&self, lat: f64, lon: f64) -> Result<TimeTable> {
        self.time_table(&self.request_at(Product::ForecastStats, lat, lon)?)
    }

    pub fn forecast_ensembles_at(&self, lat: f64, lon: f64) -> Result<TimeTable> {
        self.time_table(&self.request_at(Product::ForecastEnsembles, lat, lon)?)
    }

    pub fn historic_simulation_at(&self, lat: f64, lon: f64, forcing: Forcing) -> Result<TimeTable> {
        self.time_table(&self.request_at(Product::HistoricSimulation, lat, lon)?.forcing(forcing))
    }
}
