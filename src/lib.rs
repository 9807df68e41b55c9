#![forbid(unsafe_code)]

//! Rust client for the GEOGloWS streamflow forecasting service.
//!
//! The service publishes forecasts and a historic simulation for every river in its
//! global hydrologic model. This crate wraps its REST products, finds the river
//! nearest to a latitude/longitude, computes a few statistics locally, and turns the
//! returned tables into plotly figures or HTML tables.
//!
//! **Quick start**
//! ```no_run
//! use geoglows::{Client, ClientOptions, Forcing};
//!
//! let client = Client::new(ClientOptions {
//!     endpoint: "byu".to_string(),
//!     ..ClientOptions::default()
//! })?;
//!
//! let stats = client.forecast_stats(3_004_334)?;
//! println!("{} forecast steps, peak {:?}", stats.len(), stats.max("flow_max_m^3/s"));
//!
//! let rperiods = client.return_periods(3_004_334, Forcing::Era5)?;
//! println!("2 year flow: {:?}", rperiods.get(2));
//! # Ok::<(), geoglows::Error>(())
//! ```
//!
//! **Requests, URLs and other formats**
//! ```no_run
//! use geoglows::{Client, Product, Request, ReturnFormat};
//!
//! let client = Client::default_client()?;
//! let req = Request::new(Product::HistoricSimulation)
//!     .reach_id(3_004_334)
//!     .return_format(ReturnFormat::WaterML);
//! println!("{}", client.url(&req)?);
//! let payload = client.fetch(&req)?;
//! println!("{} bytes", payload.as_text().map_or(0, str::len));
//! # Ok::<(), geoglows::Error>(())
//! ```
//!
//! **Dashboard view**
//! ```no_run
//! use geoglows::{plots, Client, Forcing};
//!
//! let client = Client::default_client()?;
//! let view = client.hydroviewer(3_004_334, Forcing::Era5)?;
//! let html = view.figure(plots::DEFAULT_RECORD_DAYS)?.to_html_div("hydroviewer")?;
//! println!("{html}\n{}", view.probabilities_table()?);
//! # Ok::<(), geoglows::Error>(())
//! ```
//!
//! Notes:
//! - Latitude/longitude lookups download the river metadata table once and cache it
//!   (see [`MetadataConfig`]).
//! - The crate logs through the `log` facade and never installs a logger.

pub mod analyze;
mod client;
mod config;
mod date;
mod decode;
mod error;
pub mod figure;
mod hydroviewer;
mod metadata;
pub mod plots;
mod reach;
mod request;
mod rperiods;
mod sources;
mod table;
pub mod tables;
mod url_builder;

pub use crate::client::{API_KEY_HEADER, Client, ClientOptions};
pub use crate::config::MetadataConfig;
pub use crate::date::{day_of_year_label, parse_forecast_date, parse_timestamp};
pub use crate::decode::Payload;
pub use crate::error::{Error, Result};
pub use crate::hydroviewer::HydroviewerData;
pub use crate::reach::{
    DEFAULT_MAX_DISTANCE, MetadataRow, MetadataTable, ReachId, ReachLocation, reach_to_region,
    regions,
};
pub use crate::request::{Forcing, Product, Request, ReturnFormat};
pub use crate::rperiods::ReturnPeriods;
pub use crate::sources::resolve_endpoint;
pub use crate::table::{DayTable, IndexKey, LabelTable, ReachTable, Table, TimeTable};
