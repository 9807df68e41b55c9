use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::request::ReturnFormat;
use crate::table::{IndexKey, Table};

/// Raw response of a request, shaped by the requested [`ReturnFormat`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Csv(String),
    Json(Value),
    WaterML(String),
}

impl Payload {
    pub fn decode(format: ReturnFormat, body: String) -> Result<Self> {
        Ok(match format {
            ReturnFormat::Csv => Payload::Csv(body),
            ReturnFormat::Json => Payload::Json(serde_json::from_str(&body)?),
            ReturnFormat::WaterML => Payload::WaterML(body),
        })
    }

    pub fn format(&self) -> ReturnFormat {
        match self {
            Payload::Csv(_) => ReturnFormat::Csv,
            Payload::Json(_) => ReturnFormat::Json,
            Payload::WaterML(_) => ReturnFormat::WaterML,
        }
    }

    /// Decode a CSV payload into a table indexed by `index_column`.
    pub fn into_table<K: IndexKey>(self, index_column: &str) -> Result<Table<K>> {
        match self {
            Payload::Csv(text) => Table::from_csv(&text, index_column),
            other => Err(Error::InvalidRequest(format!(
                "expected a csv payload, got {}",
                other.format().as_str()
            ))),
        }
    }

    pub fn into_json(self) -> Result<Value> {
        match self {
            Payload::Json(v) => Ok(v),
            other => Err(Error::InvalidRequest(format!(
                "expected a json payload, got {}",
                other.format().as_str()
            ))),
        }
    }

    /// Body text of CSV and WaterML payloads.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Csv(s) | Payload::WaterML(s) => Some(s),
            Payload::Json(_) => None,
        }
    }
}

fn string_list(v: &Value, what: &str) -> Result<Vec<String>> {
    let items = v
        .as_array()
        .ok_or_else(|| Error::InvalidRequest(format!("{what} is not a list")))?;
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(Error::InvalidRequest(format!("unexpected {what} entry: {other}"))),
        })
        .collect()
}

/// `{"<key>": [..]}` or a bare list.
fn keyed_list(v: &Value, key: &str) -> Result<Vec<String>> {
    match v.get(key) {
        Some(list) => string_list(list, key),
        None if v.is_array() => string_list(v, key),
        None => Err(Error::InvalidRequest(format!("response has no {key}"))),
    }
}

pub fn available_regions(v: &Value) -> Result<Vec<String>> {
    keyed_list(v, "available_regions")
}

pub fn available_dates(v: &Value) -> Result<Vec<String>> {
    keyed_list(v, "available_dates")
}

/// Region to dates map, optionally wrapped in `{"available_data": {..}}`.
pub fn available_data(v: &Value) -> Result<BTreeMap<String, Vec<String>>> {
    let obj = v
        .get("available_data")
        .unwrap_or(v)
        .as_object()
        .ok_or_else(|| Error::InvalidRequest("available data is not an object".into()))?;

    let mut out = BTreeMap::new();
    for (region, dates) in obj {
        let dates = match dates.get("available_dates") {
            Some(inner) => string_list(inner, "available_dates")?,
            None => string_list(dates, "available_dates")?,
        };
        out.insert(region.clone(), dates);
    }
    Ok(out)
}
