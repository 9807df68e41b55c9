use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, Trim};
use log::warn;

use crate::date::parse_timestamp;
use crate::error::{Error, Result};

/// Key type of a table index column.
pub trait IndexKey: Clone + Ord + Debug {
    fn parse_key(s: &str) -> Result<Self>;
}

impl IndexKey for NaiveDateTime {
    fn parse_key(s: &str) -> Result<Self> {
        parse_timestamp(s)
    }
}

impl IndexKey for i64 {
    fn parse_key(s: &str) -> Result<Self> {
        let t = s.trim();
        if let Ok(v) = t.parse::<i64>() {
            return Ok(v);
        }
        // pandas writes integer ids as floats once a column held a NaN.
        match t.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 && v.is_finite() => Ok(v as i64),
            _ => Err(Error::InvalidRequest(format!("invalid integer index value: {t}"))),
        }
    }
}

impl IndexKey for u32 {
    fn parse_key(s: &str) -> Result<Self> {
        let v = i64::parse_key(s)?;
        u32::try_from(v).map_err(|_| Error::InvalidRequest(format!("invalid index value: {s}")))
    }
}

impl IndexKey for String {
    fn parse_key(s: &str) -> Result<Self> {
        Ok(s.trim().to_string())
    }
}

/// A table with one index column and named numeric columns.
///
/// Values are stored column-major; a missing or non-numeric cell is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<K> {
    index_name: String,
    index: Vec<K>,
    columns: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
}

/// Time-indexed table (forecasts, records, historic simulation).
pub type TimeTable = Table<NaiveDateTime>;
/// Table keyed by river id (return periods, warnings).
pub type ReachTable = Table<i64>;
/// Table keyed by zero-based day of year (seasonal average).
pub type DayTable = Table<u32>;
/// Table keyed by a text label (grouped averages).
pub type LabelTable = Table<String>;

fn parse_value(cell: &str) -> Option<f64> {
    let t = cell.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|v| !v.is_nan())
}

impl<K: IndexKey> Table<K> {
    pub fn new(
        index_name: impl Into<String>,
        index: Vec<K>,
        columns: Vec<(String, Vec<Option<f64>>)>,
    ) -> Result<Self> {
        let mut names = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());
        for (name, col) in columns {
            if col.len() != index.len() {
                return Err(Error::InvalidRequest(format!(
                    "column {name} has {} rows, index has {}",
                    col.len(),
                    index.len()
                )));
            }
            if names.contains(&name) {
                return Err(Error::InvalidRequest(format!("duplicate column: {name}")));
            }
            names.push(name);
            values.push(col);
        }
        Ok(Self {
            index_name: index_name.into(),
            index,
            columns: names,
            values,
        })
    }

    /// Decode a CSV body using `index_column` as the index.
    pub fn from_csv(text: &str, index_column: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let index_pos = headers
            .iter()
            .position(|h| h == index_column)
            .ok_or_else(|| Error::MissingColumn(index_column.to_string()))?;

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index_pos)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut index = Vec::new();
        let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); columns.len()];

        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let Some(key_cell) = record.get(index_pos) else {
                continue;
            };
            if key_cell.trim().is_empty() {
                warn!("skipping row {} with empty {index_column}", line + 1);
                continue;
            }
            index.push(K::parse_key(key_cell)?);

            let mut c = 0;
            for (i, cell) in record.iter().enumerate() {
                if i == index_pos {
                    continue;
                }
                values[c].push(parse_value(cell));
                c += 1;
            }
        }

        Ok(Self {
            index_name: index_column.to_string(),
            index,
            columns,
            values,
        })
    }

    /// Return `Err(EmptyTable)` when there are no rows.
    pub fn non_empty(self) -> Result<Self> {
        if self.index.is_empty() {
            Err(Error::EmptyTable)
        } else {
            Ok(self)
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn index(&self) -> &[K] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        let pos = self.columns.iter().position(|c| c == name)?;
        Some(&self.values[pos])
    }

    pub fn require(&self, name: &str) -> Result<&[Option<f64>]> {
        self.column(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    /// Column values paired with their keys, missing values dropped.
    pub fn series(&self, name: &str) -> Result<(Vec<K>, Vec<f64>)> {
        let col = self.require(name)?;
        let mut keys = Vec::new();
        let mut vals = Vec::new();
        for (k, v) in self.index.iter().zip(col) {
            if let Some(v) = v {
                keys.push(k.clone());
                vals.push(*v);
            }
        }
        Ok((keys, vals))
    }

    pub fn max(&self, name: &str) -> Option<f64> {
        self.column(name)?
            .iter()
            .flatten()
            .copied()
            .reduce(f64::max)
    }

    pub fn min(&self, name: &str) -> Option<f64> {
        self.column(name)?
            .iter()
            .flatten()
            .copied()
            .reduce(f64::min)
    }

    pub fn value(&self, name: &str, row: usize) -> Option<f64> {
        self.column(name)?.get(row).copied().flatten()
    }

    pub fn first_key(&self) -> Option<&K> {
        self.index.first()
    }

    pub fn last_key(&self) -> Option<&K> {
        self.index.last()
    }

    /// Keep the rows whose key satisfies `keep`.
    pub fn filter_index(&self, mut keep: impl FnMut(&K) -> bool) -> Self {
        let rows: Vec<usize> = (0..self.index.len())
            .filter(|&r| keep(&self.index[r]))
            .collect();
        self.take_rows(&rows)
    }

    /// Rows with `start <= key <= end`.
    pub fn between(&self, start: &K, end: &K) -> Self {
        self.filter_index(|k| k >= start && k <= end)
    }

    pub fn sort_index(&mut self) {
        let mut order: Vec<usize> = (0..self.index.len()).collect();
        order.sort_by(|&a, &b| self.index[a].cmp(&self.index[b]));
        *self = self.take_rows(&order);
    }

    /// Keep only the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        let mut cols = Vec::with_capacity(names.len());
        for name in names {
            cols.push((name.to_string(), self.require(name)?.to_vec()));
        }
        Self::new(self.index_name.clone(), self.index.clone(), cols)
    }

    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<()> {
        let name = name.into();
        if values.len() != self.index.len() {
            return Err(Error::InvalidRequest(format!(
                "column {name} has {} rows, index has {}",
                values.len(),
                self.index.len()
            )));
        }
        if self.has_column(&name) {
            return Err(Error::InvalidRequest(format!("duplicate column: {name}")));
        }
        self.columns.push(name);
        self.values.push(values);
        Ok(())
    }

    /// Iterate rows as `(key, values)` in column order.
    pub fn rows(&self) -> impl Iterator<Item = (&K, Vec<Option<f64>>)> + '_ {
        self.index
            .iter()
            .enumerate()
            .map(|(r, k)| (k, self.values.iter().map(|col| col[r]).collect()))
    }

    /// Combine two tables on their shared index, keeping every key of either side.
    pub fn join_outer(&self, other: &Self) -> Result<Self> {
        let keys: BTreeSet<K> = self.index.iter().chain(other.index.iter()).cloned().collect();
        self.join_on(other, keys.into_iter().collect())
    }

    /// Combine two tables on their shared index, keeping only keys present in both.
    pub fn join_inner(&self, other: &Self) -> Result<Self> {
        let theirs: BTreeSet<&K> = other.index.iter().collect();
        let keys: BTreeSet<K> = self
            .index
            .iter()
            .filter(|k| theirs.contains(k))
            .cloned()
            .collect();
        self.join_on(other, keys.into_iter().collect())
    }

    fn join_on(&self, other: &Self, keys: Vec<K>) -> Result<Self> {
        let left = self.row_lookup();
        let right = other.row_lookup();

        let mut cols = Vec::with_capacity(self.columns.len() + other.columns.len());
        for (name, col) in self.columns.iter().zip(&self.values) {
            let v = keys
                .iter()
                .map(|k| left.get(k).and_then(|&r| col[r]))
                .collect();
            cols.push((name.clone(), v));
        }
        for (name, col) in other.columns.iter().zip(&other.values) {
            let v = keys
                .iter()
                .map(|k| right.get(k).and_then(|&r| col[r]))
                .collect();
            cols.push((name.clone(), v));
        }

        Self::new(self.index_name.clone(), keys, cols)
    }

    fn row_lookup(&self) -> BTreeMap<&K, usize> {
        let mut map = BTreeMap::new();
        for (r, k) in self.index.iter().enumerate() {
            map.entry(k).or_insert(r);
        }
        map
    }

    fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            index_name: self.index_name.clone(),
            index: rows.iter().map(|&r| self.index[r].clone()).collect(),
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|col| rows.iter().map(|&r| col[r]).collect())
                .collect(),
        }
    }
}
