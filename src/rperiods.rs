use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::reach::ReachId;
use crate::table::ReachTable;

const RP_PREFIX: &str = "return_period_";

/// Flow thresholds for one river keyed by recurrence interval in years.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReturnPeriods {
    pub reach_id: Option<ReachId>,
    /// Largest flow in the simulation the thresholds were fitted on.
    pub max_flow: Option<f64>,
    pub thresholds: BTreeMap<u32, f64>,
}

impl ReturnPeriods {
    /// Read the first row of a `ReturnPeriods` table (`max_flow`, `return_period_{n}` columns).
    pub fn from_table(table: &ReachTable) -> Result<Self> {
        let reach_id = *table.first_key().ok_or(Error::EmptyTable)?;

        let mut out = ReturnPeriods {
            reach_id: Some(reach_id),
            ..Self::default()
        };
        for name in table.columns() {
            let value = table.value(name, 0);
            if let Some(years) = name.strip_prefix(RP_PREFIX) {
                let years: u32 = years
                    .parse()
                    .map_err(|_| Error::InvalidRequest(format!("bad return period column: {name}")))?;
                if let Some(v) = value {
                    out.thresholds.insert(years, v);
                }
            } else if name == "max_flow" || name == "max_simulated" {
                out.max_flow = value;
            }
        }

        if out.thresholds.is_empty() {
            return Err(Error::MissingColumn(format!("{RP_PREFIX}*")));
        }
        Ok(out)
    }

    pub fn get(&self, years: u32) -> Option<f64> {
        self.thresholds.get(&years).copied()
    }

    pub fn require(&self, years: u32) -> Result<f64> {
        self.get(years)
            .ok_or_else(|| Error::MissingColumn(format!("{RP_PREFIX}{years}")))
    }

    /// `(years, flow)` pairs, shortest interval first.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.thresholds.iter().map(|(y, v)| (*y, *v))
    }

    /// ERA-Interim era tables carry only the 2, 10 and 20 year thresholds.
    pub fn is_legacy(&self) -> bool {
        self.thresholds.keys().copied().eq([2, 10, 20])
    }
}
