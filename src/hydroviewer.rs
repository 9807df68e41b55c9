//! Everything the dashboard view of one river needs, fetched in parallel.

use crossbeam_channel as channel;
use log::{debug, warn};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::figure::Figure;
use crate::plots::{HydroviewerPlotData, PlotOptions};
use crate::reach::ReachId;
use crate::request::Forcing;
use crate::rperiods::ReturnPeriods;
use crate::table::TimeTable;
use crate::tables::{probabilities_table, return_periods_table};

const POOL_SIZE: usize = 4;

/// Results of the four requests behind a hydroviewer.
#[derive(Debug, Clone, PartialEq)]
pub struct HydroviewerData {
    pub reach_id: ReachId,
    pub records: TimeTable,
    pub stats: TimeTable,
    pub ensembles: TimeTable,
    pub rperiods: ReturnPeriods,
}

enum Part {
    Records(TimeTable),
    Stats(TimeTable),
    Ensembles(TimeTable),
    ReturnPeriods(ReturnPeriods),
}

#[derive(Debug, Clone, Copy)]
enum Job {
    Records,
    Stats,
    Ensembles,
    ReturnPeriods,
}

impl Job {
    const ALL: [Job; 4] = [Job::Records, Job::Stats, Job::Ensembles, Job::ReturnPeriods];

    fn name(self) -> &'static str {
        match self {
            Job::Records => "forecast_records",
            Job::Stats => "forecast_stats",
            Job::Ensembles => "forecast_ensembles",
            Job::ReturnPeriods => "return_periods",
        }
    }

    fn run(self, client: &Client, reach_id: ReachId, forcing: Forcing) -> Result<Part> {
        match self {
            Job::Records => client.forecast_records(reach_id).map(Part::Records),
            Job::Stats => client.forecast_stats(reach_id).map(Part::Stats),
            Job::Ensembles => client.forecast_ensembles(reach_id).map(Part::Ensembles),
            Job::ReturnPeriods => client.return_periods(reach_id, forcing).map(Part::ReturnPeriods),
        }
    }
}

impl Client {
    /// Fetch records, stats, ensembles and return periods concurrently.
    ///
    /// Blocks until every request has finished. If any of them failed, the first
    /// failure to arrive is returned and the other results are discarded.
    pub fn hydroviewer(&self, reach_id: ReachId, forcing: Forcing) -> Result<HydroviewerData> {
        debug!("hydroviewer fan-out for river {reach_id}");
        let pool = threadpool::Builder::new()
            .num_threads(POOL_SIZE)
            .thread_name("geoglows-hydroviewer".to_string())
            .build();
        let (snd, rcv) = channel::bounded::<(Job, Result<Part>)>(Job::ALL.len());

        for job in Job::ALL {
            let client = self.clone();
            let snd = snd.clone();
            pool.execute(move || {
                // The receiver is held until every sender is gone.
                let _ = snd.send((job, job.run(&client, reach_id, forcing)));
            });
        }
        drop(snd);

        let results: Vec<_> = rcv.iter().collect();
        pool.join();
        if pool.panic_count() > 0 {
            return Err(Error::Worker(format!("{} request(s) panicked", pool.panic_count())));
        }

        let (mut records, mut stats, mut ensembles, mut rperiods) = (None, None, None, None);
        for (job, result) in results {
            let part = result.inspect_err(|e| warn!("{} failed for river {reach_id}: {e}", job.name()))?;
            match part {
                Part::Records(t) => records = Some(t),
                Part::Stats(t) => stats = Some(t),
                Part::Ensembles(t) => ensembles = Some(t),
                Part::ReturnPeriods(rp) => rperiods = Some(rp),
            }
        }

        let missing = |what: &str| Error::Worker(format!("no {what} result"));
        Ok(HydroviewerData {
            reach_id,
            records: records.ok_or_else(|| missing("forecast_records"))?,
            stats: stats.ok_or_else(|| missing("forecast_stats"))?,
            ensembles: ensembles.ok_or_else(|| missing("forecast_ensembles"))?,
            rperiods: rperiods.ok_or_else(|| missing("return_periods"))?,
        })
    }
}

impl HydroviewerData {
    fn options(&self) -> PlotOptions {
        PlotOptions::reach(self.reach_id)
    }

    pub fn plot_data(&self, record_days: i64) -> Result<HydroviewerPlotData> {
        HydroviewerPlotData::new(
            &self.records,
            &self.stats,
            &self.ensembles,
            Some(&self.rperiods),
            record_days,
            &self.options(),
        )
    }

    pub fn figure(&self, record_days: i64) -> Result<Figure> {
        self.plot_data(record_days)?.figure()
    }

    /// Stats, ensembles and records side by side on one time index.
    pub fn combined(&self) -> Result<TimeTable> {
        self.stats
            .join_outer(&self.ensembles)?
            .join_outer(&self.records)
    }

    pub fn probabilities_table(&self) -> Result<String> {
        probabilities_table(&self.stats, &self.ensembles, &self.rperiods)
    }

    pub fn return_periods_table(&self) -> String {
        return_periods_table(&self.rperiods)
    }
}
