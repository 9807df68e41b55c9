//! A throwaway axum server serving fixed bodies, for contract tests without network.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use tokio::sync::oneshot;

use geoglows::{Client, ClientOptions};

#[derive(Debug, Clone)]
pub struct Recorded {
    /// Path plus query, e.g. `/api/ForecastStats/?reach_id=1&return_format=csv`.
    pub target: String,
    /// Header names lower-cased.
    pub headers: HashMap<String, String>,
}

impl Recorded {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }
}

struct Fixtures {
    routes: HashMap<String, (StatusCode, String)>,
    requests: Mutex<Vec<Recorded>>,
}

async fn serve(State(fixtures): State<Arc<Fixtures>>, uri: Uri, headers: HeaderMap) -> (StatusCode, String) {
    let recorded = Recorded {
        target: uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        headers: headers
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect(),
    };
    let reply = fixtures
        .routes
        .get(recorded.path())
        .cloned()
        .unwrap_or((StatusCode::NOT_FOUND, "not found".to_string()));
    fixtures.requests.lock().unwrap().push(recorded);
    reply
}

/// A test server on its own runtime thread that shuts down when dropped.
///
/// The client under test is blocking, so the server cannot share its thread.
pub struct TestServer {
    pub addr: SocketAddr,
    fixtures: Arc<Fixtures>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Serve `(path, status, body)` routes; anything else is a 404.
    pub fn start(routes: &[(&str, u16, &str)]) -> Self {
        let fixtures = Arc::new(Fixtures {
            routes: routes
                .iter()
                .map(|(p, s, b)| {
                    (p.to_string(), (StatusCode::from_u16(*s).unwrap(), b.to_string()))
                })
                .collect(),
            requests: Mutex::new(Vec::new()),
        });
        let router = Router::new().fallback(serve).with_state(Arc::clone(&fixtures));

        // Bound before the thread starts so the port is known and accepting.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, router)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .ok();
            });
        });

        Self {
            addr,
            fixtures,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api/", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn options(&self) -> ClientOptions {
        ClientOptions {
            endpoint: self.base_url(),
            ..ClientOptions::default()
        }
    }

    pub fn client(&self) -> Client {
        Client::new(self.options()).unwrap()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.fixtures.requests.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub const STATS_CSV: &str = "\
datetime,flow_25%_m^3/s,flow_75%_m^3/s,flow_avg_m^3/s,flow_max_m^3/s,flow_min_m^3/s,high_res_m^3/s
2020-06-10 00:00:00,,,,,,9.5
2020-06-10 03:00:00,8,12,10,20,5,11
2020-06-10 06:00:00,9,14,11,22,6,
2020-06-11 00:00:00,9,15,12,25,6,
";

pub const ENSEMBLES_CSV: &str = "\
datetime,ensemble_01_m^3/s,ensemble_02_m^3/s,ensemble_52_m^3/s
2020-06-10 00:00:00,,,9.5
2020-06-10 03:00:00,10,12,11
2020-06-10 06:00:00,11,13,
2020-06-11 00:00:00,12,30,
";

pub const RECORDS_CSV: &str = "\
datetime,streamflow_m^3/s
2020-06-01 00:00:00,4
2020-06-08 00:00:00,7
2020-06-09 00:00:00,8
";

pub const RPERIODS_CSV: &str = "\
rivid,max_flow,return_period_100,return_period_50,return_period_25,return_period_10,return_period_5,return_period_2
3004334,40.5,27,24,21,18,15,10.5
";

pub const SEASONAL_CSV: &str = "\
day_of_year,streamflow_m^3/s,max_flow,min_flow
0,1.5,3,0.5
1,1.6,3.1,0.6
";

pub const HISTORIC_CSV: &str = "\
datetime,streamflow_m^3/s
1979-01-01 00:00:00,3.5
1979-01-02 00:00:00,4
1979-01-03 00:00:00,
";

pub const WARNINGS_CSV: &str = "\
comid,stream_order,lat,lon,peak_date,max_2,max_5
3004334,3,38.84,-90.11,2020-06-12,1,0
3004335,4,38.90,-90.20,2020-06-13,1,1
";

pub const WATERML: &str = "<?xml version=\"1.0\"?>\n<timeSeriesResponse><timeSeries/></timeSeriesResponse>\n";

pub const METADATA_CSV: &str = "\
LINKNO,lat,lon,VPUCode
3004334,38.84,-90.11,japan-geoglows
3004335,38.90,-90.20,japan-geoglows
";

/// Routes for every forecast product of reach 3004334.
pub fn forecast_routes() -> Vec<(&'static str, u16, &'static str)> {
    vec![
        ("/api/ForecastStats/", 200, STATS_CSV),
        ("/api/ForecastEnsembles/", 200, ENSEMBLES_CSV),
        ("/api/ForecastRecords/", 200, RECORDS_CSV),
        ("/api/ReturnPeriods/", 200, RPERIODS_CSV),
        ("/api/SeasonalAverage/", 200, SEASONAL_CSV),
    ]
}
