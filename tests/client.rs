mod common;

use common::{
    TestServer, forecast_routes, HISTORIC_CSV, METADATA_CSV, RECORDS_CSV, RPERIODS_CSV, STATS_CSV,
    WARNINGS_CSV, WATERML,
};
use geoglows::{
    API_KEY_HEADER, Client, ClientOptions, Error, Forcing, MetadataConfig, Payload, Product, Request,
    ReturnFormat,
};

const REACH: i64 = 3_004_334;

#[test]
fn forecast_stats_over_http() {
    let server = TestServer::start(&[("/api/ForecastStats/", 200, STATS_CSV)]);
    let stats = server.client().forecast_stats(REACH).unwrap();

    assert_eq!(stats.len(), 4);
    assert_eq!(stats.max("flow_max_m^3/s"), Some(25.0));
    assert_eq!(stats.value("high_res_m^3/s", 0), Some(9.5));
    assert_eq!(stats.value("flow_avg_m^3/s", 0), None);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].target,
        "/api/ForecastStats/?reach_id=3004334&return_format=csv"
    );
    assert!(!requests[0].headers.contains_key(&API_KEY_HEADER.to_ascii_lowercase()));
}

#[test]
fn api_key_is_sent_as_header() {
    let server = TestServer::start(&[("/api/ForecastStats/", 200, STATS_CSV)]);
    let client = Client::new(ClientOptions {
        api_key: Some("abc123".into()),
        ..server.options()
    })
    .unwrap();
    client.forecast_stats(REACH).unwrap();

    let requests = server.requests();
    assert_eq!(
        requests[0].headers.get(&API_KEY_HEADER.to_ascii_lowercase()).map(String::as_str),
        Some("abc123")
    );
}

#[test]
fn service_errors_keep_status_and_body() {
    let server = TestServer::start(&[("/api/ForecastStats/", 500, "model run in progress")]);
    match server.client().forecast_stats(REACH) {
        Err(Error::Api { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "model run in progress");
        }
        other => panic!("expected an api error, got {other:?}"),
    }
}

#[test]
fn header_only_csv_is_empty() {
    let server = TestServer::start(&[(
        "/api/ForecastStats/",
        200,
        "datetime,flow_avg_m^3/s\n",
    )]);
    assert!(matches!(
        server.client().forecast_stats(REACH),
        Err(Error::EmptyTable)
    ));
}

#[test]
fn return_periods_and_seasonal_average() {
    let server = TestServer::start(&forecast_routes());
    let client = server.client();

    let rp = client.return_periods(REACH, Forcing::EraInterim).unwrap();
    assert_eq!(rp.reach_id, Some(REACH));
    assert_eq!(rp.max_flow, Some(40.5));
    assert_eq!(rp.get(2), Some(10.5));
    assert_eq!(rp.get(100), Some(27.0));

    let seasonal = client.seasonal_average(REACH, Forcing::Era5).unwrap();
    assert_eq!(seasonal.index(), &[0, 1]);
    assert_eq!(seasonal.value("max_flow", 1), Some(3.1));

    let targets: Vec<String> = server.requests().into_iter().map(|r| r.target).collect();
    assert!(targets.contains(
        &"/api/ReturnPeriods/?reach_id=3004334&forcing=era_interim&return_format=csv".to_string()
    ));
    assert!(targets.contains(
        &"/api/SeasonalAverage/?reach_id=3004334&forcing=era_5&return_format=csv".to_string()
    ));
}

#[test]
fn availability_lists() {
    let server = TestServer::start(&[
        (
            "/api/AvailableRegions/",
            200,
            r#"{"available_regions": ["japan-geoglows", "europe-geoglows"]}"#,
        ),
        (
            "/api/AvailableDates/",
            200,
            r#"{"available_dates": ["20200601.00", "20200603.00", "20200602.00"]}"#,
        ),
    ]);
    let client = server.client();

    assert_eq!(
        client.available_regions().unwrap(),
        vec!["japan-geoglows", "europe-geoglows"]
    );
    assert_eq!(client.latest_date("japan-geoglows").unwrap(), "20200603.00");

    let requests = server.requests();
    let dates = requests
        .iter()
        .find(|r| r.path() == "/api/AvailableDates/")
        .unwrap();
    assert!(dates.target.contains("region=japan-geoglows"));
}

#[test]
fn fetch_returns_raw_payload() {
    let server = TestServer::start(&[("/api/ForecastStats/", 200, STATS_CSV)]);
    let request = Request::new(Product::ForecastStats).reach_id(REACH);
    let payload = server.client().fetch(&request).unwrap();
    assert_eq!(payload.as_text(), Some(STATS_CSV));
}

#[test]
fn forecast_warnings_by_region() {
    let server = TestServer::start(&[("/api/ForecastWarnings/", 200, WARNINGS_CSV)]);
    let warnings = server.client().forecast_warnings("japan-geoglows").unwrap();

    assert_eq!(warnings.index_name(), "comid");
    assert_eq!(warnings.index(), &[3_004_334, 3_004_335]);
    assert_eq!(warnings.value("stream_order", 1), Some(4.0));
    assert_eq!(warnings.value("max_5", 1), Some(1.0));
    // Dates are not numeric.
    assert_eq!(warnings.value("peak_date", 0), None);
    assert_eq!(
        server.requests()[0].target,
        "/api/ForecastWarnings/?region=japan-geoglows&return_format=csv"
    );
}

#[test]
fn no_warnings_is_an_empty_table() {
    let server = TestServer::start(&[(
        "/api/ForecastWarnings/",
        200,
        "comid,stream_order,lat,lon,peak_date,max_2,max_5\n",
    )]);
    let warnings = server.client().forecast_warnings("europe-geoglows").unwrap();
    assert!(warnings.is_empty());
    assert_eq!(warnings.columns().len(), 6);
}

#[test]
fn available_data_by_region() {
    let server = TestServer::start(&[(
        "/api/AvailableData/",
        200,
        r#"{"available_data": {"japan-geoglows": ["20200601.00", "20200602.00"], "europe-geoglows": []}}"#,
    )]);
    let data = server.client().available_data().unwrap();

    assert_eq!(data.len(), 2);
    assert_eq!(data["japan-geoglows"], vec!["20200601.00", "20200602.00"]);
    assert!(data["europe-geoglows"].is_empty());
    assert_eq!(server.requests()[0].target, "/api/AvailableData/");
}

#[test]
fn available_dates_for_reach_uses_its_region() {
    let server = TestServer::start(&[(
        "/api/AvailableDates/",
        200,
        r#"{"available_dates": ["20200601.00"]}"#,
    )]);
    let dates = server.client().available_dates_for_reach(REACH).unwrap();
    assert_eq!(dates, vec!["20200601.00"]);
    assert_eq!(
        server.requests()[0].target,
        "/api/AvailableDates/?region=japan-geoglows"
    );
}

#[test]
fn historic_simulation_and_records() {
    let server = TestServer::start(&[
        ("/api/HistoricSimulation/", 200, HISTORIC_CSV),
        ("/api/ForecastRecords/", 200, RECORDS_CSV),
    ]);
    let client = server.client();

    let hist = client.historic_simulation(REACH, Forcing::EraInterim).unwrap();
    assert_eq!(hist.len(), 3);
    assert_eq!(hist.max("streamflow_m^3/s"), Some(4.0));
    assert_eq!(hist.value("streamflow_m^3/s", 2), None);

    let records = client.forecast_records(REACH).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records.value("streamflow_m^3/s", 2), Some(8.0));

    let targets: Vec<String> = server.requests().into_iter().map(|r| r.target).collect();
    assert_eq!(
        targets,
        vec![
            "/api/HistoricSimulation/?reach_id=3004334&forcing=era_interim&return_format=csv",
            "/api/ForecastRecords/?reach_id=3004334&return_format=csv",
        ]
    );
}

#[test]
fn fetch_waterml_and_json() {
    let server = TestServer::start(&[
        ("/api/HistoricSimulation/", 200, WATERML),
        ("/api/ForecastStats/", 200, r#"{"reach_id": 3004334, "flow_avg": [1.5, 2.0]}"#),
    ]);
    let client = server.client();

    let waterml = Request::new(Product::HistoricSimulation)
        .reach_id(REACH)
        .return_format(ReturnFormat::WaterML);
    let payload = client.fetch(&waterml).unwrap();
    assert!(matches!(payload, Payload::WaterML(_)));
    assert_eq!(payload.as_text(), Some(WATERML));

    let json = Request::new(Product::ForecastStats)
        .reach_id(REACH)
        .return_format(ReturnFormat::Json);
    let value = client.fetch(&json).unwrap().into_json().unwrap();
    assert_eq!(value["flow_avg"][1], 2.0);

    let requests = server.requests();
    assert!(requests[0].target.ends_with("return_format=waterml"));
    assert!(requests[1].target.ends_with("return_format=json"));
}

#[test]
fn hydroviewer_collects_every_part() {
    let server = TestServer::start(&forecast_routes());
    let view = server.client().hydroviewer(REACH, Forcing::Era5).unwrap();

    assert_eq!(view.reach_id, REACH);
    assert_eq!(view.records.len(), 3);
    assert_eq!(view.stats.len(), 4);
    assert_eq!(view.ensembles.columns().len(), 3);
    assert_eq!(view.rperiods.get(10), Some(18.0));

    let figure = view.figure(7).unwrap();
    assert!(figure.layout.title.text.contains("Stream ID: 3004334"));
    // Top band ends at max(2 * 27 - 21, 25).
    let top = figure.data.last().unwrap();
    assert_eq!(top.name, "100 Year: 27");
    assert_eq!(top.y, vec![Some(27.0), Some(27.0), Some(33.0), Some(33.0)]);
    let table = view.probabilities_table().unwrap();
    assert!(table.contains("<th>Jun 10</th><th>Jun 11</th>"));

    let mut paths: Vec<String> = server
        .requests()
        .iter()
        .map(|r| r.path().to_string())
        .collect();
    paths.sort();
    assert_eq!(
        paths,
        vec![
            "/api/ForecastEnsembles/",
            "/api/ForecastRecords/",
            "/api/ForecastStats/",
            "/api/ReturnPeriods/",
        ]
    );
}

#[test]
fn hydroviewer_fails_when_one_part_fails() {
    let routes: Vec<_> = forecast_routes()
        .into_iter()
        .filter(|(path, _, _)| *path != "/api/ForecastEnsembles/")
        .collect();
    let server = TestServer::start(&routes);

    match server.client().hydroviewer(REACH, Forcing::Era5) {
        Err(Error::Api { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected an api error, got {other:?}"),
    }
    // Every request still ran to completion.
    assert_eq!(server.requests().len(), 4);
}

#[test]
fn metadata_table_is_downloaded_once_then_cached() {
    let server = TestServer::start(&[
        ("/tables/metadata-table.csv", 200, METADATA_CSV),
        ("/api/ForecastStats/", 200, STATS_CSV),
        ("/api/ReturnPeriods/", 200, RPERIODS_CSV),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("nested").join("metadata-table.csv");

    let client = Client::new(ClientOptions {
        metadata: MetadataConfig {
            path: cache.clone(),
            url: server.url("/tables/metadata-table.csv"),
        },
        ..server.options()
    })
    .unwrap();

    let found = client.latlon_to_reach(38.85, -90.12).unwrap();
    assert_eq!(found.reach_id, REACH);
    assert_eq!(found.region.as_deref(), Some("japan-geoglows"));
    assert!(cache.is_file());

    // The table is held in memory after the first lookup.
    let stats = client.forecast_stats_at(38.85, -90.12).unwrap();
    assert_eq!(stats.len(), 4);
    let downloads = server
        .requests()
        .iter()
        .filter(|r| r.path() == "/tables/metadata-table.csv")
        .count();
    assert_eq!(downloads, 1);

    // A fresh client reads the cache file and never touches the download url.
    let offline = Client::new(ClientOptions {
        metadata: MetadataConfig {
            path: cache,
            url: "http://127.0.0.1:9/metadata-table.csv".into(),
        },
        ..server.options()
    })
    .unwrap();
    let found = offline.latlon_to_reach(38.9, -90.2).unwrap();
    assert_eq!(found.reach_id, 3_004_335);
}

#[test]
fn far_away_points_have_no_river() {
    let server = TestServer::start(&[("/tables/metadata-table.csv", 200, METADATA_CSV)]);
    let dir = tempfile::tempdir().unwrap();
    let client = Client::new(ClientOptions {
        metadata: MetadataConfig {
            path: dir.path().join("metadata-table.csv"),
            url: server.url("/tables/metadata-table.csv"),
        },
        ..server.options()
    })
    .unwrap();

    assert!(matches!(
        client.latlon_to_reach(0.0, 0.0),
        Err(Error::NoNearbyReach { .. })
    ));
}
