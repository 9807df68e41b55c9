use std::env;
use std::fs;

use geoglows::{
    analyze, plots, tables, Client, ClientOptions, Forcing, Product, ReachId, Request, TimeTable,
};

const USAGE: &str = "Usage:
  cargo run --example cli -- <command> [args]

Commands:
  stats <reach_id>                  forecast statistics summary
  ensembles <reach_id>              forecast ensembles summary (and locally computed stats)
  historic <reach_id> [forcing]     historic simulation with locally fitted return periods
  seasonal <reach_id> [forcing]     daily averages of the historic simulation
  rperiods <reach_id> [forcing]     return periods as an HTML table
  regions                           regions with forecasts
  dates <region>                    forecast dates available for a region
  url <product> <reach_id>          print a request URL without sending it
  latlon <lat> <lon>                nearest river to a point
  hydroviewer <reach_id> [out.html] dashboard figure and probabilities table

Environment:
  GEOGLOWS_ENDPOINT (byu, geoglows, azure, ai4e, local or a URL), GEOGLOWS_API_KEY,
  GEOGLOWS_TIMEOUT_SECS, GEOGLOWS_METADATA_TABLE_PATH, GEOGLOWS_METADATA_TABLE_URL";

fn reach_arg(args: &[String]) -> ReachId {
    match args.get(2).map(|s| s.parse::<ReachId>()) {
        Some(Ok(id)) => id,
        _ => {
            eprintln!("expected a numeric reach_id\n\n{USAGE}");
            std::process::exit(2);
        }
    }
}

fn forcing_arg(args: &[String], pos: usize) -> Forcing {
    match args.get(pos).map(|s| s.parse::<Forcing>()) {
        None => Forcing::default(),
        Some(Ok(f)) => f,
        Some(Err(e)) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    }
}

fn summarize(name: &str, table: &TimeTable) {
    let (Some(first), Some(last)) = (table.first_key(), table.last_key()) else {
        println!("{name}: no rows");
        return;
    };
    println!("{name}: {} rows from {first} to {last}", table.len());
    for column in table.columns() {
        if let (Some(min), Some(max)) = (table.min(column), table.max(column)) {
            println!("  {column:<24} min {min:>10.2}  max {max:>10.2}");
        }
    }
}

fn fail(what: &str, e: geoglows::Error) -> ! {
    eprintln!("{what} failed: {e}");
    if matches!(e, geoglows::Error::Api { .. }) {
        eprintln!("Tip: the service may be busy; try another endpoint with GEOGLOWS_ENDPOINT.");
    }
    std::process::exit(1);
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() == 1 {
        eprintln!("{USAGE}");
        return;
    }

    let client = Client::new(ClientOptions::from_env()).expect("create client");

    match args.get(1).map(|s| s.as_str()) {
        Some("stats") => {
            let reach = reach_arg(&args);
            match client.forecast_stats(reach) {
                Ok(stats) => summarize("ForecastStats", &stats),
                Err(e) => fail("forecast_stats", e),
            }
        }

        Some("ensembles") => {
            let reach = reach_arg(&args);
            let ensembles = client
                .forecast_ensembles(reach)
                .unwrap_or_else(|e| fail("forecast_ensembles", e));
            println!("{} ensemble members", ensembles.columns().len());
            match analyze::forecast_stats(&ensembles) {
                Ok(stats) => summarize("stats from ensembles", &stats),
                Err(e) => fail("forecast_stats", e),
            }
        }

        Some("historic") => {
            let reach = reach_arg(&args);
            let hist = client
                .historic_simulation(reach, forcing_arg(&args, 3))
                .unwrap_or_else(|e| fail("historic_simulation", e));
            summarize("HistoricSimulation", &hist);
            match analyze::return_periods(&hist, plots::STREAMFLOW, &analyze::DEFAULT_RETURN_PERIODS) {
                Ok(rp) => {
                    for (years, flow) in rp.iter() {
                        println!("  {years:>3} year flow {flow:>10.2}");
                    }
                }
                Err(e) => fail("return_periods", e),
            }
        }

        Some("seasonal") => {
            let reach = reach_arg(&args);
            let seasonal = client
                .seasonal_average(reach, forcing_arg(&args, 3))
                .unwrap_or_else(|e| fail("seasonal_average", e));
            let data = plots::SeasonalPlotData::new(&seasonal, &plots::PlotOptions::reach(reach))
                .unwrap_or_else(|e| fail("seasonal_plot", e));
            for (label, flow) in data.day_label.iter().zip(&data.average_flow).step_by(30) {
                match flow {
                    Some(v) => println!("{label}  {v:>10.2}"),
                    None => println!("{label}  {:>10}", "-"),
                }
            }
        }

        Some("rperiods") => {
            let reach = reach_arg(&args);
            match client.return_periods(reach, forcing_arg(&args, 3)) {
                Ok(rp) => println!("{}", tables::return_periods_table(&rp)),
                Err(e) => fail("return_periods", e),
            }
        }

        Some("regions") => match client.available_regions() {
            Ok(regions) => regions.iter().for_each(|r| println!("{r}")),
            Err(e) => fail("available_regions", e),
        },

        Some("dates") => {
            let Some(region) = args.get(2) else {
                eprintln!("expected a region name\n\n{USAGE}");
                std::process::exit(2);
            };
            match client.available_dates(region) {
                Ok(dates) => dates.iter().for_each(|d| println!("{d}")),
                Err(e) => fail("available_dates", e),
            }
        }

        Some("url") => {
            let product: Product = match args.get(2).map(|s| s.parse()) {
                Some(Ok(p)) => p,
                _ => {
                    eprintln!("expected a product such as ForecastStats\n\n{USAGE}");
                    std::process::exit(2);
                }
            };
            let mut request = Request::new(product);
            if let Some(Ok(reach)) = args.get(3).map(|s| s.parse::<ReachId>()) {
                request = request.reach_id(reach);
            }
            match client.url(&request) {
                Ok(url) => println!("{url}"),
                Err(e) => fail("url", e),
            }
        }

        Some("latlon") => {
            let coords: Vec<f64> = args[2..].iter().filter_map(|s| s.parse().ok()).collect();
            let &[lat, lon] = coords.as_slice() else {
                eprintln!("expected <lat> <lon>\n\n{USAGE}");
                std::process::exit(2);
            };
            match client.latlon_to_reach(lat, lon) {
                Ok(loc) => println!(
                    "river {} in {} at ({}, {}), {:.4} degrees away",
                    loc.reach_id,
                    loc.region.as_deref().unwrap_or("an unknown region"),
                    loc.lat,
                    loc.lon,
                    loc.distance
                ),
                Err(e) => fail("latlon_to_reach", e),
            }
        }

        Some("hydroviewer") => {
            let reach = reach_arg(&args);
            let target = args
                .get(3)
                .cloned()
                .unwrap_or_else(|| format!("hydroviewer-{reach}.html"));

            let view = client
                .hydroviewer(reach, Forcing::default())
                .unwrap_or_else(|e| fail("hydroviewer", e));
            let figure = view
                .figure(plots::DEFAULT_RECORD_DAYS)
                .and_then(|f| f.to_html_div("hydroviewer"))
                .unwrap_or_else(|e| fail("hydroviewer_plot", e));
            let probabilities = view
                .probabilities_table()
                .unwrap_or_else(|e| fail("probabilities_table", e));

            let page = format!(
                "<html><head><script src=\"https://cdn.plot.ly/plotly-2.35.2.min.js\"></script></head>\n\
                 <body>\n{figure}\n{probabilities}\n{}\n</body></html>\n",
                view.return_periods_table()
            );
            match fs::write(&target, page) {
                Ok(()) => println!("Wrote {target}"),
                Err(e) => {
                    eprintln!("writing {target} failed: {e}");
                    std::process::exit(1);
                }
            }
        }

        _ => {
            eprintln!("Unknown command.\n\n{USAGE}");
            std::process::exit(2);
        }
    }
}
