use url::Url;

use crate::error::{Error, Result};
use crate::request::Product;

/// Join the product method onto the endpoint and append the query pairs.
pub fn format_url(endpoint: &str, product: Product, pairs: &[(String, String)]) -> Result<Url> {
    let base = Url::parse(endpoint)?;
    if base.cannot_be_a_base() {
        return Err(Error::InvalidRequest(format!("endpoint cannot be a base: {endpoint}")));
    }
    let mut url = base.join(product.method())?;

    if !pairs.is_empty() {
        let mut query = url.query_pairs_mut();
        for (k, v) in pairs {
            query.append_pair(k, v);
        }
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_method_and_query() {
        let url = format_url(
            "https://tethys2.byu.edu/localsptapi/api/",
            Product::HistoricSimulation,
            &[
                ("reach_id".into(), "3004334".into()),
                ("forcing".into(), "era_5".into()),
            ],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://tethys2.byu.edu/localsptapi/api/HistoricSimulation/?reach_id=3004334&forcing=era_5"
        );
    }

    #[test]
    fn no_query_without_pairs() {
        let url = format_url("http://0.0.0.0:8090/api/", Product::AvailableRegions, &[]).unwrap();
        assert_eq!(url.as_str(), "http://0.0.0.0:8090/api/AvailableRegions/");
    }

    #[test]
    fn values_are_percent_encoded() {
        let url = format_url(
            "https://geoglows.ecmwf.int/api/",
            Product::ForecastWarnings,
            &[("region".into(), "north america&x".into())],
        )
        .unwrap();
        assert_eq!(url.query(), Some("region=north+america%26x"));
    }
}
