use crate::error::{Error, Result};

/// Built-in API endpoints.
///
/// If `source` is already an `http(s)` URL, it is used as-is.
pub fn source_to_base_url(source: &str) -> Option<&'static str> {
    match source {
        "geoglows" => Some("https://geoglows.ecmwf.int/api/"),
        "byu" => Some("https://tethys2.byu.edu/localsptapi/api/"),
        "azure" => Some("http://gsf-api-vm.eastus.cloudapp.azure.com/api/"),
        "ai4e" => Some("http://aiforearth.azure-api.net/streamflow/"),
        "local" => Some("http://0.0.0.0:8090/api/"),
        _ => None,
    }
}

pub fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Resolve a source name, URL or bare host into a base URL ending in exactly one `/`.
pub fn resolve_endpoint(source: &str) -> Result<String> {
    let source = source.trim();
    if source.is_empty() {
        return Err(Error::InvalidRequest("empty endpoint".into()));
    }

    let base = if let Some(known) = source_to_base_url(source) {
        known.to_string()
    } else if is_http_url(source) {
        source.to_string()
    } else if source.contains('.') || source.contains(':') {
        format!("https://{source}")
    } else {
        return Err(Error::InvalidRequest(format!("unknown endpoint: {source}")));
    };

    Ok(format!("{}/", base.trim_end_matches('/')))
}
