use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::client::Client;
use crate::config::MetadataConfig;
use crate::error::{Error, Result};
use crate::reach::MetadataTable;

impl MetadataTable {
    /// Read the cached table, downloading it to `cfg.path` first when it is not there yet.
    pub fn load(cfg: &MetadataConfig, client: &Client) -> Result<Self> {
        if cfg.path.is_file() {
            debug!("metadata table cache hit: {}", cfg.path.display());
            return Self::from_path(&cfg.path);
        }

        info!(
            "downloading metadata table from {} to {}",
            cfg.url,
            cfg.path.display()
        );
        let text = client.get_text(&cfg.url, false)?;
        let table = Self::from_csv(&text)?;
        if table.is_empty() {
            return Err(Error::EmptyTable);
        }
        write_cache(&cfg.path, &text)?;
        Ok(table)
    }
}

fn write_cache(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    // Readers never see a partial table.
    let tmp = path.with_extension("csv.part");
    fs::write(&tmp, text)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
