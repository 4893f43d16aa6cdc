use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::config::Config;
use crate::error::{BotError, Result};

use super::pages::Entry;

// Spreadsheet apps need the BOM to read the Arabic titles as UTF-8
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// Entry point
pub fn export_slugs_csv(config: &Config, entries: &[Entry<'_>], path: &Path) -> Result<()> {
    let display = path.display().to_string();
    let mut file = File::create(path).map_err(|e| BotError::io(&display, e))?;
    file.write_all(UTF8_BOM).map_err(|e| BotError::io(&display, e))?;

    let mut writer = csv::Writer::from_writer(file);
    let csv_err = |e: csv::Error| BotError::io(&display, e.into());

    writer
        .write_record(["Index", "Title", "SKU", "Slug", "URL"])
        .map_err(csv_err)?;

    for (index, entry) in entries.iter().enumerate() {
        writer
            .write_record([
                index.to_string().as_str(),
                entry.product.title.as_str(),
                entry.product.sku.as_str(),
                entry.slug.as_str(),
                config.product_url(&entry.slug).as_str(),
            ])
            .map_err(csv_err)?;
    }

    writer.flush().map_err(|e| BotError::io(&display, e))?;
    Ok(())
}
