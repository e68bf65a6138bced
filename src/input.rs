use std::{fs::File, io, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("Missing column '{0}'")]
    MissingColumn(String),
}

pub fn read_coordinates_from_file<P: AsRef<Path>>(
    path: P,
    lat_column: &str,
    lon_column: &str,
) -> Result<Vec<(f64, f64)>, Error> {
    let file = File::open(path)?;
    read_coordinates(file, lat_column, lon_column)
}

/// Reads `(lat, lon)` pairs from CSV records in input order.
///
/// Column names are matched case-insensitively. Rows without a numeric
/// value in one of the two columns are skipped.
pub fn read_coordinates<R: io::Read>(
    reader: R,
    lat_column: &str,
    lon_column: &str,
) -> Result<Vec<(f64, f64)>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let column_index = |name: &str| {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| Error::MissingColumn(name.to_owned()))
    };
    let lat_index = column_index(lat_column)?;
    let lon_index = column_index(lon_column)?;

    let mut coordinates = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        // 1st row = header
        let row = index + 2;
        let lat = record.get(lat_index).and_then(parse_number);
        let lon = record.get(lon_index).and_then(parse_number);
        match (lat, lon) {
            (Some(lat), Some(lon)) => coordinates.push((lat, lon)),
            _ => log::warn!("Skipping row {row}: no numeric coordinate"),
        }
    }
    log::debug!("Read {} coordinates", coordinates.len());
    Ok(coordinates)
}

// Spreadsheet exports from some locales use a decimal comma.
fn parse_number(cell: &str) -> Option<f64> {
    cell.parse()
        .ok()
        .or_else(|| cell.replace(',', ".").parse().ok())
}
