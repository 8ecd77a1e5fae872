use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentifierError {
    #[error("item list not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read item list: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed delimited item list: {0}")]
    Csv(#[from] csv::Error),
}

/// Reads identifiers in file order. Delimited files (`.csv`, `.tsv`)
/// contribute the first field of every row; anything else is one identifier
/// per non-blank line. Duplicates are kept.
pub fn load_identifiers(path: &Path) -> Result<Vec<String>, IdentifierError> {
    if !path.exists() {
        return Err(IdentifierError::NotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    match delimiter_for(path) {
        Some(delimiter) => parse_delimited(file, delimiter),
        None => {
            let mut text = String::new();
            std::io::BufReader::new(file).read_to_string(&mut text)?;
            Ok(parse_lines(&text))
        }
    }
}

fn delimiter_for(path: &Path) -> Option<u8> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "csv" => Some(b','),
        "tsv" => Some(b'\t'),
        _ => None,
    }
}

fn parse_delimited<R: Read>(reader: R, delimiter: u8) -> Result<Vec<String>, IdentifierError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(reader);
    let mut identifiers = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(first) = record.get(0).map(str::trim)
            && !first.is_empty()
        {
            identifiers.push(first.to_string());
        }
    }
    Ok(identifiers)
}

fn parse_lines(text: &str) -> Vec<String> {
    text.trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
