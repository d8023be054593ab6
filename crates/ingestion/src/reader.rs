//! Raw historic record loading.
//!
//! Accepts a single CSV or spreadsheet file, or a directory of them
//! (concatenated in sorted filename order).

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader as _};
use tracing::debug;
use volumetria_core::{Error, RawRecord, Result};

/// Recognized input file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputFormat {
    Csv,
    Spreadsheet,
}

fn classify(path: &Path) -> Option<InputFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "csv" => Some(InputFormat::Csv),
        "xls" | "xlsx" => Some(InputFormat::Spreadsheet),
        _ => None,
    }
}

/// Read raw records from a file or from every CSV/spreadsheet file inside
/// a directory.
///
/// A single file with an unrecognized extension is an
/// `UnsupportedInputFormat` error; a directory yielding no usable file is
/// a `NoInputData` error. Other files inside a directory are ignored.
pub fn read_historic(path: &Path) -> Result<Vec<RawRecord>> {
    if path.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        let mut records = Vec::new();
        let mut usable = 0usize;
        for file in &files {
            match classify(file) {
                Some(InputFormat::Csv) => {
                    records.extend(read_csv_file(file)?);
                    usable += 1;
                }
                Some(InputFormat::Spreadsheet) => {
                    records.extend(read_spreadsheet_file(file)?);
                    usable += 1;
                }
                None => debug!(file = %file.display(), "ignoring non-tabular file"),
            }
        }
        if usable == 0 {
            return Err(Error::no_input_data(format!(
                "no CSV/spreadsheet files found in directory: {}",
                path.display()
            )));
        }
        Ok(records)
    } else {
        match classify(path) {
            Some(InputFormat::Csv) => read_csv_file(path),
            Some(InputFormat::Spreadsheet) => read_spreadsheet_file(path),
            None => Err(Error::unsupported_input_format(format!(
                "unsupported historic_path: {}",
                path.display()
            ))),
        }
    }
}

/// Drop exact-duplicate rows, preserving first-appearance order.
pub fn dedup_records(records: Vec<RawRecord>) -> Vec<RawRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.clone()))
        .collect()
}

/// Distinct (entity, family) pairs in first-appearance order.
pub fn enumerate_groups(records: &[RawRecord]) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    let mut groups = Vec::new();
    for record in records {
        let key = (record.api_name.clone(), record.familia.clone());
        if seen.insert(key.clone()) {
            groups.push(key);
        }
    }
    groups
}

/// Distinct families in first-appearance order.
pub fn distinct_families(records: &[RawRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut families = Vec::new();
    for record in records {
        if seen.insert(record.familia.clone()) {
            families.push(record.familia.clone());
        }
    }
    families
}

fn read_csv_file(path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize::<RawRecord>() {
        records.push(row?);
    }
    debug!(file = %path.display(), rows = records.len(), "read CSV file");
    Ok(records)
}

fn read_spreadsheet_file(path: &Path) -> Result<Vec<RawRecord>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| Error::spreadsheet(format!("{}: {e}", path.display())))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::spreadsheet(format!("{}: workbook has no sheets", path.display())))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| Error::spreadsheet(format!("{}: {e}", path.display())))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| Error::spreadsheet(format!("{}: empty sheet", path.display())))?;
    let columns = header_columns(header, path)?;

    let mut records = Vec::new();
    for row in rows {
        // skip fully empty trailing rows
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        records.push(RawRecord {
            anio: cell_to_i64(row, columns.anio)? as i32,
            mes: cell_to_i64(row, columns.mes)? as u32,
            dia: cell_to_i64(row, columns.dia)? as u32,
            hora: cell_to_time_string(row, columns.hora)?,
            api_name: cell_to_string(row, columns.api_name)?,
            familia: cell_to_string(row, columns.familia)?,
            llamados: cell_to_i64(row, columns.llamados)?,
        });
    }
    debug!(file = %path.display(), rows = records.len(), "read spreadsheet file");
    Ok(records)
}

struct HeaderColumns {
    anio: usize,
    mes: usize,
    dia: usize,
    hora: usize,
    api_name: usize,
    familia: usize,
    llamados: usize,
}

fn header_columns(header: &[Data], path: &Path) -> Result<HeaderColumns> {
    let find = |name: &str| -> Result<usize> {
        header
            .iter()
            .position(|cell| {
                matches!(cell, Data::String(s) if s.trim().eq_ignore_ascii_case(name))
            })
            .ok_or_else(|| {
                Error::spreadsheet(format!("{}: missing column {name:?}", path.display()))
            })
    };
    Ok(HeaderColumns {
        anio: find("anio")?,
        mes: find("mes")?,
        dia: find("dia")?,
        hora: find("hora")?,
        api_name: find("api_name")?,
        familia: find("familia")?,
        llamados: find("llamados")?,
    })
}

fn cell_to_i64(row: &[Data], idx: usize) -> Result<i64> {
    match row.get(idx) {
        Some(Data::Int(v)) => Ok(*v),
        Some(Data::Float(v)) => Ok(*v as i64),
        Some(Data::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| Error::spreadsheet(format!("non-numeric cell: {s:?}"))),
        other => Err(Error::spreadsheet(format!("non-numeric cell: {other:?}"))),
    }
}

fn cell_to_string(row: &[Data], idx: usize) -> Result<String> {
    match row.get(idx) {
        Some(Data::String(s)) => Ok(s.trim().to_string()),
        Some(Data::Int(v)) => Ok(v.to_string()),
        Some(Data::Float(v)) => Ok(v.to_string()),
        other => Err(Error::spreadsheet(format!("non-text cell: {other:?}"))),
    }
}

/// Excel stores times as day fractions; strings pass through unchanged.
fn cell_to_time_string(row: &[Data], idx: usize) -> Result<String> {
    match row.get(idx) {
        Some(Data::String(s)) => Ok(s.trim().to_string()),
        Some(Data::DateTime(dt)) => Ok(day_fraction_to_hms(dt.as_f64())),
        Some(Data::Float(v)) if (0.0..1.0).contains(v) => Ok(day_fraction_to_hms(*v)),
        other => Err(Error::spreadsheet(format!("invalid time cell: {other:?}"))),
    }
}

fn day_fraction_to_hms(value: f64) -> String {
    let total = (value.fract() * 86_400.0).round() as i64;
    let total = total.rem_euclid(86_400);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3_600,
        (total % 3_600) / 60,
        total % 60
    )
}
