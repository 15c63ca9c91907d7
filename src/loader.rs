// Spreadsheet reading and row ingestion.
//
// Reading turns a workbook (or CSV) into untyped `RawTable`s; ingestion
// resolves the column names once and produces typed `Row`s. Bad cells
// never fail the load, they coerce to 0 / empty.
use crate::config::{
    COL_AREA, COL_GROWTH_RATE, COL_SUB_UNIT, COL_UNIT, SHEET_ROWS, SHEET_TASA_R, TASA_R_YEARS,
    YEAR_MAX, YEAR_MIN,
};
use crate::error::LoadError;
use crate::types::{Dataset, RawRecord, RawTable, RawValue, Row, TasaRRow};
use crate::util::{normalize_key, parse_year_header, to_num, to_num_opt, to_text};
use calamine::{open_workbook_auto, Data, Range, Reader};
use csv::ReaderBuilder;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub sheet: String,
    pub total_rows: usize,
    pub years: Vec<i32>,
    pub missing_columns: Vec<&'static str>,
    pub tasa_r_rows: usize,
}

/// The sheets of one input file, still untyped.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheet: String,
    pub rows: RawTable,
    pub tasa_r: Option<RawTable>,
}

pub fn read_workbook(path: &Path) -> Result<Workbook, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_excel(path),
        "csv" => read_csv(path),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}

fn read_excel(path: &Path) -> Result<Workbook, LoadError> {
    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names();
    let sheet = if names.iter().any(|n| n == SHEET_ROWS) {
        SHEET_ROWS.to_string()
    } else {
        let first = names.first().ok_or(LoadError::NoSheets)?.clone();
        warn!("sheet '{}' not found, using '{}'", SHEET_ROWS, first);
        first
    };

    let range = workbook.worksheet_range(&sheet)?;
    let rows = range_to_table(&range);

    let tasa_r = if names.iter().any(|n| n == SHEET_TASA_R) {
        let range = workbook.worksheet_range(SHEET_TASA_R)?;
        Some(range_to_table(&range))
    } else {
        None
    };

    Ok(Workbook { sheet, rows, tasa_r })
}

fn read_csv(path: &Path) -> Result<Workbook, LoadError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let cells: Vec<RawValue> = record
            .iter()
            .map(|s| {
                if s.trim().is_empty() {
                    RawValue::Empty
                } else {
                    RawValue::Text(s.to_string())
                }
            })
            .collect();
        if let Some(rec) = build_record(&headers, cells) {
            records.push(rec);
        }
    }
    let sheet = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("csv")
        .to_string();
    Ok(Workbook {
        sheet,
        rows: RawTable { headers, records },
        tasa_r: None,
    })
}

fn cell_value(cell: &Data) -> RawValue {
    match cell {
        Data::Empty | Data::Error(_) => RawValue::Empty,
        Data::Int(i) => RawValue::Number(*i as f64),
        Data::Float(f) => RawValue::Number(*f),
        Data::Bool(b) => RawValue::Bool(*b),
        Data::String(s) => RawValue::Text(s.clone()),
        other => RawValue::Text(other.to_string()),
    }
}

/// First row is the header; blank rows are skipped.
fn range_to_table(range: &Range<Data>) -> RawTable {
    let mut iter = range.rows();
    let headers: Vec<String> = match iter.next() {
        Some(h) => h.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => return RawTable::default(),
    };
    let records = iter
        .filter_map(|row| build_record(&headers, row.iter().map(cell_value).collect()))
        .collect();
    RawTable { headers, records }
}

fn build_record(headers: &[String], cells: Vec<RawValue>) -> Option<RawRecord> {
    if cells.iter().all(|c| *c == RawValue::Empty) {
        return None;
    }
    let mut rec = RawRecord::new();
    for (header, cell) in headers.iter().zip(cells) {
        if header.is_empty() {
            continue;
        }
        rec.insert(header.clone(), cell);
    }
    Some(rec)
}

/// Valid year columns: all-digit headers inside the year range,
/// deduplicated and ascending.
pub fn detect_years(headers: &[String]) -> Vec<i32> {
    let mut years: Vec<i32> = headers
        .iter()
        .filter_map(|h| parse_year_header(h, YEAR_MIN, YEAR_MAX))
        .collect();
    years.sort_unstable();
    years.dedup();
    years
}

fn optional_name(v: Option<&RawValue>) -> Option<String> {
    let s = to_text(v);
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Resolve the known columns once and build typed rows.
pub fn ingest(table: &RawTable) -> (Vec<Row>, Vec<i32>, Vec<&'static str>) {
    let years = detect_years(&table.headers);
    let missing: Vec<&'static str> = [COL_UNIT, COL_SUB_UNIT, COL_AREA, COL_GROWTH_RATE]
        .into_iter()
        .filter(|c| !table.headers.iter().any(|h| h == c))
        .collect();

    // headers may carry the year with surrounding spaces; keep the raw key
    let year_keys: Vec<(i32, &String)> = table
        .headers
        .iter()
        .filter_map(|h| parse_year_header(h, YEAR_MIN, YEAR_MAX).map(|y| (y, h)))
        .collect();

    let rows = table
        .records
        .iter()
        .map(|rec| {
            let mut population = BTreeMap::new();
            for (year, key) in &year_keys {
                // duplicate headers for a year add up like duplicate rows would
                *population.entry(*year).or_insert(0.0) += to_num(rec.get(*key)).max(0.0);
            }
            Row {
                unit: to_text(rec.get(COL_UNIT)),
                sub_unit: optional_name(rec.get(COL_SUB_UNIT)),
                area: to_num(rec.get(COL_AREA)).max(0.0),
                growth_rate: to_num(rec.get(COL_GROWTH_RATE)),
                population,
            }
        })
        .collect();

    (rows, years, missing)
}

fn find_key<'a>(keys: &[(String, &'a String)], target: &str) -> Option<&'a String> {
    keys.iter()
        .find(|(norm, _)| norm.contains(target))
        .map(|(_, raw)| *raw)
}

/// Parse the TASA_R summary sheet. Headers are matched loosely since the
/// sheet is maintained by hand.
pub fn parse_tasa_r(table: &RawTable) -> Vec<TasaRRow> {
    let keys: Vec<(String, &String)> = table
        .headers
        .iter()
        .map(|h| (normalize_key(h), h))
        .collect();
    let key_unit = find_key(&keys, "municipio").or_else(|| table.headers.first());
    let key_rate = find_key(&keys, "tasar")
        .or_else(|| find_key(&keys, "crecimientor"))
        .or_else(|| {
            keys.iter()
                .find(|(norm, raw)| norm == "r" && Some(*raw) != key_unit)
                .map(|(_, raw)| *raw)
        });
    let key_years: Vec<Option<&String>> = TASA_R_YEARS
        .iter()
        .map(|y| {
            let y = y.to_string();
            keys.iter()
                .find(|(norm, raw)| norm.contains(&y) && Some(*raw) != key_rate)
                .map(|(_, raw)| *raw)
        })
        .collect();
    debug!(
        "TASA_R columns: unit={:?} rate={:?} years={:?}",
        key_unit, key_rate, key_years
    );

    table
        .records
        .iter()
        .map(|rec| {
            let mut populations = [None; 4];
            for (slot, key) in populations.iter_mut().zip(&key_years) {
                *slot = key.and_then(|k| to_num_opt(rec.get(k)));
            }
            TasaRRow {
                unit: key_unit.map(|k| to_text(rec.get(k))).unwrap_or_default(),
                populations,
                rate: key_rate.and_then(|k| to_num_opt(rec.get(k))),
            }
        })
        .collect()
}

/// Build a dataset from an already-read workbook.
pub fn build_dataset(workbook: &Workbook) -> (Dataset, LoadReport) {
    let (rows, years, missing_columns) = ingest(&workbook.rows);
    for col in &missing_columns {
        warn!("column '{}' not found in sheet '{}'", col, workbook.sheet);
    }
    let tasa_r = workbook
        .tasa_r
        .as_ref()
        .map(parse_tasa_r)
        .unwrap_or_default();
    let report = LoadReport {
        sheet: workbook.sheet.clone(),
        total_rows: rows.len(),
        years: years.clone(),
        missing_columns,
        tasa_r_rows: tasa_r.len(),
    };
    info!(
        "ingested {} rows from sheet '{}' ({} year columns)",
        report.total_rows,
        report.sheet,
        report.years.len()
    );
    (Dataset { rows, years, tasa_r }, report)
}

pub fn load(path: &Path) -> Result<(Dataset, LoadReport), LoadError> {
    let workbook = read_workbook(path)?;
    Ok(build_dataset(&workbook))
}

#[cfg(test)]
pub(crate) fn table(headers: &[&str], rows: &[&[RawValue]]) -> RawTable {
    let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let records = rows
        .iter()
        .filter_map(|r| build_record(&headers, r.to_vec()))
        .collect();
    RawTable { headers, records }
}
