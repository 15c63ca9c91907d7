use crate::error::ExportError;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Serialize rows as CSV into memory.
pub fn csv_bytes<T: Serialize>(rows: &[T]) -> Result<Vec<u8>, ExportError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

pub fn json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, ExportError> {
    Ok(serde_json::to_vec_pretty(value)?)
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(sin filas)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SeriesRow;

    #[test]
    fn series_csv_uses_spanish_headers() {
        let rows = vec![SeriesRow {
            year: 2025,
            population: "1,500".to_string(),
            density: "100".to_string(),
        }];
        let text = String::from_utf8(csv_bytes(&rows).unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Año,Población,Densidad (hab/km²)"));
        assert_eq!(lines.next(), Some("2025,\"1,500\",100"));
    }
}
