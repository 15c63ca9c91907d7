// Candidate values for the filter menus, derived from the dataset and the
// upstream part of the selection. Nothing here mutates either.
use crate::types::{Dataset, Row, UnitFilter};
use crate::util::compare_names;

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = values
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    out.sort_by(|a, b| compare_names(a, b));
    out.dedup();
    out
}

/// Rows belonging to the selected unit, or every row for `All`.
pub fn rows_for_unit<'a>(dataset: &'a Dataset, unit: &'a UnitFilter) -> impl Iterator<Item = &'a Row> {
    dataset.rows.iter().filter(move |r| match unit {
        UnitFilter::All => true,
        UnitFilter::Unit(u) => r.unit == *u,
    })
}

pub fn distinct_units(dataset: &Dataset) -> Vec<String> {
    distinct(dataset.rows.iter().map(|r| r.unit.as_str()))
}

pub fn distinct_sub_units(dataset: &Dataset, unit: &UnitFilter) -> Vec<String> {
    distinct(rows_for_unit(dataset, unit).filter_map(|r| r.sub_unit.as_deref()))
}

pub fn valid_years(dataset: &Dataset) -> &[i32] {
    &dataset.years
}
