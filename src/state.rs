// The dashboard's single state container.
//
// Owns the dataset and the selection; every other module reads them
// through `&Dashboard`. A generation counter is bumped on each ingestion so
// work prepared from older data can be recognised and dropped.
use crate::aggregate::aggregate;
use crate::config::YEAR_MIN;
use crate::filters::{distinct_sub_units, distinct_units};
use crate::types::{AggregatedGroup, Dataset, Selection, UnitFilter};
use log::debug;

#[derive(Debug, Default)]
pub struct Dashboard {
    dataset: Dataset,
    selection: Selection,
    generation: u64,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_data(&self) -> bool {
        !self.dataset.is_empty()
    }

    /// Replace the dataset wholesale and reset the selection to the first
    /// unit, no village and the first valid year.
    pub fn ingest(&mut self, dataset: Dataset) {
        self.dataset = dataset;
        self.generation += 1;
        let unit = distinct_units(&self.dataset)
            .into_iter()
            .next()
            .map(UnitFilter::Unit)
            .unwrap_or(UnitFilter::All);
        self.selection = Selection {
            unit,
            sub_unit: None,
            reference_year: self.dataset.years.first().copied().unwrap_or(YEAR_MIN),
        };
        debug!(
            "dataset generation {} selected {:?}",
            self.generation, self.selection
        );
    }

    /// Changing the unit always clears the village.
    pub fn select_unit(&mut self, unit: UnitFilter) {
        self.selection.unit = unit;
        self.selection.sub_unit = None;
    }

    /// Select a village of the current unit; `None` aggregates the whole
    /// unit. Unknown names are rejected.
    pub fn select_sub_unit(&mut self, sub_unit: Option<String>) -> bool {
        match sub_unit {
            None => {
                self.selection.sub_unit = None;
                true
            }
            Some(v) => {
                if self.sub_units().contains(&v) {
                    self.selection.sub_unit = Some(v);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Only years detected in the dataset are accepted.
    pub fn select_year(&mut self, year: i32) -> bool {
        if self.dataset.years.contains(&year) {
            self.selection.reference_year = year;
            true
        } else {
            false
        }
    }

    pub fn units(&self) -> Vec<String> {
        distinct_units(&self.dataset)
    }

    pub fn sub_units(&self) -> Vec<String> {
        distinct_sub_units(&self.dataset, &self.selection.unit)
    }

    pub fn aggregate(&self) -> Option<AggregatedGroup> {
        aggregate(&self.dataset, &self.selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Row;
    use std::collections::BTreeMap;

    fn dataset(years: Vec<i32>) -> Dataset {
        let row = |u: &str, v: &str| Row {
            unit: u.to_string(),
            sub_unit: Some(v.to_string()),
            area: 1.0,
            growth_rate: 0.0,
            population: years.iter().map(|y| (*y, 10.0)).collect::<BTreeMap<_, _>>(),
        };
        Dataset {
            rows: vec![row("Sopó", "Meusa"), row("Guasca", "El Salitre")],
            years: years.clone(),
            tasa_r: Vec::new(),
        }
    }

    #[test]
    fn ingestion_resets_the_selection() {
        let mut d = Dashboard::new();
        d.ingest(dataset(vec![2027, 2030]));
        d.select_unit(UnitFilter::Unit("Sopó".into()));
        assert!(d.select_sub_unit(Some("Meusa".into())));
        assert!(d.select_year(2030));

        d.ingest(dataset(vec![2026, 2031]));
        let s = d.selection();
        assert_eq!(s.unit, UnitFilter::Unit("Guasca".into()));
        assert_eq!(s.sub_unit, None);
        assert_eq!(s.reference_year, 2026);
        assert_eq!(d.generation(), 2);
    }

    #[test]
    fn no_year_columns_defaults_to_range_start() {
        let mut d = Dashboard::new();
        d.ingest(dataset(vec![]));
        assert_eq!(d.selection().reference_year, YEAR_MIN);
    }

    #[test]
    fn empty_dataset_selects_all() {
        let mut d = Dashboard::new();
        d.ingest(Dataset::default());
        assert_eq!(d.selection().unit, UnitFilter::All);
        assert!(d.units().is_empty());
        assert!(d.aggregate().is_none());
    }

    #[test]
    fn invalid_choices_are_rejected() {
        let mut d = Dashboard::new();
        d.ingest(dataset(vec![2025]));
        assert!(!d.select_year(2040));
        assert!(!d.select_sub_unit(Some("Meusa".into())));
        assert_eq!(d.selection().reference_year, 2025);
    }

    #[test]
    fn changing_unit_clears_village() {
        let mut d = Dashboard::new();
        d.ingest(dataset(vec![2025]));
        assert!(d.select_sub_unit(Some("El Salitre".into())));
        d.select_unit(UnitFilter::All);
        assert_eq!(d.selection().sub_unit, None);
        assert_eq!(d.aggregate().unwrap().row_count, 2);
    }
}
