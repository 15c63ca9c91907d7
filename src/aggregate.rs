use crate::config::{DENSITY_LOW_MAX, DENSITY_MEDIUM_MAX, DENSITY_VERY_LOW_MAX};
use crate::filters::rows_for_unit;
use crate::types::{
    AggregatedGroup, ClassCountRow, Dataset, DensityClass, Row, Selection, SeriesRow, Trend,
    UnitFilter,
};
use crate::util::{average, format_rounded};
use std::collections::BTreeMap;

/// Rows matched by a selection: the village (inside the selected unit, if
/// any), else the unit, else everything.
pub fn matching_rows<'a>(dataset: &'a Dataset, selection: &'a Selection) -> Vec<&'a Row> {
    let in_unit = rows_for_unit(dataset, &selection.unit);
    match &selection.sub_unit {
        Some(v) => in_unit
            .filter(|r| r.sub_unit.as_deref() == Some(v.as_str()))
            .collect(),
        None => in_unit.collect(),
    }
}

/// Sum population and area over every matched row (never just the first
/// match) and derive densities. `None` means nothing matched.
pub fn aggregate(dataset: &Dataset, selection: &Selection) -> Option<AggregatedGroup> {
    let rows = matching_rows(dataset, selection);
    if rows.is_empty() {
        return None;
    }

    let total_area: f64 = rows.iter().map(|r| r.area).sum();
    let rates: Vec<f64> = rows
        .iter()
        .map(|r| r.growth_rate)
        .filter(|r| r.is_finite())
        .collect();
    let mean_growth_rate = average(&rates);

    let mut population_by_year = BTreeMap::new();
    let mut density_by_year = BTreeMap::new();
    for &year in &dataset.years {
        let pop: f64 = rows.iter().map(|r| r.population_in(year)).sum();
        let dp = if total_area > 0.0 { pop / total_area } else { 0.0 };
        population_by_year.insert(year, pop);
        density_by_year.insert(year, dp);
    }

    let current = density_by_year
        .get(&selection.reference_year)
        .copied()
        .unwrap_or(0.0);

    Some(AggregatedGroup {
        scope: selection.scope(),
        unit_label: match &selection.unit {
            UnitFilter::All => "(Varios)".to_string(),
            UnitFilter::Unit(u) => u.clone(),
        },
        sub_unit: selection.sub_unit.clone(),
        row_count: rows.len(),
        total_area,
        mean_growth_rate,
        population_by_year,
        density_by_year,
        reference_year: selection.reference_year,
        density_class: classify(current),
    })
}

/// Map a density (hab/km²) onto the fixed scale. Upper bounds are
/// inclusive; non-finite input counts as 0.
pub fn classify(density: f64) -> DensityClass {
    let x = if density.is_finite() { density } else { 0.0 };
    if x <= DENSITY_VERY_LOW_MAX {
        DensityClass::VeryLow
    } else if x <= DENSITY_LOW_MAX {
        DensityClass::Low
    } else if x <= DENSITY_MEDIUM_MAX {
        DensityClass::Medium
    } else {
        DensityClass::High
    }
}

/// Exact comparison: only identical values are stable.
pub fn trend(start: f64, end: f64) -> Trend {
    if end > start {
        Trend::Increase
    } else if end < start {
        Trend::Decrease
    } else {
        Trend::Stable
    }
}

/// Trend of a per-year series between its first and last year.
pub fn series_trend(series: &BTreeMap<i32, f64>) -> Trend {
    match (series.values().next(), series.values().next_back()) {
        (Some(first), Some(last)) => trend(*first, *last),
        _ => Trend::Stable,
    }
}

/// How many dataset rows fall in each density class at `year`. Every
/// class is listed, in scale order, even when empty.
pub fn class_distribution(dataset: &Dataset, year: i32) -> Vec<ClassCountRow> {
    let mut counts: BTreeMap<DensityClass, usize> =
        DensityClass::ALL.iter().map(|c| (*c, 0)).collect();
    for r in &dataset.rows {
        *counts.entry(classify(r.density_in(year))).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(class, count)| ClassCountRow {
            label: class.label().to_string(),
            count,
        })
        .collect()
}

/// Per-year table as shown on screen and exported: rounded population,
/// rounded density.
pub fn series_rows(group: &AggregatedGroup) -> Vec<SeriesRow> {
    group
        .population_by_year
        .iter()
        .map(|(&year, &pop)| SeriesRow {
            year,
            population: format_rounded(pop),
            density: format_rounded(group.density_at(year)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(unit: &str, sub: &str, area: f64, r: f64, pops: &[(i32, f64)]) -> Row {
        Row {
            unit: unit.to_string(),
            sub_unit: Some(sub.to_string()),
            area,
            growth_rate: r,
            population: pops.iter().copied().collect(),
        }
    }

    fn select(unit: UnitFilter, sub: Option<&str>, year: i32) -> Selection {
        Selection {
            unit,
            sub_unit: sub.map(str::to_string),
            reference_year: year,
        }
    }

    #[test]
    fn two_rows_of_one_village_are_both_summed() {
        let dataset = Dataset {
            rows: vec![
                row("A", "X", 2.0, 0.01, &[(2025, 10.0)]),
                row("A", "X", 3.0, 0.03, &[(2025, 20.0)]),
            ],
            years: vec![2025],
            tasa_r: Vec::new(),
        };
        let g = aggregate(&dataset, &select(UnitFilter::Unit("A".into()), Some("X"), 2025)).unwrap();
        assert_eq!(g.total_area, 5.0);
        assert_eq!(g.population_at(2025), 30.0);
        assert_eq!(g.density_at(2025), 6.0);
        assert_eq!(g.density_class, DensityClass::VeryLow);
        assert!((g.mean_growth_rate - 0.02).abs() < 1e-12);
        assert_eq!(g.row_count, 2);
    }

    #[test]
    fn village_match_stays_inside_the_selected_unit() {
        let dataset = Dataset {
            rows: vec![
                row("A", "X", 1.0, 0.0, &[(2025, 10.0)]),
                row("B", "X", 1.0, 0.0, &[(2025, 90.0)]),
            ],
            years: vec![2025],
            tasa_r: Vec::new(),
        };
        let only_a = aggregate(&dataset, &select(UnitFilter::Unit("A".into()), Some("X"), 2025)).unwrap();
        assert_eq!(only_a.population_at(2025), 10.0);
        let everywhere = aggregate(&dataset, &select(UnitFilter::All, Some("X"), 2025)).unwrap();
        assert_eq!(everywhere.population_at(2025), 100.0);
        assert_eq!(everywhere.unit_label, "(Varios)");
    }

    #[test]
    fn sums_cover_the_whole_matched_set() {
        let rows: Vec<Row> = (1..=6)
            .map(|i| row("M", &format!("V{}", i % 2), i as f64, 0.0, &[(2025, 10.0 * i as f64), (2030, 11.0 * i as f64)]))
            .collect();
        let dataset = Dataset { rows, years: vec![2025, 2030], tasa_r: Vec::new() };
        for sel in [
            select(UnitFilter::Unit("M".into()), None, 2025),
            select(UnitFilter::Unit("M".into()), Some("V1"), 2030),
            select(UnitFilter::All, None, 2025),
        ] {
            let matched = matching_rows(&dataset, &sel);
            let g = aggregate(&dataset, &sel).unwrap();
            let area: f64 = matched.iter().map(|r| r.area).sum();
            let pop: f64 = matched.iter().map(|r| r.population_in(2030)).sum();
            assert_eq!(g.total_area, area);
            assert_eq!(g.population_at(2030), pop);
            assert_eq!(g.density_at(2030), pop / area);
        }
    }

    #[test]
    fn zero_area_gives_zero_density_for_every_year() {
        let dataset = Dataset {
            rows: vec![row("A", "X", 0.0, 0.0, &[(2025, 10.0), (2026, 12.0)])],
            years: vec![2025, 2026],
            tasa_r: Vec::new(),
        };
        let g = aggregate(&dataset, &select(UnitFilter::All, None, 2026)).unwrap();
        for year in [2025, 2026] {
            let dp = g.density_at(year);
            assert!(dp.is_finite());
            assert_eq!(dp, 0.0);
        }
        assert_eq!(g.density_class, DensityClass::VeryLow);
    }

    #[test]
    fn empty_selection_is_none_not_zero() {
        let empty = Dataset::default();
        assert!(aggregate(&empty, &Selection::default()).is_none());

        let dataset = Dataset {
            rows: vec![row("A", "X", 1.0, 0.0, &[(2025, 1.0)])],
            years: vec![2025],
            tasa_r: Vec::new(),
        };
        assert!(aggregate(&dataset, &select(UnitFilter::Unit("A".into()), Some("Y"), 2025)).is_none());
    }

    #[test]
    fn zero_valued_group_is_still_some() {
        let dataset = Dataset {
            rows: vec![row("A", "X", 0.0, 0.0, &[])],
            years: vec![2025],
            tasa_r: Vec::new(),
        };
        let g = aggregate(&dataset, &select(UnitFilter::Unit("A".into()), None, 2025)).unwrap();
        assert_eq!(g.population_at(2025), 0.0);
        assert_eq!(g.total_area, 0.0);
    }

    #[test]
    fn classification_boundaries() {
        assert_eq!(classify(20.0), DensityClass::VeryLow);
        assert_eq!(classify(20.0001), DensityClass::Low);
        assert_eq!(classify(40.0), DensityClass::Low);
        assert_eq!(classify(60.0), DensityClass::Medium);
        assert_eq!(classify(60.0001), DensityClass::High);
        assert_eq!(classify(-5.0), DensityClass::VeryLow);
        assert_eq!(classify(f64::NAN), DensityClass::VeryLow);
        assert_eq!(classify(f64::INFINITY), DensityClass::VeryLow);
    }

    #[test]
    fn trend_uses_exact_comparison() {
        for a in [0.0, 1.5, -3.0, 1e9] {
            assert_eq!(trend(a, a), Trend::Stable);
        }
        assert_eq!(trend(1.0, 1.0 + 1e-12), Trend::Increase);
        assert_eq!(trend(1.0, 1.0 - 1e-12), Trend::Decrease);
    }

    #[test]
    fn distribution_lists_every_class() {
        let dataset = Dataset {
            rows: vec![
                row("A", "X", 1.0, 0.0, &[(2025, 10.0)]),
                row("A", "Y", 1.0, 0.0, &[(2025, 100.0)]),
                row("A", "Z", 1.0, 0.0, &[(2025, 5.0)]),
            ],
            years: vec![2025],
            tasa_r: Vec::new(),
        };
        let dist = class_distribution(&dataset, 2025);
        let counts: Vec<usize> = dist.iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![2, 0, 0, 1]);
        assert_eq!(dist[0].label, "Muy baja densidad");
    }
}
