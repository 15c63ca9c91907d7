// Descriptive text for the population and density sections.
//
// Pure string building: the numbers come from an `AggregatedGroup`, the
// wording depends on scope, trend and the fixed thresholds only.
use crate::aggregate::series_trend;
use crate::config::{DENSITY_MEDIUM_MAX, DENSITY_VERY_LOW_MAX, POPULATION_HIGH, POPULATION_LOW};
use crate::types::{AggregatedGroup, Metric, Scope, Trend};
use crate::util::format_rounded;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Narrative {
    pub interpretation: String,
    pub recommendation: String,
}

impl Narrative {
    /// Both parts as one paragraph, the way the section text is exported.
    pub fn paragraph(&self) -> String {
        format!("{} {}", self.interpretation, self.recommendation)
    }
}

/// How a group is named inside a sentence, with the Spanish contractions
/// resolved ("del municipio", "de la vereda").
struct Subject {
    of: String,
    at: String,
}

fn subject(scope: Scope, name: &str, unit: &str) -> Subject {
    match scope {
        Scope::Village => {
            let base = if unit.is_empty() || unit == "(Varios)" {
                format!("la vereda {}", name)
            } else {
                format!("la vereda {} ({})", name, unit)
            };
            Subject {
                of: format!("de {}", base),
                at: format!("en {}", base),
            }
        }
        Scope::Municipality => Subject {
            of: format!("del municipio {}", name),
            at: format!("en el municipio {}", name),
        },
        Scope::Global => Subject {
            of: "del conjunto de municipios".to_string(),
            at: "en el conjunto de municipios".to_string(),
        },
    }
}

pub fn population_interpretation(
    scope: Scope,
    name: &str,
    unit: &str,
    trend: Trend,
    (y0, p0): (i32, f64),
    (y1, p1): (i32, f64),
) -> String {
    let s = subject(scope, name, unit);
    let (p0, p1) = (format_rounded(p0), format_rounded(p1));
    match trend {
        Trend::Increase => format!(
            "Entre {y0} y {y1}, la población proyectada {} pasa de {p0} a {p1} habitantes, lo que evidencia una tendencia de crecimiento poblacional.",
            s.of
        ),
        Trend::Decrease => format!(
            "Entre {y0} y {y1}, la población proyectada {} pasa de {p0} a {p1} habitantes, lo que evidencia una tendencia de decrecimiento poblacional.",
            s.of
        ),
        Trend::Stable => format!(
            "Entre {y0} y {y1}, la población proyectada {} se mantiene estable en {p0} habitantes.",
            s.of
        ),
    }
}

pub fn density_interpretation(
    scope: Scope,
    name: &str,
    unit: &str,
    trend: Trend,
    (y0, d0): (i32, f64),
    (y1, d1): (i32, f64),
) -> String {
    let s = subject(scope, name, unit);
    let (d0, d1) = (format_rounded(d0), format_rounded(d1));
    match trend {
        Trend::Increase => format!(
            "La densidad poblacional {} aumenta de {d0} a {d1} hab/km² entre {y0} y {y1}, lo que indica una mayor concentración de habitantes en el territorio.",
            s.of
        ),
        Trend::Decrease => format!(
            "La densidad poblacional {} disminuye de {d0} a {d1} hab/km² entre {y0} y {y1}, lo que indica una menor concentración de habitantes en el territorio.",
            s.of
        ),
        Trend::Stable => format!(
            "La densidad poblacional {} se mantiene en {d0} hab/km² entre {y0} y {y1}, sin cambios en la concentración de habitantes.",
            s.of
        ),
    }
}

pub fn population_recommendation(scope: Scope, name: &str, unit: &str, population: f64) -> String {
    let s = subject(scope, name, unit);
    if population > POPULATION_HIGH {
        format!(
            "Se recomienda monitorear y actualizar periódicamente las proyecciones de población {}.",
            s.of
        )
    } else if population < POPULATION_LOW {
        format!(
            "Se recomienda evaluar políticas de incentivo para la permanencia de la población {}.",
            s.at
        )
    } else {
        format!("Se recomienda mantener el monitoreo de la población {}.", s.of)
    }
}

pub fn density_recommendation(scope: Scope, name: &str, unit: &str, density: f64) -> String {
    let s = subject(scope, name, unit);
    if density > DENSITY_MEDIUM_MAX {
        format!(
            "Se recomienda evaluar la capacidad de los servicios públicos, la infraestructura y el equipamiento {} frente a la concentración de población.",
            s.of
        )
    } else if density < DENSITY_VERY_LOW_MAX {
        format!(
            "Se recomienda incentivar la integración territorial y el acceso a servicios {} para la población dispersa.",
            s.at
        )
    } else {
        format!(
            "Se recomienda mantener el monitoreo de la densidad poblacional {}.",
            s.of
        )
    }
}

/// Interpretation plus recommendation for one metric of a group.
/// Recommendations are judged on the reference year.
pub fn narrate(group: &AggregatedGroup, metric: Metric) -> Narrative {
    let name = group.display_name();
    let unit = group.unit_label.as_str();
    let series = match metric {
        Metric::Population => &group.population_by_year,
        Metric::Density => &group.density_by_year,
    };

    let interpretation = match group.year_span() {
        Some((y0, y1)) => {
            let start = (y0, series.get(&y0).copied().unwrap_or(0.0));
            let end = (y1, series.get(&y1).copied().unwrap_or(0.0));
            let t = series_trend(series);
            match metric {
                Metric::Population => {
                    population_interpretation(group.scope, name, unit, t, start, end)
                }
                Metric::Density => {
                    let mut text = density_interpretation(group.scope, name, unit, t, start, end);
                    text.push_str(&format!(
                        " En {} la calificación es: {}.",
                        group.reference_year,
                        group.density_class.label()
                    ));
                    text
                }
            }
        }
        None => format!(
            "No se encontraron columnas de años {}.",
            subject(group.scope, name, unit).at
        ),
    };

    let recommendation = match metric {
        Metric::Population => population_recommendation(
            group.scope,
            name,
            unit,
            group.population_at(group.reference_year),
        ),
        Metric::Density => density_recommendation(
            group.scope,
            name,
            unit,
            group.density_at(group.reference_year),
        ),
    };

    Narrative {
        interpretation,
        recommendation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DensityClass;
    use std::collections::BTreeMap;

    fn group(scope: Scope, pops: &[(i32, f64)], area: f64, year: i32) -> AggregatedGroup {
        let population_by_year: BTreeMap<i32, f64> = pops.iter().copied().collect();
        let density_by_year = population_by_year
            .iter()
            .map(|(y, p)| (*y, if area > 0.0 { p / area } else { 0.0 }))
            .collect();
        AggregatedGroup {
            scope,
            unit_label: "Guasca".to_string(),
            sub_unit: (scope == Scope::Village).then(|| "El Salitre".to_string()),
            row_count: 1,
            total_area: area,
            mean_growth_rate: 0.01,
            population_by_year,
            density_by_year,
            reference_year: year,
            density_class: DensityClass::VeryLow,
        }
    }

    #[test]
    fn interpretation_branches_on_trend() {
        let up = narrate(&group(Scope::Village, &[(2025, 100.0), (2035, 150.0)], 10.0, 2025), Metric::Population);
        assert!(up.interpretation.contains("crecimiento"));
        let down = narrate(&group(Scope::Village, &[(2025, 150.0), (2035, 100.0)], 10.0, 2025), Metric::Population);
        assert!(down.interpretation.contains("decrecimiento"));
        let flat = narrate(&group(Scope::Village, &[(2025, 150.0), (2035, 150.0)], 10.0, 2025), Metric::Density);
        assert!(flat.interpretation.contains("se mantiene en 15 hab/km²"));
    }

    #[test]
    fn scope_changes_the_phrasing() {
        let pops = [(2025, 500.0), (2035, 600.0)];
        let village = narrate(&group(Scope::Village, &pops, 10.0, 2025), Metric::Population);
        let municipality = narrate(&group(Scope::Municipality, &pops, 10.0, 2025), Metric::Population);
        let global = narrate(&group(Scope::Global, &pops, 10.0, 2025), Metric::Population);
        assert!(village.interpretation.contains("de la vereda El Salitre (Guasca)"));
        assert!(municipality.interpretation.contains("del municipio Guasca"));
        assert!(global.interpretation.contains("del conjunto de municipios"));
    }

    #[test]
    fn population_recommendation_thresholds() {
        let rec = |p: f64| population_recommendation(Scope::Municipality, "Guasca", "Guasca", p);
        assert!(rec(1000.5).contains("actualizar periódicamente"));
        assert!(rec(1000.0).contains("mantener el monitoreo"));
        assert!(rec(200.0).contains("mantener el monitoreo"));
        assert!(rec(199.0).contains("políticas de incentivo"));
    }

    #[test]
    fn density_recommendation_thresholds() {
        let rec = |d: f64| density_recommendation(Scope::Village, "El Salitre", "Guasca", d);
        assert!(rec(60.5).contains("capacidad de los servicios"));
        assert!(rec(60.0).contains("mantener el monitoreo"));
        assert!(rec(20.0).contains("mantener el monitoreo"));
        assert!(rec(19.9).contains("integración territorial"));
    }

    #[test]
    fn recommendation_uses_the_reference_year() {
        let g = group(Scope::Municipality, &[(2025, 100.0), (2035, 5000.0)], 1.0, 2025);
        assert!(narrate(&g, Metric::Population).recommendation.contains("permanencia"));
        let g = group(Scope::Municipality, &[(2025, 100.0), (2035, 5000.0)], 1.0, 2035);
        assert!(narrate(&g, Metric::Population).recommendation.contains("periódicamente"));
    }

    #[test]
    fn missing_years_still_produce_text() {
        let n = narrate(&group(Scope::Global, &[], 0.0, 2025), Metric::Density);
        assert!(n.interpretation.starts_with("No se encontraron"));
        assert!(!n.recommendation.is_empty());
    }
}
