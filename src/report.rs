// Canonical ficha contents.
//
// Everything both documents show is decided here, once: KPI labels and
// formatted values, narrative paragraphs, chart rasters, the TASA_R table
// and the fixed formula/reference blocks. The PDF and Word exporters only
// project this payload into their own layout.
use crate::aggregate::{class_distribution, series_rows};
use crate::config::TASA_R_YEARS;
use crate::error::ExportError;
use crate::export::image::{decode_data_url, ChartImage, EmbeddedImage};
use crate::narrative::{narrate, Narrative};
use crate::types::{
    AggregatedGroup, ClassCountRow, Dataset, KpiRow, Metric, Scope, SeriesRow, TasaRRow,
};
use crate::util::{format_number, format_percent, format_rounded, sanitize_filename};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;

pub const TITLE: &str = "Dashboard Veredas";
pub const TITLE_SUFFIX: &str = "– Población y Densidad";
pub const SUBTITLE: &str = "(Municipios y veredas relacionados a la cuenca)";

pub const CHART_POPULATION: &str = "poblacion";
pub const CHART_DENSITY: &str = "densidad";
pub const CHART_DISTRIBUTION: &str = "calificacion";
pub const CHART_MUNICIPALITIES: &str = "municipios";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Formula {
    pub heading: &'static str,
    pub expression: &'static str,
    pub explanation: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Reference {
    pub text: &'static str,
    pub link: &'static str,
}

pub const COMPOUND_RATE_QUESTION: &str =
    "¿Por qué usar la tasa de crecimiento poblacional compuesta? ";
pub const COMPOUND_RATE_ANSWER: &str = "La tasa compuesta (CAGR) refleja de manera precisa el crecimiento promedio anual de la población considerando la variabilidad interanual y los efectos acumulativos. Es preferible frente a tasas simples porque suaviza fluctuaciones, permite comparar periodos de distinta duración y es el estándar internacional para proyecciones demográficas. Así, se obtiene una visión más realista y comparable del crecimiento poblacional a lo largo del tiempo.";

pub const FORMULAS: [Formula; 3] = [
    Formula {
        heading: "Tasa de Crecimiento Poblacional (R):",
        expression: "R = (Pf/Pi)^(1/n) - 1",
        explanation: "Donde: Pf = población final, Pi = población inicial, n = número de años. Esto da la tasa anual compuesta de crecimiento poblacional.",
    },
    Formula {
        heading: "Proyección poblacional:",
        expression: "Pt = P2025 · (1 + R)^(t-2025)",
        explanation: "Para t = 2026, 2027, ..., 2036.",
    },
    Formula {
        heading: "Densidad Poblacional (DP):",
        expression: "DPt = Pt/Area",
        explanation: "Donde: Pt = población proyectada del año t, Área = área fija de la vereda/municipio (en km²). Esto permite ver cómo la distribución poblacional cambia en el tiempo.",
    },
];

pub const REFERENCES: [Reference; 4] = [
    Reference {
        text: "Departamento Administrativo Nacional de Estadística (DANE). (2023). Proyecciones de población.",
        link: "https://www.dane.gov.co/index.php/estadisticas-por-tema/demografia-y-poblacion/proyecciones-de-poblacion",
    },
    Reference {
        text: "Departamento Administrativo Nacional de Estadística (DANE). (2023). Densidad de población.",
        link: "https://geoportal.dane.gov.co/servicios/atlas-estadistico/src/Tomo_I_Demografico/2.2.3.-densidad-de-la-poblaci%C3%B3n-en-colombia.html",
    },
    Reference {
        text: "United Nations, Department of Economic and Social Affairs, Population Division. (2022). World Population Prospects 2022.",
        link: "https://population.un.org/wpp/",
    },
    Reference {
        text: "United Nations Statistics Division. (2022). Demographic Yearbook.",
        link: "https://unstats.un.org/unsd/demographic-social/products/dyb/index.cshtml",
    },
];

pub const REFERENCES_CLOSING: &str = "Para mayor rigor, consulta la documentación oficial del DANE y organismos internacionales de estadística poblacional.";

pub const TASA_R_TITLE: &str =
    "Tabla 1. Tasas de crecimiento poblacional y proyección por municipio";
pub const TASA_R_NOTE: &str = "Tasas calculadas con CAGR: r = (Pf / Pi)^1/n − 1, usando Pi = población 2025 y Pf en 2028/2030/2035.";

/// One narrative section with its chart.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub heading: String,
    pub narrative: Option<Narrative>,
    pub chart: Option<EmbeddedImage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MunicipalTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub chart: Option<EmbeddedImage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportPayload {
    /// Dataset generation this payload was built from.
    pub generation: u64,
    pub generated_at: NaiveDateTime,
    pub file_stem: String,
    pub caption: String,
    pub kpis: Vec<KpiRow>,
    pub series: Vec<SeriesRow>,
    pub population: Section,
    pub density: Section,
    pub distribution: Section,
    pub distribution_counts: Vec<ClassCountRow>,
    pub municipalities: Option<MunicipalTable>,
}

/// KPI block, shared verbatim by the terminal view and both documents.
pub fn kpis(group: &AggregatedGroup) -> Vec<KpiRow> {
    let year = group.reference_year;
    let area_label = match group.scope {
        Scope::Village => "Área vereda (km²)",
        Scope::Municipality => "Área municipio (km²)",
        Scope::Global => "Área total (km²)",
    };
    let mut out = vec![KpiRow {
        label: "Municipio".to_string(),
        value: group.unit_label.clone(),
    }];
    if let Some(v) = &group.sub_unit {
        out.push(KpiRow {
            label: "Vereda".to_string(),
            value: v.clone(),
        });
    }
    out.extend([
        KpiRow {
            label: area_label.to_string(),
            value: format_number(group.total_area, 2),
        },
        KpiRow {
            label: "Tasa de Crecimiento Poblacional (R)".to_string(),
            value: format_percent(group.mean_growth_rate),
        },
        KpiRow {
            label: format!("Población {}", year),
            value: format_rounded(group.population_at(year)),
        },
        KpiRow {
            label: format!("Densidad Poblacional {}", year),
            value: format!("{} hab/km²", format_rounded(group.density_at(year))),
        },
        KpiRow {
            label: "Calificación densidad".to_string(),
            value: group.density_class.label().to_string(),
        },
    ]);
    out
}

/// "Guasca – El Salitre", "Guasca" or "Todos los municipios".
pub fn caption(group: &AggregatedGroup) -> String {
    match (group.scope, &group.sub_unit) {
        (Scope::Global, _) => "Todos los municipios".to_string(),
        (_, Some(v)) => format!("{} – {}", group.unit_label, v),
        (_, None) => group.unit_label.clone(),
    }
}

pub fn file_stem(group: &AggregatedGroup) -> String {
    let unit = match group.scope {
        Scope::Global => "todos".to_string(),
        _ if group.unit_label == "(Varios)" => "varios".to_string(),
        _ => group.unit_label.clone(),
    };
    let raw = match &group.sub_unit {
        Some(v) => format!("ficha_{}_{}", unit, v),
        None => format!("ficha_{}", unit),
    };
    sanitize_filename(&raw)
}

pub fn tasa_r_table(rows: &[TasaRRow]) -> (Vec<String>, Vec<Vec<String>>) {
    let mut header = vec!["Municipio".to_string()];
    header.extend(TASA_R_YEARS.iter().map(|y| format!("Población {}", y)));
    header.push("Tasa de crecimiento R (%)".to_string());

    let dash = || "—".to_string();
    let body = rows
        .iter()
        .map(|r| {
            let mut cells = vec![if r.unit.is_empty() { dash() } else { r.unit.clone() }];
            cells.extend(
                r.populations
                    .iter()
                    .map(|p| p.map(format_rounded).unwrap_or_else(dash)),
            );
            cells.push(r.rate.map(format_percent).unwrap_or_else(dash));
            cells
        })
        .collect();
    (header, body)
}

fn take_chart(charts: &[ChartImage], key: &str) -> Result<Option<EmbeddedImage>, ExportError> {
    charts
        .iter()
        .find(|c| c.key == key)
        .map(|c| decode_data_url(&c.key, &c.data_url))
        .transpose()
}

/// Assemble the canonical payload. Chart images are decoded and validated
/// here; a broken raster aborts the export.
pub fn assemble(
    group: &AggregatedGroup,
    dataset: &Dataset,
    generation: u64,
    charts: &[ChartImage],
) -> Result<ReportPayload, ExportError> {
    let population = Section {
        heading: "Población proyectada por años".to_string(),
        narrative: Some(narrate(group, Metric::Population)),
        chart: take_chart(charts, CHART_POPULATION)?,
    };
    let density = Section {
        heading: "Densidad poblacional por año (hab/km²)".to_string(),
        narrative: Some(narrate(group, Metric::Density)),
        chart: take_chart(charts, CHART_DENSITY)?,
    };
    let distribution = Section {
        heading: "Distribución de calificación de densidad (general)".to_string(),
        narrative: None,
        chart: take_chart(charts, CHART_DISTRIBUTION)?,
    };
    let municipalities = if dataset.tasa_r.is_empty() {
        None
    } else {
        let (header, rows) = tasa_r_table(&dataset.tasa_r);
        Some(MunicipalTable {
            header,
            rows,
            chart: take_chart(charts, CHART_MUNICIPALITIES)?,
        })
    };

    Ok(ReportPayload {
        generation,
        generated_at: Local::now().naive_local(),
        file_stem: file_stem(group),
        caption: caption(group),
        kpis: kpis(group),
        series: series_rows(group),
        population,
        density,
        distribution,
        distribution_counts: class_distribution(dataset, group.reference_year),
        municipalities,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::export::image::{encode_data_url, sample_png};
    use crate::types::{Row, Selection, UnitFilter};

    pub fn dataset() -> Dataset {
        let row = |u: &str, v: &str, area: f64, r: f64, p: [f64; 3]| Row {
            unit: u.to_string(),
            sub_unit: Some(v.to_string()),
            area,
            growth_rate: r,
            population: [2025, 2030, 2035].into_iter().zip(p).collect(),
        };
        Dataset {
            rows: vec![
                row("Guasca", "El Salitre", 12.5, 0.012, [1200.0, 1290.0, 1385.0]),
                row("Guasca", "El Salitre", 2.5, 0.018, [300.0, 330.0, 362.0]),
                row("Guasca", "Pastor Ospina", 4.0, -0.004, [90.0, 88.0, 86.0]),
                row("Sopó", "Meusa", 1.0, 0.02, [250.0, 276.0, 304.0]),
            ],
            years: vec![2025, 2030, 2035],
            tasa_r: vec![
                TasaRRow {
                    unit: "Guasca".to_string(),
                    populations: [Some(16000.0), Some(17012.0), Some(17800.0), Some(19500.0)],
                    rate: Some(0.0199),
                },
                TasaRRow {
                    unit: "Sopó".to_string(),
                    populations: [Some(29000.0), None, Some(31000.0), Some(33500.0)],
                    rate: None,
                },
            ],
        }
    }

    pub fn village_group(dataset: &Dataset) -> AggregatedGroup {
        let sel = Selection {
            unit: UnitFilter::Unit("Guasca".into()),
            sub_unit: Some("El Salitre".into()),
            reference_year: 2030,
        };
        aggregate(dataset, &sel).unwrap()
    }

    pub fn charts() -> Vec<ChartImage> {
        [
            (CHART_POPULATION, 1200, 640),
            (CHART_DENSITY, 600, 320),
            (CHART_DISTRIBUTION, 600, 320),
            (CHART_MUNICIPALITIES, 800, 400),
        ]
        .into_iter()
        .map(|(key, w, h)| ChartImage {
            key: key.to_string(),
            data_url: encode_data_url(&sample_png(w, h)),
        })
        .collect()
    }

    pub fn payload() -> ReportPayload {
        let d = dataset();
        let g = village_group(&d);
        assemble(&g, &d, 1, &charts()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::aggregate::aggregate;
    use crate::types::{Selection, UnitFilter};

    #[test]
    fn kpis_match_the_screen_format() {
        let d = dataset();
        let g = village_group(&d);
        let k = kpis(&g);
        let get = |label: &str| k.iter().find(|r| r.label == label).unwrap().value.clone();
        assert_eq!(get("Municipio"), "Guasca");
        assert_eq!(get("Vereda"), "El Salitre");
        assert_eq!(get("Área vereda (km²)"), "15.00");
        assert_eq!(get("Tasa de Crecimiento Poblacional (R)"), "1.50%");
        assert_eq!(get("Población 2030"), "1,620");
        assert_eq!(get("Densidad Poblacional 2030"), "108 hab/km²");
        assert_eq!(get("Calificación densidad"), "Alta densidad poblacional");
    }

    #[test]
    fn global_scope_labels_and_file_name() {
        let d = dataset();
        let sel = Selection {
            unit: UnitFilter::All,
            sub_unit: None,
            reference_year: 2025,
        };
        let g = aggregate(&d, &sel).unwrap();
        assert_eq!(file_stem(&g), "ficha_todos");
        assert_eq!(caption(&g), "Todos los municipios");
        assert!(kpis(&g).iter().any(|k| k.label == "Área total (km²)"));
        assert!(!kpis(&g).iter().any(|k| k.label == "Vereda"));
    }

    #[test]
    fn village_file_name_is_sanitized() {
        let d = dataset();
        assert_eq!(file_stem(&village_group(&d)), "ficha_Guasca_El_Salitre");
    }

    #[test]
    fn tasa_r_rows_are_used_verbatim() {
        let (header, rows) = tasa_r_table(&dataset().tasa_r);
        assert_eq!(header.len(), 6);
        assert_eq!(rows[0], vec!["Guasca", "16,000", "17,012", "17,800", "19,500", "1.99%"]);
        assert_eq!(rows[1][2], "—");
        assert_eq!(rows[1][5], "—");
    }

    #[test]
    fn assembly_decodes_every_chart() {
        let p = payload();
        assert_eq!(p.generation, 1);
        let pop = p.population.chart.as_ref().unwrap();
        assert_eq!((pop.width, pop.height), (1200, 640));
        assert!(p.distribution.chart.is_some());
        assert!(p.municipalities.as_ref().unwrap().chart.is_some());
        assert_eq!(p.series.len(), 3);
        assert_eq!(p.distribution_counts.iter().map(|c| c.count).sum::<usize>(), 4);
    }

    #[test]
    fn a_broken_chart_aborts_assembly() {
        let d = dataset();
        let g = village_group(&d);
        let mut charts = charts();
        charts[1].data_url = "data:image/png;base64,Zm9v".to_string();
        let err = assemble(&g, &d, 1, &charts).unwrap_err();
        assert!(matches!(err, ExportError::ImageDecode { .. }));
    }

    #[test]
    fn charts_are_optional() {
        let d = dataset();
        let g = village_group(&d);
        let p = assemble(&g, &d, 1, &[]).unwrap();
        assert!(p.population.chart.is_none());
        assert!(p.population.narrative.is_some());
    }

    #[test]
    fn formulas_use_the_ascii_notation() {
        let expressions: Vec<&str> = FORMULAS.iter().map(|f| f.expression).collect();
        assert!(expressions.contains(&"R = (Pf/Pi)^(1/n) - 1"));
        assert!(expressions.contains(&"DPt = Pt/Area"));
    }
}
