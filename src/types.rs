use crate::config::YEAR_MIN;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tabled::Tabled;

/// A cell as handed over by the spreadsheet reader, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

pub type RawRecord = HashMap<String, RawValue>;

/// One sheet: the header row plus every data row keyed by header.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
}

/// One ingested observation unit (usually a vereda).
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub unit: String,
    pub sub_unit: Option<String>,
    pub area: f64,
    pub growth_rate: f64,
    pub population: BTreeMap<i32, f64>,
}

impl Row {
    pub fn population_in(&self, year: i32) -> f64 {
        self.population.get(&year).copied().unwrap_or(0.0)
    }

    pub fn density_in(&self, year: i32) -> f64 {
        if self.area > 0.0 {
            self.population_in(year) / self.area
        } else {
            0.0
        }
    }
}

/// Per-municipality summary read verbatim from the TASA_R sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TasaRRow {
    pub unit: String,
    /// Populations at `config::TASA_R_YEARS`, `None` when the column is missing.
    pub populations: [Option<f64>; 4],
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub rows: Vec<Row>,
    /// Valid years detected in the header, ascending.
    pub years: Vec<i32>,
    pub tasa_r: Vec<TasaRRow>,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn year_labels(&self) -> Vec<String> {
        self.years.iter().map(|y| y.to_string()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitFilter {
    All,
    Unit(String),
}

/// The user's current filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub unit: UnitFilter,
    pub sub_unit: Option<String>,
    pub reference_year: i32,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            unit: UnitFilter::All,
            sub_unit: None,
            reference_year: YEAR_MIN,
        }
    }
}

impl Selection {
    pub fn scope(&self) -> Scope {
        match (&self.sub_unit, &self.unit) {
            (Some(_), _) => Scope::Village,
            (None, UnitFilter::Unit(_)) => Scope::Municipality,
            (None, UnitFilter::All) => Scope::Global,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Village,
    Municipality,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityClass {
    VeryLow,
    Low,
    Medium,
    High,
}

impl DensityClass {
    pub const ALL: [DensityClass; 4] = [
        DensityClass::VeryLow,
        DensityClass::Low,
        DensityClass::Medium,
        DensityClass::High,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DensityClass::VeryLow => "Muy baja densidad",
            DensityClass::Low => "Baja densidad",
            DensityClass::Medium => "Media densidad poblacional",
            DensityClass::High => "Alta densidad poblacional",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increase,
    Decrease,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Population,
    Density,
}

/// Result of applying a `Selection` to a `Dataset`. Always rebuilt from
/// scratch, never patched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedGroup {
    pub scope: Scope,
    /// Municipality as shown in the KPI block ("(Varios)" when every unit is included).
    pub unit_label: String,
    pub sub_unit: Option<String>,
    pub row_count: usize,
    pub total_area: f64,
    pub mean_growth_rate: f64,
    pub population_by_year: BTreeMap<i32, f64>,
    pub density_by_year: BTreeMap<i32, f64>,
    pub reference_year: i32,
    pub density_class: DensityClass,
}

impl AggregatedGroup {
    pub fn population_at(&self, year: i32) -> f64 {
        self.population_by_year.get(&year).copied().unwrap_or(0.0)
    }

    pub fn density_at(&self, year: i32) -> f64 {
        self.density_by_year.get(&year).copied().unwrap_or(0.0)
    }

    /// First and last year of the series, if there is any year at all.
    pub fn year_span(&self) -> Option<(i32, i32)> {
        let first = *self.population_by_year.keys().next()?;
        let last = *self.population_by_year.keys().next_back()?;
        Some((first, last))
    }

    /// Name used in narrative sentences.
    pub fn display_name(&self) -> &str {
        self.sub_unit.as_deref().unwrap_or(&self.unit_label)
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct KpiRow {
    #[tabled(rename = "Indicador")]
    pub label: String,
    #[tabled(rename = "Valor")]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct SeriesRow {
    #[serde(rename = "Año")]
    #[tabled(rename = "Año")]
    pub year: i32,
    #[serde(rename = "Población")]
    #[tabled(rename = "Población")]
    pub population: String,
    #[serde(rename = "Densidad (hab/km²)")]
    #[tabled(rename = "Densidad (hab/km²)")]
    pub density: String,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ClassCountRow {
    #[tabled(rename = "Calificación")]
    pub label: String,
    #[tabled(rename = "Veredas")]
    pub count: usize,
}
