// Fixed constants of the dashboard plus the command-line options.
//
// Everything the engine needs to know about the spreadsheet layout lives
// here so the loader and the report code never hard-code column names.
use clap::Parser;
use std::path::PathBuf;

pub const YEAR_MIN: i32 = 2025;
pub const YEAR_MAX: i32 = 2035;

pub const COL_UNIT: &str = "Municipio";
pub const COL_SUB_UNIT: &str = "Nombre Vereda";
pub const COL_AREA: &str = "Área vereda en km2";
pub const COL_GROWTH_RATE: &str = "R";

/// File offered by the load prompt when none is given.
pub const DEFAULT_INPUT: &str = "veredas.xlsx";

pub const SHEET_ROWS: &str = "R";
pub const SHEET_TASA_R: &str = "TASA_R";

/// Reference years of the TASA_R summary table, in column order.
pub const TASA_R_YEARS: [i32; 4] = [2025, 2028, 2030, 2035];

// Density thresholds in hab/km².
pub const DENSITY_VERY_LOW_MAX: f64 = 20.0;
pub const DENSITY_LOW_MAX: f64 = 40.0;
pub const DENSITY_MEDIUM_MAX: f64 = 60.0;

// Population thresholds used by the recommendations.
pub const POPULATION_HIGH: f64 = 1000.0;
pub const POPULATION_LOW: f64 = 200.0;

pub const CHART_WIDTH: u32 = 600;
pub const CHART_HEIGHT: u32 = 320;
pub const DOCX_MAX_IMG_WIDTH: u32 = 600;
pub const DOCX_MAX_IMG_HEIGHT: u32 = 600;

#[derive(Debug, Clone, Parser)]
#[command(name = "ficha_veredas", about = "Población y densidad por municipio y vereda")]
pub struct Args {
    /// Spreadsheet to load on start-up (.xlsx, .xls, .ods or .csv).
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory where exported fichas are written.
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Municipality to select after loading; "todos" selects every row.
    #[arg(long)]
    pub municipio: Option<String>,

    /// Village to select after loading.
    #[arg(long)]
    pub vereda: Option<String>,

    /// Reference year for KPIs and classification.
    #[arg(long)]
    pub year: Option<i32>,

    /// Export once and exit instead of opening the interactive menu.
    #[arg(long)]
    pub export: bool,

    /// Skip chart rendering; exports then carry no images.
    #[arg(long)]
    pub no_charts: bool,
}
