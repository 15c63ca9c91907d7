// Entry point and interactive menu.
//
// The menu mirrors the dashboard's filter bar:
// - [1] loads a spreadsheet and resets the selection.
// - [2]-[4] pick municipality, village and reference year.
// - [5] prints the ficha (KPIs, yearly series, narrative) to the console.
// - [6] exports the ficha as PDF and Word next to a JSON/CSV copy.
// `--export` runs a single export without the menu.
mod aggregate;
mod charts;
mod config;
mod error;
mod export;
mod filters;
mod loader;
mod narrative;
mod output;
mod report;
mod state;
mod types;
mod util;

use clap::Parser;
use config::{Args, DEFAULT_INPUT};
use log::{error, warn};
use state::Dashboard;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use types::{Metric, UnitFilter};

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Read a single line of input after the common "Opción:" prompt.
fn read_choice() -> String {
    prompt("Opción: ")
}

/// Print a numbered list and return the picked entry. `extra` is shown as
/// option [0] and maps to `Some(None)`.
fn choose<'a>(items: &'a [String], extra: Option<&str>) -> Option<Option<&'a String>> {
    if let Some(e) = extra {
        println!("[0] {}", e);
    }
    for (i, item) in items.iter().enumerate() {
        println!("[{}] {}", i + 1, item);
    }
    let choice = read_choice();
    match choice.parse::<usize>() {
        Ok(0) if extra.is_some() => Some(None),
        Ok(n) if n >= 1 && n <= items.len() => Some(Some(&items[n - 1])),
        _ => {
            println!("Opción inválida.\n");
            None
        }
    }
}

/// Ask whether to go back to the menu after an export.
///
/// Returns `true` for `S`, `false` for `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        match prompt("¿Volver al menú? (S/N): ").to_uppercase().as_str() {
            "S" => return true,
            "N" => return false,
            _ => println!("Opción inválida. Escriba S o N."),
        }
    }
}

/// Load `path` into the dashboard and print a short summary.
fn load_into(dashboard: &mut Dashboard, path: &Path) -> bool {
    match loader::load(path) {
        Ok((dataset, report)) => {
            dashboard.ingest(dataset);
            println!(
                "Procesando archivo... ({} filas cargadas de la hoja '{}')",
                util::format_int(report.total_rows),
                report.sheet
            );
            if report.years.is_empty() {
                println!("Aviso: no se encontraron columnas de años.");
            } else {
                println!("Años detectados: {}", dashboard.dataset().year_labels().join(", "));
            }
            for col in &report.missing_columns {
                println!("Aviso: falta la columna '{}'; se asume vacía.", col);
            }
            if report.tasa_r_rows > 0 {
                println!("Tabla TASA_R: {} municipios.", report.tasa_r_rows);
            }
            println!();
            true
        }
        Err(e) => {
            eprintln!("No se pudo cargar el archivo: {}\n", e);
            false
        }
    }
}

fn handle_load(dashboard: &mut Dashboard) {
    let path = prompt(&format!("Ruta del archivo [{}]: ", DEFAULT_INPUT));
    let path = if path.is_empty() { DEFAULT_INPUT.to_string() } else { path };
    load_into(dashboard, Path::new(&path));
}

fn require_data(dashboard: &Dashboard) -> bool {
    if !dashboard.has_data() {
        println!("Error: no hay datos cargados. Cargue un archivo primero (opción 1).\n");
    }
    dashboard.has_data()
}

fn handle_municipio(dashboard: &mut Dashboard) {
    let units = dashboard.units();
    match choose(&units, Some("Todos los municipios")) {
        Some(None) => dashboard.select_unit(UnitFilter::All),
        Some(Some(u)) => dashboard.select_unit(UnitFilter::Unit(u.clone())),
        None => {}
    }
}

fn handle_vereda(dashboard: &mut Dashboard) {
    let veredas = dashboard.sub_units();
    if veredas.is_empty() {
        println!("No hay veredas para la selección actual.\n");
        return;
    }
    if let Some(v) = choose(&veredas, Some("Todas las veredas")) {
        dashboard.select_sub_unit(v.cloned());
    }
}

fn handle_year(dashboard: &mut Dashboard) {
    let years: Vec<String> = filters::valid_years(dashboard.dataset())
        .iter()
        .map(|y| y.to_string())
        .collect();
    if years.is_empty() {
        println!("El archivo no tiene columnas de años.\n");
        return;
    }
    if let Some(Some(y)) = choose(&years, None) {
        if let Ok(year) = y.parse() {
            dashboard.select_year(year);
        }
    }
}

fn handle_view(dashboard: &Dashboard) {
    let Some(group) = dashboard.aggregate() else {
        println!("La selección actual no tiene registros.\n");
        return;
    };
    println!("\n{}", report::caption(&group));
    output::preview_table("Información relevante", None, &report::kpis(&group), 20);
    output::preview_table(
        "Población y densidad por año",
        None,
        &aggregate::series_rows(&group),
        20,
    );
    for metric in [Metric::Population, Metric::Density] {
        println!("{}\n", narrative::narrate(&group, metric).paragraph());
    }
    output::preview_table(
        "Distribución de calificación de densidad (general)",
        Some(&format!("año {}", group.reference_year)),
        &aggregate::class_distribution(dashboard.dataset(), group.reference_year),
        4,
    );
}

fn handle_export(dashboard: &Dashboard, args: &Args) -> bool {
    println!("Generando ficha...");
    match export::export(dashboard, &args.output_dir, !args.no_charts) {
        Ok(files) => {
            println!("Archivos generados:");
            for f in files.all() {
                println!("  {}", f.display());
            }
            println!();
            true
        }
        Err(e) => {
            error!("export failed: {}", e);
            eprintln!("No se pudo exportar la ficha: {}\n", e);
            false
        }
    }
}

/// Apply `--municipio`, `--vereda` and `--year` after a start-up load.
fn apply_args(dashboard: &mut Dashboard, args: &Args) {
    if let Some(m) = &args.municipio {
        if m.eq_ignore_ascii_case("todos") {
            dashboard.select_unit(UnitFilter::All);
        } else if dashboard.units().contains(m) {
            dashboard.select_unit(UnitFilter::Unit(m.clone()));
        } else {
            warn!("unknown municipio '{}', keeping {:?}", m, dashboard.selection().unit);
        }
    }
    if let Some(v) = &args.vereda {
        if !dashboard.select_sub_unit(Some(v.clone())) {
            warn!("unknown vereda '{}' for the selected municipio", v);
        }
    }
    if let Some(y) = args.year {
        if !dashboard.select_year(y) {
            warn!("year {} not present in the file", y);
        }
    }
}

fn main() -> ExitCode {
    pretty_env_logger::init();
    let args = Args::parse();
    let mut dashboard = Dashboard::new();

    if let Some(path) = &args.input {
        if load_into(&mut dashboard, path) {
            apply_args(&mut dashboard, &args);
        }
    }

    if args.export {
        return if handle_export(&dashboard, &args) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    loop {
        println!("Dashboard Veredas – Población y Densidad");
        println!("[1] Cargar archivo");
        println!("[2] Seleccionar municipio");
        println!("[3] Seleccionar vereda");
        println!("[4] Seleccionar año");
        println!("[5] Ver ficha");
        println!("[6] Exportar ficha (PDF y Word)");
        println!("[0] Salir\n");
        match read_choice().as_str() {
            "1" => handle_load(&mut dashboard),
            "2" if require_data(&dashboard) => handle_municipio(&mut dashboard),
            "3" if require_data(&dashboard) => handle_vereda(&mut dashboard),
            "4" if require_data(&dashboard) => handle_year(&mut dashboard),
            "5" if require_data(&dashboard) => handle_view(&dashboard),
            "6" => {
                handle_export(&dashboard, &args);
                if !prompt_back_to_menu() {
                    println!("Saliendo del programa.");
                    break;
                }
            }
            "0" => {
                println!("Saliendo del programa.");
                break;
            }
            "2" | "3" | "4" | "5" => {}
            _ => println!("Opción inválida. Escriba un número del 0 al 6.\n"),
        }
    }
    ExitCode::SUCCESS
}
