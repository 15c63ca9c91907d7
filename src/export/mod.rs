// Export flow: one payload, two documents.
//
// `prepare` does all the fallible work in memory (charts, payload, PDF and
// Word bytes, side files). `write` only touches the disk once everything
// exists, stages the four files before moving them into place, and refuses
// results built from a dataset that has since been replaced.
pub mod docx;
pub mod image;
pub mod pdf;

use crate::charts;
use crate::error::ExportError;
use crate::output::{csv_bytes, json_bytes};
use crate::report::{assemble, ReportPayload};
use crate::state::Dashboard;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct PreparedExport {
    pub payload: ReportPayload,
    pub pdf: Vec<u8>,
    pub docx: Vec<u8>,
    pub json: Vec<u8>,
    pub series_csv: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFiles {
    pub pdf: PathBuf,
    pub docx: PathBuf,
    pub json: PathBuf,
    pub series_csv: PathBuf,
}

impl ExportedFiles {
    fn new(out_dir: &Path, stem: &str) -> Self {
        Self {
            pdf: out_dir.join(format!("{}.pdf", stem)),
            docx: out_dir.join(format!("{}.docx", stem)),
            json: out_dir.join(format!("{}.json", stem)),
            series_csv: out_dir.join(format!("{}_serie.csv", stem)),
        }
    }

    pub fn all(&self) -> [&Path; 4] {
        [
            self.pdf.as_path(),
            self.docx.as_path(),
            self.json.as_path(),
            self.series_csv.as_path(),
        ]
    }
}

/// Build both documents for the current selection.
pub fn prepare(dashboard: &Dashboard, render_charts: bool) -> Result<PreparedExport, ExportError> {
    if !dashboard.has_data() {
        return Err(ExportError::MissingData(
            "No hay datos cargados; cargue un archivo antes de exportar.".to_string(),
        ));
    }
    let group = dashboard.aggregate().ok_or_else(|| {
        ExportError::MissingData("La selección actual no tiene registros.".to_string())
    })?;

    let images = if render_charts {
        charts::render_all(&group, dashboard.dataset())?
    } else {
        Vec::new()
    };
    let payload = assemble(&group, dashboard.dataset(), dashboard.generation(), &images)?;

    let pdf = pdf::render_pdf(&pdf::pdf_layout(&payload))?;
    let docx = docx::render_docx(&docx::docx_document(&payload))?;
    let json = json_bytes(&payload)?;
    let series_csv = csv_bytes(&payload.series)?;
    info!(
        "prepared '{}' (pdf {} bytes, docx {} bytes, {} charts)",
        payload.file_stem,
        pdf.len(),
        docx.len(),
        images.len()
    );

    Ok(PreparedExport {
        payload,
        pdf,
        docx,
        json,
        series_csv,
    })
}

/// Write a prepared export to `out_dir`. Nothing is written when the
/// dashboard has ingested new data since `prepare`.
pub fn write(
    prepared: &PreparedExport,
    dashboard: &Dashboard,
    out_dir: &Path,
) -> Result<ExportedFiles, ExportError> {
    if prepared.payload.generation != dashboard.generation() {
        warn!(
            "discarding export of generation {} (current {})",
            prepared.payload.generation,
            dashboard.generation()
        );
        return Err(ExportError::Stale);
    }

    fs::create_dir_all(out_dir)?;
    let files = ExportedFiles::new(out_dir, &prepared.payload.file_stem);
    let contents: [&[u8]; 4] = [
        &prepared.pdf,
        &prepared.docx,
        &prepared.json,
        &prepared.series_csv,
    ];
    write_all_or_nothing(&files.all(), &contents)?;
    info!("wrote {}", files.pdf.display());
    Ok(files)
}

/// Hidden sibling of `target` used while the export is being staged.
fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.tmp", name))
}

fn discard<'a>(paths: impl IntoIterator<Item = &'a Path>) {
    for p in paths {
        if let Err(e) = fs::remove_file(p) {
            warn!("could not remove {}: {}", p.display(), e);
        }
    }
}

/// Stage every file under a temporary name and move them into place only
/// once all of them are on disk. On failure the staged files and any target
/// already moved are removed.
fn write_all_or_nothing(targets: &[&Path], contents: &[&[u8]]) -> Result<(), ExportError> {
    let mut staged: Vec<PathBuf> = Vec::with_capacity(targets.len());
    for (target, bytes) in targets.iter().zip(contents) {
        let tmp = staging_path(target);
        if let Err(e) = fs::write(&tmp, bytes) {
            discard(staged.iter().map(PathBuf::as_path));
            return Err(e.into());
        }
        staged.push(tmp);
    }

    for (i, (tmp, target)) in staged.iter().zip(targets).enumerate() {
        if let Err(e) = fs::rename(tmp, target) {
            warn!("could not move {} into place: {}", target.display(), e);
            discard(targets[..i].iter().copied());
            discard(staged[i..].iter().map(PathBuf::as_path));
            return Err(e.into());
        }
    }
    Ok(())
}

/// Prepare and write in one step.
pub fn export(
    dashboard: &Dashboard,
    out_dir: &Path,
    render_charts: bool,
) -> Result<ExportedFiles, ExportError> {
    let prepared = prepare(dashboard, render_charts)?;
    write(&prepared, dashboard, out_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::{charts, dataset, village_group};
    use crate::types::{Dataset, UnitFilter};
    use std::io::{Cursor, Read};

    fn dashboard() -> Dashboard {
        let mut d = Dashboard::new();
        d.ingest(dataset());
        d.select_unit(UnitFilter::Unit("Guasca".into()));
        assert!(d.select_sub_unit(Some("El Salitre".into())));
        assert!(d.select_year(2030));
        d
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn nothing_loaded_is_missing_data() {
        let err = prepare(&Dashboard::new(), false).unwrap_err();
        assert!(matches!(err, ExportError::MissingData(_)));
    }

    #[test]
    fn empty_selection_is_missing_data() {
        let mut d = Dashboard::new();
        d.ingest(dataset());
        d.select_unit(UnitFilter::Unit("Tocancipá".into()));
        let err = prepare(&d, false).unwrap_err();
        assert!(matches!(err, ExportError::MissingData(_)));
    }

    #[test]
    fn both_documents_carry_the_same_values_and_images() {
        let d = dashboard();
        let ds = d.dataset();
        let payload = assemble(&village_group(ds), ds, d.generation(), &charts()).unwrap();
        let pdf = pdf::render_pdf(&pdf::pdf_layout(&payload)).unwrap();
        let docx_bytes = docx::render_docx(&docx::docx_document(&payload)).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(docx_bytes.as_slice())).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();

        for k in &payload.kpis {
            assert!(xml.contains(&k.value), "docx missing {}", k.value);
            // WinAnsi leaves ASCII untouched
            if k.value.is_ascii() {
                assert!(contains(&pdf, k.value.as_bytes()), "pdf missing {}", k.value);
            }
        }

        let population = payload.population.chart.as_ref().unwrap();
        let mut media = Vec::new();
        archive
            .by_name("word/media/image2.png")
            .unwrap()
            .read_to_end(&mut media)
            .unwrap();
        assert_eq!(media, population.png);
        assert_eq!(pdf::pdf_layout(&payload).images[0], *population);
    }

    #[test]
    fn export_writes_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let d = dashboard();
        let files = export(&d, dir.path(), false).unwrap();
        assert!(files.pdf.ends_with("ficha_Guasca_El_Salitre.pdf"));
        for path in files.all() {
            assert!(path.exists(), "{}", path.display());
        }
        let csv = fs::read_to_string(&files.series_csv).unwrap();
        assert!(csv.contains("2030,\"1,620\",108"));
    }

    #[test]
    fn stale_exports_are_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = dashboard();
        let prepared = prepare(&d, false).unwrap();
        d.ingest(Dataset::default());
        let err = write(&prepared, &d, dir.path()).unwrap_err();
        assert!(matches!(err, ExportError::Stale));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn a_failed_write_leaves_no_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        let d = dashboard();
        let prepared = prepare(&d, false).unwrap();
        // a directory where the series CSV should go makes the last move fail
        let blocker = dir.path().join("ficha_Guasca_El_Salitre_serie.csv");
        fs::create_dir(&blocker).unwrap();

        let err = write(&prepared, &d, dir.path()).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
        let left: Vec<PathBuf> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(left, vec![blocker]);
    }

    #[test]
    fn staging_files_are_hidden_siblings() {
        let target = Path::new("out/ficha_todos.pdf");
        assert_eq!(staging_path(target), Path::new("out/.ficha_todos.pdf.tmp"));
    }
}
