// Chart rasters for the ficha.
//
// Each chart is drawn into an in-memory RGB buffer, encoded as PNG and
// handed to the exporters as a data URL keyed by its section.
use crate::aggregate::class_distribution;
use crate::config::{CHART_HEIGHT, CHART_WIDTH, TASA_R_YEARS, YEAR_MAX, YEAR_MIN};
use crate::error::ExportError;
use crate::export::image::{encode_data_url, ChartImage};
use crate::report::{CHART_DENSITY, CHART_DISTRIBUTION, CHART_MUNICIPALITIES, CHART_POPULATION};
use crate::types::{AggregatedGroup, ClassCountRow, Dataset, TasaRRow};
use crate::util::format_rounded;
use image::{ImageFormat, RgbImage};
use log::debug;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use std::error::Error;
use std::io::Cursor;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type DrawResult = Result<(), Box<dyn Error>>;

const INDIGO: RGBColor = RGBColor(99, 102, 241);
const EMERALD: RGBColor = RGBColor(52, 211, 153);
const CLASS_COLORS: [RGBColor; 4] = [
    RGBColor(96, 165, 250),
    RGBColor(52, 211, 153),
    RGBColor(251, 191, 36),
    RGBColor(239, 68, 68),
];
const SERIES_COLORS: [RGBColor; 10] = [
    RGBColor(34, 197, 94),
    RGBColor(6, 182, 212),
    RGBColor(234, 179, 8),
    RGBColor(239, 68, 68),
    RGBColor(79, 70, 229),
    RGBColor(139, 92, 246),
    RGBColor(244, 114, 182),
    RGBColor(16, 185, 129),
    RGBColor(245, 158, 66),
    RGBColor(99, 102, 241),
];

fn paint<F>(root: &Area, draw: F) -> DrawResult
where
    F: FnOnce(&Area) -> DrawResult,
{
    root.fill(&WHITE)?;
    draw(root)?;
    root.present()?;
    Ok(())
}

/// Draw into a fresh bitmap and return it as a PNG data URL.
fn render<F>(key: &str, width: u32, height: u32, draw: F) -> Result<ChartImage, ExportError>
where
    F: FnOnce(&Area) -> DrawResult,
{
    let fail = |reason: String| ExportError::ChartRender {
        name: key.to_string(),
        reason,
    };

    let mut buf = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
        paint(&root, draw).map_err(|e| fail(e.to_string()))?;
    }

    let img = RgbImage::from_raw(width, height, buf)
        .ok_or_else(|| fail("bitmap size mismatch".to_string()))?;
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| fail(e.to_string()))?;
    debug!("chart '{}' rendered ({} bytes)", key, png.len());

    Ok(ChartImage {
        key: key.to_string(),
        data_url: encode_data_url(&png),
    })
}

fn year_range(points: &[(f64, f64)]) -> (f64, f64) {
    let lo = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let hi = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    if lo.is_finite() && hi.is_finite() {
        (lo - 0.5, hi + 0.5)
    } else {
        (YEAR_MIN as f64 - 0.5, YEAR_MAX as f64 + 0.5)
    }
}

fn value_ceiling<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    let max = values.copied().fold(0.0, f64::max);
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

/// Population points as plotted: whole inhabitants, like the KPIs.
fn population_points(group: &AggregatedGroup) -> Vec<(f64, f64)> {
    group
        .population_by_year
        .iter()
        .map(|(y, p)| (*y as f64, p.round()))
        .collect()
}

pub fn population_chart(group: &AggregatedGroup) -> Result<ChartImage, ExportError> {
    let points = population_points(group);
    let (x0, x1) = year_range(&points);
    let y1 = value_ceiling(points.iter().map(|p| &p.1));

    render(CHART_POPULATION, CHART_WIDTH, CHART_HEIGHT, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Población proyectada", ("sans-serif", 20).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(x0..x1, 0.0..y1)?;
        chart
            .configure_mesh()
            .x_desc("Año")
            .y_desc("Habitantes")
            .x_label_formatter(&|x| format!("{:.0}", x))
            .y_label_formatter(&|y| format_rounded(*y))
            .draw()?;
        chart.draw_series(LineSeries::new(points.iter().copied(), INDIGO.stroke_width(2)))?;
        chart.draw_series(points.iter().map(|p| Circle::new(*p, 3, INDIGO.filled())))?;
        Ok(())
    })
}

pub fn density_chart(group: &AggregatedGroup) -> Result<ChartImage, ExportError> {
    let points: Vec<(f64, f64)> = group
        .density_by_year
        .iter()
        .map(|(y, d)| (*y as f64, *d))
        .collect();
    let (x0, x1) = year_range(&points);
    let y1 = value_ceiling(group.density_by_year.values());

    render(CHART_DENSITY, CHART_WIDTH, CHART_HEIGHT, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Densidad poblacional (hab/km²)", ("sans-serif", 20).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(x0..x1, 0.0..y1)?;
        chart
            .configure_mesh()
            .x_desc("Año")
            .y_desc("hab/km²")
            .x_label_formatter(&|x| format!("{:.0}", x))
            .draw()?;
        chart.draw_series(points.iter().map(|&(x, d)| {
            Rectangle::new([(x - 0.35, 0.0), (x + 0.35, d)], EMERALD.filled())
        }))?;
        Ok(())
    })
}

pub fn distribution_chart(counts: &[ClassCountRow]) -> Result<ChartImage, ExportError> {
    let slices: Vec<(f64, RGBColor, String)> = counts
        .iter()
        .zip(CLASS_COLORS)
        .filter(|(c, _)| c.count > 0)
        .map(|(c, color)| (c.count as f64, color, c.label.clone()))
        .collect();

    render(CHART_DISTRIBUTION, CHART_WIDTH, CHART_HEIGHT, |root| {
        let (w, h) = root.dim_in_pixel();
        if slices.is_empty() {
            root.draw(&Text::new(
                "Sin veredas para clasificar",
                (w as i32 / 2 - 100, h as i32 / 2),
                ("sans-serif", 18).into_font(),
            ))?;
            return Ok(());
        }
        let center = (w as i32 / 2, h as i32 / 2);
        let radius = h as f64 * 0.35;
        let sizes: Vec<f64> = slices.iter().map(|s| s.0).collect();
        let colors: Vec<RGBColor> = slices.iter().map(|s| s.1).collect();
        let labels: Vec<String> = slices.iter().map(|s| s.2.clone()).collect();
        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.label_style(("sans-serif", 14).into_font().color(&BLACK));
        pie.percentages(("sans-serif", 12).into_font().color(&WHITE));
        root.draw(&pie)?;
        Ok(())
    })
}

pub fn municipalities_chart(rows: &[TasaRRow]) -> Result<ChartImage, ExportError> {
    let series: Vec<(String, Vec<(f64, f64)>)> = rows
        .iter()
        .map(|r| {
            let points = TASA_R_YEARS
                .iter()
                .zip(r.populations.iter())
                .filter_map(|(y, p)| p.map(|p| (*y as f64, p)))
                .collect();
            (r.unit.clone(), points)
        })
        .collect();
    let all: Vec<(f64, f64)> = series.iter().flat_map(|(_, p)| p.iter().copied()).collect();
    let (x0, x1) = year_range(&all);
    let y1 = value_ceiling(all.iter().map(|p| &p.1));

    render(CHART_MUNICIPALITIES, 800, 400, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Población proyectada por municipio", ("sans-serif", 20).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(70)
            .build_cartesian_2d(x0..x1, 0.0..y1)?;
        chart
            .configure_mesh()
            .x_desc("Año")
            .y_desc("Habitantes")
            .x_label_formatter(&|x| format!("{:.0}", x))
            .y_label_formatter(&|y| format_rounded(*y))
            .draw()?;
        for (i, (unit, points)) in series.iter().enumerate() {
            let color = SERIES_COLORS[i % SERIES_COLORS.len()];
            chart
                .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
                .label(unit.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    })
}

/// Every chart of the ficha for one group. The municipalities chart is only
/// drawn when the workbook carries a TASA_R sheet.
pub fn render_all(group: &AggregatedGroup, dataset: &Dataset) -> Result<Vec<ChartImage>, ExportError> {
    let mut charts = vec![
        population_chart(group)?,
        density_chart(group)?,
        distribution_chart(&class_distribution(dataset, group.reference_year))?,
    ];
    if !dataset.tasa_r.is_empty() {
        charts.push(municipalities_chart(&dataset.tasa_r)?);
    }
    Ok(charts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::{dataset, village_group};

    #[test]
    fn population_points_are_whole_inhabitants() {
        let mut group = village_group(&dataset());
        group.population_by_year.insert(2031, 1650.6);
        let points = population_points(&group);
        assert!(points.contains(&(2031.0, 1651.0)));
        assert!(points.iter().all(|(_, p)| p.fract() == 0.0));
    }
}
