//! SVG charts drawn with plotters.
//!
//! Every chart uses plain f64 axes; time values are mapped to positions and
//! turned back into labels by the axis formatters.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::error::Error;

use crate::dashboard::stats::{SlaBucket, SlaStatus};
use crate::error::{PipelineError, PipelineResult};
use crate::models::dashboard::{GoldRecord, SilverRecord};

pub const CHART_WIDTH: u32 = 640;
pub const CHART_HEIGHT: u32 = 360;

pub const COLOR_BITCOIN: RGBColor = RGBColor(0xF7, 0x93, 0x1A);
pub const COLOR_SUCCESS: RGBColor = RGBColor(0x28, 0xA7, 0x45);
pub const COLOR_MA7: RGBColor = RGBColor(0x63, 0x6E, 0xFA);
pub const COLOR_ERROR: RGBColor = RGBColor(0xEF, 0x55, 0x3B);
const COLOR_SLA_LINE: RGBColor = RGBColor(0x55, 0x55, 0x55);

type DrawResult = Result<(), Box<dyn Error>>;

pub fn hex(color: &RGBColor) -> String {
    format!("#{:02X}{:02X}{:02X}", color.0, color.1, color.2)
}

fn render_svg<F>(draw: F) -> PipelineResult<String>
where
    F: FnOnce(&DrawingArea<SVGBackend, Shift>) -> DrawResult,
{
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| PipelineError::Render(format!("Failed to fill canvas: {}", e)))?;
        draw(&root).map_err(|e| PipelineError::Render(e.to_string()))?;
        root.present()
            .map_err(|e| PipelineError::Render(format!("Failed to render chart: {}", e)))?;
    }
    Ok(svg)
}

/// Range padded by 10% so lines never sit on the frame.
fn padded_range(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let min = values.clone().fold(f64::INFINITY, f64::min);
    let max = values.fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let padding = (max - min).max(1e-8) * 0.1;
    (min - padding, max + padding)
}

fn x_range(min: f64, max: f64) -> std::ops::Range<f64> {
    if max > min { min..max } else { (min - 0.5)..(max + 0.5) }
}

fn day_label(days: &[NaiveDate], x: f64) -> String {
    if x < 0.0 || (x - x.round()).abs() > 1e-6 {
        return String::new();
    }
    days.get(x.round() as usize)
        .map(|d| d.format("%d/%m").to_string())
        .unwrap_or_default()
}

/// Silver price trend, oldest to newest.
pub fn price_trend_svg(rows: &[SilverRecord], tz: Tz) -> PipelineResult<String> {
    let mut points: Vec<(f64, f64)> = rows
        .iter()
        .map(|r| (r.price_timestamp.timestamp() as f64, r.price_usd))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let (y_min, y_max) = padded_range(points.iter().map(|p| p.1));
    let x_min = points.first().map(|p| p.0).unwrap_or(0.0);
    let x_max = points.last().map(|p| p.0).unwrap_or(1.0);

    let time_label = |x: &f64| {
        DateTime::<Utc>::from_timestamp(*x as i64, 0)
            .map(|dt| dt.with_timezone(&tz).format("%d/%m %H:%M").to_string())
            .unwrap_or_default()
    };

    render_svg(|root| {
        let mut chart = ChartBuilder::on(root)
            .caption("1. Price trend", ("sans-serif", 22))
            .margin(12)
            .x_label_area_size(36)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range(x_min, x_max), y_min..y_max)?;

        chart
            .configure_mesh()
            .x_labels(6)
            .x_label_formatter(&time_label)
            .y_desc("Price (USD)")
            .draw()?;

        chart.draw_series(LineSeries::new(points.iter().copied(), COLOR_BITCOIN.stroke_width(2)))?;
        Ok(())
    })
}

fn sla_bars_svg(
    title: &str,
    buckets: &[SlaBucket],
    threshold: i64,
    compliant_color: RGBColor,
    x_label: &dyn Fn(&f64) -> String,
) -> PipelineResult<String> {
    let x_min = buckets.first().map(|b| b.position).unwrap_or(0.0) - 0.5;
    let x_max = buckets.last().map(|b| b.position).unwrap_or(0.0) + 0.5;
    let y_max = buckets
        .iter()
        .map(|b| b.count)
        .max()
        .unwrap_or(0)
        .max(threshold) as f64
        * 1.15;

    render_svg(|root| {
        let mut chart = ChartBuilder::on(root)
            .caption(title, ("sans-serif", 22))
            .margin(12)
            .x_label_area_size(36)
            .y_label_area_size(50)
            .build_cartesian_2d(x_min..x_max, 0.0..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(buckets.len().clamp(2, 24))
            .x_label_formatter(x_label)
            .y_desc("Samples")
            .draw()?;

        chart
            .draw_series(buckets.iter().map(|b| {
                let color = match b.status {
                    SlaStatus::Compliant => compliant_color,
                    SlaStatus::BelowThreshold => COLOR_ERROR,
                };
                Rectangle::new(
                    [(b.position - 0.35, 0.0), (b.position + 0.35, b.count as f64)],
                    color.filled(),
                )
            }))?
            .label("Actual")
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], compliant_color.filled()));

        chart
            .draw_series(LineSeries::new(
                vec![(x_min, threshold as f64), (x_max, threshold as f64)],
                COLOR_SLA_LINE.stroke_width(2),
            ))?
            .label(format!("SLA target ({})", threshold))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], COLOR_SLA_LINE));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    })
}

/// Samples per local hour against the hourly SLA.
pub fn hourly_ingestion_svg(buckets: &[SlaBucket], threshold: i64) -> PipelineResult<String> {
    let hour_label = |x: &f64| {
        if *x >= 0.0 && (x - x.round()).abs() < 1e-6 {
            format!("{:02}h", x.round() as u32)
        } else {
            String::new()
        }
    };
    sla_bars_svg("2. Ingestion stability", buckets, threshold, COLOR_SUCCESS, &hour_label)
}

/// Samples per day against the daily SLA, red below threshold.
pub fn daily_ingestion_svg(rows: &[GoldRecord], buckets: &[SlaBucket], threshold: i64) -> PipelineResult<String> {
    let days: Vec<NaiveDate> = rows.iter().map(|r| r.data_referencia).collect();
    let label = |x: &f64| day_label(&days, *x);
    sla_bars_svg("3. Pipeline health (daily ingestion)", buckets, threshold, COLOR_BITCOIN, &label)
}

/// Daily close with the 7-day moving average.
pub fn market_trend_svg(rows: &[GoldRecord]) -> PipelineResult<String> {
    let days: Vec<NaiveDate> = rows.iter().map(|r| r.data_referencia).collect();
    let label = |x: &f64| day_label(&days, *x);
    let (y_min, y_max) = padded_range(
        rows.iter()
            .flat_map(|r| [r.preco_fechamento_usd, r.media_movel_7d]),
    );

    render_svg(|root| {
        let mut chart = ChartBuilder::on(root)
            .caption("1. Market trend", ("sans-serif", 22))
            .margin(12)
            .x_label_area_size(36)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range(0.0, rows.len().saturating_sub(1) as f64), y_min..y_max)?;

        chart
            .configure_mesh()
            .x_label_formatter(&label)
            .y_desc("Price (USD)")
            .draw()?;

        chart
            .draw_series(LineSeries::new(
                rows.iter().enumerate().map(|(i, r)| (i as f64, r.preco_fechamento_usd)),
                COLOR_BITCOIN.stroke_width(2),
            ))?
            .label("Close (gold)")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], COLOR_BITCOIN));

        chart
            .draw_series(LineSeries::new(
                rows.iter().enumerate().map(|(i, r)| (i as f64, r.media_movel_7d)),
                COLOR_MA7.stroke_width(1),
            ))?
            .label("Moving average (7d)")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], COLOR_MA7));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    })
}

/// Daily min/max band with the daily mean on top.
pub fn price_envelope_svg(rows: &[GoldRecord]) -> PipelineResult<String> {
    let days: Vec<NaiveDate> = rows.iter().map(|r| r.data_referencia).collect();
    let label = |x: &f64| day_label(&days, *x);
    let (y_min, y_max) = padded_range(
        rows.iter()
            .flat_map(|r| [r.preco_minimo_usd, r.preco_maximo_usd]),
    );

    let band: Vec<(f64, f64)> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (i as f64, r.preco_maximo_usd))
        .chain(
            rows.iter()
                .enumerate()
                .rev()
                .map(|(i, r)| (i as f64, r.preco_minimo_usd)),
        )
        .collect();

    render_svg(|root| {
        let mut chart = ChartBuilder::on(root)
            .caption("2. Daily volatility (price envelope)", ("sans-serif", 22))
            .margin(12)
            .x_label_area_size(36)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range(0.0, rows.len().saturating_sub(1) as f64), y_min..y_max)?;

        chart
            .configure_mesh()
            .x_label_formatter(&label)
            .y_desc("Price (USD)")
            .draw()?;

        if !band.is_empty() {
            chart.draw_series(std::iter::once(Polygon::new(band.clone(), COLOR_BITCOIN.mix(0.2).filled())))?;
        }

        chart
            .draw_series(LineSeries::new(
                rows.iter().enumerate().map(|(i, r)| (i as f64, r.preco_medio_usd)),
                COLOR_BITCOIN.stroke_width(3),
            ))?
            .label("Daily mean price")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], COLOR_BITCOIN));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    })
}
