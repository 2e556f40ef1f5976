//! HTML assembly for the silver and gold dashboards.

use chrono_tz::Tz;
use std::fmt::Write;

use crate::dashboard::charts::{
    daily_ingestion_svg, hex, hourly_ingestion_svg, market_trend_svg, price_envelope_svg,
    price_trend_svg, COLOR_BITCOIN, COLOR_ERROR, COLOR_SUCCESS,
};
use crate::dashboard::stats::{
    daily_ingestion, hourly_ingestion, silver_kpis, DAILY_SLA, HOURLY_SLA,
};
use crate::error::{PipelineError, PipelineResult};
use crate::models::dashboard::{
    GoldRecord, GoldSummaryResponse, SilverRecord, SilverSummaryResponse,
};

/// Rows shown in the silver sample table
pub const SAMPLE_ROWS: usize = 10;

pub const SILVER_TITLE: &str = "Bitcoin price monitor (silver layer)";
pub const GOLD_TITLE: &str = "Bitcoin daily metrics (gold layer)";

const WINDOW_FORMAT: &str = "%d/%m/%Y %H:%M";

const STYLE: &str = "body{font-family:sans-serif;margin:24px;color:#222}\
h1{margin-bottom:4px}.meta{color:#666;margin-bottom:16px}\
.kpis{display:flex;gap:16px;margin:16px 0}\
.kpi{border:1px solid #ddd;border-radius:6px;padding:12px 16px;min-width:160px}\
.kpi .label{color:#666;font-size:13px}.kpi .value{font-size:22px;font-weight:bold}\
.charts{display:flex;flex-wrap:wrap;gap:16px}\
table{border-collapse:collapse;margin-top:16px}\
td,th{border:1px solid #ddd;padding:4px 10px;text-align:right}\
.notice{padding:12px;background:#fff8e1;border:1px solid #f0c36d}\
.banner{padding:16px;background:#fdecea;border:1px solid #ef553b;color:#611a15}";

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title>\
         <style>{STYLE}</style></head><body>{body}</body></html>",
        title = escape_html(title),
    )
}

fn kpi(label: &str, value: &str) -> String {
    format!(
        "<div class=\"kpi\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>",
        escape_html(label),
        escape_html(value)
    )
}

fn usd(value: f64) -> String {
    format!("$ {:.2}", value)
}

/// Human name for the banner.
fn kind_label(err: &PipelineError) -> &'static str {
    match err {
        PipelineError::Configuration(_) => "Configuration error",
        PipelineError::ExternalService { .. } => "External service error",
        PipelineError::Persistence(_) => "Persistence error",
        PipelineError::Render(_) => "Render error",
    }
}

/// Replaces a whole dashboard when reading, computing or drawing failed.
pub fn render_error_page(title: &str, err: &PipelineError) -> String {
    let hint = match err {
        PipelineError::Configuration(_) => "Check the credential file and environment settings.",
        PipelineError::ExternalService { .. } => "The warehouse could not be queried. Try again later.",
        _ => "The dashboard could not be built.",
    };
    let body = format!(
        "<h1>{}</h1><div class=\"banner\" data-kind=\"{}\"><strong>{}</strong>: {}<br><small>{}</small></div>",
        escape_html(title),
        err.kind(),
        kind_label(err),
        escape_html(&err.to_string()),
        hint
    );
    page(title, &body)
}

/// Silver dashboard. An empty view renders a notice instead of charts.
pub fn render_silver_page(rows: &[SilverRecord], tz: &Tz) -> PipelineResult<String> {
    let title = SILVER_TITLE;
    let mut body = format!("<h1>{}</h1>", title);

    let Some(kpis) = silver_kpis(rows) else {
        body.push_str(
            "<div class=\"notice\">No data in raw_data.bitcoin_prices_silver yet. \
             Run the ingestion job and reload.</div>",
        );
        return Ok(page(title, &body));
    };

    let _ = write!(
        body,
        "<div class=\"meta\">Source: CoinGecko API | Window: {} to {} ({}) | Layer: silver</div>",
        kpis.window_start.format(WINDOW_FORMAT),
        kpis.window_end.format(WINDOW_FORMAT),
        tz.name()
    );

    body.push_str("<div class=\"kpis\">");
    body.push_str(&kpi("Latest price (USD)", &usd(kpis.latest_price)));
    body.push_str(&kpi("Mean price (USD)", &usd(kpis.mean_price)));
    body.push_str(&kpi("Records", &kpis.total_records.to_string()));
    body.push_str("</div>");

    let buckets = hourly_ingestion(rows);
    body.push_str("<div class=\"charts\">");
    body.push_str(&price_trend_svg(rows, *tz)?);
    body.push_str(&hourly_ingestion_svg(&buckets, HOURLY_SLA)?);
    body.push_str("</div>");

    body.push_str("<h2>Sample</h2><table><tr><th>price_timestamp</th><th>price_usd</th><th>source</th></tr>");
    for row in rows.iter().take(SAMPLE_ROWS) {
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{:.2}</td><td>{}</td></tr>",
            row.price_timestamp.format("%Y-%m-%d %H:%M:%S"),
            row.price_usd,
            escape_html(&row.source)
        );
    }
    body.push_str("</table>");

    Ok(page(title, &body))
}

/// Gold dashboard. Rows arrive oldest first; the table shows newest first.
pub fn render_gold_page(rows: &[GoldRecord]) -> PipelineResult<String> {
    let title = GOLD_TITLE;
    let mut body = format!("<h1>{}</h1>", title);

    if rows.is_empty() {
        body.push_str(
            "<div class=\"notice\">No data in raw_data.gold_bitcoin_daily_metrics yet.</div>",
        );
        return Ok(page(title, &body));
    }

    let buckets = daily_ingestion(rows);
    let below = buckets.iter().filter(|b| !b.status.is_compliant()).count();

    body.push_str("<div class=\"kpis\">");
    if let Some(last) = rows.last() {
        body.push_str(&kpi("Latest close (USD)", &usd(last.preco_fechamento_usd)));
    }
    body.push_str(&kpi("Days", &rows.len().to_string()));
    body.push_str(&kpi("Days below SLA", &below.to_string()));
    body.push_str("</div>");

    body.push_str("<div class=\"charts\">");
    body.push_str(&market_trend_svg(rows)?);
    body.push_str(&price_envelope_svg(rows)?);
    body.push_str(&daily_ingestion_svg(rows, &buckets, DAILY_SLA)?);
    body.push_str("</div>");

    body.push_str(
        "<h2>Daily metrics</h2><table><tr><th>data_referencia</th><th>preco_fechamento_usd</th>\
         <th>preco_maximo_usd</th><th>preco_minimo_usd</th><th>preco_medio_usd</th>\
         <th>media_movel_7d</th><th>total_coletas_dia</th></tr>",
    );
    let mut sorted: Vec<&GoldRecord> = rows.iter().collect();
    sorted.sort_by(|a, b| b.data_referencia.cmp(&a.data_referencia));
    for row in sorted {
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td></tr>",
            row.data_referencia.format("%Y-%m-%d"),
            row.preco_fechamento_usd,
            row.preco_maximo_usd,
            row.preco_minimo_usd,
            row.preco_medio_usd,
            row.media_movel_7d,
            row.total_coletas_dia
        );
    }
    body.push_str("</table>");

    Ok(page(title, &body))
}

pub fn silver_summary(rows: &[SilverRecord], tz: &Tz) -> SilverSummaryResponse {
    let kpis = silver_kpis(rows);
    SilverSummaryResponse {
        latest_price_usd: kpis.as_ref().map(|k| k.latest_price),
        mean_price_usd: kpis.as_ref().map(|k| k.mean_price),
        total_records: rows.len(),
        window_start: kpis.as_ref().map(|k| k.window_start.to_rfc3339()),
        window_end: kpis.as_ref().map(|k| k.window_end.to_rfc3339()),
        timezone: tz.name().to_string(),
        hourly_ingestion: hourly_ingestion(rows)
            .iter()
            .map(|b| b.to_entry(&hex(&COLOR_SUCCESS), &hex(&COLOR_ERROR)))
            .collect(),
    }
}

pub fn gold_summary(rows: &[GoldRecord]) -> GoldSummaryResponse {
    let buckets = daily_ingestion(rows);
    GoldSummaryResponse {
        days: rows.len(),
        latest_close_usd: rows.last().map(|r| r.preco_fechamento_usd),
        days_below_sla: buckets.iter().filter(|b| !b.status.is_compliant()).count(),
        daily_ingestion: buckets
            .iter()
            .map(|b| b.to_entry(&hex(&COLOR_BITCOIN), &hex(&COLOR_ERROR)))
            .collect(),
        metrics: rows.to_vec(),
    }
}
