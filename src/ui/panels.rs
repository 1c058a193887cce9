use std::fmt::Write as _;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::analysis::CorrelationRecord;
use crate::artifact::RenderedArtifact;
use crate::plot::PlotKind;

/// Static page shell; fragments below are swapped into it by htmx.
pub const INDEX_HTML: &str = include_str!("../../assets/index.html");

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Upload result: correlation button + plot form
// ---------------------------------------------------------------------------

fn select(id: &str, placeholder: &str, values: &[&str]) -> String {
    let mut html = format!("<select id=\"{id}\" name=\"{id}\">");
    let _ = write!(html, "<option value=\"\" disabled selected>{placeholder}</option>");
    for value in values {
        let value = escape_html(value);
        let _ = write!(html, "<option value=\"{value}\">{value}</option>");
    }
    html.push_str("</select>");
    html
}

fn text_input(id: &str, caption: &str) -> String {
    format!("<p>{caption}</p><input type=\"text\" id=\"{id}\" name=\"{id}\">")
}

/// Returned by `/load-file`, swapped into `#column-selector`. The root
/// carries no id so the page keeps a single `#column-selector`.
pub fn plot_form(columns: &[String], rows: usize) -> String {
    let names: Vec<&str> = columns.iter().map(String::as_str).collect();
    let kinds: Vec<&str> = PlotKind::ALL.iter().map(|k| k.as_str()).collect();

    let mut html = String::from("<div class=\"column-selector-body\">");
    let _ = write!(
        html,
        "<p class=\"summary\">{rows} rows, {} columns</p>",
        columns.len()
    );
    html.push_str(
        "<button id=\"correlation-button\" hx-post=\"/get-correlation\" \
         hx-target=\"#output-div\" hx-swap=\"innerHTML\">Get Correlation</button>",
    );
    html.push_str(
        "<form id=\"plot-selector-form\" hx-post=\"/get-plot\" \
         hx-target=\"#output-div\" hx-swap=\"innerHTML\">",
    );
    html.push_str(&select("column-selector-1", "Select column", &names));
    html.push_str(&select("column-selector-2", "Select column", &names));
    html.push_str(&select("plot-type-selector", "Select plot type", &kinds));
    html.push_str(&text_input("title-input", "Title"));
    html.push_str(&text_input("x-axis-input", "X Axis Title"));
    html.push_str(&text_input("y-axis-input", "Y Axis Title"));
    html.push_str(&text_input("legend-input", "Legend"));
    html.push_str("<button type=\"submit\">Plot</button></form></div>");
    html
}

// ---------------------------------------------------------------------------
// Correlation table
// ---------------------------------------------------------------------------

fn format_coefficient(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

/// Download link plus the ranked table. `csv_text` is the exact text
/// persisted to `corr.csv`.
pub fn correlation_view(records: &[CorrelationRecord], csv_text: &str) -> String {
    let mut html = String::from("<div>");
    let _ = write!(
        html,
        "<a href=\"data:text/csv;base64,{}\" download=\"corr.csv\">Download</a><br>",
        STANDARD.encode(csv_text)
    );
    html.push_str(
        "<table class=\"correlation\"><thead><tr><th></th><th>col1</th><th>col2</th>\
         <th>pearson</th><th>kendall</th><th>spearman</th></tr></thead><tbody>",
    );
    for (rank, r) in records.iter().enumerate() {
        let _ = write!(
            html,
            "<tr><th>{rank}</th><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&r.column_a),
            escape_html(&r.column_b),
            format_coefficient(r.pearson),
            format_coefficient(r.kendall),
            format_coefficient(r.spearman),
        );
    }
    html.push_str("</tbody></table></div>");
    html
}

// ---------------------------------------------------------------------------
// Plot output
// ---------------------------------------------------------------------------

pub fn plot_view(artifact: &RenderedArtifact) -> String {
    let uri = artifact.data_uri();
    format!(
        "<div class=\"box\">\
         <a href=\"{uri}\" download=\"{name}\">Download</a><br>\
         <img id=\"plot-image\" src=\"{uri}\" width=\"{w}\" height=\"{h}\" alt=\"chart\">\
         </div>",
        name = artifact.download_name(),
        w = artifact.width,
        h = artifact.height,
    )
}

pub fn error_view(message: &str) -> String {
    format!("<p class=\"error\">{}</p>", escape_html(message))
}
