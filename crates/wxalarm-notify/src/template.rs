//! `{{variable}}` expansion for notification messages.
//!
//! Variables resolve from the triggering observation, the baseline it was
//! compared against (`last_*`), and alarm metadata. Unknown tokens are left
//! in place so channel-specific placeholders survive expansion.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use wxalarm_alert::Alarm;
use wxalarm_common::fields::Field;
use wxalarm_common::types::Observation;

/// Used when neither the channel nor the alarm supplies a template.
pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "Alarm '{{alarm_name}}' triggered at {{station}}: {{alarm_condition}} ({{timestamp}})";

const NOT_AVAILABLE: &str = "N/A";

/// How substituted values are escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    /// Plain text, values inserted as-is.
    Text,
    /// HTML email; values are entity-escaped and composites render as tables.
    Html,
    /// Structured payload; values are JSON-string escaped (angle brackets
    /// included) and composites render as JSON objects.
    Json,
}

impl RenderFormat {
    /// Pick HTML when the template itself contains markup.
    pub fn detect(template: &str) -> RenderFormat {
        const MARKERS: [&str; 6] = ["<html>", "<table>", "<div", "<h1>", "<h2>", "<p>"];
        if MARKERS.iter().any(|m| template.contains(m)) {
            RenderFormat::Html
        } else {
            RenderFormat::Text
        }
    }
}

/// Identity of the running application, for `{{app_info}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "wxalarm".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }
}

/// Everything a template can reference.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub alarm: &'a Alarm,
    pub observation: &'a Observation,
    pub previous: Option<&'a Observation>,
    pub station: &'a str,
    pub triggered_count: u64,
    pub app: &'a AppInfo,
    pub now: DateTime<Utc>,
}

/// Every variable name the renderer resolves. The editor offers these for
/// insertion, so names must stay stable.
pub fn variable_names() -> Vec<String> {
    let mut names: Vec<String> = [
        "alarm_name",
        "alarm_description",
        "alarm_condition",
        "alarm_tags",
        "triggered_count",
        "station",
        "timestamp",
        "temperature_f",
        "temperature_c",
        "last_temperature_f",
        "app_info",
        "alarm_info",
        "sensor_info",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for field in Field::ALL {
        names.push(field.name().to_string());
        names.push(format!("last_{}", field.name()));
    }
    names
}

/// Expand every `{{name}}` token in `template`.
///
/// A single left-to-right pass: substituted values are never re-scanned, and
/// unknown or unterminated tokens are copied through unchanged. Braces
/// around a known token stay literal (`{{{alarm_name}}}` gives `{Hot}`).
///
/// # Examples
///
/// ```
/// use wxalarm_notify::template::{render, AppInfo, RenderFormat, TemplateContext};
/// use wxalarm_common::types::Observation;
///
/// let alarm = serde_json::from_str(r#"{"name":"Hot","condition":"temp > 30"}"#).unwrap();
/// let obs = Observation { temperature: 31.26, ..Default::default() };
/// let app = AppInfo::default();
/// let ctx = TemplateContext {
///     alarm: &alarm,
///     observation: &obs,
///     previous: None,
///     station: "Backyard",
///     triggered_count: 1,
///     app: &app,
///     now: chrono::Utc::now(),
/// };
/// assert_eq!(
///     render("{{alarm_name}}: {{temperature}}C (was {{last_temperature}}) {{custom}}", &ctx, RenderFormat::Text),
///     "Hot: 31.3C (was N/A) {{custom}}"
/// );
/// ```
pub fn render(template: &str, ctx: &TemplateContext<'_>, format: RenderFormat) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = after_open[..close].trim();
        match resolve(name, ctx, format) {
            Some(value) => {
                out.push_str(&value);
                rest = &after_open[close + 2..];
            }
            None => {
                // Keep one brace and rescan, so a known token nested after
                // stray braces still expands.
                out.push('{');
                rest = &rest[open + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve(name: &str, ctx: &TemplateContext<'_>, format: RenderFormat) -> Option<String> {
    let scalar = |s: String| Some(escape(&s, format));
    let alarm = ctx.alarm;
    match name {
        "alarm_name" => scalar(alarm.name.clone()),
        "alarm_description" => scalar(alarm.description.clone()),
        "alarm_condition" => scalar(alarm.condition.clone()),
        "alarm_tags" => scalar(tags_text(alarm)),
        "triggered_count" => scalar(ctx.triggered_count.to_string()),
        "station" => scalar(ctx.station.to_string()),
        "timestamp" => scalar(format_timestamp(ctx.observation.timestamp)),
        "temperature_f" => scalar(format!("{:.1}", ctx.observation.temperature_f())),
        "temperature_c" => scalar(format!("{:.1}", ctx.observation.temperature)),
        "last_temperature_f" => scalar(
            ctx.previous
                .map_or_else(|| NOT_AVAILABLE.to_string(), |p| format!("{:.1}", p.temperature_f())),
        ),
        "app_info" => Some(composite(app_info(ctx), format)),
        "alarm_info" => Some(composite(alarm_info(ctx), format)),
        "sensor_info" => Some(composite(sensor_info(ctx), format)),
        other => {
            if let Some(field) = other.strip_prefix("last_").and_then(exact_field) {
                return scalar(last_value(field, ctx));
            }
            let field = exact_field(other)?;
            scalar(field.format_value(field.value(ctx.observation)))
        }
    }
}

/// Template variables use canonical field names only, not aliases.
fn exact_field(name: &str) -> Option<Field> {
    Field::ALL.into_iter().find(|f| f.name() == name)
}

fn last_value(field: Field, ctx: &TemplateContext<'_>) -> String {
    ctx.previous.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |p| field.format_value(field.value(p)),
    )
}

fn tags_text(alarm: &Alarm) -> String {
    if alarm.tags.is_empty() {
        "none".to_string()
    } else {
        alarm.tags.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string()
}

fn escape(value: &str, format: RenderFormat) -> String {
    match format {
        RenderFormat::Text => value.to_string(),
        RenderFormat::Html => escape_html(value),
        RenderFormat::Json => escape_json(value),
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
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

/// Escape for insertion between the quotes of a JSON string literal.
fn escape_json(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            c if u32::from(c) < 0x20 => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out
}

/// A composite variable: one structured value with text and HTML renderings.
struct Composite {
    json: Value,
    text: String,
    html: String,
}

fn composite(c: Composite, format: RenderFormat) -> String {
    match format {
        RenderFormat::Text => c.text,
        RenderFormat::Html => c.html,
        RenderFormat::Json => c
            .json
            .to_string()
            .replace('<', "\\u003c")
            .replace('>', "\\u003e"),
    }
}

fn format_uptime(started_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let uptime = (now - started_at).max(chrono::Duration::zero());
    let days = uptime.num_days();
    let hours = uptime.num_hours() % 24;
    let minutes = uptime.num_minutes() % 60;
    if days > 0 {
        format!("{days} days, {hours} hours, {minutes} minutes")
    } else if hours > 0 {
        format!("{hours} hours, {minutes} minutes")
    } else {
        format!("{minutes} minutes")
    }
}

fn app_info(ctx: &TemplateContext<'_>) -> Composite {
    let app = ctx.app;
    let uptime = format_uptime(app.started_at, ctx.now);
    Composite {
        json: json!({"name": app.name, "version": app.version, "uptime": uptime}),
        text: format!("{} {} | Uptime: {uptime}", app.name, app.version),
        html: format!(
            r#"<div style="font-size: 11px; color: #666; font-family: monospace;"><strong>{}</strong> {} | Uptime: {}</div>"#,
            escape_html(&app.name),
            escape_html(&app.version),
            uptime
        ),
    }
}

fn format_cooldown(secs: u64) -> String {
    if secs >= 3600 {
        format!("{} hours", secs / 3600)
    } else if secs >= 60 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{secs} seconds")
    }
}

fn html_table(rows: &[(String, String)]) -> String {
    let mut html = String::from(r#"<table style="border-collapse: collapse; width: 100%;">"#);
    for (key, value) in rows {
        html.push_str(&format!(
            r#"<tr><td style="padding: 5px; border: 1px solid #ddd; font-weight: bold;">{}</td><td style="padding: 5px; border: 1px solid #ddd;">{}</td></tr>"#,
            escape_html(key),
            escape_html(value)
        ));
    }
    html.push_str("</table>");
    html
}

fn alarm_info(ctx: &TemplateContext<'_>) -> Composite {
    let alarm = ctx.alarm;
    let status = if alarm.enabled { "enabled" } else { "disabled" };
    let cooldown = format_cooldown(alarm.cooldown);
    let tags = tags_text(alarm);
    let rows = vec![
        ("Alarm:".to_string(), alarm.name.clone()),
        ("Description:".to_string(), alarm.description.clone()),
        ("Condition:".to_string(), alarm.condition.clone()),
        ("Status:".to_string(), status.to_string()),
        ("Cooldown:".to_string(), cooldown.clone()),
        ("Tags:".to_string(), tags),
        ("Schedule:".to_string(), alarm.schedule_description()),
    ];
    Composite {
        json: json!({
            "name": alarm.name,
            "description": alarm.description,
            "condition": alarm.condition,
            "status": status,
            "cooldown": cooldown,
            "cooldown_secs": alarm.cooldown,
            "tags": alarm.tags,
            "schedule": alarm.schedule_description(),
            "triggered_count": ctx.triggered_count,
        }),
        text: rows
            .iter()
            .map(|(k, v)| format!("{k} {v}"))
            .collect::<Vec<_>>()
            .join("\n"),
        html: html_table(&rows),
    }
}

/// Integer with thousands separators, e.g. `12,345`.
fn format_thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if value < 0.0 && digits != "0" {
        out.insert(0, '-');
    }
    out
}

fn sensor_info(ctx: &TemplateContext<'_>) -> Composite {
    let obs = ctx.observation;
    let mph = |ms: f64| ms / 0.44704;

    let mut json_fields = Map::new();
    for field in Field::ALL {
        let mut entry = json!({
            "current": field.value(obs),
            "last": ctx.previous.map(|p| field.value(p)),
            "unit": field.unit(),
        });
        if field == Field::WindDirection {
            entry["cardinal"] = json!(obs.wind_cardinal());
        }
        json_fields.insert(field.name().to_string(), entry);
    }

    let current = |field: Field| match field {
        Field::Temperature => format!("{:.1}°F ({:.1}°C)", obs.temperature_f(), obs.temperature),
        Field::WindSpeed => format!("{:.1} mph ({:.1} m/s)", mph(obs.wind_avg), obs.wind_avg),
        Field::WindGust => format!("{:.1} mph ({:.1} m/s)", mph(obs.wind_gust), obs.wind_gust),
        Field::WindDirection => format!("{:.0}° ({})", obs.wind_direction, obs.wind_cardinal()),
        Field::RainDaily => format!("{:.2} in ({:.1} mm)", obs.rain_daily / 25.4, obs.rain_daily),
        Field::Lux => format!("{} lux", format_thousands(obs.illuminance)),
        f => with_unit(f, &f.format_value(f.value(obs))),
    };
    let last = |field: Field| match ctx.previous {
        None => NOT_AVAILABLE.to_string(),
        Some(p) if field == Field::Lux => format!("{} lux", format_thousands(p.illuminance)),
        Some(p) => with_unit(field, &field.format_value(field.value(p))),
    };

    let rows: Vec<(String, String, String)> = Field::ALL
        .into_iter()
        .map(|f| (sensor_label(f).to_string(), current(f), last(f)))
        .collect();

    let text = rows
        .iter()
        .map(|(label, cur, prev)| format!("{label}: {cur} [Last: {prev}]"))
        .collect::<Vec<_>>()
        .join("\n");

    let cell = r#"style="padding: 5px; border: 1px solid #ddd;""#;
    let mut html = format!(
        r#"<table style="border-collapse: collapse; width: 100%;"><tr style="background: #f0f0f0;"><th {cell}>Sensor</th><th {cell}>Current</th><th {cell}>Last</th></tr>"#
    );
    for (label, cur, prev) in &rows {
        html.push_str(&format!(
            "<tr><td {cell}><strong>{}:</strong></td><td {cell}>{}</td><td {cell}>{}</td></tr>",
            escape_html(label),
            escape_html(cur),
            escape_html(prev)
        ));
    }
    html.push_str("</table>");

    Composite {
        json: Value::Object(json_fields),
        text,
        html,
    }
}

fn sensor_label(field: Field) -> &'static str {
    match field {
        Field::Temperature => "Temperature",
        Field::Humidity => "Humidity",
        Field::Pressure => "Pressure",
        Field::WindSpeed => "Wind Speed",
        Field::WindGust => "Wind Gust",
        Field::WindDirection => "Wind Direction",
        Field::Lux => "Illuminance",
        Field::Uv => "UV Index",
        Field::RainRate => "Rain Rate",
        Field::RainDaily => "Daily Rain",
        Field::LightningCount => "Lightning",
        Field::LightningDistance => "Lightning Distance",
    }
}

fn with_unit(field: Field, value: &str) -> String {
    match field.unit() {
        "%" => format!("{value}%"),
        "°" => format!("{value}°"),
        "index" => value.to_string(),
        "°C" => format!("{value}°C"),
        unit => format!("{value} {unit}"),
    }
}
