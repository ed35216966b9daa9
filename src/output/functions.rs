// Template function library
//
// Filters and functions available to every layout and content template.
// Row values are always strings, so numeric helpers accept numeric text.

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::fmt::{self, Write};
use tera::{Tera, Value};

type FilterFn = fn(&Value, &HashMap<String, Value>) -> tera::Result<Value>;
type FunctionFn = fn(&HashMap<String, Value>) -> tera::Result<Value>;

/// Date layouts tried in order by `format_date`
const DATE_LAYOUTS: [&str; 4] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Immutable set of filters and functions installed into each template engine
#[derive(Clone)]
pub struct FunctionLibrary {
    filters: Vec<(&'static str, FilterFn)>,
    functions: Vec<(&'static str, FunctionFn)>,
}

impl FunctionLibrary {
    /// The standard library shipped with studysite
    pub fn standard() -> Self {
        Self {
            filters: vec![
                ("parse_options", parse_options_filter),
                ("format_year", format_year_filter),
                ("format_date", format_date_filter),
                ("upper_first", upper_first_filter),
                ("has_prefix", has_prefix),
                ("has_suffix", has_suffix),
                ("trim_prefix", trim_prefix),
                ("trim_suffix", trim_suffix),
                ("contains", contains),
                ("split_on", split_on),
                ("substr", substr),
            ],
            functions: vec![("add", add), ("sub", sub), ("gt", gt), ("lt", lt)],
        }
    }

    /// An empty library
    pub fn empty() -> Self {
        Self {
            filters: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Add a filter, replacing one with the same name
    pub fn with_filter(mut self, name: &'static str, filter: FilterFn) -> Self {
        self.filters.retain(|(n, _)| *n != name);
        self.filters.push((name, filter));
        self
    }

    /// Names of all registered filters and functions
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.filters
            .iter()
            .map(|(n, _)| *n)
            .chain(self.functions.iter().map(|(n, _)| *n))
    }

    /// Register everything into a Tera instance
    pub fn install(&self, tera: &mut Tera) {
        for (name, filter) in &self.filters {
            tera.register_filter(name, *filter);
        }
        for (name, function) in &self.functions {
            tera.register_function(name, *function);
        }
    }
}

impl Default for FunctionLibrary {
    fn default() -> Self {
        Self::standard()
    }
}

/// Parse an option list written either as a bracketed array
/// (`['a', 'b']` or `["a", "b"]`) or as plain comma separated text.
pub fn parse_options(text: &str) -> Vec<String> {
    if text.starts_with('[') && text.ends_with(']') {
        let normalized = text.replace('\'', "\"");
        if let Ok(options) = serde_json::from_str::<Vec<String>>(&normalized) {
            return options;
        }
    }

    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reformat a date string written in one of the known layouts.
/// Text matching none of them is returned unchanged. Fails when `format`
/// asks for something the parsed value cannot render (a bad specifier, or
/// a time zone on a naive date).
pub fn format_date(text: &str, format: &str) -> Result<String, fmt::Error> {
    for layout in DATE_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, layout) {
            return render_date(dt.format(format));
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, layout) {
            return render_date(date.format(format));
        }
    }
    Ok(text.to_string())
}

/// Whether chrono understands every specifier in `format`
pub fn is_valid_date_format(format: &str) -> bool {
    StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}

fn render_date(formatted: impl fmt::Display) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write!(out, "{}", formatted)?;
    Ok(out)
}

/// Uppercase the first character, leaving the rest untouched
pub fn upper_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Char-indexed substring with clamped bounds
pub fn substring(text: &str, start: i64, end: i64) -> String {
    let len = text.chars().count() as i64;
    let start = start.clamp(0, len);
    let end = end.clamp(0, len);
    if start >= end {
        return String::new();
    }
    text.chars()
        .skip(start as usize)
        .take((end - start) as usize)
        .collect()
}

fn parse_options_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let options = parse_options(&as_text(value));
    Ok(Value::Array(options.into_iter().map(Value::String).collect()))
}

fn format_year_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    date_value(&as_text(value), "%Y", "format_year")
}

fn format_date_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let format = args
        .get("format")
        .and_then(Value::as_str)
        .unwrap_or("%Y-%m-%d");
    date_value(&as_text(value), format, "format_date")
}

fn date_value(text: &str, format: &str, name: &str) -> tera::Result<Value> {
    if !is_valid_date_format(format) {
        return Err(tera::Error::msg(format!(
            "`{}` got an invalid date format '{}'",
            name, format
        )));
    }
    format_date(text, format).map(Value::String).map_err(|_| {
        tera::Error::msg(format!(
            "`{}` cannot render '{}' with format '{}'",
            name, text, format
        ))
    })
}

fn upper_first_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(upper_first(&as_text(value))))
}

fn has_prefix(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let prefix = string_arg(args, "has_prefix", "prefix")?;
    Ok(Value::Bool(as_text(value).starts_with(&prefix)))
}

fn has_suffix(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let suffix = string_arg(args, "has_suffix", "suffix")?;
    Ok(Value::Bool(as_text(value).ends_with(&suffix)))
}

fn trim_prefix(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let prefix = string_arg(args, "trim_prefix", "prefix")?;
    let text = as_text(value);
    Ok(Value::String(
        text.strip_prefix(prefix.as_str()).unwrap_or(&text).to_string(),
    ))
}

fn trim_suffix(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let suffix = string_arg(args, "trim_suffix", "suffix")?;
    let text = as_text(value);
    Ok(Value::String(
        text.strip_suffix(suffix.as_str()).unwrap_or(&text).to_string(),
    ))
}

fn contains(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let needle = string_arg(args, "contains", "needle")?;
    Ok(Value::Bool(as_text(value).contains(&needle)))
}

fn split_on(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let sep = string_arg(args, "split_on", "sep")?;
    let parts = as_text(value)
        .split(sep.as_str())
        .map(|part| Value::String(part.to_string()))
        .collect();
    Ok(Value::Array(parts))
}

fn substr(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = as_text(value);
    let start = match args.get("start") {
        Some(v) => int_value(v, "substr", "start")?,
        None => 0,
    };
    let end = match args.get("end") {
        Some(v) => int_value(v, "substr", "end")?,
        None => i64::MAX,
    };
    Ok(Value::String(substring(&text, start, end)))
}

fn add(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let (a, b) = int_pair(args, "add")?;
    Ok(Value::from(a.saturating_add(b)))
}

fn sub(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let (a, b) = int_pair(args, "sub")?;
    Ok(Value::from(a.saturating_sub(b)))
}

fn gt(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let (a, b) = int_pair(args, "gt")?;
    Ok(Value::Bool(a > b))
}

fn lt(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let (a, b) = int_pair(args, "lt")?;
    Ok(Value::Bool(a < b))
}

/// Text form of a template value; strings are taken as-is
fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn string_arg(args: &HashMap<String, Value>, name: &str, key: &str) -> tera::Result<String> {
    args.get(key)
        .map(as_text)
        .ok_or_else(|| tera::Error::msg(format!("`{}` requires a `{}` argument", name, key)))
}

fn int_value(value: &Value, name: &str, key: &str) -> tera::Result<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        tera::Error::msg(format!(
            "`{}` argument `{}` is not an integer: {}",
            name, key, value
        ))
    })
}

fn int_pair(args: &HashMap<String, Value>, name: &str) -> tera::Result<(i64, i64)> {
    let get = |key: &str| {
        args.get(key)
            .ok_or_else(|| tera::Error::msg(format!("`{}` requires a `{}` argument", name, key)))
            .and_then(|v| int_value(v, name, key))
    };
    Ok((get("a")?, get("b")?))
}
