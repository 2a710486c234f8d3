//! CSV and JSON renderings of a shopping list.

use std::collections::BTreeSet;

use chrono::SecondsFormat;
use serde::Serialize;

use super::aggregate::compare_names;
use super::dto::{CsvExportOptions, JsonExportOptions, ShoppingList, ShoppingListItem};
use crate::db::format_date;
use crate::error::AppResult;

/// Quotes a field holding a comma, double quote, newline or semicolon,
/// doubling inner quotes. Semicolons are included for spreadsheet locales
/// that use them as the separator.
pub fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', ';']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_row<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| escape_csv_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

fn format_quantity(quantity: f64) -> String {
    format!("{}", quantity)
}

pub fn to_csv(list: &ShoppingList, options: &CsvExportOptions) -> String {
    let mut items: Vec<&ShoppingListItem> = list.items.iter().collect();
    if options.sort_by_category {
        items.sort_by(|a, b| {
            a.category
                .display_name()
                .cmp(&b.category.display_name())
                .then_with(|| compare_names(&a.product_name, &b.product_name))
        });
    } else {
        items.sort_by(|a, b| compare_names(&a.product_name, &b.product_name));
    }

    // YYYY-MM-DD sorts chronologically as text
    let dates: BTreeSet<String> = if options.include_daily_breakdown {
        items
            .iter()
            .flat_map(|item| item.by_date.iter().map(|d| format_date(d.date)))
            .collect()
    } else {
        BTreeSet::new()
    };

    let mut lines: Vec<String> = Vec::with_capacity(items.len() + 12);

    if options.include_header {
        let mut header: Vec<String> = ["Categoria", "Producto", "Cantidad", "Unidad"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        if options.include_notes {
            header.push("Notas".to_string());
        }
        header.extend(dates.iter().cloned());
        lines.push(csv_row(header));
    }

    for item in &items {
        let mut row = vec![
            item.category.display_name(),
            item.product_name.clone(),
            format_quantity(item.total_quantity),
            item.unit.label().to_string(),
        ];
        if options.include_notes {
            row.push(item.notes.clone().unwrap_or_default());
        }
        for date in &dates {
            let quantity = item
                .by_date
                .iter()
                .find(|d| format_date(d.date) == *date)
                .map_or(0.0, |d| d.quantity);
            row.push(format_quantity(quantity));
        }
        lines.push(csv_row(row));
    }

    lines.push(String::new());
    lines.push("--- RESUMEN ---".to_string());
    lines.push(csv_row(["Viaje", list.trip_name.as_str()]));
    lines.push(csv_row(["Fecha inicio".to_string(), format_date(list.start_date)]));
    lines.push(csv_row(["Fecha fin".to_string(), format_date(list.end_date)]));
    lines.push(csv_row(["Total días".to_string(), list.total_days.to_string()]));
    lines.push(csv_row(["Participantes".to_string(), list.participant_count.to_string()]));
    lines.push(csv_row(["Total productos".to_string(), list.total_items.to_string()]));
    lines.push(csv_row(["Productos esenciales".to_string(), list.essential_items.to_string()]));
    lines.push(csv_row(["Productos opcionales".to_string(), list.optional_items.to_string()]));
    lines.push(csv_row([
        "Generado".to_string(),
        list.generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    ]));

    lines.join("\n")
}

pub fn to_json(list: &ShoppingList, options: &JsonExportOptions) -> AppResult<String> {
    if !options.pretty {
        return Ok(serde_json::to_string(list)?);
    }

    let indent = " ".repeat(options.indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    list.serialize(&mut serializer)?;

    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
