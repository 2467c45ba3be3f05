use anyhow::{Context, Result};
use serde::Serialize;

use super::GlobalOptions;
use crate::capture::{DESCRIPTION_FIELD, WHO_FIELD};
use crate::record::{Entry, FieldValue, Fingerprint, Record};

#[derive(Serialize)]
struct EntryView<'a> {
    fingerprint: &'a Fingerprint,
    record: &'a Record,
}

impl<'a> From<&'a Entry> for EntryView<'a> {
    fn from(entry: &'a Entry) -> Self {
        Self {
            fingerprint: &entry.fingerprint,
            record: &entry.record,
        }
    }
}

pub fn run_list(options: &GlobalOptions, json: bool) -> Result<()> {
    let bridge = options.open_active()?;
    let entries = bridge.entries();

    if json {
        let views: Vec<EntryView> = entries.iter().map(EntryView::from).collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No records stored yet.");
        return Ok(());
    }

    for entry in &entries {
        let record = &entry.record;
        let title = record
            .text("issue_name")
            .or_else(|| record.text("url"))
            .unwrap_or_default();
        println!(
            "{}  {:<16}  {:<12}  {}",
            entry.fingerprint.short(12),
            record.kind().unwrap_or_default(),
            record.text(WHO_FIELD).unwrap_or_default(),
            title
        );
    }
    println!("\n{} record(s)", entries.len());

    Ok(())
}

pub fn run_show(options: &GlobalOptions, prefix: &str, json: bool) -> Result<()> {
    let bridge = options.open_active()?;
    let fingerprint = bridge.resolve_fingerprint(prefix)?;
    let entry = bridge
        .get(&fingerprint)
        .with_context(|| format!("Record {} disappeared while loading", fingerprint))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&EntryView::from(&entry))?);
        return Ok(());
    }

    println!("🔎 {}", entry.fingerprint);
    print_fields(&entry.record, 1);
    if entry
        .record
        .text(DESCRIPTION_FIELD)
        .map_or(true, |d| d.trim().is_empty())
    {
        println!("\n   (no description)");
    }

    Ok(())
}

fn print_fields(record: &Record, depth: usize) {
    let indent = "   ".repeat(depth);
    for (name, value) in record.fields() {
        match value {
            FieldValue::Scalar(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                if text.contains('\n') {
                    println!("{}{}:", indent, name);
                    for line in text.lines() {
                        println!("{}   | {}", indent, line);
                    }
                } else {
                    println!("{}{}: {}", indent, name, text);
                }
            }
            FieldValue::Record(nested) => {
                println!("{}{}:", indent, name);
                print_fields(nested, depth + 1);
            }
            FieldValue::List(items) => {
                println!("{}{}: [{} item(s)]", indent, name, items.len());
                for (i, item) in items.iter().enumerate() {
                    println!("{}   #{}", indent, i);
                    print_fields(item, depth + 2);
                }
            }
        }
    }
}
