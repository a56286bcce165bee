// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! PDF rendering of the move log

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::db::{StoredRecord, TIMESTAMP_FORMAT};
use crate::Result;

// A4 in points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const LINE_GAP: i64 = 4;

const TITLE_SIZE: i64 = 18;
const BODY_SIZE: i64 = 10;

// Helvetica covers ASCII only in the standard encoding
const MAX_LINE_CHARS: usize = 95;

struct Line {
    text: String,
    font: &'static str,
    size: i64,
}

impl Line {
    fn title(text: &str) -> Self {
        Self { text: text.to_string(), font: "F2", size: TITLE_SIZE }
    }

    fn bold(text: String) -> Self {
        Self { text, font: "F2", size: BODY_SIZE }
    }

    fn body(text: String) -> Self {
        Self { text, font: "F1", size: BODY_SIZE }
    }

    fn height(&self) -> i64 {
        self.size + LINE_GAP
    }
}

/// Render a report of `records` as a standalone PDF document
pub fn render(title: &str, records: &[StoredRecord]) -> Result<Vec<u8>> {
    let lines = report_lines(title, records);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in paginate(&lines) {
        let content = page_content(page);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

fn report_lines(title: &str, records: &[StoredRecord]) -> Vec<Line> {
    let mut lines = vec![Line::title(&fit(title)), Line::body(String::new())];

    if records.is_empty() {
        lines.push(Line::body("No files have been organized here yet.".to_string()));
        return lines;
    }

    for stored in records {
        let r = &stored.record;
        lines.push(Line::bold(fit(&format!("{} ({})", r.filename, r.category))));
        lines.push(Line::body(fit(&format!("  -> {}", r.destination_path))));
        lines.push(Line::body(format!("  Date: {}", r.timestamp.format(TIMESTAMP_FORMAT))));
        lines.push(Line::body(String::new()));
    }
    lines
}

/// Split lines into pages by available height
fn paginate(lines: &[Line]) -> Vec<&[Line]> {
    let usable = PAGE_HEIGHT - 2 * MARGIN;
    let mut pages = Vec::new();
    let mut start = 0;
    let mut used = 0;

    for (i, line) in lines.iter().enumerate() {
        if used + line.height() > usable && i > start {
            pages.push(&lines[start..i]);
            start = i;
            used = 0;
        }
        used += line.height();
    }
    pages.push(&lines[start..]);
    pages
}

fn page_content(lines: &[Line]) -> Content {
    let mut operations = Vec::with_capacity(lines.len() * 5);
    let mut y = PAGE_HEIGHT - MARGIN;

    for line in lines {
        y -= line.size;
        if !line.text.is_empty() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![Object::Name(line.font.as_bytes().to_vec()), Object::Integer(line.size)],
            ));
            operations.push(Operation::new("Td", vec![Object::Integer(MARGIN), Object::Integer(y)]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(line.text.clone())]));
            operations.push(Operation::new("ET", vec![]));
        }
        y -= LINE_GAP;
    }

    Content { operations }
}

/// Replace characters outside printable ASCII and clip to the page width
fn fit(text: &str) -> String {
    let mut out: String = text
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect();
    if out.len() > MAX_LINE_CHARS {
        out.truncate(MAX_LINE_CHARS - 3);
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MoveRecord;
    use chrono::NaiveDateTime;

    fn stored(id: i64, name: &str) -> StoredRecord {
        StoredRecord {
            id,
            record: MoveRecord {
                filename: name.to_string(),
                category: "Documents".to_string(),
                destination_path: format!("/srv/uploads/Documents/{}", name),
                timestamp: NaiveDateTime::parse_from_str("2024-06-01 12:00:00", TIMESTAMP_FORMAT).unwrap(),
            },
        }
    }

    #[test]
    fn test_empty_report_is_one_page() {
        let bytes = render("File Organizer Report", &[]).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_long_report_spans_pages() {
        let records: Vec<StoredRecord> = (0..120).map(|i| stored(i, &format!("file{}.txt", i))).collect();
        let bytes = render("File Organizer Report", &records).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn test_fit_replaces_non_ascii_and_clips() {
        assert_eq!(fit("café (Images)"), "caf? (Images)");
        let long = "x".repeat(200);
        let clipped = fit(&long);
        assert_eq!(clipped.len(), MAX_LINE_CHARS);
        assert!(clipped.ends_with("..."));
    }

    #[test]
    fn test_paginate_keeps_every_line() {
        let lines: Vec<Line> = (0..300).map(|i| Line::body(i.to_string())).collect();
        let pages = paginate(&lines);
        assert!(pages.len() > 1);
        assert_eq!(pages.iter().map(|p| p.len()).sum::<usize>(), 300);
    }
}
