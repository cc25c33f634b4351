// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/workbook.rs - Worksheet reader for pinmux template workbooks.
 *  Copyright (C) 2026  Forest Crossman <cyrozap@gmail.com>
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

/*!
 * # `workbook` Module
 *
 * Reads one worksheet of an `.xlsx`/`.xlsm` workbook into rows of cell text,
 * so the pin sheet can be used without exporting it first. The sheet is
 * found by name through `xl/workbook.xml` and its relationships. Shared
 * strings and inline strings are resolved, and every other cell keeps the
 * text of its stored value.
 */

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};

use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;
use zip::ZipArchive;
use zip::result::ZipError;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("ZIP error: {0}")]
    Zip(#[from] ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error in {part}: {reason}")]
    Xml { part: String, reason: String },
    #[error("workbook has no part {0}")]
    MissingPart(String),
    #[error("sheet {name:?} not found, available sheets: {available:?}")]
    SheetNotFound { name: String, available: Vec<String> },
}

/// The non-empty rows of a sheet, keyed by 1-based row number. Each row holds
/// its cells by 0-based column index, with gaps filled by empty strings.
pub type SheetRows = BTreeMap<usize, Vec<String>>;

/// Whether the data looks like a ZIP container.
pub fn is_workbook(data: &[u8]) -> bool {
    data.starts_with(ZIP_MAGIC)
}

/// Reads the named sheet of a workbook.
pub fn read_sheet(data: &[u8], sheet: &str) -> Result<SheetRows, WorkbookError> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let sheets = parse_workbook(&read_part(&mut archive, "xl/workbook.xml")?)?;
    let Some(rel_id) = sheets
        .iter()
        .find(|(name, _)| name == sheet)
        .map(|(_, rel_id)| rel_id.clone())
    else {
        return Err(WorkbookError::SheetNotFound {
            name: sheet.to_string(),
            available: sheets.into_iter().map(|(name, _)| name).collect(),
        });
    };

    let relationships =
        parse_relationships(&read_part(&mut archive, "xl/_rels/workbook.xml.rels")?)?;
    let target = relationships
        .get(&rel_id)
        .map(|target| normalize_target(target))
        .ok_or_else(|| WorkbookError::MissingPart(format!("relationship {}", rel_id)))?;

    let shared = match read_part(&mut archive, "xl/sharedStrings.xml") {
        Ok(xml) => parse_shared_strings(&xml)?,
        Err(WorkbookError::MissingPart(_)) => Vec::new(),
        Err(error) => return Err(error),
    };

    let rows = parse_sheet(&read_part(&mut archive, &target)?, &shared, &target)?;
    debug!(
        "read {} rows from sheet {:?} ({}, {} shared strings)",
        rows.len(),
        sheet,
        target,
        shared.len()
    );

    Ok(rows)
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, WorkbookError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Err(WorkbookError::MissingPart(name.to_string())),
        Err(error) => return Err(error.into()),
    };
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}

fn xml_error(part: &str, reason: impl ToString) -> WorkbookError {
    WorkbookError::Xml {
        part: part.to_string(),
        reason: reason.to_string(),
    }
}

fn attribute(
    element: &BytesStart<'_>,
    key: &[u8],
    part: &str,
) -> Result<Option<String>, WorkbookError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| xml_error(part, e))?;
        if attr.key.as_ref() == key {
            let value = attr.unescape_value().map_err(|e| xml_error(part, e))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Reads the text of the element just opened, up to its end tag. Entity
/// references arrive as separate events and are resolved at the end.
fn element_text(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    part: &str,
) -> Result<String, WorkbookError> {
    let mut raw = String::new();
    let mut depth = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Text(e)) => raw.push_str(&e.decode().map_err(|e| xml_error(part, e))?),
            Ok(Event::CData(e)) => {
                raw.push_str(&quick_xml::escape::escape(String::from_utf8_lossy(&e).as_ref()))
            }
            Ok(Event::GeneralRef(e)) => {
                raw.push('&');
                raw.push_str(&e.decode().map_err(|e| xml_error(part, e))?);
                raw.push(';');
            }
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(e)) => {
                if depth == 0 && e.name() == start.name() {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => return Err(xml_error(part, "unexpected end inside an element")),
            Err(e) => return Err(xml_error(part, e)),
            _ => (),
        }
        buf.clear();
    }

    let text = quick_xml::escape::unescape(&raw).map_err(|e| xml_error(part, e))?;
    Ok(text.into_owned())
}

/// Returns `(name, relationship id)` for every sheet, in workbook order.
fn parse_workbook(xml: &[u8]) -> Result<Vec<(String, String)>, WorkbookError> {
    const PART: &str = "xl/workbook.xml";
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute(&e, b"name", PART)?;
                let rel_id = attribute(&e, b"r:id", PART)?;
                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    sheets.push((name, rel_id));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(PART, e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(sheets)
}

fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, WorkbookError> {
    const PART: &str = "xl/_rels/workbook.xml.rels";
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut map = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let id = attribute(&e, b"Id", PART)?;
                let target = attribute(&e, b"Target", PART)?;
                if let (Some(id), Some(target)) = (id, target) {
                    map.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(PART, e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(map)
}

/// Relationship targets are relative to `xl/` unless they are absolute.
fn normalize_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, WorkbookError> {
    const PART: &str = "xl/sharedStrings.xml";
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"si" => {
                current.clear();
                in_si = true;
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" && in_si => {
                current.push_str(&element_text(&mut reader, &e, PART)?);
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"si" => {
                strings.push(current.clone());
                in_si = false;
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(PART, e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(strings)
}

/// Splits a cell reference such as "AS13" into a 1-based row and a 0-based
/// column.
fn cell_position(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }

    let row = digits.parse::<usize>().ok().filter(|row| *row > 0)?;
    let mut column = 0usize;
    for c in letters.bytes() {
        column = column.checked_mul(26)?.checked_add((c - b'A' + 1) as usize)?;
    }

    Some((row, column - 1))
}

fn parse_sheet(xml: &[u8], shared: &[String], part: &str) -> Result<SheetRows, WorkbookError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut rows = SheetRows::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"c" => {
                let start = e.into_owned();
                let value = parse_cell(&mut reader, &start, shared, part)?;
                let reference = attribute(&start, b"r", part)?;
                if let (Some(value), Some((row, column))) =
                    (value, reference.as_deref().and_then(cell_position))
                {
                    let cells = rows.entry(row).or_default();
                    if cells.len() <= column {
                        cells.resize(column + 1, String::new());
                    }
                    cells[column] = value;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(part, e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(rows)
}

/// Reads one `<c>` element. Returns `None` for a cell without a value.
fn parse_cell(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    shared: &[String],
    part: &str,
) -> Result<Option<String>, WorkbookError> {
    let cell_type = attribute(start, b"t", part)?;
    let mut value = None;
    let mut inline = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"v" => {
                value = Some(element_text(reader, &e, part)?);
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => {
                inline
                    .get_or_insert_with(String::new)
                    .push_str(&element_text(reader, &e, part)?);
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"c" => break,
            Ok(Event::Eof) => return Err(xml_error(part, "unexpected end inside a cell")),
            Err(e) => return Err(xml_error(part, e)),
            _ => (),
        }
        buf.clear();
    }

    if let Some(text) = inline {
        return Ok(Some(text));
    }

    let Some(value) = value else {
        return Ok(None);
    };

    if cell_type.as_deref() == Some("s") {
        // An unresolvable index keeps the raw value
        let text = value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|index| shared.get(index))
            .cloned()
            .unwrap_or(value);
        return Ok(Some(text));
    }

    Ok(Some(value))
}
