// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/table.rs - Pin table reader for exported pinmux spreadsheets.
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
 * # `table` Module
 *
 * This module reads the pin sheet of a pinmux template, either the workbook
 * itself or a CSV export of the sheet, into a list of [PinRow] records. Columns are addressed by their spreadsheet
 * letters and rows by their 1-based spreadsheet row numbers, as described by
 * a [TableLayout].
 *
 * ## Usage Example
 *
 * ```no_run
 * use pinmux::config::TableLayout;
 * use pinmux::source::SourceFile;
 * use pinmux::table::PinTable;
 *
 * fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     let source = SourceFile::from_filename("pinmux.csv")?;
 *     let table = PinTable::from_bytes(&source.data, &TableLayout::default())?;
 *
 *     for row in &table.rows {
 *         println!("{}: {}", row.pin, row.function);
 *     }
 *
 *     Ok(())
 * }
 * ```
 */

use std::string::String;

use csv;
use log::debug;
use thiserror::Error;

use crate::builder::AttributeSource;
use crate::config::{RawColumns, TableLayout};
use crate::workbook::{self, WorkbookError};

/// Errors produced while reading a pin table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("workbook error: {0}")]
    Workbook(#[from] WorkbookError),
    #[error("invalid column letters {0:?}")]
    InvalidColumn(String),
    #[error("row {row}, column {column}: expected an unsigned integer, found {value:?}")]
    InvalidRawValue {
        row: usize,
        column: String,
        value: String,
    },
}

/// The declared signal direction of a pin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Direction {
    /// The cell was blank.
    #[default]
    Unspecified,
    Input,
    Output,
    /// "Not Assigned": the pin carries no signal.
    NotAssigned,
    /// "N/A": the pin cannot be configured.
    NotApplicable,
    /// Any other text, kept verbatim.
    Other(String),
}

impl Direction {
    pub fn parse(s: &str) -> Self {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "" => Self::Unspecified,
            "input" => Self::Input,
            "output" => Self::Output,
            "not assigned" | "not-assigned" | "not_assigned" => Self::NotAssigned,
            "n/a" => Self::NotApplicable,
            _ => Self::Other(s.trim().to_string()),
        }
    }

    /// Whether this direction marks the pin as unassigned.
    pub fn is_unassigned(&self) -> bool {
        matches!(self, Self::NotAssigned | Self::NotApplicable)
    }
}

/// The internal pull resistor requested for a pin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PullMode {
    #[default]
    None,
    PullUp,
    PullDown,
}

impl PullMode {
    /// Parses a pull cell. Both the template vocabulary ("Int PU", "Int PD",
    /// "Z") and the plain names ("pull-up", "pull-down", "none") are
    /// accepted. Anything else, including drive selectors sharing the same
    /// column, means no pull.
    pub fn parse(s: &str) -> Self {
        let lower = s.trim().to_lowercase();
        if lower.contains("int pu") || matches!(lower.as_str(), "pull-up" | "pu" | "up") {
            Self::PullUp
        } else if lower.contains("int pd") || matches!(lower.as_str(), "pull-down" | "pd" | "down")
        {
            Self::PullDown
        } else {
            Self::None
        }
    }
}

/// The drive strength selector of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveSelector {
    /// "Drive 0" or "0".
    Zero,
    /// "Drive 1" or "1".
    One,
}

impl DriveSelector {
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        if lower.contains("drive 0") || lower == "0" {
            Some(Self::Zero)
        } else if lower.contains("drive 1") || lower == "1" {
            Some(Self::One)
        } else {
            None
        }
    }
}

/// Attribute values read verbatim as integers, used by
/// [AttributeSource::RawPassthrough].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAttributes {
    pub pull: Option<u32>,
    pub tristate: Option<u32>,
    pub enable_input: Option<u32>,
    pub drv_type: Option<u32>,
    pub lock: Option<u32>,
    pub open_drain: Option<u32>,
    pub e_io_od: Option<u32>,
    pub e_lpbk: Option<u32>,
}

/// One record of the pin table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinRow {
    /// The pin identifier used as the block name (e.g., "GP115_SPI1_CLK").
    pub pin: String,
    /// The ball or connector pin number. Only used for comments.
    pub pin_number: String,
    /// The board signal name. Only used for comments.
    pub signal_name: String,
    /// The selected function. Empty or "unused*" marks the pin as unused.
    pub function: String,
    pub direction: Direction,
    pub pull: PullMode,
    pub drive: Option<DriveSelector>,
    /// `Some(true)` for "Yes", `Some(false)` for "No", `None` when blank.
    pub input_enable: Option<bool>,
    /// Set when the output-enable cell reads "Disable".
    pub output_disabled: bool,
    pub raw: RawAttributes,
}

impl PinRow {
    pub fn new(pin: &str) -> Self {
        Self {
            pin: pin.to_string(),
            ..Self::default()
        }
    }
}

struct RawIndices {
    pull: usize,
    tristate: usize,
    enable_input: usize,
    drv_type: usize,
    lock: usize,
    open_drain: usize,
    e_io_od: usize,
    e_lpbk: usize,
}

impl RawIndices {
    fn resolve(columns: &RawColumns) -> Result<Self, TableError> {
        Ok(Self {
            pull: column_index(&columns.pull)?,
            tristate: column_index(&columns.tristate)?,
            enable_input: column_index(&columns.enable_input)?,
            drv_type: column_index(&columns.drv_type)?,
            lock: column_index(&columns.lock)?,
            open_drain: column_index(&columns.open_drain)?,
            e_io_od: column_index(&columns.e_io_od)?,
            e_lpbk: column_index(&columns.e_lpbk)?,
        })
    }
}

/// Column indices resolved from a [TableLayout].
struct Indices {
    pin_number: usize,
    signal_name: usize,
    pin: usize,
    function: usize,
    direction: usize,
    pull: usize,
    drive: usize,
    input_enable: usize,
    output_enable: usize,
    raw: Option<RawIndices>,
}

impl Indices {
    fn resolve(layout: &TableLayout) -> Result<Self, TableError> {
        let raw = match layout.attribute_source {
            AttributeSource::Bitfield => None,
            AttributeSource::RawPassthrough => Some(RawIndices::resolve(&layout.raw)?),
        };

        Ok(Self {
            pin_number: column_index(&layout.pin_number)?,
            signal_name: column_index(&layout.signal_name)?,
            pin: column_index(&layout.pin)?,
            function: column_index(&layout.function)?,
            direction: column_index(&layout.direction)?,
            pull: column_index(&layout.pull)?,
            drive: column_index(&layout.drive)?,
            input_enable: column_index(&layout.input_enable)?,
            output_enable: column_index(&layout.output_enable)?,
            raw,
        })
    }
}

/// A 1-based sheet row number and the trimmed text of its cells.
type Record = Result<(usize, Vec<String>), TableError>;

/// The rows of a pin table, in sheet order.
#[derive(Debug)]
pub struct PinTable {
    pub rows: Vec<PinRow>,
}

impl PinTable {
    /// Reads CSV data into pin rows.
    ///
    /// Rows outside the layout's data range and rows with an empty pin
    /// identifier are skipped.
    ///
    /// # Arguments
    ///
    /// * `data` - The CSV export of the pin sheet.
    /// * `layout` - Where each field lives in the sheet.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `PinTable` or an error.
    pub fn from_bytes(data: &[u8], layout: &TableLayout) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_reader(data);

        let records = reader.byte_records().enumerate().map(|(index, result)| -> Record {
            let record = result?;
            let cells = record
                .iter()
                .map(|v| String::from_utf8_lossy(v).trim().to_string())
                .collect();
            Ok((index + 1, cells))
        });

        Self::from_records(records, layout)
    }

    /// Reads the layout's sheet of an `.xlsx`/`.xlsm` workbook into pin rows,
    /// with the same row range and column rules as [PinTable::from_bytes].
    pub fn from_workbook(data: &[u8], layout: &TableLayout) -> Result<Self, TableError> {
        let sheet = workbook::read_sheet(data, &layout.sheet)?;
        let records = sheet.into_iter().map(|(row_number, cells)| -> Record {
            let cells = cells.into_iter().map(|v| v.trim().to_string()).collect();
            Ok((row_number, cells))
        });

        Self::from_records(records, layout)
    }

    /// Reads CSV data or a workbook, depending on what the data looks like.
    pub fn from_data(data: &[u8], layout: &TableLayout) -> Result<Self, TableError> {
        if workbook::is_workbook(data) {
            Self::from_workbook(data, layout)
        } else {
            Self::from_bytes(data, layout)
        }
    }

    /// Builds the table from `(1-based row number, cells)` pairs in row
    /// order.
    fn from_records<I>(records: I, layout: &TableLayout) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = Record>,
    {
        let indices = Indices::resolve(layout)?;
        let mut rows = Vec::new();

        for record in records {
            let (row_number, cells) = record?;
            if row_number < layout.first_row {
                continue;
            }
            if layout.last_row.is_some_and(|last| row_number > last) {
                break;
            }

            if let Some(row) = pin_row(&cells, &indices, row_number)? {
                rows.push(row);
            }
        }

        debug!("read {} pin rows", rows.len());

        Ok(Self { rows })
    }
}

/// Converts one sheet row. Returns `None` if the pin identifier is empty.
fn pin_row(
    cells: &[String],
    indices: &Indices,
    row_number: usize,
) -> Result<Option<PinRow>, TableError> {
    let pin = cell(cells, indices.pin);
    if pin.is_empty() {
        return Ok(None);
    }

    let raw = match &indices.raw {
        Some(raw) => RawAttributes {
            pull: raw_cell(cells, raw.pull, row_number)?,
            tristate: raw_cell(cells, raw.tristate, row_number)?,
            enable_input: raw_cell(cells, raw.enable_input, row_number)?,
            drv_type: raw_cell(cells, raw.drv_type, row_number)?,
            lock: raw_cell(cells, raw.lock, row_number)?,
            open_drain: raw_cell(cells, raw.open_drain, row_number)?,
            e_io_od: raw_cell(cells, raw.e_io_od, row_number)?,
            e_lpbk: raw_cell(cells, raw.e_lpbk, row_number)?,
        },
        None => RawAttributes::default(),
    };

    let input_enable = match cell(cells, indices.input_enable).to_lowercase().as_str() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    };

    Ok(Some(PinRow {
        pin,
        pin_number: cell(cells, indices.pin_number),
        signal_name: cell(cells, indices.signal_name),
        function: cell(cells, indices.function),
        direction: Direction::parse(&cell(cells, indices.direction)),
        pull: PullMode::parse(&cell(cells, indices.pull)),
        drive: DriveSelector::parse(&cell(cells, indices.drive)),
        input_enable,
        output_disabled: cell(cells, indices.output_enable).eq_ignore_ascii_case("disable"),
        raw,
    }))
}

/// Converts spreadsheet column letters ("A", "AS", ...) to a 0-based index.
pub fn column_index(letters: &str) -> Result<usize, TableError> {
    let letters = letters.trim();
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(TableError::InvalidColumn(letters.to_string()));
    }

    let mut acc: usize = 0;
    for c in letters.chars() {
        let digit = (c.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
        acc = acc
            .checked_mul(26)
            .and_then(|a| a.checked_add(digit))
            .ok_or_else(|| TableError::InvalidColumn(letters.to_string()))?;
    }

    Ok(acc - 1)
}

/// Converts a 0-based column index back to spreadsheet letters.
fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).to_string()
}

fn cell(cells: &[String], index: usize) -> String {
    cells.get(index).cloned().unwrap_or_default()
}

fn raw_cell(cells: &[String], index: usize, row_number: usize) -> Result<Option<u32>, TableError> {
    let value = cell(cells, index);
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<u32>()
        .map(Some)
        .map_err(|_| TableError::InvalidRawValue {
            row: row_number,
            column: column_letters(index),
            value,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> TableLayout {
        TableLayout {
            pin_number: "A".to_string(),
            signal_name: "B".to_string(),
            pin: "C".to_string(),
            function: "D".to_string(),
            direction: "E".to_string(),
            pull: "F".to_string(),
            drive: "F".to_string(),
            input_enable: "G".to_string(),
            output_enable: "H".to_string(),
            first_row: 2,
            last_row: None,
            ..TableLayout::default()
        }
    }

    #[test]
    fn column_letters_round_trip() {
        assert_eq!(column_index("A").unwrap(), 0);
        assert_eq!(column_index("Z").unwrap(), 25);
        assert_eq!(column_index("AA").unwrap(), 26);
        assert_eq!(column_index("as").unwrap(), 44);
        assert_eq!(column_index("AX").unwrap(), 49);
        assert_eq!(column_letters(44), "AS");
        assert_eq!(column_letters(62), "BK");
        assert!(matches!(column_index(""), Err(TableError::InvalidColumn(_))));
        assert!(matches!(column_index("A1"), Err(TableError::InvalidColumn(_))));
    }

    #[test]
    fn cell_vocabulary() {
        assert_eq!(Direction::parse("Not Assigned"), Direction::NotAssigned);
        assert_eq!(Direction::parse("N/A"), Direction::NotApplicable);
        assert_eq!(Direction::parse(" Output "), Direction::Output);
        assert_eq!(Direction::parse("Bidir"), Direction::Other("Bidir".to_string()));
        assert_eq!(PullMode::parse("Int PU"), PullMode::PullUp);
        assert_eq!(PullMode::parse("pull-down"), PullMode::PullDown);
        assert_eq!(PullMode::parse("Z"), PullMode::None);
        assert_eq!(PullMode::parse("Drive 1"), PullMode::None);
        assert_eq!(DriveSelector::parse("Drive 0"), Some(DriveSelector::Zero));
        assert_eq!(DriveSelector::parse("1"), Some(DriveSelector::One));
        assert_eq!(DriveSelector::parse("Int PD"), None);
    }

    #[test]
    fn reads_rows_in_range() {
        let csv = "Pin #,Signal,MPIO,Function,Dir,Pull,IE,OE\n\
                   J1,SPI1_CLK,GP1,spi1,Output,Drive 1,Yes,Enable\n\
                   J2,,,spi1,Input,Int PU,,\n\
                   J3,NC,GP3,,Not Assigned,Int PD,,Disable\n";

        let table = PinTable::from_bytes(csv.as_bytes(), &layout()).unwrap();
        assert_eq!(table.rows.len(), 2);

        let first = &table.rows[0];
        assert_eq!(first.pin, "GP1");
        assert_eq!(first.pin_number, "J1");
        assert_eq!(first.signal_name, "SPI1_CLK");
        assert_eq!(first.function, "spi1");
        assert_eq!(first.direction, Direction::Output);
        assert_eq!(first.pull, PullMode::None);
        assert_eq!(first.drive, Some(DriveSelector::One));
        assert_eq!(first.input_enable, Some(true));
        assert!(!first.output_disabled);

        let second = &table.rows[1];
        assert_eq!(second.pin, "GP3");
        assert_eq!(second.direction, Direction::NotAssigned);
        assert_eq!(second.pull, PullMode::PullDown);
        assert_eq!(second.input_enable, None);
        assert!(second.output_disabled);
    }

    #[test]
    fn stops_after_last_row() {
        let csv = "h\nJ1,,GP1\nJ2,,GP2\nJ3,,GP3\n";
        let layout = TableLayout {
            last_row: Some(3),
            ..layout()
        };
        let table = PinTable::from_bytes(csv.as_bytes(), &layout).unwrap();
        let pins: Vec<_> = table.rows.iter().map(|r| r.pin.as_str()).collect();
        assert_eq!(pins, ["GP1", "GP2"]);
    }

    #[test]
    fn raw_columns_only_read_in_passthrough_mode() {
        let csv = "h\nJ1,,GP1,fn,Input,,,,2,1,x\n";
        let mut layout = layout();
        layout.raw = RawColumns {
            pull: "I".to_string(),
            tristate: "J".to_string(),
            enable_input: "K".to_string(),
            drv_type: "L".to_string(),
            lock: "M".to_string(),
            open_drain: "N".to_string(),
            e_io_od: "O".to_string(),
            e_lpbk: "P".to_string(),
        };

        let table = PinTable::from_bytes(csv.as_bytes(), &layout).unwrap();
        assert_eq!(table.rows[0].raw, RawAttributes::default());

        layout.attribute_source = AttributeSource::RawPassthrough;
        match PinTable::from_bytes(csv.as_bytes(), &layout) {
            Err(TableError::InvalidRawValue { row, column, value }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "K");
                assert_eq!(value, "x");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let csv = "h\nJ1,,GP1,fn,Input,,,,2,1,0,3\n";
        let table = PinTable::from_bytes(csv.as_bytes(), &layout).unwrap();
        let raw = &table.rows[0].raw;
        assert_eq!(raw.pull, Some(2));
        assert_eq!(raw.tristate, Some(1));
        assert_eq!(raw.enable_input, Some(0));
        assert_eq!(raw.drv_type, Some(3));
        assert_eq!(raw.lock, None);
    }

    #[test]
    fn reads_workbook_sheet() {
        let sheet = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
            <row r="1"><c r="A1" t="inlineStr"><is><t>Pin #</t></is></c><c r="C1" t="inlineStr"><is><t>MPIO</t></is></c></row>
            <row r="2">
                <c r="A2" t="inlineStr"><is><t>J1</t></is></c>
                <c r="B2" t="inlineStr"><is><t> SPI1_CLK </t></is></c>
                <c r="C2" t="s"><v>0</v></c>
                <c r="D2" t="s"><v>1</v></c>
                <c r="E2" t="s"><v>2</v></c>
                <c r="F2" t="inlineStr"><is><t>Drive 1</t></is></c>
                <c r="G2" t="inlineStr"><is><t>Yes</t></is></c>
                <c r="H2" t="inlineStr"><is><t>Enable</t></is></c>
            </row>
            <row r="3">
                <c r="C3" t="inlineStr"><is><t>GP2</t></is></c>
                <c r="E3" t="inlineStr"><is><t>Input</t></is></c>
                <c r="F3" t="inlineStr"><is><t>Int PD</t></is></c>
            </row>
        </sheetData></worksheet>"#;
        let data = crate::workbook::tests::pin_workbook(sheet);

        let table = PinTable::from_data(&data, &layout()).unwrap();
        assert_eq!(table.rows.len(), 2);

        let first = &table.rows[0];
        assert_eq!(first.pin, "GP1");
        assert_eq!(first.pin_number, "J1");
        assert_eq!(first.signal_name, "SPI1_CLK");
        assert_eq!(first.function, "spi1");
        assert_eq!(first.direction, Direction::Output);
        assert_eq!(first.drive, Some(DriveSelector::One));
        assert_eq!(first.input_enable, Some(true));

        let second = &table.rows[1];
        assert_eq!(second.pin, "GP2");
        assert_eq!(second.pin_number, "");
        assert_eq!(second.direction, Direction::Input);
        assert_eq!(second.pull, PullMode::PullDown);

        let layout = TableLayout {
            last_row: Some(2),
            ..layout()
        };
        let table = PinTable::from_workbook(&data, &layout).unwrap();
        assert_eq!(table.rows.len(), 1);

        let layout = TableLayout {
            sheet: "Jetson AGX".to_string(),
            ..layout
        };
        assert!(matches!(
            PinTable::from_workbook(&data, &layout),
            Err(TableError::Workbook(WorkbookError::SheetNotFound { .. }))
        ));
    }

    #[test]
    fn csv_is_not_mistaken_for_a_workbook() {
        let csv = "h\nJ1,,GP1,fn,Input\n";
        let table = PinTable::from_data(csv.as_bytes(), &layout()).unwrap();
        assert_eq!(table.rows[0].pin, "GP1");
    }
}
