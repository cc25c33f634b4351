// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/lib.rs - Pinmux device tree generator and differ library.
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
 * # `pinmux` Crate
 *
 * A library for turning pinmux spreadsheet tables into device tree pin
 * configuration fragments, and for reducing two such fragments to the pins
 * that changed between them.
 *
 * This crate provides a full pipeline:
 *
 * 1. [source]: Loads input files, inflating gzip-compressed ones.
 * 2. [table]: Reads the pin sheet into rows, as laid out by a
 *    [config::TableLayout], from a CSV export or straight from the
 *    workbook through [workbook].
 * 3. [encoder]: Packs each row's attributes into a configuration word and
 *    decodes it into named fields.
 * 4. [builder]: Splits the rows into active and unused pin descriptors.
 * 5. [render]: Writes descriptors (or changed blocks) as fragment text.
 * 6. [diff]: Finds the pin blocks that changed between two fragments.
 *
 * ## Usage Example
 *
 * ```
 * use pinmux::builder::PinDescriptorBuilder;
 * use pinmux::config::TableLayout;
 * use pinmux::diff::BlockDiffer;
 * use pinmux::render;
 * use pinmux::table::PinTable;
 *
 * fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     let layout = TableLayout {
 *         pin_number: "A".to_string(),
 *         signal_name: "B".to_string(),
 *         pin: "C".to_string(),
 *         function: "D".to_string(),
 *         direction: "E".to_string(),
 *         pull: "F".to_string(),
 *         drive: "F".to_string(),
 *         input_enable: "G".to_string(),
 *         output_enable: "H".to_string(),
 *         first_row: 1,
 *         last_row: None,
 *         ..TableLayout::default()
 *     };
 *     let builder = PinDescriptorBuilder::new(layout.attribute_source);
 *
 *     let old = PinTable::from_bytes(b"J1,CLK,GP1,spi1,Output,Z,,\n", &layout)?;
 *     let new = PinTable::from_bytes(b"J1,CLK,GP1,spi1,Output,Int PU,,\n", &layout)?;
 *
 *     let old = builder.build(&old.rows);
 *     let new = builder.build(&new.rows);
 *     let before = render::render(&old.active, &old.unused);
 *     let after = render::render(&new.active, &new.unused);
 *
 *     let changes = BlockDiffer::default().diff(&before, &after)?;
 *     assert_eq!(changes.len(), 1);
 *     print!("{}", render::render_delta("common", &changes));
 *
 *     Ok(())
 * }
 * ```
 */

pub mod builder;
pub mod config;
pub mod diff;
pub mod encoder;
pub mod render;
pub mod source;
pub mod table;
pub mod workbook;
