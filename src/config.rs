// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/config.rs - Pin table layout configuration.
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
 * # `config` Module
 *
 * Where each pin field lives in the pin sheet.
 *
 * The defaults match the "Jetson Thor_DevKit" sheet of the Jetson Thor pinmux
 * template: pin identity in columns A to C, the configuration columns in AS
 * to AX and data in rows 13 to 479. A layout can be overridden from a TOML
 * file; keys that are left out keep their default values.
 *
 * ```toml
 * sheet = "Jetson Thor_DevKit"
 * first_row = 2
 * last_row = 200
 * attribute_source = "raw-passthrough"
 *
 * [raw]
 * pull = "BD"
 * ```
 */

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::builder::AttributeSource;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid layout: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Columns holding raw integer attributes for
/// [AttributeSource::RawPassthrough].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawColumns {
    pub pull: String,
    pub tristate: String,
    pub enable_input: String,
    pub drv_type: String,
    pub lock: String,
    pub open_drain: String,
    pub e_io_od: String,
    pub e_lpbk: String,
}

impl Default for RawColumns {
    fn default() -> Self {
        Self {
            pull: "BD".to_string(),
            tristate: "BE".to_string(),
            enable_input: "BF".to_string(),
            drv_type: "BG".to_string(),
            lock: "BH".to_string(),
            open_drain: "BI".to_string(),
            e_io_od: "BJ".to_string(),
            e_lpbk: "BK".to_string(),
        }
    }
}

/// The layout of the pin sheet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    /// Name of the worksheet to read when the input is a workbook.
    pub sheet: String,
    /// Column of the ball/pin number ("Pin #").
    pub pin_number: String,
    /// Column of the board signal name.
    pub signal_name: String,
    /// Column of the pin identifier (MPIO name).
    pub pin: String,
    pub function: String,
    pub direction: String,
    pub pull: String,
    /// Column of the drive selector. Shares the pull column by default.
    pub drive: String,
    pub input_enable: String,
    pub output_enable: String,
    /// First data row, 1-based.
    pub first_row: usize,
    /// Last data row, 1-based and inclusive. `None` reads to the end.
    pub last_row: Option<usize>,
    pub attribute_source: AttributeSource,
    pub raw: RawColumns,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            sheet: "Jetson Thor_DevKit".to_string(),
            pin_number: "A".to_string(),
            signal_name: "B".to_string(),
            pin: "C".to_string(),
            function: "AS".to_string(),
            direction: "AT".to_string(),
            pull: "AU".to_string(),
            drive: "AU".to_string(),
            input_enable: "AV".to_string(),
            output_enable: "AX".to_string(),
            first_row: 13,
            last_row: Some(479),
            attribute_source: AttributeSource::Bitfield,
            raw: RawColumns::default(),
        }
    }
}

impl TableLayout {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
