// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/builder.rs - Pin descriptor builder for pinmux tables.
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
 * # `builder` Module
 *
 * This module turns pin table rows into [PinDescriptor]s, split into the
 * active pins and the unused/low-power pins.
 *
 * ## Usage Example
 *
 * ```
 * use pinmux::builder::{AttributeSource, PinDescriptorBuilder};
 * use pinmux::table::{Direction, PinRow};
 *
 * let rows = vec![
 *     PinRow {
 *         function: "spi1".to_string(),
 *         direction: Direction::Output,
 *         ..PinRow::new("GP115_SPI1_CLK")
 *     },
 *     PinRow::new("GP116"),
 * ];
 *
 * let groups = PinDescriptorBuilder::new(AttributeSource::Bitfield).build(&rows);
 * assert_eq!(groups.active[0].pin, "GP115_SPI1_CLK");
 * assert_eq!(groups.unused[0].function, "unused");
 * ```
 */

use std::collections::HashSet;

use log::{debug, warn};
use serde::Deserialize;

use crate::encoder::{self, ConfigWord, Decoded, DriveType, Pull};
use crate::table::{PinRow, RawAttributes};

/// Placeholder function for unused pins with a blank function cell.
pub const UNUSED_FUNCTION: &str = "unused";

/// Where the attributes of a descriptor come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeSource {
    /// Decode the attributes from the row's [ConfigWord].
    #[default]
    Bitfield,
    /// Copy the row's raw integer columns through unchanged.
    RawPassthrough,
}

/// The section a pin is rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Active,
    Unused,
}

/// Attributes decoded from a configuration word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAttributes {
    pub pull: Decoded<Pull>,
    pub tristate: bool,
    pub enable_input: bool,
    pub drive_type: Decoded<DriveType>,
    pub lock: bool,
    pub open_drain: bool,
    /// Present when DDC is set. The value is the receiver select bit.
    pub e_io_od: Option<bool>,
    /// Present when HAS_EQOS is set. The value is the EQOS bit.
    pub e_lpbk: Option<bool>,
}

impl DecodedAttributes {
    pub fn from_word(word: ConfigWord) -> Self {
        Self {
            pull: word.pull(),
            tristate: word.tristate(),
            enable_input: word.enable_input(),
            drive_type: word.drive_type(),
            lock: word.lock(),
            open_drain: word.open_drain(),
            // TODO: confirm with the template owners whether e-io-od should
            // follow the DDC bit instead of the receiver select bit.
            e_io_od: word.ddc().then(|| word.rcv_sel()),
            e_lpbk: word.has_eqos().then(|| word.eqos()),
        }
    }
}

/// The attribute set of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinAttributes {
    Decoded(DecodedAttributes),
    Raw(RawAttributes),
}

/// A pin ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinDescriptor {
    pub pin: String,
    pub function: String,
    pub attributes: PinAttributes,
    /// The word the attributes were derived from.
    pub config: ConfigWord,
    pub pin_number: String,
    pub signal_name: String,
    pub group: Group,
}

/// Active and unused descriptors, each in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinGroups {
    pub active: Vec<PinDescriptor>,
    pub unused: Vec<PinDescriptor>,
}

/// Classifies a row. Returns `None` for rows without a pin identifier.
pub fn classify(row: &PinRow) -> Option<Group> {
    if row.pin.trim().is_empty() {
        return None;
    }

    let function = row.function.trim();
    if function.is_empty()
        || function.to_lowercase().starts_with("unused")
        || row.direction.is_unassigned()
    {
        Some(Group::Unused)
    } else {
        Some(Group::Active)
    }
}

pub struct PinDescriptorBuilder {
    source: AttributeSource,
}

impl PinDescriptorBuilder {
    pub fn new(source: AttributeSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> AttributeSource {
        self.source
    }

    /// Builds the descriptor for a single row, or `None` if the row has no
    /// pin identifier.
    pub fn describe(&self, row: &PinRow) -> Option<PinDescriptor> {
        let group = classify(row)?;
        let config = encoder::encode(row);

        let function = match group {
            Group::Unused if row.function.trim().is_empty() => UNUSED_FUNCTION.to_string(),
            _ => row.function.trim().to_string(),
        };

        let attributes = match self.source {
            AttributeSource::Bitfield => {
                let decoded = DecodedAttributes::from_word(config);
                if let Decoded::Invalid(raw) = decoded.pull {
                    warn!(
                        "Pin {}: ambiguous pull encoding ({}) in config word {}",
                        row.pin, raw, config
                    );
                }
                if let Decoded::Invalid(raw) = decoded.drive_type {
                    warn!(
                        "Pin {}: invalid drive type ({}) in config word {}",
                        row.pin, raw, config
                    );
                }
                PinAttributes::Decoded(decoded)
            }
            AttributeSource::RawPassthrough => PinAttributes::Raw(row.raw.clone()),
        };

        debug!("Pin {}: {:?}, function {:?}, config {}", row.pin, group, function, config);

        Some(PinDescriptor {
            pin: row.pin.trim().to_string(),
            function,
            attributes,
            config,
            pin_number: row.pin_number.trim().to_string(),
            signal_name: row.signal_name.trim().to_string(),
            group,
        })
    }

    /// Builds descriptors for all rows, keeping table order within each
    /// group. When a pin identifier appears more than once in a group, only
    /// the last row for it is kept.
    pub fn build(&self, rows: &[PinRow]) -> PinGroups {
        let mut groups = PinGroups::default();

        for row in rows {
            let Some(descriptor) = self.describe(row) else {
                continue;
            };
            match descriptor.group {
                Group::Active => groups.active.push(descriptor),
                Group::Unused => groups.unused.push(descriptor),
            }
        }

        groups.active = keep_last(groups.active);
        groups.unused = keep_last(groups.unused);

        groups
    }
}

impl Default for PinDescriptorBuilder {
    fn default() -> Self {
        Self::new(AttributeSource::default())
    }
}

fn keep_last(descriptors: Vec<PinDescriptor>) -> Vec<PinDescriptor> {
    let mut seen = HashSet::new();
    let mut kept: Vec<PinDescriptor> = descriptors
        .into_iter()
        .rev()
        .filter(|d| {
            let first = seen.insert(d.pin.clone());
            if !first {
                debug!("Pin {}: dropping earlier duplicate row", d.pin);
            }
            first
        })
        .collect();
    kept.reverse();
    kept
}
