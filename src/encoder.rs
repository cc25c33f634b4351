// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/encoder.rs - Pin configuration word encoder and decoder.
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
 * # `encoder` Module
 *
 * This module packs the electrical attributes of a pin table row into a
 * [ConfigWord] and decodes the word back into the named fields used by the
 * pinmux device tree.
 *
 * ## Usage Example
 *
 * ```
 * use pinmux::encoder::{self, ConfigFlag, DriveType, Pull};
 * use pinmux::table::{Direction, PinRow, PullMode};
 *
 * let row = PinRow {
 *     direction: Direction::Input,
 *     pull: PullMode::PullUp,
 *     ..PinRow::new("GP1")
 * };
 *
 * let word = encoder::encode(&row);
 * assert!(word.contains(ConfigFlag::Tristate));
 * assert_eq!(word.pull().valid(), Some(Pull::Up));
 * assert_eq!(word.drive_type().valid(), Some(DriveType::OneX));
 * ```
 */

use std::fmt;

use crate::table::{Direction, DriveSelector, PinRow, PullMode};

/// Symbol emitted in place of a pull value that has both pull bits set.
pub const PULL_ERROR_SYMBOL: &str = "-1";

/// Symbol emitted in place of an out-of-range drive type.
pub const DRIVE_ERROR_SYMBOL: &str = "TEGRA_PIN_COMP";

pub const ENABLE_SYMBOL: &str = "TEGRA_PIN_ENABLE";
pub const DISABLE_SYMBOL: &str = "TEGRA_PIN_DISABLE";

/// A single named bit of a [ConfigWord].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFlag {
    /// Receiver select.
    RcvSel,
    Lock,
    OpenDrain,
    EnableInput,
    Tristate,
    PullDown,
    PullUp,
    I2c,
    Ddc,
    /// Low bit of the drive type field.
    Drv1x,
    /// High bit of the drive type field.
    Def1x,
    HasEqos,
    Eqos,
}

impl ConfigFlag {
    pub const ALL: [ConfigFlag; 13] = [
        ConfigFlag::RcvSel,
        ConfigFlag::Lock,
        ConfigFlag::OpenDrain,
        ConfigFlag::EnableInput,
        ConfigFlag::Tristate,
        ConfigFlag::PullDown,
        ConfigFlag::PullUp,
        ConfigFlag::I2c,
        ConfigFlag::Ddc,
        ConfigFlag::Drv1x,
        ConfigFlag::Def1x,
        ConfigFlag::HasEqos,
        ConfigFlag::Eqos,
    ];

    /// The bit position of this flag.
    pub const fn bit(self) -> u32 {
        match self {
            ConfigFlag::RcvSel => 0,
            ConfigFlag::Lock => 1,
            ConfigFlag::OpenDrain => 2,
            ConfigFlag::EnableInput => 3,
            ConfigFlag::Tristate => 4,
            ConfigFlag::PullDown => 5,
            ConfigFlag::PullUp => 6,
            ConfigFlag::I2c => 7,
            ConfigFlag::Ddc => 8,
            ConfigFlag::Drv1x => 9,
            ConfigFlag::Def1x => 10,
            ConfigFlag::HasEqos => 11,
            ConfigFlag::Eqos => 12,
        }
    }

    pub const fn mask(self) -> u32 {
        1 << self.bit()
    }

    pub fn name(self) -> &'static str {
        match self {
            ConfigFlag::RcvSel => "RCV_SEL",
            ConfigFlag::Lock => "LOCK",
            ConfigFlag::OpenDrain => "OD",
            ConfigFlag::EnableInput => "E_INPUT",
            ConfigFlag::Tristate => "TRISTATE",
            ConfigFlag::PullDown => "PULL_DOWN",
            ConfigFlag::PullUp => "PULL_UP",
            ConfigFlag::I2c => "I2C",
            ConfigFlag::Ddc => "DDC",
            ConfigFlag::Drv1x => "DRV_1X",
            ConfigFlag::Def1x => "DEF_1X",
            ConfigFlag::HasEqos => "HAS_EQOS",
            ConfigFlag::Eqos => "EQOS",
        }
    }
}

/// The result of decoding a two-bit field.
///
/// `Invalid` carries the raw field value when it has no meaning. It is kept
/// visible all the way to the rendered output instead of being coerced to a
/// valid value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded<T> {
    Valid(T),
    Invalid(u32),
}

impl<T: Copy> Decoded<T> {
    pub fn valid(&self) -> Option<T> {
        match self {
            Decoded::Valid(v) => Some(*v),
            Decoded::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Decoded::Valid(_))
    }
}

/// The pull field of a [ConfigWord].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    None,
    Down,
    Up,
}

impl Pull {
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Pull::None),
            1 => Some(Pull::Down),
            2 => Some(Pull::Up),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Pull::None => "TEGRA_PIN_PULL_NONE",
            Pull::Down => "TEGRA_PIN_PULL_DOWN",
            Pull::Up => "TEGRA_PIN_PULL_UP",
        }
    }
}

impl Decoded<Pull> {
    pub fn symbol(&self) -> &'static str {
        match self {
            Decoded::Valid(pull) => pull.symbol(),
            Decoded::Invalid(_) => PULL_ERROR_SYMBOL,
        }
    }
}

/// The drive type field of a [ConfigWord].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveType {
    OneX,
    TwoX,
    DefaultOneX,
    DefaultTwoX,
}

impl DriveType {
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(DriveType::OneX),
            1 => Some(DriveType::TwoX),
            2 => Some(DriveType::DefaultOneX),
            3 => Some(DriveType::DefaultTwoX),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            DriveType::OneX => "TEGRA_PIN_1X_DRIVER",
            DriveType::TwoX => "TEGRA_PIN_2X_DRIVER",
            DriveType::DefaultOneX => "TEGRA_PIN_DEFAULT_DRIVE_1X",
            DriveType::DefaultTwoX => "TEGRA_PIN_DEFAULT_DRIVE_2X",
        }
    }
}

impl Decoded<DriveType> {
    pub fn symbol(&self) -> &'static str {
        match self {
            Decoded::Valid(drive) => drive.symbol(),
            Decoded::Invalid(_) => DRIVE_ERROR_SYMBOL,
        }
    }
}

/// Symbol for a single-bit enable field.
pub fn enable_symbol(enabled: bool) -> &'static str {
    if enabled { ENABLE_SYMBOL } else { DISABLE_SYMBOL }
}

/// A packed pin configuration word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ConfigWord(u32);

impl ConfigWord {
    pub const EMPTY: ConfigWord = ConfigWord(0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn with(self, flag: ConfigFlag) -> Self {
        Self(self.0 | flag.mask())
    }

    pub fn set(&mut self, flag: ConfigFlag) {
        self.0 |= flag.mask();
    }

    pub fn contains(self, flag: ConfigFlag) -> bool {
        self.0 & flag.mask() != 0
    }

    /// Iterates over the flags that are set, lowest bit first.
    pub fn flags(self) -> impl Iterator<Item = ConfigFlag> {
        ConfigFlag::ALL
            .into_iter()
            .filter(move |flag| self.contains(*flag))
    }

    /// Extracts the two-bit field formed by `low` and the bit above it.
    fn field(self, low: ConfigFlag, high: ConfigFlag) -> u32 {
        (self.0 & (low.mask() | high.mask())) / low.mask() % 4
    }

    /// Decodes the pull field. Both pull bits set is reported as
    /// `Decoded::Invalid(3)`.
    pub fn pull(self) -> Decoded<Pull> {
        let index = self.field(ConfigFlag::PullDown, ConfigFlag::PullUp);
        match Pull::from_index(index) {
            Some(pull) => Decoded::Valid(pull),
            None => Decoded::Invalid(index),
        }
    }

    pub fn drive_type(self) -> Decoded<DriveType> {
        let index = self.field(ConfigFlag::Drv1x, ConfigFlag::Def1x);
        match DriveType::from_index(index) {
            Some(drive) => Decoded::Valid(drive),
            None => Decoded::Invalid(index),
        }
    }

    pub fn tristate(self) -> bool {
        self.contains(ConfigFlag::Tristate)
    }

    pub fn enable_input(self) -> bool {
        self.contains(ConfigFlag::EnableInput)
    }

    pub fn lock(self) -> bool {
        self.contains(ConfigFlag::Lock)
    }

    pub fn open_drain(self) -> bool {
        self.contains(ConfigFlag::OpenDrain)
    }

    pub fn ddc(self) -> bool {
        self.contains(ConfigFlag::Ddc)
    }

    pub fn rcv_sel(self) -> bool {
        self.contains(ConfigFlag::RcvSel)
    }

    pub fn has_eqos(self) -> bool {
        self.contains(ConfigFlag::HasEqos)
    }

    pub fn eqos(self) -> bool {
        self.contains(ConfigFlag::Eqos)
    }
}

impl fmt::Display for ConfigWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)?;
        let mut first = true;
        for flag in self.flags() {
            f.write_str(if first { " [" } else { "|" })?;
            f.write_str(flag.name())?;
            first = false;
        }
        if !first {
            f.write_str("]")?;
        }
        Ok(())
    }
}

/// Packs the attributes of a pin table row into a configuration word.
pub fn encode(row: &PinRow) -> ConfigWord {
    let mut word = ConfigWord::EMPTY;

    match row.pull {
        PullMode::PullUp => word.set(ConfigFlag::PullUp),
        PullMode::PullDown => word.set(ConfigFlag::PullDown),
        PullMode::None => (),
    }

    match row.direction {
        Direction::Input => {
            word.set(ConfigFlag::Tristate);
            word.set(ConfigFlag::EnableInput);
        }
        Direction::Output => {
            if row.input_enable == Some(true) {
                word.set(ConfigFlag::EnableInput);
            }
        }
        _ => (),
    }

    // A disabled output is tristated whatever the direction says
    if row.output_disabled {
        word.set(ConfigFlag::Tristate);
    }

    match row.drive {
        Some(DriveSelector::Zero) => word.set(ConfigFlag::Drv1x),
        Some(DriveSelector::One) => {
            word.set(ConfigFlag::Drv1x);
            word.set(ConfigFlag::Def1x);
        }
        None => (),
    }

    word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_positions() {
        let masks: Vec<u32> = ConfigFlag::ALL.iter().map(|f| f.mask()).collect();
        assert_eq!(
            masks,
            [1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1024, 2048, 4096]
        );
    }

    #[test]
    fn pull_decoding_covers_all_words() {
        for bits in 0..(1 << 13) {
            let word = ConfigWord::from_bits(bits);
            let both = word.contains(ConfigFlag::PullUp) && word.contains(ConfigFlag::PullDown);
            match word.pull() {
                Decoded::Valid(Pull::None) => {
                    assert!(!word.contains(ConfigFlag::PullUp));
                    assert!(!word.contains(ConfigFlag::PullDown));
                }
                Decoded::Valid(Pull::Down) => assert!(word.contains(ConfigFlag::PullDown)),
                Decoded::Valid(Pull::Up) => assert!(word.contains(ConfigFlag::PullUp)),
                Decoded::Invalid(raw) => {
                    assert!(both);
                    assert_eq!(raw, 3);
                }
            }
            assert_eq!(word.pull().is_valid(), !both);
        }
    }

    #[test]
    fn ambiguous_pull_renders_sentinel() {
        let word = ConfigWord::EMPTY
            .with(ConfigFlag::PullUp)
            .with(ConfigFlag::PullDown);
        assert_eq!(word.pull(), Decoded::Invalid(3));
        assert_eq!(word.pull().symbol(), PULL_ERROR_SYMBOL);
    }

    #[test]
    fn drive_type_field() {
        assert_eq!(ConfigWord::EMPTY.drive_type(), Decoded::Valid(DriveType::OneX));
        assert_eq!(
            ConfigWord::EMPTY.with(ConfigFlag::Drv1x).drive_type(),
            Decoded::Valid(DriveType::TwoX)
        );
        assert_eq!(
            ConfigWord::EMPTY.with(ConfigFlag::Def1x).drive_type(),
            Decoded::Valid(DriveType::DefaultOneX)
        );
        assert_eq!(
            ConfigWord::EMPTY
                .with(ConfigFlag::Drv1x)
                .with(ConfigFlag::Def1x)
                .drive_type()
                .symbol(),
            "TEGRA_PIN_DEFAULT_DRIVE_2X"
        );
        assert_eq!(
            Decoded::<DriveType>::Invalid(4).symbol(),
            DRIVE_ERROR_SYMBOL
        );
    }

    #[test]
    fn input_row() {
        let row = PinRow {
            direction: Direction::Input,
            ..PinRow::new("GP1")
        };
        let word = encode(&row);
        assert!(word.tristate());
        assert!(word.enable_input());
        assert_eq!(word.pull(), Decoded::Valid(Pull::None));
    }

    #[test]
    fn output_row_needs_explicit_input_enable() {
        let row = PinRow {
            direction: Direction::parse("Output"),
            ..PinRow::new("GP1")
        };
        let word = encode(&row);
        assert!(!word.enable_input());
        assert!(!word.tristate());

        let row = PinRow {
            input_enable: Some(true),
            ..row
        };
        assert!(encode(&row).enable_input());

        let row = PinRow {
            input_enable: Some(false),
            ..row
        };
        assert!(!encode(&row).enable_input());
    }

    #[test]
    fn output_disable_forces_tristate() {
        let row = PinRow {
            direction: Direction::Output,
            output_disabled: true,
            ..PinRow::new("GP1")
        };
        assert!(encode(&row).tristate());
    }

    #[test]
    fn drive_selectors() {
        let row = PinRow {
            drive: Some(DriveSelector::Zero),
            ..PinRow::new("GP1")
        };
        assert_eq!(encode(&row).bits(), ConfigFlag::Drv1x.mask());

        let row = PinRow {
            drive: Some(DriveSelector::One),
            ..PinRow::new("GP1")
        };
        assert_eq!(
            encode(&row).bits(),
            ConfigFlag::Drv1x.mask() | ConfigFlag::Def1x.mask()
        );
    }

    #[test]
    fn encoded_fields_decode_back() {
        let directions = [
            Direction::Input,
            Direction::Output,
            Direction::NotAssigned,
            Direction::Unspecified,
        ];
        let pulls = [
            (PullMode::None, Pull::None),
            (PullMode::PullDown, Pull::Down),
            (PullMode::PullUp, Pull::Up),
        ];
        let drives = [
            (None, DriveType::OneX),
            (Some(DriveSelector::Zero), DriveType::TwoX),
            (Some(DriveSelector::One), DriveType::DefaultTwoX),
        ];

        for direction in &directions {
            for (pull_mode, pull) in pulls {
                for (selector, drive) in drives {
                    for output_disabled in [false, true] {
                        for input_enable in [None, Some(true), Some(false)] {
                            let row = PinRow {
                                direction: direction.clone(),
                                pull: pull_mode,
                                drive: selector,
                                output_disabled,
                                input_enable,
                                ..PinRow::new("GP1")
                            };
                            let word = encode(&row);

                            assert_eq!(word.pull(), Decoded::Valid(pull));
                            assert_eq!(word.drive_type(), Decoded::Valid(drive));
                            assert_eq!(
                                word.tristate(),
                                *direction == Direction::Input || output_disabled
                            );
                            assert_eq!(
                                word.enable_input(),
                                *direction == Direction::Input
                                    || (*direction == Direction::Output
                                        && input_enable == Some(true))
                            );
                            assert!(!word.lock());
                            assert!(!word.open_drain());
                            assert!(!word.ddc());
                            assert!(!word.has_eqos());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn display_lists_flags() {
        assert_eq!(ConfigWord::EMPTY.to_string(), "0x0000");
        let word = ConfigWord::EMPTY
            .with(ConfigFlag::EnableInput)
            .with(ConfigFlag::Tristate);
        assert_eq!(word.to_string(), "0x0018 [E_INPUT|TRISTATE]");
    }
}
