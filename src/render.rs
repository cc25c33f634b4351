// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/render.rs - Pinmux device tree fragment renderer.
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
 * # `render` Module
 *
 * Serializes pin descriptors into the tab-indented pinmux fragment
 * (`common`, `unused_lowpower` and `drive` sections) and changed blocks into
 * a delta fragment.
 */

use crate::builder::{PinAttributes, PinDescriptor};
use crate::diff::ChangedBlock;
use crate::encoder::enable_symbol;

const T2: &str = "\t\t";
const T3: &str = "\t\t\t";
const T4: &str = "\t\t\t\t";

/// The line that opens a section, with the node label the generated
/// document gives it.
pub fn section_label(keyword: &str) -> String {
    match keyword {
        "unused_lowpower" => "pinmux_unused_lowpower: unused_lowpower {".to_string(),
        "drive" => "drive_default: drive {".to_string(),
        _ => format!("{} {{", keyword),
    }
}

/// The `/* Pin <number> - <signal> */` comment text, if either part is set.
fn pin_comment(descriptor: &PinDescriptor) -> Option<String> {
    let parts: Vec<&str> = [
        descriptor.pin_number.as_str(),
        descriptor.signal_name.as_str(),
    ]
    .into_iter()
    .filter(|p| !p.is_empty())
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(format!("Pin {}", parts.join(" - ")))
    }
}

/// The `nvidia,*` value fields of a descriptor, in output order.
fn fields(attributes: &PinAttributes) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();

    match attributes {
        PinAttributes::Decoded(attrs) => {
            fields.push(("pull", attrs.pull.symbol().to_string()));
            fields.push(("tristate", enable_symbol(attrs.tristate).to_string()));
            fields.push(("enable-input", enable_symbol(attrs.enable_input).to_string()));
            fields.push(("drv-type", attrs.drive_type.symbol().to_string()));
            if attrs.lock {
                fields.push(("lock", enable_symbol(true).to_string()));
            }
            if attrs.open_drain {
                fields.push(("open-drain", enable_symbol(true).to_string()));
            }
            if let Some(rcv_sel) = attrs.e_io_od {
                fields.push(("e-io-od", enable_symbol(rcv_sel).to_string()));
            }
            if let Some(eqos) = attrs.e_lpbk {
                fields.push(("e-lpbk", enable_symbol(eqos).to_string()));
            }
        }
        PinAttributes::Raw(raw) => {
            fields.push(("pull", raw.pull.unwrap_or(0).to_string()));
            fields.push(("tristate", raw.tristate.unwrap_or(0).to_string()));
            fields.push(("enable-input", raw.enable_input.unwrap_or(0).to_string()));
            fields.push(("drv-type", raw.drv_type.unwrap_or(0).to_string()));
            let optional = [
                ("lock", raw.lock),
                ("open-drain", raw.open_drain),
                ("e-io-od", raw.e_io_od),
                ("e-lpbk", raw.e_lpbk),
            ];
            for (name, value) in optional {
                if let Some(value) = value.filter(|v| *v != 0) {
                    fields.push((name, value.to_string()));
                }
            }
        }
    }

    fields
}

/// Renders a single pin block, including its comment line.
pub fn render_block(descriptor: &PinDescriptor) -> String {
    let mut content = String::new();

    if let Some(comment) = pin_comment(descriptor) {
        content.push_str(&format!("{}/* {} */\n", T3, comment));
    }

    content.push_str(&format!("{}{} {{\n", T3, descriptor.pin));
    content.push_str(&format!("{}nvidia,pins = \"{}\";\n", T4, descriptor.pin));
    content.push_str(&format!(
        "{}nvidia,function = \"{}\";\n",
        T4, descriptor.function
    ));
    for (name, value) in fields(&descriptor.attributes) {
        content.push_str(&format!("{}nvidia,{} = <{}>;\n", T4, name, value));
    }
    content.push_str(&format!("{}}};\n", T3));

    content
}

fn push_blocks(content: &mut String, descriptors: &[PinDescriptor]) {
    for (i, descriptor) in descriptors.iter().enumerate() {
        if i > 0 {
            content.push('\n');
        }
        content.push_str(&render_block(descriptor));
    }
}

/// Renders the active and unused pins as a pinmux fragment.
pub fn render(active: &[PinDescriptor], unused: &[PinDescriptor]) -> String {
    let mut content = String::new();

    content.push_str(&format!("{}{}\n", T2, section_label("common")));
    content.push_str(&format!("{}/* SFIO Pin Configuration */\n", T3));
    push_blocks(&mut content, active);
    content.push_str(&format!("{}}};\n", T2));
    content.push('\n');

    content.push_str(&format!("{}{}\n", T2, section_label("unused_lowpower")));
    push_blocks(&mut content, unused);
    content.push_str(&format!("{}}};\n", T2));
    content.push('\n');

    content.push_str(&format!("{}{}\n", T2, section_label("drive")));
    content.push_str(&format!("{}}};\n", T2));

    content
}

/// Renders the fragment with a leading comment outside of every section.
pub fn render_with_header(
    header: &str,
    active: &[PinDescriptor],
    unused: &[PinDescriptor],
) -> String {
    let mut content = String::new();
    for line in header.lines() {
        content.push_str(&format!("/* {} */\n", line));
    }
    content.push('\n');
    content.push_str(&render(active, unused));
    content
}

/// Renders changed blocks as a delta fragment wrapped in the section they
/// were compared in. An empty list renders as an empty string.
pub fn render_delta(section: &str, changed: &[ChangedBlock]) -> String {
    if changed.is_empty() {
        return String::new();
    }

    let mut content = String::new();

    content.push_str(&format!(
        "{}/* Auto-generated: delta of changed pins only */\n",
        T2
    ));
    content.push_str(&format!("{}{}\n", T2, section_label(section)));
    content.push_str(&format!("{}/* Only pins that changed vs. BEFORE */\n", T3));

    for (i, block) in changed.iter().enumerate() {
        if i > 0 {
            content.push('\n');
        }
        content.push_str(block.text.trim_end());
        content.push('\n');
    }

    content.push_str(&format!("{}}};\n", T2));

    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DecodedAttributes, Group};
    use crate::diff::ChangeKind;
    use crate::encoder::{ConfigFlag, ConfigWord};
    use crate::table::RawAttributes;

    fn descriptor(pin: &str, word: ConfigWord) -> PinDescriptor {
        PinDescriptor {
            pin: pin.to_string(),
            function: "spi1".to_string(),
            attributes: PinAttributes::Decoded(DecodedAttributes::from_word(word)),
            config: word,
            pin_number: String::new(),
            signal_name: String::new(),
            group: Group::Active,
        }
    }

    #[test]
    fn block_with_comment() {
        let mut d = descriptor(
            "GP1",
            ConfigWord::EMPTY
                .with(ConfigFlag::PullUp)
                .with(ConfigFlag::Tristate)
                .with(ConfigFlag::EnableInput),
        );
        d.pin_number = "J57".to_string();
        d.signal_name = "SPI1_CLK".to_string();

        assert_eq!(
            render_block(&d),
            "\t\t\t/* Pin J57 - SPI1_CLK */\n\
             \t\t\tGP1 {\n\
             \t\t\t\tnvidia,pins = \"GP1\";\n\
             \t\t\t\tnvidia,function = \"spi1\";\n\
             \t\t\t\tnvidia,pull = <TEGRA_PIN_PULL_UP>;\n\
             \t\t\t\tnvidia,tristate = <TEGRA_PIN_ENABLE>;\n\
             \t\t\t\tnvidia,enable-input = <TEGRA_PIN_ENABLE>;\n\
             \t\t\t\tnvidia,drv-type = <TEGRA_PIN_1X_DRIVER>;\n\
             \t\t\t};\n"
        );
    }

    #[test]
    fn comment_with_one_part() {
        let mut d = descriptor("GP1", ConfigWord::EMPTY);
        d.signal_name = "NC".to_string();
        assert!(render_block(&d).starts_with("\t\t\t/* Pin NC */\n"));

        let d = descriptor("GP1", ConfigWord::EMPTY);
        assert!(render_block(&d).starts_with("\t\t\tGP1 {\n"));
    }

    #[test]
    fn optional_fields_in_order() {
        let word = ConfigWord::EMPTY
            .with(ConfigFlag::Eqos)
            .with(ConfigFlag::HasEqos)
            .with(ConfigFlag::Ddc)
            .with(ConfigFlag::OpenDrain)
            .with(ConfigFlag::Lock);
        let text = render_block(&descriptor("GP1", word));
        let keys: Vec<&str> = text
            .lines()
            .filter_map(|l| l.trim().strip_prefix("nvidia,"))
            .map(|l| l.split(' ').next().unwrap_or(""))
            .collect();
        assert_eq!(
            keys,
            [
                "pins",
                "function",
                "pull",
                "tristate",
                "enable-input",
                "drv-type",
                "lock",
                "open-drain",
                "e-io-od",
                "e-lpbk"
            ]
        );
        assert!(text.contains("nvidia,e-io-od = <TEGRA_PIN_DISABLE>;"));
        assert!(text.contains("nvidia,e-lpbk = <TEGRA_PIN_ENABLE>;"));
    }

    #[test]
    fn ambiguous_pull_is_visible() {
        let word = ConfigWord::EMPTY
            .with(ConfigFlag::PullUp)
            .with(ConfigFlag::PullDown);
        let text = render_block(&descriptor("GP1", word));
        assert!(text.contains("nvidia,pull = <-1>;"));
    }

    #[test]
    fn raw_attributes() {
        let mut d = descriptor("GP1", ConfigWord::EMPTY);
        d.attributes = PinAttributes::Raw(RawAttributes {
            pull: Some(2),
            tristate: None,
            enable_input: Some(1),
            drv_type: Some(3),
            lock: Some(0),
            open_drain: Some(1),
            e_io_od: None,
            e_lpbk: Some(5),
        });
        let text = render_block(&d);
        assert!(text.contains("nvidia,pull = <2>;"));
        assert!(text.contains("nvidia,tristate = <0>;"));
        assert!(text.contains("nvidia,enable-input = <1>;"));
        assert!(text.contains("nvidia,drv-type = <3>;"));
        assert!(!text.contains("nvidia,lock"));
        assert!(text.contains("nvidia,open-drain = <1>;"));
        assert!(!text.contains("nvidia,e-io-od"));
        assert!(text.contains("nvidia,e-lpbk = <5>;"));
    }

    #[test]
    fn document_layout() {
        let mut unused = descriptor("GP9", ConfigWord::EMPTY);
        unused.function = "unused".to_string();
        unused.group = Group::Unused;

        let text = render(
            &[
                descriptor("GP1", ConfigWord::EMPTY),
                descriptor("GP2", ConfigWord::EMPTY),
            ],
            &[unused],
        );
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "\t\tcommon {");
        assert_eq!(lines[1], "\t\t\t/* SFIO Pin Configuration */");
        assert_eq!(lines[2], "\t\t\tGP1 {");
        assert_eq!(lines[9], "\t\t\t};");
        assert_eq!(lines[10], "");
        assert_eq!(lines[11], "\t\t\tGP2 {");
        assert_eq!(lines[18], "\t\t\t};");
        assert_eq!(lines[19], "\t\t};");
        assert_eq!(lines[20], "");
        assert_eq!(lines[21], "\t\tpinmux_unused_lowpower: unused_lowpower {");
        assert_eq!(lines[22], "\t\t\tGP9 {");
        assert_eq!(lines[24], "\t\t\t\tnvidia,function = \"unused\";");
        assert!(text.ends_with("\t\t};\n\n\t\tdrive_default: drive {\n\t\t};\n"));
    }

    #[test]
    fn empty_document_still_has_sections() {
        assert_eq!(
            render(&[], &[]),
            "\t\tcommon {\n\
             \t\t\t/* SFIO Pin Configuration */\n\
             \t\t};\n\
             \n\
             \t\tpinmux_unused_lowpower: unused_lowpower {\n\
             \t\t};\n\
             \n\
             \t\tdrive_default: drive {\n\
             \t\t};\n"
        );
    }

    #[test]
    fn header_sits_outside_sections() {
        let text = render_with_header("Generated from a.csv\nsecond line", &[], &[]);
        assert!(text.starts_with("/* Generated from a.csv */\n/* second line */\n\n\t\tcommon {\n"));
    }

    #[test]
    fn delta_layout() {
        assert_eq!(render_delta("common", &[]), "");

        let changed = [
            ChangedBlock {
                name: "GP2".to_string(),
                kind: ChangeKind::Modified,
                text: "\t\t\t/* Pin 2 */\n\t\t\tGP2 {\n\t\t\t};".to_string(),
                position: 1,
            },
            ChangedBlock {
                name: "GP3".to_string(),
                kind: ChangeKind::Added,
                text: "\t\t\tGP3 {\n\t\t\t};\n\n".to_string(),
                position: 0,
            },
        ];
        assert_eq!(
            render_delta("common", &changed),
            "\t\t/* Auto-generated: delta of changed pins only */\n\
             \t\tcommon {\n\
             \t\t\t/* Only pins that changed vs. BEFORE */\n\
             \t\t\t/* Pin 2 */\n\
             \t\t\tGP2 {\n\
             \t\t\t};\n\
             \n\
             \t\t\tGP3 {\n\
             \t\t\t};\n\
             \t\t};\n"
        );
    }

    #[test]
    fn delta_keeps_compared_section() {
        let changed = [ChangedBlock {
            name: "GP9".to_string(),
            kind: ChangeKind::Modified,
            text: "\t\t\tGP9 {\n\t\t\t\tnvidia,pull = <TEGRA_PIN_PULL_UP>;\n\t\t\t};".to_string(),
            position: 0,
        }];
        let text = render_delta("unused_lowpower", &changed);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "\t\tpinmux_unused_lowpower: unused_lowpower {");
        assert!(!text.contains("common"));

        let text = render_delta("pinmux_extra", &changed);
        assert!(text.contains("\n\t\tpinmux_extra {\n"));
    }

    #[test]
    fn section_labels_match_document() {
        let text = render(&[], &[]);
        for keyword in ["common", "unused_lowpower", "drive"] {
            let line = format!("\t\t{}\n", section_label(keyword));
            assert!(text.contains(&line), "missing {:?}", line);
        }
    }
}
