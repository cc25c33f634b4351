// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  pinmux-gen.rs - Pinmux device tree generator for exported pin tables.
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

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::info;

use pinmux::builder::*;
use pinmux::config::*;
use pinmux::render;
use pinmux::source::*;
use pinmux::table::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The pin table to read: the template workbook (.xlsx/.xlsm) or a CSV
    /// export of its pin sheet, optionally gzip-compressed.
    table: String,

    /// The output DTSI path.
    #[arg(short, long, default_value = "pinmux.dtsi")]
    out: String,

    /// A TOML file overriding the default table layout.
    #[arg(short, long)]
    layout: Option<String>,

    /// The worksheet to read from a workbook, overriding the layout.
    #[arg(long)]
    sheet: Option<String>,

    /// Copy the attribute columns through as raw integers.
    #[arg(long)]
    raw: bool,

    /// Do not write the "generated from" comment.
    #[arg(long)]
    no_header: bool,

    /// Log every pin as it is classified.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let mut layout = match &args.layout {
        Some(path) => match TableLayout::from_toml_file(path) {
            Ok(layout) => layout,
            Err(error) => {
                eprintln!("Error reading layout {:?}: {}", path, error);
                return ExitCode::FAILURE;
            }
        },
        None => TableLayout::default(),
    };
    if let Some(sheet) = &args.sheet {
        layout.sheet = sheet.clone();
    }
    if args.raw {
        layout.attribute_source = AttributeSource::RawPassthrough;
    }

    let source = match SourceFile::from_filename(&args.table) {
        Ok(sf) => sf,
        Err(error) => {
            eprintln!("Error opening file {:?}: {}", &args.table, error);
            return ExitCode::FAILURE;
        }
    };

    let table = match PinTable::from_data(&source.data, &layout) {
        Ok(pt) => pt,
        Err(error) => {
            eprintln!("Error reading pin table {:?}: {}", &args.table, error);
            return ExitCode::FAILURE;
        }
    };

    let groups = PinDescriptorBuilder::new(layout.attribute_source).build(&table.rows);

    let content = if args.no_header {
        render::render(&groups.active, &groups.unused)
    } else {
        let base_name = Path::new(&args.table)
            .file_name()
            .unwrap_or_default()
            .to_string_lossy();
        let now = chrono::Local::now();
        let header = format!(
            "Generated by pinmux-gen from {} on {}",
            base_name,
            now.format("%Y-%m-%d")
        );
        render::render_with_header(&header, &groups.active, &groups.unused)
    };

    if let Err(error) = fs::write(&args.out, content) {
        eprintln!("Failed to write file {}: {}", args.out, error);
        return ExitCode::FAILURE;
    }

    info!(
        "Wrote {} with {} used pins and {} unused pins.",
        args.out,
        groups.active.len(),
        groups.unused.len()
    );

    ExitCode::SUCCESS
}
