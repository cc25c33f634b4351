// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  pinmux-delta.rs - Delta generator for pinmux device tree fragments.
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
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::info;

use pinmux::diff::*;
use pinmux::render;
use pinmux::source::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The earlier DTSI.
    before: String,

    /// The later DTSI.
    after: String,

    /// The output DTSI path.
    #[arg(short, long, default_value = "pinmux-delta.dtsi")]
    out: String,

    /// The section to compare.
    #[arg(short, long, default_value = "common")]
    section: String,

    /// Treat a missing section as empty instead of failing.
    #[arg(long)]
    lenient: bool,

    /// Keep the order of the "after" file instead of sorting by pin name.
    #[arg(long)]
    document_order: bool,

    /// Log block counts and parse warnings in more detail.
    #[arg(short, long)]
    verbose: bool,
}

fn read_text(path: &str) -> Result<String, SourceError> {
    let source = SourceFile::from_filename(path)?;
    Ok(source.text()?.to_string())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let mut texts = Vec::new();
    for path in [&args.before, &args.after] {
        match read_text(path) {
            Ok(text) => texts.push(text),
            Err(error) => {
                eprintln!("Error opening file {:?}: {}", path, error);
                return ExitCode::FAILURE;
            }
        }
    }

    let differ = BlockDiffer::new(DifferOptions {
        section: args.section.clone(),
        policy: if args.lenient {
            SectionPolicy::Lenient
        } else {
            SectionPolicy::Strict
        },
        order: if args.document_order {
            ChangeOrder::Document
        } else {
            ChangeOrder::Lexicographic
        },
    });

    let changes = match differ.diff(&texts[0], &texts[1]) {
        Ok(changes) => changes,
        Err(error) => {
            eprintln!("Error comparing {:?} and {:?}: {}", &args.before, &args.after, error);
            return ExitCode::FAILURE;
        }
    };

    let content = render::render_delta(&args.section, &changes);
    if let Err(error) = fs::write(&args.out, &content) {
        eprintln!("Failed to write file {}: {}", args.out, error);
        return ExitCode::FAILURE;
    }

    if changes.is_empty() {
        info!(
            "No pinmux differences detected (no changes to {}{{}} pin blocks).",
            args.section
        );
    } else {
        let added = changes
            .iter()
            .filter(|c| c.kind == ChangeKind::Added)
            .count();
        info!(
            "Wrote {} with {} changed pin blocks ({} new).",
            args.out,
            changes.len(),
            added
        );
    }

    ExitCode::SUCCESS
}
