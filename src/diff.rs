// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/diff.rs - Block-level differ for pinmux device tree fragments.
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
 * # `diff` Module
 *
 * This module compares the pin blocks of one section (`common` by default)
 * in two versions of a pinmux fragment and reports the blocks of the "after"
 * version that are new or whose content changed.
 *
 * Blocks are compared on a normalized form that ignores whitespace and the
 * `/* Pin ... */` comment line preceding the block. Pins that only exist in
 * the "before" version are never reported, so applying a delta can never
 * remove a pin's configuration.
 *
 * ## Usage Example
 *
 * ```
 * use pinmux::diff::BlockDiffer;
 *
 * let before = "common {\n\tGP1 {\n\t\tnvidia,pull = <TEGRA_PIN_PULL_NONE>;\n\t};\n};\n";
 * let after = "common {\n\tGP1 {\n\t\tnvidia,pull = <TEGRA_PIN_PULL_UP>;\n\t};\n};\n";
 *
 * let changes = BlockDiffer::default().diff(before, after).unwrap();
 * assert_eq!(changes.len(), 1);
 * assert_eq!(changes[0].name, "GP1");
 * ```
 */

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use log::{info, warn};
use thiserror::Error;

/// Which input a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Before => f.write_str("before"),
            Side::After => f.write_str("after"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiffError {
    #[error("could not find a `{section} {{ ... }}` section in the {side} document")]
    MalformedSection { side: Side, section: String },
}

/// What to do when the section cannot be found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SectionPolicy {
    /// Fail with [DiffError::MalformedSection].
    #[default]
    Strict,
    /// Treat the section as empty.
    Lenient,
}

/// Order of the reported changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChangeOrder {
    /// Sorted by pin name.
    #[default]
    Lexicographic,
    /// In the order the blocks appear in the "after" document.
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifferOptions {
    /// The section keyword, e.g. "common".
    pub section: String,
    pub policy: SectionPolicy,
    pub order: ChangeOrder,
}

impl Default for DifferOptions {
    fn default() -> Self {
        Self {
            section: "common".to_string(),
            policy: SectionPolicy::default(),
            order: ChangeOrder::default(),
        }
    }
}

/// A named pin block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub name: String,
    /// The block as written, including its leading comment line if any.
    pub raw: String,
    /// The comparison key: every token of the block body separated by a
    /// single space, without the leading comment.
    pub normalized: String,
    /// Index of the block within its section.
    pub position: usize,
}

/// A block whose delimiters never balanced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnterminatedBlock {
    pub name: String,
    /// 1-based line within the section body.
    pub line: usize,
}

/// The blocks of one section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionBlocks {
    pub blocks: BTreeMap<String, Block>,
    /// Set when parsing stopped at an unterminated block.
    pub unterminated: Option<UnterminatedBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Only present in "after".
    Added,
    /// Present in both with different content.
    Modified,
}

/// A block to include in the delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedBlock {
    pub name: String,
    pub kind: ChangeKind,
    /// The raw "after" text of the block.
    pub text: String,
    /// Position of the block in the "after" section.
    pub position: usize,
}

/// Byte ranges of the `/* ... */` comments in `text`. An unclosed comment
/// runs to the end of the text.
fn comment_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut from = 0;

    while let Some(found) = text[from..].find("/*") {
        let start = from + found;
        let end = match text[start + 2..].find("*/") {
            Some(close) => start + 2 + close + 2,
            None => text.len(),
        };
        spans.push(start..end);
        from = end;
    }

    spans
}

fn in_comment(spans: &[Range<usize>], offset: usize) -> bool {
    spans.iter().any(|span| span.contains(&offset))
}

/// Width of the leading whitespace of the line containing `offset`.
fn line_indent(text: &str, offset: usize) -> usize {
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line = &text[line_start..offset];
    line.len() - line.trim_start().len()
}

/// Returns the body of the first `<keyword> {` section, without the outer
/// braces. Braces inside `/* ... */` comments are not counted.
///
/// If the section's braces never balance (an unclosed block inside it), the
/// body ends before the first line starting with `}` that is indented no
/// deeper than the keyword line, or at the end of the text. Returns `None`
/// if the keyword or its opening brace is missing.
pub fn extract_section<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    if keyword.is_empty() {
        return None;
    }

    let comments = comment_spans(text);

    for (start, _) in text.match_indices(keyword) {
        if in_comment(&comments, start) {
            continue;
        }

        let preceded_by_word = text[..start]
            .chars()
            .next_back()
            .is_some_and(is_ident_char);
        if preceded_by_word {
            continue;
        }

        let rest = &text[start + keyword.len()..];
        let gap = rest.len() - rest.trim_start().len();
        if !rest[gap..].starts_with('{') {
            continue;
        }

        let open = start + keyword.len() + gap;
        let mut depth = 0usize;
        for (offset, c) in text[open..].char_indices() {
            if in_comment(&comments, open + offset) {
                continue;
            }
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[open + 1..open + offset]);
                    }
                }
                _ => (),
            }
        }

        let indent = line_indent(text, start);
        let body_start = open + 1;
        let mut line_start = match text[body_start..].find('\n') {
            Some(newline) => body_start + newline + 1,
            None => text.len(),
        };
        while line_start < text.len() {
            let line = &text[line_start..];
            let trimmed = line.trim_start_matches([' ', '\t']);
            if trimmed.starts_with('}') && line.len() - trimmed.len() <= indent {
                warn!(
                    "Section `{}` is not balanced, ending it at line {}",
                    keyword,
                    text[..line_start].matches('\n').count() + 1
                );
                return Some(&text[body_start..line_start]);
            }
            line_start = match line.find('\n') {
                Some(newline) => line_start + newline + 1,
                None => text.len(),
            };
        }

        warn!("Section `{}` is never closed, reading to the end", keyword);
        return Some(&text[body_start..]);
    }

    None
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether a line is a whole-line `/* ... */` comment.
fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 4 && trimmed.starts_with("/*") && trimmed.ends_with("*/")
}

/// Returns the block name if the line opens a block (`<identifier> {`).
fn block_head(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let end = trimmed
        .find(|c: char| !is_ident_char(c))
        .unwrap_or(trimmed.len());
    if end == 0 {
        return None;
    }

    if trimmed[end..].trim_start().starts_with('{') {
        Some(&trimmed[..end])
    } else {
        None
    }
}

fn brace_balance(line: &str) -> isize {
    let comments = comment_spans(line);
    line.char_indices()
        .filter(|(offset, _)| !in_comment(&comments, *offset))
        .fold(0, |depth, (_, c)| match c {
            '{' => depth + 1,
            '}' => depth - 1,
            _ => depth,
        })
}

fn normalize(lines: &[&str]) -> String {
    lines
        .iter()
        .flat_map(|line| line.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits a section body into its pin blocks.
///
/// A whole-line comment directly above a block head belongs to the block.
/// Parsing stops at the first block whose braces never balance; the blocks
/// before it are kept. If a name occurs twice, the later block wins.
pub fn parse_blocks(body: &str) -> SectionBlocks {
    let lines: Vec<&str> = body.lines().collect();
    let mut section = SectionBlocks::default();
    let mut pending_comment: Option<usize> = None;
    let mut position = 0;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if is_comment_line(line) {
            pending_comment = Some(i);
            i += 1;
            continue;
        }

        let Some(name) = block_head(line) else {
            pending_comment = None;
            i += 1;
            continue;
        };

        let start = pending_comment.take().unwrap_or(i);

        let mut depth = 0;
        let mut end = None;
        for (j, l) in lines.iter().enumerate().skip(i) {
            depth += brace_balance(l);
            if depth == 0 {
                end = Some(j);
                break;
            }
        }

        let Some(end) = end else {
            warn!(
                "Block {} at line {} is never closed, ignoring the rest of the section",
                name,
                i + 1
            );
            section.unterminated = Some(UnterminatedBlock {
                name: name.to_string(),
                line: i + 1,
            });
            break;
        };

        section.blocks.insert(
            name.to_string(),
            Block {
                name: name.to_string(),
                raw: lines[start..=end].join("\n"),
                normalized: normalize(&lines[i..=end]),
                position,
            },
        );
        position += 1;
        i = end + 1;
    }

    section
}

pub struct BlockDiffer {
    options: DifferOptions,
}

impl BlockDiffer {
    pub fn new(options: DifferOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DifferOptions {
        &self.options
    }

    /// Extracts and parses the configured section of one document.
    pub fn section_blocks(&self, text: &str, side: Side) -> Result<SectionBlocks, DiffError> {
        let section = &self.options.section;
        match extract_section(text, section) {
            Some(body) => Ok(parse_blocks(body)),
            None => match self.options.policy {
                SectionPolicy::Strict => Err(DiffError::MalformedSection {
                    side,
                    section: section.clone(),
                }),
                SectionPolicy::Lenient => {
                    warn!("No `{} {{ ... }}` section in the {} document", section, side);
                    Ok(SectionBlocks::default())
                }
            },
        }
    }

    /// Compares two documents and returns the blocks of `after` that are
    /// new or changed.
    pub fn diff(&self, before: &str, after: &str) -> Result<Vec<ChangedBlock>, DiffError> {
        let before = self.section_blocks(before, Side::Before)?;
        let after = self.section_blocks(after, Side::After)?;
        Ok(self.compare(&before, &after))
    }

    /// Compares two parsed sections.
    pub fn compare(&self, before: &SectionBlocks, after: &SectionBlocks) -> Vec<ChangedBlock> {
        let mut changes = Vec::new();

        for (name, block) in &after.blocks {
            let kind = match before.blocks.get(name) {
                None => ChangeKind::Added,
                Some(old) if old.normalized != block.normalized => ChangeKind::Modified,
                Some(_) => continue,
            };
            changes.push(ChangedBlock {
                name: name.clone(),
                kind,
                text: block.raw.clone(),
                position: block.position,
            });
        }

        if self.options.order == ChangeOrder::Document {
            changes.sort_by_key(|c| c.position);
        }

        info!(
            "{} of {} blocks in `{}` changed ({} before)",
            changes.len(),
            after.blocks.len(),
            self.options.section,
            before.blocks.len()
        );

        changes
    }
}

impl Default for BlockDiffer {
    fn default() -> Self {
        Self::new(DifferOptions::default())
    }
}

/// Compares the `common` sections of two documents, failing if either one
/// has no such section.
pub fn diff(before: &str, after: &str) -> Result<Vec<ChangedBlock>, DiffError> {
    BlockDiffer::default().diff(before, after)
}
