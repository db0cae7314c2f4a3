//! Turns a selected file into a [`Chapter`].
//!
//! Every failure here is per-file: the caller logs the [`ExtractSkip`] and
//! moves on to the next candidate.

use std::path::{Component, Path};

use tracing::debug;

use crate::config::SelectionPolicy;
use crate::contract::Chapter;
use crate::encoding::EncodingDetector;
use crate::error::ExtractSkip;

/// Lines longer than this are hard-wrapped so LaTeX does not overflow the page.
pub const MAX_LINE_LENGTH: usize = 100;

/// Separator placed between path components in chapter titles.
pub const TITLE_SEPARATOR: &str = " > ";

pub struct ChapterExtractor<'a> {
    policy: &'a SelectionPolicy,
    detector: EncodingDetector,
}

impl<'a> ChapterExtractor<'a> {
    pub fn new(policy: &'a SelectionPolicy) -> Self {
        Self {
            policy,
            detector: EncodingDetector::new(),
        }
    }

    pub fn extract(&self, path: &Path, repo_root: &Path) -> Result<Chapter, ExtractSkip> {
        let size = std::fs::metadata(path)
            .map_err(|source| ExtractSkip::Unreadable {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if size > self.policy.max_file_size_bytes {
            return Err(ExtractSkip::TooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.policy.max_file_size_bytes,
            });
        }

        let bytes = std::fs::read(path).map_err(|source| ExtractSkip::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let detection = self.detector.detect(&bytes);
        debug!(path = %path.display(), encoding = detection.name(), tier = ?detection.tier, "Detected encoding");

        let text = detection
            .encoding
            .decode_strict(&bytes)
            .ok_or_else(|| ExtractSkip::Undecodable {
                path: path.to_path_buf(),
                encoding: detection.name(),
            })?;

        if text.trim().is_empty() {
            return Err(ExtractSkip::Empty(path.to_path_buf()));
        }

        let relative = path
            .strip_prefix(repo_root)
            .map_err(|_| ExtractSkip::OutsideRoot {
                path: path.to_path_buf(),
                root: repo_root.to_path_buf(),
            })?;

        Ok(Chapter {
            title: chapter_title(relative),
            content: normalize_line_lengths(&text, MAX_LINE_LENGTH),
            source_path: relative.to_path_buf(),
        })
    }
}

/// `src/net/tcp.rs` → `src > net > tcp.rs`.
pub fn chapter_title(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(TITLE_SEPARATOR)
}

/// Splits every line longer than `max` characters into `max`-character
/// segments. Lines are rejoined with `\n`; `\r\n` and lone `\r` endings
/// both count as line breaks.
pub fn normalize_line_lengths(content: &str, max: usize) -> String {
    let unified = content.replace("\r\n", "\n").replace('\r', "\n");
    let mut out: Vec<String> = Vec::new();
    for line in unified.lines() {
        let chars: Vec<char> = line.chars().collect();
        if chars.len() <= max || max == 0 {
            out.push(line.to_string());
            continue;
        }
        for segment in chars.chunks(max) {
            out.push(segment.iter().collect());
        }
    }
    out.join("\n")
}
