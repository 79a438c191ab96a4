//! Placeholder substitution and its inversion data.

use log::debug;
use rand::Rng;

use super::detect::{cell_magic_name, detect_occurrences};
use super::{MagicKind, MagicPlaceholder};
use crate::pytext;

/// Per-tool knobs for substitution, plus the document-wide text used for
/// nonce collision checks.
#[derive(Debug, Clone, Copy)]
pub struct SubstitutionProfile<'a> {
    /// Emit `type("<nonce>")` instead of `type(0x<nonce>)`. Some tools
    /// complain about bare hex literals as statements.
    pub string_nonce: bool,
    /// Let malformed cells through unchanged instead of falling back to a
    /// whole-cell placeholder.
    pub dont_skip_bad_cells: bool,
    /// Concatenated source of every code cell in the document.
    pub whole_src: &'a str,
}

/// Result of substituting one cell.
#[derive(Debug, Clone)]
pub struct Substitution {
    /// The cell text to project, line count equal to the input's.
    pub text: String,
    pub placeholders: Vec<MagicPlaceholder>,
}

/// Replace every magic occurrence in `source` with a placeholder.
///
/// Line count is always preserved. When a magic line carries a backslash
/// continuation, or the per-line result fails the plausibility check, the
/// whole cell collapses to a single `type(<nonce>)` placeholder padded to
/// the original line count by the caller being fed `original` verbatim at
/// inversion time.
pub fn detect_and_substitute(source: &[String], profile: SubstitutionProfile) -> Substitution {
    let occurrences = detect_occurrences(source);
    let joined: String = source.concat();

    if occurrences.is_empty() {
        return Substitution {
            text: joined,
            placeholders: Vec::new(),
        };
    }

    if occurrences.iter().any(|o| o.continued) {
        debug!("magic spans a line continuation, replacing whole cell");
        return whole_cell(joined, profile);
    }

    let mut lines: Vec<String> = source.to_vec();
    let mut placeholders = Vec::new();
    for occ in &occurrences {
        let raw = &source[occ.line];
        let body = raw.trim_end_matches(['\n', '\r']);
        let ending = &raw[body.len()..];
        let nonce = fresh_nonce(profile.whole_src);
        let token = nonce_token(&nonce, profile.string_nonce);
        let replacement = match occ.kind {
            MagicKind::Cell => {
                let name = cell_magic_name(&occ.text);
                debug!("cell magic `{name}` replaced with comment placeholder");
                format!("# CELL_MAGIC {token}")
            }
            _ => format!("type({token})"),
        };
        lines[occ.line] = format!("{}{replacement}{ending}", &body[..occ.col]);
        placeholders.push(MagicPlaceholder {
            nonce,
            original: occ.text.clone(),
            replacement,
            kind: Some(occ.kind),
        });
    }

    let text: String = lines.concat();
    if !pytext::is_probably_valid(&text) {
        if profile.dont_skip_bad_cells {
            return Substitution {
                text: joined,
                placeholders: Vec::new(),
            };
        }
        debug!("substituted cell still malformed, replacing whole cell");
        return whole_cell(joined, profile);
    }

    Substitution { text, placeholders }
}

fn whole_cell(joined: String, profile: SubstitutionProfile) -> Substitution {
    let nonce = fresh_nonce(profile.whole_src);
    let token = nonce_token(&nonce, profile.string_nonce);
    let replacement = format!("type({token})");
    Substitution {
        text: format!("{replacement}\n"),
        placeholders: vec![MagicPlaceholder {
            nonce,
            original: joined,
            replacement,
            kind: None,
        }],
    }
}

fn nonce_token(nonce: &str, string_nonce: bool) -> String {
    if string_nonce {
        format!("\"{nonce}\"")
    } else {
        format!("0x{nonce}")
    }
}

/// Six hex digits, re-rolled until absent from the whole document.
pub fn fresh_nonce(whole_src: &str) -> String {
    let mut rng = rand::rng();
    loop {
        let nonce = format!("{:06x}", rng.random::<u32>() & 0x00ff_ffff);
        if !whole_src.contains(&nonce) {
            return nonce;
        }
    }
}
