//! Artifact kinds, dispatch modes and kind inference.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ibmi_lang_core::columns;
use serde::{Deserialize, Serialize};

use crate::error::UnknownName;

/// The language of one input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Cl,
    Rpg,
    Db2,
    Dspf,
    /// Not known yet; resolved by inference.
    #[default]
    Auto,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Cl => "cl",
            Kind::Rpg => "rpg",
            Kind::Db2 => "db2",
            Kind::Dspf => "dspf",
            Kind::Auto => "auto",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cl" => Ok(Kind::Cl),
            "rpg" => Ok(Kind::Rpg),
            "db2" => Ok(Kind::Db2),
            "dspf" => Ok(Kind::Dspf),
            "auto" => Ok(Kind::Auto),
            _ => Err(UnknownName {
                what: "kind",
                name: s.to_string(),
                expected: "auto, cl, rpg, db2, dspf",
            }),
        }
    }
}

/// Which analyzers a pipeline run may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Same as [`Mode::Combined`].
    Auto,
    Cl,
    Rpg,
    Db2,
    Dspf,
    /// Run the analyzer matching each file's kind.
    #[default]
    Combined,
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Cl => "cl",
            Mode::Rpg => "rpg",
            Mode::Db2 => "db2",
            Mode::Dspf => "dspf",
            Mode::Combined => "combined",
        }
    }

    /// The single kind a forced mode restricts the run to.
    pub fn forced_kind(self) -> Option<Kind> {
        match self {
            Mode::Cl => Some(Kind::Cl),
            Mode::Rpg => Some(Kind::Rpg),
            Mode::Db2 => Some(Kind::Db2),
            Mode::Dspf => Some(Kind::Dspf),
            Mode::Auto | Mode::Combined => None,
        }
    }

    /// The analyzer to run for a file of resolved `kind`, if any.
    ///
    /// A forced mode overrides a file whose kind stayed `auto`, never a file
    /// confidently resolved to a different kind.
    pub fn select(self, kind: Kind) -> Option<Kind> {
        match self.forced_kind() {
            None => (kind != Kind::Auto).then_some(kind),
            Some(forced) => (kind == forced || kind == Kind::Auto).then_some(forced),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Mode::Auto),
            "cl" => Ok(Mode::Cl),
            "rpg" => Ok(Mode::Rpg),
            "db2" => Ok(Mode::Db2),
            "dspf" => Ok(Mode::Dspf),
            "combined" => Ok(Mode::Combined),
            _ => Err(UnknownName {
                what: "mode",
                name: s.to_string(),
                expected: "auto, cl, rpg, db2, dspf, combined",
            }),
        }
    }
}

/// File extensions and the kind they imply.
const EXTENSIONS: &[(&str, Kind)] = &[
    ("cl", Kind::Cl),
    ("clle", Kind::Cl),
    ("clp", Kind::Cl),
    ("rpg", Kind::Rpg),
    ("rpgle", Kind::Rpg),
    ("sqlrpgle", Kind::Rpg),
    ("sql", Kind::Db2),
    ("dspf", Kind::Dspf),
];

/// Characters of the first line inspected by [`infer_from_content`].
pub const SNIFF_WIDTH: usize = 80;

/// Fixed-form RPG specification letters.
const RPG_SPECS: &[&str] = &["D", "C", "F", "P", "H"];
const DB2_MARKERS: &[&str] = &["SELECT ", "INSERT ", "UPDATE ", "DELETE ", "CREATE TABLE", "CREATE VIEW"];
const CL_MARKERS: &[&str] = &["PGM", "DCL", "CALL ", "SBMJOB", "RUNSQL "];

/// Kind implied by the file extension, case-insensitively; `auto` otherwise.
pub fn infer_from_path(path: impl AsRef<Path>) -> Kind {
    let Some(ext) = path.as_ref().extension().and_then(|e| e.to_str()) else {
        return Kind::Auto;
    };
    let ext = ext.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map_or(Kind::Auto, |&(_, kind)| kind)
}

/// Guess the kind from the first non-blank line of `text`.
///
/// RPG is tried first since RPG declaration lines would match the CL `DCL`
/// marker. Falls back to [`infer_from_path`] on `filename`.
pub fn infer_from_content(text: &str, filename: &str) -> Kind {
    let Some(raw) = text.lines().find(|l| !l.trim().is_empty()) else {
        return infer_from_path(filename);
    };
    let line: String = raw.trim().to_uppercase().chars().take(SNIFF_WIDTH).collect();
    let column_6 = columns::char_at(raw, 5).map(|c| c.to_ascii_uppercase());

    if looks_like_rpg(&line, raw, column_6) {
        Kind::Rpg
    } else if DB2_MARKERS.iter().any(|m| line.contains(m)) {
        Kind::Db2
    } else if CL_MARKERS.iter().any(|m| line.contains(m)) {
        Kind::Cl
    } else if line.starts_with("A ")
        || line.starts_with("R ")
        || columns::slice(&line, 0, 20).contains("RECORD")
        || column_6 == Some('A')
    {
        Kind::Dspf
    } else {
        infer_from_path(filename)
    }
}

fn looks_like_rpg(line: &str, raw: &str, column_6: Option<char>) -> bool {
    if line.starts_with("**FREE") || columns::slice(line, 0, 6).contains("FMT") {
        return true;
    }
    if RPG_SPECS.contains(&columns::slice(line, 0, 7).trim()) {
        return true;
    }
    let spec_letter = column_6.map_or(false, |c| "HFDCP".contains(c));
    spec_letter && matches!(columns::char_at(raw, 6), None | Some(' ') | Some('*'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_from_path() {
        assert_eq!(infer_from_path("x.clle"), Kind::Cl);
        assert_eq!(infer_from_path("src/PAYROLL.CL"), Kind::Cl);
        assert_eq!(infer_from_path("x.clp"), Kind::Cl);
        assert_eq!(infer_from_path("x.rpgle"), Kind::Rpg);
        assert_eq!(infer_from_path("x.SQLRPGLE"), Kind::Rpg);
        assert_eq!(infer_from_path("schema.sql"), Kind::Db2);
        assert_eq!(infer_from_path("screen.dspf"), Kind::Dspf);
        assert_eq!(infer_from_path("notes.txt"), Kind::Auto);
        assert_eq!(infer_from_path("MEMBER"), Kind::Auto);
    }

    #[test]
    fn test_infer_from_content() {
        assert_eq!(infer_from_content("**FREE", "x.txt"), Kind::Rpg);
        assert_eq!(infer_from_content("**free\ndcl-s x int(10);", "x.txt"), Kind::Rpg);
        assert_eq!(infer_from_content("SELECT 1", "x.txt"), Kind::Db2);
        assert_eq!(infer_from_content("\n\n  create table t (a int);", "x.txt"), Kind::Db2);
        assert_eq!(infer_from_content("PGM PARM(&A)", "x.txt"), Kind::Cl);
        assert_eq!(infer_from_content("             CALL PGM(FOO)", "x.txt"), Kind::Cl);
        assert_eq!(infer_from_content("R HEADER", "x.txt"), Kind::Dspf);
        assert_eq!(infer_from_content("     A          R HEADER", "x.txt"), Kind::Dspf);
        assert_eq!(infer_from_content("hello world", "x.txt"), Kind::Auto);
        assert_eq!(infer_from_content("hello world", "x.sql"), Kind::Db2);
        assert_eq!(infer_from_content("", "x.dspf"), Kind::Dspf);
    }

    #[test]
    fn test_fixed_form_rpg_beats_cl() {
        assert_eq!(infer_from_content("     D COUNT           S             10I 0", "x"), Kind::Rpg);
        assert_eq!(infer_from_content("     H* header comment", "x"), Kind::Rpg);
        assert_eq!(infer_from_content("     H DFTACTGRP(*NO)", "x"), Kind::Rpg);
        assert_eq!(infer_from_content("D", "x"), Kind::Rpg);
        // column 7 holds a letter, so the spec letter does not count
        assert_eq!(infer_from_content("     PGM", "x"), Kind::Cl);
    }

    #[test]
    fn test_names_round_trip() {
        for kind in [Kind::Cl, Kind::Rpg, Kind::Db2, Kind::Dspf, Kind::Auto] {
            assert_eq!(kind.to_string().parse::<Kind>(), Ok(kind));
        }
        assert_eq!("COMBINED".parse::<Mode>(), Ok(Mode::Combined));
        let err = "cobol".parse::<Kind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown kind 'cobol', expected one of: auto, cl, rpg, db2, dspf");
    }

    #[test]
    fn test_mode_selection() {
        assert_eq!(Mode::Combined.select(Kind::Db2), Some(Kind::Db2));
        assert_eq!(Mode::Auto.select(Kind::Auto), None);
        assert_eq!(Mode::Rpg.select(Kind::Rpg), Some(Kind::Rpg));
        assert_eq!(Mode::Rpg.select(Kind::Auto), Some(Kind::Rpg));
        assert_eq!(Mode::Rpg.select(Kind::Db2), None);
    }
}
