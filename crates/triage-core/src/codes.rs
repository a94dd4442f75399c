//! Regulatory codes with a history of recording errors

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ErrorProneCode {
    pub code: &'static str,
    pub boost: u8,
    pub reason: &'static str,
}

const ERROR_PRONE: &[ErrorProneCode] = &[
    ErrorProneCode {
        code: "391.41",
        boost: 15,
        reason: "Medical certificate issues often involve clerical errors",
    },
    ErrorProneCode {
        code: "391.45",
        boost: 12,
        reason: "Medical examiner certification status can be verified",
    },
    ErrorProneCode {
        code: "395.8",
        boost: 18,
        reason: "ELD data can provide contradicting evidence",
    },
    ErrorProneCode {
        code: "395.3",
        boost: 15,
        reason: "Hours violations often involve complex calculations",
    },
    ErrorProneCode {
        code: "393.9",
        boost: 10,
        reason: "Inoperative equipment may have been fixed on scene",
    },
    ErrorProneCode {
        code: "393.45",
        boost: 12,
        reason: "Brake adjustment can be verified with documentation",
    },
    ErrorProneCode {
        code: "393.47",
        boost: 10,
        reason: "Brake tubing issues may be misidentified",
    },
    ErrorProneCode {
        code: "392.2",
        boost: 8,
        reason: "State/local law violations may not apply to commercial vehicles",
    },
    ErrorProneCode {
        code: "392.16",
        boost: 10,
        reason: "Seat belt violations may have extenuating circumstances",
    },
];

static TABLE: Lazy<HashMap<&'static str, ErrorProneCode>> =
    Lazy::new(|| ERROR_PRONE.iter().map(|c| (c.code, *c)).collect());

/// Part and section, e.g. "395.8" out of "395.8(e)(1)" or "392.2S"
static PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.(\d+)").expect("static code prefix pattern"));

/// Part.section prefix of a regulatory code
pub fn code_prefix(code: &str) -> Option<String> {
    let caps = PREFIX.captures(code.trim())?;
    Some(format!("{}.{}", &caps[1], &caps[2]))
}

pub fn lookup(code: &str) -> Option<&'static ErrorProneCode> {
    TABLE.get(code_prefix(code)?.as_str())
}

/// Bonus points for a known error-prone code, capped at 10
pub fn error_prone_bonus(code: Option<&str>) -> i32 {
    code.and_then(lookup)
        .map(|entry| (f64::from(entry.boost) * 0.55).round() as i32)
        .unwrap_or(0)
        .min(10)
}

pub fn all() -> &'static [ErrorProneCode] {
    ERROR_PRONE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_strips_suffixes() {
        assert_eq!(code_prefix("395.8(e)(1)").as_deref(), Some("395.8"));
        assert_eq!(code_prefix(" 392.2S ").as_deref(), Some("392.2"));
        assert_eq!(code_prefix("393.45B2").as_deref(), Some("393.45"));
        assert_eq!(code_prefix("OOS"), None);
    }

    #[test]
    fn test_bonus_values() {
        assert_eq!(error_prone_bonus(Some("395.8")), 10);
        assert_eq!(error_prone_bonus(Some("391.45")), 7);
        assert_eq!(error_prone_bonus(Some("392.2S")), 4);
        assert_eq!(error_prone_bonus(Some("396.3A1")), 0);
        assert_eq!(error_prone_bonus(None), 0);
    }

    #[test]
    fn test_prefix_must_match_whole_section() {
        assert!(lookup("393.4").is_none());
        assert!(lookup("392.160").is_none());
    }
}
