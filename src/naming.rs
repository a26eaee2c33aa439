//! The three AcuWand file naming conventions.
//!
//! ```text
//! Format 1  00001_0005_18-01-2079_01-22-33_03679.csv
//!           wand_instance_date(D-M-Y)_timeofday_rows
//! Format 2  00001_0005___01-18-79___01-22___7.0_mins.csv
//!           wand_instance___date(M-D-Y)___timeofday___minutes_mins
//! Format 3  STUDY03-0512-001_T7_1-18-79_part1.csv
//!           study-site-subject_cohort_date(M-D-Y)[_partN]
//! ```

use crate::RawFile;
use chrono::NaiveDate;
use regex::Regex;
use std::fmt;

/// Width of the `wand_instance` prefix carried by Format 1 and 2 names.
pub const WAND_INSTANCE_PREFIX_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NamingFormat {
    Format1,
    Format2,
    Format3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateOrder {
    DayMonthYear,
    MonthDayYear,
}

impl NamingFormat {
    /// Most specific first: Format 1's pattern also accepts many Format 2 names.
    pub const PRECEDENCE: [NamingFormat; 3] = [
        NamingFormat::Format3,
        NamingFormat::Format2,
        NamingFormat::Format1,
    ];

    pub fn number(self) -> u8 {
        match self {
            NamingFormat::Format1 => 1,
            NamingFormat::Format2 => 2,
            NamingFormat::Format3 => 3,
        }
    }

    fn date_token_index(self) -> usize {
        match self {
            NamingFormat::Format1 => 2,
            // `___` splits into two empty tokens
            NamingFormat::Format2 => 4,
            NamingFormat::Format3 => 2,
        }
    }

    fn date_order(self) -> DateOrder {
        match self {
            NamingFormat::Format1 => DateOrder::DayMonthYear,
            NamingFormat::Format2 | NamingFormat::Format3 => DateOrder::MonthDayYear,
        }
    }

    /// The date token of a file stem (name without `.csv`).
    pub fn date_token(self, stem: &str) -> Option<&str> {
        stem.split('_')
            .nth(self.date_token_index())
            .filter(|token| !token.is_empty())
    }

    /// Name used to order files within one date. Format 1 and 2 names lead
    /// with the wand/instance identifier, which says nothing about time.
    pub fn ordering_name(self, stem: &str) -> &str {
        match self {
            NamingFormat::Format1 | NamingFormat::Format2 => {
                stem.get(WAND_INSTANCE_PREFIX_LEN..).unwrap_or("")
            }
            NamingFormat::Format3 => stem,
        }
    }

    /// Calendar date of a date token, `None` if it is not three numeric fields.
    /// Two-digit years are read as 20YY.
    pub fn parse_date(self, token: &str) -> Option<NaiveDate> {
        let mut fields = token.split('-').map(|f| f.trim().parse::<u32>().ok());
        let (a, b, year) = match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(Some(a)), Some(Some(b)), Some(Some(year)), None) => (a, b, year),
            _ => return None,
        };
        let year = if year < 100 { 2000 + year } else { year };
        let (month, day) = match self.date_order() {
            DateOrder::DayMonthYear => (b, a),
            DateOrder::MonthDayYear => (a, b),
        };
        NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
    }
}

/// Splits a trailing part marker (`_part2`, `_Part 3`, `_part1_graph`) off a
/// stem, returning the base and the part number.
pub fn split_part(stem: &str) -> (&str, Option<u32>) {
    // ASCII lowercasing keeps byte offsets valid for `stem`
    let lower = stem.to_ascii_lowercase();
    let Some(at) = lower.rfind("_part") else {
        return (stem, None);
    };
    let rest = lower[at + "_part".len()..].trim_start_matches(' ');
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    let tail = &rest[digits_len..];
    if digits_len == 0 || !(tail.is_empty() || tail == "_graph") {
        return (stem, None);
    }
    match rest[..digits_len].parse() {
        Ok(part) => (&stem[..at], Some(part)),
        Err(_) => (stem, None),
    }
}

impl fmt::Display for NamingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Format Style: {}", self.number())
    }
}

/// Files of one subject that matched the selected format.
#[derive(Debug, Clone)]
pub struct ClassifiedFiles {
    pub format: NamingFormat,
    pub files: Vec<RawFile>,
    /// Files that matched none of the patterns of the selected format.
    pub unmatched: Vec<RawFile>,
}

/// Structural patterns for one cohort. Format 3 names embed the cohort id.
pub struct FormatClassifier {
    format1: Regex,
    format2: Regex,
    format3: Regex,
}

impl FormatClassifier {
    pub fn new(cohort_id: &str) -> Result<Self, regex::Error> {
        Ok(FormatClassifier {
            format1: Regex::new(r"^.*_.*_.*-.*-.*_.*_.*\.csv$")?,
            format2: Regex::new(r"^.*_.*___.*-.*-.*___.*___.*_.*\.csv$")?,
            format3: Regex::new(&format!(
                r"^.*{}_.*-.*-.*\.csv$",
                regex::escape(cohort_id)
            ))?,
        })
    }

    pub fn matches(&self, format: NamingFormat, name: &str) -> bool {
        match format {
            NamingFormat::Format1 => self.format1.is_match(name),
            NamingFormat::Format2 => self.format2.is_match(name),
            NamingFormat::Format3 => self.format3.is_match(name),
        }
    }

    /// First format, in precedence order, that at least one name matches.
    pub fn detect<'a, I>(&self, names: I) -> Option<NamingFormat>
    where
        I: IntoIterator<Item = &'a str>,
        I::IntoIter: Clone,
    {
        let names = names.into_iter();
        NamingFormat::PRECEDENCE
            .into_iter()
            .find(|&format| names.clone().any(|name| self.matches(format, name)))
    }

    /// Picks the subject's format and keeps only the files that follow it.
    pub fn classify(&self, files: Vec<RawFile>) -> Option<ClassifiedFiles> {
        let format = self.detect(files.iter().map(|f| f.name.as_str()))?;
        let (files, unmatched) = files
            .into_iter()
            .partition(|f| self.matches(format, &f.name));
        Some(ClassifiedFiles {
            format,
            files,
            unmatched,
        })
    }
}
