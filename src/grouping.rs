use crate::naming::{split_part, NamingFormat};
use crate::RawFile;
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Files of one subject recorded on one date, in recording order.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub date_token: String,
    pub date: Option<NaiveDate>,
    pub format: NamingFormat,
    pub files: Vec<RawFile>,
}

impl DayGroup {
    pub fn is_fragmented(&self) -> bool {
        self.files.len() > 1
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupedDays {
    pub groups: Vec<DayGroup>,
    /// Files whose name has no date token at the format's position.
    pub undated: Vec<RawFile>,
    /// Date tokens that could not be read as a calendar date.
    pub unparsed_tokens: Vec<String>,
}

impl GroupedDays {
    pub fn file_count(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }

    /// At least one date was recorded in more than one file.
    pub fn has_multi_part_days(&self) -> bool {
        self.groups.len() < self.file_count()
    }
}

struct DatedFile {
    date: Option<NaiveDate>,
    token: String,
    /// Ordering name without its part marker.
    ordering_base: String,
    part: Option<u32>,
    file: RawFile,
}

impl DatedFile {
    // Parsed dates first, chronologically; unparsed tokens after, lexically.
    fn cmp_key(&self, other: &Self) -> Ordering {
        let by_date = match (self.date, other.date) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_date
            .then_with(|| self.token.cmp(&other.token))
            .then_with(|| self.ordering_base.cmp(&other.ordering_base))
            .then_with(|| self.part.cmp(&other.part))
            .then_with(|| self.file.name.cmp(&other.file.name))
    }
}

/// Orders a subject's files by recording date and splits them into one group
/// per date token. The result does not depend on the order of `files`.
pub fn group_by_day(format: NamingFormat, files: Vec<RawFile>) -> GroupedDays {
    let mut grouped = GroupedDays::default();
    let mut dated = Vec::with_capacity(files.len());

    for file in files {
        let stem = file.stem();
        let Some(token) = format.date_token(stem) else {
            grouped.undated.push(file);
            continue;
        };
        let token = token.to_string();
        let date = format.parse_date(&token);
        if date.is_none() && !grouped.unparsed_tokens.contains(&token) {
            grouped.unparsed_tokens.push(token.clone());
        }
        let (ordering_base, part) = split_part(format.ordering_name(stem));
        dated.push(DatedFile {
            date,
            ordering_base: ordering_base.to_string(),
            part,
            token,
            file,
        });
    }

    dated.sort_by(DatedFile::cmp_key);

    for entry in dated {
        if let Some(group) = grouped
            .groups
            .last_mut()
            .filter(|g| g.date_token == entry.token)
        {
            group.files.push(entry.file);
            continue;
        }
        grouped.groups.push(DayGroup {
            date_token: entry.token,
            date: entry.date,
            format,
            files: vec![entry.file],
        });
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Subject;

    fn subject() -> Subject {
        Subject {
            cohort_id: "T7".into(),
            subject_id: "BPCR01-0512-001".into(),
            dir: "/data/T7/BPCR01-0512-001".into(),
        }
    }

    fn files(names: &[&str]) -> Vec<RawFile> {
        let subject = subject();
        names.iter().map(|n| RawFile::new(&subject, *n)).collect()
    }

    fn names(group: &DayGroup) -> Vec<&str> {
        group.files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn format1_orders_by_calendar_date_not_wand_prefix() {
        let grouped = group_by_day(
            NamingFormat::Format1,
            files(&[
                "00001_0009_02-02-2079_08-00-00_00100.csv",
                "00002_0001_18-01-2079_09-00-00_00100.csv",
                "00001_0005_18-01-2079_01-22-33_03679.csv",
                "00003_0002_03-01-2079_10-00-00_00100.csv",
            ]),
        );
        let tokens: Vec<&str> = grouped.groups.iter().map(|g| g.date_token.as_str()).collect();
        assert_eq!(tokens, vec!["03-01-2079", "18-01-2079", "02-02-2079"]);
        // same day: earlier time of day first, regardless of wand number
        assert_eq!(
            names(&grouped.groups[1]),
            vec![
                "00001_0005_18-01-2079_01-22-33_03679.csv",
                "00002_0001_18-01-2079_09-00-00_00100.csv",
            ]
        );
        assert!(grouped.has_multi_part_days());
    }

    #[test]
    fn format2_groups_on_fifth_token() {
        let grouped = group_by_day(
            NamingFormat::Format2,
            files(&[
                "00001_0006___01-19-79___10-00___3.0_mins.csv",
                "00001_0005___01-18-79___01-22___7.0_mins.csv",
            ]),
        );
        assert_eq!(grouped.groups.len(), 2);
        assert_eq!(grouped.groups[0].date_token, "01-18-79");
        assert!(!grouped.has_multi_part_days());
    }

    #[test]
    fn format3_parts_stay_in_part_order() {
        let grouped = group_by_day(
            NamingFormat::Format3,
            files(&[
                "S-0512-001_T7_1-18-79_part2.csv",
                "S-0512-001_T7_12-1-79.csv",
                "S-0512-001_T7_1-18-79_part1.csv",
            ]),
        );
        assert_eq!(grouped.groups.len(), 2);
        assert_eq!(
            names(&grouped.groups[0]),
            vec![
                "S-0512-001_T7_1-18-79_part1.csv",
                "S-0512-001_T7_1-18-79_part2.csv",
            ]
        );
        assert!(grouped.groups[0].is_fragmented());
        assert_eq!(grouped.groups[1].date_token, "12-1-79");
        assert_eq!(grouped.file_count(), 3);
    }

    #[test]
    fn parts_merge_in_numeric_order() {
        let grouped = group_by_day(
            NamingFormat::Format3,
            files(&[
                "S-0512-001_T7_1-18-79_part10.csv",
                "S-0512-001_T7_1-18-79_part2.csv",
                "S-0512-001_T7_1-18-79_part1.csv",
            ]),
        );
        assert_eq!(
            names(&grouped.groups[0]),
            vec![
                "S-0512-001_T7_1-18-79_part1.csv",
                "S-0512-001_T7_1-18-79_part2.csv",
                "S-0512-001_T7_1-18-79_part10.csv",
            ]
        );
    }

    #[test]
    fn grouping_ignores_listing_order() {
        let listing = [
            "00001_0009_02-02-2079_08-00-00_00100.csv",
            "00002_0001_18-01-2079_09-00-00_00100.csv",
            "00001_0005_18-01-2079_01-22-33_03679.csv",
            "00003_0002_03-01-2079_10-00-00_00100.csv",
            "00003_0003_03-01-2079_11-00-00_00100.csv",
        ];
        let expected = group_by_day(NamingFormat::Format1, files(&listing));

        let mut reversed = listing.to_vec();
        reversed.reverse();
        let mut rotated = listing.to_vec();
        rotated.rotate_left(2);

        for permutation in [reversed, rotated] {
            let grouped = group_by_day(NamingFormat::Format1, files(&permutation));
            assert_eq!(grouped.groups, expected.groups);
        }
    }

    #[test]
    fn colliding_suffixes_are_not_mispaired() {
        // the stripped names differ only in a leading digit of the remainder
        let grouped = group_by_day(
            NamingFormat::Format1,
            files(&[
                "00001_0005_18-01-2079_01-22-33_03679.csv",
                "00001_00051_8-01-2079_01-22-33_03679.csv",
            ]),
        );
        assert_eq!(grouped.file_count(), 2);
        let all: Vec<&str> = grouped.groups.iter().flat_map(names).collect();
        assert!(all.contains(&"00001_0005_18-01-2079_01-22-33_03679.csv"));
        assert!(all.contains(&"00001_00051_8-01-2079_01-22-33_03679.csv"));
    }

    #[test]
    fn unparsed_and_undated_files_are_reported() {
        let grouped = group_by_day(
            NamingFormat::Format3,
            files(&["S_T7_1-18-79.csv", "S_T7_lost-date-x.csv", "S_T7.csv"]),
        );
        assert_eq!(grouped.undated.len(), 1);
        assert_eq!(grouped.unparsed_tokens, vec!["lost-date-x".to_string()]);
        assert_eq!(grouped.groups.len(), 2);
        assert_eq!(grouped.groups[0].date_token, "1-18-79");
        assert_eq!(grouped.groups[1].date, None);
    }

    #[test]
    fn empty_input_has_no_groups() {
        let grouped = group_by_day(NamingFormat::Format1, Vec::new());
        assert!(grouped.groups.is_empty());
        assert!(!grouped.has_multi_part_days());
    }
}
