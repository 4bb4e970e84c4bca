//! Skill experience years aggregated from the resume's job list.
//!
//! A job counts towards a skill when any of its achievements mentions the
//! skill (case-insensitive substring). The calendar years the job spans are
//! unioned across all matching jobs, so overlapping jobs never double count.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{DateRange, JobRecord, SiteError, SiteResult};

/// End token meaning "still ongoing".
const PRESENT: &str = "Present";

/// Parenthetical annotations in skill labels, including surrounding spaces.
static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.*?\)\s*").expect("parenthetical regex is valid"));

const MONTH_PREFIXES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Full-date layouts tried for a single date token.
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%b %d, %Y", "%B %d, %Y", "%b %d %Y", "%d %b %Y"];

/// Count the distinct calendar years of experience with `skill`.
///
/// `today` stands in for `Present` end dates. Missing or empty inputs yield 0.
/// Jobs whose date range cannot be parsed are skipped.
pub fn calculate_years_of_experience(
    jobs: Option<&[JobRecord]>,
    skill: Option<&str>,
    today: NaiveDate,
) -> usize {
    let Some(jobs) = jobs.filter(|j| !j.is_empty()) else {
        return 0;
    };
    let skill = skill.map(str::trim).unwrap_or_default();
    if skill.is_empty() {
        return 0;
    }

    let needle = skill.to_lowercase();
    let mut years = BTreeSet::new();

    for job in jobs.iter().filter(|job| has_skill(job, &needle)) {
        match parse_date_range(&job.date_range, today) {
            Ok(range) => years.extend(range.years()),
            Err(e) => {
                tracing::warn!(company = %job.company, "Skipping job for {skill:?}: {e}");
            }
        }
    }

    years.len()
}

/// Same as [`calculate_years_of_experience`] with `Present` read from the local clock.
pub fn calculate_years_of_experience_now(jobs: Option<&[JobRecord]>, skill: Option<&str>) -> usize {
    calculate_years_of_experience(jobs, skill, Local::now().date_naive())
}

fn has_skill(job: &JobRecord, needle: &str) -> bool {
    job.achievements
        .iter()
        .any(|a| a.to_lowercase().contains(needle))
}

/// Render a year count for display: `1 year`, otherwise `<n> years`.
pub fn format_years(years: usize) -> String {
    format!("{years} {}", if years == 1 { "year" } else { "years" })
}

/// Parse `"<start> - <end>"` into calendar years, resolving `Present` to `today`.
pub fn parse_date_range(raw: &str, today: NaiveDate) -> SiteResult<DateRange> {
    let invalid = |reason: &str| SiteError::InvalidDate {
        raw: raw.to_string(),
        reason: reason.to_string(),
    };

    let (start, end) = raw
        .split_once('-')
        .ok_or_else(|| invalid("missing '-' separator"))?;
    let (start, end) = (start.trim(), end.trim());

    let start_year = parse_year(start).ok_or_else(|| invalid("unrecognised start date"))?;
    let end_year = if end.eq_ignore_ascii_case(PRESENT) {
        today.year()
    } else {
        parse_year(end).ok_or_else(|| invalid("unrecognised end date"))?
    };

    Ok(DateRange {
        start_year,
        end_year,
    })
}

/// Extract the year from a date token such as `Jan 2020`, `January 2020` or `2020`.
fn parse_year(token: &str) -> Option<i32> {
    let token = abbreviate_month(&token.replace('.', ""));
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    if token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit()) {
        return token.parse().ok();
    }

    // Month + year: pin the day so chrono has a full date.
    for fmt in ["%d %b %Y", "%d %B %Y", "%d %m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("1 {token}"), fmt) {
            return Some(d.year());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
        .map(|d| d.year())
}

/// Shorten a leading month word to its three-letter prefix, so spellings
/// such as `Sept` parse like `Sep`.
fn abbreviate_month(token: &str) -> String {
    let token = token.trim();
    let word_len = token
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(token.len());
    if word_len <= 3 {
        return token.to_string();
    }
    let prefix = token[..3].to_ascii_lowercase();
    if MONTH_PREFIXES.contains(&prefix.as_str()) {
        format!("{}{}", &token[..3], &token[word_len..])
    } else {
        token.to_string()
    }
}

/// Strip parenthetical annotations: `"React (Hooks)"` becomes `"React"`.
pub fn clean_skill_label(label: &str) -> String {
    PARENTHETICAL.replace_all(label, "").trim().to_string()
}

/// Clean a skill label and append its experience, when there is any.
pub fn annotate_skill_label(jobs: &[JobRecord], label: &str, today: NaiveDate) -> String {
    let clean = clean_skill_label(label);
    let years = calculate_years_of_experience(Some(jobs), Some(&clean), today);
    if years > 0 {
        format!("{clean} ({})", format_years(years))
    } else {
        clean
    }
}

pub fn annotate_skill_labels(jobs: &[JobRecord], labels: &[String], today: NaiveDate) -> Vec<String> {
    labels
        .iter()
        .map(|label| annotate_skill_label(jobs, label, today))
        .collect()
}

/// A labelled group of skills, e.g. `Frontend: React, Vue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillCategory {
    pub name: String,
    pub skills: Vec<String>,
}

/// Split a `Name: a, b, c` line. Returns `None` when there is no `:`.
pub fn parse_skill_category(line: &str) -> Option<SkillCategory> {
    let (name, rest) = line.split_once(':')?;
    let skills = rest
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    Some(SkillCategory {
        name: name.trim().to_string(),
        skills,
    })
}

/// Render a category with each skill annotated, e.g. `Frontend: React (5 years), Vue`.
pub fn annotate_category(jobs: &[JobRecord], category: &SkillCategory, today: NaiveDate) -> String {
    let skills = annotate_skill_labels(jobs, &category.skills, today);
    format!("{}: {}", category.name, skills.join(", "))
}

/// Decode the job-list document embedded in the resume page.
pub fn load_jobs(json: &str) -> SiteResult<Vec<JobRecord>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn jobs() -> Vec<JobRecord> {
        vec![
            JobRecord::new(
                "Company A",
                "Jan 2020 - Dec 2022",
                &[
                    "Led development using React and TypeScript",
                    "Implemented CI/CD pipelines",
                ],
            ),
            JobRecord::new(
                "Company B",
                "Jan 2023 - Present",
                &[
                    "Built microservices using React and Node.js",
                    "Managed AWS infrastructure",
                ],
            ),
        ]
    }

    #[test]
    fn test_present_resolves_to_today() {
        assert_eq!(calculate_years_of_experience(Some(&jobs()), Some("React"), today()), 5);
    }

    #[test]
    fn test_wall_clock_variant() {
        // Jan 2020 through at least 2024
        assert!(calculate_years_of_experience_now(Some(&jobs()), Some("React")) >= 5);
    }

    #[test]
    fn test_fixed_range() {
        let jobs = [JobRecord::new("A", "Jan 2020 - Dec 2022", &["Used Python for data analysis"])];
        assert_eq!(calculate_years_of_experience(Some(&jobs), Some("Python"), today()), 3);
    }

    #[test]
    fn test_case_insensitive() {
        let jobs = jobs();
        let upper = calculate_years_of_experience(Some(&jobs), Some("React"), today());
        let lower = calculate_years_of_experience(Some(&jobs), Some("react"), today());
        let shout = calculate_years_of_experience(Some(&jobs), Some("REACT"), today());
        assert_eq!(upper, lower);
        assert_eq!(upper, shout);
    }

    #[test]
    fn test_skill_not_found() {
        assert_eq!(calculate_years_of_experience(Some(&jobs()), Some("Rust"), today()), 0);
    }

    #[test]
    fn test_empty_inputs() {
        let jobs = jobs();
        assert_eq!(calculate_years_of_experience(None, Some("React"), today()), 0);
        assert_eq!(calculate_years_of_experience(Some(&[]), Some("React"), today()), 0);
        assert_eq!(calculate_years_of_experience(Some(&jobs), Some(""), today()), 0);
        assert_eq!(calculate_years_of_experience(Some(&jobs), Some("   "), today()), 0);
        assert_eq!(calculate_years_of_experience(Some(&jobs), None, today()), 0);
    }

    #[test]
    fn test_overlapping_years_counted_once() {
        let jobs = [
            JobRecord::new("A", "Mar 2019 - Jun 2021", &["Go services"]),
            JobRecord::new("B", "Jan 2021 - Feb 2022", &["More go services"]),
        ];
        // 2019, 2020, 2021, 2022
        assert_eq!(calculate_years_of_experience(Some(&jobs), Some("Go"), today()), 4);
    }

    #[test]
    fn test_substring_match_is_kept() {
        let jobs = [JobRecord::new("A", "Jan 2018 - Dec 2018", &["Wrote JavaScript tooling"])];
        assert_eq!(calculate_years_of_experience(Some(&jobs), Some("Java"), today()), 1);
    }

    #[test]
    fn test_surrounding_whitespace_in_skill() {
        assert_eq!(calculate_years_of_experience(Some(&jobs()), Some("  React "), today()), 5);
    }

    #[test]
    fn test_unparsable_job_is_skipped() {
        let jobs = [
            JobRecord::new("A", "sometime - later", &["React"]),
            JobRecord::new("B", "Jan 2021 - Dec 2021", &["React"]),
        ];
        assert_eq!(calculate_years_of_experience(Some(&jobs), Some("React"), today()), 1);
    }

    #[test]
    fn test_reversed_range_contributes_nothing() {
        let jobs = [JobRecord::new("A", "Jan 2022 - Jan 2020", &["React"])];
        assert_eq!(calculate_years_of_experience(Some(&jobs), Some("React"), today()), 0);
    }

    #[test]
    fn test_format_years() {
        assert_eq!(format_years(0), "0 years");
        assert_eq!(format_years(1), "1 year");
        assert_eq!(format_years(5), "5 years");
    }

    #[test]
    fn test_parse_date_range_formats() {
        let cases = [
            ("Jan 2020 - Dec 2022", (2020, 2022)),
            ("January 2020 - March 2021", (2020, 2021)),
            ("Jan. 2019 - Present", (2019, 2024)),
            ("2015 - 2017", (2015, 2017)),
            ("01/2016 - 12/2018", (2016, 2018)),
            ("Jan 15, 2020 - Feb 1, 2021", (2020, 2021)),
            ("Jun 2023 - present", (2023, 2024)),
            ("Sept 2020 - Present", (2020, 2024)),
            ("Sept. 2018 - Sept 2019", (2018, 2019)),
            ("Sept 15, 2020 - Febr 2021", (2020, 2021)),
        ];
        for (raw, (start, end)) in cases {
            let range = parse_date_range(raw, today()).unwrap();
            assert_eq!((range.start_year, range.end_year), (start, end), "{raw}");
        }
    }

    #[test]
    fn test_parse_date_range_errors() {
        assert!(matches!(
            parse_date_range("Jan 2020", today()),
            Err(SiteError::InvalidDate { .. })
        ));
        assert!(parse_date_range("Jan 2020 - whenever", today()).is_err());
        assert!(parse_date_range(" - Dec 2020", today()).is_err());
    }

    #[test]
    fn test_clean_skill_label() {
        assert_eq!(clean_skill_label("React (Hooks)"), "React");
        assert_eq!(clean_skill_label("  Python (3.x) "), "Python");
        assert_eq!(clean_skill_label("AWS (EC2) (S3)"), "AWS");
        assert_eq!(clean_skill_label("Docker"), "Docker");
    }

    #[test]
    fn test_annotate_skill_labels() {
        let labels = vec!["React (Hooks)".to_string(), "Rust".to_string(), "AWS".to_string()];
        let out = annotate_skill_labels(&jobs(), &labels, today());
        assert_eq!(out, vec!["React (5 years)", "Rust", "AWS (2 years)"]);
    }

    #[test]
    fn test_skill_category_round() {
        let cat = parse_skill_category("Frontend: React (Hooks), TypeScript, ").unwrap();
        assert_eq!(cat.name, "Frontend");
        assert_eq!(cat.skills, vec!["React (Hooks)", "TypeScript"]);
        assert_eq!(
            annotate_category(&jobs(), &cat, today()),
            "Frontend: React (5 years), TypeScript (3 years)"
        );
        assert!(parse_skill_category("no separator").is_none());
    }

    #[test]
    fn test_load_jobs() {
        let json = r#"[
            {"company": "A", "title": "Engineer", "date": "Jan 2020 - Dec 2020", "achievements": ["React"]}
        ]"#;
        let jobs = load_jobs(json).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].date_range, "Jan 2020 - Dec 2020");
        assert!(load_jobs("{").is_err());
    }
}
