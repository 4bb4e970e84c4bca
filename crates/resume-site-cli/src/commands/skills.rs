//! Commands: years, skills — experience years for skill labels.

use std::path::Path;

use chrono::{Local, NaiveDate};
use serde_json::json;

use resume_site::experience::{
    annotate_category, annotate_skill_labels, calculate_years_of_experience, clean_skill_label,
    format_years, load_jobs, parse_skill_category,
};
use resume_site::JobRecord;

/// Read and decode the job-list document.
pub fn read_jobs(path: &Path) -> anyhow::Result<Vec<JobRecord>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read job list {}: {e}", path.display()))?;
    let jobs = load_jobs(&text)?;
    tracing::debug!("Loaded {} jobs from {}", jobs.len(), path.display());
    Ok(jobs)
}

/// The date `Present` resolves to: `--today` when given, otherwise the local clock.
pub fn effective_today(pinned: Option<NaiveDate>) -> NaiveDate {
    pinned.unwrap_or_else(|| Local::now().date_naive())
}

pub fn years(jobs: &[JobRecord], skill: &str, today: NaiveDate, as_json: bool) -> String {
    let clean = clean_skill_label(skill);
    let n = calculate_years_of_experience(Some(jobs), Some(&clean), today);
    if as_json {
        json!({
            "skill": clean,
            "years": n,
            "formatted": format_years(n),
            "today": today.to_string(),
        })
        .to_string()
    } else {
        format_years(n)
    }
}

/// Annotate loose labels and `Name: a, b` category lines, one output line each.
pub fn skills(
    jobs: &[JobRecord],
    labels: &[String],
    categories: &[String],
    today: NaiveDate,
    as_json: bool,
) -> anyhow::Result<String> {
    let annotated = annotate_skill_labels(jobs, labels, today);

    let mut rendered = Vec::with_capacity(categories.len());
    for line in categories {
        let category = parse_skill_category(line)
            .ok_or_else(|| anyhow::anyhow!("Category {line:?} has no ':' separator"))?;
        rendered.push(annotate_category(jobs, &category, today));
    }

    if as_json {
        return Ok(serde_json::to_string_pretty(&json!({
            "labels": annotated,
            "categories": rendered,
        }))?);
    }

    Ok(annotated
        .into_iter()
        .chain(rendered)
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs() -> Vec<JobRecord> {
        vec![
            JobRecord::new("A", "Jan 2020 - Dec 2022", &["Led development using React"]),
            JobRecord::new("B", "Jan 2023 - Present", &["Built microservices using React"]),
        ]
    }

    fn pinned() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn test_years_text_and_json() {
        assert_eq!(years(&jobs(), "React", pinned(), false), "5 years");
        assert_eq!(years(&jobs(), "Rust", pinned(), false), "0 years");

        let out: serde_json::Value =
            serde_json::from_str(&years(&jobs(), "React (Hooks)", pinned(), true)).unwrap();
        assert_eq!(out["skill"], "React");
        assert_eq!(out["years"], 5);
        assert_eq!(out["today"], "2024-03-15");
    }

    #[test]
    fn test_skills_lines() {
        let out = skills(
            &jobs(),
            &["React (Hooks)".to_string(), "Rust".to_string()],
            &["Backend: microservices, Go".to_string()],
            pinned(),
            false,
        )
        .unwrap();
        assert_eq!(out, "React (5 years)\nRust\nBackend: microservices (2 years), Go");
    }

    #[test]
    fn test_bad_category() {
        assert!(skills(&jobs(), &[], &["no colon".to_string()], pinned(), false).is_err());
    }

    #[test]
    fn test_read_jobs_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experience.json");
        std::fs::write(
            &path,
            r#"[{"company":"A","date":"Jan 2020 - Dec 2020","achievements":["React"]}]"#,
        )
        .unwrap();
        assert_eq!(read_jobs(&path).unwrap().len(), 1);
        assert!(read_jobs(&dir.path().join("missing.json")).is_err());
    }
}
