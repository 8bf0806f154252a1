use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use course_core::model::{ContentWarning, CourseContent};

#[derive(Args)]
pub struct InspectArgs {
    /// Course content JSON file
    #[arg(long)]
    pub course: PathBuf,
}

pub async fn run(args: InspectArgs) -> Result<()> {
    let content = storage::json::read_course_file(&args.course)
        .await
        .with_context(|| format!("failed to load course {}", args.course.display()))?;
    let warnings = content
        .validate()
        .with_context(|| format!("course {} is malformed", args.course.display()))?;
    print!("{}", describe(&content, &warnings));
    Ok(())
}

fn describe(content: &CourseContent, warnings: &[ContentWarning]) -> String {
    let mut out = format!("{}\n", content.title);

    let mut scoreable_total = 0;
    for (index, lesson) in content.lessons.iter().enumerate() {
        let scoreable = lesson.quick_checks.iter().filter(|qc| qc.is_scoreable()).count();
        scoreable_total += scoreable;
        out.push_str(&format!(
            "  lesson {}: {} ({} quick checks, {} scoreable)\n",
            index + 1,
            lesson.title,
            lesson.quick_checks.len(),
            scoreable
        ));
    }

    let correct_actions: usize = content
        .scenarios
        .iter()
        .map(|s| s.correct_actions().count())
        .sum();
    out.push_str(&format!(
        "scoreable quick checks: {scoreable_total}\nscenarios: {} ({correct_actions} correct actions)\n",
        content.scenarios.len()
    ));

    if warnings.is_empty() {
        out.push_str("no content warnings\n");
    } else {
        for warning in warnings {
            out.push_str(&format!("warning: {warning}\n"));
        }
    }
    out
}
