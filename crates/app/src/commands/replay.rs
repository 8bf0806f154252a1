use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use course_core::model::CourseId;
use course_core::progress::EventOutcome;
use course_core::{CourseSession, LearnerEvent};
use services::{Clock, CourseSessionService, EngineConfig, HttpProgressRepository};
use storage::{InMemoryRepository, JsonCourseDirectory, ProgressRepository, Storage};
use tracing::{debug, info};

#[derive(Args)]
pub struct ReplayArgs {
    /// Course content JSON file
    #[arg(long)]
    pub course: PathBuf,

    /// JSON array of learner events
    #[arg(long)]
    pub events: PathBuf,

    /// Engine configuration (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Send the session report to the configured progress service
    #[arg(long)]
    pub report: bool,
}

pub async fn run(args: ReplayArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    }
    .with_env_overrides()?;

    let (root, course_id) = split_course_path(&args.course)?;
    let progress: Arc<dyn ProgressRepository> = if args.report {
        let service_config = config
            .progress_service
            .clone()
            .ok_or_else(|| {
                anyhow!("--report needs a [progress_service] table or COURSE_PROGRESS_URL")
            })?;
        Arc::new(HttpProgressRepository::new(service_config)?)
    } else {
        Arc::new(InMemoryRepository::new())
    };

    let storage = Storage {
        courses: Arc::new(JsonCourseDirectory::new(root)),
        progress,
    };
    let service =
        CourseSessionService::from_storage(Clock::default(), &storage).with_gate_options(config.gate);

    let events = read_events(&args.events).await?;
    let mut active = service
        .start(&course_id)
        .await
        .with_context(|| format!("failed to start course {}", args.course.display()))?;

    let lines = replay(active.session_mut(), &events);
    for line in &lines {
        println!("{line}");
    }
    print!("{}", summary(active.session()));

    if args.report {
        let id = service.finish(&mut active).await?;
        info!(report = id, "session report stored");
        println!("report id: {id}");
    }
    Ok(())
}

/// Turn `dir/name.json` into the directory and the course id `name`.
fn split_course_path(path: &Path) -> Result<(PathBuf, CourseId)> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| anyhow!("course path {} has no file name", path.display()))?;
    if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
        bail!("course file {} must end in .json", path.display());
    }
    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((root, CourseId::new(stem)))
}

async fn read_events(path: &Path) -> Result<Vec<LearnerEvent>> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read events {}", path.display()))?;
    let events: Vec<LearnerEvent> = serde_json::from_slice(&raw)
        .with_context(|| format!("events {} are not a list of learner events", path.display()))?;
    debug!(count = events.len(), "events loaded");
    Ok(events)
}

fn replay(session: &mut CourseSession, events: &[LearnerEvent]) -> Vec<String> {
    events
        .iter()
        .enumerate()
        .map(|(index, event)| match session.apply(event) {
            EventOutcome::Applied => format!("#{:<3} applied   {event:?}", index + 1),
            EventOutcome::Rejected(reason) => {
                format!("#{:<3} rejected  {event:?}: {reason}", index + 1)
            }
        })
        .collect()
}

fn summary(session: &CourseSession) -> String {
    let learn = session.learn_totals();
    let scenarios = session.scenario_totals();
    format!(
        "stage: {}\nlessons complete: {}/{}\nquiz: {}/{} ({:.0}%)\nscenarios: {}/{} ({} revealed)\n",
        session.stage(),
        session.completed_lessons().len(),
        session.content().lessons.len(),
        learn.score,
        learn.total,
        learn.average * 100.0,
        scenarios.score,
        scenarios.total,
        scenarios.revealed
    )
}
