//! Subcommand handlers
//!
//! Handlers write to any [`Write`] so they can be exercised without a
//! terminal.

use anyhow::{Context, Result};
use scat_catalog::{
    compute_eligible_control_needs, Catalog, CatalogKind, CausalLink, EligibilityState,
};
use scat_core::{
    Confirmation, JsonFileStore, Outcome, ProjectLifecycleStore, ProjectQuery, ScatConfig,
};
use scat_record::{ItemId, Project, ProjectId};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

fn load_link_table(path: &Path) -> Result<CausalLink> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading link table {}", path.display()))?;
    let link = CausalLink::from_json(&raw)
        .with_context(|| format!("parsing link table {}", path.display()))?;
    link.validate(
        Catalog::builtin(CatalogKind::BasicCauses)?,
        Catalog::builtin(CatalogKind::ControlNeeds)?,
    )
    .with_context(|| format!("checking link table {}", path.display()))?;
    tracing::debug!(path = %path.display(), rows = link.len(), "custom link table loaded");
    Ok(link)
}

pub(crate) fn eligible(config: &ScatConfig, selected: &[ItemId], out: &mut impl Write) -> Result<()> {
    let basic_causes = Catalog::builtin(CatalogKind::BasicCauses)?;
    let control_needs = Catalog::builtin(CatalogKind::ControlNeeds)?;
    let custom;
    let link = match &config.catalog.link_table {
        Some(path) => {
            custom = load_link_table(path)?;
            &custom
        }
        None => CausalLink::builtin()?,
    };

    for id in selected.iter().filter(|id| !basic_causes.contains(**id)) {
        tracing::warn!(%id, "not a basic cause id; ignored by the filter");
    }

    let eligible = compute_eligible_control_needs(selected.iter().copied(), link, control_needs);
    match eligible.state() {
        EligibilityState::AwaitingBasicCauses => {
            writeln!(out, "Select at least one basic cause to see eligible control needs.")?;
        }
        EligibilityState::NoLinkedControls => {
            writeln!(out, "The selected basic causes are not linked to any control need.")?;
        }
        EligibilityState::Available => {
            writeln!(out, "Eligible control needs ({}):", eligible.len())?;
            for group in eligible.groups() {
                writeln!(out, "  {}", group.category)?;
                for item in &group.items {
                    writeln!(out, "    [{:>2}] {}", item.id, item.title)?;
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn open_projects(config: &ScatConfig) -> Result<ProjectLifecycleStore> {
    let kv = Arc::new(JsonFileStore::new(&config.storage.data_dir));
    ProjectLifecycleStore::open(kv, config.storage_keys(), Vec::new()).with_context(|| {
        format!(
            "opening project store in {}",
            config.storage.data_dir.display()
        )
    })
}

fn print_active(projects: &[Project], out: &mut impl Write) -> Result<()> {
    if projects.is_empty() {
        writeln!(out, "No projects.")?;
    }
    for project in projects {
        writeln!(
            out,
            "{}  {:>3}%  {}  {}",
            project.id(),
            project.record.progress().percent(),
            project.last_modified.format("%Y-%m-%d %H:%M"),
            project.name
        )?;
    }
    Ok(())
}

pub(crate) fn list(
    projects: &ProjectLifecycleStore,
    query: &ProjectQuery,
    out: &mut impl Write,
) -> Result<()> {
    print_active(&projects.query(query), out)
}

pub(crate) fn trash(projects: &ProjectLifecycleStore, out: &mut impl Write) -> Result<()> {
    let trashed = projects.trash();
    if trashed.is_empty() {
        writeln!(out, "Trash is empty.")?;
    }
    for project in &trashed {
        let deleted = project
            .deleted_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        writeln!(out, "{}  deleted {}  {}", project.id(), deleted, project.name)?;
    }
    Ok(())
}

pub(crate) fn create(
    projects: &ProjectLifecycleStore,
    name: &str,
    description: Option<&str>,
    out: &mut impl Write,
) -> Result<ProjectId> {
    let mut project = Project::new(name);
    if let Some(description) = description {
        project = project.with_description(description);
    }
    let id = projects.create(project)?;
    writeln!(out, "{id}")?;
    Ok(id)
}

pub(crate) fn delete(
    projects: &ProjectLifecycleStore,
    id: ProjectId,
    out: &mut impl Write,
) -> Result<()> {
    projects.soft_delete(id)?;
    writeln!(out, "Moved {id} to the trash.")?;
    Ok(())
}

pub(crate) fn restore(
    projects: &ProjectLifecycleStore,
    id: ProjectId,
    out: &mut impl Write,
) -> Result<()> {
    projects.restore(id)?;
    writeln!(out, "Restored {id}.")?;
    Ok(())
}

fn report(outcome: Outcome, nothing: &str, out: &mut impl Write) -> Result<()> {
    match outcome {
        Outcome::Applied(1) => writeln!(out, "Permanently deleted 1 project.")?,
        Outcome::Applied(n) => writeln!(out, "Permanently deleted {n} projects.")?,
        Outcome::Declined => writeln!(out, "Cancelled.")?,
        Outcome::NoOp => writeln!(out, "{nothing}")?,
    }
    Ok(())
}

pub(crate) async fn purge(
    projects: &ProjectLifecycleStore,
    id: ProjectId,
    confirm: &dyn Confirmation,
    out: &mut impl Write,
) -> Result<Outcome> {
    let outcome = projects.permanently_delete(id, confirm).await?;
    report(outcome, &format!("No trashed project {id}."), out)?;
    Ok(outcome)
}

pub(crate) async fn empty_trash(
    projects: &ProjectLifecycleStore,
    confirm: &dyn Confirmation,
    out: &mut impl Write,
) -> Result<Outcome> {
    let outcome = projects.empty_trash(confirm).await?;
    report(outcome, "Trash is already empty.", out)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scat_core::ProjectSort;
    use scat_test_utils::ScriptedConfirmation;

    fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn eligible_without_selection_prints_notice() {
        let text = output(|out| eligible(&ScatConfig::default(), &[], out));
        assert_eq!(
            text,
            "Select at least one basic cause to see eligible control needs.\n"
        );
    }

    #[test]
    fn eligible_groups_builtin_controls() {
        let text = output(|out| eligible(&ScatConfig::default(), &[ItemId(1)], out));
        assert!(text.starts_with("Eligible control needs (5):\n"));
        assert!(text.contains("[ 6]"));
        assert!(!text.contains("[ 1]"));
    }

    #[test]
    fn eligible_uses_configured_link_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.json");
        std::fs::write(&path, r#"{"version": 7, "links": {"3": [2]}}"#).unwrap();
        let config = ScatConfig::default().with_link_table(&path);

        let text = output(|out| eligible(&config, &[ItemId(3)], out));
        assert!(text.starts_with("Eligible control needs (1):\n"));
        assert!(text.contains("[ 2]"));

        let text = output(|out| eligible(&config, &[ItemId(5)], out));
        assert_eq!(
            text,
            "The selected basic causes are not linked to any control need.\n"
        );
    }

    #[test]
    fn link_table_with_unknown_control_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.json");
        std::fs::write(&path, r#"{"version": 1, "links": {"3": [999]}}"#).unwrap();
        let config = ScatConfig::default().with_link_table(&path);
        let mut out = Vec::new();
        assert!(eligible(&config, &[ItemId(3)], &mut out).is_err());
    }

    #[tokio::test]
    async fn project_commands_share_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScatConfig::default().with_data_dir(dir.path());
        let projects = open_projects(&config).unwrap();

        let mut sink = Vec::new();
        let keep = create(&projects, "Forklift", Some("Dock 3"), &mut sink).unwrap();
        let doomed = create(&projects, "Ladder", None, &mut sink).unwrap();
        delete(&projects, doomed, &mut sink).unwrap();

        let reopened = open_projects(&config).unwrap();
        let listed = output(|out| {
            list(
                &reopened,
                &ProjectQuery::default().sorted_by(ProjectSort::Name),
                out,
            )
        });
        assert!(listed.contains(&keep.to_string()));
        assert!(!listed.contains("Ladder"));
        assert!(output(|out| trash(&reopened, out)).contains("Ladder"));

        let decline = ScriptedConfirmation::new([false]);
        let mut out = Vec::new();
        assert_eq!(
            empty_trash(&reopened, &decline, &mut out).await.unwrap(),
            Outcome::Declined
        );
        assert_eq!(String::from_utf8(out).unwrap(), "Cancelled.\n");

        let approve = ScriptedConfirmation::always(true);
        let mut out = Vec::new();
        assert_eq!(
            purge(&reopened, doomed, &approve, &mut out).await.unwrap(),
            Outcome::Applied(1)
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Permanently deleted 1 project.\n"
        );
        assert_eq!(output(|out| trash(&reopened, out)), "Trash is empty.\n");
    }
}
