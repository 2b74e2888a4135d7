//! `scat` command line

mod cli;
mod commands;
mod logging;
mod prompt;

use anyhow::{Context, Result};
use scat_core::{Confirmation, FixedConfirmation, ProjectQuery, ScatConfig};
use scat_record::ProjectId;
use std::path::PathBuf;

fn confirmation(args: &clap::ArgMatches) -> Box<dyn Confirmation> {
    if args.get_flag("yes") {
        Box::new(FixedConfirmation(true))
    } else {
        Box::new(prompt::StdinConfirmation)
    }
}

fn project_id(args: &clap::ArgMatches) -> Result<ProjectId> {
    args.get_one::<ProjectId>("id")
        .copied()
        .context("missing project id")
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli::command().get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ScatConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ScatConfig::default(),
    };
    logging::init(&config.log_filter);
    tracing::debug!(?config, "configuration loaded");

    let mut out = std::io::stdout();
    match matches.subcommand() {
        Some(("eligible", args)) => {
            commands::eligible(&config, &cli::selected_ids(args), &mut out)?;
        }
        Some(("projects", args)) => {
            let projects = commands::open_projects(&config)?;
            match args.subcommand() {
                Some(("list", args)) => {
                    let mut query = ProjectQuery::default().sorted_by(cli::sort_from_arg(
                        args.get_one::<String>("sort").map_or("modified", String::as_str),
                    ));
                    if let Some(term) = args.get_one::<String>("search") {
                        query = query.search(term);
                    }
                    commands::list(&projects, &query, &mut out)?;
                }
                Some(("trash", _)) => commands::trash(&projects, &mut out)?,
                Some(("create", args)) => {
                    let name = args
                        .get_one::<String>("name")
                        .context("missing project name")?;
                    let description = args.get_one::<String>("description");
                    commands::create(&projects, name, description.map(String::as_str), &mut out)?;
                }
                Some(("delete", args)) => commands::delete(&projects, project_id(args)?, &mut out)?,
                Some(("restore", args)) => {
                    commands::restore(&projects, project_id(args)?, &mut out)?;
                }
                Some(("purge", args)) => {
                    let confirm = confirmation(args);
                    commands::purge(&projects, project_id(args)?, confirm.as_ref(), &mut out)
                        .await?;
                }
                Some(("empty-trash", args)) => {
                    let confirm = confirmation(args);
                    commands::empty_trash(&projects, confirm.as_ref(), &mut out).await?;
                }
                _ => unreachable!("subcommand_required"),
            }
        }
        _ => {}
    }
    Ok(())
}
