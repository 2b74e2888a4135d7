//! Command line definition

use clap::{value_parser, Arg, ArgAction, Command};
use scat_core::ProjectSort;
use scat_record::{ItemId, ProjectId};
use std::path::PathBuf;

pub(crate) fn command() -> Command {
    Command::new("scat")
        .version(scat_core::VERSION)
        .about("Systematic Causal Analysis Technique: causal filter and project store")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("eligible")
                .about("List control needs made eligible by a basic-cause selection")
                .arg(
                    Arg::new("select")
                        .long("select")
                        .short('s')
                        .value_delimiter(',')
                        .value_parser(value_parser!(u32))
                        .action(ArgAction::Append)
                        .help("Selected basic cause ids, comma separated"),
                ),
        )
        .subcommand(
            Command::new("projects")
                .about("Manage saved projects")
                .subcommand_required(true)
                .subcommand(
                    Command::new("list")
                        .about("List active projects")
                        .arg(
                            Arg::new("search")
                                .long("search")
                                .help("Case-insensitive match on name, event or area"),
                        )
                        .arg(
                            Arg::new("sort")
                                .long("sort")
                                .default_value("modified")
                                .value_parser(["name", "modified", "progress"])
                                .help("Sort order"),
                        ),
                )
                .subcommand(Command::new("trash").about("List trashed projects"))
                .subcommand(
                    Command::new("create")
                        .about("Create a project")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("description").long("description")),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Move a project to the trash")
                        .arg(project_id_arg()),
                )
                .subcommand(
                    Command::new("restore")
                        .about("Move a project out of the trash")
                        .arg(project_id_arg()),
                )
                .subcommand(
                    Command::new("purge")
                        .about("Permanently delete a trashed project")
                        .arg(project_id_arg())
                        .arg(yes_arg()),
                )
                .subcommand(
                    Command::new("empty-trash")
                        .about("Permanently delete every trashed project")
                        .arg(yes_arg()),
                ),
        )
}

fn project_id_arg() -> Arg {
    Arg::new("id")
        .required(true)
        .value_parser(value_parser!(ProjectId))
        .help("Project id")
}

fn yes_arg() -> Arg {
    Arg::new("yes")
        .long("yes")
        .short('y')
        .action(ArgAction::SetTrue)
        .help("Do not ask for confirmation")
}

pub(crate) fn sort_from_arg(value: &str) -> ProjectSort {
    match value {
        "name" => ProjectSort::Name,
        "progress" => ProjectSort::Progress,
        _ => ProjectSort::Modified,
    }
}

pub(crate) fn selected_ids(args: &clap::ArgMatches) -> Vec<ItemId> {
    args.get_many::<u32>("select")
        .map(|ids| ids.copied().map(ItemId).collect())
        .unwrap_or_default()
}
