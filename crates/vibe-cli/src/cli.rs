//! Command-line definition

use clap::{value_parser, Arg, ArgAction, Command};
use vibe_core::{DomainMethod, SiteId};
use vibe_sandbox::Viewport;

fn site_arg() -> Arg {
    Arg::new("site")
        .required(true)
        .value_parser(|s: &str| s.parse::<SiteId>().map_err(|e| e.to_string()))
        .help("Site id")
}

fn email_arg() -> Arg {
    Arg::new("email")
        .long("email")
        .required(true)
        .help("Account email; the account is created on first use")
}

/// Build the `vibe` command
#[must_use]
pub fn cli() -> Command {
    Command::new("vibe")
        .version(crate::VERSION)
        .about("Chat-driven single-page site generator")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(std::path::PathBuf))
                .help("Configuration file [default: ./vibe.toml, optional]"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("generate")
                .about("Run one instruction against a new or existing site")
                .arg(email_arg())
                .arg(
                    Arg::new("site")
                        .long("site")
                        .value_parser(|s: &str| s.parse::<SiteId>().map_err(|e| e.to_string()))
                        .help("Existing site to edit; a new site is started otherwise"),
                )
                .arg(
                    Arg::new("box")
                        .long("box")
                        .value_parser(value_parser!(u32).range(1..))
                        .help("Box id the instruction is about"),
                )
                .arg(Arg::new("title").long("title").help("Site title to commit first"))
                .arg(
                    Arg::new("instruction")
                        .required(true)
                        .num_args(1..)
                        .trailing_var_arg(true)
                        .help("What to build or change"),
                ),
        )
        .subcommand(
            Command::new("sites")
                .about("List an account's sites, most recently updated first")
                .arg(email_arg()),
        )
        .subcommand(
            Command::new("versions")
                .about("List a site's versions, oldest first")
                .arg(site_arg()),
        )
        .subcommand(Command::new("publish").about("Publish a site").arg(site_arg()))
        .subcommand(Command::new("unpublish").about("Unpublish a site").arg(site_arg()))
        .subcommand(
            Command::new("delete")
                .about("Delete a site and its history")
                .arg(site_arg()),
        )
        .subcommand(
            Command::new("connect-domain")
                .about("Record a custom domain and print the DNS setup")
                .arg(site_arg())
                .arg(Arg::new("domain").required(true).help("Domain, e.g. shop.example.com"))
                .arg(
                    Arg::new("method")
                        .long("method")
                        .default_value("manual")
                        .value_parser(|s: &str| s.parse::<DomainMethod>())
                        .help("auto (Domain Connect) or manual"),
                ),
        )
        .subcommand(
            Command::new("render")
                .about("Write the sandboxed preview of a site's current version")
                .arg(site_arg())
                .arg(
                    Arg::new("edit")
                        .long("edit")
                        .action(ArgAction::SetTrue)
                        .help("Include the box selection overlay"),
                )
                .arg(
                    Arg::new("viewport")
                        .long("viewport")
                        .default_value("desktop")
                        .value_parser(|s: &str| s.parse::<Viewport>())
                        .help("desktop or mobile"),
                )
                .arg(
                    Arg::new("raw")
                        .long("raw")
                        .action(ArgAction::SetTrue)
                        .help("Write the frame document instead of the embedding iframe"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .short('o')
                        .value_parser(value_parser!(std::path::PathBuf))
                        .help("Output file [default: stdout]"),
                ),
        )
}
