// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: repository name
fn repo_arg() -> Arg {
    Arg::new("repo")
        .required(true)
        .help("Repository name, e.g. team/project")
}

/// Common argument: release identifier
fn release_id_arg() -> Arg {
    Arg::new("release_id")
        .required(true)
        .help("Release identifier, e.g. a ticket number")
}

fn flag(name: &'static str, short: char, help: &'static str) -> Arg {
    Arg::new(name)
        .short(short)
        .long(name)
        .action(clap::ArgAction::SetTrue)
        .help(help)
}

fn build_cli() -> Command {
    Command::new("raptly")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Promote Debian package sets through an Aptly server")
        .subcommand_required(true)
        .arg(Arg::new("url").long("url").global(true).help("Aptly API URL"))
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Config file (default: ~/.raptly/config)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(clap::ArgAction::SetTrue)
                .help("Verbose logging"),
        )
        .arg(
            Arg::new("skip_ssl")
                .short('k')
                .long("skip-ssl")
                .global(true)
                .action(clap::ArgAction::SetTrue)
                .help("Don't verify the server's TLS certificate"),
        )
        .arg(Arg::new("key").long("key").global(true).help("Client private key (PEM)"))
        .arg(Arg::new("cert").long("cert").global(true).help("Client certificate (PEM)"))
        .arg(
            Arg::new("user")
                .short('u')
                .long("user")
                .value_name("USER:PASSWORD")
                .global(true)
                .help("Basic auth credentials"),
        )
        .arg(
            Arg::new("local_user")
                .long("local-user")
                .global(true)
                .help("Name used to tag snapshots and check repos"),
        )
        .subcommand(
            Command::new("create")
                .about("Create a repository and publish an empty unstable distribution")
                .arg(repo_arg()),
        )
        .subcommand(
            Command::new("deploy")
                .about("Upload packages and re-publish a distribution")
                .arg(repo_arg())
                .arg(Arg::new("files").num_args(0..).help("Package files to upload"))
                .arg(Arg::new("gpg_key").short('g').long("gpg-key").help("GPG key to sign with"))
                .arg(
                    Arg::new("dist")
                        .short('d')
                        .long("distribution")
                        .visible_alias("dist")
                        .default_value("unstable")
                        .help("Distribution to re-publish"),
                ),
        )
        .subcommand(
            Command::new("undeploy")
                .about("Remove packages matching a query from unstable")
                .arg(repo_arg())
                .arg(Arg::new("query").required(true).help("Package query"))
                .arg(flag("dry-run", 'd', "Only list what would be removed")),
        )
        .subcommand(
            Command::new("check")
                .about("Validate packages against stable in a private check repo")
                .arg(repo_arg())
                .arg(Arg::new("files").num_args(0..).help("Package files to check"))
                .arg(flag("no-prune", 'n', "Keep every version instead of only the latest"))
                .arg(flag("clean", 'c', "Remove the check repo instead")),
        )
        .subcommand(
            Command::new("test")
                .about("Build a release candidate and publish it as testing")
                .arg(repo_arg())
                .arg(release_id_arg())
                .arg(
                    Arg::new("packages")
                        .short('p')
                        .long("packages")
                        .value_name("QUERY")
                        .help("Query selecting the unstable packages to include"),
                )
                .arg(flag("dry-run", 'd', "Only list what would be published"))
                .arg(flag("no-prune", 'n', "Keep every version instead of only the latest")),
        )
        .subcommand(
            Command::new("stage")
                .about("Promote a release candidate from testing to staging")
                .arg(repo_arg())
                .arg(release_id_arg()),
        )
        .subcommand(
            Command::new("release")
                .about("Promote a release candidate from staging to stable")
                .arg(repo_arg())
                .arg(release_id_arg()),
        )
        .subcommand(
            Command::new("show")
                .about("List repositories, distributions or packages")
                .arg(Arg::new("repo").help("Repository name"))
                .arg(Arg::new("dist").help("Distribution"))
                .arg(flag("json", 'j', "Print raw records as JSON"))
                .arg(flag("prune", 'p', "Only show the latest version of each package"))
                .arg(flag("with-checks", 'w', "Include the invoking user's check distributions")),
        )
        .subcommand(
            Command::new("version")
                .about("Show client and server versions")
                .arg(flag("json", 'j', "Print as JSON")),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("raptly.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
        return;
    }

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
