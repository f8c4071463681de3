// src/commands/mod.rs
//! Command handlers for the raptly CLI

mod check;
mod lifecycle;
mod show;

pub use check::cmd_check;
pub use lifecycle::{cmd_create, cmd_deploy, cmd_release, cmd_stage, cmd_test, cmd_undeploy};
pub use show::{cmd_show, cmd_version};

use raptly::package_ref::PackageRef;
use raptly::prune::sort_by_name_then_version;

/// Print packages as `  name version arch`, sorted by name then version
fn print_packages(packages: &[PackageRef]) {
    for package in sort_by_name_then_version(packages) {
        println!(
            "  {} {} {}",
            package.name, package.version, package.architecture
        );
    }
}
