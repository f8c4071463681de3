// src/prune.rs

//! Ordering and pruning of package reference lists
//!
//! Pruning reduces a package set to the newest build of each package name,
//! where "newest" is decided by Debian version ordering.

use crate::package_ref::PackageRef;
use std::collections::HashSet;

/// Sort by package name, then by Debian version (ascending)
///
/// The sort is stable: references with the same name and an equal version
/// keep their relative input order.
pub fn sort_by_name_then_version(refs: &[PackageRef]) -> Vec<PackageRef> {
    let mut sorted = refs.to_vec();
    sorted.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.debian_version().cmp(&b.debian_version()))
    });
    sorted
}

/// Keep only the latest version of each package name
///
/// Tie-break: when several references share a name and an equal maximum
/// version (e.g. the same version built twice with different content
/// hashes), the one that comes last after [`sort_by_name_then_version`] is
/// kept, i.e. the one appearing last in the input.
///
/// The result is sorted by name. `prune(&prune(x)) == prune(x)`.
pub fn prune(refs: &[PackageRef]) -> Vec<PackageRef> {
    let sorted = sort_by_name_then_version(refs);
    let mut visited: HashSet<&str> = HashSet::new();
    let mut pruned: Vec<PackageRef> = Vec::new();

    for pkg in sorted.iter().rev() {
        if visited.insert(pkg.name.as_str()) {
            pruned.push(pkg.clone());
        }
    }

    pruned.reverse();
    pruned
}
