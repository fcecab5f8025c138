// Copyright 2026 Masq Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fmt;

use anyhow::{Context, Result};
use rand::Rng;

use crate::defs;

/// One plausible command line for the child to wear: argv[0] plus flags.
/// Immutable once selected; a fresh candidate is bound per fork attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisguiseCandidate {
    argv: Vec<String>,
}

impl DisguiseCandidate {
    /// Rejects command lines with no tokens or an empty first token.
    pub fn new(argv: Vec<String>) -> Option<Self> {
        if argv.first().is_none_or(|head| head.is_empty()) {
            return None;
        }
        Some(Self { argv })
    }

    pub fn argv0(&self) -> &str {
        &self.argv[0]
    }

    pub fn tail(&self) -> &[String] {
        &self.argv[1..]
    }
}

impl fmt::Display for DisguiseCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))
    }
}

/// Plain substring containment against the first argv token. Not a path
/// or word match, so "/usr/sbin/mycrondaemon" counts as boring for "cron".
pub fn is_boring(argv0: &str, fragments: &[String]) -> bool {
    fragments.iter().any(|fragment| argv0.contains(fragment.as_str()))
}

/// Filter a snapshot of command lines down to the ones safe to imitate.
/// Empty command lines are dropped.
pub fn boring_pool<I>(cmdlines: I, fragments: &[String]) -> Vec<DisguiseCandidate>
where
    I: IntoIterator<Item = Vec<String>>,
{
    cmdlines
        .into_iter()
        .filter(|argv| argv.first().is_some_and(|head| is_boring(head, fragments)))
        .filter_map(DisguiseCandidate::new)
        .collect()
}

/// Compiled-in defaults plus operator extensions from the config.
pub fn effective_catalog(extra: &[Vec<String>]) -> Vec<DisguiseCandidate> {
    defs::STATIC_CATALOG
        .iter()
        .map(|entry| entry.iter().map(|token| token.to_string()).collect())
        .chain(extra.iter().cloned())
        .filter_map(DisguiseCandidate::new)
        .collect()
}

pub fn effective_fragments(extra: &[String]) -> Vec<String> {
    defs::BORING_FRAGMENTS
        .iter()
        .map(|fragment| fragment.to_string())
        .chain(extra.iter().cloned())
        .collect()
}

/// Boring command lines currently running on this host.
pub fn live_pool(fragments: &[String]) -> Result<Vec<DisguiseCandidate>> {
    Ok(boring_pool(enumerate_cmdlines()?, fragments))
}

/// Snapshot the command line of every process we are allowed to read.
/// Individual unreadable entries are skipped; only failing to list the
/// table at all is an error.
fn enumerate_cmdlines() -> Result<Vec<Vec<String>>> {
    let procs = procfs::process::all_processes().context("cannot list the process table")?;

    let mut cmdlines = Vec::new();

    for proc in procs.flatten() {
        if let Ok(argv) = proc.cmdline() {
            cmdlines.push(argv);
        }
    }

    Ok(cmdlines)
}

/// Uniform pick from the live pool, or from the catalog when enumeration
/// failed (`None`) or produced nothing worth imitating. The catalog must
/// be non-empty.
pub fn pick<R: Rng + ?Sized>(
    live: Option<Vec<DisguiseCandidate>>,
    catalog: &[DisguiseCandidate],
    rng: &mut R,
) -> DisguiseCandidate {
    if let Some(pool) = live
        && !pool.is_empty()
    {
        let idx = rng.random_range(0..pool.len());
        return pool[idx].clone();
    }

    catalog[rng.random_range(0..catalog.len())].clone()
}

/// Always returns a usable disguise; any enumeration trouble falls back
/// to the static catalog.
pub fn select_disguise(
    catalog: &[DisguiseCandidate],
    fragments: &[String],
) -> DisguiseCandidate {
    pick(live_pool(fragments).ok(), catalog, &mut rand::rng())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn fragments(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn substring_match_accepts_nested_daemon_names() {
        assert!(is_boring("/usr/sbin/mycrondaemon", &fragments(&["cron"])));
    }

    #[test]
    fn no_matching_fragment_is_not_boring() {
        assert!(!is_boring(
            "postgresql-backup",
            &fragments(&["httpd", "nginx", "getty"])
        ));
    }

    #[test]
    fn empty_command_lines_are_excluded_from_the_pool() {
        let pool = boring_pool(
            vec![argv(&[]), argv(&["/usr/sbin/cron", "-f"])],
            &fragments(&["cron"]),
        );

        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].argv0(), "/usr/sbin/cron");
        assert_eq!(pool[0].to_string(), "/usr/sbin/cron -f");
    }

    #[test]
    fn failed_enumeration_draws_only_from_the_catalog() {
        let catalog = effective_catalog(&[]);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..64 {
            let picked = pick(None, &catalog, &mut rng);
            assert!(catalog.contains(&picked));
            assert!(!picked.argv0().is_empty());
        }
    }

    #[test]
    fn empty_pool_draws_only_from_the_catalog() {
        let catalog = effective_catalog(&[]);
        let mut rng = StdRng::seed_from_u64(13);

        for _ in 0..64 {
            let picked = pick(Some(Vec::new()), &catalog, &mut rng);
            assert!(catalog.contains(&picked));
        }
    }

    #[test]
    fn live_pool_takes_priority_over_the_catalog() {
        let pool = boring_pool(
            vec![argv(&["/usr/sbin/nginx", "-g", "daemon off;"])],
            &fragments(&["nginx"]),
        );
        let catalog = effective_catalog(&[]);

        let picked = pick(Some(pool.clone()), &catalog, &mut StdRng::seed_from_u64(3));

        assert_eq!(picked, pool[0]);
    }

    #[test]
    fn selection_is_deterministic_under_a_seeded_rng() {
        let catalog = effective_catalog(&[]);

        let first = pick(None, &catalog, &mut StdRng::seed_from_u64(11));
        let second = pick(None, &catalog, &mut StdRng::seed_from_u64(11));

        assert_eq!(first, second);
    }

    #[test]
    fn select_disguise_always_yields_a_usable_argv() {
        let picked = select_disguise(&effective_catalog(&[]), &effective_fragments(&[]));
        assert!(!picked.argv0().is_empty());
    }

    #[test]
    fn config_extensions_land_in_the_catalog() {
        let catalog = effective_catalog(&[argv(&["/usr/sbin/acpid"])]);
        assert!(catalog.iter().any(|c| c.argv0() == "/usr/sbin/acpid"));
    }
}
