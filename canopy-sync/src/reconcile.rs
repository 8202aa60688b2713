//! Reconciliation: match local working copies to desired repos by remote URL
//! and derive the action plan.

use std::path::PathBuf;

use canopy_core::{ComparableUrl, DesiredRepos, RejectionReasons, Remotes};

use crate::action::Action;
use crate::error::SyncError;

const UNMATCHED_REASON: &str = "did not match any remote repo URL";

/// A local working copy with its remotes already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepoInfo {
    pub path: PathBuf,
    pub remotes: Remotes,
}

/// Build the action plan.
///
/// Local repos are visited in path order. Each desired repo can be claimed
/// once; a second local copy of the same repo finds nothing left to claim and
/// is planned for removal. Whatever is still unclaimed at the end is cloned.
/// A local repo matching several desired repos aborts the whole plan.
pub fn reconcile(
    mut local: Vec<LocalRepoInfo>,
    desired: DesiredRepos,
    rejections: &RejectionReasons,
) -> Result<Vec<Action>, SyncError> {
    local.sort_by(|a, b| a.path.cmp(&b.path));

    let mut actions = Vec::with_capacity(local.len() + desired.len());
    let mut remaining = desired;
    for repo in &local {
        let (action, rest) = match_local_repo(repo, remaining, rejections)?;
        actions.push(action);
        remaining = rest;
    }

    let mut clones: Vec<Action> = remaining
        .into_values()
        .map(|d| Action::Clone {
            url: d.clone_url,
            path: d.path,
        })
        .collect();
    clones.sort_by(|a, b| a.name().cmp(b.name()));
    actions.extend(clones);

    Ok(actions)
}

/// Decide what to do with one local repo, claiming its desired entry.
///
/// Returns the action together with the desired repos left unclaimed.
pub fn match_local_repo(
    local: &LocalRepoInfo,
    mut remaining: DesiredRepos,
    rejections: &RejectionReasons,
) -> Result<(Action, DesiredRepos), SyncError> {
    let mut matches: Vec<(&str, ComparableUrl)> = Vec::new();
    let mut rejection: Option<&str> = None;

    for (name, urls) in &local.remotes {
        let url = ComparableUrl::parse(&urls.fetch_url)?;
        if remaining.contains_key(&url) {
            if !matches.iter().any(|(_, seen)| *seen == url) {
                matches.push((name.as_str(), url));
            }
        } else if let Some(reason) = rejections.get(&url) {
            rejection = Some(reason.as_str());
        }
    }

    let remove = |reason: &str| Action::Remove {
        path: local.path.clone(),
        reason: reason.to_string(),
    };

    match matches.as_slice() {
        [] => {
            let action = remove(rejection.unwrap_or(UNMATCHED_REASON));
            Ok((action, remaining))
        }
        [(remote, url)] => {
            let Some(claimed) = remaining.remove(url) else {
                return Ok((remove(UNMATCHED_REASON), remaining));
            };
            let default_tracking_branch = format!("{remote}/{}", claimed.default_branch);
            let action = if claimed.path == local.path {
                Action::Sync {
                    path: local.path.clone(),
                    default_tracking_branch,
                }
            } else {
                Action::MoveAndSync {
                    orig_path: local.path.clone(),
                    dest_path: claimed.path,
                    default_tracking_branch,
                }
            };
            Ok((action, remaining))
        }
        many => Err(SyncError::AmbiguousMatch {
            path: local.path.clone(),
            matches: many
                .iter()
                .map(|(remote, url)| format!("{remote}={url}"))
                .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::{DesiredRepo, RemoteUrls};

    fn desired(entries: &[(&str, &str)]) -> DesiredRepos {
        entries
            .iter()
            .map(|(url, path)| {
                let key = ComparableUrl::parse(url).unwrap();
                (
                    key.clone(),
                    DesiredRepo {
                        url: key,
                        clone_url: url.to_string(),
                        path: PathBuf::from(path),
                        default_branch: "main".into(),
                    },
                )
            })
            .collect()
    }

    fn local(path: &str, remotes: &[(&str, &str)]) -> LocalRepoInfo {
        LocalRepoInfo {
            path: PathBuf::from(path),
            remotes: remotes
                .iter()
                .map(|(name, url)| {
                    (
                        name.to_string(),
                        RemoteUrls {
                            fetch_url: url.to_string(),
                            push_url: url.to_string(),
                        },
                    )
                })
                .collect(),
        }
    }

    const A: &str = "https://github.com/org/a.git";
    const B: &str = "https://github.com/org/b.git";

    #[test]
    fn nothing_local_clones_everything() {
        let plan = reconcile(vec![], desired(&[(A, "/root/org/a")]), &RejectionReasons::new()).unwrap();
        assert_eq!(
            plan,
            vec![Action::Clone {
                url: A.into(),
                path: "/root/org/a".into()
            }]
        );
    }

    #[test]
    fn matching_repo_in_place_is_synced() {
        let plan = reconcile(
            vec![local("/root/org/a", &[("origin", "git@github.com:org/a")])],
            desired(&[(A, "/root/org/a")]),
            &RejectionReasons::new(),
        )
        .unwrap();
        assert_eq!(
            plan,
            vec![Action::Sync {
                path: "/root/org/a".into(),
                default_tracking_branch: "origin/main".into()
            }]
        );
    }

    #[test]
    fn matching_repo_elsewhere_is_moved() {
        let plan = reconcile(
            vec![local("/root/old/a", &[("upstream", A)])],
            desired(&[(A, "/root/org/a")]),
            &RejectionReasons::new(),
        )
        .unwrap();
        assert_eq!(
            plan,
            vec![Action::MoveAndSync {
                orig_path: "/root/old/a".into(),
                dest_path: "/root/org/a".into(),
                default_tracking_branch: "upstream/main".into()
            }]
        );
    }

    #[test]
    fn unmatched_repo_is_removed_with_default_reason() {
        let plan = reconcile(
            vec![local("/root/x", &[("origin", "https://elsewhere.net/x.git")])],
            DesiredRepos::new(),
            &RejectionReasons::new(),
        )
        .unwrap();
        assert_eq!(
            plan,
            vec![Action::Remove {
                path: "/root/x".into(),
                reason: UNMATCHED_REASON.into()
            }]
        );
    }

    #[test]
    fn rejected_repo_is_removed_with_its_reason() {
        let mut rejections = RejectionReasons::new();
        rejections.insert(ComparableUrl::parse(B).unwrap(), "repo is archived".into());
        let plan = reconcile(
            vec![local("/root/org/b", &[("origin", B)])],
            DesiredRepos::new(),
            &rejections,
        )
        .unwrap();
        assert_eq!(
            plan,
            vec![Action::Remove {
                path: "/root/org/b".into(),
                reason: "repo is archived".into()
            }]
        );
    }

    #[test]
    fn two_distinct_matches_abort_the_plan() {
        let err = reconcile(
            vec![local("/root/org/a", &[("origin", A), ("other", B)])],
            desired(&[(A, "/root/org/a"), (B, "/root/org/b")]),
            &RejectionReasons::new(),
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::AmbiguousMatch { ref matches, .. } if matches.len() == 2));
    }

    #[test]
    fn remotes_sharing_one_url_count_once() {
        let plan = reconcile(
            vec![local("/root/org/a", &[("mirror", A), ("origin", "git@github.com:org/a.git")])],
            desired(&[(A, "/root/org/a")]),
            &RejectionReasons::new(),
        )
        .unwrap();
        assert_eq!(
            plan,
            vec![Action::Sync {
                path: "/root/org/a".into(),
                default_tracking_branch: "mirror/main".into()
            }]
        );
    }

    #[test]
    fn second_clone_of_same_repo_is_not_matched() {
        let plan = reconcile(
            vec![
                local("/root/z-copy", &[("origin", A)]),
                local("/root/org/a", &[("origin", A)]),
            ],
            desired(&[(A, "/root/org/a")]),
            &RejectionReasons::new(),
        )
        .unwrap();
        assert_eq!(plan.len(), 2);
        assert!(matches!(plan[0], Action::Sync { .. }));
        assert_eq!(
            plan[1],
            Action::Remove {
                path: "/root/z-copy".into(),
                reason: UNMATCHED_REASON.into()
            }
        );
    }

    #[test]
    fn claim_returns_remaining_without_the_match() {
        let all = desired(&[(A, "/root/org/a"), (B, "/root/org/b")]);
        let (_, rest) = match_local_repo(
            &local("/root/org/a", &[("origin", A)]),
            all,
            &RejectionReasons::new(),
        )
        .unwrap();
        assert_eq!(rest.len(), 1);
        assert!(rest.contains_key(&ComparableUrl::parse(B).unwrap()));
    }

    #[test]
    fn leftovers_are_cloned_in_path_order() {
        let plan = reconcile(
            vec![local("/root/org/a", &[("origin", A)])],
            desired(&[(A, "/root/org/a"), (B, "/root/org/b"), ("https://github.com/zzz/c", "/root/aaa/c")]),
            &RejectionReasons::new(),
        )
        .unwrap();
        let names: Vec<_> = plan.iter().map(|a| a.name().to_path_buf()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("/root/org/a"),
                PathBuf::from("/root/aaa/c"),
                PathBuf::from("/root/org/b"),
            ]
        );
    }
}
