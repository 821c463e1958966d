//! Ancestry walks over the commit graph.
//!
//! Two orders are offered:
//! - [`ancestors_between`]: first-parent history from a tip down to (but
//!   excluding) a stop commit
//! - [`ancestors_before`]: the full merge-aware ancestry of a commit, ordered
//!   by a local insertion sort on committer time that is anchored at merge
//!   points
//!
//! Commits are fetched through a [`CommitSource`], which is expected to
//! memoize; any fetch failure aborts the walk.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use grove_types::ObjectId;
use tracing::debug;

use crate::commit::Commit;
use crate::error::DagError;
use crate::list::{AncestryList, Handle};

/// Something that can hand out parsed commits by id.
pub trait CommitSource {
    type Error;

    fn commit(&self, id: &ObjectId) -> Result<Arc<Commit>, Self::Error>;
}

impl<S: CommitSource + ?Sized> CommitSource for &S {
    type Error = S::Error;

    fn commit(&self, id: &ObjectId) -> Result<Arc<Commit>, Self::Error> {
        (**self).commit(id)
    }
}

impl CommitSource for HashMap<ObjectId, Arc<Commit>> {
    type Error = DagError;

    fn commit(&self, id: &ObjectId) -> Result<Arc<Commit>, DagError> {
        self.get(id).cloned().ok_or(DagError::CommitNotFound(*id))
    }
}

/// First-parent history from `last` down to, but excluding, `before`.
///
/// The walk also stops after a root commit. An absent `last`, or one with no
/// parents, yields an empty list.
pub fn ancestors_between<S: CommitSource + ?Sized>(
    source: &S,
    last: Option<&Arc<Commit>>,
    before: &ObjectId,
) -> Result<Vec<Arc<Commit>>, S::Error> {
    let mut out = Vec::new();
    let Some(last) = last else {
        return Ok(out);
    };
    if last.parents.is_empty() {
        return Ok(out);
    }

    let mut cur = Arc::clone(last);
    while cur.id != *before {
        let parent = cur.parent_id(0);
        out.push(cur);
        let Some(parent) = parent else {
            break;
        };
        cur = source.commit(&parent)?;
    }

    debug!(tip = %last.id.short_hex(), commits = out.len(), "first-parent walk complete");
    Ok(out)
}

/// The merge-aware ancestry of `id`, `id` first, each commit exactly once.
///
/// Walks depth-first in parent order. The first commit is appended; each
/// later one is inserted after the node found by scanning forward from its
/// anchor. A merge becomes the anchor for its
/// parents; other commits pass their own anchor through. Commits already
/// placed are skipped together with their ancestors.
pub fn ancestors_before<S: CommitSource + ?Sized>(
    source: &S,
    id: &ObjectId,
) -> Result<Vec<Arc<Commit>>, S::Error> {
    let mut list = AncestryList::new();
    let mut visited = HashSet::new();
    let mut stack: Vec<(ObjectId, Option<Handle>)> = vec![(*id, None)];

    while let Some((next_id, anchor)) = stack.pop() {
        if !visited.insert(next_id) {
            continue;
        }
        let commit = source.commit(&next_id)?;

        let placed = match anchor {
            None => list.push_back(Arc::clone(&commit)),
            Some(anchor) => {
                let at = insertion_point(&list, anchor, commit.when());
                list.insert_after(at, Arc::clone(&commit))
            }
        };

        let parent_anchor = if commit.is_merge() { Some(placed) } else { anchor };
        // Reversed so parent 0 is popped first.
        for parent in commit.parents.iter().rev() {
            stack.push((*parent, parent_anchor));
        }
    }

    debug!(tip = %id.short_hex(), commits = list.len(), "merge-aware walk complete");
    Ok(list.into_vec())
}

/// Scan forward from `anchor` for the node a commit at `when` goes after.
///
/// Stops at the tail, at a node with the same timestamp, or at a node newer
/// than `when` whose successor is older than `when`.
fn insertion_point(
    list: &AncestryList<Arc<Commit>>,
    anchor: Handle,
    when: DateTime<FixedOffset>,
) -> Handle {
    let mut at = anchor;
    while let Some(next) = list.next(at) {
        let here = list.get(at).when();
        if here == when {
            break;
        }
        if here > when && list.get(next).when() < when {
            break;
        }
        at = next;
    }
    at
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::Signature;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    fn oid(n: u8) -> ObjectId {
        ObjectId::from_hash([n; 20])
    }

    fn commit(n: u8, time: i64, parents: &[u8]) -> Arc<Commit> {
        let sig = Signature {
            name: "T".into(),
            email: "t@example.com".into(),
            when: FixedOffset::east_opt(0).unwrap().timestamp_opt(time, 0).unwrap(),
        };
        Arc::new(Commit {
            id: oid(n),
            tree: ObjectId::null(),
            parents: parents.iter().map(|&p| oid(p)).collect(),
            author: sig.clone(),
            committer: sig,
            extra_headers: Vec::new(),
            message: format!("commit {n}"),
        })
    }

    fn graph(commits: Vec<Arc<Commit>>) -> HashMap<ObjectId, Arc<Commit>> {
        commits.into_iter().map(|c| (c.id, c)).collect()
    }

    fn ids(commits: &[Arc<Commit>]) -> Vec<ObjectId> {
        commits.iter().map(|c| c.id).collect()
    }

    /// 1 <- 2 <- 3 <- 4 <- 5
    fn linear() -> HashMap<ObjectId, Arc<Commit>> {
        graph(vec![
            commit(1, 100, &[]),
            commit(2, 200, &[1]),
            commit(3, 300, &[2]),
            commit(4, 400, &[3]),
            commit(5, 500, &[4]),
        ])
    }

    /// r <- a, r <- b, (a, b) <- m
    fn one_merge() -> HashMap<ObjectId, Arc<Commit>> {
        graph(vec![
            commit(1, 10, &[]),
            commit(2, 20, &[1]),
            commit(3, 30, &[1]),
            commit(4, 40, &[2, 3]),
        ])
    }

    #[test]
    fn between_excludes_stop_commit() {
        let g = linear();
        let tip = g[&oid(5)].clone();
        let out = ancestors_between(&g, Some(&tip), &oid(2)).unwrap();
        assert_eq!(ids(&out), vec![oid(5), oid(4), oid(3)]);
    }

    #[test]
    fn between_runs_to_root_when_stop_unseen() {
        let g = linear();
        let tip = g[&oid(3)].clone();
        let out = ancestors_between(&g, Some(&tip), &oid(99)).unwrap();
        assert_eq!(ids(&out), vec![oid(3), oid(2), oid(1)]);
    }

    #[test]
    fn between_empty_for_absent_or_root_tip() {
        let g = linear();
        assert!(ancestors_between(&g, None, &oid(1)).unwrap().is_empty());
        let root = g[&oid(1)].clone();
        assert!(ancestors_between(&g, Some(&root), &oid(99)).unwrap().is_empty());
    }

    #[test]
    fn between_tip_equal_to_stop() {
        let g = linear();
        let tip = g[&oid(4)].clone();
        assert!(ancestors_between(&g, Some(&tip), &oid(4)).unwrap().is_empty());
    }

    #[test]
    fn between_follows_first_parent_only() {
        let g = one_merge();
        let tip = g[&oid(4)].clone();
        let out = ancestors_between(&g, Some(&tip), &oid(99)).unwrap();
        assert_eq!(ids(&out), vec![oid(4), oid(2), oid(1)]);
    }

    #[test]
    fn between_propagates_missing_parent() {
        let g = graph(vec![commit(2, 20, &[1])]);
        let tip = g[&oid(2)].clone();
        let err = ancestors_between(&g, Some(&tip), &oid(99)).unwrap_err();
        assert!(matches!(err, DagError::CommitNotFound(id) if id == oid(1)));
    }

    #[test]
    fn before_linear_is_newest_first() {
        let out = ancestors_before(&linear(), &oid(5)).unwrap();
        assert_eq!(ids(&out), vec![oid(5), oid(4), oid(3), oid(2), oid(1)]);
    }

    #[test]
    fn before_orders_merge_by_time() {
        let out = ancestors_before(&one_merge(), &oid(4)).unwrap();
        assert_eq!(ids(&out), vec![oid(4), oid(3), oid(2), oid(1)]);
    }

    #[test]
    fn before_merge_preserves_parent_run_order() {
        let g = one_merge();
        let full = ids(&ancestors_before(&g, &oid(4)).unwrap());
        for parent in [oid(2), oid(3)] {
            let sub = ids(&ancestors_before(&g, &parent).unwrap());
            let positions: Vec<usize> = sub
                .iter()
                .map(|id| full.iter().position(|x| x == id).unwrap())
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]), "{sub:?} vs {full:?}");
        }
    }

    #[test]
    fn before_equal_timestamps_insert_adjacent() {
        // Both merge parents share a timestamp with the merge itself.
        let g = graph(vec![
            commit(1, 10, &[]),
            commit(2, 50, &[1]),
            commit(3, 50, &[1]),
            commit(4, 50, &[2, 3]),
        ]);
        let out = ancestors_before(&g, &oid(4)).unwrap();
        assert_eq!(ids(&out), vec![oid(4), oid(3), oid(2), oid(1)]);
    }

    #[test]
    fn before_shared_ancestor_appears_once() {
        // Two merges over the same base:
        //   1 <- 2 <- 4(2,3) <- 5(4,3)
        //   1 <- 3
        let g = graph(vec![
            commit(1, 10, &[]),
            commit(2, 20, &[1]),
            commit(3, 30, &[1]),
            commit(4, 40, &[2, 3]),
            commit(5, 50, &[4, 3]),
        ]);
        let out = ids(&ancestors_before(&g, &oid(5)).unwrap());
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], oid(5));
        let unique: HashSet<_> = out.iter().collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn before_aborts_on_missing_commit() {
        let g = graph(vec![commit(4, 40, &[2, 3]), commit(2, 20, &[])]);
        let err = ancestors_before(&g, &oid(4)).unwrap_err();
        assert!(matches!(err, DagError::CommitNotFound(id) if id == oid(3)));
    }

    #[test]
    fn insertion_point_rules() {
        let mut list = AncestryList::new();
        let a = list.push_back(commit(1, 50, &[]));
        list.push_back(commit(2, 30, &[]));
        list.push_back(commit(3, 10, &[]));
        let at = |t: i64| {
            let when = FixedOffset::east_opt(0).unwrap().timestamp_opt(t, 0).unwrap();
            list.get(insertion_point(&list, a, when)).id
        };
        // Falls between 50 and 30.
        assert_eq!(at(40), oid(1));
        // Same time as the anchor.
        assert_eq!(at(50), oid(1));
        // Same time as a later node.
        assert_eq!(at(30), oid(2));
        // Older than everything: tail.
        assert_eq!(at(5), oid(3));
        // Newer than everything: never finds a slot, so tail.
        assert_eq!(at(60), oid(3));
    }

    /// Random DAG: commit `i` picks up to two parents among `0..i`.
    fn arb_dag() -> impl Strategy<Value = HashMap<ObjectId, Arc<Commit>>> {
        (2usize..40)
            .prop_flat_map(|n| {
                proptest::collection::vec(
                    (0i64..100, proptest::collection::vec(any::<prop::sample::Index>(), 0..3)),
                    n,
                )
            })
            .prop_map(|specs| {
                let commits = specs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (time, picks))| {
                        let mut parents: Vec<u8> = Vec::new();
                        if i > 0 {
                            for pick in picks {
                                let p = pick.index(i) as u8;
                                if !parents.contains(&p) {
                                    parents.push(p);
                                }
                            }
                        }
                        commit(i as u8, time, &parents)
                    })
                    .collect();
                graph(commits)
            })
    }

    fn reachable(g: &HashMap<ObjectId, Arc<Commit>>, tip: ObjectId) -> HashSet<ObjectId> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([tip]);
        while let Some(id) = queue.pop_front() {
            if seen.insert(id) {
                queue.extend(g[&id].parents.iter().copied());
            }
        }
        seen
    }

    proptest! {
        #[test]
        fn before_lists_each_ancestor_once(g in arb_dag()) {
            let tip = g.values().map(|c| c.id).max().unwrap();
            let out = ids(&ancestors_before(&g, &tip).unwrap());

            prop_assert_eq!(out[0], tip);
            let unique: HashSet<ObjectId> = out.iter().copied().collect();
            prop_assert_eq!(unique.len(), out.len());
            prop_assert_eq!(unique, reachable(&g, tip));
        }

        #[test]
        fn before_is_idempotent(g in arb_dag()) {
            let tip = g.values().map(|c| c.id).max().unwrap();
            let first = ids(&ancestors_before(&g, &tip).unwrap());
            let second = ids(&ancestors_before(&g, &tip).unwrap());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn between_follows_first_parents(g in arb_dag()) {
            let tip = g.values().map(|c| c.id).max().unwrap();
            let last = g[&tip].clone();
            let never = ObjectId::from_hash([0xff; 20]);
            let out = ancestors_between(&g, Some(&last), &never).unwrap();
            for pair in out.windows(2) {
                prop_assert_eq!(pair[0].parent_id(0), Some(pair[1].id));
            }
            if let Some(end) = out.last() {
                prop_assert!(end.parents.is_empty());
            }
        }
    }
}
