use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::common::collections::{HashMap, HashSet};
use crate::common::config::MergePrecedence;
use crate::model::tab::RootId;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GroupColor {
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Orange,
    Purple,
    Pink,
    Cyan,
}

/// Human-entered display metadata for a group. Created lazily on first
/// customization; absent entries fall back to the representative tab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVisuals {
    pub title: Option<String>,
    pub color: Option<GroupColor>,
}

#[derive(Debug, Clone)]
struct PendingTransfer {
    source: RootId,
    dest: RootId,
    prior_dest: Option<GroupVisuals>,
    prior_dest_collapsed: bool,
}

/// Keyed store of per-group visuals and collapsed flags. Persistence is an
/// external concern; hosts seed the store through `load` and read it back
/// through `entries`.
#[derive(Debug, Default)]
pub struct MetadataStore {
    entries: HashMap<RootId, GroupVisuals>,
    collapsed: HashSet<RootId>,
    pending: Option<PendingTransfer>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, root: RootId) -> Option<&GroupVisuals> {
        self.entries.get(&root)
    }

    pub fn set(&mut self, root: RootId, visuals: GroupVisuals) {
        self.entries.insert(root, visuals);
    }

    pub fn remove(&mut self, root: RootId) {
        if self.entries.remove(&root).is_some() {
            trace!(%root, "discarded group visuals");
        }
        self.collapsed.remove(&root);
    }

    pub fn set_collapsed(&mut self, root: RootId, collapsed: bool) {
        if collapsed {
            self.collapsed.insert(root);
        } else {
            self.collapsed.remove(&root);
        }
    }

    pub fn is_collapsed(&self, root: RootId) -> bool {
        self.collapsed.contains(&root)
    }

    /// Moves the entry and the collapsed flag to a new root id, preserving the
    /// human-entered values.
    pub fn rekey(&mut self, old: RootId, new: RootId) {
        if old == new {
            return;
        }
        if let Some(visuals) = self.entries.remove(&old) {
            self.entries.insert(new, visuals);
        }
        if self.collapsed.remove(&old) {
            self.collapsed.insert(new);
        }
    }

    /// Stages the metadata transfer for a provisional merge. The destination
    /// entry is updated per `precedence`; the source entry stays until
    /// `commit_merge` so an undo can restore it.
    pub fn begin_merge(&mut self, source: RootId, dest: RootId, precedence: MergePrecedence) {
        debug_assert!(self.pending.is_none(), "merge transfer already staged");
        if source == dest {
            return;
        }
        let prior_dest = self.entries.get(&dest).cloned();
        let prior_dest_collapsed = self.collapsed.contains(&dest);
        let transfer = match precedence {
            MergePrecedence::DestinationWins => prior_dest.is_none(),
            MergePrecedence::SourceWins => true,
        };
        if transfer && let Some(visuals) = self.entries.get(&source).cloned() {
            self.entries.insert(dest, visuals);
        }
        self.pending = Some(PendingTransfer {
            source,
            dest,
            prior_dest,
            prior_dest_collapsed,
        });
    }

    /// Finalizes a staged transfer; the source group's entry is now freed.
    pub fn commit_merge(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.remove(pending.source);
        }
    }

    /// Rolls a staged transfer back, restoring the destination's prior state.
    pub fn abort_merge(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        match pending.prior_dest {
            Some(visuals) => {
                self.entries.insert(pending.dest, visuals);
            }
            None => {
                self.entries.remove(&pending.dest);
            }
        }
        self.set_collapsed(pending.dest, pending.prior_dest_collapsed);
    }

    /// Transfer for a merge that is committed up front.
    pub fn apply_merge(&mut self, source: RootId, dest: RootId, precedence: MergePrecedence) {
        self.begin_merge(source, dest, precedence);
        self.commit_merge();
    }

    pub fn entries(&self) -> impl Iterator<Item = (RootId, &GroupVisuals)> + '_ {
        self.entries.iter().map(|(root, visuals)| (*root, visuals))
    }

    pub fn load(&mut self, entries: impl IntoIterator<Item = (RootId, GroupVisuals)>) {
        self.entries.extend(entries);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn titled(title: &str) -> GroupVisuals {
        GroupVisuals {
            title: Some(title.to_string()),
            color: None,
        }
    }

    #[test]
    fn rekey_preserves_visuals_and_collapsed_flag() {
        let mut store = MetadataStore::new();
        store.set(RootId(1), titled("work"));
        store.set_collapsed(RootId(1), true);

        store.rekey(RootId(1), RootId(9));

        assert_eq!(store.get(RootId(1)), None);
        assert_eq!(store.get(RootId(9)), Some(&titled("work")));
        assert!(!store.is_collapsed(RootId(1)));
        assert!(store.is_collapsed(RootId(9)));
    }

    #[test]
    fn destination_wins_keeps_dest_entry() {
        let mut store = MetadataStore::new();
        store.set(RootId(1), titled("source"));
        store.set(RootId(2), titled("dest"));

        store.begin_merge(RootId(1), RootId(2), MergePrecedence::DestinationWins);
        assert_eq!(store.get(RootId(2)), Some(&titled("dest")));
        // Source entry stays until the merge commits.
        assert_eq!(store.get(RootId(1)), Some(&titled("source")));

        store.commit_merge();
        assert_eq!(store.get(RootId(1)), None);
        assert_eq!(store.get(RootId(2)), Some(&titled("dest")));
    }

    #[test]
    fn source_metadata_carries_over_when_dest_has_none() {
        let mut store = MetadataStore::new();
        store.set(RootId(1), titled("source"));

        store.begin_merge(RootId(1), RootId(2), MergePrecedence::DestinationWins);
        assert_eq!(store.get(RootId(2)), Some(&titled("source")));

        store.commit_merge();
        assert_eq!(store.get(RootId(1)), None);
        assert_eq!(store.get(RootId(2)), Some(&titled("source")));
    }

    #[test]
    fn source_wins_overwrites_dest() {
        let mut store = MetadataStore::new();
        store.set(RootId(1), titled("source"));
        store.set(RootId(2), titled("dest"));

        store.apply_merge(RootId(1), RootId(2), MergePrecedence::SourceWins);
        assert_eq!(store.get(RootId(2)), Some(&titled("source")));
        assert_eq!(store.get(RootId(1)), None);
    }

    #[test]
    fn abort_restores_prior_dest_state() {
        let mut store = MetadataStore::new();
        store.set(RootId(1), titled("source"));

        store.begin_merge(RootId(1), RootId(2), MergePrecedence::DestinationWins);
        assert_eq!(store.get(RootId(2)), Some(&titled("source")));

        store.abort_merge();
        assert_eq!(store.get(RootId(2)), None);
        assert_eq!(store.get(RootId(1)), Some(&titled("source")));
    }

    #[test]
    fn abort_with_prior_dest_entry_restores_it() {
        let mut store = MetadataStore::new();
        store.set(RootId(1), titled("source"));
        store.set(RootId(2), titled("dest"));
        store.set_collapsed(RootId(2), true);

        store.begin_merge(RootId(1), RootId(2), MergePrecedence::SourceWins);
        store.abort_merge();

        assert_eq!(store.get(RootId(2)), Some(&titled("dest")));
        assert!(store.is_collapsed(RootId(2)));
    }

    #[test]
    fn load_seeds_entries_from_a_host() {
        let mut store = MetadataStore::new();
        store.load([(RootId(1), titled("a")), (RootId(2), titled("b"))]);

        let mut all: Vec<_> = store
            .entries()
            .map(|(root, visuals)| (root.0, visuals.title.clone().unwrap()))
            .collect();
        all.sort();
        assert_eq!(all, vec![(1, "a".to_string()), (2, "b".to_string())]);
    }

    #[test]
    fn remove_clears_collapsed_flag() {
        let mut store = MetadataStore::new();
        store.set(RootId(4), titled("news"));
        store.set_collapsed(RootId(4), true);
        store.remove(RootId(4));
        assert_eq!(store.get(RootId(4)), None);
        assert!(!store.is_collapsed(RootId(4)));
    }
}
