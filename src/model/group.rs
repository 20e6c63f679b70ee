//! Ordered tab collection plus group membership, with typed change streams.
//!
//! Membership is kept as index tables (root id -> ordered member ids,
//! member id -> root id) rather than object pointers. State is always
//! mutated before notifications are emitted, so a subscriber that queries
//! the model from an event handler sees the settled state.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::actor::{self, Receiver, Sender};
use crate::common::collections::HashMap;
use crate::model::tab::{LaunchOrigin, RootId, Tab, TabId};

/// Tab-collection lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TabEvent {
    Added {
        tab: Tab,
        origin: LaunchOrigin,
        delayed: bool,
    },
    Removed {
        tab: Tab,
    },
    Selected {
        tab: Tab,
        previous: Option<RootId>,
    },
    Moved {
        tab: Tab,
        from: usize,
        to: usize,
    },
    RestoreCompleted,
}

/// Group-membership lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GroupEvent {
    Merged {
        tab: Tab,
        source_root: RootId,
        dest_root: RootId,
        provisional: bool,
    },
    MergeCommitted {
        source_root: RootId,
        dest_root: RootId,
    },
    MergeUndone {
        source_root: RootId,
        dest_root: RootId,
    },
    Split {
        tab: Tab,
        former_root: RootId,
    },
    MovedWithinGroup {
        tab: Tab,
        from: usize,
        to: usize,
    },
    RootChanged {
        old_root: RootId,
        new_root: RootId,
    },
}

#[derive(Debug, Clone)]
struct PendingMerge {
    source_root: RootId,
    dest_root: RootId,
    moved: Vec<TabId>,
    prior_order: Vec<TabId>,
}

/// The group membership model and tab collection the projection core
/// consumes. Mutations settle all tables before any notification fires.
#[derive(Default)]
pub struct TabGroupModel {
    order: Vec<TabId>,
    tabs: HashMap<TabId, Tab>,
    members: HashMap<RootId, Vec<TabId>>,
    roots: HashMap<TabId, RootId>,
    active: Option<TabId>,
    clock: u64,
    pending_merge: Option<PendingMerge>,
    tab_subscribers: Vec<Sender<TabEvent>>,
    group_subscribers: Vec<Sender<GroupEvent>>,
}

impl TabGroupModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_tabs(&mut self) -> Receiver<TabEvent> {
        let (tx, rx) = actor::channel();
        self.tab_subscribers.push(tx);
        rx
    }

    pub fn subscribe_groups(&mut self) -> Receiver<GroupEvent> {
        let (tx, rx) = actor::channel();
        self.group_subscribers.push(tx);
        rx
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn tab(&self, id: TabId) -> Option<&Tab> {
        self.tabs.get(&id)
    }

    pub fn index_of(&self, id: TabId) -> Option<usize> {
        self.order.iter().position(|t| *t == id)
    }

    pub fn ordered_tabs(&self) -> impl Iterator<Item = &Tab> + '_ {
        self.order.iter().filter_map(|id| self.tabs.get(id))
    }

    pub fn root_of(&self, id: TabId) -> Option<RootId> {
        self.roots.get(&id).copied()
    }

    pub fn related_tabs(&self, root: RootId) -> &[TabId] {
        self.members.get(&root).map(|m| m.as_slice()).unwrap_or(&[])
    }

    pub fn group_size(&self, root: RootId) -> usize {
        self.members.get(&root).map(|m| m.len()).unwrap_or(0)
    }

    /// The member whose attributes are surfaced for the group: the most
    /// recently active member, first-in-order on ties.
    pub fn representative(&self, root: RootId) -> Option<&Tab> {
        let mut best: Option<&Tab> = None;
        for id in self.related_tabs(root) {
            if let Some(tab) = self.tabs.get(id)
                && best.is_none_or(|b| tab.last_activity > b.last_activity)
            {
                best = Some(tab);
            }
        }
        best
    }

    /// Highest activity stamp among the group's members.
    pub fn group_recency(&self, root: RootId) -> u64 {
        self.related_tabs(root)
            .iter()
            .filter_map(|id| self.tabs.get(id))
            .map(|tab| tab.last_activity)
            .max()
            .unwrap_or(0)
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.active.and_then(|id| self.tabs.get(&id))
    }

    pub fn has_pending_merge(&self) -> bool {
        self.pending_merge.is_some()
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Inserts a standalone tab at `index` (clamped) in collection order.
    pub fn insert_tab(&mut self, mut tab: Tab, index: usize, origin: LaunchOrigin, delayed: bool) {
        debug_assert!(
            !self.tabs.contains_key(&tab.id),
            "tab id inserted twice: {}",
            tab.id
        );
        tab.root_id = tab.id.into();
        tab.last_activity = self.next_stamp();
        let index = index.min(self.order.len());
        self.order.insert(index, tab.id);
        self.members.insert(tab.root_id, vec![tab.id]);
        self.roots.insert(tab.id, tab.root_id);
        if self.active.is_none() {
            self.active = Some(tab.id);
        }
        let event_tab = tab.clone();
        self.tabs.insert(tab.id, tab);
        self.emit_tab(TabEvent::Added {
            tab: event_tab,
            origin,
            delayed,
        });
    }

    /// Inserts a tab directly into an existing group, placed after the
    /// group's current last member. Falls back to a standalone append when
    /// the group is gone (stale restore data).
    pub fn insert_tab_in_group(
        &mut self,
        mut tab: Tab,
        root: RootId,
        origin: LaunchOrigin,
        delayed: bool,
    ) {
        if self.group_size(root) == 0 {
            trace!(%root, tab = %tab.id, "group gone, inserting standalone");
            let end = self.order.len();
            self.insert_tab(tab, end, origin, delayed);
            return;
        }
        debug_assert!(!self.tabs.contains_key(&tab.id));
        tab.root_id = root;
        tab.last_activity = self.next_stamp();
        let insert_at = self.last_member_index(root).map(|i| i + 1).unwrap_or(self.order.len());
        self.order.insert(insert_at, tab.id);
        if let Some(members) = self.members.get_mut(&root) {
            members.push(tab.id);
        }
        self.roots.insert(tab.id, root);
        if self.active.is_none() {
            self.active = Some(tab.id);
        }
        let event_tab = tab.clone();
        self.tabs.insert(tab.id, tab);
        self.emit_tab(TabEvent::Added {
            tab: event_tab,
            origin,
            delayed,
        });
    }

    pub fn select(&mut self, id: TabId) {
        if !self.tabs.contains_key(&id) {
            trace!(tab = %id, "select on unknown tab ignored");
            return;
        }
        if self.active == Some(id) {
            return;
        }
        let previous = self.active_tab().map(|t| t.root_id);
        let stamp = self.next_stamp();
        let tab = {
            let tab = self.tabs.get_mut(&id).expect("checked above");
            tab.last_activity = stamp;
            tab.clone()
        };
        self.active = Some(id);
        self.emit_tab(TabEvent::Selected { tab, previous });
    }

    /// Closes a tab. When the closed tab was a multi-member group's root,
    /// the group is re-keyed to its first surviving member and a
    /// `RootChanged` notification precedes the removal.
    pub fn close_tab(&mut self, id: TabId) {
        let Some(tab) = self.tabs.remove(&id) else {
            trace!(tab = %id, "close on unknown tab ignored");
            return;
        };
        let closed_index = self.index_of(id);
        self.order.retain(|t| *t != id);
        let root = self.roots.remove(&id).unwrap_or(tab.root_id);
        let mut surviving_root = None;
        if let Some(members) = self.members.get_mut(&root) {
            members.retain(|m| *m != id);
            if members.is_empty() {
                self.members.remove(&root);
            } else if RootId::from(id) == root {
                let new_root = RootId::from(members[0]);
                self.rekey_group(root, new_root);
                surviving_root = Some(new_root);
            } else {
                surviving_root = Some(root);
            }
        }
        if let Some(new_root) = surviving_root
            && new_root != root
        {
            self.emit_group(GroupEvent::RootChanged {
                old_root: root,
                new_root,
            });
        }
        self.emit_tab(TabEvent::Removed { tab: tab.clone() });

        if self.active == Some(id) {
            self.active = None;
            let previous = surviving_root.or(Some(root));
            let replacement = surviving_root
                .and_then(|r| self.representative(r).map(|t| t.id))
                .or_else(|| {
                    let index = closed_index.unwrap_or(0).min(self.order.len().saturating_sub(1));
                    self.order.get(index).copied()
                });
            if let Some(next) = replacement {
                self.select_with_previous(next, previous);
            }
        }
    }

    /// Reorders the collection. Moving onto a slot held by the same group is
    /// a within-group move; moving a multi-member group relocates the whole
    /// block; a standalone tab moves plainly.
    pub fn move_to(&mut self, id: TabId, to: usize) {
        let Some(root) = self.root_of(id) else {
            trace!(tab = %id, "move on unknown tab ignored");
            return;
        };
        let Some(from) = self.index_of(id) else { return };
        if self.order.is_empty() {
            return;
        }
        let to = to.min(self.order.len() - 1);
        if from == to {
            return;
        }
        let target_root = self.roots.get(&self.order[to]).copied();
        if target_root == Some(root) && self.group_size(root) > 1 {
            self.order.remove(from);
            self.order.insert(to, id);
            self.sync_member_order(root);
            let tab = self.tabs[&id].clone();
            self.emit_group(GroupEvent::MovedWithinGroup { tab, from, to });
        } else if self.group_size(root) > 1 {
            self.move_group_block(root, to);
            let tab = self.representative(root).cloned();
            if let Some(tab) = tab {
                self.emit_tab(TabEvent::Moved { tab, from, to });
            }
        } else {
            self.order.remove(from);
            self.order.insert(to, id);
            let tab = self.tabs[&id].clone();
            self.emit_tab(TabEvent::Moved { tab, from, to });
        }
    }

    /// Merges the source tab's whole group into the destination tab's group.
    /// A provisional merge stays undoable until `commit_merge`.
    pub fn merge(&mut self, source_tab: TabId, dest_tab: TabId, provisional: bool) {
        let (Some(source_root), Some(dest_root)) =
            (self.root_of(source_tab), self.root_of(dest_tab))
        else {
            trace!(source = %source_tab, dest = %dest_tab, "merge on unknown tabs ignored");
            return;
        };
        if source_root == dest_root {
            return;
        }
        if self.pending_merge.is_some() {
            // A new merge implicitly commits the outstanding provisional one.
            self.commit_merge();
        }
        let prior_order = self.order.clone();
        let Some(moved) = self.members.remove(&source_root) else {
            return;
        };
        self.order.retain(|t| !moved.contains(t));
        let insert_at = self.last_member_index(dest_root).map(|i| i + 1).unwrap_or(self.order.len());
        for (offset, id) in moved.iter().enumerate() {
            self.order.insert(insert_at + offset, *id);
            self.roots.insert(*id, dest_root);
            if let Some(tab) = self.tabs.get_mut(id) {
                tab.root_id = dest_root;
            }
        }
        if let Some(members) = self.members.get_mut(&dest_root) {
            members.extend(moved.iter().copied());
        }
        debug!(%source_root, %dest_root, moved = moved.len(), provisional, "merged group");
        if provisional {
            self.pending_merge = Some(PendingMerge {
                source_root,
                dest_root,
                moved: moved.clone(),
                prior_order,
            });
        }
        for id in &moved {
            if let Some(tab) = self.tabs.get(id) {
                let tab = tab.clone();
                self.emit_group(GroupEvent::Merged {
                    tab,
                    source_root,
                    dest_root,
                    provisional,
                });
            }
        }
    }

    pub fn commit_merge(&mut self) {
        let Some(pending) = self.pending_merge.take() else {
            return;
        };
        self.emit_group(GroupEvent::MergeCommitted {
            source_root: pending.source_root,
            dest_root: pending.dest_root,
        });
    }

    /// Rolls the outstanding provisional merge back and restores the prior
    /// membership and ordering.
    pub fn undo_merge(&mut self) {
        let Some(pending) = self.pending_merge.take() else {
            return;
        };
        if let Some(members) = self.members.get_mut(&pending.dest_root) {
            members.retain(|m| !pending.moved.contains(m));
        }
        let restored: Vec<TabId> = pending
            .moved
            .iter()
            .copied()
            .filter(|id| self.tabs.contains_key(id))
            .collect();
        for id in &restored {
            self.roots.insert(*id, pending.source_root);
            if let Some(tab) = self.tabs.get_mut(id) {
                tab.root_id = pending.source_root;
            }
        }
        if !restored.is_empty() {
            self.members.insert(pending.source_root, restored);
        }
        let mut order: Vec<TabId> = pending
            .prior_order
            .iter()
            .copied()
            .filter(|id| self.tabs.contains_key(id))
            .collect();
        for id in &self.order {
            if !order.contains(id) {
                order.push(*id);
            }
        }
        self.order = order;
        self.emit_group(GroupEvent::MergeUndone {
            source_root: pending.source_root,
            dest_root: pending.dest_root,
        });
    }

    /// Moves a tab out of its group, making it standalone right after the
    /// group's remaining members. Splitting the root tab re-keys the group
    /// first.
    pub fn split(&mut self, id: TabId) {
        let Some(root) = self.root_of(id) else {
            trace!(tab = %id, "split on unknown tab ignored");
            return;
        };
        if self.group_size(root) <= 1 {
            trace!(tab = %id, "split on standalone tab ignored");
            return;
        }
        if let Some(members) = self.members.get_mut(&root) {
            members.retain(|m| *m != id);
        }
        let mut surviving_root = root;
        if RootId::from(id) == root {
            let new_root = RootId::from(self.related_tabs(root)[0]);
            self.rekey_group(root, new_root);
            surviving_root = new_root;
            self.emit_group(GroupEvent::RootChanged {
                old_root: root,
                new_root,
            });
        }
        if let Some(from) = self.index_of(id) {
            self.order.remove(from);
            let insert_at = self
                .last_member_index(surviving_root)
                .map(|i| i + 1)
                .unwrap_or(self.order.len());
            self.order.insert(insert_at, id);
        }
        let own_root = RootId::from(id);
        self.roots.insert(id, own_root);
        self.members.insert(own_root, vec![id]);
        let tab = {
            let tab = self.tabs.get_mut(&id).expect("member tabs exist");
            tab.root_id = own_root;
            tab.clone()
        };
        self.emit_group(GroupEvent::Split {
            tab,
            former_root: surviving_root,
        });
    }

    /// Signals that a multi-tab restore finished; subscribers reconcile once.
    pub fn restore_done(&mut self) {
        self.emit_tab(TabEvent::RestoreCompleted);
    }

    // ── Internals ────────────────────────────────────────────────

    fn next_stamp(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn last_member_index(&self, root: RootId) -> Option<usize> {
        self.related_tabs(root)
            .iter()
            .filter_map(|id| self.index_of(*id))
            .max()
    }

    fn sync_member_order(&mut self, root: RootId) {
        let order = &self.order;
        if let Some(members) = self.members.get_mut(&root) {
            members.sort_by_key(|id| order.iter().position(|t| t == id));
        }
    }

    fn rekey_group(&mut self, old: RootId, new: RootId) {
        let Some(members) = self.members.remove(&old) else {
            return;
        };
        for id in &members {
            self.roots.insert(*id, new);
            if let Some(tab) = self.tabs.get_mut(id) {
                tab.root_id = new;
            }
        }
        self.members.insert(new, members);
    }

    fn move_group_block(&mut self, root: RootId, to: usize) {
        let block: Vec<TabId> = self
            .order
            .iter()
            .copied()
            .filter(|id| self.roots.get(id) == Some(&root))
            .collect();
        self.order.retain(|id| self.roots.get(id) != Some(&root));
        let insert_at = to.min(self.order.len());
        for (offset, id) in block.into_iter().enumerate() {
            self.order.insert(insert_at + offset, id);
        }
    }

    fn select_with_previous(&mut self, id: TabId, previous: Option<RootId>) {
        let stamp = self.next_stamp();
        let Some(tab) = self.tabs.get_mut(&id) else {
            return;
        };
        tab.last_activity = stamp;
        let tab = tab.clone();
        self.active = Some(id);
        self.emit_tab(TabEvent::Selected { tab, previous });
    }

    fn emit_tab(&mut self, event: TabEvent) {
        self.tab_subscribers.retain(|tx| tx.try_send(event.clone()).is_ok());
    }

    fn emit_group(&mut self, event: GroupEvent) {
        self.group_subscribers.retain(|tx| tx.try_send(event.clone()).is_ok());
    }
}
