use tracing::{debug, trace};

use super::item::{DisplayItem, ItemKind, ViewEffect, VisualStatus};
use crate::common::collections::HashSet;
use crate::common::config::ProjectionSettings;
use crate::model::group::TabGroupModel;
use crate::model::metadata::MetadataStore;
use crate::model::tab::{LaunchOrigin, RootId, Tab, TabId};

/// Immutable mode flags for the projection, resolved once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProjectionConfig {
    /// Order items by most-recent activity instead of collection order.
    pub mru_mode: bool,
    /// Size-1 groups keep their group identity (and metadata).
    pub singleton_groups: bool,
}

impl ProjectionConfig {
    pub fn from_settings(settings: &ProjectionSettings) -> Self {
        Self {
            mru_mode: settings.mru_mode,
            singleton_groups: settings.singleton_groups,
        }
    }
}

/// Ordered list of display items, one per group or standalone tab, kept in
/// sync through narrow incremental operations. Stale references are silent
/// no-ops throughout; notifications legitimately race rapid mutations.
pub struct ProjectionEngine {
    config: ProjectionConfig,
    items: Vec<DisplayItem>,
    effects: Vec<ViewEffect>,
    delayed: Option<TabId>,
    // Removal events snapshot the tab before a root re-key settles; this
    // maps the stale root id to the surviving one.
    last_rekey: Option<(RootId, RootId)>,
}

impl ProjectionEngine {
    pub fn new(config: ProjectionConfig) -> Self {
        Self {
            config,
            items: Vec::new(),
            effects: Vec::new(),
            delayed: None,
            last_rekey: None,
        }
    }

    pub fn config(&self) -> ProjectionConfig {
        self.config
    }

    pub fn items(&self) -> &[DisplayItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position_of(&self, key: RootId) -> Option<usize> {
        self.items.iter().position(|item| item.key == key)
    }

    pub fn item(&self, key: RootId) -> Option<&DisplayItem> {
        self.position_of(key).map(|pos| &self.items[pos])
    }

    pub fn has_delayed(&self) -> bool {
        self.delayed.is_some()
    }

    /// Drains the pending minimal-diff edits for the rendering layer.
    pub fn take_effects(&mut self) -> Vec<ViewEffect> {
        std::mem::take(&mut self.effects)
    }

    /// Rebuilds the whole projection (full context switches only). Returns
    /// `true` when the result is observably unchanged so the caller can skip
    /// re-rendering.
    pub fn reset_all(&mut self, model: &TabGroupModel, meta: &MetadataStore) -> bool {
        let mut roots = projection_roots(model);
        if self.config.mru_mode {
            roots.sort_by(|a, b| model.group_recency(*b).cmp(&model.group_recency(*a)));
        }
        let fresh: Vec<DisplayItem> =
            roots.iter().filter_map(|root| build_item(*root, model, meta)).collect();
        self.delayed = None;
        self.last_rekey = None;
        let unchanged = fresh.len() == self.items.len()
            && fresh.iter().zip(&self.items).all(|(a, b)| a.observably_equal(b));
        if unchanged {
            trace!(items = fresh.len(), "projection unchanged after reset");
            return true;
        }
        debug!(items = fresh.len(), "projection rebuilt");
        self.items = fresh;
        // Edits queued before the rebuild refer to dead indexes; the reset
        // effect supersedes them.
        self.effects.clear();
        self.effects.push(ViewEffect::Reset);
        false
    }

    /// A tab appeared in the collection. Skips groups whose representative is
    /// already projected; otherwise inserts a new item at the translated
    /// index. With `delayed`, the insertion is parked until `commit_delayed`.
    pub fn on_tab_added(
        &mut self,
        tab: &Tab,
        origin: LaunchOrigin,
        delayed: bool,
        model: &TabGroupModel,
        meta: &MetadataStore,
    ) {
        let Some(root) = model.root_of(tab.id) else {
            trace!(tab = %tab.id, "added tab unknown to model, ignoring");
            return;
        };
        if self.position_of(root).is_some() {
            self.refresh_item(root, model, meta);
            return;
        }
        if delayed {
            // A second addition while one is parked folds the earlier one in
            // so the slot always holds the newest pending tab.
            if self.delayed.is_some() {
                self.commit_delayed(model, meta);
            }
            self.delayed = Some(tab.id);
            return;
        }
        self.insert_new(root, origin, model, meta);
    }

    /// Folds the parked insertion in. When the delayed item becomes the
    /// selected one, the previously selected item is deselected exactly now.
    pub fn commit_delayed(
        &mut self,
        model: &TabGroupModel,
        meta: &MetadataStore,
    ) -> Option<RootId> {
        let id = self.delayed.take()?;
        let Some(tab) = model.tab(id) else {
            trace!(tab = %id, "delayed tab gone before commit");
            return None;
        };
        let root = tab.root_id;
        if self.position_of(root).is_some() {
            self.refresh_item(root, model, meta);
            return Some(root);
        }
        if model.active_tab().is_some_and(|t| t.root_id == root) {
            for pos in 0..self.items.len() {
                if self.items[pos].selected {
                    self.items[pos].selected = false;
                    self.effects.push(ViewEffect::Updated { index: pos });
                }
            }
        }
        self.insert_new(root, LaunchOrigin::Foreground, model, meta);
        Some(root)
    }

    /// A tab left the collection. Removes the item once its group fully
    /// disappeared; otherwise the surviving representative is refreshed.
    pub fn on_tab_removed(&mut self, tab: &Tab, model: &TabGroupModel, meta: &MetadataStore) {
        if self.delayed == Some(tab.id) {
            self.delayed = None;
        }
        let key = if self.position_of(tab.root_id).is_some() {
            Some(tab.root_id)
        } else if let Some((old, new)) = self.last_rekey.take_if(|(old, _)| *old == tab.root_id) {
            trace!(%old, %new, "removal resolved through re-keyed root");
            Some(new)
        } else {
            // The closed tab may still back the item directly.
            self.items.iter().find(|item| item.tab == tab.id).map(|item| item.key)
        };
        let Some(key) = key else {
            trace!(tab = %tab.id, "removed tab not projected, ignoring");
            return;
        };
        if model.group_size(key) == 0 {
            if let Some(pos) = self.position_of(key) {
                self.items.remove(pos);
                self.effects.push(ViewEffect::Removed { index: pos });
            }
        } else if self.refresh_item(key, model, meta) {
            self.effects.push(ViewEffect::InvalidateThumbnail { key });
        }
    }

    /// Selection moved. Both affected items get a stale-thumbnail hint.
    pub fn on_tab_selected(
        &mut self,
        tab: &Tab,
        previous: Option<RootId>,
        model: &TabGroupModel,
        meta: &MetadataStore,
    ) {
        let new_root = model.root_of(tab.id).unwrap_or(tab.root_id);
        if let Some(prev) = previous
            && prev != new_root
            && let Some(pos) = self.position_of(prev)
            && self.items[pos].selected
        {
            self.items[pos].selected = false;
            self.effects.push(ViewEffect::Updated { index: pos });
            self.effects.push(ViewEffect::InvalidateThumbnail { key: prev });
        }
        if self.position_of(new_root).is_some() {
            self.refresh_item(new_root, model, meta);
            self.effects.push(ViewEffect::InvalidateThumbnail { key: new_root });
        }
    }

    /// A tab was absorbed into another group. The source item goes away once
    /// its group is empty; the destination aggregate is refreshed in place
    /// (no reordering outside MRU mode).
    pub fn on_group_merged(
        &mut self,
        _moved: &Tab,
        source_root: RootId,
        dest_root: RootId,
        model: &TabGroupModel,
        meta: &MetadataStore,
    ) {
        if model.group_size(source_root) == 0
            && let Some(pos) = self.position_of(source_root)
        {
            self.items.remove(pos);
            self.effects.push(ViewEffect::Removed { index: pos });
        }
        if self.refresh_item(dest_root, model, meta) {
            self.effects.push(ViewEffect::InvalidateThumbnail { key: dest_root });
            if self.config.mru_mode {
                self.reposition(dest_root, model);
            }
        }
    }

    /// A tab moved out of its group and became standalone.
    pub fn on_group_split(
        &mut self,
        moved: &Tab,
        former_root: RootId,
        model: &TabGroupModel,
        meta: &MetadataStore,
    ) {
        let Some(new_root) = model.root_of(moved.id) else {
            trace!(tab = %moved.id, "split tab unknown to model, ignoring");
            return;
        };
        if self.position_of(new_root).is_none() {
            self.insert_new(new_root, LaunchOrigin::Foreground, model, meta);
        }
        if self.refresh_item(former_root, model, meta) {
            self.effects.push(ViewEffect::InvalidateThumbnail { key: former_root });
            if self.config.mru_mode {
                self.reposition(former_root, model);
            }
        }
    }

    /// A member moved inside its group. The item's identity and position are
    /// stable; only the backing representative may change.
    pub fn on_within_group_move(
        &mut self,
        tab: &Tab,
        _from: usize,
        _to: usize,
        model: &TabGroupModel,
        meta: &MetadataStore,
    ) {
        let Some(root) = model.root_of(tab.id) else { return };
        let Some(pos) = self.position_of(root) else { return };
        let rep_changed =
            model.representative(root).is_some_and(|rep| rep.id != self.items[pos].tab);
        if self.refresh_item(root, model, meta) && rep_changed {
            self.effects.push(ViewEffect::InvalidateThumbnail { key: root });
        }
    }

    /// A whole group (or standalone tab) moved in collection order.
    pub fn on_tab_moved(
        &mut self,
        tab: &Tab,
        _from: usize,
        _to: usize,
        model: &TabGroupModel,
        _meta: &MetadataStore,
    ) {
        if self.config.mru_mode {
            return;
        }
        let Some(root) = model.root_of(tab.id) else { return };
        if self.position_of(root).is_some() {
            self.reposition(root, model);
        }
    }

    /// Moves an item's identity to a new root id, keeping position and state.
    pub fn rekey(&mut self, old: RootId, new: RootId) {
        if old == new {
            return;
        }
        debug_assert!(self.position_of(new).is_none(), "rekey target already projected");
        self.last_rekey = Some((old, new));
        if let Some(pos) = self.position_of(old) {
            self.items[pos].key = new;
            self.effects.push(ViewEffect::Updated { index: pos });
        } else {
            trace!(%old, %new, "rekey of unprojected group ignored");
        }
    }

    pub fn set_status(&mut self, key: RootId, flag: VisualStatus, on: bool) {
        let Some(pos) = self.position_of(key) else { return };
        let status = self.items[pos].status;
        let updated = if on { status | flag } else { status - flag };
        if updated != status {
            self.items[pos].status = updated;
            self.effects.push(ViewEffect::Updated { index: pos });
        }
    }

    /// Clears gesture feedback (hover/lift) from every item.
    pub fn clear_transient_statuses(&mut self) {
        for pos in 0..self.items.len() {
            let status = self.items[pos].status;
            let updated = status - (VisualStatus::HOVERED | VisualStatus::LIFTED);
            if updated != status {
                self.items[pos].status = updated;
                self.effects.push(ViewEffect::Updated { index: pos });
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────

    fn insert_new(
        &mut self,
        root: RootId,
        origin: LaunchOrigin,
        model: &TabGroupModel,
        meta: &MetadataStore,
    ) {
        let Some(mut item) = build_item(root, model, meta) else {
            trace!(%root, "no representative for new item, ignoring");
            return;
        };
        if origin == LaunchOrigin::Restored {
            item.status |= VisualStatus::RESTORE;
        }
        let index = if self.config.mru_mode {
            self.mru_index(item.last_activity, root)
        } else {
            self.translated_index(root, model)
        };
        self.items.insert(index, item);
        self.effects.push(ViewEffect::Inserted { index });
    }

    /// Translates a group's flat collection position into a projection index
    /// by counting the projected groups whose first member precedes it.
    fn translated_index(&self, root: RootId, model: &TabGroupModel) -> usize {
        let mut seen = HashSet::default();
        let mut index = 0;
        for tab in model.ordered_tabs() {
            if tab.root_id == root {
                break;
            }
            if seen.insert(tab.root_id) && self.position_of(tab.root_id).is_some() {
                index += 1;
            }
        }
        index.min(self.items.len())
    }

    fn mru_index(&self, activity: u64, exclude: RootId) -> usize {
        self.items
            .iter()
            .filter(|item| item.key != exclude && item.last_activity > activity)
            .count()
    }

    /// Computes the (from, to) move pair for one item instead of resorting.
    fn reposition(&mut self, key: RootId, model: &TabGroupModel) {
        let Some(from) = self.position_of(key) else { return };
        let item = self.items.remove(from);
        let to = if self.config.mru_mode {
            self.mru_index(item.last_activity, key)
        } else {
            self.translated_index(key, model)
        };
        self.items.insert(to, item);
        if from != to {
            self.effects.push(ViewEffect::Moved { from, to });
        }
    }

    /// Rebuilds one item in place, preserving transient status. Returns
    /// whether anything observable changed.
    fn refresh_item(&mut self, key: RootId, model: &TabGroupModel, meta: &MetadataStore) -> bool {
        let Some(pos) = self.position_of(key) else { return false };
        let Some(mut fresh) = build_item(key, model, meta) else { return false };
        if self.items[pos].observably_equal(&fresh)
            && self.items[pos].last_activity == fresh.last_activity
        {
            return false;
        }
        fresh.status = self.items[pos].status;
        self.items[pos] = fresh;
        self.effects.push(ViewEffect::Updated { index: pos });
        true
    }
}

fn projection_roots(model: &TabGroupModel) -> Vec<RootId> {
    let mut seen = HashSet::default();
    let mut roots = Vec::new();
    for tab in model.ordered_tabs() {
        if seen.insert(tab.root_id) {
            roots.push(tab.root_id);
        }
    }
    roots
}

fn build_item(root: RootId, model: &TabGroupModel, meta: &MetadataStore) -> Option<DisplayItem> {
    let rep = model.representative(root)?;
    let count = model.group_size(root);
    let title = if count > 1 {
        meta.get(root)
            .and_then(|visuals| visuals.title.clone())
            .unwrap_or_else(|| rep.title.clone())
    } else {
        rep.title.clone()
    };
    Some(DisplayItem {
        key: root,
        kind: ItemKind::Tab,
        tab: rep.id,
        title,
        count,
        selected: model.active_tab().is_some_and(|t| t.root_id == root),
        last_activity: model.group_recency(root),
        status: VisualStatus::empty(),
    })
}
