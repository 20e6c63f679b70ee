//! Routes model notifications into the projection engine and applies drag
//! outcomes back to the model.
//!
//! The mediator owns the pieces a rendering host needs behind one surface:
//! the engine, the metadata store and the drag classifier. It drains the
//! model's two event channels on the UI thread via `pump`; group events are
//! drained ahead of tab events so a `RootChanged` always settles before the
//! removal that caused it.

use tracing::{debug, trace};

use crate::actor::Receiver;
use crate::actor::drag::{DragCandidate, DragClassifier, DragOutcome, Hover, UngroupBarState};
use crate::common::config::Settings;
use crate::common::geometry::GridGeometry;
use crate::model::group::{GroupEvent, TabEvent, TabGroupModel};
use crate::model::metadata::MetadataStore;
use crate::model::tab::{RootId, Tab, TabId};
use crate::projection::{ProjectionConfig, ProjectionEngine, ViewEffect, VisualStatus};

pub struct Mediator {
    engine: ProjectionEngine,
    meta: MetadataStore,
    classifier: DragClassifier,
    settings: Settings,
    tab_rx: Receiver<TabEvent>,
    group_rx: Receiver<GroupEvent>,
    restoring: bool,
    transition_active: bool,
    surface_ready: bool,
    hovered: Option<RootId>,
    // Last (source, dest) pair whose metadata transfer was applied; merges
    // notify once per moved tab but transfer exactly once.
    last_transfer: Option<(RootId, RootId)>,
    last_rekey: Option<(RootId, RootId)>,
}

impl Mediator {
    pub fn new(model: &mut TabGroupModel, settings: Settings) -> Self {
        let tab_rx = model.subscribe_tabs();
        let group_rx = model.subscribe_groups();
        Self {
            engine: ProjectionEngine::new(ProjectionConfig::from_settings(&settings.projection)),
            meta: MetadataStore::new(),
            classifier: DragClassifier::new(settings.drag.clone()),
            settings,
            tab_rx,
            group_rx,
            restoring: false,
            transition_active: false,
            surface_ready: true,
            hovered: None,
            last_transfer: None,
            last_rekey: None,
        }
    }

    pub fn engine(&self) -> &ProjectionEngine {
        &self.engine
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.meta
    }

    pub fn metadata_mut(&mut self) -> &mut MetadataStore {
        &mut self.meta
    }

    pub fn take_effects(&mut self) -> Vec<ViewEffect> {
        self.engine.take_effects()
    }

    /// Drains both event channels. Group events first, so membership
    /// re-keying settles before the tab removals that triggered it.
    pub fn pump(&mut self, model: &TabGroupModel) {
        loop {
            let mut progressed = false;
            while let Ok((span, event)) = self.group_rx.try_recv() {
                let _guard = span.enter();
                self.handle_group_event(event, model);
                progressed = true;
            }
            if let Ok((span, event)) = self.tab_rx.try_recv() {
                let _guard = span.enter();
                self.handle_tab_event(event, model);
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
        // The dedup only spans one merge's event burst; a later merge of the
        // same root pair (ids get reused) must transfer again.
        self.last_transfer = None;
    }

    // ── Lifecycle flags ──────────────────────────────────────────

    /// Suppresses additions until `RestoreCompleted` triggers one catch-up
    /// reconciliation.
    pub fn begin_restore(&mut self) {
        self.restoring = true;
    }

    /// While a UI transition is active, additions are parked; ending the
    /// transition folds the pending insertion in and reconciles selection.
    pub fn set_transition_active(&mut self, active: bool, model: &TabGroupModel) {
        self.transition_active = active;
        if !active {
            self.engine.commit_delayed(model, &self.meta);
        }
    }

    // ── Merge confirmation (external undo affordance) ────────────

    pub fn commit_merge(&mut self, model: &mut TabGroupModel) {
        model.commit_merge();
        self.pump(model);
    }

    pub fn undo_merge(&mut self, model: &mut TabGroupModel) {
        model.undo_merge();
        self.pump(model);
    }

    // ── Drag glue ────────────────────────────────────────────────

    pub fn set_surface(&mut self, grid: GridGeometry, ungroup_bar: bool) {
        self.classifier.set_grid(grid);
        self.classifier.set_ungroup_bar_enabled(ungroup_bar);
    }

    /// False while the item list is cleared or a layout pass is in flight;
    /// releases issued in that window mutate nothing.
    pub fn set_surface_ready(&mut self, ready: bool) {
        self.surface_ready = ready;
    }

    pub fn drag_begin(&mut self, key: RootId) {
        let Some(index) = self.engine.position_of(key) else {
            trace!(%key, "drag began on unprojected item, ignoring");
            return;
        };
        let kind = self.engine.items()[index].kind;
        self.classifier.begin(key, index, kind);
        self.engine.set_status(key, VisualStatus::LIFTED, true);
    }

    /// How the ungroup drop bar should render right now.
    pub fn ungroup_bar(&self) -> UngroupBarState {
        self.classifier.bar_state()
    }

    pub fn drag_delta(&mut self, dx: f64, dy: f64) -> Hover {
        let candidates: Vec<DragCandidate> = self
            .engine
            .items()
            .iter()
            .enumerate()
            .map(|(index, item)| DragCandidate {
                key: item.key,
                index,
                kind: item.kind,
            })
            .collect();
        let hover = self.classifier.apply_delta(dx, dy, &candidates);
        let target = match hover {
            Hover::Merge { candidate, .. } => Some(candidate),
            _ => None,
        };
        if self.hovered != target {
            if let Some(prev) = self.hovered {
                self.engine.set_status(prev, VisualStatus::HOVERED, false);
            }
            if let Some(next) = target {
                self.engine.set_status(next, VisualStatus::HOVERED, true);
            }
            self.hovered = target;
        }
        hover
    }

    /// Resolves the gesture and applies the resulting mutation, if any.
    /// `target_index` is the projection slot a plain reorder would drop into.
    pub fn drag_release(
        &mut self,
        target_index: Option<usize>,
        model: &mut TabGroupModel,
    ) -> DragOutcome {
        let outcome = self.classifier.release(target_index, self.surface_ready);
        self.hovered = None;
        self.engine.clear_transient_statuses();
        match outcome {
            DragOutcome::Merge { dragged, candidate, .. } => {
                self.apply_merge(dragged, candidate, model);
            }
            DragOutcome::Ungroup { dragged } => {
                if let Some(member) = model.representative(dragged).map(|t| t.id) {
                    model.split(member);
                    self.pump(model);
                }
            }
            DragOutcome::Reorder { dragged, to } => {
                self.apply_reorder(dragged, to, model);
            }
            // Selection-mode entry is the host's concern; abandoned gestures
            // mutate nothing.
            DragOutcome::SelectionMode { .. } | DragOutcome::Abandoned => {}
        }
        outcome
    }

    pub fn drag_cancel(&mut self) {
        self.classifier.cancel();
        self.hovered = None;
        self.engine.clear_transient_statuses();
    }

    // ── Event handlers ───────────────────────────────────────────

    fn handle_tab_event(&mut self, event: TabEvent, model: &TabGroupModel) {
        match event {
            TabEvent::Added { tab, origin, delayed } => {
                if self.restoring {
                    trace!(tab = %tab.id, "addition during restore suppressed");
                    return;
                }
                let delayed = delayed || self.transition_active;
                self.engine.on_tab_added(&tab, origin, delayed, model, &self.meta);
            }
            TabEvent::Removed { tab } => self.on_tab_removed(tab, model),
            TabEvent::Selected { tab, previous } => {
                self.engine.on_tab_selected(&tab, previous, model, &self.meta);
            }
            TabEvent::Moved { tab, from, to } => {
                self.engine.on_tab_moved(&tab, from, to, model, &self.meta);
            }
            TabEvent::RestoreCompleted => {
                self.restoring = false;
                let unchanged = self.engine.reset_all(model, &self.meta);
                debug!(unchanged, "restore completed, projection reconciled");
            }
        }
    }

    fn on_tab_removed(&mut self, tab: Tab, model: &TabGroupModel) {
        let root = match self.last_rekey.take_if(|(old, _)| *old == tab.root_id) {
            Some((_, new)) => new,
            None => tab.root_id,
        };
        self.engine.on_tab_removed(&tab, model, &self.meta);
        self.discard_disqualified_metadata(root, model);
    }

    fn handle_group_event(&mut self, event: GroupEvent, model: &TabGroupModel) {
        match event {
            GroupEvent::Merged {
                tab,
                source_root,
                dest_root,
                provisional,
            } => {
                if self.last_transfer != Some((source_root, dest_root)) {
                    let precedence = self.settings.projection.merge_precedence;
                    if provisional {
                        self.meta.begin_merge(source_root, dest_root, precedence);
                    } else {
                        self.meta.apply_merge(source_root, dest_root, precedence);
                    }
                    self.last_transfer = Some((source_root, dest_root));
                }
                self.engine.on_group_merged(&tab, source_root, dest_root, model, &self.meta);
            }
            GroupEvent::MergeCommitted { .. } => {
                self.meta.commit_merge();
                self.last_transfer = None;
            }
            GroupEvent::MergeUndone { source_root, dest_root } => {
                debug!(%source_root, %dest_root, "merge undone, rebuilding projection");
                self.meta.abort_merge();
                self.last_transfer = None;
                self.engine.reset_all(model, &self.meta);
            }
            GroupEvent::Split { tab, former_root } => {
                self.last_transfer = None;
                self.engine.on_group_split(&tab, former_root, model, &self.meta);
                self.discard_disqualified_metadata(former_root, model);
            }
            GroupEvent::MovedWithinGroup { tab, from, to } => {
                self.engine.on_within_group_move(&tab, from, to, model, &self.meta);
            }
            GroupEvent::RootChanged { old_root, new_root } => {
                self.last_transfer = None;
                self.engine.rekey(old_root, new_root);
                self.meta.rekey(old_root, new_root);
                self.last_rekey = Some((old_root, new_root));
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────

    fn discard_disqualified_metadata(&mut self, root: RootId, model: &TabGroupModel) {
        let size = model.group_size(root);
        let degenerate = size == 1 && !self.settings.projection.singleton_groups;
        if size == 0 || degenerate {
            self.meta.remove(root);
        }
    }

    /// Merge direction rule: the dragged item is absorbed into the candidate
    /// when the candidate is already grouped; a grouped dragged item absorbs
    /// a standalone candidate; two singletons merge dragged-into-candidate.
    fn apply_merge(&mut self, dragged: RootId, candidate: RootId, model: &mut TabGroupModel) {
        let dragged_tab = model.related_tabs(dragged).first().copied();
        let candidate_tab = model.related_tabs(candidate).first().copied();
        let (Some(dragged_tab), Some(candidate_tab)) = (dragged_tab, candidate_tab) else {
            trace!(%dragged, %candidate, "merge targets gone, abandoning");
            return;
        };
        let candidate_grouped = model.group_size(candidate) > 1;
        let dragged_grouped = model.group_size(dragged) > 1;
        let (source, dest): (TabId, TabId) = if candidate_grouped || !dragged_grouped {
            (dragged_tab, candidate_tab)
        } else {
            (candidate_tab, dragged_tab)
        };
        let provisional = self.settings.projection.undoable_merges;
        model.merge(source, dest, provisional);
        self.pump(model);
        // The surviving item zooms out of the hover emphasis when it was the
        // hovered candidate; a surviving dragged item zooms out of the lift.
        if let Some(surviving) = model.root_of(dest) {
            let hint = if surviving == candidate {
                VisualStatus::ZOOM_OUT_FROM_HOVER
            } else {
                VisualStatus::ZOOM_OUT
            };
            self.engine.set_status(surviving, hint, true);
        }
    }

    fn apply_reorder(&mut self, dragged: RootId, to: usize, model: &mut TabGroupModel) {
        let Some(moved) = model.related_tabs(dragged).first().copied() else {
            return;
        };
        let flat = self
            .engine
            .items()
            .get(to)
            .and_then(|item| model.index_of(item.tab))
            .unwrap_or_else(|| model.len().saturating_sub(1));
        model.move_to(moved, flat);
        self.pump(model);
    }
}
