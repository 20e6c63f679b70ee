//! Classifies a pointer drag into a merge, ungroup or reorder intent.
//!
//! Deltas are interpreted against the grid's resting cells: a candidate is a
//! merge hover only when the dragged item sits almost exactly one cell pitch
//! away from it, inside the open band `(P - T, P + T)` on both axes. Plain
//! adjacent-slot reordering never enters that band.

use tracing::{debug, trace};

use crate::common::config::DragSettings;
use crate::common::geometry::GridGeometry;
use crate::model::tab::RootId;
use crate::projection::ItemKind;

/// A projected item the dragged one may interact with.
#[derive(Debug, Clone, Copy)]
pub struct DragCandidate {
    pub key: RootId,
    pub index: usize,
    pub kind: ItemKind,
}

/// Current hover classification, recomputed on every delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hover {
    #[default]
    None,
    Merge {
        candidate: RootId,
        forward: bool,
    },
    Ungroup,
}

/// The ungroup drop bar at the container bottom. `Show` covers both the
/// disengaged baseline and the engaged-but-not-close case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UngroupBarState {
    #[default]
    Hidden,
    Show,
    Hovered,
}

/// What the release of a drag resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    Merge {
        dragged: RootId,
        candidate: RootId,
        forward: bool,
    },
    Ungroup {
        dragged: RootId,
    },
    Reorder {
        dragged: RootId,
        to: usize,
    },
    /// Long-press with no movement before release.
    SelectionMode {
        dragged: RootId,
    },
    /// Nothing to do, or the surface was cleared mid-gesture.
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Dragging,
    Concluded,
}

#[derive(Debug, Clone, Copy)]
struct Session {
    key: RootId,
    index: usize,
    moved: bool,
    long_pressed: bool,
}

/// One drag at a time; `begin` while the previous release is still being
/// handled is not supported input.
#[derive(Debug, Clone)]
pub struct DragClassifier {
    config: DragSettings,
    grid: Option<GridGeometry>,
    bar_enabled: bool,
    phase: Phase,
    session: Option<Session>,
    hover: Hover,
    bar: UngroupBarState,
    zone_engaged: bool,
}

impl Default for DragClassifier {
    fn default() -> Self {
        Self::new(DragSettings::default())
    }
}

impl DragClassifier {
    pub fn new(config: DragSettings) -> Self {
        Self {
            config,
            grid: None,
            bar_enabled: false,
            phase: Phase::Idle,
            session: None,
            hover: Hover::None,
            bar: UngroupBarState::Hidden,
            zone_engaged: false,
        }
    }

    /// The surface's current cell layout; deltas are meaningless without one.
    pub fn set_grid(&mut self, grid: GridGeometry) {
        self.grid = Some(grid);
    }

    /// The ungroup drop bar only exists inside a focused-group view.
    pub fn set_ungroup_bar_enabled(&mut self, enabled: bool) {
        self.bar_enabled = enabled;
        if !enabled {
            self.bar = UngroupBarState::Hidden;
        }
    }

    pub fn update_config(&mut self, config: DragSettings) {
        self.config = config;
    }

    pub fn is_dragging(&self) -> bool {
        self.phase == Phase::Dragging
    }

    pub fn hover(&self) -> Hover {
        self.hover
    }

    pub fn bar_state(&self) -> UngroupBarState {
        self.bar
    }

    /// Whether the dragged item's bottom edge has crossed into the ungroup
    /// zone, regardless of how the bar currently reads.
    pub fn zone_engaged(&self) -> bool {
        self.zone_engaged
    }

    pub fn dragged(&self) -> Option<RootId> {
        self.session.map(|s| s.key)
    }

    /// Pointer-down on a draggable item. Dragging a message/banner item is a
    /// programming error, not a runtime condition.
    pub fn begin(&mut self, key: RootId, index: usize, kind: ItemKind) {
        debug_assert!(kind.is_draggable(), "drag started on non-draggable item");
        debug_assert!(self.phase != Phase::Dragging, "drag already in progress");
        trace!(%key, index, "drag began");
        self.phase = Phase::Dragging;
        self.session = Some(Session {
            key,
            index,
            moved: false,
            long_pressed: false,
        });
        self.hover = Hover::None;
        self.zone_engaged = false;
        self.bar = if self.bar_enabled { UngroupBarState::Show } else { UngroupBarState::Hidden };
    }

    /// Long-press fired by the gesture recognizer. Only meaningful while no
    /// movement has occurred yet.
    pub fn long_press(&mut self) {
        if self.phase != Phase::Dragging {
            return;
        }
        if let Some(session) = &mut self.session
            && !session.moved
        {
            session.long_pressed = true;
        }
    }

    /// `(dx, dy)` is the dragged item's total offset from its resting
    /// rectangle. Recomputes the hover classification from scratch; leaving
    /// the merge band clears it (symmetric, not sticky).
    pub fn apply_delta(&mut self, dx: f64, dy: f64, candidates: &[DragCandidate]) -> Hover {
        if self.phase != Phase::Dragging {
            trace!("delta after gesture concluded, ignoring");
            return Hover::None;
        }
        let (Some(session), Some(grid)) = (&mut self.session, self.grid) else {
            return Hover::None;
        };
        if dx != 0.0 || dy != 0.0 {
            session.moved = true;
        }
        let session = *session;

        let current = grid.resting_center(session.index).offset(dx, dy);
        let threshold = self.config.merge_threshold;
        let mut best: Option<(f64, RootId, bool)> = None;
        for candidate in candidates {
            if candidate.key == session.key || !candidate.kind.is_draggable() {
                continue;
            }
            let resting = grid.resting_center(candidate.index);
            let off_x = (current.x - resting.x).abs();
            let off_y = (current.y - resting.y).abs();
            if off_x >= threshold || off_y >= threshold {
                continue;
            }
            let fit = off_x.max(off_y);
            if best.is_none_or(|(b, _, _)| fit < b) {
                best = Some((fit, candidate.key, candidate.index > session.index));
            }
        }

        self.bar = self.classify_bar(dy, session.index, grid);
        self.hover = if self.bar == UngroupBarState::Hovered {
            Hover::Ungroup
        } else if let Some((_, candidate, forward)) = best {
            Hover::Merge { candidate, forward }
        } else {
            Hover::None
        };
        self.hover
    }

    /// Pointer-up. `target_index` is the slot the rendering layer would drop
    /// into for a plain reorder; `surface_ready` is false when the item list
    /// was cleared or a layout pass is in flight, in which case no mutation
    /// may be issued.
    pub fn release(&mut self, target_index: Option<usize>, surface_ready: bool) -> DragOutcome {
        if self.phase != Phase::Dragging {
            return DragOutcome::Abandoned;
        }
        let hover = self.hover;
        let session = self.session.take();
        self.phase = Phase::Concluded;
        self.hover = Hover::None;
        self.bar = UngroupBarState::Hidden;
        self.zone_engaged = false;
        let Some(session) = session else {
            return DragOutcome::Abandoned;
        };
        if !surface_ready {
            debug!(key = %session.key, "surface not ready at release, abandoning gesture");
            return DragOutcome::Abandoned;
        }
        if session.long_pressed && !session.moved {
            return DragOutcome::SelectionMode { dragged: session.key };
        }
        match hover {
            Hover::Merge { candidate, forward } => DragOutcome::Merge {
                dragged: session.key,
                candidate,
                forward,
            },
            Hover::Ungroup => DragOutcome::Ungroup { dragged: session.key },
            Hover::None => match target_index {
                Some(to) if to != session.index => {
                    DragOutcome::Reorder { dragged: session.key, to }
                }
                _ => DragOutcome::Abandoned,
            },
        }
    }

    /// Forced reset (navigation away, surface close). No mutation is emitted.
    pub fn cancel(&mut self) {
        if self.phase == Phase::Dragging {
            trace!(key = ?self.dragged(), "drag cancelled");
        }
        self.phase = Phase::Idle;
        self.session = None;
        self.hover = Hover::None;
        self.bar = UngroupBarState::Hidden;
        self.zone_engaged = false;
    }

    fn classify_bar(&mut self, dy: f64, index: usize, grid: GridGeometry) -> UngroupBarState {
        if !self.bar_enabled {
            self.zone_engaged = false;
            return UngroupBarState::Hidden;
        }
        let bottom = grid.resting_rect(index).bottom() + dy;
        let distance = grid.container.bottom() - bottom;
        self.zone_engaged = distance <= self.config.ungroup_zone_height;
        if self.zone_engaged && distance <= self.config.ungroup_hover_threshold {
            UngroupBarState::Hovered
        } else {
            UngroupBarState::Show
        }
    }
}
