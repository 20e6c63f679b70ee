use crate::model::tab::{RootId, TabId};

bitflags::bitflags! {
    /// Transient per-item feedback for the gesture/animation layer. Never
    /// persisted and ignored by the "observably unchanged" comparison.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VisualStatus: u8 {
        /// Candidate target of an in-flight merge hover.
        const HOVERED = 1 << 0;
        /// The item currently lifted by a drag.
        const LIFTED = 1 << 1;
        /// Play the restore (zoom-in) hint.
        const RESTORE = 1 << 2;
        /// Play the zoom-out hint after a merge release.
        const ZOOM_OUT = 1 << 3;
        /// Zoom-out variant for the item that absorbed the dragged one: the
        /// animation starts from the hover emphasis, not from rest.
        const ZOOM_OUT_FROM_HOVER = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// A tab or group representative; draggable.
    Tab,
    /// Message/banner card; swipeable but never draggable.
    Message,
}

impl ItemKind {
    pub fn is_draggable(&self) -> bool {
        matches!(self, ItemKind::Tab)
    }
}

/// One slot of the projection: a group representative or a standalone tab.
/// `key` is the stable identity; positions shift on every mutation and must
/// never be captured across callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayItem {
    pub key: RootId,
    pub kind: ItemKind,
    /// The representative tab backing this slot.
    pub tab: TabId,
    pub title: String,
    pub count: usize,
    pub selected: bool,
    pub last_activity: u64,
    pub status: VisualStatus,
}

impl DisplayItem {
    /// Equality for the renderer's purposes; transient status is excluded.
    pub fn observably_equal(&self, other: &DisplayItem) -> bool {
        self.key == other.key
            && self.kind == other.kind
            && self.tab == other.tab
            && self.title == other.title
            && self.count == other.count
            && self.selected == other.selected
    }
}

/// Minimal-diff edit stream for the rendering layer. Indexes are valid at
/// emission time; `InvalidateThumbnail` re-resolves by stable key so a stale
/// fetch can be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEffect {
    Inserted { index: usize },
    Removed { index: usize },
    Moved { from: usize, to: usize },
    Updated { index: usize },
    InvalidateThumbnail { key: RootId },
    /// The whole list was rebuilt; re-render from `items()`.
    Reset,
}
