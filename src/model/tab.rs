use serde::{Deserialize, Serialize};

/// Stable identifier for a tab, assigned by the owning tab collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TabId(pub u32);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a group. By convention equal to one member tab's id; an
/// ungrouped tab is the root of its own singleton group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RootId(pub u32);

impl From<TabId> for RootId {
    fn from(id: TabId) -> Self {
        RootId(id.0)
    }
}

impl std::fmt::Display for RootId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a tab came to exist, carried on the add notification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LaunchOrigin {
    #[default]
    Foreground,
    Background,
    Restored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub title: String,
    pub url: String,
    pub root_id: RootId,
    /// Monotonic activity stamp assigned by the collection; higher is more
    /// recent.
    pub last_activity: u64,
}

impl Tab {
    pub fn new(id: TabId, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            url: url.into(),
            root_id: id.into(),
            last_activity: 0,
        }
    }

    pub fn is_group_root(&self) -> bool {
        self.root_id.0 == self.id.0
    }
}
