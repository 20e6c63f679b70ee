//! Command trace record and replay.
//!
//! Every mutation applied through a `Driver` can be written out as one JSON
//! line. Replaying a trace against a fresh model and mediator reproduces the
//! same projection, which makes traces from a live session directly usable
//! as regression inputs.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::actor::mediator::Mediator;
use crate::common::config::Settings;
use crate::model::group::TabGroupModel;
use crate::model::tab::{LaunchOrigin, RootId, Tab, TabId};

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("reading trace: {0}")]
    Io(#[from] std::io::Error),
    #[error("trace line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

/// One recorded mutation. The variants mirror the model's mutation surface
/// plus the mediator's lifecycle flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Insert {
        tab: Tab,
        index: usize,
        origin: LaunchOrigin,
        delayed: bool,
    },
    InsertInGroup {
        tab: Tab,
        root: RootId,
        origin: LaunchOrigin,
        delayed: bool,
    },
    Close {
        tab: TabId,
    },
    Select {
        tab: TabId,
    },
    Move {
        tab: TabId,
        to: usize,
    },
    Merge {
        source: TabId,
        dest: TabId,
        provisional: bool,
    },
    CommitMerge,
    UndoMerge,
    Split {
        tab: TabId,
    },
    BeginRestore,
    RestoreDone,
    SetTransition {
        active: bool,
    },
}

/// Line-oriented trace sink; `None` path disables recording entirely.
pub struct Record {
    file: Option<File>,
}

impl Record {
    pub fn new(path: Option<&Path>) -> std::io::Result<Self> {
        Ok(Self {
            file: path.map(File::create).transpose()?,
        })
    }

    pub fn disabled() -> Self {
        Self { file: None }
    }

    fn on_command(&mut self, command: &Command) {
        let Some(file) = self.file.as_mut() else { return };
        match serde_json::to_string(command) {
            Ok(line) => {
                if let Err(err) = writeln!(file, "{line}") {
                    warn!(%err, "failed to append to trace, disabling recording");
                    self.file = None;
                }
            }
            Err(err) => warn!(%err, "failed to serialize trace command"),
        }
    }
}

/// Owns a model/mediator pair and applies `Command`s to them, recording each
/// one before it runs and pumping the mediator afterwards.
pub struct Driver {
    pub model: TabGroupModel,
    pub mediator: Mediator,
    record: Record,
}

impl Driver {
    pub fn new(settings: Settings, record: Record) -> Self {
        let mut model = TabGroupModel::new();
        let mediator = Mediator::new(&mut model, settings);
        Self {
            model,
            mediator,
            record,
        }
    }

    pub fn apply(&mut self, command: Command) {
        self.record.on_command(&command);
        match command {
            Command::Insert {
                tab,
                index,
                origin,
                delayed,
            } => self.model.insert_tab(tab, index, origin, delayed),
            Command::InsertInGroup {
                tab,
                root,
                origin,
                delayed,
            } => self.model.insert_tab_in_group(tab, root, origin, delayed),
            Command::Close { tab } => self.model.close_tab(tab),
            Command::Select { tab } => self.model.select(tab),
            Command::Move { tab, to } => self.model.move_to(tab, to),
            Command::Merge {
                source,
                dest,
                provisional,
            } => self.model.merge(source, dest, provisional),
            Command::CommitMerge => self.model.commit_merge(),
            Command::UndoMerge => self.model.undo_merge(),
            Command::Split { tab } => self.model.split(tab),
            Command::BeginRestore => self.mediator.begin_restore(),
            Command::RestoreDone => self.model.restore_done(),
            Command::SetTransition { active } => {
                self.mediator.set_transition_active(active, &self.model)
            }
        }
        self.mediator.pump(&self.model);
    }
}

/// Re-applies a recorded trace against a fresh driver.
pub fn replay(path: &Path, settings: Settings) -> Result<Driver, ReplayError> {
    let file = BufReader::new(File::open(path)?);
    let mut driver = Driver::new(settings, Record::disabled());
    for (number, line) in file.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let command = serde_json::from_str(&line).map_err(|source| ReplayError::Parse {
            line: number + 1,
            source,
        })?;
        driver.apply(command);
    }
    Ok(driver)
}
