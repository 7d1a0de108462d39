use indexmap::IndexMap;

use crate::models::Developer;
use crate::services::live_channel::{ChannelEvent, ChannelStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

/// Developers currently on the map, keyed by id and kept in display order.
///
/// Display order is snapshot order followed by the arrival order of ids that
/// were not on the board yet. Updating an existing id keeps its position.
#[derive(Debug)]
pub struct DeveloperBoard {
    developers: IndexMap<String, Developer>,
    channel_status: ChannelStatus,
}

impl Default for DeveloperBoard {
    fn default() -> Self {
        Self {
            developers: IndexMap::new(),
            channel_status: ChannelStatus::Disconnected,
        }
    }
}

impl DeveloperBoard {
    /// Drops everything from the previous session and loads `snapshot`.
    pub fn replace_snapshot(&mut self, snapshot: Vec<Developer>) {
        self.developers.clear();
        for dev in snapshot {
            self.developers.insert(dev.id.clone(), dev);
        }
    }

    pub fn upsert(&mut self, dev: Developer) -> Upsert {
        match self.developers.get_mut(&dev.id) {
            Some(existing) => {
                *existing = dev;
                Upsert::Updated
            }
            None => {
                self.developers.insert(dev.id.clone(), dev);
                Upsert::Inserted
            }
        }
    }

    pub fn apply(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::NewDeveloper(dev) => {
                self.upsert(dev);
            }
            ChannelEvent::Status(status) => self.channel_status = status,
        }
    }

    pub fn set_channel_status(&mut self, status: ChannelStatus) {
        self.channel_status = status;
    }

    pub fn channel_status(&self) -> ChannelStatus {
        self.channel_status
    }

    pub fn get(&self, id: &str) -> Option<&Developer> {
        self.developers.get(id)
    }

    pub fn developers(&self) -> Vec<Developer> {
        self.developers.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.developers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.developers.is_empty()
    }
}
