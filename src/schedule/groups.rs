//! Thread groups: independently flushed batches drained one after another.

use crate::core::{Result, SharedJob, ThreadError};
use crate::queue::JobQueue;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque identifier of a thread group
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(Uuid);

impl GroupId {
    /// A fresh random identifier
    pub fn new() -> Self {
        GroupId(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        GroupId(uuid)
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tick step during which a group is drained
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupPhase {
    /// After the main phase of `on_update`
    Update,
    /// After the synchronisation queue in `on_synchronise`
    Synchronise,
}

#[derive(Debug)]
struct ThreadGroup {
    id: GroupId,
    phase: GroupPhase,
    queue: Arc<JobQueue>,
}

/// Ordered collection of thread groups
#[derive(Debug, Default)]
pub(crate) struct ThreadGroups {
    groups: RwLock<Vec<ThreadGroup>>,
}

impl ThreadGroups {
    pub(crate) fn add(&self, phase: GroupPhase) -> GroupId {
        let id = GroupId::new();
        let label = format!("group-{}", id);
        self.groups.write().push(ThreadGroup {
            id,
            phase,
            queue: Arc::new(JobQueue::new(label)),
        });
        id
    }

    pub(crate) fn remove(&self, id: GroupId) -> Result<()> {
        let mut groups = self.groups.write();
        let index = groups
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| ThreadError::unknown_group(id))?;
        groups.remove(index);
        Ok(())
    }

    pub(crate) fn push(&self, id: GroupId, job: SharedJob) -> Result<()> {
        let groups = self.groups.read();
        let group = groups
            .iter()
            .find(|g| g.id == id)
            .ok_or_else(|| ThreadError::unknown_group(id))?;
        group.queue.push(job);
        Ok(())
    }

    /// Queues of `phase` in insertion order.
    ///
    /// A snapshot, so jobs may register into groups while the groups are being drained.
    pub(crate) fn queues(&self, phase: GroupPhase) -> Vec<Arc<JobQueue>> {
        self.groups
            .read()
            .iter()
            .filter(|g| g.phase == phase)
            .map(|g| Arc::clone(&g.queue))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.groups.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ClosureJob, JobContext};

    fn noop() -> SharedJob {
        Arc::new(ClosureJob::new(|_: &JobContext| {}))
    }

    #[test]
    fn test_groups_keep_insertion_order_per_phase() {
        let groups = ThreadGroups::default();
        let first = groups.add(GroupPhase::Update);
        let sync = groups.add(GroupPhase::Synchronise);
        let second = groups.add(GroupPhase::Update);

        groups.push(first, noop()).expect("push first");
        groups.push(second, noop()).expect("push second");
        groups.push(second, noop()).expect("push second again");
        groups.push(sync, noop()).expect("push sync");

        let update: Vec<_> = groups
            .queues(GroupPhase::Update)
            .iter()
            .map(|q| q.staged_len())
            .collect();
        assert_eq!(update, vec![1, 2]);
        assert_eq!(groups.queues(GroupPhase::Synchronise).len(), 1);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_unknown_group_is_rejected() {
        let groups = ThreadGroups::default();
        let stray = GroupId::new();
        assert!(matches!(
            groups.push(stray, noop()),
            Err(ThreadError::UnknownGroup { .. })
        ));
        assert!(groups.remove(stray).is_err());
    }

    #[test]
    fn test_remove_group() {
        let groups = ThreadGroups::default();
        let id = groups.add(GroupPhase::Update);
        groups.remove(id).expect("remove");
        assert_eq!(groups.len(), 0);
        assert!(groups.push(id, noop()).is_err());
    }
}
