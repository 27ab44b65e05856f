use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// How many terminal operations are retained for observers.
const RETAINED_OPERATIONS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Initialize,
    Translate,
    Commit,
}

impl OpKind {
    pub fn name(self) -> &'static str {
        match self {
            OpKind::Initialize => "initialize",
            OpKind::Translate => "translate",
            OpKind::Commit => "commit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpStatus {
    Running,
    Succeeded,
    Failed,
}

/// A long-running operation's record. Created by the orchestrator,
/// mutated only through [`OperationManager`], retained after completion
/// so a UI can observe terminal state.
#[derive(Debug, Clone)]
pub struct Operation {
    pub id: u64,
    pub save_path: PathBuf,
    pub kind: OpKind,
    pub status: OpStatus,
    pub current_step: usize,
    pub total_steps: usize,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    ops: VecDeque<Operation>,
}

/// In-memory, insertion-ordered operation log. The lock is held only to
/// insert, update or read entries, never across I/O. No persistence.
#[derive(Clone, Default)]
pub struct OperationManager {
    inner: Arc<Mutex<Registry>>,
}

impl OperationManager {
    pub fn new() -> OperationManager {
        OperationManager::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // A poisoned registry only means a panicking thread; the data is
        // plain bookkeeping and still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new running operation. Rejects overlap: only one
    /// operation may be running per save at a time.
    pub fn start(&self, save: &Path, kind: OpKind, total_steps: usize) -> Result<u64> {
        let mut registry = self.lock();
        if let Some(active) = registry
            .ops
            .iter()
            .find(|op| op.status == OpStatus::Running && op.save_path == save)
        {
            return Err(Error::WorkflowActive {
                running: active.kind.name(),
                save: save.to_path_buf(),
            });
        }

        registry.next_id += 1;
        let id = registry.next_id;
        registry.ops.push_back(Operation {
            id,
            save_path: save.to_path_buf(),
            kind,
            status: OpStatus::Running,
            current_step: 0,
            total_steps,
            message: String::new(),
            started_at: Utc::now(),
            ended_at: None,
        });

        // Prune the oldest terminal records beyond the retention bound.
        while registry.ops.len() > RETAINED_OPERATIONS {
            match registry
                .ops
                .iter()
                .position(|op| op.status != OpStatus::Running)
            {
                Some(pos) => {
                    registry.ops.remove(pos);
                }
                None => break,
            }
        }

        Ok(id)
    }

    pub fn update(&self, id: u64, current_step: usize, message: &str) {
        let mut registry = self.lock();
        if let Some(op) = registry.ops.iter_mut().find(|op| op.id == id) {
            op.current_step = current_step;
            op.message = message.to_string();
        }
    }

    pub fn complete(&self, id: u64, success: bool, message: &str) {
        let mut registry = self.lock();
        if let Some(op) = registry.ops.iter_mut().find(|op| op.id == id) {
            op.status = if success {
                OpStatus::Succeeded
            } else {
                OpStatus::Failed
            };
            op.message = message.to_string();
            op.ended_at = Some(Utc::now());
        }
    }

    /// The running operation for a save, if any, optionally filtered by
    /// kind.
    pub fn get_active(&self, save: &Path, kind: Option<OpKind>) -> Option<Operation> {
        self.lock()
            .ops
            .iter()
            .find(|op| {
                op.status == OpStatus::Running
                    && op.save_path == save
                    && kind.map_or(true, |k| op.kind == k)
            })
            .cloned()
    }

    /// Every retained operation, oldest first.
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().ops.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_rejects_overlap_per_save() {
        let ops = OperationManager::new();
        let save = Path::new("/saves/world");
        let id = ops.start(save, OpKind::Translate, 4).unwrap();
        assert!(ops.get_active(save, Some(OpKind::Translate)).is_some());
        assert!(ops.get_active(save, Some(OpKind::Commit)).is_none());

        assert!(matches!(
            ops.start(save, OpKind::Commit, 9),
            Err(Error::WorkflowActive { running: "translate", .. })
        ));
        // A different save is unaffected.
        ops.start(Path::new("/saves/other"), OpKind::Commit, 9)
            .unwrap();

        ops.complete(id, true, "done");
        ops.start(save, OpKind::Commit, 9).unwrap();
    }

    #[test]
    fn completed_operations_are_retained() {
        let ops = OperationManager::new();
        let save = Path::new("/saves/world");
        let id = ops.start(save, OpKind::Initialize, 6).unwrap();
        ops.update(id, 2, "exploding regions");
        ops.complete(id, false, "cancelled");

        let all = ops.operations();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, OpStatus::Failed);
        assert_eq!(all[0].message, "cancelled");
        assert!(all[0].ended_at.is_some());
        assert!(ops.get_active(save, None).is_none());
    }

    #[test]
    fn retention_is_bounded() {
        let ops = OperationManager::new();
        for i in 0..250 {
            let save = PathBuf::from(format!("/saves/world{i}"));
            let id = ops.start(&save, OpKind::Translate, 1).unwrap();
            ops.complete(id, true, "ok");
        }
        assert_eq!(ops.operations().len(), RETAINED_OPERATIONS);
    }
}
