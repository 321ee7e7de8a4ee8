//! 撤销账本：每个真实执行的批次对应一组补偿动作，后进先出
//!
//! 只接受 Replayable 的补偿（预演产生的 Preview 进不来），弹出即消费，不会重新压栈。

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::actions::Action;

/// 一个批次的补偿动作，已按执行的逆序排列
#[derive(Clone, Debug)]
pub struct CompensationBatch {
    pub batch_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub actions: Vec<Action>,
}

#[derive(Debug)]
pub struct UndoLedger {
    batches: Vec<CompensationBatch>,
    max_depth: usize,
}

impl UndoLedger {
    pub fn new(max_depth: usize) -> Self {
        Self {
            batches: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// 压入一个批次；空批次忽略。超出 max_depth 时丢弃最旧的批次
    pub fn push(&mut self, actions: Vec<Action>) -> Option<Uuid> {
        if actions.is_empty() {
            return None;
        }
        let batch = CompensationBatch {
            batch_id: Uuid::new_v4(),
            created_at: Utc::now(),
            actions,
        };
        let batch_id = batch.batch_id;
        tracing::debug!(%batch_id, size = batch.actions.len(), "Undo batch recorded");
        self.batches.push(batch);

        if self.batches.len() > self.max_depth {
            let dropped = self.batches.remove(0);
            tracing::warn!(
                batch_id = %dropped.batch_id,
                max_depth = self.max_depth,
                "Undo history full, discarding oldest batch"
            );
        }
        Some(batch_id)
    }

    pub fn pop(&mut self) -> Option<CompensationBatch> {
        self.batches.pop()
    }

    pub fn peek(&self) -> Option<&CompensationBatch> {
        self.batches.last()
    }

    pub fn depth(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

impl Default for UndoLedger {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionKind;

    fn reopen(id: &str) -> Action {
        Action::new(ActionKind::ReopenTask).with_id(id)
    }

    #[test]
    fn test_lifo() {
        let mut ledger = UndoLedger::default();
        ledger.push(vec![reopen("1")]);
        ledger.push(vec![reopen("2"), reopen("3")]);

        assert_eq!(ledger.depth(), 2);
        assert_eq!(ledger.peek().unwrap().actions.len(), 2);
        assert_eq!(ledger.pop().unwrap().actions, vec![reopen("2"), reopen("3")]);
        assert_eq!(ledger.pop().unwrap().actions, vec![reopen("1")]);
        assert!(ledger.pop().is_none());
    }

    #[test]
    fn test_empty_batch_is_ignored() {
        let mut ledger = UndoLedger::default();
        assert!(ledger.push(Vec::new()).is_none());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_bounded_depth_discards_oldest() {
        let mut ledger = UndoLedger::new(2);
        ledger.push(vec![reopen("1")]);
        ledger.push(vec![reopen("2")]);
        ledger.push(vec![reopen("3")]);

        assert_eq!(ledger.depth(), 2);
        assert_eq!(ledger.pop().unwrap().actions, vec![reopen("3")]);
        assert_eq!(ledger.pop().unwrap().actions, vec![reopen("2")]);
    }

    #[test]
    fn test_batch_ids_are_unique() {
        let mut ledger = UndoLedger::default();
        let a = ledger.push(vec![reopen("1")]).unwrap();
        let b = ledger.push(vec![reopen("1")]).unwrap();
        assert_ne!(a, b);
    }
}
