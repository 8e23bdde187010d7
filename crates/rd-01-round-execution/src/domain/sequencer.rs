//! Checkpoint sequencer
//!
//! Holds the round's checkpoints in position order and a cursor. Visited
//! checkpoints are always the prefix `[0, current_index)`. The cursor only
//! moves forward.

use super::identifier::ScanToken;
use crate::error::{RoundError, RoundResult};
use shared_types::{Checkpoint, CheckpointId, CheckpointVisit};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointSequencer {
    checkpoints: Vec<Checkpoint>,
    current_index: usize,
}

impl CheckpointSequencer {
    /// Sequencer at the first checkpoint. Checkpoints are ordered by
    /// `position`; ties keep input order.
    pub fn new(mut checkpoints: Vec<Checkpoint>) -> Self {
        checkpoints.sort_by_key(|cp| cp.position);
        Self {
            checkpoints,
            current_index: 0,
        }
    }

    /// Rebuild the cursor from durable visits.
    ///
    /// The visited set must be exactly a prefix of the ordered checkpoints.
    /// Repeated visits of the same checkpoint collapse to one.
    pub fn resume(checkpoints: Vec<Checkpoint>, visits: &[CheckpointVisit]) -> RoundResult<Self> {
        let mut sequencer = Self::new(checkpoints);

        let mut visited: HashSet<&CheckpointId> = HashSet::new();
        for visit in visits {
            if sequencer.position_of(&visit.checkpoint_id).is_none() {
                return Err(RoundError::InconsistentState {
                    reason: format!(
                        "visit {} references unknown checkpoint {}",
                        visit.id, visit.checkpoint_id
                    ),
                });
            }
            visited.insert(&visit.checkpoint_id);
        }

        let prefix = sequencer
            .checkpoints
            .iter()
            .take_while(|cp| visited.contains(&cp.id))
            .count();

        if prefix != visited.len() {
            let gap = sequencer
                .checkpoints
                .get(prefix)
                .map(|cp| cp.id.to_string())
                .unwrap_or_default();
            return Err(RoundError::InconsistentState {
                reason: format!(
                    "visited checkpoints are not a prefix of the route; {} is unvisited",
                    gap
                ),
            });
        }

        sequencer.current_index = prefix;
        Ok(sequencer)
    }

    /// The checkpoint to visit next, `None` once the round is complete.
    pub fn current(&self) -> Option<&Checkpoint> {
        self.checkpoints.get(self.current_index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_current(&self, checkpoint_id: &CheckpointId) -> bool {
        self.current().is_some_and(|cp| cp.id == *checkpoint_id)
    }

    /// Move past the current checkpoint.
    pub fn advance(&mut self) -> RoundResult<Option<&Checkpoint>> {
        if self.is_complete() {
            return Err(RoundError::InconsistentState {
                reason: "cannot advance past the last checkpoint".to_string(),
            });
        }
        self.current_index += 1;
        Ok(self.current())
    }

    pub fn is_complete(&self) -> bool {
        self.current_index >= self.checkpoints.len()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn get(&self, checkpoint_id: &CheckpointId) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|cp| cp.id == *checkpoint_id)
    }

    /// Index of a checkpoint in route order.
    pub fn position_of(&self, checkpoint_id: &CheckpointId) -> Option<usize> {
        self.checkpoints.iter().position(|cp| cp.id == *checkpoint_id)
    }

    pub fn visited(&self) -> &[Checkpoint] {
        &self.checkpoints[..self.current_index.min(self.checkpoints.len())]
    }

    pub fn remaining(&self) -> &[Checkpoint] {
        &self.checkpoints[self.current_index.min(self.checkpoints.len())..]
    }

    /// A checkpoint other than the current one that the token identifies.
    pub fn find_other(&self, token: &ScanToken) -> Option<&Checkpoint> {
        self.checkpoints
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != self.current_index)
            .map(|(_, cp)| cp)
            .find(|cp| token.identifies(cp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::CheckInMethod;

    fn checkpoints() -> Vec<Checkpoint> {
        vec![
            Checkpoint::new("cp-3", "Roof", 3).with_manual_code("333333333"),
            Checkpoint::new("cp-1", "Gate", 1).with_manual_code("111111111"),
            Checkpoint::new("cp-2", "Dock", 2).with_manual_code("222222222"),
        ]
    }

    fn visit(cp: &str) -> CheckpointVisit {
        CheckpointVisit {
            id: format!("v-{}", cp).into(),
            round_id: "r-1".into(),
            checkpoint_id: cp.into(),
            visited_at: 0,
            location: None,
            signature: None,
            photo: None,
            duration_ms: 0,
            check_in: CheckInMethod::Scan,
        }
    }

    #[test]
    fn test_orders_by_position() {
        let seq = CheckpointSequencer::new(checkpoints());
        let ids: Vec<_> = seq.checkpoints().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["cp-1", "cp-2", "cp-3"]);
        assert!(seq.is_current(&"cp-1".into()));
    }

    #[test]
    fn test_advance_until_complete() {
        let mut seq = CheckpointSequencer::new(checkpoints());
        assert_eq!(seq.advance().unwrap().map(|c| c.id.as_str()), Some("cp-2"));
        seq.advance().unwrap();
        assert!(seq.advance().unwrap().is_none());
        assert!(seq.is_complete());
        assert!(seq.current().is_none());
        assert!(seq.advance().is_err());
        assert_eq!(seq.visited().len(), 3);
        assert!(seq.remaining().is_empty());
    }

    #[test]
    fn test_resume_from_prefix() {
        let seq = CheckpointSequencer::resume(checkpoints(), &[visit("cp-1")]).unwrap();
        assert_eq!(seq.current_index(), 1);
        assert!(seq.is_current(&"cp-2".into()));
    }

    #[test]
    fn test_resume_collapses_duplicates() {
        let seq =
            CheckpointSequencer::resume(checkpoints(), &[visit("cp-1"), visit("cp-1")]).unwrap();
        assert_eq!(seq.current_index(), 1);
    }

    #[test]
    fn test_resume_rejects_gap() {
        let err = CheckpointSequencer::resume(checkpoints(), &[visit("cp-1"), visit("cp-3")])
            .unwrap_err();
        assert!(matches!(err, RoundError::InconsistentState { .. }));
    }

    #[test]
    fn test_resume_rejects_unknown_checkpoint() {
        let err = CheckpointSequencer::resume(checkpoints(), &[visit("cp-9")]).unwrap_err();
        assert!(matches!(err, RoundError::InconsistentState { .. }));
    }

    #[test]
    fn test_empty_route_is_complete() {
        let seq = CheckpointSequencer::new(Vec::new());
        assert!(seq.is_complete());
        assert!(seq.is_empty());
    }

    #[test]
    fn test_find_other_skips_current() {
        let seq = CheckpointSequencer::new(checkpoints());
        let own = ScanToken::Manual {
            code: "111111111".into(),
        };
        let later = ScanToken::Manual {
            code: "333333333".into(),
        };
        assert!(seq.find_other(&own).is_none());
        assert_eq!(seq.find_other(&later).map(|c| c.id.as_str()), Some("cp-3"));
    }
}
