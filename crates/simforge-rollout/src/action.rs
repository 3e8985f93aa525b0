use simforge_core::{GroundVarId, Value};

/// A sparse action choice for one step: every action ground variable not
/// listed keeps its schema default.
#[derive(Debug, Clone, Default)]
pub struct ActionAssignment {
    entries: Vec<(GroundVarId, Value)>,
}

impl ActionAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, gv: GroundVarId, value: Value) -> &mut Self {
        self.entries.push((gv, value));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (GroundVarId, Value)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_assignment() {
        let mut actions = ActionAssignment::new();
        assert!(actions.is_empty());
        actions.set(GroundVarId(3), Value::Bool(true));
        actions.set(GroundVarId(5), Value::Bool(true));
        assert_eq!(actions.len(), 2);
        let collected: Vec<_> = actions.iter().collect();
        assert_eq!(collected[0], (GroundVarId(3), Value::Bool(true)));
    }
}
