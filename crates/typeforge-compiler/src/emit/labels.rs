//! Label table and jump fixups.
//!
//! Labels are declared before their position is known. Every branch records
//! a fixup (operand offset + label); fixups are patched with absolute targets
//! when the body is finished.

use super::Label;

/// Why marking a label failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LabelError {
    Redefined,
    Unknown,
}

#[derive(Debug, Default)]
pub(super) struct LabelTable {
    positions: Vec<Option<u32>>,
    fixups: Vec<(usize, Label)>,
}

impl LabelTable {
    pub fn define(&mut self) -> Label {
        let label = Label(self.positions.len() as u32);
        self.positions.push(None);
        label
    }

    pub fn mark(&mut self, label: Label, position: u32) -> Result<(), LabelError> {
        match self.positions.get_mut(label.0 as usize) {
            Some(Some(_)) => Err(LabelError::Redefined),
            Some(slot) => {
                *slot = Some(position);
                Ok(())
            }
            None => Err(LabelError::Unknown),
        }
    }

    pub fn add_fixup(&mut self, operand_offset: usize, label: Label) {
        self.fixups.push((operand_offset, label));
    }

    pub fn position(&self, label: Label) -> Option<u32> {
        self.positions.get(label.0 as usize).copied().flatten()
    }

    /// First label that was declared but never marked.
    pub fn first_unresolved(&self) -> Option<Label> {
        self.positions
            .iter()
            .position(Option::is_none)
            .map(|i| Label(i as u32))
    }

    pub fn fixups(&self) -> &[(usize, Label)] {
        &self.fixups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_mark() {
        let mut labels = LabelTable::default();
        let a = labels.define();
        let b = labels.define();
        assert_ne!(a, b);
        assert_eq!(labels.first_unresolved(), Some(a));

        assert_eq!(labels.mark(a, 10), Ok(()));
        assert_eq!(labels.position(a), Some(10));
        assert_eq!(labels.position(b), None);
        assert_eq!(labels.first_unresolved(), Some(b));
    }

    #[test]
    fn mark_twice_is_rejected() {
        let mut labels = LabelTable::default();
        let a = labels.define();
        labels.mark(a, 1).unwrap();
        assert_eq!(labels.mark(a, 2), Err(LabelError::Redefined));
        assert_eq!(labels.position(a), Some(1));
    }

    #[test]
    fn foreign_label_is_unknown() {
        let mut labels = LabelTable::default();
        assert_eq!(labels.mark(Label(3), 0), Err(LabelError::Unknown));
    }

    #[test]
    fn fixups_are_recorded_in_order() {
        let mut labels = LabelTable::default();
        let a = labels.define();
        labels.add_fixup(1, a);
        labels.add_fixup(9, a);
        assert_eq!(labels.fixups(), &[(1, a), (9, a)]);
    }
}
