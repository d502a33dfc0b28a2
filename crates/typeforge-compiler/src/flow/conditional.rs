//! Conditional branches.

use crate::emit::BytecodeEmitter;

impl BytecodeEmitter {
    /// Consume a bool on the stack; run `then` when it is true.
    ///
    /// The false branch falls straight through to the continuation.
    pub fn if_then(&mut self, then: impl FnOnce(&mut Self)) {
        let end = self.define_label();
        self.jump_if_false(end);
        then(self);
        self.mark_label(end);
    }

    /// Consume a bool on the stack; run `then` or `otherwise`.
    pub fn if_then_else(&mut self, then: impl FnOnce(&mut Self), otherwise: impl FnOnce(&mut Self)) {
        let else_label = self.define_label();
        let end = self.define_label();

        self.jump_if_false(else_label);
        then(self);
        self.jump(end);

        self.mark_label(else_label);
        otherwise(self);
        self.mark_label(end);
    }
}
