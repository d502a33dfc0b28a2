//! Construct-and-throw helpers.

use typeforge_core::{ExceptionKind, KnownException};

use crate::emit::BytecodeEmitter;

impl BytecodeEmitter {
    /// Throw a new exception of a statically known kind.
    pub fn throw_new<K: KnownException>(&mut self, message: &str) {
        self.throw_kind(&ExceptionKind::of::<K>(), message);
    }

    /// Throw a new exception of `kind`.
    pub fn throw_kind(&mut self, kind: &ExceptionKind, message: &str) {
        self.load_string(message);
        self.new_exception(kind);
        self.throw();
    }

    /// Throw a new exception whose kind token is already on the stack.
    pub fn throw_dynamic(&mut self, message: &str) {
        self.load_string(message);
        self.new_exception_dynamic();
        self.throw();
    }
}
