//! Loops: `while_loop`, `for_range` and `foreach`.

use typeforge_core::{BuildError, DataType, TypeHash};

use crate::bytecode::OpCode;
use crate::emit::{BytecodeEmitter, Label, Local};
use crate::probe::{CapabilityProbe, DISPOSE, GET_ENUMERATOR};

/// Break and continue targets of a loop being emitted.
#[derive(Debug, Clone, Copy)]
pub struct LoopLabels {
    break_label: Label,
    continue_label: Label,
    /// Region depth at loop entry.
    region_depth: usize,
}

impl LoopLabels {
    pub fn break_label(&self) -> Label {
        self.break_label
    }

    pub fn continue_label(&self) -> Label {
        self.continue_label
    }

    /// Exit the loop. Uses `Leave` when the body opened protected regions
    /// since loop entry, so their finally bodies still run.
    pub fn branch_break(&self, e: &mut BytecodeEmitter) {
        self.branch(e, self.break_label);
    }

    /// Continue with the next iteration.
    pub fn branch_continue(&self, e: &mut BytecodeEmitter) {
        self.branch(e, self.continue_label);
    }

    fn branch(&self, e: &mut BytecodeEmitter, target: Label) {
        if e.region_depth() > self.region_depth {
            e.leave_to(target);
        } else {
            e.jump(target);
        }
    }
}

/// A loop bound for [`BytecodeEmitter::for_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Const(i32),
    /// Re-read on every test.
    Local(Local),
    /// Already on the evaluation stack. When both bounds come from the
    /// stack, the stop value must be on top.
    Stack,
}

impl BytecodeEmitter {
    /// `while (cond) body`. `cond` must leave a bool on the stack.
    pub fn while_loop(
        &mut self,
        cond: impl FnOnce(&mut Self),
        body: impl FnOnce(&mut Self, &LoopLabels),
    ) {
        let head = self.define_label();
        let exit = self.define_label();
        let labels = LoopLabels {
            break_label: exit,
            continue_label: head,
            region_depth: self.region_depth(),
        };

        self.mark_label(head);
        cond(self);
        self.jump_if_false(exit);
        body(self, &labels);
        self.jump(head);
        self.mark_label(exit);
    }

    /// Counted loop over `start..stop` (or `start..=stop` when `inclusive`).
    ///
    /// `body` receives the `i32` counter local and the loop labels. An
    /// inclusive loop exits after the body runs for `stop`, before the
    /// counter is incremented, so a stop of `i32::MAX` terminates.
    pub fn for_range(
        &mut self,
        start: Bound,
        stop: Bound,
        inclusive: bool,
        body: impl FnOnce(&mut Self, Local, &LoopLabels),
    ) -> Local {
        let counter = self.declare_local(DataType::I32);

        // Stop is on top when both bounds come from the stack.
        let stop_slot = match stop {
            Bound::Stack => {
                let slot = self.declare_local(DataType::I32);
                self.store_local(slot);
                Some(slot)
            }
            _ => None,
        };

        match start {
            Bound::Const(v) => self.load_constant(v),
            Bound::Local(l) => self.load_local(l),
            Bound::Stack => {}
        }
        self.store_local(counter);

        let head = self.define_label();
        let next = self.define_label();
        let exit = self.define_label();
        let labels = LoopLabels {
            break_label: exit,
            continue_label: next,
            region_depth: self.region_depth(),
        };

        self.mark_label(head);
        self.load_local(counter);
        self.load_bound(stop, stop_slot);
        self.emit(if inclusive { OpCode::Le } else { OpCode::Lt });
        self.jump_if_false(exit);

        body(self, counter, &labels);

        self.mark_label(next);
        if inclusive {
            self.load_local(counter);
            self.load_bound(stop, stop_slot);
            self.emit(OpCode::Eq);
            self.jump_if_true(exit);
        }
        self.load_local(counter);
        self.load_constant(1);
        self.emit(OpCode::Add);
        self.store_local(counter);
        self.jump(head);
        self.mark_label(exit);

        counter
    }

    fn load_bound(&mut self, bound: Bound, spilled: Option<Local>) {
        match (bound, spilled) {
            (Bound::Const(v), _) => self.load_constant(v),
            (Bound::Local(l), _) => self.load_local(l),
            (Bound::Stack, Some(slot)) => self.load_local(slot),
            (Bound::Stack, None) => {}
        }
    }

    /// Iterate a sequence through its enumerator.
    ///
    /// `load_sequence` pushes the sequence instance. The enumerator class is
    /// resolved through `probe`; if it has a `Dispose` method the loop is
    /// wrapped in a finally region that releases the enumerator, otherwise
    /// no region is emitted.
    ///
    /// `body` receives the local holding the current element.
    pub fn foreach(
        &mut self,
        probe: &(impl CapabilityProbe + ?Sized),
        sequence_class: TypeHash,
        element: DataType,
        load_sequence: impl FnOnce(&mut Self),
        body: impl FnOnce(&mut Self, Local, &LoopLabels),
    ) {
        let Some(enumerator_class) = probe.enumerator_class(sequence_class) else {
            self.fail(BuildError::UnknownType {
                hash: sequence_class,
            });
            return;
        };
        let disposable = probe.is_disposable(enumerator_class);

        let enumerator = self.declare_local(DataType::Object(enumerator_class));
        let current = self.declare_local(element);

        load_sequence(self);
        self.call_method(GET_ENUMERATOR, 0);
        self.store_local(enumerator);

        let iterate = move |e: &mut Self| {
            e.while_loop(
                |e| {
                    e.load_local(enumerator);
                    e.call_method("MoveNext", 0);
                },
                |e, labels| {
                    e.load_local(enumerator);
                    e.call_method("get_Current", 0);
                    e.store_local(current);
                    body(e, current, labels);
                },
            );
        };

        if disposable {
            self.try_finally(
                |e, _| iterate(e),
                |e| {
                    e.load_local(enumerator);
                    e.is_null();
                    e.not();
                    e.if_then(|e| {
                        e.load_local(enumerator);
                        e.call_method(DISPOSE, 0);
                    });
                },
            );
        } else {
            iterate(self);
        }
    }
}
