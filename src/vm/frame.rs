//! Call frame and protected-region control transfer.

use std::sync::Arc;

use typeforge_compiler::CompiledMethod;
use typeforge_compiler::bytecode::Constant;
use typeforge_core::TypeHash;

use crate::error::Fault;
use crate::value::Value;

/// Why a finally body is running.
enum Exit {
    /// Leaving toward `target`; `rest` are the outer finally regions still to
    /// run, innermost first.
    Leave { target: u32, rest: Vec<usize> },
    /// Unwinding a fault.
    Unwind(Fault),
}

struct PendingFinally {
    region: usize,
    exit: Exit,
}

/// One activation of a bytecode method.
pub(crate) struct Frame<'m> {
    method: &'m CompiledMethod,
    ip: usize,
    args: Vec<Value>,
    locals: Vec<Value>,
    stack: Vec<Value>,
    pending: Vec<PendingFinally>,
    stack_limit: usize,
}

impl<'m> Frame<'m> {
    pub fn new(method: &'m CompiledMethod, args: Vec<Value>, stack_limit: usize) -> Self {
        Self {
            method,
            ip: 0,
            args,
            locals: method.locals().iter().map(Value::default_for).collect(),
            stack: Vec::new(),
            pending: Vec::new(),
            stack_limit,
        }
    }

    pub fn method(&self) -> &'m CompiledMethod {
        self.method
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Readable name of a member this method calls, falling back to its key.
    pub fn member_name(&self, key: TypeHash) -> String {
        self.method
            .member_name(key)
            .map_or_else(|| key.to_string(), str::to_string)
    }

    pub fn invalid(&self, offset: usize, detail: impl Into<String>) -> Fault {
        Fault::InvalidBytecode {
            method: self.method.name().to_string(),
            offset,
            detail: detail.into(),
        }
    }

    // ==========================================================================
    // Operand stack
    // ==========================================================================

    pub fn push(&mut self, value: Value) -> Result<(), Fault> {
        if self.stack.len() >= self.stack_limit {
            return Err(Fault::StackOverflow {
                method: self.method.name().to_string(),
                limit: self.stack_limit,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value, Fault> {
        self.stack.pop().ok_or_else(|| Fault::StackUnderflow {
            method: self.method.name().to_string(),
        })
    }

    /// Pop `count` values, returned in push order.
    pub fn pop_many(&mut self, count: usize) -> Result<Vec<Value>, Fault> {
        if self.stack.len() < count {
            return Err(Fault::StackUnderflow {
                method: self.method.name().to_string(),
            });
        }
        Ok(self.stack.split_off(self.stack.len() - count))
    }

    // ==========================================================================
    // Locals and arguments
    // ==========================================================================

    pub fn arg(&self, index: u8) -> Option<Value> {
        self.args.get(usize::from(index)).cloned()
    }

    pub fn local(&self, index: u16) -> Option<Value> {
        self.locals.get(usize::from(index)).cloned()
    }

    pub fn set_local(&mut self, index: u16, value: Value) -> bool {
        match self.locals.get_mut(usize::from(index)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    // ==========================================================================
    // Operand decoding
    // ==========================================================================

    fn truncated(&self) -> Fault {
        self.invalid(self.ip, "truncated instruction")
    }

    pub fn read_u8(&mut self) -> Result<u8, Fault> {
        let value = self.method.chunk().read_byte(self.ip);
        let value = value.ok_or_else(|| self.truncated())?;
        self.ip += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, Fault> {
        let value = self.method.chunk().read_u16(self.ip);
        let value = value.ok_or_else(|| self.truncated())?;
        self.ip += 2;
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32, Fault> {
        let value = self.method.chunk().read_u32(self.ip);
        let value = value.ok_or_else(|| self.truncated())?;
        self.ip += 4;
        Ok(value)
    }

    pub fn read_u64(&mut self) -> Result<u64, Fault> {
        let value = self.method.chunk().read_u64(self.ip);
        let value = value.ok_or_else(|| self.truncated())?;
        self.ip += 8;
        Ok(value)
    }

    /// Read a constant-pool index and resolve it to a hash.
    pub fn read_hash(&mut self) -> Result<TypeHash, Fault> {
        let at = self.ip;
        let index = self.read_u16()?;
        self.method
            .constant(index)
            .and_then(Constant::as_hash)
            .ok_or_else(|| self.invalid(at, format!("constant {index} is not a hash")))
    }

    /// Read a constant-pool index and resolve it to a string.
    pub fn read_str(&mut self) -> Result<&'m str, Fault> {
        let at = self.ip;
        let index = self.read_u16()?;
        let method = self.method;
        method
            .constant(index)
            .and_then(Constant::as_str)
            .ok_or_else(|| self.invalid(at, format!("constant {index} is not a string")))
    }

    pub fn jump(&mut self, target: u32) -> Result<(), Fault> {
        let target = target as usize;
        if target > self.method.chunk().len() {
            return Err(self.invalid(self.ip, format!("jump target {target} is out of range")));
        }
        self.ip = target;
        Ok(())
    }

    // ==========================================================================
    // Protected regions
    // ==========================================================================

    /// Transfer control for a fault raised by the instruction at `at`.
    ///
    /// Walks from the innermost region containing `at` outward. A matching
    /// catch clause of a region whose try body contains `at` takes a script
    /// exception; otherwise the region's finally body runs first and the walk
    /// resumes from its parent at `END_FINALLY`. Runtime faults are never
    /// caught but still run every finally body on the way out. A fault
    /// escaping a finally body abandons that body's pending exit. Returns the
    /// fault when no region handles it.
    pub fn unwind(&mut self, fault: Fault, at: usize) -> Result<(), Fault> {
        let method = self.method;
        let Ok(ip) = u32::try_from(at) else {
            return Err(fault);
        };
        let regions = method.regions();
        let mut current = method.innermost_region(ip);

        while let Some(index) = current {
            let region = &regions[index];
            if let Fault::Thrown(exception) = &fault {
                let handler = region
                    .in_try(ip)
                    .then(|| region.find_catch(exception.hash()))
                    .flatten();
                if let Some(handler) = handler {
                    self.stack.clear();
                    self.set_local(handler.local, Value::Exception(Arc::clone(exception)));
                    self.ip = handler.handler.start as usize;
                    return Ok(());
                }
            }
            if region.in_finally(ip) {
                self.pending.retain(|p| p.region != index);
            } else if let Some(finally) = &region.finally {
                self.stack.clear();
                self.pending.push(PendingFinally {
                    region: index,
                    exit: Exit::Unwind(fault),
                });
                self.ip = finally.start as usize;
                return Ok(());
            }
            current = region.parent;
        }
        Err(fault)
    }

    /// `LEAVE target` at `at`: run the finally bodies of every region being
    /// exited, innermost first, then continue at `target`.
    pub fn leave(&mut self, at: usize, target: u32) -> Result<(), Fault> {
        let method = self.method;
        let ip = u32::try_from(at).map_err(|_| self.invalid(at, "offset out of range"))?;
        let regions = method.regions();

        let mut exited = Vec::new();
        let mut current = method.innermost_region(ip);
        while let Some(index) = current {
            let region = &regions[index];
            if region.contains(target) {
                break;
            }
            if region.finally.is_some() && !region.in_finally(ip) {
                exited.push(index);
            }
            current = region.parent;
        }

        self.stack.clear();
        self.continue_leave(target, exited)
    }

    fn continue_leave(&mut self, target: u32, mut exited: Vec<usize>) -> Result<(), Fault> {
        if exited.is_empty() {
            return self.jump(target);
        }
        let index = exited.remove(0);
        let Some(finally) = self.method.regions()[index].finally.clone() else {
            return self.continue_leave(target, exited);
        };
        self.pending.push(PendingFinally {
            region: index,
            exit: Exit::Leave {
                target,
                rest: exited,
            },
        });
        self.ip = finally.start as usize;
        Ok(())
    }

    /// `END_FINALLY`: resume whatever exit started the finally body. With no
    /// pending exit, execution falls through.
    pub fn end_finally(&mut self) -> Result<(), Fault> {
        match self.pending.pop() {
            None => Ok(()),
            Some(PendingFinally {
                exit: Exit::Leave { target, rest },
                ..
            }) => self.continue_leave(target, rest),
            // Re-raised from inside the finally body, so the walk skips the
            // region that just ran and resumes at its parent.
            Some(PendingFinally {
                exit: Exit::Unwind(fault),
                ..
            }) => Err(fault),
        }
    }
}
