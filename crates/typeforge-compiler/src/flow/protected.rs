//! Protected regions: try / catch / finally.
//!
//! Layout of one region:
//!
//! ```text
//! try:     <body>        LEAVE end
//! catch K: <handler>     LEAVE end      (zero or more)
//! finally: <body>        END_FINALLY    (optional)
//! end:
//! ```
//!
//! Every exit from the try body or a handler goes through `LEAVE`, so the
//! interpreter runs the finally body exactly once on normal exit, on a
//! structured early exit and while unwinding an exception. The evaluation
//! stack must be empty when a region is entered.

use typeforge_core::ExceptionKind;

use crate::emit::{BytecodeEmitter, Local, RegionHandle};

/// A region under construction.
///
/// Returned by [`BytecodeEmitter::protected`] after the try body is emitted;
/// add handlers, then call [`Protected::end`].
#[must_use = "a protected region must be closed with `end()`"]
pub struct Protected<'e> {
    emitter: &'e mut BytecodeEmitter,
    region: RegionHandle,
}

impl<'e> Protected<'e> {
    /// Add a catch clause. `handler` receives the local holding the caught
    /// exception.
    pub fn catch(
        self,
        kind: ExceptionKind,
        handler: impl FnOnce(&mut BytecodeEmitter, Local),
    ) -> Self {
        let local = self.emitter.begin_catch(self.region, kind);
        handler(&mut *self.emitter, local);
        self.emitter.leave(self.region);
        self
    }

    /// Add the finally body.
    pub fn finally(self, body: impl FnOnce(&mut BytecodeEmitter)) -> Self {
        self.emitter.begin_finally(self.region);
        body(&mut *self.emitter);
        self.emitter.end_finally();
        self
    }

    /// Close the region.
    pub fn end(self) -> RegionHandle {
        self.emitter.end_region(self.region);
        self.region
    }
}

impl BytecodeEmitter {
    /// Open a region and emit its try body.
    ///
    /// The body receives the region handle, usable with
    /// [`BytecodeEmitter::leave`] for an early exit.
    pub fn protected(&mut self, body: impl FnOnce(&mut Self, RegionHandle)) -> Protected<'_> {
        let region = self.begin_region();
        body(self, region);
        self.leave(region);
        Protected {
            emitter: self,
            region,
        }
    }

    /// `try { body } catch (kind) { handler }`
    pub fn try_catch(
        &mut self,
        body: impl FnOnce(&mut Self, RegionHandle),
        kind: ExceptionKind,
        handler: impl FnOnce(&mut Self, Local),
    ) -> RegionHandle {
        self.protected(body).catch(kind, handler).end()
    }

    /// `try { body } finally { finally }`
    pub fn try_finally(
        &mut self,
        body: impl FnOnce(&mut Self, RegionHandle),
        finally: impl FnOnce(&mut Self),
    ) -> RegionHandle {
        self.protected(body).finally(finally).end()
    }

    /// `try { body } catch (kind) { handler } finally { finally }`
    pub fn try_catch_finally(
        &mut self,
        body: impl FnOnce(&mut Self, RegionHandle),
        kind: ExceptionKind,
        handler: impl FnOnce(&mut Self, Local),
        finally: impl FnOnce(&mut Self),
    ) -> RegionHandle {
        self.protected(body)
            .catch(kind, handler)
            .finally(finally)
            .end()
    }
}

#[cfg(test)]
mod tests {
    use typeforge_core::kinds::{InvalidOperation, NullReference};
    use typeforge_core::{BuildError, DataType};

    use super::*;
    use crate::bytecode::OpCode;

    #[test]
    fn try_catch_layout() {
        let mut e = BytecodeEmitter::new("m", 1);
        e.try_catch(
            |e, _| e.throw_new::<InvalidOperation>("boom"),
            ExceptionKind::of::<InvalidOperation>(),
            |e, exc| {
                e.load_local(exc);
                e.pop();
            },
        );
        e.ret_void();

        let method = e.finish().unwrap();
        method.chunk().assert_opcodes(&[
            OpCode::PushString,
            OpCode::NewException,
            OpCode::Throw,
            OpCode::Leave,
            OpCode::GetLocal,
            OpCode::Pop,
            OpCode::Leave,
            OpCode::ReturnVoid,
        ]);

        let region = &method.regions()[0];
        assert_eq!(region.catches.len(), 1);
        assert!(region.finally.is_none());
        assert_eq!(method.locals(), &[DataType::Exception]);
    }

    #[test]
    fn multiple_catches_and_finally() {
        let mut e = BytecodeEmitter::new("m", 1);
        e.protected(|_, _| {})
            .catch(ExceptionKind::of::<NullReference>(), |_, _| {})
            .catch(ExceptionKind::root(), |_, _| {})
            .finally(|e| {
                e.load_constant(1);
                e.pop();
            })
            .end();
        e.ret_void();

        let method = e.finish().unwrap();
        let region = &method.regions()[0];
        assert_eq!(region.catches.len(), 2);
        assert!(region.catches[0].kind.catches(ExceptionKind::of::<NullReference>().hash()));
        assert!(region.catches[1].kind.is_root());
        assert_eq!(method.chunk().count(OpCode::Leave), 3);
        assert_eq!(method.chunk().count(OpCode::EndFinally), 1);
    }

    #[test]
    fn nested_regions_link_to_parent() {
        let mut e = BytecodeEmitter::new("m", 1);
        e.try_finally(
            |e, outer| {
                e.try_finally(|e, _| e.leave(outer), |_| {});
            },
            |_| {},
        );
        e.ret_void();

        let method = e.finish().unwrap();
        let regions = method.regions();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].parent, None);
        assert_eq!(regions[1].parent, Some(0));
        // Inner leave targets the outer end.
        assert!(regions[0].contains(regions[1].end - 1));
    }

    #[test]
    fn unclosed_builder_is_unbalanced() {
        let mut e = BytecodeEmitter::new("m", 1);
        let _ = e.protected(|_, _| {});
        e.ret_void();

        assert!(matches!(
            e.finish(),
            Err(BuildError::UnbalancedRegion { .. })
        ));
    }

    #[test]
    fn region_without_handlers_is_unbalanced() {
        let mut e = BytecodeEmitter::new("m", 1);
        e.protected(|_, _| {}).end();
        e.ret_void();

        assert!(matches!(
            e.finish(),
            Err(BuildError::UnbalancedRegion { .. })
        ));
    }
}
