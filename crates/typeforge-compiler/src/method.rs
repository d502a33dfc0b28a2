//! Finalized method bodies.

use std::ops::Range;

use rustc_hash::FxHashMap;
use typeforge_core::{DataType, ExceptionKind, TypeHash};

use crate::bytecode::{BytecodeChunk, Constant, ConstantPool};

/// One catch clause of a protected region.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchHandler {
    /// Kind this clause handles.
    pub kind: ExceptionKind,
    /// Handler body.
    pub handler: Range<u32>,
    /// Local that receives the caught exception.
    pub local: u16,
}

/// A resolved protected region.
///
/// Sections are laid out contiguously: try body, catch handlers in
/// declaration order, then the optional finally body. `end` is the offset
/// just past the last section and is the target of a structured leave.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionRegion {
    pub try_range: Range<u32>,
    pub catches: Vec<CatchHandler>,
    pub finally: Option<Range<u32>>,
    pub end: u32,
    /// Enclosing region, if nested.
    pub parent: Option<usize>,
}

impl ExceptionRegion {
    /// Whole region, try start to end.
    pub fn span(&self) -> Range<u32> {
        self.try_range.start..self.end
    }

    pub fn contains(&self, ip: u32) -> bool {
        self.span().contains(&ip)
    }

    pub fn in_try(&self, ip: u32) -> bool {
        self.try_range.contains(&ip)
    }

    pub fn in_finally(&self, ip: u32) -> bool {
        self.finally.as_ref().is_some_and(|f| f.contains(&ip))
    }

    /// First catch clause handling an exception with discriminator `thrown`.
    pub fn find_catch(&self, thrown: TypeHash) -> Option<&CatchHandler> {
        self.catches.iter().find(|c| c.kind.catches(thrown))
    }
}

/// An immutable, fully resolved method body.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMethod {
    name: String,
    arity: u8,
    chunk: BytecodeChunk,
    constants: ConstantPool,
    locals: Vec<DataType>,
    regions: Vec<ExceptionRegion>,
    member_names: FxHashMap<TypeHash, String>,
}

impl CompiledMethod {
    pub(crate) fn new(
        name: String,
        arity: u8,
        chunk: BytecodeChunk,
        constants: ConstantPool,
        locals: Vec<DataType>,
        regions: Vec<ExceptionRegion>,
        member_names: FxHashMap<TypeHash, String>,
    ) -> Self {
        Self {
            name,
            arity,
            chunk,
            constants,
            locals,
            regions,
            member_names,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Argument count including the receiver.
    pub fn arity(&self) -> u8 {
        self.arity
    }

    pub fn chunk(&self) -> &BytecodeChunk {
        &self.chunk
    }

    pub fn constant(&self, index: u16) -> Option<&Constant> {
        self.constants.get(index as u32)
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    /// Declared local kinds, indexed by slot.
    pub fn locals(&self) -> &[DataType] {
        &self.locals
    }

    pub fn regions(&self) -> &[ExceptionRegion] {
        &self.regions
    }

    /// Name of a member this method calls by `key`, when it was emitted
    /// from a name.
    pub fn member_name(&self, key: TypeHash) -> Option<&str> {
        self.member_names.get(&key).map(String::as_str)
    }

    /// Innermost region whose span contains `ip`.
    ///
    /// Regions are recorded outermost first and siblings never overlap, so
    /// the last containing entry is the innermost.
    pub fn innermost_region(&self, ip: u32) -> Option<usize> {
        self.regions.iter().rposition(|r| r.contains(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(try_range: Range<u32>, end: u32, parent: Option<usize>) -> ExceptionRegion {
        ExceptionRegion {
            try_range,
            catches: Vec::new(),
            finally: None,
            end,
            parent,
        }
    }

    #[test]
    fn innermost_region_lookup() {
        let method = CompiledMethod::new(
            "m".into(),
            1,
            BytecodeChunk::new(),
            ConstantPool::new(),
            Vec::new(),
            vec![
                region(0..40, 60, None),
                region(5..10, 15, Some(0)),
                region(20..25, 30, Some(0)),
            ],
            FxHashMap::default(),
        );

        assert_eq!(method.innermost_region(2), Some(0));
        assert_eq!(method.innermost_region(7), Some(1));
        assert_eq!(method.innermost_region(27), Some(2));
        assert_eq!(method.innermost_region(59), Some(0));
        assert_eq!(method.innermost_region(60), None);
    }

    #[test]
    fn catch_lookup_uses_kind_matching() {
        let mut r = region(0..4, 10, None);
        r.catches.push(CatchHandler {
            kind: ExceptionKind::new("InvalidOperation"),
            handler: 4..7,
            local: 0,
        });
        r.catches.push(CatchHandler {
            kind: ExceptionKind::root(),
            handler: 7..10,
            local: 1,
        });

        let invalid = TypeHash::from_exception("InvalidOperation");
        let other = TypeHash::from_exception("NullReference");
        assert_eq!(r.find_catch(invalid).map(|c| c.local), Some(0));
        assert_eq!(r.find_catch(other).map(|c| c.local), Some(1));
        assert!(r.in_try(3));
        assert!(!r.in_try(4));
        assert!(!r.in_finally(8));
    }
}
