//! Protected region bookkeeping while a body is being emitted.

use typeforge_core::ExceptionKind;

use super::{Label, Local};
use crate::method::{CatchHandler, ExceptionRegion};

/// Section of a region currently receiving code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Try,
    Catch,
    Finally,
}

#[derive(Debug)]
struct PendingCatch {
    kind: ExceptionKind,
    start: u32,
    end: Option<u32>,
    local: Local,
}

#[derive(Debug)]
struct PendingRegion {
    try_start: u32,
    try_end: Option<u32>,
    catches: Vec<PendingCatch>,
    finally: Option<(u32, Option<u32>)>,
    section: Section,
    end_label: Label,
    parent: Option<usize>,
}

impl PendingRegion {
    /// Close whichever section is open at `offset`.
    fn close_section(&mut self, offset: u32) {
        match self.section {
            Section::Try => self.try_end = Some(offset),
            Section::Catch => {
                if let Some(last) = self.catches.last_mut() {
                    last.end = Some(offset);
                }
            }
            Section::Finally => {
                if let Some((_, end)) = self.finally.as_mut() {
                    *end = Some(offset);
                }
            }
        }
    }
}

/// Structural violation while opening or closing sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Unbalanced;

#[derive(Debug, Default)]
pub(super) struct RegionTable {
    regions: Vec<PendingRegion>,
    open: Vec<usize>,
}

impl RegionTable {
    pub fn begin(&mut self, offset: u32, end_label: Label) -> usize {
        let index = self.regions.len();
        self.regions.push(PendingRegion {
            try_start: offset,
            try_end: None,
            catches: Vec::new(),
            finally: None,
            section: Section::Try,
            end_label,
            parent: self.open.last().copied(),
        });
        self.open.push(index);
        index
    }

    fn innermost(&mut self, index: usize) -> Result<&mut PendingRegion, Unbalanced> {
        if self.open.last() != Some(&index) {
            return Err(Unbalanced);
        }
        self.regions.get_mut(index).ok_or(Unbalanced)
    }

    pub fn begin_catch(
        &mut self,
        index: usize,
        offset: u32,
        kind: ExceptionKind,
        local: Local,
    ) -> Result<(), Unbalanced> {
        let region = self.innermost(index)?;
        if region.section == Section::Finally {
            return Err(Unbalanced);
        }
        region.close_section(offset);
        region.catches.push(PendingCatch {
            kind,
            start: offset,
            end: None,
            local,
        });
        region.section = Section::Catch;
        Ok(())
    }

    pub fn begin_finally(&mut self, index: usize, offset: u32) -> Result<(), Unbalanced> {
        let region = self.innermost(index)?;
        if region.section == Section::Finally {
            return Err(Unbalanced);
        }
        region.close_section(offset);
        region.finally = Some((offset, None));
        region.section = Section::Finally;
        Ok(())
    }

    /// Close the innermost region. A region needs at least one handler.
    pub fn end(&mut self, index: usize, offset: u32) -> Result<Label, Unbalanced> {
        let region = self.innermost(index)?;
        if region.section == Section::Try {
            return Err(Unbalanced);
        }
        region.close_section(offset);
        let label = region.end_label;
        self.open.pop();
        Ok(label)
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn is_balanced(&self) -> bool {
        self.open.is_empty()
    }

    /// Resolve into the final table, looking up each region's end label.
    pub fn resolve(
        self,
        position: impl Fn(Label) -> Option<u32>,
    ) -> Result<Vec<ExceptionRegion>, Unbalanced> {
        self.regions
            .into_iter()
            .map(|r| {
                let end = position(r.end_label).ok_or(Unbalanced)?;
                let catches = r
                    .catches
                    .into_iter()
                    .map(|c| {
                        Ok(CatchHandler {
                            kind: c.kind,
                            handler: c.start..c.end.ok_or(Unbalanced)?,
                            local: c.local.index(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let finally = match r.finally {
                    Some((start, Some(stop))) => Some(start..stop),
                    Some((_, None)) => return Err(Unbalanced),
                    None => None,
                };
                Ok(ExceptionRegion {
                    try_range: r.try_start..r.try_end.ok_or(Unbalanced)?,
                    catches,
                    finally,
                    end,
                    parent: r.parent,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_contiguous() {
        let mut table = RegionTable::default();
        let r = table.begin(0, Label(0));
        table
            .begin_catch(r, 5, ExceptionKind::root(), Local(0))
            .unwrap();
        table.begin_finally(r, 9).unwrap();
        assert_eq!(table.end(r, 12), Ok(Label(0)));
        assert!(table.is_balanced());

        let regions = table.resolve(|_| Some(12)).unwrap();
        assert_eq!(regions[0].try_range, 0..5);
        assert_eq!(regions[0].catches[0].handler, 5..9);
        assert_eq!(regions[0].finally, Some(9..12));
        assert_eq!(regions[0].end, 12);
    }

    #[test]
    fn nested_regions_record_parent() {
        let mut table = RegionTable::default();
        let outer = table.begin(0, Label(0));
        let inner = table.begin(2, Label(1));
        assert_eq!(table.depth(), 2);

        // Outer cannot be closed while inner is open.
        assert_eq!(table.begin_finally(outer, 3), Err(Unbalanced));

        table.begin_finally(inner, 4).unwrap();
        table.end(inner, 6).unwrap();
        table.begin_finally(outer, 8).unwrap();
        table.end(outer, 10).unwrap();

        let regions = table.resolve(|l| Some(if l == Label(0) { 10 } else { 6 })).unwrap();
        assert_eq!(regions[1].parent, Some(0));
        assert_eq!(regions[0].parent, None);
    }

    #[test]
    fn try_without_handler_is_unbalanced() {
        let mut table = RegionTable::default();
        let r = table.begin(0, Label(0));
        assert_eq!(table.end(r, 3), Err(Unbalanced));
    }

    #[test]
    fn catch_after_finally_is_unbalanced() {
        let mut table = RegionTable::default();
        let r = table.begin(0, Label(0));
        table.begin_finally(r, 2).unwrap();
        assert_eq!(
            table.begin_catch(r, 4, ExceptionKind::root(), Local(0)),
            Err(Unbalanced)
        );
    }
}
