//! Boot record left behind by the previous boot stage.

/// Location hints recorded by an earlier stage that already found the image.
///
/// Hints are only ever a shortcut: a stale or corrupted hint is detected by
/// checking the magic pattern at the hinted location, and discovery falls
/// back to scanning.
pub trait BootHint {
    /// Absolute flash address of the last known image start, if one was
    /// recorded and no error was flagged alongside it.
    fn image_start(&mut self) -> Option<u32>;

    /// Offset of the iTOC header relative to the image start, if recorded.
    fn itoc_offset(&mut self) -> Option<u32>;
}

/// Absence of any boot record.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoHint;

impl BootHint for NoHint {
    fn image_start(&mut self) -> Option<u32> { None }
    fn itoc_offset(&mut self) -> Option<u32> { None }
}
