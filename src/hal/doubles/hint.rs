use crate::hal::hint::BootHint;

#[derive(Copy, Clone, Debug, Default)]
pub struct FakeHint {
    pub image_start: Option<u32>,
    pub itoc_offset: Option<u32>,
}

impl BootHint for FakeHint {
    fn image_start(&mut self) -> Option<u32> { self.image_start }
    fn itoc_offset(&mut self) -> Option<u32> { self.itoc_offset }
}
