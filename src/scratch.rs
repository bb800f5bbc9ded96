/// Reusable read buffers for the register and sample paths.
///
/// Each buffer is zeroed when handed out so a failed or short read never
/// exposes bytes from the previous one.
#[derive(Debug, Default)]
pub(crate) struct Scratch {
    one: [u8; 1],
    three: [u8; 3],
}

impl Scratch {
    pub(crate) fn one_byte(&mut self) -> &mut [u8; 1] {
        self.one = [0; 1];
        &mut self.one
    }

    pub(crate) fn three_bytes(&mut self) -> &mut [u8; 3] {
        self.three = [0; 3];
        &mut self.three
    }
}
