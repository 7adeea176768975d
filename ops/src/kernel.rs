/// Width of one SPIR-V instruction word, in bytes.
pub const INSTRUCTION_WORD_SIZE: usize = std::mem::size_of::<u32>();

/// A compiled compute kernel embedded in the binary at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelImage {
    name:  &'static str,
    bytes: &'static [u8],
}

impl KernelImage {
    pub const fn new(name: &'static str, bytes: &'static [u8]) -> Self {
        Self { name, bytes }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn bytes(&self) -> &'static [u8] {
        self.bytes
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Decode the image into native-endian instruction words.
    ///
    /// # Panics
    ///
    /// If the image length is not a whole number of instruction words. That
    /// can only come from a broken build, so it is not reported as an error.
    pub fn to_words(&self) -> Vec<u32> {
        assert!(
            self.bytes.len() % INSTRUCTION_WORD_SIZE == 0,
            "kernel image '{}' is {} bytes, not a multiple of the {}-byte instruction word",
            self.name,
            self.bytes.len(),
            INSTRUCTION_WORD_SIZE,
        );
        self.bytes
            .chunks_exact(INSTRUCTION_WORD_SIZE)
            .map(|w| u32::from_ne_bytes([w[0], w[1], w[2], w[3]]))
            .collect()
    }
}
