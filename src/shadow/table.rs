use crate::shadow::{
    error::ShadowError,
    helpers::{WORD, word_span},
};

/// Byte image of a register block plus a bitmap of words that hold a
/// driver-known value (written or refreshed since creation).
pub(crate) struct ShadowTable<const TS: usize, const WC: usize>
where
    bitmaps::BitsImpl<WC>: bitmaps::Bits,
{
    bytes: [u8; TS],
    mirrored: bitmaps::Bitmap<WC>,
}

impl<const TS: usize, const WC: usize> ShadowTable<TS, WC>
where
    bitmaps::BitsImpl<WC>: bitmaps::Bits,
{
    pub(crate) fn new() -> Self {
        debug_assert!(TS == WC * WORD, "Total size must match word count x 4");

        Self {
            bytes: [0; TS],
            mirrored: bitmaps::Bitmap::new(),
        }
    }

    pub(crate) fn load(&self, offset: u16) -> Result<u32, ShadowError> {
        let (start, _) = word_span(offset, TS)?;
        let mut word = [0u8; WORD];
        word.copy_from_slice(&self.bytes[start..start + WORD]);
        Ok(u32::from_le_bytes(word))
    }

    pub(crate) fn store(&mut self, offset: u16, value: u32) -> Result<(), ShadowError> {
        let (start, index) = word_span(offset, TS)?;
        self.bytes[start..start + WORD].copy_from_slice(&value.to_le_bytes());
        self.mirrored.set(index, true);
        Ok(())
    }

    pub(crate) fn is_mirrored(&self, offset: u16) -> Result<bool, ShadowError> {
        let (_, index) = word_span(offset, TS)?;
        Ok(self.mirrored.get(index))
    }

    pub(crate) fn mirrored_count(&self) -> usize {
        self.mirrored.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 16-byte table, 4 words
    type TestTable = ShadowTable<16, 4>;

    #[test]
    fn new_table_is_zeroed_and_unmirrored() {
        let table: TestTable = ShadowTable::new();
        for offset in (0..16).step_by(4) {
            assert_eq!(table.load(offset).unwrap(), 0);
            assert!(!table.is_mirrored(offset).unwrap());
        }
        assert_eq!(table.mirrored_count(), 0);
    }

    #[test]
    fn store_marks_only_its_word() {
        let mut table: TestTable = ShadowTable::new();
        table.store(4, 0xDEAD_BEEF).unwrap();

        assert_eq!(table.load(4).unwrap(), 0xDEAD_BEEF);
        assert!(table.is_mirrored(4).unwrap());
        assert!(!table.is_mirrored(0).unwrap());
        assert!(!table.is_mirrored(8).unwrap());
        assert_eq!(table.mirrored_count(), 1);
    }

    #[test]
    fn store_overwrites_previous_value() {
        let mut table: TestTable = ShadowTable::new();
        table.store(12, 1).unwrap();
        table.store(12, 2).unwrap();

        assert_eq!(table.load(12).unwrap(), 2);
        assert_eq!(table.mirrored_count(), 1);
    }

    #[test]
    fn access_errors() {
        let mut table: TestTable = ShadowTable::new();

        assert_eq!(table.load(16), Err(ShadowError::OutOfBounds));
        assert_eq!(table.store(16, 0), Err(ShadowError::OutOfBounds));
        assert_eq!(table.load(2), Err(ShadowError::Misaligned));
        assert_eq!(table.store(6, 0), Err(ShadowError::Misaligned));
        assert_eq!(table.is_mirrored(3), Err(ShadowError::Misaligned));
    }
}
