//! Color Dreams (mapper 11): fixed 32KB PRG, switchable 8KB CHR bank.

use crate::core::cartridge::mapper::nes::{ChrStore, CHR_SIZE_8K};
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::cartridge::Mirroring;
use crate::core::state::StateContainer;

const PRG_BANK_32K: usize = 32 * 1024;

pub struct ColorDreamsMapper<'r> {
    prg: &'r [u8],
    chr: ChrStore<'r>,
    chr_bank: usize,
    mirroring: Mirroring,
}

impl<'r> ColorDreamsMapper<'r> {
    pub fn new(prg: &'r [u8], chr: Option<&'r [u8]>, mirroring: Mirroring) -> Self {
        Self {
            prg,
            chr: ChrStore::from_cartridge(chr),
            chr_bank: 0,
            mirroring,
        }
    }
}

impl<'r> CartridgeMapper for ColorDreamsMapper<'r> {
    fn reset(&mut self) {
        self.chr_bank = 0;
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        if address < 0x8000 || self.prg.is_empty() {
            return 0xFF;
        }
        let offset = address as usize - 0x8000;
        self.prg[offset % self.prg.len()]
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        if address >= 0x8000 {
            self.chr_bank = value as usize & 0x0F;
        }
    }

    fn ppu_read(&mut self, address: u32) -> u8 {
        self.chr.read(self.chr_bank * CHR_SIZE_8K + address as usize)
    }

    fn ppu_write(&mut self, address: u32, value: u8) {
        self.chr.write(self.chr_bank * CHR_SIZE_8K + address as usize, value);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn num_banks(&self) -> usize {
        (self.prg.len() / PRG_BANK_32K).max(1)
    }

    fn bank_size(&self) -> usize {
        PRG_BANK_32K
    }

    fn kind(&self) -> MapperKind {
        MapperKind::ColorDreams
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
        state.register_field("mapper_current_banks", &[self.chr_bank as u8]);
    }

    fn load_state(&mut self, state: &dyn StateContainer) -> bool {
        let mut kind = [0u8; 1];
        if !state.read_field("mapper_type", &mut kind) || kind[0] != self.kind() as u8 {
            return false;
        }
        let mut bank = [0u8; 1];
        if !state.read_field("mapper_current_banks", &mut bank) {
            return false;
        }
        self.chr_bank = bank[0] as usize & 0x0F;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chr_bank_switch_leaves_prg_fixed() {
        let mut prg = vec![0x42u8; PRG_BANK_32K];
        prg[0] = 0x42;
        let mut chr = vec![0u8; 4 * CHR_SIZE_8K];
        for (i, chunk) in chr.chunks_mut(CHR_SIZE_8K).enumerate() {
            chunk.fill(i as u8);
        }
        let mut mapper = ColorDreamsMapper::new(&prg, Some(&chr), Mirroring::Vertical);
        mapper.cpu_write(0x8000, 0x03);
        assert_eq!(mapper.ppu_read(0), 3);
        assert_eq!(mapper.cpu_read(0x8000), 0x42);
    }
}
