//! UxROM (mapper 2): switchable 16KB bank at $8000, last bank fixed at $C000.

use crate::core::cartridge::mapper::nes::{ChrStore, PRG_BANK_16K};
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::cartridge::Mirroring;
use crate::core::state::StateContainer;

pub struct UxromMapper<'r> {
    prg: &'r [u8],
    chr: ChrStore<'r>,
    prg_bank: usize,
    num_banks: usize,
    mirroring: Mirroring,
}

impl<'r> UxromMapper<'r> {
    pub fn new(prg: &'r [u8], chr: Option<&'r [u8]>, mirroring: Mirroring) -> Self {
        Self {
            prg,
            chr: ChrStore::from_cartridge(chr),
            prg_bank: 0,
            num_banks: (prg.len() / PRG_BANK_16K).max(1),
            mirroring,
        }
    }
}

impl<'r> CartridgeMapper for UxromMapper<'r> {
    fn reset(&mut self) {
        self.prg_bank = 0;
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        if self.prg.is_empty() {
            return 0xFF;
        }
        match address {
            0x8000..=0xBFFF => {
                let offset = address as usize - 0x8000;
                self.prg[(self.prg_bank * PRG_BANK_16K + offset) % self.prg.len()]
            }
            0xC000..=0xFFFF => {
                // Fixed last bank
                let offset = address as usize - 0xC000;
                let base = (self.num_banks - 1) * PRG_BANK_16K;
                self.prg[(base + offset) % self.prg.len()]
            }
            _ => 0xFF,
        }
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        if address >= 0x8000 {
            self.prg_bank = value as usize & (self.num_banks - 1);
        }
    }

    fn ppu_read(&mut self, address: u32) -> u8 {
        self.chr.read(address as usize)
    }

    fn ppu_write(&mut self, address: u32, value: u8) {
        self.chr.write(address as usize, value);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn num_banks(&self) -> usize {
        self.num_banks
    }

    fn bank_size(&self) -> usize {
        PRG_BANK_16K
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Uxrom
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
        state.register_field("mapper_current_banks", &[self.prg_bank as u8]);
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
        self.prg_bank = bank[0] as usize & (self.num_banks - 1);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_prg(banks: usize) -> Vec<u8> {
        let mut prg = vec![0u8; banks * PRG_BANK_16K];
        for (i, chunk) in prg.chunks_mut(PRG_BANK_16K).enumerate() {
            chunk.fill(i as u8);
        }
        prg
    }

    #[test]
    fn test_last_bank_fixed_at_c000() {
        let prg = make_prg(8);
        let mut mapper = UxromMapper::new(&prg, None, Mirroring::Vertical);
        assert_eq!(mapper.cpu_read(0xC000), 7);
        mapper.cpu_write(0x8000, 3);
        assert_eq!(mapper.cpu_read(0x8000), 3);
        assert_eq!(mapper.cpu_read(0xC000), 7);
    }

    #[test]
    fn test_repeated_selection_is_idempotent() {
        let prg = make_prg(4);
        let mut mapper = UxromMapper::new(&prg, None, Mirroring::Vertical);
        mapper.cpu_write(0x8000, 2);
        let first = mapper.cpu_read(0x8000);
        mapper.cpu_write(0x8000, 2);
        assert_eq!(mapper.cpu_read(0x8000), first);
    }

    #[test]
    fn test_bank_number_wraps_with_mask() {
        let prg = make_prg(4);
        let mut mapper = UxromMapper::new(&prg, None, Mirroring::Vertical);
        // Bank 6 on a 4-bank ROM masks down to bank 2
        mapper.cpu_write(0x8000, 6);
        assert_eq!(mapper.cpu_read(0x8000), 2);
    }
}
