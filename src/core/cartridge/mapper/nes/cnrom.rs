//! CNROM (mapper 3): fixed PRG, switchable 8KB CHR bank.

use crate::core::cartridge::mapper::nes::{ChrStore, CHR_SIZE_8K, PRG_BANK_16K};
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::cartridge::Mirroring;
use crate::core::state::StateContainer;

pub struct CnromMapper<'r> {
    prg: &'r [u8],
    chr: ChrStore<'r>,
    chr_bank: usize,
    chr_bank_count: usize,
    mirroring: Mirroring,
}

impl<'r> CnromMapper<'r> {
    pub fn new(prg: &'r [u8], chr: Option<&'r [u8]>, mirroring: Mirroring) -> Self {
        let chr = ChrStore::from_cartridge(chr);
        let chr_bank_count = (chr.len() / CHR_SIZE_8K).max(1);
        Self {
            prg,
            chr,
            chr_bank: 0,
            chr_bank_count,
            mirroring,
        }
    }
}

impl<'r> CartridgeMapper for CnromMapper<'r> {
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
            self.chr_bank = (value as usize & 0x03) % self.chr_bank_count;
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
        (self.prg.len() / PRG_BANK_16K).max(1)
    }

    fn bank_size(&self) -> usize {
        PRG_BANK_16K
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Cnrom
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
        self.chr_bank = bank[0] as usize % self.chr_bank_count;
        true
    }
}
