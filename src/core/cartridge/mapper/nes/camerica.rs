//! Camerica/Codemasters (mapper 71): 16KB bank via writes to $C000-$FFFF,
//! last bank fixed at $C000.

use crate::core::cartridge::mapper::nes::{ChrStore, PRG_BANK_16K};
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::cartridge::Mirroring;
use crate::core::state::StateContainer;

pub struct CamericaMapper<'r> {
    prg: &'r [u8],
    chr: ChrStore<'r>,
    prg_bank: usize,
    num_banks: usize,
    mirroring: Mirroring,
}

impl<'r> CamericaMapper<'r> {
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

impl<'r> CartridgeMapper for CamericaMapper<'r> {
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
                let offset = address as usize - 0xC000;
                let base = (self.num_banks - 1) * PRG_BANK_16K;
                self.prg[(base + offset) % self.prg.len()]
            }
            _ => 0xFF,
        }
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        // Bank register decodes only in the upper half
        if address >= 0xC000 {
            self.prg_bank = (value as usize & 0x0F) % self.num_banks;
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
        MapperKind::Camerica
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
        self.prg_bank = bank[0] as usize % self.num_banks;
        true
    }
}
