//! NROM (mapper 0): no bank switching, 16KB PRG mirrored or 32KB direct.

use crate::core::cartridge::mapper::nes::{ChrStore, PRG_BANK_16K, PRG_RAM_SIZE};
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::cartridge::Mirroring;
use crate::core::state::StateContainer;

pub struct NromMapper<'r> {
    prg: &'r [u8],
    chr: ChrStore<'r>,
    prg_ram: Vec<u8>,
    mirroring: Mirroring,
}

impl<'r> NromMapper<'r> {
    pub fn new(prg: &'r [u8], chr: Option<&'r [u8]>, mirroring: Mirroring) -> Self {
        Self {
            prg,
            chr: ChrStore::from_cartridge(chr),
            prg_ram: vec![0; PRG_RAM_SIZE],
            mirroring,
        }
    }
}

impl<'r> CartridgeMapper for NromMapper<'r> {
    fn reset(&mut self) {}

    fn cpu_read(&mut self, address: u32) -> u8 {
        match address {
            0x6000..=0x7FFF => self.prg_ram[(address as usize - 0x6000) % PRG_RAM_SIZE],
            0x8000..=0xFFFF => {
                if self.prg.is_empty() {
                    return 0xFF;
                }
                // 16KB PRG mirrors into both halves, 32KB maps directly
                let offset = address as usize - 0x8000;
                self.prg[offset % self.prg.len()]
            }
            _ => 0xFF,
        }
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        if let 0x6000..=0x7FFF = address {
            self.prg_ram[(address as usize - 0x6000) % PRG_RAM_SIZE] = value;
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
        (self.prg.len() / PRG_BANK_16K).max(1)
    }

    fn bank_size(&self) -> usize {
        PRG_BANK_16K
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Nrom
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
        state.register_field("mapper_prg_ram", &self.prg_ram);
    }

    fn load_state(&mut self, state: &dyn StateContainer) -> bool {
        let mut kind = [0u8; 1];
        if !state.read_field("mapper_type", &mut kind) || kind[0] != self.kind() as u8 {
            return false;
        }
        let mut ram = vec![0u8; PRG_RAM_SIZE];
        if !state.read_field("mapper_prg_ram", &mut ram) {
            return false;
        }
        self.prg_ram = ram;
        true
    }
}
