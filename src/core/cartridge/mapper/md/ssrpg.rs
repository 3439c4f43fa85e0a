//! Sega RPG mapper (Phantasy Star, Shining Force): SRAM overlay with a
//! separate write-enable bit in the 0xA130F1 control register.

use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::memory::sram::BackupRam;
use crate::core::state::StateContainer;

const SRAM_START: u32 = 0x20_0000;
const SRAM_END: u32 = 0x20_FFFF;
const SRAM_SIZE: usize = 64 * 1024;
const BANK_CONTROL: u32 = 0xA1_30F1;

pub struct SsrpgMapper<'r> {
    rom: &'r [u8],
    sram: BackupRam,
}

impl<'r> SsrpgMapper<'r> {
    pub fn new(rom: &'r [u8]) -> Self {
        Self {
            rom,
            sram: BackupRam::new(SRAM_SIZE),
        }
    }

    pub fn sram(&self) -> &BackupRam {
        &self.sram
    }

    pub fn sram_mut(&mut self) -> &mut BackupRam {
        &mut self.sram
    }
}

impl<'r> CartridgeMapper for SsrpgMapper<'r> {
    fn reset(&mut self) {
        self.sram.set_enabled(false);
        self.sram.set_write_protect(true);
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        if (SRAM_START..=SRAM_END).contains(&address) && self.sram.is_enabled() {
            return self.sram.read_byte((address - SRAM_START) as usize);
        }
        if self.rom.is_empty() {
            return 0xFF;
        }
        self.rom[address as usize % self.rom.len()]
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        if address == BANK_CONTROL {
            // Bit 0: SRAM visible, bit 1: SRAM writable
            self.sram.set_enabled(value & 0x01 != 0);
            self.sram.set_write_protect(value & 0x02 == 0);
            return;
        }
        if (SRAM_START..=SRAM_END).contains(&address) {
            self.sram.write_byte((address - SRAM_START) as usize, value);
        }
    }

    fn num_banks(&self) -> usize {
        1
    }

    fn bank_size(&self) -> usize {
        self.rom.len()
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Ssrpg
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
        // Bit 0: SRAM visible, bit 1: SRAM writable, mirroring the
        // control register layout
        let control = self.sram.is_enabled() as u8
            | ((!self.sram.is_write_protected() as u8) << 1);
        state.register_field("mapper_sram_enabled", &[control]);
        state.register_field("mapper_sram_data", self.sram.data());
    }

    fn load_state(&mut self, state: &dyn StateContainer) -> bool {
        let mut kind = [0u8; 1];
        if !state.read_field("mapper_type", &mut kind) || kind[0] != self.kind() as u8 {
            return false;
        }
        let mut control = [0u8; 1];
        if !state.read_field("mapper_sram_enabled", &mut control) {
            return false;
        }
        let mut data = vec![0u8; SRAM_SIZE];
        if !state.read_field("mapper_sram_data", &mut data) {
            return false;
        }
        self.sram.set_enabled(control[0] & 0x01 != 0);
        self.sram.set_write_protect(control[0] & 0x02 == 0);
        self.sram.set_data(&data);
        true
    }
}
