//! Standard Sega mapper: linear ROM plus battery-backed SRAM banked over
//! the 0x200000 window through the 0xA130F1 control register.

use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::memory::sram::BackupRam;
use crate::core::state::StateContainer;

const SRAM_START: u32 = 0x20_0000;
const SRAM_END: u32 = 0x20_FFFF;
const SRAM_SIZE: usize = 64 * 1024;
const BANK_CONTROL: u32 = 0xA1_30F1;

pub struct SegaMapper<'r> {
    rom: &'r [u8],
    sram: BackupRam,
}

impl<'r> SegaMapper<'r> {
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

    fn rom_read(&self, address: u32) -> u8 {
        if self.rom.is_empty() {
            return 0xFF;
        }
        self.rom[address as usize % self.rom.len()]
    }
}

impl<'r> CartridgeMapper for SegaMapper<'r> {
    fn reset(&mut self) {
        // SRAM starts hidden behind the ROM after reset
        self.sram.set_enabled(false);
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        if (SRAM_START..=SRAM_END).contains(&address) && self.sram.is_enabled() {
            return self.sram.read_byte((address - SRAM_START) as usize);
        }
        self.rom_read(address)
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        if address == BANK_CONTROL {
            self.sram.set_enabled(value & 0x01 != 0);
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
        MapperKind::Sega
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
        state.register_field("mapper_sram_enabled", &[self.sram.is_enabled() as u8]);
        state.register_field("mapper_sram_data", self.sram.data());
    }

    fn load_state(&mut self, state: &dyn StateContainer) -> bool {
        let mut kind = [0u8; 1];
        if !state.read_field("mapper_type", &mut kind) || kind[0] != self.kind() as u8 {
            return false;
        }
        let mut enabled = [0u8; 1];
        if !state.read_field("mapper_sram_enabled", &mut enabled) {
            return false;
        }
        let mut data = vec![0u8; SRAM_SIZE];
        if !state.read_field("mapper_sram_data", &mut data) {
            return false;
        }
        self.sram.set_enabled(enabled[0] != 0);
        self.sram.set_data(&data);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::MemoryStateContainer;

    #[test]
    fn test_sram_hidden_until_enabled() {
        let rom = vec![0x11u8; 0x40_0000];
        let mut mapper = SegaMapper::new(&rom);
        mapper.reset();
        assert_eq!(mapper.cpu_read(SRAM_START), 0x11);
        mapper.cpu_write(BANK_CONTROL, 0x01);
        mapper.cpu_write(SRAM_START, 0xAB);
        assert_eq!(mapper.cpu_read(SRAM_START), 0xAB);
        mapper.cpu_write(BANK_CONTROL, 0x00);
        assert_eq!(mapper.cpu_read(SRAM_START), 0x11);
    }

    #[test]
    fn test_save_state_round_trip() {
        let rom = vec![0u8; 0x1000];
        let mut mapper = SegaMapper::new(&rom);
        mapper.cpu_write(BANK_CONTROL, 0x01);
        mapper.cpu_write(SRAM_START + 4, 0x99);

        let mut state = MemoryStateContainer::new();
        mapper.save_state(&mut state);

        let mut restored = SegaMapper::new(&rom);
        assert!(restored.load_state(&state));
        assert_eq!(restored.cpu_read(SRAM_START + 4), 0x99);
    }
}
