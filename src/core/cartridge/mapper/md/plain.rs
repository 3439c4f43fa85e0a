//! Linear ROM with no bank switching, mirrored across the cartridge area.

use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::state::StateContainer;

/// Default Mega Drive mapper: the whole ROM visible as one bank.
pub struct PlainMapper<'r> {
    rom: &'r [u8],
}

impl<'r> PlainMapper<'r> {
    pub fn new(rom: &'r [u8]) -> Self {
        Self { rom }
    }
}

impl<'r> CartridgeMapper for PlainMapper<'r> {
    fn reset(&mut self) {}

    fn cpu_read(&mut self, address: u32) -> u8 {
        if self.rom.is_empty() {
            return 0xFF;
        }
        self.rom[address as usize % self.rom.len()]
    }

    fn cpu_write(&mut self, _address: u32, _value: u8) {
        // ROM only, nothing to latch
    }

    fn num_banks(&self) -> usize {
        1
    }

    fn bank_size(&self) -> usize {
        self.rom.len()
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Plain
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
    }

    fn load_state(&mut self, state: &dyn StateContainer) -> bool {
        let mut kind = [0u8; 1];
        state.read_field("mapper_type", &mut kind) && kind[0] == self.kind() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rom_mirrors_across_address_space() {
        let rom: Vec<u8> = (0..64u8).collect();
        let mut mapper = PlainMapper::new(&rom);
        assert_eq!(mapper.cpu_read(0), 0);
        assert_eq!(mapper.cpu_read(63), 63);
        assert_eq!(mapper.cpu_read(64), 0);
        assert_eq!(mapper.cpu_read(0x40_0005), 5);
    }

    #[test]
    fn test_empty_rom_reads_ff() {
        let mut mapper = PlainMapper::new(&[]);
        assert_eq!(mapper.cpu_read(0x100), 0xFF);
    }
}
