//! EA mapper: 16KB banks selected through registers at 0xA13000.

use crate::core::cartridge::mapper::md::BANK_16K;
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::state::StateContainer;

const BANK_CTRL_START: u32 = 0xA1_3000;
const BANK_CTRL_END: u32 = 0xA1_3FFF;

pub struct EaMapper<'r> {
    rom: &'r [u8],
    banks: [u32; 8],
    num_banks: usize,
}

impl<'r> EaMapper<'r> {
    pub fn new(rom: &'r [u8]) -> Self {
        let num_banks = (rom.len() / BANK_16K).max(1);
        let mut mapper = Self {
            rom,
            banks: [0; 8],
            num_banks,
        };
        mapper.reset();
        mapper
    }
}

impl<'r> CartridgeMapper for EaMapper<'r> {
    fn reset(&mut self) {
        for (i, bank) in self.banks.iter_mut().enumerate() {
            *bank = (i % self.num_banks) as u32;
        }
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        let slot = ((address >> 14) & 0x07) as usize;
        let offset = (address as usize) & (BANK_16K - 1);
        let index = self.banks[slot] as usize * BANK_16K + offset;
        if index < self.rom.len() {
            self.rom[index]
        } else {
            0xFF
        }
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        if (BANK_CTRL_START..=BANK_CTRL_END).contains(&address) {
            let slot = (address as usize & 0x0F) % 8;
            self.banks[slot] = (value as usize % self.num_banks) as u32;
        }
    }

    fn num_banks(&self) -> usize {
        self.num_banks
    }

    fn bank_size(&self) -> usize {
        BANK_16K
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Ea
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
        state.register_field("mapper_current_banks", bytemuck::cast_slice(&self.banks));
    }

    fn load_state(&mut self, state: &dyn StateContainer) -> bool {
        let mut kind = [0u8; 1];
        if !state.read_field("mapper_type", &mut kind) || kind[0] != self.kind() as u8 {
            return false;
        }
        let mut banks = [0u32; 8];
        if !state.read_field("mapper_current_banks", bytemuck::cast_slice_mut(&mut banks)) {
            return false;
        }
        self.banks = banks;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_file_selects_banks() {
        let mut rom = vec![0u8; 8 * BANK_16K];
        for (i, chunk) in rom.chunks_mut(BANK_16K).enumerate() {
            chunk.fill(i as u8);
        }
        let mut mapper = EaMapper::new(&rom);
        assert_eq!(mapper.cpu_read(0), 0);
        mapper.cpu_write(BANK_CTRL_START, 0x06);
        assert_eq!(mapper.cpu_read(0), 6);
        // Slot 3 via register 3
        mapper.cpu_write(BANK_CTRL_START + 3, 0x01);
        assert_eq!(mapper.cpu_read(3 * BANK_16K as u32), 1);
    }
}
