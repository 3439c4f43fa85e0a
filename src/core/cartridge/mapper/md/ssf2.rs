//! Super Street Fighter II style mapper: eight 512KB slots remapped
//! through the 0xA13000 bank register file.

use crate::core::cartridge::mapper::md::BANK_512K;
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::state::StateContainer;
use log::debug;

const BANK_CTRL_START: u32 = 0xA1_3000;
const BANK_CTRL_END: u32 = 0xA1_30FF;

pub struct Ssf2Mapper<'r> {
    rom: &'r [u8],
    banks: [u32; 8], // bank index mapped into each 512KB slot
    num_banks: usize,
}

impl<'r> Ssf2Mapper<'r> {
    pub fn new(rom: &'r [u8]) -> Self {
        let num_banks = (rom.len() / BANK_512K).max(1);
        let mut mapper = Self {
            rom,
            banks: [0; 8],
            num_banks,
        };
        mapper.reset();
        mapper
    }
}

impl<'r> CartridgeMapper for Ssf2Mapper<'r> {
    fn reset(&mut self) {
        // Identity mapping: slot N sees bank N
        for (i, bank) in self.banks.iter_mut().enumerate() {
            *bank = (i % self.num_banks) as u32;
        }
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        let slot = ((address >> 19) & 0x07) as usize;
        let offset = (address as usize) & (BANK_512K - 1);
        let index = self.banks[slot] as usize * BANK_512K + offset;
        if index < self.rom.len() {
            self.rom[index]
        } else {
            0xFF
        }
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        if (BANK_CTRL_START..=BANK_CTRL_END).contains(&address) {
            let slot = ((address >> 1) & 0x07) as usize;
            self.banks[slot] = (value as usize % self.num_banks) as u32;
            debug!("SSF2: slot {} -> bank {}", slot, self.banks[slot]);
        }
    }

    fn num_banks(&self) -> usize {
        self.num_banks
    }

    fn bank_size(&self) -> usize {
        BANK_512K
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Ssf2
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

    fn make_rom(banks: usize) -> Vec<u8> {
        let mut rom = vec![0u8; banks * BANK_512K];
        for (i, chunk) in rom.chunks_mut(BANK_512K).enumerate() {
            chunk.fill(i as u8);
        }
        rom
    }

    #[test]
    fn test_reset_restores_identity_mapping() {
        let rom = make_rom(8);
        let mut mapper = Ssf2Mapper::new(&rom);
        mapper.cpu_write(BANK_CTRL_START, 0x05);
        assert_eq!(mapper.cpu_read(0), 5);
        mapper.reset();
        for slot in 0..8u32 {
            assert_eq!(mapper.cpu_read(slot * BANK_512K as u32), slot as u8);
        }
    }

    #[test]
    fn test_four_megabyte_rom_banking() {
        // 4MB ROM: eight banks of 512KB
        let rom = make_rom(8);
        let mut mapper = Ssf2Mapper::new(&rom);
        assert_eq!(mapper.num_banks(), 8);
        assert_eq!(mapper.bank_size(), BANK_512K);
        // Map bank 7 into slot 0 and read it back at offset 0
        mapper.cpu_write(BANK_CTRL_START, 0x07);
        assert_eq!(mapper.cpu_read(0), rom[7 * BANK_512K]);
    }

    #[test]
    fn test_bank_value_wraps_to_bank_count() {
        let rom = make_rom(4);
        let mut mapper = Ssf2Mapper::new(&rom);
        // Bank 6 on a 4-bank ROM wraps to bank 2
        mapper.cpu_write(BANK_CTRL_START + 2, 0x06);
        assert_eq!(mapper.cpu_read(BANK_512K as u32), 2);
    }
}
