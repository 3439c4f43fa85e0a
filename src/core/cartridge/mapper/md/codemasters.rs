//! Codemasters mapper: 16KB banks latched by writes into the ROM area.

use crate::core::cartridge::mapper::md::BANK_16K;
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::state::StateContainer;

const BANK_CTRL_START: u32 = 0x8000;
const BANK_CTRL_END: u32 = 0xBFFF;

pub struct CodemastersMapper<'r> {
    rom: &'r [u8],
    banks: [u32; 8],
    num_banks: usize,
}

impl<'r> CodemastersMapper<'r> {
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

impl<'r> CartridgeMapper for CodemastersMapper<'r> {
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
            let slot = ((address >> 14) & 0x03) as usize;
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
        MapperKind::Codemasters
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
