//! Pier Solar mapper: eight 512KB bank registers, a 1MB SRAM window and
//! an expansion-port register, all behind the 0xA13000 register file.

use crate::core::cartridge::mapper::md::BANK_512K;
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::memory::sram::BackupRam;
use crate::core::state::StateContainer;

const REG_BASE: u32 = 0xA1_3000;
const REG_CONTROL: u32 = 0xF0;
const REG_EXPANSION: u32 = 0xF1;
const SRAM_START: u32 = 0x20_0000;
const SRAM_END: u32 = 0x2F_FFFF;
const SRAM_SIZE: usize = 1024 * 1024;

pub struct PierSolarMapper<'r> {
    rom: &'r [u8],
    banks: [u32; 8],
    num_banks: usize,
    sram: BackupRam,
    rtc_enabled: bool,
    expansion: u8, // expansion port latch, readable back at 0xA130F1
}

impl<'r> PierSolarMapper<'r> {
    pub fn new(rom: &'r [u8]) -> Self {
        let num_banks = (rom.len() / BANK_512K).max(1);
        let mut mapper = Self {
            rom,
            banks: [0; 8],
            num_banks,
            sram: BackupRam::new(SRAM_SIZE),
            rtc_enabled: false,
            expansion: 0,
        };
        mapper.reset();
        mapper
    }

    pub fn sram(&self) -> &BackupRam {
        &self.sram
    }

    pub fn sram_mut(&mut self) -> &mut BackupRam {
        &mut self.sram
    }
}

impl<'r> CartridgeMapper for PierSolarMapper<'r> {
    fn reset(&mut self) {
        for (i, bank) in self.banks.iter_mut().enumerate() {
            *bank = (i % self.num_banks) as u32;
        }
        self.sram.set_enabled(false);
        self.rtc_enabled = false;
        self.expansion = 0;
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        if address == REG_BASE + REG_EXPANSION {
            return self.expansion;
        }
        if (SRAM_START..=SRAM_END).contains(&address) && self.sram.is_enabled() {
            return self.sram.read_byte((address - SRAM_START) as usize);
        }
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
        if (SRAM_START..=SRAM_END).contains(&address) {
            self.sram.write_byte((address - SRAM_START) as usize, value);
            return;
        }
        if address < REG_BASE {
            return;
        }
        match address - REG_BASE {
            reg @ 0x00..=0x07 => {
                self.banks[reg as usize] = (value as usize % self.num_banks) as u32;
            }
            REG_CONTROL => {
                self.sram.set_enabled(value & 0x01 != 0);
                self.rtc_enabled = value & 0x02 != 0;
            }
            REG_EXPANSION => {
                self.expansion = value;
            }
            _ => {}
        }
    }

    fn num_banks(&self) -> usize {
        self.num_banks
    }

    fn bank_size(&self) -> usize {
        BANK_512K
    }

    fn kind(&self) -> MapperKind {
        MapperKind::PierSolar
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
        state.register_field("mapper_current_banks", bytemuck::cast_slice(&self.banks));
        state.register_field(
            "mapper_regs",
            &[
                self.sram.is_enabled() as u8,
                self.rtc_enabled as u8,
                self.expansion,
            ],
        );
        state.register_field("mapper_sram_data", self.sram.data());
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
        let mut regs = [0u8; 3];
        if !state.read_field("mapper_regs", &mut regs) {
            return false;
        }
        let mut data = vec![0u8; SRAM_SIZE];
        if !state.read_field("mapper_sram_data", &mut data) {
            return false;
        }
        self.banks = banks;
        self.sram.set_enabled(regs[0] != 0);
        self.rtc_enabled = regs[1] != 0;
        self.expansion = regs[2];
        self.sram.set_data(&data);
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
    fn test_bank_registers_remap_slots() {
        let rom = make_rom(8);
        let mut mapper = PierSolarMapper::new(&rom);
        mapper.cpu_write(REG_BASE + 1, 0x06);
        assert_eq!(mapper.cpu_read(BANK_512K as u32), 6);
    }

    #[test]
    fn test_sram_overlay_beats_rom_when_enabled() {
        let rom = make_rom(8);
        let mut mapper = PierSolarMapper::new(&rom);
        // Slot 4 (0x200000) reads ROM while SRAM is hidden
        assert_eq!(mapper.cpu_read(SRAM_START), 4);
        mapper.cpu_write(REG_BASE + REG_CONTROL, 0x01);
        mapper.cpu_write(SRAM_START + 8, 0x77);
        assert_eq!(mapper.cpu_read(SRAM_START + 8), 0x77);
    }

    #[test]
    fn test_expansion_register_reads_back() {
        let rom = make_rom(1);
        let mut mapper = PierSolarMapper::new(&rom);
        mapper.cpu_write(REG_BASE + REG_EXPANSION, 0x5C);
        assert_eq!(mapper.cpu_read(REG_BASE + REG_EXPANSION), 0x5C);
    }

    #[test]
    fn test_reads_past_rom_end_return_ff() {
        // ROM shorter than one bank: offsets past the end are open bus
        let rom = vec![0x12u8; 0x1000];
        let mut mapper = PierSolarMapper::new(&rom);
        assert_eq!(mapper.cpu_read(0x0800), 0x12);
        assert_eq!(mapper.cpu_read(0x2000), 0xFF);
    }
}
