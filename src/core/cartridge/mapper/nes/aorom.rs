//! AOROM (mapper 7): 32KB PRG banks, single-screen mirroring selected
//! by the bank register.

use crate::core::cartridge::mapper::nes::ChrStore;
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::cartridge::Mirroring;
use crate::core::state::StateContainer;

const PRG_BANK_32K: usize = 32 * 1024;

pub struct AoromMapper<'r> {
    prg: &'r [u8],
    chr: ChrStore<'r>,
    prg_bank: usize,
    nametable_high: bool,
}

impl<'r> AoromMapper<'r> {
    pub fn new(prg: &'r [u8], chr: Option<&'r [u8]>) -> Self {
        Self {
            prg,
            chr: ChrStore::from_cartridge(chr),
            prg_bank: 0,
            nametable_high: false,
        }
    }
}

impl<'r> CartridgeMapper for AoromMapper<'r> {
    fn reset(&mut self) {
        self.prg_bank = 0;
        self.nametable_high = false;
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        if address < 0x8000 || self.prg.is_empty() {
            return 0xFF;
        }
        let offset = address as usize - 0x8000;
        self.prg[(self.prg_bank * PRG_BANK_32K + offset) % self.prg.len()]
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        if address >= 0x8000 {
            self.prg_bank = value as usize & 0x07;
            self.nametable_high = value & 0x10 != 0;
        }
    }

    fn ppu_read(&mut self, address: u32) -> u8 {
        self.chr.read(address as usize)
    }

    fn ppu_write(&mut self, address: u32, value: u8) {
        self.chr.write(address as usize, value);
    }

    fn mirroring(&self) -> Mirroring {
        if self.nametable_high {
            Mirroring::SingleScreenHigh
        } else {
            Mirroring::SingleScreenLow
        }
    }

    fn num_banks(&self) -> usize {
        (self.prg.len() / PRG_BANK_32K).max(1)
    }

    fn bank_size(&self) -> usize {
        PRG_BANK_32K
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Aorom
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
        state.register_field(
            "mapper_regs",
            &[self.prg_bank as u8, self.nametable_high as u8],
        );
    }

    fn load_state(&mut self, state: &dyn StateContainer) -> bool {
        let mut kind = [0u8; 1];
        if !state.read_field("mapper_type", &mut kind) || kind[0] != self.kind() as u8 {
            return false;
        }
        let mut regs = [0u8; 2];
        if !state.read_field("mapper_regs", &mut regs) {
            return false;
        }
        self.prg_bank = regs[0] as usize & 0x07;
        self.nametable_high = regs[1] != 0;
        true
    }
}
