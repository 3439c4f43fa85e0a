//! MMC1 (mapper 1): serial shift-register interface, four internal
//! registers written five bits at a time, LSB first.

use crate::core::cartridge::mapper::nes::{ChrStore, PRG_BANK_16K, PRG_RAM_SIZE};
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::cartridge::Mirroring;
use crate::core::state::StateContainer;

const CHR_BANK_4K: usize = 4 * 1024;

pub struct Mmc1Mapper<'r> {
    prg: &'r [u8],
    chr: ChrStore<'r>,
    prg_ram: Vec<u8>,

    shift_register: u8,
    shift_count: u8,
    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,
}

impl<'r> Mmc1Mapper<'r> {
    pub fn new(prg: &'r [u8], chr: Option<&'r [u8]>) -> Self {
        Self {
            prg,
            chr: ChrStore::from_cartridge(chr),
            prg_ram: vec![0; PRG_RAM_SIZE],
            shift_register: 0x10,
            shift_count: 0,
            control: 0x0C, // power-on: fix last bank at $C000
            chr_bank0: 0,
            chr_bank1: 0,
            prg_bank: 0,
        }
    }

    fn prg_offset(&self, address: u32) -> usize {
        let offset = address as usize - 0x8000;
        let bank = self.prg_bank as usize & 0x0F;
        let prg_mode = (self.control >> 2) & 0x03;
        let base = match prg_mode {
            0 | 1 => {
                // 32KB mode: low bit of the bank number is ignored
                (bank & !1) * PRG_BANK_16K
            }
            2 => {
                // First bank fixed at $8000
                if offset < PRG_BANK_16K {
                    0
                } else {
                    bank * PRG_BANK_16K
                }
            }
            _ => {
                // Last bank fixed at $C000
                if offset < PRG_BANK_16K {
                    bank * PRG_BANK_16K
                } else {
                    self.prg.len().saturating_sub(PRG_BANK_16K)
                }
            }
        };
        let local = match prg_mode {
            0 | 1 => offset,
            _ => offset % PRG_BANK_16K,
        };
        (base + local) % self.prg.len().max(1)
    }

    fn chr_offset(&self, address: u32) -> usize {
        let offset = address as usize;
        if self.control & 0x10 == 0 {
            // 8KB mode: low bit of chr_bank0 ignored
            (self.chr_bank0 as usize & 0x1E) * CHR_BANK_4K + offset
        } else if offset < CHR_BANK_4K {
            self.chr_bank0 as usize * CHR_BANK_4K + offset
        } else {
            self.chr_bank1 as usize * CHR_BANK_4K + (offset - CHR_BANK_4K)
        }
    }

    fn commit(&mut self, address: u32) {
        let value = self.shift_register & 0x1F;
        match address {
            0x8000..=0x9FFF => self.control = value,
            0xA000..=0xBFFF => self.chr_bank0 = value,
            0xC000..=0xDFFF => self.chr_bank1 = value,
            _ => self.prg_bank = value,
        }
    }
}

impl<'r> CartridgeMapper for Mmc1Mapper<'r> {
    fn reset(&mut self) {
        self.shift_register = 0x10;
        self.shift_count = 0;
        self.control = 0x0C;
        self.chr_bank0 = 0;
        self.chr_bank1 = 0;
        self.prg_bank = 0;
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        match address {
            0x6000..=0x7FFF => self.prg_ram[(address as usize - 0x6000) % PRG_RAM_SIZE],
            0x8000..=0xFFFF => {
                if self.prg.is_empty() {
                    return 0xFF;
                }
                self.prg[self.prg_offset(address)]
            }
            _ => 0xFF,
        }
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        match address {
            0x6000..=0x7FFF => {
                self.prg_ram[(address as usize - 0x6000) % PRG_RAM_SIZE] = value;
            }
            0x8000..=0xFFFF => {
                if value & 0x80 != 0 {
                    // Reset bit: clear the shifter and refix the last bank
                    self.shift_register = 0x10;
                    self.shift_count = 0;
                    self.control |= 0x0C;
                    return;
                }
                self.shift_register =
                    (self.shift_register >> 1) | ((value & 0x01) << 4);
                self.shift_count += 1;
                if self.shift_count == 5 {
                    self.commit(address);
                    self.shift_register = 0x10;
                    self.shift_count = 0;
                }
            }
            _ => {}
        }
    }

    fn ppu_read(&mut self, address: u32) -> u8 {
        self.chr.read(self.chr_offset(address))
    }

    fn ppu_write(&mut self, address: u32, value: u8) {
        let offset = self.chr_offset(address);
        self.chr.write(offset, value);
    }

    fn mirroring(&self) -> Mirroring {
        match self.control & 0x03 {
            0 => Mirroring::SingleScreenLow,
            1 => Mirroring::SingleScreenHigh,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }

    fn num_banks(&self) -> usize {
        (self.prg.len() / PRG_BANK_16K).max(1)
    }

    fn bank_size(&self) -> usize {
        PRG_BANK_16K
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Mmc1
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
        state.register_field(
            "mapper_regs",
            &[
                self.shift_register,
                self.shift_count,
                self.control,
                self.chr_bank0,
                self.chr_bank1,
                self.prg_bank,
            ],
        );
        state.register_field("mapper_prg_ram", &self.prg_ram);
    }

    fn load_state(&mut self, state: &dyn StateContainer) -> bool {
        let mut kind = [0u8; 1];
        if !state.read_field("mapper_type", &mut kind) || kind[0] != self.kind() as u8 {
            return false;
        }
        let mut regs = [0u8; 6];
        if !state.read_field("mapper_regs", &mut regs) {
            return false;
        }
        let mut ram = vec![0u8; PRG_RAM_SIZE];
        if !state.read_field("mapper_prg_ram", &mut ram) {
            return false;
        }
        self.shift_register = regs[0];
        self.shift_count = regs[1];
        self.control = regs[2];
        self.chr_bank0 = regs[3];
        self.chr_bank1 = regs[4];
        self.prg_bank = regs[5];
        self.prg_ram = ram;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_prg(banks: usize) -> Vec<u8> {
        let mut prg = vec![0u8; banks * PRG_BANK_16K];
        for (i, chunk) in prg.chunks_mut(PRG_BANK_16K).enumerate() {
            chunk.fill(i as u8);
        }
        prg
    }

    fn write_serial(mapper: &mut Mmc1Mapper, address: u32, value: u8) {
        for i in 0..5 {
            mapper.cpu_write(address, (value >> i) & 0x01);
        }
    }

    #[test]
    fn test_five_writes_commit_one_register() {
        let prg = make_prg(8);
        let mut mapper = Mmc1Mapper::new(&prg, None);
        // Select PRG bank 3; power-on mode fixes the last bank at $C000
        write_serial(&mut mapper, 0xE000, 0x03);
        assert_eq!(mapper.cpu_read(0x8000), 3);
        assert_eq!(mapper.cpu_read(0xC000), 7);
    }

    #[test]
    fn test_partial_sequence_does_not_commit() {
        let prg = make_prg(8);
        let mut mapper = Mmc1Mapper::new(&prg, None);
        // Only four bits: no register change
        for _ in 0..4 {
            mapper.cpu_write(0xE000, 0x01);
        }
        assert_eq!(mapper.cpu_read(0x8000), 0);
    }

    #[test]
    fn test_reset_bit_clears_shifter() {
        let prg = make_prg(8);
        let mut mapper = Mmc1Mapper::new(&prg, None);
        mapper.cpu_write(0xE000, 0x01);
        mapper.cpu_write(0xE000, 0x01);
        mapper.cpu_write(0xE000, 0x80);
        // A fresh 5-bit sequence lands intact
        write_serial(&mut mapper, 0xE000, 0x05);
        assert_eq!(mapper.cpu_read(0x8000), 5);
    }

    #[test]
    fn test_mirroring_follows_control_register() {
        let prg = make_prg(2);
        let mut mapper = Mmc1Mapper::new(&prg, None);
        write_serial(&mut mapper, 0x8000, 0x0E); // vertical, fix-last
        assert_eq!(mapper.mirroring(), Mirroring::Vertical);
        write_serial(&mut mapper, 0x8000, 0x0F);
        assert_eq!(mapper.mirroring(), Mirroring::Horizontal);
    }

    #[test]
    fn test_32k_prg_mode_ignores_low_bank_bit() {
        let prg = make_prg(8);
        let mut mapper = Mmc1Mapper::new(&prg, None);
        write_serial(&mut mapper, 0x8000, 0x00); // 32KB mode
        write_serial(&mut mapper, 0xE000, 0x03); // bank 3 -> rounds to 2
        assert_eq!(mapper.cpu_read(0x8000), 2);
        assert_eq!(mapper.cpu_read(0xC000), 3);
    }
}
