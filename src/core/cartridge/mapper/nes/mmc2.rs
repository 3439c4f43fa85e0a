//! MMC2 (mapper 9) and MMC4 (mapper 10): CHR banks switched by PPU
//! fetch-address latches, as used by the Punch-Out!! board.

use crate::core::cartridge::mapper::nes::{ChrStore, PRG_BANK_8K, PRG_BANK_16K, PRG_RAM_SIZE};
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::cartridge::Mirroring;
use crate::core::state::StateContainer;

const CHR_BANK_4K: usize = 4 * 1024;
const LATCH_FD: u8 = 0xFD;
const LATCH_FE: u8 = 0xFE;

/// CHR banking state shared by MMC2 and MMC4.
struct PpuLatches {
    latch0: u8,
    latch1: u8,
    chr_fd0: u8, // $B000: 4KB bank for PPU $0xxx while latch0 == $FD
    chr_fe0: u8, // $C000
    chr_fd1: u8, // $D000: 4KB bank for PPU $1xxx while latch1 == $FD
    chr_fe1: u8, // $E000
}

impl PpuLatches {
    fn new() -> Self {
        Self {
            latch0: LATCH_FE,
            latch1: LATCH_FE,
            chr_fd0: 0,
            chr_fe0: 0,
            chr_fd1: 0,
            chr_fe1: 0,
        }
    }

    fn chr_offset(&self, address: u32) -> usize {
        let offset = address as usize;
        if offset < CHR_BANK_4K {
            let bank = if self.latch0 == LATCH_FD {
                self.chr_fd0
            } else {
                self.chr_fe0
            };
            (bank as usize & 0x1F) * CHR_BANK_4K + offset
        } else {
            let bank = if self.latch1 == LATCH_FD {
                self.chr_fd1
            } else {
                self.chr_fe1
            };
            (bank as usize & 0x1F) * CHR_BANK_4K + (offset - CHR_BANK_4K)
        }
    }

    /// Latches trip AFTER the fetch that hits the magic tile rows.
    fn update(&mut self, address: u32) {
        match address {
            0x0FD8..=0x0FDF => self.latch0 = LATCH_FD,
            0x0FE8..=0x0FEF => self.latch0 = LATCH_FE,
            0x1FD8..=0x1FDF => self.latch1 = LATCH_FD,
            0x1FE8..=0x1FEF => self.latch1 = LATCH_FE,
            _ => {}
        }
    }

    fn write_register(&mut self, address: u32, value: u8) -> bool {
        match address {
            0xB000..=0xBFFF => self.chr_fd0 = value & 0x1F,
            0xC000..=0xCFFF => self.chr_fe0 = value & 0x1F,
            0xD000..=0xDFFF => self.chr_fd1 = value & 0x1F,
            0xE000..=0xEFFF => self.chr_fe1 = value & 0x1F,
            _ => return false,
        }
        true
    }

    fn pack(&self) -> [u8; 6] {
        [
            self.latch0,
            self.latch1,
            self.chr_fd0,
            self.chr_fe0,
            self.chr_fd1,
            self.chr_fe1,
        ]
    }

    fn unpack(&mut self, blob: &[u8; 6]) {
        self.latch0 = blob[0];
        self.latch1 = blob[1];
        self.chr_fd0 = blob[2];
        self.chr_fe0 = blob[3];
        self.chr_fd1 = blob[4];
        self.chr_fe1 = blob[5];
    }
}

/// MMC2: 8KB switchable PRG at $8000, three fixed 8KB banks above it.
pub struct Mmc2Mapper<'r> {
    prg: &'r [u8],
    chr: ChrStore<'r>,
    latches: PpuLatches,
    prg_bank: usize,
    mirroring: Mirroring,
}

impl<'r> Mmc2Mapper<'r> {
    pub fn new(prg: &'r [u8], chr: Option<&'r [u8]>) -> Self {
        Self {
            prg,
            chr: ChrStore::from_cartridge(chr),
            latches: PpuLatches::new(),
            prg_bank: 0,
            mirroring: Mirroring::Vertical,
        }
    }

    fn prg_8k_banks(&self) -> usize {
        (self.prg.len() / PRG_BANK_8K).max(1)
    }
}

impl<'r> CartridgeMapper for Mmc2Mapper<'r> {
    fn reset(&mut self) {
        self.latches = PpuLatches::new();
        self.prg_bank = 0;
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        if address < 0x8000 || self.prg.is_empty() {
            return 0xFF;
        }
        let banks = self.prg_8k_banks();
        let bank = match address {
            0x8000..=0x9FFF => self.prg_bank,
            0xA000..=0xBFFF => banks.saturating_sub(3),
            0xC000..=0xDFFF => banks.saturating_sub(2),
            _ => banks.saturating_sub(1),
        };
        let offset = (address as usize - 0x8000) % PRG_BANK_8K;
        self.prg[(bank * PRG_BANK_8K + offset) % self.prg.len()]
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        if let 0xA000..=0xAFFF = address {
            self.prg_bank = (value as usize & 0x0F) % self.prg_8k_banks();
            return;
        }
        if self.latches.write_register(address, value) {
            return;
        }
        if address >= 0xF000 {
            self.mirroring = if value & 0x01 != 0 {
                Mirroring::Horizontal
            } else {
                Mirroring::Vertical
            };
        }
    }

    fn ppu_read(&mut self, address: u32) -> u8 {
        // CHR-RAM boards ignore the latch banking
        let value = if self.chr.is_ram() {
            self.chr.read(address as usize)
        } else {
            self.chr.read(self.latches.chr_offset(address))
        };
        self.latches.update(address);
        value
    }

    fn ppu_write(&mut self, address: u32, value: u8) {
        self.chr.write(address as usize, value);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn num_banks(&self) -> usize {
        self.prg_8k_banks()
    }

    fn bank_size(&self) -> usize {
        PRG_BANK_8K
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Mmc2
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
        state.register_field("mapper_current_banks", &[self.prg_bank as u8]);
        state.register_field("mapper_regs", &self.latches.pack());
    }

    fn load_state(&mut self, state: &dyn StateContainer) -> bool {
        let mut kind = [0u8; 1];
        if !state.read_field("mapper_type", &mut kind) || kind[0] != self.kind() as u8 {
            return false;
        }
        let mut bank = [0u8; 1];
        if !state.read_field("mapper_current_banks", &mut bank) {
            return false;
        }
        let mut regs = [0u8; 6];
        if !state.read_field("mapper_regs", &mut regs) {
            return false;
        }
        self.prg_bank = bank[0] as usize % self.prg_8k_banks();
        self.latches.unpack(&regs);
        true
    }
}

/// MMC4: same latch scheme, but a 16KB switchable PRG bank at $8000
/// with the last 16KB fixed at $C000.
pub struct Mmc4Mapper<'r> {
    prg: &'r [u8],
    chr: ChrStore<'r>,
    prg_ram: Vec<u8>,
    latches: PpuLatches,
    prg_bank: usize,
    mirroring: Mirroring,
}

impl<'r> Mmc4Mapper<'r> {
    pub fn new(prg: &'r [u8], chr: Option<&'r [u8]>) -> Self {
        Self {
            prg,
            chr: ChrStore::from_cartridge(chr),
            prg_ram: vec![0; PRG_RAM_SIZE],
            latches: PpuLatches::new(),
            prg_bank: 0,
            mirroring: Mirroring::Vertical,
        }
    }

    fn prg_16k_banks(&self) -> usize {
        (self.prg.len() / PRG_BANK_16K).max(1)
    }
}

impl<'r> CartridgeMapper for Mmc4Mapper<'r> {
    fn reset(&mut self) {
        self.latches = PpuLatches::new();
        self.prg_bank = 0;
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        match address {
            0x6000..=0x7FFF => self.prg_ram[(address as usize - 0x6000) % PRG_RAM_SIZE],
            0x8000..=0xBFFF => {
                if self.prg.is_empty() {
                    return 0xFF;
                }
                let offset = address as usize - 0x8000;
                self.prg[(self.prg_bank * PRG_BANK_16K + offset) % self.prg.len()]
            }
            0xC000..=0xFFFF => {
                if self.prg.is_empty() {
                    return 0xFF;
                }
                let offset = address as usize - 0xC000;
                let base = (self.prg_16k_banks() - 1) * PRG_BANK_16K;
                self.prg[(base + offset) % self.prg.len()]
            }
            _ => 0xFF,
        }
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        match address {
            0x6000..=0x7FFF => {
                self.prg_ram[(address as usize - 0x6000) % PRG_RAM_SIZE] = value;
            }
            0xA000..=0xAFFF => {
                self.prg_bank = (value as usize & 0x0F) % self.prg_16k_banks();
            }
            0xF000..=0xFFFF => {
                self.mirroring = if value & 0x01 != 0 {
                    Mirroring::Horizontal
                } else {
                    Mirroring::Vertical
                };
            }
            _ => {
                self.latches.write_register(address, value);
            }
        }
    }

    fn ppu_read(&mut self, address: u32) -> u8 {
        let value = if self.chr.is_ram() {
            self.chr.read(address as usize)
        } else {
            self.chr.read(self.latches.chr_offset(address))
        };
        self.latches.update(address);
        value
    }

    fn ppu_write(&mut self, address: u32, value: u8) {
        self.chr.write(address as usize, value);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn num_banks(&self) -> usize {
        self.prg_16k_banks()
    }

    fn bank_size(&self) -> usize {
        PRG_BANK_16K
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Mmc4
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
        state.register_field("mapper_current_banks", &[self.prg_bank as u8]);
        state.register_field("mapper_regs", &self.latches.pack());
        state.register_field("mapper_prg_ram", &self.prg_ram);
    }

    fn load_state(&mut self, state: &dyn StateContainer) -> bool {
        let mut kind = [0u8; 1];
        if !state.read_field("mapper_type", &mut kind) || kind[0] != self.kind() as u8 {
            return false;
        }
        let mut bank = [0u8; 1];
        if !state.read_field("mapper_current_banks", &mut bank) {
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
        self.prg_bank = bank[0] as usize % self.prg_16k_banks();
        self.latches.unpack(&regs);
        self.prg_ram = ram;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_chr() -> Vec<u8> {
        // Four 4KB banks, each filled with its index
        let mut chr = vec![0u8; 4 * CHR_BANK_4K];
        for (i, chunk) in chr.chunks_mut(CHR_BANK_4K).enumerate() {
            chunk.fill(i as u8);
        }
        chr
    }

    #[test]
    fn test_latch_switches_chr_bank_after_trigger_fetch() {
        let prg = vec![0u8; 4 * PRG_BANK_8K];
        let chr = make_chr();
        let mut mapper = Mmc2Mapper::new(&prg, Some(&chr));
        mapper.cpu_write(0xB000, 0x01); // $FD bank for PPU $0xxx
        mapper.cpu_write(0xC000, 0x02); // $FE bank for PPU $0xxx

        // Latch starts at $FE
        assert_eq!(mapper.ppu_read(0x0000), 2);
        // Fetching the $FD trigger row returns the old bank, then flips
        assert_eq!(mapper.ppu_read(0x0FD8), 2);
        assert_eq!(mapper.ppu_read(0x0000), 1);
        // And back
        assert_eq!(mapper.ppu_read(0x0FE8), 1);
        assert_eq!(mapper.ppu_read(0x0000), 2);
    }

    #[test]
    fn test_mmc2_fixed_upper_banks() {
        let mut prg = vec![0u8; 8 * PRG_BANK_8K];
        for (i, chunk) in prg.chunks_mut(PRG_BANK_8K).enumerate() {
            chunk.fill(i as u8);
        }
        let mut mapper = Mmc2Mapper::new(&prg, None);
        mapper.cpu_write(0xA000, 0x04);
        assert_eq!(mapper.cpu_read(0x8000), 4);
        assert_eq!(mapper.cpu_read(0xA000), 5); // banks - 3
        assert_eq!(mapper.cpu_read(0xC000), 6); // banks - 2
        assert_eq!(mapper.cpu_read(0xE000), 7); // banks - 1
    }

    #[test]
    fn test_mmc4_16k_banking() {
        let mut prg = vec![0u8; 4 * PRG_BANK_16K];
        for (i, chunk) in prg.chunks_mut(PRG_BANK_16K).enumerate() {
            chunk.fill(i as u8);
        }
        let mut mapper = Mmc4Mapper::new(&prg, None);
        mapper.cpu_write(0xA000, 0x02);
        assert_eq!(mapper.cpu_read(0x8000), 2);
        assert_eq!(mapper.cpu_read(0xC000), 3);
    }
}
