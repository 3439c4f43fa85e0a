//! MMC5 (mapper 5): four PRG modes, four CHR modes, ExRAM, a hardware
//! multiplier and a scanline-compare IRQ.

use crate::core::cartridge::mapper::nes::{ChrStore, PRG_BANK_8K, PRG_RAM_SIZE};
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::cartridge::Mirroring;
use crate::core::state::StateContainer;

const EXRAM_SIZE: usize = 1024;
const VBLANK_LINE: u8 = 241;

pub struct Mmc5Mapper<'r> {
    prg: &'r [u8],
    chr: ChrStore<'r>,
    prg_ram: Vec<u8>,
    exram: Vec<u8>,

    prg_mode: u8,
    chr_mode: u8,
    prg_protect: u8,
    exram_mode: u8,
    nametable_map: u8,
    prg_banks: [u8; 5],   // $5113-$5117
    chr_banks: [u8; 12],  // $5120-$512B

    mult_a: u8,
    mult_b: u8,

    irq_target: u8,
    irq_enabled: bool,
    irq_pending: bool,
    in_frame: bool,
    current_line: u8,
}

impl<'r> Mmc5Mapper<'r> {
    pub fn new(prg: &'r [u8], chr: Option<&'r [u8]>) -> Self {
        Self {
            prg,
            chr: ChrStore::from_cartridge(chr),
            prg_ram: vec![0; PRG_RAM_SIZE],
            exram: vec![0; EXRAM_SIZE],
            prg_mode: 3,
            chr_mode: 3,
            prg_protect: 0,
            exram_mode: 0,
            nametable_map: 0,
            prg_banks: [0xFF; 5],
            chr_banks: [0; 12],
            mult_a: 0xFF,
            mult_b: 0xFF,
            irq_target: 0,
            irq_enabled: false,
            irq_pending: false,
            in_frame: false,
            current_line: 0,
        }
    }

    fn prg_bank_count(&self) -> usize {
        (self.prg.len() / PRG_BANK_8K).max(1)
    }

    fn prg_read_offset(&self, address: u32) -> usize {
        let count = self.prg_bank_count();
        let offset = address as usize - 0x8000;
        let fix = |bank: usize| (bank % count) * PRG_BANK_8K;
        match self.prg_mode {
            0 => {
                // One 32KB bank selected by $5117, low bits dropped
                let bank = (self.prg_banks[4] as usize & 0x7F) & !0x03;
                fix(bank + offset / PRG_BANK_8K) + offset % PRG_BANK_8K
            }
            1 => {
                // Two 16KB banks: $5115 and $5117
                let bank = if offset < 0x4000 {
                    (self.prg_banks[2] as usize & 0x7F) >> 1 << 1
                } else {
                    (self.prg_banks[4] as usize & 0x7F) >> 1 << 1
                };
                fix(bank + (offset % 0x4000) / PRG_BANK_8K) + offset % PRG_BANK_8K
            }
            2 => {
                // 16KB + 8KB + 8KB
                let bank = match offset / PRG_BANK_8K {
                    0 | 1 => ((self.prg_banks[2] as usize & 0x7F) >> 1 << 1)
                        + offset / PRG_BANK_8K,
                    2 => self.prg_banks[3] as usize & 0x7F,
                    _ => self.prg_banks[4] as usize & 0x7F,
                };
                fix(bank) + offset % PRG_BANK_8K
            }
            _ => {
                // Four 8KB banks: $5114-$5117
                let bank = self.prg_banks[1 + offset / PRG_BANK_8K] as usize & 0x7F;
                fix(bank) + offset % PRG_BANK_8K
            }
        }
    }

    fn chr_read_offset(&self, address: u32) -> usize {
        let offset = address as usize;
        match self.chr_mode {
            0 => self.chr_banks[7] as usize * 0x2000 + offset,
            1 => {
                if offset < 0x1000 {
                    self.chr_banks[3] as usize * 0x1000 + offset
                } else {
                    self.chr_banks[7] as usize * 0x1000 + (offset - 0x1000)
                }
            }
            2 => {
                let slot = (offset >> 11) & 0x03;
                self.chr_banks[slot * 2 + 1] as usize * 0x800 + (offset & 0x7FF)
            }
            _ => {
                let slot = (offset >> 10) & 0x07;
                self.chr_banks[slot] as usize * 0x400 + (offset & 0x3FF)
            }
        }
    }
}

impl<'r> CartridgeMapper for Mmc5Mapper<'r> {
    fn reset(&mut self) {
        self.prg_mode = 3;
        self.chr_mode = 3;
        self.prg_protect = 0;
        self.exram_mode = 0;
        self.nametable_map = 0;
        self.prg_banks = [0xFF; 5];
        self.chr_banks = [0; 12];
        self.mult_a = 0xFF;
        self.mult_b = 0xFF;
        self.irq_target = 0;
        self.irq_enabled = false;
        self.irq_pending = false;
        self.in_frame = false;
        self.current_line = 0;
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        match address {
            0x5204 => {
                // IRQ status: bit7 pending, bit6 in-frame; read acks
                let status = ((self.irq_pending as u8) << 7) | ((self.in_frame as u8) << 6);
                self.irq_pending = false;
                status
            }
            0x5205 => (self.mult_a as u16 * self.mult_b as u16) as u8,
            0x5206 => ((self.mult_a as u16 * self.mult_b as u16) >> 8) as u8,
            0x5C00..=0x5FFF => self.exram[(address as usize - 0x5C00) % EXRAM_SIZE],
            0x6000..=0x7FFF => self.prg_ram[(address as usize - 0x6000) % PRG_RAM_SIZE],
            0x8000..=0xFFFF => {
                if self.prg.is_empty() {
                    return 0xFF;
                }
                self.prg[self.prg_read_offset(address) % self.prg.len()]
            }
            _ => 0xFF,
        }
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        match address {
            0x5100 => self.prg_mode = value & 0x03,
            0x5101 => self.chr_mode = value & 0x03,
            0x5102 | 0x5103 => self.prg_protect = value,
            0x5104 => self.exram_mode = value & 0x03,
            0x5105 => self.nametable_map = value,
            0x5113..=0x5117 => {
                self.prg_banks[(address - 0x5113) as usize] = value;
            }
            0x5120..=0x512B => {
                self.chr_banks[(address - 0x5120) as usize] = value;
            }
            0x5203 => self.irq_target = value,
            0x5204 => self.irq_enabled = value & 0x80 != 0,
            0x5205 => self.mult_a = value,
            0x5206 => self.mult_b = value,
            0x5C00..=0x5FFF => {
                self.exram[(address as usize - 0x5C00) % EXRAM_SIZE] = value;
            }
            0x6000..=0x7FFF => {
                self.prg_ram[(address as usize - 0x6000) % PRG_RAM_SIZE] = value;
            }
            _ => {}
        }
    }

    fn ppu_read(&mut self, address: u32) -> u8 {
        self.chr.read(self.chr_read_offset(address))
    }

    fn ppu_write(&mut self, address: u32, value: u8) {
        let offset = self.chr_read_offset(address);
        self.chr.write(offset, value);
    }

    fn scanline(&mut self) {
        if !self.in_frame {
            self.in_frame = true;
            self.current_line = 0;
            return;
        }
        self.current_line = self.current_line.wrapping_add(1);
        if self.current_line == self.irq_target && self.irq_target != 0 && self.irq_enabled {
            self.irq_pending = true;
        }
        if self.current_line >= VBLANK_LINE {
            self.in_frame = false;
        }
    }

    fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    fn irq_clear(&mut self) {
        self.irq_pending = false;
    }

    fn mirroring(&self) -> Mirroring {
        // $5105 drives a per-nametable map; report the closest standard mode
        match self.nametable_map {
            0x50 => Mirroring::Horizontal,
            0x44 => Mirroring::Vertical,
            0x00 => Mirroring::SingleScreenLow,
            0x55 => Mirroring::SingleScreenHigh,
            _ => Mirroring::FourScreen,
        }
    }

    fn num_banks(&self) -> usize {
        self.prg_bank_count()
    }

    fn bank_size(&self) -> usize {
        PRG_BANK_8K
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Mmc5
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
        state.register_field("mapper_current_banks", &self.prg_banks);
        state.register_field("mapper_chr_banks", &self.chr_banks);
        state.register_field(
            "mapper_regs",
            &[
                self.prg_mode,
                self.chr_mode,
                self.prg_protect,
                self.exram_mode,
                self.nametable_map,
                self.mult_a,
                self.mult_b,
                self.irq_target,
                self.irq_enabled as u8,
                self.irq_pending as u8,
                self.in_frame as u8,
                self.current_line,
            ],
        );
        state.register_field("mapper_exram", &self.exram);
        state.register_field("mapper_prg_ram", &self.prg_ram);
    }

    fn load_state(&mut self, state: &dyn StateContainer) -> bool {
        let mut kind = [0u8; 1];
        if !state.read_field("mapper_type", &mut kind) || kind[0] != self.kind() as u8 {
            return false;
        }
        let mut prg_banks = [0u8; 5];
        let mut chr_banks = [0u8; 12];
        let mut regs = [0u8; 12];
        let mut exram = vec![0u8; EXRAM_SIZE];
        let mut ram = vec![0u8; PRG_RAM_SIZE];
        if !state.read_field("mapper_current_banks", &mut prg_banks)
            || !state.read_field("mapper_chr_banks", &mut chr_banks)
            || !state.read_field("mapper_regs", &mut regs)
            || !state.read_field("mapper_exram", &mut exram)
            || !state.read_field("mapper_prg_ram", &mut ram)
        {
            return false;
        }
        self.prg_banks = prg_banks;
        self.chr_banks = chr_banks;
        self.prg_mode = regs[0] & 0x03;
        self.chr_mode = regs[1] & 0x03;
        self.prg_protect = regs[2];
        self.exram_mode = regs[3];
        self.nametable_map = regs[4];
        self.mult_a = regs[5];
        self.mult_b = regs[6];
        self.irq_target = regs[7];
        self.irq_enabled = regs[8] != 0;
        self.irq_pending = regs[9] != 0;
        self.in_frame = regs[10] != 0;
        self.current_line = regs[11];
        self.exram = exram;
        self.prg_ram = ram;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_prg(banks: usize) -> Vec<u8> {
        let mut prg = vec![0u8; banks * PRG_BANK_8K];
        for (i, chunk) in prg.chunks_mut(PRG_BANK_8K).enumerate() {
            chunk.fill(i as u8);
        }
        prg
    }

    #[test]
    fn test_mode_3_four_8k_banks() {
        let prg = make_prg(16);
        let mut mapper = Mmc5Mapper::new(&prg, None);
        mapper.cpu_write(0x5100, 3);
        mapper.cpu_write(0x5114, 2);
        mapper.cpu_write(0x5115, 4);
        mapper.cpu_write(0x5116, 6);
        mapper.cpu_write(0x5117, 8);
        assert_eq!(mapper.cpu_read(0x8000), 2);
        assert_eq!(mapper.cpu_read(0xA000), 4);
        assert_eq!(mapper.cpu_read(0xC000), 6);
        assert_eq!(mapper.cpu_read(0xE000), 8);
    }

    #[test]
    fn test_mode_1_two_16k_banks() {
        let prg = make_prg(16);
        let mut mapper = Mmc5Mapper::new(&prg, None);
        mapper.cpu_write(0x5100, 1);
        mapper.cpu_write(0x5115, 4);
        mapper.cpu_write(0x5117, 8);
        assert_eq!(mapper.cpu_read(0x8000), 4);
        assert_eq!(mapper.cpu_read(0xA000), 5);
        assert_eq!(mapper.cpu_read(0xC000), 8);
        assert_eq!(mapper.cpu_read(0xE000), 9);
    }

    #[test]
    fn test_multiplier() {
        let prg = make_prg(4);
        let mut mapper = Mmc5Mapper::new(&prg, None);
        mapper.cpu_write(0x5205, 0x34);
        mapper.cpu_write(0x5206, 0x12);
        let product = 0x34u16 * 0x12u16;
        assert_eq!(mapper.cpu_read(0x5205), product as u8);
        assert_eq!(mapper.cpu_read(0x5206), (product >> 8) as u8);
    }

    #[test]
    fn test_scanline_irq_fires_at_target_line() {
        let prg = make_prg(4);
        let mut mapper = Mmc5Mapper::new(&prg, None);
        mapper.cpu_write(0x5203, 10);
        mapper.cpu_write(0x5204, 0x80);
        // First call marks the frame start (line 0)
        for _ in 0..10 {
            mapper.scanline();
            assert!(!mapper.irq_pending());
        }
        mapper.scanline();
        assert!(mapper.irq_pending());
        // Status read acks
        let status = mapper.cpu_read(0x5204);
        assert_eq!(status & 0x80, 0x80);
        assert!(!mapper.irq_pending());
    }

    #[test]
    fn test_exram_read_write() {
        let prg = make_prg(4);
        let mut mapper = Mmc5Mapper::new(&prg, None);
        mapper.cpu_write(0x5C00, 0xAB);
        mapper.cpu_write(0x5FFF, 0xCD);
        assert_eq!(mapper.cpu_read(0x5C00), 0xAB);
        assert_eq!(mapper.cpu_read(0x5FFF), 0xCD);
    }

    #[test]
    fn test_chr_mode_3_1k_banks() {
        let mut chr = vec![0u8; 16 * 0x400];
        for (i, chunk) in chr.chunks_mut(0x400).enumerate() {
            chunk.fill(i as u8);
        }
        let prg = make_prg(4);
        let mut mapper = Mmc5Mapper::new(&prg, Some(&chr));
        mapper.cpu_write(0x5101, 3);
        mapper.cpu_write(0x5120, 5);
        mapper.cpu_write(0x5127, 9);
        assert_eq!(mapper.ppu_read(0x0000), 5);
        assert_eq!(mapper.ppu_read(0x1C00), 9);
    }
}
