//! VRC6 (mapper 24): Konami board with fine-grained CHR banking, a
//! count-up scanline IRQ and an expansion audio register file.

use crate::core::cartridge::mapper::nes::{ChrStore, PRG_BANK_8K, PRG_BANK_16K, PRG_RAM_SIZE};
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::cartridge::Mirroring;
use crate::core::state::StateContainer;

const CHR_BANK_1K: usize = 1024;

pub struct Vrc6Mapper<'r> {
    prg: &'r [u8],
    chr: ChrStore<'r>,
    prg_ram: Vec<u8>,

    prg_bank_16k: usize, // $8000-$BFFF
    prg_bank_8k: usize,  // $C000-$DFFF
    chr_banks: [u8; 8],
    mirroring: Mirroring,

    irq_latch: u8,
    irq_counter: u8,
    irq_enable: u8, // bit0: enable after ack, bit1: counting
    irq_pending: bool,

    // Expansion audio registers, latched for an external synth
    pulse1: [u8; 3],
    pulse2: [u8; 3],
    saw: [u8; 3],
}

impl<'r> Vrc6Mapper<'r> {
    pub fn new(prg: &'r [u8], chr: Option<&'r [u8]>) -> Self {
        Self {
            prg,
            chr: ChrStore::from_cartridge(chr),
            prg_ram: vec![0; PRG_RAM_SIZE],
            prg_bank_16k: 0,
            prg_bank_8k: 0,
            chr_banks: [0; 8],
            mirroring: Mirroring::Vertical,
            irq_latch: 0,
            irq_counter: 0,
            irq_enable: 0,
            irq_pending: false,
            pulse1: [0; 3],
            pulse2: [0; 3],
            saw: [0; 3],
        }
    }

    pub fn audio_registers(&self) -> ([u8; 3], [u8; 3], [u8; 3]) {
        (self.pulse1, self.pulse2, self.saw)
    }
}

impl<'r> CartridgeMapper for Vrc6Mapper<'r> {
    fn reset(&mut self) {
        self.prg_bank_16k = 0;
        self.prg_bank_8k = 0;
        self.chr_banks = [0; 8];
        self.irq_latch = 0;
        self.irq_counter = 0;
        self.irq_enable = 0;
        self.irq_pending = false;
        self.pulse1 = [0; 3];
        self.pulse2 = [0; 3];
        self.saw = [0; 3];
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        match address {
            0x6000..=0x7FFF => self.prg_ram[(address as usize - 0x6000) % PRG_RAM_SIZE],
            0x8000..=0xBFFF => {
                if self.prg.is_empty() {
                    return 0xFF;
                }
                let offset = address as usize - 0x8000;
                self.prg[(self.prg_bank_16k * PRG_BANK_16K + offset) % self.prg.len()]
            }
            0xC000..=0xDFFF => {
                if self.prg.is_empty() {
                    return 0xFF;
                }
                let offset = address as usize - 0xC000;
                self.prg[(self.prg_bank_8k * PRG_BANK_8K + offset) % self.prg.len()]
            }
            0xE000..=0xFFFF => {
                if self.prg.is_empty() {
                    return 0xFF;
                }
                // Fixed last 8KB bank
                let offset = address as usize - 0xE000;
                let base = self.prg.len().saturating_sub(PRG_BANK_8K);
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
            0x8000..=0x8003 => {
                let banks = (self.prg.len() / PRG_BANK_16K).max(1);
                self.prg_bank_16k = (value as usize & 0x0F) % banks;
            }
            0x9000..=0x9002 => self.pulse1[(address - 0x9000) as usize] = value,
            0xA000..=0xA002 => self.pulse2[(address - 0xA000) as usize] = value,
            0xB000..=0xB002 => self.saw[(address - 0xB000) as usize] = value,
            0xB003 => {
                self.mirroring = match (value >> 2) & 0x03 {
                    0 => Mirroring::Vertical,
                    1 => Mirroring::Horizontal,
                    2 => Mirroring::SingleScreenLow,
                    _ => Mirroring::SingleScreenHigh,
                };
            }
            0xC000..=0xC003 => {
                let banks = (self.prg.len() / PRG_BANK_8K).max(1);
                self.prg_bank_8k = (value as usize & 0x1F) % banks;
            }
            0xD000..=0xD003 => {
                self.chr_banks[(address - 0xD000) as usize] = value;
            }
            0xE000..=0xE003 => {
                self.chr_banks[4 + (address - 0xE000) as usize] = value;
            }
            0xF000 => self.irq_latch = value,
            0xF001 => {
                self.irq_enable = value & 0x03;
                if self.irq_enable & 0x02 != 0 {
                    self.irq_counter = self.irq_latch;
                }
                self.irq_pending = false;
            }
            0xF002 => {
                // Acknowledge: restore counting from the enable latch
                self.irq_pending = false;
                if self.irq_enable & 0x01 != 0 {
                    self.irq_enable |= 0x02;
                }
            }
            _ => {}
        }
    }

    fn ppu_read(&mut self, address: u32) -> u8 {
        let slot = (address as usize / CHR_BANK_1K) & 0x07;
        let offset = address as usize % CHR_BANK_1K;
        self.chr.read(self.chr_banks[slot] as usize * CHR_BANK_1K + offset)
    }

    fn ppu_write(&mut self, address: u32, value: u8) {
        let slot = (address as usize / CHR_BANK_1K) & 0x07;
        let offset = address as usize % CHR_BANK_1K;
        self.chr.write(self.chr_banks[slot] as usize * CHR_BANK_1K + offset, value);
    }

    fn scanline(&mut self) {
        if self.irq_enable & 0x02 != 0 {
            if self.irq_counter == 0xFF {
                self.irq_counter = self.irq_latch;
                self.irq_pending = true;
            } else {
                self.irq_counter += 1;
            }
        }
    }

    fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    fn irq_clear(&mut self) {
        self.irq_pending = false;
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn num_banks(&self) -> usize {
        (self.prg.len() / PRG_BANK_16K).max(1)
    }

    fn bank_size(&self) -> usize {
        PRG_BANK_16K
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Vrc6
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
        state.register_field("mapper_chr_banks", &self.chr_banks);
        state.register_field(
            "mapper_regs",
            &[
                self.prg_bank_16k as u8,
                self.prg_bank_8k as u8,
                self.irq_latch,
                self.irq_counter,
                self.irq_enable,
                self.irq_pending as u8,
                self.pulse1[0], self.pulse1[1], self.pulse1[2],
                self.pulse2[0], self.pulse2[1], self.pulse2[2],
                self.saw[0], self.saw[1], self.saw[2],
            ],
        );
        state.register_field("mapper_prg_ram", &self.prg_ram);
    }

    fn load_state(&mut self, state: &dyn StateContainer) -> bool {
        let mut kind = [0u8; 1];
        if !state.read_field("mapper_type", &mut kind) || kind[0] != self.kind() as u8 {
            return false;
        }
        let mut chr_banks = [0u8; 8];
        let mut regs = [0u8; 15];
        let mut ram = vec![0u8; PRG_RAM_SIZE];
        if !state.read_field("mapper_chr_banks", &mut chr_banks)
            || !state.read_field("mapper_regs", &mut regs)
            || !state.read_field("mapper_prg_ram", &mut ram)
        {
            return false;
        }
        self.chr_banks = chr_banks;
        self.prg_bank_16k = regs[0] as usize;
        self.prg_bank_8k = regs[1] as usize;
        self.irq_latch = regs[2];
        self.irq_counter = regs[3];
        self.irq_enable = regs[4];
        self.irq_pending = regs[5] != 0;
        self.pulse1 = [regs[6], regs[7], regs[8]];
        self.pulse2 = [regs[9], regs[10], regs[11]];
        self.saw = [regs[12], regs[13], regs[14]];
        self.prg_ram = ram;
        true
    }
}
