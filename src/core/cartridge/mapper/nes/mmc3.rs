//! MMC3 (mapper 4): eight bank registers behind a select/data pair,
//! PRG-RAM protection and a scanline-clocked IRQ counter.

use crate::core::cartridge::mapper::nes::{ChrStore, PRG_BANK_8K, PRG_RAM_SIZE};
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::cartridge::Mirroring;
use crate::core::state::StateContainer;

const CHR_BANK_1K: usize = 1024;

pub struct Mmc3Mapper<'r> {
    prg: &'r [u8],
    chr: ChrStore<'r>,
    prg_ram: Vec<u8>,
    four_screen: bool,

    bank_select: u8,
    bank_data: [u8; 8],
    prg_offsets: [usize; 4], // resolved 8KB bank bases for $8000/$A000/$C000/$E000
    chr_offsets: [usize; 8], // resolved 1KB bank bases for PPU $0000-$1FFF

    mirroring: Mirroring,
    ram_enabled: bool,
    ram_write_enabled: bool,

    irq_latch: u8,
    irq_counter: u8,
    irq_reload: bool,
    irq_enabled: bool,
    irq_pending: bool,
}

impl<'r> Mmc3Mapper<'r> {
    pub fn new(prg: &'r [u8], chr: Option<&'r [u8]>, four_screen: bool) -> Self {
        let mut mapper = Self {
            prg,
            chr: ChrStore::from_cartridge(chr),
            prg_ram: vec![0; PRG_RAM_SIZE],
            four_screen,
            bank_select: 0,
            bank_data: [0; 8],
            prg_offsets: [0; 4],
            chr_offsets: [0; 8],
            mirroring: if four_screen {
                Mirroring::FourScreen
            } else {
                Mirroring::Vertical
            },
            ram_enabled: false,
            ram_write_enabled: false,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_enabled: false,
            irq_pending: false,
        };
        mapper.update_banks();
        mapper
    }

    fn prg_bank_count(&self) -> usize {
        (self.prg.len() / PRG_BANK_8K).max(1)
    }

    fn update_banks(&mut self) {
        let count = self.prg_bank_count();
        let fix = |bank: usize| (bank % count) * PRG_BANK_8K;

        if self.bank_select & 0x40 == 0 {
            self.prg_offsets[0] = fix(self.bank_data[6] as usize);
            self.prg_offsets[1] = fix(self.bank_data[7] as usize);
        } else {
            // PRG mode 1: penultimate bank fixed at $8000
            self.prg_offsets[0] = fix(count.saturating_sub(2));
            self.prg_offsets[1] = fix(self.bank_data[7] as usize);
        }
        if self.bank_select & 0x40 != 0 {
            self.prg_offsets[2] = fix(self.bank_data[6] as usize);
        } else {
            self.prg_offsets[2] = fix(count.saturating_sub(2));
        }
        self.prg_offsets[3] = fix(count.saturating_sub(1));

        let chr = |bank: usize| bank * CHR_BANK_1K;
        if self.bank_select & 0x80 == 0 {
            // Two 2KB banks low, four 1KB banks high
            self.chr_offsets[0] = chr(self.bank_data[0] as usize & 0xFE);
            self.chr_offsets[1] = chr((self.bank_data[0] as usize & 0xFE) + 1);
            self.chr_offsets[2] = chr(self.bank_data[1] as usize & 0xFE);
            self.chr_offsets[3] = chr((self.bank_data[1] as usize & 0xFE) + 1);
            self.chr_offsets[4] = chr(self.bank_data[2] as usize);
            self.chr_offsets[5] = chr(self.bank_data[3] as usize);
            self.chr_offsets[6] = chr(self.bank_data[4] as usize);
            self.chr_offsets[7] = chr(self.bank_data[5] as usize);
        } else {
            self.chr_offsets[0] = chr(self.bank_data[2] as usize);
            self.chr_offsets[1] = chr(self.bank_data[3] as usize);
            self.chr_offsets[2] = chr(self.bank_data[4] as usize);
            self.chr_offsets[3] = chr(self.bank_data[5] as usize);
            self.chr_offsets[4] = chr(self.bank_data[0] as usize & 0xFE);
            self.chr_offsets[5] = chr((self.bank_data[0] as usize & 0xFE) + 1);
            self.chr_offsets[6] = chr(self.bank_data[1] as usize & 0xFE);
            self.chr_offsets[7] = chr((self.bank_data[1] as usize & 0xFE) + 1);
        }
    }
}

impl<'r> CartridgeMapper for Mmc3Mapper<'r> {
    fn reset(&mut self) {
        self.bank_select = 0;
        self.bank_data = [0; 8];
        self.ram_enabled = false;
        self.ram_write_enabled = false;
        self.irq_latch = 0;
        self.irq_counter = 0;
        self.irq_reload = false;
        self.irq_enabled = false;
        self.irq_pending = false;
        self.update_banks();
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        match address {
            0x6000..=0x7FFF => {
                if !self.ram_enabled {
                    return 0xFF;
                }
                self.prg_ram[(address as usize - 0x6000) % PRG_RAM_SIZE]
            }
            0x8000..=0xFFFF => {
                if self.prg.is_empty() {
                    return 0xFF;
                }
                let slot = ((address as usize - 0x8000) / PRG_BANK_8K) & 0x03;
                let offset = (address as usize - 0x8000) % PRG_BANK_8K;
                self.prg[(self.prg_offsets[slot] + offset) % self.prg.len()]
            }
            _ => 0xFF,
        }
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        if let 0x6000..=0x7FFF = address {
            if self.ram_enabled && self.ram_write_enabled {
                self.prg_ram[(address as usize - 0x6000) % PRG_RAM_SIZE] = value;
            }
            return;
        }
        if address < 0x8000 {
            return;
        }
        match address & 0xE001 {
            0x8000 => {
                self.bank_select = value;
                self.update_banks();
            }
            0x8001 => {
                self.bank_data[(self.bank_select & 0x07) as usize] = value;
                self.update_banks();
            }
            0xA000 => {
                if !self.four_screen {
                    self.mirroring = if value & 0x01 != 0 {
                        Mirroring::Horizontal
                    } else {
                        Mirroring::Vertical
                    };
                }
            }
            0xA001 => {
                self.ram_enabled = value & 0x80 != 0;
                self.ram_write_enabled = value & 0x40 != 0;
            }
            0xC000 => self.irq_latch = value,
            0xC001 => {
                self.irq_counter = 0;
                self.irq_reload = true;
            }
            0xE000 => {
                self.irq_enabled = false;
                self.irq_pending = false;
            }
            0xE001 => self.irq_enabled = true,
            _ => {}
        }
    }

    fn ppu_read(&mut self, address: u32) -> u8 {
        let slot = (address as usize / CHR_BANK_1K) & 0x07;
        let offset = address as usize % CHR_BANK_1K;
        self.chr.read(self.chr_offsets[slot] + offset)
    }

    fn ppu_write(&mut self, address: u32, value: u8) {
        let slot = (address as usize / CHR_BANK_1K) & 0x07;
        let offset = address as usize % CHR_BANK_1K;
        self.chr.write(self.chr_offsets[slot] + offset, value);
    }

    fn scanline(&mut self) {
        if self.irq_reload || self.irq_counter == 0 {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
            if self.irq_counter == 0 && self.irq_enabled {
                self.irq_pending = true;
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
        self.prg_bank_count()
    }

    fn bank_size(&self) -> usize {
        PRG_BANK_8K
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Mmc3
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
        state.register_field("mapper_current_banks", &self.bank_data);
        state.register_field(
            "mapper_regs",
            &[
                self.bank_select,
                self.ram_enabled as u8,
                self.ram_write_enabled as u8,
                self.irq_latch,
                self.irq_counter,
                self.irq_reload as u8,
                self.irq_enabled as u8,
                self.irq_pending as u8,
                matches!(self.mirroring, Mirroring::Horizontal) as u8,
            ],
        );
        state.register_field("mapper_prg_ram", &self.prg_ram);
    }

    fn load_state(&mut self, state: &dyn StateContainer) -> bool {
        let mut kind = [0u8; 1];
        if !state.read_field("mapper_type", &mut kind) || kind[0] != self.kind() as u8 {
            return false;
        }
        let mut banks = [0u8; 8];
        if !state.read_field("mapper_current_banks", &mut banks) {
            return false;
        }
        let mut regs = [0u8; 9];
        if !state.read_field("mapper_regs", &mut regs) {
            return false;
        }
        let mut ram = vec![0u8; PRG_RAM_SIZE];
        if !state.read_field("mapper_prg_ram", &mut ram) {
            return false;
        }
        self.bank_data = banks;
        self.bank_select = regs[0];
        self.ram_enabled = regs[1] != 0;
        self.ram_write_enabled = regs[2] != 0;
        self.irq_latch = regs[3];
        self.irq_counter = regs[4];
        self.irq_reload = regs[5] != 0;
        self.irq_enabled = regs[6] != 0;
        self.irq_pending = regs[7] != 0;
        if !self.four_screen {
            self.mirroring = if regs[8] != 0 {
                Mirroring::Horizontal
            } else {
                Mirroring::Vertical
            };
        }
        self.prg_ram = ram;
        self.update_banks();
        true
    }
}
