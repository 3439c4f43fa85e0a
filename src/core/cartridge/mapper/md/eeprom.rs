//! EEPROM-backed mapper: a serial EEPROM exposed byte-wide through the
//! 0x200000-0x201FFF cartridge window.

use crate::core::cartridge::eeprom::{SerialEeprom, EEPROM_SIZE};
use crate::core::cartridge::mapper::{CartridgeMapper, MapperKind};
use crate::core::state::StateContainer;

const EEPROM_WINDOW_START: u32 = 0x20_0000;
const EEPROM_WINDOW_END: u32 = 0x20_1FFF;

pub struct EepromMapper<'r> {
    rom: &'r [u8],
    eeprom: SerialEeprom,
}

impl<'r> EepromMapper<'r> {
    pub fn new(rom: &'r [u8]) -> Self {
        Self {
            rom,
            eeprom: SerialEeprom::new(),
        }
    }

    pub fn eeprom(&self) -> &SerialEeprom {
        &self.eeprom
    }

    pub fn eeprom_mut(&mut self) -> &mut SerialEeprom {
        &mut self.eeprom
    }
}

impl<'r> CartridgeMapper for EepromMapper<'r> {
    fn reset(&mut self) {
        self.eeprom.reset();
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        if (EEPROM_WINDOW_START..=EEPROM_WINDOW_END).contains(&address) {
            return self.eeprom.read_byte();
        }
        if self.rom.is_empty() {
            return 0xFF;
        }
        self.rom[address as usize % self.rom.len()]
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        if (EEPROM_WINDOW_START..=EEPROM_WINDOW_END).contains(&address) {
            self.eeprom.write_byte(value);
        }
    }

    fn tick(&mut self, _cycles: u32) {
        self.eeprom.tick();
    }

    fn num_banks(&self) -> usize {
        1
    }

    fn bank_size(&self) -> usize {
        self.rom.len()
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Eeprom
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field("mapper_type", &[self.kind() as u8]);
        state.register_field("mapper_eeprom_data", self.eeprom.memory());
        state.register_field("mapper_eeprom_state", &self.eeprom.pack_state());
    }

    fn load_state(&mut self, state: &dyn StateContainer) -> bool {
        let mut kind = [0u8; 1];
        if !state.read_field("mapper_type", &mut kind) || kind[0] != self.kind() as u8 {
            return false;
        }
        let mut data = vec![0u8; EEPROM_SIZE];
        if !state.read_field("mapper_eeprom_data", &mut data) {
            return false;
        }
        let mut blob = [0u8; 8];
        if !state.read_field("mapper_eeprom_state", &mut blob) {
            return false;
        }
        self.eeprom.set_memory(&data);
        self.eeprom.unpack_state(&blob);
        true
    }
}
