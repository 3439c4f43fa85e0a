//! Serial EEPROM with an SPI-style command protocol, as found in a few
//! Mega Drive cartridges. The CPU talks to it one byte at a time through
//! the cartridge's EEPROM window.

use log::debug;

/// EEPROM backing store size (8KB)
pub const EEPROM_SIZE: usize = 8 * 1024;

/// Page size for both reads and writes
pub const EEPROM_PAGE_SIZE: usize = 256;

// Commands accepted in the idle state
const CMD_READ: u8 = 0x03;
const CMD_WRITE: u8 = 0x02;
const CMD_WREN: u8 = 0x06;
const CMD_WRDI: u8 = 0x04;
const CMD_RDSR: u8 = 0x05;
const CMD_WRSR: u8 = 0x01;

// Status register bit 0: write in progress
const STATUS_BUSY: u8 = 0x01;

/// Protocol state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EepromState {
    Idle,
    Command,
    Address,
    Data,
    WritePending,
}

/// Serial EEPROM device. Drive it with `write_byte`/`read_byte` from the
/// mapper's window handler and `tick` from the emulation loop.
pub struct SerialEeprom {
    memory: Vec<u8>,
    state: EepromState,
    command: u8,
    address: u16,
    buffer: [u8; EEPROM_PAGE_SIZE],
    buffer_pos: usize,
    write_enabled: bool,
    status: u8,
}

impl SerialEeprom {
    pub fn new() -> Self {
        Self {
            memory: vec![0xFF; EEPROM_SIZE],
            state: EepromState::Idle,
            command: 0,
            address: 0,
            buffer: [0; EEPROM_PAGE_SIZE],
            buffer_pos: 0,
            write_enabled: false,
            status: 0,
        }
    }

    /// Aborts any in-flight transaction. Memory contents are preserved.
    pub fn reset(&mut self) {
        self.state = EepromState::Idle;
        self.command = 0;
        self.address = 0;
        self.buffer_pos = 0;
        self.write_enabled = false;
        self.status = 0;
    }

    pub fn state(&self) -> EepromState {
        self.state
    }

    pub fn is_write_enabled(&self) -> bool {
        self.write_enabled
    }

    /// Feeds one byte from the CPU into the protocol engine.
    pub fn write_byte(&mut self, value: u8) {
        match self.state {
            EepromState::Idle => match value {
                CMD_WREN => {
                    self.write_enabled = true;
                }
                CMD_WRDI => {
                    self.write_enabled = false;
                }
                CMD_RDSR => {
                    self.buffer[0] = self.status;
                    self.buffer_pos = 0;
                    self.command = CMD_RDSR;
                    self.state = EepromState::Data;
                }
                CMD_WRSR => {
                    // Status register is read-only here; swallow the value
                    self.command = CMD_WRSR;
                    self.state = EepromState::Command;
                }
                CMD_READ | CMD_WRITE => {
                    self.command = value;
                    self.state = EepromState::Command;
                }
                _ => {
                    debug!("EEPROM: unknown command 0x{:02X}", value);
                }
            },
            EepromState::Command => {
                if self.command == CMD_WRSR {
                    self.state = EepromState::Idle;
                    return;
                }
                self.address = (value as u16) << 8;
                self.state = EepromState::Address;
            }
            EepromState::Address => {
                self.address |= value as u16;
                self.buffer_pos = 0;
                if self.command == CMD_READ {
                    let start = (self.address as usize) % EEPROM_SIZE;
                    for i in 0..EEPROM_PAGE_SIZE {
                        self.buffer[i] = self.memory[(start + i) % EEPROM_SIZE];
                    }
                }
                self.state = EepromState::Data;
            }
            EepromState::Data => {
                if self.command == CMD_WRITE {
                    if !self.write_enabled {
                        self.state = EepromState::Idle;
                        return;
                    }
                    let addr = (self.address as usize + self.buffer_pos) % EEPROM_SIZE;
                    self.memory[addr] = value;
                    self.buffer_pos += 1;
                    if self.buffer_pos >= EEPROM_PAGE_SIZE {
                        self.status |= STATUS_BUSY;
                        self.state = EepromState::WritePending;
                    }
                }
            }
            EepromState::WritePending => {
                // Busy: incoming bytes are ignored until the write retires
            }
        }
    }

    /// Returns one byte to the CPU.
    pub fn read_byte(&mut self) -> u8 {
        match self.state {
            EepromState::Data if self.command == CMD_READ => {
                let value = self.buffer[self.buffer_pos];
                self.buffer_pos += 1;
                if self.buffer_pos >= EEPROM_PAGE_SIZE {
                    self.state = EepromState::Idle;
                }
                value
            }
            EepromState::Data if self.command == CMD_RDSR => {
                self.state = EepromState::Idle;
                self.status
            }
            EepromState::Idle | EepromState::WritePending => self.status,
            _ => 0xFF,
        }
    }

    /// Advances the internal write timer. A pending page write retires
    /// here, clearing the busy bit and the write-enable latch. A tick
    /// also terminates a partial-page WRITE still in the data phase:
    /// the bytes were committed as they arrived, so the write retires
    /// the same way a full page does.
    pub fn tick(&mut self) {
        if self.state == EepromState::Data && self.command == CMD_WRITE {
            self.state = EepromState::WritePending;
        }
        if self.state == EepromState::WritePending {
            self.status &= !STATUS_BUSY;
            self.write_enabled = false;
            self.state = EepromState::Idle;
        }
    }

    /// Raw memory contents, for save states and persistence
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn set_memory(&mut self, data: &[u8]) {
        let count = data.len().min(self.memory.len());
        self.memory[..count].copy_from_slice(&data[..count]);
    }

    /// Packs the protocol state into a fixed-size blob for save states
    pub fn pack_state(&self) -> [u8; 8] {
        let state = match self.state {
            EepromState::Idle => 0,
            EepromState::Command => 1,
            EepromState::Address => 2,
            EepromState::Data => 3,
            EepromState::WritePending => 4,
        };
        [
            state,
            self.command,
            (self.address >> 8) as u8,
            self.address as u8,
            (self.buffer_pos >> 8) as u8,
            self.buffer_pos as u8,
            self.write_enabled as u8,
            self.status,
        ]
    }

    pub fn unpack_state(&mut self, blob: &[u8; 8]) {
        self.state = match blob[0] {
            1 => EepromState::Command,
            2 => EepromState::Address,
            3 => EepromState::Data,
            4 => EepromState::WritePending,
            _ => EepromState::Idle,
        };
        self.command = blob[1];
        self.address = ((blob[2] as u16) << 8) | blob[3] as u16;
        self.buffer_pos = (((blob[4] as usize) << 8) | blob[5] as usize) % EEPROM_PAGE_SIZE;
        self.write_enabled = blob[6] != 0;
        self.status = blob[7];

        // The page buffer is derived state: a READ in flight refills it
        // from memory, an RDSR holds the status byte. Call after memory
        // contents have been restored.
        if self.state == EepromState::Data {
            match self.command {
                CMD_READ => {
                    let start = (self.address as usize) % EEPROM_SIZE;
                    for i in 0..EEPROM_PAGE_SIZE {
                        self.buffer[i] = self.memory[(start + i) % EEPROM_SIZE];
                    }
                }
                CMD_RDSR => {
                    self.buffer[0] = self.status;
                }
                _ => {}
            }
        }
    }
}

impl Default for SerialEeprom {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_page(eeprom: &mut SerialEeprom, address: u16, fill: u8) {
        eeprom.write_byte(CMD_WREN);
        eeprom.write_byte(CMD_WRITE);
        eeprom.write_byte((address >> 8) as u8);
        eeprom.write_byte(address as u8);
        for i in 0..EEPROM_PAGE_SIZE {
            eeprom.write_byte(fill.wrapping_add(i as u8));
        }
    }

    #[test]
    fn test_write_requires_wren() {
        let mut eeprom = SerialEeprom::new();
        eeprom.write_byte(CMD_WRITE);
        eeprom.write_byte(0x00);
        eeprom.write_byte(0x00);
        eeprom.write_byte(0x42);
        // Without WREN the data byte bounces the machine back to idle
        assert_eq!(eeprom.state(), EepromState::Idle);
        assert_eq!(eeprom.memory()[0], 0xFF);
    }

    #[test]
    fn test_page_write_then_read_round_trip() {
        let mut eeprom = SerialEeprom::new();
        write_page(&mut eeprom, 0x0100, 0x10);
        assert_eq!(eeprom.state(), EepromState::WritePending);
        eeprom.tick();
        assert_eq!(eeprom.state(), EepromState::Idle);

        eeprom.write_byte(CMD_READ);
        eeprom.write_byte(0x01);
        eeprom.write_byte(0x00);
        for i in 0..EEPROM_PAGE_SIZE {
            assert_eq!(eeprom.read_byte(), 0x10u8.wrapping_add(i as u8));
        }
        assert_eq!(eeprom.state(), EepromState::Idle);
    }

    #[test]
    fn test_busy_bit_set_until_tick() {
        let mut eeprom = SerialEeprom::new();
        write_page(&mut eeprom, 0x0000, 0xAA);
        // Status reads report busy while the write is pending
        assert_eq!(eeprom.read_byte() & STATUS_BUSY, STATUS_BUSY);
        eeprom.tick();
        eeprom.write_byte(CMD_RDSR);
        assert_eq!(eeprom.read_byte() & STATUS_BUSY, 0);
        // WREN latch cleared by the completed write
        assert!(!eeprom.is_write_enabled());
    }

    #[test]
    fn test_single_byte_write_round_trip() {
        let mut eeprom = SerialEeprom::new();
        eeprom.write_byte(CMD_WREN);
        eeprom.write_byte(CMD_WRITE);
        eeprom.write_byte(0x00);
        eeprom.write_byte(0x20);
        eeprom.write_byte(0x42);
        // Deselect after one data byte ends the transaction
        eeprom.tick();
        assert_eq!(eeprom.state(), EepromState::Idle);
        assert!(!eeprom.is_write_enabled());

        eeprom.write_byte(CMD_READ);
        eeprom.write_byte(0x00);
        eeprom.write_byte(0x20);
        assert_eq!(eeprom.read_byte(), 0x42);
    }

    #[test]
    fn test_state_restore_mid_read_keeps_streaming() {
        let mut eeprom = SerialEeprom::new();
        write_page(&mut eeprom, 0x0000, 0x00);
        eeprom.tick();

        // Start a READ and consume the first four bytes
        eeprom.write_byte(CMD_READ);
        eeprom.write_byte(0x00);
        eeprom.write_byte(0x00);
        for i in 0..4 {
            assert_eq!(eeprom.read_byte(), i as u8);
        }
        let blob = eeprom.pack_state();

        let mut restored = SerialEeprom::new();
        restored.set_memory(eeprom.memory());
        restored.unpack_state(&blob);
        for i in 4..EEPROM_PAGE_SIZE {
            assert_eq!(restored.read_byte(), i as u8);
        }
        assert_eq!(restored.state(), EepromState::Idle);
    }

    #[test]
    fn test_wrdi_clears_write_enable() {
        let mut eeprom = SerialEeprom::new();
        eeprom.write_byte(CMD_WREN);
        assert!(eeprom.is_write_enabled());
        eeprom.write_byte(CMD_WRDI);
        assert!(!eeprom.is_write_enabled());
    }

    #[test]
    fn test_state_pack_round_trip() {
        let mut eeprom = SerialEeprom::new();
        eeprom.write_byte(CMD_WREN);
        eeprom.write_byte(CMD_WRITE);
        eeprom.write_byte(0x02);
        eeprom.write_byte(0x40);
        eeprom.write_byte(0x01);
        let blob = eeprom.pack_state();

        let mut restored = SerialEeprom::new();
        restored.unpack_state(&blob);
        assert_eq!(restored.state(), EepromState::Data);
        assert!(restored.is_write_enabled());
    }
}
