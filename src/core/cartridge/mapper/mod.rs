//! Cartridge mapper engine.
//!
//! Every supported board implements [`CartridgeMapper`]; [`Mapper`] is
//! the closed set of boards a cartridge can resolve to.

pub mod detect;
pub mod md;
pub mod nes;

use crate::core::cartridge::{CartridgeRom, Mirroring};
use crate::core::memory::{MemoryError, MemoryResult};
use crate::core::state::StateContainer;
use log::info;

use md::{
    CodemastersMapper, EaMapper, EepromMapper, PierSolarMapper, PlainMapper, SegaMapper,
    Ssf2Mapper, SsrpgMapper,
};
use nes::{
    AoromMapper, CamericaMapper, CnromMapper, ColorDreamsMapper, Mmc1Mapper, Mmc2Mapper,
    Mmc3Mapper, Mmc4Mapper, Mmc5Mapper, NromMapper, UxromMapper, Vrc6Mapper,
};

/// Supported board types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MapperKind {
    // Mega Drive family
    Plain = 0,
    Sega = 1,
    Ssf2 = 2,
    Ssrpg = 3,
    Eeprom = 4,
    Codemasters = 5,
    Ea = 6,
    PierSolar = 7,
    // NES family
    Nrom = 16,
    Mmc1 = 17,
    Uxrom = 18,
    Cnrom = 19,
    Mmc3 = 20,
    Mmc5 = 21,
    Aorom = 22,
    Mmc2 = 23,
    Mmc4 = 24,
    ColorDreams = 25,
    Camerica = 26,
    Vrc6 = 27,
}

impl MapperKind {
    pub fn is_mega_drive(&self) -> bool {
        (*self as u8) < 16
    }
}

impl std::fmt::Display for MapperKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MapperKind::Plain => "Plain ROM",
            MapperKind::Sega => "Sega",
            MapperKind::Ssf2 => "Sega SSF2",
            MapperKind::Ssrpg => "Sega RPG",
            MapperKind::Eeprom => "Serial EEPROM",
            MapperKind::Codemasters => "Codemasters",
            MapperKind::Ea => "Electronic Arts",
            MapperKind::PierSolar => "Pier Solar",
            MapperKind::Nrom => "NROM",
            MapperKind::Mmc1 => "MMC1",
            MapperKind::Uxrom => "UxROM",
            MapperKind::Cnrom => "CNROM",
            MapperKind::Mmc3 => "MMC3",
            MapperKind::Mmc5 => "MMC5",
            MapperKind::Aorom => "AOROM",
            MapperKind::Mmc2 => "MMC2",
            MapperKind::Mmc4 => "MMC4",
            MapperKind::ColorDreams => "Color Dreams",
            MapperKind::Camerica => "Camerica",
            MapperKind::Vrc6 => "VRC6",
        };
        write!(f, "{}", name)
    }
}

/// Behavior every cartridge board implements. NES-only hooks (PPU bus,
/// scanline clock, IRQ line) have neutral defaults so Mega Drive boards
/// only implement the CPU side.
pub trait CartridgeMapper {
    /// Returns the board to its power-on register state
    fn reset(&mut self);

    /// Read from the CPU-visible cartridge space
    fn cpu_read(&mut self, address: u32) -> u8;

    /// Write to the CPU-visible cartridge space
    fn cpu_write(&mut self, address: u32, value: u8);

    /// Read from the PPU-visible CHR space
    fn ppu_read(&mut self, _address: u32) -> u8 {
        0xFF
    }

    /// Write to the PPU-visible CHR space
    fn ppu_write(&mut self, _address: u32, _value: u8) {}

    /// Clocked once per rendered scanline
    fn scanline(&mut self) {}

    /// Clocked with elapsed CPU cycles
    fn tick(&mut self, _cycles: u32) {}

    fn irq_pending(&self) -> bool {
        false
    }

    fn irq_clear(&mut self) {}

    fn mirroring(&self) -> Mirroring {
        Mirroring::Horizontal
    }

    /// Number of switchable banks the board exposes
    fn num_banks(&self) -> usize;

    /// Size of one switchable bank in bytes
    fn bank_size(&self) -> usize;

    fn kind(&self) -> MapperKind;

    fn save_state(&self, state: &mut dyn StateContainer);

    /// Restores from a save state. Returns false if the stored fields
    /// are missing, malformed or belong to a different board.
    fn load_state(&mut self, state: &dyn StateContainer) -> bool;
}

/// A concrete cartridge board.
pub enum Mapper<'r> {
    Plain(PlainMapper<'r>),
    Sega(SegaMapper<'r>),
    Ssf2(Ssf2Mapper<'r>),
    Ssrpg(SsrpgMapper<'r>),
    Eeprom(EepromMapper<'r>),
    Codemasters(CodemastersMapper<'r>),
    Ea(EaMapper<'r>),
    PierSolar(PierSolarMapper<'r>),
    Nrom(NromMapper<'r>),
    Mmc1(Mmc1Mapper<'r>),
    Uxrom(UxromMapper<'r>),
    Cnrom(CnromMapper<'r>),
    Mmc3(Mmc3Mapper<'r>),
    Mmc5(Mmc5Mapper<'r>),
    Aorom(AoromMapper<'r>),
    Mmc2(Mmc2Mapper<'r>),
    Mmc4(Mmc4Mapper<'r>),
    ColorDreams(ColorDreamsMapper<'r>),
    Camerica(CamericaMapper<'r>),
    Vrc6(Vrc6Mapper<'r>),
}

impl<'r> Mapper<'r> {
    /// Builds the board for `kind` over the given cartridge image.
    /// Fails if the board family does not match the image family.
    pub fn create(kind: MapperKind, cartridge: CartridgeRom<'r>) -> MemoryResult<Self> {
        info!("Criando mapper: {}", kind);
        match cartridge {
            CartridgeRom::MegaDrive { rom } => {
                let mapper = match kind {
                    MapperKind::Plain => Mapper::Plain(PlainMapper::new(rom)),
                    MapperKind::Sega => Mapper::Sega(SegaMapper::new(rom)),
                    MapperKind::Ssf2 => Mapper::Ssf2(Ssf2Mapper::new(rom)),
                    MapperKind::Ssrpg => Mapper::Ssrpg(SsrpgMapper::new(rom)),
                    MapperKind::Eeprom => Mapper::Eeprom(EepromMapper::new(rom)),
                    MapperKind::Codemasters => {
                        Mapper::Codemasters(CodemastersMapper::new(rom))
                    }
                    MapperKind::Ea => Mapper::Ea(EaMapper::new(rom)),
                    MapperKind::PierSolar => Mapper::PierSolar(PierSolarMapper::new(rom)),
                    _ => return Err(MemoryError::InvalidCartridge),
                };
                Ok(mapper)
            }
            CartridgeRom::Nes {
                prg,
                chr,
                mirroring,
            } => {
                let mapper = match kind {
                    MapperKind::Nrom => Mapper::Nrom(NromMapper::new(prg, chr, mirroring)),
                    MapperKind::Mmc1 => Mapper::Mmc1(Mmc1Mapper::new(prg, chr)),
                    MapperKind::Uxrom => {
                        Mapper::Uxrom(UxromMapper::new(prg, chr, mirroring))
                    }
                    MapperKind::Cnrom => {
                        Mapper::Cnrom(CnromMapper::new(prg, chr, mirroring))
                    }
                    MapperKind::Mmc3 => Mapper::Mmc3(Mmc3Mapper::new(
                        prg,
                        chr,
                        mirroring == Mirroring::FourScreen,
                    )),
                    MapperKind::Mmc5 => Mapper::Mmc5(Mmc5Mapper::new(prg, chr)),
                    MapperKind::Aorom => Mapper::Aorom(AoromMapper::new(prg, chr)),
                    MapperKind::Mmc2 => Mapper::Mmc2(Mmc2Mapper::new(prg, chr)),
                    MapperKind::Mmc4 => Mapper::Mmc4(Mmc4Mapper::new(prg, chr)),
                    MapperKind::ColorDreams => {
                        Mapper::ColorDreams(ColorDreamsMapper::new(prg, chr, mirroring))
                    }
                    MapperKind::Camerica => {
                        Mapper::Camerica(CamericaMapper::new(prg, chr, mirroring))
                    }
                    MapperKind::Vrc6 => Mapper::Vrc6(Vrc6Mapper::new(prg, chr)),
                    _ => return Err(MemoryError::InvalidCartridge),
                };
                Ok(mapper)
            }
        }
    }

    /// Detects the board from a Mega Drive ROM and builds it.
    pub fn from_md_rom(rom: &'r [u8]) -> MemoryResult<Self> {
        let kind = detect::detect_md_mapper(rom);
        Self::create(kind, CartridgeRom::MegaDrive { rom })
    }

    fn inner(&self) -> &dyn CartridgeMapper {
        match self {
            Mapper::Plain(m) => m,
            Mapper::Sega(m) => m,
            Mapper::Ssf2(m) => m,
            Mapper::Ssrpg(m) => m,
            Mapper::Eeprom(m) => m,
            Mapper::Codemasters(m) => m,
            Mapper::Ea(m) => m,
            Mapper::PierSolar(m) => m,
            Mapper::Nrom(m) => m,
            Mapper::Mmc1(m) => m,
            Mapper::Uxrom(m) => m,
            Mapper::Cnrom(m) => m,
            Mapper::Mmc3(m) => m,
            Mapper::Mmc5(m) => m,
            Mapper::Aorom(m) => m,
            Mapper::Mmc2(m) => m,
            Mapper::Mmc4(m) => m,
            Mapper::ColorDreams(m) => m,
            Mapper::Camerica(m) => m,
            Mapper::Vrc6(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn CartridgeMapper {
        match self {
            Mapper::Plain(m) => m,
            Mapper::Sega(m) => m,
            Mapper::Ssf2(m) => m,
            Mapper::Ssrpg(m) => m,
            Mapper::Eeprom(m) => m,
            Mapper::Codemasters(m) => m,
            Mapper::Ea(m) => m,
            Mapper::PierSolar(m) => m,
            Mapper::Nrom(m) => m,
            Mapper::Mmc1(m) => m,
            Mapper::Uxrom(m) => m,
            Mapper::Cnrom(m) => m,
            Mapper::Mmc3(m) => m,
            Mapper::Mmc5(m) => m,
            Mapper::Aorom(m) => m,
            Mapper::Mmc2(m) => m,
            Mapper::Mmc4(m) => m,
            Mapper::ColorDreams(m) => m,
            Mapper::Camerica(m) => m,
            Mapper::Vrc6(m) => m,
        }
    }
}

impl<'r> CartridgeMapper for Mapper<'r> {
    fn reset(&mut self) {
        self.inner_mut().reset();
    }

    fn cpu_read(&mut self, address: u32) -> u8 {
        self.inner_mut().cpu_read(address)
    }

    fn cpu_write(&mut self, address: u32, value: u8) {
        self.inner_mut().cpu_write(address, value);
    }

    fn ppu_read(&mut self, address: u32) -> u8 {
        self.inner_mut().ppu_read(address)
    }

    fn ppu_write(&mut self, address: u32, value: u8) {
        self.inner_mut().ppu_write(address, value);
    }

    fn scanline(&mut self) {
        self.inner_mut().scanline();
    }

    fn tick(&mut self, cycles: u32) {
        self.inner_mut().tick(cycles);
    }

    fn irq_pending(&self) -> bool {
        self.inner().irq_pending()
    }

    fn irq_clear(&mut self) {
        self.inner_mut().irq_clear();
    }

    fn mirroring(&self) -> Mirroring {
        self.inner().mirroring()
    }

    fn num_banks(&self) -> usize {
        self.inner().num_banks()
    }

    fn bank_size(&self) -> usize {
        self.inner().bank_size()
    }

    fn kind(&self) -> MapperKind {
        self.inner().kind()
    }

    fn save_state(&self, state: &mut dyn StateContainer) {
        state.register_field(
            "mapper_num_banks",
            &(self.num_banks() as u32).to_le_bytes(),
        );
        state.register_field(
            "mapper_bank_size",
            &(self.bank_size() as u32).to_le_bytes(),
        );
        self.inner().save_state(state);
    }

    fn load_state(&mut self, state: &dyn StateContainer) -> bool {
        // Geometry mismatch means the state came from another cartridge
        let mut banks = [0u8; 4];
        if state.read_field("mapper_num_banks", &mut banks)
            && u32::from_le_bytes(banks) as usize != self.num_banks()
        {
            return false;
        }
        self.inner_mut().load_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rejects_family_mismatch() {
        let rom = vec![0u8; 0x1000];
        let result = Mapper::create(MapperKind::Nrom, CartridgeRom::MegaDrive { rom: &rom });
        assert!(matches!(result, Err(MemoryError::InvalidCartridge)));

        let result = Mapper::create(
            MapperKind::Sega,
            CartridgeRom::Nes {
                prg: &rom,
                chr: None,
                mirroring: Mirroring::Vertical,
            },
        );
        assert!(matches!(result, Err(MemoryError::InvalidCartridge)));
    }

    #[test]
    fn test_detected_mapper_end_to_end() {
        // 4MB+ ROM with SEGA header resolves to the SSF2 board
        let mut rom = vec![0u8; 4 * 1024 * 1024 + 0x1000];
        for (i, chunk) in rom.chunks_mut(512 * 1024).enumerate() {
            chunk.fill(i as u8);
        }
        rom[0x100..0x104].copy_from_slice(b"SEGA");
        rom[0x18E] = 0;
        rom[0x18F] = 0;
        let mut mapper = Mapper::from_md_rom(&rom).unwrap();
        assert_eq!(mapper.kind(), MapperKind::Ssf2);
        assert_eq!(mapper.num_banks(), 8);
        assert_eq!(mapper.bank_size(), 512 * 1024);
        // Map bank 7 into slot 0
        mapper.cpu_write(0xA1_3000, 0x07);
        assert_eq!(mapper.cpu_read(0), rom[7 * 512 * 1024]);
    }

    #[test]
    fn test_save_state_records_bank_geometry() {
        use crate::core::state::MemoryStateContainer;

        let rom = vec![0u8; 2 * 512 * 1024];
        let mut mapper =
            Mapper::create(MapperKind::Ssf2, CartridgeRom::MegaDrive { rom: &rom }).unwrap();
        mapper.cpu_write(0xA1_3000, 0x01);

        let mut state = MemoryStateContainer::new();
        mapper.save_state(&mut state);
        assert!(state.contains("mapper_num_banks"));
        assert!(state.contains("mapper_bank_size"));

        let mut restored =
            Mapper::create(MapperKind::Ssf2, CartridgeRom::MegaDrive { rom: &rom }).unwrap();
        assert!(restored.load_state(&state));
        assert_eq!(restored.cpu_read(0), mapper.cpu_read(0));

        // A differently sized cartridge rejects the state
        let small = vec![0u8; 512 * 1024];
        let mut other =
            Mapper::create(MapperKind::Ssf2, CartridgeRom::MegaDrive { rom: &small }).unwrap();
        assert!(!other.load_state(&state));
    }

    #[test]
    fn test_family_helper() {
        assert!(MapperKind::Ssf2.is_mega_drive());
        assert!(!MapperKind::Mmc3.is_mega_drive());
    }
}
