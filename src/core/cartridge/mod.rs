//! Cartridge support: ROM images, bank-switching mappers and serial EEPROM.

pub mod eeprom;
pub mod mapper;

/// ROM image handed to a mapper. The ROM is borrowed for the mapper's
/// lifetime; writable storage (SRAM, EEPROM, CHR-RAM) is owned by the
/// mapper itself.
pub enum CartridgeRom<'r> {
    /// Mega Drive family: a single linear ROM
    MegaDrive { rom: &'r [u8] },
    /// NES family: PRG-ROM plus optional CHR-ROM.
    /// `chr: None` means the cartridge carries CHR-RAM instead.
    Nes {
        prg: &'r [u8],
        chr: Option<&'r [u8]>,
        mirroring: Mirroring,
    },
}

impl<'r> CartridgeRom<'r> {
    /// Size of the primary (CPU-visible) ROM in bytes
    pub fn rom_size(&self) -> usize {
        match self {
            CartridgeRom::MegaDrive { rom } => rom.len(),
            CartridgeRom::Nes { prg, .. } => prg.len(),
        }
    }
}

/// Nametable mirroring reported by NES mappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    SingleScreenLow,
    SingleScreenHigh,
    FourScreen,
}

impl std::fmt::Display for Mirroring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mirroring::Horizontal => "Horizontal",
            Mirroring::Vertical => "Vertical",
            Mirroring::SingleScreenLow => "Single-screen (low)",
            Mirroring::SingleScreenHigh => "Single-screen (high)",
            Mirroring::FourScreen => "Four-screen",
        };
        write!(f, "{}", name)
    }
}
