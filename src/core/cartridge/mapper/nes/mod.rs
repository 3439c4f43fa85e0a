//! NES family mappers.

pub mod aorom;
pub mod camerica;
pub mod cnrom;
pub mod color_dreams;
pub mod mmc1;
pub mod mmc2;
pub mod mmc3;
pub mod mmc5;
pub mod nrom;
pub mod uxrom;
pub mod vrc6;

pub use aorom::AoromMapper;
pub use camerica::CamericaMapper;
pub use cnrom::CnromMapper;
pub use color_dreams::ColorDreamsMapper;
pub use mmc1::Mmc1Mapper;
pub use mmc2::{Mmc2Mapper, Mmc4Mapper};
pub use mmc3::Mmc3Mapper;
pub use mmc5::Mmc5Mapper;
pub use nrom::NromMapper;
pub use uxrom::UxromMapper;
pub use vrc6::Vrc6Mapper;

/// 16KB PRG bank
pub const PRG_BANK_16K: usize = 16 * 1024;
/// 8KB PRG bank
pub const PRG_BANK_8K: usize = 8 * 1024;
/// 8KB CHR space
pub const CHR_SIZE_8K: usize = 8 * 1024;
/// PRG-RAM size at $6000-$7FFF
pub const PRG_RAM_SIZE: usize = 8 * 1024;

/// CHR storage: either borrowed CHR-ROM or owned CHR-RAM.
pub enum ChrStore<'r> {
    Rom(&'r [u8]),
    Ram(Vec<u8>),
}

impl<'r> ChrStore<'r> {
    /// Builds from the cartridge image: CHR-ROM when present, otherwise
    /// 8KB of CHR-RAM.
    pub fn from_cartridge(chr: Option<&'r [u8]>) -> Self {
        match chr {
            Some(rom) => ChrStore::Rom(rom),
            None => ChrStore::Ram(vec![0; CHR_SIZE_8K]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ChrStore::Rom(rom) => rom.len(),
            ChrStore::Ram(ram) => ram.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_ram(&self) -> bool {
        matches!(self, ChrStore::Ram(_))
    }

    /// Reads through a banked index, wrapping at the store size.
    pub fn read(&self, index: usize) -> u8 {
        match self {
            ChrStore::Rom(rom) => {
                if rom.is_empty() {
                    0xFF
                } else {
                    rom[index % rom.len()]
                }
            }
            ChrStore::Ram(ram) => {
                if ram.is_empty() {
                    0xFF
                } else {
                    ram[index % ram.len()]
                }
            }
        }
    }

    /// Writes to CHR-RAM. Silently ignored on CHR-ROM.
    pub fn write(&mut self, index: usize, value: u8) {
        if let ChrStore::Ram(ram) = self {
            if !ram.is_empty() {
                let len = ram.len();
                ram[index % len] = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chr_rom_ignores_writes() {
        let chr = [1u8, 2, 3, 4];
        let mut store = ChrStore::from_cartridge(Some(&chr));
        store.write(0, 0xFF);
        assert_eq!(store.read(0), 1);
    }

    #[test]
    fn test_chr_ram_allocated_when_rom_absent() {
        let mut store = ChrStore::from_cartridge(None);
        assert!(store.is_ram());
        assert_eq!(store.len(), CHR_SIZE_8K);
        store.write(0x100, 0xAB);
        assert_eq!(store.read(0x100), 0xAB);
    }
}
