//! Mega Drive family mappers.

pub mod codemasters;
pub mod ea;
pub mod eeprom;
pub mod pier_solar;
pub mod plain;
pub mod sega;
pub mod ssf2;
pub mod ssrpg;

pub use codemasters::CodemastersMapper;
pub use ea::EaMapper;
pub use eeprom::EepromMapper;
pub use pier_solar::PierSolarMapper;
pub use plain::PlainMapper;
pub use sega::SegaMapper;
pub use ssf2::Ssf2Mapper;
pub use ssrpg::SsrpgMapper;

/// 512KB bank used by the SSF2-style and Pier Solar bank registers
pub const BANK_512K: usize = 512 * 1024;

/// 16KB bank used by the Codemasters and EA bank registers
pub const BANK_16K: usize = 16 * 1024;
