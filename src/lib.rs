//! Núcleo de emulação de barramento de memória e mappers de cartucho
//! para consoles de 8/16-bit (família NES e família Mega Drive).

pub mod core;

pub use crate::core::cartridge::mapper::{CartridgeMapper, Mapper, MapperKind};
pub use crate::core::cartridge::{CartridgeRom, Mirroring};
pub use crate::core::memory::bus::AddressSpace;
pub use crate::core::memory::sram::BackupRam;
pub use crate::core::memory::{MemoryError, MemoryResult};
pub use crate::core::state::{MemoryStateContainer, StateContainer};
