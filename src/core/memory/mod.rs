//! Sistema de memória genérico.
//! Gerencia o espaço de endereçamento de 32-bit dividido em regiões,
//! roteando acessos da CPU e do chip de vídeo para buffers ou dispositivos.

pub mod bus;
pub mod region;
pub mod sram;

// Re-exportações para facilitar o uso
pub use bus::AddressSpace;
pub use region::{Backing, DeviceHandlers, Region, RegionFlags};
pub use sram::BackupRam;

/// Número máximo de regiões em um espaço de endereçamento
pub const MAX_REGIONS: usize = 32;

/// Valores de preenchimento para acessos inválidos
pub const FILL_8: u8 = 0xFF;
pub const FILL_16: u16 = 0xFFFF;
pub const FILL_32: u32 = 0xFFFF_FFFF;

/// Erros do sistema de memória
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    NotInitialized,
    InvalidRegion,
    RegionOverlap,
    TooManyRegions,
    AddressWrap,
    RegionNotFound,
    InvalidCartridge,
    SaveError,
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryError::NotInitialized => write!(f, "memory system not initialized"),
            MemoryError::InvalidRegion => write!(f, "invalid region parameters"),
            MemoryError::RegionOverlap => write!(f, "region overlaps an existing region"),
            MemoryError::TooManyRegions => write!(f, "maximum number of regions reached"),
            MemoryError::AddressWrap => write!(f, "region wraps the 32-bit address space"),
            MemoryError::RegionNotFound => write!(f, "no region at the given address"),
            MemoryError::InvalidCartridge => write!(f, "invalid cartridge data"),
            MemoryError::SaveError => write!(f, "persistence operation failed"),
        }
    }
}

impl std::error::Error for MemoryError {}

/// Tipo de resultado para operações de memória
pub type MemoryResult<T> = Result<T, MemoryError>;
