//! Regiões do espaço de endereçamento.
//! Cada região é servida por um buffer próprio ou por callbacks de dispositivo.

use bitflags::bitflags;

bitflags! {
    /// Flags de acesso de uma região
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RegionFlags: u8 {
        const READ  = 0b0000_0001;
        const WRITE = 0b0000_0010;
        /// Buffer alocado pelo próprio espaço de endereçamento
        const OWNED = 0b0000_0100;
    }
}

/// Callbacks de dispositivo, por largura de acesso.
/// Todos recebem o offset relativo ao início da região, nunca o endereço bruto.
#[derive(Default)]
pub struct DeviceHandlers<'a> {
    pub read8: Option<Box<dyn FnMut(u32) -> u8 + 'a>>,
    pub read16: Option<Box<dyn FnMut(u32) -> u16 + 'a>>,
    pub read32: Option<Box<dyn FnMut(u32) -> u32 + 'a>>,
    pub write8: Option<Box<dyn FnMut(u32, u8) + 'a>>,
    pub write16: Option<Box<dyn FnMut(u32, u16) + 'a>>,
    pub write32: Option<Box<dyn FnMut(u32, u32) + 'a>>,
}

impl<'a> std::fmt::Debug for DeviceHandlers<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandlers")
            .field("read8", &self.read8.is_some())
            .field("read16", &self.read16.is_some())
            .field("read32", &self.read32.is_some())
            .field("write8", &self.write8.is_some())
            .field("write16", &self.write16.is_some())
            .field("write32", &self.write32.is_some())
            .finish()
    }
}

/// Armazenamento de uma região
pub enum Backing<'a> {
    /// Buffer de bytes pertencente à região
    Buffer(Vec<u8>),
    /// Região servida por callbacks de dispositivo
    Device(DeviceHandlers<'a>),
}

impl<'a> Backing<'a> {
    pub fn is_buffer(&self) -> bool {
        matches!(self, Backing::Buffer(_))
    }
}

/// Região contígua do espaço de endereçamento
pub struct Region<'a> {
    pub start: u32,
    pub size: u32,
    pub flags: RegionFlags,
    pub backing: Backing<'a>,
}

impl<'a> Region<'a> {
    /// Verifica se a região contém um endereço
    pub fn contains(&self, address: u32) -> bool {
        address >= self.start && address - self.start < self.size
    }

    /// Testa sobreposição com o intervalo [start, start+size)
    pub fn overlaps(&self, start: u32, size: u32) -> bool {
        start < self.start.wrapping_add(self.size) && self.start < start.wrapping_add(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_contains() {
        let region = Region {
            start: 0x1000,
            size: 0x100,
            flags: RegionFlags::READ,
            backing: Backing::Buffer(vec![0; 0x100]),
        };
        assert!(region.contains(0x1000));
        assert!(region.contains(0x10FF));
        assert!(!region.contains(0x0FFF));
        assert!(!region.contains(0x1100));
    }

    #[test]
    fn test_region_overlap() {
        let region = Region {
            start: 0x1000,
            size: 0x100,
            flags: RegionFlags::READ,
            backing: Backing::Buffer(vec![0; 0x100]),
        };
        assert!(region.overlaps(0x1080, 0x100));
        assert!(region.overlaps(0x0F80, 0x100));
        assert!(!region.overlaps(0x1100, 0x100));
        assert!(!region.overlaps(0x0000, 0x1000));
    }
}
