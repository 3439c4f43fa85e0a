//! Barramento de memória principal - funções READ/WRITE.
//! Este é o núcleo do sistema de memória, chamado pela CPU e pelo chip de vídeo.

use crate::core::memory::region::{Backing, DeviceHandlers, Region, RegionFlags};
use crate::core::memory::{MemoryError, MemoryResult, FILL_16, FILL_32, FILL_8, MAX_REGIONS};
use log::warn;

/// Espaço de endereçamento dividido em regiões não sobrepostas.
/// Acessos fora de qualquer região, desalinhados ou na direção errada
/// devolvem o valor de preenchimento (leituras) ou são descartados (escritas).
pub struct AddressSpace<'a> {
    regions: Vec<Region<'a>>,
    initialized: bool,
}

impl<'a> AddressSpace<'a> {
    /// Cria um novo espaço de endereçamento (ainda não inicializado)
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            initialized: false,
        }
    }

    /// Inicializa o espaço de endereçamento
    pub fn init(&mut self) {
        self.regions.clear();
        self.initialized = true;
    }

    /// Desliga o espaço de endereçamento, liberando todas as regiões.
    /// Idempotente.
    pub fn shutdown(&mut self) {
        self.regions.clear();
        self.initialized = false;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    /// Adiciona uma nova região de memória.
    /// Falha sem alterar o estado se os parâmetros forem inválidos,
    /// se a capacidade estiver esgotada ou se houver sobreposição.
    pub fn add_region(
        &mut self,
        start: u32,
        size: u32,
        flags: RegionFlags,
        backing: Backing<'a>,
    ) -> MemoryResult<()> {
        if !self.initialized {
            return Err(MemoryError::NotInitialized);
        }
        if size == 0 {
            return Err(MemoryError::InvalidRegion);
        }
        if start.checked_add(size).is_none() {
            return Err(MemoryError::AddressWrap);
        }
        if let Backing::Buffer(data) = &backing {
            if data.len() != size as usize {
                return Err(MemoryError::InvalidRegion);
            }
        }
        if self.regions.len() >= MAX_REGIONS {
            return Err(MemoryError::TooManyRegions);
        }

        // Verificar sobreposição com regiões existentes
        for region in &self.regions {
            if region.overlaps(start, size) {
                warn!(
                    "Sobreposição detectada: 0x{:08X}+0x{:X} com região 0x{:08X}",
                    start, size, region.start
                );
                return Err(MemoryError::RegionOverlap);
            }
        }

        self.regions.push(Region {
            start,
            size,
            flags,
            backing,
        });
        Ok(())
    }

    /// Adiciona uma região de RAM zerada pertencente ao espaço de endereçamento
    pub fn add_ram(&mut self, start: u32, size: u32) -> MemoryResult<()> {
        self.add_region(
            start,
            size,
            RegionFlags::READ | RegionFlags::WRITE | RegionFlags::OWNED,
            Backing::Buffer(vec![0; size as usize]),
        )
    }

    /// Adiciona uma região servida por callbacks de dispositivo
    pub fn add_device(
        &mut self,
        start: u32,
        size: u32,
        flags: RegionFlags,
        handlers: DeviceHandlers<'a>,
    ) -> MemoryResult<()> {
        self.add_region(start, size, flags, Backing::Device(handlers))
    }

    /// Remove a região que começa exatamente em `start`.
    /// A ordem relativa das demais regiões é preservada.
    pub fn remove_region(&mut self, start: u32) -> MemoryResult<()> {
        if !self.initialized {
            return Err(MemoryError::NotInitialized);
        }
        match self.regions.iter().position(|r| r.start == start) {
            Some(index) => {
                self.regions.remove(index);
                Ok(())
            }
            None => Err(MemoryError::RegionNotFound),
        }
    }

    // --- Funções principais de acesso à memória ---

    /// Lê um byte (8-bit) do endereço especificado
    pub fn read8(&mut self, address: u32) -> u8 {
        let Some(index) = self.find_region(address, 1) else {
            warn!("Leitura em endereço não mapeado: 0x{:08X}", address);
            return FILL_8;
        };
        let region = &mut self.regions[index];
        if !region.flags.contains(RegionFlags::READ) {
            warn!("Leitura em região somente escrita: 0x{:08X}", address);
            return FILL_8;
        }
        let offset = address - region.start;
        match &mut region.backing {
            Backing::Buffer(data) => data[offset as usize],
            Backing::Device(handlers) => match handlers.read8.as_mut() {
                Some(read) => read(offset),
                None => {
                    warn!("Dispositivo sem callback de leitura 8-bit: 0x{:08X}", address);
                    FILL_8
                }
            },
        }
    }

    /// Lê uma word (16-bit, big-endian) do endereço especificado
    pub fn read16(&mut self, address: u32) -> u16 {
        if address % 2 != 0 {
            warn!("Acesso desalinhado de 16 bits: 0x{:08X}", address);
            return FILL_16;
        }
        let Some(index) = self.find_region(address, 2) else {
            warn!("Leitura em endereço não mapeado: 0x{:08X}", address);
            return FILL_16;
        };
        let region = &mut self.regions[index];
        if !region.flags.contains(RegionFlags::READ) {
            warn!("Leitura em região somente escrita: 0x{:08X}", address);
            return FILL_16;
        }
        let offset = (address - region.start) as usize;
        match &mut region.backing {
            Backing::Buffer(data) => ((data[offset] as u16) << 8) | data[offset + 1] as u16,
            Backing::Device(handlers) => match handlers.read16.as_mut() {
                Some(read) => read(address - region.start),
                None => {
                    warn!("Dispositivo sem callback de leitura 16-bit: 0x{:08X}", address);
                    FILL_16
                }
            },
        }
    }

    /// Lê uma long word (32-bit, big-endian) do endereço especificado
    pub fn read32(&mut self, address: u32) -> u32 {
        if address % 4 != 0 {
            warn!("Acesso desalinhado de 32 bits: 0x{:08X}", address);
            return FILL_32;
        }
        let Some(index) = self.find_region(address, 4) else {
            warn!("Leitura em endereço não mapeado: 0x{:08X}", address);
            return FILL_32;
        };
        let region = &mut self.regions[index];
        if !region.flags.contains(RegionFlags::READ) {
            warn!("Leitura em região somente escrita: 0x{:08X}", address);
            return FILL_32;
        }
        let offset = (address - region.start) as usize;
        match &mut region.backing {
            Backing::Buffer(data) => {
                ((data[offset] as u32) << 24)
                    | ((data[offset + 1] as u32) << 16)
                    | ((data[offset + 2] as u32) << 8)
                    | data[offset + 3] as u32
            }
            Backing::Device(handlers) => match handlers.read32.as_mut() {
                Some(read) => read(address - region.start),
                None => {
                    warn!("Dispositivo sem callback de leitura 32-bit: 0x{:08X}", address);
                    FILL_32
                }
            },
        }
    }

    /// Escreve um byte no endereço especificado
    pub fn write8(&mut self, address: u32, value: u8) {
        let Some(index) = self.find_region(address, 1) else {
            warn!("Escrita em endereço não mapeado: 0x{:08X}", address);
            return;
        };
        let region = &mut self.regions[index];
        if !region.flags.contains(RegionFlags::WRITE) {
            warn!("Escrita em região somente leitura: 0x{:08X}", address);
            return;
        }
        let offset = address - region.start;
        match &mut region.backing {
            Backing::Buffer(data) => data[offset as usize] = value,
            Backing::Device(handlers) => {
                if let Some(write) = handlers.write8.as_mut() {
                    write(offset, value);
                } else {
                    warn!("Dispositivo sem callback de escrita 8-bit: 0x{:08X}", address);
                }
            }
        }
    }

    /// Escreve uma word (16-bit, big-endian) no endereço especificado
    pub fn write16(&mut self, address: u32, value: u16) {
        if address % 2 != 0 {
            warn!("Acesso desalinhado de 16 bits: 0x{:08X}", address);
            return;
        }
        let Some(index) = self.find_region(address, 2) else {
            warn!("Escrita em endereço não mapeado: 0x{:08X}", address);
            return;
        };
        let region = &mut self.regions[index];
        if !region.flags.contains(RegionFlags::WRITE) {
            warn!("Escrita em região somente leitura: 0x{:08X}", address);
            return;
        }
        let offset = (address - region.start) as usize;
        match &mut region.backing {
            Backing::Buffer(data) => {
                data[offset] = (value >> 8) as u8;
                data[offset + 1] = value as u8;
            }
            Backing::Device(handlers) => {
                if let Some(write) = handlers.write16.as_mut() {
                    write(address - region.start, value);
                } else {
                    warn!("Dispositivo sem callback de escrita 16-bit: 0x{:08X}", address);
                }
            }
        }
    }

    /// Escreve uma long word (32-bit, big-endian) no endereço especificado
    pub fn write32(&mut self, address: u32, value: u32) {
        if address % 4 != 0 {
            warn!("Acesso desalinhado de 32 bits: 0x{:08X}", address);
            return;
        }
        let Some(index) = self.find_region(address, 4) else {
            warn!("Escrita em endereço não mapeado: 0x{:08X}", address);
            return;
        };
        let region = &mut self.regions[index];
        if !region.flags.contains(RegionFlags::WRITE) {
            warn!("Escrita em região somente leitura: 0x{:08X}", address);
            return;
        }
        let offset = (address - region.start) as usize;
        match &mut region.backing {
            Backing::Buffer(data) => {
                data[offset] = (value >> 24) as u8;
                data[offset + 1] = (value >> 16) as u8;
                data[offset + 2] = (value >> 8) as u8;
                data[offset + 3] = value as u8;
            }
            Backing::Device(handlers) => {
                if let Some(write) = handlers.write32.as_mut() {
                    write(address - region.start, value);
                } else {
                    warn!("Dispositivo sem callback de escrita 32-bit: 0x{:08X}", address);
                }
            }
        }
    }

    /// Reseta o barramento: zera buffers de regiões graváveis.
    /// Regiões somente leitura e dispositivos não são tocados.
    pub fn reset(&mut self) {
        for region in &mut self.regions {
            if region.flags.contains(RegionFlags::WRITE) {
                if let Backing::Buffer(data) = &mut region.backing {
                    data.fill(0);
                }
            }
        }
    }

    /// Copia bytes de uma região com buffer para `out`, ignorando callbacks.
    /// A cópia é limitada ao fim da região; devolve o número de bytes copiados.
    pub fn dump(&self, address: u32, out: &mut [u8]) -> MemoryResult<usize> {
        let region = self
            .regions
            .iter()
            .find(|r| r.contains(address))
            .ok_or(MemoryError::RegionNotFound)?;
        if !region.flags.contains(RegionFlags::READ) {
            return Err(MemoryError::RegionNotFound);
        }
        let Backing::Buffer(data) = &region.backing else {
            return Err(MemoryError::RegionNotFound);
        };
        let offset = (address - region.start) as usize;
        let count = out.len().min(region.size as usize - offset);
        out[..count].copy_from_slice(&data[offset..offset + count]);
        Ok(count)
    }

    /// Carrega bytes em uma região com buffer, ignorando callbacks.
    /// A cópia é limitada ao fim da região; devolve o número de bytes escritos.
    pub fn load(&mut self, address: u32, buffer: &[u8]) -> MemoryResult<usize> {
        let region = self
            .regions
            .iter_mut()
            .find(|r| r.contains(address))
            .ok_or(MemoryError::RegionNotFound)?;
        if !region.flags.contains(RegionFlags::WRITE) {
            return Err(MemoryError::RegionNotFound);
        }
        let Backing::Buffer(data) = &mut region.backing else {
            return Err(MemoryError::RegionNotFound);
        };
        let offset = (address - region.start) as usize;
        let count = buffer.len().min(region.size as usize - offset);
        data[offset..offset + count].copy_from_slice(&buffer[..count]);
        Ok(count)
    }

    /// Encontra o índice da região que contém o acesso completo
    fn find_region(&self, address: u32, width: u32) -> Option<usize> {
        self.regions
            .iter()
            .position(|r| r.contains(address) && address - r.start + width <= r.size)
    }
}

impl<'a> Default for AddressSpace<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Drop for AddressSpace<'a> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn space_with_ram() -> AddressSpace<'static> {
        let mut space = AddressSpace::new();
        space.init();
        space.add_ram(0x1000, 0x100).unwrap();
        space
    }

    #[test]
    fn test_add_region_requires_init() {
        let mut space = AddressSpace::new();
        assert_eq!(space.add_ram(0, 0x100), Err(MemoryError::NotInitialized));
    }

    #[test]
    fn test_add_region_rejects_overlap() {
        let mut space = space_with_ram();
        assert_eq!(space.add_ram(0x1080, 0x100), Err(MemoryError::RegionOverlap));
        assert_eq!(space.add_ram(0x0F80, 0x100), Err(MemoryError::RegionOverlap));
        assert_eq!(space.num_regions(), 1);
        // Regiões adjacentes são válidas
        space.add_ram(0x1100, 0x100).unwrap();
        space.add_ram(0x0F00, 0x100).unwrap();
    }

    #[test]
    fn test_add_region_rejects_zero_size_and_wrap() {
        let mut space = space_with_ram();
        assert_eq!(
            space.add_region(0x2000, 0, RegionFlags::READ, Backing::Buffer(Vec::new())),
            Err(MemoryError::InvalidRegion)
        );
        assert_eq!(
            space.add_region(
                0xFFFF_FF00,
                0x200,
                RegionFlags::READ,
                Backing::Buffer(vec![0; 0x200])
            ),
            Err(MemoryError::AddressWrap)
        );
    }

    #[test]
    fn test_unmapped_reads_return_fill_values() {
        let mut space = space_with_ram();
        assert_eq!(space.read8(0x5000), 0xFF);
        assert_eq!(space.read16(0x5000), 0xFFFF);
        assert_eq!(space.read32(0x5000), 0xFFFF_FFFF);
        // Escritas em endereço não mapeado são descartadas sem pânico
        space.write8(0x5000, 0x12);
    }

    #[test]
    fn test_misaligned_access_returns_fill_values() {
        let mut space = space_with_ram();
        space.write8(0x1001, 0xAB);
        assert_eq!(space.read16(0x1001), 0xFFFF);
        assert_eq!(space.read32(0x1002), 0xFFFF_FFFF);
        // Escrita desalinhada é descartada
        space.write16(0x1001, 0x1234);
        assert_eq!(space.read8(0x1001), 0xAB);
    }

    #[test]
    fn test_big_endian_buffer_access() {
        let mut space = space_with_ram();
        space.write32(0x1000, 0x0123_4567);
        assert_eq!(space.read8(0x1000), 0x01);
        assert_eq!(space.read8(0x1001), 0x23);
        assert_eq!(space.read8(0x1002), 0x45);
        assert_eq!(space.read8(0x1003), 0x67);
        assert_eq!(space.read16(0x1000), 0x0123);
        assert_eq!(space.read16(0x1002), 0x4567);
        assert_eq!(space.read32(0x1000), 0x0123_4567);
    }

    #[test]
    fn test_read_only_region_drops_writes() {
        let mut space = AddressSpace::new();
        space.init();
        space
            .add_region(
                0x0000,
                4,
                RegionFlags::READ,
                Backing::Buffer(vec![1, 2, 3, 4]),
            )
            .unwrap();
        space.write8(0x0000, 0xFF);
        assert_eq!(space.read8(0x0000), 1);
    }

    #[test]
    fn test_write_only_region_reads_fill() {
        let mut space = AddressSpace::new();
        space.init();
        space
            .add_region(
                0x0000,
                4,
                RegionFlags::WRITE,
                Backing::Buffer(vec![0; 4]),
            )
            .unwrap();
        assert_eq!(space.read8(0x0000), 0xFF);
    }

    #[test]
    fn test_device_callbacks_receive_relative_offset() {
        let seen = RefCell::new(Vec::new());
        let mut space = AddressSpace::new();
        space.init();
        let handlers = DeviceHandlers {
            read8: Some(Box::new(|offset| {
                seen.borrow_mut().push(offset);
                0x42
            })),
            ..Default::default()
        };
        space
            .add_device(0x8000, 0x100, RegionFlags::READ, handlers)
            .unwrap();
        assert_eq!(space.read8(0x8010), 0x42);
        assert_eq!(*seen.borrow(), vec![0x10]);
        // Largura sem callback devolve preenchimento
        assert_eq!(space.read16(0x8010), 0xFFFF);
        drop(space);
    }

    #[test]
    fn test_reset_zeroes_writable_buffers_only() {
        let mut space = AddressSpace::new();
        space.init();
        space
            .add_region(
                0x0000,
                2,
                RegionFlags::READ,
                Backing::Buffer(vec![0xAA, 0xBB]),
            )
            .unwrap();
        space.add_ram(0x1000, 4).unwrap();
        space.write8(0x1000, 0x55);
        space.reset();
        assert_eq!(space.read8(0x1000), 0x00);
        assert_eq!(space.read8(0x0000), 0xAA);
    }

    #[test]
    fn test_dump_and_load_clamp_to_region_end() {
        let mut space = space_with_ram();
        let data = vec![0x11; 0x200];
        // Carga além do fim da região é truncada
        assert_eq!(space.load(0x10F0, &data).unwrap(), 0x10);
        let mut out = [0u8; 0x20];
        assert_eq!(space.dump(0x10F0, &mut out).unwrap(), 0x10);
        assert_eq!(out[..0x10], [0x11; 0x10]);
        // Fora de qualquer região
        assert!(space.dump(0x9000, &mut out).is_err());
    }

    #[test]
    fn test_remove_region_preserves_order() {
        let mut space = AddressSpace::new();
        space.init();
        space.add_ram(0x0000, 0x10).unwrap();
        space.add_ram(0x1000, 0x10).unwrap();
        space.add_ram(0x2000, 0x10).unwrap();
        space.remove_region(0x1000).unwrap();
        assert_eq!(space.num_regions(), 2);
        assert_eq!(space.remove_region(0x1000), Err(MemoryError::RegionNotFound));
        space.write8(0x2000, 7);
        assert_eq!(space.read8(0x2000), 7);
    }

    #[test]
    fn test_access_spanning_region_end_is_unmapped() {
        let mut space = AddressSpace::new();
        space.init();
        space.add_ram(0x0000, 6).unwrap();
        assert_eq!(space.read16(0x0004), 0x0000);
        // 0x0004..0x0008 cruza o fim da região
        assert_eq!(space.read32(0x0004), 0xFFFF_FFFF);
        space.write32(0x0004, 0x1234_5678);
        assert_eq!(space.read16(0x0004), 0x0000);
    }
}
