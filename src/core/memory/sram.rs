//! RAM de salvamento com bateria (backup RAM do cartucho).
//! Persistência em arquivo bruto, sem cabeçalho.

use log::{info, warn};
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

/// Backup RAM do cartucho, persistida em disco entre sessões.
pub struct BackupRam {
    data: Vec<u8>,              // conteúdo da SRAM
    enabled: bool,              // SRAM visível no barramento
    write_protect: bool,        // escritas ignoradas quando ativo
    dirty: bool,                // modificada desde o último save
    file_path: Option<PathBuf>, // arquivo de persistência
}

impl BackupRam {
    /// Cria uma nova backup RAM zerada
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
            enabled: false,
            write_protect: false,
            dirty: false,
            file_path: None,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Habilita/desabilita
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Habilita/desabilita proteção contra escrita
    pub fn is_write_protected(&self) -> bool {
        self.write_protect
    }

    pub fn set_write_protect(&mut self, protect: bool) {
        self.write_protect = protect;
    }

    /// Define o arquivo usado por `load_from_file` e `auto_save`
    pub fn set_file_path(&mut self, path: PathBuf) {
        self.file_path = Some(path);
    }

    /// Lê um byte. Retorna 0xFF se desabilitada ou fora do intervalo.
    pub fn read_byte(&self, offset: usize) -> u8 {
        if !self.enabled || offset >= self.data.len() {
            return 0xFF;
        }
        self.data[offset]
    }

    /// Escreve um byte. Ignorado se desabilitada, protegida ou fora do intervalo.
    pub fn write_byte(&mut self, offset: usize, value: u8) {
        if !self.enabled || self.write_protect || offset >= self.data.len() {
            return;
        }
        if self.data[offset] != value {
            self.data[offset] = value;
            self.dirty = true;
        }
    }

    /// Acesso direto ao conteúdo (save states)
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Substitui o conteúdo (save states). Bytes excedentes são ignorados.
    pub fn set_data(&mut self, data: &[u8]) {
        let count = data.len().min(self.data.len());
        self.data[..count].copy_from_slice(&data[..count]);
        self.dirty = true;
    }

    /// Carrega o conteúdo a partir do arquivo configurado.
    /// Arquivo inexistente não é erro (primeiro boot). Arquivo menor que a
    /// SRAM é aceito com aviso; o restante permanece zerado.
    pub fn load_from_file(&mut self) -> bool {
        let Some(path) = &self.file_path else {
            return false;
        };
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(_) => {
                info!("Arquivo de SRAM não encontrado: {}", path.display());
                return false;
            }
        };
        let mut contents = Vec::new();
        match file.read_to_end(&mut contents) {
            Ok(read) => {
                if read < self.data.len() {
                    warn!(
                        "SRAM truncada: {} de {} bytes lidos de {}",
                        read,
                        self.data.len(),
                        path.display()
                    );
                }
                self.data.fill(0);
                let count = read.min(self.data.len());
                self.data[..count].copy_from_slice(&contents[..count]);
                info!("SRAM carregada: {} bytes", count);
                self.dirty = false;
                true
            }
            Err(e) => {
                warn!("Falha ao ler SRAM de {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Salva o conteúdo no arquivo configurado.
    /// Falha de E/S não é fatal: retorna false e mantém o estado em memória.
    pub fn save_to_file(&mut self) -> bool {
        let Some(path) = &self.file_path else {
            return false;
        };
        let mut file = match File::create(path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Falha ao criar arquivo de SRAM {}: {}", path.display(), e);
                return false;
            }
        };
        match file.write_all(&self.data) {
            Ok(()) => {
                info!("SRAM salva: {} bytes", self.data.len());
                self.dirty = false;
                true
            }
            Err(e) => {
                warn!("Falha ao gravar SRAM em {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Salva apenas se o conteúdo foi modificado desde o último save
    pub fn auto_save(&mut self) -> bool {
        if !self.dirty {
            return true;
        }
        self.save_to_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_reads_return_ff() {
        let mut sram = BackupRam::new(16);
        sram.write_byte(0, 0x12);
        assert_eq!(sram.read_byte(0), 0xFF);
        sram.set_enabled(true);
        sram.write_byte(0, 0x12);
        assert_eq!(sram.read_byte(0), 0x12);
        assert_eq!(sram.read_byte(16), 0xFF);
    }

    #[test]
    fn test_write_protect_blocks_writes() {
        let mut sram = BackupRam::new(16);
        sram.set_enabled(true);
        sram.set_write_protect(true);
        sram.write_byte(3, 0x77);
        assert_eq!(sram.read_byte(3), 0x00);
        assert!(!sram.is_dirty());
        sram.set_write_protect(false);
        sram.write_byte(3, 0x77);
        assert_eq!(sram.read_byte(3), 0x77);
        assert!(sram.is_dirty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir().join("megacart_sram_test.srm");
        let mut sram = BackupRam::new(32);
        sram.set_enabled(true);
        sram.set_file_path(path.clone());
        for i in 0..32 {
            sram.write_byte(i, i as u8 ^ 0x5A);
        }
        assert!(sram.save_to_file());
        assert!(!sram.is_dirty());

        let mut restored = BackupRam::new(32);
        restored.set_file_path(path.clone());
        assert!(restored.load_from_file());
        restored.set_enabled(true);
        for i in 0..32 {
            assert_eq!(restored.read_byte(i), i as u8 ^ 0x5A);
        }
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_short_file_is_accepted() {
        let path = std::env::temp_dir().join("megacart_sram_short.srm");
        std::fs::write(&path, [0xAA, 0xBB]).unwrap();
        let mut sram = BackupRam::new(8);
        sram.set_file_path(path.clone());
        assert!(sram.load_from_file());
        sram.set_enabled(true);
        assert_eq!(sram.read_byte(0), 0xAA);
        assert_eq!(sram.read_byte(1), 0xBB);
        assert_eq!(sram.read_byte(2), 0x00);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_is_not_fatal() {
        let mut sram = BackupRam::new(8);
        sram.set_file_path(std::env::temp_dir().join("megacart_sram_missing.srm"));
        assert!(!sram.load_from_file());
    }

    #[test]
    fn test_auto_save_skips_clean_state() {
        let mut sram = BackupRam::new(8);
        assert!(sram.auto_save());
        sram.set_enabled(true);
        sram.write_byte(0, 1);
        // Suja e sem arquivo configurado: auto_save falha
        assert!(!sram.auto_save());
    }
}
