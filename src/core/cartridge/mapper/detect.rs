//! Mapper detection.
//!
//! Mega Drive cartridges carry no mapper number, so the mapper is
//! inferred from the ROM header in stages: known game titles first,
//! then the checksum-field convention, then the SEGA header heuristics.
//! NES cartridges map an iNES mapper number directly.

use crate::core::cartridge::mapper::MapperKind;
use log::info;

const TITLE_OFFSET: usize = 0x150;
const TITLE_LEN: usize = 48;
const CHECKSUM_OFFSET: usize = 0x18E;
const HEADER_OFFSET: usize = 0x100;
const FEATURES_OFFSET: usize = 0x1F1;
const MIN_HEADER_SIZE: usize = 512;
const FOUR_MB: usize = 4 * 1024 * 1024;

/// Title substrings mapped to known board types
const TITLE_TABLE: &[(&str, MapperKind)] = &[
    ("PHANTASY STAR", MapperKind::Ssrpg),
    ("SHINING FORCE", MapperKind::Ssrpg),
    ("PIER SOLAR", MapperKind::PierSolar),
    ("MICRO MACHINES", MapperKind::Codemasters),
    ("COSMIC SPACEHEAD", MapperKind::Codemasters),
];

/// Detects the mapper for a Mega Drive ROM image.
pub fn detect_md_mapper(rom: &[u8]) -> MapperKind {
    if rom.len() < MIN_HEADER_SIZE {
        return MapperKind::Sega;
    }

    // Stage 1: known titles override everything else
    if let Some(kind) = match_title(rom) {
        info!("Mapper detectado pelo título: {}", kind);
        return kind;
    }

    // Stage 2: checksum field repurposed as a mapper tag
    let checksum = ((rom[CHECKSUM_OFFSET] as u16) << 8) | rom[CHECKSUM_OFFSET + 1] as u16;
    let tagged = match checksum {
        0x1234 => Some(MapperKind::Ssf2),
        0x5678 => Some(MapperKind::Ssrpg),
        0x9ABC => Some(MapperKind::Codemasters),
        0xDEF0 => Some(MapperKind::Ea),
        _ => None,
    };
    if let Some(kind) = tagged {
        info!("Mapper detectado pelo checksum: {}", kind);
        return kind;
    }

    // Stage 3: standard SEGA header heuristics
    if rom[HEADER_OFFSET..].starts_with(b"SEGA") {
        if rom.len() > FEATURES_OFFSET && rom[FEATURES_OFFSET] & 0x02 != 0 {
            return MapperKind::Sega;
        }
        if rom.len() > FOUR_MB {
            return MapperKind::Ssf2;
        }
    }

    MapperKind::Sega
}

fn match_title(rom: &[u8]) -> Option<MapperKind> {
    let end = (TITLE_OFFSET + TITLE_LEN).min(rom.len());
    let title = String::from_utf8_lossy(&rom[TITLE_OFFSET..end]);
    TITLE_TABLE
        .iter()
        .find(|(name, _)| title.contains(name))
        .map(|(_, kind)| *kind)
}

/// Maps an iNES mapper number to a supported board type.
pub fn nes_mapper_for_number(number: u8) -> Option<MapperKind> {
    match number {
        0 => Some(MapperKind::Nrom),
        1 => Some(MapperKind::Mmc1),
        2 => Some(MapperKind::Uxrom),
        3 => Some(MapperKind::Cnrom),
        4 => Some(MapperKind::Mmc3),
        5 => Some(MapperKind::Mmc5),
        7 => Some(MapperKind::Aorom),
        9 => Some(MapperKind::Mmc2),
        10 => Some(MapperKind::Mmc4),
        11 => Some(MapperKind::ColorDreams),
        24 => Some(MapperKind::Vrc6),
        71 => Some(MapperKind::Camerica),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_rom(size: usize) -> Vec<u8> {
        vec![0u8; size]
    }

    fn with_header(mut rom: Vec<u8>) -> Vec<u8> {
        rom[HEADER_OFFSET..HEADER_OFFSET + 4].copy_from_slice(b"SEGA");
        rom
    }

    fn with_title(mut rom: Vec<u8>, title: &str) -> Vec<u8> {
        rom[TITLE_OFFSET..TITLE_OFFSET + title.len()].copy_from_slice(title.as_bytes());
        rom
    }

    #[test]
    fn test_tiny_rom_uses_default() {
        assert_eq!(detect_md_mapper(&blank_rom(256)), MapperKind::Sega);
    }

    #[test]
    fn test_title_beats_header_heuristics() {
        // SRAM feature flag set, but the title names an SRPG board
        let mut rom = with_title(with_header(blank_rom(0x1000)), "PHANTASY STAR II");
        rom[FEATURES_OFFSET] = 0x02;
        assert_eq!(detect_md_mapper(&rom), MapperKind::Ssrpg);
    }

    #[test]
    fn test_pier_solar_by_title() {
        let rom = with_title(with_header(blank_rom(0x1000)), "PIER SOLAR");
        assert_eq!(detect_md_mapper(&rom), MapperKind::PierSolar);
    }

    #[test]
    fn test_checksum_tags() {
        let mut rom = with_header(blank_rom(0x1000));
        rom[CHECKSUM_OFFSET] = 0x12;
        rom[CHECKSUM_OFFSET + 1] = 0x34;
        assert_eq!(detect_md_mapper(&rom), MapperKind::Ssf2);

        rom[CHECKSUM_OFFSET] = 0xDE;
        rom[CHECKSUM_OFFSET + 1] = 0xF0;
        assert_eq!(detect_md_mapper(&rom), MapperKind::Ea);
    }

    #[test]
    fn test_sega_header_with_sram_flag() {
        let mut rom = with_header(blank_rom(0x1000));
        rom[FEATURES_OFFSET] = 0x02;
        assert_eq!(detect_md_mapper(&rom), MapperKind::Sega);
    }

    #[test]
    fn test_large_rom_with_sega_header_is_ssf2() {
        let rom = with_header(blank_rom(FOUR_MB + 0x1000));
        assert_eq!(detect_md_mapper(&rom), MapperKind::Ssf2);
    }

    #[test]
    fn test_no_stage_match_falls_back_to_sega() {
        assert_eq!(detect_md_mapper(&blank_rom(0x1000)), MapperKind::Sega);
    }

    #[test]
    fn test_ines_number_mapping() {
        assert_eq!(nes_mapper_for_number(0), Some(MapperKind::Nrom));
        assert_eq!(nes_mapper_for_number(4), Some(MapperKind::Mmc3));
        assert_eq!(nes_mapper_for_number(71), Some(MapperKind::Camerica));
        assert_eq!(nes_mapper_for_number(200), None);
    }
}
