//! iNES (.NES) file parser
//!
//! Reference: https://www.nesdev.org/wiki/INES

use crate::error::NesError;

const INES_IDENTIFIER: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];
const PRG_ROM_PAGE_SIZE: usize = 16384;
const CHR_ROM_PAGE_SIZE: usize = 8192;
const HEADER_SIZE: usize = 16;
const TRAINER_SIZE: usize = 512;

#[derive(Debug, PartialEq)]
pub enum Mirroring {
    Vertical,
    Horizontal,
    FourScreen,
}

pub struct Cartridge {
    pub prg_rom: Vec<u8>,
    pub chr_rom: Vec<u8>,
    pub mapper: u8,
    pub screen_mirroring: Mirroring,
}

impl Cartridge {
    pub fn new(raw: &[u8]) -> Result<Cartridge, NesError> {
        if raw.len() < HEADER_SIZE || raw[0..4] != INES_IDENTIFIER {
            return Err(NesError::InvalidFormat(
                "missing \"NES\\x1A\" identifier".to_string(),
            ));
        }

        let ines_ver = (raw[7] >> 2) & 0b11;
        if ines_ver == 2 {
            return Err(NesError::InvalidFormat("NES2.0 format is not supported".to_string()));
        }

        let mapper = (raw[7] & 0b1111_0000) | (raw[6] >> 4);
        if mapper != 0 {
            return Err(NesError::UnsupportedMapper(mapper));
        }

        let four_screen = raw[6] & 0b1000 != 0;
        let vertical_mirroring = raw[6] & 0b1 != 0;
        let screen_mirroring = match (four_screen, vertical_mirroring) {
            (true, _) => Mirroring::FourScreen,
            (false, true) => Mirroring::Vertical,
            (false, false) => Mirroring::Horizontal,
        };

        let prg_rom_size = raw[4] as usize * PRG_ROM_PAGE_SIZE;
        let chr_rom_size = raw[5] as usize * CHR_ROM_PAGE_SIZE;

        let skip_trainer = raw[6] & 0b100 != 0;

        let prg_rom_start = HEADER_SIZE + if skip_trainer { TRAINER_SIZE } else { 0 };
        let chr_rom_start = prg_rom_start + prg_rom_size;

        if raw.len() < chr_rom_start + chr_rom_size {
            return Err(NesError::InvalidFormat(
                "buffer shorter than header-declared PRG+CHR size".to_string(),
            ));
        }

        Ok(Cartridge {
            prg_rom: raw[prg_rom_start..(prg_rom_start + prg_rom_size)].to_vec(),
            chr_rom: raw[chr_rom_start..(chr_rom_start + chr_rom_size)].to_vec(),
            mapper,
            screen_mirroring,
        })
    }
}

pub mod test {
    use super::*;

    // Note that we must set the program counter manually with this test cartridge. 0xFFFC will NOT
    // contain the "reset vector."
    pub fn create_test_cartridge() -> Cartridge {
        let mut header = vec![
            0x4E, 0x45, 0x53, 0x1A, 0x02, 0x01, 0x31, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ];
        let mut pgr_rom = vec![0; 2 * PRG_ROM_PAGE_SIZE];
        let mut chr_rom = vec![0; CHR_ROM_PAGE_SIZE];
        header.append(&mut pgr_rom);
        header.append(&mut chr_rom);
        Cartridge::new(&header).unwrap()
    }

    #[test]
    fn test_invalid_ines_identifier() {
        let raw_data = vec![
            // Incorrect iNES header
            0x00, 0x00, 0x00, 0x00, // Invalid NES<EOF>
            0x02, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let result = Cartridge::new(&raw_data);
        assert!(matches!(result, Err(NesError::InvalidFormat(_))));
    }

    #[test]
    fn test_unsupported_nes_version() {
        let raw_data = vec![
            // iNES header with NES2.0 version
            0x4E, 0x45, 0x53, 0x1A, // NES<EOF>
            0x02, 0x01, 0x00, 0b0000_1000, // NES2.0 version (bits 2-3 of byte 7 == 2)
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let result = Cartridge::new(&raw_data);
        assert!(matches!(result, Err(NesError::InvalidFormat(_))));
    }

    #[test]
    fn test_unsupported_mapper() {
        let mut raw_data = vec![
            0x4E, 0x45, 0x53, 0x1A, 0x02, 0x01, 0b0001_0000, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00,
        ];
        raw_data.extend(vec![0u8; 2 * PRG_ROM_PAGE_SIZE + CHR_ROM_PAGE_SIZE]);

        let result = Cartridge::new(&raw_data);
        assert!(matches!(result, Err(NesError::UnsupportedMapper(1))));
    }

    #[test]
    fn test_trainer_skip() {
        let mut raw_data = vec![
            0x4E, 0x45, 0x53, 0x1A, 0x01, 0x01, 0b0000_0100, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00,
        ];
        raw_data.extend(vec![0xAAu8; TRAINER_SIZE]);
        let mut prg = vec![0xBBu8; PRG_ROM_PAGE_SIZE];
        let mut chr = vec![0xCCu8; CHR_ROM_PAGE_SIZE];
        raw_data.append(&mut prg);
        raw_data.append(&mut chr);

        let cartridge = Cartridge::new(&raw_data).unwrap();
        assert_eq!(cartridge.prg_rom[0], 0xBB);
        assert_eq!(cartridge.chr_rom[0], 0xCC);
    }

    #[test]
    fn test_four_screen_mirroring() {
        let mut raw_data = vec![
            0x4E, 0x45, 0x53, 0x1A, 0x01, 0x01, 0b0000_1001, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00,
        ];
        raw_data.extend(vec![0u8; PRG_ROM_PAGE_SIZE + CHR_ROM_PAGE_SIZE]);

        let cartridge = Cartridge::new(&raw_data).unwrap();
        assert_eq!(cartridge.screen_mirroring, Mirroring::FourScreen);
    }
}
