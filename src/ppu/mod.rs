//! An implementation of the NES picture processing unit.
//! Reference: https://www.nesdev.org/wiki/PPU

use crate::cartridge::Mirroring;
use registers::addr::PPUADDR;
use registers::controller::PPUCTRL;
use registers::mask::PPUMASK;
use registers::scroll::PPUSCROLL;
use registers::status::PPUSTATUS;

pub mod registers;

// Memory map constants.
const CHR_ROM_START: u16 = 0x0000;
const CHR_ROM_END: u16 = 0x1fff;
const VRAM_START: u16 = 0x2000;
const VRAM_END: u16 = 0x2fff;
const UNUSED_START: u16 = 0x3000;
const UNUSED_END: u16 = 0x3eff;
const PALETTE_TABLE_START: u16 = 0x3f00;
const PALETTE_TABLE_END: u16 = 0x3fff;

const NAMETABLE_SIZE: u16 = 0x0400;

// Storage size constants.
const PALETTE_TABLE_SIZE: usize = 32;
const VRAM_SIZE: usize = 2048;
const OAM_DATA_SIZE: usize = 256;

const DOTS_PER_SCANLINE: usize = 341;
const SCANLINES_PER_FRAME: u16 = 262;
const VBLANK_SCANLINE: u16 = 241;

pub struct Ppu {
    pub chr_rom: Vec<u8>,
    pub palette_table: [u8; PALETTE_TABLE_SIZE],
    pub vram: [u8; VRAM_SIZE],
    pub oam_data: [u8; OAM_DATA_SIZE],

    pub controller: PPUCTRL,
    pub ppu_addr: PPUADDR,
    pub mirroring: Mirroring,
    pub ppu_mask: PPUMASK,
    pub oam_addr: u8,
    pub ppu_scroll: PPUSCROLL,
    pub status: PPUSTATUS,

    // One-byte read-ahead buffer backing the $2007 data port's delayed-read behavior.
    internal_data_buf: u8,

    pub scanline: u16,
    pub dot: usize,

    // Pending NMI, polled and cleared by the Bus at each CPU instruction boundary.
    pub nmi_interrupt: Option<u8>,
}

// Backwards-compatible alias matching the teacher's original naming.
pub type PPU = Ppu;

impl Ppu {
    pub fn new(chr_rom: Vec<u8>, mirroring: Mirroring) -> Self {
        Ppu {
            chr_rom,
            mirroring,
            controller: PPUCTRL::new(),
            palette_table: [0; PALETTE_TABLE_SIZE],
            vram: [0; VRAM_SIZE],
            oam_data: [0; OAM_DATA_SIZE],
            ppu_addr: PPUADDR::new(),
            ppu_mask: PPUMASK::new(),
            ppu_scroll: PPUSCROLL::new(),
            status: PPUSTATUS::new(),
            oam_addr: 0,
            internal_data_buf: 0,

            scanline: 0,
            dot: 0,
            nmi_interrupt: None,
        }
    }

    /// Advances the PPU by `cycles` dots. Returns true exactly when a frame
    /// completed this call (the scanline counter wrapped from 261 to 0).
    pub fn tick(&mut self, cycles: usize) -> bool {
        self.dot += cycles;
        let mut frame_complete = false;

        while self.dot >= DOTS_PER_SCANLINE {
            self.dot -= DOTS_PER_SCANLINE;
            self.scanline += 1;

            if self.scanline == VBLANK_SCANLINE {
                self.status.insert(PPUSTATUS::VBLANK_STARTED);
                self.status.remove(PPUSTATUS::SPRITE_ZERO_HIT);
                if self.controller.contains(PPUCTRL::GENERATE_NMI) {
                    self.nmi_interrupt = Some(1);
                }
            }

            if self.scanline >= SCANLINES_PER_FRAME {
                self.scanline = 0;
                self.nmi_interrupt = None;
                self.status.remove(PPUSTATUS::SPRITE_ZERO_HIT);
                self.status.remove(PPUSTATUS::VBLANK_STARTED);
                frame_complete = true;
            }
        }

        // Sprite-0 hit: coarse approximation (Y == scanline, X <= dot). Known
        // limitation -- see DESIGN.md.
        if self.scanline <= 240 && self.ppu_mask.contains(PPUMASK::SHOW_SPRITES) {
            let sprite_y = self.oam_data[0] as u16;
            let sprite_x = self.oam_data[3] as usize;
            if sprite_y == self.scanline && sprite_x <= self.dot {
                self.status.insert(PPUSTATUS::SPRITE_ZERO_HIT);
            }
        }

        frame_complete
    }

    pub fn write_to_ppu_addr(&mut self, value: u8) {
        self.ppu_addr.update(value);
    }

    pub fn write_to_controller(&mut self, value: u8) {
        let was_generating_nmi = self.controller.contains(PPUCTRL::GENERATE_NMI);
        self.controller = PPUCTRL::from_bits_truncate(value);
        let now_generating_nmi = self.controller.contains(PPUCTRL::GENERATE_NMI);

        if !was_generating_nmi
            && now_generating_nmi
            && self.status.contains(PPUSTATUS::VBLANK_STARTED)
        {
            self.nmi_interrupt = Some(1);
        }
    }

    pub fn write_to_mask(&mut self, value: u8) {
        self.ppu_mask = PPUMASK::from_bits_truncate(value);
    }

    pub fn write_to_scroll(&mut self, value: u8) {
        self.ppu_scroll.write(value);
    }

    /// Read of $2002. Side effects: clears vblank, resets the scroll and addr
    /// write toggles.
    pub fn read_status(&mut self) -> u8 {
        let data = self.status.bits();
        self.status.remove(PPUSTATUS::VBLANK_STARTED);
        self.ppu_scroll.reset_latch();
        self.ppu_addr.reset_write_latch();
        data
    }

    pub fn write_to_oam_data(&mut self, value: u8) {
        self.oam_data[self.oam_addr as usize] = value;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }

    pub fn read_oam_data(&self) -> u8 {
        self.oam_data[self.oam_addr as usize]
    }

    pub fn write_to_oam_addr(&mut self, value: u8) {
        self.oam_addr = value;
    }

    /// 256-byte DMA transfer into OAM, honoring the current OAM-ADDR wrap.
    pub fn write_oam_dma(&mut self, data: &[u8; 256]) {
        for &byte in data.iter() {
            self.oam_data[self.oam_addr as usize] = byte;
            self.oam_addr = self.oam_addr.wrapping_add(1);
        }
    }

    fn increment_vram_addr(&mut self) {
        self.ppu_addr.increment(self.controller.vram_addr_increment());
    }

    pub fn write_to_data(&mut self, value: u8) {
        let addr = self.ppu_addr.get();
        match addr {
            CHR_ROM_START..=CHR_ROM_END => {
                log::warn!("dropped write to read-only CHR-ROM space {:#06x}", addr);
            }
            VRAM_START..=VRAM_END => self.vram[self.mirror_vram_addr(addr) as usize] = value,
            UNUSED_START..=UNUSED_END => {
                log::error!("write to unused PPU address space {:#06x}", addr);
                panic!("PPU out-of-range access at {:#06x}", addr);
            }

            // $3f10, $3f14, $3f18, $3f1c are mirrors of $3f00, $3f04, $3f08, $3f0c respectively
            // Reference: https://www.nesdev.org/wiki/PPU_palettes
            0x3f10 | 0x3f14 | 0x3f18 | 0x3f1c => {
                self.palette_table[(addr - 0x10 - PALETTE_TABLE_START) as usize] = value;
            }

            PALETTE_TABLE_START..=PALETTE_TABLE_END => {
                self.palette_table[(addr - PALETTE_TABLE_START) as usize] = value;
            }

            _ => unreachable!("PPU address space is exhaustively covered above"),
        }
        self.increment_vram_addr();
    }

    pub fn read_data(&mut self) -> u8 {
        let addr = self.ppu_addr.get();
        self.increment_vram_addr();

        match addr {
            CHR_ROM_START..=CHR_ROM_END => {
                let result = self.internal_data_buf;
                self.internal_data_buf = self.chr_rom[addr as usize];
                result
            }
            VRAM_START..=VRAM_END => {
                let result = self.internal_data_buf;
                self.internal_data_buf = self.vram[self.mirror_vram_addr(addr) as usize];
                result
            }
            UNUSED_START..=UNUSED_END => {
                log::error!("read from unused PPU address space {:#06x}", addr);
                panic!("PPU out-of-range access at {:#06x}", addr);
            }
            0x3f10 | 0x3f14 | 0x3f18 | 0x3f1c => {
                self.palette_table[(addr - 0x10 - PALETTE_TABLE_START) as usize]
            }
            PALETTE_TABLE_START..=PALETTE_TABLE_END => {
                self.palette_table[(addr - PALETTE_TABLE_START) as usize]
            }
            _ => unreachable!("PPU address space is exhaustively covered above"),
        }
    }

    // Nametables:
    // [ 0 ] [ 1 ]
    // [ 2 ] [ 3 ]
    //
    // Horizontal:
    // [ A ] [ a ]
    // [ B ] [ b ]
    //
    // Vertical:
    // [ A ] [ B ]
    // [ a ] [ b ]
    //
    // Maps into VRAM.
    pub fn mirror_vram_addr(&self, addr: u16) -> u16 {
        // Maps into 0x2000 -> 0x2fff, in case data is not there
        let mirrored_vram = addr & VRAM_END;
        let vram_index = mirrored_vram - VRAM_START;
        let name_table = vram_index / NAMETABLE_SIZE;
        match (&self.mirroring, name_table) {
            (Mirroring::Vertical, 2) | (Mirroring::Vertical, 3) => vram_index - (2 * NAMETABLE_SIZE),
            (Mirroring::Horizontal, 2) => vram_index - NAMETABLE_SIZE,
            (Mirroring::Horizontal, 1) => vram_index - NAMETABLE_SIZE,
            (Mirroring::Horizontal, 3) => vram_index - (2 * NAMETABLE_SIZE),
            _ => vram_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ppu() -> Ppu {
        Ppu::new(vec![0; 0x2000], Mirroring::Horizontal)
    }

    #[test]
    fn data_port_read_has_one_byte_delay_for_vram() {
        let mut ppu = test_ppu();
        ppu.write_to_ppu_addr(0x23);
        ppu.write_to_ppu_addr(0x05);
        ppu.vram[ppu.mirror_vram_addr(0x2305) as usize] = 0x66;

        ppu.write_to_ppu_addr(0x23);
        ppu.write_to_ppu_addr(0x05);
        assert_eq!(ppu.read_data(), 0); // buffer primer
        assert_eq!(ppu.read_data(), 0x66);
        assert_eq!(ppu.ppu_addr.get(), 0x2307);
    }

    #[test]
    fn data_port_palette_reads_have_no_delay() {
        let mut ppu = test_ppu();
        ppu.palette_table[5] = 0x42;
        ppu.write_to_ppu_addr(0x3f);
        ppu.write_to_ppu_addr(0x05);
        assert_eq!(ppu.read_data(), 0x42);
    }

    #[test]
    fn vram_32_byte_stride() {
        let mut ppu = test_ppu();
        ppu.write_to_controller(0b0000_0100); // VRAM_ADD_INCREMENT
        ppu.write_to_ppu_addr(0x21);
        ppu.write_to_ppu_addr(0xff);
        let a = ppu.mirror_vram_addr(0x21ff) as usize;
        let b = ppu.mirror_vram_addr(0x221f) as usize;
        let c = ppu.mirror_vram_addr(0x223f) as usize;
        ppu.vram[a] = 0x66;
        ppu.vram[b] = 0x77;
        ppu.vram[c] = 0x88;

        ppu.write_to_ppu_addr(0x21);
        ppu.write_to_ppu_addr(0xff);
        ppu.read_data(); // primer
        assert_eq!(ppu.read_data(), 0x66);
        assert_eq!(ppu.read_data(), 0x77);
        assert_eq!(ppu.read_data(), 0x88);
    }

    #[test]
    fn horizontal_mirroring() {
        let mut ppu = test_ppu();
        ppu.write_to_ppu_addr(0x24);
        ppu.write_to_ppu_addr(0x05);
        ppu.write_to_data(0x66);

        ppu.write_to_ppu_addr(0x28);
        ppu.write_to_ppu_addr(0x05);
        ppu.write_to_data(0x77);

        ppu.write_to_ppu_addr(0x20);
        ppu.write_to_ppu_addr(0x05);
        ppu.read_data();
        assert_eq!(ppu.read_data(), 0x66);

        ppu.write_to_ppu_addr(0x2c);
        ppu.write_to_ppu_addr(0x05);
        ppu.read_data();
        assert_eq!(ppu.read_data(), 0x77);
    }

    #[test]
    fn status_read_clears_vblank_and_resets_latches() {
        let mut ppu = test_ppu();
        ppu.status.insert(PPUSTATUS::VBLANK_STARTED);

        assert_eq!(ppu.read_status() & 0b1000_0000, 0b1000_0000);
        assert_eq!(ppu.read_status() & 0b1000_0000, 0);

        ppu.write_to_ppu_addr(0x21);
        ppu.write_to_ppu_addr(0xff);
        assert_eq!(ppu.ppu_addr.get(), 0x21ff);
    }

    #[test]
    fn palette_mirror_round_trip() {
        let mut ppu = test_ppu();
        ppu.write_to_ppu_addr(0x3f);
        ppu.write_to_ppu_addr(0x00);
        ppu.write_to_data(0x11);

        ppu.write_to_ppu_addr(0x3f);
        ppu.write_to_ppu_addr(0x10);
        assert_eq!(ppu.read_data(), 0x11);
    }

    #[test]
    fn nmi_raised_at_vblank_scanline_when_enabled() {
        let mut ppu = test_ppu();
        ppu.write_to_controller(0b1000_0000); // GENERATE_NMI
        assert!(ppu.nmi_interrupt.is_none());

        let dots_to_vblank = DOTS_PER_SCANLINE * (VBLANK_SCANLINE as usize);
        let frame_complete = ppu.tick(dots_to_vblank);
        assert!(!frame_complete);
        assert!(ppu.nmi_interrupt.is_some());
        assert!(ppu.status.contains(PPUSTATUS::VBLANK_STARTED));
    }

    #[test]
    fn frame_completes_at_scanline_wrap() {
        let mut ppu = test_ppu();
        let total_dots = DOTS_PER_SCANLINE * (SCANLINES_PER_FRAME as usize);
        assert!(ppu.tick(total_dots));
        assert_eq!(ppu.scanline, 0);
    }

    #[test]
    fn writing_controller_with_vblank_already_set_raises_nmi_immediately() {
        let mut ppu = test_ppu();
        ppu.status.insert(PPUSTATUS::VBLANK_STARTED);
        assert!(ppu.nmi_interrupt.is_none());
        ppu.write_to_controller(0b1000_0000);
        assert!(ppu.nmi_interrupt.is_some());
    }
}
