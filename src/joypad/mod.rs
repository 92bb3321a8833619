//! Implementation of controller input ($4016)
//! Reference: https://www.nesdev.org/wiki/Standard_controller

bitflags! {
    // https://wiki.nesdev.com/w/index.php/Controller_reading_code
    #[derive(Clone, Copy)]
    pub struct JoypadButton: u8 {
        const RIGHT             = 1 << 7;
        const LEFT              = 1 << 6;
        const DOWN              = 1 << 5;
        const UP                = 1 << 4;
        const START             = 1 << 3;
        const SELECT            = 1 << 2;
        const BUTTON_B          = 1 << 1;
        const BUTTON_A          = 1 << 0;
    }
}

#[derive(Clone, Copy)]
pub struct Joypad {
    strobe: bool,
    button_index: u8,
    pub button_status: JoypadButton,
}
 
impl Joypad {
    pub fn new() -> Self {
        Joypad {
            strobe: false,
            button_index: 0,
            button_status: JoypadButton::from_bits_truncate(0),
        }
    }

    pub fn write(&mut self, data: u8) {
        // Set strobe to last bit of data.
        self.strobe = data & 1 == 1;
        if self.strobe {
            self.button_index = 0;
        }
    }

    pub fn read(&mut self) -> u8 {
        if self.button_index > 7 {
            return 1;
        }
        // Extracts the button_index-th bit.
        let response = (self.button_status.bits() & (1 << self.button_index)) >> self.button_index;
        if !self.strobe && self.button_index <= 7 {
            self.button_index += 1;
        }
        response
    }

    /// Host-facing input hook: flips a single button's pressed state.
    pub fn set_pressed(&mut self, button: JoypadButton, pressed: bool) {
        self.button_status.set(button, pressed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strobe_resets_read_index_and_reads_lsb_first() {
        let mut joypad = Joypad::new();
        joypad.set_pressed(JoypadButton::BUTTON_A, true);
        joypad.set_pressed(JoypadButton::RIGHT, true);

        joypad.write(1); // strobe high
        assert_eq!(joypad.read(), 1); // A, repeatable while strobe is high
        assert_eq!(joypad.read(), 1);

        joypad.write(0); // strobe low, start advancing
        assert_eq!(joypad.read(), 1); // A
        for _ in 0..6 {
            assert_eq!(joypad.read(), 0);
        }
        assert_eq!(joypad.read(), 1); // RIGHT is the 8th bit
    }

    #[test]
    fn ninth_read_returns_one() {
        let mut joypad = Joypad::new();
        joypad.write(0);
        for _ in 0..8 {
            joypad.read();
        }
        assert_eq!(joypad.read(), 1);
    }
}


