use std::cell::RefCell;
use std::rc::Rc;

use macroquad::prelude::*;
use nes_core::bus::Bus;
use nes_core::cartridge::Cartridge;
use nes_core::cpu::CPU;
use nes_core::joypad::JoypadButton;
use nes_core::render::constants::{HEIGHT, WIDTH};
use nes_core::render::frame::Frame;
use nes_core::render::render;

const SCREEN_WIDTH: i32 = 1024;
const SCREEN_HEIGHT: i32 = 960;
const DEFAULT_ROM: &str = "pacman.nes";

fn window_conf() -> Conf {
    Conf {
        window_title: "nes_core".to_owned(),
        window_width: SCREEN_WIDTH,
        window_height: SCREEN_HEIGHT,
        ..Default::default()
    }
}

fn frame_to_image(frame: &Frame) -> Image {
    let mut bytes = Vec::with_capacity(WIDTH * HEIGHT * 4);
    for chunk in frame.data.chunks(3) {
        bytes.push(chunk[0]);
        bytes.push(chunk[1]);
        bytes.push(chunk[2]);
        bytes.push(255);
    }
    Image {
        bytes,
        width: WIDTH as u16,
        height: HEIGHT as u16,
    }
}

fn key_to_button(key: KeyCode) -> Option<JoypadButton> {
    match key {
        KeyCode::Down => Some(JoypadButton::DOWN),
        KeyCode::Up => Some(JoypadButton::UP),
        KeyCode::Right => Some(JoypadButton::RIGHT),
        KeyCode::Left => Some(JoypadButton::LEFT),
        KeyCode::Space => Some(JoypadButton::SELECT),
        KeyCode::Enter => Some(JoypadButton::START),
        KeyCode::A => Some(JoypadButton::BUTTON_A),
        KeyCode::S => Some(JoypadButton::BUTTON_B),
        _ => None,
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    let rom_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_ROM.to_string());
    let bytes = std::fs::read(&rom_path).unwrap_or_else(|e| {
        panic!("could not read ROM at {}: {}", rom_path, e);
    });
    let cartridge = Cartridge::new(&bytes).unwrap_or_else(|e| {
        panic!("could not parse ROM at {}: {}", rom_path, e);
    });

    let texture = Texture2D::from_image(&Image::gen_image_color(
        WIDTH as u16,
        HEIGHT as u16,
        BLACK,
    ));
    texture.set_filter(FilterMode::Nearest);

    // `run_with_callback` only returns on BRK, which a running game never hits,
    // so the host can't wait for it to yield back to macroquad's async frame
    // loop. Instead the frame callback flips `frame_ready`, and the outer loop
    // below steps the CPU one instruction at a time until a frame is ready,
    // then awaits `next_frame()` before resuming.
    let frame_ready = Rc::new(RefCell::new(false));
    let frame_ready_cb = frame_ready.clone();

    let bus = Bus::new_with_callback(cartridge, move |ppu, joypad| {
        let mut frame = Frame::new();
        render(ppu, &mut frame);
        texture.update(&frame_to_image(&frame));

        for key in [
            KeyCode::Down,
            KeyCode::Up,
            KeyCode::Right,
            KeyCode::Left,
            KeyCode::Space,
            KeyCode::Enter,
            KeyCode::A,
            KeyCode::S,
        ] {
            if let Some(button) = key_to_button(key) {
                joypad.set_pressed(button, is_key_down(key));
            }
        }

        *frame_ready_cb.borrow_mut() = true;
    });

    let mut cpu = CPU::new(bus);
    cpu.reset();

    loop {
        while !*frame_ready.borrow() {
            if !cpu.step(&mut |_| {}) {
                // BRK halted the program; nothing left to run.
                return;
            }
        }
        *frame_ready.borrow_mut() = false;

        clear_background(BLACK);
        draw_texture_ex(
            &texture,
            0.,
            0.,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(SCREEN_WIDTH as f32, SCREEN_HEIGHT as f32)),
                ..Default::default()
            },
        );
        next_frame().await;
    }
}
