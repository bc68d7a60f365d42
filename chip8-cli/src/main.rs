/*
Copyright 2020 Anish Jewalikar

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::{fs, process, thread::sleep, time::Duration};

use chip8_core::{DISPLAY_HEIGHT, DISPLAY_WIDTH, Interpreter, Quirks, StepEvent};
use clap::{App, Arg};

/// Instructions executed per 60 Hz frame when `--ipf` is not given.
/// 600 Hz total, matching the pace most public test ROMs assume.
const DEFAULT_INSTRUCTIONS_PER_FRAME: u32 = 10;

fn main() {
    env_logger::init();

    let matches = App::new("chip8-cli")
        .version("0.1.0")
        .about("A headless CHIP-8 interpreter runner.")
        .arg(
            Arg::with_name("file")
                .help("The ROM file to execute")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("ipf")
                .help("Instructions executed per 60 Hz frame")
                .long("ipf")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("frames")
                .help("Stop after running this many frames (default: run forever)")
                .long("frames")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("print-every")
                .help("Print the framebuffer every N frames it changes (0 disables)")
                .long("print-every")
                .takes_value(true)
                .default_value("60"),
        )
        .arg(
            Arg::with_name("vf-reset-quirk")
                .help("8XY1/8XY2/8XY3 reset VF to 0")
                .long("vf-reset-quirk"),
        )
        .arg(
            Arg::with_name("shift-quirk")
                .help("8XY6/8XYE shift Vy into Vx instead of shifting Vx in place")
                .long("shift-quirk"),
        )
        .arg(
            Arg::with_name("load-store-quirk")
                .help("FX55/FX65 increment I by X + 1 after the transfer")
                .long("load-store-quirk"),
        )
        .arg(
            Arg::with_name("no-draw-wrap-quirk")
                .help("Clip sprites at the framebuffer edge instead of wrapping")
                .long("no-draw-wrap-quirk"),
        )
        .arg(
            Arg::with_name("jump-quirk")
                .help("BNNN adds Vx (selected by the jump target's high nibble) instead of V0")
                .long("jump-quirk"),
        )
        .arg(
            Arg::with_name("seed")
                .help("Seed the CXNN random byte generator for a reproducible run")
                .long("seed")
                .takes_value(true),
        )
        .get_matches();

    let path = matches.value_of("file").unwrap();
    let rom = fs::read(path).unwrap_or_else(|err| {
        eprintln!("chip8-cli: failed to read {}: {}", path, err);
        process::exit(1);
    });

    let quirks = Quirks {
        vf_reset_on_logic: matches.is_present("vf-reset-quirk"),
        shift_uses_vy: matches.is_present("shift-quirk"),
        load_store_increments_i: matches.is_present("load-store-quirk"),
        draw_wraps: !matches.is_present("no-draw-wrap-quirk"),
        jumping_quirk_bnnn: matches.is_present("jump-quirk"),
    };

    let mut cpu = match matches.value_of("seed").map(|s| s.parse::<u32>()) {
        Some(Ok(seed)) => Interpreter::with_seed(seed),
        Some(Err(err)) => {
            eprintln!("chip8-cli: invalid --seed: {}", err);
            process::exit(1);
        }
        None => Interpreter::new(),
    };
    cpu.quirks = quirks;

    if let Err(err) = cpu.load(&rom) {
        eprintln!("chip8-cli: {}", err);
        process::exit(1);
    }

    let instructions_per_frame: u32 = matches
        .value_of("ipf")
        .map(|v| v.parse().unwrap_or(DEFAULT_INSTRUCTIONS_PER_FRAME))
        .unwrap_or(DEFAULT_INSTRUCTIONS_PER_FRAME);
    let max_frames: Option<u64> = matches.value_of("frames").and_then(|v| v.parse().ok());
    let print_every: u64 = matches
        .value_of("print-every")
        .and_then(|v| v.parse().ok())
        .unwrap_or(60);

    let mut frame: u64 = 0;
    loop {
        if let Some(limit) = max_frames {
            if frame >= limit {
                break;
            }
        }

        for _ in 0..instructions_per_frame {
            match cpu.step() {
                StepEvent::StackFault(fault) => {
                    eprintln!("chip8-cli: halted: {} at frame {}", fault, frame);
                    process::exit(1);
                }
                StepEvent::UnknownOpcode(opcode) => {
                    log::warn!("chip8-cli: unknown opcode {:#06X} at frame {}", opcode, frame);
                }
                _ => {}
            }
        }

        cpu.tick_timers();

        if cpu.consume_draw_flag() && print_every != 0 && frame % print_every == 0 {
            print_framebuffer(cpu.framebuffer());
        }

        frame += 1;
        sleep(Duration::from_secs_f64(1.0 / 60.0));
    }
}

/// Renders the framebuffer as a block of `#`/` ` characters, since this
/// runner has no windowing surface to draw to.
fn print_framebuffer(gfx: &[u8]) {
    let mut out = String::with_capacity((DISPLAY_WIDTH + 1) * DISPLAY_HEIGHT);
    for row in 0..DISPLAY_HEIGHT {
        for col in 0..DISPLAY_WIDTH {
            let pixel = gfx[row * DISPLAY_WIDTH + col];
            out.push(if pixel != 0 { '#' } else { ' ' });
        }
        out.push('\n');
    }
    print!("{}", out);
}
