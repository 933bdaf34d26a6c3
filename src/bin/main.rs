extern crate tonegen;

use tonegen::{SoftPwm, ToneGen, TICK_RATE};

use chrono::Utc;
use clap::{clap_app, crate_version};

use std::fs::File;
use std::io::{BufWriter, Write};

// Real-time pacing: 50 slices per second of carrier ticks.
#[cfg(not(feature = "playback"))]
const PACE_CHUNK: u32 = TICK_RATE / 50;
#[cfg(not(feature = "playback"))]
const PACE_TIME: i64 = 20_000;

fn main() {
    let app = clap_app!(tonegen =>
        (version: crate_version!())
        (about: "CTCSS and beep tone generator demo.")
        (@arg ctcss: -c --ctcss +takes_value "CTCSS tone frequency in Hz.")
        (@arg beep: -b --beep +takes_value "Beep frequency in Hz.")
        (@arg time: -t --time +takes_value "Beep duration in milliseconds (timed beep).")
        (@arg run: -r --run +takes_value "Run time in seconds.")
        (@arg out: -o --out +takes_value "Write raw unsigned 8-bit samples to this file.")
    );

    let cmd_args = app.get_matches();

    let ctcss = cmd_args.value_of("ctcss").map(parse_hz);
    let beep = cmd_args.value_of("beep").map(parse_hz);
    let beep_ms = cmd_args.value_of("time").map(parse_ms);

    let run_secs = match cmd_args.value_of("run") {
        Some(s) => match s.parse::<u32>() {
            Ok(secs) => secs,
            Err(_) => panic!("Invalid run time: {}", s),
        },
        None => 2,
    };

    if ctcss.is_none() && beep.is_none() {
        panic!("Usage: tonegen-bin --ctcss <hz> and/or --beep <hz>. Run with --help for more options.");
    }
    if beep_ms.is_some() && beep.is_none() {
        panic!("--time needs a beep frequency (--beep).");
    }

    let mut gen = ToneGen::new(SoftPwm::new());

    if let Some(hz) = ctcss {
        gen.set_tone_frequency(hz);
        gen.tone_on();
        println!("CTCSS tone: {}Hz", hz);
    }

    if let Some(hz) = beep {
        gen.set_beep_frequency(hz);
        match beep_ms {
            Some(ms) => {
                gen.timed_beep(ms);
                println!("Beep: {}Hz for {}ms", hz, ms);
            },
            None => {
                gen.beep_on();
                println!("Beep: {}Hz", hz);
            },
        }
    }

    match cmd_args.value_of("out") {
        Some(path) => {
            render_to_file(&mut gen, path, run_secs);
            gen.shutdown();
            println!("Carrier idle, outputs released.");
        },
        None => monitor(gen, run_secs),
    }
}

fn parse_hz(s: &str) -> f32 {
    match s.parse::<f32>() {
        Ok(hz) if hz >= 0.0 => hz,
        _ => panic!("Invalid frequency: {}", s),
    }
}

fn parse_ms(s: &str) -> u16 {
    match s.parse::<u16>() {
        Ok(ms) if ms > 0 => ms,
        _ => panic!("Invalid duration: {}", s),
    }
}

// Render the carrier output unpaced: one byte per tick, 128 when idle.
fn render_to_file(gen: &mut ToneGen<SoftPwm>, path: &str, secs: u32) {
    let mut out = match File::create(path) {
        Ok(f) => BufWriter::new(f),
        Err(e) => panic!("Could not create {}: {}", path, e),
    };

    let ticks = secs * TICK_RATE;
    for _ in 0..ticks {
        if gen.is_running() {
            gen.tick();
        }
        let sample = (gen.hw().mixed_sample() * 127.5 + 127.5) as u8;
        out.write_all(&[sample]).expect("sample write failed");
    }

    println!("Wrote {} samples ({}Hz tick rate) to {}", ticks, TICK_RATE, path);
}

// Tick the engine in real time, reporting when the carrier powers itself down.
#[cfg(not(feature = "playback"))]
fn monitor(mut gen: ToneGen<SoftPwm>, secs: u32) {
    let mut was_running = gen.is_running();

    for _ in 0..secs * 50 {
        let slice = Utc::now();

        for _ in 0..PACE_CHUNK {
            if gen.is_running() {
                gen.tick();
            }
        }

        if was_running && !gen.is_running() {
            println!("Carrier auto-shutdown: both channels idle.");
        }
        was_running = gen.is_running();

        while (Utc::now() - slice) < chrono::Duration::microseconds(PACE_TIME) {}
    }

    gen.shutdown();
    println!("Carrier idle, outputs released.");
}

// With playback enabled the engine runs on the audio thread instead.
#[cfg(feature = "playback")]
fn monitor(gen: ToneGen<SoftPwm>, secs: u32) {
    start_playback_thread(gen);

    let start = Utc::now();
    while (Utc::now() - start) < chrono::Duration::seconds(secs as i64) {}
}

#[cfg(feature = "playback")]
fn start_playback_thread(mut gen: ToneGen<SoftPwm>) {
    use std::thread;

    thread::spawn(move || {
        let event_loop = cpal::EventLoop::new();

        let device = cpal::default_output_device().expect("no output device available.");

        let mut supported_formats_range = device.supported_output_formats()
            .expect("error while querying formats");

        let format = supported_formats_range.next()
            .expect("No supported format")
            .with_max_sample_rate();

        let stream_id = event_loop.build_output_stream(&device, &format).unwrap();

        let channels = format.channels as usize;
        let ticks_per_sample = tonegen::ACTUAL_SAMPLE_RATE / (format.sample_rate.0 as f32);
        let mut tick_phase = 0.0_f32;
        let mut frame_val = 0.0_f32;

        event_loop.play_stream(stream_id);

        event_loop.run(move |_stream_id, stream_data| {
            use cpal::StreamData::*;
            use cpal::UnknownTypeOutputBuffer::*;

            match stream_data {
                Output { buffer: U16(mut buffer) } => {
                    for (i, elem) in buffer.iter_mut().enumerate() {
                        if i % channels == 0 {
                            frame_val = next_sample(&mut gen, &mut tick_phase, ticks_per_sample);
                        }
                        *elem = ((frame_val * 0.5 + 0.5) * u16::max_value() as f32) as u16;
                    }
                },
                Output { buffer: I16(mut buffer) } => {
                    for (i, elem) in buffer.iter_mut().enumerate() {
                        if i % channels == 0 {
                            frame_val = next_sample(&mut gen, &mut tick_phase, ticks_per_sample);
                        }
                        *elem = (frame_val * i16::max_value() as f32) as i16;
                    }
                },
                Output { buffer: F32(mut buffer) } => {
                    for (i, elem) in buffer.iter_mut().enumerate() {
                        if i % channels == 0 {
                            frame_val = next_sample(&mut gen, &mut tick_phase, ticks_per_sample);
                        }
                        *elem = frame_val;
                    }
                },
                _ => {},
            }
        });
    });
}

// Step the carrier at its own rate underneath the device sample rate.
#[cfg(feature = "playback")]
fn next_sample(gen: &mut ToneGen<SoftPwm>, tick_phase: &mut f32, ticks_per_sample: f32) -> f32 {
    *tick_phase += ticks_per_sample;
    while *tick_phase >= 1.0 {
        if gen.is_running() {
            gen.tick();
        }
        *tick_phase -= 1.0;
    }

    gen.hw().mixed_sample()
}
