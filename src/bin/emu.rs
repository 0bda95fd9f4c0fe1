use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use env_logger::Env;
use pixels::{Pixels, SurfaceTexture};
use rodio::{OutputStream, OutputStreamBuilder, Sink, Source, source::SquareWave};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, KeyCode, NamedKey, PhysicalKey},
    window::{Window, WindowId},
};

use chip8_core::{
    Buzzer, Chip8, Chip8Config, Chip8Runner, DEFAULT_CPU_HZ, DEFAULT_STACK_DEPTH, DISPLAY_X,
    DISPLAY_Y, Display, KeypadState, Quirks, Screen, u4,
};

/// The rate at which pixels fade out (phosphor decay).
const DISPLAY_PHOSPHOR_RATE: f32 = 10.0;

/// Mapping from physical keyboard keys to CHIP-8 hex keypad (0x0-0xF).
const KEY_MAP: [KeyCode; 16] = [
    KeyCode::KeyX,   // 0x00
    KeyCode::Digit1, // 0x01
    KeyCode::Digit2, // 0x02
    KeyCode::Digit3, // 0x03
    KeyCode::KeyQ,   // 0x04
    KeyCode::KeyW,   // 0x05
    KeyCode::KeyE,   // 0x06
    KeyCode::KeyA,   // 0x07
    KeyCode::KeyS,   // 0x08
    KeyCode::KeyD,   // 0x09
    KeyCode::KeyZ,   // 0x0A
    KeyCode::KeyC,   // 0x0B
    KeyCode::Digit4, // 0x0C
    KeyCode::KeyR,   // 0x0D
    KeyCode::KeyF,   // 0x0E
    KeyCode::KeyV,   // 0x0F
];

/// Holds the last grid the interpreter presented until the next frame is rendered.
struct FrameBuffer {
    pixels: Display<bool>,
}

impl Screen for FrameBuffer {
    fn present(&mut self, pixels: &Display<bool>) {
        self.pixels = *pixels;
    }
}

/// A square wave parked on a paused sink.
struct SquareBuzzer {
    sink: Sink,
}

impl SquareBuzzer {
    fn new(stream: &OutputStream) -> Self {
        let sink = Sink::connect_new(stream.mixer());
        sink.pause();
        sink.append(SquareWave::new(440.0).amplify(0.5));
        Self { sink }
    }
}

impl Buzzer for SquareBuzzer {
    fn start_tone(&mut self) {
        self.sink.play();
    }

    fn stop_tone(&mut self) {
        self.sink.pause();
    }
}

struct App {
    pixels: Option<Pixels<'static>>,
    window: Option<Arc<Window>>,
    /// Stores the brightness of each pixel (0.0 to 1.0) to implement phosphor decay.
    display_float: Display<f32>,

    /// Audio output stream (must be kept alive).
    _audio_stream: OutputStream,
    buzzer: SquareBuzzer,

    runner: Chip8Runner,
    keypad: KeypadState,
    frame: FrameBuffer,
    /// Used for delta time calculation.
    last_frame_instant: Instant,

    /// Stores the result of the application to be returned from main.
    exit_result: anyhow::Result<()>,
}

impl App {
    fn new(rom: &[u8], config: Chip8Config, cpu_hz: u32) -> anyhow::Result<Self> {
        // Initialize audio
        let mut _audio_stream = OutputStreamBuilder::open_default_stream()
            .context("Failed to open audio output stream")?;
        _audio_stream.log_on_drop(false);
        let buzzer = SquareBuzzer::new(&_audio_stream);

        // Initialize CHIP-8
        let mut chip8 = Chip8::new(config);
        chip8
            .load(rom)
            .context("Failed to load ROM into CHIP-8 memory")?;
        let runner = Chip8Runner::with_cpu_hz(chip8, cpu_hz);
        log::info!("running at {} Hz", runner.cpu_hz());

        Ok(Self {
            pixels: None,
            window: None,
            display_float: [[0.0; DISPLAY_X]; DISPLAY_Y],

            _audio_stream,
            buzzer,

            runner,
            keypad: KeypadState::new(),
            frame: FrameBuffer {
                pixels: [[false; DISPLAY_X]; DISPLAY_Y],
            },
            last_frame_instant: Instant::now(),
            exit_result: Ok(()),
        })
    }

    fn step(&mut self, dt: Duration) -> anyhow::Result<()> {
        let result = self
            .runner
            .update(dt, &self.keypad, &mut self.frame, &mut self.buzzer);

        if let Err(e) = &result {
            log::error!("interpreter stopped: {e}");
            log::debug!("machine state at failure:\n{}", self.runner.chip8_ref().dump());
        }

        result.context("Chip8 Execution error")?;
        Ok(())
    }

    fn process_display(&mut self, dt: f32) -> anyhow::Result<()> {
        let buff = self
            .pixels
            .as_mut()
            .context("Pixels surface not initialized")?
            .frame_mut();

        for (i, pxl) in buff.chunks_exact_mut(4).enumerate() {
            let x = i % DISPLAY_X;
            let y = i / DISPLAY_X;

            // Lit pixels jump to full brightness, unlit ones fade out over time
            self.display_float[y][x] = if self.frame.pixels[y][x] {
                1.0
            } else {
                (self.display_float[y][x] - DISPLAY_PHOSPHOR_RATE * dt).max(0.0)
            };

            let rgba = [0, 0xff, 0, (self.display_float[y][x] * 255.0) as u8];
            pxl.copy_from_slice(&rgba);
        }

        Ok(())
    }

    fn set_key(&mut self, code: KeyCode, pressed: bool) {
        if let Some(key) = KEY_MAP.iter().position(|&k| k == code) {
            self.keypad.set_key(u4::new(key as u8), pressed);
        }
    }

    fn try_resumed(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = {
            let size = LogicalSize::new(DISPLAY_X as u32 * 10, DISPLAY_Y as u32 * 10);
            let min_size = LogicalSize::new(DISPLAY_X as u32, DISPLAY_Y as u32);

            Arc::new(
                event_loop
                    .create_window(
                        Window::default_attributes()
                            .with_title("chip8-core")
                            .with_inner_size(size)
                            .with_min_inner_size(min_size),
                    )
                    .context("Failed to create window")?,
            )
        };

        self.window = Some(window.clone());
        self.pixels = {
            let window_size = window.inner_size();
            let surface_texture =
                SurfaceTexture::new(window_size.width, window_size.height, window.clone());

            let pixels = Pixels::new(DISPLAY_X as u32, DISPLAY_Y as u32, surface_texture)
                .context("Failed to create pixels surface")?;

            window.request_redraw();
            Some(pixels)
        };

        // Avoid large dt on first frame
        self.last_frame_instant = Instant::now();
        Ok(())
    }

    fn try_window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        event: WindowEvent,
    ) -> anyhow::Result<()> {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        ..
                    },
                ..
            } => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                self.pixels
                    .as_mut()
                    .context("Pixels surface not initialized")?
                    .resize_surface(size.width, size.height)
                    .context("Failed to resize pixels surface")?;
            }

            WindowEvent::Focused(false) => {
                // Key releases are not delivered to an unfocused window
                self.keypad.release_all();
            }

            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now - self.last_frame_instant;
                self.last_frame_instant = now;

                self.step(dt)?;
                self.process_display(dt.as_secs_f32())?;

                self.pixels
                    .as_ref()
                    .context("Pixels surface not initialized")?
                    .render()
                    .context("Pixels render error")?;

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.set_key(code, event.state == ElementState::Pressed);
                }
            }

            _ => (),
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(e) = self.try_resumed(event_loop) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Err(e) = self.try_window_event(event_loop, event) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Preset {
    /// Shift copies Vy, Bxnn uses Vx, no overflow flag, block ops keep I
    Reference,
    /// The original COSMAC VIP interpreter
    Cosmac,
    /// SUPER-CHIP and later interpreters
    Modern,
}

impl From<Preset> for Quirks {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Reference => Quirks::default(),
            Preset::Cosmac => Quirks::cosmac(),
            Preset::Modern => Quirks::modern(),
        }
    }
}

/// CHIP-8 emulator written in Rust.
///
/// Keys 1-4, Q-R, A-F, Z-V map to CHIP-8 keys.
/// Escape is used to exit the emulator.
/// Set RUST_LOG=debug for call tracing and a state dump on failure.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Path to the CHIP-8 ROM file
    #[arg(env = "CHIP8_ROM")]
    rom_path: PathBuf,

    /// Instructions executed per second
    #[arg(long, env = "CHIP8_HZ", default_value_t = DEFAULT_CPU_HZ,
          value_parser = clap::value_parser!(u32).range(1..))]
    hz: u32,

    /// Interpreter behaviour to start from
    #[arg(long, env = "CHIP8_PRESET", value_enum, default_value_t = Preset::Reference)]
    preset: Preset,

    /// 8xy6/8xyE copy Vy into Vx before shifting
    #[arg(long, env = "CHIP8_SHIFT_COPY")]
    shift_copy: Option<bool>,

    /// Bxnn jumps to Vx + xnn instead of V0 + xnn
    #[arg(long, env = "CHIP8_JUMP_VX")]
    jump_vx: Option<bool>,

    /// Fx1E sets VF when I leaves the 12-bit range
    #[arg(long, env = "CHIP8_INDEX_OVERFLOW")]
    index_overflow: Option<bool>,

    /// Fx55/Fx65 advance I past the last register
    #[arg(long, env = "CHIP8_INCREMENT_INDEX")]
    increment_index: Option<bool>,

    /// Maximum subroutine nesting
    #[arg(long, env = "CHIP8_STACK_DEPTH", default_value_t = DEFAULT_STACK_DEPTH)]
    stack_depth: usize,

    /// Seed for the random number instruction
    #[arg(long, env = "CHIP8_SEED")]
    seed: Option<u64>,
}

impl Args {
    fn config(&self) -> Chip8Config {
        let mut quirks = Quirks::from(self.preset);
        if let Some(on) = self.shift_copy {
            quirks.shift_copies_vy = on;
        }
        if let Some(on) = self.jump_vx {
            quirks.jump_offset_uses_vx = on;
        }
        if let Some(on) = self.index_overflow {
            quirks.index_overflow_sets_vf = on;
        }
        if let Some(on) = self.increment_index {
            quirks.block_ops_increment_index = on;
        }

        Chip8Config {
            quirks,
            stack_depth: self.stack_depth,
            seed: self.seed,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.config();
    log::info!("starting {} with {:?}", args.rom_path.display(), config);

    let rom = std::fs::read(&args.rom_path).context("Failed to read ROM file")?;

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(&rom, config, args.hz).context("Failed to initialize application")?;
    event_loop
        .run_app(&mut app)
        .context("Error occurred during event loop execution")?;

    // Return the result captured during the event loop
    app.exit_result
}
