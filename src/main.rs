//! acsbridge main entry point
//!
//! Runs a shell in a pseudo-terminal and reads it aloud. The loop waits on
//! three sources through the bridge:
//! 1. the console (keys from stdin, output from the shell)
//! 2. the synthesizer (index markers and status bytes)
//! 3. the message FIFO (commands from other programs)
//! SIGWINCH only sets a flag; the resize happens on the next pass.

use acsbridge::bridge::{Bridge, BridgeEvent};
use acsbridge::buffer::ReadingBuffer;
use acsbridge::fifo::Fifo;
use acsbridge::input::Keymap;
use acsbridge::mux::EventMux;
use acsbridge::speech::{create_codec, open_link, SynthChannel};
use acsbridge::state::config::Config;
use acsbridge::state::{Session, Settings};
use acsbridge::terminal::{get_terminal_size, restore_termios, set_raw_mode, PtyConsole};
use anyhow::{bail, Context};
use log::{debug, error, info, warn};
use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};

/// Global flag set by SIGWINCH handler
static RESIZE_PENDING: AtomicBool = AtomicBool::new(false);

/// SIGWINCH handler - sets flag when terminal is resized
extern "C" fn handle_sigwinch(_: libc::c_int) {
    RESIZE_PENDING.store(true, Ordering::Relaxed);
}

const USAGE: &str = "usage: acsbridge [--debug] [--config <path>] [program [args...]]";

#[derive(Debug, Default)]
struct Options {
    debug: bool,
    config: Option<PathBuf>,
    program: Option<Vec<String>>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Options, String> {
    let mut opts = Options::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--debug" | "-d" => opts.debug = true,
            "--config" | "-c" => {
                let path = args.next().ok_or("--config needs a path")?;
                opts.config = Some(PathBuf::from(path));
            }
            "--" => {
                opts.program = Some(args.collect());
                break;
            }
            _ => {
                // The first other word starts the program and its arguments
                let mut program = vec![arg];
                program.extend(args);
                opts.program = Some(program);
                break;
            }
        }
    }
    opts.program = opts.program.filter(|p| !p.is_empty());
    Ok(opts)
}

fn init_logging(debug_mode: bool) {
    if debug_mode {
        // Debug mode: write to acsbridge.log
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("acsbridge.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open acsbridge.log for debug logging: {}", e);
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }
        info!("acsbridge {} starting (debug mode)", acsbridge::VERSION);
    } else {
        // Errors only, unless RUST_LOG says otherwise
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Error)
            .parse_default_env()
            .init();
    }
}

fn main() {
    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("acsbridge: {}", e);
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };
    init_logging(opts.debug);

    if let Err(e) = run(opts) {
        error!("Fatal error: {:#}", e);
        eprintln!("acsbridge: {:#}", e);
        process::exit(1);
    }
}

/// Open the configured synthesizer and put it into a known state
fn open_synth(config: &Config) -> acsbridge::Result<SynthChannel> {
    let style = config.synth_style()?;
    let link = open_link(&config.link()?)?;
    info!("Synthesizer {:?} on {}", style, link.describe());
    let mut channel = SynthChannel::new(link, create_codec(style));
    channel.start_values(&config.start_values())?;
    Ok(channel)
}

fn run(opts: Options) -> anyhow::Result<()> {
    let stdin_fd = io::stdin().as_raw_fd();
    if unsafe { libc::isatty(stdin_fd) } == 0 {
        bail!("stdin is not a terminal; run acsbridge directly in a terminal");
    }

    let config = match &opts.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading configuration")?;
    info!("Configuration from {}", config.path().display());

    let settings = Settings::from_config(&config).context("[reading] settings")?;
    let dict = config.dictionaries().context("[symbols] or [words]")?;
    let mut keymap = Keymap::new();
    keymap
        .apply_overrides(&config.section("keys"))
        .context("[keys] bindings")?;
    info!("Key map has {} bindings", keymap.len());

    let mut buffer = ReadingBuffer::new(
        config.buffer_mode().context("[reading] mode")?,
        config.capacity(),
    );
    buffer.set_postprocess(config.postprocess().context("[reading] postprocess")?);

    // Without a synthesizer we still run, silently, so the shell is usable
    let channel = match open_synth(&config) {
        Ok(channel) => Some(channel),
        Err(e) => {
            warn!("No speech: {}", e);
            None
        }
    };

    let fifo = match config.fifo_path() {
        Some(path) => match Fifo::start(&path) {
            Ok(fifo) => Some(fifo),
            Err(e) => {
                warn!("No message FIFO at {}: {}", path.display(), e);
                None
            }
        },
        None => None,
    };

    // Raw mode lets us see every keystroke, including Ctrl+C
    let original_termios = set_raw_mode(stdin_fd).context("setting raw mode")?;
    let _guard = TermiosGuard {
        fd: stdin_fd,
        termios: original_termios,
    };

    let (cols, rows) = get_terminal_size(stdin_fd)?;
    info!("Terminal size: {}x{}", cols, rows);
    let console = PtyConsole::spawn(opts.program, cols, rows).context("starting the shell")?;

    unsafe {
        signal::signal(Signal::SIGWINCH, SigHandler::Handler(handle_sigwinch))
            .context("installing the SIGWINCH handler")?;
    }

    let mux = EventMux::new()?;
    let mut bridge = Bridge::new(
        Box::new(console),
        buffer,
        channel,
        config.first_mark(),
        fifo,
        mux,
    )?;
    let mut session = Session::new(settings, dict, keymap);
    session.attach(&mut bridge);

    info!("acsbridge ready - entering event loop");
    if let Err(e) = bridge.say(b"acsbridge ready") {
        debug!("Greeting not spoken: {}", e);
    }

    loop {
        if RESIZE_PENDING.swap(false, Ordering::Relaxed) {
            let (cols, rows) = get_terminal_size(stdin_fd)?;
            info!("Terminal resized to {}x{}", cols, rows);
            bridge.kernel_mut().resize(cols, rows)?;
        }

        let events = bridge.poll_events(None)?;
        let mut closed = false;
        for event in events {
            closed |= event == BridgeEvent::KernelClosed;
            if let Err(e) = session.handle(&mut bridge, event) {
                error!("Command failed: {}", e);
            }
        }
        if let Err(e) = session.idle(&mut bridge) {
            error!("Auto read failed: {}", e);
        }
        if closed {
            info!("Shell exited");
            break;
        }
    }

    Ok(())
}

/// Restores the terminal when dropped
struct TermiosGuard {
    fd: RawFd,
    termios: libc::termios,
}

impl Drop for TermiosGuard {
    fn drop(&mut self) {
        restore_termios(self.fd, &self.termios);
        debug!("Terminal attributes restored");
    }
}
