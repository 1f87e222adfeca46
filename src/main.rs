use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::Level;

use perfdesk::app::App;
use perfdesk::demo;
use perfdesk::drivers::console::{ConsoleInputDriver, ConsoleOutputDriver};
use perfdesk::drivers::{InputDriver, OutputDriver};
use perfdesk::event_loop::{ControlFlow, EventLoop};
use perfdesk::keybindings::KeyBindings;
use perfdesk::session::SessionId;
use perfdesk::tracing_sub;
use perfdesk::transport::{Fixture, MemoryTransport, Transport, Worker};

#[derive(Parser, Debug)]
#[command(
    name = "perfdesk",
    version = env!("CARGO_PKG_VERSION"),
    about = "Browse profiling sessions in floating analysis windows"
)]
struct Cli {
    /// JSON fixture to serve sessions from. Without it a built-in demo is used.
    #[arg(long, value_name = "PATH")]
    fixture: Option<PathBuf>,

    /// Session to load on start.
    #[arg(long, value_name = "ID")]
    session: Option<String>,

    /// Input poll interval.
    #[arg(long = "poll-ms", value_name = "MS", default_value_t = 16)]
    poll_ms: u64,

    /// Write logs here. The terminal belongs to the UI, so logs are dropped
    /// otherwise.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[arg(long, value_name = "LEVEL", default_value_t = Level::INFO)]
    log_level: Level,
}

impl Cli {
    fn transport(&self) -> io::Result<Arc<dyn Transport>> {
        let fixture = match &self.fixture {
            Some(path) => Fixture::load(path),
            None => demo::fixture(),
        }
        .map_err(io::Error::other)?;
        Ok(Arc::new(MemoryTransport::new(fixture)))
    }
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    if !(1..=1000).contains(&cli.poll_ms) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "poll-ms must be between 1 and 1000",
        ));
    }
    tracing_sub::init(cli.log_file.as_deref(), cli.log_level)?;

    let worker = Worker::spawn(cli.transport()?)?;
    let mut app = App::new(worker, KeyBindings::default());
    if let Some(id) = cli.session.as_deref() {
        app.preselect(SessionId::new(id));
    }

    let mut output = ConsoleOutputDriver::new()?;
    output.enter()?;
    let mut input = ConsoleInputDriver::new();
    input.set_mouse_capture(true)?;
    app.set_area(output.area()?);
    tracing::info!("perfdesk started");

    let result = EventLoop::new(&mut input, Duration::from_millis(cli.poll_ms)).run(
        |_, event| {
            match event {
                Some(event) => {
                    if app.handle_event(&event) == ControlFlow::Quit {
                        return Ok(ControlFlow::Quit);
                    }
                }
                None => app.pump(),
            }
            output.draw(|mut frame| app.render(&mut frame))?;
            Ok(ControlFlow::Continue)
        },
    );

    output.exit()?;
    tracing::info!("perfdesk stopped");
    result
}
