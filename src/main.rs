mod ui;

use clap::Parser;
use retrohub::Config;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

const LOG_FILE: &str = "launcher.log";

#[derive(Parser)]
#[command(name = "retrohub")]
#[command(about = "Browse retro console libraries and launch games in their emulators")]
struct Args {
    /// Console to show on startup (e.g. DENDY, SEGA, SONY)
    #[arg(long)]
    console: Option<String>,

    /// Use this configuration file instead of the default one
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// A writer that writes to both stdout and a file
struct DualWriter {
    file: File,
}

impl DualWriter {
    fn new(file: File) -> Self {
        Self { file }
    }
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        self.file.flush()
    }
}

fn init_logging(debug: bool) {
    let log_level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(log_level);

    // RUST_LOG, when set, wins over --debug
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    let log_path = retrohub::config::base_dir().join(LOG_FILE);
    match File::create(&log_path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(DualWriter::new(file))));
        }
        Err(e) => {
            eprintln!("Warning: Could not create log file {}: {}", log_path.display(), e);
        }
    }

    builder.init();
}

fn load_config(path: Option<&PathBuf>) -> Config {
    match path {
        Some(path) => match Config::load_from(path) {
            Ok(config) => {
                log::info!("Loaded configuration from: {}", path.display());
                config
            }
            Err(e) => {
                log::error!("Failed to load config {}: {}", path.display(), e);
                Config::default()
            }
        },
        None => Config::load(),
    }
}

fn main() -> Result<(), eframe::Error> {
    let args = Args::parse();
    init_logging(args.debug);

    log::info!("Retro HUB {}", env!("CARGO_PKG_VERSION"));
    let config = load_config(args.config.as_ref());
    let config_path = args.config;
    let console = args.console;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Retro HUB")
            .with_inner_size([780.0, 740.0])
            .with_min_inner_size([200.0, 250.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Retro HUB",
        options,
        Box::new(move |cc| {
            Ok(Box::new(ui::RetroHubApp::new(
                &cc.egui_ctx,
                config,
                config_path,
                console,
            )))
        }),
    )
}
