use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use std::time::Instant;
use tokio::time::Duration;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::EnvFilter;
use word_clock_config::ntp::{NTP_SERVER, TIMEZONE};
use word_clock_config::parse::{
    parse_bounded_int, parse_color, parse_date, parse_time, RgbColor,
};
use word_clock_config::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configuration portal fields
    Fields,
    /// Run a single value parser
    Parse {
        #[command(subcommand)]
        value: ParseValue,
    },
    /// Apply field values to a simulated clock and show the result
    Apply {
        /// Field assignments, e.g. palette_id=0 color_1=#FF0000
        assignments: Vec<String>,
    },
    /// Synchronize with an NTP server, blinking the status LED meanwhile
    Sync {
        /// NTP server host name
        #[arg(short = 's', long, default_value = NTP_SERVER)]
        ntp_server: String,
        /// POSIX timezone rule
        #[arg(short, long, default_value = TIMEZONE)]
        timezone: String,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
}

#[derive(Subcommand)]
enum ParseValue {
    /// yyyy-mm-dd
    Date { text: String },
    /// hh:mm:ss
    Time { text: String },
    /// #RRGGBB
    Color {
        text: String,
        /// Returned when the text is not a color
        #[arg(short, long, default_value = "#000000")]
        default: String,
    },
    /// Integer within bounds
    Number {
        #[arg(allow_hyphen_values = true)]
        text: String,
        #[arg(long, allow_hyphen_values = true)]
        min: i32,
        #[arg(long, allow_hyphen_values = true)]
        max: i32,
        #[arg(short, long, allow_hyphen_values = true)]
        default: i32,
    },
}

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("word_clock_config=info")),
        )
        .compact()
        .init();

    color_eyre::install()?;

    let cli = Cli::parse();
    debug!("Parsed command line arguments");

    match cli.command.unwrap_or(Commands::Fields) {
        Commands::Fields => print_fields(),
        Commands::Parse { value } => run_parse(value),
        Commands::Apply { assignments } => run_apply(&assignments)?,
        Commands::Sync {
            ntp_server,
            timezone,
            timeout_secs,
        } => run_sync(ntp_server, &timezone, timeout_secs).await?,
    }

    Ok(())
}

fn print_fields() {
    let mut group = "";
    for spec in FIELDS.iter() {
        if spec.group != group {
            group = spec.group;
            println!("{group}");
        }
        let persistence = match spec.persistence {
            Persistence::Persistent => "",
            Persistence::Transient => " (transient)",
        };
        println!(
            "  {:<18} {:<40} {:<14} default {:?}{}",
            spec.name,
            spec.label,
            spec.kind.format_hint(),
            spec.default.unwrap_or_default(),
            persistence
        );
    }
}

fn run_parse(value: ParseValue) {
    match value {
        ParseValue::Date { text } => match parse_date(&text) {
            Some((year, month, day)) => println!("{year:04}-{month:02}-{day:02}"),
            None => println!("not parsed"),
        },
        ParseValue::Time { text } => match parse_time(&text) {
            Some((hour, minute, second)) => println!("{hour:02}:{minute:02}:{second:02}"),
            None => println!("not parsed"),
        },
        ParseValue::Color { text, default } => {
            let default = parse_color(&default, RgbColor::default());
            let color = parse_color(&text, default);
            println!("{color} ({}, {}, {})", color.red, color.green, color.blue);
        }
        ParseValue::Number {
            text,
            min,
            max,
            default,
        } => println!("{}", parse_bounded_int(&text, min, max, default)),
    }
}

#[instrument]
fn run_apply(assignments: &[String]) -> Result<()> {
    let mut coordinator = ConfigCoordinator::new(SimulatedClock::new());
    for assignment in assignments {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| eyre!("Expected name=value, got {assignment:?}"))?;
        coordinator.fields_mut().set_by_name(name, value)?;
    }

    let settings = coordinator.apply_all_fields_to_clock();

    println!("time             {}", coordinator.clock().current_time());
    println!("clock_mode       {}", settings.clock_mode.value());
    println!("dst              {}", settings.dst);
    println!("fast_time_factor {}", settings.fast_time_factor);
    println!("palette_id       {}", settings.palette_id);
    println!("period           {}", settings.show_period);
    for (index, color) in settings.custom_colors.iter().enumerate() {
        println!("color_{}          {}", index + 1, color);
    }
    Ok(())
}

#[instrument]
async fn run_sync(server: String, timezone: &str, timeout_secs: u64) -> Result<()> {
    let config = NtpConfig {
        server,
        timezone: timezone.parse()?,
        ..NtpConfig::default()
    };
    let mut synchronizer =
        NtpSynchronizer::new(SntpTimeSource::new(), LoggedPin::new(NTP_STATUS_PIN), config);

    synchronizer.on_wifi_connected();

    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    let mut interval = tokio::time::interval(Duration::from_millis(50));
    while Instant::now() < deadline {
        interval.tick().await;
        synchronizer.tick(Instant::now());
        if synchronizer.state() == SyncState::Connected {
            // One more tick so the LED shows the final state.
            synchronizer.tick(Instant::now());
            info!(
                "Synchronized after {} LED changes",
                synchronizer.led().pin().transitions
            );
            return Ok(());
        }
    }

    warn!("No NTP time within {}s", timeout_secs);
    Err(eyre!("NTP synchronization timed out, state {:?}", synchronizer.state()))
}
