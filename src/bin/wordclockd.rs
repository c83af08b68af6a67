use clap::Parser;
use color_eyre::eyre::Result;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use word_clock_config::ntp::{NTP_SERVER, TIMEZONE};
use word_clock_config::*;

/// Word clock configuration daemon. Reads portal traffic from stdin, one
/// command per line: `get:<path>`, `post:<path>:<form body>`, `wifi`,
/// `state`, `quit`.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// NTP server host name
    #[arg(short = 's', long, default_value = NTP_SERVER)]
    ntp_server: String,
    /// POSIX timezone rule
    #[arg(short, long, default_value = TIMEZONE)]
    timezone: String,
    /// Loop period in milliseconds
    #[arg(long, default_value_t = 20)]
    tick_ms: u64,
    /// Treat the config button as pressed at boot
    #[arg(long)]
    reset_ap_password: bool,
}

type Daemon = Controller<SimulatedClock, MemoryPortal, SntpTimeSource, LoggedPin>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("word_clock_config=info")),
        )
        .compact()
        .init();

    color_eyre::install()?;

    let args = Args::parse();
    let config = NtpConfig {
        server: args.ntp_server,
        timezone: args.timezone.parse()?,
        ..NtpConfig::default()
    };

    let portal = MemoryPortal::with_config_button(
        THING_NAME,
        FixedPin {
            low: args.reset_ap_password,
        },
    );
    let synchronizer =
        NtpSynchronizer::new(SntpTimeSource::new(), LoggedPin::new(NTP_STATUS_PIN), config);
    let mut controller: Daemon = Controller::new(SimulatedClock::new(), portal, synchronizer);
    controller.setup()?;

    // Inform about successful initialization
    println!("OK");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interval = tokio::time::interval(Duration::from_millis(args.tick_ms.max(1)));

    loop {
        tokio::select! {
            _ = interval.tick() => controller.tick(Instant::now()),
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !run_command(&mut controller, line.trim()) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    info!("Shutting down");
    Ok(())
}

/// Executes one stdin command. Returns `false` to stop the daemon.
fn run_command(controller: &mut Daemon, line: &str) -> bool {
    debug!("Command {:?}", line);
    let mut parts = line.splitn(3, ':');
    match parts.next() {
        Some("get") => {
            let path = parts.next().unwrap_or("/");
            print_response(&controller.handle_request(&Request::get(path)));
        }
        Some("post") => {
            let path = parts.next().unwrap_or("/config");
            let body = parts.next().unwrap_or_default();
            print_response(&controller.handle_request(&Request::post(path, body)));
        }
        Some("wifi") => {
            controller.portal_mut().connect_wifi();
            println!("OK");
        }
        Some("state") => {
            let clock = controller.coordinator().clock();
            println!("time {}", clock.current_time());
            println!("ntp {:?}", controller.sync_state());
            if let Some(settings) = controller.coordinator().applied() {
                println!("settings {:?}", settings);
            }
            println!("OK");
        }
        Some("quit") => return false,
        Some("") | None => {}
        Some(other) => eprintln!("ERR Unknown command: {other}"),
    }
    true
}

fn print_response(response: &Response) {
    println!("{} {}", response.status, response.content_type);
    for (name, value) in &response.headers {
        println!("{name}: {value}");
    }
    println!("{}", response.body.trim_end());
    println!("OK");
}
