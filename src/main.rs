use anyhow::{bail, Context, Result};
use rn42::domain::settings::SettingsService;
use rn42::infrastructure::logging::init_logger;
use rn42::{RadioSession, SerialTransport, WriterSink};
use std::io::Write;
use std::time::Duration;
use tracing::info;

const USAGE: &str = "usage: rn42 [--port <name>] [--baud <rate>] <status | connect [address] | listen | send <text>>";

fn main() -> Result<()> {
    let mut settings_service = SettingsService::new()?;
    let _log_guard = init_logger(&settings_service.get().log_settings)?;

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mut radio = settings_service.get().radio.clone();

    while let Some(flag) = args.first().filter(|a| a.starts_with("--")).cloned() {
        args.remove(0);
        if args.is_empty() {
            bail!("missing value for {}\n{}", flag, USAGE);
        }
        let value = args.remove(0);
        match flag.as_str() {
            "--port" => radio.port_name = value,
            "--baud" => {
                radio.baud_rate = value
                    .parse()
                    .with_context(|| format!("invalid baud rate {:?}", value))?
            }
            _ => bail!("unknown option {}\n{}", flag, USAGE),
        }
    }

    info!("Starting RN-42 radio on {}", radio.port_name);

    let transport = SerialTransport::open(&radio.port_name, radio.baud_rate)
        .with_context(|| format!("Failed to open {}", radio.port_name))?;
    let mut session = RadioSession::with_config(transport, radio.radio_config());
    session.attach_console(WriterSink::new(std::io::stderr()));

    if !session.init()? {
        bail!("RN-42 initialization failed");
    }
    session.wait_for_boot()?;

    match args.first().map(String::as_str) {
        Some("status") => {
            if !session.ensure_command_mode()? {
                bail!("could not enter command mode");
            }
            let connected = session.is_connected()?;
            println!("{}", if connected { "connected" } else { "not connected" });
            if !session.ensure_data_mode()? {
                bail!("could not return to data mode");
            }
        }
        Some("connect") => {
            if !session.ensure_command_mode()? {
                bail!("could not enter command mode");
            }
            let address = args.get(1).cloned().or_else(|| radio.remote_address.clone());
            let connected = match address {
                Some(address) => {
                    let ok = session.connect_to_address(&address)?;
                    if ok {
                        settings_service.set_remote_address(&address)?;
                    }
                    ok
                }
                None => session.connect()?,
            };
            if !connected {
                bail!("connect failed");
            }
            println!("connected");
        }
        Some("listen") => {
            if !session.ensure_data_mode()? {
                bail!("could not enter data mode");
            }
            loop {
                let text = session.receive(Duration::from_millis(500))?;
                if !text.is_empty() {
                    print!("{}", text);
                    std::io::stdout().flush()?;
                }
                if session.disconnect_seen() {
                    break;
                }
            }
        }
        Some("send") if args.len() > 1 => {
            if !session.ensure_data_mode()? {
                bail!("could not enter data mode");
            }
            session.send(&args[1..].join(" "))?;
        }
        _ => bail!("{}", USAGE),
    }

    Ok(())
}
