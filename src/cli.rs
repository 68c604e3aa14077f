use crate::{config::SourceKind, Error, Result};

/// Options for the `run` command; values are `None` when not provided on CLI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunOptions {
    pub source: Option<SourceKind>,
    pub endpoint: Option<String>,
    pub device: Option<String>,
    pub baud: Option<u32>,
    pub poll_interval_ms: Option<u64>,
    pub max_raw: Option<u32>,
    pub manual: bool,
    pub config_path: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
}

/// Parsed command-line intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(RunOptions),
    ShowHelp,
    ShowVersion,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut iter = args.iter();
        match iter.next().map(|s| s.as_str()) {
            None => Ok(Command::Run(RunOptions::default())),
            Some("run") => Ok(Command::Run(parse_run_options(&mut iter)?)),
            Some("--help") | Some("-h") => Ok(Command::ShowHelp),
            Some("--version") | Some("-V") => Ok(Command::ShowVersion),
            Some(flag) if flag.starts_with('-') => {
                // `run` is optional; reparse from the first flag.
                let mut iter = args.iter();
                Ok(Command::Run(parse_run_options(&mut iter)?))
            }
            Some(cmd) => Err(Error::InvalidArgs(format!(
                "unknown command '{cmd}', try --help"
            ))),
        }
    }

    pub fn help() -> &'static str {
        concat!(
            "kicksense - pressure-sensor ingestion daemon for the sensor shoe\n",
            "\n",
            "USAGE:\n",
            "  kicksense [run] [--source <kind>] [--endpoint <url>] [--device <path>] [--baud <number>]\n",
            "                  [--poll-interval-ms <ms>] [--max-raw <number>] [--manual]\n",
            "                  [--config <path>] [--log-level <level>] [--log-file <path>]\n",
            "  kicksense --help\n",
            "  kicksense --version\n",
            "\n",
            "OPTIONS:\n",
            "  --source <kind>          poll | serial | demo | simulate (default: poll)\n",
            "  --endpoint <url>         Remote store URL polled for the latest snapshot\n",
            "  --device <path>          Serial device path (default: /dev/ttyACM0)\n",
            "  --baud <number>          Baud rate (default: 115200)\n",
            "  --poll-interval-ms <ms>  Remote poll interval (default: 120)\n",
            "  --max-raw <number>       Full-scale raw sensor value (default: 800)\n",
            "  --manual                 Start in manual mode; automatic feeds stay off\n",
            "  --config <path>          Config file (default: ~/.kicksense/config.toml)\n",
            "  --log-level <level>      error | warn | info | debug | trace (default: info)\n",
            "  --log-file <path>        Append logs to this file as well as stderr\n",
            "  -h, --help               Show this help\n",
            "  -V, --version            Show version\n",
            "\n",
            "CONSOLE (stdin):\n",
            "  send <toe> <inside> <laces> [vrist2 inside2 bridge] | send toe=400 heel=20\n",
            "  manual on|off, start, stop, connect, disconnect, status, help, quit\n",
        )
    }

    pub fn print_help() {
        println!("{}", Self::help());
    }
}

fn parse_run_options(iter: &mut std::slice::Iter<String>) -> Result<RunOptions> {
    let mut opts = RunOptions::default();

    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--source" => {
                let raw = take_value(flag, iter)?;
                opts.source = Some(raw.parse().map_err(Error::InvalidArgs)?);
            }
            "--endpoint" => {
                opts.endpoint = Some(take_value(flag, iter)?);
            }
            "--device" => {
                opts.device = Some(take_value(flag, iter)?);
            }
            "--baud" => {
                let raw = take_value(flag, iter)?;
                opts.baud = Some(
                    raw.parse()
                        .map_err(|_| Error::InvalidArgs("baud must be a positive integer".to_string()))?,
                );
            }
            "--poll-interval-ms" => {
                let raw = take_value(flag, iter)?;
                opts.poll_interval_ms = Some(raw.parse().map_err(|_| {
                    Error::InvalidArgs("poll-interval-ms must be a positive integer".to_string())
                })?);
            }
            "--max-raw" => {
                let raw = take_value(flag, iter)?;
                opts.max_raw = Some(
                    raw.parse()
                        .map_err(|_| Error::InvalidArgs("max-raw must be a positive integer".to_string()))?,
                );
            }
            "--manual" => {
                opts.manual = true;
            }
            "--config" => {
                opts.config_path = Some(take_value(flag, iter)?);
            }
            "--log-level" => {
                opts.log_level = Some(take_value(flag, iter)?);
            }
            "--log-file" => {
                opts.log_file = Some(take_value(flag, iter)?);
            }
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown flag '{other}', try --help"
                )));
            }
        }
    }

    Ok(opts)
}

fn take_value(flag: &str, iter: &mut std::slice::Iter<String>) -> Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| Error::InvalidArgs(format!("expected a value after {flag}")))
}
