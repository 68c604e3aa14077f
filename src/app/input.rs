//! Operator console on stdin: the manual entry form plus system controls.

use crossbeam::channel::Sender;
use std::io::{self, BufRead};
use std::str::FromStr;
use std::thread;

use crate::{
    payload::{coerce_number, Channel},
    reading::RawReading,
    Error, Result,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Send(RawReading),
    Manual(bool),
    Start,
    Stop,
    Connect,
    Disconnect,
    Status,
    Help,
    Quit,
}

/// Lines from the console reader thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEvent {
    Command(ConsoleCommand),
    Invalid(String),
    /// stdin reached EOF; no more commands will come.
    Closed,
}

pub const CONSOLE_HELP: &str = "commands: send <toe> <inside> <laces> [vrist2 inside2 bridge] | send toe=400 heel=20 | manual on|off | start | stop | connect | disconnect | status | quit";

impl FromStr for ConsoleCommand {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| Error::InvalidArgs("empty command".into()))?
            .to_ascii_lowercase();
        let rest: Vec<&str> = words.collect();
        let no_args = |cmd: ConsoleCommand| {
            if rest.is_empty() {
                Ok(cmd)
            } else {
                Err(Error::InvalidArgs(format!("'{verb}' takes no arguments")))
            }
        };
        match verb.as_str() {
            "send" | "push" => parse_send(&rest).map(ConsoleCommand::Send),
            "manual" => match rest.as_slice() {
                ["on"] | ["true"] | ["1"] => Ok(ConsoleCommand::Manual(true)),
                ["off"] | ["false"] | ["0"] => Ok(ConsoleCommand::Manual(false)),
                _ => Err(Error::InvalidArgs("usage: manual on|off".into())),
            },
            "start" => no_args(ConsoleCommand::Start),
            "stop" => no_args(ConsoleCommand::Stop),
            "connect" => no_args(ConsoleCommand::Connect),
            "disconnect" => no_args(ConsoleCommand::Disconnect),
            "status" => no_args(ConsoleCommand::Status),
            "help" | "?" => no_args(ConsoleCommand::Help),
            "quit" | "exit" => no_args(ConsoleCommand::Quit),
            other => Err(Error::InvalidArgs(format!(
                "unknown command '{other}' (try help)"
            ))),
        }
    }
}

/// Positional values fill channels in canonical order; `key=value` pairs use
/// channel names or their aliases. Unparsable numbers count as 0.
fn parse_send(args: &[&str]) -> Result<RawReading> {
    if args.is_empty() {
        return Err(Error::InvalidArgs(
            "send needs at least one value".into(),
        ));
    }
    let mut reading = RawReading::zero();
    let named = args.iter().any(|a| a.contains('='));
    if named {
        for arg in args {
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                Error::InvalidArgs(format!("cannot mix positional and named values: '{arg}'"))
            })?;
            let channel = Channel::from_key(key)
                .ok_or_else(|| Error::InvalidArgs(format!("unknown channel '{key}'")))?;
            reading.set(channel, coerce_text(value));
        }
    } else {
        if args.len() > Channel::COUNT {
            return Err(Error::InvalidArgs(format!(
                "send takes at most {} values",
                Channel::COUNT
            )));
        }
        let values: Vec<f64> = args.iter().map(|a| coerce_text(a)).collect();
        reading = RawReading::from_values(&values);
    }
    Ok(reading)
}

fn coerce_text(raw: &str) -> f64 {
    coerce_number(&serde_json::Value::String(raw.to_string()))
}

/// Parse one console line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Option<ConsoleEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    Some(match trimmed.parse::<ConsoleCommand>() {
        Ok(cmd) => ConsoleEvent::Command(cmd),
        Err(err) => ConsoleEvent::Invalid(err.to_string()),
    })
}

/// Forward parsed lines from `input` until EOF or until the loop hangs up.
pub fn read_console<R: BufRead>(input: R, tx: &Sender<ConsoleEvent>) {
    for line in input.lines() {
        let Ok(line) = line else {
            break;
        };
        if let Some(event) = parse_line(&line) {
            if tx.send(event).is_err() {
                return;
            }
        }
    }
    let _ = tx.send(ConsoleEvent::Closed);
}

/// Spawn the stdin reader. The thread is detached; it ends with the process.
pub fn spawn_console_reader(tx: Sender<ConsoleEvent>) -> io::Result<()> {
    thread::Builder::new()
        .name("kicksense-console".into())
        .spawn(move || read_console(io::stdin().lock(), &tx))?;
    Ok(())
}
