//! Hamlib command grammar and line framing.
//!
//! Each protocol variant is a static table of [`Rule`]s. A line is matched
//! against the rules in order and the first hit parses the rest of the line
//! into a [`Command`]. Lines no rule claims become [`Command::Unknown`].

use tracking::{Degrees, MetersPerSecond};

/// Upper bound for a line still waiting for its terminator.
pub const MAX_LINE_LENGTH: usize = 4096;

/// A typed request from the tracking client.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetFrequency(i64),
    GetFrequency,
    SetTxFrequency(i64),
    GetTxFrequency,
    Split,
    Aos,
    Los,
    Quit,
    SetPosition {
        azimuth: Degrees,
        elevation: Degrees,
    },
    GetPosition,
    SetVelocity(MetersPerSecond),
    GetVelocity,
    /// Anything the grammar does not know. Acknowledged, never executed.
    Unknown(String),
}

/// Why a recognized command could not be parsed. Never fatal for the session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("`{command}` is missing an argument")]
    MissingArgument { command: &'static str },

    #[error("`{command}` got an invalid argument `{value}`")]
    InvalidArgument {
        command: &'static str,
        value: String,
    },

    #[error("`{command}` got an unexpected argument `{value}`")]
    UnexpectedArgument {
        command: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// The line starts with the prefix; the rest is the argument text.
    Prefix,
    /// The line is exactly the prefix.
    Exact,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub prefix: &'static str,
    pub kind: Match,
    pub parse: fn(&str) -> Result<Command, ParseError>,
}

/// Ordered rule table of one protocol variant.
#[derive(Debug, Clone, Copy)]
pub struct Grammar {
    pub name: &'static str,
    pub rules: &'static [Rule],
}

impl Grammar {
    /// Parses one complete command line (without terminator).
    pub fn parse(&self, line: &str) -> Result<Command, ParseError> {
        for rule in self.rules {
            let rest = match rule.kind {
                Match::Exact if line == rule.prefix => Some(""),
                Match::Exact => None,
                Match::Prefix => line.strip_prefix(rule.prefix),
            };

            if let Some(rest) = rest {
                return (rule.parse)(rest);
            }
        }

        Ok(Command::Unknown(line.to_string()))
    }
}

pub static DOPPLER_GRAMMAR: Grammar = Grammar {
    name: "doppler",
    rules: &[
        Rule {
            prefix: "AOS",
            kind: Match::Prefix,
            parse: aos,
        },
        Rule {
            prefix: "LOS",
            kind: Match::Prefix,
            parse: los,
        },
        Rule {
            prefix: "F",
            kind: Match::Prefix,
            parse: set_frequency,
        },
        Rule {
            prefix: "f",
            kind: Match::Prefix,
            parse: get_frequency,
        },
        Rule {
            prefix: "I",
            kind: Match::Prefix,
            parse: set_tx_frequency,
        },
        Rule {
            prefix: "i",
            kind: Match::Prefix,
            parse: get_tx_frequency,
        },
        Rule {
            prefix: "S",
            kind: Match::Prefix,
            parse: split,
        },
        Rule {
            prefix: "q",
            kind: Match::Exact,
            parse: quit,
        },
    ],
};

pub static ROTOR_GRAMMAR: Grammar = Grammar {
    name: "rotor",
    rules: &[
        Rule {
            prefix: "P",
            kind: Match::Prefix,
            parse: set_position,
        },
        Rule {
            prefix: "p",
            kind: Match::Prefix,
            parse: get_position,
        },
        Rule {
            prefix: "S",
            kind: Match::Prefix,
            parse: split,
        },
        Rule {
            prefix: "q",
            kind: Match::Exact,
            parse: quit,
        },
    ],
};

pub static VELOCITY_GRAMMAR: Grammar = Grammar {
    name: "velocity",
    rules: &[
        Rule {
            prefix: "V",
            kind: Match::Prefix,
            parse: set_velocity,
        },
        Rule {
            prefix: "v",
            kind: Match::Prefix,
            parse: get_velocity,
        },
        Rule {
            prefix: "q",
            kind: Match::Exact,
            parse: quit,
        },
    ],
};

fn aos(_: &str) -> Result<Command, ParseError> {
    Ok(Command::Aos)
}

fn los(_: &str) -> Result<Command, ParseError> {
    Ok(Command::Los)
}

fn split(_: &str) -> Result<Command, ParseError> {
    Ok(Command::Split)
}

fn quit(_: &str) -> Result<Command, ParseError> {
    Ok(Command::Quit)
}

fn get_frequency(_: &str) -> Result<Command, ParseError> {
    Ok(Command::GetFrequency)
}

fn get_tx_frequency(_: &str) -> Result<Command, ParseError> {
    Ok(Command::GetTxFrequency)
}

fn get_position(_: &str) -> Result<Command, ParseError> {
    Ok(Command::GetPosition)
}

fn get_velocity(_: &str) -> Result<Command, ParseError> {
    Ok(Command::GetVelocity)
}

fn set_frequency(rest: &str) -> Result<Command, ParseError> {
    single(rest, "F").and_then(|arg| integer(arg, "F")).map(Command::SetFrequency)
}

fn set_tx_frequency(rest: &str) -> Result<Command, ParseError> {
    single(rest, "I").and_then(|arg| integer(arg, "I")).map(Command::SetTxFrequency)
}

fn set_velocity(rest: &str) -> Result<Command, ParseError> {
    single(rest, "V").and_then(|arg| float(arg, "V")).map(Command::SetVelocity)
}

fn set_position(rest: &str) -> Result<Command, ParseError> {
    let mut args = rest.split_whitespace();

    let azimuth = args
        .next()
        .ok_or(ParseError::MissingArgument { command: "P" })
        .and_then(|arg| float(arg, "P"))?;
    let elevation = args
        .next()
        .ok_or(ParseError::MissingArgument { command: "P" })
        .and_then(|arg| float(arg, "P"))?;

    if let Some(extra) = args.next() {
        return Err(ParseError::UnexpectedArgument {
            command: "P",
            value: extra.to_string(),
        });
    }

    Ok(Command::SetPosition { azimuth, elevation })
}

fn single<'a>(rest: &'a str, command: &'static str) -> Result<&'a str, ParseError> {
    let mut args = rest.split_whitespace();
    let arg = args.next().ok_or(ParseError::MissingArgument { command })?;

    match args.next() {
        Some(extra) => Err(ParseError::UnexpectedArgument {
            command,
            value: extra.to_string(),
        }),
        None => Ok(arg),
    }
}

fn integer(arg: &str, command: &'static str) -> Result<i64, ParseError> {
    arg.parse().map_err(|_| ParseError::InvalidArgument {
        command,
        value: arg.to_string(),
    })
}

fn float(arg: &str, command: &'static str) -> Result<f64, ParseError> {
    match arg.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ParseError::InvalidArgument {
            command,
            value: arg.to_string(),
        }),
    }
}

/// Reassembles command lines from arbitrary socket reads.
///
/// Bytes are kept until a `\n` arrives, so a command split over two reads is
/// returned once, after the second. `\r\n` is accepted and blank lines are
/// skipped.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    overflowed: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every line completed by them, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for chunk in bytes.split_inclusive(|&b| b == b'\n') {
            let complete = chunk.last() == Some(&b'\n');

            if !self.overflowed {
                self.pending.extend_from_slice(chunk);
            }

            if complete {
                if !self.overflowed {
                    let text = String::from_utf8_lossy(&self.pending);
                    let text = text.trim();
                    if !text.is_empty() {
                        lines.push(text.to_string());
                    }
                }

                self.pending.clear();
                self.overflowed = false;
            } else if self.pending.len() > MAX_LINE_LENGTH {
                log::warn!(
                    "dropping command longer than {} bytes without terminator",
                    MAX_LINE_LENGTH
                );
                self.pending.clear();
                self.overflowed = true;
            }
        }

        lines
    }

    /// Bytes received after the last terminator.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.overflowed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doppler_commands() {
        let grammar = &DOPPLER_GRAMMAR;

        assert_eq!(grammar.parse("F145800000"), Ok(Command::SetFrequency(145_800_000)));
        assert_eq!(grammar.parse("F 437500000"), Ok(Command::SetFrequency(437_500_000)));
        assert_eq!(grammar.parse("I 145990000"), Ok(Command::SetTxFrequency(145_990_000)));
        assert_eq!(grammar.parse("f"), Ok(Command::GetFrequency));
        assert_eq!(grammar.parse("i"), Ok(Command::GetTxFrequency));
        assert_eq!(grammar.parse("S 0 VFOA"), Ok(Command::Split));
        assert_eq!(grammar.parse("AOS"), Ok(Command::Aos));
        assert_eq!(grammar.parse("LOS"), Ok(Command::Los));
        assert_eq!(grammar.parse("q"), Ok(Command::Quit));
    }

    #[test]
    fn prefixes_are_case_sensitive_and_scoped() {
        assert_eq!(
            DOPPLER_GRAMMAR.parse("P 10 20"),
            Ok(Command::Unknown("P 10 20".to_string()))
        );
        assert_eq!(
            DOPPLER_GRAMMAR.parse("quit"),
            Ok(Command::Unknown("quit".to_string()))
        );
        assert_eq!(
            ROTOR_GRAMMAR.parse("F100"),
            Ok(Command::Unknown("F100".to_string()))
        );
        assert_eq!(
            VELOCITY_GRAMMAR.parse("aos"),
            Ok(Command::Unknown("aos".to_string()))
        );
    }

    #[test]
    fn rotor_commands() {
        assert_eq!(
            ROTOR_GRAMMAR.parse("P 180.50 -2.25"),
            Ok(Command::SetPosition {
                azimuth: 180.5,
                elevation: -2.25
            })
        );
        assert_eq!(ROTOR_GRAMMAR.parse("p"), Ok(Command::GetPosition));
        assert_eq!(ROTOR_GRAMMAR.parse("S"), Ok(Command::Split));
    }

    #[test]
    fn velocity_commands() {
        assert_eq!(
            VELOCITY_GRAMMAR.parse("V -2500.5"),
            Ok(Command::SetVelocity(-2500.5))
        );
        assert_eq!(VELOCITY_GRAMMAR.parse("V42"), Ok(Command::SetVelocity(42.0)));
        assert_eq!(VELOCITY_GRAMMAR.parse("v"), Ok(Command::GetVelocity));
    }

    #[test]
    fn malformed_arguments_fail_the_command() {
        assert_eq!(
            DOPPLER_GRAMMAR.parse("F"),
            Err(ParseError::MissingArgument { command: "F" })
        );
        assert_eq!(
            DOPPLER_GRAMMAR.parse("Fabc"),
            Err(ParseError::InvalidArgument {
                command: "F",
                value: "abc".to_string()
            })
        );
        assert!(DOPPLER_GRAMMAR.parse("F 1.5").is_err());
        assert!(ROTOR_GRAMMAR.parse("P 10").is_err());
        assert!(ROTOR_GRAMMAR.parse("P 10 20 30").is_err());
        assert!(ROTOR_GRAMMAR.parse("P nan 20").is_err());
        assert!(VELOCITY_GRAMMAR.parse("V inf").is_err());
    }

    #[test]
    fn concatenated_commands_split_in_order() {
        let mut buffer = LineBuffer::new();

        assert_eq!(buffer.feed(b"F100\nAOS\nf\n"), vec!["F100", "AOS", "f"]);
        assert!(buffer.pending().is_empty());
    }

    #[test]
    fn fragment_waits_for_terminator() {
        let mut buffer = LineBuffer::new();

        assert!(buffer.feed(b"P 12.0 ").is_empty());
        assert_eq!(buffer.pending(), b"P 12.0 ");
        assert_eq!(buffer.feed(b"34.0\np"), vec!["P 12.0 34.0"]);
        assert_eq!(buffer.feed(b"\r\n\n\n"), vec!["p"]);
    }

    #[test]
    fn overlong_line_is_dropped_entirely() {
        let mut buffer = LineBuffer::new();
        let junk = vec![b'x'; MAX_LINE_LENGTH + 1];

        assert!(buffer.feed(&junk).is_empty());
        assert!(buffer.feed(b"yyyy").is_empty());
        assert!(buffer.pending().is_empty());
        assert_eq!(buffer.feed(b"zz\nf\n"), vec!["f"]);
    }
}
