//! Whitespace-token command stream.
//!
//! Commands are read token by token, so line breaks carry no meaning. Each
//! command accepts both its descriptive name and the short upper-case name
//! used by older input files.

use std::fmt;
use std::str::SplitWhitespace;

use crate::error::{CommandError, Result};

/// A parsed command. Numeric arguments stay signed as read; the restaurant
/// treats non-positive counts and ids as selecting nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetCapacity(i64),
    Arrive(String),
    PurgeEven,
    PurgeOdd(i64),
    LastArrivalDump,
    DumpEven(i64),
    DumpOddPreorder(i64),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetCapacity(_) => "setCapacity",
            Command::Arrive(_) => "arrive",
            Command::PurgeEven => "purgeEven",
            Command::PurgeOdd(_) => "purgeOdd",
            Command::LastArrivalDump => "lastArrivalDump",
            Command::DumpEven(_) => "dumpEven",
            Command::DumpOddPreorder(_) => "dumpOddPreorder",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetCapacity(n)
            | Command::PurgeOdd(n)
            | Command::DumpEven(n)
            | Command::DumpOddPreorder(n) => write!(f, "{} {}", self.name(), n),
            Command::Arrive(name) => write!(f, "{} {}", self.name(), name),
            Command::PurgeEven | Command::LastArrivalDump => f.write_str(self.name()),
        }
    }
}

/// Iterator of parsed commands. Yields the first fault as an `Err`; callers
/// are expected to stop there.
pub struct CommandParser<'a> {
    tokens: SplitWhitespace<'a>,
}

impl<'a> CommandParser<'a> {
    pub fn new(input: &'a str) -> Self {
        CommandParser {
            tokens: input.split_whitespace(),
        }
    }

    fn argument(&mut self, command: &'static str) -> Result<&'a str> {
        self.tokens
            .next()
            .ok_or(CommandError::MissingArgument { command })
    }

    fn number(&mut self, command: &'static str) -> Result<i64> {
        let value = self.argument(command)?;
        value.parse().map_err(|_| CommandError::InvalidNumber {
            command,
            value: value.to_string(),
        })
    }

    fn parse(&mut self, word: &str) -> Result<Command> {
        let command = match word {
            "setCapacity" | "MAXSIZE" => Command::SetCapacity(self.number("setCapacity")?),
            "arrive" | "LAPSE" => Command::Arrive(self.argument("arrive")?.to_string()),
            "purgeEven" | "KOKUSEN" => Command::PurgeEven,
            "purgeOdd" | "KEITEIKEN" => Command::PurgeOdd(self.number("purgeOdd")?),
            "lastArrivalDump" | "HAND" => Command::LastArrivalDump,
            "dumpEven" | "LIMITLESS" => Command::DumpEven(self.number("dumpEven")?),
            "dumpOddPreorder" | "CLEAVE" => {
                Command::DumpOddPreorder(self.number("dumpOddPreorder")?)
            }
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }
}

impl Iterator for CommandParser<'_> {
    type Item = Result<Command>;

    fn next(&mut self) -> Option<Self::Item> {
        let word = self.tokens.next()?;
        Some(self.parse(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(input: &str) -> Vec<Command> {
        CommandParser::new(input).collect::<Result<_>>().unwrap()
    }

    #[test]
    fn reads_tokens_across_lines() {
        let commands = parse_all("setCapacity\n5 arrive Aabbc\npurgeEven dumpEven 5");
        assert_eq!(
            commands,
            vec![
                Command::SetCapacity(5),
                Command::Arrive("Aabbc".into()),
                Command::PurgeEven,
                Command::DumpEven(5),
            ]
        );
    }

    #[test]
    fn accepts_short_names() {
        let commands = parse_all("MAXSIZE 3 LAPSE abc KOKUSEN KEITEIKEN 2 HAND LIMITLESS 1 CLEAVE 4");
        assert_eq!(
            commands,
            vec![
                Command::SetCapacity(3),
                Command::Arrive("abc".into()),
                Command::PurgeEven,
                Command::PurgeOdd(2),
                Command::LastArrivalDump,
                Command::DumpEven(1),
                Command::DumpOddPreorder(4),
            ]
        );
    }

    #[test]
    fn malformed_number_is_distinct() {
        let mut parser = CommandParser::new("purgeOdd two");
        match parser.next() {
            Some(Err(CommandError::InvalidNumber { command, value })) => {
                assert_eq!(command, "purgeOdd");
                assert_eq!(value, "two");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn negative_numbers_parse() {
        let commands = parse_all("dumpEven -1 KEITEIKEN -2 CLEAVE 0");
        assert_eq!(
            commands,
            vec![
                Command::DumpEven(-1),
                Command::PurgeOdd(-2),
                Command::DumpOddPreorder(0),
            ]
        );
    }

    #[test]
    fn fractional_number_is_malformed() {
        let mut parser = CommandParser::new("dumpEven 1.5");
        assert!(matches!(
            parser.next(),
            Some(Err(CommandError::InvalidNumber { command: "dumpEven", .. }))
        ));
    }

    #[test]
    fn missing_argument() {
        let mut parser = CommandParser::new("setCapacity");
        assert!(matches!(
            parser.next(),
            Some(Err(CommandError::MissingArgument {
                command: "setCapacity"
            }))
        ));
    }

    #[test]
    fn unknown_command() {
        let mut parser = CommandParser::new("teleport 3");
        assert!(matches!(
            parser.next(),
            Some(Err(CommandError::UnknownCommand(word))) if word == "teleport"
        ));
    }

    #[test]
    fn display_round_trips_names() {
        assert_eq!(Command::PurgeOdd(3).to_string(), "purgeOdd 3");
        assert_eq!(Command::Arrive("Bob".into()).to_string(), "arrive Bob");
        assert_eq!(Command::LastArrivalDump.to_string(), "lastArrivalDump");
    }
}
