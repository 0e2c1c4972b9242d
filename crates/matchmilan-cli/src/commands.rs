//! Parsing of the line commands accepted at the prompt.

use matchmilan_core::MatchStatus;

/// Which match a decision applies to: a list position (1-based) or an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Index(usize),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    List,
    More,
    Refresh,
    Status,
    Decide(Target, MatchStatus),
    Quit,
}

pub const HELP: &str = "\
Commands:
  more              load the next page
  refresh           start over from page 1
  list              show loaded matches
  accept <#|id>     accept a match
  decline <#|id>    decline a match
  status            show paging and connectivity state
  help              show this help
  quit              exit";

fn parse_target(arg: &str) -> Target {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Target::Index(n),
        _ => Target::Id(arg.to_string()),
    }
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else {
            return Err("empty command".to_string());
        };
        let arg = parts.next();

        match (word.to_lowercase().as_str(), arg) {
            ("help" | "?", _) => Ok(Command::Help),
            ("list" | "ls", _) => Ok(Command::List),
            ("more" | "m" | "next", _) => Ok(Command::More),
            ("refresh" | "r", _) => Ok(Command::Refresh),
            ("status" | "s", _) => Ok(Command::Status),
            ("quit" | "q" | "exit", _) => Ok(Command::Quit),
            ("accept" | "a", Some(arg)) => Ok(Command::Decide(parse_target(arg), MatchStatus::Accepted)),
            ("decline" | "d", Some(arg)) => Ok(Command::Decide(parse_target(arg), MatchStatus::Declined)),
            ("accept" | "a" | "decline" | "d", None) => {
                Err(format!("'{}' needs a match number or id", word))
            }
            (other, _) => Err(format!("unknown command '{}' (try 'help')", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("more"), Ok(Command::More));
        assert_eq!(Command::parse("  R  "), Ok(Command::Refresh));
        assert_eq!(Command::parse("q"), Ok(Command::Quit));
        assert_eq!(Command::parse("ls"), Ok(Command::List));
    }

    #[test]
    fn test_parse_decisions() {
        assert_eq!(
            Command::parse("accept 3"),
            Ok(Command::Decide(Target::Index(3), MatchStatus::Accepted))
        );
        assert_eq!(
            Command::parse("decline abc-123"),
            Ok(Command::Decide(Target::Id("abc-123".to_string()), MatchStatus::Declined))
        );
        // Zero is not a list position
        assert_eq!(
            Command::parse("a 0"),
            Ok(Command::Decide(Target::Id("0".to_string()), MatchStatus::Accepted))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("accept").is_err());
        assert!(Command::parse("dance").is_err());
    }
}
