//! Parsing of interactive lines typed during `watch`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Pick(String),
    /// Show the best available players.
    Board,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub const HELP: &str = "commands: pick <player_id> | board | help | quit";

pub fn parse(line: &str) -> Input {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Input::Empty;
    };

    match (cmd.to_ascii_lowercase().as_str(), words.next(), words.next()) {
        ("pick" | "p", Some(id), None) => Input::Pick(id.to_string()),
        ("board" | "b", None, _) => Input::Board,
        ("help" | "?", None, _) => Input::Help,
        ("quit" | "q" | "exit", None, _) => Input::Quit,
        _ => Input::Unknown(line.trim().to_string()),
    }
}
