//! `:` commands of the console and their autocomplete.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
  Dashboard,
  Rooms,
  Tenants,
  Maintenance,
  Reviews,
  Logout,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub kind: CommandKind,
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

pub const COMMANDS: &[Command] = &[
  Command {
    kind: CommandKind::Dashboard,
    name: "dashboard",
    aliases: &["d", "home", "stats"],
    description: "Occupancy, payments and today's menu",
  },
  Command {
    kind: CommandKind::Rooms,
    name: "rooms",
    aliases: &["r", "room"],
    description: "Rooms and bed availability",
  },
  Command {
    kind: CommandKind::Tenants,
    name: "tenants",
    aliases: &["t", "tenant"],
    description: "Tenants and their payments",
  },
  Command {
    kind: CommandKind::Maintenance,
    name: "maintenance",
    aliases: &["m", "tickets"],
    description: "Maintenance tickets",
  },
  Command {
    kind: CommandKind::Reviews,
    name: "reviews",
    aliases: &["feedback", "testimonials"],
    description: "What residents say, best rated first",
  },
  Command {
    kind: CommandKind::Logout,
    name: "logout",
    aliases: &["signout"],
    description: "End the session and clear cached data",
  },
  Command {
    kind: CommandKind::Quit,
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit pgdesk",
  },
];

/// Get autocomplete suggestions for a given input, best match first
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_priority(cmd, &input_lower).map(|p| (cmd, p)))
    .collect();

  matches.sort_by_key(|(_, priority)| *priority);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better; `None` when the command does not match at all.
fn match_priority(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}

/// Resolve submitted input to the best matching command
pub fn resolve(input: &str) -> Option<CommandKind> {
  if input.trim().is_empty() {
    return None;
  }
  get_suggestions(input).first().map(|cmd| cmd.kind)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    assert_eq!(get_suggestions("").len(), COMMANDS.len());
    assert_eq!(resolve("  "), None);
  }

  #[test]
  fn test_exact_and_alias_match() {
    assert_eq!(resolve("tenants"), Some(CommandKind::Tenants));
    assert_eq!(resolve("t"), Some(CommandKind::Tenants));
    assert_eq!(resolve("q"), Some(CommandKind::Quit));
    assert_eq!(resolve("feedback"), Some(CommandKind::Reviews));
    assert_eq!(resolve("r"), Some(CommandKind::Rooms));
  }

  #[test]
  fn test_prefix_match() {
    assert_eq!(resolve("main"), Some(CommandKind::Maintenance));
    assert_eq!(resolve("log"), Some(CommandKind::Logout));
  }

  #[test]
  fn test_fuzzy_match() {
    assert_eq!(resolve("board"), Some(CommandKind::Dashboard));
    assert_eq!(get_suggestions("ckets")[0].kind, CommandKind::Maintenance);
  }

  #[test]
  fn test_no_match() {
    assert_eq!(resolve("xyz"), None);
  }
}
