use ratatui::prelude::Color;

/// Truncate a string to at most `max_len` characters, adding "..." if cut
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for room, payment and ticket statuses
pub fn status_color(status: &str) -> Color {
  match status {
    "Available" | "Paid" | "Resolved" | "Completed" => Color::Green,
    "In Progress" | "Partial" => Color::Yellow,
    "Occupied" | "Due" | "Pending" | "Overdue" => Color::Red,
    _ => Color::White,
  }
}

/// Rupee amount without trailing zero paise
pub fn format_amount(amount: f64) -> String {
  if amount.fract() == 0.0 {
    format!("₹{:.0}", amount)
  } else {
    format!("₹{:.2}", amount)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate() {
    assert_eq!(truncate("Sunrise", 10), "Sunrise");
    assert_eq!(truncate("Sunrise", 7), "Sunrise");
    assert_eq!(truncate("Hot water not working", 10), "Hot wat...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("ஆஷா ராவ் குமார்", 6), "ஆஷா...");
  }

  #[test]
  fn test_status_color() {
    assert_eq!(status_color("Available"), Color::Green);
    assert_eq!(status_color("Paid"), Color::Green);
    assert_eq!(status_color("In Progress"), Color::Yellow);
    assert_eq!(status_color("Due"), Color::Red);
    assert_eq!(status_color("Pending"), Color::Red);
    assert_eq!(status_color("Unknown"), Color::White);
  }

  #[test]
  fn test_format_amount() {
    assert_eq!(format_amount(6500.0), "₹6500");
    assert_eq!(format_amount(6500.5), "₹6500.50");
  }
}
