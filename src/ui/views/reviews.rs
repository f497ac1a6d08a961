use crate::api::types::Review;
use crate::api::HostelService;
use crate::query::{Query, QueryState};
use crate::ui::ensure_valid_selection;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Testimonials rated 4 and up, best first
pub struct ReviewsView {
  query: Query<Vec<Review>>,
  list_state: ListState,
}

impl ReviewsView {
  pub fn new(service: HostelService) -> Self {
    let mut query = Query::new(move |options| {
      let service = service.clone();
      async move { service.reviews(options).await }
    });
    query.fetch();

    Self {
      query,
      list_state: ListState::default(),
    }
  }

  fn reviews(&self) -> &[Review] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.reviews().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.query.state() {
      QueryState::Loading => " Reviews (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Reviews (error: {}) ", e),
      _ => format!(" Reviews ({}) ", len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.error().is_some() {
        "Failed to load reviews. Press 'r' to retry."
      } else {
        "No reviews rated 4 or better yet."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .reviews()
      .iter()
      .map(|review| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<6}", stars(review.rating)),
            Style::default().fg(Color::Yellow),
          ),
          Span::styled(
            format!("{:<20}", review.name),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(review.review.clone()),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

/// Whole stars for a 0-5 rating
fn stars(rating: f64) -> String {
  "*".repeat(rating.clamp(0.0, 5.0).round() as usize)
}

impl View for ReviewsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.query.refresh(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Reviews".to_string()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn session_expired(&self) -> bool {
    self.query.is_auth_error()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_stars() {
    assert_eq!(stars(4.6), "*****");
    assert_eq!(stars(4.0), "****");
    assert_eq!(stars(9.0), "*****");
    assert_eq!(stars(-1.0), "");
  }
}
