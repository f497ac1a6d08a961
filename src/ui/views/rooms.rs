use crate::api::types::Room;
use crate::api::HostelService;
use crate::query::{Query, QueryState};
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_amount, status_color};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Rooms and bed availability
pub struct RoomsView {
  query: Query<Vec<Room>>,
  list_state: ListState,
  search: SearchInput,
  filter: String,
}

impl RoomsView {
  pub fn new(service: HostelService) -> Self {
    let mut query = Query::new(move |options| {
      let service = service.clone();
      async move { service.rooms(options).await }
    });
    query.fetch();

    Self {
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
      filter: String::new(),
    }
  }

  /// Rooms matching the search filter (room number or sharing type)
  fn visible_rooms(&self) -> Vec<&Room> {
    let filter = self.filter.to_lowercase();
    self
      .query
      .data()
      .map(|rooms| {
        rooms
          .iter()
          .filter(|room| {
            filter.is_empty()
              || room.room_number.to_lowercase().contains(&filter)
              || room.sharing_type.to_lowercase().contains(&filter)
          })
          .collect()
      })
      .unwrap_or_default()
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let rooms = self.visible_rooms();
    let total_beds: u32 = rooms.iter().map(|r| r.total_beds).sum();
    let free_beds: u32 = rooms.iter().map(|r| r.available_beds).sum();

    let title = match self.query.state() {
      QueryState::Loading => " Rooms (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Rooms (error: {}) ", e),
      _ if !self.filter.is_empty() => format!(
        " Rooms ({}) [/{}] {} of {} beds free ",
        rooms.len(),
        self.filter,
        free_beds,
        total_beds
      ),
      _ => format!(
        " Rooms ({}) {} of {} beds free ",
        rooms.len(),
        free_beds,
        total_beds
      ),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if rooms.is_empty() && !self.query.is_loading() {
      let content = if self.query.error().is_some() {
        "Failed to load rooms. Press 'r' to retry."
      } else if !self.filter.is_empty() {
        "No rooms match the filter."
      } else {
        "No rooms yet. Add one with `pgdesk room add`."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = rooms
      .iter()
      .map(|room| {
        let status = room.status().to_string();
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<8}", room.room_number),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(format!("{:<16}", room.sharing_type)),
          Span::raw(format!(
            "{:>2}/{:<2} beds  ",
            room.available_beds, room.total_beds
          )),
          Span::styled(
            format!("{:>9}  ", format_amount(room.rent)),
            Style::default().fg(Color::Yellow),
          ),
          Span::styled(status.clone(), Style::default().fg(status_color(&status))),
        ]))
      })
      .collect();

    ensure_valid_selection(&mut self.list_state, items.len());

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

  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.search.handle_key(key) {
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::Event(SearchEvent::Changed(query) | SearchEvent::Submitted(query)) => {
        self.filter = query.trim().to_string();
        self.list_state.select(None);
        Some(ViewAction::None)
      }
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        Some(ViewAction::None)
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        Some(ViewAction::None)
      }
      _ => None,
    }
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('r') => {
        self.query.refresh();
        Some(ViewAction::None)
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl View for RoomsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Rooms".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn is_typing(&self) -> bool {
    self.search.is_active()
  }

  fn session_expired(&self) -> bool {
    self.query.is_auth_error()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "filter").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
