use crate::api::types::MaintenanceTicket;
use crate::api::HostelService;
use crate::query::{Query, QueryState};
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Maintenance tickets, open ones first
pub struct MaintenanceView {
  query: Query<Vec<MaintenanceTicket>>,
  list_state: ListState,
  search: SearchInput,
  filter: String,
  show_resolved: bool,
}

impl MaintenanceView {
  pub fn new(service: HostelService) -> Self {
    let mut query = Query::new(move |options| {
      let service = service.clone();
      async move { service.tickets(options).await }
    });
    query.fetch();

    Self {
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
      filter: String::new(),
      show_resolved: true,
    }
  }

  fn visible_tickets(&self) -> Vec<&MaintenanceTicket> {
    let filter = self.filter.to_lowercase();
    let mut tickets: Vec<&MaintenanceTicket> = self
      .query
      .data()
      .map(|tickets| {
        tickets
          .iter()
          .filter(|t| self.show_resolved || !t.is_resolved())
          .filter(|t| {
            filter.is_empty()
              || t.room_no.to_lowercase().contains(&filter)
              || t.issue.to_lowercase().contains(&filter)
              || t.assigned_to.to_lowercase().contains(&filter)
          })
          .collect()
      })
      .unwrap_or_default();
    // Stable: keeps server order within each group
    tickets.sort_by_key(|t| t.is_resolved());
    tickets
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let tickets = self.visible_tickets();
    let open = tickets.iter().filter(|t| !t.is_resolved()).count();

    let title = match self.query.state() {
      QueryState::Loading => " Maintenance (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Maintenance (error: {}) ", e),
      _ => format!(" Maintenance ({} open of {}) ", open, tickets.len()),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if tickets.is_empty() && !self.query.is_loading() {
      let content = if self.query.error().is_some() {
        "Failed to load tickets. Press 'r' to retry."
      } else {
        "No tickets."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = tickets
      .iter()
      .map(|ticket| {
        let priority_color = match ticket.priority.as_str() {
          "High" => Color::Red,
          "Medium" => Color::Yellow,
          _ => Color::DarkGray,
        };
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<7}", ticket.room_no),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!("{:<7}", ticket.priority),
            Style::default().fg(priority_color),
          ),
          Span::styled(
            format!("{:<12}", ticket.status),
            Style::default().fg(status_color(&ticket.status)),
          ),
          Span::raw(format!("{:<40}", truncate(&ticket.issue, 38))),
          Span::styled(
            ticket.assigned_to.clone(),
            Style::default().fg(Color::DarkGray),
          ),
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

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('h') => {
        self.show_resolved = !self.show_resolved;
        self.list_state.select(None);
      }
      KeyCode::Char('r') => self.query.refresh(),
      KeyCode::Char('q') | KeyCode::Esc => return Some(ViewAction::Pop),
      _ => return None,
    }
    Some(ViewAction::None)
  }
}

impl View for MaintenanceView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    if self.show_resolved {
      "Maintenance".to_string()
    } else {
      "Maintenance [open]".to_string()
    }
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
      ShortcutInfo::new("h", "hide resolved").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
