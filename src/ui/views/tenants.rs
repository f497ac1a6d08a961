use crate::api::types::{Tenant, TenantPage, TenantQuery};
use crate::api::HostelService;
use crate::debounce::Debouncer;
use crate::query::{Query, QueryState};
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_amount, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::PaymentsView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use tracing::debug;

/// Paged tenant list with server-side search.
///
/// Typing in the search box waits for a quiet period before asking the
/// server. Changing the page or the search replaces the query, which drops
/// any answer still in flight for the previous one.
pub struct TenantsView {
  service: HostelService,
  params: TenantQuery,
  query: Query<TenantPage>,
  list_state: ListState,
  search: SearchInput,
  debouncer: Debouncer,
  /// Search text waiting for the debouncer
  pending_search: String,
  /// Total of the last loaded page, for paging while the next one loads
  known_total: u64,
}

impl TenantsView {
  pub fn new(service: HostelService, per_page: u32) -> Self {
    let params = TenantQuery {
      limit: per_page.max(1),
      ..TenantQuery::default()
    };
    let mut query = tenants_query(&service, params.clone());
    query.fetch();

    Self {
      service,
      params,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
      debouncer: Debouncer::default(),
      pending_search: String::new(),
      known_total: 0,
    }
  }

  fn reload(&mut self, params: TenantQuery) {
    debug!(page = params.page, search = ?params.search, "Reloading tenants");
    self.params = params;
    self.query = tenants_query(&self.service, self.params.clone());
    self.query.fetch();
    self.list_state.select(None);
  }

  fn apply_search(&mut self, text: &str) {
    let params = self.params.clone().with_search(text);
    if params != self.params {
      self.reload(params);
    }
  }

  fn total(&self) -> u64 {
    self
      .query
      .data()
      .map(|page| page.total)
      .unwrap_or(self.known_total)
  }

  fn tenants(&self) -> &[Tenant] {
    self
      .query
      .data()
      .map(|page| page.tenants.as_slice())
      .unwrap_or(&[])
  }

  fn change_page(&mut self, delta: i64) {
    let last = self.params.total_pages(self.total()) as i64;
    let page = (self.params.page as i64 + delta).clamp(1, last.max(1)) as u32;
    if page != self.params.page {
      let params = TenantQuery {
        page,
        ..self.params.clone()
      };
      self.reload(params);
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.tenants().len();
    ensure_valid_selection(&mut self.list_state, len);

    let pages = self.params.total_pages(self.total());
    let search = self
      .params
      .search
      .as_ref()
      .map(|s| format!(" [/{}]", s))
      .unwrap_or_default();

    let title = match self.query.state() {
      _ if self.debouncer.is_pending() => format!(" Tenants{} (searching...) ", search),
      QueryState::Loading => format!(" Tenants{} (loading...) ", search),
      QueryState::Error(e) => format!(" Tenants{} (error: {}) ", search, e),
      _ => format!(
        " Tenants ({}){} page {}/{} ",
        self.total(),
        search,
        self.params.page,
        pages
      ),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.error().is_some() {
        "Failed to load tenants. Press 'r' to retry."
      } else {
        "No tenants found."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .tenants()
      .iter()
      .map(|tenant| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<24}", truncate(&tenant.tenant_name, 22)),
            Style::default().fg(Color::White),
          ),
          Span::styled(
            format!("{:<7}", tenant.room_number),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!("{:>9}  ", format_amount(tenant.rent_amount)),
            Style::default().fg(Color::Yellow),
          ),
          Span::raw(format!("{:<12}", tenant.contact)),
          Span::styled(
            tenant.move_in_date.as_deref().unwrap_or("-").to_string(),
            Style::default().fg(Color::DarkGray),
          ),
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

  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.search.handle_key(key) {
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::Event(SearchEvent::Changed(text)) => {
        self.pending_search = text;
        self.debouncer.touch();
        Some(ViewAction::None)
      }
      KeyResult::Event(SearchEvent::Submitted(text)) => {
        self.debouncer.cancel();
        self.apply_search(&text);
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
      KeyCode::Char('n') | KeyCode::Right => {
        self.change_page(1);
        Some(ViewAction::None)
      }
      KeyCode::Char('p') | KeyCode::Left => {
        self.change_page(-1);
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
      KeyCode::Enter => {
        let idx = self.list_state.selected()?;
        let tenant = self.tenants().get(idx)?.clone();
        Some(ViewAction::Push(Box::new(PaymentsView::new(
          tenant,
          self.service.clone(),
        ))))
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

fn tenants_query(service: &HostelService, params: TenantQuery) -> Query<TenantPage> {
  let service = service.clone();
  // Tenant pages are always read fresh, so the read options are not needed
  Query::new(move |_| {
    let service = service.clone();
    let params = params.clone();
    async move { service.tenants(&params).await }
  })
}

impl View for TenantsView {
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
    "Tenants".to_string()
  }

  fn tick(&mut self) {
    if self.debouncer.poll_ready() {
      let text = std::mem::take(&mut self.pending_search);
      self.apply_search(&text);
    }
    if self.query.poll() {
      if let Some(page) = self.query.data() {
        self.known_total = page.total;
      }
    }
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
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("n/p", "page").with_priority(30),
      ShortcutInfo::new("enter", "payments").with_priority(35),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
