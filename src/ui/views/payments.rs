use crate::api::types::{Payment, Tenant};
use crate::api::HostelService;
use crate::query::{Query, QueryState};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_amount, status_color};
use crate::ui::view::{View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Payment history of one tenant
pub struct PaymentsView {
  tenant: Tenant,
  query: Query<Vec<Payment>>,
  list_state: ListState,
}

impl PaymentsView {
  pub fn new(tenant: Tenant, service: HostelService) -> Self {
    let tenant_id = tenant.id.clone().unwrap_or_default();
    let mut query = Query::new(move |options| {
      let service = service.clone();
      let tenant_id = tenant_id.clone();
      async move { service.transactions(&tenant_id, options).await }
    });
    query.fetch();

    Self {
      tenant,
      query,
      list_state: ListState::default(),
    }
  }

  fn payments(&self) -> &[Payment] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.payments().len();
    ensure_valid_selection(&mut self.list_state, len);

    let paid: f64 = self.payments().iter().map(|p| p.payment_amount).sum();
    let title = match self.query.state() {
      QueryState::Loading => format!(" {} (loading...) ", self.tenant.tenant_name),
      QueryState::Error(e) => format!(" {} (error: {}) ", self.tenant.tenant_name, e),
      _ => format!(
        " {} · room {} · {} payments, {} paid ",
        self.tenant.tenant_name,
        self.tenant.room_number,
        len,
        format_amount(paid)
      ),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.error().is_some() {
        "Failed to load payments. Press 'r' to retry."
      } else {
        "No payments recorded."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .payments()
      .iter()
      .map(|payment| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<12}", payment.payment_date.as_deref().unwrap_or("-")),
            Style::default().fg(Color::DarkGray),
          ),
          Span::styled(
            format!("{:>9}  ", format_amount(payment.payment_amount)),
            Style::default().fg(Color::Yellow),
          ),
          Span::raw(format!("due {:>9}  ", format_amount(payment.due_amount))),
          Span::raw(format!("{:<14}", payment.payment_mode)),
          Span::styled(
            format!("{:<9}", payment.rent_status),
            Style::default().fg(status_color(&payment.rent_status)),
          ),
          Span::styled(
            payment.transaction_id.clone(),
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
}

impl View for PaymentsView {
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
    format!("Payments [{}]", self.tenant.tenant_name)
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn session_expired(&self) -> bool {
    self.query.is_auth_error()
  }
}
