use crate::api::types::{Hostel, HostelStats, MessMenu, Profile};
use crate::api::{ApiError, HostelService};
use crate::cache::ReadOptions;
use crate::query::{Query, QueryState};
use crate::ui::renderfns::format_amount;
use crate::ui::view::{View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Dashboard {
  pub hostel: Option<Hostel>,
  pub stats: HostelStats,
  /// Missing when only the menu failed to load
  pub menu: Option<MessMenu>,
  /// Owner greeted in the title, when the profile loads
  pub profile: Option<Profile>,
}

/// Keep a secondary panel's failure out of the dashboard, except auth.
fn optional<T>(result: Result<T, ApiError>, what: &str) -> Result<Option<T>, ApiError> {
  match result {
    Ok(value) => Ok(Some(value)),
    Err(e) if e.is_auth() => Err(e),
    Err(e) => {
      warn!(error = %e, "{} unavailable", what);
      Ok(None)
    }
  }
}

/// Load everything the dashboard shows, concurrently.
pub async fn load_dashboard(
  service: &HostelService,
  options: ReadOptions,
) -> Result<Dashboard, ApiError> {
  let (hostel, stats, menu, profile) = futures::join!(
    service.hostel(options),
    service.stats(options),
    service.mess_menu(options),
    service.profile(options)
  );

  let menu = optional(menu, "Mess menu")?;
  let profile = optional(profile, "Profile")?;

  Ok(Dashboard {
    hostel: hostel?,
    stats: stats?,
    menu,
    profile,
  })
}

/// Occupancy, payments, tickets and today's menu
pub struct DashboardView {
  query: Query<Dashboard>,
}

impl DashboardView {
  pub fn new(service: HostelService) -> Self {
    let mut query = Query::new(move |options| {
      let service = service.clone();
      async move { load_dashboard(&service, options).await }
    });
    query.fetch();

    Self { query }
  }

  fn render_dashboard(&self, frame: &mut Frame, area: Rect) {
    let title = match self.query.state() {
      QueryState::Loading => " Dashboard (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Dashboard (error: {}) ", e),
      _ => {
        let data = self.query.data();
        let greeting = data
          .and_then(|d| d.profile.as_ref())
          .filter(|p| !p.name.is_empty())
          .map(|p| format!("Welcome, {} · ", p.name))
          .unwrap_or_default();
        match data.and_then(|d| d.hostel.as_ref()) {
          Some(hostel) => format!(" {}{} ({}) ", greeting, hostel.name, hostel.category),
          None => format!(" {}Dashboard ", greeting),
        }
      }
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let dashboard = match self.query.data() {
      Some(dashboard) => dashboard,
      None => {
        let (text, color) = match self.query.error() {
          Some(e) => (format!("Error: {}\n\nPress 'r' to retry.", e), Color::Red),
          None => ("Loading dashboard...".to_string(), Color::DarkGray),
        };
        frame.render_widget(
          Paragraph::new(text).style(Style::default().fg(color)),
          inner,
        );
        return;
      }
    };

    if dashboard.hostel.is_none() {
      frame.render_widget(
        Paragraph::new("No hostel set up yet. Create one with `pgdesk hostel create`.")
          .style(Style::default().fg(Color::Yellow)),
        inner,
      );
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(5), Constraint::Min(3)])
      .split(inner);

    self.render_stats(frame, chunks[0], &dashboard.stats);
    render_menu(frame, chunks[1], dashboard.menu.as_ref());
  }

  fn render_stats(&self, frame: &mut Frame, area: Rect, stats: &HostelStats) {
    let cards = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Ratio(1, 4); 4])
      .split(area);

    let rooms = vec![
      stat_line("Total", stats.rooms.total.to_string(), Color::White),
      stat_line("Occupied", stats.rooms.occupied.to_string(), Color::Red),
      stat_line("Vacant", stats.rooms.vacant.to_string(), Color::Green),
    ];
    let payments = vec![
      stat_line("Paid", format_amount(stats.payments.paid), Color::Green),
      stat_line("Unpaid", format_amount(stats.payments.unpaid), Color::Red),
    ];
    let tenants = vec![
      stat_line("Total", stats.tenants.total.to_string(), Color::White),
      stat_line("Current", stats.tenants.current.to_string(), Color::Cyan),
    ];
    let tickets = vec![
      stat_line("Total", stats.tickets.total.to_string(), Color::White),
      stat_line("Open", stats.tickets.unresolved.to_string(), Color::Yellow),
    ];

    for (i, (title, lines)) in [
      (" Rooms ", rooms),
      (" Payments ", payments),
      (" Tenants ", tenants),
      (" Tickets ", tickets),
    ]
    .into_iter()
    .enumerate()
    {
      let card = Paragraph::new(lines).block(
        Block::default()
          .title(title)
          .borders(Borders::ALL)
          .border_style(Style::default().fg(Color::DarkGray)),
      );
      frame.render_widget(card, cards[i]);
    }
  }
}

fn stat_line(label: &'static str, value: String, color: Color) -> Line<'static> {
  Line::from(vec![
    Span::styled(format!("{:<9}", label), Style::default().fg(Color::DarkGray)),
    Span::styled(value, Style::default().fg(color).bold()),
  ])
}

fn render_menu(frame: &mut Frame, area: Rect, menu: Option<&MessMenu>) {
  let block = Block::default()
    .title(" Today's menu ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let menu = match menu {
    Some(menu) => menu,
    None => {
      frame.render_widget(
        Paragraph::new("Menu unavailable")
          .block(block)
          .style(Style::default().fg(Color::DarkGray)),
        area,
      );
      return;
    }
  };

  let meal = |name: &'static str, items: &[String]| {
    let dishes = if items.is_empty() {
      "-".to_string()
    } else {
      items.join(", ")
    };
    Line::from(vec![
      Span::styled(format!("{:<11}", name), Style::default().fg(Color::Cyan)),
      Span::raw(dishes),
    ])
  };

  let lines = vec![
    meal("Breakfast", &menu.breakfast),
    meal("Lunch", &menu.lunch),
    meal("Dinner", &menu.dinner),
  ];
  frame.render_widget(
    Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
    area,
  );
}

impl View for DashboardView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.query.refresh();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_dashboard(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Dashboard".to_string()
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
  use crate::api::{HostelClient, SharedCache};
  use crate::cache::{CacheLayer, CacheStorage, MemoryStorage};
  use crate::retry::RetryPolicy;
  use serde_json::json;
  use std::time::Duration;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn service(server: &MockServer) -> HostelService {
    let client = HostelClient::new(&server.uri(), Duration::from_secs(2))
      .unwrap()
      .with_token(Some("tok".to_string()));
    let cache: SharedCache = CacheLayer::new(Box::new(MemoryStorage::new()) as Box<dyn CacheStorage>);
    HostelService::new(client, cache, RetryPolicy::no_retry(), None)
  }

  async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
      .and(path(route))
      .respond_with(response)
      .mount(server)
      .await;
  }

  #[tokio::test]
  async fn test_dashboard_survives_missing_menu() {
    let server = MockServer::start().await;
    mount(&server, "/api/hostel/view", ResponseTemplate::new(200).set_body_json(json!({"name": "Sunrise PG"}))).await;
    mount(&server, "/api/hostel/stats", ResponseTemplate::new(200).set_body_json(json!({"rooms": {"total": 12, "occupied": 9, "vacant": 3}}))).await;
    mount(&server, "/api/mess/today", ResponseTemplate::new(404)).await;

    let dashboard = load_dashboard(&service(&server), ReadOptions::default())
      .await
      .unwrap();
    assert_eq!(dashboard.stats.rooms.vacant, 3);
    assert!(dashboard.menu.is_none());
    assert!(dashboard.profile.is_none());
  }

  #[tokio::test]
  async fn test_dashboard_loads_owner_profile() {
    let server = MockServer::start().await;
    mount(&server, "/api/hostel/view", ResponseTemplate::new(200).set_body_json(json!({"name": "Sunrise PG"}))).await;
    mount(&server, "/api/hostel/stats", ResponseTemplate::new(200).set_body_json(json!({}))).await;
    mount(&server, "/api/mess/today", ResponseTemplate::new(200).set_body_json(json!({}))).await;
    mount(
      &server,
      "/api/user/view-profile",
      ResponseTemplate::new(200).set_body_json(json!({"profileInfo": {"name": "Asha", "email": "asha@example.com"}})),
    )
    .await;

    let dashboard = load_dashboard(&service(&server), ReadOptions::default())
      .await
      .unwrap();
    assert_eq!(dashboard.profile.map(|p| p.name).as_deref(), Some("Asha"));
  }

  #[tokio::test]
  async fn test_dashboard_propagates_auth_failure() {
    let server = MockServer::start().await;
    mount(&server, "/api/hostel/view", ResponseTemplate::new(200).set_body_json(json!({"name": "Sunrise PG"}))).await;
    mount(&server, "/api/hostel/stats", ResponseTemplate::new(200).set_body_json(json!({}))).await;
    mount(&server, "/api/mess/today", ResponseTemplate::new(401)).await;

    let err = load_dashboard(&service(&server), ReadOptions::default())
      .await
      .unwrap_err();
    assert!(err.is_auth());
  }
}
