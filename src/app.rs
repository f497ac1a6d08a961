use crate::api::HostelService;
use crate::commands::CommandKind;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::session::{self, SessionStore};
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{DashboardView, MaintenanceView, ReviewsView, RoomsView, TenantsView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use std::io::stdout;
use std::time::Duration;
use tracing::{info, warn};

const SESSION_EXPIRED: &str = "Session expired. Run `pgdesk login` to sign in again.";

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  views: Vec<Box<dyn View>>,

  /// `:` command overlay
  command: CommandInput,

  service: HostelService,
  sessions: SessionStore,
  config: Config,

  /// One-line message in the footer, cleared on the next key
  status: Option<String>,

  /// Set once the session ended; the console shows only this message
  session_ended: Option<String>,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config, service: HostelService, sessions: SessionStore) -> Self {
    let root: Box<dyn View> = Box::new(DashboardView::new(service.clone()));
    Self {
      views: vec![root],
      command: CommandInput::new(),
      service,
      sessions,
      config,
      status: None,
      session_ended: None,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));

    let result = async {
      while !self.should_quit {
        terminal.draw(|frame| self.draw(frame))?;

        match events.next().await {
          Some(event) => self.handle_event(event),
          None => break,
        }
      }
      Ok::<(), color_eyre::Report>(())
    }
    .await;

    // Cleanup terminal, also after a draw error
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
      Event::Resize => {} // redrawn on the next loop
    }
  }

  fn tick(&mut self) {
    for view in self.views.iter_mut() {
      view.tick();
    }

    if self.session_ended.is_none() && self.views.iter().any(|v| v.session_expired()) {
      warn!("Request rejected as unauthenticated, ending session");
      self.end_session(SESSION_EXPIRED.to_string());
    }
  }

  /// Drop every view and forget the session. The service already cleared
  /// the cache and session file if the backend rejected the token.
  fn end_session(&mut self, message: String) {
    self.views.clear();
    self.service.clear_cache();
    if let Err(e) = self.sessions.clear() {
      warn!(error = %e, "Failed to remove session file");
    }
    self.session_ended = Some(message);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    if self.session_ended.is_some() {
      if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter) {
        self.should_quit = true;
      }
      return;
    }

    self.status = None;

    // An open overlay keeps the keys even over a typing view
    let typing = self.views.last().is_some_and(|v| v.is_typing());
    if self.command.is_active() || !typing {
      match self.command.handle_key(key) {
        KeyResult::Handled => return,
        KeyResult::Event(CommandEvent::Submitted(kind)) => {
          self.execute_command(kind);
          return;
        }
        KeyResult::Event(CommandEvent::Unknown(input)) => {
          if !input.is_empty() {
            self.status = Some(format!("Unknown command: {}", input));
          }
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) => return,
        KeyResult::NotHandled => {}
      }
    }

    let Some(view) = self.views.last_mut() else {
      return;
    };

    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(next) => self.views.push(next),
      ViewAction::Pop => {
        if self.views.len() > 1 {
          self.views.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, kind: CommandKind) {
    let root: Box<dyn View> = match kind {
      CommandKind::Dashboard => Box::new(DashboardView::new(self.service.clone())),
      CommandKind::Rooms => Box::new(RoomsView::new(self.service.clone())),
      CommandKind::Tenants => Box::new(TenantsView::new(
        self.service.clone(),
        self.config.tenants.per_page,
      )),
      CommandKind::Maintenance => Box::new(MaintenanceView::new(self.service.clone())),
      CommandKind::Reviews => Box::new(ReviewsView::new(self.service.clone())),
      CommandKind::Logout => {
        if let Err(e) = session::logout(&self.sessions, Some(&self.service)) {
          warn!(error = %e, "Logout failed");
        }
        info!("Logged out from the console");
        self.end_session("Logged out. Run `pgdesk login` to sign in again.".to_string());
        return;
      }
      CommandKind::Quit => {
        self.should_quit = true;
        return;
      }
    };

    // Root views replace the whole stack
    self.views.clear();
    self.views.push(root);
  }

  fn breadcrumb(&self) -> Vec<String> {
    self.views.iter().map(|v| v.breadcrumb_label()).collect()
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Footer
      ])
      .split(frame.area());

    let mut shortcuts = self
      .views
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default();
    shortcuts.sort_by_key(|s| s.priority);

    let title = self.config.title.clone().unwrap_or_default();
    draw_header(frame, chunks[0], &self.config.api.url, &title, &shortcuts);

    if let Some(message) = &self.session_ended {
      let paragraph = Paragraph::new(format!("{}\n\nPress q to exit.", message))
        .block(Block::default().borders(Borders::ALL).title(" pgdesk "))
        .style(Style::default().fg(Color::Yellow))
        .wrap(Wrap { trim: true });
      frame.render_widget(paragraph, chunks[1]);
    } else if let Some(view) = self.views.last_mut() {
      view.render(frame, chunks[1]);
    }

    let breadcrumb = self.breadcrumb();
    draw_footer(frame, chunks[2], &breadcrumb, self.status.as_deref());

    self.command.render_overlay(frame, chunks[1]);
  }
}
