//! One-shot subcommands. Everything the console shows read-only can also be
//! changed from here.

use crate::api::types::{
  beds_for_sharing, HostelInput, MaintenanceTicket, Payment, Room, RoomUpdate, SortOrder, Tenant,
  TenantQuery, TenantUpdate,
};
use crate::api::{HostelClient, HostelService};
use crate::cache::ReadOptions;
use crate::config::Config;
use crate::session::{self, SessionStore};
use crate::ui::renderfns::{format_amount, truncate};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::io::BufRead;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Sign in and store the session
  Login {
    /// Account email (defaults to api.email from the config)
    #[arg(short, long)]
    email: Option<String>,
  },
  /// Forget the stored session
  Logout,
  /// Show or change the hostel
  #[command(subcommand)]
  Hostel(HostelCommand),
  /// Manage rooms
  #[command(subcommand)]
  Room(RoomCommand),
  /// Manage tenants
  #[command(subcommand)]
  Tenant(TenantCommand),
  /// Record and review payments
  #[command(subcommand)]
  Payment(PaymentCommand),
  /// Maintenance tickets
  #[command(subcommand)]
  Ticket(TicketCommand),
  /// Show the signed-in owner
  Profile,
  /// Testimonials rated 4 and up, best first
  Reviews,
}

#[derive(Args, Debug)]
pub struct HostelArgs {
  #[arg(long)]
  name: String,
  /// Men, Women or Co-living
  #[arg(long, default_value = "Co-living")]
  category: String,
  #[arg(long)]
  total_rooms: u32,
  #[arg(long)]
  max_capacity: u32,
}

impl From<HostelArgs> for HostelInput {
  fn from(args: HostelArgs) -> Self {
    Self {
      name: args.name,
      category: args.category,
      total_rooms: args.total_rooms,
      max_capacity: args.max_capacity,
    }
  }
}

#[derive(Subcommand, Debug)]
pub enum HostelCommand {
  Show,
  Create(HostelArgs),
  Edit(HostelArgs),
  Remove,
}

#[derive(Subcommand, Debug)]
pub enum RoomCommand {
  List,
  Add {
    room_number: String,
    /// "Single Sharing" .. "Four Sharing"
    #[arg(long)]
    sharing: String,
    #[arg(long)]
    rent: f64,
  },
  Edit {
    room_number: String,
    #[arg(long)]
    sharing: String,
    #[arg(long)]
    rent: f64,
    /// Free beds (defaults to all beds of the sharing type)
    #[arg(long)]
    available: Option<u32>,
  },
  Remove {
    room_number: String,
  },
}

#[derive(Subcommand, Debug)]
pub enum TenantCommand {
  List(TenantListArgs),
  Add {
    #[arg(long)]
    name: String,
    #[arg(long)]
    room: String,
    #[arg(long)]
    rent: f64,
    #[arg(long)]
    contact: String,
    #[arg(long)]
    email: String,
  },
  Update {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    room: Option<String>,
    #[arg(long)]
    rent: Option<f64>,
    #[arg(long)]
    contact: Option<String>,
    #[arg(long)]
    email: Option<String>,
  },
  Delete {
    id: String,
  },
}

#[derive(Args, Debug, Default)]
pub struct TenantListArgs {
  #[arg(short, long)]
  search: Option<String>,
  #[arg(short, long, default_value_t = 1)]
  page: u32,
  /// Only tenants of this room
  #[arg(long)]
  room: Option<String>,
  /// Joined on or after this date (YYYY-MM-DD)
  #[arg(long)]
  joined_from: Option<NaiveDate>,
  /// Joined on or before this date (YYYY-MM-DD)
  #[arg(long)]
  joined_to: Option<NaiveDate>,
  #[arg(long)]
  rent_min: Option<f64>,
  #[arg(long)]
  rent_max: Option<f64>,
  /// By join date: asc or desc
  #[arg(long, default_value = "desc")]
  sort_order: SortOrder,
}

#[derive(Subcommand, Debug)]
pub enum PaymentCommand {
  /// Payment history of a tenant
  List { tenant_id: String },
  Record {
    tenant_id: String,
    amount: f64,
    #[arg(long)]
    name: String,
    #[arg(long)]
    room: String,
    /// Monthly rent, for the due amount
    #[arg(long)]
    rent: f64,
    /// Cash, UPI, Bank Transfer, ...
    #[arg(long, default_value = "Cash")]
    mode: String,
  },
  Delete { transaction_id: String },
}

#[derive(Subcommand, Debug)]
pub enum TicketCommand {
  List {
    /// Only unresolved tickets
    #[arg(long)]
    open: bool,
  },
  Create {
    #[arg(long)]
    room: String,
    #[arg(long)]
    issue: String,
    /// Low, Medium or High
    #[arg(long, default_value = "Medium")]
    priority: String,
    #[arg(long, default_value = "")]
    requested_by: String,
    #[arg(long, default_value = "")]
    assigned_to: String,
  },
  Update {
    id: String,
    #[command(flatten)]
    changes: TicketChanges,
  },
  Delete { id: String },
}

/// Ticket fields to change; the rest keep their current value
#[derive(Args, Debug, Default)]
pub struct TicketChanges {
  /// Pending, In Progress or Resolved
  #[arg(long)]
  status: Option<String>,
  #[arg(long)]
  priority: Option<String>,
  #[arg(long)]
  assigned_to: Option<String>,
  #[arg(long)]
  remarks: Option<String>,
}

impl TicketChanges {
  fn is_empty(&self) -> bool {
    self.status.is_none()
      && self.priority.is_none()
      && self.assigned_to.is_none()
      && self.remarks.is_none()
  }
}

/// Run one subcommand to completion.
pub async fn run(
  command: Command,
  config: &Config,
  service: &HostelService,
  sessions: &SessionStore,
) -> Result<()> {
  match command {
    Command::Login { email } => login(config, sessions, email).await,
    Command::Logout => {
      session::logout(sessions, Some(service))?;
      println!("Logged out.");
      Ok(())
    }
    Command::Hostel(cmd) => hostel(cmd, service).await,
    Command::Room(cmd) => room(cmd, service).await,
    Command::Tenant(cmd) => tenant(cmd, service, config).await,
    Command::Payment(cmd) => payment(cmd, service).await,
    Command::Ticket(cmd) => ticket(cmd, service).await,
    Command::Profile => profile(service).await,
    Command::Reviews => reviews(service).await,
  }
}

async fn login(config: &Config, sessions: &SessionStore, email: Option<String>) -> Result<()> {
  let email = email
    .or_else(|| config.api.email.clone())
    .ok_or_else(|| eyre!("No email given. Pass --email or set api.email in the config."))?;
  let password = read_password()?;

  let client = HostelClient::new(&config.api.url, config.request_timeout())?;
  let session = session::login(
    &client,
    sessions,
    &email,
    &password,
    &session::login_policy(),
  )
  .await?;

  println!(
    "Logged in as {}. Session valid until {}.",
    session.email,
    session.expires_at.format("%Y-%m-%d %H:%M UTC")
  );
  Ok(())
}

/// `PGDESK_PASSWORD`, or the first line of stdin
fn read_password() -> Result<String> {
  if let Ok(password) = std::env::var("PGDESK_PASSWORD") {
    return Ok(password);
  }

  eprint!("Password: ");
  let mut line = String::new();
  std::io::stdin()
    .lock()
    .read_line(&mut line)
    .map_err(|e| eyre!("Failed to read password: {}", e))?;
  Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn hostel(cmd: HostelCommand, service: &HostelService) -> Result<()> {
  let message = match cmd {
    HostelCommand::Show => {
      match service.hostel(ReadOptions::forced()).await? {
        Some(hostel) => {
          println!("{} ({})", hostel.name, hostel.category);
          println!("  rooms:    {}", hostel.total_rooms);
          println!("  capacity: {}", hostel.max_capacity);
        }
        None => println!("No hostel set up yet."),
      }
      return Ok(());
    }
    HostelCommand::Create(args) => service.create_hostel(&args.into()).await?,
    HostelCommand::Edit(args) => service.edit_hostel(&args.into()).await?,
    HostelCommand::Remove => service.remove_hostel().await?,
  };
  println!("{}", message);
  Ok(())
}

async fn room(cmd: RoomCommand, service: &HostelService) -> Result<()> {
  let message = match cmd {
    RoomCommand::List => {
      let rooms = service.rooms(ReadOptions::default()).await?;
      if rooms.is_empty() {
        println!("No rooms.");
      }
      for room in rooms {
        println!(
          "{:<8} {:<16} {:>2}/{:<2} beds free  {:>9}  {}",
          room.room_number,
          room.sharing_type,
          room.available_beds,
          room.total_beds,
          format_amount(room.rent),
          room.status()
        );
      }
      return Ok(());
    }
    RoomCommand::Add {
      room_number,
      sharing,
      rent,
    } => {
      let beds = sharing_beds(&sharing)?;
      let room = Room {
        room_number,
        sharing_type: sharing,
        total_beds: beds,
        available_beds: beds,
        rent,
      };
      service.add_room(&room).await?
    }
    RoomCommand::Edit {
      room_number,
      sharing,
      rent,
      available,
    } => {
      let update = room_update(sharing, rent, available)?;
      service.edit_room(&room_number, &update).await?
    }
    RoomCommand::Remove { room_number } => service.remove_room(&room_number).await?,
  };
  println!("{}", message);
  Ok(())
}

fn sharing_beds(sharing: &str) -> Result<u32> {
  beds_for_sharing(sharing).ok_or_else(|| {
    eyre!(
      "Unknown sharing type '{}'. Use Single, Two, Three or Four Sharing.",
      sharing
    )
  })
}

/// New bed layout of a room. Free beds default to every bed of the sharing.
fn room_update(sharing: String, rent: f64, available: Option<u32>) -> Result<RoomUpdate> {
  let beds = sharing_beds(&sharing)?;
  let available_beds = available.unwrap_or(beds);
  if available_beds > beds {
    return Err(eyre!(
      "{} free beds is more than the {} beds of {}",
      available_beds,
      beds,
      sharing
    ));
  }
  Ok(RoomUpdate {
    sharing_type: sharing,
    rent,
    total_beds: beds,
    available_beds,
  })
}

/// List parameters from the flags. Page and page size are at least 1.
fn tenant_query(args: TenantListArgs, per_page: u32) -> Result<TenantQuery> {
  if let (Some(min), Some(max)) = (args.rent_min, args.rent_max) {
    if min > max {
      return Err(eyre!("--rent-min {} is above --rent-max {}", min, max));
    }
  }
  if let (Some(from), Some(to)) = (args.joined_from, args.joined_to) {
    if from > to {
      return Err(eyre!("--joined-from {} is after --joined-to {}", from, to));
    }
  }

  let day = |date: NaiveDate| date.format("%Y-%m-%d").to_string();
  let mut query = TenantQuery {
    limit: per_page.max(1),
    sort_order: args.sort_order,
    room_number: args.room.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
    join_date_from: args.joined_from.map(day),
    join_date_to: args.joined_to.map(day),
    rent_amount_min: args.rent_min,
    rent_amount_max: args.rent_max,
    ..TenantQuery::default()
  }
  .with_search(args.search.as_deref().unwrap_or(""));
  query.page = args.page.max(1);
  Ok(query)
}

/// A tenant moving in today
fn new_tenant(
  name: String,
  room: String,
  rent: f64,
  contact: String,
  email: String,
  now: DateTime<Utc>,
) -> Result<Tenant> {
  if !session::is_valid_email(&email) {
    return Err(eyre!("Invalid email address: {}", email));
  }
  if name.trim().is_empty() {
    return Err(eyre!("Tenant name must not be empty"));
  }
  Ok(Tenant {
    id: None,
    tenant_name: name.trim().to_string(),
    room_number: room,
    move_in_date: Some(now.format("%Y-%m-%d").to_string()),
    agreement_start_date: None,
    rent_amount: rent,
    contact,
    email: email.trim().to_string(),
    aadhaar_number: None,
    date_of_birth: None,
    permanent_address: None,
    current_address: None,
    emergency_contact: None,
  })
}

/// The update endpoint takes the whole ticket
fn merge_ticket(current: MaintenanceTicket, changes: TicketChanges) -> MaintenanceTicket {
  MaintenanceTicket {
    status: changes.status.unwrap_or(current.status),
    priority: changes.priority.unwrap_or(current.priority),
    assigned_to: changes.assigned_to.unwrap_or(current.assigned_to),
    remarks: changes.remarks.unwrap_or(current.remarks),
    ..current
  }
}

async fn tenant(cmd: TenantCommand, service: &HostelService, config: &Config) -> Result<()> {
  let message = match cmd {
    TenantCommand::List(args) => {
      let query = tenant_query(args, config.tenants.per_page)?;

      let result = service.tenants(&query).await?;
      for tenant in &result.tenants {
        println!(
          "{:<26} {:<24} {:<7} {:>9}  {}",
          tenant.id.as_deref().unwrap_or("-"),
          truncate(&tenant.tenant_name, 22),
          tenant.room_number,
          format_amount(tenant.rent_amount),
          tenant.contact
        );
      }
      println!(
        "page {}/{} ({} tenants)",
        query.page,
        query.total_pages(result.total),
        result.total
      );
      return Ok(());
    }
    TenantCommand::Add {
      name,
      room,
      rent,
      contact,
      email,
    } => {
      let tenant = new_tenant(name, room, rent, contact, email, Utc::now())?;
      service.add_tenant(&tenant).await?
    }
    TenantCommand::Update {
      id,
      name,
      room,
      rent,
      contact,
      email,
    } => {
      let update = TenantUpdate {
        tenant_name: name,
        room_number: room,
        rent_amount: rent,
        contact,
        email,
      };
      if update.is_empty() {
        return Err(eyre!("Nothing to update"));
      }
      service.update_tenant(&id, &update).await?
    }
    TenantCommand::Delete { id } => service.delete_tenant(&id).await?,
  };
  println!("{}", message);
  Ok(())
}

async fn payment(cmd: PaymentCommand, service: &HostelService) -> Result<()> {
  let message = match cmd {
    PaymentCommand::List { tenant_id } => {
      let payments = service
        .transactions(&tenant_id, ReadOptions::default())
        .await?;
      if payments.is_empty() {
        println!("No payments recorded.");
      }
      for payment in payments {
        println!(
          "{:<12} {:>9}  due {:>9}  {:<14} {:<8} {}",
          payment.payment_date.as_deref().unwrap_or("-"),
          format_amount(payment.payment_amount),
          format_amount(payment.due_amount),
          payment.payment_mode,
          payment.rent_status,
          payment.transaction_id
        );
      }
      return Ok(());
    }
    PaymentCommand::Record {
      tenant_id,
      amount,
      name,
      room,
      rent,
      mode,
    } => {
      if amount <= 0.0 {
        return Err(eyre!("Amount must be positive"));
      }
      let tenant = Tenant {
        id: Some(tenant_id),
        tenant_name: name,
        room_number: room,
        move_in_date: None,
        agreement_start_date: None,
        rent_amount: rent,
        contact: String::new(),
        email: String::new(),
        aadhaar_number: None,
        date_of_birth: None,
        permanent_address: None,
        current_address: None,
        emergency_contact: None,
      };
      let payment = Payment {
        payment_mode: mode,
        ..Payment::new(&tenant, amount, Utc::now())
      };
      let message = service.record_payment(&payment).await?;
      format!("{} ({})", message, payment.transaction_id)
    }
    PaymentCommand::Delete { transaction_id } => service.delete_payment(&transaction_id).await?,
  };
  println!("{}", message);
  Ok(())
}

async fn ticket(cmd: TicketCommand, service: &HostelService) -> Result<()> {
  let message = match cmd {
    TicketCommand::List { open } => {
      let tickets = service.tickets(ReadOptions::default()).await?;
      for ticket in tickets.iter().filter(|t| !open || !t.is_resolved()) {
        println!(
          "{:<26} {:<7} {:<7} {:<12} {}",
          ticket.id.as_deref().unwrap_or("-"),
          ticket.room_no,
          ticket.priority,
          ticket.status,
          truncate(&ticket.issue, 48)
        );
      }
      return Ok(());
    }
    TicketCommand::Create {
      room,
      issue,
      priority,
      requested_by,
      assigned_to,
    } => {
      let ticket = MaintenanceTicket {
        id: None,
        room_no: room,
        issue,
        status: "Pending".to_string(),
        remarks: String::new(),
        priority,
        requested_by,
        assigned_to,
        created_date: Some(Utc::now().format("%Y-%m-%d").to_string()),
      };
      service.create_ticket(&ticket).await?
    }
    TicketCommand::Update { id, changes } => {
      if changes.is_empty() {
        return Err(eyre!("Nothing to update"));
      }
      let tickets = service.tickets(ReadOptions::forced()).await?;
      let current = tickets
        .into_iter()
        .find(|t| t.id.as_deref() == Some(id.as_str()))
        .ok_or_else(|| eyre!("No ticket with id {}", id))?;

      let ticket = merge_ticket(current, changes);
      service.update_ticket(&id, &ticket).await?
    }
    TicketCommand::Delete { id } => service.delete_ticket(&id).await?,
  };
  println!("{}", message);
  Ok(())
}

async fn profile(service: &HostelService) -> Result<()> {
  let profile = service.profile(ReadOptions::default()).await?;
  println!("{}", profile.name);
  println!("  email:   {}", profile.email);
  if !profile.contact.is_empty() {
    println!("  contact: {}", profile.contact);
  }
  Ok(())
}

async fn reviews(service: &HostelService) -> Result<()> {
  let reviews = service.reviews(ReadOptions::default()).await?;
  if reviews.is_empty() {
    println!("No reviews rated 4 or better yet.");
  }
  for review in reviews {
    println!(
      "{:>3.1}  {:<20} {}",
      review.rating,
      truncate(&review.name, 20),
      truncate(&review.review, 60)
    );
  }
  Ok(())
}
