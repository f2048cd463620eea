use std::path::PathBuf;

use agri_core::domains::advertisements::{Advertisements, NewAdvertisement};
use agri_core::domains::cart::Cart;
use agri_core::domains::delivery::Delivery;
use agri_core::domains::notifications::Notifications;
use agri_core::domains::orders::{CheckoutRequest, Orders, PaymentMethod};
use agri_core::domains::profile::{Account, PasswordChange};
use agri_core::domains::sales::{ExportFormat, Sales};
use agri_core::domains::tickets::{NewTicket, SupportTickets, TicketStatus};
use agri_core::domains::{Attachment, DateRange};
use agri_core::{
    ApiError, ClientConfig, Dispatcher, MutationKind, OtpWorkflow, StorageError, TaskError, TOKEN_KEY,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Parser)]
#[command(name = "agri")]
#[command(version)]
#[command(about = "Farm marketplace client: shopping, farmer tools and delivery confirmation")]
pub struct Cli {
    /// Override the API base URL from config.json / AGRI_API_URL
    #[arg(long, global = true, env = "AGRI_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage the stored bearer token
    #[command(subcommand)]
    Token(TokenCmd),
    /// Farmer advertisements
    #[command(subcommand)]
    Ads(AdsCmd),
    /// Support tickets and their threads
    #[command(subcommand)]
    Tickets(TicketsCmd),
    /// Delivery confirmation codes
    #[command(subcommand)]
    Otp(OtpCmd),
    /// Delivery agent task lists
    #[command(subcommand)]
    Delivery(DeliveryCmd),
    /// Farmer sales reports
    #[command(subcommand)]
    Sales(SalesCmd),
    /// Shopping cart and checkout
    #[command(subcommand)]
    Cart(CartCmd),
    /// Notification list and device registration
    #[command(subcommand)]
    Notifications(NotificationsCmd),
    /// Profile and password
    #[command(subcommand)]
    Profile(ProfileCmd),
}

#[derive(Subcommand)]
pub enum TokenCmd {
    Set { token: String },
    Clear,
}

#[derive(Subcommand)]
pub enum AdsCmd {
    List,
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: String,
        /// Start, e.g. "2024-01-01 00:00"
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    Delete { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TicketStatusArg {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl From<TicketStatusArg> for TicketStatus {
    fn from(arg: TicketStatusArg) -> Self {
        match arg {
            TicketStatusArg::Open => TicketStatus::Open,
            TicketStatusArg::InProgress => TicketStatus::InProgress,
            TicketStatusArg::Resolved => TicketStatus::Resolved,
            TicketStatusArg::Closed => TicketStatus::Closed,
        }
    }
}

#[derive(Subcommand)]
pub enum TicketsCmd {
    List,
    Show { id: String },
    Create {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        attachment: Option<PathBuf>,
    },
    Reply { id: String, message: String },
    Status {
        id: String,
        #[arg(value_enum)]
        status: TicketStatusArg,
    },
}

#[derive(Subcommand)]
pub enum OtpCmd {
    Generate { order: String },
    Verify { order: String, code: String },
    Resend { order: String },
    Status { order: String },
}

#[derive(Subcommand)]
pub enum DeliveryCmd {
    Today,
    History { from: NaiveDate, to: NaiveDate },
    Dashboard,
    /// Refresh today's tasks in the background and report after each interval
    Watch {
        #[arg(long, default_value_t = 3)]
        rounds: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Pdf,
    Excel,
}

#[derive(Subcommand)]
pub enum SalesCmd {
    Report { from: NaiveDate, to: NaiveDate },
    Export {
        from: NaiveDate,
        to: NaiveDate,
        #[arg(long, value_enum, default_value = "pdf")]
        format: FormatArg,
        /// Output file; defaults to sales-<from>-<to>.<ext>
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PaymentArg {
    Cod,
    Online,
}

#[derive(Subcommand)]
pub enum CartCmd {
    List,
    Add {
        product: String,
        #[arg(default_value_t = 1)]
        quantity: u32,
    },
    Set { id: String, quantity: u32 },
    Remove { id: String },
    Checkout {
        #[arg(long)]
        address: String,
        #[arg(long, value_enum, default_value = "cod")]
        payment: PaymentArg,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum NotificationsCmd {
    List,
    Read { id: String },
    Register { token: String },
}

#[derive(Subcommand)]
pub enum ProfileCmd {
    Show,
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
}

pub enum Outcome {
    Json(Value),
    Text(String),
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("output error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Task(#[from] TaskError),
}

impl CliError {
    pub fn is_transient(&self) -> bool {
        matches!(self, CliError::Api(e) if e.is_transient())
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, CliError::Api(e) if e.is_auth())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Outcome, CliError> {
    Ok(Outcome::Json(serde_json::to_value(value)?))
}

async fn attachment(path: Option<PathBuf>) -> Result<Option<Attachment>, CliError> {
    match path {
        Some(path) => Ok(Some(Attachment::from_path(&path).await?)),
        None => Ok(None),
    }
}

pub async fn run(command: Command, dispatcher: Dispatcher, config: &ClientConfig) -> Result<Outcome, CliError> {
    match command {
        Command::Token(cmd) => match cmd {
            TokenCmd::Set { token } => {
                dispatcher.tokens().set(TOKEN_KEY, token).await?;
                Ok(Outcome::Text("token saved".to_owned()))
            }
            TokenCmd::Clear => {
                dispatcher.tokens().clear().await?;
                Ok(Outcome::Text("signed out".to_owned()))
            }
        },
        Command::Ads(cmd) => {
            let ads = Advertisements::new(dispatcher);
            match cmd {
                AdsCmd::List => to_json(&ads.fetch().await?),
                AdsCmd::Create {
                    title,
                    message,
                    from,
                    to,
                    image,
                } => {
                    let mut ad = NewAdvertisement::new(title, message, from, to);
                    ad.image = attachment(image).await?;
                    to_json(&ads.create(ad).await?)
                }
                AdsCmd::Delete { id } => {
                    ads.delete(&id).await?;
                    Ok(Outcome::Text(format!("advertisement {id} deleted")))
                }
            }
        }
        Command::Tickets(cmd) => {
            let tickets = SupportTickets::new(dispatcher);
            match cmd {
                TicketsCmd::List => to_json(&tickets.fetch().await?),
                TicketsCmd::Show { id } => to_json(&tickets.open(&id).await?),
                TicketsCmd::Create {
                    subject,
                    description,
                    attachment: path,
                } => {
                    let ticket = NewTicket {
                        subject,
                        description,
                        priority: None,
                        attachment: attachment(path).await?,
                    };
                    to_json(&tickets.create(ticket).await?)
                }
                TicketsCmd::Reply { id, message } => to_json(&tickets.reply(&id, &message).await?),
                TicketsCmd::Status { id, status } => {
                    // Load the thread first so the transition can be checked locally.
                    tickets.open(&id).await?;
                    to_json(&tickets.set_status(&id, status.into()).await?)
                }
            }
        }
        Command::Otp(cmd) => {
            let otp = OtpWorkflow::new(dispatcher);
            match cmd {
                OtpCmd::Generate { order } => {
                    otp.generate(&order).await?;
                    let state = otp.state().await;
                    let displayed = state.displayed_otp();
                    Ok(Outcome::Json(json!({
                        "phase": state.phase,
                        "message": state.message,
                        "otp": displayed,
                        "status_error": state.status_error.map(|e| e.to_string()),
                    })))
                }
                OtpCmd::Verify { order, code } => {
                    let payload = otp.verify(&order, &code).await?;
                    Ok(Outcome::Text(
                        payload.message.unwrap_or_else(|| "delivery confirmed".to_owned()),
                    ))
                }
                OtpCmd::Resend { order } => {
                    let payload = otp.resend(&order).await?;
                    Ok(Outcome::Text(payload.message.unwrap_or_else(|| "code resent".to_owned())))
                }
                OtpCmd::Status { order } => Ok(Outcome::Json(otp.refresh_status(&order).await?.data)),
            }
        }
        Command::Delivery(cmd) => {
            let delivery = Delivery::new(dispatcher);
            match cmd {
                DeliveryCmd::Today => to_json(&delivery.fetch_today().await?),
                DeliveryCmd::History { from, to } => {
                    to_json(&delivery.fetch_history(DateRange::new(from, to)?).await?)
                }
                DeliveryCmd::Dashboard => to_json(&delivery.fetch_dashboard().await?),
                DeliveryCmd::Watch { rounds } => {
                    let handle = delivery.auto_refresh(&config.refresh);
                    let mut snapshots = Vec::new();
                    for _ in 0..rounds {
                        tokio::time::sleep(config.refresh.interval()).await;
                        let state = delivery.today_state().await;
                        snapshots.push(json!({
                            "tasks": state.items(),
                            "error": state.error(MutationKind::Fetch).map(|e| e.to_string()),
                        }));
                    }
                    handle.stop().await?;
                    Ok(Outcome::Json(Value::Array(snapshots)))
                }
            }
        }
        Command::Sales(cmd) => {
            let sales = Sales::new(dispatcher);
            match cmd {
                SalesCmd::Report { from, to } => to_json(&sales.fetch(DateRange::new(from, to)?).await?),
                SalesCmd::Export {
                    from,
                    to,
                    format,
                    out,
                } => {
                    let format = match format {
                        FormatArg::Pdf => ExportFormat::Pdf,
                        FormatArg::Excel => ExportFormat::Excel,
                    };
                    let bytes = sales.export(DateRange::new(from, to)?, format).await?;
                    let out = out.unwrap_or_else(|| {
                        PathBuf::from(format!("sales-{from}-{to}.{}", format.extension()))
                    });
                    tokio::fs::write(&out, &bytes).await?;
                    Ok(Outcome::Text(format!("wrote {} bytes to {}", bytes.len(), out.display())))
                }
            }
        }
        Command::Cart(cmd) => {
            let cart = Cart::new(dispatcher.clone());
            match cmd {
                CartCmd::List => {
                    let items = cart.fetch().await?;
                    Ok(Outcome::Json(json!({ "items": items, "total": cart.total().await })))
                }
                CartCmd::Add { product, quantity } => to_json(&cart.add(&product, quantity).await?),
                CartCmd::Set { id, quantity } => to_json(&cart.set_quantity(&id, quantity).await?),
                CartCmd::Remove { id } => {
                    cart.remove(&id).await?;
                    Ok(Outcome::Text(format!("removed {id}")))
                }
                CartCmd::Checkout {
                    address,
                    payment,
                    notes,
                } => {
                    cart.fetch().await?;
                    let orders = Orders::new(dispatcher);
                    let request = CheckoutRequest {
                        address_id: address,
                        payment_method: match payment {
                            PaymentArg::Cod => PaymentMethod::CashOnDelivery,
                            PaymentArg::Online => PaymentMethod::Online,
                        },
                        notes,
                    };
                    to_json(&orders.checkout(&cart, &request).await?)
                }
            }
        }
        Command::Notifications(cmd) => {
            let notifications = Notifications::new(dispatcher);
            match cmd {
                NotificationsCmd::List => to_json(&notifications.fetch().await?),
                NotificationsCmd::Read { id } => {
                    notifications.mark_read(&id).await?;
                    Ok(Outcome::Text(format!("notification {id} marked read")))
                }
                NotificationsCmd::Register { token } => {
                    let payload = notifications.register_device_token(&token).await?;
                    Ok(Outcome::Text(
                        payload.message.unwrap_or_else(|| "device registered".to_owned()),
                    ))
                }
            }
        }
        Command::Profile(cmd) => {
            let account = Account::new(dispatcher);
            match cmd {
                ProfileCmd::Show => to_json(&account.fetch_profile().await?),
                ProfileCmd::Password {
                    current,
                    new,
                    confirm,
                } => {
                    account
                        .change_password(PasswordChange {
                            current_password: current,
                            new_password: new,
                            confirmation: confirm,
                        })
                        .await?;
                    Ok(Outcome::Text("password changed".to_owned()))
                }
            }
        }
    }
}
