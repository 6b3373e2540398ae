use std::sync::Arc;

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use futures::future::try_join_all;
use log::{info, warn};

use crate::api::{ApiClient, BookingStatus, CampsiteApi, Utility};
use crate::auth::{self, AuthContext, AuthSession};
use crate::booking::{self, BookingFilter};
use crate::config::Configuration;
use crate::console;
use crate::control::{CampsiteController, ControlEvent};
use crate::database::Database;
use crate::pricing;

pub type CmdResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Subcommand,Debug)]
pub enum Cmd {
    /// sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String
    },
    /// create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String
    },
    /// forget the stored session
    Logout,
    /// show the signed-in user and their bookings
    Profile,
    /// list campsites with their utility state
    Campsites {
        /// print the local cache instead of asking the backend
        #[arg(long)]
        cached: bool
    },
    /// show the state of one campsite
    State {
        campsite: String,
        #[arg(long)]
        cached: bool
    },
    /// toggle a utility and wait until it is confirmed
    Toggle {
        campsite: String,
        #[arg(value_enum)]
        utility: Utility
    },
    /// interactive control of a campsite
    Control {
        campsite: String
    },
    /// request a booking, dates as YYYY-MM-DD
    Book {
        campsite: String,
        start: NaiveDate,
        end: NaiveDate,
        #[arg(long, default_value_t = 1)]
        guests: u32
    },
    /// list own bookings
    Bookings {
        #[arg(long, value_enum)]
        status: Option<BookingStatus>,
        /// hide stays that already ended
        #[arg(long)]
        upcoming: bool
    },
    /// cancel a booking
    Cancel {
        booking: String
    },
    /// pricing settings (admin)
    Pricing {
        #[command(subcommand)]
        action: PricingCmd
    }
}

#[derive(Subcommand,Debug)]
pub enum PricingCmd {
    Show,
    Set {
        #[arg(long)]
        nightly_rate: f64,
        #[arg(long)]
        electricity_surcharge: f64,
        #[arg(long, default_value = "EUR")]
        currency: String
    }
}

pub struct Context<'a> {
    pub conf: &'a Configuration,
    pub db: &'a Database<'a>,
    pub auth: Arc<AuthContext>,
    pub api: Arc<ApiClient>
}

impl<'a> Context<'a> {
    fn controller(&self, campsite_id: &str) -> CampsiteController {
        let api: Arc<dyn CampsiteApi> = self.api.clone();
        CampsiteController::new(api, campsite_id, self.conf.controller_settings())
    }

    async fn sign_in(&self, session: AuthSession) -> CmdResult {
        self.db.session.store(&session)?;
        info!("Signed in as {}", session.user.email);
        println!("signed in as {} <{}> ({:?})", session.user.name, session.user.email, session.user.role);
        self.auth.set(session).await;
        Ok(())
    }
}

pub async fn run(ctx: &Context<'_>, cmd: Cmd) -> CmdResult {
    match cmd {
        Cmd::Login { email, password } => {
            let req = auth::login_request(&email, &password)?;
            let resp = ctx.api.login(&req).await?;
            ctx.sign_in(resp.into()).await
        },
        Cmd::Register { name, email, password } => {
            let req = auth::register_request(&name, &email, &password)?;
            let resp = ctx.api.register(&req).await?;
            ctx.sign_in(resp.into()).await
        },
        Cmd::Logout => {
            let user = ctx.auth.user().await;
            ctx.auth.clear().await;
            match (ctx.db.session.clear()?, user) {
                (true, Some(user)) => println!("signed out {}", user.email),
                _ => println!("not signed in")
            }
            Ok(())
        },
        Cmd::Profile => profile(ctx).await,
        Cmd::Campsites { cached } => campsites(ctx, cached).await,
        Cmd::State { campsite, cached } => state(ctx, &campsite, cached).await,
        Cmd::Toggle { campsite, utility } => toggle(ctx, &campsite, utility).await,
        Cmd::Control { campsite } => control(ctx, &campsite).await,
        Cmd::Book { campsite, start, end, guests } => {
            let req = booking::booking_request(&campsite, start, end, guests, Local::now().date_naive())?;
            let created = ctx.api.request_booking(&req).await?;
            println!("booking {} {:?}: {} nights at {} from {}",
                created.id, created.status, booking::nights(created.start_date, created.end_date), created.campsite_id, created.start_date);
            Ok(())
        },
        Cmd::Bookings { status, upcoming } => {
            let filter = BookingFilter {
                status: status,
                upcoming_from: if upcoming { Some(Local::now().date_naive()) } else { None }
            };
            let list = filter.apply(ctx.api.bookings().await?);
            if list.is_empty() {
                println!("no bookings");
            }
            for b in list.iter() {
                println!("{}  {}  {} .. {} ({} nights, {} guests)  {:?}",
                    b.id, b.campsite_id, b.start_date, b.end_date, booking::nights(b.start_date, b.end_date), b.guests, b.status);
            }
            Ok(())
        },
        Cmd::Cancel { booking } => {
            let known = ctx.api.bookings().await?;
            booking::check_cancellable(&booking, &known)?;
            ctx.api.cancel_booking(&booking).await?;
            println!("booking {} cancelled", booking);
            Ok(())
        },
        Cmd::Pricing { action: PricingCmd::Show } => {
            let p = ctx.api.pricing().await?;
            println!("nightly rate {:.2} {}, electricity surcharge {:.2} {}", p.nightly_rate, p.currency, p.electricity_surcharge, p.currency);
            Ok(())
        },
        Cmd::Pricing { action: PricingCmd::Set { nightly_rate, electricity_surcharge, currency } } => {
            let update = pricing::pricing_update(ctx.auth.is_admin().await, nightly_rate, electricity_surcharge, &currency)?;
            let p = ctx.api.update_pricing(&update).await?;
            println!("pricing saved: nightly rate {:.2} {}, electricity surcharge {:.2} {}", p.nightly_rate, p.currency, p.electricity_surcharge, p.currency);
            Ok(())
        }
    }
}

async fn profile(ctx: &Context<'_>) -> CmdResult {
    let profile = ctx.api.profile().await?;
    println!("{} <{}> ({:?})", profile.user.name, profile.user.email, profile.user.role);

    let today = Local::now().date_naive();
    let upcoming = BookingFilter { status: None, upcoming_from: Some(today) }.apply(profile.bookings.clone());
    println!("{} bookings, {} upcoming", profile.bookings.len(), upcoming.len());
    for b in upcoming.iter() {
        println!("  {}  {} .. {}  {:?}", b.campsite_id, b.start_date, b.end_date, b.status);
    }
    Ok(())
}

async fn campsites(ctx: &Context<'_>, cached: bool) -> CmdResult {
    if cached {
        for (id, rec) in ctx.db.campsites.list()? {
            println!("{}  {}  (cached {})", id, rec.state, rec.cached_at.to_rfc3339());
        }
        return Ok(());
    }

    let sites = ctx.api.campsites().await?;
    let states = try_join_all(sites.iter().map(|site| ctx.api.campsite_state(&site.id))).await?;

    for (site, state) in sites.iter().zip(states.iter()) {
        ctx.db.campsites.update(&site.id, state)?;
        println!("{}  {}  {}", site.id, site.name, state);
        if let Some(description) = &site.description {
            println!("    {}", description);
        }
    }
    Ok(())
}

async fn state(ctx: &Context<'_>, campsite_id: &str, cached: bool) -> CmdResult {
    if cached {
        match ctx.db.campsites.get(campsite_id)? {
            Some(rec) => println!("{}  (cached {})", rec.state, rec.cached_at.to_rfc3339()),
            None => println!("campsite {} not cached", campsite_id)
        }
        return Ok(());
    }

    let state = ctx.api.campsite_state(campsite_id).await?;
    ctx.db.campsites.update(campsite_id, &state)?;
    println!("{}", state);
    Ok(())
}

async fn toggle(ctx: &Context<'_>, campsite_id: &str, utility: Utility) -> CmdResult {
    let controller = ctx.controller(campsite_id);
    controller.refresh().await?;

    let mut events = controller.subscribe();
    let result = controller.toggle(utility).await;

    // print what the controller reported before surfacing an error
    while let Ok(evt) = events.try_recv() {
        println!("{}", evt);
    }
    result?;

    let mut confirmed = false;
    let mut ready = false;
    while !(confirmed && ready) {
        match events.recv().await? {
            evt @ (ControlEvent::Reconciled { .. } | ControlEvent::ReconcileFailed { .. }) => {
                confirmed = true;
                println!("{}", evt);
            },
            ControlEvent::BusyCleared { utility: cleared } if cleared == utility => {
                ready = true;
                println!("{} ready", cleared);
            },
            evt => println!("{}", evt)
        }
    }

    if let Some(state) = controller.state().await {
        ctx.db.campsites.update(campsite_id, &state)?;
    }
    Ok(())
}

async fn control(ctx: &Context<'_>, campsite_id: &str) -> CmdResult {
    let controller = ctx.controller(campsite_id);
    if let Err(err) = controller.refresh().await {
        warn!("Initial load of campsite {} failed! ({})", campsite_id, err);
        println!("could not load campsite {}: {}", campsite_id, err);
    }

    console::run(&controller).await?;

    if let Some(state) = controller.state().await {
        ctx.db.campsites.update(campsite_id, &state)?;
    }
    // dropping the last handle cancels any pending reconcile/ready timers
    drop(controller);
    Ok(())
}
