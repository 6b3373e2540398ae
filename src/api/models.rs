use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Serialize, Deserialize};

/// Device channel of a campsite
#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,Serialize,Deserialize,ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Utility {
    Electricity,
    Water,
    Barrier
}

impl Utility {
    /// command used to drive this utility, `None` for read-only channels
    pub fn command_type(&self) -> Option<CommandType> {
        match self {
            Utility::Electricity => Some(CommandType::SetElectricity),
            Utility::Barrier => Some(CommandType::SetBarrier),
            Utility::Water => None
        }
    }
}

impl fmt::Display for Utility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Utility::Electricity => "electricity",
            Utility::Water => "water",
            Utility::Barrier => "barrier"
        })
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Eq,Default,Serialize,Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
    #[default]
    #[serde(other)]
    Unknown
}

#[derive(Debug,Clone,PartialEq,Default,Serialize,Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default)]
    pub status: DeviceStatus,
    #[serde(default)]
    pub last_connected: Option<DateTime<Utc>>
}

/// Utility and device state of a single campsite, as reported by the backend
#[derive(Debug,Clone,PartialEq,Default,Serialize,Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampsiteState {
    #[serde(default)]
    pub electricity: bool,
    #[serde(default)]
    pub water: bool,
    #[serde(default)]
    pub barrier: bool,
    #[serde(default)]
    pub device: DeviceInfo
}

impl CampsiteState {
    pub fn get(&self, utility: Utility) -> bool {
        match utility {
            Utility::Electricity => self.electricity,
            Utility::Water => self.water,
            Utility::Barrier => self.barrier
        }
    }

    pub fn set(&mut self, utility: Utility, value: bool) {
        match utility {
            Utility::Electricity => self.electricity = value,
            Utility::Water => self.water = value,
            Utility::Barrier => self.barrier = value
        }
    }
}

impl fmt::Display for CampsiteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let on_off = |v: bool| if v { "on" } else { "off" };
        write!(f, "electricity={} water={} barrier={} device={:?}",
            on_off(self.electricity),
            on_off(self.water),
            if self.barrier { "open" } else { "closed" },
            self.device.status
        )?;
        if let Some(last) = self.device.last_connected {
            write!(f, " (last seen {})", last.to_rfc3339())?;
        }
        Ok(())
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandType {
    SetElectricity,
    SetBarrier
}

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    pub kind: CommandType,
    pub state: bool
}

/// POST body of `/campsites/{id}/command`
#[derive(Debug,Serialize)]
pub(crate) struct CommandRequest<'a> {
    pub command: &'a Command
}

#[derive(Debug,Clone,Serialize,Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campsite {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>
}

#[derive(Debug,Clone,Copy,PartialEq,Eq,Default,Serialize,Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin
}

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role
}

#[derive(Debug,Clone,Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String
}

#[derive(Debug,Clone,Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String
}

/// Credential exchange result of login and register
#[derive(Debug,Clone,Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User
}

#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize,ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Rejected
}

impl BookingStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Rejected)
    }
}

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub campsite_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_guests")]
    pub guests: u32,
    pub status: BookingStatus
}

fn default_guests() -> u32 { 1 }

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub campsite_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guests: u32
}

#[derive(Debug,Clone,Deserialize)]
pub struct Profile {
    pub user: User,
    #[serde(default)]
    pub bookings: Vec<Booking>
}

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub nightly_rate: f64,
    pub electricity_surcharge: f64,
    pub currency: String
}
