use log::{debug, warn};
use tokio::{io::{AsyncBufReadExt, BufReader}, select, sync::broadcast::error::RecvError};

use crate::api::Utility;
use crate::control::{CampsiteController, ControlError, ControlPhase};

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum ConsoleCommand {
    Toggle(Utility),
    State,
    Refresh,
    Help,
    Quit,
    Empty
}

pub fn parse(line: &str) -> Result<ConsoleCommand, String> {
    let cmd = match line.trim().to_ascii_lowercase().as_str() {
        "" => ConsoleCommand::Empty,
        "e" | "electricity" => ConsoleCommand::Toggle(Utility::Electricity),
        "b" | "barrier" => ConsoleCommand::Toggle(Utility::Barrier),
        "w" | "water" => ConsoleCommand::Toggle(Utility::Water),
        "s" | "state" => ConsoleCommand::State,
        "r" | "refresh" => ConsoleCommand::Refresh,
        "h" | "help" | "?" => ConsoleCommand::Help,
        "q" | "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other))
    };
    Ok(cmd)
}

const HELP: &str = "\
electricity (e)  toggle electricity
barrier (b)      open/close barrier
water (w)        water is read-only
state (s)        show local state
refresh (r)      re-fetch state from the backend
quit (q)";

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn busy_line(utility: Utility, phase: ControlPhase, busy: bool) -> Option<String> {
    match phase {
        ControlPhase::InFlight { previous, desired } =>
            Some(format!("  {} switching {} -> {}", utility, on_off(previous), on_off(desired))),
        ControlPhase::AwaitingReconcile { desired } =>
            Some(format!("  {} {} requested, confirming", utility, on_off(desired))),
        ControlPhase::Idle if busy => Some(format!("  {} settling", utility)),
        ControlPhase::Idle => None
    }
}

async fn print_state(controller: &CampsiteController) {
    match controller.state().await {
        None => println!("state not loaded"),
        Some(state) => {
            println!("{}", state);
            for utility in [Utility::Electricity, Utility::Barrier] {
                let phase = controller.phase(utility).await;
                if let Some(line) = busy_line(utility, phase, controller.is_busy(utility).await) {
                    println!("{}", line);
                }
            }
            println!("  barrier motion {:?}", controller.barrier_motion().await);
        }
    }
}

/// Interactive control of one campsite until stdin closes or `quit`.
pub async fn run(controller: &CampsiteController) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut events = controller.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("campsite {}, 'help' lists commands", controller.campsite_id());
    print_state(controller).await;

    loop {
        select! {
            line = lines.next_line() => {
                let line = match line? {
                    None => break,
                    Some(line) => line
                };
                match parse(&line) {
                    Err(msg) => println!("{}", msg),
                    Ok(ConsoleCommand::Empty) => {},
                    Ok(ConsoleCommand::Quit) => break,
                    Ok(ConsoleCommand::Help) => println!("{}", HELP),
                    Ok(ConsoleCommand::State) => print_state(controller).await,
                    Ok(ConsoleCommand::Refresh) => {
                        if let Err(err) = controller.refresh().await {
                            warn!("Refresh failed! ({})", err);
                            println!("refresh failed: {}", err);
                        }
                    },
                    Ok(ConsoleCommand::Toggle(utility)) => {
                        // keep reading input while the command is in flight
                        let ctl = controller.clone();
                        tokio::spawn(async move {
                            if let Err(err) = ctl.toggle(utility).await {
                                debug!("toggle {} ended with {}", utility, err);
                                // other refusals arrive as events
                                if matches!(err, ControlError::ReadOnly(_)) {
                                    println!("{}", err);
                                }
                            }
                        });
                    }
                }
            },
            evt = events.recv() => {
                match evt {
                    Ok(evt) => println!("{}", evt),
                    Err(RecvError::Lagged(n)) => warn!("Missed {} control events", n),
                    Err(RecvError::Closed) => break
                }
            }
        }
    }

    Ok(())
}
