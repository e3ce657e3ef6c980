//! Pre-defined simulation scenarios
//!
//! Small scripted contact plans that show the router's behavior end to
//! end, plus a seeded random run.

use tracing::info;

use ferry_core::{ContactEvent, HostId, SimTime};
use ferry_dtn::DrincSettings;

use crate::config::{MessageEvent, MessageGeneration, RunConfig, SimSettings};
use crate::error::SimResult;
use crate::simulation::Simulation;
use crate::trace::ContactGeneration;

/// One meeting of `a` and `b` over `[from, to)`
fn meeting(a: u32, b: u32, from: f64, to: f64) -> [ContactEvent<HostId>; 2] {
    [
        ContactEvent::up(SimTime::from_secs(from), HostId(a), HostId(b)),
        ContactEvent::down(SimTime::from_secs(to), HostId(a), HostId(b)),
    ]
}

fn message(time: f64, from: u32, to: u32) -> MessageEvent {
    MessageEvent {
        time,
        from: HostId(from),
        to: HostId(to),
        size: 1_000,
    }
}

/// Run the relay chain scenario:
///
/// ```text
/// n1 meets n2 twice, learning it is a good carrier for n2
/// n0 creates a message for n2
/// n0 meets n1 and sprays one copy to it
/// n1 meets n2 again and delivers
/// ```
pub fn run_relay_chain_scenario() -> SimResult<Simulation> {
    info!("=== Running relay chain scenario ===");

    let mut settings = SimSettings::scripted(3, 300.0);
    settings.messages = vec![message(100.0, 0, 2)];
    let config = RunConfig::new(DrincSettings::new(30, 2), settings);

    let contacts = [
        meeting(1, 2, 10.0, 20.0),
        meeting(1, 2, 30.0, 40.0),
        meeting(0, 1, 110.0, 130.0),
        meeting(1, 2, 200.0, 230.0),
    ]
    .concat();

    let mut sim = Simulation::new(config, contacts)?;
    sim.run()?;
    Ok(sim)
}

/// Run the data ferry scenario:
///
/// ```text
/// West (n0, n1) and East (n3, n4) never meet
/// n0 creates a message for n4 and sprays a copy to n1
/// The ferry n2 visits n0, then n3, then n4
/// ```
pub fn run_data_ferry_scenario() -> SimResult<Simulation> {
    info!("=== Running data ferry scenario ===");

    let mut settings = SimSettings::scripted(5, 300.0);
    settings.messages = vec![message(0.0, 0, 4)];
    let config = RunConfig::new(DrincSettings::new(30, 2), settings);

    let contacts = [
        meeting(0, 1, 10.0, 20.0),
        meeting(3, 4, 15.0, 25.0),
        meeting(0, 2, 30.0, 40.0),
        meeting(2, 3, 100.0, 110.0),
        meeting(2, 4, 200.0, 210.0),
    ]
    .concat();

    let mut sim = Simulation::new(config, contacts)?;
    sim.run()?;
    Ok(sim)
}

/// Run a seeded random scenario with synthetic contacts and traffic
pub fn run_random_scenario(nodes: u32, end_time: f64, seed: u64) -> SimResult<Simulation> {
    info!(nodes, end_time, seed, "=== Running random scenario ===");

    let settings = SimSettings {
        seed,
        message_generation: Some(MessageGeneration {
            interval: 60.0,
            size_min: 10_000,
            size_max: 100_000,
            ..Default::default()
        }),
        contact_generation: ContactGeneration {
            meetings: nodes * 20,
            ..Default::default()
        },
        msg_ttl: Some(end_time / 2.0),
        ..SimSettings::scripted(nodes, end_time)
    };
    let config = RunConfig::new(DrincSettings::new(30, 6), settings);

    let mut sim = Simulation::with_generated_contacts(config)?;
    sim.run()?;
    Ok(sim)
}
