//! End-to-end simulation runs

use std::fs;

use ferry_dtn::DrincSettings;
use ferry_simulation::{
    HostId, MessageEvent, QueueMode, RunConfig, SimSettings, Simulation, load_contacts,
    parse_contacts, scenarios,
};

const RUN_DOCUMENT: &str = r#"
[DRINC]
secondsInTimeUnit = 30
nrofCopies = 3

[simulation]
nodes = 4
end_time = 400.0
queue_mode = "random"

[[simulation.messages]]
time = 0.0
from = 0
to = 3
size = 50000

[logging]
default_level = "warn"
"#;

const TRACE: &str = "\
# n0 meets n1 and n2, both of which later meet n3
10 CONN n0 n1 up
20 CONN n0 n1 down
30 CONN n0 n2 up
40 CONN n0 n2 down
100 CONN n1 n3 up
120 CONN n1 n3 down
";

fn message(time: f64, from: u32, to: u32, size: u64) -> MessageEvent {
    MessageEvent {
        time,
        from: HostId(from),
        to: HostId(to),
        size,
    }
}

#[test]
fn test_run_from_document_and_trace() {
    let config = RunConfig::from_toml_str(RUN_DOCUMENT).unwrap();
    let contacts = parse_contacts(TRACE).unwrap();

    let mut sim = Simulation::new(config, contacts).unwrap();
    let stats = sim.run().unwrap().clone();

    assert_eq!(stats.created, 1);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.avg_hops(), Some(2.0));
    assert_eq!(stats.contacts, 3);
    // Sprayed to n1 and n2, then n1 delivered
    assert_eq!(stats.relayed, 3);
    assert_eq!(stats.overhead_ratio(), Some(2.0));
    assert!(sim.node(HostId(3)).unwrap().has_message(&ferry_core::MessageId(0)));
}

#[test]
fn test_run_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let settings_path = dir.path().join("run.toml");
    let trace_path = dir.path().join("contacts.txt");
    fs::write(&settings_path, RUN_DOCUMENT).unwrap();
    fs::write(&trace_path, TRACE).unwrap();

    let config = RunConfig::load(&settings_path).unwrap();
    let contacts = load_contacts(&trace_path).unwrap();
    assert_eq!(config.simulation.queue_mode, QueueMode::Random);
    assert_eq!(contacts.len(), 6);

    let mut sim = Simulation::new(config, contacts).unwrap();
    assert_eq!(sim.run().unwrap().delivered, 1);
}

#[test]
fn test_same_seed_same_result() {
    let first = scenarios::run_random_scenario(10, 7_200.0, 11).unwrap();
    let second = scenarios::run_random_scenario(10, 7_200.0, 11).unwrap();

    assert_eq!(first.stats(), second.stats());
    assert_ne!(first.run_id(), second.run_id());
    for id in HostId::range(10) {
        assert_eq!(first.routing_info(id), second.routing_info(id));
    }
}

#[test]
fn test_full_buffer_evicts_oldest() {
    let mut settings = SimSettings::scripted(2, 30.0);
    settings.buffer_size = 2_500;
    settings.messages = vec![
        message(0.0, 0, 1, 1_000),
        message(1.0, 0, 1, 1_000),
        message(2.0, 0, 1, 1_000),
    ];
    let config = RunConfig::new(DrincSettings::new(30, 2), settings);
    let contacts = parse_contacts("10 CONN n0 n1 up\n").unwrap();

    let mut sim = Simulation::new(config, contacts).unwrap();
    sim.run().unwrap();

    let stats = sim.stats();
    assert_eq!(stats.created, 3);
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.delivered, 2);
    let receiver = sim.node(HostId(1)).unwrap();
    assert!(!receiver.has_message(&ferry_core::MessageId(0)));
    assert!(receiver.has_message(&ferry_core::MessageId(2)));
}

#[test]
fn test_expired_message_never_delivered() {
    let mut settings = SimSettings::scripted(2, 30.0);
    settings.msg_ttl = Some(5.0);
    settings.messages = vec![message(0.0, 0, 1, 1_000)];
    let config = RunConfig::new(DrincSettings::new(30, 2), settings);
    let contacts = parse_contacts("10 CONN n0 n1 up\n").unwrap();

    let mut sim = Simulation::new(config, contacts).unwrap();
    sim.run().unwrap();

    assert_eq!(sim.stats().expired, 1);
    assert_eq!(sim.stats().delivered, 0);
    assert!(sim.node(HostId(0)).unwrap().buffer.is_empty());
    assert_eq!(sim.node(HostId(0)).unwrap().router.copies().tracked(), 0);
}

#[test]
fn test_routing_info_after_run() {
    let sim = scenarios::run_relay_chain_scenario().unwrap();
    let info = sim.routing_info(HostId(1)).unwrap();

    assert_eq!(info.text, "2 delivery prediction(s)");
    assert_eq!(info.children.len(), 2);
    assert!(sim.routing_info(HostId(9)).is_none());
}

#[test]
fn test_example_configs_run() {
    let config = RunConfig::from_toml_str(include_str!("../configs/example_run.toml")).unwrap();
    let contacts = parse_contacts(include_str!("../configs/example_contacts.txt")).unwrap();
    assert!(config.logging.console.pretty);
    assert_eq!(contacts.len(), 14);

    let mut sim = Simulation::new(config, contacts).unwrap();
    let stats = sim.run().unwrap();
    assert!(stats.created > 1);
    assert!(stats.delivered <= stats.created);
    assert_eq!(stats.contacts, 7);
}

#[test]
fn test_links_still_up_after_run() {
    let config = RunConfig::new(DrincSettings::new(30, 2), SimSettings::scripted(3, 30.0));
    let contacts = parse_contacts("5 CONN n0 n1 up\n8 CONN n2 n1 up\n12 CONN n1 n2 down\n").unwrap();

    let mut sim = Simulation::new(config, contacts).unwrap();
    sim.run().unwrap();

    assert_eq!(sim.links().link_count(), 1);
    assert_eq!(sim.links().visualize(), "n0 <-> n1");
}
