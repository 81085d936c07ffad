use pn_project::schema::*;
use pn_project::{
    ProjectError, StateFile, build_network, load_json, load_state, load_yaml, save_json,
    save_state, save_yaml, validate_topology_def,
};
use pn_sim::NetworkView;

fn chain(name: &str) -> TopologyDef {
    TopologyDef {
        version: FORMAT_VERSION,
        name: name.to_string(),
        nodes: vec![
            NodeDef {
                name: "BAT".to_string(),
                kind: NodeKindDef::Source { nominal_level: 28.0 },
                upstream: vec![],
                initial: None,
            },
            NodeDef {
                name: "CB".to_string(),
                kind: NodeKindDef::Breaker {
                    capacity: Some(15.0),
                },
                upstream: vec!["BAT".to_string()],
                initial: Some(InitialDef {
                    commanded_open: Some(true),
                    ..InitialDef::default()
                }),
            },
            NodeDef {
                name: "BUS".to_string(),
                kind: NodeKindDef::Bus,
                upstream: vec!["CB".to_string()],
                initial: None,
            },
            NodeDef {
                name: "LOAD".to_string(),
                kind: NodeKindDef::Load { demand: 2.0 },
                upstream: vec!["BUS".to_string()],
                initial: None,
            },
        ],
        selectors: vec![],
        faults: vec![FaultDef {
            tick: 10,
            node: "BAT".to_string(),
            action: pn_sim::FaultAction::Deplete,
        }],
    }
}

#[test]
fn roundtrip_yaml_chain() {
    let def = chain("Chain");
    validate_topology_def(&def).unwrap();

    let path = std::env::temp_dir().join("pn_project_roundtrip_chain.yaml");
    save_yaml(&path, &def).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(def, loaded);
}

#[test]
fn roundtrip_json_chain() {
    let def = chain("Chain");

    let path = std::env::temp_dir().join("pn_project_roundtrip_chain.json");
    save_json(&path, &def).unwrap();
    let loaded = load_json(&path).unwrap();

    assert_eq!(def, loaded);
}

#[test]
fn invalid_def_is_not_saved() {
    let mut def = chain("Broken");
    def.nodes[3].upstream = vec!["MISSING".to_string()];

    let path = std::env::temp_dir().join("pn_project_invalid_not_saved.yaml");
    let _ = std::fs::remove_file(&path);
    assert!(matches!(
        save_yaml(&path, &def).unwrap_err(),
        ProjectError::Validation(_)
    ));
    assert!(!path.exists());
}

#[test]
fn state_file_roundtrip() {
    let def = chain("Chain");
    let mut net = build_network(&def).unwrap();
    let cb = net.resolve("CB").unwrap();
    net.set_commanded_open(cb, false).unwrap();
    net.step();
    assert!(net.query_named("LOAD").unwrap().available);

    let state = StateFile::capture(&def, &net);
    let path = std::env::temp_dir().join("pn_project_state_roundtrip.json");
    save_state(&path, &state).unwrap();
    let loaded = load_state(&path).unwrap();
    assert_eq!(loaded, state);

    // Scenario faults and display name are not part of the fingerprint.
    let mut renamed = chain("Renamed");
    renamed.faults.clear();
    let mut other = build_network(&renamed).unwrap();
    loaded.apply(&renamed, &mut other).unwrap();
    assert_eq!(other.tick(), 1);
    assert_eq!(other.query_named("LOAD").unwrap().level, 28.0);
}

#[test]
fn state_file_rejects_other_wiring() {
    let def = chain("Chain");
    let mut net = build_network(&def).unwrap();
    net.step();
    let state = StateFile::capture(&def, &net);

    let mut rewired = chain("Chain");
    rewired.nodes[1].kind = NodeKindDef::Breaker {
        capacity: Some(30.0),
    };
    let mut other = build_network(&rewired).unwrap();
    assert!(matches!(
        state.apply(&rewired, &mut other).unwrap_err(),
        ProjectError::FingerprintMismatch { .. }
    ));
    assert!(!other.is_evaluated());

    let mut old = state.clone();
    old.format_version = 99;
    assert!(matches!(
        old.check(&def).unwrap_err(),
        ProjectError::UnsupportedStateVersion { version: 99 }
    ));
}

#[test]
fn state_file_resumes_without_replaying_faults() {
    let def = chain("Chain");
    let mut net = build_network(&def).unwrap();
    let cb = net.resolve("CB").unwrap();
    let bat = net.resolve("BAT").unwrap();
    net.set_commanded_open(cb, false).unwrap();
    for _ in 0..12 {
        net.step();
    }
    assert!(!net.query_named("LOAD").unwrap().available);
    net.restore_source(bat).unwrap();
    net.step();
    let state = StateFile::capture(&def, &net);

    let mut resumed = build_network(&def).unwrap();
    state.apply(&def, &mut resumed).unwrap();
    assert!(resumed.schedule().is_empty());

    net.step();
    resumed.step();
    assert_eq!(
        resumed.query_named("LOAD").unwrap(),
        net.query_named("LOAD").unwrap()
    );
    assert!(resumed.query_named("LOAD").unwrap().available);
    assert!(resumed.states().same_outputs(net.states()));
}
