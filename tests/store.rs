//! Tests for graph mutations and the invariants the store maintains.
mod common;
use ahash::AHashSet;
use common::*;
use botflow::prelude::*;

#[test]
fn test_generated_ids_are_unique() {
    let mut store = seeded_store();
    let ids: Vec<NodeId> = (0..200)
        .map(|i| {
            store
                .add_node(kinds::ACTION, action("step", &format!("s{}();\n", i)), None)
                .unwrap()
        })
        .collect();

    let unique: AHashSet<&NodeId> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
    assert!(ids.iter().all(|id| id.starts_with("node_")));
}

#[test]
fn test_seeded_stores_generate_identical_ids() {
    let mut first = seeded_store();
    let mut second = seeded_store();

    let a = first.add_node(kinds::GROUP, NodePayload::new("g"), None).unwrap();
    let b = second.add_node(kinds::GROUP, NodePayload::new("g"), None).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_add_node_rejects_missing_scope_owner() {
    let mut store = seeded_store();
    let before = store.snapshot();

    let result = store.add_node(
        kinds::ACTION,
        action("orphan", "x();\n"),
        Some(Scope::body("node_missing")),
    );
    assert_eq!(
        result,
        Err(StructuralError::ScopeNotFound("node_missing".to_string()))
    );
    assert_eq!(store.snapshot(), before);
}

#[test]
fn test_add_node_rejects_undeclared_slot() {
    let mut store = seeded_store();
    let leaf = store
        .add_node(kinds::ACTION, action("leaf", "x();\n"), None)
        .unwrap();
    let group = store.add_node(kinds::GROUP, NodePayload::new("g"), None).unwrap();

    let under_action = store.add_node(
        kinds::ACTION,
        action("inner", "y();\n"),
        Some(Scope::if_branch(&leaf)),
    );
    assert_eq!(
        under_action,
        Err(StructuralError::UndeclaredSlot {
            owner: leaf,
            kind: kinds::ACTION.to_string(),
            slot: "if".to_string(),
        })
    );

    let group_else = store.add_node(
        kinds::ACTION,
        action("inner", "y();\n"),
        Some(Scope::else_branch(&group)),
    );
    assert!(matches!(
        group_else,
        Err(StructuralError::UndeclaredSlot { .. })
    ));
    assert_eq!(store.graph().nodes().len(), 2);
}

#[test]
fn test_case_placement_rules() {
    let mut store = seeded_store();
    let menu = add_switch(&mut store, "choice");
    add_case(&mut store, &menu, "a");

    let duplicate = store.add_node(
        kinds::CASE,
        NodePayload::new("again").with_config(json!({ "value": "a" })),
        Some(Scope::case(&menu, "a")),
    );
    assert_eq!(
        duplicate,
        Err(StructuralError::DuplicateCase {
            switch_id: menu.clone(),
            value: "a".to_string(),
        })
    );

    let top_level = store.add_node(
        kinds::CASE,
        NodePayload::new("loose").with_config(json!({ "value": "b" })),
        None,
    );
    assert!(matches!(top_level, Err(StructuralError::InvalidCaseScope(_))));

    let mismatched = store.add_node(
        kinds::CASE,
        NodePayload::new("wrong").with_config(json!({ "value": "b" })),
        Some(Scope::case(&menu, "c")),
    );
    assert!(matches!(mismatched, Err(StructuralError::InvalidCaseScope(_))));

    let action_in_case = store.add_node(
        kinds::ACTION,
        action("direct", "x();\n"),
        Some(Scope::case(&menu, "b")),
    );
    assert!(matches!(
        action_in_case,
        Err(StructuralError::InvalidCaseScope(_))
    ));

    assert_eq!(store.graph().nodes().len(), 2);
}

#[test]
fn test_connect_routes_target_into_slot() {
    let mut store = seeded_store();
    let check = add_conditional(&mut store, "plan", "gold", None);
    let yes = store.add_node(kinds::ACTION, action("yes", "A();\n"), None).unwrap();
    let no = store.add_node(kinds::ACTION, action("no", "B();\n"), None).unwrap();

    store.connect(&check, &yes, EdgeSlot::Primary).unwrap();
    store.connect(&check, &no, EdgeSlot::Secondary).unwrap();

    let graph = store.graph();
    assert_eq!(graph.node(&yes).unwrap().scope, Some(Scope::if_branch(&check)));
    assert_eq!(graph.node(&no).unwrap().scope, Some(Scope::else_branch(&check)));
    assert_eq!(graph.edges().len(), 2);
}

#[test]
fn test_connect_primary_from_action_makes_sibling() {
    let mut store = seeded_store();
    let group = store.add_node(kinds::GROUP, NodePayload::new("g"), None).unwrap();
    let first = store
        .add_node(kinds::ACTION, action("first", "A();\n"), Some(Scope::body(&group)))
        .unwrap();
    let second = store.add_node(kinds::ACTION, action("second", "B();\n"), None).unwrap();

    store.connect(&first, &second, EdgeSlot::Primary).unwrap();
    assert_eq!(
        store.graph().node(&second).unwrap().scope,
        Some(Scope::body(&group))
    );

    let compiled = store.compiler().build().compile().unwrap();
    assert_eq!(compiled.body(), "A();\nB();\n");
}

#[test]
fn test_connect_replaces_other_incoming_edges() {
    let mut store = seeded_store();
    let group = store.add_node(kinds::GROUP, NodePayload::new("g"), None).unwrap();
    let source = store.add_node(kinds::ACTION, action("src", "A();\n"), None).unwrap();
    let target = store.add_node(kinds::ACTION, action("dst", "B();\n"), None).unwrap();

    store.connect(&group, &target, EdgeSlot::Primary).unwrap();
    let edge = store.connect(&source, &target, EdgeSlot::Primary).unwrap();

    let graph = store.graph();
    assert_eq!(graph.edges().len(), 1);
    assert_eq!(graph.edges()[0].id, edge);
    assert_eq!(graph.node(&target).unwrap().scope, None);
}

#[test]
fn test_connect_rejects_invalid_handles() {
    let mut store = seeded_store();
    let menu = add_switch(&mut store, "choice");
    let leaf = store.add_node(kinds::ACTION, action("leaf", "x();\n"), None).unwrap();
    let before = store.snapshot();

    let result = store.connect(&menu, &leaf, EdgeSlot::Primary);
    assert_eq!(
        result,
        Err(StructuralError::InvalidEdgeSlot {
            kind: kinds::SWITCH.to_string(),
            slot: "a".to_string(),
        })
    );
    assert_eq!(store.snapshot(), before);

    store.connect(&menu, &leaf, EdgeSlot::Default).unwrap();
    assert_eq!(
        store.graph().node(&leaf).unwrap().scope,
        Some(Scope::default_branch(&menu))
    );
}

#[test]
fn test_connect_rejects_cycles() {
    let mut store = seeded_store();
    let outer = store.add_node(kinds::GROUP, NodePayload::new("outer"), None).unwrap();
    let inner = store
        .add_node(kinds::GROUP, NodePayload::new("inner"), Some(Scope::body(&outer)))
        .unwrap();
    let before = store.snapshot();

    let result = store.connect(&inner, &outer, EdgeSlot::Primary);
    assert_eq!(
        result,
        Err(StructuralError::CyclicContainment {
            node_id: outer.clone(),
            owner: inner.clone(),
        })
    );

    let into_self = store.connect(&outer, &outer, EdgeSlot::Primary);
    assert!(matches!(
        into_self,
        Err(StructuralError::CyclicContainment { .. })
    ));
    assert_eq!(store.snapshot(), before);
}

#[test]
fn test_reconnect_keeps_edge_and_scope_in_sync() {
    let mut store = seeded_store();
    let check = add_conditional(&mut store, "plan", "gold", None);
    let leaf = store.add_node(kinds::ACTION, action("leaf", "A();\n"), None).unwrap();
    let edge = store.connect(&check, &leaf, EdgeSlot::Primary).unwrap();

    store
        .reconnect(&edge, &check, &leaf, EdgeSlot::Secondary)
        .unwrap();

    let graph = store.graph();
    assert_eq!(graph.edges().len(), 1);
    let moved = graph.edge(&edge).unwrap();
    assert_eq!(moved.source_slot, EdgeSlot::Secondary);
    assert_eq!(graph.node(&leaf).unwrap().scope, Some(Scope::else_branch(&check)));

    let compiled = store.compiler().build().compile().unwrap();
    assert_eq!(
        compiled.body(),
        "if (plan == 'gold') {\n} else {\nA();\n}\n"
    );
}

#[test]
fn test_reconnect_to_new_target_releases_previous_target() {
    let mut store = seeded_store();
    let check = add_conditional(&mut store, "plan", "gold", None);
    let first = store.add_node(kinds::ACTION, action("t1", "T1();\n"), None).unwrap();
    let second = store.add_node(kinds::ACTION, action("t2", "T2();\n"), None).unwrap();
    let edge = store.connect(&check, &first, EdgeSlot::Primary).unwrap();

    store
        .reconnect(&edge, &check, &second, EdgeSlot::Primary)
        .unwrap();

    let graph = store.graph();
    assert_eq!(graph.edges().len(), 1);
    assert_eq!(graph.edge(&edge).unwrap().target_node_id, second);
    assert_eq!(graph.node(&first).unwrap().scope, None);
    assert_eq!(graph.node(&second).unwrap().scope, Some(Scope::if_branch(&check)));

    let compiled = store.compiler().build().compile().unwrap();
    assert_eq!(
        compiled.body(),
        "if (plan == 'gold') {\nT2();\n} else {\n}\nT1();\n"
    );
}

#[test]
fn test_reconnect_keeps_case_target_when_it_cannot_leave_the_switch() {
    let mut store = seeded_store();
    let menu = add_switch(&mut store, "choice");
    let vip = add_case(&mut store, &menu, "vip");
    let edge = store
        .connect(&menu, &vip, EdgeSlot::Case("vip".to_string()))
        .unwrap();
    let leaf = store.add_node(kinds::ACTION, action("leaf", "A();\n"), None).unwrap();
    let before = store.snapshot();

    let result = store.reconnect(&edge, &menu, &leaf, EdgeSlot::Default);
    assert!(matches!(result, Err(StructuralError::InvalidCaseScope(_))));
    assert_eq!(store.snapshot(), before);
}

#[test]
fn test_fixed_handle_names_win_over_case_values() {
    let mut store = seeded_store();
    let menu = add_switch(&mut store, "choice");
    let named_default = add_case(&mut store, &menu, "default");
    let leaf = store.add_node(kinds::ACTION, action("leaf", "D();\n"), None).unwrap();

    store
        .connect(&menu, &leaf, EdgeSlot::from("default".to_string()))
        .unwrap();
    assert_eq!(
        store.graph().node(&leaf).unwrap().scope,
        Some(Scope::default_branch(&menu))
    );
    assert_eq!(
        store.graph().node(&named_default).unwrap().scope,
        Some(Scope::case(&menu, "default"))
    );

    let compiled = store.compiler().build().compile().unwrap();
    assert_eq!(
        compiled.body(),
        "switch (choice) {\ncase 'default':\nbreak;\ndefault:\nD();\nbreak;\n}\n"
    );
}

#[test]
fn test_reconnect_unknown_edge_fails() {
    let mut store = seeded_store();
    let leaf = store.add_node(kinds::ACTION, action("leaf", "A();\n"), None).unwrap();

    let result = store.reconnect("edge_missing", &leaf, &leaf, EdgeSlot::Primary);
    assert_eq!(
        result,
        Err(StructuralError::EdgeNotFound("edge_missing".to_string()))
    );
}

#[test]
fn test_disconnect_moves_target_to_root() {
    let mut store = seeded_store();
    let group = store.add_node(kinds::GROUP, NodePayload::new("g"), None).unwrap();
    let leaf = store.add_node(kinds::ACTION, action("leaf", "A();\n"), None).unwrap();
    let edge = store.connect(&group, &leaf, EdgeSlot::Primary).unwrap();

    store.disconnect(&edge).unwrap();

    let graph = store.graph();
    assert!(graph.edges().is_empty());
    assert_eq!(graph.node(&leaf).unwrap().scope, None);
}

#[test]
fn test_remove_node_cascades() {
    let mut store = seeded_store();
    let check = add_conditional(&mut store, "plan", "gold", None);
    let group = store
        .add_node(kinds::GROUP, NodePayload::new("g"), Some(Scope::else_branch(&check)))
        .unwrap();
    store
        .add_step(
            &ActionStep::SetVariable {
                output: OutputBinding::new("total", "Total"),
                value: Operand::Number(3.0),
            },
            Some(Scope::body(&group)),
        )
        .unwrap();
    let survivor = store.add_node(kinds::ACTION, action("keep", "K();\n"), None).unwrap();
    let loose = store.add_node(kinds::ACTION, action("loose", "L();\n"), None).unwrap();
    store.connect(&check, &loose, EdgeSlot::Primary).unwrap();
    assert_eq!(store.graph().variables().len(), 1);

    store.remove_node(&check).unwrap();

    let graph = store.graph();
    let remaining: Vec<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(remaining, vec![survivor.as_str()]);
    assert!(graph.edges().is_empty());
    assert!(graph.variables().is_empty());
}

#[test]
fn test_remove_missing_node_fails() {
    let mut store = seeded_store();
    assert_eq!(
        store.remove_node("node_missing"),
        Err(StructuralError::NodeNotFound("node_missing".to_string()))
    );
}

#[test]
fn test_remove_case_drops_its_slot() {
    let mut store = seeded_store();
    let menu = add_switch(&mut store, "choice");
    let a = add_case(&mut store, &menu, "a");
    add_case(&mut store, &menu, "b");

    store.remove_node(&a).unwrap();
    let containment = store.graph().containment();
    assert_eq!(
        containment.case_slots(&menu),
        vec![Slot::Case("b".to_string())]
    );

    // The freed value can be attached again.
    add_case(&mut store, &menu, "a");
}

#[test]
fn test_move_node_only_changes_position() {
    let mut store = seeded_store();
    let group = store.add_node(kinds::GROUP, NodePayload::new("g"), None).unwrap();
    let leaf = store
        .add_node(kinds::ACTION, action("leaf", "A();\n"), Some(Scope::body(&group)))
        .unwrap();
    let before = store.graph().node(&leaf).unwrap().clone();

    store.move_node(&leaf, Position::new(300.0, -20.0)).unwrap();

    let after = store.graph().node(&leaf).unwrap();
    assert_eq!(after.position, Position::new(300.0, -20.0));
    assert_eq!(after.scope, before.scope);
    assert_eq!(after.sequence, before.sequence);
}

#[test]
fn test_variable_names_are_unique() {
    let mut store = seeded_store();
    let step = ActionStep::SetVariable {
        output: OutputBinding::new("total", "Total"),
        value: Operand::Number(1.0),
    };
    store.add_step(&step, None).unwrap();
    let before = store.snapshot();

    let result = store.add_step(&step, None);
    assert_eq!(
        result,
        Err(GraphError::Naming(NamingConflict::Variable("total".to_string())))
    );
    assert_eq!(store.snapshot(), before);
    assert_eq!(store.graph().nodes().len(), 1);
}

#[test]
fn test_register_variable_checks_names() {
    let mut store = seeded_store();
    let leaf = store.add_node(kinds::ACTION, action("leaf", "x = 1;\n"), None).unwrap();

    assert_eq!(
        store.register_variable("contactId", "Contact", &leaf),
        Err(GraphError::Naming(NamingConflict::ReservedName(
            "contactId".to_string()
        )))
    );
    assert_eq!(
        store.register_variable("my total", "Total", &leaf),
        Err(GraphError::Naming(NamingConflict::InvalidIdentifier(
            "my total".to_string()
        )))
    );
    assert_eq!(
        store.register_variable("total", "Total", "node_missing"),
        Err(GraphError::Structural(StructuralError::NodeNotFound(
            "node_missing".to_string()
        )))
    );

    store.register_variable("total", "Total", &leaf).unwrap();
    let variables = store.graph().variables();
    assert_eq!(variables.lookup("total").unwrap().producing_node_id, leaf);
    assert_eq!(variables.produced_by(&leaf).count(), 1);
}

#[test]
fn test_assistant_names_are_unique() {
    let mut store = seeded_store();
    store.register_assistant("support", "gpt-4o", "friendly").unwrap();

    let result = store.register_assistant("support", "gpt-4o-mini", "terse");
    assert_eq!(
        result,
        Err(NamingConflict::Assistant("support".to_string()))
    );
    assert_eq!(store.graph().assistants().len(), 1);
}

#[test]
fn test_add_step_rejects_unknown_placeholder() {
    let mut store = seeded_store();
    let before = store.snapshot();

    let result = store.add_step(&ActionStep::send_text("Hi {{nickname}}"), None);
    assert_eq!(
        result,
        Err(GraphError::Configuration(ConfigurationError::UnknownVariable(
            "nickname".to_string()
        )))
    );
    assert_eq!(store.snapshot(), before);
}

#[test]
fn test_add_step_rejects_unknown_assistant() {
    let mut store = seeded_store();
    let result = store.add_step(
        &ActionStep::QueryAssistant {
            assistant: "ghost".to_string(),
            prompt: "Hello".to_string(),
            output: OutputBinding::new("reply", "Reply"),
        },
        None,
    );
    assert_eq!(
        result,
        Err(GraphError::Configuration(ConfigurationError::UnknownAssistant(
            "ghost".to_string()
        )))
    );
    assert!(store.graph().is_empty());
    assert!(store.graph().variables().is_empty());
}

#[test]
fn test_snapshots_are_isolated_from_later_mutations() {
    let mut store = seeded_store();
    store.add_node(kinds::ACTION, action("one", "A();\n"), None).unwrap();
    let snapshot = store.snapshot();

    store.add_node(kinds::ACTION, action("two", "B();\n"), None).unwrap();

    assert_eq!(snapshot.nodes().len(), 1);
    assert_eq!(store.graph().nodes().len(), 2);
}
