//! Common test utilities for building automation graphs.
use botflow::prelude::*;

/// Routes library logs to the test harness output. Safe to call from every test.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A store whose ids are reproducible across runs.
#[allow(dead_code)]
pub fn seeded_store() -> GraphStore {
    GraphStore::new().with_id_generator(IdGenerator::seeded(7))
}

/// Config of a conditional testing `variable == 'value'`.
#[allow(dead_code)]
pub fn equals_config(variable: &str, value: &str) -> serde_json::Value {
    json!({
        "comparisons": [{
            "left": { "type": "variable", "value": variable },
            "operator": "equals",
            "right": { "type": "text", "value": value }
        }]
    })
}

/// An action payload that emits `code` verbatim.
#[allow(dead_code)]
pub fn action(label: &str, code: &str) -> NodePayload {
    NodePayload::new(label).with_code(code)
}

#[allow(dead_code)]
pub fn add_conditional(
    store: &mut GraphStore,
    variable: &str,
    value: &str,
    scope: Option<Scope>,
) -> NodeId {
    store
        .add_node(
            kinds::CONDITIONAL,
            NodePayload::new(format!("{} is {}", variable, value))
                .with_config(equals_config(variable, value)),
            scope,
        )
        .expect("Failed to add conditional")
}

#[allow(dead_code)]
pub fn add_switch(store: &mut GraphStore, variable: &str) -> NodeId {
    store
        .add_node(
            kinds::SWITCH,
            NodePayload::new("Menu").with_config(json!({
                "variable": { "type": "variable", "value": variable }
            })),
            None,
        )
        .expect("Failed to add switch")
}

#[allow(dead_code)]
pub fn add_case(store: &mut GraphStore, switch: &str, value: &str) -> NodeId {
    store
        .add_node(
            kinds::CASE,
            NodePayload::new(format!("Case {}", value)).with_config(json!({ "value": value })),
            Some(Scope::case(switch, value)),
        )
        .expect("Failed to add case")
}

/// A graph using every built-in kind, edges, a variable and an assistant.
///
/// Layout:
/// - conditional `plan == 'gold'`
///   - if: query assistant `support` into `summary`
///   - else: group with a text message
/// - switch on `choice` with cases `1`, `2` and a default message
#[allow(dead_code)]
pub fn create_support_flow() -> GraphStore {
    let mut store = seeded_store();
    store
        .register_assistant("support", "gpt-4o", "friendly")
        .expect("Failed to register assistant");

    let check = add_conditional(&mut store, "contactName", "Ada", None);
    store
        .add_step(
            &ActionStep::QueryAssistant {
                assistant: "support".to_string(),
                prompt: "Greet {{contactName}}".to_string(),
                output: OutputBinding::new("summary", "Summary"),
            },
            Some(Scope::if_branch(&check)),
        )
        .expect("Failed to add query step");
    let group = store
        .add_node(kinds::GROUP, NodePayload::new("Fallback"), None)
        .expect("Failed to add group");
    store
        .connect(&check, &group, EdgeSlot::Secondary)
        .expect("Failed to connect group");
    store
        .add_step(&ActionStep::send_text("Hello!"), Some(Scope::body(&group)))
        .expect("Failed to add text step");

    let menu = add_switch(&mut store, "choice");
    let first = add_case(&mut store, &menu, "1");
    let second = add_case(&mut store, &menu, "2");
    store
        .add_step(&ActionStep::send_text("You picked one"), Some(Scope::body(&first)))
        .expect("Failed to add case step");
    store
        .add_step(&ActionStep::send_text("You picked two"), Some(Scope::body(&second)))
        .expect("Failed to add case step");
    store
        .add_step(
            &ActionStep::send_text("Sorry, {{summary}}"),
            Some(Scope::default_branch(&menu)),
        )
        .expect("Failed to add default step");
    store
        .move_node(&check, Position::new(120.0, 40.5))
        .expect("Failed to move node");
    store
}
