//! # botflow - Automation Graph Compiler
//!
//! **botflow** compiles the node-and-edge automation graphs built in a chatbot editor
//! into a single script for an external bot-execution runtime. Steps (send a message,
//! branch on a condition, call a remote service, query an assistant) are nested into
//! control structures through explicit scopes, and the compiler walks that containment
//! tree to produce deterministic output.
//!
//! ## Core Workflow
//!
//! 1.  **Edit**: Mutate a [`GraphStore`](graph::GraphStore). Every structural change is
//!     checked and applied atomically; snapshots are immutable.
//! 2.  **Persist**: Save the graph as a [`GraphDocument`](graph::GraphDocument) (four plain
//!     data arrays) and rehydrate it later against a [`NodeRegistry`](compiler::NodeRegistry).
//! 3.  **Compile**: Validate and generate the script with a [`Compiler`](compiler::Compiler).
//!     The script is wrapped in a fixed preamble/postamble that matches the runtime ABI.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use botflow::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut store = GraphStore::new();
//!
//!     let check = store.add_node(
//!         kinds::CONDITIONAL,
//!         NodePayload::new("Is VIP?").with_config(json!({
//!             "comparisons": [{
//!                 "left": { "type": "variable", "value": "contactName" },
//!                 "operator": "equals",
//!                 "right": { "type": "text", "value": "Ada" }
//!             }]
//!         })),
//!         None,
//!     )?;
//!     store.add_step(&ActionStep::send_text("Welcome back, {{contactName}}!"), Some(Scope::if_branch(&check)))?;
//!     store.add_step(&ActionStep::send_text("Hello!"), Some(Scope::else_branch(&check)))?;
//!
//!     let compiled = store.compiler().build().compile()?;
//!     println!("{}", compiled.script);
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod compiler;
pub mod error;
pub mod graph;
pub mod prelude;
pub mod steps;
