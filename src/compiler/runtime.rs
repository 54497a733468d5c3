//! The fixed contract between generated scripts and the bot-execution runtime.
//!
//! Everything here is byte-for-byte stable for a given [`RUNTIME_ABI_VERSION`].
//! Changing the parameter list, the preamble or the postamble is a breaking change
//! and must bump the version on both sides.

/// Version of the runtime ABI the generated scripts target.
pub const RUNTIME_ABI_VERSION: u32 = 1;

/// Capabilities the runtime passes to every script, in call order.
pub const RUNTIME_PARAMETERS: [&str; 7] = [
    "sendText",
    "sendMedia",
    "storage",
    "http",
    "findContact",
    "findConversation",
    "clock",
];

/// Opens the wrapped function, declares the shared working variables and derives
/// the ambient conversation, contact and sender identifiers.
pub const PREAMBLE: &str = "(async function (sendText, sendMedia, storage, http, findContact, findConversation, clock) {
let response = null;
let result = null;
const conversation = await findConversation();
const contact = await findContact(conversation.contactId);
const conversationId = conversation.id;
const contactId = contact.id;
const contactName = contact.name;
const senderId = conversation.senderId;
";

/// Closes the wrapped function and invokes it with the runtime capabilities.
pub const POSTAMBLE: &str =
    "})(sendText, sendMedia, storage, http, findContact, findConversation, clock);\n";

/// Values the preamble makes available to every step.
pub const AMBIENT_IDENTIFIERS: [&str; 5] = [
    "conversationId",
    "contactId",
    "contactName",
    "senderId",
    "result",
];

/// Identifiers a produced variable may never take.
const RESERVED_WORDS: &[&str] = &[
    "response",
    "conversation",
    "contact",
    "async",
    "await",
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "default",
    "delete",
    "do",
    "else",
    "false",
    "for",
    "function",
    "if",
    "in",
    "instanceof",
    "let",
    "new",
    "null",
    "return",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "undefined",
    "var",
    "void",
    "while",
];

pub fn is_ambient(name: &str) -> bool {
    AMBIENT_IDENTIFIERS.contains(&name)
}

pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(&name) || RUNTIME_PARAMETERS.contains(&name) || is_ambient(name)
}

/// Whether `name` can be emitted verbatim as a script identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Renders `text` as a single-quoted script string literal.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}
