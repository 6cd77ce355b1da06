use ferrous_tap_application::ports::DnsMessageParser;
use ferrous_tap_domain::{DecodedMessage, FieldValue};
use std::fmt::{self, Write};

/// Renders a decoded record as text, expanding DNS wire fields into their
/// parsed summary where the bytes parse.
pub fn render_message(message: &DecodedMessage, parser: &dyn DnsMessageParser) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_message(&mut out, message, parser);
    out
}

fn write_message(
    out: &mut String,
    message: &DecodedMessage,
    parser: &dyn DnsMessageParser,
) -> fmt::Result {
    write!(out, "<{}", message.schema_name())?;
    for name in message.field_names() {
        for value in message.values(name) {
            write!(out, " {}=", name)?;
            write_value(out, value, parser)?;
        }
    }
    for unknown in message.unknown_fields() {
        write!(out, " ({})={}", unknown.id, unknown.raw)?;
    }
    out.write_str(" |>")
}

fn write_value(
    out: &mut String,
    value: &FieldValue,
    parser: &dyn DnsMessageParser,
) -> fmt::Result {
    match value {
        FieldValue::Message(inner) => write_message(out, inner, parser),
        FieldValue::DnsWire(wire) => match parser.parse(wire) {
            Ok(summary) => write!(out, "{}", summary),
            Err(_) => write!(out, "{}", value),
        },
        other => write!(out, "{}", other),
    }
}
