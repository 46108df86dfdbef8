//! Message template rendering
//!
//! Substitutes `{placeholder}` markers with per-recipient field values.
//! Unresolved placeholders are left verbatim; a recipient missing a field
//! is not an error, the marker just survives into the message.

use crate::types::{MessageTemplate, Recipient};
use std::collections::HashMap;

/// Render a template for one recipient
///
/// Attachment URLs are appended to the body as a trailing block before
/// substitution, so attachment lines may themselves carry placeholders.
pub fn render(template: &MessageTemplate, recipient: &Recipient) -> String {
    let body = if template.attachments.is_empty() {
        template.body.clone()
    } else {
        format!(
            "{}\n\nAttachments:\n{}",
            template.body,
            template.attachments.join("\n")
        )
    };
    substitute(&body, &recipient.fields)
}

/// Replace every `{name}` whose name is a known field; leave the rest alone
fn substitute(text: &str, fields: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        match after_open.find('}') {
            Some(close) => {
                let key = &after_open[..close];
                match fields.get(key) {
                    Some(value) => out.push_str(value),
                    // Unknown placeholder: keep it verbatim
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after_open[close + 1..];
            }
            // Unclosed brace: no placeholder, copy the remainder as-is
            None => {
                out.push('{');
                rest = after_open;
            }
        }
    }
    out.push_str(rest);
    out
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn recipient() -> Recipient {
        Recipient::new("+584141234567")
            .with_field("nombre", "Ana")
            .with_field("ticket", "00042")
            .with_field("cedula", "V-12345678")
            .with_field("estado", "Miranda")
    }

    #[test]
    fn substitutes_all_known_fields() {
        let template = MessageTemplate::new(
            "Hola {nombre}, tu ticket #{ticket} ({cedula}, {estado}) fue confirmado.",
        );
        let message = render(&template, &recipient());
        assert_eq!(
            message,
            "Hola Ana, tu ticket #00042 (V-12345678, Miranda) fue confirmado."
        );
    }

    #[test]
    fn unresolved_placeholder_left_verbatim() {
        let template = MessageTemplate::new("Hola {nombre}, codigo {codigo}");
        let message = render(&template, &recipient());
        assert_eq!(message, "Hola Ana, codigo {codigo}");
    }

    #[test]
    fn repeated_placeholder_replaced_everywhere() {
        let template = MessageTemplate::new("{nombre} {nombre} {nombre}");
        assert_eq!(render(&template, &recipient()), "Ana Ana Ana");
    }

    #[test]
    fn unclosed_brace_copied_through() {
        let template = MessageTemplate::new("hola {nombre");
        assert_eq!(render(&template, &recipient()), "hola {nombre");
    }

    #[test]
    fn empty_fields_leave_template_untouched_except_known() {
        let template = MessageTemplate::new("plain text, no markers");
        assert_eq!(render(&template, &recipient()), "plain text, no markers");
    }

    #[test]
    fn attachments_appended_before_substitution() {
        let mut template = MessageTemplate::new("Hola {nombre}");
        template.attachments = vec![
            "https://example.com/a.pdf".to_string(),
            "https://example.com/{ticket}.png".to_string(),
        ];
        let message = render(&template, &recipient());
        assert_eq!(
            message,
            "Hola Ana\n\nAttachments:\nhttps://example.com/a.pdf\nhttps://example.com/00042.png"
        );
    }
}
