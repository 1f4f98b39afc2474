//! Raw message bytes → decoded headers, plain-text body and attachments.

use mail_parser::{Address, HeaderValue, Message, MessageParser, MimeHeaders, PartType};
use tracing::warn;

use crate::model::attachment::AttachmentPart;
use crate::model::record::{reply_target_from_headers, MessageRecord};
use crate::source::RawMessage;

/// Everything the pipeline needs from one message.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub mailbox: String,
    pub sequence: u64,
    /// `<id>` form, empty if the message has no `Message-ID`.
    pub message_id: String,
    pub reply_target: Option<String>,
    /// Decoded subject (RFC 2047 encoded-words resolved).
    pub subject: String,
    pub from: String,
    pub to: String,
    /// Raw `Date:` header text.
    pub date: String,
    pub body: String,
    pub attachments: Vec<AttachmentPart>,
}

impl DecodedMessage {
    /// Split into the record handed to the thread engine and the attachment
    /// payloads still to be written.
    pub fn into_parts(self) -> (MessageRecord, Vec<AttachmentPart>) {
        let mut record = MessageRecord::new(
            self.mailbox,
            self.sequence,
            &self.message_id,
            &self.subject,
            self.reply_target.as_deref(),
        );
        record.from = self.from;
        record.to = self.to;
        record.date = self.date;
        record.body = self.body;
        (record, self.attachments)
    }
}

/// Decode a raw message.
///
/// Never fails: a blob `mail-parser` cannot read yields a record with no
/// headers and whatever follows the first blank line as body.
pub fn decode(raw: &RawMessage) -> DecodedMessage {
    let bytes = skip_from_line(&raw.data);
    match MessageParser::default().parse(bytes) {
        Some(msg) => from_parsed(&msg, raw),
        None => {
            warn!(
                mailbox = %raw.mailbox,
                sequence = raw.sequence,
                "Could not parse message, keeping raw body"
            );
            DecodedMessage {
                mailbox: raw.mailbox.clone(),
                sequence: raw.sequence,
                message_id: String::new(),
                reply_target: None,
                subject: String::new(),
                from: String::new(),
                to: String::new(),
                date: String::new(),
                body: extract_body_fallback(bytes),
                attachments: Vec::new(),
            }
        }
    }
}

fn from_parsed(msg: &Message<'_>, raw: &RawMessage) -> DecodedMessage {
    let message_id = msg
        .message_id()
        .map(bracketed)
        .unwrap_or_default();

    let in_reply_to = first_text(msg.in_reply_to()).map(|id| bracketed(&id));
    let references: Vec<String> = text_list(msg.references())
        .iter()
        .map(|id| bracketed(id))
        .collect();
    let reply_target = reply_target_from_headers(in_reply_to.as_deref(), &references);

    let body = plain_text_body(msg);

    DecodedMessage {
        mailbox: raw.mailbox.clone(),
        sequence: raw.sequence,
        message_id,
        reply_target,
        subject: msg.subject().unwrap_or_default().trim().to_string(),
        from: msg.from().map(render_addresses).unwrap_or_default(),
        to: msg.to().map(render_addresses).unwrap_or_default(),
        date: msg
            .header_raw("Date")
            .map(|d| d.trim().to_string())
            .unwrap_or_default(),
        body,
        attachments: collect_attachments(msg),
    }
}

/// Inline `text/plain` parts joined by newlines. HTML alternatives are not
/// converted: a message without a plain-text part has an empty body.
fn plain_text_body(msg: &Message<'_>) -> String {
    (0..)
        .map_while(|i| msg.text_part(i))
        .filter_map(|part| match &part.body {
            PartType::Text(text) => Some(text.as_ref()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Parts whose `Content-Disposition` is `attachment`. Inline parts such as
/// embedded images stay with the message.
fn collect_attachments(msg: &Message<'_>) -> Vec<AttachmentPart> {
    msg.attachments()
        .filter(|part| part.content_disposition().is_some_and(|cd| cd.is_attachment()))
        .enumerate()
        .map(|(idx, part)| {
            let filename = part
                .attachment_name()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("attachment_{idx}"));
            let content_type = part
                .content_type()
                .map(|ct: &mail_parser::ContentType| match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.ctype(), sub),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| "application/octet-stream".to_string());
            AttachmentPart {
                filename,
                content_type,
                data: part.contents().to_vec(),
            }
        })
        .collect()
}

/// `"Name <addr>, other@x"` rendering of an address header.
fn render_addresses(addr: &Address<'_>) -> String {
    addr.iter()
        .filter_map(|a| match (a.name(), a.address()) {
            (Some(name), Some(address)) if !name.trim().is_empty() => {
                Some(format!("{} <{}>", name.trim(), address))
            }
            (_, Some(address)) => Some(address.to_string()),
            (Some(name), None) => Some(name.trim().to_string()),
            (None, None) => None,
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn first_text(value: &HeaderValue<'_>) -> Option<String> {
    match value {
        HeaderValue::Text(s) => Some(s.to_string()),
        HeaderValue::TextList(list) => list.first().map(|s| s.to_string()),
        _ => None,
    }
}

fn text_list(value: &HeaderValue<'_>) -> Vec<String> {
    match value {
        HeaderValue::Text(s) => vec![s.to_string()],
        HeaderValue::TextList(list) => list.iter().map(|s| s.to_string()).collect(),
        _ => Vec::new(),
    }
}

/// `mail-parser` strips angle brackets from ids; put them back so exports
/// show ids the way they appear in headers.
fn bracketed(id: &str) -> String {
    let id = id.trim().trim_start_matches('<').trim_end_matches('>');
    if id.is_empty() {
        String::new()
    } else {
        format!("<{id}>")
    }
}

/// Skip the `From ` separator line at the start of MBOX messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Everything after the first blank line.
fn extract_body_fallback(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    let body = if let Some(pos) = text.find("\r\n\r\n") {
        &text[pos + 4..]
    } else if let Some(pos) = text.find("\n\n") {
        &text[pos + 2..]
    } else {
        ""
    };
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::MessageKind;

    fn raw(data: &str) -> RawMessage {
        RawMessage {
            mailbox: "INBOX".to_string(),
            sequence: 4,
            data: data.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_skip_from_line() {
        let data = b"From user@example.com Thu Jan 01 00:00:00 2024\nSubject: Test\n\nBody\n";
        assert!(skip_from_line(data).starts_with(b"Subject:"));
        let plain = b"Subject: Test\n\nBody\n";
        assert_eq!(skip_from_line(plain), plain);
    }

    #[test]
    fn test_bracketed() {
        assert_eq!(bracketed("a@x"), "<a@x>");
        assert_eq!(bracketed("<a@x>"), "<a@x>");
        assert_eq!(bracketed("  "), "");
    }

    #[test]
    fn test_decode_reply() {
        let msg = decode(&raw(
            "From a@x Thu Jan 01 00:00:00 2024\n\
             From: Alice Example <alice@example.com>\n\
             To: bob@example.com, Carol <carol@example.com>\n\
             Subject: Re: Project Update\n\
             Date: Wed, 01 Jan 2020 10:00:00 +0000\n\
             Message-ID: <m2@example.com>\n\
             In-Reply-To: <m1@example.com>\n\
             References: <m0@example.com> <m1@example.com>\n\
             \n\
             Sounds good.\n",
        ));
        assert_eq!(msg.message_id, "<m2@example.com>");
        assert_eq!(msg.reply_target.as_deref(), Some("<m1@example.com>"));
        assert_eq!(msg.subject, "Re: Project Update");
        assert_eq!(msg.from, "Alice Example <alice@example.com>");
        assert_eq!(msg.to, "bob@example.com, Carol <carol@example.com>");
        assert_eq!(msg.date, "Wed, 01 Jan 2020 10:00:00 +0000");
        assert_eq!(msg.body, "Sounds good.");

        let (record, attachments) = msg.into_parts();
        assert!(attachments.is_empty());
        assert_eq!(record.kind, MessageKind::Reply);
        assert_eq!(record.subject_normalized, "Project Update");
        assert_eq!(record.mailbox, "INBOX");
        assert_eq!(record.sequence, 4);
    }

    #[test]
    fn test_reply_target_falls_back_to_references() {
        let msg = decode(&raw(
            "Subject: Re: Topic\n\
             Message-ID: <m3@x>\n\
             References: <m1@x> <m2@x>\n\
             \n\
             body\n",
        ));
        assert_eq!(msg.reply_target.as_deref(), Some("<m2@x>"));
    }

    #[test]
    fn test_encoded_subject() {
        let msg = decode(&raw(
            "Subject: =?UTF-8?Q?Caf=C3=A9_con_le=C3=B1a?=\nMessage-ID: <e@x>\n\nhola\n",
        ));
        assert_eq!(msg.subject, "Café con leña");
    }

    #[test]
    fn test_missing_headers() {
        let msg = decode(&raw("Subject: Lonely\n\nNo ids here\n"));
        assert_eq!(msg.message_id, "");
        assert_eq!(msg.reply_target, None);
        assert_eq!(msg.date, "");
        let (record, _) = msg.into_parts();
        assert_eq!(record.key(), "__synth_INBOX_4__");
        assert_eq!(record.kind, MessageKind::New);
    }

    #[test]
    fn test_attachment_extracted() {
        let msg = decode(&raw(
            "From: a@x\n\
             Subject: Report\n\
             Message-ID: <att@x>\n\
             MIME-Version: 1.0\n\
             Content-Type: multipart/mixed; boundary=\"XYZ\"\n\
             \n\
             --XYZ\n\
             Content-Type: text/plain\n\
             \n\
             See attached.\n\
             --XYZ\n\
             Content-Type: text/csv; name=\"numbers.csv\"\n\
             Content-Disposition: attachment; filename=\"numbers.csv\"\n\
             Content-Transfer-Encoding: base64\n\
             \n\
             YSxiCjEsMgo=\n\
             --XYZ--\n",
        ));
        assert_eq!(msg.body, "See attached.");
        assert_eq!(msg.attachments.len(), 1);
        assert_eq!(msg.attachments[0].filename, "numbers.csv");
        assert_eq!(msg.attachments[0].content_type, "text/csv");
        assert_eq!(msg.attachments[0].data, b"a,b\n1,2\n");
    }

    #[test]
    fn test_html_only_body_not_converted() {
        let msg = decode(&raw(
            "Subject: Newsletter
             Message-ID: <h@x>
             Content-Type: text/html; charset=utf-8
             
             <p>Hello <b>there</b></p>
",
        ));
        assert_eq!(msg.body, "");
    }

    #[test]
    fn test_plain_part_preferred_over_html_alternative() {
        let msg = decode(&raw(
            r#"Subject: Both
             Message-ID: <alt@x>
             MIME-Version: 1.0
             Content-Type: multipart/alternative; boundary="ALT"
             
             --ALT
             Content-Type: text/plain
             
             Plain version.
             --ALT
             Content-Type: text/html
             
             <p>HTML version.</p>
             --ALT--
"#,
        ));
        assert_eq!(msg.body, "Plain version.");
    }

    #[test]
    fn test_inline_image_not_saved_as_attachment() {
        let msg = decode(&raw(
            r#"Subject: Logo
             Message-ID: <img@x>
             MIME-Version: 1.0
             Content-Type: multipart/mixed; boundary="REL"
             
             --REL
             Content-Type: text/plain
             
             See the logo.
             --REL
             Content-Type: image/png; name="logo.png"
             Content-Disposition: inline; filename="logo.png"
             Content-ID: <logo@x>
             Content-Transfer-Encoding: base64
             
             iVBORw0KGgo=
             --REL
             Content-Type: application/pdf; name="terms.pdf"
             Content-Disposition: attachment; filename="terms.pdf"
             Content-Transfer-Encoding: base64
             
             JVBERi0=
             --REL--
"#,
        ));
        assert_eq!(msg.attachments.len(), 1);
        assert_eq!(msg.attachments[0].filename, "terms.pdf");
        assert_eq!(msg.attachments[0].data, b"%PDF-");
    }

    #[test]
    fn test_extract_body_fallback() {
        assert_eq!(extract_body_fallback(b"X: y\n\nbody\n"), "body");
        assert_eq!(extract_body_fallback(b"X: y\r\n\r\nbody\r\n"), "body");
        assert_eq!(extract_body_fallback(b"no separator"), "");
    }
}
