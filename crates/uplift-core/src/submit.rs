//! Submission payloads, results and error extraction

use serde_json::Value;

use crate::error::PlaygroundError;
use crate::input::{InputSlot, InputSource, OutputFormat, SlotId, UploadedFile};

/// Value one slot contributes to the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotPayload {
    Text(String),
    File(UploadedFile),
    Url(String),
}

impl SlotPayload {
    pub fn from_slot(slot: &InputSlot) -> Self {
        match slot.source {
            InputSource::Content => SlotPayload::Text(slot.text.clone()),
            InputSource::File => match &slot.file {
                Some(file) => SlotPayload::File(file.clone()),
                None => SlotPayload::Text(String::new()),
            },
            InputSource::Url => SlotPayload::Url(slot.url_str().to_string()),
        }
    }

    /// Multipart field name this payload goes under
    pub fn field(&self, slot: SlotId) -> &'static str {
        match self {
            SlotPayload::Text(_) | SlotPayload::File(_) => slot.content_field(),
            SlotPayload::Url(_) => slot.url_field(),
        }
    }
}

/// Everything sent in one `/json-uplift` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub context: SlotPayload,
    pub json: SlotPayload,
    pub output: OutputFormat,
    pub base: String,
    pub provenance: bool,
}

/// Decoded success body
#[derive(Debug, Clone, PartialEq)]
pub enum UpliftOutput {
    Document(Value),
    Text(String),
    Archive(Vec<u8>),
}

impl UpliftOutput {
    /// Decode a body according to its content type.
    pub fn from_body(content_type: &str, body: Vec<u8>) -> Self {
        let content_type = content_type.to_ascii_lowercase();

        if content_type.contains("zip") {
            return UpliftOutput::Archive(body);
        }

        let text = String::from_utf8_lossy(&body).into_owned();
        if content_type.contains("json") {
            if let Ok(value) = serde_json::from_str(&text) {
                return UpliftOutput::Document(value);
            }
        }
        UpliftOutput::Text(text)
    }

    pub fn display_text(&self) -> String {
        match self {
            // serde_json pretty printing indents with two spaces
            UpliftOutput::Document(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            UpliftOutput::Text(text) => text.clone(),
            UpliftOutput::Archive(bytes) => {
                format!("Zip archive with every output type ({} bytes)", bytes.len())
            }
        }
    }
}

/// What the result pane shows; exactly one side is set after a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionResult {
    pub text: Option<String>,
    pub error: Option<String>,
}

impl SubmissionResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            text: None,
            error: Some(error.into()),
        }
    }

    pub fn from_outcome(outcome: &Result<UpliftOutput, PlaygroundError>) -> Self {
        match outcome {
            Ok(output) => Self::success(output.display_text()),
            Err(e) => Self::failure(error_message(e)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.error.is_none()
    }
}

/// Message from a structured `{"detail": {"msg": .., "cause": "Type|text"}}`
/// error body, or `None` when the body does not have that shape.
pub fn detail_message(body: &Value) -> Option<String> {
    let detail = body.get("detail")?;
    let msg = detail.get("msg")?.as_str()?;

    let cause = detail
        .get("cause")
        .and_then(Value::as_str)
        .and_then(|cause| cause.splitn(2, '|').nth(1))
        .filter(|cause| !cause.is_empty());

    Some(match cause {
        Some(cause) => format!("{msg}: {cause}"),
        None => msg.to_string(),
    })
}

/// Text shown for a failed submission.
pub fn error_message(error: &PlaygroundError) -> String {
    if let PlaygroundError::Backend { body, .. } = error {
        if let Ok(value) = serde_json::from_str::<Value>(body) {
            if let Some(message) = detail_message(&value) {
                return message;
            }
        }
    }
    error.to_string()
}

/// Identifies one submission in the order it was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Hands out tickets and tells whether a response is still the latest
#[derive(Debug, Default)]
pub struct SubmissionTracker {
    issued: u64,
    settled: u64,
}

impl SubmissionTracker {
    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    /// Record a completed submission; true when its response should be shown.
    pub fn settle(&mut self, ticket: Ticket) -> bool {
        if ticket.0 != self.issued {
            return false;
        }
        self.settled = ticket.0;
        true
    }

    /// The latest submission has not answered yet
    pub fn is_pending(&self) -> bool {
        self.settled < self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend_error(body: &str) -> PlaygroundError {
        PlaygroundError::Backend {
            status: 400,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_message_with_cause() {
        let err = backend_error(r#"{"detail":{"msg":"Invalid YAML","cause":"ParseError|line 3"}}"#);
        assert_eq!(error_message(&err), "Invalid YAML: line 3");
    }

    #[test]
    fn test_message_without_cause() {
        let err =
            backend_error(r#"{"detail":{"type":"JSONDecodeError","msg":"Invalid JSON input"}}"#);
        assert_eq!(error_message(&err), "Invalid JSON input");
    }

    #[test]
    fn test_cause_without_separator_is_ignored() {
        let body = json!({"detail": {"msg": "Bad", "cause": null}});
        assert_eq!(detail_message(&body).as_deref(), Some("Bad"));
        let body = json!({"detail": {"msg": "Bad", "cause": "no separator"}});
        assert_eq!(detail_message(&body).as_deref(), Some("Bad"));
    }

    #[test]
    fn test_cause_keeps_everything_after_first_separator() {
        let body = json!({"detail": {"msg": "Bad", "cause": "A|b|c"}});
        assert_eq!(detail_message(&body).as_deref(), Some("Bad: b|c"));
    }

    #[test]
    fn test_empty_cause_text_is_ignored() {
        let body = json!({"detail": {"msg": "Bad", "cause": "X|"}});
        assert_eq!(detail_message(&body).as_deref(), Some("Bad"));
    }

    #[test]
    fn test_unstructured_errors_fall_back_to_raw_text() {
        for body in [
            r#"{"detail":{"type":"X"}}"#,
            r#"{"detail":"Not Found"}"#,
            r#"{"error":"nope"}"#,
            "Internal Server Error",
        ] {
            let err = backend_error(body);
            assert_eq!(error_message(&err), err.to_string());
            assert!(error_message(&err).contains("400"));
        }
    }

    #[test]
    fn test_json_output_is_indented_with_two_spaces() {
        let output = UpliftOutput::from_body("application/json", br#"{"a":1}"#.to_vec());
        assert_eq!(output, UpliftOutput::Document(json!({"a": 1})));
        assert_eq!(output.display_text(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_other_bodies_are_shown_as_is() {
        let ttl = "@prefix ex: <http://example.org/> .\n";
        let output = UpliftOutput::from_body("text/turtle; charset=utf-8", ttl.as_bytes().to_vec());
        assert_eq!(output.display_text(), ttl);

        let broken = UpliftOutput::from_body("application/json", b"{oops".to_vec());
        assert_eq!(broken, UpliftOutput::Text("{oops".to_string()));

        let zip = UpliftOutput::from_body("application/zip", vec![0x50, 0x4b, 3, 4]);
        assert!(matches!(zip, UpliftOutput::Archive(ref b) if b.len() == 4));
    }

    #[test]
    fn test_result_sides_are_exclusive() {
        let ok = SubmissionResult::from_outcome(&Ok(UpliftOutput::Text("x".into())));
        assert_eq!(ok, SubmissionResult::success("x"));
        assert!(ok.error.is_none());

        let failed = SubmissionResult::from_outcome(&Err(backend_error(
            r#"{"detail":{"msg":"Nope"}}"#,
        )));
        assert_eq!(failed, SubmissionResult::failure("Nope"));
        assert!(failed.text.is_none());
    }

    #[test]
    fn test_payload_per_source() {
        let mut slot = InputSlot::default();
        slot.set_text("a: b");
        assert_eq!(SlotPayload::from_slot(&slot), SlotPayload::Text("a: b".into()));

        slot.set_source(InputSource::Url);
        assert_eq!(SlotPayload::from_slot(&slot), SlotPayload::Url(String::new()));
        assert_eq!(SlotPayload::from_slot(&slot).field(SlotId::Context), "contexturl");

        slot.set_source(InputSource::File);
        assert_eq!(SlotPayload::from_slot(&slot), SlotPayload::Text(String::new()));
        slot.set_file(Some(UploadedFile::new("ctx.yml", b"a: b".to_vec())));
        let payload = SlotPayload::from_slot(&slot);
        assert_eq!(payload.field(SlotId::Json), "json");
        assert!(matches!(payload, SlotPayload::File(ref f) if f.name == "ctx.yml"));
    }

    #[test]
    fn test_only_latest_ticket_settles() {
        let mut tracker = SubmissionTracker::default();
        assert!(!tracker.is_pending());

        let first = tracker.issue();
        let second = tracker.issue();
        assert!(tracker.is_pending());

        assert!(!tracker.settle(first));
        assert!(tracker.is_pending());
        assert!(tracker.settle(second));
        assert!(!tracker.is_pending());
    }
}
