//! UI-agnostic form state
//!
//! [`FormState`] owns both input slots, the output options, the remote fetch
//! policy and the last result. Every mutation goes through a method that
//! recomputes the submission gate, so `can_submit()` is always current.
//! Last-used values come from a [`KeyValueStore`] once, in
//! [`FormState::restore`], and are written back in
//! [`FormState::begin_submission`].

use tracing::{debug, info, warn};

use crate::error::PlaygroundError;
use crate::gate;
use crate::input::{InputSlot, InputSource, OutputFormat, SlotId, UploadedFile};
use crate::policy::RemoteFetchPolicy;
use crate::store::{KeyValueStore, StorageKey};
use crate::submit::{
    SlotPayload, SubmissionRequest, SubmissionResult, SubmissionTracker, Ticket, UpliftOutput,
};

#[derive(Debug)]
pub struct FormState {
    context: InputSlot,
    json: InputSlot,
    base_uri: String,
    output: OutputFormat,
    provenance: bool,
    policy: RemoteFetchPolicy,
    submittable: bool,
    result: SubmissionResult,
    last_output: Option<UpliftOutput>,
    tracker: SubmissionTracker,
}

impl Default for FormState {
    fn default() -> Self {
        let mut state = Self {
            context: InputSlot::default(),
            json: InputSlot::default(),
            base_uri: String::new(),
            output: OutputFormat::default(),
            provenance: true,
            policy: RemoteFetchPolicy::unknown(),
            submittable: false,
            result: SubmissionResult::default(),
            last_output: None,
            tracker: SubmissionTracker::default(),
        };
        state.refresh();
        state
    }
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the form from persisted values, defaulting anything missing.
    pub fn restore(store: &dyn KeyValueStore) -> Self {
        let mut state = Self::default();

        for id in [SlotId::Context, SlotId::Json] {
            let slot = state.slot_mut(id);
            slot.source = restore_source(store, id);
            slot.text = store.get(&StorageKey::Text(id).key()).unwrap_or_default();
            slot.url = store.get(&StorageKey::Url(id).key());
        }

        state.base_uri = store.get(&StorageKey::BaseUri.key()).unwrap_or_default();

        state.output = match store.get(&StorageKey::OutputFormat.key()) {
            None => OutputFormat::default(),
            Some(value) => OutputFormat::from_str(&value).unwrap_or_else(|| {
                warn!(value = %value, "Ignoring unknown stored output format");
                OutputFormat::default()
            }),
        };

        state.provenance = store
            .get(&StorageKey::Provenance.key())
            .map(|v| v != "false")
            .unwrap_or(true);

        state.refresh();
        state
    }

    /// Write the values the next session should start from.
    pub fn persist(&self, store: &mut dyn KeyValueStore) -> Result<(), PlaygroundError> {
        for id in [SlotId::Context, SlotId::Json] {
            let slot = self.slot(id);
            store.set(&StorageKey::SourceKind(id).key(), slot.source.as_str())?;
            match slot.source {
                InputSource::Content => store.set(&StorageKey::Text(id).key(), &slot.text)?,
                InputSource::Url => store.set(&StorageKey::Url(id).key(), slot.url_str())?,
                InputSource::File => {}
            }
        }

        store.set(&StorageKey::BaseUri.key(), &self.base_uri)?;
        store.set(&StorageKey::OutputFormat.key(), self.output.as_str())?;
        store.set(&StorageKey::Provenance.key(), &self.provenance.to_string())?;
        Ok(())
    }

    pub fn slot(&self, id: SlotId) -> &InputSlot {
        match id {
            SlotId::Context => &self.context,
            SlotId::Json => &self.json,
        }
    }

    fn slot_mut(&mut self, id: SlotId) -> &mut InputSlot {
        match id {
            SlotId::Context => &mut self.context,
            SlotId::Json => &mut self.json,
        }
    }

    /// Apply an arbitrary edit to a slot.
    pub fn update_slot(&mut self, id: SlotId, edit: impl FnOnce(&mut InputSlot)) {
        edit(self.slot_mut(id));
        self.refresh();
    }

    pub fn set_source(&mut self, id: SlotId, source: InputSource) {
        self.update_slot(id, |slot| slot.set_source(source));
    }

    pub fn set_text(&mut self, id: SlotId, text: impl Into<String>) {
        let text = text.into();
        self.update_slot(id, |slot| slot.set_text(text));
    }

    pub fn set_file(&mut self, id: SlotId, file: Option<UploadedFile>) {
        self.update_slot(id, |slot| slot.set_file(file));
    }

    pub fn set_url(&mut self, id: SlotId, url: impl Into<String>) {
        let url = url.into();
        self.update_slot(id, |slot| slot.set_url(url));
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn set_base_uri(&mut self, base_uri: impl Into<String>) {
        self.base_uri = base_uri.into();
        self.refresh();
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    pub fn set_output(&mut self, output: OutputFormat) {
        self.output = output;
        self.refresh();
    }

    pub fn provenance(&self) -> bool {
        self.provenance
    }

    pub fn set_provenance(&mut self, provenance: bool) {
        self.provenance = provenance;
        self.refresh();
    }

    pub fn policy(&self) -> &RemoteFetchPolicy {
        &self.policy
    }

    /// Install the policy fetched from the backend.
    ///
    /// When remote fetching is disabled the `url` choice disappears, so slots
    /// sitting on it are moved back to inline content.
    pub fn set_policy(&mut self, policy: RemoteFetchPolicy) {
        self.policy = policy;
        if !self.policy.url_available() {
            for id in [SlotId::Context, SlotId::Json] {
                let slot = self.slot_mut(id);
                if slot.source == InputSource::Url {
                    info!(slot = ?id, "Remote fetch disabled, switching slot to inline content");
                    slot.source = InputSource::Content;
                }
            }
        }
        self.refresh();
    }

    /// Sources the user may pick from under the current policy
    pub fn available_sources(&self) -> Vec<InputSource> {
        InputSource::all()
            .into_iter()
            .filter(|s| *s != InputSource::Url || self.policy.url_available())
            .collect()
    }

    pub fn can_submit(&self) -> bool {
        self.submittable
    }

    fn refresh(&mut self) {
        self.submittable = gate::can_submit(&self.json, &self.context, &self.policy);
    }

    /// Build the request for the current values.
    pub fn request(&self) -> SubmissionRequest {
        SubmissionRequest {
            context: SlotPayload::from_slot(&self.context),
            json: SlotPayload::from_slot(&self.json),
            output: self.output,
            base: self.base_uri.clone(),
            provenance: self.provenance,
        }
    }

    /// Persist the current values and hand out the request to send.
    ///
    /// Persisting happens before anything is sent, and a storage failure does
    /// not stop the submission.
    pub fn begin_submission(
        &mut self,
        store: &mut dyn KeyValueStore,
    ) -> (Ticket, SubmissionRequest) {
        if let Err(e) = self.persist(store) {
            warn!(error = %e, "Could not persist form values");
        }
        (self.tracker.issue(), self.request())
    }

    /// Apply a finished submission. Returns false when a newer submission was
    /// issued meanwhile and this response was dropped.
    pub fn complete_submission(
        &mut self,
        ticket: Ticket,
        outcome: Result<UpliftOutput, PlaygroundError>,
    ) -> bool {
        if !self.tracker.settle(ticket) {
            debug!(?ticket, "Dropping response of a superseded submission");
            return false;
        }

        self.result = SubmissionResult::from_outcome(&outcome);
        match outcome {
            Ok(output) => self.last_output = Some(output),
            Err(e) => {
                warn!(error = %e, "Uplift failed");
                self.last_output = None;
            }
        }
        true
    }

    pub fn is_submitting(&self) -> bool {
        self.tracker.is_pending()
    }

    pub fn result(&self) -> &SubmissionResult {
        &self.result
    }

    /// Decoded output of the last successful submission
    pub fn last_output(&self) -> Option<&UpliftOutput> {
        self.last_output.as_ref()
    }
}

fn restore_source(store: &dyn KeyValueStore, id: SlotId) -> InputSource {
    let Some(value) = store.get(&StorageKey::SourceKind(id).key()) else {
        return InputSource::default();
    };

    match InputSource::from_str(&value) {
        // Files are not persisted, only their absence would come back.
        Some(InputSource::File) => InputSource::Content,
        Some(source) => source,
        None => {
            warn!(slot = ?id, value = %value, "Ignoring unknown stored source kind");
            InputSource::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AllowPattern;
    use crate::store::MemoryStore;
    use serde_json::json;

    /// Store whose writes always fail
    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&mut self, _key: &str, _value: &str) -> crate::error::Result<()> {
            Err(PlaygroundError::Storage("disk full".into()))
        }
    }

    #[test]
    fn test_defaults_on_empty_store() {
        let state = FormState::restore(&MemoryStore::new());
        for id in [SlotId::Context, SlotId::Json] {
            assert_eq!(state.slot(id).source, InputSource::Content);
            assert_eq!(state.slot(id).text, "");
            assert_eq!(state.slot(id).url, None);
        }
        assert_eq!(state.output(), OutputFormat::Ttl);
        assert_eq!(state.base_uri(), "");
        assert!(state.provenance());
        assert!(!state.can_submit());
        assert!(state.result().is_empty());
    }

    #[test]
    fn test_reload_restores_persisted_values() {
        let mut store = MemoryStore::new();
        let mut state = FormState::new();
        state.set_source(SlotId::Json, InputSource::Content);
        state.set_text(SlotId::Json, "{}");
        state.set_output(OutputFormat::Expanded);
        state.persist(&mut store).unwrap();

        let restored = FormState::restore(&store);
        assert_eq!(restored.slot(SlotId::Json).source, InputSource::Content);
        assert_eq!(restored.slot(SlotId::Json).text, "{}");
        assert_eq!(restored.output(), OutputFormat::Expanded);
        assert!(restored.can_submit());

        assert_eq!(restored.slot(SlotId::Context).source, InputSource::Content);
        assert_eq!(restored.slot(SlotId::Context).text, "");
    }

    #[test]
    fn test_only_active_value_is_written() {
        let mut store = MemoryStore::new();
        let mut state = FormState::new();
        state.set_text(SlotId::Context, "a: b");
        state.set_url(SlotId::Context, "https://example.org/ctx.yml");
        state.set_source(SlotId::Context, InputSource::Url);
        state.persist(&mut store).unwrap();

        assert_eq!(
            store.get(&StorageKey::Url(SlotId::Context).key()).as_deref(),
            Some("https://example.org/ctx.yml")
        );
        assert_eq!(store.get(&StorageKey::Text(SlotId::Context).key()), None);
        assert_eq!(
            store.get(&StorageKey::SourceKind(SlotId::Context).key()).as_deref(),
            Some("url")
        );
    }

    #[test]
    fn test_file_source_degrades_on_reload() {
        let mut store = MemoryStore::new();
        let mut state = FormState::new();
        state.set_text(SlotId::Json, "{\"old\": true}");
        state.persist(&mut store).unwrap();

        state.set_source(SlotId::Json, InputSource::File);
        state.set_file(SlotId::Json, Some(UploadedFile::new("doc.json", b"{}".to_vec())));
        assert!(state.can_submit());
        state.persist(&mut store).unwrap();

        let restored = FormState::restore(&store);
        let json = restored.slot(SlotId::Json);
        assert_eq!(json.source, InputSource::Content);
        assert!(json.file.is_none());
        assert_eq!(json.text, "{\"old\": true}");
    }

    #[test]
    fn test_garbage_values_fall_back_to_defaults() {
        let mut store = MemoryStore::new();
        store.set(&StorageKey::SourceKind(SlotId::Json).key(), "carrier-pigeon").unwrap();
        store.set(&StorageKey::OutputFormat.key(), "rdfxml").unwrap();
        let state = FormState::restore(&store);
        assert_eq!(state.slot(SlotId::Json).source, InputSource::Content);
        assert_eq!(state.output(), OutputFormat::Ttl);
    }

    #[test]
    fn test_gate_follows_every_mutation() {
        let mut state = FormState::new();
        assert!(!state.can_submit());
        state.set_text(SlotId::Json, "{}");
        assert!(state.can_submit());

        state.set_source(SlotId::Context, InputSource::Url);
        state.set_url(SlotId::Context, "https://b.org/x");
        assert!(state.can_submit());

        state.set_policy(RemoteFetchPolicy::enabled(Some(
            AllowPattern::new(["^https://a\\.org/"]).unwrap(),
        )));
        assert!(!state.can_submit());

        state.update_slot(SlotId::Context, |slot| slot.url = None);
        assert!(state.can_submit());
    }

    #[test]
    fn test_disabled_policy_removes_url_choice() {
        let mut state = FormState::new();
        state.set_source(SlotId::Json, InputSource::Url);
        assert_eq!(state.available_sources().len(), 3);

        state.set_policy(RemoteFetchPolicy::disabled());
        assert_eq!(state.slot(SlotId::Json).source, InputSource::Content);
        assert_eq!(
            state.available_sources(),
            vec![InputSource::Content, InputSource::File]
        );
    }

    #[test]
    fn test_submission_persists_even_if_it_fails() {
        let mut store = MemoryStore::new();
        let mut state = FormState::new();
        state.set_text(SlotId::Json, "{\"a\": 1}");
        state.set_base_uri("https://example.org/base/");

        let (ticket, request) = state.begin_submission(&mut store);
        assert_eq!(request.json, SlotPayload::Text("{\"a\": 1}".into()));
        assert_eq!(request.base, "https://example.org/base/");
        assert!(state.is_submitting());
        assert_eq!(
            store.get(&StorageKey::BaseUri.key()).as_deref(),
            Some("https://example.org/base/")
        );

        let applied = state.complete_submission(
            ticket,
            Err(PlaygroundError::Backend {
                status: 400,
                body: r#"{"detail":{"msg":"Invalid YAML","cause":"ParseError|line 3"}}"#.into(),
            }),
        );
        assert!(applied);
        assert!(!state.is_submitting());
        assert_eq!(state.result(), &SubmissionResult::failure("Invalid YAML: line 3"));
        assert_eq!(
            FormState::restore(&store).slot(SlotId::Json).text,
            "{\"a\": 1}"
        );
    }

    #[test]
    fn test_storage_failure_does_not_block_submission() {
        let mut store = FailingStore;
        let mut state = FormState::new();
        state.set_text(SlotId::Json, "{}");
        state.set_output(OutputFormat::Expanded);

        let (ticket, request) = state.begin_submission(&mut store);
        assert_eq!(request.json, SlotPayload::Text("{}".into()));
        assert_eq!(request.output, OutputFormat::Expanded);
        assert!(state.is_submitting());

        assert!(state.complete_submission(ticket, Ok(UpliftOutput::Text("ok".into()))));
        assert!(!state.is_submitting());
        assert_eq!(state.result(), &SubmissionResult::success("ok"));
    }

    #[test]
    fn test_success_clears_previous_error() {
        let mut store = MemoryStore::new();
        let mut state = FormState::new();
        state.set_text(SlotId::Json, "{}");

        let (ticket, _) = state.begin_submission(&mut store);
        state.complete_submission(ticket, Err(PlaygroundError::Storage("boom".into())));
        assert!(state.result().error.is_some());

        let (ticket, _) = state.begin_submission(&mut store);
        state.complete_submission(ticket, Ok(UpliftOutput::Document(json!({"a": 1}))));
        assert_eq!(state.result(), &SubmissionResult::success("{\n  \"a\": 1\n}"));
        assert!(state.last_output().is_some());
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut store = MemoryStore::new();
        let mut state = FormState::new();
        state.set_text(SlotId::Json, "{}");

        let (first, _) = state.begin_submission(&mut store);
        let (second, _) = state.begin_submission(&mut store);

        assert!(state.complete_submission(second, Ok(UpliftOutput::Text("new".into()))));
        assert!(!state.complete_submission(first, Ok(UpliftOutput::Text("old".into()))));
        assert_eq!(state.result().text.as_deref(), Some("new"));
    }
}
