use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tracing::{error, info};
use uplift_core::{
    policy, FormState, InputSource, KeyValueStore, OutputFormat, PlaygroundError,
    RemoteFetchPolicy, SlotId, Ticket, UpliftClient, UpliftOutput, UploadedFile,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Focusable form fields, in tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ContextSource,
    ContextValue,
    JsonSource,
    JsonValue,
    BaseUri,
    Output,
    Provenance,
    Submit,
}

impl Field {
    const ORDER: [Field; 8] = [
        Field::ContextSource,
        Field::ContextValue,
        Field::JsonSource,
        Field::JsonValue,
        Field::BaseUri,
        Field::Output,
        Field::Provenance,
        Field::Submit,
    ];

    pub fn next(self) -> Self {
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(i + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(i + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    /// Slot a source or value field belongs to
    pub fn slot(self) -> Option<SlotId> {
        match self {
            Field::ContextSource | Field::ContextValue => Some(SlotId::Context),
            Field::JsonSource | Field::JsonValue => Some(SlotId::Json),
            _ => None,
        }
    }

    pub fn is_text(self) -> bool {
        matches!(self, Field::ContextValue | Field::JsonValue | Field::BaseUri)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

pub type PolicyTask = JoinHandle<uplift_core::Result<RemoteFetchPolicy>>;
pub type SubmitTask = JoinHandle<uplift_core::Result<UpliftOutput>>;

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: Field,

    // Form
    pub form: FormState,
    store: Box<dyn KeyValueStore>,
    pub client: UpliftClient,

    // Text being edited and cursor position (in chars)
    pub edit_buffer: String,
    pub edit_cursor: usize,

    // Paths typed for file sources, one per slot
    pub context_path: String,
    pub json_path: String,

    // Background work
    pub policy_task: Option<PolicyTask>,
    pub policy_error: Option<String>,
    pub submit_tasks: Vec<(Ticket, SubmitTask)>,

    pub status: Option<(StatusKind, String)>,
    pub result_scroll: u16,
    pub animation_frame: u8,
    pub archive_dir: PathBuf,
}

impl App {
    pub fn new(
        form: FormState,
        store: Box<dyn KeyValueStore>,
        client: UpliftClient,
        archive_dir: PathBuf,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: Field::JsonValue,

            form,
            store,
            client,

            edit_buffer: String::new(),
            edit_cursor: 0,

            context_path: String::new(),
            json_path: String::new(),

            policy_task: None,
            policy_error: None,
            submit_tasks: Vec::new(),

            status: None,
            result_scroll: 0,
            animation_frame: 0,
            archive_dir,
        }
    }

    pub fn set_status(&mut self, kind: StatusKind, message: impl Into<String>) {
        self.status = Some((kind, message.into()));
    }

    pub fn start_policy_fetch(&mut self) {
        let client = self.client.clone();
        self.policy_task = Some(tokio::spawn(async move { policy::load(&client).await }));
    }

    pub fn path_for(&self, slot: SlotId) -> &str {
        match slot {
            SlotId::Context => &self.context_path,
            SlotId::Json => &self.json_path,
        }
    }

    fn path_for_mut(&mut self, slot: SlotId) -> &mut String {
        match slot {
            SlotId::Context => &mut self.context_path,
            SlotId::Json => &mut self.json_path,
        }
    }

    // Field navigation
    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Step the focused choice forwards (or backwards).
    pub fn cycle_choice(&mut self, forward: bool) {
        match self.focus {
            Field::ContextSource | Field::JsonSource => {
                if let Some(slot) = self.focus.slot() {
                    let sources = self.form.available_sources();
                    let current = self.form.slot(slot).source;
                    let next = step(&sources, current, forward);
                    self.form.set_source(slot, next);
                }
            }
            Field::Output => {
                let next = step(&OutputFormat::all(), self.form.output(), forward);
                self.form.set_output(next);
            }
            Field::Provenance => {
                let provenance = self.form.provenance();
                self.form.set_provenance(!provenance);
            }
            _ => {}
        }
    }

    // Editing
    pub fn begin_edit(&mut self) {
        let value = match self.focus {
            Field::BaseUri => self.form.base_uri().to_string(),
            field => match field.slot() {
                Some(slot) => self.slot_value(slot),
                None => return,
            },
        };
        self.edit_cursor = value.chars().count();
        self.edit_buffer = value;
        self.input_mode = InputMode::Editing;
    }

    pub fn end_edit(&mut self) {
        self.input_mode = InputMode::Normal;
        self.edit_buffer.clear();
        self.edit_cursor = 0;
    }

    /// Whether the field being edited takes several lines
    pub fn editing_multiline(&self) -> bool {
        self.focus
            .slot()
            .map(|slot| self.form.slot(slot).source == InputSource::Content)
            .unwrap_or(false)
    }

    fn slot_value(&self, slot: SlotId) -> String {
        let input = self.form.slot(slot);
        match input.source {
            InputSource::Content => input.text.clone(),
            InputSource::Url => input.url_str().to_string(),
            InputSource::File => self.path_for(slot).to_string(),
        }
    }

    /// Push the edit buffer into the form so the gate sees every keystroke.
    fn apply_edit(&mut self) {
        let value = self.edit_buffer.clone();
        match self.focus {
            Field::BaseUri => self.form.set_base_uri(value),
            field => {
                if let Some(slot) = field.slot() {
                    let source = self.form.slot(slot).source;
                    match source {
                        InputSource::Content => self.form.set_text(slot, value),
                        InputSource::Url => self.form.set_url(slot, value),
                        InputSource::File => *self.path_for_mut(slot) = value,
                    }
                }
            }
        }
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.edit_buffer, self.edit_cursor);
        self.edit_buffer.insert(byte_pos, c);
        self.edit_cursor += 1;
        self.apply_edit();
    }

    pub fn delete_before_cursor(&mut self) {
        if self.edit_cursor > 0 {
            self.edit_cursor -= 1;
            let byte_pos = char_to_byte_index(&self.edit_buffer, self.edit_cursor);
            self.edit_buffer.remove(byte_pos);
            self.apply_edit();
        }
    }

    pub fn delete_at_cursor(&mut self) {
        if self.edit_cursor < self.edit_buffer.chars().count() {
            let byte_pos = char_to_byte_index(&self.edit_buffer, self.edit_cursor);
            self.edit_buffer.remove(byte_pos);
            self.apply_edit();
        }
    }

    pub fn cursor_left(&mut self) {
        self.edit_cursor = self.edit_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.edit_cursor = (self.edit_cursor + 1).min(self.edit_buffer.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.edit_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.edit_cursor = self.edit_buffer.chars().count();
    }

    /// Read the file whose path was typed into a file-sourced slot.
    pub fn load_file(&mut self, slot: SlotId) {
        let path = self.path_for(slot).trim().to_string();
        if path.is_empty() {
            self.form.set_file(slot, None);
            return;
        }

        match std::fs::read(&path) {
            Ok(bytes) => {
                let name = Path::new(&path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.clone());
                let message = format!("Loaded {} ({} bytes)", name, bytes.len());
                self.set_status(StatusKind::Info, message);
                self.form.set_file(slot, Some(UploadedFile::new(name, bytes)));
            }
            Err(e) => {
                self.form.set_file(slot, None);
                self.set_status(StatusKind::Error, format!("Cannot read {}: {}", path, e));
            }
        }
    }

    pub fn clear_file(&mut self, slot: SlotId) {
        self.path_for_mut(slot).clear();
        self.form.set_file(slot, None);
    }

    // Submission
    pub fn submit(&mut self) {
        if !self.form.can_submit() {
            self.set_status(StatusKind::Error, "Form is incomplete, nothing submitted");
            return;
        }

        let (ticket, request) = self.form.begin_submission(self.store.as_mut());
        let client = self.client.clone();
        self.submit_tasks
            .push((ticket, tokio::spawn(async move { client.uplift(request).await })));
        self.status = None;
    }

    /// Collect finished background tasks.
    pub async fn poll_tasks(&mut self) {
        if self.policy_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.policy_task.take() {
                match task.await {
                    Ok(Ok(policy)) => self.form.set_policy(policy),
                    Ok(Err(e)) => {
                        self.policy_error = Some(e.to_string());
                        self.set_status(StatusKind::Error, e.to_string());
                    }
                    Err(e) => error!(error = %e, "Policy task failed"),
                }
            }
        }

        let (finished, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.submit_tasks)
            .into_iter()
            .partition(|(_, task)| task.is_finished());
        self.submit_tasks = pending;

        for (ticket, task) in finished {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(PlaygroundError::Io(std::io::Error::other(e))),
            };
            if self.form.complete_submission(ticket, outcome) {
                self.result_scroll = 0;
            }
        }
    }

    /// Write the last zip bundle next to the working directory.
    pub fn save_archive(&mut self) {
        let Some(UpliftOutput::Archive(bytes)) = self.form.last_output() else {
            self.set_status(
                StatusKind::Error,
                "No archive to save, submit with output 'all' first",
            );
            return;
        };

        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let path = self.archive_dir.join(format!("uplift-{stamp}.zip"));

        match std::fs::write(&path, bytes) {
            Ok(()) => {
                info!(path = %path.display(), "Saved output archive");
                self.set_status(StatusKind::Info, format!("Saved {}", path.display()));
            }
            Err(e) => {
                let message = format!("Cannot write {}: {}", path.display(), e);
                self.set_status(StatusKind::Error, message);
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.form.is_submitting() || self.policy_task.is_some()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_result_down(&mut self, lines: u16) {
        self.result_scroll = self.result_scroll.saturating_add(lines);
    }

    pub fn scroll_result_up(&mut self, lines: u16) {
        self.result_scroll = self.result_scroll.saturating_sub(lines);
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn step<T: Copy + PartialEq>(choices: &[T], current: T, forward: bool) -> T {
    if choices.is_empty() {
        return current;
    }
    let len = choices.len();
    match choices.iter().position(|c| *c == current) {
        Some(i) if forward => choices[(i + 1) % len],
        Some(i) => choices[(i + len - 1) % len],
        None => choices[0],
    }
}
