use std::path::PathBuf;

use anyhow::Result;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use crate::client::AgentClient;

pub const MISSING_FILE_NOTICE: &str = "Please select a PDF file.";
pub const UPLOAD_SUCCESS_NOTICE: &str = "PDF uploaded and indexed successfully!";
pub const LOADING_TEXT: &str = "Loading...";

/// Notice lifetime in ticks (300ms each).
const NOTICE_TICKS: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Files,
    Answer,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Upload,
    Ask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Dismissible inline notification shown above the footer.
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub ticks_left: u8,
}

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// An outstanding request. Each submission gets its own entry so that one
/// operation settling never clears the busy state of another still-pending
/// operation.
pub struct InFlightRequest {
    pub id: u64,
    pub kind: RequestKind,
    pub task: JoinHandle<Result<String>>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Question / answer state
    pub query_input: String,
    pub query_cursor: usize, // cursor position in query_input (chars)
    pub answer: String,
    pub answer_scroll: u16,
    pub answer_height: u16,
    pub total_answer_lines: u16,

    // PDF browser state
    pub current_dir: PathBuf,
    pub entries: Vec<FileEntry>,
    pub files_state: ListState,
    pub selected_file: Option<PathBuf>,

    // Outstanding requests
    pub in_flight: Vec<InFlightRequest>,
    next_request_id: u64,

    pub notice: Option<Notice>,

    pub client: AgentClient,
}

impl App {
    pub fn new(client: AgentClient, start_dir: PathBuf) -> Result<Self> {
        let mut app = Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Files,

            query_input: String::new(),
            query_cursor: 0,
            answer: String::new(),
            answer_scroll: 0,
            answer_height: 0,
            total_answer_lines: 0,

            current_dir: start_dir,
            entries: Vec::new(),
            files_state: ListState::default(),
            selected_file: None,

            in_flight: Vec::new(),
            next_request_id: 0,

            notice: None,

            client,
        };
        app.refresh_entries()?;
        Ok(app)
    }

    /// Re-read the current directory: subdirectories plus `*.pdf` files,
    /// directories first. Hidden entries are skipped.
    pub fn refresh_entries(&mut self) -> Result<()> {
        let mut entries = Vec::new();

        for entry in std::fs::read_dir(&self.current_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            let path = entry.path();
            let is_dir = entry.file_type()?.is_dir();
            if is_dir || is_pdf(&path) {
                entries.push(FileEntry { name, path, is_dir });
            }
        }

        entries.sort_by(|a, b| {
            b.is_dir
                .cmp(&a.is_dir)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });

        self.entries = entries;
        let selected = self
            .files_state
            .selected()
            .map(|i| i.min(self.entries.len().saturating_sub(1)));
        self.files_state
            .select(if self.entries.is_empty() { None } else { selected.or(Some(0)) });
        Ok(())
    }

    pub fn selected_entry(&self) -> Option<&FileEntry> {
        self.files_state.selected().and_then(|i| self.entries.get(i))
    }

    pub fn files_nav_down(&mut self) {
        let len = self.entries.len();
        if len > 0 {
            let i = self.files_state.selected().unwrap_or(0);
            self.files_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn files_nav_up(&mut self) {
        let i = self.files_state.selected().unwrap_or(0);
        self.files_state.select(Some(i.saturating_sub(1)));
    }

    /// Enter descends into a directory or marks a PDF as the selected file.
    /// Selecting does not upload.
    pub fn files_enter(&mut self) {
        if let Some(entry) = self.selected_entry().cloned() {
            if entry.is_dir {
                self.current_dir = entry.path;
                self.files_state.select(Some(0));
                if let Err(e) = self.refresh_entries() {
                    self.show_notice(NoticeLevel::Error, format!("Cannot read directory: {}", e));
                }
            } else {
                self.selected_file = Some(entry.path);
            }
        }
    }

    pub fn files_parent(&mut self) {
        if let Some(parent) = self.current_dir.parent().map(|p| p.to_path_buf()) {
            self.current_dir = parent;
            self.files_state.select(Some(0));
            if let Err(e) = self.refresh_entries() {
                self.show_notice(NoticeLevel::Error, format!("Cannot read directory: {}", e));
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn has_in_flight(&self, kind: RequestKind) -> bool {
        self.in_flight.iter().any(|r| r.kind == kind)
    }

    fn track(&mut self, kind: RequestKind, task: JoinHandle<Result<String>>) {
        let id = self.next_request_id;
        self.next_request_id += 1;
        tracing::debug!(id, kind = ?kind, "request pending");
        self.in_flight.push(InFlightRequest { id, kind, task });
    }

    /// Send the current query as-is. Empty input is the service's problem,
    /// not ours.
    pub fn submit_ask(&mut self) {
        if self.has_in_flight(RequestKind::Ask) {
            return;
        }

        let client = self.client.clone();
        let query = self.query_input.clone();
        tracing::info!(chars = query.chars().count(), "submitting question");

        self.track(
            RequestKind::Ask,
            tokio::spawn(async move { client.ask(&query).await }),
        );
    }

    /// Upload the selected PDF. Without a selection no request is made and
    /// the user is notified locally.
    pub fn submit_upload(&mut self) {
        if self.has_in_flight(RequestKind::Upload) {
            return;
        }

        let Some(path) = self.selected_file.clone() else {
            self.show_notice(NoticeLevel::Error, MISSING_FILE_NOTICE.to_string());
            return;
        };

        let client = self.client.clone();
        tracing::info!(file = %path.display(), "uploading PDF");

        self.track(
            RequestKind::Upload,
            tokio::spawn(async move { client.upload_pdf(&path).await }),
        );
    }

    /// Retire finished requests and apply their outcomes. Requests still
    /// pending are left untouched.
    pub async fn poll_requests(&mut self) {
        let mut i = 0;
        while i < self.in_flight.len() {
            if !self.in_flight[i].task.is_finished() {
                i += 1;
                continue;
            }

            let request = self.in_flight.swap_remove(i);
            tracing::debug!(id = request.id, "request settled");
            let outcome = match request.task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(anyhow::anyhow!("request task failed: {}", e)),
            };
            self.finish_request(request.kind, outcome);
        }
    }

    pub fn finish_request(&mut self, kind: RequestKind, outcome: Result<String>) {
        match (kind, outcome) {
            (RequestKind::Ask, Ok(answer)) => {
                tracing::info!(chars = answer.chars().count(), "answer received");
                self.answer = answer;
                self.answer_scroll = 0;
            }
            (RequestKind::Ask, Err(e)) => {
                tracing::warn!(error = %e, "ask failed");
                self.answer = format!("Error: {}", e);
                self.answer_scroll = 0;
            }
            (RequestKind::Upload, Ok(file_name)) => {
                tracing::info!(file = %file_name, "upload succeeded");
                self.show_notice(NoticeLevel::Info, UPLOAD_SUCCESS_NOTICE.to_string());
            }
            (RequestKind::Upload, Err(e)) => {
                tracing::warn!(error = %e, "upload failed");
                self.show_notice(NoticeLevel::Error, format!("Upload error: {}", e));
            }
        }
    }

    pub fn show_notice(&mut self, level: NoticeLevel, text: String) {
        self.notice = Some(Notice {
            level,
            text,
            ticks_left: NOTICE_TICKS,
        });
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Advance notice expiry (called by Tick events).
    pub fn tick(&mut self) {
        if let Some(notice) = &mut self.notice {
            notice.ticks_left = notice.ticks_left.saturating_sub(1);
            if notice.ticks_left == 0 {
                self.notice = None;
            }
        }
    }

    // Answer scrolling
    pub fn scroll_down(&mut self) {
        if self.answer_scroll < self.total_answer_lines.saturating_sub(self.answer_height) {
            self.answer_scroll = self.answer_scroll.saturating_add(1);
        }
    }

    pub fn scroll_up(&mut self) {
        self.answer_scroll = self.answer_scroll.saturating_sub(1);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half_page = self.answer_height / 2;
        let max_scroll = self.total_answer_lines.saturating_sub(self.answer_height);
        self.answer_scroll = (self.answer_scroll + half_page).min(max_scroll);
    }

    pub fn scroll_half_page_up(&mut self) {
        let half_page = self.answer_height / 2;
        self.answer_scroll = self.answer_scroll.saturating_sub(half_page);
    }

    pub fn scroll_to_top(&mut self) {
        self.answer_scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.answer_scroll = self.total_answer_lines.saturating_sub(self.answer_height);
    }
}

fn is_pdf(path: &std::path::Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::fs;

    fn test_app() -> (App, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let client = AgentClient::new("http://localhost:8000", None).unwrap();
        let app = App::new(client, dir.path().to_path_buf()).unwrap();
        (app, dir)
    }

    #[test]
    fn browser_lists_only_directories_and_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("papers")).unwrap();
        fs::write(dir.path().join("report.pdf"), b"%PDF-1.4").unwrap();
        fs::write(dir.path().join("SCAN.PDF"), b"%PDF-1.4").unwrap();
        fs::write(dir.path().join("notes.txt"), b"nope").unwrap();
        fs::write(dir.path().join(".hidden.pdf"), b"%PDF-1.4").unwrap();

        let client = AgentClient::new("http://localhost:8000", None).unwrap();
        let app = App::new(client, dir.path().to_path_buf()).unwrap();

        let names: Vec<&str> = app.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["papers", "report.pdf", "SCAN.PDF"]);
        assert!(app.entries[0].is_dir);
    }

    #[test]
    fn entering_a_pdf_selects_it_without_uploading() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("report.pdf"), b"%PDF-1.4").unwrap();

        let client = AgentClient::new("http://localhost:8000", None).unwrap();
        let mut app = App::new(client, dir.path().to_path_buf()).unwrap();

        app.files_enter();
        assert_eq!(
            app.selected_file.as_deref(),
            Some(dir.path().join("report.pdf").as_path())
        );
        assert!(app.in_flight.is_empty());
    }

    #[tokio::test]
    async fn upload_without_selection_notifies_and_sends_nothing() {
        let (mut app, _dir) = test_app();

        app.submit_upload();

        assert!(app.in_flight.is_empty());
        let notice = app.notice.expect("expected a notice");
        assert_eq!(notice.text, MISSING_FILE_NOTICE);
        assert_eq!(notice.level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn ask_is_issued_even_with_an_empty_query() {
        let (mut app, _dir) = test_app();

        app.submit_ask();

        assert_eq!(app.in_flight.len(), 1);
        assert!(app.is_loading());
        for request in app.in_flight.drain(..) {
            request.task.abort();
        }
    }

    #[tokio::test]
    async fn second_ask_is_ignored_while_one_is_pending() {
        let (mut app, _dir) = test_app();
        app.track(
            RequestKind::Ask,
            tokio::spawn(async { std::future::pending::<Result<String>>().await }),
        );

        app.submit_ask();

        assert_eq!(app.in_flight.len(), 1);
        for request in app.in_flight.drain(..) {
            request.task.abort();
        }
    }

    #[tokio::test]
    async fn upload_and_ask_may_be_pending_at_once() {
        let (mut app, _dir) = test_app();
        app.track(
            RequestKind::Upload,
            tokio::spawn(async { std::future::pending::<Result<String>>().await }),
        );

        app.submit_ask();

        assert_eq!(app.in_flight.len(), 2);
        // Settling one request must not clear the busy state of the other.
        let request = app.in_flight.pop().unwrap();
        request.task.abort();
        app.finish_request(RequestKind::Ask, Ok("42".to_string()));
        assert!(app.is_loading());

        for request in app.in_flight.drain(..) {
            request.task.abort();
        }
    }

    #[test]
    fn successful_ask_replaces_the_answer_verbatim() {
        let (mut app, _dir) = test_app();
        app.answer = "previous".to_string();

        app.finish_request(RequestKind::Ask, Ok("42".to_string()));

        assert_eq!(app.answer, "42");
    }

    #[test]
    fn failed_ask_prefixes_the_detail_message() {
        let (mut app, _dir) = test_app();

        app.finish_request(RequestKind::Ask, Err(anyhow!("index not found")));

        assert_eq!(app.answer, "Error: index not found");
    }

    #[test]
    fn failed_ask_prefixes_the_transport_message() {
        let (mut app, _dir) = test_app();

        app.finish_request(RequestKind::Ask, Err(anyhow!("Network Error")));

        assert_eq!(app.answer, "Error: Network Error");
    }

    #[test]
    fn upload_outcomes_surface_as_notices() {
        let (mut app, _dir) = test_app();

        app.finish_request(RequestKind::Upload, Ok("report.pdf".to_string()));
        assert_eq!(app.notice.as_ref().unwrap().text, UPLOAD_SUCCESS_NOTICE);
        assert_eq!(app.notice.as_ref().unwrap().level, NoticeLevel::Info);

        app.finish_request(RequestKind::Upload, Err(anyhow!("disk full")));
        assert_eq!(app.notice.as_ref().unwrap().text, "Upload error: disk full");
        assert_eq!(app.notice.as_ref().unwrap().level, NoticeLevel::Error);
    }

    #[test]
    fn notices_expire_after_enough_ticks() {
        let (mut app, _dir) = test_app();
        app.show_notice(NoticeLevel::Info, "done".to_string());

        for _ in 0..NOTICE_TICKS {
            app.tick();
        }

        assert!(app.notice.is_none());
    }
}
