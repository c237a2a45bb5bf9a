use crate::core::{ChatSession, Services, VideoReference};
use crate::error::{Error, ErrorKind, Result};
use crate::tui::components::{ChatView, InputField, ProgressBar};
use crate::tui::events::AppEvent;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Analyze,
    Ask,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Idle,
    /// A worker task owns the session until it reports back.
    Busy { action: Action, subject: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Url,
    Question,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn from_error(err: &Error) -> Self {
        let level = match err.kind() {
            ErrorKind::InvalidUrl | ErrorKind::InvalidInput | ErrorKind::SessionNotStarted => {
                NoticeLevel::Warning
            }
            _ => NoticeLevel::Error,
        };
        Self {
            level,
            text: err.user_message(),
        }
    }
}

/// Messages from a worker task back to the UI loop.
pub enum WorkerEvent {
    Progress(f64),
    Status(String),
    Log(String),
    Finished {
        session: ChatSession,
        action: Action,
        result: Result<()>,
    },
}

pub struct App {
    pub state: AppState,
    pub should_quit: bool,

    pub url_input: InputField,
    pub question_input: InputField,
    pub focus: Focus,

    pub chat_view: ChatView,
    pub progress_bar: ProgressBar,
    pub notice: Option<Notice>,

    // None while a worker holds it.
    session: Option<ChatSession>,
    services: Services,

    worker_tx: mpsc::UnboundedSender<WorkerEvent>,
    worker_rx: mpsc::UnboundedReceiver<WorkerEvent>,
}

impl App {
    pub fn new(services: Services) -> Self {
        let (worker_tx, worker_rx) = mpsc::unbounded_channel();
        let mut url_input = InputField::new("YouTube video URL", "https://youtu.be/...");
        url_input.focused = true;

        Self {
            state: AppState::Idle,
            should_quit: false,

            url_input,
            question_input: InputField::new("Ask a question about the video", "Analyze a video first"),
            focus: Focus::Url,

            chat_view: ChatView::new(),
            progress_bar: ProgressBar::new(),
            notice: None,

            session: Some(ChatSession::new()),
            services,

            worker_tx,
            worker_rx,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, AppState::Busy { .. })
    }

    /// Video the current conversation is about, if any.
    pub fn video_id(&self) -> Option<&str> {
        self.session.as_ref().and_then(ChatSession::video_id)
    }

    pub fn is_seeded(&self) -> bool {
        self.session.as_ref().is_some_and(ChatSession::is_seeded)
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        self.drain_worker();
        match event {
            AppEvent::Quit => {
                self.should_quit = true;
            }
            AppEvent::Key(key) => {
                self.handle_key(key);
            }
            AppEvent::Mouse(mouse) => {
                self.chat_view.handle_mouse(mouse);
            }
            AppEvent::Tick => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.chat_view.handle_key(key) {
            return;
        }
        if self.is_busy() {
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('r') if ctrl => self.on_reset(),
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab => self.toggle_focus(),
            KeyCode::Enter => match self.focus {
                Focus::Url => self.on_analyze(),
                Focus::Question => self.on_ask(),
            },
            _ => {
                match self.focus {
                    Focus::Url => self.url_input.handle_key(key),
                    Focus::Question => self.question_input.handle_key(key),
                };
            }
        }
    }

    fn drain_worker(&mut self) {
        while let Ok(event) = self.worker_rx.try_recv() {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Progress(progress) => self.progress_bar.set_progress(progress),
            WorkerEvent::Status(status) => self.progress_bar.set_message(status),
            WorkerEvent::Log(log) => self.progress_bar.add_log(log),
            WorkerEvent::Finished {
                session,
                action,
                result,
            } => self.finish(session, action, result),
        }
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.url_input.focused = focus == Focus::Url;
        self.question_input.focused = focus == Focus::Question;
    }

    fn toggle_focus(&mut self) {
        let next = match self.focus {
            Focus::Url => Focus::Question,
            Focus::Question => Focus::Url,
        };
        self.set_focus(next);
    }

    fn begin(&mut self, action: Action, subject: String) {
        self.notice = None;
        self.progress_bar.reset();
        self.progress_bar.set_message("Starting...".to_string());
        self.state = AppState::Busy { action, subject };
    }

    pub fn on_analyze(&mut self) {
        if !self.url_input.is_valid() {
            self.notice = Some(Notice::warning("Please enter a YouTube video URL."));
            return;
        }
        let video = match VideoReference::parse(&self.url_input.value) {
            Ok(video) => video,
            Err(e) => {
                self.notice = Some(Notice::from_error(&e));
                return;
            }
        };
        let Some(session) = self.session.take() else {
            return;
        };

        info!(video_id = %video, "analyze requested");
        self.begin(Action::Analyze, format!("Video: {}", video.watch_url()));

        let services = self.services.clone();
        let tx = self.worker_tx.clone();
        self.spawn_worker(Action::Analyze, run_analyze(services, session, video, tx));
    }

    pub fn on_ask(&mut self) {
        if !self.question_input.is_valid() {
            self.notice = Some(Notice::from_error(&Error::InvalidInput(
                "Question cannot be empty".to_string(),
            )));
            return;
        }
        if !self.is_seeded() {
            self.notice = Some(Notice::from_error(&Error::SessionNotStarted));
            return;
        }
        let Some(session) = self.session.take() else {
            return;
        };

        let question = self.question_input.take();
        debug!(chars = question.len(), "question submitted");
        self.chat_view.set_pending(question.clone());
        self.begin(Action::Ask, format!("Question: {question}"));

        let tx = self.worker_tx.clone();
        self.spawn_worker(Action::Ask, run_ask(session, question, tx));
    }

    /// Runs `work` on its own task. If that task dies without reporting back,
    /// a `Finished` event with an empty session is sent in its place.
    fn spawn_worker<F>(&self, action: Action, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let tx = self.worker_tx.clone();
        let handle = tokio::spawn(work);
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                error!(error = %e, ?action, "worker task aborted");
                let _ = tx.send(WorkerEvent::Finished {
                    session: ChatSession::new(),
                    action,
                    result: Err(Error::custom(format!("Background task failed: {e}"))),
                });
            }
        });
    }

    pub fn on_reset(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.reset();
        }
        self.chat_view.clear();
        self.question_input.clear();
        self.set_focus(Focus::Url);
        self.notice = Some(Notice::info("Session reset."));
        info!("session reset");
    }

    fn finish(&mut self, session: ChatSession, action: Action, result: Result<()>) {
        self.chat_view.sync(&session);
        self.session = Some(session);
        self.state = AppState::Idle;
        self.progress_bar.reset();

        match result {
            Ok(()) => {
                self.notice = None;
                if action == Action::Analyze {
                    self.set_focus(Focus::Question);
                }
            }
            Err(e) => {
                self.notice = Some(Notice::from_error(&e));
            }
        }
    }
}

async fn run_analyze(
    services: Services,
    mut session: ChatSession,
    video: VideoReference,
    tx: mpsc::UnboundedSender<WorkerEvent>,
) {
    let result = analyze(&services, &mut session, &video, &tx).await;
    let _ = tx.send(WorkerEvent::Finished {
        session,
        action: Action::Analyze,
        result,
    });
}

async fn analyze(
    services: &Services,
    session: &mut ChatSession,
    video: &VideoReference,
    tx: &mpsc::UnboundedSender<WorkerEvent>,
) -> Result<()> {
    let _ = tx.send(WorkerEvent::Status("Fetching transcript...".to_string()));
    let _ = tx.send(WorkerEvent::Progress(0.2));

    let transcript = services.resolver.resolve_video(video).await?;
    let _ = tx.send(WorkerEvent::Log(format!(
        "Fetched '{}' transcript ({} words)",
        transcript.language_code,
        transcript.word_count()
    )));

    let _ = tx.send(WorkerEvent::Status("Generating outline...".to_string()));
    let _ = tx.send(WorkerEvent::Progress(0.5));

    services.start_session(session, &transcript).await?;

    let _ = tx.send(WorkerEvent::Progress(1.0));
    let _ = tx.send(WorkerEvent::Log("Outline ready".to_string()));
    Ok(())
}

async fn run_ask(
    mut session: ChatSession,
    question: String,
    tx: mpsc::UnboundedSender<WorkerEvent>,
) {
    let _ = tx.send(WorkerEvent::Status("Waiting for answer...".to_string()));
    let _ = tx.send(WorkerEvent::Progress(0.5));

    let result = session.ask(&question).await.map(|_| ());
    let _ = tx.send(WorkerEvent::Finished {
        session,
        action: Action::Ask,
        result,
    });
}
