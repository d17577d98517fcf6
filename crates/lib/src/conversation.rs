//! Conversation state: the message log, typing/error flags, bot and session, and the watchdog.
//!
//! This type does no I/O. Network calls are split into `begin_*` (build the request, update
//! flags) and `complete_*` (apply the result). Every mutation queues `WidgetEvent`s that the
//! owner drains with `drain_events`.

use crate::audio::SynthesizedAudio;
use crate::bots::{BotConfig, BotType};
use crate::config::{Config, InactivityConfig};
use crate::gateway::{BotBackend, ChatRequest, ChatResponse, GatewayError};
use crate::message::{self, Message};
use crate::session::{SessionId, SessionManager};
use crate::watchdog::{InactivityWatchdog, WatchdogEvent, WatchdogState};
use tokio::time::Instant;

pub const SOURCES_LABEL: &str = "📚 Sources consulted: ";
pub const COMPLETION_TEXT: &str = "Thank you for using our service! Your quote has been processed.";
pub const APOLOGY_TEXT: &str =
    "Sorry, something went wrong while processing your message. Please try again.";
pub const INACTIVITY_CLOSED_TEXT: &str =
    "This chat has been closed due to inactivity. Open it again whenever you need us.";
pub const TRANSCRIPTION_FAILED_TEXT: &str = "Could not transcribe the audio. Please try again.";
pub const AUDIO_ERROR_TEXT: &str = "Error processing the audio. Please try again.";
pub const MICROPHONE_UNSUPPORTED_TEXT: &str = "Audio recording is not available on this device.";
pub const BUSY_TEXT: &str = "Please wait for the current reply before sending another message.";
pub const MICROPHONE_ACCESS_TEXT: &str =
    "Could not access the microphone. Please check your permissions.";

/// Something the view should reflect.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    ChatOpened { bot: BotType },
    /// Window hidden; log and session kept (toggle or minimize).
    ChatHidden,
    /// Window closed; log cleared and session rotated.
    ChatClosed,
    BotSwitched { bot: BotType },
    SessionRotated { session_id: SessionId },
    MessageAppended(Message),
    MessagesReset(Vec<Message>),
    TypingChanged(bool),
    InactivityWarning { seconds_left: u64 },
    Countdown { seconds_left: u64 },
    WarningCleared,
    /// Immediate user-facing notice, not part of the log.
    Notice(String),
    RecordingChanged(bool),
    Speech(SynthesizedAudio),
}

/// An issued chat request, tied to the session it was sent under.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub request: ChatRequest,
}

impl ChatTurn {
    pub fn session_id(&self) -> &str {
        &self.request.session_id
    }
}

/// An issued transcription, tied to the session it was started under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionTicket {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Reply(SessionId),
    Transcription(SessionId),
}

pub struct Conversation {
    bot: BotType,
    open: bool,
    messages: Vec<Message>,
    typing: bool,
    error: bool,
    session: SessionManager,
    watchdog: InactivityWatchdog,
    pending: Option<Pending>,
    timestamps: bool,
    outbox: Vec<WidgetEvent>,
}

impl Conversation {
    /// New closed conversation with a fresh session and the bot's welcome message.
    pub fn new(bot: BotType, timing: InactivityConfig) -> Self {
        Self {
            bot,
            open: false,
            messages: vec![welcome(bot)],
            typing: false,
            error: false,
            session: SessionManager::new(),
            watchdog: InactivityWatchdog::new(timing),
            pending: None,
            timestamps: false,
            outbox: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.widget.default_bot, config.inactivity)
            .with_timestamps(config.widget.enable_timestamps)
    }

    /// Stamp user messages with the send time.
    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    pub fn bot(&self) -> BotType {
        self.bot
    }

    pub fn bot_config(&self) -> &'static BotConfig {
        self.bot.config()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    pub fn session_id(&self) -> &str {
        self.session.current()
    }

    pub fn watchdog(&self) -> &InactivityWatchdog {
        &self.watchdog
    }

    pub fn is_warning(&self) -> bool {
        self.watchdog.is_warning()
    }

    pub fn countdown(&self) -> u64 {
        self.watchdog.countdown()
    }

    /// Plain-text rendering of the current log.
    pub fn transcript(&self) -> String {
        message::transcript(&self.messages)
    }

    /// Take all queued events.
    pub fn drain_events(&mut self) -> Vec<WidgetEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Queue a user-facing notice.
    pub fn notify(&mut self, text: impl Into<String>) {
        self.outbox.push(WidgetEvent::Notice(text.into()));
    }

    pub(crate) fn emit(&mut self, event: WidgetEvent) {
        self.outbox.push(event);
    }

    /// Activate `bot` and open a fresh conversation with it.
    ///
    /// No-op when `bot` is already active and the chat is open.
    pub fn switch_bot(&mut self, bot: BotType) {
        if self.bot == bot && self.open {
            log::debug!("switch_bot: {} already active and open", bot);
            return;
        }
        if self.bot != bot && self.open {
            self.open = false;
            self.watchdog.disarm();
        }
        self.bot = bot;
        self.start_new_session();
        self.pending = None;
        self.set_typing(false);
        self.error = false;
        self.reset_log(vec![welcome(bot)]);
        self.open = true;
        log::info!("bot switched to {}, chat opened", bot);
        self.emit(WidgetEvent::BotSwitched { bot });
        self.emit(WidgetEvent::ChatOpened { bot });
        self.watchdog.arm(Instant::now());
    }

    /// Flip visibility. Opening seeds the welcome message into an empty log and arms the watchdog;
    /// hiding disarms it.
    pub fn toggle_chat(&mut self) {
        self.open = !self.open;
        if self.open {
            if self.messages.is_empty() {
                self.reset_log(vec![welcome(self.bot)]);
            }
            self.emit(WidgetEvent::ChatOpened { bot: self.bot });
            self.watchdog.arm(Instant::now());
        } else {
            self.disarm_watchdog();
            self.emit(WidgetEvent::ChatHidden);
        }
    }

    /// Hide the window keeping `messages` as the log. Session is kept.
    pub fn minimize_chat(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.open = false;
        self.disarm_watchdog();
        log::debug!("chat minimized ({} messages kept)", self.messages.len());
        self.emit(WidgetEvent::ChatHidden);
    }

    /// Hide the window keeping the current log.
    pub fn minimize(&mut self) {
        let messages = std::mem::take(&mut self.messages);
        self.minimize_chat(messages);
    }

    /// End the conversation: clear the log, hide the window, disarm, start a new session.
    pub fn close_chat(&mut self) {
        self.reset_log(Vec::new());
        self.open = false;
        self.disarm_watchdog();
        self.pending = None;
        self.set_typing(false);
        self.start_new_session();
        log::info!("chat closed, new session {}", self.session.current());
        self.emit(WidgetEvent::ChatClosed);
    }

    /// User confirmed they are still there.
    pub fn keep_active(&mut self) {
        let was_warning = self.watchdog.is_warning();
        if self.watchdog.keep_active(Instant::now()) && was_warning {
            self.emit(WidgetEvent::WarningCleared);
        }
    }

    /// Any user-originated event: restart the inactivity deadlines.
    pub fn register_activity(&mut self) {
        let was_warning = self.watchdog.is_warning();
        if self.watchdog.reset_on_activity(Instant::now()) && was_warning {
            self.emit(WidgetEvent::WarningCleared);
        }
    }

    /// Append the user's message and build the chat request.
    ///
    /// Returns None for blank input or while a reply or transcription is still pending.
    pub fn begin_send(&mut self, text: &str) -> Option<ChatTurn> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some(pending) = &self.pending {
            log::debug!("begin_send: {:?} still pending, ignoring input", pending);
            return None;
        }
        self.append(self.user_message(text));
        Some(self.submit(text))
    }

    fn submit(&mut self, text: &str) -> ChatTurn {
        self.set_typing(true);
        self.error = false;
        self.register_activity();
        let request = ChatRequest {
            session_id: self.session.current().to_string(),
            bot_id: self.bot.id().to_string(),
            message: text.to_string(),
        };
        self.pending = Some(Pending::Reply(request.session_id.clone()));
        log::debug!("chat turn issued for session {}", request.session_id);
        ChatTurn { request }
    }

    /// Apply a chat result. Results for a session that is no longer current are discarded
    /// (returns false).
    pub fn complete_send(
        &mut self,
        turn: &ChatTurn,
        result: Result<ChatResponse, GatewayError>,
    ) -> bool {
        if !self.session.is_current(turn.session_id()) {
            log::info!(
                "discarding reply for stale session {} (current {})",
                turn.session_id(),
                self.session.current()
            );
            return false;
        }
        self.pending = None;
        self.set_typing(false);
        match result {
            Ok(res) => {
                self.append(Message::bot(res.response.clone()));
                if self.bot == BotType::Faq {
                    if let Some(sources) = res.sources() {
                        self.append(Message::bot(format!("{}{}", SOURCES_LABEL, sources)));
                    }
                }
                if res.is_complete {
                    self.append(Message::bot(COMPLETION_TEXT));
                }
            }
            Err(e) => {
                log::error!("chat send failed: {}", e);
                self.error = true;
                self.append(Message::error(APOLOGY_TEXT));
            }
        }
        true
    }

    /// Send `text` through `backend` and apply the reply. Returns true if a request was made.
    pub async fn send_user_message(&mut self, backend: &dyn BotBackend, text: &str) -> bool {
        let Some(turn) = self.begin_send(text) else {
            return false;
        };
        let result = backend.send_message(&turn.request).await;
        self.complete_send(&turn, result);
        true
    }

    /// True while a chat reply or a transcription is outstanding.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Recording stopped: show the typing indicator while the clip is transcribed.
    ///
    /// Returns None while a reply or another transcription is still pending; at most one
    /// request is outstanding at a time.
    pub fn begin_transcription(&mut self) -> Option<TranscriptionTicket> {
        if let Some(pending) = &self.pending {
            log::debug!("begin_transcription: {:?} still pending, dropping clip", pending);
            return None;
        }
        self.set_typing(true);
        let session_id = self.session.current().to_string();
        self.pending = Some(Pending::Transcription(session_id.clone()));
        Some(TranscriptionTicket { session_id })
    }

    /// Apply a transcription. A usable transcript is appended as the user's message and sent on.
    pub fn complete_transcription(
        &mut self,
        ticket: &TranscriptionTicket,
        result: Result<String, GatewayError>,
    ) -> Option<ChatTurn> {
        if !self.session.is_current(&ticket.session_id) {
            log::info!("discarding transcript for stale session {}", ticket.session_id);
            return None;
        }
        self.pending = None;
        match result {
            Ok(text) if !text.trim().is_empty() => {
                let text = text.trim();
                self.append(self.user_message(text));
                Some(self.submit(text))
            }
            Ok(_) => {
                self.set_typing(false);
                self.notify(TRANSCRIPTION_FAILED_TEXT);
                None
            }
            Err(GatewayError::Recognition(reason)) => {
                log::warn!("transcription rejected: {}", reason);
                self.set_typing(false);
                self.notify(TRANSCRIPTION_FAILED_TEXT);
                None
            }
            Err(e) => {
                log::error!("speech-to-text failed: {}", e);
                self.set_typing(false);
                self.notify(AUDIO_ERROR_TEXT);
                None
            }
        }
    }

    /// Earliest watchdog deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.watchdog.next_deadline()
    }

    /// Run watchdog deadlines due now and apply their effects.
    pub fn on_timer(&mut self) {
        let events = self.watchdog.poll(Instant::now(), self.open);
        for event in events {
            match event {
                WatchdogEvent::WarningStarted { seconds_left } => {
                    log::info!("inactivity warning: closing in {}s", seconds_left);
                    self.emit(WidgetEvent::InactivityWarning { seconds_left });
                }
                WatchdogEvent::CountdownTick { seconds_left } => {
                    self.emit(WidgetEvent::Countdown { seconds_left });
                }
                WatchdogEvent::TimedOut => {
                    self.append(Message::bot(INACTIVITY_CLOSED_TEXT));
                }
                WatchdogEvent::CloseDue => {
                    self.emit(WidgetEvent::WarningCleared);
                    log::info!("closing chat after inactivity");
                    self.close_chat();
                }
            }
        }
    }

    /// Drop all timers and pending work (widget shutdown).
    pub fn teardown(&mut self) {
        self.disarm_watchdog();
        self.pending = None;
    }

    pub fn watchdog_state(&self) -> WatchdogState {
        self.watchdog.state()
    }

    fn disarm_watchdog(&mut self) {
        let was_warning = self.watchdog.is_warning();
        self.watchdog.disarm();
        if was_warning {
            self.emit(WidgetEvent::WarningCleared);
        }
    }

    fn start_new_session(&mut self) {
        let session_id = self.session.rotate();
        self.emit(WidgetEvent::SessionRotated { session_id });
    }

    fn user_message(&self, text: &str) -> Message {
        let m = Message::user(text);
        if self.timestamps {
            m.with_timestamp(chrono::Utc::now())
        } else {
            m
        }
    }

    fn append(&mut self, m: Message) {
        self.messages.push(m.clone());
        self.emit(WidgetEvent::MessageAppended(m));
    }

    fn reset_log(&mut self, messages: Vec<Message>) {
        self.messages = messages.clone();
        self.emit(WidgetEvent::MessagesReset(messages));
    }

    fn set_typing(&mut self, typing: bool) {
        if self.typing != typing {
            self.typing = typing;
            self.emit(WidgetEvent::TypingChanged(typing));
        }
    }
}

fn welcome(bot: BotType) -> Message {
    Message::bot(bot.config().welcome_message)
}
