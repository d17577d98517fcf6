//! Widget driver: runs a `Conversation` against a live backend.
//!
//! One task owns the conversation. Commands arrive on an mpsc channel, network calls run on
//! spawned tasks that post their results back, and the next watchdog deadline is a
//! `sleep_until` branch of the same `select!`.

use crate::audio::{AudioRecorder, RecordedAudio, SynthesizedAudio, UnsupportedRecorder};
use crate::bots::BotType;
use crate::config::{Config, SpeechConfig};
use crate::conversation::{
    ChatTurn, Conversation, TranscriptionTicket, WidgetEvent, AUDIO_ERROR_TEXT, BUSY_TEXT,
    MICROPHONE_ACCESS_TEXT, MICROPHONE_UNSUPPORTED_TEXT,
};
use crate::gateway::{BotBackend, ChatResponse, GatewayError};
use crate::session::SessionId;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// User actions forwarded to the widget.
#[derive(Debug)]
pub enum WidgetCommand {
    Send(String),
    ToggleChat,
    SwitchBot(BotType),
    Minimize,
    Close,
    /// "I'm still here" on the inactivity warning.
    KeepActive,
    /// Microphone button: start recording, or stop and transcribe.
    Microphone,
    /// Request a plain-text transcript of the current log.
    Transcript(oneshot::Sender<String>),
    Shutdown,
}

enum Completion {
    Reply(ChatTurn, Result<ChatResponse, GatewayError>),
    Transcription(TranscriptionTicket, Result<String, GatewayError>),
    Speech(SessionId, Result<SynthesizedAudio, GatewayError>),
}

pub struct ChatWidget {
    conversation: Conversation,
    backend: Arc<dyn BotBackend>,
    recorder: Box<dyn AudioRecorder>,
    speech: SpeechConfig,
    microphone: bool,
}

impl ChatWidget {
    pub fn new(conversation: Conversation, backend: Arc<dyn BotBackend>) -> Self {
        Self {
            conversation,
            backend,
            recorder: Box::new(UnsupportedRecorder),
            speech: SpeechConfig::default(),
            microphone: true,
        }
    }

    pub fn from_config(config: &Config, backend: Arc<dyn BotBackend>) -> Self {
        let mut widget = Self::new(Conversation::from_config(config), backend)
            .with_speech(config.speech.clone());
        widget.microphone = config.widget.enable_microphone;
        widget
    }

    pub fn with_recorder(mut self, recorder: Box<dyn AudioRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_speech(mut self, speech: SpeechConfig) -> Self {
        self.speech = speech;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Process commands until `Shutdown` or the command channel closes. Returns the final
    /// conversation state after teardown.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<WidgetCommand>,
        events: mpsc::UnboundedSender<WidgetEvent>,
    ) -> Conversation {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
        log::info!(
            "chat widget started (bot {}, session {})",
            self.conversation.bot(),
            self.conversation.session_id()
        );

        loop {
            self.flush(&events);
            let deadline = self.conversation.next_deadline();
            tokio::select! {
                biased;
                cmd = commands.recv() => match cmd {
                    None | Some(WidgetCommand::Shutdown) => break,
                    Some(cmd) => self.handle(cmd, &done_tx),
                },
                Some(done) = done_rx.recv() => self.complete(done, &done_tx),
                _ = sleep_until(deadline) => self.conversation.on_timer(),
            }
        }

        self.recorder.cancel();
        self.conversation.teardown();
        self.flush(&events);
        log::info!("chat widget stopped");
        self.conversation
    }

    fn handle(&mut self, cmd: WidgetCommand, done: &mpsc::UnboundedSender<Completion>) {
        log::debug!("widget command: {:?}", cmd);
        match cmd {
            WidgetCommand::Send(text) => {
                if let Some(turn) = self.conversation.begin_send(&text) {
                    self.spawn_reply(turn, done);
                }
            }
            WidgetCommand::ToggleChat => {
                if self.conversation.is_open() {
                    self.stop_recording();
                }
                self.conversation.toggle_chat();
            }
            WidgetCommand::SwitchBot(bot) => {
                self.stop_recording();
                self.conversation.switch_bot(bot);
            }
            WidgetCommand::Minimize => {
                self.stop_recording();
                self.conversation.minimize();
            }
            WidgetCommand::Close => {
                self.stop_recording();
                self.conversation.close_chat();
            }
            WidgetCommand::KeepActive => self.conversation.keep_active(),
            WidgetCommand::Microphone => self.toggle_microphone(done),
            WidgetCommand::Transcript(reply) => {
                let _ = reply.send(self.conversation.transcript());
            }
            WidgetCommand::Shutdown => {}
        }
    }

    fn complete(&mut self, done: Completion, tx: &mpsc::UnboundedSender<Completion>) {
        match done {
            Completion::Reply(turn, result) => {
                let speak = match &result {
                    Ok(res) if self.speech.speak_responses && !res.response.trim().is_empty() => {
                        Some(res.response.clone())
                    }
                    _ => None,
                };
                if self.conversation.complete_send(&turn, result) {
                    if let Some(text) = speak {
                        self.spawn_speech(text, tx);
                    }
                }
            }
            Completion::Transcription(ticket, result) => {
                if let Some(turn) = self.conversation.complete_transcription(&ticket, result) {
                    self.spawn_reply(turn, tx);
                }
            }
            Completion::Speech(session_id, result) => {
                if self.conversation.session_id() != session_id {
                    log::debug!("dropping speech for stale session {}", session_id);
                    return;
                }
                match result {
                    Ok(audio) => self.conversation.emit(WidgetEvent::Speech(audio)),
                    Err(e) => log::warn!("text-to-speech failed: {}", e),
                }
            }
        }
    }

    fn toggle_microphone(&mut self, done: &mpsc::UnboundedSender<Completion>) {
        self.conversation.register_activity();
        if !self.microphone || !self.recorder.is_supported() {
            self.conversation.notify(MICROPHONE_UNSUPPORTED_TEXT);
            return;
        }
        if self.recorder.is_recording() {
            self.conversation.emit(WidgetEvent::RecordingChanged(false));
            match self.recorder.stop() {
                Ok(audio) => match self.conversation.begin_transcription() {
                    Some(ticket) => self.spawn_transcription(ticket, audio, done),
                    None => self.conversation.notify(BUSY_TEXT),
                },
                Err(e) => {
                    log::error!("stopping recording failed: {}", e);
                    self.conversation.notify(AUDIO_ERROR_TEXT);
                }
            }
        } else {
            match self.recorder.start() {
                Ok(()) => self.conversation.emit(WidgetEvent::RecordingChanged(true)),
                Err(e) => {
                    log::error!("starting recording failed: {}", e);
                    self.conversation.notify(MICROPHONE_ACCESS_TEXT);
                }
            }
        }
    }

    fn stop_recording(&mut self) {
        if self.recorder.is_recording() {
            self.recorder.cancel();
            self.conversation.emit(WidgetEvent::RecordingChanged(false));
        }
    }

    fn spawn_reply(&self, turn: ChatTurn, done: &mpsc::UnboundedSender<Completion>) {
        let backend = Arc::clone(&self.backend);
        let done = done.clone();
        tokio::spawn(async move {
            let result = backend.send_message(&turn.request).await;
            let _ = done.send(Completion::Reply(turn, result));
        });
    }

    fn spawn_transcription(
        &self,
        ticket: TranscriptionTicket,
        audio: RecordedAudio,
        done: &mpsc::UnboundedSender<Completion>,
    ) {
        let backend = Arc::clone(&self.backend);
        let speech = self.speech.clone();
        let done = done.clone();
        tokio::spawn(async move {
            let result = backend.transcribe(&audio, &speech).await;
            let _ = done.send(Completion::Transcription(ticket, result));
        });
    }

    fn spawn_speech(&self, text: String, done: &mpsc::UnboundedSender<Completion>) {
        let backend = Arc::clone(&self.backend);
        let speech = self.speech.clone();
        let session_id = self.conversation.session_id().to_string();
        let done = done.clone();
        tokio::spawn(async move {
            let result = backend.synthesize(&text, &speech).await;
            let _ = done.send(Completion::Speech(session_id, result));
        });
    }

    fn flush(&mut self, events: &mpsc::UnboundedSender<WidgetEvent>) {
        for event in self.conversation.drain_events() {
            if events.send(event).is_err() {
                log::debug!("event receiver dropped");
                break;
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
