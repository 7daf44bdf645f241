use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::input::InputBuffer;
use crate::stream::{StreamMessage, StreamParams, StreamService};
use crate::theme::Theme;

/// Assistant content shown when the transport fails. Replaces any partial
/// output wholesale.
pub const CONNECT_ERROR_MESSAGE: &str = "Error connecting to server.";

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// The single turn held by the app: the last user message, the accumulating
/// assistant message, and whether generation is still running. A new
/// submission overwrites both messages.
#[derive(Debug, Default)]
pub struct Conversation {
    pub user: Option<ChatMessage>,
    pub assistant: Option<ChatMessage>,
    pub generating: bool,
}

impl Conversation {
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.assistant.is_none()
    }

    /// Begin a new turn. Rejects blank text and rejects while a turn is
    /// already generating; the caller keeps the draft in both cases.
    pub fn submit(&mut self, text: &str) -> bool {
        if text.trim().is_empty() || self.generating {
            return false;
        }

        self.user = Some(ChatMessage {
            role: ChatRole::User,
            content: text.to_string(),
        });
        self.assistant = Some(ChatMessage {
            role: ChatRole::Assistant,
            content: String::new(),
        });
        self.generating = true;
        true
    }

    pub fn append_chunk(&mut self, chunk: &str) {
        if !self.generating {
            return;
        }
        if let Some(assistant) = &mut self.assistant {
            assistant.content.push_str(chunk);
        }
    }

    /// End of stream: everything accumulated so far stays.
    pub fn complete(&mut self) {
        self.generating = false;
    }

    /// User stop: partial content stays.
    pub fn cancel(&mut self) {
        self.generating = false;
    }

    /// Transport failure: partial content is replaced with the fixed message.
    pub fn fail(&mut self) {
        if let Some(assistant) = &mut self.assistant {
            assistant.content = CONNECT_ERROR_MESSAGE.to_string();
        }
        self.generating = false;
    }
}

pub struct App {
    pub should_quit: bool,
    pub conversation: Conversation,
    pub input: InputBuffer,
    pub theme: Theme,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Chat viewport (dimensions updated during render)
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    // Stream plumbing: one stream per turn, identified by stream_id.
    // Messages tagged with a stale id are dropped.
    client: reqwest::Client,
    base_url: String,
    stream: StreamService,
    cancel_token: Option<CancellationToken>,
    stream_id: u64,
}

impl App {
    pub fn new(config: &Config, stream: StreamService) -> Self {
        Self {
            should_quit: false,
            conversation: Conversation::default(),
            input: InputBuffer::default(),
            theme: Theme::detect(),

            animation_frame: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            client: reqwest::Client::new(),
            base_url: config.resolve_base_url(),
            stream,
            cancel_token: None,
            stream_id: 0,
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Submit the composer draft: no-op while generating or when the draft
    /// trims to empty, otherwise start the turn and spawn the stream.
    pub fn submit_input(&mut self) {
        if self.conversation.generating || self.input.is_blank() {
            return;
        }

        let text = self.input.take();
        if !self.conversation.submit(&text) {
            return;
        }

        self.stream_id += 1;
        let token = CancellationToken::new();
        self.stream.spawn_stream(StreamParams {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            prompt: text,
            cancel_token: token.clone(),
            stream_id: self.stream_id,
        });
        self.cancel_token = Some(token);
        self.scroll_chat_to_bottom();
    }

    /// Stop the in-flight turn. Accumulated content stays; chunks already in
    /// flight are dropped by the stale-id/generating guard.
    pub fn stop_generation(&mut self) {
        if !self.conversation.generating {
            return;
        }
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.conversation.cancel();
    }

    pub fn on_stream_message(&mut self, message: StreamMessage, stream_id: u64) {
        if stream_id != self.stream_id || !self.conversation.generating {
            return;
        }

        match message {
            StreamMessage::Chunk(text) => {
                self.conversation.append_chunk(&text);
                self.scroll_chat_to_bottom();
            }
            StreamMessage::End => {
                self.conversation.complete();
                self.cancel_token = None;
            }
            StreamMessage::Error => {
                self.conversation.fail();
                self.cancel_token = None;
            }
        }
    }

    pub fn toggle_theme(&mut self) {
        self.theme.toggle();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.generating {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat viewport scrolling

    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_chat_down(&mut self) {
        let max_scroll = self.chat_line_count().saturating_sub(self.chat_height);
        self.chat_scroll = self.chat_scroll.saturating_add(1).min(max_scroll);
    }

    /// Pin the viewport to the bottom so the newest content stays visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        let total = self.chat_line_count();
        let visible = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.chat_scroll = total.saturating_sub(visible);
    }

    /// Wrapped line count of the chat transcript, mirroring how the renderer
    /// lays it out.
    fn chat_line_count(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total: u16 = 0;

        for message in [&self.conversation.user, &self.conversation.assistant]
            .into_iter()
            .flatten()
        {
            if message.content.is_empty() {
                continue;
            }
            total += 1; // Role line ("You:" or "AI:")
            for line in message.content.lines() {
                total += (line.chars().count() / wrap_width + 1) as u16;
            }
            total += 1; // Blank line after message
        }

        if self.conversation.generating {
            total += 2; // Thinking indicator and its stop hint
        }

        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        let (stream, _rx) = StreamService::new();
        App::new(&Config::new(), stream)
    }

    #[test]
    fn blank_submit_is_a_noop() {
        let mut conversation = Conversation::default();
        assert!(!conversation.submit(""));
        assert!(!conversation.submit("   "));
        assert!(conversation.is_empty());
        assert!(!conversation.generating);
    }

    #[test]
    fn submit_keeps_raw_text_exactly() {
        let mut conversation = Conversation::default();
        assert!(conversation.submit("  hello   world  "));
        assert_eq!(
            conversation.user.as_ref().unwrap().content,
            "  hello   world  "
        );
        assert_eq!(conversation.assistant.as_ref().unwrap().content, "");
        assert!(conversation.generating);
    }

    #[test]
    fn submit_while_generating_is_rejected() {
        let mut conversation = Conversation::default();
        assert!(conversation.submit("first"));
        assert!(!conversation.submit("second"));
        assert_eq!(conversation.user.as_ref().unwrap().content, "first");
    }

    #[test]
    fn chunks_accumulate_in_order() {
        let mut conversation = Conversation::default();
        conversation.submit("hi");

        conversation.append_chunk("Hel");
        conversation.append_chunk("lo, ");
        assert_eq!(conversation.assistant.as_ref().unwrap().content, "Hello, ");

        conversation.append_chunk("world");
        conversation.complete();
        assert_eq!(
            conversation.assistant.as_ref().unwrap().content,
            "Hello, world"
        );
        assert!(!conversation.generating);
    }

    #[test]
    fn cancel_keeps_partial_content() {
        let mut app = test_app();
        app.conversation.submit("hi");
        app.on_stream_message(StreamMessage::Chunk("Hel".to_string()), 0);

        app.stop_generation();
        assert!(!app.conversation.generating);
        assert_eq!(app.conversation.assistant.as_ref().unwrap().content, "Hel");

        // A chunk already in flight when the user pressed stop.
        app.on_stream_message(StreamMessage::Chunk("lo, world".to_string()), 0);
        assert_eq!(app.conversation.assistant.as_ref().unwrap().content, "Hel");
    }

    #[test]
    fn error_replaces_partial_content_wholesale() {
        let mut app = test_app();
        app.conversation.submit("hi");
        app.on_stream_message(StreamMessage::Chunk("partial".to_string()), 0);
        app.on_stream_message(StreamMessage::Error, 0);

        assert!(!app.conversation.generating);
        assert_eq!(
            app.conversation.assistant.as_ref().unwrap().content,
            CONNECT_ERROR_MESSAGE
        );
    }

    #[test]
    fn stale_stream_id_is_discarded() {
        let mut app = test_app();
        app.conversation.submit("hi");

        app.on_stream_message(StreamMessage::Chunk("old".to_string()), 99);
        assert_eq!(app.conversation.assistant.as_ref().unwrap().content, "");

        app.on_stream_message(StreamMessage::Error, 99);
        assert!(app.conversation.generating);
    }

    #[test]
    fn full_turn_from_submit_to_completion() {
        let mut app = test_app();
        app.conversation.submit("Hi");
        assert_eq!(app.conversation.user.as_ref().unwrap().content, "Hi");
        assert_eq!(app.conversation.assistant.as_ref().unwrap().content, "");
        assert!(app.conversation.generating);

        for chunk in ["He", "llo", "!"] {
            app.on_stream_message(StreamMessage::Chunk(chunk.to_string()), 0);
        }
        app.on_stream_message(StreamMessage::End, 0);

        assert_eq!(app.conversation.assistant.as_ref().unwrap().content, "Hello!");
        assert!(!app.conversation.generating);
    }

    #[test]
    fn late_messages_after_completion_are_ignored() {
        let mut app = test_app();
        app.conversation.submit("hi");
        app.on_stream_message(StreamMessage::End, 0);

        app.on_stream_message(StreamMessage::Chunk("late".to_string()), 0);
        assert_eq!(app.conversation.assistant.as_ref().unwrap().content, "");
    }

    #[tokio::test]
    async fn submitting_draft_clears_input_and_starts_turn() {
        let mut app = test_app();
        for c in "Hi there".chars() {
            app.input.insert(c);
        }

        app.submit_input();
        assert_eq!(app.input.text(), "");
        assert_eq!(app.conversation.user.as_ref().unwrap().content, "Hi there");
        assert!(app.conversation.generating);
    }

    #[test]
    fn busy_submit_keeps_the_draft() {
        let mut app = test_app();
        app.conversation.submit("first");
        for c in "second".chars() {
            app.input.insert(c);
        }

        app.submit_input();
        assert_eq!(app.input.text(), "second");
        assert_eq!(app.conversation.user.as_ref().unwrap().content, "first");
    }

    #[test]
    fn blank_draft_submit_does_nothing() {
        let mut app = test_app();
        for c in "   ".chars() {
            app.input.insert(c);
        }

        app.submit_input();
        assert!(app.conversation.is_empty());
        assert_eq!(app.input.text(), "   ");
    }

    #[test]
    fn animation_only_advances_while_generating() {
        let mut app = test_app();
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);

        app.conversation.submit("hi");
        app.tick_animation();
        assert_eq!(app.animation_frame, 1);
    }
}
