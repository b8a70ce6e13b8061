use ratatui::layout::Rect;
use parley_core::{parse, Conversation, ConversationEvent, Role, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub conversation: Conversation,
    pub model: String,
    pub input_cursor: usize, // cursor position in the draft, in chars

    // Chat viewport (dimensions updated during render)
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub total_chat_lines: u16,
    pub follow_tail: bool,
    pub chat_area: Option<Rect>,

    // Code block selection for copying
    pub selected_block: Option<usize>,
    pub block_offsets: Vec<u16>, // first chat line of each code block, from the last render

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(conversation: Conversation, model: String) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            conversation,
            model,
            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            total_chat_lines: 0,
            follow_tail: true,
            chat_area: None,

            selected_block: None,
            block_offsets: Vec::new(),

            animation_frame: 0,
        }
    }

    pub fn apply(&mut self, event: ConversationEvent) {
        let before = self.conversation.messages().len();
        self.conversation.apply(event);
        if self.conversation.messages().len() != before {
            self.follow_tail = true;
        }
    }

    /// Send the draft; the controller ignores blank or overlapping submissions
    pub fn submit(&mut self) {
        if self.conversation.submit_draft().is_some() {
            self.input_cursor = 0;
            self.follow_tail = true;
        }
    }

    /// Contents of every code block in the conversation, in display order
    pub fn code_blocks(&self) -> Vec<String> {
        self.conversation
            .messages()
            .iter()
            .filter(|m| m.role() == Role::Assistant)
            .flat_map(|m| parse(m.content()))
            .filter_map(|segment| match segment {
                Segment::Code { content, .. } => Some(content),
                Segment::Prose(_) => None,
            })
            .collect()
    }

    pub fn select_next_block(&mut self) {
        let count = self.code_blocks().len();
        if count == 0 {
            self.selected_block = None;
            return;
        }
        self.selected_block = Some(match self.selected_block {
            Some(i) if i + 1 < count => i + 1,
            _ => 0,
        });
        self.scroll_to_selected_block();
    }

    pub fn select_prev_block(&mut self) {
        let count = self.code_blocks().len();
        if count == 0 {
            self.selected_block = None;
            return;
        }
        self.selected_block = Some(match self.selected_block {
            Some(i) if i > 0 && i <= count => i - 1,
            _ => count - 1,
        });
        self.scroll_to_selected_block();
    }

    pub fn clear_selection(&mut self) {
        self.selected_block = None;
    }

    /// Copy the selected code block, or the most recent one when none is selected
    pub fn copy_selected_block(&mut self) -> bool {
        let blocks = self.code_blocks();
        let index = match self.selected_block {
            Some(i) if i < blocks.len() => i,
            _ if !blocks.is_empty() => blocks.len() - 1,
            _ => return false,
        };
        self.selected_block = Some(index);
        self.conversation.acknowledge_copy(&blocks[index])
    }

    fn max_scroll(&self) -> u16 {
        self.total_chat_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
        self.follow_tail = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_tail = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
        self.follow_tail = true;
    }

    fn scroll_to_selected_block(&mut self) {
        let Some(offset) = self.selected_block.and_then(|i| self.block_offsets.get(i).copied()) else {
            return;
        };
        let visible = offset >= self.chat_scroll && offset < self.chat_scroll.saturating_add(self.chat_height);
        if !visible {
            self.chat_scroll = offset.min(self.max_scroll());
            self.follow_tail = false;
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::App;
    use parley_core::{
        ClipboardError, ClipboardWriter, CompletionClient, CompletionSettings, Conversation,
        ConversationEvent, ConversationOptions,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Clone, Default)]
    pub struct RecordingClipboard {
        pub writes: Arc<Mutex<Vec<String>>>,
    }

    impl ClipboardWriter for RecordingClipboard {
        fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.writes.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    /// An app whose only message is `greeting`; no request is ever sent.
    pub fn app_with_greeting(
        greeting: &str,
        clipboard: RecordingClipboard,
    ) -> (App, mpsc::UnboundedReceiver<ConversationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = CompletionClient::new(CompletionSettings::default()).unwrap();
        let options = ConversationOptions {
            greeting: greeting.to_string(),
            copy_acknowledgment: Duration::from_secs(2),
        };
        let conversation = Conversation::new(options, Arc::new(client), Box::new(clipboard), tx);
        (App::new(conversation, "test/model".to_string()), rx)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{app_with_greeting, RecordingClipboard};

    const TWO_BLOCKS: &str = "Two ways:\n```rust\nfn a() {}\n```\nor\n```\nb()\n```";

    #[test]
    fn test_code_blocks_in_display_order() {
        let (app, _rx) = app_with_greeting(TWO_BLOCKS, RecordingClipboard::default());
        assert_eq!(app.code_blocks(), vec!["fn a() {}".to_string(), "b()".to_string()]);
    }

    #[test]
    fn test_block_selection_wraps() {
        let (mut app, _rx) = app_with_greeting(TWO_BLOCKS, RecordingClipboard::default());
        app.select_next_block();
        assert_eq!(app.selected_block, Some(0));
        app.select_next_block();
        assert_eq!(app.selected_block, Some(1));
        app.select_next_block();
        assert_eq!(app.selected_block, Some(0));
        app.select_prev_block();
        assert_eq!(app.selected_block, Some(1));
    }

    #[test]
    fn test_selection_without_blocks_stays_empty() {
        let (mut app, _rx) = app_with_greeting("Just prose.", RecordingClipboard::default());
        app.select_next_block();
        assert_eq!(app.selected_block, None);
    }

    #[tokio::test]
    async fn test_copy_defaults_to_last_block() {
        let clipboard = RecordingClipboard::default();
        let (mut app, _rx) = app_with_greeting(TWO_BLOCKS, clipboard.clone());

        assert!(app.copy_selected_block());
        assert_eq!(app.selected_block, Some(1));
        assert!(app.conversation.is_acknowledged("b()"));
        assert_eq!(*clipboard.writes.lock().unwrap(), vec!["b()".to_string()]);
    }

    #[tokio::test]
    async fn test_copy_without_blocks_does_nothing() {
        let clipboard = RecordingClipboard::default();
        let (mut app, _rx) = app_with_greeting("Nothing to copy", clipboard.clone());

        assert!(!app.copy_selected_block());
        assert!(clipboard.writes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_scrolling_up_stops_following() {
        let (mut app, _rx) = app_with_greeting("hi", RecordingClipboard::default());
        app.total_chat_lines = 50;
        app.chat_height = 10;
        app.scroll_to_bottom();
        assert_eq!(app.chat_scroll, 40);

        app.scroll_up(5);
        assert!(!app.follow_tail);
        app.scroll_down(100);
        assert_eq!(app.chat_scroll, 40);
        assert!(app.follow_tail);
    }
}
