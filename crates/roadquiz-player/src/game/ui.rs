//! Quiz UI surface: the sink the orchestrator writes to.
//!
//! `UiState` is an in-memory model of the page: question text, three answer
//! options (text, colours, flip angle, result symbol), the explanation panel,
//! the start/advance controls, score and loading progress. Frontends read it
//! every frame; tweens read and write its numeric properties.

use crate::game::script::OptionId;

/// Result decoration next to an answer option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Correct,
    Incorrect,
}

impl Symbol {
    pub fn tag(&self) -> &'static str {
        match self {
            Symbol::Correct => "correct",
            Symbol::Incorrect => "incorrect",
        }
    }

    /// Background image for the symbol placeholder
    pub fn image_url(&self) -> String {
        format!("./assets/symbols/{}.png", self.tag())
    }
}

/// UI elements with animatable opacity / vertical offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    StartButton,
    Title,
    Question,
    Explanation,
}

impl Element {
    const COUNT: usize = 4;

    fn slot(self) -> usize {
        match self {
            Element::StartButton => 0,
            Element::Title => 1,
            Element::Question => 2,
            Element::Explanation => 3,
        }
    }
}

/// Background / foreground colour pair of an option (0xRRGGBB)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionColors {
    pub background: u32,
    pub foreground: u32,
}

impl OptionColors {
    /// Unanswered option
    pub const IDLE: OptionColors = OptionColors { background: 0x000000, foreground: 0xFFFFFF };
    /// The option the user picked
    pub const CHOSEN: OptionColors = OptionColors { background: 0xFFFFFF, foreground: 0x000000 };
}

/// Writes the orchestrator performs on the page
pub trait UiSink {
    fn set_question_text(&mut self, text: &str);
    fn set_option_text(&mut self, option: OptionId, text: &str);
    /// `None` clears the placeholder
    fn set_symbol(&mut self, option: OptionId, symbol: Option<Symbol>);
    fn set_option_colors(&mut self, option: OptionId, colors: OptionColors);
    /// Flip angle about the x axis, degrees (0 = facing the viewer)
    fn set_option_rotation(&mut self, option: OptionId, degrees: f32);
    fn set_opacity(&mut self, element: Element, alpha: f32);
    fn set_offset_y(&mut self, element: Element, px: f32);
    fn set_score(&mut self, score: u32);
    fn set_advance_enabled(&mut self, enabled: bool);
    fn set_loading_progress(&mut self, percent: f32);
    fn hide_loading(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionView {
    pub text: String,
    /// Symbol background image URL, empty when cleared
    pub symbol_image: String,
    pub colors: OptionColors,
    pub rotate_x: f32,
}

impl Default for OptionView {
    fn default() -> Self {
        Self {
            text: String::new(),
            symbol_image: String::new(),
            colors: OptionColors::IDLE,
            rotate_x: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub question: String,
    pub options: [OptionView; 3],
    opacity: [f32; Element::COUNT],
    offset_y: [f32; Element::COUNT],
    pub score: u32,
    pub advance_enabled: bool,
    pub loading_progress: f32,
    pub loading_visible: bool,
    /// Bumped on every write; frontends redraw when it changes
    pub revision: u64,
}

impl Default for UiState {
    fn default() -> Self {
        let mut opacity = [0.0; Element::COUNT];
        opacity[Element::StartButton.slot()] = 1.0;
        opacity[Element::Title.slot()] = 1.0;
        Self {
            question: String::new(),
            options: Default::default(),
            opacity,
            offset_y: [0.0; Element::COUNT],
            score: 0,
            advance_enabled: true,
            loading_progress: 0.0,
            loading_visible: true,
            revision: 0,
        }
    }
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opacity(&self, element: Element) -> f32 {
        self.opacity[element.slot()]
    }

    pub fn offset_y(&self, element: Element) -> f32 {
        self.offset_y[element.slot()]
    }

    pub fn option(&self, option: OptionId) -> &OptionView {
        &self.options[option.index()]
    }

    /// Visible and clickable (autoAlpha semantics: hidden below ~0 opacity)
    #[cfg(test)]
    pub fn is_visible(&self, element: Element) -> bool {
        self.opacity(element) > 0.001
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

impl UiSink for UiState {
    fn set_question_text(&mut self, text: &str) {
        self.question = text.to_string();
        self.touch();
    }

    fn set_option_text(&mut self, option: OptionId, text: &str) {
        self.options[option.index()].text = text.to_string();
        self.touch();
    }

    fn set_symbol(&mut self, option: OptionId, symbol: Option<Symbol>) {
        self.options[option.index()].symbol_image = symbol.map(|s| s.image_url()).unwrap_or_default();
        self.touch();
    }

    fn set_option_colors(&mut self, option: OptionId, colors: OptionColors) {
        self.options[option.index()].colors = colors;
        self.touch();
    }

    fn set_option_rotation(&mut self, option: OptionId, degrees: f32) {
        self.options[option.index()].rotate_x = degrees;
        self.touch();
    }

    fn set_opacity(&mut self, element: Element, alpha: f32) {
        self.opacity[element.slot()] = alpha.clamp(0.0, 1.0);
        self.touch();
    }

    fn set_offset_y(&mut self, element: Element, px: f32) {
        self.offset_y[element.slot()] = px;
        self.touch();
    }

    fn set_score(&mut self, score: u32) {
        self.score = score;
        self.touch();
    }

    fn set_advance_enabled(&mut self, enabled: bool) {
        self.advance_enabled = enabled;
        self.touch();
    }

    fn set_loading_progress(&mut self, percent: f32) {
        self.loading_progress = percent.clamp(0.0, 100.0);
        self.touch();
    }

    fn hide_loading(&mut self) {
        self.loading_visible = false;
        self.touch();
    }
}
