//! Segment and output model
//!
//! A [`Segment`] is one renderable fragment of the bar. A module contributes an
//! [`Output`], an ordered list of segments that is rendered verbatim in its slot.

use crate::aggregator::Origin;
use crate::config::ColorScheme;
use crate::threshold::Severity;
use std::fmt;
use std::sync::Arc;

/// Reference to a color, either resolved through the scheme or literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorRef {
    Semantic(Severity),
    Hex(String),
}

impl ColorRef {
    /// Resolve to a concrete `#rrggbb` string using the active scheme.
    pub fn resolve(&self, scheme: &ColorScheme) -> Option<String> {
        match self {
            ColorRef::Semantic(severity) => scheme.color_for(*severity).map(str::to_string),
            ColorRef::Hex(hex) => Some(hex.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Start,
    End,
}

/// Mouse button of a click event, numbered as X11 does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left,
    Middle,
    Right,
    ScrollUp,
    ScrollDown,
    Other(u8),
}

impl From<u8> for Button {
    fn from(code: u8) -> Self {
        match code {
            1 => Button::Left,
            2 => Button::Middle,
            3 => Button::Right,
            4 => Button::ScrollUp,
            5 => Button::ScrollDown,
            other => Button::Other(other),
        }
    }
}

/// A click reported by the bar host, addressed by block name and instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub name: String,
    pub instance: usize,
    pub button: Button,
}

/// Callback attached to a segment. Runs on the bar actor, so it must be quick.
pub type ClickHandler = Arc<dyn Fn(&ClickEvent) + Send + Sync>;

/// One atomic renderable fragment.
#[derive(Clone, Default)]
pub struct Segment {
    text: String,
    color: Option<ColorRef>,
    urgent: bool,
    min_width: Option<u32>,
    align: Align,
    on_click: Option<ClickHandler>,
    separator: bool,
    padding: Option<u32>,
}

impl Segment {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            separator: true,
            ..Default::default()
        }
    }

    pub fn color(mut self, color: ColorRef) -> Self {
        self.color = Some(color);
        self
    }

    pub fn semantic(self, severity: Severity) -> Self {
        self.color(ColorRef::Semantic(severity))
    }

    pub fn hex<S: Into<String>>(self, hex: S) -> Self {
        self.color(ColorRef::Hex(hex.into()))
    }

    pub fn urgent(mut self, urgent: bool) -> Self {
        self.urgent = urgent;
        self
    }

    pub fn min_width(mut self, width: u32) -> Self {
        self.min_width = Some(width);
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn on_click<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ClickEvent) + Send + Sync + 'static,
    {
        self.on_click = Some(Arc::new(handler));
        self
    }

    pub fn with_handler(mut self, handler: ClickHandler) -> Self {
        self.on_click = Some(handler);
        self
    }

    pub fn separator(mut self, separator: bool) -> Self {
        self.separator = separator;
        self
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn get_text(&self) -> &str {
        &self.text
    }

    pub fn get_color(&self) -> Option<&ColorRef> {
        self.color.as_ref()
    }

    pub fn is_urgent(&self) -> bool {
        self.urgent
    }

    pub fn get_min_width(&self) -> Option<u32> {
        self.min_width
    }

    pub fn get_align(&self) -> Align {
        self.align
    }

    pub fn handler(&self) -> Option<&ClickHandler> {
        self.on_click.as_ref()
    }

    pub fn has_separator(&self) -> bool {
        self.separator
    }

    pub fn get_padding(&self) -> Option<u32> {
        self.padding
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("text", &self.text)
            .field("color", &self.color)
            .field("urgent", &self.urgent)
            .field("min_width", &self.min_width)
            .field("align", &self.align)
            .field("on_click", &self.on_click.is_some())
            .field("separator", &self.separator)
            .field("padding", &self.padding)
            .finish()
    }
}

// 点击回调按指针比较
impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        let same_handler = match (&self.on_click, &other.on_click) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        same_handler
            && self.text == other.text
            && self.color == other.color
            && self.urgent == other.urgent
            && self.min_width == other.min_width
            && self.align == other.align
            && self.separator == other.separator
            && self.padding == other.padding
    }
}

impl From<&str> for Segment {
    fn from(text: &str) -> Self {
        Segment::text(text)
    }
}

impl From<String> for Segment {
    fn from(text: String) -> Self {
        Segment::text(text)
    }
}

/// Ordered contribution of one module. Empty means "show nothing".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Output(Vec<Segment>);

impl Output {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.0.iter()
    }

    pub fn push(mut self, segment: Segment) -> Self {
        self.0.push(segment);
        self
    }

    /// Attach the same click handler to every segment that has none.
    pub fn on_click<F>(self, handler: F) -> Self
    where
        F: Fn(&ClickEvent) + Send + Sync + 'static,
    {
        let handler: ClickHandler = Arc::new(handler);
        self.map(|s| {
            if s.on_click.is_some() {
                s
            } else {
                s.with_handler(handler.clone())
            }
        })
    }

    /// Rebuild every segment through `f`, keeping order.
    pub fn map<F>(self, f: F) -> Self
    where
        F: FnMut(Segment) -> Segment,
    {
        Self(self.0.into_iter().map(f).collect())
    }

    /// First `at` segments and the rest. `at` past the end leaves the tail empty.
    pub fn split_at(mut self, at: usize) -> (Output, Output) {
        let tail = self.0.split_off(at.min(self.0.len()));
        (self, Self(tail))
    }

    /// Concatenated text of all segments, mostly useful for logs and tests.
    pub fn plain_text(&self) -> String {
        self.0.iter().map(|s| s.text.as_str()).collect()
    }
}

impl From<Segment> for Output {
    fn from(segment: Segment) -> Self {
        Self(vec![segment])
    }
}

impl From<Vec<Segment>> for Output {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl FromIterator<Segment> for Output {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Output {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A segment placed in the composed line, tagged with where it came from so
/// clicks can be routed back to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub instance: usize,
    pub origin: Origin,
    pub segment: Segment,
}
