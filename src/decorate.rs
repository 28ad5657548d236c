//! Output decoration
//!
//! Tags text as error/success/info for display. Decorators are stateless and
//! shared between all session writers.

use std::sync::Arc;

use console::Style;

/// Text decoration applied to outbound messages
pub trait Decorator: Send + Sync {
    fn error(&self, text: &str) -> String;
    fn success(&self, text: &str) -> String;
    fn info(&self, text: &str) -> String;

    fn plain(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Leaves text untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainDecorator;

impl Decorator for PlainDecorator {
    fn error(&self, text: &str) -> String {
        text.to_string()
    }

    fn success(&self, text: &str) -> String {
        text.to_string()
    }

    fn info(&self, text: &str) -> String {
        text.to_string()
    }
}

/// ANSI terminal colours on a black background
///
/// Styling is forced on: the output goes to a remote client's terminal, not
/// to whatever the server process is attached to.
#[derive(Debug, Clone)]
pub struct AnsiDecorator {
    error: Style,
    success: Style,
    info: Style,
}

impl AnsiDecorator {
    pub fn new() -> Self {
        Self {
            error: Style::new().red().on_black().force_styling(true),
            success: Style::new().green().on_black().force_styling(true),
            info: Style::new().yellow().on_black().force_styling(true),
        }
    }
}

impl Default for AnsiDecorator {
    fn default() -> Self {
        Self::new()
    }
}

impl Decorator for AnsiDecorator {
    fn error(&self, text: &str) -> String {
        self.error.apply_to(text).to_string()
    }

    fn success(&self, text: &str) -> String {
        self.success.apply_to(text).to_string()
    }

    fn info(&self, text: &str) -> String {
        self.info.apply_to(text).to_string()
    }
}

/// Pick a decorator for the given colour setting
pub fn decorator_for(color: bool) -> Arc<dyn Decorator> {
    if color {
        Arc::new(AnsiDecorator::new())
    } else {
        Arc::new(PlainDecorator)
    }
}
