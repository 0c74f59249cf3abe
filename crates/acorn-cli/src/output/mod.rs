//! Terminal output formatting.
//!
//! Progress and results go to stdout, warnings and errors to stderr.

pub mod colors;
pub mod errors;
pub mod observer;

pub use observer::ConsoleObserver;

/// Output handler for consistent terminal formatting
#[derive(Debug, Clone)]
pub struct OutputHandler {
    colors: colors::ColorSupport,
}

impl OutputHandler {
    /// Create a new output handler
    pub fn new() -> Self {
        Self::with_colors(colors::ColorSupport::detect())
    }

    pub fn with_colors(colors: colors::ColorSupport) -> Self {
        Self { colors }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        println!("{}", self.colors.dim(message));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        println!("{} {}", self.colors.green("✓"), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", self.colors.yellow("⚠"), message);
    }

    /// Print a step message with a leading marker
    pub fn step(&self, marker: &str, message: &str) {
        println!("{} {}", self.colors.cyan(marker), message);
    }

    /// Print a bare result line, e.g. a URL meant for scripts
    pub fn result(&self, message: &str) {
        println!("{}", message);
    }

    pub fn colors(&self) -> colors::ColorSupport {
        self.colors
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
