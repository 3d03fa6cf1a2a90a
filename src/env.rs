use std::io::IsTerminal;

/// Capability queries the UI components need from their execution
/// environment. Components receive this instead of probing globals, so they
/// stay testable without a real terminal.
pub trait Capabilities {
    /// An interactive display surface is available.
    fn is_interactive(&self) -> bool;
    /// Pointer input (mouse reporting) is available.
    fn has_pointer(&self) -> bool;
    /// Cells can render high-density glyphs (braille), the retina analog.
    fn is_hidpi(&self) -> bool;
    /// Running inside a wrapping app shell rather than a plain terminal.
    fn is_app_shell(&self) -> bool;
}

/// Where the process is running; decided once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    /// Wrapped app container.
    AppShell,
    /// A real interactive terminal, not app-wrapped.
    Interactive,
    /// No interactive display surface at all.
    Headless,
}

impl Environment {
    /// App-shell wins over plain interactivity; anything else is headless.
    pub fn classify(caps: &dyn Capabilities) -> Self {
        if caps.is_app_shell() {
            Environment::AppShell
        } else if caps.is_interactive() {
            Environment::Interactive
        } else {
            Environment::Headless
        }
    }
}

/// Capabilities detected from the actual terminal, once, in main.
#[derive(Clone, Copy, Debug)]
pub struct TerminalCapabilities {
    interactive: bool,
    pointer: bool,
    hidpi: bool,
    app_shell: bool,
}

impl TerminalCapabilities {
    /// Probe the process environment. `force_headless` comes from the CLI
    /// and overrides the tty check (single-pass rendering runs).
    pub fn detect(force_headless: bool) -> Self {
        let tty = std::io::stdout().is_terminal();
        let interactive = tty && !force_headless;
        let unicode = std::env::var("LANG")
            .or_else(|_| std::env::var("LC_ALL"))
            .map(|v| v.to_ascii_uppercase().contains("UTF"))
            .unwrap_or(false);
        Self {
            interactive,
            // Terminals that can run this UI report mouse events through the
            // same escape channel; treat interactivity as pointer support.
            pointer: interactive,
            hidpi: unicode,
            app_shell: std::env::var_os("TRANSIT_MAP_SHELL").is_some(),
        }
    }
}

impl Capabilities for TerminalCapabilities {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn has_pointer(&self) -> bool {
        self.pointer
    }

    fn is_hidpi(&self) -> bool {
        self.hidpi
    }

    fn is_app_shell(&self) -> bool {
        self.app_shell
    }
}

/// Fixed capabilities, for composition roots that already know the answers
/// and for tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticCapabilities {
    pub interactive: bool,
    pub pointer: bool,
    pub hidpi: bool,
    pub app_shell: bool,
}

impl Capabilities for StaticCapabilities {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn has_pointer(&self) -> bool {
        self.pointer
    }

    fn is_hidpi(&self) -> bool {
        self.hidpi
    }

    fn is_app_shell(&self) -> bool {
        self.app_shell
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_shell_wins_over_interactive() {
        let caps = StaticCapabilities {
            interactive: true,
            app_shell: true,
            ..Default::default()
        };
        assert_eq!(Environment::classify(&caps), Environment::AppShell);
    }

    #[test]
    fn interactive_without_shell() {
        let caps = StaticCapabilities {
            interactive: true,
            ..Default::default()
        };
        assert_eq!(Environment::classify(&caps), Environment::Interactive);
    }

    #[test]
    fn neither_is_headless() {
        let caps = StaticCapabilities::default();
        assert_eq!(Environment::classify(&caps), Environment::Headless);
    }
}
