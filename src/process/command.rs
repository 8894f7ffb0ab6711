//! Typed command description.

use std::fmt;

/// How a command is launched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// Run to completion and capture its output
    Blocking,
    /// Start in the background and return a handle
    Detached,
}

/// A program with its argument list and launch mode.
///
/// Arguments are kept as a list and never joined through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    launch: Launch,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            launch: Launch::Blocking,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn detached(mut self) -> Self {
        self.launch = Launch::Detached;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn launch(&self) -> Launch {
        self.launch
    }

    pub fn is_detached(&self) -> bool {
        self.launch == Launch::Detached
    }

    /// Returns true if any argument equals `needle`
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        if self.is_detached() {
            write!(f, " &")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_display() {
        let cmd = CommandSpec::new("tcpdump")
            .args(["-i", "h1-eth0"])
            .arg("not icmp6")
            .detached();
        assert_eq!(cmd.program(), "tcpdump");
        assert_eq!(cmd.arguments(), &["-i", "h1-eth0", "not icmp6"]);
        assert!(cmd.is_detached());
        assert!(cmd.has_arg("h1-eth0"));
        assert_eq!(cmd.to_string(), "tcpdump -i h1-eth0 'not icmp6' &");
    }

    #[test]
    fn test_default_is_blocking() {
        let cmd = CommandSpec::new("ping").args(["-c", "4", "10.0.0.2"]);
        assert_eq!(cmd.launch(), Launch::Blocking);
        assert_eq!(cmd.to_string(), "ping -c 4 10.0.0.2");
    }
}
