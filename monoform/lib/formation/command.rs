use std::{fmt, ops::Deref, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{MonoformError, MonoformResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The argument vector of a process.
///
/// A command always has at least one element and the first element is the executable. Arguments
/// keep the order they were written in.
///
/// ## Examples
///
/// ```
/// use monoform::formation::Command;
///
/// let cmd: Command = "bundle exec 'rails server' -p $PORT".parse().unwrap();
/// assert_eq!(cmd.program(), "bundle");
/// assert_eq!(cmd.args(), ["exec", "rails server", "-p", "$PORT"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Command(Vec<String>);

/// Tokenizer state while splitting a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Command {
    /// Creates a command from an already split argument list.
    ///
    /// Fails if the list is empty.
    pub fn from_args<I, S>(args: I) -> MonoformResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Err(MonoformError::MalformedCommand {
                command: String::new(),
                reason: "command has no arguments".into(),
            });
        }

        Ok(Self(args))
    }

    /// The executable.
    pub fn program(&self) -> &str {
        &self.0[0]
    }

    /// The arguments after the executable.
    pub fn args(&self) -> &[String] {
        &self.0[1..]
    }

    /// Joins the arguments back into a single line that [`parse_command`] splits into the same
    /// arguments.
    pub fn to_shell_string(&self) -> String {
        self.0
            .iter()
            .map(|arg| quote(arg))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Consumes the command, returning the argument vector.
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Splits a command line into arguments using shell word splitting rules.
///
/// Single quotes preserve everything literally. Double quotes preserve everything except `\`
/// escapes of `"`, `\`, `$` and `` ` ``. Outside quotes a backslash escapes the next character.
/// Variables are not expanded.
pub fn parse_command(line: &str) -> MonoformResult<Command> {
    let malformed = |reason: &str| MonoformError::MalformedCommand {
        command: line.to_string(),
        reason: reason.to_string(),
    };

    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote = Quote::None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Quote::None, c) if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (Quote::None, '\'') => {
                quote = Quote::Single;
                in_word = true;
            }
            (Quote::None, '"') => {
                quote = Quote::Double;
                in_word = true;
            }
            (Quote::None, '\\') => {
                let escaped = chars.next().ok_or_else(|| malformed("trailing backslash"))?;
                // A backslash-newline is a line continuation.
                if escaped != '\n' {
                    current.push(escaped);
                    in_word = true;
                }
            }
            (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::None,
            (Quote::Double, '\\') => match chars.next() {
                Some(e @ ('"' | '\\' | '$' | '`')) => current.push(e),
                Some('\n') => {}
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => return Err(malformed("unterminated double quote")),
            },
            (_, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    match quote {
        Quote::Single => return Err(malformed("unterminated single quote")),
        Quote::Double => return Err(malformed("unterminated double quote")),
        Quote::None => {}
    }

    if in_word {
        args.push(current);
    }

    if args.is_empty() {
        return Err(malformed("command is empty"));
    }

    Ok(Command(args))
}

fn quote(arg: &str) -> String {
    let is_safe = |c: char| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c);
    if !arg.is_empty() && arg.chars().all(is_safe) {
        return arg.to_string();
    }

    format!("'{}'", arg.replace('\'', r"'\''"))
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl FromStr for Command {
    type Err = MonoformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_command(s)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_shell_string())
    }
}

impl Deref for Command {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Vec<String>> for Command {
    type Error = MonoformError;

    fn try_from(args: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_args(args)
    }
}

impl From<Command> for Vec<String> {
    fn from(cmd: Command) -> Self {
        cmd.0
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
