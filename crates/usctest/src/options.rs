//! Command-line option parsing for test programs.
//!
//! Every test program accepts the standard flags below, plus whatever single
//! character options it declares in its own descriptor table:
//!
//! ```text
//! -e      Turn on errno logging
//! -f      Turn off functional testing
//! -h      Show this help screen
//! -i n    Execute test n times (0 = forever)
//! -I x    Execute test for x seconds
//! -p      Pause for the wake-up signal before starting
//! -P x    Pause for x seconds between iterations
//! -t      Turn on call timing
//! ```
//!
//! The grammar is the POSIX `getopt` subset: flags may be grouped (`-ab`), an
//! argument may be attached (`-bval`) or given as the next token (`-b val`),
//! `--` ends option processing, and so does the first operand.

use thiserror::Error;

use crate::config::{Explicit, LoopCount, StdConfig, parse_seconds};

/// Usage text for the standard flags, printed by `-h`.
pub const STD_USAGE: &str = "\
  -e      Turn on errno logging.
  -f      Turn off functional testing.
  -h      Show this help screen.
  -i n    Execute test n times (0 = forever).
  -I x    Execute test for x seconds.
  -p      Pause for SIGUSR1 before starting.
  -P x    Pause for x seconds between iterations.
  -t      Turn on call timing.
";

/// Standard flags and whether each takes an argument.
const STD_FLAGS: &[(char, bool)] = &[
    ('e', false),
    ('f', false),
    ('h', false),
    ('i', true),
    ('I', true),
    ('p', false),
    ('P', true),
    ('t', false),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid option -- '{0}'")]
    UnknownOption(char),
    #[error("option requires an argument -- '{0}'")]
    MissingArgument(char),
    #[error("invalid value {value:?} for -{flag}: {reason}")]
    InvalidValue {
        flag: char,
        value: String,
        reason: String,
    },
    #[error("malformed option descriptor {0:?}")]
    BadDescriptor(String),
    #[error("option -{0} is defined more than once")]
    DuplicateOption(char),
    #[error("help requested")]
    HelpRequested,
}

impl ParseError {
    /// Conventional process exit status for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::HelpRequested => 0,
            _ => 2,
        }
    }
}

/// One option a test program recognizes in addition to the standard flags.
///
/// `spec` is the flag character, followed by `:` when the option takes an
/// argument (`"v"`, `"C:"`). After a successful parse `given` tells whether
/// the flag appeared and `arg` borrows its argument from the argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDescriptor<'a> {
    pub spec: &'static str,
    pub given: bool,
    pub arg: Option<&'a str>,
}

impl<'a> OptionDescriptor<'a> {
    #[must_use]
    pub const fn new(spec: &'static str) -> Self {
        Self {
            spec,
            given: false,
            arg: None,
        }
    }

    /// Flag character and whether it takes an argument.
    pub fn decode(&self) -> Result<(char, bool), ParseError> {
        let bad = || ParseError::BadDescriptor(self.spec.to_string());
        let mut chars = self.spec.chars();
        let flag = chars.next().filter(char::is_ascii_alphanumeric).ok_or_else(bad)?;
        match (chars.next(), chars.next()) {
            (None, _) => Ok((flag, false)),
            (Some(':'), None) => Ok((flag, true)),
            _ => Err(bad()),
        }
    }
}

/// Result of a successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdOptions<'a> {
    pub config: StdConfig,
    /// Tokens left after option processing stopped.
    pub operands: Vec<&'a str>,
}

enum Target {
    Std(char),
    User(usize),
}

/// Parse `args` (program name first) against the standard flags and `table`,
/// then fill unset values from the `USC_*` environment variables.
///
/// `help` is invoked after the standard usage text when `-h` is given.
pub fn parse_opts<'a>(
    args: &'a [String],
    table: &mut [OptionDescriptor<'a>],
    help: Option<&dyn Fn()>,
) -> Result<StdOptions<'a>, ParseError> {
    parse_opts_with_env(args, table, help, |key| std::env::var(key).ok())
}

/// [`parse_opts`] with an explicit environment lookup.
pub fn parse_opts_with_env<'a, F>(
    args: &'a [String],
    table: &mut [OptionDescriptor<'a>],
    help: Option<&dyn Fn()>,
    lookup: F,
) -> Result<StdOptions<'a>, ParseError>
where
    F: Fn(&str) -> Option<String>,
{
    let user = decode_table(table)?;
    let mut config = StdConfig::default();
    let mut explicit = Explicit::default();

    let mut idx = 1;
    while idx < args.len() {
        let token: &'a str = args[idx].as_str();
        if token == "--" {
            idx += 1;
            break;
        }
        if token == "-" || !token.starts_with('-') {
            break;
        }

        let body = &token[1..];
        for (pos, flag) in body.char_indices() {
            let (target, takes_arg) = lookup_flag(flag, &user)?;
            let value = if takes_arg {
                let rest = &body[pos + flag.len_utf8()..];
                if rest.is_empty() {
                    idx += 1;
                    Some(
                        args.get(idx)
                            .map(String::as_str)
                            .ok_or(ParseError::MissingArgument(flag))?,
                    )
                } else {
                    Some(rest)
                }
            } else {
                None
            };

            match target {
                Target::User(slot) => {
                    table[slot].given = true;
                    table[slot].arg = value;
                }
                Target::Std(flag) => {
                    apply_std(flag, value, &mut config, &mut explicit, help)?;
                }
            }

            if takes_arg {
                break;
            }
        }
        idx += 1;
    }

    config.apply_env_inner(&mut explicit, lookup);
    config.finalize(explicit);

    let operands = args
        .get(idx..)
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .collect();
    Ok(StdOptions { config, operands })
}

fn decode_table(table: &[OptionDescriptor<'_>]) -> Result<Vec<(char, bool)>, ParseError> {
    let mut decoded: Vec<(char, bool)> = Vec::with_capacity(table.len());
    for descriptor in table {
        let (flag, takes_arg) = descriptor.decode()?;
        if STD_FLAGS.iter().any(|(std, _)| *std == flag)
            || decoded.iter().any(|(seen, _)| *seen == flag)
        {
            return Err(ParseError::DuplicateOption(flag));
        }
        decoded.push((flag, takes_arg));
    }
    Ok(decoded)
}

fn lookup_flag(flag: char, user: &[(char, bool)]) -> Result<(Target, bool), ParseError> {
    if let Some((_, takes_arg)) = STD_FLAGS.iter().find(|(std, _)| *std == flag) {
        return Ok((Target::Std(flag), *takes_arg));
    }
    user.iter()
        .position(|(candidate, _)| *candidate == flag)
        .map(|slot| (Target::User(slot), user[slot].1))
        .ok_or(ParseError::UnknownOption(flag))
}

fn apply_std(
    flag: char,
    value: Option<&str>,
    config: &mut StdConfig,
    explicit: &mut Explicit,
    help: Option<&dyn Fn()>,
) -> Result<(), ParseError> {
    let value = value.unwrap_or_default();
    let invalid = |reason: String| ParseError::InvalidValue {
        flag,
        value: value.to_string(),
        reason,
    };
    match flag {
        'e' => config.errno_log = true,
        'f' => {
            config.functional = false;
            explicit.functional = true;
        }
        'h' => {
            print!("{STD_USAGE}");
            if let Some(help) = help {
                help();
            }
            return Err(ParseError::HelpRequested);
        }
        'i' => {
            config.loop_count = LoopCount::parse(value).map_err(invalid)?;
            explicit.count = true;
        }
        'I' => {
            config.duration = Some(parse_seconds(value).map_err(invalid)?);
            explicit.duration = true;
        }
        'p' => config.pause = true,
        'P' => {
            config.delay = Some(parse_seconds(value).map_err(invalid)?);
            explicit.delay = true;
        }
        't' => config.timing = true,
        _ => return Err(ParseError::UnknownOption(flag)),
    }
    Ok(())
}
