//! Command-line surface
//!
//! `xkeyfwd <window-id> <subwindow-id> [--discard=...] <keysym>...`
//!
//! Window ids accept any numeric base prefix (`0x` hex, leading `0` octal,
//! plain decimal otherwise), matching what xwininfo/xdotool print.

use clap::{Parser, ValueEnum};

/// Whether the triggering key event itself is forwarded to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DiscardPolicy {
    /// Forward the trigger press (and its release) like any other key
    Never,
    /// Hold the press back; replay it on release only if the trigger was not
    /// used as a modifier in between
    Modifier,
    /// Swallow the trigger in both roles
    Always,
}

impl std::fmt::Display for DiscardPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscardPolicy::Never => write!(f, "never"),
            DiscardPolicy::Modifier => write!(f, "modifier"),
            DiscardPolicy::Always => write!(f, "always"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "xkeyfwd")]
#[command(about = "Grab global X11 hotkeys and forward them to a target window")]
pub struct Args {
    /// Destination window for forwarded events
    #[arg(value_name = "window-id", value_parser = parse_window_id)]
    pub window: u32,

    /// Destination subwindow; also receives input focus while forwarding
    #[arg(value_name = "subwindow-id", value_parser = parse_window_id)]
    pub subwindow: u32,

    /// What to do with the triggering key event itself
    #[arg(long, value_enum, default_value_t = DiscardPolicy::Never)]
    pub discard: DiscardPolicy,

    /// Keysym names to grab at the root window (e.g. F20 XF86Launch1)
    #[arg(value_name = "keysym", required = true, num_args = 1..)]
    pub keysyms: Vec<String>,
}

/// strtoul-with-base-0 semantics: 0x/0X hex, leading 0 octal, else decimal
fn parse_window_id(raw: &str) -> Result<u32, String> {
    let parsed = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else if raw.len() > 1 && raw.starts_with('0') {
        u32::from_str_radix(&raw[1..], 8)
    } else {
        raw.parse()
    };
    parsed.map_err(|_| format!("{raw:?} is not a valid window id"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_id_bases() {
        assert_eq!(parse_window_id("4200001"), Ok(4200001));
        assert_eq!(parse_window_id("0x2a00001"), Ok(0x2a00001));
        assert_eq!(parse_window_id("0X2A"), Ok(0x2a));
        assert_eq!(parse_window_id("017"), Ok(15));
        assert_eq!(parse_window_id("0"), Ok(0));
        assert!(parse_window_id("banana").is_err());
        assert!(parse_window_id("0xzz").is_err());
    }

    #[test]
    fn test_minimal_invocation() {
        let args = Args::try_parse_from(["xkeyfwd", "0x2a", "0x2b", "F20"]).unwrap();
        assert_eq!(args.window, 0x2a);
        assert_eq!(args.subwindow, 0x2b);
        assert_eq!(args.discard, DiscardPolicy::Never);
        assert_eq!(args.keysyms, vec!["F20"]);
    }

    #[test]
    fn test_discard_flag_between_ids_and_keysyms() {
        let args =
            Args::try_parse_from(["xkeyfwd", "100", "101", "--discard=modifier", "F20", "F21"])
                .unwrap();
        assert_eq!(args.discard, DiscardPolicy::Modifier);
        assert_eq!(args.keysyms, vec!["F20", "F21"]);
    }

    #[test]
    fn test_explicit_discard_never_accepted() {
        let args = Args::try_parse_from(["xkeyfwd", "100", "101", "--discard=never", "F20"])
            .unwrap();
        assert_eq!(args.discard, DiscardPolicy::Never);
    }

    #[test]
    fn test_missing_positionals_rejected() {
        assert!(Args::try_parse_from(["xkeyfwd"]).is_err());
        assert!(Args::try_parse_from(["xkeyfwd", "100"]).is_err());
        assert!(Args::try_parse_from(["xkeyfwd", "100", "101"]).is_err());
    }

    #[test]
    fn test_unknown_discard_value_rejected() {
        assert!(Args::try_parse_from(["xkeyfwd", "100", "101", "--discard=maybe", "F20"]).is_err());
    }
}
