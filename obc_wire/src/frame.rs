//! Telecommand uplink frame grammar (§6): `CTS1+<name>(<args>)[@tag=value]*!`
//!
//! The parser does not execute anything and does not own the telecommand
//! table; it is handed a [`TelecommandLookup`] so that name resolution and
//! argument-count checks stay data-driven from whatever table the core
//! defines, while the grammar and error-code contract live here, shared by
//! both the firmware core and the ground-station tooling.

use heapless::String as HString;
use sha2::{Digest, Sha256};

pub const MAX_ARGS_STR_LEN: usize = 255;
pub const MAX_RESP_FNAME_LEN: usize = 64;

/// Looks up a telecommand by name. Implemented by the core's static table.
pub trait TelecommandLookup {
    /// Returns `(def_index, expected_arg_count)` for a known command name.
    fn resolve(&self, name: &str) -> Option<(u8, u8)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameErrorCode {
    PrefixMismatch = 20,
    MissingTerminator = 25,
    MultipleTerminators = 26,
    UnknownName = 30,
    MissingOpenParen = 40,
    MissingCloseParen = 60,
    TsSentTagInvalid = 70,
    TsExecTagInvalid = 80,
    Sha256TagInvalid = 85,
    ArgsStrTooLong = 90,
    ArgCountMismatch = 100,
    Sha256Mismatch = 110,
}

impl FrameErrorCode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    DebugUart,
    Radio1,
}

/// A successfully parsed telecommand frame, ready to be added to the agenda.
#[derive(Debug, Clone)]
pub struct ParsedFrame {
    pub def_index: u8,
    pub args_str: HString<{ MAX_ARGS_STR_LEN }>,
    pub channel: Channel,
    pub ts_sent_ms: u64,
    pub ts_exec_ms: u64,
    pub response_log_file: HString<{ MAX_RESP_FNAME_LEN }>,
}

/// Parses one uplink frame per §4.5/§6. `device_prefix` is e.g. `"CTS1+"`.
pub fn parse_frame(
    raw: &str,
    device_prefix: &str,
    channel: Channel,
    lookup: &dyn TelecommandLookup,
) -> Result<ParsedFrame, FrameErrorCode> {
    // 1. Prefix match.
    let after_prefix = raw.strip_prefix(device_prefix).ok_or(FrameErrorCode::PrefixMismatch)?;

    // 2. Exactly one '!' at the end (optionally followed by whitespace).
    let bang_count = after_prefix.matches('!').count();
    if bang_count == 0 {
        return Err(FrameErrorCode::MissingTerminator);
    }
    if bang_count > 1 {
        return Err(FrameErrorCode::MultipleTerminators);
    }
    let bang_pos = after_prefix.find('!').unwrap();
    let trailing = &after_prefix[bang_pos + 1..];
    if !trailing.chars().all(|c| c.is_whitespace()) {
        return Err(FrameErrorCode::MultipleTerminators);
    }
    let body = &after_prefix[..bang_pos];

    // 3. Known name: an independent alphanumeric/underscore-prefix scan, with
    // no dependency on whether '(' is present anywhere in the body.
    let name_end = body.find(|c: char| !(c.is_alphanumeric() || c == '_')).unwrap_or(body.len());
    let name = &body[..name_end];
    let (def_index, expected_arg_count) =
        lookup.resolve(name).ok_or(FrameErrorCode::UnknownName)?;

    // 4. Parenthesization, searched only after the name is resolved.
    let open_paren = body.find('(').ok_or(FrameErrorCode::MissingOpenParen)?;
    let close_paren = body[open_paren..]
        .find(')')
        .map(|i| i + open_paren)
        .ok_or(FrameErrorCode::MissingCloseParen)?;
    let args_str = &body[open_paren + 1..close_paren];
    let suffix = &body[close_paren + 1..];

    // 5. Arg-string length.
    if args_str.len() > MAX_ARGS_STR_LEN {
        return Err(FrameErrorCode::ArgsStrTooLong);
    }

    // 6. Argument count.
    let actual_arg_count = crate::args::arg_count(args_str);
    if actual_arg_count != expected_arg_count as usize {
        return Err(FrameErrorCode::ArgCountMismatch);
    }

    // 7. Suffix tags.
    let mut ts_sent_ms: u64 = 0;
    let mut ts_exec_ms: u64 = 0;
    let mut sha256_expected: Option<[u8; 32]> = None;
    let mut response_log_file: HString<{ MAX_RESP_FNAME_LEN }> = HString::new();

    for tag_str in suffix.split('@') {
        if tag_str.is_empty() {
            continue;
        }
        // A tag with no '=', or one the firmware doesn't recognize, is
        // silently ignored rather than rejected.
        let Some(eq_pos) = tag_str.find('=') else { continue };
        let tag_name = &tag_str[..eq_pos];
        let tag_value = &tag_str[eq_pos + 1..];

        match tag_name {
            "tssent" => {
                ts_sent_ms = tag_value.parse::<u64>().map_err(|_| FrameErrorCode::TsSentTagInvalid)?;
            }
            "tsexec" => {
                ts_exec_ms = tag_value.parse::<u64>().map_err(|_| FrameErrorCode::TsExecTagInvalid)?;
            }
            "sha256" => {
                if tag_value.len() != 64 {
                    return Err(FrameErrorCode::Sha256TagInvalid);
                }
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(tag_value, &mut bytes)
                    .map_err(|_| FrameErrorCode::Sha256TagInvalid)?;
                sha256_expected = Some(bytes);
            }
            "resp_fname" => {
                // Unbounded on the wire; truncated to capacity rather than rejected.
                for c in tag_value.chars() {
                    if response_log_file.push(c).is_err() {
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    // 8. SHA-256 coverage: the bytes of `<prefix><name>(<args>)` through `)`.
    if let Some(expected) = sha256_expected {
        let canonical_len = device_prefix.len() + name.len() + 1 + args_str.len() + 1;
        let canonical_end = device_prefix.len() + open_paren + (close_paren - open_paren) + 1;
        debug_assert_eq!(canonical_len, canonical_end);
        let canonical = &raw[..canonical_end];
        let digest = Sha256::digest(canonical.as_bytes());
        if digest.as_slice() != expected {
            return Err(FrameErrorCode::Sha256Mismatch);
        }
    }

    let mut args_out: HString<{ MAX_ARGS_STR_LEN }> = HString::new();
    args_out.push_str(args_str).map_err(|_| FrameErrorCode::ArgsStrTooLong)?;

    Ok(ParsedFrame {
        def_index,
        args_str: args_out,
        channel,
        ts_sent_ms,
        ts_exec_ms,
        response_log_file,
    })
}

/// Builds the canonical `"<prefix><name>(<args>)"` form used for SHA-256 coverage.
pub fn canonical_form(device_prefix: &str, name: &str, args_str: &str) -> heapless::String<320> {
    let mut s: heapless::String<320> = heapless::String::new();
    let _ = s.push_str(device_prefix);
    let _ = s.push_str(name);
    let _ = s.push('(');
    let _ = s.push_str(args_str);
    let _ = s.push(')');
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLookup;
    impl TelecommandLookup for FixedLookup {
        fn resolve(&self, name: &str) -> Option<(u8, u8)> {
            match name {
                "echo_back_args" => Some((0, 1)),
                "hello_world" => Some((1, 0)),
                _ => None,
            }
        }
    }

    #[test]
    fn parses_immediate_echo() {
        let parsed = parse_frame(
            "CTS1+echo_back_args(hello)!",
            "CTS1+",
            Channel::DebugUart,
            &FixedLookup,
        )
        .unwrap();
        assert_eq!(parsed.def_index, 0);
        assert_eq!(parsed.args_str.as_str(), "hello");
        assert_eq!(parsed.ts_exec_ms, 0);
    }

    #[test]
    fn parses_scheduled_command_with_tags() {
        let parsed = parse_frame(
            "CTS1+hello_world()@tsexec=5000@tssent=42!",
            "CTS1+",
            Channel::Radio1,
            &FixedLookup,
        )
        .unwrap();
        assert_eq!(parsed.ts_exec_ms, 5000);
        assert_eq!(parsed.ts_sent_ms, 42);
    }

    #[test]
    fn rejects_bad_prefix() {
        let err = parse_frame("XYZ+hello_world()!", "CTS1+", Channel::DebugUart, &FixedLookup)
            .unwrap_err();
        assert_eq!(err, FrameErrorCode::PrefixMismatch);
    }

    #[test]
    fn rejects_multiple_terminators() {
        let err = parse_frame("CTS1+hello_world()!!", "CTS1+", Channel::DebugUart, &FixedLookup)
            .unwrap_err();
        assert_eq!(err, FrameErrorCode::MultipleTerminators);
    }

    #[test]
    fn rejects_unknown_name() {
        let err = parse_frame("CTS1+nonexistent()!", "CTS1+", Channel::DebugUart, &FixedLookup)
            .unwrap_err();
        assert_eq!(err, FrameErrorCode::UnknownName);
    }

    #[test]
    fn rejects_arg_count_mismatch() {
        let err = parse_frame("CTS1+hello_world(1)!", "CTS1+", Channel::DebugUart, &FixedLookup)
            .unwrap_err();
        assert_eq!(err, FrameErrorCode::ArgCountMismatch);
    }

    #[test]
    fn sha256_tag_must_match_canonical_form() {
        let canonical = canonical_form("CTS1+", "echo_back_args", "hello");
        let digest = Sha256::digest(canonical.as_bytes());
        let raw = heapless::String::<320>::try_from(
            format!("CTS1+echo_back_args(hello)@sha256={}!", hex::encode(digest)).as_str(),
        )
        .unwrap();
        let parsed = parse_frame(raw.as_str(), "CTS1+", Channel::DebugUart, &FixedLookup).unwrap();
        assert_eq!(parsed.args_str.as_str(), "hello");
    }

    #[test]
    fn sha256_mismatch_is_rejected() {
        let raw = format!("CTS1+echo_back_args(hello)@sha256={}!", "0".repeat(64));
        let err = parse_frame(&raw, "CTS1+", Channel::DebugUart, &FixedLookup).unwrap_err();
        assert_eq!(err, FrameErrorCode::Sha256Mismatch);
    }
}
