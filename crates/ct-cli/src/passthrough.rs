//! Separates `lumi-info` options from the words forwarded to brilcalc.
//!
//! `lumi-info` accepts brilcalc arguments anywhere on its command line.
//! [`hoist`] moves every word it does not recognise behind a `--`, where
//! clap collects them verbatim, so known options keep working wherever they
//! appear.

use std::ffi::OsString;

const SUBCOMMAND: &str = "lumi-info";

enum Arity {
    Flag,
    Value,
    /// Values up to the next hyphen-led word.
    Many,
}

fn arity(word: &str) -> Option<Arity> {
    let (name, inline_value) = match word.split_once('=') {
        Some((name, _)) if name.starts_with("--") => (name, true),
        _ => (word, false),
    };
    let arity = match name {
        "-h" | "--help" | "--dry-run" => Arity::Flag,
        "--lumi-type" | "--config" | "--log-level" => Arity::Value,
        "-y" | "--years" => Arity::Many,
        _ => return None,
    };
    // `--years=2023` carries its value already.
    Some(if inline_value { Arity::Flag } else { arity })
}

fn text(word: &OsString) -> std::borrow::Cow<'_, str> {
    word.to_string_lossy()
}

/// Reorder `args` so that unknown `lumi-info` words follow a `--`.
///
/// Arguments of other subcommands are returned unchanged.
pub fn hoist(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut args: Vec<OsString> = args.into_iter().collect();

    // Find the subcommand, skipping the program name and global options.
    let mut i = 1;
    while i < args.len() {
        let word = text(&args[i]);
        if word == "--log-level" {
            i += 2;
        } else if word.starts_with('-') {
            i += 1;
        } else {
            break;
        }
    }
    if args.get(i).is_none_or(|w| text(w) != SUBCOMMAND) {
        return args;
    }

    let rest = args.split_off(i + 1);
    let mut known = Vec::with_capacity(rest.len());
    let mut extra = Vec::new();
    let mut it = rest.into_iter().peekable();
    while let Some(word) = it.next() {
        if text(&word) == "--" {
            extra.extend(it);
            break;
        }
        match arity(&text(&word)) {
            None => extra.push(word),
            Some(Arity::Flag) => known.push(word),
            Some(Arity::Value) => {
                known.push(word);
                known.extend(it.next());
            }
            Some(Arity::Many) => {
                known.push(word);
                while let Some(value) = it.next_if(|w| !text(w).starts_with('-')) {
                    known.push(value);
                }
            }
        }
    }

    args.extend(known);
    if !extra.is_empty() {
        args.push("--".into());
        args.extend(extra);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hoisted(line: &str) -> String {
        let args = hoist(line.split(' ').map(OsString::from));
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn unknown_words_move_behind_separator() {
        assert_eq!(
            hoisted("cmstools lumi-info --dry-run --begin 1 --lumi-type recorded"),
            "cmstools lumi-info --dry-run --lumi-type recorded -- --begin 1"
        );
        assert_eq!(hoisted("cmstools lumi-info -y 2023 -c web"), "cmstools lumi-info -y 2023 -- -c web");
        assert_eq!(
            hoisted("cmstools lumi-info -c web -y 2022 2023 --config=b.yaml"),
            "cmstools lumi-info -y 2022 2023 --config=b.yaml -- -c web"
        );
    }

    #[test]
    fn explicit_separator_is_kept() {
        assert_eq!(
            hoisted("cmstools --log-level DEBUG lumi-info -x -- --dry-run"),
            "cmstools --log-level DEBUG lumi-info -- -x --dry-run"
        );
        assert_eq!(hoisted("cmstools lumi-info --dry-run"), "cmstools lumi-info --dry-run");
    }

    #[test]
    fn other_subcommands_are_untouched() {
        assert_eq!(hoisted("cmstools barycentre f.root -x"), "cmstools barycentre f.root -x");
        assert_eq!(hoisted("cmstools create-jobs lumi-info"), "cmstools create-jobs lumi-info");
        assert_eq!(hoisted("cmstools"), "cmstools");
    }
}
