use std::path::PathBuf;

const USAGE: &str = "Usage: case-intake [--tui-smoke[=personal|case|review|status]]
                   [--analyze <text>]
                   [--transcript <text> [--lang <code>]]
                   [--check-document <path>]

With no flags the interactive terminal wizard starts.";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    TuiSmoke(Option<String>),
    Analyze(String),
    Transcript { text: String, lang: Option<String> },
    CheckDocument(PathBuf),
    Help,
    Tui,
}

/// Value following `flag`, either as `--flag=value` or `--flag value`.
/// `Ok(None)` when the flag is absent; an error when it is present without a value.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>, String> {
    let prefix = format!("{}=", flag);
    for (i, a) in args.iter().enumerate() {
        let value = if let Some(v) = a.strip_prefix(&prefix) {
            Some(v)
        } else if a == flag {
            args.get(i + 1).map(String::as_str).filter(|v| !v.starts_with("--"))
        } else {
            continue;
        };
        return match value {
            Some(v) if !v.trim().is_empty() => Ok(Some(v)),
            _ => Err(format!("{} requires a value", flag)),
        };
    }
    Ok(None)
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    // Non-interactive TUI smoke test mode (for automated checks).
    // Renders a single frame for a specific page and exits 0.
    if let Some(arg) = args
        .iter()
        .find(|a| a.as_str() == "--tui-smoke" || a.starts_with("--tui-smoke="))
    {
        let target = arg
            .split_once('=')
            .map(|(_, v)| v.to_string())
            .filter(|v| !v.trim().is_empty());
        return Ok(Command::TuiSmoke(target));
    }

    if args.iter().any(|a| a == "--help" || a == "-h") {
        return Ok(Command::Help);
    }

    if let Some(text) = flag_value(args, "--analyze")? {
        return Ok(Command::Analyze(text.to_string()));
    }

    if let Some(text) = flag_value(args, "--transcript")? {
        let lang = flag_value(args, "--lang")?.map(str::to_string);
        return Ok(Command::Transcript {
            text: text.to_string(),
            lang,
        });
    }

    if let Some(path) = flag_value(args, "--check-document")? {
        return Ok(Command::CheckDocument(PathBuf::from(path)));
    }

    Ok(Command::Tui)
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let command = match parse_command(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("case-intake: {}", e);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    match command {
        Command::TuiSmoke(target) => case_intake::run_tui_smoke(target),
        Command::Analyze(text) => case_intake::run_analyze(&text),
        // Speech pipeline on a text transcript: translate, extract, print the fields it sets.
        Command::Transcript { text, lang } => {
            case_intake::run_transcript(&text, lang.as_deref())
        }
        Command::CheckDocument(path) => case_intake::run_check_document(&path),
        Command::Help => println!("{}", USAGE),
        Command::Tui => case_intake::run_tui(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("case-intake")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn no_flags_starts_the_wizard() {
        assert_eq!(parse_command(&args(&[])), Ok(Command::Tui));
    }

    #[test]
    fn value_flags_accept_both_spellings() {
        assert_eq!(
            parse_command(&args(&["--analyze", "wages unpaid"])),
            Ok(Command::Analyze("wages unpaid".to_string()))
        );
        assert_eq!(
            parse_command(&args(&["--transcript=naam ravi", "--lang", "hi-IN"])),
            Ok(Command::Transcript {
                text: "naam ravi".to_string(),
                lang: Some("hi-IN".to_string()),
            })
        );
        assert_eq!(
            parse_command(&args(&["--check-document", "fir.txt"])),
            Ok(Command::CheckDocument(PathBuf::from("fir.txt")))
        );
    }

    #[test]
    fn value_flag_without_value_is_an_error_not_the_wizard() {
        for bad in [
            &["--analyze"][..],
            &["--transcript"][..],
            &["--check-document"][..],
            &["--analyze="][..],
            &["--transcript", "--lang", "hi-IN"][..],
            &["--transcript", "naam ravi", "--lang"][..],
        ] {
            let err = parse_command(&args(bad)).unwrap_err();
            assert!(err.contains("requires a value"), "{:?}: {}", bad, err);
        }
    }

    #[test]
    fn smoke_target_is_optional() {
        assert_eq!(
            parse_command(&args(&["--tui-smoke"])),
            Ok(Command::TuiSmoke(None))
        );
        assert_eq!(
            parse_command(&args(&["--tui-smoke=review"])),
            Ok(Command::TuiSmoke(Some("review".to_string())))
        );
    }

    #[test]
    fn help_wins_over_incomplete_flags() {
        assert_eq!(
            parse_command(&args(&["--analyze", "-h"])),
            Ok(Command::Help)
        );
    }
}
