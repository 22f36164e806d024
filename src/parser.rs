use crate::ast::{Command, Pipeline};
use crate::errors::ShellError;

/// Longest accepted command line, in characters.
pub const MAX_LINE: usize = 512;
/// Most argv tokens accepted per pipeline stage.
pub const MAX_ARGS: usize = 16;

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Word(String),
    Pipe,
    RedirectIn,
    RedirectOut,
    Ampersand,
}

/// Split a line into words and operator tokens.
///
/// Words are runs of characters outside `{' ', '|', '<', '>', '&'}`; the four
/// operators delimit words even without surrounding spaces. Only the space
/// character separates tokens, so a tab is an ordinary word character.
fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();

    for ch in line.chars() {
        let operator = match ch {
            '|' => Some(Token::Pipe),
            '<' => Some(Token::RedirectIn),
            '>' => Some(Token::RedirectOut),
            '&' => Some(Token::Ampersand),
            ' ' => None,
            _ => {
                word.push(ch);
                continue;
            }
        };

        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(&mut word)));
        }
        if let Some(token) = operator {
            tokens.push(token);
        }
    }

    if !word.is_empty() {
        tokens.push(Token::Word(word));
    }
    tokens
}

/// Parse one input line into a pipeline.
///
/// Returns `Ok(None)` for a blank line. The line is taken with its trailing
/// newline already stripped and is preserved verbatim as the pipeline's
/// `raw` text.
pub fn parse(line: &str) -> Result<Option<Pipeline>, ShellError> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    if line.len() > MAX_LINE {
        return Err(ShellError::InvalidCmdline);
    }

    let mut tokens = tokenize(line);

    // A trailing `&` marks a background pipeline; an `&` anywhere else is an
    // error. With nothing at all before the sign there is no pipeline to run.
    let mut background = false;
    if let Some(position) = tokens.iter().position(|token| *token == Token::Ampersand) {
        if position == 0 {
            return Err(ShellError::InvalidCmdline);
        }
        if position + 1 != tokens.len() {
            return Err(ShellError::BackgroundMislocated);
        }
        background = true;
        tokens.truncate(position);
    }

    // Split the token stream into stages on `|`.
    let mut stages: Vec<Vec<Token>> = vec![Vec::new()];
    for token in tokens {
        if token == Token::Pipe {
            stages.push(Vec::new());
        } else {
            stages.last_mut().expect("stages starts non-empty").push(token);
        }
    }

    let count = stages.len();
    let mut commands = Vec::with_capacity(count);
    for (index, stage) in stages.into_iter().enumerate() {
        commands.push(parse_stage(stage, index, count)?);
    }

    Ok(Some(Pipeline {
        raw: line.to_string(),
        commands,
        background,
    }))
}

fn parse_stage(tokens: Vec<Token>, index: usize, count: usize) -> Result<Command, ShellError> {
    if tokens.is_empty() {
        return Err(ShellError::InvalidCmdline);
    }

    let mut argv = Vec::new();
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();

    let mut iter = tokens.into_iter();
    while let Some(token) = iter.next() {
        match token {
            Token::Word(word) => {
                if argv.len() == MAX_ARGS {
                    return Err(ShellError::InvalidCmdline);
                }
                argv.push(word);
            }
            Token::RedirectIn => match iter.next() {
                Some(Token::Word(target)) => inputs.push(target),
                _ => return Err(ShellError::NoInputFile),
            },
            Token::RedirectOut => match iter.next() {
                Some(Token::Word(target)) => outputs.push(target),
                _ => return Err(ShellError::NoOutputFile),
            },
            // `|` split the stages and `&` was stripped above.
            Token::Pipe | Token::Ampersand => return Err(ShellError::InvalidCmdline),
        }
    }

    if index != 0 && !inputs.is_empty() {
        return Err(ShellError::InputMislocated);
    }
    if index + 1 != count && !outputs.is_empty() {
        return Err(ShellError::OutputMislocated);
    }

    // A stage of nothing but redirections names no program to run; report the
    // redirection that is left without a command.
    if argv.is_empty() {
        return Err(if !inputs.is_empty() {
            ShellError::NoInputFile
        } else {
            ShellError::NoOutputFile
        });
    }

    Ok(Command::new(argv, inputs, outputs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(line: &str) -> Pipeline {
        parse(line).unwrap().unwrap()
    }

    #[test]
    fn simple_command() {
        let pipeline = parse_one("echo hello world");
        assert_eq!(pipeline.commands.len(), 1);
        assert_eq!(pipeline.commands[0].argv, vec!["echo", "hello", "world"]);
        assert!(!pipeline.background);
        assert_eq!(pipeline.raw, "echo hello world");
    }

    #[test]
    fn blank_lines_parse_to_nothing() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("     ").unwrap(), None);
    }

    #[test]
    fn operators_delimit_words_without_spaces() {
        let pipeline = parse_one("echo hi|wc");
        assert_eq!(pipeline.commands.len(), 2);
        assert_eq!(pipeline.commands[0].argv, vec!["echo", "hi"]);
        assert_eq!(pipeline.commands[1].argv, vec!["wc"]);
    }

    #[test]
    fn spaced_and_unspaced_forms_parse_alike() {
        let tight = parse_one("echo a|wc");
        let spaced = parse_one("echo a | wc");
        assert_eq!(tight.commands, spaced.commands);
    }

    #[test]
    fn parsing_is_deterministic() {
        let line = "cat < in.txt | tr a b | wc -l > out.txt";
        assert_eq!(parse(line).unwrap(), parse(line).unwrap());
    }

    #[test]
    fn redirections_recorded_in_order() {
        let pipeline = parse_one("cat < a.txt < b.txt > c.txt > d.txt");
        let cmd = &pipeline.commands[0];
        assert_eq!(cmd.argv, vec!["cat"]);
        assert_eq!(cmd.inputs, vec!["a.txt", "b.txt"]);
        assert_eq!(cmd.outputs, vec!["c.txt", "d.txt"]);
    }

    #[test]
    fn redirection_may_precede_the_command_word() {
        let pipeline = parse_one("> out.txt ls");
        assert_eq!(pipeline.commands[0].argv, vec!["ls"]);
        assert_eq!(pipeline.commands[0].outputs, vec!["out.txt"]);
    }

    #[test]
    fn background_marker_at_end() {
        let pipeline = parse_one("sleep 1 &");
        assert!(pipeline.background);
        assert_eq!(pipeline.raw, "sleep 1 &");
        assert_eq!(pipeline.commands[0].argv, vec!["sleep", "1"]);
    }

    #[test]
    fn background_marker_without_space() {
        let pipeline = parse_one("sleep 1&");
        assert!(pipeline.background);
        assert_eq!(pipeline.commands[0].argv, vec!["sleep", "1"]);
    }

    #[test]
    fn tab_is_an_ordinary_character() {
        let pipeline = parse_one("echo\thi");
        assert_eq!(pipeline.commands[0].argv, vec!["echo\thi"]);
    }

    #[test]
    fn empty_stages_are_invalid() {
        assert_eq!(parse("| ls"), Err(ShellError::InvalidCmdline));
        assert_eq!(parse("ls |"), Err(ShellError::InvalidCmdline));
        assert_eq!(parse("ls || wc"), Err(ShellError::InvalidCmdline));
    }

    #[test]
    fn missing_redirection_targets() {
        assert_eq!(parse("cat <"), Err(ShellError::NoInputFile));
        assert_eq!(parse("echo hi >"), Err(ShellError::NoOutputFile));
        // Another operator where the filename should be.
        assert_eq!(parse("cat < > out.txt"), Err(ShellError::NoInputFile));
        assert_eq!(parse("cat < | wc"), Err(ShellError::NoInputFile));
    }

    #[test]
    fn redirection_only_stage_reports_the_redirection() {
        assert_eq!(parse("ls | > out.txt"), Err(ShellError::NoOutputFile));
        assert_eq!(parse("< in.txt"), Err(ShellError::NoInputFile));
    }

    #[test]
    fn mislocated_redirections() {
        assert_eq!(parse("ls | wc < in.txt"), Err(ShellError::InputMislocated));
        assert_eq!(parse("ls > out.txt | wc"), Err(ShellError::OutputMislocated));
    }

    #[test]
    fn mislocated_background_sign() {
        assert_eq!(parse("echo a & echo b"), Err(ShellError::BackgroundMislocated));
        assert_eq!(parse("sleep 1 & &"), Err(ShellError::BackgroundMislocated));
    }

    #[test]
    fn leading_ampersand_is_invalid() {
        assert_eq!(parse("& ls"), Err(ShellError::InvalidCmdline));
        assert_eq!(parse("&"), Err(ShellError::InvalidCmdline));
    }

    #[test]
    fn argv_limit_enforced_per_stage() {
        let at_limit = (0..MAX_ARGS).map(|n| n.to_string()).collect::<Vec<_>>().join(" ");
        assert!(parse(&at_limit).unwrap().is_some());

        let over = format!("{at_limit} extra");
        assert_eq!(parse(&over), Err(ShellError::InvalidCmdline));
    }

    #[test]
    fn line_length_limit_enforced() {
        let long = "x".repeat(MAX_LINE + 1);
        assert_eq!(parse(&long), Err(ShellError::InvalidCmdline));
    }
}
