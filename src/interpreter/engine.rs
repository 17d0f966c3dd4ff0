use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::command::{self, Command, Operation};
use super::error::{Error, InputParseError, Result};
use super::expr::{self, Number};
use super::io::{InputSource, OutputSink};
use super::storage;
use super::store::VariableStore;
use super::{CLOSE_MARKER, OPEN_MARKER};

/// Runs Capybara scripts against a pair of front-end adapters.
///
/// Every instance owns its variables, so a host running several scripts
/// should build one interpreter per run.
pub struct Interpreter<O, I> {
    output: O,
    input: I,
    variables: VariableStore,
    operation: Option<Operation>,
    storage_dir: PathBuf,
}

impl<O: OutputSink, I: InputSource> Interpreter<O, I> {
    /// Create an interpreter saving into the default per-user storage folder
    pub fn new(output: O, input: I) -> Result<Self> {
        let dir = storage::default_dir()
            .unwrap_or_else(|| PathBuf::from(storage::STORAGE_DIR_NAME));
        Self::with_storage_dir(output, input, dir)
    }

    /// Create an interpreter saving into `dir`, creating it if needed
    pub fn with_storage_dir(output: O, input: I, dir: impl Into<PathBuf>) -> Result<Self> {
        let storage_dir = dir.into();
        storage::ensure_dir(&storage_dir)?;

        Ok(Self {
            output,
            input,
            variables: VariableStore::new(),
            operation: None,
            storage_dir,
        })
    }

    /// Validate the envelope and run the body line by line.
    ///
    /// Stops at the first failing line. Output already shown and variables
    /// already set by earlier lines stay as they are.
    pub fn execute(&mut self, code: &str) -> Result<()> {
        let body = code
            .strip_prefix(OPEN_MARKER)
            .and_then(|rest| rest.strip_suffix(CLOSE_MARKER))
            .ok_or(Error::Format)?;

        info!("running script ({} bytes)", body.trim().len());

        // Line numbers count from the line holding the opening marker
        for (idx, raw) in body.split('\n').enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            self.process_line(idx + 1, line)?;
        }

        info!("script finished");
        Ok(())
    }

    fn process_line(&mut self, line_no: usize, line: &str) -> Result<()> {
        let command = match command::decode(line) {
            Ok(Some(command)) => command,
            Ok(None) => {
                debug!(line = line_no, "no command on line, skipping");
                return Ok(());
            }
            Err(message) => return Err(Error::syntax(line_no, message)),
        };

        debug!(line = line_no, ?command, "dispatch");
        self.run_command(line_no, command)
    }

    fn run_command(&mut self, line_no: usize, command: Command) -> Result<()> {
        match command {
            Command::AskText(text) | Command::Say(text) => {
                self.output.display(&text);
            }
            Command::AskExpr(expression) => {
                let value = self.evaluate(line_no, &expression)?;
                self.output.display(&value.to_string());
            }
            Command::RecordInput { name, prompt } => {
                let reply = self.input.request_input(&prompt);
                match parse_int(&reply) {
                    Ok(value) => {
                        self.variables.set(&name, value);
                        self.output.display(&format!("{} = {}", name, value));
                    }
                    Err(e) => {
                        warn!(line = line_no, variable = %name, "{}", e);
                        self.output.display(&e.to_string());
                    }
                }
            }
            Command::SelectOperation(operation) => {
                // Recorded only; compute evaluates whatever operators it is given
                self.operation = Some(operation);
                self.output
                    .display(&format!("selected {} operation", operation));
            }
            Command::Compute(expression) => {
                let value = self.evaluate(line_no, &expression)?;
                self.output.display(&format!("result: {}", value));
            }
            Command::Declare(name) => {
                self.variables.declare(&name);
                self.output
                    .display(&format!("variable {} declared", name));
            }
            Command::Save { name, content } => {
                let path = self
                    .storage_dir
                    .join(format!("{}.{}", name, storage::EXTENSION));
                self.save(&path, &content)?;
            }
        }
        Ok(())
    }

    fn evaluate(&self, line_no: usize, expression: &str) -> Result<Number> {
        expr::evaluate(expression, &self.variables).map_err(|source| Error::Evaluation {
            line: line_no,
            expression: expression.to_string(),
            source,
        })
    }

    /// Write `content` to `path` and report it through the display sink
    pub fn save(&mut self, path: &Path, content: &str) -> Result<()> {
        storage::save(path, content)?;
        info!(path = %path.display(), "saved");
        self.output
            .display(&format!("saved to {}", path.display()));
        Ok(())
    }

    /// Read a script or data file
    pub fn load(&self, path: &Path) -> Result<String> {
        storage::load(path)
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn operation(&self) -> Option<Operation> {
        self.operation
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }
}

fn parse_int(reply: &str) -> std::result::Result<i64, InputParseError> {
    reply.trim().parse::<i64>().map_err(|_| InputParseError {
        input: reply.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::error::EvalError;
    use crate::interpreter::io::{ScriptedInput, Transcript};
    use crate::interpreter::store::Slot;

    fn script(body: &str) -> String {
        format!("{}\n{}\n{}", OPEN_MARKER, body, CLOSE_MARKER)
    }

    fn run(body: &str, replies: &[&str]) -> (Result<()>, Transcript, ScriptedInput) {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Transcript::new();
        let mut input = ScriptedInput::new(replies.iter().copied());
        let result = {
            let mut interp =
                Interpreter::with_storage_dir(&mut out, &mut input, dir.path()).unwrap();
            interp.execute(&script(body))
        };
        (result, out, input)
    }

    #[test]
    fn missing_markers_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Transcript::new();
        let mut input = ScriptedInput::default();
        let mut interp =
            Interpreter::with_storage_dir(&mut out, &mut input, dir.path()).unwrap();

        assert!(matches!(interp.execute("no markers"), Err(Error::Format)));
        assert!(matches!(
            interp.execute(&format!("{} 말해바라~ \"hi\"", OPEN_MARKER)),
            Err(Error::Format)
        ));
        // Markers are checked before trimming
        assert!(matches!(
            interp.execute(&format!(" {}{}", OPEN_MARKER, CLOSE_MARKER)),
            Err(Error::Format)
        ));
        assert!(matches!(
            interp.execute(&format!("{}{}\n", OPEN_MARKER, CLOSE_MARKER)),
            Err(Error::Format)
        ));
        drop(interp);
        assert!(out.lines.is_empty());
    }

    #[test]
    fn empty_body_runs() {
        let (result, out, _) = run("", &[]);
        assert!(result.is_ok());
        assert!(out.lines.is_empty());
    }

    #[test]
    fn lines_run_in_order_and_blank_lines_are_skipped() {
        let (result, out, _) = run(
            "말해바라~ \"하나\"\n\n   \n  말해바라~ \"둘\"  \n물어바라~ (1 + 2)",
            &[],
        );
        assert!(result.is_ok());
        assert_eq!(out.lines, vec!["하나", "둘", "3"]);
    }

    #[test]
    fn ask_with_quoted_text_displays_it_verbatim() {
        let (result, out, _) = run(r#"물어바라~ ("Hello")"#, &[]);
        assert!(result.is_ok());
        assert_eq!(out.lines, vec!["Hello"]);
    }

    #[test]
    fn ask_with_expression_displays_result() {
        let (result, out, _) = run("물어바라~ (2+2)", &[]);
        assert!(result.is_ok());
        assert_eq!(out.lines, vec!["4"]);
    }

    #[test]
    fn ask_without_argument_is_syntax_error() {
        let (result, out, _) = run("물어바라~", &[]);
        assert!(matches!(result, Err(Error::Syntax { line: 2, .. })));
        assert!(out.lines.is_empty());
    }

    #[test]
    fn record_input_stores_number() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Transcript::new();
        let mut input = ScriptedInput::new(["7"]);
        let mut interp =
            Interpreter::with_storage_dir(&mut out, &mut input, dir.path()).unwrap();

        interp
            .execute(&script(r#"적어바라~ n ("숫자를 입력해")"#))
            .unwrap();
        assert_eq!(interp.variables().value("n"), Some(7));
        drop(interp);

        assert_eq!(input.prompts, vec!["숫자를 입력해"]);
        assert_eq!(out.lines.len(), 1);
        assert!(out.lines[0].contains('n'));
        assert!(out.lines[0].contains('7'));
    }

    #[test]
    fn record_input_with_bad_number_reports_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Transcript::new();
        let mut input = ScriptedInput::new(["abc"]);
        let mut interp =
            Interpreter::with_storage_dir(&mut out, &mut input, dir.path()).unwrap();

        let result = interp.execute(&script(
            "변수바라~ n\n적어바라~ n (\"숫자\")\n말해바라~ \"계속\"",
        ));
        assert!(result.is_ok());
        assert_eq!(interp.variables().get("n"), Some(Slot::Unset));
        drop(interp);

        assert_eq!(out.lines.len(), 3);
        assert!(out.lines[1].contains("abc"));
        assert_eq!(out.lines[2], "계속");
    }

    #[test]
    fn record_input_leaves_undeclared_variable_absent_on_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Transcript::new();
        let mut input = ScriptedInput::new(["seven"]);
        let mut interp =
            Interpreter::with_storage_dir(&mut out, &mut input, dir.path()).unwrap();

        interp
            .execute(&script(r#"적어바라~ n ("숫자")"#))
            .unwrap();
        assert!(interp.variables().get("n").is_none());
    }

    #[test]
    fn record_input_then_compute() {
        let (result, out, _) = run(
            "적어바라~ a (\"a?\")\n적어바라~ b (\"b?\")\n계산해바라~ (a * b + 1)",
            &["6", " 7 "],
        );
        assert!(result.is_ok());
        assert_eq!(out.lines, vec!["a = 6", "b = 7", "result: 43"]);
    }

    #[test]
    fn compute_on_unset_variable_is_evaluation_error() {
        let (result, out, _) = run("변수바라~ x\n계산해바라~ (x + 1)", &[]);
        match result {
            Err(Error::Evaluation {
                line,
                expression,
                source,
            }) => {
                assert_eq!(line, 3);
                assert_eq!(expression, "x + 1");
                assert_eq!(source, EvalError::Uninitialized("x".to_string()));
            }
            other => panic!("expected evaluation error, got {:?}", other),
        }
        assert_eq!(out.lines, vec!["variable x declared"]);
    }

    #[test]
    fn compute_rejects_attribute_access() {
        let (result, _, _) = run("계산해바라~ (x.__class__)", &[]);
        assert!(matches!(
            result,
            Err(Error::Evaluation {
                source: EvalError::AttributeAccess(_),
                ..
            })
        ));
    }

    #[test]
    fn compute_without_parentheses_is_syntax_error() {
        let (result, _, _) = run("계산해바라~ 1 + 1", &[]);
        assert!(matches!(result, Err(Error::Syntax { .. })));
    }

    #[test]
    fn compute_with_text_after_the_group_is_syntax_error() {
        let (result, out, _) = run("계산해바라~ (1 + 2) * 3", &[]);
        assert!(matches!(result, Err(Error::Syntax { line: 2, .. })));
        assert!(out.lines.is_empty());

        let (result, out, _) = run("계산해바라~ ((1 + 2) * 3)", &[]);
        assert!(result.is_ok());
        assert_eq!(out.lines, vec!["result: 9"]);
    }

    #[test]
    fn deeply_nested_compute_is_evaluation_error() {
        let line = format!("계산해바라~ ({}1{})", "(".repeat(10_000), ")".repeat(10_000));
        let (result, _, _) = run(&line, &[]);
        assert!(matches!(
            result,
            Err(Error::Evaluation {
                source: EvalError::TooDeep(_),
                ..
            })
        ));
    }

    #[test]
    fn error_stops_remaining_lines() {
        let (result, out, _) = run(
            "말해바라~ \"before\"\n말해바라~\n말해바라~ \"after\"",
            &[],
        );
        assert!(matches!(result, Err(Error::Syntax { line: 3, .. })));
        assert_eq!(out.lines, vec!["before"]);
    }

    #[test]
    fn select_operation_is_tracked_but_not_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Transcript::new();
        let mut input = ScriptedInput::default();
        let mut interp =
            Interpreter::with_storage_dir(&mut out, &mut input, dir.path()).unwrap();

        interp
            .execute(&script(
                "연산을 선택해바라~ \"덧셈\"\n계산해바라~ (6 * 7)",
            ))
            .unwrap();
        assert_eq!(interp.operation(), Some(Operation::Addition));
        drop(interp);
        assert_eq!(out.lines, vec!["selected 덧셈 operation", "result: 42"]);
    }

    #[test]
    fn lines_without_triggers_are_ignored() {
        let (result, out, _) = run("그냥 메모\n말해바라~ \"ok\"", &[]);
        assert!(result.is_ok());
        assert_eq!(out.lines, vec!["ok"]);
    }

    #[test]
    fn save_command_writes_into_storage_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Transcript::new();
        let mut input = ScriptedInput::default();
        let mut interp =
            Interpreter::with_storage_dir(&mut out, &mut input, dir.path()).unwrap();

        interp.execute(&script("저장바라~ memo(hello)")).unwrap();
        let path = dir.path().join("memo.capybara");
        assert_eq!(interp.load(&path).unwrap(), "hello");
        drop(interp);
        assert_eq!(out.lines.len(), 1);
        assert!(out.lines[0].contains("memo.capybara"));
    }

    #[test]
    fn save_and_load_round_trip_with_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Transcript::new();
        let mut input = ScriptedInput::default();
        let mut interp =
            Interpreter::with_storage_dir(&mut out, &mut input, dir.path()).unwrap();

        let path = dir.path().join("data.capybara");
        interp.save(&path, "data").unwrap();
        assert_eq!(interp.load(&path).unwrap(), "data");
        drop(interp);
        assert_eq!(out.lines, vec![format!("saved to {}", path.display())]);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Transcript::new();
        let mut input = ScriptedInput::default();
        let interp =
            Interpreter::with_storage_dir(&mut out, &mut input, dir.path()).unwrap();

        let missing = dir.path().join("nope.capybara");
        assert!(matches!(
            interp.load(&missing),
            Err(Error::NotFound { path }) if path == missing
        ));
    }

    #[test]
    fn construction_creates_storage_dir() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("저장소");
        let interp =
            Interpreter::with_storage_dir(Transcript::new(), ScriptedInput::default(), &target)
                .unwrap();
        assert!(target.is_dir());
        assert_eq!(interp.storage_dir(), target.as_path());
    }

    #[test]
    fn each_interpreter_starts_with_empty_variables() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = Interpreter::with_storage_dir(
            Transcript::new(),
            ScriptedInput::new(["1"]),
            dir.path(),
        )
        .unwrap();
        first.execute(&script(r#"적어바라~ n ("n")"#)).unwrap();
        assert_eq!(first.variables().value("n"), Some(1));

        let second =
            Interpreter::with_storage_dir(Transcript::new(), ScriptedInput::default(), dir.path())
                .unwrap();
        assert!(second.variables().is_empty());
    }
}
