use std::path::Path;
use std::process::Output;

use assert_cmd::Command;
use walkdir::WalkDir;

/// What a fixture says about its own run, read from trailing comments:
/// `// expect: ` for stdout lines, `// stderr: ` for stderr lines and
/// `// exit: ` for a non-zero exit code.
struct Expectations {
    stdout: Vec<String>,
    stderr: Vec<String>,
    exit_code: i32,
}

fn find_expects(filename: &Path) -> Expectations {
    let content = std::fs::read_to_string(filename)
        .unwrap_or_else(|_| panic!("failed to read {}", filename.display()));

    let mut expectations = Expectations {
        stdout: vec![],
        stderr: vec![],
        exit_code: 0,
    };

    for line in content.lines() {
        if let Some(idx) = line.find("// expect: ") {
            expectations
                .stdout
                .push(line[idx + "// expect: ".len()..].into());
        } else if let Some(idx) = line.find("// stderr: ") {
            expectations
                .stderr
                .push(line[idx + "// stderr: ".len()..].into());
        } else if let Some(idx) = line.find("// exit: ") {
            expectations.exit_code = line[idx + "// exit: ".len()..].trim().parse().unwrap();
        }
    }

    expectations
}

fn rox(args: &[&str]) -> Output {
    let mut cmd = Command::cargo_bin("rox").unwrap();
    cmd.args(args).output().unwrap()
}

fn check_fixtures(subcommand: &str) {
    let dir = format!("./tests/data/{}/", subcommand);

    let entries = WalkDir::new(&dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|o| o.ok())
        .filter(|e| e.file_type().is_file());

    let mut checked = 0;

    for entry in entries {
        let filename = entry.path();
        print!("{} ... ", filename.display());

        let expected = find_expects(filename);
        let output = rox(&[subcommand, filename.to_str().unwrap()]);

        let stdout = String::from_utf8(output.stdout).unwrap();
        let stderr = String::from_utf8(output.stderr).unwrap();

        assert_eq!(
            expected.stdout.join("\n"),
            stdout.trim_end(),
            "stdout of {}, stderr={}",
            filename.display(),
            stderr
        );
        assert_eq!(
            expected.stderr.join("\n"),
            stderr.trim_end(),
            "stderr of {}",
            filename.display()
        );
        assert_eq!(
            Some(expected.exit_code),
            output.status.code(),
            "exit code of {}",
            filename.display()
        );

        println!("OK");
        checked += 1;
    }

    assert!(checked > 0, "no fixtures under {}", dir);
}

#[test]
fn run_all_files() {
    check_fixtures("run");
}

#[test]
fn evaluate_all_files() {
    check_fixtures("evaluate");
}

#[test]
fn tokenize_prints_tokens_and_reports_lexical_errors() {
    let output = rox(&["tokenize", "tests/data/tokenize/unexpected_char.lox"]);

    assert_eq!(output.status.code(), Some(65));
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "VAR var null\n\
         IDENTIFIER x null\n\
         EQUAL = null\n\
         NUMBER 1 1.0\n\
         NUMBER 2 2.0\n\
         SEMICOLON ; null\n\
         EOF  null\n"
    );
    assert_eq!(
        String::from_utf8(output.stderr).unwrap(),
        "[line 1] Error: Unexpected character: @\n"
    );
}

#[test]
fn tokenize_as_json() {
    let output = rox(&["tokenize", "--json", "tests/data/evaluate/concat.lox"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.trim_start().starts_with('['));
    assert!(stdout.contains("\"lexeme\": \"3.5\""));
}

#[test]
fn parse_prints_prefix_and_rpn_forms() {
    let output = rox(&["parse", "tests/data/evaluate/arithmetic.lox"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "(- (* (group (+ 1.0 2.0)) 3.0) (/ 4.0 2.0))\n"
    );

    let output = rox(&["parse", "--rpn", "tests/data/evaluate/arithmetic.lox"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "1.0 2.0 + group 3.0 * 4.0 2.0 / -\n"
    );
}

#[test]
fn parse_rejects_a_program() {
    let output = rox(&["parse", "tests/data/run/closures.lox"]);

    assert_eq!(output.status.code(), Some(65));
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_file_is_an_error() {
    let output = rox(&["run", "tests/data/does_not_exist.lox"]);

    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr)
        .unwrap()
        .contains("Failed to open file"));
}

#[test]
fn repl_keeps_state_between_lines() {
    let mut cmd = Command::cargo_bin("rox").unwrap();
    let output = cmd
        .arg("repl")
        .write_stdin("var a = 20;\nprint a + 1;\nprint 1 / 0;\nprint a;\n")
        .output()
        .unwrap();

    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("21\n"));
    assert!(stdout.contains("20\n"));

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert_eq!(stderr, "Divide by zero.\n[line 1]\n");
}
