//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Response used by mock commands that succeed.
pub const OK_RESPONSE: &str = r#"{"summary": "ملخص المادة", "keywords": ["عامل", "أجر"], "aspect": "موضوعي", "ocr_corrections": []}"#;

/// Input and output folders inside a temporary directory.
pub struct Workspace {
    pub dir: TempDir,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let input = dir.path().join("sources");
        let output = dir.path().join("out");
        fs::create_dir_all(&input).expect("create input dir");
        Self { dir, input, output }
    }

    /// Write a source document into the input folder.
    pub fn source(&self, name: &str, content: &str) -> PathBuf {
        let path = self.input.join(name);
        fs::write(&path, content).expect("write source");
        path
    }

    /// Write a mock analysis script and return the command that runs it.
    ///
    /// The script receives the prompt on stdin.
    pub fn mock_command(&self, name: &str, script: &str) -> String {
        let path = self.dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("write mock script");
        format!("sh {}", path.display())
    }

    /// Mock that ignores its input and prints `response`.
    pub fn mock_response(&self, name: &str, response: &str) -> String {
        let body = self.dir.path().join(format!("{name}.json"));
        fs::write(&body, response).expect("write mock response");
        self.mock_command(name, &format!("cat >/dev/null\ncat '{}'", body.display()))
    }

    /// Run `alu` with the given arguments.
    pub fn alu(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_alu"))
            .args(args)
            .env_remove("GEMINI_API_KEY")
            .env_remove("RUST_LOG")
            .output()
            .expect("run alu")
    }

    /// `alu <stage> --input .. --output ..` with a mock command and no delay.
    pub fn enrich_with(&self, stage: &str, command: &str) -> Output {
        self.alu(&[
            stage,
            "--input",
            path_str(&self.input),
            "--output",
            path_str(&self.output),
            "--retry-delay-secs",
            "0",
            "--analysis-command",
            command,
        ])
    }

    pub fn doc_dir(&self, slug: &str) -> PathBuf {
        self.output.join(slug)
    }

    pub fn unit_path(&self, slug: &str, number: u32) -> PathBuf {
        self.doc_dir(slug)
            .join(format!("{slug}--مادة-{number:03}.md"))
    }

    pub fn run_report(&self) -> Value {
        read_json(&self.output.join("run_report.json"))
    }
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

pub fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("read {}: {err}", path.display()));
    serde_json::from_str(&text).expect("parse json")
}

/// Parse the YAML metadata block of a unit or parent record.
pub fn front_matter(path: &Path) -> serde_yaml::Value {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("read {}: {err}", path.display()));
    let rest = text.strip_prefix("---\n").expect("front matter start");
    let end = rest.find("\n---").expect("front matter end");
    serde_yaml::from_str(&rest[..end]).expect("parse front matter")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Labor-law style document with three articles listed out of order.
pub fn labor_law() -> &'static str {
    "---\nالنوع: نظام\nالرقم: م/51\nالحالة: ساري\n---\n# نظام العمل\n\nديباجة النظام.\n\n## النص الكامل للمواد\n\n**المادة 3**\nيلتزم صاحب العمل بالأجر.\n\n**المادة 1**\nالتعريفات: العامل هو كل شخص.\n\n**المادة 2**\nيسري النظام على كل عقد.\n\n## الملاحق\n\nلا يوجد.\n"
}

/// Short generic document with two articles.
pub fn circular(title: &str) -> String {
    format!("# {title}\n\n## النص الكامل للمواد\n\n**المادة ١**\nأولاً.\n\n**المادة ٢**\nثانياً.\n")
}
