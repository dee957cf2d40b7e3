//! Typed model of a TRX test-results document.
//!
//! Reading is lenient: elements are matched by local name regardless of
//! namespace, unknown content is ignored and missing values read as empty.

use crate::error::{Result, TrxerError};
use crate::markup::{self, Element};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestRun {
    pub id: String,
    pub name: String,
    pub run_user: String,
    pub times: Times,
    pub summary: ResultSummary,
    pub definitions: Vec<UnitTest>,
    pub results: Vec<UnitTestResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Times {
    pub creation: String,
    pub queuing: String,
    pub start: String,
    pub finish: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSummary {
    pub outcome: String,
    pub counters: Option<Counters>,
    pub std_out: String,
    pub run_infos: Vec<RunInfo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub total: i64,
    pub executed: i64,
    pub passed: i64,
    pub failed: i64,
    pub error: i64,
    pub timeout: i64,
    pub aborted: i64,
    pub inconclusive: i64,
    pub passed_but_run_aborted: i64,
    pub not_runnable: i64,
    pub not_executed: i64,
    pub disconnected: i64,
    pub warning: i64,
    pub completed: i64,
    pub in_progress: i64,
    pub pending: i64,
}

/// Run-level message, e.g. a warning from the test adapter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunInfo {
    pub computer_name: String,
    pub outcome: String,
    pub timestamp: String,
    pub text: String,
}

/// Test definition from `TestDefinitions`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitTest {
    pub id: String,
    pub name: String,
    pub storage: String,
    pub description: String,
    pub owners: Vec<String>,
    pub categories: Vec<String>,
    pub execution_id: String,
    pub method: TestMethod,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestMethod {
    pub code_base: String,
    pub adapter_type_name: String,
    pub class_name: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitTestResult {
    pub execution_id: String,
    pub test_id: String,
    pub test_name: String,
    pub computer_name: String,
    pub duration: String,
    pub start_time: String,
    pub end_time: String,
    pub outcome: String,
    pub std_out: String,
    pub std_err: String,
    pub message: String,
    pub stack_trace: String,
    pub result_files: Vec<String>,
}

impl Counters {
    fn from_element(element: &Element) -> Self {
        let count = |name: &str| {
            element
                .attr(name)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(0)
        };
        Self {
            total: count("total"),
            executed: count("executed"),
            passed: count("passed"),
            failed: count("failed"),
            error: count("error"),
            timeout: count("timeout"),
            aborted: count("aborted"),
            inconclusive: count("inconclusive"),
            passed_but_run_aborted: count("passedButRunAborted"),
            not_runnable: count("notRunnable"),
            not_executed: count("notExecuted"),
            disconnected: count("disconnected"),
            warning: count("warning"),
            completed: count("completed"),
            in_progress: count("inProgress"),
            pending: count("pending"),
        }
    }
}

/// Read and parse a TRX file
pub fn read_file(path: &Path) -> Result<TestRun> {
    let source = fs::read_to_string(path).map_err(|e| TrxerError::MalformedInput {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse(&source, path)
}

/// Parse TRX text; `origin` names the source in errors
pub fn parse(source: &str, origin: &Path) -> Result<TestRun> {
    let malformed = |message: String| TrxerError::MalformedInput {
        path: origin.to_path_buf(),
        message,
    };
    let document = markup::parse(source).map_err(|e| malformed(e.to_string()))?;
    let root = &document.root;
    if !root.is("TestRun") {
        return Err(malformed(format!(
            "Expected a TestRun root element, found <{}>",
            root.name
        )));
    }

    let run = TestRun {
        id: attr(root, "id"),
        name: attr(root, "name"),
        run_user: attr(root, "runUser"),
        times: root.child("Times").map(read_times).unwrap_or_default(),
        summary: root
            .child("ResultSummary")
            .map(read_summary)
            .unwrap_or_default(),
        definitions: root
            .child("TestDefinitions")
            .map(|defs| defs.children_named("UnitTest").map(read_unit_test).collect())
            .unwrap_or_default(),
        results: root
            .child("Results")
            .map(|results| {
                results
                    .children_named("UnitTestResult")
                    .map(read_result)
                    .collect()
            })
            .unwrap_or_default(),
    };
    debug!(
        definitions = run.definitions.len(),
        results = run.results.len(),
        "parsed test run"
    );
    Ok(run)
}

fn attr(element: &Element, name: &str) -> String {
    element.attr(name).unwrap_or_default().to_string()
}

fn child_text(element: &Element, name: &str) -> String {
    element.child(name).map(Element::text).unwrap_or_default()
}

fn read_times(times: &Element) -> Times {
    Times {
        creation: attr(times, "creation"),
        queuing: attr(times, "queuing"),
        start: attr(times, "start"),
        finish: attr(times, "finish"),
    }
}

fn read_summary(summary: &Element) -> ResultSummary {
    ResultSummary {
        outcome: attr(summary, "outcome"),
        counters: summary.child("Counters").map(Counters::from_element),
        std_out: summary
            .child("Output")
            .map(|output| child_text(output, "StdOut"))
            .unwrap_or_default(),
        run_infos: summary
            .child("RunInfos")
            .map(|infos| {
                infos
                    .children_named("RunInfo")
                    .map(|info| RunInfo {
                        computer_name: attr(info, "computerName"),
                        outcome: attr(info, "outcome"),
                        timestamp: attr(info, "timestamp"),
                        text: child_text(info, "Text"),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn read_unit_test(test: &Element) -> UnitTest {
    UnitTest {
        id: attr(test, "id"),
        name: attr(test, "name"),
        storage: attr(test, "storage"),
        description: child_text(test, "Description"),
        owners: test
            .child("Owners")
            .map(|owners| {
                owners
                    .children_named("Owner")
                    .map(|o| attr(o, "name"))
                    .collect()
            })
            .unwrap_or_default(),
        categories: test
            .child("TestCategory")
            .map(|cats| {
                cats.children_named("TestCategoryItem")
                    .map(|c| attr(c, "TestCategory"))
                    .collect()
            })
            .unwrap_or_default(),
        execution_id: test
            .child("Execution")
            .map(|e| attr(e, "id"))
            .unwrap_or_default(),
        method: test
            .child("TestMethod")
            .map(|m| TestMethod {
                code_base: attr(m, "codeBase"),
                adapter_type_name: attr(m, "adapterTypeName"),
                class_name: attr(m, "className"),
                name: attr(m, "name"),
            })
            .unwrap_or_default(),
    }
}

fn read_result(result: &Element) -> UnitTestResult {
    let output = result.child("Output");
    let output_text = |name: &str| output.map(|o| child_text(o, name)).unwrap_or_default();
    let error_text = |name: &str| {
        output
            .and_then(|o| o.child("ErrorInfo"))
            .map(|info| child_text(info, name))
            .unwrap_or_default()
    };

    UnitTestResult {
        execution_id: attr(result, "executionId"),
        test_id: attr(result, "testId"),
        test_name: attr(result, "testName"),
        computer_name: attr(result, "computerName"),
        duration: attr(result, "duration"),
        start_time: attr(result, "startTime"),
        end_time: attr(result, "endTime"),
        outcome: attr(result, "outcome"),
        std_out: output_text("StdOut"),
        std_err: output_text("StdErr"),
        message: error_text("Message"),
        stack_trace: error_text("StackTrace"),
        result_files: result
            .child("ResultFiles")
            .map(|files| {
                files
                    .children_named("ResultFile")
                    .map(|f| attr(f, "path"))
                    .collect()
            })
            .unwrap_or_default(),
    }
}
