//! Render data for the report template, projected from a [`TestRun`].

use crate::trx::{Counters, TestRun, UnitTest, UnitTestResult};
use serde::Serialize;
use std::collections::HashMap;

/// Class name used for results without a matching test definition
pub const UNKNOWN_CLASS: &str = "(unknown)";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub run: RunView,
    pub counters: CountersView,
    /// Passed share of the total, in whole percent
    pub pass_percent: i64,
    pub classes: Vec<ClassView>,
    pub results: Vec<ResultView>,
    pub failed_results: Vec<ResultView>,
    pub run_messages: Vec<RunMessageView>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunView {
    pub id: String,
    pub name: String,
    pub run_user: String,
    pub outcome: String,
    pub creation: String,
    pub queuing: String,
    pub start: String,
    pub finish: String,
    pub std_out: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CountersView {
    pub total: i64,
    pub executed: i64,
    pub passed: i64,
    pub failed: i64,
    pub error: i64,
    pub timeout: i64,
    pub aborted: i64,
    pub inconclusive: i64,
    pub not_executed: i64,
    pub warning: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClassView {
    /// Assembly-qualified class name as recorded in the definition
    pub name: String,
    /// "Passed", "Failed" or "Warning"
    pub outcome: String,
    pub total: i64,
    pub passed: i64,
    pub failed: i64,
    pub other: i64,
    pub tests: Vec<ResultView>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub test_id: String,
    pub execution_id: String,
    pub name: String,
    pub class_name: String,
    pub storage: String,
    pub description: String,
    pub owners: Vec<String>,
    pub categories: Vec<String>,
    pub outcome: String,
    pub computer_name: String,
    pub duration: String,
    pub start_time: String,
    pub end_time: String,
    pub std_out: String,
    pub std_err: String,
    pub message: String,
    pub stack_trace: String,
    pub result_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunMessageView {
    pub computer_name: String,
    pub outcome: String,
    pub timestamp: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutcomeKind {
    Passed,
    Failed,
    Other,
}

fn outcome_kind(outcome: &str) -> OutcomeKind {
    match outcome.to_ascii_lowercase().as_str() {
        "passed" => OutcomeKind::Passed,
        "failed" | "error" | "timeout" | "aborted" => OutcomeKind::Failed,
        _ => OutcomeKind::Other,
    }
}

impl Report {
    pub fn from_run(run: &TestRun) -> Self {
        let definitions: HashMap<&str, &UnitTest> = run
            .definitions
            .iter()
            .map(|d| (d.id.as_str(), d))
            .collect();

        let results: Vec<ResultView> = run
            .results
            .iter()
            .map(|r| ResultView::new(r, definitions.get(r.test_id.as_str()).copied()))
            .collect();

        let counters = run
            .summary
            .counters
            .map(CountersView::from)
            .unwrap_or_else(|| CountersView::tally(&results));

        Report {
            run: RunView {
                id: run.id.clone(),
                name: run.name.clone(),
                run_user: run.run_user.clone(),
                outcome: run.summary.outcome.clone(),
                creation: run.times.creation.clone(),
                queuing: run.times.queuing.clone(),
                start: run.times.start.clone(),
                finish: run.times.finish.clone(),
                std_out: run.summary.std_out.clone(),
            },
            pass_percent: percent(counters.passed, counters.total),
            counters,
            classes: group_by_class(&results),
            failed_results: results
                .iter()
                .filter(|r| outcome_kind(&r.outcome) == OutcomeKind::Failed)
                .cloned()
                .collect(),
            results,
            run_messages: run
                .summary
                .run_infos
                .iter()
                .map(|info| RunMessageView {
                    computer_name: info.computer_name.clone(),
                    outcome: info.outcome.clone(),
                    timestamp: info.timestamp.clone(),
                    text: info.text.clone(),
                })
                .collect(),
        }
    }
}

impl ResultView {
    fn new(result: &UnitTestResult, definition: Option<&UnitTest>) -> Self {
        let class_name = definition
            .map(|d| d.method.class_name.clone())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| UNKNOWN_CLASS.to_string());

        ResultView {
            test_id: result.test_id.clone(),
            execution_id: result.execution_id.clone(),
            name: result.test_name.clone(),
            class_name,
            storage: definition.map(|d| d.storage.clone()).unwrap_or_default(),
            description: definition
                .map(|d| d.description.clone())
                .unwrap_or_default(),
            owners: definition.map(|d| d.owners.clone()).unwrap_or_default(),
            categories: definition.map(|d| d.categories.clone()).unwrap_or_default(),
            outcome: result.outcome.clone(),
            computer_name: result.computer_name.clone(),
            duration: result.duration.clone(),
            start_time: result.start_time.clone(),
            end_time: result.end_time.clone(),
            std_out: result.std_out.clone(),
            std_err: result.std_err.clone(),
            message: result.message.clone(),
            stack_trace: result.stack_trace.clone(),
            result_files: result.result_files.clone(),
        }
    }
}

impl From<Counters> for CountersView {
    fn from(c: Counters) -> Self {
        CountersView {
            total: c.total,
            executed: c.executed,
            passed: c.passed,
            failed: c.failed,
            error: c.error,
            timeout: c.timeout,
            aborted: c.aborted,
            inconclusive: c.inconclusive,
            not_executed: c.not_executed,
            warning: c.warning,
        }
    }
}

impl CountersView {
    /// Counters derived from the results when the summary has none
    fn tally(results: &[ResultView]) -> Self {
        let count = |outcome: &str| {
            results
                .iter()
                .filter(|r| r.outcome.eq_ignore_ascii_case(outcome))
                .count() as i64
        };
        let total = results.len() as i64;
        let not_executed = count("NotExecuted");
        CountersView {
            total,
            executed: total - not_executed,
            passed: count("Passed"),
            failed: count("Failed"),
            error: count("Error"),
            timeout: count("Timeout"),
            aborted: count("Aborted"),
            inconclusive: count("Inconclusive"),
            not_executed,
            warning: count("Warning"),
        }
    }
}

fn percent(part: i64, total: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        let ratio = i128::from(part) * 100 / i128::from(total);
        i64::try_from(ratio).unwrap_or(if ratio < 0 { i64::MIN } else { i64::MAX })
    }
}

/// Classes in order of first appearance, tests in result order
fn group_by_class(results: &[ResultView]) -> Vec<ClassView> {
    let mut classes: Vec<ClassView> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for result in results {
        let slot = *index.entry(result.class_name.as_str()).or_insert_with(|| {
            classes.push(ClassView {
                name: result.class_name.clone(),
                outcome: String::new(),
                total: 0,
                passed: 0,
                failed: 0,
                other: 0,
                tests: Vec::new(),
            });
            classes.len() - 1
        });

        let class = &mut classes[slot];
        class.total += 1;
        match outcome_kind(&result.outcome) {
            OutcomeKind::Passed => class.passed += 1,
            OutcomeKind::Failed => class.failed += 1,
            OutcomeKind::Other => class.other += 1,
        }
        class.tests.push(result.clone());
    }

    for class in &mut classes {
        class.outcome = if class.failed > 0 {
            "Failed"
        } else if class.other > 0 {
            "Warning"
        } else {
            "Passed"
        }
        .to_string();
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trx::{ResultSummary, TestMethod};
    use pretty_assertions::assert_eq;

    fn definition(id: &str, class_name: &str) -> UnitTest {
        UnitTest {
            id: id.to_string(),
            name: id.to_string(),
            method: TestMethod {
                class_name: class_name.to_string(),
                ..TestMethod::default()
            },
            ..UnitTest::default()
        }
    }

    fn result(test_id: &str, outcome: &str) -> UnitTestResult {
        UnitTestResult {
            test_id: test_id.to_string(),
            test_name: test_id.to_string(),
            outcome: outcome.to_string(),
            ..UnitTestResult::default()
        }
    }

    fn run() -> TestRun {
        TestRun {
            definitions: vec![
                definition("a1", "Ns.A, Asm"),
                definition("b1", "Ns.B, Asm"),
                definition("a2", "Ns.A, Asm"),
            ],
            results: vec![
                result("b1", "Passed"),
                result("a1", "Failed"),
                result("a2", "Passed"),
                result("zz", "NotExecuted"),
            ],
            ..TestRun::default()
        }
    }

    #[test]
    fn test_groups_by_class_in_first_appearance_order() {
        let report = Report::from_run(&run());
        let names: Vec<&str> = report.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ns.B, Asm", "Ns.A, Asm", UNKNOWN_CLASS]);

        let a = &report.classes[1];
        assert_eq!((a.total, a.passed, a.failed, a.other), (2, 1, 1, 0));
        assert_eq!(a.outcome, "Failed");
        assert_eq!(report.classes[0].outcome, "Passed");
        assert_eq!(report.classes[2].outcome, "Warning");
    }

    #[test]
    fn test_counters_fall_back_to_results() {
        let report = Report::from_run(&run());
        assert_eq!(report.counters.total, 4);
        assert_eq!(report.counters.passed, 2);
        assert_eq!(report.counters.executed, 3);
        assert_eq!(report.pass_percent, 50);
        assert_eq!(report.failed_results.len(), 1);
        assert_eq!(report.failed_results[0].name, "a1");
    }

    #[test]
    fn test_summary_counters_win() {
        let mut run = run();
        run.summary = ResultSummary {
            counters: Some(Counters {
                total: 3,
                passed: 2,
                ..Counters::default()
            }),
            ..ResultSummary::default()
        };
        let report = Report::from_run(&run);
        assert_eq!(report.counters.total, 3);
        assert_eq!(report.pass_percent, 66);
    }

    #[test]
    fn test_pass_percent_with_huge_counters() {
        let mut run = run();
        run.summary = ResultSummary {
            counters: Some(Counters {
                total: 100_000_000_000_000_000,
                passed: 100_000_000_000_000_000,
                ..Counters::default()
            }),
            ..ResultSummary::default()
        };
        assert_eq!(Report::from_run(&run).pass_percent, 100);

        run.summary.counters = Some(Counters {
            total: i64::MAX,
            passed: i64::MAX / 2,
            ..Counters::default()
        });
        assert_eq!(Report::from_run(&run).pass_percent, 49);
    }

    #[test]
    fn test_empty_run() {
        let report = Report::from_run(&TestRun::default());
        assert_eq!(report.pass_percent, 0);
        assert!(report.classes.is_empty());
    }

    #[test]
    fn test_serializes_with_camel_case_integers() {
        let json = serde_json::to_value(Report::from_run(&run())).unwrap();
        assert_eq!(json["passPercent"], 50);
        assert_eq!(json["classes"][0]["tests"][0]["className"], "Ns.B, Asm");
        assert!(crate::value::Value::from_json(json).is_ok());
    }
}
