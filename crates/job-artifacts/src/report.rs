//! JUnit test report model
//!
//! Mirrors the subset of the JUnit XML dialect that CI jobs publish:
//! one `<testsuite>` with `<testcase>` children, each optionally carrying
//! `<failure>`, `<error>` or `<skipped>`. Decoding goes through
//! `quick-xml`'s serde support; counts are derived from the cases rather
//! than trusted from the suite attributes.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Decoded `<testsuite>` document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "testsuite")]
pub struct TestSuite {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@tests", default)]
    pub tests: u32,
    #[serde(rename = "@failures", default)]
    pub failures: u32,
    #[serde(rename = "@errors", default, skip_serializing_if = "is_zero")]
    pub errors: u32,
    #[serde(rename = "@skipped", default)]
    pub skipped: u32,
    #[serde(rename = "@time", default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    #[serde(rename = "testcase", default)]
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties {
    #[serde(rename = "property", default)]
    pub entries: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@value", default)]
    pub value: String,
}

/// One `<testcase>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@classname", default, skip_serializing_if = "String::is_empty")]
    pub classname: String,
    #[serde(rename = "@time", default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<Skipped>,
    #[serde(rename = "system-out", default, skip_serializing_if = "Option::is_none")]
    pub system_out: Option<String>,
    #[serde(rename = "system-err", default, skip_serializing_if = "Option::is_none")]
    pub system_err: Option<String>,
}

/// `<failure>` or `<error>` body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    #[serde(rename = "@message", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "$text", default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    #[serde(rename = "@message", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Outcome of a single case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseOutcome {
    Passed,
    Failed,
    Errored,
    Skipped,
}

impl TestCase {
    pub fn outcome(&self) -> CaseOutcome {
        if self.failure.is_some() {
            CaseOutcome::Failed
        } else if self.error.is_some() {
            CaseOutcome::Errored
        } else if self.skipped.is_some() {
            CaseOutcome::Skipped
        } else {
            CaseOutcome::Passed
        }
    }

    /// Failure message, falling back to the element text.
    pub fn failure_message(&self) -> Option<&str> {
        let failure = self.failure.as_ref().or(self.error.as_ref())?;
        failure.message.as_deref().or(failure.text.as_deref())
    }
}

/// `<testsuites>` wrapper some reporters emit.
#[derive(Debug, Default, Deserialize)]
struct TestSuites {
    #[serde(rename = "testsuite", default)]
    suites: Vec<TestSuite>,
}

impl TestSuite {
    /// Decode a JUnit document.
    ///
    /// A `<testsuites>` root yields its first suite, or an empty suite when
    /// it has none.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        if root_element(body).as_deref() == Some("testsuites") {
            let wrapper: TestSuites = quick_xml::de::from_reader(body)?;
            return Ok(wrapper.suites.into_iter().next().unwrap_or_default());
        }
        Ok(quick_xml::de::from_reader(body)?)
    }

    /// Encode back to a `<testsuite>` document.
    pub fn to_xml(&self) -> std::result::Result<String, quick_xml::SeError> {
        quick_xml::se::to_string(self)
    }

    pub fn total(&self) -> usize {
        self.test_cases.len()
    }

    /// Cases with a `<failure>` or `<error>`.
    pub fn failures(&self) -> usize {
        self.count(|o| matches!(o, CaseOutcome::Failed | CaseOutcome::Errored))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| o == CaseOutcome::Skipped)
    }

    pub fn passed(&self) -> usize {
        self.count(|o| o == CaseOutcome::Passed)
    }

    pub fn failed_cases(&self) -> impl Iterator<Item = &TestCase> {
        self.test_cases
            .iter()
            .filter(|c| matches!(c.outcome(), CaseOutcome::Failed | CaseOutcome::Errored))
    }

    fn count(&self, pred: impl Fn(CaseOutcome) -> bool) -> usize {
        self.test_cases.iter().filter(|c| pred(c.outcome())).count()
    }
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Local name of the first element in `body`, if any.
fn root_element(body: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(body);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}
