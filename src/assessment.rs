//! Rule-based health message classifier.
//!
//! Scans a free-text message for a fixed, ordered set of rules. Metric rules
//! extract a number and compare it against a normal range; the keyword rule
//! only contributes a recommendation. The classifier is pure and keeps no state.

use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;

/// Label every metric compares against when deciding whether to recommend
const NORMAL_LABEL: &str = "Bình thường";

/// Returned when no metric could be assessed
pub const NO_MATCH_PROMPT: &str = "Tôi không thấy thông tin cụ thể về sức khỏe. Bạn có thể chia sẻ thêm về: cân nặng, chiều cao, thời gian ngủ, hoặc các vấn đề stress không?";

const REPORT_HEADER: &str = "Đánh giá sức khỏe của bạn:";
const RECOMMENDATION_HEADER: &str = "Khuyến nghị:";

static WEIGHT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cân nặng (\d+)").expect("weight pattern"));
static HEIGHT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"chiều cao (\d+)").expect("height pattern"));
static SLEEP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ngủ (\d+)").expect("sleep pattern"));
static STRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"stress|căng thẳng|lo lắng").expect("stress pattern"));

/// A metric rule: extract a number, classify it against a range.
#[derive(Debug)]
pub struct MetricRule {
    pub name: &'static str,
    pattern: &'static LazyLock<Regex>,
    pub normal_range: RangeInclusive<f64>,
    pub in_range_label: &'static str,
    pub out_of_range_label: &'static str,
    pub recommendation: &'static str,
}

impl MetricRule {
    /// Extracted value and its label, if the message mentions this metric.
    pub fn evaluate(&self, message: &str) -> Option<(f64, &'static str)> {
        let captures = self.pattern.captures(message)?;
        let value: f64 = captures.get(1)?.as_str().parse().ok()?;
        let label = if self.normal_range.contains(&value) {
            self.in_range_label
        } else {
            self.out_of_range_label
        };
        Some((value, label))
    }
}

/// A keyword rule: matching anywhere adds a fixed recommendation.
#[derive(Debug)]
pub struct KeywordRule {
    pub name: &'static str,
    pattern: &'static LazyLock<Regex>,
    pub response: &'static str,
}

impl KeywordRule {
    pub fn matches(&self, message: &str) -> bool {
        self.pattern.is_match(message)
    }
}

#[derive(Debug)]
pub enum HealthRule {
    Metric(MetricRule),
    Keyword(KeywordRule),
}

impl HealthRule {
    pub fn name(&self) -> &'static str {
        match self {
            HealthRule::Metric(rule) => rule.name,
            HealthRule::Keyword(rule) => rule.name,
        }
    }
}

/// Rules in evaluation order.
pub static HEALTH_RULES: LazyLock<[HealthRule; 4]> = LazyLock::new(|| {
    [
        HealthRule::Metric(MetricRule {
            name: "Weight",
            pattern: &WEIGHT_PATTERN,
            normal_range: 45.0..=80.0,
            in_range_label: NORMAL_LABEL,
            out_of_range_label: "Cần điều chỉnh",
            recommendation: "Khuyến nghị: Duy trì chế độ ăn cân bằng và tập thể dục đều đặn.",
        }),
        HealthRule::Metric(MetricRule {
            name: "Height",
            pattern: &HEIGHT_PATTERN,
            normal_range: 150.0..=190.0,
            in_range_label: NORMAL_LABEL,
            out_of_range_label: "Cần kiểm tra",
            recommendation: "Khuyến nghị: Tham khảo ý kiến bác sĩ về phát triển chiều cao.",
        }),
        // "Đủ giấc" is not the normal label, so sleep always carries a recommendation.
        HealthRule::Metric(MetricRule {
            name: "Sleep",
            pattern: &SLEEP_PATTERN,
            normal_range: 6.0..=9.0,
            in_range_label: "Đủ giấc",
            out_of_range_label: "Thiếu ngủ",
            recommendation:
                "Khuyến nghị: Cố gắng ngủ đủ 7-8 tiếng mỗi đêm và duy trì lịch ngủ đều đặn.",
        }),
        HealthRule::Keyword(KeywordRule {
            name: "Stress",
            pattern: &STRESS_PATTERN,
            response:
                "Bạn nên thử các phương pháp giảm stress như: thiền, tập thể dục, nghe nhạc thư giãn.",
        }),
    ]
});

/// Structured result of running every rule over a message.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Assessment {
    /// `"<Metric>: <label>"` lines
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Assessment {
    /// Render the user-facing report.
    pub fn render(&self) -> String {
        if self.findings.is_empty() {
            return NO_MATCH_PROMPT.to_string();
        }

        let mut response = format!("{}\n{}", REPORT_HEADER, self.findings.join("\n"));
        if !self.recommendations.is_empty() {
            response.push_str("\n\n");
            response.push_str(RECOMMENDATION_HEADER);
            response.push('\n');
            response.push_str(&self.recommendations.join("\n"));
        }
        response
    }
}

/// Run the rule table over a message.
pub fn assess(message: &str) -> Assessment {
    let message = message.to_lowercase();
    let mut assessment = Assessment::default();

    for rule in HEALTH_RULES.iter() {
        match rule {
            HealthRule::Metric(metric) => {
                if let Some((value, label)) = metric.evaluate(&message) {
                    tracing::trace!(rule = metric.name, value, label, "Metric rule matched");
                    assessment
                        .findings
                        .push(format!("{}: {}", metric.name, label));
                    if label != NORMAL_LABEL {
                        assessment
                            .recommendations
                            .push(metric.recommendation.to_string());
                    }
                }
            }
            HealthRule::Keyword(keyword) => {
                if keyword.matches(&message) {
                    tracing::trace!(rule = keyword.name, "Keyword rule matched");
                    assessment.recommendations.push(keyword.response.to_string());
                }
            }
        }
    }

    assessment
}

/// Convenience wrapper returning the rendered report.
pub fn analyze_health_info(message: &str) -> String {
    assess(message).render()
}
