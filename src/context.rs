//! Prompt assembly for personalized chat.
//!
//! Renders the student's profile, recent measurements and recent conversation
//! into a fixed template ahead of the current question. Formatting only: no
//! field is required and anything missing renders as [`MISSING`].

use std::fmt::Write;

use chrono::{NaiveDate, Utc};

use crate::bmi::{calculate_bmi, parse_bmi, BmiClass};
use crate::config::{HEALTH_SNAPSHOT_LIMIT, HISTORY_MESSAGE_LIMIT};
use crate::store::{ChatMessage, HealthSnapshot, Sender, StudentHealthData, StudentProfile};

/// Placeholder for absent fields
pub const MISSING: &str = "N/A";

fn or_missing(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(MISSING)
}

fn number_or_missing(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{}{}", trim_number(v), unit),
        None => MISSING.to_string(),
    }
}

/// `70.0` renders as `70`, `65.5` stays `65.5`.
fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

fn render_bmi(snapshot: &HealthSnapshot) -> String {
    let value = snapshot
        .bmi
        .as_deref()
        .and_then(parse_bmi)
        .or_else(|| calculate_bmi(snapshot.weight?, snapshot.height?));

    match value {
        Some(bmi) => format!("{:.2} ({})", bmi, BmiClass::from_value(bmi)),
        None => MISSING.to_string(),
    }
}

fn render_blood_pressure(snapshot: &HealthSnapshot) -> String {
    match (snapshot.systolic, snapshot.diastolic) {
        (Some(sys), Some(dia)) => format!("{}/{} mmHg", trim_number(sys), trim_number(dia)),
        _ => MISSING.to_string(),
    }
}

fn write_profile(out: &mut String, name: &str, profile: Option<&StudentProfile>, today: NaiveDate) {
    let profile_name = profile.and_then(|p| p.name.as_deref());
    let age = profile
        .and_then(|p| p.age_on(today))
        .map(|a| a.to_string());

    let _ = writeln!(out, "THÔNG TIN SINH VIÊN:");
    let _ = writeln!(out, "- Họ tên: {}", or_missing(profile_name.or(Some(name))));
    let _ = writeln!(out, "- Tuổi: {}", or_missing(age.as_deref()));
    let _ = writeln!(out, "- Giới tính: {}", or_missing(profile.and_then(|p| p.gender.as_deref())));
    let _ = writeln!(out, "- Ngành học: {}", or_missing(profile.and_then(|p| p.major.as_deref())));
    let _ = writeln!(out, "- Khóa: {}", or_missing(profile.and_then(|p| p.cohort.as_deref())));
}

fn write_snapshots(out: &mut String, snapshots: &[HealthSnapshot]) {
    let _ = writeln!(out, "\nCHỈ SỐ SỨC KHỎE GẦN ĐÂY:");
    if snapshots.is_empty() {
        let _ = writeln!(out, "- Chưa có dữ liệu khám sức khỏe.");
        return;
    }
    for snapshot in snapshots.iter().take(HEALTH_SNAPSHOT_LIMIT) {
        let _ = writeln!(
            out,
            "- Ngày đo {}: Chiều cao {}, Cân nặng {}, BMI {}, Huyết áp {}, Nhịp tim {}",
            or_missing(snapshot.follow_date.as_deref()),
            number_or_missing(snapshot.height, " cm"),
            number_or_missing(snapshot.weight, " kg"),
            render_bmi(snapshot),
            render_blood_pressure(snapshot),
            number_or_missing(snapshot.heart_rate, " bpm"),
        );
    }
}

fn write_history(out: &mut String, history: &[ChatMessage]) {
    if history.is_empty() {
        return;
    }
    let _ = writeln!(out, "\nLỊCH SỬ TRÒ CHUYỆN GẦN ĐÂY:");
    let start = history.len().saturating_sub(HISTORY_MESSAGE_LIMIT);
    for message in &history[start..] {
        let speaker = match message.sender {
            Sender::User => "Sinh viên",
            Sender::Bot => "Trợ lý",
        };
        let _ = writeln!(out, "{}: {}", speaker, message.content);
    }
}

/// Build the full prompt sent to the LLM for a personalized question.
pub fn build_prompt(
    student_name: &str,
    health: Option<&StudentHealthData>,
    history: &[ChatMessage],
    message: &str,
) -> String {
    build_prompt_on(student_name, health, history, message, Utc::now().date_naive())
}

/// [`build_prompt`] with an explicit date for age calculation.
pub fn build_prompt_on(
    student_name: &str,
    health: Option<&StudentHealthData>,
    history: &[ChatMessage],
    message: &str,
    today: NaiveDate,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Bạn là trợ lý sức khỏe cá nhân của sinh viên {}. \
         Hãy dựa vào thông tin dưới đây để đưa ra lời khuyên phù hợp, cụ thể cho sinh viên này.\n",
        or_missing(Some(student_name))
    );

    write_profile(&mut out, student_name, health.and_then(|h| h.profile.as_ref()), today);
    write_snapshots(&mut out, health.map(|h| h.snapshots.as_slice()).unwrap_or_default());
    write_history(&mut out, history);

    let _ = writeln!(out, "\nCÂU HỎI HIỆN TẠI: {}", message);
    let _ = write!(
        out,
        "\nHãy trả lời bằng tiếng Việt, ngắn gọn, thân thiện. \
         Nếu câu hỏi liên quan đến các chỉ số sức khỏe, hãy tham chiếu số liệu ở trên. \
         Với triệu chứng nghiêm trọng, hãy khuyên sinh viên đến gặp bác sĩ."
    );
    out
}
