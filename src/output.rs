//! Output formatting for finished reports.
//!
//! Renders Telegram captions, logs reports as JSON, and provides the
//! dry-run sink that writes digests to the log instead of a channel.

use anyhow::Result;
use chrono::{DateTime, Datelike, FixedOffset, Weekday};
use serde::Serialize;
use std::fmt::{Debug, Write};
use tracing::{debug, info};

use crate::analyzers::trend::{Direction, Strength};
use crate::analyzers::types::{DailyDigest, MetricsReport};
use crate::config::City;
use crate::services::report_sink::{Digest, ReportSink};

/// Logs a report using Rust's debug pretty-print format.
pub fn print_pretty<T: Debug>(report: &T) {
    debug!("{:#?}", report);
}

/// Logs a report as pretty-printed JSON.
pub fn print_json<T: Serialize>(report: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Whole units with a space between thousands: `1234567.4` -> `1 234 567`.
pub fn format_num(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

pub fn format_money(value: Option<f64>) -> String {
    match value {
        Some(v) if v != 0.0 => format!("{} ₽", format_num(v)),
        _ => "нет данных".to_string(),
    }
}

/// Signed percentage with one decimal; exactly zero prints as `0%`.
pub fn format_pct(value: f64) -> String {
    if value == 0.0 {
        "0%".to_string()
    } else {
        format!("{value:+.1}%")
    }
}

/// Human-readable elapsed time between two RFC 3339 timestamps, or
/// `"unknown"` when either does not parse or `end` precedes `start`.
pub fn format_duration(start: &str, end: &str) -> String {
    let (Ok(start), Ok(end)) = (
        DateTime::parse_from_rfc3339(start),
        DateTime::parse_from_rfc3339(end),
    ) else {
        return "unknown".to_string();
    };

    let secs = (end - start).num_seconds();
    if secs < 0 {
        return "unknown".to_string();
    }

    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "Январь",
        2 => "Февраль",
        3 => "Март",
        4 => "Апрель",
        5 => "Май",
        6 => "Июнь",
        7 => "Июль",
        8 => "Август",
        9 => "Сентябрь",
        10 => "Октябрь",
        11 => "Ноябрь",
        12 => "Декабрь",
        _ => "Неизвестный месяц",
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Понедельник",
        Weekday::Tue => "Вторник",
        Weekday::Wed => "Среда",
        Weekday::Thu => "Четверг",
        Weekday::Fri => "Пятница",
        Weekday::Sat => "Суббота",
        Weekday::Sun => "Воскресенье",
    }
}

fn direction_label(direction: Direction) -> (&'static str, &'static str) {
    match direction {
        Direction::Upward => ("📈", "восходящий"),
        Direction::Downward => ("📉", "нисходящий"),
        Direction::Sideways => ("➡️", "боковой"),
    }
}

fn strength_label(strength: Strength) -> &'static str {
    match strength {
        Strength::Strong => "сильный",
        Strength::Moderate => "умеренный",
        Strength::Weak => "слабый",
    }
}

fn change_emoji(delta: f64) -> &'static str {
    if delta > 0.0 {
        "📈"
    } else if delta < 0.0 {
        "📉"
    } else {
        "➡️"
    }
}

/// Escapes characters that legacy Telegram Markdown treats as markup.
fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Monthly report caption in Telegram Markdown.
///
/// The comparison section appears only when the report carries growth.
pub fn render_monthly_caption(
    city: &City,
    report: &MetricsReport,
    generated_at: DateTime<FixedOffset>,
) -> String {
    let month = report.window.start;
    let mut msg = String::new();

    // writes into a String cannot fail
    let _ = writeln!(
        msg,
        "📊 *МЕСЯЧНЫЙ ОТЧЕТ: {} - {} {}*\n",
        city.name.to_uppercase(),
        month_name(month.month()),
        month.year()
    );

    msg.push_str("📈 *ОСНОВНЫЕ ПОКАЗАТЕЛИ:*\n");
    let _ = writeln!(msg, "• Всего вакансий: *{}*", format_num(report.total as f64));
    let _ = writeln!(
        msg,
        "• С зарплатой 'за месяц': *{}* ({:.1}%)",
        format_num(report.with_monthly_salary as f64),
        report.salary_percentage
    );
    if let Some(salary) = &report.salary {
        let _ = writeln!(msg, "• Средняя зарплата: *{}*", format_money(Some(salary.mean)));
        let _ = writeln!(msg, "• Медианная зарплата: *{}*", format_money(Some(salary.median)));
        let _ = writeln!(msg, "• 25% получают до: *{}*", format_money(Some(salary.q25)));
        let _ = writeln!(msg, "• 75% получают до: *{}*", format_money(Some(salary.q75)));
        let _ = writeln!(msg, "• ТОП-10%: от *{}*", format_money(Some(salary.q90)));
    }

    if let Some(trend) = &report.trend {
        let (emoji, direction) = direction_label(trend.direction);
        let _ = writeln!(msg, "\n{emoji} *ТРЕНД ЗАРПЛАТ (EMA):*");
        let _ = writeln!(msg, "• Направление: *{direction}*");
        let _ = writeln!(msg, "• Изменение: *{}*", format_pct(trend.change_pct));
        let _ = writeln!(
            msg,
            "• С *{}* до *{}*",
            format_money(Some(trend.start)),
            format_money(Some(trend.end))
        );
        let _ = writeln!(msg, "• Сила тренда: *{}*", strength_label(trend.strength));
    }

    if let Some(growth) = &report.growth {
        let _ = writeln!(
            msg,
            "\n{} *СРАВНЕНИЕ С ПРЕДЫДУЩИМ МЕСЯЦЕМ:*",
            change_emoji(growth.total_growth as f64)
        );
        let _ = writeln!(
            msg,
            "• Вакансий: *{}* ({})",
            format_pct(growth.total_growth_pct),
            format_num(growth.total_growth as f64)
        );
        if let Some(salary) = &growth.salary {
            let _ = writeln!(
                msg,
                "• 💰{} Зарплата: *{}* ({})",
                change_emoji(salary.growth),
                format_pct(salary.growth_pct),
                format_money(Some(salary.growth))
            );
        }
    }

    msg.push_str("\n⏰ *ПОПУЛЯРНЫЕ ГРАФИКИ:*\n");
    if report.top_schedules.is_empty() {
        msg.push_str("• Нет данных о графиках\n");
    }
    for schedule in &report.top_schedules {
        let share = if report.total > 0 {
            schedule.count as f64 / report.total as f64 * 100.0
        } else {
            0.0
        };
        let _ = writeln!(
            msg,
            "• {}: *{}* ({share:.1}%)",
            escape_markdown(&schedule.label),
            schedule.count
        );
    }

    msg.push_str("\n📅 *АКТИВНОСТЬ ПО ДНЯМ:*\n");
    if let Some(top) = report.top_weekday {
        let _ = writeln!(msg, "• Больше всего в *{}*", weekday_name(top));
        let per_day = report.weekday_counts.iter().map(|w| w.count).sum::<usize>() as f64 / 7.0;
        let _ = writeln!(msg, "• В среднем: *{per_day:.1}* вакансий/день");
    }

    msg.push_str("\n🏢 *ТОП РАБОТОДАТЕЛИ:*\n");
    if !report.top_employers_by_count.is_empty() {
        msg.push_str("*По количеству вакансий:*\n");
        for (i, employer) in report.top_employers_by_count.iter().enumerate() {
            let _ = writeln!(
                msg,
                "{}. {}: *{}*",
                i + 1,
                escape_markdown(&employer.label),
                employer.count
            );
        }
    }
    if !report.top_employers_by_salary.is_empty() {
        msg.push_str("\n*По средней зарплате:*\n");
        for (i, employer) in report.top_employers_by_salary.iter().enumerate() {
            let _ = writeln!(
                msg,
                "{}. {}: *{}*",
                i + 1,
                escape_markdown(&employer.label),
                format_money(Some(employer.avg_salary))
            );
        }
    }

    if let Some(range) = report.salary_range.as_ref().filter(|r| r.with_range > 0) {
        msg.push_str("\n💰 *ЗАРПЛАТНЫЕ ВИЛКИ:*\n");
        let _ = writeln!(msg, "• Вакансий с вилкой: *{}*", format_num(range.with_range as f64));
        let _ = writeln!(msg, "• Средняя вилка: *{}*", format_money(Some(range.avg_range)));
    }

    let _ = writeln!(
        msg,
        "\n⏰ *Отчет сгенерирован:* {} МСК",
        generated_at.format("%d.%m.%Y %H:%M")
    );
    msg
}

/// Daily digest caption in plain text.
pub fn render_daily_caption(
    city: &City,
    digest: &DailyDigest,
    now: DateTime<FixedOffset>,
) -> String {
    let time = now.format("%H:%M");
    let mut msg = String::new();

    let _ = writeln!(msg, "📊 Аналитика рынка вакансий - {}\n", city.name);

    match &digest.day_over_day {
        Some(dod) if dod.growth > 0 => {
            let _ = writeln!(
                msg,
                "📈 Вчера vs Позавчера: +{} ({})",
                format_num(dod.growth as f64),
                format_pct(dod.growth_pct)
            );
        }
        Some(dod) if dod.growth < 0 => {
            let _ = writeln!(
                msg,
                "📉 Вчера vs Позавчера: {} ({})",
                format_num(dod.growth as f64),
                format_pct(dod.growth_pct)
            );
        }
        Some(_) => msg.push_str("➡️ Вчера vs Позавчера: без изменений\n"),
        None => msg.push_str("⏳ Недостаточно данных для сравнения полных дней\n"),
    }
    let _ = writeln!(
        msg,
        "📅 Сегодня (на {time}): {} вакансий\n",
        format_num(digest.today_count as f64)
    );

    let _ = writeln!(msg, "📈 За неделю: {} вакансий", format_num(digest.week_count as f64));
    let _ = writeln!(
        msg,
        "💰 С зарплатой за неделю: {}\n",
        format_num(digest.week_salary_count as f64)
    );

    match &digest.salary_today {
        Some(s) => {
            let _ = writeln!(
                msg,
                "💰 Зарплаты сегодня ({} вакансий):\n",
                format_num(s.count as f64)
            );
            let _ = writeln!(msg, "✓ Средняя: {}", format_money(Some(s.mean)));
            let _ = writeln!(msg, "✓ Медианная: {}", format_money(Some(s.median)));
            let _ = writeln!(msg, "✓ 25% получают до: {}", format_money(Some(s.q25)));
            let _ = writeln!(msg, "✓ 75% получают до: {}", format_money(Some(s.q75)));
            let _ = writeln!(msg, "✓ Вилка: {}", format_money(Some(s.spread)));
        }
        None => msg.push_str("💰 Сегодня нет данных о зарплатах\n"),
    }
    msg.push('\n');

    if digest.top_employers_today.is_empty() {
        msg.push_str("🏢 Сегодня нет данных о работодателях\n");
    } else {
        msg.push_str("🏢 ТОП работодателей сегодня:\n\n");
        for (i, employer) in digest.top_employers_today.iter().enumerate() {
            let _ = writeln!(
                msg,
                "{}. {} - {} вакансий",
                i + 1,
                shorten(&employer.label, 25),
                format_num(employer.count as f64)
            );
        }
    }

    let _ = writeln!(msg, "\n📊 Сводка по {}:\n", city.name);
    let _ = writeln!(msg, "✓ Всего вакансий: {}", format_num(digest.week_count as f64));
    let _ = writeln!(
        msg,
        "✓ С зарплатой 'за месяц': {}",
        format_num(digest.week_salary_count as f64)
    );
    let _ = writeln!(msg, "✓ Средняя зарплата: {}", format_money(digest.week_avg_salary));
    if let Some(first) = digest.first_date {
        let _ = writeln!(
            msg,
            "✓ Период данных: {} - {}",
            first.format("%d.%m.%Y"),
            digest.today.format("%d.%m.%Y")
        );
    }

    let _ = writeln!(msg, "\n⏰ Обновлено: {time} МСК");
    msg
}

/// Writes digests to the log instead of publishing them.
#[derive(Debug, Default)]
pub struct StdoutSink;

#[async_trait::async_trait]
impl ReportSink for StdoutSink {
    async fn deliver(&self, digest: &Digest) -> Result<()> {
        info!(
            city = %digest.city.slug,
            channel = %digest.city.channel,
            records = digest.records.len(),
            "Dry run, digest not sent:\n{}",
            digest.caption
        );
        print_json(&digest.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate::aggregate_metrics;
    use crate::analyzers::daily::build_daily_digest;
    use crate::analyzers::window::{month_window, rolling_week_window};
    use crate::config::ReportConfig;
    use crate::records::{RawVacancy, RecordId, ingest};
    use chrono::{TimeZone, Utc};

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    fn city() -> City {
        City::new("msk", "Москва", "@courier_jobs_msk")
    }

    fn row(id: i64, month: u32, day: u32, salary: Option<f64>) -> RawVacancy {
        RawVacancy {
            id: RecordId::Int(id),
            city_slug: "msk".to_string(),
            employer: Some("Яндекс_Еда".to_string()),
            schedule_name: Some("Полный день".to_string()),
            salary_period_name: salary.map(|_| "за месяц".to_string()),
            salary_to_net: salary,
            salary_from_net: salary.map(|s| s - 10_000.0),
            published_at: Some(Utc.with_ymd_and_hms(2024, month, day, 9, 0, 0).unwrap()),
        }
    }

    fn generated() -> DateTime<FixedOffset> {
        tz().with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    fn report(rows: Vec<RawVacancy>, prior: Option<&MetricsReport>) -> MetricsReport {
        let config = ReportConfig::default();
        let reference = tz().with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let vacancies = ingest(rows, &config, tz());
        aggregate_metrics("msk", month_window(reference, 0), &vacancies, prior, &config)
    }

    #[test]
    fn test_format_num_groups_thousands() {
        assert_eq!(format_num(0.0), "0");
        assert_eq!(format_num(999.4), "999");
        assert_eq!(format_num(1234567.0), "1 234 567");
        assert_eq!(format_num(-15000.0), "-15 000");
    }

    #[test]
    fn test_format_money_and_pct() {
        assert_eq!(format_money(Some(85000.0)), "85 000 ₽");
        assert_eq!(format_money(None), "нет данных");
        assert_eq!(format_pct(0.0), "0%");
        assert_eq!(format_pct(12.345), "+12.3%");
        assert_eq!(format_pct(-4.0), "-4.0%");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(
            format_duration("2024-03-01T10:00:00+03:00", "2024-03-01T11:02:03+03:00"),
            "1h 02m 03s"
        );
        assert_eq!(
            format_duration("2024-03-01T10:00:00Z", "2024-03-01T10:00:42Z"),
            "42s"
        );
        assert_eq!(format_duration("yesterday", "2024-03-01T10:00:00Z"), "unknown");
        assert_eq!(
            format_duration("2024-03-01T10:00:00Z", "2024-03-01T09:00:00Z"),
            "unknown"
        );
    }

    #[test]
    fn test_monthly_caption_without_growth() {
        let rows = vec![row(1, 2, 5, Some(90_000.0)), row(2, 2, 6, None)];
        let caption = render_monthly_caption(&city(), &report(rows, None), generated());

        assert!(caption.starts_with("📊 *МЕСЯЧНЫЙ ОТЧЕТ: МОСКВА - Февраль 2024*"));
        assert!(caption.contains("• Всего вакансий: *2*"));
        assert!(caption.contains("(50.0%)"));
        assert!(caption.contains("Яндекс\\_Еда"));
        assert!(!caption.contains("СРАВНЕНИЕ С ПРЕДЫДУЩИМ МЕСЯЦЕМ"));
        assert!(caption.contains("01.03.2024 10:00"));
    }

    #[test]
    fn test_monthly_caption_with_growth() {
        let prior = report(vec![row(1, 2, 5, None)], None);
        let current = report(vec![row(2, 2, 5, None), row(3, 2, 6, None)], Some(&prior));
        let caption = render_monthly_caption(&city(), &current, generated());

        assert!(caption.contains("📈 *СРАВНЕНИЕ С ПРЕДЫДУЩИМ МЕСЯЦЕМ:*"));
        assert!(caption.contains("• Вакансий: *+100.0%* (1)"));
    }

    #[test]
    fn test_monthly_caption_for_empty_report() {
        let caption = render_monthly_caption(&city(), &report(vec![], None), generated());
        assert!(caption.contains("• Всего вакансий: *0*"));
        assert!(caption.contains("• Нет данных о графиках"));
        assert!(!caption.contains("Средняя зарплата"));
    }

    #[test]
    fn test_daily_caption() {
        let config = ReportConfig::default();
        let now = tz().with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap();
        let rows = vec![
            row(1, 3, 8, None),
            row(2, 3, 9, None),
            row(3, 3, 9, None),
            row(4, 3, 10, Some(100_000.0)),
        ];
        let vacancies = ingest(rows, &config, tz());
        let digest = build_daily_digest(
            "msk",
            now.date_naive(),
            rolling_week_window(now),
            &vacancies,
            &config,
        );
        let caption = render_daily_caption(&city(), &digest, now);

        assert!(caption.contains("📈 Вчера vs Позавчера: +1 (+100.0%)"));
        assert!(caption.contains("📅 Сегодня (на 15:30): 1 вакансий"));
        assert!(caption.contains("✓ Медианная: 100 000 ₽"));
        assert!(caption.contains("1. Яндекс_Еда - 1 вакансий"));
        assert!(caption.contains("✓ Период данных: 08.03.2024 - 10.03.2024"));
    }

    #[test]
    fn test_shorten_long_names() {
        assert_eq!(shorten("короткое", 25), "короткое");
        assert_eq!(shorten(&"я".repeat(30), 25), format!("{}...", "я".repeat(25)));
    }

    #[tokio::test]
    async fn test_stdout_sink_accepts_digest() {
        let digest = Digest {
            city: city(),
            caption: "text".to_string(),
            markdown: false,
            payload: serde_json::json!({"total": 1}),
            records: Vec::new(),
        };
        StdoutSink.deliver(&digest).await.unwrap();
    }
}
