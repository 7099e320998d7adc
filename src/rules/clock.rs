//! Greetings and date questions answered from an injected clock

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, Timelike};

/// Date phrases, longest first so that "day after tomorrow" wins over "tomorrow"
const DATE_PHRASES: &[&str] = &[
    "day before yesterday",
    "day after tomorrow",
    "next month",
    "last month",
    "next week",
    "last week",
    "next year",
    "last year",
    "yesterday",
    "tomorrow",
    "today",
];

/// Answer "good morning/afternoon/evening/night" and "current time"
pub fn time_greeting(input: &str, now: NaiveDateTime) -> Option<String> {
    let msg = input.to_lowercase();
    let hour = now.hour();

    let reply = if msg.contains("good morning") {
        if hour < 12 {
            "Good morning! How can I assist you today?"
        } else {
            "It's already past morning, but good day to you!"
        }
    } else if msg.contains("good afternoon") {
        if (12..18).contains(&hour) {
            "Good afternoon! How can I assist you today?"
        } else {
            "It's not quite afternoon, but good day to you!"
        }
    } else if msg.contains("good evening") {
        if hour >= 18 {
            "Good evening! How can I assist you today?"
        } else {
            "It's not evening yet, but good day to you!"
        }
    } else if msg.contains("good night") {
        "Good night! Sleep well and take care!"
    } else if msg.contains("current time") {
        return Some(format!("The current time is {}.", now.format("%H:%M:%S")));
    } else {
        return None;
    };
    Some(reply.to_string())
}

fn first_of_month(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
}

fn resolve(phrase: &str, today: NaiveDate) -> Option<NaiveDate> {
    match phrase {
        "today" => Some(today),
        "tomorrow" => Some(today + Duration::days(1)),
        "day after tomorrow" => Some(today + Duration::days(2)),
        "yesterday" => Some(today - Duration::days(1)),
        "day before yesterday" => Some(today - Duration::days(2)),
        "next week" => Some(today + Duration::weeks(1)),
        "last week" => Some(today - Duration::weeks(1)),
        "next month" => first_of_month(today)?.checked_add_months(Months::new(1)),
        "last month" => first_of_month(today)?.checked_sub_months(Months::new(1)),
        "next year" => today.checked_add_months(Months::new(12)),
        "last year" => today.checked_sub_months(Months::new(12)),
        _ => None,
    }
}

/// Answer questions such as "what is the date tomorrow" or "which day was yesterday"
pub fn date_query(input: &str, now: NaiveDateTime) -> Option<String> {
    let msg = input.to_lowercase();
    let phrase = DATE_PHRASES.iter().find(|p| msg.contains(*p))?;
    let date = resolve(phrase, now.date())?;

    if msg.contains("date") {
        Some(format!("The {}'s date is {}.", phrase, date.format("%B %d, %Y")))
    } else if msg.contains("day") {
        Some(format!("The {} is {}.", phrase, date.format("%A")))
    } else {
        None
    }
}
