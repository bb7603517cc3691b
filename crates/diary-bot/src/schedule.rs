//! Static timetable: weekday subject lists, bell times, subject icons.
//! Display-only data; the database knows nothing about it.

pub const DAYS_UA: [&str; 7] = [
    "Понеділок",
    "Вівторок",
    "Середа",
    "Четвер",
    "П'ятниця",
    "Субота",
    "Неділя",
];

/// Lesson number, start, end. Number 0 is the lunch break.
pub const BELLS: [(u8, &str, &str); 9] = [
    (1, "09:00", "09:45"),
    (2, "09:55", "10:40"),
    (3, "10:50", "11:35"),
    (4, "11:45", "12:30"),
    (0, "12:30", "13:00"),
    (5, "13:00", "13:45"),
    (6, "13:55", "14:40"),
    (7, "14:50", "15:35"),
    (8, "15:45", "16:30"),
];

/// Subjects per school day, indexed by weekday (0 = Monday).
/// Saturday and Sunday have no lessons.
pub fn subjects_for(weekday: usize) -> &'static [&'static str] {
    match weekday {
        0 => &[
            "Алгебра", "Фізика", "Інформатика", "Фізкультура", "Англ. Мова", "Біологія",
            "Технології",
        ],
        1 => &["Хімія", "Геометрія", "Укр. Мова", "Укр. Літ", "Фізкультура", "Фізика"],
        2 => &["Укр. Мова", "Мистецтво", "Укр. Літ", "Фізика", "Географія", "Мистецтво (0.5)"],
        3 => &[
            "Історія", "Алгебра", "Хімія", "Історія України", "Біологія", "Інформ./Технол.",
            "Англ. Мова",
        ],
        4 => &["Історія України", "Зар. Літ", "Астрономія", "Укр. Мова (дод)", "Фізкультура"],
        _ => &[],
    }
}

/// Display icon for a subject; unknown subjects get the default pin.
pub fn subject_icon(subject: &str) -> &'static str {
    match subject {
        "Алгебра" => "📐",
        "Геометрія" => "📏",
        "Фізика" => "⚛️",
        "Хімія" => "🧪",
        "Біологія" => "🌿",
        "Географія" => "🌍",
        "Астрономія" => "🔭",
        "Інформатика" | "Інформ./Технол." => "💻",
        "Технології" => "🔧",
        "Англ. Мова" => "🇬🇧",
        "Укр. Мова" | "Укр. Мова (дод)" => "🇺🇦",
        "Укр. Літ" => "📖",
        "Зар. Літ" => "📚",
        "Історія" => "🏛️",
        "Історія України" => "🏳️",
        "Мистецтво" | "Мистецтво (0.5)" => "🎨",
        "Фізкультура" => "⚽",
        _ => "📌",
    }
}

/// Bell-time view of one school day, used by the `/schedule` menu and
/// the morning digest.
pub fn render_day_bells(weekday: usize) -> String {
    let subjects = subjects_for(weekday);
    let mut out = String::new();
    let mut lesson_idx = 0usize;

    for (num, start, end) in BELLS {
        if num == 0 {
            out.push_str(&format!("   ☕ Перерва {}–{}\n", start, end));
        } else if lesson_idx < subjects.len() {
            let s = subjects[lesson_idx];
            out.push_str(&format!(
                "╭─ *{}.* {} {}\n╰─ {}–{}\n",
                num,
                subject_icon(s),
                s,
                start,
                end
            ));
            lesson_idx += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_school_day_has_lessons() {
        for day in 0..5 {
            assert!(!subjects_for(day).is_empty(), "day {} empty", day);
        }
        assert!(subjects_for(5).is_empty());
        assert!(subjects_for(6).is_empty());
    }

    #[test]
    fn unknown_subject_gets_default_icon() {
        assert_eq!(subject_icon("Латина"), "📌");
        assert_eq!(subject_icon("Алгебра"), "📐");
    }

    #[test]
    fn bells_render_includes_lunch_and_first_lesson() {
        let text = render_day_bells(0);
        assert!(text.contains("Перерва 12:30–13:00"));
        assert!(text.contains("*1.* 📐 Алгебра"));
        assert!(text.contains("09:00–09:45"));
    }
}
