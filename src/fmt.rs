use colored::{ColoredString, Colorize};

/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    let cents = format!("{:.2}", val.abs());
    let negative = val < 0.0 && cents != "0.00";
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// Green for inflows, red for outflows.
pub fn amount(val: f64) -> ColoredString {
    if val < 0.0 {
        money(val).red()
    } else {
        money(val).green()
    }
}

/// A signed change: `+$5.00` green, `-$5.00` red, `$0.00` blue.
pub fn delta(val: f64) -> ColoredString {
    let text = money(val.abs());
    if (val * 100.0).round() > 0.0 {
        format!("+{text}").green()
    } else if (val * 100.0).round() < 0.0 {
        format!("-{text}").red()
    } else {
        text.blue()
    }
}

pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return s.chars().take(max_chars).collect();
    }
    let head: String = s.chars().take(max_chars - 3).collect();
    format!("{head}...")
}
