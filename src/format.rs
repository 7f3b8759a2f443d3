/// Placeholder shown wherever a value is missing.
pub const MISSING: &str = "—";

/// Display a metric value: whole numbers from 1,000 upward, two decimals
/// below, "—" when missing.
pub fn fmt_number(value: Option<f64>) -> String {
    match value {
        Some(x) if x.is_finite() => {
            let decimals = if x.abs() >= 1000.0 { 0 } else { 2 };
            group_thousands(&format!("{x:.decimals$}"))
        }
        _ => MISSING.to_string(),
    }
}

/// Display a percentage change with two decimals.
pub fn fmt_percent(value: Option<f64>) -> String {
    match value {
        Some(x) if x.is_finite() => format!("{}%", group_thousands(&format!("{x:.2}"))),
        _ => MISSING.to_string(),
    }
}

/// Display a row count with thousands separators.
pub fn fmt_count(n: usize) -> String {
    group_thousands(&n.to_string())
}

/// Insert `,` separators into the integer part of a formatted number.
fn group_thousands(formatted: &str) -> String {
    let (sign, rest) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match rest.find('.') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}{grouped}{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(fmt_number(None), "—");
        assert_eq!(fmt_number(Some(f64::NAN)), "—");
        assert_eq!(fmt_number(Some(0.5)), "0.50");
        assert_eq!(fmt_number(Some(999.994)), "999.99");
        assert_eq!(fmt_number(Some(1000.0)), "1,000");
        assert_eq!(fmt_number(Some(412_345.67)), "412,346");
        assert_eq!(fmt_number(Some(-1_234_567.0)), "-1,234,567");
    }

    #[test]
    fn percents() {
        assert_eq!(fmt_percent(None), "—");
        assert_eq!(fmt_percent(Some(12.3456)), "12.35%");
        assert_eq!(fmt_percent(Some(-0.5)), "-0.50%");
        assert_eq!(fmt_percent(Some(1234.5)), "1,234.50%");
    }

    #[test]
    fn counts() {
        assert_eq!(fmt_count(0), "0");
        assert_eq!(fmt_count(999), "999");
        assert_eq!(fmt_count(1_234_567), "1,234,567");
    }
}
