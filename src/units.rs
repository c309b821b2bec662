/// Multiplier for an SI prefix character; unknown characters map to 1.
#[must_use]
pub fn prefix_factor(prefix: char) -> f64 {
    match prefix {
        'f' => 1e-15,
        'p' => 1e-12,
        'n' => 1e-9,
        'u' => 1e-6,
        'm' => 1e-3,
        'k' => 1e3,
        'M' => 1e6,
        'G' => 1e9,
        'T' => 1e12,
        'P' => 1e15,
        _ => 1e0,
    }
}

/// Parses a value such as `"35um"` or `"4.3"`.
///
/// A trailing `unit` is stripped (case-insensitive), then a trailing prefix
/// character from `prefixes` is applied. `prefixes` lists the allowed
/// prefixes in increasing order, with a space standing for "no prefix", e.g.
/// `"fpnum "` for capacitances or `"um "` for lengths. Returns `None` when the
/// remaining text is not a number.
#[must_use]
pub fn parse(input: &str, unit: &str, prefixes: &str) -> Option<f64> {
    let mut text = input.trim();
    if text.is_empty() {
        return None;
    }

    if !unit.is_empty()
        && text.len() >= unit.len()
        && text.is_char_boundary(text.len() - unit.len())
        && text[text.len() - unit.len()..].eq_ignore_ascii_case(unit)
    {
        text = text[..text.len() - unit.len()].trim_end();
    }

    let mut factor = 1.0;
    if let Some(last) = text.chars().last() {
        if last != ' ' && prefixes.contains(last) {
            factor = prefix_factor(last);
            text = &text[..text.len() - last.len_utf8()];
        }
    }

    text.trim().parse::<f64>().ok().map(|v| v * factor)
}

/// Formats `value` with the largest prefix from `prefixes` that keeps at most
/// three digits before the decimal point, using `precision` significant
/// digits in total.
#[must_use]
pub fn format(value: f64, unit: &str, prefixes: &str, precision: usize) -> String {
    if !value.is_finite() {
        return "NaN".to_owned();
    }
    if value.abs() <= f64::EPSILON {
        return format!("0 {unit}");
    }

    let prefixes: Vec<char> = if prefixes.is_empty() {
        vec![' ']
    } else {
        prefixes.chars().collect()
    };

    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();

    let digits_before = |prefix: char| -> i64 {
        #[allow(clippy::cast_possible_truncation)]
        let d = (magnitude / prefix_factor(prefix)).log10() as i64;
        d + 1
    };

    let mut index = 0;
    let mut before_dot = digits_before(prefixes[index]);
    while before_dot > 3 && index < prefixes.len() - 1 {
        index += 1;
        before_dot = digits_before(prefixes[index]);
    }

    let prefix = prefixes[index];
    let scaled = magnitude / prefix_factor(prefix);
    // Negative counts (more integer digits than precision) clamp to zero.
    let decimals = i64::try_from(precision)
        .ok()
        .and_then(|p| usize::try_from(p - before_dot).ok())
        .unwrap_or(0);

    let prefix = if prefix == ' ' {
        String::new()
    } else {
        prefix.to_string()
    };
    format!("{sign}{scaled:.decimals$}{prefix}{unit}")
}
