use std::time::Duration;

/// Parses a duration string like `30m`, `1h30m` or `1d` into a [`Duration`].
///
/// Any combination of `<digits><unit>` groups is accepted, where the unit is
/// one of `s`, `m`, `h` or `d`. Returns `None` for empty, malformed or
/// overflowing input.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let mut total: u64 = 0;
    let mut chars = input.chars().peekable();

    if input.is_empty() {
        return None;
    }

    while chars.peek().is_some() {
        let mut digits = String::new();
        while let Some(c) = chars.peek() {
            if c.is_ascii_digit() {
                digits.push(chars.next()?);
            } else {
                break;
            }
        }

        if digits.is_empty() {
            return None;
        }

        let number: u64 = digits.parse().ok()?;
        let multiplier = match chars.next()? {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            _ => return None,
        };

        total = total.checked_add(number.checked_mul(multiplier)?)?;
    }

    Some(Duration::from_secs(total))
}
