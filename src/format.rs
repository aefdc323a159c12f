//! Number formatting and entry helpers.

use bigdecimal::BigDecimal;

/// Significant digits kept in results and digits allowed in an entry.
pub const MAX_DIGITS_IN_INPUT: usize = 15;
/// Results with a decimal exponent below this are shown in scientific notation.
pub const LOWER_EXP: i64 = -14;
/// Results with a decimal exponent at or above this are shown in scientific notation.
pub const UPPER_EXP: i64 = 15;

pub const DECIMAL_SEPARATOR: char = '.';
pub const GROUPING_SEPARATOR: char = ',';
pub const MINUS: char = '-';

/// Formats `value` rounded half up to [`MAX_DIGITS_IN_INPUT`] significant
/// digits, switching to scientific notation outside the exponent window.
pub fn format_number(value: &BigDecimal) -> String {
    let (int, scale) = value.as_bigint_and_exponent();
    let int = int.to_string();
    let (negative, digits) = match int.strip_prefix(MINUS) {
        Some(digits) => (true, digits),
        None => (false, int.as_str()),
    };
    let (mut digits, mut scale) = strip_trailing_zeros(digits, scale);
    if digits == "0" {
        return digits;
    }

    if digits.len() > MAX_DIGITS_IN_INPUT {
        let dropped = digits.len() - MAX_DIGITS_IN_INPUT;
        let round_up = digits.as_bytes()[MAX_DIGITS_IN_INPUT] >= b'5';
        digits.truncate(MAX_DIGITS_IN_INPUT);
        scale -= dropped as i64;
        if round_up {
            digits = increment(&digits);
            if digits.len() > MAX_DIGITS_IN_INPUT {
                digits.truncate(MAX_DIGITS_IN_INPUT);
                scale -= 1;
            }
        }
        let stripped = strip_trailing_zeros(&digits, scale);
        digits = stripped.0;
        scale = stripped.1;
    }

    // Decimal exponent of the leading digit.
    let exponent = digits.len() as i64 - 1 - scale;
    let mut result = String::with_capacity(digits.len() + 8);
    if negative {
        result.push(MINUS);
    }

    if exponent < LOWER_EXP || exponent >= UPPER_EXP {
        result.push_str(&digits[..1]);
        if digits.len() > 1 {
            result.push(DECIMAL_SEPARATOR);
            result.push_str(&digits[1..]);
        }
        result.push('e');
        result.push(if exponent < 0 { MINUS } else { '+' });
        result.push_str(&exponent.abs().to_string());
    } else if scale <= 0 {
        result.push_str(&digits);
        result.extend(std::iter::repeat('0').take(scale.unsigned_abs() as usize));
    } else if scale as usize >= digits.len() {
        result.push('0');
        result.push(DECIMAL_SEPARATOR);
        result.extend(std::iter::repeat('0').take(scale as usize - digits.len()));
        result.push_str(&digits);
    } else {
        let split = digits.len() - scale as usize;
        result.push_str(&digits[..split]);
        result.push(DECIMAL_SEPARATOR);
        result.push_str(&digits[split..]);
    }
    result
}

/// Decimal exponent of the leading digit of `value`, `None` for zero.
pub fn decimal_exponent(value: &BigDecimal) -> Option<i64> {
    let (int, scale) = value.as_bigint_and_exponent();
    let int = int.to_string();
    let digits = int.trim_start_matches(MINUS);
    if digits == "0" {
        return None;
    }
    Some(digits.len() as i64 - 1 - scale)
}

fn strip_trailing_zeros(digits: &str, scale: i64) -> (String, i64) {
    let trimmed = digits.trim_end_matches('0');
    if trimmed.is_empty() {
        return ("0".to_string(), 0);
    }
    let removed = (digits.len() - trimmed.len()) as i64;
    (trimmed.to_string(), scale - removed)
}

/// Adds one to a string of decimal digits.
fn increment(digits: &str) -> String {
    let mut bytes = digits.as_bytes().to_vec();
    for byte in bytes.iter_mut().rev() {
        if *byte == b'9' {
            *byte = b'0';
        } else {
            *byte += 1;
            return String::from_utf8_lossy(&bytes).into_owned();
        }
    }
    let mut carried = String::with_capacity(bytes.len() + 1);
    carried.push('1');
    carried.push_str(&String::from_utf8_lossy(&bytes));
    carried
}

/// Inserts grouping separators into the integer part of a canonical
/// number, e.g. `-1234567.5` becomes `-1,234,567.5`. Text that is not a
/// number is returned unchanged.
pub fn group_digits(canonical: &str) -> String {
    if !is_number_ok(canonical) {
        return canonical.to_string();
    }
    let (sign, unsigned) = match canonical.strip_prefix(MINUS) {
        Some(rest) => (Some(MINUS), rest),
        None => (None, canonical),
    };
    let split = unsigned
        .find(|c| c == DECIMAL_SEPARATOR || c == 'e' || c == 'E')
        .unwrap_or_else(|| unsigned.len());
    let (integer_part, rest) = unsigned.split_at(split);

    let mut grouped = String::with_capacity(canonical.len() + integer_part.len() / 3);
    grouped.extend(sign);
    for (idx, digit) in integer_part.chars().enumerate() {
        if idx > 0 && (integer_part.len() - idx) % 3 == 0 {
            grouped.push(GROUPING_SEPARATOR);
        }
        grouped.push(digit);
    }
    grouped.push_str(rest);
    grouped
}

/// Removes grouping separators so display text can be read back.
pub fn strip_grouping(display: &str) -> String {
    display
        .trim()
        .chars()
        .filter(|&c| c != GROUPING_SEPARATOR)
        .collect()
}

pub fn count_digits(text: &str) -> usize {
    text.chars().filter(char::is_ascii_digit).count()
}

pub fn remove_last_symbol(text: &str) -> &str {
    match text.char_indices().last() {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Checks whether `text` is a finite signed decimal number, optionally in
/// scientific notation. Accepts entry forms such as `5.`, `.5` and `-0.`.
pub fn is_number_ok(text: &str) -> bool {
    let unsigned = text.strip_prefix(MINUS).unwrap_or(text);
    let (mantissa, exponent) = match unsigned.find(|c| c == 'e' || c == 'E') {
        Some(pos) => (&unsigned[..pos], Some(&unsigned[pos + 1..])),
        None => (unsigned, None),
    };

    let mantissa_ok = mantissa.chars().any(|c| c.is_ascii_digit())
        && mantissa
            .chars()
            .all(|c| c.is_ascii_digit() || c == DECIMAL_SEPARATOR)
        && mantissa.matches(DECIMAL_SEPARATOR).count() <= 1;
    let exponent_ok = match exponent {
        None => true,
        Some(exp) => {
            let digits = exp.strip_prefix(|c| c == '+' || c == MINUS).unwrap_or(exp);
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        }
    };
    mantissa_ok && exponent_ok
}
